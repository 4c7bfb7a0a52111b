//! Shader programs with name-keyed parameters
//!
//! A [`ShaderProgram`] is one compiled stage (vertex or pixel) together with
//! the reflection data callers need to feed it by name: a [`ConstantLayout`]
//! describing the stage's uniform block and the texture / sampler slots it
//! samples from. Materials and entities never know binding indices or byte
//! offsets; they push `("roughness", 0.3)` and the layout resolves it.
//!
//! Bind group convention used by every program:
//! - group 0: vertex-stage constants
//! - group 1: pixel-stage constants
//! - group 2: pixel-stage textures and samplers

use std::{
    borrow::Cow,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

/// Process-unique program identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(u32);

impl ProgramId {
    fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

impl ShaderStage {
    /// Bind group holding this stage's constant block.
    pub fn constants_group(self) -> u32 {
        match self {
            ShaderStage::Vertex => 0,
            ShaderStage::Pixel => 1,
        }
    }
}

/// Shape of a named constant inside a uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantKind {
    Float,
    Int,
    Float2,
    Float3,
    Float4,
    Matrix4,
    /// Raw array of `count` elements `stride` bytes apart (stride is a
    /// multiple of 16).
    Array { stride: u32, count: u32 },
}

impl ConstantKind {
    /// Size and alignment under WGSL uniform address space rules.
    fn size_and_align(self) -> (u32, u32) {
        match self {
            ConstantKind::Float | ConstantKind::Int => (4, 4),
            ConstantKind::Float2 => (8, 8),
            ConstantKind::Float3 => (12, 16),
            ConstantKind::Float4 => (16, 16),
            ConstantKind::Matrix4 => (64, 16),
            ConstantKind::Array { stride, count } => (stride * count, 16),
        }
    }
}

/// A value pushed into a constant slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShaderValue<'a> {
    Float(f32),
    Int(i32),
    Float2([f32; 2]),
    Float3([f32; 3]),
    Float4([f32; 4]),
    Matrix4([[f32; 4]; 4]),
    /// Raw bytes, truncated to the slot size. Fits any slot kind.
    Data(&'a [u8]),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantField {
    pub name: String,
    pub offset: u32,
    pub size: u32,
    pub kind: ConstantKind,
}

/// Byte layout of one uniform block, fields in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstantLayout {
    fields: Vec<ConstantField>,
    size: u32,
}

impl ConstantLayout {
    pub fn builder() -> ConstantLayoutBuilder {
        ConstantLayoutBuilder::default()
    }

    /// Total block size, rounded up to 16 bytes.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[ConstantField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&ConstantField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Writes `value` into `staging` at the offset of `name`.
    ///
    /// Returns `false` (and writes nothing) when the name is unknown or the
    /// value's shape does not match the slot.
    pub fn write(&self, staging: &mut [u8], name: &str, value: ShaderValue<'_>) -> bool {
        let Some(field) = self.field(name) else {
            return false;
        };
        let start = field.offset as usize;
        let Some(slot) = staging.get_mut(start..start + field.size as usize) else {
            return false;
        };

        match (field.kind, value) {
            (ConstantKind::Float, ShaderValue::Float(v)) => {
                slot.copy_from_slice(bytemuck::bytes_of(&v))
            }
            (ConstantKind::Int, ShaderValue::Int(v)) => slot.copy_from_slice(bytemuck::bytes_of(&v)),
            (ConstantKind::Float2, ShaderValue::Float2(v)) => {
                slot.copy_from_slice(bytemuck::bytes_of(&v))
            }
            (ConstantKind::Float3, ShaderValue::Float3(v)) => {
                slot.copy_from_slice(bytemuck::bytes_of(&v))
            }
            (ConstantKind::Float4, ShaderValue::Float4(v)) => {
                slot.copy_from_slice(bytemuck::bytes_of(&v))
            }
            (ConstantKind::Matrix4, ShaderValue::Matrix4(v)) => {
                slot.copy_from_slice(bytemuck::bytes_of(&v))
            }
            (_, ShaderValue::Data(bytes)) => {
                let len = bytes.len().min(slot.len());
                slot[..len].copy_from_slice(&bytes[..len]);
            }
            _ => return false,
        }
        true
    }

    /// Reads a matrix slot back out of a staged block.
    pub fn read_matrix(&self, data: &[u8], name: &str) -> Option<[[f32; 4]; 4]> {
        let field = self.field(name)?;
        if field.kind != ConstantKind::Matrix4 {
            return None;
        }
        let start = field.offset as usize;
        let bytes = data.get(start..start + 64)?;
        Some(bytemuck::pod_read_unaligned(bytes))
    }

    /// Reads a scalar float slot back out of a staged block.
    pub fn read_float(&self, data: &[u8], name: &str) -> Option<f32> {
        let field = self.field(name)?;
        if field.kind != ConstantKind::Float {
            return None;
        }
        let start = field.offset as usize;
        let bytes = data.get(start..start + 4)?;
        Some(bytemuck::pod_read_unaligned(bytes))
    }
}

/// Declares fields in order and assigns WGSL-compatible offsets.
#[derive(Debug, Default)]
pub struct ConstantLayoutBuilder {
    fields: Vec<ConstantField>,
    cursor: u32,
}

impl ConstantLayoutBuilder {
    fn push(mut self, name: &str, kind: ConstantKind) -> Self {
        let (size, align) = kind.size_and_align();
        let offset = self.cursor.next_multiple_of(align);
        self.fields.push(ConstantField {
            name: name.to_string(),
            offset,
            size,
            kind,
        });
        self.cursor = offset + size;
        self
    }

    pub fn float(self, name: &str) -> Self {
        self.push(name, ConstantKind::Float)
    }

    pub fn int(self, name: &str) -> Self {
        self.push(name, ConstantKind::Int)
    }

    pub fn float2(self, name: &str) -> Self {
        self.push(name, ConstantKind::Float2)
    }

    pub fn float3(self, name: &str) -> Self {
        self.push(name, ConstantKind::Float3)
    }

    pub fn float4(self, name: &str) -> Self {
        self.push(name, ConstantKind::Float4)
    }

    pub fn matrix4(self, name: &str) -> Self {
        self.push(name, ConstantKind::Matrix4)
    }

    pub fn array(self, name: &str, stride: u32, count: u32) -> Self {
        self.push(name, ConstantKind::Array { stride, count })
    }

    pub fn build(self) -> ConstantLayout {
        ConstantLayout {
            size: self.cursor.next_multiple_of(16),
            fields: self.fields,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    D2,
    Cube,
    Depth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    Filtering,
    Comparison,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSlot {
    pub name: String,
    pub binding: u32,
    pub kind: TextureKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerSlot {
    pub name: String,
    pub binding: u32,
    pub kind: SamplerKind,
}

/// One shader stage plus the reflection needed to bind it by name.
#[derive(Debug)]
pub struct ShaderProgram {
    id: ProgramId,
    label: String,
    stage: ShaderStage,
    source: Cow<'static, str>,
    entry_point: String,
    constants: ConstantLayout,
    textures: Vec<TextureSlot>,
    samplers: Vec<SamplerSlot>,
}

impl ShaderProgram {
    pub fn builder(
        label: &str,
        stage: ShaderStage,
        source: impl Into<Cow<'static, str>>,
        entry_point: &str,
    ) -> ShaderProgramBuilder {
        ShaderProgramBuilder {
            program: ShaderProgram {
                id: ProgramId::next(),
                label: label.to_string(),
                stage,
                source: source.into(),
                entry_point: entry_point.to_string(),
                constants: ConstantLayout::default(),
                textures: Vec::new(),
                samplers: Vec::new(),
            },
        }
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn constants(&self) -> &ConstantLayout {
        &self.constants
    }

    pub fn textures(&self) -> &[TextureSlot] {
        &self.textures
    }

    pub fn samplers(&self) -> &[SamplerSlot] {
        &self.samplers
    }

    pub fn texture_slot(&self, name: &str) -> Option<&TextureSlot> {
        self.textures.iter().find(|slot| slot.name == name)
    }

    pub fn sampler_slot(&self, name: &str) -> Option<&SamplerSlot> {
        self.samplers.iter().find(|slot| slot.name == name)
    }
}

pub struct ShaderProgramBuilder {
    program: ShaderProgram,
}

impl ShaderProgramBuilder {
    pub fn constants(mut self, layout: ConstantLayout) -> Self {
        self.program.constants = layout;
        self
    }

    pub fn texture(mut self, name: &str, binding: u32, kind: TextureKind) -> Self {
        self.program.textures.push(TextureSlot {
            name: name.to_string(),
            binding,
            kind,
        });
        self
    }

    pub fn sampler(mut self, name: &str, binding: u32, kind: SamplerKind) -> Self {
        self.program.samplers.push(SamplerSlot {
            name: name.to_string(),
            binding,
            kind,
        });
        self
    }

    pub fn build(self) -> Arc<ShaderProgram> {
        Arc::new(self.program)
    }
}
