// src/wgpu_utils/uniform_buffer.rs
//! Per-frame uniform arena
//!
//! Every constant upload recorded in a frame is appended to one staging
//! block at a dynamic-offset-aligned position. The block is written to a
//! single GPU buffer once per frame and draws select their slice with a
//! dynamic offset.

/// CPU side of the arena: packs uploads at aligned offsets.
#[derive(Debug, Clone)]
pub struct UniformStaging {
    bytes: Vec<u8>,
    alignment: usize,
}

impl UniformStaging {
    /// `alignment` is the device's `min_uniform_buffer_offset_alignment`.
    pub fn new(alignment: u32) -> Self {
        Self {
            bytes: Vec::new(),
            alignment: alignment.max(1) as usize,
        }
    }

    /// Appends `data` and returns its offset.
    pub fn push(&mut self, data: &[u8]) -> u32 {
        let offset = self.bytes.len().next_multiple_of(self.alignment);
        self.bytes.resize(offset, 0);
        self.bytes.extend_from_slice(data);
        offset as u32
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// GPU buffer behind a [`UniformStaging`] block.
///
/// The buffer grows (never shrinks) when a frame needs more room. Growing
/// replaces the buffer, so bind groups referencing it must be rebuilt; the
/// [`generation`](Self::generation) counter tells callers when.
pub struct UniformArena {
    buffer: wgpu::Buffer,
    staging: UniformStaging,
    generation: u64,
}

impl UniformArena {
    const INITIAL_SIZE: u64 = 64 * 1024;

    pub fn new(device: &wgpu::Device) -> Self {
        let alignment = device.limits().min_uniform_buffer_offset_alignment;
        Self {
            buffer: Self::create_buffer(device, Self::INITIAL_SIZE),
            staging: UniformStaging::new(alignment),
            generation: 0,
        }
    }

    fn create_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("UniformArena"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn begin_frame(&mut self) {
        self.staging.clear();
    }

    pub fn push(&mut self, data: &[u8]) -> u32 {
        self.staging.push(data)
    }

    /// Sends the frame's uploads to the GPU, growing the buffer first when
    /// needed. `tail` is the largest binding size read past any offset.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, tail: u64) {
        let required = self.staging.len() as u64 + tail;
        if required > self.buffer.size() {
            let size = required.next_power_of_two();
            log::debug!("Growing uniform arena to {} bytes", size);
            self.buffer = Self::create_buffer(device, size);
            self.generation += 1;
        }
        if !self.staging.is_empty() {
            let len = (self.staging.len() as u64).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
            let mut bytes = self.staging.as_bytes().to_vec();
            bytes.resize(len as usize, 0);
            queue.write_buffer(&self.buffer, 0, &bytes);
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_respect_alignment() {
        let mut staging = UniformStaging::new(256);
        assert_eq!(staging.push(&[1; 192]), 0);
        assert_eq!(staging.push(&[2; 576]), 256);
        assert_eq!(staging.push(&[3; 16]), 1024);
        assert_eq!(staging.len(), 1040);
        assert_eq!(staging.as_bytes()[256], 2);
        assert_eq!(staging.as_bytes()[200], 0);
    }

    #[test]
    fn test_clear_restarts_at_zero() {
        let mut staging = UniformStaging::new(64);
        staging.push(&[1; 10]);
        staging.clear();
        assert!(staging.is_empty());
        assert_eq!(staging.push(&[1; 10]), 0);
    }
}
