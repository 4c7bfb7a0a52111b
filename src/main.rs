use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use vantage::{config::DemoConfig, VantageApp};

const CONFIG_FILE: &str = "vantage.toml";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = Path::new(CONFIG_FILE);
    let config = if path.exists() {
        DemoConfig::load(path).with_context(|| format!("failed to load {}", path.display()))?
    } else {
        info!("No {} found, using the built-in scene settings", CONFIG_FILE);
        DemoConfig::default()
    };

    VantageApp::new(config).run()
}
