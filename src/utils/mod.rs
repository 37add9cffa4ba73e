pub mod config;
pub mod deidflow_toml;
pub mod logger;

pub use config::*;
pub use deidflow_toml::{DeidflowToml, PipelineSettings, load_default_toml, load_toml};
pub use logger::{Colors, setup_logging};
