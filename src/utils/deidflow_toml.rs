//! Settings layer: `deidflow.toml` (or `--config FILE`), then CLI overrides, then resolution into
//! an immutable [`PipelineConfig`].

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::tools::normalize_bucket_uri;
use crate::error::ConfigError;
use crate::types::{PipelineConfig, ResumePolicy};
use crate::utils::config::{PackagePaths, PipelineDefaults};

#[derive(Debug, Default, Deserialize)]
pub struct DeidflowToml {
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

/// Every setting is optional here; required ones are checked in [`PipelineSettings::resolve`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSettings {
    pub input_dir: Option<PathBuf>,
    pub local_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub remote_bucket_uri: Option<String>,
    pub log_file: Option<PathBuf>,
    pub batch_size: Option<usize>,
    /// Seconds.
    pub timeout: Option<u64>,
    pub extension: Option<String>,
    pub transform_command: Option<Vec<String>>,
    pub upload_command: Option<Vec<String>>,
    pub upload_attempts: Option<u32>,
    pub upload_backoff_ms: Option<u64>,
    /// Seconds, per attempt.
    pub upload_timeout: Option<u64>,
    pub batch_workers: Option<usize>,
    pub file_parallelism: Option<usize>,
    pub resume: Option<ResumePolicy>,
    pub verbose: Option<bool>,
}

/// Load settings from `path`. Missing file is an error here; see [`load_default_toml`].
pub fn load_toml(path: &Path) -> Result<DeidflowToml, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&s).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load `deidflow.toml` from `dir` if present.
pub fn load_default_toml(dir: &Path) -> Result<Option<DeidflowToml>, ConfigError> {
    let path = dir.join(PackagePaths::get().config_filename());
    if !path.is_file() {
        return Ok(None);
    }
    load_toml(&path).map(Some)
}

/// Overwrite a settings field when the override carries a value.
macro_rules! apply_override {
    ($base:expr, $over:expr, $($field:ident),+ $(,)?) => {
        $(
            if $over.$field.is_some() {
                $base.$field = $over.$field;
            }
        )+
    };
}

impl PipelineSettings {
    /// Layer `other` on top of `self`: fields set in `other` win.
    pub fn merge(mut self, other: PipelineSettings) -> Self {
        apply_override!(
            self,
            other,
            input_dir,
            local_dir,
            output_dir,
            remote_bucket_uri,
            log_file,
            batch_size,
            timeout,
            extension,
            transform_command,
            upload_command,
            upload_attempts,
            upload_backoff_ms,
            upload_timeout,
            batch_workers,
            file_parallelism,
            resume,
            verbose,
        );
        self
    }

    /// Fill defaults, require the required settings, and validate.
    pub fn resolve(self) -> Result<PipelineConfig, ConfigError> {
        let config = PipelineConfig {
            input_dir: self.input_dir.ok_or(ConfigError::Missing("input_dir"))?,
            local_dir: self.local_dir.ok_or(ConfigError::Missing("local_dir"))?,
            output_dir: self.output_dir.ok_or(ConfigError::Missing("output_dir"))?,
            remote_bucket_uri: self
                .remote_bucket_uri
                .filter(|s| !s.trim().is_empty())
                .map(|s| normalize_bucket_uri(&s))
                .ok_or(ConfigError::Missing("remote_bucket_uri"))?,
            log_file: self.log_file.ok_or(ConfigError::Missing("log_file"))?,
            batch_size: self.batch_size.unwrap_or(PipelineDefaults::BATCH_SIZE),
            timeout: Duration::from_secs(self.timeout.ok_or(ConfigError::Missing("timeout"))?),
            extension: normalize_extension(
                self.extension
                    .as_deref()
                    .unwrap_or(PipelineDefaults::EXTENSION),
            ),
            transform_command: self
                .transform_command
                .unwrap_or_else(PipelineDefaults::transform_command),
            upload_command: self
                .upload_command
                .unwrap_or_else(PipelineDefaults::upload_command),
            upload_attempts: self
                .upload_attempts
                .unwrap_or(PipelineDefaults::UPLOAD_ATTEMPTS),
            upload_backoff: Duration::from_millis(
                self.upload_backoff_ms
                    .unwrap_or(PipelineDefaults::UPLOAD_BACKOFF_MS),
            ),
            upload_timeout: self.upload_timeout.map(Duration::from_secs),
            batch_workers: self
                .batch_workers
                .unwrap_or(PipelineDefaults::BATCH_WORKERS),
            file_parallelism: self
                .file_parallelism
                .unwrap_or(PipelineDefaults::FILE_PARALLELISM),
            resume: self.resume.unwrap_or_default(),
            verbose: self.verbose.unwrap_or(false),
        };
        config.validate()?;
        Ok(config)
    }
}

/// `".SVS"` and `"svs"` both become `"svs"`.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}
