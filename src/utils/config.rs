//! Application configuration constants.
//! Defaults and tuning in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived file names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    env_prefix: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!("{pkg}.toml"),
                env_prefix: pkg.to_uppercase(),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Config file looked up in the working directory when `--config` is not given.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Prefix for environment overrides, e.g. `DEIDFLOW_LOG`.
    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }
}

// ---- Pipeline defaults ----

/// Defaults for settings that are optional. Required settings have none.
pub struct PipelineDefaults;

impl PipelineDefaults {
    pub const BATCH_SIZE: usize = 1;
    pub const EXTENSION: &'static str = "svs";
    pub const UPLOAD_ATTEMPTS: u32 = 3;
    pub const UPLOAD_BACKOFF_MS: u64 = 1_000;
    pub const BATCH_WORKERS: usize = 1;
    pub const FILE_PARALLELISM: usize = 1;

    /// Single-file de-identification tool interface: `--input`, `--output`, `--log`.
    pub fn transform_command() -> Vec<String> {
        ["deidentify", "--input", "{input}", "--output", "{output}", "--log", "{log}"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn upload_command() -> Vec<String> {
        ["aws", "s3", "cp", "{local}", "{remote}"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

// ---- Process supervision ----

pub struct ProcessConsts;

impl ProcessConsts {
    /// How often a supervised child is polled for exit, timeout and cancellation.
    pub const POLL_INTERVAL: Duration = Duration::from_millis(50);
    /// Grace period for output readers after the child has exited or been killed.
    pub const READER_GRACE: Duration = Duration::from_secs(2);
    /// Bytes kept from the end of each captured output stream.
    pub const CAPTURE_TAIL_BYTES: usize = 64 * 1024;
    /// Bytes of stderr kept in error messages.
    pub const STDERR_TAIL_BYTES: usize = 2 * 1024;
}

// ---- Upload retry ----

pub struct RetryConsts;

impl RetryConsts {
    /// Upper bound for a single backoff sleep.
    pub const MAX_BACKOFF: Duration = Duration::from_secs(60);
    /// Granularity at which a backoff sleep observes cancellation.
    pub const SLEEP_SLICE: Duration = Duration::from_millis(100);
}

// ---- Disk budget ----

/// Each in-flight file holds a staged input plus a transform output of similar size.
pub const LOCAL_COPIES_PER_FILE: u64 = 2;
