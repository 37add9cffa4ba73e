use clap::Parser;
use std::path::PathBuf;

use crate::types::ResumePolicy;
use crate::utils::PipelineSettings;

/// Stage, de-identify, upload and clean up whole-slide images in batches.
///
/// Every option can also be set in `deidflow.toml` under `[pipeline]`; flags win over the file.
#[derive(Clone, Debug, Default, Parser)]
#[command(name = "deidflow")]
#[command(about = "Stage, de-identify, upload and clean up slide files in batches.")]
pub struct Cli {
    /// Config file. Default: `deidflow.toml` in the working directory, if present.
    #[arg(long, short = 'C', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Root directory scanned for source files.
    #[arg(long, short = 'i', value_name = "DIR")]
    pub input_dir: Option<PathBuf>,

    /// Scratch directory for staged inputs.
    #[arg(long, value_name = "DIR")]
    pub local_dir: Option<PathBuf>,

    /// Directory the transform writes de-identified files to.
    #[arg(long, short = 'o', value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Remote destination, e.g. `s3://bucket/prefix`. A bare bucket name gets `s3://`.
    #[arg(long = "bucket", short = 'b', value_name = "URI")]
    pub remote_bucket_uri: Option<String>,

    /// Outcome ledger (JSON lines).
    #[arg(long, short = 'l', value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Files per batch. Default: 1.
    #[arg(long, short = 'n')]
    pub batch_size: Option<usize>,

    /// Per-file transform timeout in seconds.
    #[arg(long, short = 't', value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Source file extension. Default: svs.
    #[arg(long, short = 'e')]
    pub extension: Option<String>,

    /// Upload attempts for transient failures. Default: 3.
    #[arg(long)]
    pub upload_attempts: Option<u32>,

    /// Per-attempt upload timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub upload_timeout: Option<u64>,

    /// Batches processed concurrently. Default: 1.
    #[arg(long)]
    pub batch_workers: Option<usize>,

    /// Files processed concurrently within a batch, capped by free local disk. Default: 1.
    #[arg(long)]
    pub file_parallelism: Option<usize>,

    /// Skip files the ledger already records as successful.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub resume: Option<bool>,

    /// Verbose output and progress bar.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}

impl Cli {
    /// Settings given on the command line; unset flags stay `None` so the file layer shows through.
    pub fn settings(&self) -> PipelineSettings {
        PipelineSettings {
            input_dir: self.input_dir.clone(),
            local_dir: self.local_dir.clone(),
            output_dir: self.output_dir.clone(),
            remote_bucket_uri: self.remote_bucket_uri.clone(),
            log_file: self.log_file.clone(),
            batch_size: self.batch_size,
            timeout: self.timeout,
            extension: self.extension.clone(),
            upload_attempts: self.upload_attempts,
            upload_timeout: self.upload_timeout,
            batch_workers: self.batch_workers,
            file_parallelism: self.file_parallelism,
            resume: self.resume.map(|r| {
                if r {
                    ResumePolicy::SkipSucceeded
                } else {
                    ResumePolicy::Reprocess
                }
            }),
            verbose: self.verbose,
            ..Default::default()
        }
    }
}
