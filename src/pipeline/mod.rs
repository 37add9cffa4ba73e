//! Pipeline components: naming, discovery, batching, the per-file stages, the ledger, and the
//! runner that composes them.

pub mod batch;
pub mod cancel;
pub mod cleanup;
pub mod discover;
pub mod ledger;
pub mod mock;
pub mod naming;
pub mod orchestrator;
pub mod process;
pub mod runner;
pub mod staging;
pub mod transform;
pub mod upload;

pub use batch::partition;
pub use cancel::CancelFlag;
pub use cleanup::{CleanupManager, CleanupReport};
pub use discover::{FileDiscoverer, discover, find_collisions};
pub use ledger::OutcomeLedger;
pub use naming::{output_name, remote_uri, stage_name};
pub use orchestrator::run_pipeline;
pub use process::{ProcessExecutor, ProcessOutput, SystemExecutor};
pub use runner::{BatchReport, FileOutcome, FileReport, PipelineRunner};
pub use staging::StagingManager;
pub use transform::TransformInvoker;
pub use upload::{UploadManager, is_transient};
