//! CLI engine: argument parsing, the run handler, progress display and small path helpers.

pub mod arg_parser;
pub mod cli;
pub mod progress;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use cli::handle_run;
pub use tools::{expand_args, is_os_hidden_file, matches_extension, normalize_bucket_uri};
