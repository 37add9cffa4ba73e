use colored::{Color, Colorize};
use env_logger::{Builder, Env};
use log::Level;
use std::io::Write;

use crate::utils::config::PackagePaths;

/// Colors for outcome summaries.
pub struct Colors;

impl Colors {
    pub const SUCCESS: Color = Color::Green;
    pub const FAILURE: Color = Color::Red;
    pub const SKIPPED: Color = Color::Yellow;

    pub fn colorize(color: Color, text: &str) -> String {
        text.color(color).to_string()
    }
}

/// Crate logs at Debug (verbose) or Info; dependencies at Warn. `DEIDFLOW_LOG` overrides both.
/// Safe to call more than once; later calls are ignored.
pub fn setup_logging(verbose: bool) {
    use log::LevelFilter;

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let paths = PackagePaths::get();
    let env_var = format!("{}_LOG", paths.env_prefix());

    let _ = Builder::new()
        .filter_level(LevelFilter::Warn) // Default: only warnings from dependencies
        .filter_module(env!("CARGO_PKG_NAME"), level) // Our crate: use requested level
        .parse_env(Env::new().filter(env_var))
        .format(|buf, record| {
            let name = paths.pkg_name();
            let line = match record.level() {
                Level::Error | Level::Warn => {
                    let level_str = match record.level() {
                        Level::Warn => "WARN".yellow(),
                        Level::Error => "ERROR".red(),
                        _ => unreachable!(),
                    };
                    let path = record.target().to_string().white();
                    format!("[{} {} {}] {}", name.cyan(), level_str, path, record.args())
                }
                _ => format!("[{}] {}", name.cyan(), record.args()),
            };
            writeln!(buf, "{}", line)
        })
        .try_init();
}
