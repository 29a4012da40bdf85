// In: src/observability.rs

//! Logging bootstrap and the `log_metric!` macro.
//!
//! The library itself only talks to the `log` facade. Binaries, benches and
//! tests that want to see the output call [`init_logging`] once.

use log::LevelFilter;
use std::fs::OpenOptions;
use std::sync::Once;

/// Log target used for `name=value` metric lines.
pub const METRICS_TARGET: &str = "eliasg::metrics";

static INIT: Once = Once::new();

/// Emits a `name=value` metric line at debug level under [`METRICS_TARGET`].
#[macro_export]
macro_rules! log_metric {
    ($name:expr, $value:expr) => {
        log::debug!(target: $crate::observability::METRICS_TARGET, "{}={}", $name, $value)
    };
}

/// Configures `env_logger` with a terse `[LEVEL] message` format.
///
/// Only the first call has any effect. When `log_file` is given, records are
/// appended to that file instead of stderr; if the file cannot be opened the
/// logger falls back to stderr.
pub fn init_logging(level: LevelFilter, log_file: Option<&str>) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(level);

        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            buf.flush()?;
            Ok(())
        });

        if let Some(filename) = log_file {
            match OpenOptions::new().create(true).append(true).open(filename) {
                Ok(file) => {
                    builder.target(env_logger::Target::Pipe(Box::new(file)));
                }
                Err(e) => eprintln!("[WARN] could not open log file {}: {}", filename, e),
            }
        }

        let _ = builder.try_init();
    });
}
