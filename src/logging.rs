//! Process-wide logger setup shared by the binaries.

use std::io::Write;

/// Map level names used by other tooling (`WARNING`, `CRITICAL`) onto the
/// `log` crate's names. Anything else is passed through as a filter string.
pub fn normalize_level(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        "" => "debug".to_string(),
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        "notset" => "trace".to_string(),
        other => other.to_string(),
    }
}

/// Initialise `env_logger` with `<timestamp> <LEVEL>: <message>` lines.
///
/// Safe to call more than once; later calls are ignored.
pub fn init(level: &str) {
    let filter = normalize_level(level);
    let result = env_logger::Builder::new()
        .parse_filters(&filter)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                record.level(),
                record.args()
            )
        })
        .try_init();
    if result.is_ok() {
        log::debug!("Logging initialised at '{filter}'");
    }
}
