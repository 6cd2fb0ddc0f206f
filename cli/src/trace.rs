//! Stdout logging setup. A one-shot scenario inspector has nothing to
//! rotate, so a single `fern` dispatcher writing straight to stdout is
//! enough -- no rolling file appender needed.

use std::str::FromStr;

use anyhow::Result;
use log::LevelFilter;

/// Installs a single stdout dispatcher at `level`, falling back to `info`
/// on an unparseable level string (e.g. an unexpected `RUST_LOG` value).
pub fn init_logging(level: &str) -> Result<()> {
    let level = LevelFilter::from_str(level).unwrap_or(LevelFilter::Info);

    let result = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] {} [{}] {}",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply();

    if result.is_err() {
        eprintln!("logger has already been set");
    }
    Ok(())
}
