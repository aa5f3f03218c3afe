//! Code implementing the logging solution for `pe-inspect`.

use std::io::Write;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// The single [`Log`] implementation, writing every message to standard error.
static LOGGER: StderrLogger = StderrLogger;

/// Installs the standard error logger, printing messages up to and including `level`.
///
/// # Errors
///
/// Returns [`SetLoggerError`] if a logger has already been installed.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

/// A [`Log`] implementation that writes to standard error.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // Ignore any logging errors because there is no method to report or deal with them.
        let _ = writeln!(
            std::io::stderr().lock(),
            "{:<5}: {}",
            record.level(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[cfg(test)]
mod test {
    use log::LevelFilter;

    use super::init;

    #[test]
    fn second_install_reports_error() {
        let _ = init(LevelFilter::Warn);
        let error = init(LevelFilter::Trace).unwrap_err();

        let error = anyhow::Error::new(error).context("failed to install logger");
        assert_eq!(error.to_string(), "failed to install logger");
        assert_eq!(log::max_level(), LevelFilter::Warn);
    }
}
