use chrono::{DateTime, Local};
use log::{Level, LevelFilter, Metadata, Record};
use std::io::Write;

/// Environment variable overriding the log level (`error` .. `trace`)
pub const LOG_ENV: &str = "CARDT_LOG";

pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: Level,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    fn format(&self) -> String {
        format!(
            "{} {:<5} [{}] {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.level,
            self.target,
            self.message
        )
    }
}

/// Logger writing timestamped lines to stderr
#[derive(Clone)]
pub struct AppLogger {
    level: LevelFilter,
}

impl AppLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    /// `CARDT_LOG` wins over the level picked from the command line
    pub fn from_env(fallback: LevelFilter) -> Self {
        let level = std::env::var(LOG_ENV)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(fallback);
        Self::new(level)
    }

    pub fn init(self) -> Result<(), log::SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl log::Log for AppLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let entry = LogEntry {
                timestamp: Local::now(),
                level: record.level(),
                target: record.target().to_string(),
                message: format!("{}", record.args()),
            };
            let _ = writeln!(std::io::stderr().lock(), "{}", entry.format());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Level for `-v`/`-q` counts: info by default
pub fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    #[test]
    fn test_level_for_flags() {
        assert_eq!(level_for(0, false), LevelFilter::Info);
        assert_eq!(level_for(1, false), LevelFilter::Debug);
        assert_eq!(level_for(3, false), LevelFilter::Trace);
        assert_eq!(level_for(2, true), LevelFilter::Error);
    }

    #[test]
    fn test_enabled_respects_level() {
        let logger = AppLogger::new(LevelFilter::Warn);
        let warn = Metadata::builder().level(Level::Warn).build();
        let info = Metadata::builder().level(Level::Info).build();
        assert!(logger.enabled(&warn));
        assert!(!logger.enabled(&info));
    }

    #[test]
    fn test_entry_format() {
        let entry = LogEntry {
            timestamp: Local::now(),
            level: Level::Warn,
            target: "card_impose::cmyk".to_string(),
            message: "converter missing".to_string(),
        };
        let line = entry.format();
        assert!(line.contains("WARN "));
        assert!(line.ends_with("[card_impose::cmyk] converter missing"));
    }
}
