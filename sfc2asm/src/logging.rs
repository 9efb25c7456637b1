//! Utilities for configuring logging
use std::sync::Once;

use colored::*;
use env_logger::Logger;
use log::Log;
use log::Record;

static ONCE_INIT: Once = Once::new();

/// A logger that uses env_logger for configuring filters but prints a compact
/// format with a colored level prefix.
struct Sfc2asmLogger {
    logger: Logger,
}

impl Sfc2asmLogger {
    pub fn new(logger: Logger) -> Self {
        log::set_max_level(logger.filter());
        Self { logger }
    }

    fn format_record(&self, record: &Record) -> String {
        match record.level() {
            log::Level::Error => {
                format!("{} {}", "E".red().bold(), record.args().to_string().red())
            }
            log::Level::Warn => format!(
                "{} {}",
                "W".yellow().bold(),
                record.args().to_string().yellow()
            ),
            log::Level::Info => format!(
                "{} {}",
                "I".blue().bold(),
                record.args().to_string().normal()
            ),
            log::Level::Debug => format!("{} {}", "D".blue(), record.args().to_string().normal()),
            log::Level::Trace => format!("{}", record.args().to_string().dimmed()),
        }
    }
}

impl Log for Sfc2asmLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.logger.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.logger.matches(record) {
            return;
        }
        println!("{}", self.format_record(record));
    }

    fn flush(&self) {}
}

pub fn init() {
    ONCE_INIT.call_once(|| {
        let filter_config = std::env::var("SFC2ASM_LOG").unwrap_or("info".to_string());
        let filter = env_logger::builder().parse_filters(&filter_config).build();
        log::set_boxed_logger(Box::new(Sfc2asmLogger::new(filter))).unwrap();
    });
}
