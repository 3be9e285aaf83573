//! Logging sinks and the fan-out logger singleton.
//!
//! The host registers a [`Logger`] singleton built from the sinks collected
//! by [`LoggingBuilder`]. Host lifecycle transitions are written through it,
//! suppressible via `HostOptions::suppress_status_messages`.

use std::sync::Arc;

/// Log severity, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Destination for log messages.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, category: &str, message: &str);
}

/// Sink forwarding to the `log` crate facade with the category as target.
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn log(&self, level: LogLevel, category: &str, message: &str) {
        let level = match level {
            LogLevel::Trace => log::Level::Trace,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        };
        log::log!(target: category, level, "{}", message);
    }
}

/// Collects sinks and the minimum level before the host builds.
pub struct LoggingBuilder {
    sinks: Vec<Arc<dyn LogSink>>,
    min_level: LogLevel,
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self {
            sinks: Vec::new(),
            min_level: LogLevel::Info,
        }
    }

    /// Appends a sink. Sinks receive messages in registration order.
    pub fn add_sink(&mut self, sink: impl LogSink + 'static) -> &mut Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Sets the minimum level; lower-severity messages are dropped.
    pub fn set_min_level(&mut self, level: LogLevel) -> &mut Self {
        self.min_level = level;
        self
    }

    pub(crate) fn build(self) -> Logger {
        Logger {
            sinks: self.sinks,
            min_level: self.min_level,
        }
    }
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fan-out logger over the configured sinks.
///
/// Registered as a singleton, so components can take it as an injection
/// parameter.
pub struct Logger {
    sinks: Vec<Arc<dyn LogSink>>,
    min_level: LogLevel,
}

impl Logger {
    pub fn log(&self, level: LogLevel, category: &str, message: &str) {
        if level < self.min_level {
            return;
        }
        for sink in &self.sinks {
            sink.log(level, category, message);
        }
    }

    pub fn debug(&self, category: &str, message: &str) {
        self.log(LogLevel::Debug, category, message);
    }

    pub fn info(&self, category: &str, message: &str) {
        self.log(LogLevel::Info, category, message);
    }

    pub fn warn(&self, category: &str, message: &str) {
        self.log(LogLevel::Warn, category, message);
    }

    pub fn error(&self, category: &str, message: &str) {
        self.log(LogLevel::Error, category, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Capture(Arc<Mutex<Vec<(LogLevel, String)>>>);

    impl LogSink for Capture {
        fn log(&self, level: LogLevel, _category: &str, message: &str) {
            self.0.lock().unwrap().push((level, message.to_string()));
        }
    }

    #[test]
    fn messages_below_min_level_are_dropped() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut builder = LoggingBuilder::new();
        builder.add_sink(Capture(seen.clone()));
        builder.set_min_level(LogLevel::Warn);
        let logger = builder.build();

        logger.info("host", "quiet");
        logger.warn("host", "loud");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, "loud");
    }

    #[test]
    fn all_sinks_receive_each_message() {
        let a = Arc::new(Mutex::new(Vec::new()));
        let b = Arc::new(Mutex::new(Vec::new()));
        let mut builder = LoggingBuilder::new();
        builder.add_sink(Capture(a.clone()));
        builder.add_sink(Capture(b.clone()));
        let logger = builder.build();

        logger.error("host", "boom");
        assert_eq!(a.lock().unwrap().len(), 1);
        assert_eq!(b.lock().unwrap().len(), 1);
    }
}
