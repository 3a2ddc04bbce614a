use std::{collections::BTreeMap, fmt, slice};

use serde_json::Value;

use crate::Error;

/// Severity of a processing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single diagnostic: severity, human message, and a bag of named
/// fields for machine consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingMessage {
    level: LogLevel,
    text: String,
    fields: BTreeMap<String, Value>,
}

impl ProcessingMessage {
    #[must_use]
    pub fn new(text: impl Into<String>) -> ProcessingMessage {
        ProcessingMessage {
            level: LogLevel::Info,
            text: text.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Attach a named field.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> ProcessingMessage {
        self.fields.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn level(&self) -> LogLevel {
        self.level
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The message rendered as a JSON object, fields plus `level` and
    /// `message`.
    #[must_use]
    pub fn as_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("level".into(), Value::from(self.level.as_str()));
        map.insert("message".into(), Value::from(self.text.as_str()));
        for (name, value) in &self.fields {
            map.insert(name.clone(), value.clone());
        }
        Value::Object(map)
    }

    fn at(mut self, level: LogLevel) -> ProcessingMessage {
        self.level = level;
        self
    }
}

impl fmt::Display for ProcessingMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.level, self.text)
    }
}

/// An ordered, leveled log of diagnostics.
///
/// Messages below the log level are discarded; a message at or above the
/// raise threshold aborts processing with [`Error::Fatal`].
#[derive(Debug, Clone)]
pub struct ProcessingReport {
    messages: Vec<ProcessingMessage>,
    log_level: LogLevel,
    raise_threshold: LogLevel,
}

impl Default for ProcessingReport {
    fn default() -> Self {
        ProcessingReport::new()
    }
}

impl ProcessingReport {
    /// A report recording everything from `Info` up and raising only on
    /// `Fatal`.
    #[must_use]
    pub fn new() -> ProcessingReport {
        ProcessingReport::with_levels(LogLevel::Info, LogLevel::Fatal)
    }

    /// A report with explicit log level and raise threshold.
    #[must_use]
    pub fn with_levels(log_level: LogLevel, raise_threshold: LogLevel) -> ProcessingReport {
        ProcessingReport {
            messages: Vec::new(),
            log_level,
            raise_threshold,
        }
    }

    /// Record a message at the given level.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fatal`] if the level reaches the raise threshold.
    pub fn add(&mut self, level: LogLevel, message: ProcessingMessage) -> Result<(), Error> {
        let message = message.at(level);
        if level >= self.raise_threshold {
            return Err(Error::Fatal(message));
        }
        if level >= self.log_level {
            self.messages.push(message);
        }
        Ok(())
    }

    /// Record a `Debug` message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fatal`] if `Debug` reaches the raise threshold.
    pub fn debug(&mut self, message: ProcessingMessage) -> Result<(), Error> {
        self.add(LogLevel::Debug, message)
    }

    /// Record an `Info` message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fatal`] if `Info` reaches the raise threshold.
    pub fn info(&mut self, message: ProcessingMessage) -> Result<(), Error> {
        self.add(LogLevel::Info, message)
    }

    /// Record a `Warning` message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fatal`] if `Warning` reaches the raise threshold.
    pub fn warning(&mut self, message: ProcessingMessage) -> Result<(), Error> {
        self.add(LogLevel::Warning, message)
    }

    /// Record an `Error` message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fatal`] if `Error` reaches the raise threshold.
    pub fn error(&mut self, message: ProcessingMessage) -> Result<(), Error> {
        self.add(LogLevel::Error, message)
    }

    /// Whether no message at `Error` level or above was recorded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.messages.iter().all(|m| m.level() < LogLevel::Error)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, ProcessingMessage> {
        self.messages.iter()
    }
}

impl<'a> IntoIterator for &'a ProcessingReport {
    type Item = &'a ProcessingMessage;
    type IntoIter = slice::Iter<'a, ProcessingMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
