//! Structured run log.
//!
//! Every phase receives a [`LogSink`] explicitly; there is no process-wide
//! logger. Each entry carries a [`MessageCode`] so callers can count or
//! de-duplicate messages without matching on the text.

use std::cell::RefCell;
use std::fmt;

use colored::Colorize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// Stable identity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageCode {
    ToolchainUnavailable,
    InvalidRuleFile,
    PackageResolved,
    PackageResolutionFailed,
    PayloadLoadFailed,
    AnalyzerInstantiationFailed,
    AnalyzersFound,
    NoAnalyzersFound,
    NoAnalyzersSuggestRecurse,
    LicenseAcceptanceRequired,
    LicensesAccepted,
    PackageRequiresLicense,
    RuleCustomizationUnavailable,
    RuleTemplateGenerated,
    PluginGenerated,
    PluginGenerationFailed,
}

impl MessageCode {
    /// Whether the message belongs to the license-acceptance phase.
    pub fn is_license_related(self) -> bool {
        matches!(
            self,
            MessageCode::LicenseAcceptanceRequired
                | MessageCode::LicensesAccepted
                | MessageCode::PackageRequiresLicense
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub code: MessageCode,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub trait LogSink {
    fn log(&self, entry: LogEntry);

    fn info(&self, code: MessageCode, message: &str) {
        self.log(LogEntry {
            level: LogLevel::Info,
            code,
            message: message.to_string(),
        });
    }

    fn warn(&self, code: MessageCode, message: &str) {
        self.log(LogEntry {
            level: LogLevel::Warning,
            code,
            message: message.to_string(),
        });
    }

    fn error(&self, code: MessageCode, message: &str) {
        self.log(LogEntry {
            level: LogLevel::Error,
            code,
            message: message.to_string(),
        });
    }
}

impl<S: LogSink + ?Sized> LogSink for &S {
    fn log(&self, entry: LogEntry) {
        (**self).log(entry);
    }
}

/// Coloured stderr output for interactive use.
pub struct ConsoleSink {
    quiet: bool,
}

impl ConsoleSink {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl LogSink for ConsoleSink {
    fn log(&self, entry: LogEntry) {
        match entry.level {
            LogLevel::Info if self.quiet => {}
            LogLevel::Info => eprintln!("  {} {}", "→".cyan(), entry.message),
            LogLevel::Warning => eprintln!(" {} {}", "[WARN]".yellow().bold(), entry.message),
            LogLevel::Error => eprintln!(" {} {}", "[ERROR]".red().bold(), entry.message),
        }
    }
}

/// Keeps every entry in order; read back after the run.
#[derive(Default)]
pub struct MemorySink {
    entries: RefCell<Vec<LogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.borrow().clone()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.level == level)
            .count()
    }

    pub fn with_code(&self, code: MessageCode) -> Vec<LogEntry> {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.code == code)
            .cloned()
            .collect()
    }
}

impl LogSink for MemorySink {
    fn log(&self, entry: LogEntry) {
        self.entries.borrow_mut().push(entry);
    }
}

/// Forwards each entry to two sinks.
pub struct Tee<A, B>(pub A, pub B);

impl<A: LogSink, B: LogSink> LogSink for Tee<A, B> {
    fn log(&self, entry: LogEntry) {
        self.0.log(entry.clone());
        self.1.log(entry);
    }
}
