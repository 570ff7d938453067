//! Глобальный logger симуляции.
//!
//! Один pluggable printer на процесс: headless demo ставит `ConsoleLogger`,
//! хост (движок, тесты) может подменить через `set_logger`, например на
//! `MemoryLogger`, чтобы потом разобрать строки.

use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

/// Printer + threshold под одним lock'ом: порог и вывод меняются атомарно.
struct LoggerState {
    printer: Option<Box<dyn LogPrinter>>,
    threshold: LogLevel,
}

static STATE: Lazy<Mutex<LoggerState>> = Lazy::new(|| {
    Mutex::new(LoggerState {
        printer: None,
        threshold: LogLevel::Debug,
    })
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }

    /// True when a message at `self` clears `threshold`.
    pub fn passes(self, threshold: LogLevel) -> bool {
        self >= threshold
    }
}

pub trait LogPrinter: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

/// Replace the printer. Poisoned lock = no-op.
pub fn set_logger(logger: Box<dyn LogPrinter>) {
    if let Ok(mut state) = STATE.lock() {
        state.printer = Some(logger);
    }
}

pub fn set_log_level(level: LogLevel) {
    if let Ok(mut state) = STATE.lock() {
        state.threshold = level;
    }
}

pub fn log_level() -> LogLevel {
    STATE.lock().map(|state| state.threshold).unwrap_or(LogLevel::Debug)
}

/// Install `ConsoleLogger` unless the host already set a printer.
pub fn init_logger() {
    if let Ok(mut state) = STATE.lock() {
        if state.printer.is_none() {
            state.printer = Some(Box::new(ConsoleLogger));
        }
    }
}

pub fn log(message: &str) {
    log_with_level(LogLevel::Debug, message);
}

pub fn log_info(message: &str) {
    log_with_level(LogLevel::Info, message);
}

pub fn log_warning(message: &str) {
    log_with_level(LogLevel::Warning, message);
}

pub fn log_error(message: &str) {
    log_with_level(LogLevel::Error, message);
}

/// Timestamp and hand the line to the printer, if it clears the threshold.
///
/// Логирование никогда не роняет тик: poisoned mutex молча пропускается.
pub fn log_with_level(level: LogLevel, message: &str) {
    let Ok(state) = STATE.lock() else {
        return;
    };
    if !level.passes(state.threshold) {
        return;
    }
    if let Some(printer) = state.printer.as_ref() {
        printer.log(level, &stamp(message));
    }
}

fn stamp(message: &str) -> String {
    format!("[{}] {}", chrono::Local::now().format("%H:%M:%S%.3f"), message)
}

/// stdout, one line per message.
pub struct ConsoleLogger;

impl LogPrinter for ConsoleLogger {
    fn log(&self, level: LogLevel, message: &str) {
        println!("[{}] {}", level.as_str(), message);
    }
}

/// Keeps lines in memory; the handle from `lines()` stays valid after `set_logger`.
#[derive(Clone, Default)]
pub struct MemoryLogger {
    lines: Arc<Mutex<Vec<(LogLevel, String)>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }
}

impl LogPrinter for MemoryLogger {
    fn log(&self, level: LogLevel, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, message.to_string()));
        }
    }
}
