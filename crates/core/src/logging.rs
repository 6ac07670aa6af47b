//! Categorised logging for the emulator core.
//!
//! Every component logs through [`log`] with a [`LogCategory`] and a
//! [`LogLevel`]. Each category can be given its own level; categories left
//! at `Off` follow the global level. Messages are built lazily from a
//! closure, so a disabled call site costs one atomic load.
//!
//! # Output
//!
//! - With a log file configured, records go to a background writer thread
//!   through a channel so the emulation thread never waits on disk.
//! - Otherwise records are forwarded to the [`log`](https://docs.rs/log)
//!   facade with the category as the target (`gb::cpu`, `gb::ppu`, ...), and
//!   the host's logger (e.g. `env_logger`) decides where they end up.
//!
//! # Rate limiting
//!
//! Each category is limited to a number of records per sliding one-second
//! window (60 by default). Dropped records are summarised once per second.
//!
//! ```rust
//! use emu_core::logging::{log, LogCategory, LogLevel};
//!
//! log(LogCategory::PPU, LogLevel::Debug, || {
//!     format!("PPU: LCD enabled at LY={}", 0)
//! });
//! ```

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

/// Log level for controlling verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse a level name or digit (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }

    fn to_facade(self) -> Option<::log::Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(::log::Level::Error),
            LogLevel::Warn => Some(::log::Level::Warn),
            LogLevel::Info => Some(::log::Level::Info),
            LogLevel::Debug => Some(::log::Level::Debug),
            LogLevel::Trace => Some(::log::Level::Trace),
        }
    }
}

/// Emulator component a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Instruction execution
    CPU,
    /// Address decoding, boot ROM, DMA
    Bus,
    /// LCD and pixel pipeline
    PPU,
    /// Sound channels and resampler
    APU,
    /// DIV/TIMA
    Timer,
    /// Header parsing and bank controllers
    Cartridge,
    /// Interrupt requests and dispatch
    Interrupts,
}

const CATEGORY_COUNT: usize = 7;

impl LogCategory {
    pub const ALL: [LogCategory; CATEGORY_COUNT] = [
        LogCategory::CPU,
        LogCategory::Bus,
        LogCategory::PPU,
        LogCategory::APU,
        LogCategory::Timer,
        LogCategory::Cartridge,
        LogCategory::Interrupts,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Target string used when forwarding to the `log` facade
    pub fn target(self) -> &'static str {
        match self {
            LogCategory::CPU => "gb::cpu",
            LogCategory::Bus => "gb::bus",
            LogCategory::PPU => "gb::ppu",
            LogCategory::APU => "gb::apu",
            LogCategory::Timer => "gb::timer",
            LogCategory::Cartridge => "gb::cart",
            LogCategory::Interrupts => "gb::irq",
        }
    }
}

#[derive(Default)]
struct Window {
    stamps: VecDeque<Instant>,
    dropped: usize,
    last_report: Option<Instant>,
}

/// Sliding-window limiter, one window per category
struct RateLimiter {
    max_per_second: AtomicUsize,
    windows: Mutex<[Window; CATEGORY_COUNT]>,
}

impl RateLimiter {
    fn new(max_per_second: usize) -> Self {
        Self {
            max_per_second: AtomicUsize::new(max_per_second),
            windows: Mutex::new(Default::default()),
        }
    }

    /// Returns whether the record may be emitted, plus a dropped-record
    /// count when one is due to be reported.
    fn should_allow(&self, category: LogCategory) -> (bool, Option<usize>) {
        let now = Instant::now();
        let span = Duration::from_secs(1);
        let max = self.max_per_second.load(Ordering::Relaxed);

        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let w = &mut windows[category.index()];

        while w.stamps.front().is_some_and(|&t| now.duration_since(t) > span) {
            w.stamps.pop_front();
        }

        if w.stamps.len() < max {
            w.stamps.push_back(now);
            if w.dropped > 0 {
                let dropped = std::mem::take(&mut w.dropped);
                w.last_report = Some(now);
                return (true, Some(dropped));
            }
            return (true, None);
        }

        w.dropped += 1;
        let due = w
            .last_report
            .map_or(true, |last| now.duration_since(last) >= span);
        if due {
            w.last_report = Some(now);
            (false, Some(std::mem::take(&mut w.dropped)))
        } else {
            (false, None)
        }
    }
}

/// Global logging configuration
pub struct LogConfig {
    global_level: AtomicU8,
    levels: [AtomicU8; CATEGORY_COUNT],
    file_sender: Mutex<Option<Sender<String>>>,
    rate_limiter: RateLimiter,
}

impl LogConfig {
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            levels: Default::default(),
            file_sender: Mutex::new(None),
            rate_limiter: RateLimiter::new(60),
        }
    }

    /// The process-wide instance
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.levels[category.index()].load(Ordering::Relaxed))
    }

    /// A category set to anything but `Off` overrides the global level.
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        if level == LogLevel::Off {
            return false;
        }
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for category in LogCategory::ALL {
            self.set_level(category, LogLevel::Off);
        }
    }

    /// Maximum records per second per category
    pub fn set_rate_limit(&self, max_per_second: usize) {
        self.rate_limiter
            .max_per_second
            .store(max_per_second, Ordering::Relaxed);
    }

    pub fn get_rate_limit(&self) -> usize {
        self.rate_limiter.max_per_second.load(Ordering::Relaxed)
    }

    /// Append records to `path` from a background writer thread.
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let (sender, receiver) = channel::<String>();

        thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                while let Ok(line) = receiver.recv() {
                    let _ = writeln!(file, "{}", line);
                    let _ = file.flush();
                }
            })?;

        if let Ok(mut slot) = self.file_sender.lock() {
            *slot = Some(sender);
        }
        Ok(())
    }

    /// Stop writing to the log file; the writer thread exits on its own.
    pub fn clear_log_file(&self) {
        if let Ok(mut slot) = self.file_sender.lock() {
            *slot = None;
        }
    }

    fn emit(&self, category: LogCategory, level: LogLevel, message: String) {
        if let Ok(slot) = self.file_sender.lock() {
            if let Some(sender) = slot.as_ref() {
                let line = format!("[{:?}] {}", category, message);
                if sender.send(line).is_ok() {
                    return;
                }
            }
        }
        if let Some(facade_level) = level.to_facade() {
            ::log::log!(target: category.target(), facade_level, "{}", message);
        }
    }
}

/// Log a lazily-built message for a category at a level.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if !config.should_log(category, level) {
        return;
    }

    let (allowed, dropped) = config.rate_limiter.should_allow(category);
    if let Some(count) = dropped.filter(|&n| n > 0) {
        config.emit(
            category,
            LogLevel::Warn,
            format!("rate limit exceeded, {} record(s) dropped", count),
        );
    }
    if allowed {
        config.emit(category, level, message_fn());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("off"), Some(LogLevel::Off));
        assert_eq!(LogLevel::from_str("ERR"), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_str("Warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("3"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("TRACE"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::from_str("loud"), None);
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Off < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn test_category_indices_are_distinct() {
        for (i, cat) in LogCategory::ALL.iter().enumerate() {
            assert_eq!(cat.index(), i);
        }
    }

    #[test]
    fn test_category_level_overrides_global() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Error);
        config.set_level(LogCategory::PPU, LogLevel::Debug);

        assert!(config.should_log(LogCategory::PPU, LogLevel::Debug));
        assert!(!config.should_log(LogCategory::PPU, LogLevel::Trace));
        assert!(config.should_log(LogCategory::Timer, LogLevel::Error));
        assert!(!config.should_log(LogCategory::Timer, LogLevel::Warn));
    }

    #[test]
    fn test_off_never_logs() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Trace);
        assert!(!config.should_log(LogCategory::CPU, LogLevel::Off));
    }

    #[test]
    fn test_reset() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Trace);
        config.set_level(LogCategory::Cartridge, LogLevel::Info);
        config.reset();
        assert_eq!(config.get_global_level(), LogLevel::Off);
        assert_eq!(config.get_level(LogCategory::Cartridge), LogLevel::Off);
    }

    #[test]
    fn test_rate_limiter_per_category() {
        let limiter = RateLimiter::new(5);
        for _ in 0..5 {
            assert!(limiter.should_allow(LogCategory::CPU).0);
        }
        assert!(!limiter.should_allow(LogCategory::CPU).0);
        assert!(limiter.should_allow(LogCategory::APU).0);
    }

    #[test]
    fn test_rate_limiter_reports_drops_after_window() {
        let limiter = RateLimiter::new(2);
        limiter.should_allow(LogCategory::Bus);
        limiter.should_allow(LogCategory::Bus);
        // First drop is reported straight away
        let (allowed, dropped) = limiter.should_allow(LogCategory::Bus);
        assert!(!allowed);
        assert_eq!(dropped, Some(1));
        for _ in 0..4 {
            limiter.should_allow(LogCategory::Bus);
        }

        std::thread::sleep(Duration::from_millis(1100));

        let (allowed, dropped) = limiter.should_allow(LogCategory::Bus);
        assert!(allowed);
        assert_eq!(dropped, Some(4));
    }
}
