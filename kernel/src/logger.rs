//! Kernel logger
//!
//! Routes the `log` facade to a console supplied by the platform. Records
//! are formatted into a fixed stack buffer, so logging never allocates and
//! is safe while the process table lock is held.

use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use spin::Once;

/// Output device for log records (serial port, VGA, test capture...)
pub trait Console: Sync {
    fn write_str(&self, s: &str);
}

/// Logger that formats records and hands them to the attached console
struct KernelLogger;

impl log::Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Some(console) = CONSOLE.get() else {
            return;
        };

        let level_str = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN ",
            Level::Info => "INFO ",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };

        use core::fmt::Write;
        let mut buf = [0u8; 512];
        let mut writer = BufferWriter {
            buffer: &mut buf,
            pos: 0,
        };
        let _ = write!(&mut writer, "[{}] {}\n", level_str, record.args());
        let pos = writer.pos;
        // Truncation can split a code point; print the valid prefix.
        let text = match core::str::from_utf8(&buf[..pos]) {
            Ok(text) => text,
            Err(e) => core::str::from_utf8(&buf[..e.valid_up_to()]).unwrap_or(""),
        };
        console.write_str(text);
    }

    fn flush(&self) {}
}

/// Simple buffer writer for formatting without alloc
pub struct BufferWriter<'a> {
    pub buffer: &'a mut [u8],
    pub pos: usize,
}

impl<'a> core::fmt::Write for BufferWriter<'a> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        let remaining = self.buffer.len() - self.pos;
        let to_write = bytes.len().min(remaining);

        if to_write > 0 {
            self.buffer[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
            self.pos += to_write;
        }

        Ok(())
    }
}

static LOGGER: KernelLogger = KernelLogger;
static CONSOLE: Once<&'static dyn Console> = Once::new();

/// Attach the console. Only the first call has an effect.
pub fn attach_console(console: &'static dyn Console) {
    CONSOLE.call_once(|| console);
}

/// Install the kernel logger with the given maximum level
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}
