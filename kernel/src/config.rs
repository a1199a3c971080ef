//! Boot-time configuration

use crate::param::NCPU;
use log::LevelFilter;

/// Parameters chosen when the kernel object is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Number of CPUs brought up by the platform (1..=NCPU)
    pub ncpu: usize,

    /// Maximum level forwarded to the console by the kernel logger
    pub log_level: LevelFilter,
}

impl KernelConfig {
    /// Uniprocessor, `Info` logging
    pub const fn new() -> Self {
        Self {
            ncpu: 1,
            log_level: LevelFilter::Info,
        }
    }

    pub const fn with_cpus(mut self, ncpu: usize) -> Self {
        self.ncpu = ncpu;
        self
    }

    pub const fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level;
        self
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.ncpu == 0 {
            return Err("at least one CPU is required");
        }
        if self.ncpu > NCPU {
            return Err("ncpu exceeds NCPU");
        }
        Ok(())
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new()
    }
}
