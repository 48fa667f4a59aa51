//! Runtime flag word forwarded to the pier at boot.

use std::fmt;
use std::ops::BitOr;

use crate::Config;

/// Bit set of runtime options shared by the daemon's lite runtime and the pier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RuntimeFlags(u32);

impl RuntimeFlags {
    /// No flags set.
    pub const EMPTY: Self = Self(0);
    /// Memory debugging.
    pub const DEBUG_RAM: Self = Self(1 << 0);
    /// Heap integrity checks.
    pub const CHECK_CORRUPT: Self = Self(1 << 2);
    /// Verbose output.
    pub const VERBOSE: Self = Self(1 << 4);
    /// Compute without persisting.
    pub const DRY_RUN: Self = Self(1 << 5);
    /// Suppress output.
    pub const QUIET: Self = Self(1 << 6);
    /// Skip content addressing of nouns.
    pub const HASHLESS: Self = Self(1 << 7);
    /// Interpreter tracing.
    pub const TRACE: Self = Self(1 << 8);

    /// Builds the flag word from configuration switches.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        [
            (config.debug_ram, Self::DEBUG_RAM),
            (config.check_corrupt, Self::CHECK_CORRUPT),
            (config.verbose, Self::VERBOSE),
            (config.dry_run, Self::DRY_RUN),
            (config.quiet, Self::QUIET),
            (config.trace, Self::TRACE),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .fold(Self::EMPTY, |flags, (_, flag)| flags | flag)
    }

    /// Raw flag word.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for RuntimeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for RuntimeFlags {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:#06x}", self.0)
    }
}
