// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Tunables for channel construction, with an environment-variable loader.

use std::num::ParseIntError;

use crate::waiter::SPIN_COUNT;

/// Environment variable overriding [`Config::spin_count`].
pub const ENV_SPIN_COUNT: &str = "TMCHAN_SPIN_COUNT";
/// Environment variable overriding [`Config::initial_capacity`].
pub const ENV_INITIAL_CAPACITY: &str = "TMCHAN_INITIAL_CAPACITY";

/// Default number of log slots reserved when a channel is created.
pub const INITIAL_CAPACITY: usize = 16;

/// Errors produced while loading a [`Config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held something that is not a number.
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue {
        /// The offending variable.
        var: &'static str,
        /// The raw value found.
        value: String,
        /// The underlying parse failure.
        #[source]
        source: ParseIntError,
    },
}

/// Construction parameters shared by every handle of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Yield-and-retry rounds a blocked read performs before parking.
    /// Zero parks immediately.
    pub spin_count: u32,
    /// Log slots reserved up front.
    pub initial_capacity: usize,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            spin_count: SPIN_COUNT,
            initial_capacity: INITIAL_CAPACITY,
        }
    }

    pub const fn with_spin_count(mut self, spin_count: u32) -> Self {
        self.spin_count = spin_count;
        self
    }

    pub const fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Defaults overridden by `TMCHAN_SPIN_COUNT` and
    /// `TMCHAN_INITIAL_CAPACITY` when they are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env) but reading variables through
    /// `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();
        if let Some(n) = parse_var(&lookup, ENV_SPIN_COUNT)? {
            config.spin_count = n;
        }
        if let Some(n) = parse_var(&lookup, ENV_INITIAL_CAPACITY)? {
            config.initial_capacity = n;
        }
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_var<F, N>(lookup: &F, var: &'static str) -> Result<Option<N>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    N: std::str::FromStr<Err = ParseIntError>,
{
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    match value.trim().parse() {
        Ok(n) => Ok(Some(n)),
        Err(source) => Err(ConfigError::InvalidValue { var, value, source }),
    }
}
