// SPDX-FileCopyrightText: 2024 embr <git@liclac.eu>
// SPDX-FileCopyrightText: 2024 Wavelens UG <info@wavelens.io>
//
// SPDX-License-Identifier: EUPL-1.2

//! Levels and filter resolution.

use crate::{ConstructionError, Result, ResultExt};
use num_enum::{IntoPrimitive, TryFromPrimitive, TryFromPrimitiveError};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// How chatty a logger is, when no filter directives are given.
///
/// Also accepted as a bare number in a filter directive string (eg. `RUST_LOG=5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Verbosity {
    Off = 0,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}
impl Default for Verbosity {
    /// Development default.
    fn default() -> Self {
        Self::Debug
    }
}
impl From<TryFromPrimitiveError<Verbosity>> for ConstructionError {
    fn from(value: TryFromPrimitiveError<Verbosity>) -> Self {
        Self::Invalid(format!("Verbosity({})", value.number))
    }
}

impl From<Verbosity> for LevelFilter {
    fn from(v: Verbosity) -> Self {
        match v {
            Verbosity::Off => LevelFilter::OFF,
            Verbosity::Error => LevelFilter::ERROR,
            Verbosity::Warn => LevelFilter::WARN,
            Verbosity::Info => LevelFilter::INFO,
            Verbosity::Debug => LevelFilter::DEBUG,
            Verbosity::Trace => LevelFilter::TRACE,
        }
    }
}

impl Verbosity {
    /// The equivalent filter directive, eg. `"debug"`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Builds the [`EnvFilter`] for a logger.
///
/// Explicit `directives` win over `env_var`; if neither yields anything, everything at
/// `verbosity` and above is enabled. A directive string that is just a number is read as
/// a [`Verbosity`].
pub(crate) fn resolve_filter(
    verbosity: Verbosity,
    directives: Option<&str>,
    env_var: Option<&str>,
) -> Result<EnvFilter> {
    let raw = directives.map(str::to_owned).or_else(|| {
        env_var
            .and_then(|var| std::env::var(var).ok())
            .filter(|v| !v.trim().is_empty())
    });

    let directives = match raw {
        Some(raw) if is_number(raw.trim()) => verbosity_from_number(raw.trim())?
            .as_directive()
            .to_owned(),
        Some(raw) => raw,
        None => verbosity.as_directive().to_owned(),
    };

    EnvFilter::builder().parse(directives).construction()
}

// An optionally signed run of digits, of any length.
fn is_number(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn verbosity_from_number(s: &str) -> Result<Verbosity> {
    match s.parse::<u8>() {
        Ok(n) => Verbosity::try_from(n).construction(),
        Err(_) => Err(ConstructionError::Invalid(format!("Verbosity({})", s))).construction(),
    }
}
