//! Semantic version triples
//!
//! Versions compare numerically component by component (major, then minor,
//! then patch), so `1.10.0` is newer than `1.9.3`.
//!
//! Accepted forms: `MAJOR`, `MAJOR.MINOR`, `MAJOR.MINOR.PATCH`, each with an
//! optional leading `v`. Build metadata after `+` is ignored. Missing
//! components default to zero. Pre-release tags and any other text are
//! rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A version string that could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed version '{input}': {reason}")]
pub struct VersionParseError {
    pub input: String,
    pub reason: String,
}

impl VersionParseError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let trimmed = input.trim();
        let core = trimmed.split('+').next().unwrap_or_default();
        let core = core
            .strip_prefix('v')
            .or_else(|| core.strip_prefix('V'))
            .unwrap_or(core);

        if core.is_empty() {
            return Err(VersionParseError::new(input, "empty version"));
        }

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() > 3 {
            return Err(VersionParseError::new(
                input,
                format!("expected at most 3 components, found {}", parts.len()),
            ));
        }

        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionParseError::new(
                    input,
                    format!("component '{part}' is not a number"),
                ));
            }
            *slot = part
                .parse()
                .map_err(|_| VersionParseError::new(input, format!("component '{part}' overflows")))?;
        }

        Ok(Self::new(numbers[0], numbers[1], numbers[2]))
    }

    /// Parse only the leading major component (`"3"`, `"3.5"`, `"v3.5.1"`).
    pub fn parse_major(input: &str) -> Result<u64, VersionParseError> {
        Self::parse(input).map(|v| v.major)
    }

    /// How far `self` trails `latest`.
    ///
    /// Minor lag is only meaningful within the same major line, so it is
    /// zero whenever the majors differ.
    pub fn lag_behind(&self, latest: &Version) -> VersionLag {
        let major = latest.major.saturating_sub(self.major);
        let minor = if self.major == latest.major {
            latest.minor.saturating_sub(self.minor)
        } else {
            0
        };
        VersionLag { major, minor }
    }
}

/// Distance between a pinned version and the latest one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionLag {
    pub major: u64,
    pub minor: u64,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Version::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(Version::parse("1.2.3").unwrap(), Version::new(1, 2, 3));
        assert_eq!(Version::parse("v2.0").unwrap(), Version::new(2, 0, 0));
        assert_eq!(Version::parse("7").unwrap(), Version::new(7, 0, 0));
        assert_eq!(Version::parse("1.4.0+build.7").unwrap(), Version::new(1, 4, 0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("latest").is_err());
        assert!(Version::parse("1.2.3.4").is_err());
        assert!(Version::parse("1..2").is_err());
        assert!(Version::parse("1.2.3-rc1").is_err());
    }

    #[test]
    fn test_numeric_not_lexical_ordering() {
        let older = Version::parse("1.9.0").unwrap();
        let newer = Version::parse("1.10.0").unwrap();
        assert!(older < newer);
    }

    #[test]
    fn test_lag_behind() {
        let pinned = Version::new(1, 0, 0);
        assert_eq!(
            pinned.lag_behind(&Version::new(1, 3, 0)),
            VersionLag { major: 0, minor: 3 }
        );
        assert_eq!(
            pinned.lag_behind(&Version::new(3, 1, 0)),
            VersionLag { major: 2, minor: 0 }
        );
        // Newer pin than registry: no lag
        assert_eq!(
            Version::new(2, 0, 0).lag_behind(&Version::new(1, 5, 0)),
            VersionLag::default()
        );
    }

    #[test]
    fn test_serde_as_string() {
        let v: Version = serde_json::from_str("\"3.1.4\"").unwrap();
        assert_eq!(v, Version::new(3, 1, 4));
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"3.1.4\"");
    }
}
