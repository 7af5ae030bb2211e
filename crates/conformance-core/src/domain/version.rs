//! Release version parsing and ordering.
//!
//! Release tags in the wild are loose: `v1.30`, `1.30.2`, `v1.31.0-rc.1`.
//! [`ReleaseVersion`] accepts all of them, treating missing components as 0.

use std::cmp::Ordering;
use std::fmt;

use super::error::{Result, VerifyError};

/// Default number of minor releases behind the latest that remain supported.
pub const DEFAULT_RELEASE_LOOKBACK: u64 = 2;

/// Parsed release version: MAJOR[.MINOR[.PATCH]] with optional pre-release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<String>,
    raw: String,
}

impl ReleaseVersion {
    /// Parse a release version, with or without a leading `v`.
    pub fn parse(input: &str) -> Result<Self> {
        Self::try_parse(input).ok_or_else(|| VerifyError::MalformedVersion(input.to_string()))
    }

    fn try_parse(input: &str) -> Option<Self> {
        let raw = input.trim();
        let body = raw
            .strip_prefix('v')
            .or_else(|| raw.strip_prefix('V'))
            .unwrap_or(raw);

        let (numeric, pre) = match body.split_once('-') {
            Some((n, p)) if !p.is_empty() => (n, Some(p.to_string())),
            Some(_) => return None,
            None => (body, None),
        };

        let parts: Vec<&str> = numeric.split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return None;
        }
        let mut nums = [0u64; 3];
        for (slot, part) in nums.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            *slot = part.parse().ok()?;
        }

        Some(Self {
            major: nums[0],
            minor: nums[1],
            patch: nums[2],
            pre,
            raw: raw.to_string(),
        })
    }

    /// The `vMAJOR.MINOR` form used for folders, titles and labels.
    pub fn minor_tag(&self) -> String {
        format!("v{}.{}", self.major, self.minor)
    }

    /// Oldest release still supported when `self` is the latest release.
    ///
    /// Only major and minor take part; the boundary never crosses a major.
    pub fn oldest_supported(&self, lookback: u64) -> Self {
        let minor = self.minor.saturating_sub(lookback);
        Self {
            major: self.major,
            minor,
            patch: 0,
            pre: None,
            raw: format!("v{}.{}", self.major, minor),
        }
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let tuple_cmp =
            (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch));
        if tuple_cmp != Ordering::Equal {
            return tuple_cmp;
        }
        // Same numeric version: pre-release < release
        match (&self.pre, &other.pre) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Check that `target` is still within the supported window behind `latest`.
///
/// Fails with [`VerifyError::UnsupportedRelease`] when the target's
/// (major, minor) is below `latest.minor - lookback` on the latest major.
/// Releases newer than `latest` are accepted.
pub fn is_supported_release(target: &str, latest: &str, lookback: u64) -> Result<()> {
    let target_version = ReleaseVersion::parse(target)?;
    let latest_version = ReleaseVersion::parse(latest)?;
    let oldest = latest_version.oldest_supported(lookback);

    if (target_version.major, target_version.minor) < (oldest.major, oldest.minor) {
        return Err(VerifyError::UnsupportedRelease {
            target: target.to_string(),
            oldest: oldest.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        let v = ReleaseVersion::parse("v1.30").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (1, 30, 0));

        let v = ReleaseVersion::parse("1.30.2").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (1, 30, 2));

        let v = ReleaseVersion::parse(" v1.31.0-rc.1 ").unwrap();
        assert_eq!(v.pre.as_deref(), Some("rc.1"));
        assert_eq!(v.to_string(), "v1.31.0-rc.1");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "v", "latest", "v1..2", "v1.2.3.4", "v1.x", "v1.2-", "1.-2"] {
            assert!(
                matches!(ReleaseVersion::parse(bad), Err(VerifyError::MalformedVersion(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_ordering() {
        let a = ReleaseVersion::parse("v1.30").unwrap();
        let b = ReleaseVersion::parse("v1.30.0").unwrap();
        let c = ReleaseVersion::parse("v1.30.1").unwrap();
        let rc = ReleaseVersion::parse("v1.30.0-rc.1").unwrap();
        assert_eq!(a.cmp(&b), Ordering::Equal);
        assert!(a < c);
        assert!(rc < a);
        assert!(ReleaseVersion::parse("v1.9").unwrap() < ReleaseVersion::parse("v1.18").unwrap());
    }

    #[test]
    fn test_minor_tag() {
        assert_eq!(ReleaseVersion::parse("1.29.4").unwrap().minor_tag(), "v1.29");
    }

    #[test]
    fn test_supported_window() {
        assert!(is_supported_release("v1.29", "v1.31", 2).is_ok());
        assert!(is_supported_release("v1.31", "v1.31", 2).is_ok());
        assert!(is_supported_release("v1.33", "v1.31", 2).is_ok());
        assert!(is_supported_release("v1.29.9", "v1.31.0", 2).is_ok());

        let err = is_supported_release("v1.28", "v1.31", 2).unwrap_err();
        assert_eq!(
            err,
            VerifyError::UnsupportedRelease {
                target: "v1.28".to_string(),
                oldest: "v1.29".to_string(),
            }
        );
    }

    #[test]
    fn test_supported_window_respects_lookback() {
        assert!(is_supported_release("v1.28", "v1.31", 3).is_ok());
        assert!(is_supported_release("v1.27", "v1.31", 3).is_err());
    }

    #[test]
    fn test_supported_window_rejects_malformed() {
        assert!(matches!(
            is_supported_release("one-thirty", "v1.31", 2),
            Err(VerifyError::MalformedVersion(_))
        ));
    }
}
