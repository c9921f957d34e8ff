//! Validity tiers and listing tags.

use std::fmt;

use serde::Serialize;

/// Engine-assigned confidence in a user-ID-to-key binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Validity {
    #[default]
    Unknown,
    Undefined,
    Never,
    Marginal,
    Full,
    Ultimate,
}

const VALIDITY_LABELS: [&str; 6] = ["unknown", "undefined", "never", "marginal", "full", "ultimate"];

impl Validity {
    /// Lowercase label, as gpg prints it.
    pub fn label(self) -> &'static str {
        VALIDITY_LABELS[self as usize]
    }

    /// Map a colon-listing validity or ownertrust letter.
    ///
    /// Letters that describe a key state rather than a trust level
    /// (`i`, `r`, `e`, `d`) map to `Unknown`; callers read those as flags.
    pub fn from_colon(field: &str) -> Self {
        match field.chars().next() {
            Some('q') => Validity::Undefined,
            Some('n') => Validity::Never,
            Some('m') => Validity::Marginal,
            Some('f') => Validity::Full,
            Some('u') => Validity::Ultimate,
            _ => Validity::Unknown,
        }
    }

    /// Map the suffix of a `TRUST_*` status keyword.
    pub fn from_trust_status(keyword: &str) -> Self {
        match keyword {
            "TRUST_UNDEFINED" => Validity::Undefined,
            "TRUST_NEVER" => Validity::Never,
            "TRUST_MARGINAL" => Validity::Marginal,
            "TRUST_FULLY" => Validity::Full,
            "TRUST_ULTIMATE" => Validity::Ultimate,
            _ => Validity::Unknown,
        }
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Protocol a key or operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Protocol {
    #[default]
    OpenPgp,
    Cms,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::OpenPgp => f.write_str("OpenPGP"),
            Protocol::Cms => f.write_str("CMS"),
        }
    }
}

/// Listing mode a key was produced under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct KeyListMode(u32);

impl KeyListMode {
    pub const LOCAL: Self = Self(1);
    pub const EXTERN: Self = Self(2);
    pub const SIGS: Self = Self(4);
    pub const SIG_NOTATIONS: Self = Self(8);
    pub const WITH_SECRET: Self = Self(16);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for KeyListMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(Validity::Unknown.label(), "unknown");
        assert_eq!(Validity::Marginal.to_string(), "marginal");
        assert_eq!(Validity::Ultimate.label(), "ultimate");
    }

    #[test]
    fn test_from_colon() {
        assert_eq!(Validity::from_colon("f"), Validity::Full);
        assert_eq!(Validity::from_colon("u"), Validity::Ultimate);
        assert_eq!(Validity::from_colon("-"), Validity::Unknown);
        assert_eq!(Validity::from_colon("r"), Validity::Unknown);
        assert_eq!(Validity::from_colon(""), Validity::Unknown);
    }

    #[test]
    fn test_list_mode_bits() {
        let mode = KeyListMode::LOCAL | KeyListMode::SIGS;
        assert!(mode.contains(KeyListMode::SIGS));
        assert!(!mode.contains(KeyListMode::EXTERN));
        assert_eq!(mode.bits(), 5);
    }
}
