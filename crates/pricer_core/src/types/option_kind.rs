//! European option exercise side.

use std::fmt;
use std::str::FromStr;

use super::error::PricingError;

/// Call or put.
///
/// Parsing is case-insensitive and ignores surrounding whitespace. Anything
/// other than `call` or `put` is rejected with `PricingError::InvalidInput`,
/// so an unrecognised kind never reaches a pricer.
///
/// # Examples
/// ```
/// use pricer_core::types::OptionKind;
///
/// assert_eq!("PUT".parse::<OptionKind>().unwrap(), OptionKind::Put);
/// assert!("straddle".parse::<OptionKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OptionKind {
    /// Right to buy at the strike.
    Call,
    /// Right to sell at the strike.
    Put,
}

impl OptionKind {
    /// Lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKind::Call => "call",
            OptionKind::Put => "put",
        }
    }

    /// Returns true for `Call`.
    #[inline]
    pub fn is_call(&self) -> bool {
        matches!(self, OptionKind::Call)
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionKind {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" | "c" => Ok(OptionKind::Call),
            "put" | "p" => Ok(OptionKind::Put),
            other => Err(PricingError::InvalidInput(format!(
                "unrecognised option kind '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive_and_trimmed() {
        assert_eq!("call".parse::<OptionKind>().unwrap(), OptionKind::Call);
        assert_eq!("  Call\n".parse::<OptionKind>().unwrap(), OptionKind::Call);
        assert_eq!("PUT".parse::<OptionKind>().unwrap(), OptionKind::Put);
        assert_eq!("P".parse::<OptionKind>().unwrap(), OptionKind::Put);
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        let err = "binary".parse::<OptionKind>().unwrap_err();
        assert!(err.is_invalid_input());
        assert!(format!("{}", err).contains("binary"));

        assert!("".parse::<OptionKind>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for kind in [OptionKind::Call, OptionKind::Put] {
            assert_eq!(kind.to_string().parse::<OptionKind>().unwrap(), kind);
        }
        assert!(OptionKind::Call.is_call());
        assert!(!OptionKind::Put.is_call());
    }
}
