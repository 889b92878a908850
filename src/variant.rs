//! Robot product variants, identified by BLE advertising-name prefix.

use std::fmt;

/// One of the three robot product families.
///
/// Three tags are kept distinct even though upstream tooling has been
/// observed conflating the Dinobot and Decepticon tags in places; each
/// advertising-name prefix routes to its own catalogue here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Variant {
    /// "OP-M-" prefix.
    AutobotHumanoid,
    /// "GSEG-" prefix.
    Dinobot,
    /// "MEGAF-" prefix.
    DecepticonHumanoid,
}

impl Variant {
    /// Determine the variant and device id from a BLE advertising name.
    pub fn from_advertising_name(name: &str) -> Option<(Self, &str)> {
        if let Some(id) = name.strip_prefix("OP-M-") {
            Some((Self::AutobotHumanoid, id))
        } else if let Some(id) = name.strip_prefix("GSEG-") {
            Some((Self::Dinobot, id))
        } else if let Some(id) = name.strip_prefix("MEGAF-") {
            Some((Self::DecepticonHumanoid, id))
        } else {
            None
        }
    }

    /// Whether this variant honors the ENTER_PROGRAMMING handshake.
    ///
    /// Only the Autobot-humanoid variant is known to support programming
    /// mode; the others treat it as a no-op (§9 Open Questions).
    pub fn supports_programming(self) -> bool {
        matches!(self, Self::AutobotHumanoid)
    }

    /// Whether this variant supports the BUILT_IN_ACTION speed-toggle
    /// subtype (fast/slow gait).
    pub fn supports_speed_toggle(self) -> bool {
        matches!(self, Self::Dinobot)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AutobotHumanoid => write!(f, "Autobot-humanoid"),
            Self::Dinobot => write!(f, "Dinobot"),
            Self::DecepticonHumanoid => write!(f, "Decepticon-humanoid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_all_three_prefixes() {
        assert_eq!(
            Variant::from_advertising_name("OP-M-A1B2"),
            Some((Variant::AutobotHumanoid, "A1B2"))
        );
        assert_eq!(
            Variant::from_advertising_name("GSEG-C3D4"),
            Some((Variant::Dinobot, "C3D4"))
        );
        assert_eq!(
            Variant::from_advertising_name("MEGAF-E5F6"),
            Some((Variant::DecepticonHumanoid, "E5F6"))
        );
    }

    #[test]
    fn rejects_unknown_prefix() {
        assert_eq!(Variant::from_advertising_name("NOTAROBOT-1234"), None);
    }

    #[test]
    fn only_autobot_supports_programming() {
        assert!(Variant::AutobotHumanoid.supports_programming());
        assert!(!Variant::Dinobot.supports_programming());
        assert!(!Variant::DecepticonHumanoid.supports_programming());
    }
}
