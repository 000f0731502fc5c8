use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GeoflowError;

/// Subscription tier, ordered from least to most privileged
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Premium,
    Pro,
    Enterprise,
}

impl Tier {
    /// Whether this tier satisfies a tool's `required` tier
    pub fn satisfies(self, required: Tier) -> bool {
        self >= required
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Premium => "premium",
            Tier::Pro => "pro",
            Tier::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = GeoflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "premium" => Ok(Tier::Premium),
            "pro" => Ok(Tier::Pro),
            "enterprise" => Ok(Tier::Enterprise),
            _ => Err(GeoflowError::ConfigInvalid {
                key: "user_tier".to_string(),
                reason: format!("Invalid tier: {}. Use free, premium, pro, or enterprise", s),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_total_order() {
        assert!(Tier::Free < Tier::Premium);
        assert!(Tier::Premium < Tier::Pro);
        assert!(Tier::Pro < Tier::Enterprise);
    }

    #[test]
    fn test_satisfies() {
        assert!(Tier::Pro.satisfies(Tier::Premium));
        assert!(Tier::Pro.satisfies(Tier::Pro));
        assert!(!Tier::Free.satisfies(Tier::Pro));
        assert!(Tier::Enterprise.satisfies(Tier::Free));
    }

    #[test]
    fn test_parse() {
        assert_eq!("PRO".parse::<Tier>().unwrap(), Tier::Pro);
        assert_eq!("enterprise".parse::<Tier>().unwrap(), Tier::Enterprise);
        assert!("gold".parse::<Tier>().is_err());
    }
}
