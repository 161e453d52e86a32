//! Plan tier types

use serde::{Deserialize, Serialize};

use crate::ParseEnumError;

/// Plan tiers a robot can be purchased with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    /// Basic plan - R$ 29,90/mo
    Basic,
    /// Premium plan - R$ 49,90/mo
    Premium,
    /// Enterprise plan - R$ 99,90/mo
    Enterprise,
}

impl PlanType {
    /// All tiers, cheapest first
    pub const ALL: [PlanType; 3] = [Self::Basic, Self::Premium, Self::Enterprise];

    /// Get the price in minor currency units (centavos)
    pub const fn amount_cents(&self) -> i64 {
        match self {
            Self::Basic => 2_990,
            Self::Premium => 4_990,
            Self::Enterprise => 9_990,
        }
    }

    /// Stored string form
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Premium => "premium",
            Self::Enterprise => "enterprise",
        }
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlanType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "premium" => Ok(Self::Premium),
            "enterprise" => Ok(Self::Enterprise),
            _ => Err(ParseEnumError::new("plan type", s)),
        }
    }
}
