//! Robot identity and lifecycle status

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ParseEnumError;

/// Unique robot identifier (the device id carried in robot tokens)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RobotId(pub Uuid);

impl RobotId {
    /// Create a new random robot ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a robot ID from a string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for RobotId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RobotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RobotId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Robot lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    /// Registered but not yet paid for
    Pending,
    /// Paid and allowed to operate (subject to entitlement)
    Active,
    /// Blocked after a payment failure
    Suspended,
}

impl RobotStatus {
    /// Stored string form
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Suspended => "suspended",
        }
    }
}

impl std::fmt::Display for RobotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RobotStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "suspended" => Ok(Self::Suspended),
            _ => Err(ParseEnumError::new("robot status", s)),
        }
    }
}
