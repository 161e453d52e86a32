//! Conversation reply types

use serde::{Deserialize, Serialize};

/// Reply produced for a robot prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Text the robot should say
    pub reply: String,
    /// Mood tag the robot should display (e.g. `happy`)
    pub mood: String,
}

impl Reply {
    /// Create a reply
    pub fn new(reply: impl Into<String>, mood: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            mood: mood.into(),
        }
    }
}
