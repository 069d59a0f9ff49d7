use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which transitions the kernel signals as an interrupt on a pin.
///
/// The watcher never looks at this: it only reacts to readiness. The value
/// is handed to the [`EdgeConfigurator`](super::EdgeConfigurator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    #[default]
    Falling,
    Rising,
    Both,
    /// Disables the interrupt.
    None,
}

impl Edge {
    /// Name understood by both the `gpio` utility and sysfs `edge` files.
    pub fn as_str(self) -> &'static str {
        match self {
            Edge::Falling => "falling",
            Edge::Rising => "rising",
            Edge::Both => "both",
            Edge::None => "none",
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown edge '{input}' (expected falling, rising, both or none)")]
pub struct ParseEdgeError {
    input: String,
}

impl FromStr for Edge {
    type Err = ParseEdgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "falling" => Ok(Edge::Falling),
            "rising" => Ok(Edge::Rising),
            "both" => Ok(Edge::Both),
            "none" => Ok(Edge::None),
            _ => Err(ParseEdgeError {
                input: s.to_string(),
            }),
        }
    }
}
