//! TiltColor / ColorFilter
//!
//! Hydrometers are identified by their shell color. Targets select which
//! colors they forward with a `ColorFilter`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::ContractError;

/// Known hydrometer colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TiltColor {
    Red,
    Green,
    Black,
    Purple,
    Orange,
    Blue,
    Yellow,
    Pink,
}

impl TiltColor {
    /// All colors, in the order hydrometers are usually listed
    pub const ALL: [TiltColor; 8] = [
        TiltColor::Red,
        TiltColor::Green,
        TiltColor::Black,
        TiltColor::Purple,
        TiltColor::Orange,
        TiltColor::Blue,
        TiltColor::Yellow,
        TiltColor::Pink,
    ];

    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            TiltColor::Red => "red",
            TiltColor::Green => "green",
            TiltColor::Black => "black",
            TiltColor::Purple => "purple",
            TiltColor::Orange => "orange",
            TiltColor::Blue => "blue",
            TiltColor::Yellow => "yellow",
            TiltColor::Pink => "pink",
        }
    }

    /// Case-insensitive comparison against a raw color string
    pub fn matches(&self, color: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(color.trim())
    }
}

impl fmt::Display for TiltColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TiltColor {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TiltColor::ALL
            .into_iter()
            .find(|c| c.matches(s))
            .ok_or_else(|| ContractError::InvalidColor {
                value: s.to_string(),
                expected: ColorFilter::expected_values(),
            })
    }
}

/// Which readings a target forwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorFilter {
    /// Every color
    #[default]
    Any,
    /// A single color
    Only(TiltColor),
}

impl ColorFilter {
    /// Whether a reading with this color passes the filter
    pub fn matches(&self, color: &str) -> bool {
        match self {
            ColorFilter::Any => true,
            ColorFilter::Only(expected) => expected.matches(color),
        }
    }

    /// Accepted textual values, for error messages
    pub fn expected_values() -> String {
        let mut names: Vec<&str> = TiltColor::ALL.iter().map(TiltColor::as_str).collect();
        names.push("any");
        format!("[{}]", names.join(", "))
    }
}

impl fmt::Display for ColorFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorFilter::Any => f.write_str("any"),
            ColorFilter::Only(color) => color.fmt(f),
        }
    }
}

impl FromStr for ColorFilter {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("any") {
            return Ok(ColorFilter::Any);
        }
        s.parse().map(ColorFilter::Only)
    }
}

impl Serialize for ColorFilter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ColorFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
