//! Catalog classification value objects: category, rarity, difficulty.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Development area a quest or task trains.
///
/// The five built-in areas map to the level-1 development branches. Unknown
/// names are kept as `Other` so catalog content can introduce new areas
/// without a code change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum QuestCategory {
    Health,
    Willpower,
    Intelligence,
    Charisma,
    Money,
    Other(String),
}

impl QuestCategory {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Health => "health",
            Self::Willpower => "willpower",
            Self::Intelligence => "intelligence",
            Self::Charisma => "charisma",
            Self::Money => "money",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for QuestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "" => Err(DomainError::parse("Quest category cannot be empty")),
            "health" => Ok(Self::Health),
            "willpower" => Ok(Self::Willpower),
            "intelligence" => Ok(Self::Intelligence),
            "charisma" => Ok(Self::Charisma),
            "money" => Ok(Self::Money),
            _ => Ok(Self::Other(normalized)),
        }
    }
}

impl TryFrom<String> for QuestCategory {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QuestCategory> for String {
    fn from(value: QuestCategory) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rarity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "common" => Ok(Self::Common),
            "uncommon" => Ok(Self::Uncommon),
            "rare" => Ok(Self::Rare),
            "epic" => Ok(Self::Epic),
            "legendary" => Ok(Self::Legendary),
            other => Err(DomainError::parse(format!("Unknown rarity: {}", other))),
        }
    }
}

/// Quest/task difficulty on a 1-10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(value: u8) -> Result<Self, DomainError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(DomainError::validation(format!(
                "Difficulty must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Difficulty> for u8 {
    fn from(value: Difficulty) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_known_and_custom_names() {
        assert_eq!("Health".parse::<QuestCategory>(), Ok(QuestCategory::Health));
        assert_eq!(
            "cooking".parse::<QuestCategory>(),
            Ok(QuestCategory::Other("cooking".to_string()))
        );
        assert!("  ".parse::<QuestCategory>().is_err());
    }

    #[test]
    fn category_serializes_as_plain_string() {
        let json = serde_json::to_string(&QuestCategory::Charisma).expect("serialize");
        assert_eq!(json, "\"charisma\"");
        let back: QuestCategory = serde_json::from_str("\"money\"").expect("deserialize");
        assert_eq!(back, QuestCategory::Money);
    }

    #[test]
    fn rarity_rejects_unknown_values() {
        assert_eq!("EPIC".parse::<Rarity>(), Ok(Rarity::Epic));
        assert!("mythic".parse::<Rarity>().is_err());
    }

    #[test]
    fn difficulty_is_bounded() {
        assert!(Difficulty::new(0).is_err());
        assert!(Difficulty::new(11).is_err());
        assert_eq!(Difficulty::new(10).map(Difficulty::value), Ok(10));
    }
}
