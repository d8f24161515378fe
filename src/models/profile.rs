//! Profile model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[default]
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Male => write!(f, "M"),
            Sex::Female => write!(f, "F"),
        }
    }
}

impl FromStr for Sex {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M" | "m" => Ok(Sex::Male),
            "F" | "f" => Ok(Sex::Female),
            _ => Err(anyhow::anyhow!("Invalid sex: {}", s)),
        }
    }
}

/// Personal details attached to an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub sex: Sex,
    /// ISO 3166-1 alpha-2 code
    pub country: String,
    pub date_birth: NaiveDate,
    /// Number of articles the owner has published
    pub article_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for profile creation
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProfileInput {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub sex: Sex,
    pub country: String,
    pub date_birth: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sex_roundtrip() {
        assert_eq!("F".parse::<Sex>().unwrap(), Sex::Female);
        assert_eq!(Sex::Male.to_string(), "M");
        assert!("X".parse::<Sex>().is_err());
        assert_eq!(serde_json::to_string(&Sex::Female).unwrap(), "\"F\"");
    }
}
