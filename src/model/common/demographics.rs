use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Voter gender, used only for aggregate breakdowns.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    #[serde(rename = "Prefer not to say")]
    PreferNotToSay,
    Unknown,
}

impl Gender {
    /// All categories, in the order they are reported.
    pub const ALL: [Gender; 4] = [
        Gender::Male,
        Gender::Female,
        Gender::PreferNotToSay,
        Gender::Unknown,
    ];
}

impl Display for Gender {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::PreferNotToSay => "Prefer not to say",
            Self::Unknown => "Unknown",
        };
        write!(f, "{}", label)
    }
}

/// Voter age bracket, used only for aggregate breakdowns.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "18-25")]
    From18To25,
    #[serde(rename = "26-35")]
    From26To35,
    #[serde(rename = "36-45")]
    From36To45,
    #[serde(rename = "46-60")]
    From46To60,
    #[serde(rename = "60+")]
    Over60,
    Unknown,
}

impl AgeGroup {
    /// All categories, in the order they are reported.
    pub const ALL: [AgeGroup; 6] = [
        AgeGroup::From18To25,
        AgeGroup::From26To35,
        AgeGroup::From36To45,
        AgeGroup::From46To60,
        AgeGroup::Over60,
        AgeGroup::Unknown,
    ];
}

impl Display for AgeGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::From18To25 => "18-25",
            Self::From26To35 => "26-35",
            Self::From36To45 => "36-45",
            Self::From46To60 => "46-60",
            Self::Over60 => "60+",
            Self::Unknown => "Unknown",
        };
        write!(f, "{}", label)
    }
}

/// The minimal demographic attributes attached to a voter.
/// Votes only ever reference the de-duplicated tuple, never the voter.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    pub age_group: AgeGroup,
    pub gender: Gender,
    pub country: String,
}

impl Demographics {
    pub fn unknown() -> Self {
        Self {
            age_group: AgeGroup::Unknown,
            gender: Gender::Unknown,
            country: "Unknown".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::serde_json;

    use super::*;

    #[test]
    fn labels_match_serde_names() {
        for gender in Gender::ALL {
            let json = serde_json::to_string(&gender).unwrap();
            assert_eq!(json, format!("\"{}\"", gender));
        }
        for age_group in AgeGroup::ALL {
            let json = serde_json::to_string(&age_group).unwrap();
            assert_eq!(json, format!("\"{}\"", age_group));
        }
    }
}
