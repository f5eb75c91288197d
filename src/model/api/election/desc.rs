use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::election::{ElectionId, Visibility},
    db::election::{Candidate, Election},
};

/// An API-friendly election description, containing no sensitive data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDescription {
    pub id: ElectionId,
    pub title: String,
    pub description: String,
    pub visibility: Visibility,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Whether entering this election requires the password challenge.
    pub requires_password: bool,
    pub max_choices: u32,
    pub candidates: Vec<Candidate>,
}

impl From<Election> for ElectionDescription {
    fn from(election: Election) -> Self {
        Self {
            id: election.id,
            requires_password: election.has_password(),
            title: election.election.title,
            description: election.election.description,
            visibility: election.election.visibility,
            start_date: election.election.start_date,
            end_date: election.election.end_date,
            max_choices: election.election.max_choices,
            candidates: election.election.candidates,
        }
    }
}

/// A summary of an election, shorter than the full `ElectionDescription`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSummary {
    pub id: ElectionId,
    pub title: String,
    pub visibility: Visibility,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl From<&Election> for ElectionSummary {
    fn from(election: &Election) -> Self {
        Self {
            id: election.id,
            title: election.title.clone(),
            visibility: election.visibility,
            start_date: election.start_date,
            end_date: election.end_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_never_leaks_the_password_hash() {
        use rocket::serde::json::serde_json;

        let election = Election::private_example();
        let description = ElectionDescription::from(election);
        assert!(description.requires_password);

        let json = serde_json::to_string(&description).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("agora"));
    }
}
