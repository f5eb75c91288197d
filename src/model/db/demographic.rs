use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::common::demographics::Demographics;
use crate::model::mongodb::{is_duplicate_key_error, Coll, Id};

/// A de-duplicated demographic tuple.
///
/// Votes reference one of these instead of carrying a voter link, so the
/// bulletin stays unlinkable while aggregate breakdowns remain possible.
/// Exactly one document exists per distinct tuple, enforced by a unique
/// compound index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemographicGroup {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub demographics: Demographics,
}

/// A demographic group without an ID.
pub type NewDemographicGroup = Demographics;

impl Deref for DemographicGroup {
    type Target = Demographics;

    fn deref(&self) -> &Self::Target {
        &self.demographics
    }
}

impl DemographicGroup {
    /// Find the group for this tuple, creating it if absent.
    ///
    /// Lost insert races surface as duplicate key errors, in which case the
    /// winner's document is read back on the second pass.
    pub async fn get_or_create(
        groups: &Coll<DemographicGroup>,
        demographics: &Demographics,
    ) -> Result<Id> {
        let filter = mongodb::bson::to_document(demographics).map_err(|e| {
            Error::Storage(format!("failed to serialize demographics filter: {e}"))
        })?;

        for _ in 0..2 {
            if let Some(existing) = groups.find_one(filter.clone(), None).await? {
                return Ok(existing.id);
            }
            let group = DemographicGroup {
                id: Id::new(),
                demographics: demographics.clone(),
            };
            match groups.insert_one(&group, None).await {
                Ok(_) => return Ok(group.id),
                Err(err) if is_duplicate_key_error(&err) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(Error::Storage(
            "demographic group insert raced and retry failed".to_string(),
        ))
    }
}
