//! Sums one query across the owner-stage entities, recording per entity
//! whether the query succeeded, needed a retry, or was dropped.
use std::collections::BTreeMap;
use std::ops::AddAssign;

use serde::Serialize;

use crate::error::StoreError;
use crate::model::columns::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Entity {
    WalkIn,
    PsFollowup,
    ActivityLead,
}

impl Entity {
    pub const ALL: [Entity; 3] = [Entity::WalkIn, Entity::PsFollowup, Entity::ActivityLead];

    pub fn label(&self) -> &'static str {
        match self {
            Entity::WalkIn => "Walk-in",
            Entity::PsFollowup => "PS followup",
            Entity::ActivityLead => "Activity lead",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Entity::WalkIn => WALKINS,
            Entity::PsFollowup => PS_FOLLOWUPS,
            Entity::ActivityLead => ACTIVITY_LEADS,
        }
    }

    pub fn owner_column(&self) -> &'static str {
        match self {
            Entity::WalkIn => PS_ASSIGNED,
            Entity::PsFollowup | Entity::ActivityLead => PS_NAME,
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Entity::WalkIn => &[PS_ASSIGNED, STATUS, FIRST_CALL, CREATED_AT],
            Entity::PsFollowup | Entity::ActivityLead => STAGE_COLUMNS,
        }
    }
}

/// Outcome counts of one owner in one or more stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTally {
    pub handled: i64,
    pub open: i64,
    pub won: i64,
    pub lost: i64,
    pub untouched: i64,
}

impl AddAssign for StageTally {
    fn add_assign(&mut self, rhs: Self) {
        self.handled += rhs.handled;
        self.open += rhs.open;
        self.won += rhs.won;
        self.lost += rhs.lost;
        self.untouched += rhs.untouched;
    }
}

/// Stage tallies keyed by owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerTallies(pub BTreeMap<String, StageTally>);

impl OwnerTallies {
    pub fn entry(&mut self, owner: &str) -> &mut StageTally {
        self.0.entry(owner.to_string()).or_default()
    }

    pub fn get(&self, owner: &str) -> StageTally {
        self.0.get(owner).copied().unwrap_or_default()
    }
}

impl AddAssign for OwnerTallies {
    fn add_assign(&mut self, rhs: Self) {
        for (owner, tally) in rhs.0 {
            *self.entry(&owner) += tally;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FetchStatus {
    /// One query covered the entity.
    Batch,
    /// The batch query failed and per-owner queries were used instead.
    Retried,
    /// Nothing (or only part) could be read. Missing parts count as zero.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityOutcome {
    pub entity: Entity,
    #[serde(flatten)]
    pub status: FetchStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionTally<T> {
    pub tally: T,
    pub entities: Vec<EntityOutcome>,
}

impl<T> UnionTally<T> {
    pub fn failed(&self) -> impl Iterator<Item = &EntityOutcome> {
        self.entities
            .iter()
            .filter(|o| matches!(o.status, FetchStatus::Failed { .. }))
    }
}

/// Runs `query` once per entity and sums the results. An entity whose query
/// errors contributes `T::default()` and is marked failed.
pub fn sum_over<T, F>(entities: &[Entity], mut query: F) -> UnionTally<T>
where
    T: Default + AddAssign,
    F: FnMut(Entity) -> Result<(T, FetchStatus), StoreError>,
{
    let mut tally = T::default();
    let mut outcomes = Vec::with_capacity(entities.len());

    for &entity in entities {
        let status = match query(entity) {
            Ok((part, status)) => {
                tally += part;
                status
            }
            Err(e) => {
                log::warn!("{} query failed, counting it as zero: {e}", entity.label());
                FetchStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };
        outcomes.push(EntityOutcome { entity, status });
    }

    UnionTally {
        tally,
        entities: outcomes,
    }
}
