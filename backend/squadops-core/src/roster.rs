// src/roster.rs

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::error::AppError;
use crate::model::{NewPersonnel, Personnel, PersonnelPatch, Rank};
use crate::store::{StoreClient, StoreError, TABLE_MILITARY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReorderDirection {
    Up,
    Down,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReorderError {
    #[error("Reordering is disabled while a search filter is active")]
    FilterActive,
    #[error("Member not found in roster: {0}")]
    UnknownMember(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// Already at the boundary for the requested direction.
    Noop,
    /// Swap the seniority values of these two roster rows.
    Swap {
        member_id: String,
        neighbor_id: String,
    },
}

/// Display order: seniority ascending with nulls last, name ascending
/// tie-break. No two active members compare equal in the displayed order.
pub fn sort_roster(roster: &mut [Personnel]) {
    roster.sort_by(|a, b| {
        let by_seniority = match (a.seniority, b.seniority) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_seniority.then_with(|| a.name.cmp(&b.name))
    });
}

/// Next seniority value for a new member: max(existing, default 0) + 1.
pub fn next_seniority(roster: &[Personnel]) -> i64 {
    roster
        .iter()
        .filter_map(|member| member.seniority)
        .max()
        .unwrap_or(0)
        + 1
}

/// Insert payload for a new member: name stored upper-cased regardless of
/// input case, seniority appended at the bottom of the order.
pub fn new_member_payload(roster: &[Personnel], rank: Rank, name: &str) -> NewPersonnel {
    NewPersonnel {
        rank,
        name: name.trim().to_uppercase(),
        seniority: next_seniority(roster),
    }
}

/// Decides what a reorder request means against the full sorted roster.
///
/// A non-empty search filter invalidates the index positions the client is
/// looking at, so the request is rejected outright before anything is
/// written. At the top with "up" (or the bottom with "down") there is no
/// neighbor and the request is a no-op.
pub fn plan_reorder(
    sorted: &[Personnel],
    member_id: &str,
    direction: ReorderDirection,
    filter: Option<&str>,
) -> Result<ReorderOutcome, ReorderError> {
    if let Some(text) = filter {
        if !text.trim().is_empty() {
            return Err(ReorderError::FilterActive);
        }
    }
    let index = sorted
        .iter()
        .position(|member| member.id == member_id)
        .ok_or_else(|| ReorderError::UnknownMember(member_id.to_string()))?;
    let neighbor_index = match direction {
        ReorderDirection::Up => {
            if index == 0 {
                return Ok(ReorderOutcome::Noop);
            }
            index - 1
        }
        ReorderDirection::Down => {
            if index + 1 >= sorted.len() {
                return Ok(ReorderOutcome::Noop);
            }
            index + 1
        }
    };
    Ok(ReorderOutcome::Swap {
        member_id: sorted[index].id.clone(),
        neighbor_id: sorted[neighbor_index].id.clone(),
    })
}

/// Roster operations against the hosted store.
#[derive(Clone)]
pub struct RosterService {
    store: StoreClient,
}

impl RosterService {
    pub fn new(store: StoreClient) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Personnel>, StoreError> {
        let mut roster: Vec<Personnel> = self.store.select(TABLE_MILITARY, &[]).await?;
        sort_roster(&mut roster);
        Ok(roster)
    }

    pub async fn create(&self, rank: Rank, name: &str) -> Result<Personnel, StoreError> {
        let roster = self.list().await?;
        let payload = new_member_payload(&roster, rank, name);
        info!("Creating roster entry {} ({})", payload.name, payload.rank);
        self.store.insert(TABLE_MILITARY, &payload).await
    }

    pub async fn update(
        &self,
        id: &str,
        rank: Option<Rank>,
        name: Option<&str>,
    ) -> Result<(), StoreError> {
        let patch = PersonnelPatch {
            rank,
            name: name.map(|n| n.trim().to_uppercase()),
        };
        self.store.update(TABLE_MILITARY, id, &patch).await
    }

    /// Removes the roster row only. Historical attendance rows referencing
    /// the id are retained; deletion does not cascade.
    pub async fn remove(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(TABLE_MILITARY, id).await
    }

    /// Moves a member one position up or down in the total order.
    ///
    /// The swap of the two seniority values runs as a single server-side
    /// procedure (`swap_seniority`), so a racing edit cannot observe a
    /// half-applied exchange.
    pub async fn reorder(
        &self,
        member_id: &str,
        direction: ReorderDirection,
        filter: Option<&str>,
    ) -> Result<Vec<Personnel>, AppError> {
        if let Some(text) = filter {
            if !text.trim().is_empty() {
                // Reject before touching the store at all.
                return Err(AppError::Validation(ReorderError::FilterActive.to_string()));
            }
        }
        let roster = self.list().await?;
        let outcome = plan_reorder(&roster, member_id, direction, filter)
            .map_err(|e| AppError::Validation(e.to_string()))?;
        match outcome {
            ReorderOutcome::Noop => Ok(roster),
            ReorderOutcome::Swap {
                member_id,
                neighbor_id,
            } => {
                info!(
                    "Swapping seniority of {} and {} via store procedure",
                    member_id, neighbor_id
                );
                self.store
                    .rpc(
                        "swap_seniority",
                        &json!({ "first_id": member_id, "second_id": neighbor_id }),
                    )
                    .await?;
                Ok(self.list().await?)
            }
        }
    }
}
