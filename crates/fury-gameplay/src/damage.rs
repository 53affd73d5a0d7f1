//! Damage queue and resolver.
//!
//! Attackers never touch a target's health directly. They push a
//! [`DamageRecord`] into the target's [`DamageQueue`] and the target drains
//! its own queue once, on its own turn. A hit therefore lands exactly once no
//! matter where attacker and target sit in the update order; at worst it lands
//! a tick later.

use fury_common::{Direction, EntityHandle};
use serde::{Deserialize, Serialize};

use crate::settings::Settings;

/// Hit classification, ordered from weakest to strongest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum HitSeverity {
    /// Stagger
    #[default]
    Normal,
    /// Fall and get up
    Knockdown,
    /// Long knockback flight
    Power,
}

/// One pending hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRecord {
    /// Health to subtract
    pub amount: i32,
    /// Direction the hit pushes the target
    pub direction: Direction,
    /// Hit classification
    pub severity: HitSeverity,
    /// Who dealt it
    pub source: EntityHandle,
}

impl DamageRecord {
    /// Creates a record.
    #[must_use]
    pub const fn new(
        amount: i32,
        direction: Direction,
        severity: HitSeverity,
        source: EntityHandle,
    ) -> Self {
        Self {
            amount,
            direction,
            severity,
            source,
        }
    }
}

/// What a drained queue amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageSummary {
    /// Sum of every record's amount
    pub total: i32,
    /// Severity of the decisive record
    pub severity: HitSeverity,
    /// Push direction of the decisive record
    pub direction: Direction,
    /// Source of the decisive record
    pub source: EntityHandle,
    /// Number of records drained
    pub hits: usize,
}

impl DamageSummary {
    /// Folds records into a summary. The most severe record is decisive; a
    /// later record of equal severity replaces an earlier one.
    #[must_use]
    pub fn from_records(records: &[DamageRecord]) -> Option<Self> {
        let mut iter = records.iter();
        let first = iter.next()?;
        let mut summary = Self {
            total: first.amount,
            severity: first.severity,
            direction: first.direction,
            source: first.source,
            hits: 1,
        };
        for record in iter {
            summary.total += record.amount;
            summary.hits += 1;
            if record.severity >= summary.severity {
                summary.severity = record.severity;
                summary.direction = record.direction;
                summary.source = record.source;
            }
        }
        Some(summary)
    }

    /// Signed horizontal knockback velocity for this summary.
    #[must_use]
    pub fn knockback_x(&self, settings: &Settings) -> f32 {
        self.direction.x_sign() * settings.knockback_speed(self.severity)
    }
}

/// Per-entity inbox of pending hits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageQueue {
    records: Vec<DamageRecord>,
}

impl DamageQueue {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Queue a hit.
    pub fn push(&mut self, record: DamageRecord) {
        self.records.push(record);
    }

    /// Pending records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// No pending records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Pending records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &DamageRecord> {
        self.records.iter()
    }

    /// Drain the queue. When `receptive`, subtract the total from `health`
    /// and return the summary; otherwise the hits are discarded. The queue is
    /// empty afterwards either way.
    pub fn resolve(&mut self, health: &mut i32, receptive: bool) -> Option<DamageSummary> {
        let summary = DamageSummary::from_records(&self.records);
        self.records.clear();
        let summary = summary.filter(|_| receptive)?;
        *health -= summary.total;
        Some(summary)
    }
}
