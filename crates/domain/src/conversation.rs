//! The conversation data model: turns, the entity frame, and the last
//! result set. Shared by the conversation store, the response cache key
//! derivation, and the pipeline planner.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hard ceiling on any declared result limit, regardless of what a stage
/// or the user asks for.
pub const HARD_RESULT_CAP: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub turn_id: Uuid,
    pub speaker: Speaker,
    pub clean_text: String,
    pub timestamp: DateTime<Utc>,
}

/// The closed set of entity kinds the planner tracks across a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    DecisionNumber,
    GovernmentNumber,
    Topic,
    MinistrySet,
    DateRange,
    ResultLimit,
    Polarity,
}

impl EntityKind {
    /// Kinds excluded from the cache key and from the cacheability predicate:
    /// the entity frame must not pin a specific decision number for the
    /// answer to be cache-safe. A conversation pinned to one decision
    /// number produces answers that are not safe to reuse for a different
    /// conversation with the same text but a different pinned decision.
    pub fn is_reference_only(self) -> bool {
        matches!(self, EntityKind::DecisionNumber)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EntityValue {
    Text(String),
    Number(i64),
    StringSet(Vec<String>),
    DateRange { from: String, to: String },
    Limit(u32),
    Polarity(bool),
}

/// Entity-kind → value map. Accumulates monotonically within a turn; may be
/// reset by scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityFrame(pub BTreeMap<EntityKind, EntityValue>);

impl EntityFrame {
    pub fn get(&self, kind: EntityKind) -> Option<&EntityValue> {
        self.0.get(&kind)
    }

    pub fn set(&mut self, kind: EntityKind, value: EntityValue) {
        self.0.insert(kind, value);
    }

    pub fn remove(&mut self, kind: EntityKind) {
        self.0.remove(&kind);
    }

    /// Merge `delta` into `self`, delta entries winning on conflict.
    pub fn merge(&mut self, delta: &EntityFrame) {
        for (k, v) in &delta.0 {
            self.0.insert(*k, v.clone());
        }
    }

    /// The subset of entries eligible for inclusion in a cache key: the
    /// reference-only kinds are excluded.
    pub fn cache_relevant(&self) -> BTreeMap<EntityKind, EntityValue> {
        self.0
            .iter()
            .filter(|(k, _)| !k.is_reference_only())
            .map(|(k, v)| (*k, v.clone()))
            .collect()
    }

    pub fn decision_number(&self) -> Option<i64> {
        match self.get(EntityKind::DecisionNumber) {
            Some(EntityValue::Number(n)) => Some(*n),
            _ => None,
        }
    }
}

/// Ranked artifact-id list from the most recent data-bearing turn, plus the
/// query text that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastResultSet {
    pub ids: Vec<String>,
    pub query: String,
}

/// Durable per-conversation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub conv_id: String,
    pub turns: VecDeque<Turn>,
    pub entity_frame: EntityFrame,
    pub last_result: Option<LastResultSet>,
    pub created_at: DateTime<Utc>,
    pub last_touch: DateTime<Utc>,
    /// Set for one turn after a scope break; cleared automatically the next
    /// time the planner consults it.
    #[serde(default)]
    pub cache_bypass: bool,
}

impl Conversation {
    pub fn new(conv_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            conv_id: conv_id.into(),
            turns: VecDeque::new(),
            entity_frame: EntityFrame::default(),
            last_result: None,
            created_at: now,
            last_touch: now,
            cache_bypass: false,
        }
    }

    /// Push a turn and trim the FIFO to `max_turns`. Invariant: after this
    /// call, `self.turns.len() <= max_turns`.
    pub fn push_turn(&mut self, turn: Turn, max_turns: usize) {
        self.turns.push_back(turn);
        while self.turns.len() > max_turns {
            self.turns.pop_front();
        }
    }
}
