//! Error types for the Colloquy conversation engine.

use thiserror::Error;

use crate::registry::QuestResourceKind;
use crate::topics::TopicRef;
use crate::types::{BuildingKey, QuestId};

/// Top-level error type for all Colloquy operations.
///
/// Only data-integrity faults surface here. Soft lookup misses (a dialog link
/// naming an unknown resource, a quest that already ended) are logged and the
/// operation is skipped instead.
#[derive(Error, Debug)]
pub enum TalkError {
    /// The faction table has no province record for the player's region.
    #[error("No regional faction found for one-based region {region}")]
    MissingRegionFaction {
        /// One-based region index that was queried.
        region: i32,
    },

    /// A quest referenced by id is not known to the topic registry.
    #[error("Quest not found: {0}")]
    QuestNotFound(QuestId),

    /// A named quest resource is missing from a known quest.
    #[error("Quest resource '{name}' not found for quest {quest}")]
    ResourceNotFound {
        /// Owning quest.
        quest: QuestId,
        /// Resource display name.
        name: String,
    },

    /// A quest resource exists but is of the wrong kind for the operation.
    #[error("Quest resource '{name}' of quest {quest} is {found:?}, expected {expected:?}")]
    ResourceKindMismatch {
        /// Owning quest.
        quest: QuestId,
        /// Resource display name.
        name: String,
        /// Kind the operation required.
        expected: QuestResourceKind,
        /// Kind actually stored.
        found: QuestResourceKind,
    },

    /// A non-questor person resource has no assigned place to resolve.
    #[error("Person resource '{name}' of quest {quest} has no assigned place")]
    MissingAssignedPlace {
        /// Owning quest.
        quest: QuestId,
        /// Resource display name.
        name: String,
    },

    /// No building with the given key exists in the current location.
    #[error("Building not found: {0}")]
    BuildingNotFound(BuildingKey),

    /// More than one building in the current location carries the same key.
    #[error("Duplicate building key: {0}")]
    DuplicateBuildingKey(BuildingKey),

    /// A topic reference does not point at an answerable topic.
    #[error("Invalid topic reference: {0:?}")]
    InvalidTopic(TopicRef),

    /// An operation needed a conversation target but none was set.
    #[error("No conversation target selected")]
    NoTarget,

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, TalkError>;
