//! Save/load snapshot of the conversation engine's persistent state.
//!
//! The host owns the save file; this module only turns the engine state into
//! bytes and back. JSON is readable and diffable, bincode is compact.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TalkError};
use crate::registry::QuestTopicRegistry;
use crate::rumor::RumorMill;
use crate::types::{QuestId, TokenSeq};
use crate::work::NpcWorkEntry;

/// Everything the engine persists across save/load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    /// Quest topics by quest and name.
    pub quest_info: QuestTopicRegistry,
    /// The rumor pool, in order.
    pub rumor_mill: RumorMill,
    /// Greeting a questor uses once their quest concluded.
    pub questor_post_quest_messages: IndexMap<QuestId, TokenSeq>,
    /// NPCs offering work in the current town.
    pub npcs_with_work: Vec<NpcWorkEntry>,
    /// When the snapshot was taken.
    pub saved_at: DateTime<Utc>,
}

impl ConversationSnapshot {
    /// Encode as JSON.
    ///
    /// # Errors
    /// Returns [`TalkError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        let json = serde_json::to_string(self).map_err(|e| TalkError::Serialization(e.to_string()))?;
        debug!(bytes = json.len(), quests = self.quest_info.quest_count(), "Encoded snapshot as JSON");
        Ok(json)
    }

    /// Decode from JSON.
    ///
    /// # Errors
    /// Returns [`TalkError::Serialization`] if the input is not a snapshot.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| TalkError::Serialization(e.to_string()))
    }

    /// Encode as bincode.
    ///
    /// # Errors
    /// Returns [`TalkError::Serialization`] if encoding fails.
    pub fn to_bincode(&self) -> Result<Vec<u8>> {
        let bytes = bincode::serialize(self).map_err(|e| TalkError::Serialization(e.to_string()))?;
        debug!(bytes = bytes.len(), quests = self.quest_info.quest_count(), "Encoded snapshot as bincode");
        Ok(bytes)
    }

    /// Decode from bincode.
    ///
    /// # Errors
    /// Returns [`TalkError::Serialization`] if the input is not a snapshot.
    pub fn from_bincode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| TalkError::Serialization(e.to_string()))
    }
}
