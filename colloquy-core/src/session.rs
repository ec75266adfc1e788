//! Conversation session: who the player is talking to and what has been said.
//!
//! The session lives for one target. Targeting the same NPC again keeps it;
//! targeting someone else starts over. Knowledge caches live on the topic
//! lists and are cleared by the manager when [`ConversationSession::gate`]
//! reports a new partner.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::topics::QuestionCategory;
use crate::types::{BuildingKey, FactionId, Gender, GuildGroup, NpcIdentity, QuestId, SocialGroup};

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    /// No target.
    #[default]
    Idle,
    /// A target is selected but no conversation is open.
    Targeting,
    /// The dialogue window is open.
    Conversing,
}

/// The NPC being talked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcTarget {
    /// Identity used for same-target detection.
    pub identity: NpcIdentity,
    /// Display name.
    pub name: String,
    /// Gender.
    pub gender: Gender,
    /// Social group, selecting the response column.
    pub social_group: SocialGroup,
    /// Guild group, for greeting and refusal overrides.
    pub guild_group: GuildGroup,
    /// Faction of a static NPC.
    pub faction_id: Option<FactionId>,
    /// Portrait override of the faction, if any.
    pub face: Option<i32>,
}

impl NpcTarget {
    /// Whether this is a static NPC placed in a building.
    #[must_use]
    pub fn is_static(&self) -> bool {
        matches!(self.identity, NpcIdentity::Static { .. })
    }

    /// Name seed of a static NPC.
    #[must_use]
    pub fn name_seed(&self) -> Option<i32> {
        match self.identity {
            NpcIdentity::Static { name_seed } => Some(name_seed),
            NpcIdentity::Mobile(_) => None,
        }
    }
}

/// Result of the entry gate before the dialogue window opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// The NPC talks. `new_partner` is set when the target changed since the
    /// previous gate, and topic knowledge must be forgotten.
    Proceed {
        /// Target changed since the previous gate.
        new_partner: bool,
    },
    /// The NPC refuses. The first refusal to a target gets a flavor line.
    Refuse {
        /// First refusal since the target was selected.
        first: bool,
    },
}

/// The topic a question is currently about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySubject {
    /// Caption of the topic.
    pub caption: String,
    /// Question category of the topic.
    pub category: QuestionCategory,
    /// Building the answer refers to.
    pub building: Option<BuildingKey>,
    /// Quest of a quest topic.
    pub quest: Option<QuestId>,
}

/// Per-target conversation state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationSession {
    state: SessionState,
    target: Option<NpcTarget>,
    target_changed: bool,
    disposition: i32,
    rejected_once: bool,
    questions_asked: u32,
    opening_line: Option<String>,
    /// Topic the current question is about.
    pub key_subject: KeySubject,
    /// Whether the building named next by a hint gets revealed on the map.
    pub mark_location_on_map: bool,
    /// Town chosen by the last regional answer.
    pub location_of_regional_building: String,
}

impl ConversationSession {
    /// Create an idle session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current target.
    #[must_use]
    pub fn target(&self) -> Option<&NpcTarget> {
        self.target.as_ref()
    }

    /// Disposition of the current target toward the player.
    #[must_use]
    pub fn disposition(&self) -> i32 {
        self.disposition
    }

    /// Whether the current target has refused once already.
    #[must_use]
    pub fn rejected_once(&self) -> bool {
        self.rejected_once
    }

    /// Questions answered since the conversation started.
    #[must_use]
    pub fn questions_asked(&self) -> u32 {
        self.questions_asked
    }

    /// Whether `identity` is the current target.
    #[must_use]
    pub fn is_same_target(&self, identity: &NpcIdentity) -> bool {
        self.target.as_ref().is_some_and(|t| &t.identity == identity)
    }

    /// Select a target. Returns `false`, leaving the session untouched, when
    /// it already is the current target. A different target discards every
    /// piece of per-target state.
    pub fn set_target(&mut self, target: NpcTarget, disposition: i32) -> bool {
        if self.is_same_target(&target.identity) {
            self.target_changed = false;
            return false;
        }
        debug!(name = %target.name, group = ?target.social_group, disposition, "Targeted NPC");
        *self = Self {
            state: SessionState::Targeting,
            target: Some(target),
            target_changed: true,
            disposition,
            ..Self::default()
        };
        true
    }

    /// Decide whether the target talks.
    pub fn gate(&mut self, refusal_threshold: i32) -> Gate {
        if self.disposition >= refusal_threshold {
            let new_partner = std::mem::take(&mut self.target_changed);
            Gate::Proceed { new_partner }
        } else {
            let first = !self.rejected_once;
            self.rejected_once = true;
            Gate::Refuse { first }
        }
    }

    /// Open the conversation.
    pub fn start_conversation(&mut self) {
        self.questions_asked = 0;
        self.opening_line = None;
        self.key_subject = KeySubject::default();
        self.state = SessionState::Conversing;
    }

    /// Close the conversation, keeping the target for same-target detection.
    pub fn end_conversation(&mut self) {
        self.opening_line = None;
        self.key_subject = KeySubject::default();
        self.mark_location_on_map = false;
        self.state = if self.target.is_some() {
            SessionState::Targeting
        } else {
            SessionState::Idle
        };
    }

    /// Count an answered question; the next opening line is regenerated.
    pub fn record_question(&mut self) {
        self.questions_asked += 1;
        self.opening_line = None;
    }

    /// Cached opening line of the pending question.
    #[must_use]
    pub fn opening_line(&self) -> Option<&str> {
        self.opening_line.as_deref()
    }

    /// Cache the opening line of the pending question.
    pub fn cache_opening_line(&mut self, line: String) {
        self.opening_line = Some(line);
    }
}
