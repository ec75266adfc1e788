//! Core type definitions shared across the conversation engine.
//!
//! Identifiers are thin newtypes over the numeric keys used by the host game's
//! static dataset. All persisted types are serde-serializable.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Identifier of a running quest, assigned by the quest engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuestId(pub u64);

impl fmt::Display for QuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key of a building inside the current location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildingKey(pub i32);

impl fmt::Display for BuildingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// World map cell identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MapId(pub i32);

/// Faction record identifier from the static faction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactionId(pub i32);

/// Numeric identifier of a localized text record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u32);

impl RecordId {
    /// Offset this record by a small index, e.g. a talk tone or an
    /// organization slot. Saturates at the top of the id space.
    #[must_use]
    pub fn offset(self, by: u32) -> Self {
        Self(self.0.saturating_add(by))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identifier for a mobile (street) NPC, which has no stable seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MobileId(pub Uuid);

impl MobileId {
    /// Create a new random mobile NPC id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MobileId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of a conversation partner, used for same-target detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NpcIdentity {
    /// A placed NPC, identified by its name seed.
    Static {
        /// Name seed of the placed NPC.
        name_seed: i32,
    },
    /// A wandering NPC spawned at runtime.
    Mobile(MobileId),
}

// ---------------------------------------------------------------------------
// Social Classification
// ---------------------------------------------------------------------------

/// Coarse NPC classification from the faction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocialGroup {
    /// No social group.
    None,
    /// Common folk.
    Commoners,
    /// Shopkeepers and traders.
    Merchants,
    /// Sages and librarians.
    Scholars,
    /// Nobles and courtiers.
    Nobility,
    /// Thieves and cutthroats.
    Underworld,
    /// Unused group slot 5.
    SGroup5,
    /// Vampires, witches and the like.
    SupernaturalBeings,
    /// Members of a guild or order.
    GuildMembers,
    /// Unused group slot 8.
    SGroup8,
    /// Unused group slot 9.
    SGroup9,
    /// Unused group slot 10.
    SGroup10,
}

impl SocialGroup {
    /// Map a raw faction-table social group index to a group.
    #[must_use]
    pub fn from_index(index: i32) -> Self {
        match index {
            0 => Self::Commoners,
            1 => Self::Merchants,
            2 => Self::Scholars,
            3 => Self::Nobility,
            4 => Self::Underworld,
            5 => Self::SGroup5,
            6 => Self::SupernaturalBeings,
            7 => Self::GuildMembers,
            8 => Self::SGroup8,
            9 => Self::SGroup9,
            10 => Self::SGroup10,
            _ => Self::None,
        }
    }

    /// Raw faction-table index, `None` for [`SocialGroup::None`].
    #[must_use]
    pub fn index(self) -> Option<usize> {
        match self {
            Self::None => None,
            Self::Commoners => Some(0),
            Self::Merchants => Some(1),
            Self::Scholars => Some(2),
            Self::Nobility => Some(3),
            Self::Underworld => Some(4),
            Self::SGroup5 => Some(5),
            Self::SupernaturalBeings => Some(6),
            Self::GuildMembers => Some(7),
            Self::SGroup8 => Some(8),
            Self::SGroup9 => Some(9),
            Self::SGroup10 => Some(10),
        }
    }
}

/// Guild affiliation of an NPC, used for member greetings and refusals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuildGroup {
    /// Not affiliated.
    None,
    /// Temples of the Divines.
    HolyOrder,
    /// Knightly orders.
    KnightlyOrder,
    /// The Mages Guild.
    MagesGuild,
    /// The Fighters Guild.
    FightersGuild,
    /// The Thieves Guild.
    ThievesGuild,
    /// The Dark Brotherhood.
    DarkBrotherhood,
    /// Any other organization.
    Other,
}

/// Gender used for honorifics and name generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
}

/// Tone the player picked for the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TalkTone {
    /// Polite phrasing.
    Polite,
    /// Plain phrasing.
    #[default]
    Normal,
    /// Blunt phrasing.
    Blunt,
}

impl TalkTone {
    /// Offset of this tone inside a tone-indexed record block.
    #[must_use]
    pub fn index(self) -> u32 {
        match self {
            Self::Polite => 0,
            Self::Normal => 1,
            Self::Blunt => 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Text Tokens
// ---------------------------------------------------------------------------

/// One element of a token sequence produced by the text provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    /// A run of text, possibly containing unexpanded macros.
    Text(String),
    /// A formatting break.
    NewLine,
}

impl Token {
    /// Convenience constructor for a text token.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// A complete answer or rumor variant.
pub type TokenSeq = Vec<Token>;

/// Flatten an expanded token sequence into display text.
///
/// Formatting breaks collapse to a single space.
#[must_use]
pub fn tokens_to_string(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Text(text) if !text.is_empty() => out.push_str(text),
            _ => out.push(' '),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

/// A position in the exterior automap coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MapPosition {
    /// X coordinate (east is positive).
    pub x: f32,
    /// Y coordinate (north is positive).
    pub y: f32,
}

impl MapPosition {
    /// Create a new map position.
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn social_group_round_trips_through_index() {
        for i in 0..=10 {
            let group = SocialGroup::from_index(i);
            assert_eq!(group.index(), Some(i as usize));
        }
        assert_eq!(SocialGroup::from_index(-1), SocialGroup::None);
        assert_eq!(SocialGroup::None.index(), None);
    }

    #[test]
    fn tokens_flatten_with_breaks_as_spaces() {
        let tokens = vec![Token::text("Rumor has it"), Token::NewLine, Token::text("the baron is ill.")];
        assert_eq!(tokens_to_string(&tokens), "Rumor has it the baron is ill.");
    }

    #[test]
    fn tone_offsets() {
        assert_eq!(RecordId(7215).offset(TalkTone::Blunt.index()), RecordId(7217));
        assert_eq!(TalkTone::default(), TalkTone::Normal);
    }

    #[test]
    fn record_offset_saturates() {
        assert_eq!(RecordId(u32::MAX - 1).offset(5), RecordId(u32::MAX));
    }

    #[test]
    fn map_id_defaults_to_zero() {
        assert_eq!(MapId::default(), MapId(0));
    }

    #[test]
    fn mobile_ids_are_distinct() {
        assert_ne!(MobileId::new(), MobileId::new());
    }
}
