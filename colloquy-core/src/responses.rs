//! Response bank selection.
//!
//! Every canned NPC answer is a numbered text record. Which record is used
//! depends on the disposition band and on the NPC's social group, through a
//! set of parallel [`ResponseTable`]s, one per band.

use crate::reputation::DispositionBand;
use crate::types::{GuildGroup, RecordId, SocialGroup};

// ---------------------------------------------------------------------------
// Fixed records
// ---------------------------------------------------------------------------

/// Greeting when the NPC dislikes the player.
pub const GREETING_DISLIKE: RecordId = RecordId(7206);
/// Greeting when the NPC is neutral.
pub const GREETING_NEUTRAL: RecordId = RecordId(7207);
/// Greeting when the NPC likes the player.
pub const GREETING_LIKE: RecordId = RecordId(7208);
/// Greeting when the NPC likes the player very much.
pub const GREETING_VERY_LIKE: RecordId = RecordId(7209);
/// Greeting from a fellow guild member who likes the player.
pub const GREETING_GUILD_LIKE: RecordId = RecordId(8550);
/// Greeting from a fellow guild member who is neutral.
pub const GREETING_GUILD_NEUTRAL: RecordId = RecordId(8551);
/// Greeting from a fellow Holy Order member who likes the player.
pub const GREETING_HOLY_ORDER_LIKE: RecordId = RecordId(8553);
/// Greeting from a fellow Holy Order member who is neutral.
pub const GREETING_HOLY_ORDER_NEUTRAL: RecordId = RecordId(8554);

/// First line of a player question, offset by tone.
pub const PLAYER_GREETING: RecordId = RecordId(7215);
/// Follow-up line of a player question, offset by tone.
pub const PLAYER_FOLLOW_UP: RecordId = RecordId(7218);

/// Question text for "any news", offset by tone.
pub const QUESTION_NEWS: RecordId = RecordId(7231);
/// Question text for "tell me about", offset by tone.
pub const QUESTION_TELL_ME_ABOUT: RecordId = RecordId(7212);
/// Question text for "where is", offset by tone.
pub const QUESTION_WHERE_IS: RecordId = RecordId(7225);

/// First organization description; the ninth slot is skipped.
pub const ORGANIZATION_INFO_BASE: RecordId = RecordId(860);

/// Caption of the work topic.
pub const WORK_TOPIC: RecordId = RecordId(7211);
/// Answer when a questor is available.
pub const WORK_AVAILABLE: RecordId = RecordId(8076);
/// Answer when nobody offers work.
pub const WORK_NONE: RecordId = RecordId(8078);

/// Directional location hint.
pub const HINT_DIRECTION: RecordId = RecordId(7333);
/// Location revealed on the map.
pub const HINT_ON_MAP: RecordId = RecordId(7332);

/// A town in the region offers the service.
pub const REGIONAL_FOUND: RecordId = RecordId(10);
/// No town in the region offers the service.
pub const REGIONAL_NOT_FOUND: RecordId = RecordId(11);

/// Stock refusal.
pub const REFUSAL: RecordId = RecordId(8571);
/// Refusal from a fellow guild member.
pub const REFUSAL_GUILD: RecordId = RecordId(8552);
/// Refusal from a fellow Holy Order member.
pub const REFUSAL_HOLY_ORDER: RecordId = RecordId(8555);
/// Every refusal after the first.
pub const NO_RESPONSE: RecordId = RecordId(7205);

// ---------------------------------------------------------------------------
// Banded tables
// ---------------------------------------------------------------------------

/// Column of a response table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordSet {
    /// Commoners and everyone without a column of their own.
    Default,
    /// Guild members.
    GuildMembers,
    /// Merchants.
    Merchants,
    /// Scholars.
    Scholars,
    /// Nobility.
    Nobility,
    /// Underworld.
    Underworld,
}

impl RecordSet {
    /// Column used for an NPC of the given social group.
    #[must_use]
    pub fn for_group(group: SocialGroup) -> Self {
        match group {
            SocialGroup::GuildMembers => Self::GuildMembers,
            SocialGroup::Merchants => Self::Merchants,
            SocialGroup::Scholars => Self::Scholars,
            SocialGroup::Nobility => Self::Nobility,
            SocialGroup::Underworld => Self::Underworld,
            _ => Self::Default,
        }
    }
}

/// One record per [`RecordSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseTable {
    /// Default column.
    pub default: RecordId,
    /// Guild member column.
    pub guild_members: RecordId,
    /// Merchant column.
    pub merchants: RecordId,
    /// Scholar column.
    pub scholars: RecordId,
    /// Nobility column.
    pub nobility: RecordId,
    /// Underworld column.
    pub underworld: RecordId,
}

impl ResponseTable {
    const fn new(
        default: u32,
        guild_members: u32,
        merchants: u32,
        scholars: u32,
        nobility: u32,
        underworld: u32,
    ) -> Self {
        Self {
            default: RecordId(default),
            guild_members: RecordId(guild_members),
            merchants: RecordId(merchants),
            scholars: RecordId(scholars),
            nobility: RecordId(nobility),
            underworld: RecordId(underworld),
        }
    }

    /// Record for a column.
    #[must_use]
    pub fn record(&self, set: RecordSet) -> RecordId {
        match set {
            RecordSet::Default => self.default,
            RecordSet::GuildMembers => self.guild_members,
            RecordSet::Merchants => self.merchants,
            RecordSet::Scholars => self.scholars,
            RecordSet::Nobility => self.nobility,
            RecordSet::Underworld => self.underworld,
        }
    }
}

/// One [`ResponseTable`] per disposition band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandedTables {
    /// Dislike band.
    pub dislike: ResponseTable,
    /// Neutral band.
    pub neutral: ResponseTable,
    /// Like band.
    pub like: ResponseTable,
    /// Very-like band.
    pub very_like: ResponseTable,
}

impl BandedTables {
    /// Table for a band.
    #[must_use]
    pub fn table(&self, band: DispositionBand) -> &ResponseTable {
        match band {
            DispositionBand::Dislike => &self.dislike,
            DispositionBand::Neutral => &self.neutral,
            DispositionBand::Like => &self.like,
            DispositionBand::VeryLike => &self.very_like,
        }
    }

    /// Record for a disposition score and social group.
    #[must_use]
    pub fn select(&self, disposition: i32, group: SocialGroup) -> RecordId {
        self.table(DispositionBand::from_score(disposition))
            .record(RecordSet::for_group(group))
    }
}

/// Answers when the NPC knows where something is. Quest topics use the same
/// tables.
pub const KNOWS: BandedTables = BandedTables {
    dislike: ResponseTable::new(7256, 7255, 7256, 7257, 7258, 7259),
    neutral: ResponseTable::new(7271, 7270, 7271, 7272, 7273, 7274),
    like: ResponseTable::new(7291, 7290, 7291, 7292, 7293, 7294),
    very_like: ResponseTable::new(7286, 7285, 7286, 7287, 7288, 7289),
};

const DOES_NOT_KNOW_LIKE: ResponseTable = ResponseTable::new(7281, 7280, 7281, 7282, 7283, 7284);

/// Answers when the NPC does not know. The like and very-like bands share
/// one table.
pub const DOES_NOT_KNOW: BandedTables = BandedTables {
    dislike: ResponseTable::new(7251, 7250, 7251, 7253, 7252, 7304),
    neutral: ResponseTable::new(7266, 7265, 7266, 7267, 7268, 7269),
    like: DOES_NOT_KNOW_LIKE,
    very_like: DOES_NOT_KNOW_LIKE,
};

// ---------------------------------------------------------------------------
// Greeting and refusal
// ---------------------------------------------------------------------------

/// NPC greeting record. Fellow guild members use their own greetings unless
/// they dislike the player.
#[must_use]
pub fn greeting_record(disposition: i32, guild: GuildGroup, player_is_member: bool) -> RecordId {
    if player_is_member {
        let (like, neutral) = if guild == GuildGroup::HolyOrder {
            (GREETING_HOLY_ORDER_LIKE, GREETING_HOLY_ORDER_NEUTRAL)
        } else {
            (GREETING_GUILD_LIKE, GREETING_GUILD_NEUTRAL)
        };
        match disposition {
            d if d >= 30 => return like,
            d if d >= 0 => return neutral,
            _ => {}
        }
    }
    match DispositionBand::from_score(disposition) {
        DispositionBand::VeryLike => GREETING_VERY_LIKE,
        DispositionBand::Like => GREETING_LIKE,
        DispositionBand::Neutral => GREETING_NEUTRAL,
        DispositionBand::Dislike => GREETING_DISLIKE,
    }
}

/// Record shown when an NPC refuses to talk for the first time.
#[must_use]
pub fn refusal_record(guild: GuildGroup, player_is_member: bool) -> RecordId {
    match (player_is_member, guild) {
        (true, GuildGroup::HolyOrder) => REFUSAL_HOLY_ORDER,
        (true, _) => REFUSAL_GUILD,
        (false, _) => REFUSAL,
    }
}

/// Description record of the i-th fixed organization.
#[must_use]
pub fn organization_info_record(index: usize) -> RecordId {
    let slot = if index > 7 { index.saturating_add(1) } else { index };
    ORGANIZATION_INFO_BASE.offset(u32::try_from(slot).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_sets_by_group() {
        assert_eq!(RecordSet::for_group(SocialGroup::Commoners), RecordSet::Default);
        assert_eq!(RecordSet::for_group(SocialGroup::SupernaturalBeings), RecordSet::Default);
        assert_eq!(RecordSet::for_group(SocialGroup::Underworld), RecordSet::Underworld);
    }

    #[test]
    fn knows_tables_by_band() {
        assert_eq!(KNOWS.select(-5, SocialGroup::Merchants), RecordId(7256));
        assert_eq!(KNOWS.select(0, SocialGroup::GuildMembers), RecordId(7270));
        assert_eq!(KNOWS.select(10, SocialGroup::Nobility), RecordId(7293));
        assert_eq!(KNOWS.select(30, SocialGroup::Underworld), RecordId(7289));
    }

    #[test]
    fn does_not_know_shares_like_tables() {
        for group in [SocialGroup::Commoners, SocialGroup::Scholars, SocialGroup::Nobility] {
            assert_eq!(DOES_NOT_KNOW.select(15, group), DOES_NOT_KNOW.select(45, group));
        }
        assert_eq!(DOES_NOT_KNOW.select(-1, SocialGroup::Scholars), RecordId(7253));
        assert_eq!(DOES_NOT_KNOW.select(-1, SocialGroup::Nobility), RecordId(7252));
        assert_eq!(DOES_NOT_KNOW.select(-1, SocialGroup::Underworld), RecordId(7304));
    }

    #[test]
    fn guild_greetings_take_precedence() {
        assert_eq!(greeting_record(35, GuildGroup::MagesGuild, true), GREETING_GUILD_LIKE);
        assert_eq!(greeting_record(5, GuildGroup::MagesGuild, true), GREETING_GUILD_NEUTRAL);
        assert_eq!(greeting_record(35, GuildGroup::HolyOrder, true), GREETING_HOLY_ORDER_LIKE);
        assert_eq!(greeting_record(-5, GuildGroup::HolyOrder, true), GREETING_DISLIKE);
        assert_eq!(greeting_record(35, GuildGroup::MagesGuild, false), GREETING_VERY_LIKE);
        assert_eq!(greeting_record(12, GuildGroup::None, false), GREETING_LIKE);
    }

    #[test]
    fn refusals() {
        assert_eq!(refusal_record(GuildGroup::None, false), REFUSAL);
        assert_eq!(refusal_record(GuildGroup::HolyOrder, true), REFUSAL_HOLY_ORDER);
        assert_eq!(refusal_record(GuildGroup::FightersGuild, true), REFUSAL_GUILD);
    }

    #[test]
    fn organization_records_skip_868() {
        assert_eq!(organization_info_record(0), RecordId(860));
        assert_eq!(organization_info_record(7), RecordId(867));
        assert_eq!(organization_info_record(8), RecordId(869));
    }
}
