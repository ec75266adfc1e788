//! Disposition: how much an NPC likes the player.
//!
//! The score is the player's standing with the region's ruling faction, plus
//! the biography reaction modifier, plus the player's standing with the NPC's
//! social group. Response selection only ever sees the score through its
//! [`DispositionBand`].

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, TalkError};
use crate::types::SocialGroup;
use crate::world::{FactionDirectory, FactionKind, PlayerState};

/// Lowest score of the very-like band.
pub const VERY_LIKE_THRESHOLD: i32 = 30;
/// Lowest score of the like band.
pub const LIKE_THRESHOLD: i32 = 10;
/// Lowest score of the neutral band.
pub const NEUTRAL_THRESHOLD: i32 = 0;

/// Disposition band driving response table selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DispositionBand {
    /// Score below 0.
    Dislike,
    /// Score 0 to 9.
    Neutral,
    /// Score 10 to 29.
    Like,
    /// Score 30 and above.
    VeryLike,
}

impl DispositionBand {
    /// Classify a disposition score.
    #[must_use]
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= VERY_LIKE_THRESHOLD => Self::VeryLike,
            s if s >= LIKE_THRESHOLD => Self::Like,
            s if s >= NEUTRAL_THRESHOLD => Self::Neutral,
            _ => Self::Dislike,
        }
    }
}

/// Compute an NPC's disposition toward the player.
///
/// # Errors
/// Returns [`TalkError::MissingRegionFaction`] if the faction table has no
/// province record for the player's region.
pub fn compute_disposition(
    social_group: SocialGroup,
    player: &PlayerState,
    factions: &dyn FactionDirectory,
) -> Result<i32> {
    let region = player.one_based_region();
    let provinces = factions.find_factions(FactionKind::Province, None, region);
    let Some(province) = provinces.first() else {
        return Err(TalkError::MissingRegionFaction { region });
    };
    if provinces.len() > 1 {
        warn!(region, count = provinces.len(), "Multiple province factions for region, using the first");
    }

    let mut score = province.rep + player.biography_reaction_mod;
    if let Some(rep) = social_group
        .index()
        .and_then(|i| player.sgroup_reputations.get(i))
    {
        score += rep;
    }
    Ok(score)
}
