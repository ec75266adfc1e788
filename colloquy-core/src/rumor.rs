//! Rumor mill: the pool of gossip behind "any news?".
//!
//! Common rumors are seeded once into an empty mill and never removed. Quest
//! rumors come and go with their quests. Selection draws uniformly from the
//! whole pool, so quest rumors compete with common ones.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::text::TextProvider;
use crate::types::{QuestId, RecordId, TokenSeq};

/// Origin of a rumor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RumorKind {
    /// General gossip seeded at startup.
    Common,
    /// Rumor describing a quest's progress; at most one per quest.
    QuestProgress,
    /// Rumor added by a quest's "rumor mill" action.
    QuestRumorMill,
}

/// One rumor with its text variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RumorMillEntry {
    /// Origin.
    pub kind: RumorKind,
    /// Text variants, macros unexpanded.
    pub variants: Vec<TokenSeq>,
    /// Owning quest, set for quest rumors.
    pub quest: Option<QuestId>,
}

/// Record a common rumor is drawn from, for a roll in `0..12`.
#[must_use]
pub fn common_rumor_record(roll: u32) -> RecordId {
    match roll {
        0..=9 => RecordId(1400 + roll),
        10 => RecordId(1456),
        11 => RecordId(1481),
        _ => RecordId(1457),
    }
}

/// The rumor pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RumorMill {
    entries: Vec<RumorMillEntry>,
}

impl RumorMill {
    /// Create an empty mill.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a mill from persisted entries.
    #[must_use]
    pub fn from_entries(entries: Vec<RumorMillEntry>) -> Self {
        Self { entries }
    }

    /// All entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[RumorMillEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mill holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries of one kind.
    #[must_use]
    pub fn count(&self, kind: RumorKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    /// Seed `count` common rumors if the mill is empty. Does nothing otherwise.
    pub fn setup_common_rumors(&mut self, count: usize, text: &dyn TextProvider, rng: &mut dyn RngCore) {
        if !self.entries.is_empty() {
            return;
        }
        for _ in 0..count {
            let record = common_rumor_record(rng.gen_range(0..12));
            self.entries.push(RumorMillEntry {
                kind: RumorKind::Common,
                variants: vec![text.random_tokens(record, rng)],
                quest: None,
            });
        }
        debug!(count, "Seeded common rumors");
    }

    /// Append a quest rumor. Repeated calls accumulate entries. Empty variant
    /// lists are ignored.
    pub fn add_quest_rumor(&mut self, quest: QuestId, variants: Vec<TokenSeq>) {
        if variants.is_empty() {
            return;
        }
        debug!(quest = %quest, variants = variants.len(), "Added quest rumor");
        self.entries.push(RumorMillEntry {
            kind: RumorKind::QuestRumorMill,
            variants,
            quest: Some(quest),
        });
    }

    /// Set the progress rumor of a quest, replacing any previous one in place.
    pub fn add_or_replace_quest_progress_rumor(&mut self, quest: QuestId, variants: Vec<TokenSeq>) {
        let existing = self
            .entries
            .iter_mut()
            .find(|e| e.kind == RumorKind::QuestProgress && e.quest == Some(quest));
        match existing {
            Some(entry) => {
                entry.variants = variants;
                debug!(quest = %quest, "Replaced quest progress rumor");
            }
            None => {
                self.entries.push(RumorMillEntry {
                    kind: RumorKind::QuestProgress,
                    variants,
                    quest: Some(quest),
                });
                debug!(quest = %quest, "Added quest progress rumor");
            }
        }
    }

    /// Remove every rumor-mill entry of a quest.
    pub fn remove_quest_rumors(&mut self, quest: QuestId) {
        self.remove(quest, RumorKind::QuestRumorMill);
    }

    /// Remove the progress rumor of a quest.
    pub fn remove_quest_progress_rumors(&mut self, quest: QuestId) {
        self.remove(quest, RumorKind::QuestProgress);
    }

    fn remove(&mut self, quest: QuestId, kind: RumorKind) {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.kind == kind && e.quest == Some(quest)));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(quest = %quest, ?kind, removed, "Removed quest rumors");
        }
    }

    /// Pick an entry uniformly at random.
    pub fn pick(&self, rng: &mut dyn RngCore) -> Option<&RumorMillEntry> {
        if self.entries.is_empty() {
            return None;
        }
        self.entries.get(rng.gen_range(0..self.entries.len()))
    }
}
