//! Text provider seam: record lookup, localized strings and macro expansion.
//!
//! The engine never owns conversation text. It asks a [`TextProvider`] for a
//! random variant of a numbered record, expands macros by pulling values from
//! a [`MacroSource`], and flattens the result. [`TextTable`] is an in-memory
//! provider for hosts without their own text database, and for tests.

use std::collections::HashMap;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::types::{Gender, RecordId, Token, TokenSeq};

/// Keys of the fixed localized strings the engine needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextKey {
    /// Caption of the "any news" topic.
    AnyNews,
    /// Caption of a back-navigation entry.
    PreviousList,
    /// Caption of the residence/palace group.
    General,
    /// Caption of the regional group.
    Regional,
    /// Stock string substituted when a lookup unexpectedly fails.
    ResolvingError,
    /// Template for regional captions; `%s` is replaced with the building name.
    AnyTemplate,
    /// Leading word of a regional caption as it appears in the topic list.
    RegionalAnyCapitalized,
    /// Lower-case replacement used when the caption is spoken mid-sentence.
    RegionalAnyLowercase,
    /// Question text for "where is" → "thing", which has no records.
    ThingNotImplemented,
    /// Honorific for male players.
    Sir,
    /// Honorific for female players.
    Madam,
    /// Group caption: alchemists.
    Alchemists,
    /// Group caption: armorers.
    Armorers,
    /// Group caption: banks.
    Banks,
    /// Group caption: bookstores.
    Bookstores,
    /// Group caption: clothing stores.
    ClothingStores,
    /// Group caption: gem stores.
    GemStores,
    /// Group caption: general stores.
    GeneralStores,
    /// Group caption: guild halls.
    Guilds,
    /// Group caption: libraries.
    Libraries,
    /// Group caption: pawn shops.
    PawnShops,
    /// Group caption: taverns.
    Taverns,
    /// Group caption: weapon smiths.
    WeaponSmiths,
    /// Group caption: temples.
    LocalTemples,
    /// Compass direction.
    East,
    /// Compass direction.
    NorthEast,
    /// Compass direction.
    North,
    /// Compass direction.
    NorthWest,
    /// Compass direction.
    West,
    /// Compass direction.
    SouthWest,
    /// Compass direction.
    South,
    /// Compass direction.
    SouthEast,
}

impl TextKey {
    /// Database key of this string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AnyNews => "AnyNews",
            Self::PreviousList => "PreviousList",
            Self::General => "General",
            Self::Regional => "Regional",
            Self::ResolvingError => "resolvingError",
            Self::AnyTemplate => "any",
            Self::RegionalAnyCapitalized => "toBeReplacedStringRegional",
            Self::RegionalAnyLowercase => "replacementStringRegional",
            Self::ThingNotImplemented => "thingNotImplemented",
            Self::Sir => "Sir",
            Self::Madam => "Madam",
            Self::Alchemists => "Alchemists",
            Self::Armorers => "Armorers",
            Self::Banks => "Banks",
            Self::Bookstores => "Bookstores",
            Self::ClothingStores => "Clothingstores",
            Self::GemStores => "Gemstores",
            Self::GeneralStores => "Generalstores",
            Self::Guilds => "Guilds",
            Self::Libraries => "Libraries",
            Self::PawnShops => "Pawnshops",
            Self::Taverns => "Taverns",
            Self::WeaponSmiths => "Weaponsmiths",
            Self::LocalTemples => "Localtemples",
            Self::East => "east",
            Self::NorthEast => "northeast",
            Self::North => "north",
            Self::NorthWest => "northwest",
            Self::West => "west",
            Self::SouthWest => "southwest",
            Self::South => "south",
            Self::SouthEast => "southeast",
        }
    }

    /// English fallback used by [`TextTable`] when no override is loaded.
    #[must_use]
    pub fn default_text(self) -> &'static str {
        match self {
            Self::AnyNews => "Any News?",
            Self::PreviousList => "Previous List",
            Self::General => "General",
            Self::Regional => "Regional",
            Self::ResolvingError => "Hmm... I'm not sure what you mean.",
            Self::AnyTemplate => "Any %s",
            Self::RegionalAnyCapitalized => "Any ",
            Self::RegionalAnyLowercase => "any ",
            Self::ThingNotImplemented => "not implemented",
            Self::Sir => "sir",
            Self::Madam => "madam",
            Self::Alchemists => "Alchemists",
            Self::Armorers => "Armorers",
            Self::Banks => "Banks",
            Self::Bookstores => "Bookstores",
            Self::ClothingStores => "Clothing Stores",
            Self::GemStores => "Gem Stores",
            Self::GeneralStores => "General Stores",
            Self::Guilds => "Guilds",
            Self::Libraries => "Libraries",
            Self::PawnShops => "Pawn Shops",
            Self::Taverns => "Taverns",
            Self::WeaponSmiths => "Weapon Smiths",
            Self::LocalTemples => "Local Temples",
            Self::East => "east",
            Self::NorthEast => "northeast",
            Self::North => "north",
            Self::NorthWest => "northwest",
            Self::West => "west",
            Self::SouthWest => "southwest",
            Self::South => "south",
            Self::SouthEast => "southeast",
        }
    }
}

/// Values conversation macros expand to, pulled on demand during expansion.
///
/// Hint macros have side effects (a map reveal, dialog-linked topics becoming
/// visible), so a provider should only ask for what the text contains.
pub trait MacroSource {
    /// Display name of the conversation partner.
    fn npc_name(&self) -> String;
    /// Caption of the topic currently being discussed.
    fn key_subject(&self) -> String;
    /// "sir" or "madam".
    fn honorific(&self) -> String;
    /// Town chosen by the last regional answer.
    fn regional_location(&self) -> String;
    /// Compass direction from the player to the key subject building.
    fn direction(&mut self) -> String;
    /// Name of the key subject building, revealing it on the map if the
    /// current answer allows that.
    fn mark_location(&mut self) -> String;
    /// A direction or map hint to the key subject building.
    fn location_hint(&mut self) -> String;
    /// A location hint to where the key subject person is.
    fn person_hint(&mut self) -> String;
    /// A random "tell me about" answer for the current quest topic.
    fn dialog_hint(&mut self) -> String;
    /// A random rumor answer for the current quest topic.
    fn dialog_hint2(&mut self) -> String;
}

/// [`MacroSource`] with fixed values and no side effects.
#[derive(Debug, Clone, Default)]
pub struct StaticMacros {
    /// Value of every NPC name macro.
    pub npc_name: String,
    /// Value of every key subject macro.
    pub key_subject: String,
    /// Value of every honorific macro.
    pub honorific: String,
    /// Value of every regional town macro.
    pub regional_location: String,
    /// Value of every direction macro.
    pub direction: String,
}

impl MacroSource for StaticMacros {
    fn npc_name(&self) -> String {
        self.npc_name.clone()
    }

    fn key_subject(&self) -> String {
        self.key_subject.clone()
    }

    fn honorific(&self) -> String {
        self.honorific.clone()
    }

    fn regional_location(&self) -> String {
        self.regional_location.clone()
    }

    fn direction(&mut self) -> String {
        self.direction.clone()
    }

    fn mark_location(&mut self) -> String {
        self.key_subject.clone()
    }

    fn location_hint(&mut self) -> String {
        String::new()
    }

    fn person_hint(&mut self) -> String {
        String::new()
    }

    fn dialog_hint(&mut self) -> String {
        String::new()
    }

    fn dialog_hint2(&mut self) -> String {
        String::new()
    }
}

/// Source of conversation text, owned by the host.
pub trait TextProvider {
    /// A random variant of a numbered record, macros unexpanded.
    ///
    /// Returns an empty sequence if the record does not exist.
    fn random_tokens(&self, record: RecordId, rng: &mut dyn RngCore) -> TokenSeq;

    /// A fixed localized string.
    fn localized(&self, key: TextKey) -> String;

    /// Expand conversation macros in place.
    fn expand_macros(&self, tokens: &mut TokenSeq, source: &mut dyn MacroSource);

    /// Full generated name for an NPC name seed.
    fn npc_full_name(&self, name_seed: i32, gender: Gender) -> String;
}

/// In-memory [`TextProvider`] backed by record and string tables.
///
/// Macros: `%n` NPC name, `%k` key subject, `%t` regional town, `%di`
/// direction, `%hs` honorific, `%loc` map reveal, `%lh` location hint, `%ph`
/// person hint, `%dh` and `%dh2` dialog hints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextTable {
    /// Record id → variants.
    #[serde(default)]
    pub records: HashMap<RecordId, Vec<TokenSeq>>,
    /// Localized string overrides keyed by [`TextKey::as_str`].
    #[serde(default)]
    pub strings: HashMap<String, String>,
    /// Name pool for generated NPC names.
    #[serde(default)]
    pub names: Vec<String>,
}

const MACRO_CODES: [&str; 10] = [
    "%dh2", "%dh", "%di", "%hs", "%lh", "%loc", "%ph", "%n", "%k", "%t",
];

impl TextTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record with plain-text variants.
    #[must_use]
    pub fn with_record(mut self, record: u32, variants: &[&str]) -> Self {
        self.insert_record(RecordId(record), variants);
        self
    }

    /// Register a record with plain-text variants.
    pub fn insert_record(&mut self, record: RecordId, variants: &[&str]) {
        let seqs = variants.iter().map(|v| vec![Token::text(*v)]).collect();
        self.records.insert(record, seqs);
    }
}

impl TextProvider for TextTable {
    fn random_tokens(&self, record: RecordId, rng: &mut dyn RngCore) -> TokenSeq {
        match self.records.get(&record) {
            Some(variants) if !variants.is_empty() => {
                variants[rng.gen_range(0..variants.len())].clone()
            }
            _ => Vec::new(),
        }
    }

    fn localized(&self, key: TextKey) -> String {
        self.strings
            .get(key.as_str())
            .cloned()
            .unwrap_or_else(|| key.default_text().to_string())
    }

    fn expand_macros(&self, tokens: &mut TokenSeq, source: &mut dyn MacroSource) {
        for token in tokens.iter_mut() {
            let Token::Text(text) = token else {
                continue;
            };
            if !text.contains('%') {
                continue;
            }
            // Longer codes first so `%dh2` is not read as `%dh`.
            let mut expanded = std::mem::take(text);
            for code in MACRO_CODES {
                if !expanded.contains(code) {
                    continue;
                }
                let value = match code {
                    "%dh2" => source.dialog_hint2(),
                    "%dh" => source.dialog_hint(),
                    "%di" => source.direction(),
                    "%hs" => source.honorific(),
                    "%lh" => source.location_hint(),
                    "%loc" => source.mark_location(),
                    "%ph" => source.person_hint(),
                    "%n" => source.npc_name(),
                    "%k" => source.key_subject(),
                    "%t" => source.regional_location(),
                    _ => continue,
                };
                expanded = expanded.replace(code, &value);
            }
            *text = expanded;
        }
    }

    fn npc_full_name(&self, name_seed: i32, _gender: Gender) -> String {
        if self.names.is_empty() {
            return format!("Stranger {name_seed}");
        }
        let slot = name_seed.unsigned_abs() as usize % self.names.len();
        self.names[slot].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn missing_record_is_empty() {
        let table = TextTable::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(table.random_tokens(RecordId(7206), &mut rng).is_empty());
    }

    #[test]
    fn random_variant_comes_from_record() {
        let table = TextTable::new().with_record(7206, &["Go away.", "What?"]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let tokens = table.random_tokens(RecordId(7206), &mut rng);
            let text = crate::types::tokens_to_string(&tokens);
            assert!(text == "Go away." || text == "What?");
        }
    }

    #[test]
    fn localized_prefers_override() {
        let mut table = TextTable::new();
        assert_eq!(table.localized(TextKey::AnyNews), "Any News?");
        table.strings.insert("AnyNews".into(), "Neuigkeiten?".into());
        assert_eq!(table.localized(TextKey::AnyNews), "Neuigkeiten?");
    }

    #[test]
    fn macros_expand_from_source() {
        let table = TextTable::new();
        let mut tokens = vec![Token::text("%n says %k lies %di of here, %hs.")];
        let mut source = StaticMacros {
            npc_name: "Gothal".into(),
            key_subject: "The Rusty Anchor".into(),
            direction: "north".into(),
            honorific: "sir".into(),
            ..StaticMacros::default()
        };
        table.expand_macros(&mut tokens, &mut source);
        assert_eq!(
            tokens,
            vec![Token::text("Gothal says The Rusty Anchor lies north of here, sir.")]
        );
    }

    #[derive(Default)]
    struct CountingMacros {
        hints: usize,
        hints2: usize,
    }

    impl MacroSource for CountingMacros {
        fn npc_name(&self) -> String {
            String::new()
        }
        fn key_subject(&self) -> String {
            String::new()
        }
        fn honorific(&self) -> String {
            String::new()
        }
        fn regional_location(&self) -> String {
            String::new()
        }
        fn direction(&mut self) -> String {
            String::new()
        }
        fn mark_location(&mut self) -> String {
            String::new()
        }
        fn location_hint(&mut self) -> String {
            String::new()
        }
        fn person_hint(&mut self) -> String {
            String::new()
        }
        fn dialog_hint(&mut self) -> String {
            self.hints += 1;
            "info".into()
        }
        fn dialog_hint2(&mut self) -> String {
            self.hints2 += 1;
            "rumor".into()
        }
    }

    #[test]
    fn only_present_macros_are_pulled() {
        let table = TextTable::new();
        let mut source = CountingMacros::default();
        let mut tokens = vec![Token::text("They say %dh2."), Token::text("no macros")];
        table.expand_macros(&mut tokens, &mut source);
        assert_eq!(tokens[0], Token::text("They say rumor."));
        assert_eq!((source.hints, source.hints2), (0, 1));
    }

    #[test]
    fn names_are_seed_stable() {
        let table = TextTable {
            names: vec!["Ana".into(), "Bors".into()],
            ..TextTable::default()
        };
        assert_eq!(table.npc_full_name(3, Gender::Female), "Bors");
        assert_eq!(table.npc_full_name(3, Gender::Male), table.npc_full_name(3, Gender::Female));
        assert_eq!(TextTable::new().npc_full_name(12, Gender::Male), "Stranger 12");
    }
}
