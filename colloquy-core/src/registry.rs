//! Quest topic registry.
//!
//! Every quest resource that dialogue can mention gets a [`QuestResourceEntry`],
//! keyed by quest then by topic name. Entries remember their answers, whether
//! they show up under "tell me about" and "where is", and which other topics a
//! dialog link redirected them to.
//!
//! Both levels are [`IndexMap`]s, so topic lists follow insertion order and
//! keep it across a save/load round trip.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, TalkError};
use crate::types::{BuildingKey, QuestId, TokenSeq};
use crate::world::{QuestEngine, ResourceHandle};

/// Kind of a quest resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QuestResourceKind {
    /// No kind; used for dialog links without a target.
    #[default]
    NotSet,
    /// A place.
    Location,
    /// A person.
    Person,
    /// An item.
    Thing,
}

/// Dialogue state of one quest resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestResourceEntry {
    /// Kind of resource.
    pub kind: QuestResourceKind,
    /// "Tell me about" answer variants.
    pub info_answers: Vec<TokenSeq>,
    /// Rumor answer variants.
    pub rumor_answers: Vec<TokenSeq>,
    /// False once a dialog link hid this topic.
    pub available_for_dialog: bool,
    /// Listed under "tell me about".
    pub has_entry_in_tell_me_about: bool,
    /// Listed under "where is".
    pub has_entry_in_where_is: bool,
    /// Locations this topic was linked to.
    pub dialog_linked_locations: Vec<String>,
    /// Persons this topic was linked to.
    pub dialog_linked_persons: Vec<String>,
    /// Things this topic was linked to.
    pub dialog_linked_things: Vec<String>,
    /// Live quest resource, relinked after a load.
    #[serde(skip)]
    pub resource: Option<ResourceHandle>,
}

impl QuestResourceEntry {
    /// A fresh, visible entry.
    #[must_use]
    pub fn new(kind: QuestResourceKind) -> Self {
        Self {
            kind,
            info_answers: Vec::new(),
            rumor_answers: Vec::new(),
            available_for_dialog: true,
            has_entry_in_tell_me_about: false,
            has_entry_in_where_is: false,
            dialog_linked_locations: Vec::new(),
            dialog_linked_persons: Vec::new(),
            dialog_linked_things: Vec::new(),
            resource: None,
        }
    }

    /// Whether the topic appears under "tell me about".
    #[must_use]
    pub fn is_listed_in_tell_me_about(&self) -> bool {
        self.available_for_dialog && self.has_entry_in_tell_me_about
    }

    /// Whether the topic may appear under "where is".
    #[must_use]
    pub fn is_listed_in_where_is(&self) -> bool {
        self.available_for_dialog && self.has_entry_in_where_is
    }
}

/// Topics of one quest, by name.
pub type QuestTopics = IndexMap<String, QuestResourceEntry>;

/// All quest topics, by quest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestTopicRegistry {
    quests: IndexMap<QuestId, QuestTopics>,
}

impl QuestTopicRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of quests with topics.
    #[must_use]
    pub fn quest_count(&self) -> usize {
        self.quests.len()
    }

    /// Whether the registry knows a quest.
    #[must_use]
    pub fn contains_quest(&self, quest: QuestId) -> bool {
        self.quests.contains_key(&quest)
    }

    /// Topics of a quest.
    #[must_use]
    pub fn quest(&self, quest: QuestId) -> Option<&QuestTopics> {
        self.quests.get(&quest)
    }

    /// Look up a topic.
    #[must_use]
    pub fn entry(&self, quest: QuestId, name: &str) -> Option<&QuestResourceEntry> {
        self.quests.get(&quest)?.get(name)
    }

    /// Every topic in quest order, then topic order.
    pub fn iter(&self) -> impl Iterator<Item = (QuestId, &str, &QuestResourceEntry)> {
        self.quests.iter().flat_map(|(quest, topics)| {
            topics
                .iter()
                .map(move |(name, entry)| (*quest, name.as_str(), entry))
        })
    }

    /// Insert or overwrite a topic. Returns `false` if the name is empty.
    ///
    /// Overwriting keeps the topic's position, visibility and dialog links.
    pub fn add_topic(
        &mut self,
        quest: QuestId,
        resource: Option<ResourceHandle>,
        name: &str,
        kind: QuestResourceKind,
        info_answers: Vec<TokenSeq>,
        rumor_answers: Vec<TokenSeq>,
    ) -> bool {
        if name.is_empty() {
            warn!(quest = %quest, "Ignoring quest topic without a name");
            return false;
        }
        let entry = self
            .quests
            .entry(quest)
            .or_default()
            .entry(name.to_string())
            .or_insert_with(|| QuestResourceEntry::new(kind));

        entry.kind = kind;
        entry.has_entry_in_tell_me_about = !info_answers.is_empty() || !rumor_answers.is_empty();
        entry.has_entry_in_where_is =
            matches!(kind, QuestResourceKind::Person | QuestResourceKind::Location);
        entry.info_answers = info_answers;
        entry.rumor_answers = rumor_answers;
        entry.resource = resource;

        debug!(
            quest = %quest,
            name,
            ?kind,
            info = entry.info_answers.len(),
            rumors = entry.rumor_answers.len(),
            "Added quest topic"
        );
        true
    }

    /// Hide a topic, and optionally the topic it links to, recording the link.
    ///
    /// Returns `false` if the quest or topic is unknown; nothing changes then.
    pub fn dialog_link(
        &mut self,
        quest: QuestId,
        name: &str,
        kind: QuestResourceKind,
        linked: Option<(&str, QuestResourceKind)>,
    ) -> bool {
        let Some(topics) = self.quests.get_mut(&quest) else {
            warn!(quest = %quest, name, "Dialog link for unknown quest");
            return false;
        };
        let Some(entry) = topics.get_mut(name) else {
            warn!(quest = %quest, name, "Dialog link for unknown quest topic");
            return false;
        };

        if let Some((linked_name, linked_kind)) = linked {
            let links = match linked_kind {
                QuestResourceKind::Location => Some(&mut entry.dialog_linked_locations),
                QuestResourceKind::Person => Some(&mut entry.dialog_linked_persons),
                QuestResourceKind::Thing => Some(&mut entry.dialog_linked_things),
                QuestResourceKind::NotSet => None,
            };
            if let Some(links) = links {
                if !links.iter().any(|l| l == linked_name) {
                    links.push(linked_name.to_string());
                }
            }
        }
        entry.available_for_dialog = false;
        debug!(quest = %quest, name, ?kind, "Hid quest topic behind dialog link");

        if let Some((linked_name, _)) = linked {
            match topics.get_mut(linked_name) {
                Some(target) => target.available_for_dialog = false,
                None => warn!(quest = %quest, linked = linked_name, "Dialog-linked quest topic not found"),
            }
        }
        true
    }

    /// Make a hidden topic available again. Returns `false` if it is unknown.
    pub fn set_available(&mut self, quest: QuestId, name: &str) -> bool {
        match self.quests.get_mut(&quest).and_then(|t| t.get_mut(name)) {
            Some(entry) => {
                entry.available_for_dialog = true;
                debug!(quest = %quest, name, "Quest topic available for dialog");
                true
            }
            None => {
                warn!(quest = %quest, name, "Cannot enable unknown quest topic");
                false
            }
        }
    }

    /// Drop every topic of a quest. Returns whether the quest was known.
    pub fn remove_quest(&mut self, quest: QuestId) -> bool {
        let removed = self.quests.shift_remove(&quest).is_some();
        if removed {
            debug!(quest = %quest, "Removed quest topics");
        }
        removed
    }

    /// Building a person topic currently refers to: the questor's own
    /// building, otherwise the building of the person's assigned place.
    ///
    /// # Errors
    /// Fails if the quest, topic or live resource is missing, if the topic is
    /// not a person, or if a non-questor has no assigned place.
    pub fn person_building_key(
        &self,
        quest: QuestId,
        name: &str,
        quests: &dyn QuestEngine,
    ) -> Result<BuildingKey> {
        let topics = self.quests.get(&quest).ok_or(TalkError::QuestNotFound(quest))?;
        let not_found = || TalkError::ResourceNotFound {
            quest,
            name: name.to_string(),
        };
        let entry = topics.get(name).ok_or_else(not_found)?;
        if entry.kind != QuestResourceKind::Person {
            return Err(TalkError::ResourceKindMismatch {
                quest,
                name: name.to_string(),
                expected: QuestResourceKind::Person,
                found: entry.kind,
            });
        }
        let person = entry
            .resource
            .and_then(|handle| quests.person(quest, handle))
            .ok_or_else(not_found)?;

        if let Some(questor) = person.questor {
            return Ok(questor.building_key);
        }
        let missing_place = || TalkError::MissingAssignedPlace {
            quest,
            name: name.to_string(),
        };
        let place = person
            .assigned_place
            .and_then(|handle| quests.place(quest, handle))
            .ok_or_else(missing_place)?;
        Ok(place.site.building_key)
    }

    /// Reattach live resources after a load. Persons match by display name,
    /// places by building name or else town name. Entries of quests the
    /// engine no longer runs stay orphaned. Returns the number of orphans.
    pub fn relink(&mut self, quests: &dyn QuestEngine) -> usize {
        let running = quests.quest_ids();
        let mut orphans = 0;
        for (quest, topics) in &mut self.quests {
            if !running.contains(quest) {
                orphans += topics.len();
                for entry in topics.values_mut() {
                    entry.resource = None;
                }
                continue;
            }
            let persons = quests.persons(*quest);
            let places = quests.places(*quest);
            for (name, entry) in topics.iter_mut() {
                entry.resource = match entry.kind {
                    QuestResourceKind::Person => persons
                        .iter()
                        .find(|p| &p.display_name == name)
                        .map(|p| p.handle),
                    QuestResourceKind::Location => places
                        .iter()
                        .find(|p| p.display_name() == name)
                        .map(|p| p.handle),
                    QuestResourceKind::Thing | QuestResourceKind::NotSet => None,
                };
                if entry.resource.is_none() && entry.kind != QuestResourceKind::Thing {
                    orphans += 1;
                }
            }
        }
        if orphans > 0 {
            warn!(orphans, "Quest topics without a live resource after load");
        }
        orphans
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MapId, Token};
    use crate::world::{PersonResource, PlaceResource, PlaceScope, QuestBook, QuestorData, SiteDetails};

    fn answers(n: usize) -> Vec<TokenSeq> {
        (0..n).map(|i| vec![Token::text(format!("answer {i}"))]).collect()
    }

    fn book() -> QuestBook {
        let mut book = QuestBook::new();
        book.add_place(
            QuestId(42),
            PlaceResource {
                handle: ResourceHandle(1),
                site: SiteDetails {
                    map_id: MapId(5),
                    building_key: BuildingKey(77),
                    building_name: Some("The Rusty Anchor".into()),
                    location_name: "Daggerfall".into(),
                    scope: PlaceScope::Local,
                },
            },
        );
        book.add_person(
            QuestId(42),
            PersonResource {
                handle: ResourceHandle(2),
                display_name: "Gothal".into(),
                questor: None,
                assigned_place: Some(ResourceHandle(1)),
            },
        );
        book.add_person(
            QuestId(42),
            PersonResource {
                handle: ResourceHandle(3),
                display_name: "Lady Brisienna".into(),
                questor: Some(QuestorData {
                    name_seed: 99,
                    map_id: MapId(5),
                    building_key: BuildingKey(12),
                }),
                assigned_place: None,
            },
        );
        book
    }

    #[test]
    fn add_topic_sets_flags() {
        let mut registry = QuestTopicRegistry::new();
        assert!(registry.add_topic(QuestId(42), None, "Gothal", QuestResourceKind::Person, answers(2), Vec::new()));
        let entry = registry.entry(QuestId(42), "Gothal").expect("entry");
        assert!(entry.is_listed_in_tell_me_about());
        assert!(entry.is_listed_in_where_is());

        registry.add_topic(QuestId(42), None, "Amulet", QuestResourceKind::Thing, Vec::new(), Vec::new());
        let entry = registry.entry(QuestId(42), "Amulet").expect("entry");
        assert!(!entry.has_entry_in_tell_me_about);
        assert!(!entry.has_entry_in_where_is);
    }

    #[test]
    fn empty_names_are_ignored() {
        let mut registry = QuestTopicRegistry::new();
        assert!(!registry.add_topic(QuestId(1), None, "", QuestResourceKind::Person, answers(1), Vec::new()));
        assert_eq!(registry.quest_count(), 0);
    }

    #[test]
    fn overwrite_keeps_order_and_visibility() {
        let mut registry = QuestTopicRegistry::new();
        registry.add_topic(QuestId(1), None, "A", QuestResourceKind::Person, answers(1), Vec::new());
        registry.add_topic(QuestId(1), None, "B", QuestResourceKind::Person, answers(1), Vec::new());
        registry.dialog_link(QuestId(1), "A", QuestResourceKind::Person, None);
        registry.add_topic(QuestId(1), None, "A", QuestResourceKind::Person, answers(3), Vec::new());

        let names: Vec<&str> = registry.iter().map(|(_, name, _)| name).collect();
        assert_eq!(names, ["A", "B"]);
        let entry = registry.entry(QuestId(1), "A").expect("entry");
        assert_eq!(entry.info_answers.len(), 3);
        assert!(!entry.available_for_dialog);
    }

    #[test]
    fn dialog_link_hides_both_and_dedupes() {
        let mut registry = QuestTopicRegistry::new();
        registry.add_topic(QuestId(1), None, "A", QuestResourceKind::Person, answers(1), Vec::new());
        registry.add_topic(QuestId(1), None, "B", QuestResourceKind::Location, answers(1), Vec::new());
        for _ in 0..2 {
            assert!(registry.dialog_link(
                QuestId(1),
                "A",
                QuestResourceKind::Person,
                Some(("B", QuestResourceKind::Location)),
            ));
        }
        let a = registry.entry(QuestId(1), "A").expect("A");
        assert!(!a.available_for_dialog);
        assert_eq!(a.dialog_linked_locations, ["B"]);
        assert!(!registry.entry(QuestId(1), "B").expect("B").available_for_dialog);
    }

    #[test]
    fn dialog_link_misses_are_soft() {
        let mut registry = QuestTopicRegistry::new();
        assert!(!registry.dialog_link(QuestId(9), "A", QuestResourceKind::Person, None));
        registry.add_topic(QuestId(1), None, "A", QuestResourceKind::Person, answers(1), Vec::new());
        assert!(!registry.dialog_link(QuestId(1), "Z", QuestResourceKind::Person, None));
        assert!(registry.entry(QuestId(1), "A").expect("A").available_for_dialog);
        // A missing link target still hides the source.
        assert!(registry.dialog_link(QuestId(1), "A", QuestResourceKind::Person, Some(("Z", QuestResourceKind::Thing))));
        assert!(!registry.entry(QuestId(1), "A").expect("A").available_for_dialog);
    }

    #[test]
    fn set_available_reverses_link() {
        let mut registry = QuestTopicRegistry::new();
        registry.add_topic(QuestId(1), None, "A", QuestResourceKind::Person, answers(1), Vec::new());
        registry.dialog_link(QuestId(1), "A", QuestResourceKind::Person, None);
        assert!(registry.set_available(QuestId(1), "A"));
        assert!(registry.entry(QuestId(1), "A").expect("A").is_listed_in_tell_me_about());
        assert!(!registry.set_available(QuestId(1), "nobody"));
    }

    #[test]
    fn person_building_key_resolution() {
        let quests = book();
        let mut registry = QuestTopicRegistry::new();
        registry.add_topic(QuestId(42), Some(ResourceHandle(2)), "Gothal", QuestResourceKind::Person, answers(1), Vec::new());
        registry.add_topic(QuestId(42), Some(ResourceHandle(3)), "Lady Brisienna", QuestResourceKind::Person, answers(1), Vec::new());
        registry.add_topic(QuestId(42), Some(ResourceHandle(1)), "The Rusty Anchor", QuestResourceKind::Location, answers(1), Vec::new());

        assert_eq!(registry.person_building_key(QuestId(42), "Gothal", &quests).expect("key"), BuildingKey(77));
        assert_eq!(
            registry.person_building_key(QuestId(42), "Lady Brisienna", &quests).expect("key"),
            BuildingKey(12)
        );
        assert!(matches!(
            registry.person_building_key(QuestId(42), "The Rusty Anchor", &quests),
            Err(TalkError::ResourceKindMismatch { .. })
        ));
        assert!(matches!(
            registry.person_building_key(QuestId(42), "Nobody", &quests),
            Err(TalkError::ResourceNotFound { .. })
        ));
        assert!(matches!(
            registry.person_building_key(QuestId(7), "Gothal", &quests),
            Err(TalkError::QuestNotFound(QuestId(7)))
        ));
    }

    #[test]
    fn relink_by_display_name() {
        let quests = book();
        let mut registry = QuestTopicRegistry::new();
        registry.add_topic(QuestId(42), None, "Gothal", QuestResourceKind::Person, answers(1), Vec::new());
        registry.add_topic(QuestId(42), None, "The Rusty Anchor", QuestResourceKind::Location, answers(1), Vec::new());
        registry.add_topic(QuestId(8), None, "Ghost", QuestResourceKind::Person, answers(1), Vec::new());

        assert_eq!(registry.relink(&quests), 1);
        assert_eq!(registry.entry(QuestId(42), "Gothal").and_then(|e| e.resource), Some(ResourceHandle(2)));
        assert_eq!(
            registry.entry(QuestId(42), "The Rusty Anchor").and_then(|e| e.resource),
            Some(ResourceHandle(1))
        );
        assert!(registry.contains_quest(QuestId(8)));
    }
}
