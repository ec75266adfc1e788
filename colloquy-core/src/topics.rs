//! Topic lists: the four menus the dialogue window shows.
//!
//! - "Tell me about": any news, visible quest topics, fixed organizations.
//! - "Where is" → location: local buildings grouped by type, quest
//!   residences and palaces under "General", services found elsewhere in the
//!   region under "Regional".
//! - "Where is" → person: quest persons in the player's map cell.
//! - "Where is" → thing: always empty.
//!
//! Lists are plain trees. A group's first child navigates back to its parent
//! list, which is named by [`TopicListKind`] instead of a pointer. Callers
//! address topics with a [`TopicRef`].

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::buildings::{BuildingDirectory, BuildingType, REGIONAL_TABLE};
use crate::error::{Result, TalkError};
use crate::registry::{QuestResourceKind, QuestTopicRegistry};
use crate::text::{TextKey, TextProvider};
use crate::types::{BuildingKey, FactionId, MapId, QuestId};
use crate::world::{FactionDirectory, PlaceScope, QuestEngine};

/// Factions listed under "tell me about", in order.
pub const ORGANIZATION_FACTIONS: [i32; 34] = [
    42, 40, 108, 129, 306, 353, 41, 67, 82, 84, 88, 92, 94, 106, 36, 83, 85, 89, 93, 95, 99, 107,
    37, 368, 408, 409, 410, 411, 413, 414, 415, 416, 417, 98,
];

// ---------------------------------------------------------------------------
// Topic items
// ---------------------------------------------------------------------------

/// What kind of question a topic asks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QuestionCategory {
    /// Not a question.
    #[default]
    None,
    /// Any news.
    News,
    /// Tell me about an organization.
    OrganizationInfo,
    /// Any work.
    Work,
    /// Where is a local building.
    LocalBuilding,
    /// Where is a service elsewhere in the region.
    Regional,
    /// Where is a person.
    Person,
    /// Where is a thing.
    Thing,
    /// Tell me about a quest location.
    QuestLocation,
    /// Tell me about a quest person.
    QuestPerson,
    /// Tell me about a quest item.
    QuestItem,
}

impl QuestionCategory {
    /// Category of a quest topic under "tell me about".
    #[must_use]
    pub fn for_quest_resource(kind: QuestResourceKind) -> Self {
        match kind {
            QuestResourceKind::Location => Self::QuestLocation,
            QuestResourceKind::Person => Self::QuestPerson,
            QuestResourceKind::Thing => Self::QuestItem,
            QuestResourceKind::NotSet => Self::None,
        }
    }

    /// Whether this is a quest topic.
    #[must_use]
    pub fn is_quest_topic(self) -> bool {
        matches!(self, Self::QuestLocation | Self::QuestPerson | Self::QuestItem)
    }
}

/// Whether the conversation partner knows about a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NpcKnowledge {
    /// Not asked yet.
    #[default]
    Unset,
    /// Decided: does not know.
    DoesNotKnow,
    /// Decided: knows.
    Knows,
}

impl NpcKnowledge {
    /// Decide once with the given chance of knowing, then keep the answer.
    /// Returns whether the NPC knows.
    pub fn decide(&mut self, rng: &mut dyn RngCore, chance: f64) -> bool {
        if *self == Self::Unset {
            *self = if rng.gen_bool(chance.clamp(0.0, 1.0)) {
                Self::Knows
            } else {
                Self::DoesNotKnow
            };
        }
        *self == Self::Knows
    }
}

/// One of the four topic lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopicListKind {
    /// "Tell me about".
    TellMeAbout,
    /// "Where is" → location.
    Location,
    /// "Where is" → person.
    Person,
    /// "Where is" → thing.
    Thing,
}

/// Shape of a topic node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TopicNode {
    /// An answerable topic.
    Leaf,
    /// A submenu.
    Group {
        /// Entries of the submenu, starting with a back-navigation entry.
        children: Vec<TopicItem>,
    },
    /// Return to the parent list.
    BackNavigation {
        /// List to return to.
        parent: TopicListKind,
    },
}

/// One entry of a topic list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicItem {
    /// Leaf, group or back-navigation.
    pub node: TopicNode,
    /// Display caption.
    pub caption: String,
    /// Question asked when selected.
    pub question: QuestionCategory,
    /// Whether the current NPC knows about it.
    pub knowledge: NpcKnowledge,
    /// Building the topic refers to.
    pub building_key: Option<BuildingKey>,
    /// Quest the topic belongs to.
    pub quest: Option<QuestId>,
    /// Slot in a fixed table (organizations, regional services).
    pub index: Option<usize>,
}

impl TopicItem {
    /// An answerable topic.
    #[must_use]
    pub fn leaf(caption: impl Into<String>, question: QuestionCategory) -> Self {
        Self {
            node: TopicNode::Leaf,
            caption: caption.into(),
            question,
            knowledge: NpcKnowledge::Unset,
            building_key: None,
            quest: None,
            index: None,
        }
    }

    /// A submenu holding only its back-navigation entry.
    #[must_use]
    pub fn group(caption: impl Into<String>, parent: TopicListKind, back_caption: &str) -> Self {
        let back = Self {
            node: TopicNode::BackNavigation { parent },
            caption: back_caption.to_string(),
            question: QuestionCategory::None,
            knowledge: NpcKnowledge::Unset,
            building_key: None,
            quest: None,
            index: None,
        };
        Self {
            node: TopicNode::Group {
                children: vec![back],
            },
            ..Self::leaf(caption, QuestionCategory::None)
        }
    }

    /// Set the building.
    #[must_use]
    pub fn with_building(mut self, key: BuildingKey) -> Self {
        self.building_key = Some(key);
        self
    }

    /// Set the owning quest.
    #[must_use]
    pub fn with_quest(mut self, quest: QuestId) -> Self {
        self.quest = Some(quest);
        self
    }

    /// Set the fixed-table slot.
    #[must_use]
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Children of a group, empty otherwise.
    #[must_use]
    pub fn children(&self) -> &[TopicItem] {
        match &self.node {
            TopicNode::Group { children } => children,
            _ => &[],
        }
    }

    fn push_child(&mut self, child: TopicItem) {
        if let TopicNode::Group { children } = &mut self.node {
            children.push(child);
        }
    }

    /// Whether the topic can be asked about.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.node, TopicNode::Leaf)
    }

    fn reset_knowledge(&mut self) {
        self.knowledge = NpcKnowledge::Unset;
        if let TopicNode::Group { children } = &mut self.node {
            for child in children {
                child.reset_knowledge();
            }
        }
    }
}

/// Address of a topic inside [`TopicLists`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicRef {
    /// List holding the topic.
    pub list: TopicListKind,
    /// Group index within the list, for topics inside a group.
    pub group: Option<usize>,
    /// Index within the list or group.
    pub index: usize,
}

impl TopicRef {
    /// A top-level topic.
    #[must_use]
    pub fn top(list: TopicListKind, index: usize) -> Self {
        Self {
            list,
            group: None,
            index,
        }
    }

    /// A topic inside a group.
    #[must_use]
    pub fn in_group(list: TopicListKind, group: usize, index: usize) -> Self {
        Self {
            list,
            group: Some(group),
            index,
        }
    }
}

// ---------------------------------------------------------------------------
// Topic lists
// ---------------------------------------------------------------------------

/// The four topic lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicLists {
    /// "Tell me about".
    pub tell_me_about: Vec<TopicItem>,
    /// "Where is" → location.
    pub location: Vec<TopicItem>,
    /// "Where is" → person.
    pub person: Vec<TopicItem>,
    /// "Where is" → thing.
    pub thing: Vec<TopicItem>,
}

impl TopicLists {
    /// One list.
    #[must_use]
    pub fn list(&self, kind: TopicListKind) -> &[TopicItem] {
        match kind {
            TopicListKind::TellMeAbout => &self.tell_me_about,
            TopicListKind::Location => &self.location,
            TopicListKind::Person => &self.person,
            TopicListKind::Thing => &self.thing,
        }
    }

    fn list_mut(&mut self, kind: TopicListKind) -> &mut Vec<TopicItem> {
        match kind {
            TopicListKind::TellMeAbout => &mut self.tell_me_about,
            TopicListKind::Location => &mut self.location,
            TopicListKind::Person => &mut self.person,
            TopicListKind::Thing => &mut self.thing,
        }
    }

    /// Resolve a topic address.
    #[must_use]
    pub fn get(&self, topic: TopicRef) -> Option<&TopicItem> {
        let list = self.list(topic.list);
        match topic.group {
            Some(g) => list.get(g)?.children().get(topic.index),
            None => list.get(topic.index),
        }
    }

    /// Resolve a topic address mutably.
    pub fn get_mut(&mut self, topic: TopicRef) -> Option<&mut TopicItem> {
        let list = self.list_mut(topic.list);
        match topic.group {
            Some(g) => match &mut list.get_mut(g)?.node {
                TopicNode::Group { children } => children.get_mut(topic.index),
                _ => None,
            },
            None => list.get_mut(topic.index),
        }
    }

    /// Resolve a topic address, failing if it does not name a leaf.
    ///
    /// # Errors
    /// Returns [`TalkError::InvalidTopic`] if the address is out of range or
    /// names a group or back-navigation entry.
    pub fn leaf_mut(&mut self, topic: TopicRef) -> Result<&mut TopicItem> {
        match self.get_mut(topic) {
            Some(item) if item.is_leaf() => Ok(item),
            _ => Err(TalkError::InvalidTopic(topic)),
        }
    }

    /// Find the first leaf with a caption, searching groups too.
    #[must_use]
    pub fn find(&self, list: TopicListKind, caption: &str) -> Option<TopicRef> {
        for (i, item) in self.list(list).iter().enumerate() {
            if item.is_leaf() && item.caption == caption {
                return Some(TopicRef::top(list, i));
            }
            if let Some(j) = item
                .children()
                .iter()
                .position(|c| c.is_leaf() && c.caption == caption)
            {
                return Some(TopicRef::in_group(list, i, j));
            }
        }
        None
    }

    /// Forget what the NPC knows about every topic.
    pub fn reset_knowledge(&mut self) {
        for list in [
            &mut self.tell_me_about,
            &mut self.location,
            &mut self.person,
            &mut self.thing,
        ] {
            for item in list {
                item.reset_knowledge();
            }
        }
    }

    /// Whether any leaf in the location, tell-me-about or person lists
    /// belongs to a quest.
    #[must_use]
    pub fn references_quest(&self, quest: QuestId) -> bool {
        [&self.tell_me_about, &self.location, &self.person]
            .into_iter()
            .flatten()
            .flat_map(|item| std::iter::once(item).chain(item.children()))
            .any(|item| item.quest == Some(quest))
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Build "tell me about".
pub fn assemble_tell_me_about(
    registry: &QuestTopicRegistry,
    factions: &dyn FactionDirectory,
    text: &dyn TextProvider,
) -> Vec<TopicItem> {
    let mut list = vec![TopicItem::leaf(text.localized(TextKey::AnyNews), QuestionCategory::News)];

    for (quest, name, entry) in registry.iter() {
        if entry.is_listed_in_tell_me_about() {
            list.push(
                TopicItem::leaf(name, QuestionCategory::for_quest_resource(entry.kind)).with_quest(quest),
            );
        }
    }

    for (i, id) in ORGANIZATION_FACTIONS.iter().enumerate() {
        let caption = factions
            .faction(FactionId(*id))
            .map_or_else(|| text.localized(TextKey::ResolvingError), |f| f.name);
        list.push(TopicItem::leaf(caption, QuestionCategory::OrganizationInfo).with_index(i));
    }
    list
}

/// Build "where is" → location.
///
/// # Errors
/// Returns [`TalkError::BuildingNotFound`] if a local quest residence names a
/// building the current location does not have.
pub fn assemble_location_list(
    buildings: &BuildingDirectory,
    location_map: MapId,
    registry: &QuestTopicRegistry,
    quests: &dyn QuestEngine,
    player_region: i32,
    text: &dyn TextProvider,
) -> Result<Vec<TopicItem>> {
    let back = text.localized(TextKey::PreviousList);
    let mut list = Vec::new();

    for building_type in BuildingType::ALL {
        if building_type.is_skipped_in_location_list() {
            continue;
        }
        let Some(caption) = building_type.group_caption() else {
            continue;
        };
        let mut group = TopicItem::group(text.localized(caption), TopicListKind::Location, &back);
        for building in buildings.of_type(building_type) {
            group.push_child(
                TopicItem::leaf(building.name.as_str(), QuestionCategory::LocalBuilding)
                    .with_building(building.key),
            );
        }
        if group.children().len() > 1 {
            list.push(group);
        }
    }

    let mut general = TopicItem::group(text.localized(TextKey::General), TopicListKind::Location, &back);
    for (quest, name, entry) in registry.iter() {
        if entry.kind != QuestResourceKind::Location || !entry.is_listed_in_where_is() {
            continue;
        }
        let Some(place) = entry.resource.and_then(|handle| quests.place(quest, handle)) else {
            continue;
        };
        if place.site.scope != PlaceScope::Local || place.site.map_id != location_map {
            continue;
        }
        let key = place.site.building_key;
        let building = buildings.get(key).ok_or(TalkError::BuildingNotFound(key))?;
        if building.building_type.is_residence() {
            general.push_child(
                TopicItem::leaf(name, QuestionCategory::LocalBuilding)
                    .with_building(key)
                    .with_quest(quest),
            );
        }
    }
    for palace in buildings.of_type(BuildingType::Palace) {
        general.push_child(
            TopicItem::leaf(palace.name.as_str(), QuestionCategory::LocalBuilding).with_building(palace.key),
        );
    }
    if general.children().len() > 1 {
        list.push(general);
    }

    let template = text.localized(TextKey::AnyTemplate);
    let mut regional = TopicItem::group(text.localized(TextKey::Regional), TopicListKind::Location, &back);
    for (i, entry) in REGIONAL_TABLE.iter().enumerate() {
        if entry.is_offered(buildings, player_region) {
            regional.push_child(
                TopicItem::leaf(template.replace("%s", entry.name), QuestionCategory::Regional).with_index(i),
            );
        }
    }
    list.push(regional);

    debug!(groups = list.len(), "Assembled location topics");
    Ok(list)
}

/// Build "where is" → person.
///
/// `partner` is the name of the static NPC the player talks to indoors. A
/// questor of that name standing in the player's building is left out, so
/// nobody is asked where they themselves are.
pub fn assemble_person_list(
    registry: &QuestTopicRegistry,
    quests: &dyn QuestEngine,
    player_map: MapId,
    interior_building: Option<BuildingKey>,
    partner: Option<&str>,
) -> Vec<TopicItem> {
    let mut list = Vec::new();
    for (quest, name, entry) in registry.iter() {
        if entry.kind != QuestResourceKind::Person || !entry.is_listed_in_where_is() {
            continue;
        }
        let Some(person) = entry.resource.and_then(|handle| quests.person(quest, handle)) else {
            continue;
        };

        let (same_cell, is_partner) = match person.questor {
            Some(questor) => {
                let is_partner = partner == Some(name)
                    && interior_building == Some(questor.building_key);
                (questor.map_id == player_map, is_partner)
            }
            None => {
                let same_cell = person
                    .assigned_place
                    .and_then(|handle| quests.place(quest, handle))
                    .is_some_and(|place| place.site.map_id == player_map);
                (same_cell, false)
            }
        };

        if same_cell && !is_partner {
            list.push(TopicItem::leaf(name, QuestionCategory::Person).with_quest(quest));
        }
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::TextTable;
    use crate::types::{GuildGroup, MapPosition, SocialGroup, Token};
    use crate::world::{
        BuildingSummary, FactionKind, FactionRecord, FactionTable, PersonResource, PlaceResource,
        QuestBook, QuestorData, ResourceHandle, SiteDetails,
    };
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn building(key: i32, building_type: BuildingType, name: &str) -> BuildingSummary {
        BuildingSummary {
            key: BuildingKey(key),
            building_type,
            name: name.to_string(),
            faction_id: FactionId(0),
            position: MapPosition::default(),
            occupants: Vec::new(),
        }
    }

    fn answer() -> Vec<crate::types::TokenSeq> {
        vec![vec![Token::text("answer")]]
    }

    #[test]
    fn knowledge_is_decided_once() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut knowledge = NpcKnowledge::Unset;
        let first = knowledge.decide(&mut rng, 0.5);
        assert_ne!(knowledge, NpcKnowledge::Unset);
        for _ in 0..20 {
            assert_eq!(knowledge.decide(&mut rng, 0.5), first);
        }
        let mut always = NpcKnowledge::Unset;
        assert!(always.decide(&mut rng, 1.0));
        let mut never = NpcKnowledge::Unset;
        assert!(!never.decide(&mut rng, 0.0));
    }

    #[test]
    fn tell_me_about_layout() {
        let mut registry = QuestTopicRegistry::new();
        registry.add_topic(QuestId(42), None, "Gothal", QuestResourceKind::Person, answer(), Vec::new());
        registry.add_topic(QuestId(42), None, "Hidden", QuestResourceKind::Person, answer(), Vec::new());
        registry.dialog_link(QuestId(42), "Hidden", QuestResourceKind::Person, None);
        let mut factions = FactionTable::new();
        factions.insert(FactionRecord {
            id: FactionId(42),
            kind: FactionKind::Group,
            region: -1,
            rep: 0,
            sgroup: SocialGroup::GuildMembers,
            ggroup: GuildGroup::Other,
            name: "The Crown".into(),
            face: None,
        });

        let list = assemble_tell_me_about(&registry, &factions, &TextTable::new());
        assert_eq!(list.len(), 1 + 1 + ORGANIZATION_FACTIONS.len());
        assert_eq!(list[0].question, QuestionCategory::News);
        assert_eq!(list[1].caption, "Gothal");
        assert_eq!(list[1].question, QuestionCategory::QuestPerson);
        assert_eq!(list[1].quest, Some(QuestId(42)));
        assert_eq!(list[2].caption, "The Crown");
        assert_eq!(list[2].index, Some(0));
    }

    #[test]
    fn location_groups_by_type_with_back_navigation() {
        let buildings = BuildingDirectory::new(vec![
            building(1, BuildingType::Tavern, "The Rusty Anchor"),
            building(2, BuildingType::Alchemist, "Potions"),
            building(3, BuildingType::Tavern, "The Dancing Bear"),
            building(4, BuildingType::House1, "Residence"),
            building(5, BuildingType::Palace, "Castle Daggerfall"),
        ])
        .expect("buildings");
        let list = assemble_location_list(
            &buildings,
            MapId(1),
            &QuestTopicRegistry::new(),
            &QuestBook::new(),
            0,
            &TextTable::new(),
        )
        .expect("list");

        let captions: Vec<&str> = list.iter().map(|g| g.caption.as_str()).collect();
        assert_eq!(captions, ["Alchemists", "Taverns", "General", "Regional"]);
        let taverns = list[1].children();
        assert!(matches!(
            taverns[0].node,
            TopicNode::BackNavigation {
                parent: TopicListKind::Location
            }
        ));
        assert_eq!(taverns[1].caption, "The Rusty Anchor");
        assert_eq!(taverns[2].building_key, Some(BuildingKey(3)));
        assert_eq!(list[2].children()[1].caption, "Castle Daggerfall");

        let regional = list[3].children();
        assert!(regional.iter().all(|c| c.caption != "Any Tavern"));
        assert!(regional.iter().any(|c| c.caption == "Any Bank"));
        assert!(regional.iter().all(|c| !c.caption.contains("Raven")));
    }

    #[test]
    fn quest_residences_join_general() {
        let buildings = BuildingDirectory::new(vec![building(9, BuildingType::House2, "Hovel")]).expect("buildings");
        let mut quests = QuestBook::new();
        quests.add_place(
            QuestId(3),
            PlaceResource {
                handle: ResourceHandle(1),
                site: SiteDetails {
                    map_id: MapId(1),
                    building_key: BuildingKey(9),
                    building_name: Some("Ebon Manor".into()),
                    location_name: "Daggerfall".into(),
                    scope: PlaceScope::Local,
                },
            },
        );
        let mut registry = QuestTopicRegistry::new();
        registry.add_topic(QuestId(3), Some(ResourceHandle(1)), "Ebon Manor", QuestResourceKind::Location, answer(), Vec::new());

        let list = assemble_location_list(&buildings, MapId(1), &registry, &quests, 0, &TextTable::new())
            .expect("list");
        let general = list.iter().find(|g| g.caption == "General").expect("general");
        assert_eq!(general.children()[1].caption, "Ebon Manor");
        assert_eq!(general.children()[1].quest, Some(QuestId(3)));
    }

    #[test]
    fn person_list_filters_by_cell_and_partner() {
        let mut quests = QuestBook::new();
        quests.add_person(
            QuestId(1),
            PersonResource {
                handle: ResourceHandle(1),
                display_name: "Questor".into(),
                questor: Some(QuestorData {
                    name_seed: 4,
                    map_id: MapId(1),
                    building_key: BuildingKey(8),
                }),
                assigned_place: None,
            },
        );
        quests.add_person(
            QuestId(1),
            PersonResource {
                handle: ResourceHandle(2),
                display_name: "Far Away".into(),
                questor: None,
                assigned_place: Some(ResourceHandle(3)),
            },
        );
        quests.add_place(
            QuestId(1),
            PlaceResource {
                handle: ResourceHandle(3),
                site: SiteDetails {
                    map_id: MapId(2),
                    building_key: BuildingKey(1),
                    building_name: None,
                    location_name: "Wayrest".into(),
                    scope: PlaceScope::Remote,
                },
            },
        );
        let mut registry = QuestTopicRegistry::new();
        registry.add_topic(QuestId(1), Some(ResourceHandle(1)), "Questor", QuestResourceKind::Person, answer(), Vec::new());
        registry.add_topic(QuestId(1), Some(ResourceHandle(2)), "Far Away", QuestResourceKind::Person, answer(), Vec::new());

        let list = assemble_person_list(&registry, &quests, MapId(1), None, None);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].caption, "Questor");

        let list = assemble_person_list(&registry, &quests, MapId(1), Some(BuildingKey(8)), Some("Questor"));
        assert!(list.is_empty());
        let list = assemble_person_list(&registry, &quests, MapId(1), Some(BuildingKey(9)), Some("Questor"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn refs_resolve_into_groups() {
        let mut lists = TopicLists::default();
        let mut group = TopicItem::group("Taverns", TopicListKind::Location, "Previous List");
        group.push_child(TopicItem::leaf("The Rusty Anchor", QuestionCategory::LocalBuilding));
        lists.location.push(group);

        let found = lists.find(TopicListKind::Location, "The Rusty Anchor").expect("found");
        assert_eq!(found, TopicRef::in_group(TopicListKind::Location, 0, 1));
        assert!(lists.leaf_mut(TopicRef::top(TopicListKind::Location, 0)).is_err());
        assert!(lists.leaf_mut(TopicRef::in_group(TopicListKind::Location, 0, 0)).is_err());

        lists.leaf_mut(found).expect("leaf").knowledge = NpcKnowledge::Knows;
        lists.reset_knowledge();
        assert_eq!(lists.get(found).map(|t| t.knowledge), Some(NpcKnowledge::Unset));
    }
}
