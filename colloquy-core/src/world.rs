//! World-facing collaborators: quest engine, faction table, player and location data.
//!
//! The engine owns none of this. Hosts implement [`QuestEngine`] and
//! [`FactionDirectory`] over their own data and hand the engine a
//! [`TalkContext`] for every call that needs to look outside itself.
//! [`QuestBook`] and [`FactionTable`] are in-memory implementations.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::buildings::BuildingType;
use crate::registry::QuestResourceKind;
use crate::text::TextProvider;
use crate::types::{
    BuildingKey, FactionId, Gender, GuildGroup, MapId, MapPosition, QuestId, SocialGroup, Token,
    TokenSeq,
};

// ---------------------------------------------------------------------------
// Quest resources
// ---------------------------------------------------------------------------

/// Handle of a live quest resource, owned by the quest engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHandle(pub u64);

/// Whether a quest place lies in the current town or elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaceScope {
    /// Inside the location the quest started in.
    #[default]
    Local,
    /// Anywhere else.
    Remote,
}

/// Where a quest place physically is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteDetails {
    /// Map cell of the site.
    pub map_id: MapId,
    /// Building the site refers to.
    pub building_key: BuildingKey,
    /// Building display name, if the site is a building.
    pub building_name: Option<String>,
    /// Name of the town or dungeon.
    pub location_name: String,
    /// Local or remote.
    pub scope: PlaceScope,
}

/// A place defined by a quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceResource {
    /// Live handle.
    pub handle: ResourceHandle,
    /// Resolved site.
    pub site: SiteDetails,
}

impl PlaceResource {
    /// Name the place is discussed under: its building, else its town.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.site
            .building_name
            .as_deref()
            .unwrap_or(&self.site.location_name)
    }
}

/// Placement of a person who is the questor of their quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestorData {
    /// Name seed of the placed NPC.
    pub name_seed: i32,
    /// Map cell the questor stands in.
    pub map_id: MapId,
    /// Building the questor stands in.
    pub building_key: BuildingKey,
}

/// A person defined by a quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonResource {
    /// Live handle.
    pub handle: ResourceHandle,
    /// Full display name.
    pub display_name: String,
    /// Set if this person is the questor.
    pub questor: Option<QuestorData>,
    /// Place the person was assigned to, if not a questor.
    pub assigned_place: Option<ResourceHandle>,
}

/// A dialog-linked resource revealed while expanding quest text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogReveal {
    /// Topic name of the revealed resource.
    pub name: String,
    /// Its kind.
    pub kind: QuestResourceKind,
}

/// Running quests and their resources.
pub trait QuestEngine {
    /// Ids of all quests currently running.
    fn quest_ids(&self) -> Vec<QuestId>;

    /// Person resources of a quest.
    fn persons(&self, quest: QuestId) -> Vec<PersonResource>;

    /// Place resources of a quest.
    fn places(&self, quest: QuestId) -> Vec<PlaceResource>;

    /// Look up a person by handle.
    fn person(&self, quest: QuestId, handle: ResourceHandle) -> Option<PersonResource>;

    /// Look up a place by handle.
    fn place(&self, quest: QuestId, handle: ResourceHandle) -> Option<PlaceResource>;

    /// Expand quest macros in place and report the dialog-linked resources
    /// the text revealed.
    fn expand_quest_message(&self, quest: QuestId, tokens: &mut TokenSeq) -> Vec<DialogReveal>;

    /// Whether the NPC the player last clicked is already questor of a running quest.
    fn is_last_clicked_npc_active_questor(&self) -> bool;
}

/// Resources of one quest inside a [`QuestBook`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestResources {
    /// Persons.
    pub persons: Vec<PersonResource>,
    /// Places.
    pub places: Vec<PlaceResource>,
}

/// In-memory [`QuestEngine`].
///
/// Quest text may reference a resource as `{Name}`; expansion replaces the
/// reference with the plain name and reports it as revealed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestBook {
    /// Running quests in start order.
    pub quests: IndexMap<QuestId, QuestResources>,
    /// Answer for [`QuestEngine::is_last_clicked_npc_active_questor`].
    pub last_clicked_npc_is_questor: bool,
}

impl QuestBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a person to a quest, starting the quest if needed.
    pub fn add_person(&mut self, quest: QuestId, person: PersonResource) {
        self.quests.entry(quest).or_default().persons.push(person);
    }

    /// Add a place to a quest, starting the quest if needed.
    pub fn add_place(&mut self, quest: QuestId, place: PlaceResource) {
        self.quests.entry(quest).or_default().places.push(place);
    }

    /// End a quest.
    pub fn end_quest(&mut self, quest: QuestId) {
        self.quests.shift_remove(&quest);
    }
}

impl QuestEngine for QuestBook {
    fn quest_ids(&self) -> Vec<QuestId> {
        self.quests.keys().copied().collect()
    }

    fn persons(&self, quest: QuestId) -> Vec<PersonResource> {
        self.quests
            .get(&quest)
            .map(|q| q.persons.clone())
            .unwrap_or_default()
    }

    fn places(&self, quest: QuestId) -> Vec<PlaceResource> {
        self.quests
            .get(&quest)
            .map(|q| q.places.clone())
            .unwrap_or_default()
    }

    fn person(&self, quest: QuestId, handle: ResourceHandle) -> Option<PersonResource> {
        self.quests
            .get(&quest)?
            .persons
            .iter()
            .find(|p| p.handle == handle)
            .cloned()
    }

    fn place(&self, quest: QuestId, handle: ResourceHandle) -> Option<PlaceResource> {
        self.quests
            .get(&quest)?
            .places
            .iter()
            .find(|p| p.handle == handle)
            .cloned()
    }

    fn expand_quest_message(&self, quest: QuestId, tokens: &mut TokenSeq) -> Vec<DialogReveal> {
        let Some(resources) = self.quests.get(&quest) else {
            return Vec::new();
        };
        let names = resources
            .persons
            .iter()
            .map(|p| (p.display_name.as_str(), QuestResourceKind::Person))
            .chain(
                resources
                    .places
                    .iter()
                    .map(|p| (p.display_name(), QuestResourceKind::Location)),
            );

        let mut reveals = Vec::new();
        for (name, kind) in names {
            let pattern = format!("{{{name}}}");
            let mut found = false;
            for token in tokens.iter_mut() {
                if let Token::Text(text) = token {
                    if text.contains(&pattern) {
                        *text = text.replace(&pattern, name);
                        found = true;
                    }
                }
            }
            if found {
                reveals.push(DialogReveal {
                    name: name.to_string(),
                    kind,
                });
            }
        }
        reveals
    }

    fn is_last_clicked_npc_active_questor(&self) -> bool {
        self.last_clicked_npc_is_questor
    }
}

// ---------------------------------------------------------------------------
// Factions
// ---------------------------------------------------------------------------

/// Kind column of the faction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactionKind {
    /// A named individual.
    Individual,
    /// An organization.
    Group,
    /// A region's ruling faction.
    Province,
    /// A temple of the Divines.
    Temple,
    /// A knightly order.
    KnightlyOrder,
    /// The ordinary people of a region.
    People,
    /// Anything else.
    Other,
}

/// One row of the faction table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionRecord {
    /// Faction id.
    pub id: FactionId,
    /// Kind of faction.
    pub kind: FactionKind,
    /// One-based region the faction belongs to, or -1.
    pub region: i32,
    /// Player standing with this faction.
    pub rep: i32,
    /// Social group of members.
    pub sgroup: SocialGroup,
    /// Guild group of members.
    pub ggroup: GuildGroup,
    /// Display name.
    pub name: String,
    /// Special portrait index, if members use one.
    pub face: Option<i32>,
}

/// Read access to the faction table.
pub trait FactionDirectory {
    /// Look up a faction by id.
    fn faction(&self, id: FactionId) -> Option<FactionRecord>;

    /// All factions of a kind in a one-based region, optionally filtered by
    /// social group.
    fn find_factions(
        &self,
        kind: FactionKind,
        sgroup: Option<SocialGroup>,
        region: i32,
    ) -> Vec<FactionRecord>;
}

/// In-memory [`FactionDirectory`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactionTable {
    factions: HashMap<FactionId, FactionRecord>,
}

impl FactionTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a faction.
    pub fn insert(&mut self, record: FactionRecord) {
        self.factions.insert(record.id, record);
    }

    /// Mutable access to a faction, for adjusting standing.
    pub fn get_mut(&mut self, id: FactionId) -> Option<&mut FactionRecord> {
        self.factions.get_mut(&id)
    }
}

impl FactionDirectory for FactionTable {
    fn faction(&self, id: FactionId) -> Option<FactionRecord> {
        self.factions.get(&id).cloned()
    }

    fn find_factions(
        &self,
        kind: FactionKind,
        sgroup: Option<SocialGroup>,
        region: i32,
    ) -> Vec<FactionRecord> {
        let mut found: Vec<FactionRecord> = self
            .factions
            .values()
            .filter(|f| f.kind == kind && f.region == region)
            .filter(|f| sgroup.is_none_or(|g| f.sgroup == g))
            .cloned()
            .collect();
        found.sort_by_key(|f| f.id.0);
        found
    }
}

// ---------------------------------------------------------------------------
// Player and location
// ---------------------------------------------------------------------------

/// The parts of the player the conversation engine reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    /// Zero-based region index.
    pub region: i32,
    /// Current map cell.
    pub map_id: MapId,
    /// Whether the player is inside a building.
    pub inside: bool,
    /// Building the player entered, while inside.
    pub interior_building: Option<BuildingKey>,
    /// Position on the exterior automap.
    pub position: MapPosition,
    /// Player gender.
    pub gender: Gender,
    /// Reaction modifier from the character biography.
    pub biography_reaction_mod: i32,
    /// Standing per social group, indexed by [`SocialGroup::index`].
    pub sgroup_reputations: Vec<i32>,
    /// Guilds the player belongs to.
    pub guild_memberships: Vec<GuildGroup>,
}

impl PlayerState {
    /// One-based region index as used by the faction table.
    #[must_use]
    pub fn one_based_region(&self) -> i32 {
        self.region + 1
    }

    /// Whether the player is a member of the given guild.
    #[must_use]
    pub fn is_member_of(&self, guild: GuildGroup) -> bool {
        guild != GuildGroup::None && self.guild_memberships.contains(&guild)
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            region: 0,
            map_id: MapId(0),
            inside: false,
            interior_building: None,
            position: MapPosition::default(),
            gender: Gender::Male,
            biography_reaction_mod: 0,
            sgroup_reputations: vec![0; 5],
            guild_memberships: Vec::new(),
        }
    }
}

/// An NPC placed inside a building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    /// Name seed.
    pub name_seed: i32,
    /// Faction, or `FactionId(0)` for the region's common people.
    pub faction_id: FactionId,
    /// Gender.
    pub gender: Gender,
}

/// One exterior building of the current location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingSummary {
    /// Building key.
    pub key: BuildingKey,
    /// Building type.
    pub building_type: BuildingType,
    /// Generated display name; may be empty.
    pub name: String,
    /// Owning faction.
    pub faction_id: FactionId,
    /// Position on the exterior automap.
    pub position: MapPosition,
    /// NPCs placed inside.
    pub occupants: Vec<Occupant>,
}

/// A town in the current region with its packed service flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionLocation {
    /// Town name.
    pub name: String,
    /// Packed key: temple flags in bits 0-7, store flags 8-15, guild flags 16-23.
    pub key: u32,
}

/// The current region's location table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSnapshot {
    /// Towns of the region.
    pub locations: Vec<RegionLocation>,
}

/// The location the player is currently in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    /// Location index, unique per region.
    pub location_index: i32,
    /// Map cell of the location.
    pub map_id: MapId,
    /// Location name.
    pub name: String,
    /// Exterior buildings.
    pub buildings: Vec<BuildingSummary>,
    /// The surrounding region.
    pub region: RegionSnapshot,
}

// ---------------------------------------------------------------------------
// Call context
// ---------------------------------------------------------------------------

/// Everything outside the engine that a conversation operation may read.
#[derive(Clone, Copy)]
pub struct TalkContext<'a> {
    /// Conversation text.
    pub text: &'a dyn TextProvider,
    /// Running quests.
    pub quests: &'a dyn QuestEngine,
    /// Faction table.
    pub factions: &'a dyn FactionDirectory,
    /// The player.
    pub player: &'a PlayerState,
}
