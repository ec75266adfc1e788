//! NPCs in the current town who offer work.
//!
//! The pool is rebuilt when the player enters a different location. Each
//! eligible occupant gets one roll; the result holds until the next rebuild so
//! the same NPCs keep offering work on every visit.

use indexmap::IndexMap;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::buildings::BuildingDirectory;
use crate::types::{BuildingKey, FactionId, Gender, SocialGroup};
use crate::world::{FactionDirectory, FactionKind};

/// An NPC offering work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcWorkEntry {
    /// Name seed of the NPC.
    pub name_seed: i32,
    /// Faction the NPC belongs to.
    pub faction_id: FactionId,
    /// Gender.
    pub gender: Gender,
    /// Building the NPC stands in.
    pub building_key: BuildingKey,
    /// Social group of the faction.
    pub social_group: SocialGroup,
    /// Name of the building.
    pub building_name: String,
}

/// Work-offering NPCs keyed by name seed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcWorkPool {
    entries: IndexMap<i32, NpcWorkEntry>,
    built_for: Option<i32>,
}

fn offers_work(group: SocialGroup) -> bool {
    matches!(
        group,
        SocialGroup::Merchants | SocialGroup::Commoners | SocialGroup::Nobility
    )
}

impl NpcWorkPool {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a pool from persisted entries, treating it as built for
    /// `location_index`.
    #[must_use]
    pub fn from_entries(
        location_index: Option<i32>,
        entries: impl IntoIterator<Item = NpcWorkEntry>,
    ) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.name_seed, e)).collect(),
            built_for: location_index,
        }
    }

    /// Drop an NPC, for instance once their quest was accepted.
    pub fn remove(&mut self, name_seed: i32) -> Option<NpcWorkEntry> {
        self.entries.shift_remove(&name_seed)
    }

    /// Location index the pool was last built for.
    #[must_use]
    pub fn built_for(&self) -> Option<i32> {
        self.built_for
    }

    /// Whether the pool needs rebuilding for a location.
    #[must_use]
    pub fn is_stale_for(&self, location_index: i32) -> bool {
        self.built_for != Some(location_index)
    }

    /// Roll every occupant of the location's buildings and keep those who
    /// offer work.
    ///
    /// Occupants with faction 0 stand for the region's common people and
    /// resolve to its single commoner faction; a region with none or several
    /// contributes no such occupants.
    pub fn rebuild(
        &mut self,
        location_index: i32,
        buildings: &BuildingDirectory,
        factions: &dyn FactionDirectory,
        one_based_region: i32,
        offer_chance: f64,
        rng: &mut dyn RngCore,
    ) {
        self.entries.clear();
        self.built_for = Some(location_index);
        let chance = offer_chance.clamp(0.0, 1.0);

        for building in buildings.buildings() {
            if building.name.is_empty() {
                continue;
            }
            for occupant in &building.occupants {
                let faction = if occupant.faction_id == FactionId(0) {
                    let people = factions.find_factions(
                        FactionKind::People,
                        Some(SocialGroup::Commoners),
                        one_based_region,
                    );
                    match people.as_slice() {
                        [only] => Some(only.clone()),
                        _ => {
                            debug!(region = one_based_region, found = people.len(), "No unique commoner faction");
                            None
                        }
                    }
                } else {
                    factions.faction(occupant.faction_id)
                };
                let Some(faction) = faction else {
                    continue;
                };
                if !offers_work(faction.sgroup) || !rng.gen_bool(chance) {
                    continue;
                }
                self.entries
                    .entry(occupant.name_seed)
                    .or_insert_with(|| NpcWorkEntry {
                        name_seed: occupant.name_seed,
                        faction_id: faction.id,
                        gender: occupant.gender,
                        building_key: building.key,
                        social_group: faction.sgroup,
                        building_name: building.name.clone(),
                    });
            }
        }
        info!(location_index, offering = self.entries.len(), "Rebuilt work pool");
    }

    /// Whether the NPC with this seed offers work.
    #[must_use]
    pub fn contains(&self, name_seed: i32) -> bool {
        self.entries.contains_key(&name_seed)
    }

    /// Entry for an NPC.
    #[must_use]
    pub fn get(&self, name_seed: i32) -> Option<&NpcWorkEntry> {
        self.entries.get(&name_seed)
    }

    /// All entries in discovery order.
    pub fn entries(&self) -> impl Iterator<Item = &NpcWorkEntry> {
        self.entries.values()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nobody offers work.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pick an entry uniformly at random.
    pub fn pick(&self, rng: &mut dyn RngCore) -> Option<&NpcWorkEntry> {
        if self.entries.is_empty() {
            return None;
        }
        self.entries
            .get_index(rng.gen_range(0..self.entries.len()))
            .map(|(_, entry)| entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::BuildingType;
    use crate::types::{GuildGroup, MapPosition};
    use crate::world::{BuildingSummary, FactionRecord, FactionTable, Occupant};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn faction(id: i32, kind: FactionKind, region: i32, sgroup: SocialGroup) -> FactionRecord {
        FactionRecord {
            id: FactionId(id),
            kind,
            region,
            rep: 0,
            sgroup,
            ggroup: GuildGroup::None,
            name: format!("Faction {id}"),
            face: None,
        }
    }

    fn occupant(seed: i32, faction: i32) -> Occupant {
        Occupant {
            name_seed: seed,
            faction_id: FactionId(faction),
            gender: Gender::Female,
        }
    }

    fn town(occupants: Vec<Occupant>, name: &str) -> BuildingDirectory {
        BuildingDirectory::new(vec![BuildingSummary {
            key: BuildingKey(7),
            building_type: BuildingType::GeneralStore,
            name: name.to_string(),
            faction_id: FactionId(0),
            position: MapPosition::default(),
            occupants,
        }])
        .expect("buildings")
    }

    fn factions() -> FactionTable {
        let mut table = FactionTable::new();
        table.insert(faction(500, FactionKind::People, 18, SocialGroup::Commoners));
        table.insert(faction(501, FactionKind::Group, 18, SocialGroup::Merchants));
        table.insert(faction(502, FactionKind::Group, 18, SocialGroup::Scholars));
        table
    }

    #[test]
    fn certain_offer_admits_eligible_groups_only() {
        let buildings = town(vec![occupant(1, 0), occupant(2, 501), occupant(3, 502)], "Mercantile");
        let mut rng = StdRng::seed_from_u64(1);
        let mut pool = NpcWorkPool::new();
        pool.rebuild(4, &buildings, &factions(), 18, 1.0, &mut rng);

        assert_eq!(pool.len(), 2);
        let commoner = pool.get(1).expect("commoner");
        assert_eq!(commoner.faction_id, FactionId(500));
        assert_eq!(commoner.social_group, SocialGroup::Commoners);
        assert_eq!(commoner.building_name, "Mercantile");
        assert!(pool.contains(2));
        assert!(!pool.contains(3));
        assert!(!pool.is_stale_for(4));
        assert!(pool.is_stale_for(5));
    }

    #[test]
    fn zero_chance_admits_nobody() {
        let buildings = town(vec![occupant(1, 501)], "Mercantile");
        let mut rng = StdRng::seed_from_u64(1);
        let mut pool = NpcWorkPool::new();
        pool.rebuild(4, &buildings, &factions(), 18, 0.0, &mut rng);
        assert!(pool.is_empty());
        assert!(pool.pick(&mut rng).is_none());
    }

    #[test]
    fn ambiguous_commoner_faction_is_skipped() {
        let mut table = factions();
        table.insert(faction(503, FactionKind::People, 18, SocialGroup::Commoners));
        let buildings = town(vec![occupant(1, 0)], "Mercantile");
        let mut rng = StdRng::seed_from_u64(1);
        let mut pool = NpcWorkPool::new();
        pool.rebuild(4, &buildings, &table, 18, 1.0, &mut rng);
        assert!(pool.is_empty());
    }

    #[test]
    fn unnamed_buildings_and_duplicate_seeds() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut pool = NpcWorkPool::new();
        pool.rebuild(1, &town(vec![occupant(1, 501)], ""), &factions(), 18, 1.0, &mut rng);
        assert!(pool.is_empty());

        pool.rebuild(2, &town(vec![occupant(1, 501), occupant(1, 0)], "Shop"), &factions(), 18, 1.0, &mut rng);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(1).map(|e| e.faction_id), Some(FactionId(501)));
    }
}
