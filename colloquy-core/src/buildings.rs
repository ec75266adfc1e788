//! Building classification, the regional service table and compass hints.
//!
//! Buildings of the current location are grouped by [`BuildingType`] for the
//! "where is" location list. Services the town lacks are offered as regional
//! topics from [`REGIONAL_TABLE`], answered by scanning the packed service
//! flags of every town in the region.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TalkError};
use crate::text::TextKey;
use crate::types::{BuildingKey, FactionId, MapPosition};
use crate::world::{BuildingSummary, RegionLocation};

// ---------------------------------------------------------------------------
// Building types
// ---------------------------------------------------------------------------

/// Exterior building type, with the numeric values of the map data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum BuildingType {
    /// Alchemist.
    Alchemist = 0,
    /// House for sale.
    HouseForSale = 1,
    /// Armorer.
    Armorer = 2,
    /// Bank.
    Bank = 3,
    /// Town block filler.
    Town4 = 4,
    /// Bookseller.
    Bookseller = 5,
    /// Clothing store.
    ClothingStore = 6,
    /// Furniture store.
    FurnitureStore = 7,
    /// Gem store.
    GemStore = 8,
    /// General store.
    GeneralStore = 9,
    /// Library.
    Library = 10,
    /// Guild hall.
    GuildHall = 11,
    /// Pawn shop.
    PawnShop = 12,
    /// Weapon smith.
    WeaponSmith = 13,
    /// Temple.
    Temple = 14,
    /// Tavern.
    Tavern = 15,
    /// Palace.
    Palace = 16,
    /// Residence.
    House1 = 17,
    /// Residence.
    House2 = 18,
    /// Residence.
    House3 = 19,
    /// Residence.
    House4 = 20,
    /// Residence.
    House5 = 21,
    /// Residence.
    House6 = 22,
    /// Town block filler.
    Town23 = 23,
    /// Ship.
    Ship = 24,
    /// Unnamed special slot.
    Special1 = 116,
    /// Unnamed special slot.
    Special2 = 223,
    /// Unnamed special slot.
    Special3 = 226,
    /// Unnamed special slot.
    Special4 = 232,
    /// Wildcard used by searches.
    AllValid = 0xfffe,
}

impl BuildingType {
    /// Every type in ascending numeric order; location groups follow this order.
    pub const ALL: [Self; 30] = [
        Self::Alchemist,
        Self::HouseForSale,
        Self::Armorer,
        Self::Bank,
        Self::Town4,
        Self::Bookseller,
        Self::ClothingStore,
        Self::FurnitureStore,
        Self::GemStore,
        Self::GeneralStore,
        Self::Library,
        Self::GuildHall,
        Self::PawnShop,
        Self::WeaponSmith,
        Self::Temple,
        Self::Tavern,
        Self::Palace,
        Self::House1,
        Self::House2,
        Self::House3,
        Self::House4,
        Self::House5,
        Self::House6,
        Self::Town23,
        Self::Ship,
        Self::Special1,
        Self::Special2,
        Self::Special3,
        Self::Special4,
        Self::AllValid,
    ];

    /// Whether this is one of the six residence types.
    #[must_use]
    pub fn is_residence(self) -> bool {
        matches!(
            self,
            Self::House1 | Self::House2 | Self::House3 | Self::House4 | Self::House5 | Self::House6
        )
    }

    /// Types that never get their own group in the location list.
    #[must_use]
    pub fn is_skipped_in_location_list(self) -> bool {
        self.is_residence()
            || matches!(
                self,
                Self::AllValid
                    | Self::FurnitureStore
                    | Self::HouseForSale
                    | Self::Palace
                    | Self::Ship
                    | Self::Special1
                    | Self::Special2
                    | Self::Special3
                    | Self::Special4
                    | Self::Town23
                    | Self::Town4
            )
    }

    /// Caption of this type's group in the location list.
    #[must_use]
    pub fn group_caption(self) -> Option<TextKey> {
        match self {
            Self::Alchemist => Some(TextKey::Alchemists),
            Self::Armorer => Some(TextKey::Armorers),
            Self::Bank => Some(TextKey::Banks),
            Self::Bookseller => Some(TextKey::Bookstores),
            Self::ClothingStore => Some(TextKey::ClothingStores),
            Self::GemStore => Some(TextKey::GemStores),
            Self::GeneralStore => Some(TextKey::GeneralStores),
            Self::GuildHall => Some(TextKey::Guilds),
            Self::Library => Some(TextKey::Libraries),
            Self::PawnShop => Some(TextKey::PawnShops),
            Self::Tavern => Some(TextKey::Taverns),
            Self::WeaponSmith => Some(TextKey::WeaponSmiths),
            Self::Temple => Some(TextKey::LocalTemples),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Building directory
// ---------------------------------------------------------------------------

/// Buildings of the current location, looked up by key.
#[derive(Debug, Clone, Default)]
pub struct BuildingDirectory {
    buildings: Vec<BuildingSummary>,
}

impl BuildingDirectory {
    /// Index the buildings of a location.
    ///
    /// # Errors
    /// Returns [`TalkError::DuplicateBuildingKey`] if two buildings share a key.
    pub fn new(buildings: Vec<BuildingSummary>) -> Result<Self> {
        for (i, building) in buildings.iter().enumerate() {
            if buildings[..i].iter().any(|b| b.key == building.key) {
                return Err(TalkError::DuplicateBuildingKey(building.key));
            }
        }
        Ok(Self { buildings })
    }

    /// All buildings in map order.
    #[must_use]
    pub fn buildings(&self) -> &[BuildingSummary] {
        &self.buildings
    }

    /// Look up a building by key.
    #[must_use]
    pub fn get(&self, key: BuildingKey) -> Option<&BuildingSummary> {
        self.buildings.iter().find(|b| b.key == key)
    }

    /// Buildings of one type, in map order.
    pub fn of_type(&self, building_type: BuildingType) -> impl Iterator<Item = &BuildingSummary> {
        self.buildings
            .iter()
            .filter(move |b| b.building_type == building_type)
    }

    /// Whether the location has a building owned by a faction.
    #[must_use]
    pub fn has_faction(&self, faction: FactionId) -> bool {
        self.buildings.iter().any(|b| b.faction_id == faction)
    }

    /// Whether the location has a building of a type.
    #[must_use]
    pub fn has_type(&self, building_type: BuildingType) -> bool {
        self.buildings.iter().any(|b| b.building_type == building_type)
    }

    /// Number of indexed buildings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    /// Whether no buildings are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Regional services
// ---------------------------------------------------------------------------

/// Which byte of a packed location key a service flag lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagField {
    /// Bits 0-7.
    Temple,
    /// Bits 8-15.
    Store,
    /// Bits 16-23.
    Guild,
}

/// One bit of a packed location key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceFlag {
    /// Byte holding the flag.
    pub field: FlagField,
    /// Bit inside the byte.
    pub bit: u8,
}

impl ServiceFlag {
    const fn new(field: FlagField, bit: u8) -> Self {
        Self { field, bit }
    }

    /// Whether a packed location key carries this flag.
    #[must_use]
    pub fn is_set(self, key: u32) -> bool {
        let shift = match self.field {
            FlagField::Temple => 0,
            FlagField::Store => 8,
            FlagField::Guild => 16,
        };
        (key >> (shift + u32::from(self.bit))) & 1 == 1
    }
}

/// How to tell whether the current town already offers a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionalCategory {
    /// A temple, recognized by its faction.
    Temple(FactionId),
    /// A knightly order, offered only in its home region (zero-based).
    KnightlyOrder {
        /// Owning faction.
        faction: FactionId,
        /// Region the order is based in.
        home_region: i32,
    },
    /// A guild hall, recognized by its faction.
    Guild(FactionId),
    /// A store, recognized by building type.
    Store(BuildingType),
}

/// One row of the regional service table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionalEntry {
    /// Service name, inserted into the "Any %s" caption.
    pub name: &'static str,
    /// Local presence check.
    pub category: RegionalCategory,
    /// Flag in the packed location key.
    pub flag: ServiceFlag,
}

impl RegionalEntry {
    const fn new(name: &'static str, category: RegionalCategory, flag: ServiceFlag) -> Self {
        Self {
            name,
            category,
            flag,
        }
    }

    /// Whether this service belongs in the regional list: not present in the
    /// current town, and for knightly orders only in their home region.
    #[must_use]
    pub fn is_offered(&self, buildings: &BuildingDirectory, player_region: i32) -> bool {
        match self.category {
            RegionalCategory::Temple(faction) | RegionalCategory::Guild(faction) => {
                !buildings.has_faction(faction)
            }
            RegionalCategory::KnightlyOrder {
                faction,
                home_region,
            } => player_region == home_region && !buildings.has_faction(faction),
            RegionalCategory::Store(building_type) => !buildings.has_type(building_type),
        }
    }

    /// Towns in the region that offer this service.
    pub fn matching_locations<'a>(
        &'a self,
        locations: &'a [RegionLocation],
    ) -> impl Iterator<Item = &'a RegionLocation> + 'a {
        locations.iter().filter(move |l| self.flag.is_set(l.key))
    }
}

const fn temple(name: &'static str, faction: i32, bit: u8) -> RegionalEntry {
    RegionalEntry::new(
        name,
        RegionalCategory::Temple(FactionId(faction)),
        ServiceFlag::new(FlagField::Temple, bit),
    )
}

const fn order(name: &'static str, faction: i32, home_region: i32) -> RegionalEntry {
    RegionalEntry::new(
        name,
        RegionalCategory::KnightlyOrder {
            faction: FactionId(faction),
            home_region,
        },
        ServiceFlag::new(FlagField::Guild, 1),
    )
}

const fn store(name: &'static str, building_type: BuildingType, field: FlagField, bit: u8) -> RegionalEntry {
    RegionalEntry::new(
        name,
        RegionalCategory::Store(building_type),
        ServiceFlag::new(field, bit),
    )
}

/// Services offered under "Regional", in list order.
pub const REGIONAL_TABLE: [RegionalEntry; 28] = [
    temple("Temple of Akatosh", 26, 0),
    temple("Temple of Arkay", 21, 1),
    temple("Temple of Dibella", 29, 2),
    temple("Temple of Julianos", 27, 3),
    temple("Temple of Kynareth", 35, 4),
    temple("Temple of Mara", 24, 5),
    temple("Temple of Stendarr", 33, 6),
    temple("Temple of Zenithar", 22, 7),
    order("Order of the Raven", 414, 0x05),
    order("Knights of the Dragon", 368, 0x11),
    order("Knights of the Owl", 413, 0x12),
    order("Order of the Candle", 408, 0x14),
    order("Knights of the Flame", 410, 0x15),
    order("Host of the Horn", 411, 0x16),
    order("Knights of the Rose", 409, 0x17),
    order("Knights of the Wheel", 415, 0x2B),
    order("Order of the Scarab", 416, 0x33),
    order("Knights of the Hawk", 417, 0x37),
    RegionalEntry::new(
        "Mages Guild",
        RegionalCategory::Guild(FactionId(40)),
        ServiceFlag::new(FlagField::Guild, 2),
    ),
    RegionalEntry::new(
        "Fighters Guild",
        RegionalCategory::Guild(FactionId(41)),
        ServiceFlag::new(FlagField::Guild, 5),
    ),
    store("Tavern", BuildingType::Tavern, FlagField::Store, 0),
    store("Library", BuildingType::Library, FlagField::Guild, 0),
    store("Weapon Smith", BuildingType::WeaponSmith, FlagField::Store, 1),
    store("Armorer", BuildingType::Armorer, FlagField::Store, 2),
    store("Alchemist", BuildingType::Alchemist, FlagField::Store, 3),
    store("Bank", BuildingType::Bank, FlagField::Store, 4),
    store("Bookstore", BuildingType::Bookseller, FlagField::Store, 5),
    store("Clothing Store", BuildingType::ClothingStore, FlagField::Store, 6),
];

// ---------------------------------------------------------------------------
// Compass
// ---------------------------------------------------------------------------

/// One of eight compass sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompassDirection {
    /// East.
    East,
    /// Northeast.
    NorthEast,
    /// North.
    North,
    /// Northwest.
    NorthWest,
    /// West.
    West,
    /// Southwest.
    SouthWest,
    /// South.
    South,
    /// Southeast.
    SouthEast,
}

impl CompassDirection {
    /// Sector of the direction from `from` to `to`, 45° wide and centered on
    /// the compass points. `None` if the points coincide.
    #[must_use]
    pub fn between(from: MapPosition, to: MapPosition) -> Option<Self> {
        let (dx, dy) = (to.x - from.x, to.y - from.y);
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        let angle = dy.atan2(dx).to_degrees().rem_euclid(360.0);
        let direction = match angle {
            a if a < 22.5 => Self::East,
            a if a < 67.5 => Self::NorthEast,
            a if a < 112.5 => Self::North,
            a if a < 157.5 => Self::NorthWest,
            a if a < 202.5 => Self::West,
            a if a < 247.5 => Self::SouthWest,
            a if a < 292.5 => Self::South,
            a if a < 337.5 => Self::SouthEast,
            _ => Self::East,
        };
        Some(direction)
    }

    /// Localized name key.
    #[must_use]
    pub fn text_key(self) -> TextKey {
        match self {
            Self::East => TextKey::East,
            Self::NorthEast => TextKey::NorthEast,
            Self::North => TextKey::North,
            Self::NorthWest => TextKey::NorthWest,
            Self::West => TextKey::West,
            Self::SouthWest => TextKey::SouthWest,
            Self::South => TextKey::South,
            Self::SouthEast => TextKey::SouthEast,
        }
    }
}
