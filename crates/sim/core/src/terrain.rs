//! Tile terrain, biomes, and per-tile runtime state.

use crate::registry::UnitClass;

/// Closed terrain set, including the harvestable resource variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::EnumIter, strum::EnumCount)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum TerrainKind {
    Empty = 0,
    Grass,
    Sand,
    Snow,
    Dune,
    Fertile,
    Road,
    Bridge,
    Water,
    ShallowWater,
    Mountain,
    // Resource variants: harvested through Use; carry a per-tile yield.
    Wheat,
    Tree,
    Palm,
    Stone,
    Gold,
    Bush,
    Cactus,
    Stalagmite,
}

impl TerrainKind {
    /// Whether a unit of `class` may stand on this terrain. Water blocks
    /// everything but boats; boats require water (docks are handled by the
    /// movement rules, not the terrain itself).
    pub fn is_passable(self, class: UnitClass) -> bool {
        match self {
            TerrainKind::Water | TerrainKind::ShallowWater => class == UnitClass::Boat,
            TerrainKind::Mountain => false,
            TerrainKind::Wheat
            | TerrainKind::Tree
            | TerrainKind::Palm
            | TerrainKind::Stone
            | TerrainKind::Gold
            | TerrainKind::Bush
            | TerrainKind::Cactus
            | TerrainKind::Stalagmite => false,
            _ => class != UnitClass::Boat,
        }
    }

    /// Resource terrain yields an item when used; `None` for plain ground.
    pub fn harvest_item(self) -> Option<crate::items::ItemKind> {
        use crate::items::ItemKind;
        match self {
            TerrainKind::Wheat => Some(ItemKind::Wheat),
            TerrainKind::Tree | TerrainKind::Palm => Some(ItemKind::Wood),
            TerrainKind::Stone | TerrainKind::Stalagmite => Some(ItemKind::Stone),
            TerrainKind::Gold => Some(ItemKind::Gold),
            TerrainKind::Bush | TerrainKind::Cactus => Some(ItemKind::Food),
            _ => None,
        }
    }

    /// What an exhausted resource tile collapses to.
    pub fn exhausted_form(self) -> TerrainKind {
        match self {
            TerrainKind::Tree | TerrainKind::Palm => TerrainKind::Empty,
            TerrainKind::Wheat => TerrainKind::Empty,
            other if other.harvest_item().is_some() => TerrainKind::Empty,
            other => other,
        }
    }

    /// Tiles that accept poured Water and become Fertile.
    pub fn accepts_water(self) -> bool {
        matches!(
            self,
            TerrainKind::Empty
                | TerrainKind::Grass
                | TerrainKind::Dune
                | TerrainKind::Sand
                | TerrainKind::Snow
                | TerrainKind::Road
        )
    }
}

/// Biome tag, used for tinting and mob AI predicates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::EnumIter, strum::EnumCount)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Biome {
    #[default]
    Plains = 0,
    Forest,
    Desert,
    Tundra,
    Swamp,
    Caldera,
}

/// Door metadata carried by a tile. Doors block enemies of the owning team
/// and are attackable; at 0 HP the door is cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DoorState {
    pub team: i32,
    pub hp: i32,
}

/// Per-tile state: static layout plus the runtime fields the kernel
/// mutates (yield, door, tint, frozen).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tile {
    pub terrain: TerrainKind,
    pub biome: Biome,
    pub elevation: i8,
    /// Remaining yield for resource terrain variants.
    pub terrain_yield: u8,
    pub door: Option<DoorState>,
    /// Tint heatmap value written by visual effects; decays each tick.
    pub tint: u8,
    /// Frozen tiles reject Use and lantern placement for the tick.
    pub is_frozen: bool,
}

impl Tile {
    pub const DEFAULT_TERRAIN_YIELD: u8 = 10;

    pub fn new(terrain: TerrainKind) -> Self {
        let terrain_yield = if terrain.harvest_item().is_some() {
            Self::DEFAULT_TERRAIN_YIELD
        } else {
            0
        };
        Self {
            terrain,
            biome: Biome::default(),
            elevation: 0,
            terrain_yield,
            door: None,
            tint: 0,
            is_frozen: false,
        }
    }

    pub fn with_biome(mut self, biome: Biome) -> Self {
        self.biome = biome;
        self
    }

    pub fn with_elevation(mut self, elevation: i8) -> Self {
        self.elevation = elevation;
        self
    }
}

impl Default for Tile {
    fn default() -> Self {
        Self::new(TerrainKind::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn water_blocks_everything_but_boats() {
        assert!(!TerrainKind::Water.is_passable(UnitClass::Villager));
        assert!(!TerrainKind::Water.is_passable(UnitClass::Knight));
        assert!(TerrainKind::Water.is_passable(UnitClass::Boat));
        assert!(!TerrainKind::Grass.is_passable(UnitClass::Boat));
    }

    #[test]
    fn resource_terrain_yields_and_exhausts() {
        let tile = Tile::new(TerrainKind::Gold);
        assert_eq!(tile.terrain_yield, Tile::DEFAULT_TERRAIN_YIELD);
        assert_eq!(
            TerrainKind::Gold.harvest_item(),
            Some(crate::items::ItemKind::Gold)
        );
        assert_eq!(TerrainKind::Gold.exhausted_form(), TerrainKind::Empty);
        assert_eq!(TerrainKind::Road.exhausted_form(), TerrainKind::Road);
    }

    #[test]
    fn fertile_conversion_targets() {
        assert!(TerrainKind::Grass.accepts_water());
        assert!(!TerrainKind::Water.accepts_water());
        assert!(!TerrainKind::Fertile.accepts_water());
    }
}
