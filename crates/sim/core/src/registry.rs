//! Static catalogs: unit classes, building properties, and the build menu.
//!
//! Everything here is a const table. The build menu order is load-bearing:
//! trained policies index into [`BUILD_CHOICES`] by position, so entries
//! must never be reordered, only appended (and the Build verb's argument
//! space caps the menu at ten entries).

use crate::items::{ItemKind, Resource};
use crate::things::ThingKind;

/// Agent unit classes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::EnumIter, strum::EnumCount)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum UnitClass {
    #[default]
    Villager = 0,
    Scout,
    Knight,
    Archer,
    Monk,
    Mangonel,
    BatteringRam,
    Boat,
    Tank,
    Goblin,
}

/// Per-class combat and movement stats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassStats {
    pub max_hp: i32,
    pub attack_damage: i32,
    pub attack_range: i32,
    /// Cavalry classes get the road/charge double step.
    pub is_cavalry: bool,
}

impl UnitClass {
    pub const fn stats(self) -> ClassStats {
        match self {
            UnitClass::Villager => ClassStats {
                max_hp: 10,
                attack_damage: 2,
                attack_range: 1,
                is_cavalry: false,
            },
            UnitClass::Scout => ClassStats {
                max_hp: 8,
                attack_damage: 2,
                attack_range: 2,
                is_cavalry: true,
            },
            UnitClass::Knight => ClassStats {
                max_hp: 16,
                attack_damage: 4,
                attack_range: 1,
                is_cavalry: true,
            },
            UnitClass::Archer => ClassStats {
                max_hp: 8,
                attack_damage: 2,
                attack_range: 3,
                is_cavalry: false,
            },
            UnitClass::Monk => ClassStats {
                max_hp: 8,
                attack_damage: 0,
                attack_range: 1,
                is_cavalry: false,
            },
            UnitClass::Mangonel => ClassStats {
                max_hp: 12,
                attack_damage: 3,
                attack_range: 3,
                is_cavalry: false,
            },
            UnitClass::BatteringRam => ClassStats {
                max_hp: 20,
                attack_damage: 5,
                attack_range: 2,
                is_cavalry: false,
            },
            UnitClass::Boat => ClassStats {
                max_hp: 14,
                attack_damage: 2,
                attack_range: 1,
                is_cavalry: false,
            },
            UnitClass::Tank => ClassStats {
                max_hp: 24,
                attack_damage: 3,
                attack_range: 1,
                is_cavalry: false,
            },
            UnitClass::Goblin => ClassStats {
                max_hp: 6,
                attack_damage: 2,
                attack_range: 1,
                is_cavalry: false,
            },
        }
    }
}

/// Use-verb semantics of a thing that can be targeted by Use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UseKind {
    #[default]
    None,
    Altar,
    ClayOven,
    WeavingLoom,
    Blacksmith,
    Market,
    Dropoff,
    DropoffAndStorage,
    Storage,
    Train,
    TrainAndCraft,
    Craft,
    Magma,
    Temple,
}

/// A crafting recipe consumed by Craft-capable stations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Recipe {
    pub inputs: &'static [(ItemKind, u32)],
    pub output: (ItemKind, u32),
}

/// Tower behavior for buildings that attack on the world tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TowerSpec {
    pub range: i32,
    pub damage: i32,
}

/// Registry entry describing one building kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildingSpec {
    pub kind: ThingKind,
    pub max_hp: i32,
    pub cost: &'static [(Resource, u32)],
    /// Population slots this building contributes to its team's cap.
    pub pop_cap: u32,
    /// Stored-item capacity for Storage-class semantics.
    pub barrel_capacity: u32,
    /// Tiles around the footprint converted to Fertile on placement.
    pub fertile_radius: i32,
    pub garrison_cap: usize,
    pub use_kind: UseKind,
    /// Unit class and cost produced by Train semantics.
    pub train: Option<(UnitClass, &'static [(Resource, u32)])>,
    /// Resources accepted by Dropoff semantics.
    pub dropoff: &'static [Resource],
    /// Carried items accepted by Storage semantics.
    pub storage_items: &'static [ItemKind],
    pub recipes: &'static [Recipe],
    pub tower: Option<TowerSpec>,
}

const NO_COST: &[(Resource, u32)] = &[];
const NO_DROPOFF: &[Resource] = &[];
const NO_STORAGE: &[ItemKind] = &[];
const NO_RECIPES: &[Recipe] = &[];
const ALL_RESOURCES: &[Resource] = &[
    Resource::Food,
    Resource::Wood,
    Resource::Stone,
    Resource::Gold,
    Resource::Water,
];

/// Blacksmith recipes, tried in order.
const SMITH_RECIPES: &[Recipe] = &[
    Recipe {
        inputs: &[(ItemKind::Wood, 1), (ItemKind::Bar, 1)],
        output: (ItemKind::Spear, 1),
    },
    Recipe {
        inputs: &[(ItemKind::Bar, 2)],
        output: (ItemKind::Armor, 1),
    },
];

const SPEC_ALTAR: BuildingSpec = BuildingSpec {
    kind: ThingKind::Altar,
    max_hp: 60,
    cost: NO_COST,
    pop_cap: 0,
    barrel_capacity: 0,
    fertile_radius: 0,
    garrison_cap: 0,
    use_kind: UseKind::Altar,
    train: None,
    dropoff: NO_DROPOFF,
    storage_items: NO_STORAGE,
    recipes: NO_RECIPES,
    tower: None,
};

const SPEC_TOWN_CENTER: BuildingSpec = BuildingSpec {
    kind: ThingKind::TownCenter,
    max_hp: 80,
    cost: &[(Resource::Wood, 5), (Resource::Stone, 3)],
    pop_cap: 5,
    barrel_capacity: 20,
    fertile_radius: 1,
    garrison_cap: 4,
    use_kind: UseKind::DropoffAndStorage,
    train: Some((UnitClass::Villager, &[(Resource::Food, 2)])),
    dropoff: ALL_RESOURCES,
    storage_items: &[ItemKind::Bar, ItemKind::Bread, ItemKind::Wheat],
    recipes: NO_RECIPES,
    tower: Some(TowerSpec {
        range: 4,
        damage: 1,
    }),
};

const SPEC_HOUSE: BuildingSpec = BuildingSpec {
    kind: ThingKind::House,
    max_hp: 30,
    cost: &[(Resource::Wood, 2)],
    pop_cap: 4,
    barrel_capacity: 0,
    fertile_radius: 0,
    garrison_cap: 0,
    use_kind: UseKind::None,
    train: None,
    dropoff: NO_DROPOFF,
    storage_items: NO_STORAGE,
    recipes: NO_RECIPES,
    tower: None,
};

const SPEC_GRANARY: BuildingSpec = BuildingSpec {
    kind: ThingKind::Granary,
    max_hp: 40,
    cost: &[(Resource::Wood, 3)],
    pop_cap: 0,
    barrel_capacity: 10,
    fertile_radius: 2,
    garrison_cap: 0,
    use_kind: UseKind::Dropoff,
    train: None,
    dropoff: &[Resource::Food, Resource::Water],
    storage_items: NO_STORAGE,
    recipes: NO_RECIPES,
    tower: None,
};

const SPEC_GUARD_TOWER: BuildingSpec = BuildingSpec {
    kind: ThingKind::GuardTower,
    max_hp: 50,
    cost: &[(Resource::Wood, 2), (Resource::Stone, 2)],
    pop_cap: 0,
    barrel_capacity: 0,
    fertile_radius: 0,
    garrison_cap: 4,
    use_kind: UseKind::None,
    train: None,
    dropoff: NO_DROPOFF,
    storage_items: NO_STORAGE,
    recipes: NO_RECIPES,
    tower: Some(TowerSpec {
        range: 5,
        damage: 2,
    }),
};

const SPEC_CASTLE: BuildingSpec = BuildingSpec {
    kind: ThingKind::Castle,
    max_hp: 120,
    cost: &[(Resource::Stone, 8), (Resource::Gold, 2)],
    pop_cap: 3,
    barrel_capacity: 0,
    fertile_radius: 0,
    garrison_cap: 8,
    use_kind: UseKind::TrainAndCraft,
    train: Some((
        UnitClass::Tank,
        &[(Resource::Food, 4), (Resource::Gold, 2)],
    )),
    dropoff: NO_DROPOFF,
    storage_items: NO_STORAGE,
    recipes: SMITH_RECIPES,
    tower: Some(TowerSpec {
        range: 6,
        damage: 3,
    }),
};

const SPEC_BARRACKS: BuildingSpec = BuildingSpec {
    kind: ThingKind::Barracks,
    max_hp: 50,
    cost: &[(Resource::Wood, 4)],
    pop_cap: 0,
    barrel_capacity: 0,
    fertile_radius: 0,
    garrison_cap: 0,
    use_kind: UseKind::Train,
    train: Some((
        UnitClass::Knight,
        &[(Resource::Food, 3), (Resource::Gold, 1)],
    )),
    dropoff: NO_DROPOFF,
    storage_items: NO_STORAGE,
    recipes: NO_RECIPES,
    tower: None,
};

const SPEC_CLAY_OVEN: BuildingSpec = BuildingSpec {
    kind: ThingKind::ClayOven,
    max_hp: 25,
    cost: &[(Resource::Stone, 2)],
    pop_cap: 0,
    barrel_capacity: 0,
    fertile_radius: 0,
    garrison_cap: 0,
    use_kind: UseKind::ClayOven,
    train: None,
    dropoff: NO_DROPOFF,
    storage_items: NO_STORAGE,
    recipes: &[Recipe {
        inputs: &[(ItemKind::Wheat, 1)],
        output: (ItemKind::Bread, 1),
    }],
    tower: None,
};

const SPEC_WEAVING_LOOM: BuildingSpec = BuildingSpec {
    kind: ThingKind::WeavingLoom,
    max_hp: 25,
    cost: &[(Resource::Wood, 2)],
    pop_cap: 0,
    barrel_capacity: 0,
    fertile_radius: 0,
    garrison_cap: 0,
    use_kind: UseKind::WeavingLoom,
    train: None,
    dropoff: NO_DROPOFF,
    storage_items: NO_STORAGE,
    recipes: NO_RECIPES,
    tower: None,
};

const SPEC_BLACKSMITH: BuildingSpec = BuildingSpec {
    kind: ThingKind::Blacksmith,
    max_hp: 40,
    cost: &[(Resource::Wood, 2), (Resource::Stone, 2)],
    pop_cap: 0,
    barrel_capacity: 10,
    fertile_radius: 0,
    garrison_cap: 0,
    use_kind: UseKind::Blacksmith,
    train: None,
    dropoff: NO_DROPOFF,
    storage_items: &[ItemKind::Bar, ItemKind::Spear, ItemKind::Armor],
    recipes: SMITH_RECIPES,
    tower: None,
};

const SPEC_MARKET: BuildingSpec = BuildingSpec {
    kind: ThingKind::Market,
    max_hp: 40,
    cost: &[(Resource::Wood, 3), (Resource::Gold, 1)],
    pop_cap: 0,
    barrel_capacity: 0,
    fertile_radius: 0,
    garrison_cap: 0,
    use_kind: UseKind::Market,
    train: None,
    dropoff: NO_DROPOFF,
    storage_items: NO_STORAGE,
    recipes: NO_RECIPES,
    tower: None,
};

const SPEC_TEMPLE: BuildingSpec = BuildingSpec {
    kind: ThingKind::Temple,
    max_hp: 60,
    cost: &[(Resource::Stone, 4), (Resource::Gold, 1)],
    pop_cap: 0,
    barrel_capacity: 0,
    fertile_radius: 0,
    garrison_cap: 0,
    use_kind: UseKind::Temple,
    train: None,
    dropoff: NO_DROPOFF,
    storage_items: NO_STORAGE,
    recipes: NO_RECIPES,
    tower: None,
};

const SPEC_DOCK: BuildingSpec = BuildingSpec {
    kind: ThingKind::Dock,
    max_hp: 40,
    cost: &[(Resource::Wood, 4)],
    pop_cap: 0,
    barrel_capacity: 0,
    fertile_radius: 0,
    garrison_cap: 0,
    use_kind: UseKind::Train,
    train: Some((UnitClass::Boat, &[(Resource::Wood, 3)])),
    dropoff: NO_DROPOFF,
    storage_items: NO_STORAGE,
    recipes: NO_RECIPES,
    tower: None,
};

const SPEC_WALL: BuildingSpec = BuildingSpec {
    kind: ThingKind::Wall,
    max_hp: 40,
    cost: &[(Resource::Stone, 1)],
    pop_cap: 0,
    barrel_capacity: 0,
    fertile_radius: 0,
    garrison_cap: 0,
    use_kind: UseKind::None,
    train: None,
    dropoff: NO_DROPOFF,
    storage_items: NO_STORAGE,
    recipes: NO_RECIPES,
    tower: None,
};

/// Registry lookup. `None` for kinds that are not buildings.
pub const fn building_spec(kind: ThingKind) -> Option<&'static BuildingSpec> {
    match kind {
        ThingKind::Altar => Some(&SPEC_ALTAR),
        ThingKind::TownCenter => Some(&SPEC_TOWN_CENTER),
        ThingKind::House => Some(&SPEC_HOUSE),
        ThingKind::Granary => Some(&SPEC_GRANARY),
        ThingKind::GuardTower => Some(&SPEC_GUARD_TOWER),
        ThingKind::Castle => Some(&SPEC_CASTLE),
        ThingKind::Barracks => Some(&SPEC_BARRACKS),
        ThingKind::ClayOven => Some(&SPEC_CLAY_OVEN),
        ThingKind::WeavingLoom => Some(&SPEC_WEAVING_LOOM),
        ThingKind::Blacksmith => Some(&SPEC_BLACKSMITH),
        ThingKind::Market => Some(&SPEC_MARKET),
        ThingKind::Temple => Some(&SPEC_TEMPLE),
        ThingKind::Dock => Some(&SPEC_DOCK),
        ThingKind::Wall => Some(&SPEC_WALL),
        _ => None,
    }
}

/// One entry of the build menu: a placeable thing kind, or road paving.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BuildChoice {
    Thing(ThingKind),
    Road,
}

/// The build menu, indexed by the Build verb's argument. Order is part of
/// the external contract; append only.
pub const BUILD_CHOICES: [BuildChoice; 10] = [
    BuildChoice::Thing(ThingKind::TownCenter),
    BuildChoice::Thing(ThingKind::House),
    BuildChoice::Thing(ThingKind::Granary),
    BuildChoice::Thing(ThingKind::GuardTower),
    BuildChoice::Thing(ThingKind::Barracks),
    BuildChoice::Thing(ThingKind::ClayOven),
    BuildChoice::Thing(ThingKind::WeavingLoom),
    BuildChoice::Thing(ThingKind::Blacksmith),
    BuildChoice::Thing(ThingKind::Market),
    BuildChoice::Road,
];

/// Road paving cost (Build verb, `BuildChoice::Road`).
pub const ROAD_COST: &[(Resource, u32)] = &[(Resource::Stone, 1)];

/// Market trades, tried in declaration order: (gives, amount, receives,
/// amount). Fixed numerator/denominator per trade.
pub const MARKET_TRADES: [(Resource, u32, Resource, u32); 3] = [
    (Resource::Wood, 3, Resource::Gold, 1),
    (Resource::Stone, 2, Resource::Gold, 1),
    (Resource::Gold, 1, Resource::Food, 4),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_menu_is_index_stable() {
        // Policies depend on these positions; this test is the tripwire.
        assert_eq!(BUILD_CHOICES[0], BuildChoice::Thing(ThingKind::TownCenter));
        assert_eq!(BUILD_CHOICES[9], BuildChoice::Road);
        assert_eq!(BUILD_CHOICES.len(), 10);
    }

    #[test]
    fn every_menu_entry_has_a_registry_spec() {
        for choice in BUILD_CHOICES {
            if let BuildChoice::Thing(kind) = choice {
                let spec = building_spec(kind).expect("buildable kind must be registered");
                assert!(!spec.cost.is_empty(), "buildable {kind:?} must have a cost");
            }
        }
    }

    #[test]
    fn garrison_caps_fit_the_type_bound() {
        use crate::config::SimConfig;
        for kind in [
            ThingKind::TownCenter,
            ThingKind::GuardTower,
            ThingKind::Castle,
        ] {
            let spec = building_spec(kind).unwrap();
            assert!(spec.garrison_cap <= SimConfig::MAX_GARRISON);
        }
    }

    #[test]
    fn towers_are_where_expected() {
        assert!(building_spec(ThingKind::GuardTower).unwrap().tower.is_some());
        assert!(building_spec(ThingKind::Castle).unwrap().tower.is_some());
        assert!(building_spec(ThingKind::TownCenter).unwrap().tower.is_some());
        assert!(building_spec(ThingKind::House).unwrap().tower.is_none());
    }
}
