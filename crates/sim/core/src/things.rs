//! The tagged entity model ("things") and the generational slot store.
//!
//! Every entity shares a common header (position, team, HP, cooldown,
//! inventory, orientation) plus a kind-specific payload. Storage is a slab
//! with generation-bumped slot reuse so handles held across ticks (home
//! altars, garrison lists, spawner back-references) can never alias a
//! recycled slot. Dense per-kind buckets give O(1) iteration per kind.

use arrayvec::ArrayVec;
use bounded_vector::BoundedVec;
use strum::EnumCount;

use crate::config::SimConfig;
use crate::geom::{Direction, Position, ThingId};
use crate::items::Inventory;
use crate::registry::{UnitClass, UseKind, building_spec};

/// Closed set of entity kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::EnumIter, strum::EnumCount)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ThingKind {
    Agent = 0,
    // Mobs.
    Cow,
    Wolf,
    Bear,
    // Hostile growths.
    Spawner,
    Tumor,
    // Resource nodes (blocking; remaining yield lives in the inventory).
    Wheat,
    Tree,
    Palm,
    Bush,
    Stone,
    Gold,
    Magma,
    // Harvest-stage markers and water pickups (overlay).
    Fish,
    Corpse,
    Skeleton,
    Stump,
    Stubble,
    // Team-coloured overlays.
    Lantern,
    Relic,
    // Buildings.
    Altar,
    TownCenter,
    House,
    Granary,
    GuardTower,
    Castle,
    Barracks,
    ClayOven,
    WeavingLoom,
    Blacksmith,
    Market,
    Temple,
    Dock,
    Wall,
}

impl ThingKind {
    /// Blocking things occupy the blocking grid: at most one per tile.
    pub const fn is_blocking(self) -> bool {
        !self.is_overlay()
    }

    /// Overlay things share tiles with blocking things (one overlay per
    /// tile).
    pub const fn is_overlay(self) -> bool {
        matches!(
            self,
            ThingKind::Lantern
                | ThingKind::Relic
                | ThingKind::Fish
                | ThingKind::Corpse
                | ThingKind::Skeleton
                | ThingKind::Stump
                | ThingKind::Stubble
        )
    }

    pub const fn is_building(self) -> bool {
        building_spec(self).is_some()
    }

    pub const fn is_mob(self) -> bool {
        matches!(self, ThingKind::Cow | ThingKind::Wolf | ThingKind::Bear)
    }

    pub const fn is_predator(self) -> bool {
        matches!(self, ThingKind::Wolf | ThingKind::Bear)
    }

    /// Resource nodes harvested by Use (and, for trees, by Move/Attack).
    pub const fn is_resource_node(self) -> bool {
        matches!(
            self,
            ThingKind::Wheat
                | ThingKind::Tree
                | ThingKind::Palm
                | ThingKind::Bush
                | ThingKind::Stone
                | ThingKind::Gold
                | ThingKind::Fish
                | ThingKind::Corpse
                | ThingKind::Skeleton
                | ThingKind::Stump
                | ThingKind::Stubble
        )
    }

    /// Structures that ranged target-selection will hit.
    pub const fn is_attackable_structure(self) -> bool {
        self.is_building() && !matches!(self, ThingKind::Altar)
    }

    pub const fn use_kind(self) -> UseKind {
        match self {
            ThingKind::Magma => UseKind::Magma,
            other => match building_spec(other) {
                Some(spec) => spec.use_kind,
                None => UseKind::None,
            },
        }
    }
}

/// Agent-specific state.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentData {
    /// Global agent index; also encodes the default team
    /// (`agent_id / AGENTS_PER_TEAM`).
    pub agent_id: usize,
    /// The altar that funds this agent's respawn.
    pub home_altar: Option<ThingId>,
    pub unit_class: UnitClass,
    pub attack_damage: i32,
    /// Ticks of shield band remaining (blocks tumor-adjacency death).
    pub shield_countdown: u8,
    pub is_garrisoned: bool,
    /// Set by Monk conversion; the header `team` is kept in sync.
    pub team_override: Option<i32>,
}

impl AgentData {
    pub fn new(agent_id: usize, unit_class: UnitClass) -> Self {
        Self {
            agent_id,
            home_altar: None,
            unit_class,
            attack_damage: unit_class.stats().attack_damage,
            shield_countdown: 0,
            is_garrisoned: false,
            team_override: None,
        }
    }
}

/// Building-specific state.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuildingData {
    /// Units garrisoned inside; members are off-grid while listed here.
    pub garrison: BoundedVec<ThingId, 0, { SimConfig::MAX_GARRISON }>,
    pub production_queue: ArrayVec<UnitClass, 4>,
    pub rally_point: Option<Position>,
}

impl BuildingData {
    /// Drops `unit` from the garrison list. True if it was present.
    pub fn remove_garrisoned(&mut self, unit: ThingId) -> bool {
        let before = self.garrison.len();
        let kept: Vec<ThingId> = self
            .garrison
            .iter()
            .copied()
            .filter(|member| *member != unit)
            .collect();
        // SAFETY: `kept` only shrinks the list, which keeps MIN=0 satisfied.
        self.garrison = unsafe { BoundedVec::from_vec_unchecked(kept) };
        self.garrison.len() != before
    }
}

impl Default for BuildingData {
    fn default() -> Self {
        Self {
            garrison: BoundedVec::new(),
            production_queue: ArrayVec::new(),
            rally_point: None,
        }
    }
}

/// Kind-specific payloads.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ThingPayload {
    /// Header-only kinds: resources, markers, lanterns, relics, magma.
    None,
    Agent(AgentData),
    Altar { hearts: u32 },
    Building(BuildingData),
    Spawner,
    Tumor {
        home_spawner: Option<ThingId>,
        /// Set when this tumor has branched; planted tumors are inert.
        has_claimed_territory: bool,
        turns_alive: u16,
    },
    Mob { herd_id: u8 },
}

/// An entity: common header plus kind payload.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Thing {
    pub id: ThingId,
    pub kind: ThingKind,
    /// `(-1, -1)` when garrisoned or dead.
    pub pos: Position,
    /// Owning team; `-1` is neutral.
    pub team: i32,
    pub orientation: Direction,
    pub hp: i32,
    pub max_hp: i32,
    pub cooldown: u16,
    /// Ticks this thing is non-interactable.
    pub frozen: u8,
    pub inventory: Inventory,
    pub payload: ThingPayload,
}

impl Thing {
    /// Header-only constructor; payload-bearing kinds use the builders
    /// below.
    pub fn new(kind: ThingKind, pos: Position) -> Self {
        Self {
            id: ThingId::new(0, 0),
            kind,
            pos,
            team: -1,
            orientation: Direction::South,
            hp: 1,
            max_hp: 1,
            cooldown: 0,
            frozen: 0,
            inventory: Inventory::new(),
            payload: ThingPayload::None,
        }
    }

    pub fn agent(agent_id: usize, unit_class: UnitClass, pos: Position, team: i32) -> Self {
        let stats = unit_class.stats();
        Self {
            team,
            hp: stats.max_hp,
            max_hp: stats.max_hp,
            payload: ThingPayload::Agent(AgentData::new(agent_id, unit_class)),
            ..Self::new(ThingKind::Agent, pos)
        }
    }

    pub fn building(kind: ThingKind, pos: Position, team: i32) -> Self {
        let spec = building_spec(kind).expect("building constructor requires a registered kind");
        let payload = match kind {
            ThingKind::Altar => ThingPayload::Altar { hearts: 0 },
            _ => ThingPayload::Building(BuildingData::default()),
        };
        Self {
            team,
            hp: spec.max_hp,
            max_hp: spec.max_hp,
            payload,
            ..Self::new(kind, pos)
        }
    }

    pub fn altar(pos: Position, team: i32, hearts: u32) -> Self {
        let mut altar = Self::building(ThingKind::Altar, pos, team);
        altar.payload = ThingPayload::Altar { hearts };
        altar
    }

    /// Resource node carrying `yield_count` of its item in the inventory.
    pub fn resource_node(kind: ThingKind, pos: Position, yield_count: u32) -> Self {
        debug_assert!(kind.is_resource_node());
        let mut node = Self::new(kind, pos);
        if let Some(item) = resource_node_item(kind) {
            node.inventory.add(item, yield_count);
        }
        node
    }

    pub fn mob(kind: ThingKind, pos: Position, herd_id: u8) -> Self {
        debug_assert!(kind.is_mob());
        let hp = match kind {
            ThingKind::Cow => 8,
            ThingKind::Wolf => 10,
            ThingKind::Bear => 16,
            _ => 8,
        };
        Self {
            hp,
            max_hp: hp,
            payload: ThingPayload::Mob { herd_id },
            ..Self::new(kind, pos)
        }
    }

    pub fn tumor(pos: Position, home_spawner: Option<ThingId>) -> Self {
        Self {
            hp: 4,
            max_hp: 4,
            payload: ThingPayload::Tumor {
                home_spawner,
                has_claimed_territory: false,
                turns_alive: 0,
            },
            ..Self::new(ThingKind::Tumor, pos)
        }
    }

    pub fn spawner(pos: Position) -> Self {
        Self {
            hp: 10,
            max_hp: 10,
            payload: ThingPayload::Spawner,
            ..Self::new(ThingKind::Spawner, pos)
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn agent_data(&self) -> Option<&AgentData> {
        match &self.payload {
            ThingPayload::Agent(data) => Some(data),
            _ => None,
        }
    }

    pub fn agent_data_mut(&mut self) -> Option<&mut AgentData> {
        match &mut self.payload {
            ThingPayload::Agent(data) => Some(data),
            _ => None,
        }
    }

    pub fn building_data(&self) -> Option<&BuildingData> {
        match &self.payload {
            ThingPayload::Building(data) => Some(data),
            _ => None,
        }
    }

    pub fn building_data_mut(&mut self) -> Option<&mut BuildingData> {
        match &mut self.payload {
            ThingPayload::Building(data) => Some(data),
            _ => None,
        }
    }

    pub fn hearts(&self) -> Option<u32> {
        match &self.payload {
            ThingPayload::Altar { hearts } => Some(*hearts),
            _ => None,
        }
    }

    /// Effective unit class; non-agents act as villagers for terrain
    /// passability checks.
    pub fn unit_class(&self) -> UnitClass {
        self.agent_data()
            .map(|data| data.unit_class)
            .unwrap_or_default()
    }
}

/// The item a resource node yields per harvest.
pub const fn resource_node_item(kind: ThingKind) -> Option<crate::items::ItemKind> {
    use crate::items::ItemKind;
    match kind {
        ThingKind::Wheat | ThingKind::Stubble => Some(ItemKind::Wheat),
        ThingKind::Tree | ThingKind::Palm | ThingKind::Stump => Some(ItemKind::Wood),
        ThingKind::Bush => Some(ItemKind::Food),
        ThingKind::Stone => Some(ItemKind::Stone),
        ThingKind::Gold => Some(ItemKind::Gold),
        ThingKind::Fish => Some(ItemKind::Fish),
        ThingKind::Corpse | ThingKind::Skeleton => Some(ItemKind::Meat),
        _ => None,
    }
}

/// What an exhausted node collapses into, if anything.
pub const fn exhausted_marker(kind: ThingKind) -> Option<ThingKind> {
    match kind {
        ThingKind::Tree | ThingKind::Palm => Some(ThingKind::Stump),
        ThingKind::Wheat => Some(ThingKind::Stubble),
        ThingKind::Corpse => Some(ThingKind::Skeleton),
        _ => None,
    }
}

/// Slab store with generational handles and dense per-kind buckets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThingStore {
    slots: Vec<Option<Thing>>,
    generations: Vec<u32>,
    free: Vec<u32>,
    buckets: Vec<Vec<ThingId>>,
}

impl ThingStore {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free: Vec::new(),
            buckets: vec![Vec::new(); ThingKind::COUNT],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocates a slot, stamps the thing's id, and registers it in its
    /// kind bucket. Grid registration is the environment's job.
    pub fn insert(&mut self, mut thing: Thing) -> ThingId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(None);
                self.generations.push(0);
                (self.slots.len() - 1) as u32
            }
        };
        let id = ThingId::new(index, self.generations[index as usize]);
        thing.id = id;
        self.buckets[thing.kind as usize].push(id);
        self.slots[index as usize] = Some(thing);
        id
    }

    pub fn get(&self, id: ThingId) -> Option<&Thing> {
        if self.generations.get(id.index as usize) != Some(&id.generation) {
            return None;
        }
        self.slots[id.index as usize].as_ref()
    }

    pub fn get_mut(&mut self, id: ThingId) -> Option<&mut Thing> {
        if self.generations.get(id.index as usize) != Some(&id.generation) {
            return None;
        }
        self.slots[id.index as usize].as_mut()
    }

    /// Frees the slot, bumps its generation, and drops the bucket entry.
    pub fn remove(&mut self, id: ThingId) -> Option<Thing> {
        if self.generations.get(id.index as usize) != Some(&id.generation) {
            return None;
        }
        let thing = self.slots[id.index as usize].take()?;
        self.generations[id.index as usize] += 1;
        self.free.push(id.index);
        let bucket = &mut self.buckets[thing.kind as usize];
        if let Some(at) = bucket.iter().position(|entry| *entry == id) {
            bucket.swap_remove(at);
        } else {
            debug_assert!(false, "thing {id} missing from its kind bucket");
        }
        Some(thing)
    }

    /// Handles of every live thing of `kind`. Order is insertion order
    /// perturbed only by removals, so replays see identical iteration.
    pub fn bucket(&self, kind: ThingKind) -> &[ThingId] {
        &self.buckets[kind as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Thing> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    /// Stable snapshot of a kind bucket for mutate-while-iterating loops.
    pub fn bucket_snapshot(&self, kind: ThingKind) -> Vec<ThingId> {
        self.buckets[kind as usize].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_handles_never_alias_reused_slots() {
        let mut store = ThingStore::new();
        let id = store.insert(Thing::new(ThingKind::Tree, Position::new(1, 1)));
        assert!(store.get(id).is_some());
        store.remove(id).unwrap();
        assert!(store.get(id).is_none());

        let reused = store.insert(Thing::new(ThingKind::Stone, Position::new(2, 2)));
        assert_eq!(reused.index, id.index);
        assert_ne!(reused.generation, id.generation);
        assert!(store.get(id).is_none());
        assert!(store.get(reused).is_some());
    }

    #[test]
    fn buckets_track_membership() {
        let mut store = ThingStore::new();
        let a = store.insert(Thing::new(ThingKind::Tree, Position::new(0, 0)));
        let b = store.insert(Thing::new(ThingKind::Tree, Position::new(1, 0)));
        assert_eq!(store.bucket(ThingKind::Tree), &[a, b]);
        store.remove(a);
        assert_eq!(store.bucket(ThingKind::Tree), &[b]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn agent_constructor_applies_class_stats() {
        let agent = Thing::agent(3, UnitClass::Knight, Position::new(4, 4), 0);
        assert_eq!(agent.hp, UnitClass::Knight.stats().max_hp);
        assert_eq!(
            agent.agent_data().unwrap().attack_damage,
            UnitClass::Knight.stats().attack_damage
        );
        assert_eq!(agent.team, 0);
    }

    #[test]
    fn resource_node_carries_yield_in_inventory() {
        use crate::items::ItemKind;
        let node = Thing::resource_node(ThingKind::Gold, Position::new(6, 5), 7);
        assert_eq!(node.inventory.count(ItemKind::Gold), 7);
    }

    #[test]
    fn overlay_and_blocking_are_disjoint() {
        use strum::IntoEnumIterator;
        for kind in ThingKind::iter() {
            assert_ne!(kind.is_blocking(), kind.is_overlay());
        }
    }
}
