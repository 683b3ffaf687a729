//! Item catalog, per-thing inventories, and per-team stockpiles.
//!
//! Items split into two disjoint sets: **stockpile resources** (routed into
//! per-team pools by dropoff buildings) and **carried items** (stay in an
//! agent's bag). The split is a property of [`ItemKind`], not of where the
//! item currently sits; an agent can carry Wood, but Wood remains a
//! stockpile resource for capacity accounting.

use std::collections::BTreeMap;

use crate::config::SimConfig;

/// The five pooled resources. Order is the wire order used by cost vectors
/// and the observation inventory layers.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::EnumIter, strum::EnumCount,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Resource {
    Food = 0,
    Wood,
    Stone,
    Gold,
    Water,
}

pub const RESOURCES: [Resource; 5] = [
    Resource::Food,
    Resource::Wood,
    Resource::Stone,
    Resource::Gold,
    Resource::Water,
];

impl Resource {
    pub const fn item(self) -> ItemKind {
        match self {
            Resource::Food => ItemKind::Food,
            Resource::Wood => ItemKind::Wood,
            Resource::Stone => ItemKind::Stone,
            Resource::Gold => ItemKind::Gold,
            Resource::Water => ItemKind::Water,
        }
    }
}

/// Closed item set.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::EnumIter, strum::EnumCount,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ItemKind {
    // Stockpile resources.
    Food = 0,
    Wood,
    Stone,
    Gold,
    Water,
    // Carried items.
    Bar,
    Bread,
    Armor,
    Spear,
    Lantern,
    Relic,
    Plant,
    Wheat,
    Meat,
    Fish,
    Seeds,
    Branch,
    Boulder,
    Egg,
    Milk,
    Corpse,
}

impl ItemKind {
    /// Whether dropoff buildings route this item into the team pool.
    pub const fn is_stockpile(self) -> bool {
        matches!(
            self,
            ItemKind::Food | ItemKind::Wood | ItemKind::Stone | ItemKind::Gold | ItemKind::Water
        )
    }

    pub const fn as_resource(self) -> Option<Resource> {
        match self {
            ItemKind::Food => Some(Resource::Food),
            ItemKind::Wood => Some(Resource::Wood),
            ItemKind::Stone => Some(Resource::Stone),
            ItemKind::Gold => Some(Resource::Gold),
            ItemKind::Water => Some(Resource::Water),
            _ => None,
        }
    }
}

/// Deterministic item bag. BTreeMap keeps iteration order stable so
/// serialization, hashing, and "largest stack" scans replay identically.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Inventory {
    items: BTreeMap<ItemKind, u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, kind: ItemKind) -> u32 {
        self.items.get(&kind).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total stockpile-resource items held (the agent carry-capacity sum).
    pub fn stockpile_total(&self) -> u32 {
        self.items
            .iter()
            .filter(|(kind, _)| kind.is_stockpile())
            .map(|(_, count)| count)
            .sum()
    }

    /// Adds `amount`, unconditionally. Callers enforce carry caps.
    pub fn add(&mut self, kind: ItemKind, amount: u32) {
        if amount == 0 {
            return;
        }
        *self.items.entry(kind).or_insert(0) += amount;
    }

    /// Removes up to `amount`; returns how many were actually removed.
    pub fn remove(&mut self, kind: ItemKind, amount: u32) -> u32 {
        let Some(held) = self.items.get_mut(&kind) else {
            return 0;
        };
        let taken = amount.min(*held);
        *held -= taken;
        if *held == 0 {
            self.items.remove(&kind);
        }
        taken
    }

    /// Removes exactly `amount` or nothing. True on success.
    pub fn take_exact(&mut self, kind: ItemKind, amount: u32) -> bool {
        if self.count(kind) < amount {
            return false;
        }
        self.remove(kind, amount);
        true
    }

    /// How many more of `kind` an *agent* bag may accept under the
    /// per-item and stockpile-sum caps.
    pub fn agent_capacity_for(&self, kind: ItemKind) -> u32 {
        let per_item = SimConfig::CARRY_CAP_PER_ITEM.saturating_sub(self.count(kind));
        if kind.is_stockpile() {
            let pool = SimConfig::STOCKPILE_CARRY_CAP.saturating_sub(self.stockpile_total());
            per_item.min(pool)
        } else {
            per_item
        }
    }

    /// Deterministic iteration in `ItemKind` order.
    pub fn iter(&self) -> impl Iterator<Item = (ItemKind, u32)> + '_ {
        self.items.iter().map(|(kind, count)| (*kind, *count))
    }

    /// Drains every item into `other`, clamped by `other`'s agent caps.
    /// Returns true if everything fit.
    pub fn drain_into_agent_bag(&mut self, other: &mut Inventory) -> bool {
        let mut all_fit = true;
        let kinds: Vec<ItemKind> = self.items.keys().copied().collect();
        for kind in kinds {
            let held = self.count(kind);
            let cap = other.agent_capacity_for(kind);
            let moved = held.min(cap);
            if moved < held {
                all_fit = false;
            }
            if moved > 0 {
                self.remove(kind, moved);
                other.add(kind, moved);
            }
        }
        all_fit
    }
}

/// Per-team pooled resources with building-scaled caps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stockpile {
    amounts: [u32; 5],
}

impl Stockpile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, resource: Resource) -> u32 {
        self.amounts[resource as usize]
    }

    /// Adds up to `amount` under `cap`; returns the accepted quantity.
    pub fn add_capped(&mut self, resource: Resource, amount: u32, cap: u32) -> u32 {
        let slot = &mut self.amounts[resource as usize];
        let accepted = amount.min(cap.saturating_sub(*slot));
        *slot += accepted;
        accepted
    }

    /// Spends exactly `amount` or nothing. True on success.
    pub fn spend(&mut self, resource: Resource, amount: u32) -> bool {
        let slot = &mut self.amounts[resource as usize];
        if *slot < amount {
            return false;
        }
        *slot -= amount;
        true
    }

    /// Whether every component of `cost` is affordable.
    pub fn can_afford(&self, cost: &[(Resource, u32)]) -> bool {
        cost.iter()
            .all(|(resource, amount)| self.get(*resource) >= *amount)
    }

    /// Spends a full cost vector atomically. True on success.
    pub fn spend_all(&mut self, cost: &[(Resource, u32)]) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        for (resource, amount) in cost {
            let spent = self.spend(*resource, *amount);
            debug_assert!(spent, "can_afford admitted an unaffordable cost");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stockpile_split_is_disjoint() {
        assert!(ItemKind::Wood.is_stockpile());
        assert!(!ItemKind::Bar.is_stockpile());
        assert_eq!(ItemKind::Gold.as_resource(), Some(Resource::Gold));
        assert_eq!(ItemKind::Bread.as_resource(), None);
    }

    #[test]
    fn agent_caps_bound_both_axes() {
        let mut bag = Inventory::new();
        bag.add(ItemKind::Wood, 4);
        bag.add(ItemKind::Stone, 5);
        // Per-item cap: 5 - 4 = 1 for Wood.
        assert_eq!(bag.agent_capacity_for(ItemKind::Wood), 1);
        // Pool cap: 10 - 9 = 1 for any stockpile resource.
        assert_eq!(bag.agent_capacity_for(ItemKind::Gold), 1);
        // Carried items only see the per-item cap.
        assert_eq!(bag.agent_capacity_for(ItemKind::Bread), 5);
    }

    #[test]
    fn take_exact_is_atomic() {
        let mut bag = Inventory::new();
        bag.add(ItemKind::Bar, 1);
        assert!(!bag.take_exact(ItemKind::Bar, 2));
        assert_eq!(bag.count(ItemKind::Bar), 1);
        assert!(bag.take_exact(ItemKind::Bar, 1));
        assert_eq!(bag.count(ItemKind::Bar), 0);
    }

    #[test]
    fn stockpile_spend_all_is_atomic() {
        let mut pool = Stockpile::new();
        pool.add_capped(Resource::Wood, 3, 100);
        pool.add_capped(Resource::Stone, 1, 100);
        let cost = [(Resource::Wood, 2), (Resource::Stone, 2)];
        assert!(!pool.spend_all(&cost));
        assert_eq!(pool.get(Resource::Wood), 3);
        assert_eq!(pool.get(Resource::Stone), 1);
    }

    #[test]
    fn add_capped_clamps() {
        let mut pool = Stockpile::new();
        assert_eq!(pool.add_capped(Resource::Food, 120, 100), 100);
        assert_eq!(pool.add_capped(Resource::Food, 5, 100), 0);
    }

    #[test]
    fn pickup_drains_with_overflow_report() {
        let mut corpse = Inventory::new();
        corpse.add(ItemKind::Meat, 3);
        corpse.add(ItemKind::Wood, 20);
        let mut bag = Inventory::new();
        let all_fit = corpse.drain_into_agent_bag(&mut bag);
        assert!(!all_fit);
        assert_eq!(bag.count(ItemKind::Meat), 3);
        assert_eq!(bag.count(ItemKind::Wood), 5);
        assert_eq!(corpse.count(ItemKind::Wood), 15);
    }
}
