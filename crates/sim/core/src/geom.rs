//! Grid geometry: positions, the fixed direction table, and thing handles.

use std::fmt;

/// Discrete tile position. `(-1, -1)` is the off-grid sentinel used for
/// garrisoned and dead units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Off-grid sentinel: garrisoned units and dead agents live here.
    pub const OFF_GRID: Self = Self { x: -1, y: -1 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn is_off_grid(self) -> bool {
        self.x == -1 && self.y == -1
    }

    /// One step in `dir`.
    #[inline]
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// `n` steps in `dir`.
    pub fn step_n(self, dir: Direction, n: i32) -> Self {
        let (dx, dy) = dir.delta();
        Self::new(self.x + dx * n, self.y + dy * n)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::OFF_GRID
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Chebyshev distance, the grid's metric: `max(|Δx|, |Δy|)`.
#[inline]
pub fn chebyshev(a: Position, b: Position) -> i32 {
    (a.x - b.x).abs().max((a.y - b.y).abs())
}

/// Eight-way orientation. The discriminant order is the wire order used by
/// action arguments and the observation layer: N, S, W, E, NW, NE, SW, SE.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::EnumIter, strum::EnumCount)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Direction {
    North = 0,
    South = 1,
    West = 2,
    East = 3,
    NorthWest = 4,
    NorthEast = 5,
    SouthWest = 6,
    SouthEast = 7,
}

/// The fixed 8-entry direction table in wire order.
pub const DIRECTIONS: [Direction; 8] = [
    Direction::North,
    Direction::South,
    Direction::West,
    Direction::East,
    Direction::NorthWest,
    Direction::NorthEast,
    Direction::SouthWest,
    Direction::SouthEast,
];

/// The four cardinal directions, in wire order.
pub const CARDINALS: [Direction; 4] = [
    Direction::North,
    Direction::South,
    Direction::West,
    Direction::East,
];

/// The four diagonal directions, in wire order.
pub const DIAGONALS: [Direction; 4] = [
    Direction::NorthWest,
    Direction::NorthEast,
    Direction::SouthWest,
    Direction::SouthEast,
];

impl Direction {
    /// Decodes a wire index 0..=7.
    pub fn from_index(index: u8) -> Option<Self> {
        DIRECTIONS.get(index as usize).copied()
    }

    #[inline]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// `(dx, dy)` with y growing southward.
    #[inline]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
            Direction::East => (1, 0),
            Direction::NorthWest => (-1, -1),
            Direction::NorthEast => (1, -1),
            Direction::SouthWest => (-1, 1),
            Direction::SouthEast => (1, 1),
        }
    }

    /// The two perpendicular offsets used by arc and AoE attacks. For a
    /// diagonal facing these are the flanking diagonals.
    pub const fn perpendiculars(self) -> [(i32, i32); 2] {
        match self {
            Direction::North | Direction::South => [(-1, 0), (1, 0)],
            Direction::West | Direction::East => [(0, -1), (0, 1)],
            Direction::NorthWest | Direction::SouthEast => [(-1, 1), (1, -1)],
            Direction::NorthEast | Direction::SouthWest => [(-1, -1), (1, 1)],
        }
    }

    /// The direction whose delta matches the sign of `to - from`. South
    /// when the positions coincide.
    pub fn towards(from: Position, to: Position) -> Direction {
        let dx = (to.x - from.x).signum();
        let dy = (to.y - from.y).signum();
        DIRECTIONS
            .iter()
            .copied()
            .find(|dir| dir.delta() == (dx, dy))
            .unwrap_or(Direction::South)
    }

    #[inline]
    pub const fn is_cardinal(self) -> bool {
        matches!(
            self,
            Direction::North | Direction::South | Direction::West | Direction::East
        )
    }
}

/// Stable generational handle into the thing store.
///
/// Removal clears the slot and bumps its generation, so stale handles held
/// by garrison lists or home-altar references resolve to `None` instead of
/// aliasing a reused slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThingId {
    pub index: u32,
    pub generation: u32,
}

impl ThingId {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Display for ThingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_table_matches_wire_order() {
        assert_eq!(Direction::from_index(0), Some(Direction::North));
        assert_eq!(Direction::from_index(3), Some(Direction::East));
        assert_eq!(Direction::from_index(7), Some(Direction::SouthEast));
        assert_eq!(Direction::from_index(8), None);
    }

    #[test]
    fn chebyshev_is_max_axis_delta() {
        let a = Position::new(3, 4);
        assert_eq!(chebyshev(a, Position::new(3, 4)), 0);
        assert_eq!(chebyshev(a, Position::new(5, 4)), 2);
        assert_eq!(chebyshev(a, Position::new(1, 9)), 5);
    }

    #[test]
    fn off_grid_sentinel() {
        assert!(Position::OFF_GRID.is_off_grid());
        assert!(!Position::new(0, 0).is_off_grid());
    }
}
