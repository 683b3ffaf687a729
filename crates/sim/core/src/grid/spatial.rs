//! Coarse fixed-cell spatial index for range queries.
//!
//! Cells are `SPATIAL_CELL × SPATIAL_CELL` tiles; each cell keeps a small
//! bucket of blocking-thing handles. Range queries visit the cell rectangle
//! covering the query square in row-major order, so enumeration order is a
//! pure function of state.

use crate::config::SimConfig;
use crate::geom::{Position, ThingId};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpatialIndex {
    cells: Vec<Vec<ThingId>>,
    cells_x: i32,
    cells_y: i32,
}

impl SpatialIndex {
    pub fn new(width: i32, height: i32) -> Self {
        let cells_x = (width + SimConfig::SPATIAL_CELL - 1) / SimConfig::SPATIAL_CELL;
        let cells_y = (height + SimConfig::SPATIAL_CELL - 1) / SimConfig::SPATIAL_CELL;
        Self {
            cells: vec![Vec::new(); (cells_x * cells_y) as usize],
            cells_x,
            cells_y,
        }
    }

    #[inline]
    fn cell_index(&self, pos: Position) -> usize {
        let cx = (pos.x / SimConfig::SPATIAL_CELL).clamp(0, self.cells_x - 1);
        let cy = (pos.y / SimConfig::SPATIAL_CELL).clamp(0, self.cells_y - 1);
        (cy * self.cells_x + cx) as usize
    }

    pub fn insert(&mut self, pos: Position, id: ThingId) {
        let cell = self.cell_index(pos);
        debug_assert!(
            !self.cells[cell].contains(&id),
            "{id} double-registered in spatial cell"
        );
        self.cells[cell].push(id);
    }

    pub fn remove(&mut self, pos: Position, id: ThingId) {
        let cell = self.cell_index(pos);
        if let Some(at) = self.cells[cell].iter().position(|entry| *entry == id) {
            self.cells[cell].swap_remove(at);
        } else {
            debug_assert!(false, "{id} missing from spatial cell on remove");
        }
    }

    /// Visits every registered handle in the cell rectangle covering the
    /// Chebyshev square of radius `r` around `origin`. Callers re-check the
    /// exact distance; cells over-approximate.
    pub fn for_each_in_square<F>(&self, origin: Position, r: i32, mut visit: F)
    where
        F: FnMut(ThingId),
    {
        let min_cx = ((origin.x - r).max(0)) / SimConfig::SPATIAL_CELL;
        let min_cy = ((origin.y - r).max(0)) / SimConfig::SPATIAL_CELL;
        let max_cx = ((origin.x + r) / SimConfig::SPATIAL_CELL).min(self.cells_x - 1);
        let max_cy = ((origin.y + r) / SimConfig::SPATIAL_CELL).min(self.cells_y - 1);
        for cy in min_cy..=max_cy {
            for cx in min_cx..=max_cx {
                for id in &self.cells[(cy * self.cells_x + cx) as usize] {
                    visit(*id);
                }
            }
        }
    }
}
