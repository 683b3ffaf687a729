//! Debug ASCII renderer.
//!
//! One glyph per tile: blocking things first, then overlays, then terrain.
//! Agents print their team digit. Not part of the training contract.

use crate::env::Environment;
use crate::geom::Position;
use crate::terrain::TerrainKind;
use crate::things::ThingKind;

impl Environment {
    /// Renders the map as one line per row, north at the top.
    pub fn render(&self) -> String {
        let width = self.grid().width();
        let height = self.grid().height();
        let mut out = String::with_capacity(((width + 1) * height) as usize);
        for y in 0..height {
            for x in 0..width {
                out.push(self.glyph(Position::new(x, y)));
            }
            out.push('\n');
        }
        out
    }

    fn glyph(&self, pos: Position) -> char {
        if let Some(thing) = self.grid().get_blocking(pos).and_then(|id| self.thing(id)) {
            return match thing.kind {
                ThingKind::Agent => match thing.team {
                    t @ 0..=9 => (b'0' + t as u8) as char,
                    _ => 'a',
                },
                ThingKind::Cow => 'c',
                ThingKind::Wolf => 'w',
                ThingKind::Bear => 'B',
                ThingKind::Spawner => 'S',
                ThingKind::Tumor => 't',
                ThingKind::Tree | ThingKind::Palm => 'T',
                ThingKind::Wheat => 'y',
                ThingKind::Bush => 'b',
                ThingKind::Stone => 'o',
                ThingKind::Gold => 'g',
                ThingKind::Magma => 'M',
                ThingKind::Altar => 'A',
                ThingKind::TownCenter => 'H',
                ThingKind::Castle => 'C',
                ThingKind::GuardTower => 'G',
                ThingKind::Temple => 'P',
                ThingKind::Wall => '#',
                _ => 'k',
            };
        }
        if let Some(overlay) = self.grid().get_overlay(pos).and_then(|id| self.thing(id)) {
            return match overlay.kind {
                ThingKind::Lantern => '*',
                ThingKind::Relic => 'r',
                ThingKind::Corpse | ThingKind::Skeleton => 'x',
                ThingKind::Stump | ThingKind::Stubble => ',',
                ThingKind::Fish => 'f',
                _ => '?',
            };
        }
        if self
            .grid()
            .tile(pos)
            .is_some_and(|tile| tile.door.is_some())
        {
            return '+';
        }
        match self.grid().terrain(pos) {
            Some(TerrainKind::Water) => '~',
            Some(TerrainKind::ShallowWater) => '-',
            Some(TerrainKind::Mountain) => '^',
            Some(TerrainKind::Road) | Some(TerrainKind::Bridge) => '=',
            Some(TerrainKind::Fertile) => '"',
            Some(TerrainKind::Grass) => '.',
            Some(TerrainKind::Tree) | Some(TerrainKind::Palm) => 'T',
            Some(TerrainKind::Wheat) => 'y',
            Some(TerrainKind::Stone) | Some(TerrainKind::Stalagmite) => 'o',
            Some(TerrainKind::Gold) => 'g',
            _ => ' ',
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::SimConfig;
    use crate::env::{EmptyMap, Environment};
    use crate::geom::Position;
    use crate::registry::UnitClass;
    use crate::things::Thing;

    #[test]
    fn render_shows_agents_and_terrain() {
        let mut env =
            Environment::new(SimConfig::default(), Box::new(EmptyMap::new(8, 8))).unwrap();
        env.add(Thing::agent(0, UnitClass::Villager, Position::new(2, 1), 0))
            .unwrap();
        let text = env.render();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[1].as_bytes()[2], b'0');
    }
}
