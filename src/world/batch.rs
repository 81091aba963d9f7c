//! Render batches derived from the tile grid.
//!
//! One quad per non-empty cell, bucketed by draw priority (paint order) and
//! again by layer (partial redraw while editing). Batches are a pure function
//! of the grid: cells are visited layer by layer, then column by column.

use std::collections::BTreeMap;

use crate::error::TileError;
use crate::model::{EMPTY_TILE, GridPos, LAYER_COUNT, MapSize, TileId};
use crate::world::tile::{TileDefinition, Tileset};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quad {
    pub layer: usize,
    pub cell: GridPos,
    pub tile: TileId,
    /// top-left, top-right, bottom-right, bottom-left
    pub vertices: [Vertex; 4],
}

impl Quad {
    pub fn new(
        layer: usize,
        cell: GridPos,
        tile: &TileDefinition,
        tileset: &Tileset,
        tile_size: u32,
    ) -> Self {
        let ts = tile_size as f32;
        let (left, top) = ((cell.x * tile_size) as f32, (cell.y * tile_size) as f32);
        let (u, v) = tileset.texture_origin(tile.frame, tile_size);
        let corner = |dx: f32, dy: f32| Vertex {
            position: [left + dx * ts, top + dy * ts],
            tex_coords: [u + dx * ts, v + dy * ts],
        };
        Self {
            layer,
            cell,
            tile: tile.id,
            vertices: [
                corner(0.0, 0.0),
                corner(1.0, 0.0),
                corner(1.0, 1.0),
                corner(0.0, 1.0),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderBatches {
    by_priority: BTreeMap<i32, Vec<Quad>>,
    by_layer: [Vec<Quad>; LAYER_COUNT],
}

impl RenderBatches {
    pub fn build(
        layers: &[Vec<TileId>; LAYER_COUNT],
        size: MapSize,
        tileset: &Tileset,
        tile_size: u32,
    ) -> Result<Self, TileError> {
        let mut batches = RenderBatches::default();
        for layer in 0..LAYER_COUNT {
            for quad in layer_quads(layer, &layers[layer], size, tileset, tile_size)? {
                let priority = tileset.get_tile(quad.tile)?.priority;
                batches
                    .by_priority
                    .entry(priority)
                    .or_default()
                    .push(quad.clone());
                batches.by_layer[layer].push(quad);
            }
        }
        Ok(batches)
    }

    /// Replace one layer batch without touching the priority batches.
    pub fn rebuild_layer(
        &mut self,
        layer: usize,
        cells: &[TileId],
        size: MapSize,
        tileset: &Tileset,
        tile_size: u32,
    ) -> Result<(), TileError> {
        self.by_layer[layer] = layer_quads(layer, cells, size, tileset, tile_size)?;
        Ok(())
    }

    /// Priority batches in paint order (lowest first).
    pub fn priorities(&self) -> impl Iterator<Item = (i32, &[Quad])> {
        self.by_priority.iter().map(|(p, quads)| (*p, quads.as_slice()))
    }

    pub fn priority(&self, priority: i32) -> &[Quad] {
        self.by_priority
            .get(&priority)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn layer(&self, layer: usize) -> &[Quad] {
        self.by_layer.get(layer).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn quad_count(&self) -> usize {
        self.by_priority.values().map(Vec::len).sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.quad_count() * 4
    }
}

fn layer_quads(
    layer: usize,
    cells: &[TileId],
    size: MapSize,
    tileset: &Tileset,
    tile_size: u32,
) -> Result<Vec<Quad>, TileError> {
    let mut quads = Vec::new();
    for x in 0..size.x {
        for y in 0..size.y {
            let id = cells[x as usize * size.y as usize + y as usize];
            if id == EMPTY_TILE {
                continue;
            }
            let tile = tileset.get_tile(id)?;
            quads.push(Quad::new(layer, GridPos::new(x, y), tile, tileset, tile_size));
        }
    }
    Ok(quads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TileEntry, TilesetFile};
    use crate::world::tile::CollisionFlags;

    fn tileset() -> Tileset {
        let entry = |frame, priority| TileEntry {
            frame,
            priority,
            collision: CollisionFlags::OPEN,
            animation: None,
        };
        Tileset::from_file(TilesetFile {
            name: "t".into(),
            columns: 2,
            tiles: vec![entry(0, 0), entry(1, 0), entry(3, 5)],
        })
        .unwrap()
    }

    #[test]
    fn test_quads_bucketed_by_priority_and_layer() {
        let size = MapSize { x: 2, y: 2 };
        let layers = [vec![1, 1, 2, 1], vec![0, 3, 0, 0], vec![0; 4]];
        let batches = RenderBatches::build(&layers, size, &tileset(), 32).unwrap();

        assert_eq!(batches.quad_count(), 5);
        assert_eq!(batches.vertex_count(), 20);
        assert_eq!(batches.priority(0).len(), 4);
        assert_eq!(batches.priority(5).len(), 1);
        assert_eq!(batches.layer(0).len(), 4);
        assert_eq!(batches.layer(1).len(), 1);
        assert!(batches.layer(2).is_empty());

        let order: Vec<i32> = batches.priorities().map(|(p, _)| p).collect();
        assert_eq!(order, vec![0, 5]);
    }

    #[test]
    fn test_quad_geometry() {
        let set = tileset();
        let quad = Quad::new(0, GridPos::new(1, 2), set.get_tile(3).unwrap(), &set, 32);
        assert_eq!(quad.vertices[0].position, [32.0, 64.0]);
        assert_eq!(quad.vertices[2].position, [64.0, 96.0]);
        // frame 3 in a 2-column sheet sits at column 1, row 1
        assert_eq!(quad.vertices[0].tex_coords, [32.0, 32.0]);
        assert_eq!(quad.vertices[2].tex_coords, [64.0, 64.0]);
    }

    #[test]
    fn test_visit_order_is_column_major() {
        let size = MapSize { x: 2, y: 2 };
        let layers = [vec![1, 1, 1, 1], vec![0; 4], vec![0; 4]];
        let batches = RenderBatches::build(&layers, size, &tileset(), 32).unwrap();
        let cells: Vec<GridPos> = batches.layer(0).iter().map(|q| q.cell).collect();
        assert_eq!(
            cells,
            vec![
                GridPos::new(0, 0),
                GridPos::new(0, 1),
                GridPos::new(1, 0),
                GridPos::new(1, 1)
            ]
        );
    }
}
