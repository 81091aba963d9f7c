//! Serialize a `Map` back into the map file schema.

use tracing::info;

use crate::content::{ContentKind, ContentSource};
use crate::error::ResourceLoadError;
use crate::model::{DecorEntry, MapConfig, MapData, MapFile, NpcEntry};
use crate::world::map::Map;

pub fn to_map_file(map: &Map) -> MapFile {
    let size = map.size();
    let height = size.y as usize;

    let tile = (0..crate::model::LAYER_COUNT)
        .map(|layer| {
            map.layer_cells(layer)
                .unwrap_or(&[])
                .chunks(height)
                .map(<[_]>::to_vec)
                .collect()
        })
        .collect();

    let npcs = map
        .npcs()
        .iter()
        .map(|npc| NpcEntry {
            spritesheet: npc.spritesheet().to_string(),
            position: npc.position(),
            script: npc.script().unwrap_or_default().to_string(),
            movement_speed: Some(npc.movement_speed()),
        })
        .collect();

    let decor = map
        .decor()
        .iter()
        .map(|d| DecorEntry {
            position: d.position,
            tile: d.tile,
        })
        .collect();

    MapFile {
        map_config: MapConfig {
            size,
            tileset: map.tileset().name().to_string(),
            background_music: map.background_music().map(str::to_string),
        },
        map_data: MapData {
            tile,
            npcs,
            connections: map.connections().to_vec(),
            decor,
        },
    }
}

pub fn to_json(map: &Map) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&to_map_file(map))
}

/// Write `map` under its own name.
pub fn emit(map: &Map, content: &mut dyn ContentSource) -> Result<(), ResourceLoadError> {
    let json = to_json(map).map_err(|source| ResourceLoadError::Malformed {
        kind: ContentKind::Map,
        name: map.name().to_string(),
        source,
    })?;
    content.write(ContentKind::Map, map.name(), &json)?;
    info!(map = map.name(), bytes = json.len(), "map written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GridPos, MapSize, TileEntry, TilesetFile};
    use crate::world::WorldOptions;
    use crate::world::actor::Actor;
    use crate::world::tile::{CollisionFlags, Tileset};
    use std::sync::Arc;

    #[test]
    fn test_layers_written_column_major() {
        let tileset = Arc::new(
            Tileset::from_file(TilesetFile {
                name: "t".into(),
                columns: 8,
                tiles: vec![
                    TileEntry {
                        frame: 0,
                        priority: 0,
                        collision: CollisionFlags::OPEN,
                        animation: None,
                    };
                    2
                ],
            })
            .unwrap(),
        );
        let mut map = Map::empty(
            "m",
            MapSize { x: 3, y: 2 },
            1,
            tileset,
            WorldOptions::default(),
        )
        .unwrap();
        map.set_tile(1, GridPos::new(2, 1), 2).unwrap();
        map.add_npc(Actor::npc("n", GridPos::new(0, 1), "greeter", 4, 32))
            .unwrap();
        map.add_decor(GridPos::new(1, 0), 2).unwrap();

        let file = to_map_file(&map);
        assert_eq!(file.map_data.tile.len(), 3);
        assert_eq!(file.map_data.tile[0], vec![vec![1, 1]; 3]);
        assert_eq!(file.map_data.tile[1][2], vec![0, 2]);
        assert_eq!(file.map_data.npcs[0].script, "greeter");
        assert_eq!(file.map_data.npcs[0].movement_speed, Some(4));
        assert_eq!(file.map_data.decor[0].tile, 2);
        assert_eq!(file.map_config.tileset, "t");
    }
}
