mod common;

use rpgworld_rust::content::{ContentKind, ContentSource, MemorySource};
use rpgworld_rust::error::{MapFormatError, MapLoadError, ResourceLoadError, SessionError};
use rpgworld_rust::model::{Direction, GridPos};
use rpgworld_rust::script::capability::{Inboxes, SoundEvent};
use rpgworld_rust::session::GameSession;
use rpgworld_rust::world::map::Map;
use rpgworld_rust::world::tile::TilesetCache;
use rpgworld_rust::writer;
use serde_json::json;

fn load(content: &dyn ContentSource, name: &str) -> Result<Map, MapLoadError> {
    let config = common::config();
    Map::load(name, content, &mut TilesetCache::new(), config.world_options())
}

#[test]
fn test_town_loads() {
    let content = common::content("quest");
    let map = load(&content, "town").unwrap();
    assert_eq!(map.size().x, 10);
    assert_eq!(map.npcs().len(), 1);
    assert_eq!(map.npcs()[0].script(), Some("quest"));
    assert_eq!(map.connections().len(), 1);
    assert_eq!(map.background_music(), Some("town_theme"));
    // 100 floor quads, nothing on the upper layers
    assert_eq!(map.batches().quad_count(), 100);
    assert_eq!(map.batches().vertex_count(), 400);
}

#[test]
fn test_missing_map() {
    let content = common::content("quest");
    let err = load(&content, "castle").unwrap_err();
    assert!(matches!(
        err,
        MapLoadError::Resource(ResourceLoadError::Missing { kind: ContentKind::Map, ref name, .. })
            if name == "castle"
    ));
}

#[test]
fn test_two_layer_map_is_rejected_and_old_map_kept() {
    let column = vec![1u32; 4];
    let broken = json!({
        "mapConfig": { "size": { "x": 4, "y": 4 }, "tileset": "overworld" },
        "mapData": { "tile": [vec![column.clone(); 4], vec![column; 4]] }
    })
    .to_string();
    let content = common::content("quest").with(ContentKind::Map, "broken", broken);

    let err = load(&content, "broken").unwrap_err();
    assert!(matches!(
        err,
        MapLoadError::Format(MapFormatError::LayerCount { found: 2, .. })
    ));

    let mut session =
        GameSession::new(common::config(), Box::new(content), Inboxes::default()).unwrap();
    session.player_mut().actor.place(GridPos::new(3, 3));
    let err = session.change_map("broken", GridPos::new(0, 0)).unwrap_err();
    assert!(matches!(
        err,
        SessionError::MapLoad(MapLoadError::Format(MapFormatError::LayerCount { .. }))
    ));
    assert_eq!(session.map().name(), "town");
    assert_eq!(session.player().actor.position(), GridPos::new(3, 3));
}

#[test]
fn test_empty_tileset_name() {
    let map = json!({
        "mapConfig": { "size": { "x": 1, "y": 1 }, "tileset": "" },
        "mapData": { "tile": [[[1]], [[0]], [[0]]] }
    })
    .to_string();
    let content = MemorySource::new().with(ContentKind::Map, "nameless", map);
    assert!(matches!(
        load(&content, "nameless").unwrap_err(),
        MapLoadError::Resource(ResourceLoadError::EmptyTilesetName { .. })
    ));
}

#[test]
fn test_unknown_tile_id() {
    let mut floor = vec![vec![1u32; 2]; 2];
    floor[1][1] = 9;
    let blank = vec![vec![0u32; 2]; 2];
    let map = json!({
        "mapConfig": { "size": { "x": 2, "y": 2 }, "tileset": "overworld" },
        "mapData": { "tile": [floor, blank.clone(), blank] }
    })
    .to_string();
    let content = common::content("quest").with(ContentKind::Map, "bad_tile", map);
    assert!(matches!(
        load(&content, "bad_tile").unwrap_err(),
        MapLoadError::Format(MapFormatError::Tile { .. })
    ));
}

#[test]
fn test_npc_outside_map() {
    let map = common::grid_map(3, 3, json!([common::npc(3, 0, "quest")]), json!([]));
    let content = common::content("quest").with(ContentKind::Map, "crowded", map);
    assert!(matches!(
        load(&content, "crowded").unwrap_err(),
        MapLoadError::Format(MapFormatError::OutOfBounds { what: "npc", x: 3, y: 0, .. })
    ));
}

#[test]
fn test_written_map_loads_back() {
    let mut content = common::content("quest");
    let mut map = load(&content, "town").unwrap();
    map.set_tile(1, GridPos::new(2, 7), 2).unwrap();
    map.add_decor(GridPos::new(4, 4), 3).unwrap();
    map.rebuild_render_batches().unwrap();
    writer::map::emit(&map, &mut content).unwrap();

    let again = load(&content, "town").unwrap();
    assert_eq!(again.tile(1, GridPos::new(2, 7)), Some(2));
    assert_eq!(again.tile(0, GridPos::new(2, 7)), Some(1));
    assert_eq!(again.decor().len(), 1);
    assert_eq!(again.npcs()[0].position(), GridPos::new(5, 5));
    assert_eq!(again.connections(), map.connections());
    assert_eq!(again.batches(), map.batches());
}

#[test]
fn test_round_trip_when_tileset_declares_another_name() {
    let declared = common::TILESET.replacen("\"overworld\"", "\"Overworld Tiles\"", 1);
    let mut content = common::content("quest").with(ContentKind::Tileset, "overworld", declared);
    let map = load(&content, "town").unwrap();
    assert_eq!(map.tileset().name(), "overworld");

    writer::map::emit(&map, &mut content).unwrap();
    let again = load(&content, "town").unwrap();
    assert_eq!(again.tileset().name(), "overworld");
    assert_eq!(again.batches(), map.batches());
}

#[test]
fn test_npc_without_script_survives_round_trip() {
    let mut content = common::content("");
    let map = load(&content, "town").unwrap();
    assert_eq!(map.npcs()[0].script(), None);

    writer::map::emit(&map, &mut content).unwrap();
    let again = load(&content, "town").unwrap();
    assert_eq!(again.npcs()[0].script(), None);
}

#[test]
fn test_walking_onto_a_connection_changes_map() {
    let mut session =
        GameSession::new(common::config(), Box::new(common::content("quest")), Inboxes::default())
            .unwrap();
    assert_eq!(
        session.drain_sound_events(),
        vec![SoundEvent::Music("town_theme".into())]
    );
    session.player_mut().actor.place(GridPos::new(0, 8));
    assert!(session.queue_player_move(Direction::Down));

    for _ in 0..20 {
        session.tick().unwrap();
        if session.map().name() == "house" {
            break;
        }
    }
    assert_eq!(session.map().name(), "house");
    assert_eq!(session.player().actor.position(), GridPos::new(2, 2));
    assert!(!session.player().actor.is_moving());
    // same track on both maps, nothing restarted
    assert!(session.drain_sound_events().is_empty());
}

#[test]
fn test_blocked_by_npc() {
    let mut session =
        GameSession::new(common::config(), Box::new(common::content("quest")), Inboxes::default())
            .unwrap();
    session.player_mut().actor.place(GridPos::new(5, 6));
    session.queue_player_move(Direction::Up);
    session.tick().unwrap();
    assert_eq!(session.player().actor.position(), GridPos::new(5, 6));
    assert_eq!(session.player().actor.facing(), Direction::Up);
}
