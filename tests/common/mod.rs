#![allow(dead_code)]

use rpgworld_rust::config::EngineConfig;
use rpgworld_rust::content::{ContentKind, MemorySource};
use rpgworld_rust::model::{Direction, GridPos};
use rpgworld_rust::script::capability::Inboxes;
use rpgworld_rust::session::GameSession;
use serde_json::{Value, json};

pub const TILESET: &str = r#"{
    "name": "overworld",
    "tiles": [
        { "frame": 0 },
        { "frame": 1, "priority": 1, "collision": { "up": true, "down": true, "left": true, "right": true } },
        { "frame": 8, "animation": { "start": 8, "count": 4, "speed": 10, "repeat": true } }
    ]
}"#;

pub const CATALOG: &str = r#"{ "potion": { "price": 10 }, "ether": { "price": 25 } }"#;

/// Floor everywhere on layer 0, nothing above.
pub fn grid_map(width: u32, height: u32, npcs: Value, connections: Value) -> String {
    let floor = vec![vec![1u32; height as usize]; width as usize];
    let blank = vec![vec![0u32; height as usize]; width as usize];
    json!({
        "mapConfig": {
            "size": { "x": width, "y": height },
            "tileset": "overworld",
            "backgroundMusic": "town_theme"
        },
        "mapData": {
            "tile": [floor, blank.clone(), blank],
            "npcs": npcs,
            "connections": connections
        }
    })
    .to_string()
}

pub fn npc(x: u32, y: u32, script: &str) -> Value {
    json!({ "spritesheet": "villager", "position": { "x": x, "y": y }, "script": script })
}

pub const SCRIPTS: &[(&str, &str)] = &[
    (
        "quest",
        "ask {Quest?} {Yes} {No}\n\
         if choice 0 then\n  setflag flag_quest\n  give {potion} 1\nelse\n  say {Maybe later}\nendif",
    ),
    ("greeter", "say {Hello}\nlog {greeted}"),
    ("merchant", "shop {Ada}\n  sell {potion} 10 5\nendshop\nsetflag flag_shopped"),
    (
        "fighter",
        "battle\nif won then setflag flag_beat else setflag flag_lost endif",
    ),
    ("broken", "fail {boom}"),
    ("late_failure", "say {hi}\nfail {boom}"),
    ("generous", "give {potion} 0\ngive {} 3\ngive {unknown} 2\ngive {ether} 2"),
];

/// A 10×10 town with one NPC at (5, 5) running `script`, plus a house
/// reachable through a connection at (0, 9).
pub fn content(script: &str) -> MemorySource {
    let town = grid_map(
        10,
        10,
        json!([npc(5, 5, script)]),
        json!([{ "source": { "x": 0, "y": 9 }, "targetMap": "house", "target": { "x": 2, "y": 2 } }]),
    );
    let house = grid_map(4, 4, json!([]), json!([]));

    let mut source = MemorySource::new()
        .with(ContentKind::Tileset, "overworld", TILESET)
        .with(ContentKind::Map, "town", town)
        .with(ContentKind::Map, "house", house)
        .with(ContentKind::Catalog, "ItemList.json", CATALOG);
    for (name, src) in SCRIPTS {
        source.insert(ContentKind::Script, name, *src);
    }
    source
}

pub fn config() -> EngineConfig {
    EngineConfig {
        start_map: "town".to_string(),
        ..EngineConfig::default()
    }
}

/// Session with the player standing at (5, 6) facing the NPC above.
pub fn facing_npc(script: &str) -> GameSession<Inboxes> {
    let mut session =
        GameSession::new(config(), Box::new(content(script)), Inboxes::default()).unwrap();
    session.player_mut().actor.place(GridPos::new(5, 6));
    session.player_mut().actor.set_facing(Direction::Up);
    session
}
