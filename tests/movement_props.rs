use std::sync::Arc;

use proptest::prelude::*;
use rpgworld_rust::model::{Direction, GridPos, MapSize, TileEntry, TilesetFile};
use rpgworld_rust::world::WorldOptions;
use rpgworld_rust::world::actor::{Actor, ActorKind};
use rpgworld_rust::world::map::{ActorRef, Map};
use rpgworld_rust::world::tile::{Animation, CollisionFlags, Tileset, WrapPolicy};
use rpgworld_rust::writer;

/// 1 = floor, 2 = wall, 3 = ledge, 4 = animated water
fn tileset() -> Arc<Tileset> {
    let entry = |frame, priority, collision| TileEntry {
        frame,
        priority,
        collision,
        animation: None,
    };
    let mut water = entry(6, 0, CollisionFlags::OPEN);
    water.animation = Some(Animation {
        start: 6,
        count: 2,
        speed: 3,
        repeat: true,
    });
    Arc::new(
        Tileset::from_file(TilesetFile {
            name: "props".into(),
            columns: 8,
            tiles: vec![
                entry(0, 0, CollisionFlags::OPEN),
                entry(1, 1, CollisionFlags::SOLID),
                entry(
                    2,
                    0,
                    CollisionFlags {
                        up: true,
                        ..CollisionFlags::OPEN
                    },
                ),
                water,
            ],
        })
        .unwrap(),
    )
}

fn direction() -> impl Strategy<Value = Direction> {
    prop::sample::select(Direction::ALL.to_vec())
}

fn edit() -> impl Strategy<Value = (usize, u32, u32, u32)> {
    (0usize..3, 0u32..8, 0u32..6, 0u32..=4)
}

fn map_with(edits: &[(usize, u32, u32, u32)]) -> Map {
    let mut map = Map::empty(
        "props",
        MapSize { x: 8, y: 6 },
        1,
        tileset(),
        WorldOptions::default(),
    )
    .unwrap();
    for &(layer, x, y, id) in edits {
        // layer 0 keeps a floor under every wall so the player's start stays valid
        let id = if layer == 0 && id == 0 { 1 } else { id };
        map.set_tile(layer, GridPos::new(x, y), id).unwrap();
    }
    map
}

fn settle(map: &mut Map, player: &mut Actor) {
    while player.is_moving() {
        player.update();
        map.update_actors(player).unwrap();
    }
}

proptest! {
    #[test]
    fn batches_are_a_function_of_the_grid(edits in prop::collection::vec(edit(), 0..40)) {
        let mut map = map_with(&edits);
        map.rebuild_render_batches().unwrap();
        let first = map.batches().clone();
        map.rebuild_render_batches().unwrap();
        prop_assert_eq!(&first, map.batches());

        let reloaded = Map::from_file(
            "props",
            writer::map::to_map_file(&map),
            Arc::clone(map.tileset()),
            WorldOptions::default(),
        )
        .unwrap();
        prop_assert_eq!(&first, reloaded.batches());
    }

    #[test]
    fn player_never_leaves_the_grid(
        edits in prop::collection::vec(edit(), 0..30),
        path in prop::collection::vec(direction(), 0..60),
    ) {
        let mut map = map_with(&edits);
        let mut player = Actor::new(ActorKind::Player, "p", GridPos::new(0, 0), 2, 32);
        for dir in path {
            let before = player.position();
            let moved = map.move_actor(ActorRef::Player, dir, &mut player).unwrap();
            prop_assert!(map.size().contains(player.position()));
            prop_assert_eq!(player.facing(), dir);
            if moved {
                prop_assert_eq!(before.step(dir), Some(player.position()));
            } else {
                prop_assert_eq!(before, player.position());
            }
            settle(&mut map, &mut player);
        }
    }

    #[test]
    fn stepping_off_the_edge_asks_no_collision_question(dir in direction(), x in 0u32..8, y in 0u32..6) {
        let mut map = map_with(&[]);
        let edge = match dir {
            Direction::Up => GridPos::new(x, 0),
            Direction::Down => GridPos::new(x, 5),
            Direction::Left => GridPos::new(0, y),
            Direction::Right => GridPos::new(7, y),
        };
        let mut player = Actor::new(ActorKind::Player, "p", edge, 2, 32);
        let queries = map.collision_queries();
        prop_assert!(!map.move_actor(ActorRef::Player, dir, &mut player).unwrap());
        prop_assert_eq!(map.collision_queries(), queries);
        prop_assert_eq!(player.position(), edge);
    }

    #[test]
    fn flip_is_an_involution(dir in direction()) {
        prop_assert_ne!(dir.flip(), dir);
        prop_assert_eq!(dir.flip().flip(), dir);
    }

    #[test]
    fn animation_frames_are_deterministic(
        start in 0u32..16,
        count in 1u32..8,
        speed in 1u32..6,
        repeat in any::<bool>(),
        counter in 0u32..10_000,
    ) {
        let animation = Animation { start, count, speed, repeat };
        for policy in [WrapPolicy::Decor, WrapPolicy::Floor] {
            prop_assert_eq!(animation.frame_at(counter, policy), animation.frame_at(counter, policy));
        }
        let decor = animation.frame_at(counter, WrapPolicy::Decor);
        prop_assert!(decor >= start && decor <= start + count);
    }

    #[test]
    fn facing_actors_cannot_swap(x in 0u32..7, y in 0u32..6) {
        let mut map = map_with(&[]);
        let mut player = Actor::new(ActorKind::Player, "p", GridPos::new(x, y), 2, 32);
        let npc = map.add_npc(Actor::npc("n", GridPos::new(x + 1, y), "s", 2, 32)).unwrap();

        prop_assert!(!map.move_actor(ActorRef::Player, Direction::Right, &mut player).unwrap());
        prop_assert!(!map.move_actor(ActorRef::Npc(npc), Direction::Left, &mut player).unwrap());
        prop_assert_eq!(player.position(), GridPos::new(x, y));
        prop_assert_eq!(map.npc(npc).unwrap().position(), GridPos::new(x + 1, y));
    }
}
