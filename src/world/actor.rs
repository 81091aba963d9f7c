//! Actors: the player and NPCs share one record, told apart by a kind tag.

use std::collections::{BTreeMap, VecDeque};

use crate::model::{Connection, Direction, GridPos, PixelPos};
use crate::world::map::Map;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorKind {
    Player,
    Npc,
}

/// Behaviour that differs between player and NPCs.
pub struct ActorHooks {
    /// Runs after a step into `cell` was authorized; returns the connection to follow, if any.
    pub on_step: fn(&Map, GridPos) -> Option<Connection>,
    /// Runs when someone facing `from` interacts with this actor.
    pub on_interact: fn(&mut Actor, Direction),
}

static PLAYER_HOOKS: ActorHooks = ActorHooks {
    on_step: player_on_step,
    on_interact: ignore_interaction,
};

static NPC_HOOKS: ActorHooks = ActorHooks {
    on_step: npc_on_step,
    on_interact: face_interactor,
};

fn player_on_step(map: &Map, cell: GridPos) -> Option<Connection> {
    map.connection_at(cell).cloned()
}

fn npc_on_step(_: &Map, _: GridPos) -> Option<Connection> {
    None
}

fn ignore_interaction(_: &mut Actor, _: Direction) {}

fn face_interactor(npc: &mut Actor, from: Direction) {
    npc.set_facing(from.flip());
}

impl ActorKind {
    pub fn hooks(self) -> &'static ActorHooks {
        match self {
            ActorKind::Player => &PLAYER_HOOKS,
            ActorKind::Npc => &NPC_HOOKS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    kind: ActorKind,
    spritesheet: String,
    script: Option<String>,
    position: GridPos,
    sprite: PixelPos,
    facing: Direction,
    movement_speed: u32,
    moving: bool,
    frame_counter: u32,
    step_origin: PixelPos,
    step_ticks: u32,
    tile_size: u32,
    move_queue: VecDeque<Direction>,
    statistics: BTreeMap<String, i32>,
}

impl Actor {
    pub fn new(
        kind: ActorKind,
        spritesheet: impl Into<String>,
        position: GridPos,
        movement_speed: u32,
        tile_size: u32,
    ) -> Self {
        let sprite = PixelPos::of_cell(position, tile_size);
        Self {
            kind,
            spritesheet: spritesheet.into(),
            script: None,
            position,
            sprite,
            facing: Direction::Down,
            movement_speed: movement_speed.max(1),
            moving: false,
            frame_counter: 0,
            step_origin: sprite,
            step_ticks: 0,
            tile_size,
            move_queue: VecDeque::new(),
            statistics: BTreeMap::new(),
        }
    }

    /// An empty `script` means the NPC has none.
    pub fn npc(
        spritesheet: impl Into<String>,
        position: GridPos,
        script: impl Into<String>,
        movement_speed: u32,
        tile_size: u32,
    ) -> Self {
        let mut npc = Self::new(ActorKind::Npc, spritesheet, position, movement_speed, tile_size);
        npc.script = Some(script.into()).filter(|s: &String| !s.is_empty());
        npc
    }

    pub fn kind(&self) -> ActorKind {
        self.kind
    }

    pub fn spritesheet(&self) -> &str {
        &self.spritesheet
    }

    pub fn script(&self) -> Option<&str> {
        self.script.as_deref()
    }

    pub fn position(&self) -> GridPos {
        self.position
    }

    pub fn sprite_position(&self) -> PixelPos {
        self.sprite
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    pub fn set_facing(&mut self, dir: Direction) {
        self.facing = dir;
    }

    pub fn movement_speed(&self) -> u32 {
        self.movement_speed
    }

    /// Ticks per grid step; zero is clamped to one.
    pub fn set_movement_speed(&mut self, ticks: u32) {
        self.movement_speed = ticks.max(1);
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn frame_counter(&self) -> u32 {
        self.frame_counter
    }

    pub fn statistics(&self) -> &BTreeMap<String, i32> {
        &self.statistics
    }

    pub fn statistics_mut(&mut self) -> &mut BTreeMap<String, i32> {
        &mut self.statistics
    }

    pub fn enqueue_move(&mut self, dir: Direction) {
        self.move_queue.push_back(dir);
    }

    pub fn wants_to_move(&self) -> bool {
        !self.move_queue.is_empty()
    }

    pub fn pop_movement(&mut self) -> Option<Direction> {
        self.move_queue.pop_front()
    }

    pub fn clear_moves(&mut self) {
        self.move_queue.clear();
    }

    pub fn pending_moves(&self) -> impl Iterator<Item = Direction> + '_ {
        self.move_queue.iter().copied()
    }

    /// Apply an already-authorized grid step and start the sub-tile slide.
    /// Only the resolver in `Map::move_actor` calls this.
    pub(super) fn step(&mut self, dir: Direction) {
        let Some(next) = self.position.step(dir) else {
            debug_assert!(false, "authorized step {dir} from {} underflows", self.position);
            return;
        };
        self.facing = dir;
        self.moving = true;
        self.step_origin = self.sprite;
        self.step_ticks = 0;
        self.position = next;
    }

    /// Teleport without sliding: spawning, savefile restore, map connections.
    pub fn place(&mut self, position: GridPos) {
        self.position = position;
        self.sprite = PixelPos::of_cell(position, self.tile_size);
        self.step_origin = self.sprite;
        self.moving = false;
        self.step_ticks = 0;
        self.move_queue.clear();
    }

    /// Advance one tick of the current slide.
    pub fn update(&mut self) {
        if !self.moving {
            return;
        }
        self.frame_counter = self.frame_counter.wrapping_add(1);
        self.step_ticks += 1;

        let target = PixelPos::of_cell(self.position, self.tile_size);
        if self.step_ticks >= self.movement_speed {
            self.sprite = target;
            self.moving = false;
        } else {
            let t = self.step_ticks as f32 / self.movement_speed as f32;
            self.sprite = self.step_origin.lerp(target, t);
        }
    }

    /// (row, column) in a 4×4 walk-cycle sheet.
    pub fn sprite_cell(&self) -> (u32, u32) {
        let column = if self.moving {
            (self.frame_counter / self.movement_speed) % 4
        } else {
            0
        };
        (self.facing.sprite_row(), column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_script_means_none() {
        assert_eq!(Actor::npc("n", GridPos::new(0, 0), "", 5, 32).script(), None);
        assert_eq!(
            Actor::npc("n", GridPos::new(0, 0), "greeter", 5, 32).script(),
            Some("greeter")
        );
    }

    #[test]
    fn test_queue_is_fifo() {
        let mut npc = Actor::npc("jotaro", GridPos::new(1, 1), "s", 5, 32);
        assert!(!npc.wants_to_move());
        npc.enqueue_move(Direction::Left);
        npc.enqueue_move(Direction::Up);
        assert!(npc.wants_to_move());
        assert_eq!(npc.pop_movement(), Some(Direction::Left));
        assert_eq!(npc.pop_movement(), Some(Direction::Up));
        assert_eq!(npc.pop_movement(), None);
    }

    #[test]
    fn test_step_slides_for_movement_speed_ticks() {
        let mut actor = Actor::new(ActorKind::Player, "p", GridPos::new(1, 1), 4, 32);
        actor.step(Direction::Right);
        assert!(actor.is_moving());
        assert_eq!(actor.position(), GridPos::new(2, 1));
        assert_eq!(actor.facing(), Direction::Right);
        assert_eq!(actor.sprite_position().x, 32.0);

        actor.update();
        assert_eq!(actor.sprite_position().x, 40.0);
        actor.update();
        actor.update();
        assert!(actor.is_moving());
        actor.update();
        assert!(!actor.is_moving());
        assert_eq!(actor.sprite_position(), PixelPos { x: 64.0, y: 32.0 });

        // idle actors do not animate
        let counter = actor.frame_counter();
        actor.update();
        assert_eq!(actor.frame_counter(), counter);
    }

    #[test]
    fn test_npc_interact_hook_faces_interactor() {
        let mut npc = Actor::npc("jotaro", GridPos::new(5, 5), "s", 5, 32);
        (npc.kind().hooks().on_interact)(&mut npc, Direction::Up);
        assert_eq!(npc.facing(), Direction::Down);
    }

    #[test]
    fn test_sprite_cell() {
        let mut actor = Actor::new(ActorKind::Player, "p", GridPos::new(0, 0), 2, 32);
        assert_eq!(actor.sprite_cell(), (0, 0));
        actor.step(Direction::Right);
        actor.update();
        actor.update();
        // finished the step; idle column is 0
        assert_eq!(actor.sprite_cell(), (2, 0));
    }

    #[test]
    fn test_place_clears_queue() {
        let mut actor = Actor::new(ActorKind::Player, "p", GridPos::new(0, 0), 2, 32);
        actor.enqueue_move(Direction::Down);
        actor.place(GridPos::new(3, 4));
        assert!(!actor.wants_to_move());
        assert_eq!(actor.sprite_position(), PixelPos { x: 96.0, y: 128.0 });
    }
}
