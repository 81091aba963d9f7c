//! The map: three stacked tile layers, decor, NPCs, connections and the
//! movement resolver. `move_actor` is the only path that changes an actor's
//! cell.

use std::cell::Cell;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::content::{ContentKind, ContentSource};
use crate::error::{MapFormatError, MapLoadError, ResourceLoadError, TileError, WorldError};
use crate::model::{
    Connection, Direction, EMPTY_TILE, GridPos, LAYER_COUNT, MapConfig, MapData, MapFile,
    MapSize, TileId,
};
use crate::parser;
use crate::world::WorldOptions;
use crate::world::actor::{Actor, ActorKind};
use crate::world::batch::RenderBatches;
use crate::world::tile::{Tileset, TilesetCache};

/// Arena index of an NPC owned by a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NpcId(pub usize);

/// Who is acting in a collision query or move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorRef {
    Player,
    Npc(NpcId),
}

/// Overlay tile placed independently of the layers, with its own animation clock.
#[derive(Debug, Clone, PartialEq)]
pub struct Decor {
    pub position: GridPos,
    pub tile: TileId,
    counter: u32,
}

impl Decor {
    pub fn counter(&self) -> u32 {
        self.counter
    }
}

/// Frame to show this tick for one animated cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimatedFrame {
    pub layer: usize,
    pub cell: GridPos,
    pub frame: u32,
}

#[derive(Debug, Clone)]
pub struct Map {
    name: String,
    size: MapSize,
    /// Column-major: `layers[l][x * height + y]`.
    layers: [Vec<TileId>; LAYER_COUNT],
    tileset: Arc<Tileset>,
    decor: Vec<Decor>,
    npcs: Vec<Actor>,
    connections: Vec<Connection>,
    standing_on: Option<Connection>,
    background_music: Option<String>,
    options: WorldOptions,
    batches: RenderBatches,
    batches_dirty: bool,
    animated_cells: Vec<(usize, GridPos)>,
    floor_counter: u32,
    collision_queries: Cell<u64>,
}

impl Map {
    /// Load `identifier` through `content`. Nothing is installed anywhere on
    /// failure; the caller keeps whatever map it had.
    pub fn load(
        identifier: &str,
        content: &dyn ContentSource,
        tilesets: &mut TilesetCache,
        options: WorldOptions,
    ) -> Result<Map, MapLoadError> {
        let json = content.read(ContentKind::Map, identifier)?;
        let file = parser::load_map_file(identifier, &json)?;
        if file.map_config.tileset.trim().is_empty() {
            return Err(ResourceLoadError::EmptyTilesetName {
                map: identifier.to_string(),
            }
            .into());
        }
        let tileset = tilesets.get_or_load(&file.map_config.tileset, content)?;
        let map = Map::from_file(identifier, file, tileset, options)?;
        debug!(
            map = identifier,
            width = map.size.x,
            height = map.size.y,
            npcs = map.npcs.len(),
            "map loaded"
        );
        Ok(map)
    }

    /// Validate a parsed map document against its tileset and build the map.
    pub fn from_file(
        name: &str,
        file: MapFile,
        tileset: Arc<Tileset>,
        options: WorldOptions,
    ) -> Result<Map, MapFormatError> {
        let MapFile {
            map_config,
            map_data,
        } = file;
        let size = map_config.size;
        if size.x == 0 || size.y == 0 {
            return Err(MapFormatError::ZeroSize {
                map: name.to_string(),
                x: size.x,
                y: size.y,
            });
        }
        if map_data.tile.len() != LAYER_COUNT {
            return Err(MapFormatError::LayerCount {
                map: name.to_string(),
                found: map_data.tile.len(),
            });
        }

        let mut layers: [Vec<TileId>; LAYER_COUNT] = Default::default();
        for (layer, columns) in map_data.tile.iter().enumerate() {
            if columns.len() != size.x as usize {
                return Err(MapFormatError::LayerWidth {
                    map: name.to_string(),
                    layer,
                    found: columns.len(),
                    expected: size.x,
                });
            }
            let mut cells = Vec::with_capacity(size.cells());
            for (x, column) in columns.iter().enumerate() {
                if column.len() != size.y as usize {
                    return Err(MapFormatError::LayerHeight {
                        map: name.to_string(),
                        layer,
                        x,
                        found: column.len(),
                        expected: size.y,
                    });
                }
                for &id in column {
                    tileset
                        .check_cell(id)
                        .map_err(|source| MapFormatError::Tile {
                            map: name.to_string(),
                            source,
                        })?;
                }
                cells.extend_from_slice(column);
            }
            layers[layer] = cells;
        }

        let outside = |what: &'static str, pos: GridPos| MapFormatError::OutOfBounds {
            map: name.to_string(),
            what,
            x: pos.x,
            y: pos.y,
        };

        let mut decor = Vec::with_capacity(map_data.decor.len());
        for entry in map_data.decor {
            if !size.contains(entry.position) {
                return Err(outside("decor", entry.position));
            }
            tileset
                .get_tile(entry.tile)
                .map_err(|source| MapFormatError::Tile {
                    map: name.to_string(),
                    source,
                })?;
            decor.push(Decor {
                position: entry.position,
                tile: entry.tile,
                counter: 0,
            });
        }

        let mut npcs = Vec::with_capacity(map_data.npcs.len());
        for entry in map_data.npcs {
            if !size.contains(entry.position) {
                return Err(outside("npc", entry.position));
            }
            npcs.push(Actor::npc(
                entry.spritesheet,
                entry.position,
                entry.script,
                entry.movement_speed.unwrap_or(options.default_npc_speed),
                options.tile_size,
            ));
        }

        for connection in &map_data.connections {
            if !size.contains(connection.source) {
                return Err(outside("connection", connection.source));
            }
        }

        let mut map = Map {
            name: name.to_string(),
            size,
            layers,
            tileset,
            decor,
            npcs,
            connections: map_data.connections,
            standing_on: None,
            background_music: map_config.background_music,
            options,
            batches: RenderBatches::default(),
            batches_dirty: true,
            animated_cells: Vec::new(),
            floor_counter: 0,
            collision_queries: Cell::new(0),
        };
        map.build_render_state()
            .map_err(|source| MapFormatError::Tile {
                map: name.to_string(),
                source,
            })?;
        Ok(map)
    }

    /// Blank map for the editor: layer 0 filled with `default_tile`, the others empty.
    pub fn empty(
        name: &str,
        size: MapSize,
        default_tile: TileId,
        tileset: Arc<Tileset>,
        options: WorldOptions,
    ) -> Result<Map, MapFormatError> {
        let column = vec![default_tile; size.y as usize];
        let blank = vec![EMPTY_TILE; size.y as usize];
        let file = MapFile {
            map_config: MapConfig {
                size,
                tileset: tileset.name().to_string(),
                background_music: None,
            },
            map_data: MapData {
                tile: vec![
                    vec![column; size.x as usize],
                    vec![blank.clone(); size.x as usize],
                    vec![blank; size.x as usize],
                ],
                npcs: Vec::new(),
                connections: Vec::new(),
                decor: Vec::new(),
            },
        };
        Map::from_file(name, file, tileset, options)
    }

    // ─────────────────────────────────────────────────────
    // accessors
    // ─────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> MapSize {
        self.size
    }

    pub fn tileset(&self) -> &Arc<Tileset> {
        &self.tileset
    }

    pub fn options(&self) -> WorldOptions {
        self.options
    }

    pub fn background_music(&self) -> Option<&str> {
        self.background_music.as_deref()
    }

    pub fn set_background_music(&mut self, music: Option<String>) {
        self.background_music = music;
    }

    pub fn tile(&self, layer: usize, pos: GridPos) -> Option<TileId> {
        if !self.size.contains(pos) {
            return None;
        }
        self.layers.get(layer).map(|cells| cells[self.index(pos)])
    }

    pub fn layer_cells(&self, layer: usize) -> Option<&[TileId]> {
        self.layers.get(layer).map(Vec::as_slice)
    }

    pub fn npcs(&self) -> &[Actor] {
        &self.npcs
    }

    pub fn npc(&self, id: NpcId) -> Option<&Actor> {
        self.npcs.get(id.0)
    }

    pub fn npc_mut(&mut self, id: NpcId) -> Option<&mut Actor> {
        self.npcs.get_mut(id.0)
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection_at(&self, pos: GridPos) -> Option<&Connection> {
        self.connections.iter().find(|c| c.source == pos)
    }

    pub fn decor(&self) -> &[Decor] {
        &self.decor
    }

    /// Connection the player is currently standing on, if any.
    pub fn standing_on(&self) -> Option<&Connection> {
        self.standing_on.as_ref()
    }

    pub fn take_connection(&mut self) -> Option<Connection> {
        self.standing_on.take()
    }

    pub fn batches(&self) -> &RenderBatches {
        &self.batches
    }

    pub fn batches_dirty(&self) -> bool {
        self.batches_dirty
    }

    /// Number of collision queries answered so far.
    pub fn collision_queries(&self) -> u64 {
        self.collision_queries.get()
    }

    // ─────────────────────────────────────────────────────
    // editing
    // ─────────────────────────────────────────────────────

    pub fn set_tile(&mut self, layer: usize, pos: GridPos, id: TileId) -> Result<(), WorldError> {
        self.ensure_in_bounds(pos)?;
        if layer >= LAYER_COUNT {
            return Err(WorldError::UnknownLayer(layer));
        }
        self.tileset.check_cell(id)?;
        let idx = self.index(pos);
        self.layers[layer][idx] = id;
        self.batches_dirty = true;
        Ok(())
    }

    pub fn add_npc(&mut self, npc: Actor) -> Result<NpcId, WorldError> {
        if npc.kind() != ActorKind::Npc {
            return Err(WorldError::NotAnNpc);
        }
        self.ensure_in_bounds(npc.position())?;
        self.npcs.push(npc);
        Ok(NpcId(self.npcs.len() - 1))
    }

    pub fn add_connection(&mut self, connection: Connection) -> Result<(), WorldError> {
        self.ensure_in_bounds(connection.source)?;
        self.connections.push(connection);
        Ok(())
    }

    pub fn add_decor(&mut self, position: GridPos, tile: TileId) -> Result<(), WorldError> {
        self.ensure_in_bounds(position)?;
        self.tileset.get_tile(tile)?;
        self.decor.push(Decor {
            position,
            tile,
            counter: 0,
        });
        Ok(())
    }

    // ─────────────────────────────────────────────────────
    // render state
    // ─────────────────────────────────────────────────────

    pub fn rebuild_render_batches(&mut self) -> Result<(), WorldError> {
        self.build_render_state()?;
        Ok(())
    }

    fn build_render_state(&mut self) -> Result<(), TileError> {
        self.batches = RenderBatches::build(
            &self.layers,
            self.size,
            &self.tileset,
            self.options.tile_size,
        )?;

        self.animated_cells.clear();
        for (layer, cells) in self.layers.iter().enumerate() {
            for x in 0..self.size.x {
                for y in 0..self.size.y {
                    let id = cells[x as usize * self.size.y as usize + y as usize];
                    if id != EMPTY_TILE && self.tileset.get_tile(id)?.is_animated() {
                        self.animated_cells.push((layer, GridPos::new(x, y)));
                    }
                }
            }
        }
        self.batches_dirty = false;
        Ok(())
    }

    /// Redo just one layer batch; the priority batches stay dirty until the
    /// next full rebuild.
    pub fn rebuild_layer(&mut self, layer: usize) -> Result<(), WorldError> {
        let cells = self.layers.get(layer).ok_or(WorldError::UnknownLayer(layer))?;
        self.batches.rebuild_layer(
            layer,
            cells,
            self.size,
            &self.tileset,
            self.options.tile_size,
        )?;
        Ok(())
    }

    pub fn animated_frames(&self) -> Vec<AnimatedFrame> {
        self.animated_cells
            .iter()
            .filter_map(|&(layer, cell)| {
                let tile = self.tileset.get_tile(self.layers[layer][self.index(cell)]).ok()?;
                Some(AnimatedFrame {
                    layer,
                    cell,
                    frame: tile.current_frame(self.floor_counter, self.options.floor_wrap),
                })
            })
            .collect()
    }

    pub fn decor_frames(&self) -> Vec<(GridPos, u32)> {
        self.decor
            .iter()
            .filter_map(|d| {
                let tile = self.tileset.get_tile(d.tile).ok()?;
                Some((d.position, tile.current_frame(d.counter, self.options.decor_wrap)))
            })
            .collect()
    }

    /// Actors in paint order: ascending sprite y, the player slotted in
    /// before the first NPC strictly below it.
    pub fn draw_order(&self, player: &Actor) -> Vec<ActorRef> {
        let mut ids: Vec<NpcId> = (0..self.npcs.len()).map(NpcId).collect();
        ids.sort_by(|a, b| {
            let ay = self.npcs[a.0].sprite_position().y;
            let by = self.npcs[b.0].sprite_position().y;
            ay.total_cmp(&by)
        });

        let player_y = player.sprite_position().y;
        let slot = ids
            .iter()
            .position(|id| self.npcs[id.0].sprite_position().y > player_y)
            .unwrap_or(ids.len());

        let mut order: Vec<ActorRef> = ids.into_iter().map(ActorRef::Npc).collect();
        order.insert(slot, ActorRef::Player);
        order
    }

    // ─────────────────────────────────────────────────────
    // movement resolver
    // ─────────────────────────────────────────────────────

    /// Whether crossing the `dir` edge of `pos` is blocked for `acting`:
    /// a layer or decor tile blocks that edge, or some other actor stands on `pos`.
    pub fn check_collision(
        &self,
        pos: GridPos,
        dir: Direction,
        acting: ActorRef,
        player: &Actor,
    ) -> Result<bool, WorldError> {
        self.ensure_in_bounds(pos)?;
        self.collision_queries.set(self.collision_queries.get() + 1);

        let idx = self.index(pos);
        for cells in &self.layers {
            let id = cells[idx];
            if id != EMPTY_TILE && self.tileset.get_tile(id)?.collision_check(dir) {
                return Ok(true);
            }
        }
        for decor in self.decor.iter().filter(|d| d.position == pos) {
            if self.tileset.get_tile(decor.tile)?.collision_check(dir) {
                return Ok(true);
            }
        }

        let npc_in_way = self
            .npcs
            .iter()
            .enumerate()
            .any(|(i, npc)| acting != ActorRef::Npc(NpcId(i)) && npc.position() == pos);
        if npc_in_way {
            return Ok(true);
        }

        Ok(acting != ActorRef::Player && player.position() == pos)
    }

    /// Try one grid step. `Ok(true)` if the actor moved; `Ok(false)` if the
    /// step left the grid or was blocked, in which case the actor only turns.
    pub fn move_actor(
        &mut self,
        who: ActorRef,
        dir: Direction,
        player: &mut Actor,
    ) -> Result<bool, WorldError> {
        let from = self.actor(who, player)?.position();
        self.ensure_in_bounds(from)?;

        let Some(dest) = from.step(dir).filter(|p| self.size.contains(*p)) else {
            self.actor_mut(who, player)?.set_facing(dir);
            trace!(?who, %from, %dir, "step leaves the map");
            return Ok(false);
        };

        let blocked = self.check_collision(from, dir, who, player)?
            || self.check_collision(dest, dir.flip(), who, player)?;
        if blocked {
            self.actor_mut(who, player)?.set_facing(dir);
            trace!(?who, %from, %dest, "step blocked");
            return Ok(false);
        }

        let kind = self.actor(who, player)?.kind();
        let connection = (kind.hooks().on_step)(self, dest);
        if who == ActorRef::Player {
            self.standing_on = connection;
        }
        self.actor_mut(who, player)?.step(dir);
        Ok(true)
    }

    pub fn find_npc(&self, pos: GridPos) -> Option<NpcId> {
        self.npcs
            .iter()
            .position(|npc| npc.position() == pos)
            .map(NpcId)
    }

    /// One tick for every NPC in insertion order: start the next queued move
    /// if none is in flight, then advance its slide. Also ticks tile animation.
    pub fn update_actors(&mut self, player: &mut Actor) -> Result<(), WorldError> {
        for index in 0..self.npcs.len() {
            let npc = &mut self.npcs[index];
            if !npc.is_moving() {
                if let Some(dir) = npc.pop_movement() {
                    self.move_actor(ActorRef::Npc(NpcId(index)), dir, player)?;
                }
            }
            self.npcs[index].update();
        }
        self.tick_animations();
        Ok(())
    }

    pub fn tick_animations(&mut self) {
        self.floor_counter = self.floor_counter.wrapping_add(1);
        for decor in &mut self.decor {
            decor.counter = decor.counter.wrapping_add(1);
        }
    }

    fn actor<'a>(&'a self, who: ActorRef, player: &'a Actor) -> Result<&'a Actor, WorldError> {
        match who {
            ActorRef::Player => Ok(player),
            ActorRef::Npc(id) => self.npcs.get(id.0).ok_or(WorldError::UnknownNpc(id.0)),
        }
    }

    fn actor_mut<'a>(
        &'a mut self,
        who: ActorRef,
        player: &'a mut Actor,
    ) -> Result<&'a mut Actor, WorldError> {
        match who {
            ActorRef::Player => Ok(player),
            ActorRef::Npc(id) => self
                .npcs
                .get_mut(id.0)
                .ok_or(WorldError::UnknownNpc(id.0)),
        }
    }

    fn ensure_in_bounds(&self, pos: GridPos) -> Result<(), WorldError> {
        if self.size.contains(pos) {
            Ok(())
        } else {
            Err(WorldError::CollisionInvariantViolation {
                x: pos.x,
                y: pos.y,
                width: self.size.x,
                height: self.size.y,
            })
        }
    }

    fn index(&self, pos: GridPos) -> usize {
        pos.x as usize * self.size.y as usize + pos.y as usize
    }
}
