//! Tile types, tilesets and the frame animation rule.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::content::{ContentKind, ContentSource};
use crate::error::{MapLoadError, TileError};
use crate::model::{Direction, EMPTY_TILE, TileId, TilesetFile};
use crate::parser;

/// Per-edge blocking. `up == true` means nothing crosses the top edge of the
/// tile, neither leaving upward nor entering from above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CollisionFlags {
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
}

impl CollisionFlags {
    pub const OPEN: CollisionFlags = CollisionFlags {
        up: false,
        down: false,
        left: false,
        right: false,
    };

    pub const SOLID: CollisionFlags = CollisionFlags {
        up: true,
        down: true,
        left: true,
        right: true,
    };

    pub fn blocks(&self, dir: Direction) -> bool {
        match dir {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }
}

/// How a frame counter that ran past the last frame is folded back.
///
/// Both overflow once `frame > start + count`. Grid tiles and decor overlays
/// fold back differently and content is tuned to that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapPolicy {
    /// Wraps to `start + frame % count`.
    #[default]
    Decor,
    /// Wraps to `frame % count`, which is not re-based on `start`.
    Floor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animation {
    pub start: u32,
    pub count: u32,
    /// Ticks per frame.
    pub speed: u32,
    #[serde(default)]
    pub repeat: bool,
}

impl Animation {
    /// Frame shown after `counter` ticks. Pure; a non-repeating animation that
    /// ran out snaps back to `start`.
    pub fn frame_at(&self, counter: u32, policy: WrapPolicy) -> u32 {
        let speed = self.speed.max(1);
        let count = self.count.max(1);
        let offset = counter / speed;
        let frame = self.start.saturating_add(offset);
        let end = self.start.saturating_add(count);

        if frame <= end {
            return frame;
        }
        if !self.repeat {
            return self.start;
        }
        match policy {
            WrapPolicy::Decor => self.start + frame % count,
            WrapPolicy::Floor => frame % count,
        }
    }
}

/// Immutable description of one tile type, shared by every cell using it.
#[derive(Debug, Clone, PartialEq)]
pub struct TileDefinition {
    pub id: TileId,
    /// Texture frame when not animated.
    pub frame: u32,
    pub priority: i32,
    pub collision: CollisionFlags,
    pub animation: Option<Animation>,
}

impl TileDefinition {
    /// Whether crossing this tile's edge in `dir` is blocked.
    pub fn collision_check(&self, dir: Direction) -> bool {
        self.collision.blocks(dir)
    }

    pub fn is_animated(&self) -> bool {
        self.animation.is_some()
    }

    pub fn current_frame(&self, counter: u32, policy: WrapPolicy) -> u32 {
        match &self.animation {
            Some(anim) => anim.frame_at(counter, policy),
            None => self.frame,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tileset {
    name: String,
    columns: u32,
    tiles: Vec<TileDefinition>,
}

impl Tileset {
    pub fn from_file(file: TilesetFile) -> Result<Self, TileError> {
        let mut tiles = Vec::with_capacity(file.tiles.len());
        for (idx, entry) in file.tiles.into_iter().enumerate() {
            let id = idx as TileId + 1;
            if let Some(anim) = &entry.animation {
                if anim.count == 0 || anim.speed == 0 {
                    return Err(TileError::InvalidAnimation {
                        id,
                        tileset: file.name,
                    });
                }
            }
            tiles.push(TileDefinition {
                id,
                frame: entry.frame,
                priority: entry.priority,
                collision: entry.collision,
                animation: entry.animation,
            });
        }

        Ok(Self {
            name: file.name,
            columns: file.columns.max(1),
            tiles,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn get_tile(&self, id: TileId) -> Result<&TileDefinition, TileError> {
        if id == EMPTY_TILE {
            return Err(self.invalid(id));
        }
        self.tiles
            .get(id as usize - 1)
            .ok_or_else(|| self.invalid(id))
    }

    /// `Ok` for the empty id and any defined id.
    pub fn check_cell(&self, id: TileId) -> Result<(), TileError> {
        if id == EMPTY_TILE {
            return Ok(());
        }
        self.get_tile(id).map(|_| ())
    }

    /// Pixel origin of `frame` inside the tileset texture.
    pub fn texture_origin(&self, frame: u32, tile_size: u32) -> (f32, f32) {
        let col = frame % self.columns;
        let row = frame / self.columns;
        ((col * tile_size) as f32, (row * tile_size) as f32)
    }

    fn invalid(&self, id: TileId) -> TileError {
        TileError::InvalidTileId {
            id,
            tileset: self.name.clone(),
            max: self.tiles.len() as u32,
        }
    }
}

/// Tilesets shared by every map that names them.
#[derive(Debug, Default)]
pub struct TilesetCache {
    sets: HashMap<String, Arc<Tileset>>,
}

impl TilesetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tileset: Tileset) -> Arc<Tileset> {
        let tileset = Arc::new(tileset);
        self.sets
            .insert(tileset.name().to_string(), Arc::clone(&tileset));
        tileset
    }

    pub fn get_or_load(
        &mut self,
        name: &str,
        content: &dyn ContentSource,
    ) -> Result<Arc<Tileset>, MapLoadError> {
        if let Some(set) = self.sets.get(name) {
            return Ok(Arc::clone(set));
        }
        let json = content.read(ContentKind::Tileset, name)?;
        let tileset = parser::load_tileset(name, &json)?;
        debug!(tileset = name, tiles = tileset.len(), "tileset loaded");
        Ok(self.insert(tileset))
    }
}
