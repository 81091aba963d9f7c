use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::world::tile::{Animation, CollisionFlags};

// numeric constants that describe the world grid
pub const LAYER_COUNT: usize = 3;
pub const DEFAULT_TILE_SIZE: u32 = 32;

pub type TileId = u32;

/// Tile id that marks an empty cell in every layer.
pub const EMPTY_TILE: TileId = 0;

/// Story flags set and cleared by scripts (`setflag flag_X`).
pub type StoryFlags = BTreeSet<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Up↔Down, Left↔Right.
    pub fn flip(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn delta(self) -> (i64, i64) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Row of a 4×4 character sheet that holds the walk cycle for this facing.
    pub fn sprite_row(self) -> u32 {
        match self {
            Direction::Down => 0,
            Direction::Left => 1,
            Direction::Right => 2,
            Direction::Up => 3,
        }
    }

    pub fn parse(word: &str) -> Option<Self> {
        match word {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            _ => None,
        }
    }

    /// Dominant axis direction pointing from `from` to `to`; `None` when they coincide.
    pub fn towards(from: GridPos, to: GridPos) -> Option<Self> {
        let dx = i64::from(to.x) - i64::from(from.x);
        let dy = i64::from(to.y) - i64::from(from.y);
        if dx == 0 && dy == 0 {
            return None;
        }
        if dx.abs() >= dy.abs() {
            Some(if dx > 0 { Direction::Right } else { Direction::Left })
        } else {
            Some(if dy > 0 { Direction::Down } else { Direction::Up })
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(word)
    }
}

/// Integer cell coordinate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
}

impl GridPos {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Neighbouring cell, or `None` if the step would underflow/overflow `u32`.
    /// Map bounds are the resolver's business, not this one's.
    pub fn step(self, dir: Direction) -> Option<GridPos> {
        let (dx, dy) = dir.delta();
        let x = u32::try_from(i64::from(self.x) + dx).ok()?;
        let y = u32::try_from(i64::from(self.y) + dy).ok()?;
        Some(GridPos { x, y })
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Sub-tile draw position in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelPos {
    pub x: f32,
    pub y: f32,
}

impl PixelPos {
    pub fn of_cell(pos: GridPos, tile_size: u32) -> Self {
        Self {
            x: (pos.x * tile_size) as f32,
            y: (pos.y * tile_size) as f32,
        }
    }

    pub fn lerp(self, to: PixelPos, t: f32) -> PixelPos {
        PixelPos {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
        }
    }
}

/// Map dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapSize {
    pub x: u32,
    pub y: u32,
}

impl MapSize {
    pub fn contains(&self, pos: GridPos) -> bool {
        pos.x < self.x && pos.y < self.y
    }

    pub fn cells(&self) -> usize {
        self.x as usize * self.y as usize
    }
}

/// Portal from one cell of this map to a cell of another map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: GridPos,
    pub target_map: String,
    pub target: GridPos,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: String,
    pub count: u32,
}

/// ─────────────────────────────────────────────────────
/// Map description file, 1-to-1 with the JSON document
/// ─────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapFile {
    pub map_config: MapConfig,
    pub map_data: MapData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfig {
    pub size: MapSize,
    pub tileset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_music: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapData {
    /// `tile[layer][x][y]`; each layer is `size.x` columns of `size.y` ids.
    pub tile: Vec<Vec<Vec<TileId>>>,
    #[serde(default)]
    pub npcs: Vec<NpcEntry>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decor: Vec<DecorEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcEntry {
    pub spritesheet: String,
    pub position: GridPos,
    /// Empty when the NPC has no script.
    #[serde(default)]
    pub script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movement_speed: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecorEntry {
    pub position: GridPos,
    pub tile: TileId,
}

/// ─────────────────────────────────────────────────────
/// Tileset configuration file
/// ─────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilesetFile {
    pub name: String,
    /// Frames per row of the backing texture.
    #[serde(default = "default_columns")]
    pub columns: u32,
    pub tiles: Vec<TileEntry>,
}

fn default_columns() -> u32 {
    8
}

/// One tile type; its id is its 1-based position in `tiles`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileEntry {
    pub frame: u32,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub collision: CollisionFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<Animation>,
}

/// ─────────────────────────────────────────────────────
/// Savefile; every key is optional and falls back to defaults
/// ─────────────────────────────────────────────────────
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_stats: Option<BTreeMap<String, i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_info: Option<BTreeMap<String, i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_current_pos: Option<GridPos>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_map: Option<String>,
    #[serde(default)]
    pub flags: StoryFlags,
    #[serde(default)]
    pub inventory: Vec<ItemStack>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_is_involution() {
        for dir in Direction::ALL {
            assert_ne!(dir.flip(), dir);
            assert_eq!(dir.flip().flip(), dir);
        }
    }

    #[test]
    fn test_step_underflow() {
        assert_eq!(GridPos::new(0, 0).step(Direction::Left), None);
        assert_eq!(GridPos::new(0, 0).step(Direction::Up), None);
        assert_eq!(
            GridPos::new(0, 0).step(Direction::Right),
            Some(GridPos::new(1, 0))
        );
        assert_eq!(
            GridPos::new(3, 3).step(Direction::Down),
            Some(GridPos::new(3, 4))
        );
    }

    #[test]
    fn test_towards() {
        let from = GridPos::new(5, 5);
        assert_eq!(Direction::towards(from, GridPos::new(5, 6)), Some(Direction::Down));
        assert_eq!(Direction::towards(from, GridPos::new(2, 4)), Some(Direction::Left));
        assert_eq!(Direction::towards(from, from), None);
    }

    #[test]
    fn test_savefile_missing_keys_default() {
        let save: SaveFile = serde_json::from_str(r#"{"playerName":"Ada"}"#).unwrap();
        assert_eq!(save.player_name.as_deref(), Some("Ada"));
        assert!(save.player_stats.is_none());
        assert!(save.flags.is_empty());
    }
}
