pub mod actor;
pub mod batch;
pub mod map;
pub mod tile;

use crate::model::DEFAULT_TILE_SIZE;
use crate::world::tile::WrapPolicy;

/// Knobs every map is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldOptions {
    pub tile_size: u32,
    /// Ticks per step for NPCs whose map entry gives no speed.
    pub default_npc_speed: u32,
    pub floor_wrap: WrapPolicy,
    pub decor_wrap: WrapPolicy,
}

impl Default for WorldOptions {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            default_npc_speed: 5,
            floor_wrap: WrapPolicy::Floor,
            decor_wrap: WrapPolicy::Decor,
        }
    }
}
