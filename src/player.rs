//! The player: an actor plus name, progression, inventory.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::info;

use crate::model::{GridPos, ItemStack, SaveFile};
use crate::world::actor::{Actor, ActorKind};

pub const MAX_LEVEL: i32 = 30;
pub const DEFAULT_PLAYER_NAME: &str = "Player";
pub const PLAYER_SPRITESHEET: &str = "playersprite";

/// Statistics of a fresh character.
pub fn default_statistics() -> BTreeMap<String, i32> {
    [
        ("HP", 85),
        ("MaxHP", 100),
        ("MP", 12),
        ("MaxMP", 35),
        ("Attack", 3),
        ("Fire", 0),
        ("Water", 0),
        ("Lightning", 0),
        ("AttackSpeed", 2),
        ("Armor", 1),
        ("Resistance", 0),
        ("Critical", 0),
        ("Dodge", 0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Level, experience and gold (`playerInfo` in the savefile).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerInfo {
    pub lvl: i32,
    pub current: i32,
    pub next: i32,
    pub gold: i32,
}

impl Default for PlayerInfo {
    fn default() -> Self {
        Self {
            lvl: 1,
            current: 0,
            next: 11,
            gold: 25,
        }
    }
}

impl PlayerInfo {
    /// Missing keys keep their defaults.
    pub fn from_map(map: &BTreeMap<String, i32>) -> Self {
        let base = Self::default();
        let get = |key: &str, fallback| map.get(key).copied().unwrap_or(fallback);
        Self {
            lvl: get("lvl", base.lvl),
            current: get("current", base.current),
            next: get("next", base.next),
            gold: get("gold", base.gold),
        }
    }

    pub fn to_map(self) -> BTreeMap<String, i32> {
        [
            ("lvl", self.lvl),
            ("current", self.current),
            ("next", self.next),
            ("gold", self.gold),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}

/// Item ids the world knows about. Values are opaque here.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: BTreeMap<String, Value>,
}

impl ItemCatalog {
    pub fn new(items: BTreeMap<String, Value>) -> Self {
        Self { items }
    }

    pub fn contains(&self, item: &str) -> bool {
        self.items.contains_key(item)
    }

    pub fn get(&self, item: &str) -> Option<&Value> {
        self.items.get(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Stacks in first-acquired order; one stack per item id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    stacks: Vec<ItemStack>,
}

impl Inventory {
    pub fn from_stacks(stacks: Vec<ItemStack>) -> Self {
        let mut inventory = Self::default();
        for stack in stacks {
            inventory.add(&stack.item, stack.count);
        }
        inventory
    }

    pub fn add(&mut self, item: &str, count: u32) {
        if count == 0 {
            return;
        }
        match self.stacks.iter_mut().find(|s| s.item == item) {
            Some(stack) => stack.count = stack.count.saturating_add(count),
            None => self.stacks.push(ItemStack {
                item: item.to_string(),
                count,
            }),
        }
    }

    pub fn count(&self, item: &str) -> u32 {
        self.stacks
            .iter()
            .find(|s| s.item == item)
            .map_or(0, |s| s.count)
    }

    pub fn stacks(&self) -> &[ItemStack] {
        &self.stacks
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub actor: Actor,
    name: String,
    info: PlayerInfo,
    inventory: Inventory,
}

impl Player {
    pub fn new(name: impl Into<String>, position: GridPos, speed: u32, tile_size: u32) -> Self {
        let mut actor = Actor::new(ActorKind::Player, PLAYER_SPRITESHEET, position, speed, tile_size);
        *actor.statistics_mut() = default_statistics();
        Self {
            actor,
            name: name.into(),
            info: PlayerInfo::default(),
            inventory: Inventory::default(),
        }
    }

    /// Restore from a savefile. Statistics and info are only taken when both
    /// are present; otherwise the default block applies.
    pub fn from_save(save: &SaveFile, fallback: GridPos, speed: u32, tile_size: u32) -> Self {
        let name = save
            .player_name
            .clone()
            .unwrap_or_else(|| DEFAULT_PLAYER_NAME.to_string());
        let position = save.player_current_pos.unwrap_or(fallback);
        let mut player = Self::new(name, position, speed, tile_size);

        if let (Some(stats), Some(info)) = (&save.player_stats, &save.player_info) {
            *player.actor.statistics_mut() = stats.clone();
            player.info = PlayerInfo::from_map(info);
        }
        player.inventory = Inventory::from_stacks(save.inventory.clone());
        player
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn info(&self) -> PlayerInfo {
        self.info
    }

    pub fn info_mut(&mut self) -> &mut PlayerInfo {
        &mut self.info
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn inventory_mut(&mut self) -> &mut Inventory {
        &mut self.inventory
    }

    /// One level up, capped at `MAX_LEVEL`. Returns whether anything changed.
    pub fn level_up(&mut self) -> bool {
        if self.info.lvl >= MAX_LEVEL {
            return false;
        }
        self.info.lvl += 1;
        self.info.current = 0;
        self.info.next += (f64::from(self.info.next) * (5.2 / f64::from(self.info.lvl))) as i32;
        info!(lvl = self.info.lvl, next = self.info.next, "level up");
        true
    }

    /// Fill the player half of a savefile; map and flags are the session's.
    pub fn write_save(&self, save: &mut SaveFile) {
        save.player_name = Some(self.name.clone());
        save.player_stats = Some(self.actor.statistics().clone());
        save.player_info = Some(self.info.to_map());
        save.player_current_pos = Some(self.actor.position());
        save.inventory = self.inventory.stacks().to_vec();
    }
}
