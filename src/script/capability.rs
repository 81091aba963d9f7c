//! What a running script may touch, and the engines that serve its suspensions.
//!
//! A script never sees globals. For each run the session builds a
//! `CallContext` holding exactly the triggering NPC, the player, the item
//! catalog, the story flags and a sound sink.

use std::fmt;

use tracing::{debug, info};

use super::vm::{SessionKind, SessionRequest};
use crate::model::{GridPos, StoryFlags};
use crate::player::{ItemCatalog, Player};
use crate::world::actor::Actor;

/// Fixed capability table a script runs against.
pub trait ScriptHost {
    /// Log a line prefixed by the script's own name.
    fn log(&mut self, script: &str, text: &str);

    /// The NPC whose interaction started the script.
    fn npc(&mut self) -> &mut Actor;

    fn player_position(&self) -> GridPos;

    /// Silently ignored for a zero count, an empty id or an id missing from
    /// the item catalog.
    fn give_item(&mut self, item: &str, count: u32);

    fn play_sound(&mut self, name: &str);

    fn play_music(&mut self, name: &str);

    fn flag(&self, flag: &str) -> bool;

    fn set_flag(&mut self, flag: &str, on: bool);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundEvent {
    Sound(String),
    Music(String),
}

/// Fire-and-forget playback.
pub trait SoundSink {
    fn play(&mut self, event: SoundEvent);
}

/// Sink that just remembers what was asked for, for a frontend or a test to drain.
#[derive(Debug, Default)]
pub struct SoundLog {
    events: Vec<SoundEvent>,
}

impl SoundLog {
    pub fn events(&self) -> &[SoundEvent] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<SoundEvent> {
        std::mem::take(&mut self.events)
    }
}

impl SoundSink for SoundLog {
    fn play(&mut self, event: SoundEvent) {
        self.events.push(event);
    }
}

/// Per-run capability bundle.
pub struct CallContext<'a> {
    pub npc: &'a mut Actor,
    pub player: &'a mut Player,
    pub catalog: &'a ItemCatalog,
    pub flags: &'a mut StoryFlags,
    pub sound: &'a mut dyn SoundSink,
    /// Lines written by `log`, in order.
    pub log: &'a mut Vec<String>,
}

impl ScriptHost for CallContext<'_> {
    fn log(&mut self, script: &str, text: &str) {
        let line = format!("{script}/ {text}");
        info!("{line}");
        self.log.push(line);
    }

    fn npc(&mut self) -> &mut Actor {
        &mut *self.npc
    }

    fn player_position(&self) -> GridPos {
        self.player.actor.position()
    }

    fn give_item(&mut self, item: &str, count: u32) {
        if count == 0 || item.is_empty() || !self.catalog.contains(item) {
            debug!(item, count, "give ignored");
            return;
        }
        self.player.inventory_mut().add(item, count);
    }

    fn play_sound(&mut self, name: &str) {
        self.sound.play(SoundEvent::Sound(name.to_string()));
    }

    fn play_music(&mut self, name: &str) {
        self.sound.play(SoundEvent::Music(name.to_string()));
    }

    fn flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    fn set_flag(&mut self, flag: &str, on: bool) {
        if on {
            self.flags.insert(flag.to_string());
        } else {
            self.flags.remove(flag);
        }
    }
}

/// Opaque handle binding a suspended context to the session it waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContinuationToken(pub u64);

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A dialog, shop or battle subsystem as seen by the scheduler.
pub trait SessionEngine {
    /// Show the session; report back through the scheduler with `token`.
    fn open(&mut self, token: ContinuationToken, request: SessionRequest);

    /// The scheduler accepted this session's result.
    fn finish(&mut self, token: ContinuationToken);

    /// The owning script is gone; tear the session down without a result.
    fn force_close(&mut self, token: ContinuationToken);
}

/// Route a request to the engine for its kind.
pub trait EngineSet {
    fn engine(&mut self, kind: SessionKind) -> &mut dyn SessionEngine;
}

/// Headless engine: keeps open sessions in a queue for someone to answer.
#[derive(Debug, Default)]
pub struct SessionInbox {
    open: Vec<(ContinuationToken, SessionRequest)>,
    forced: Vec<ContinuationToken>,
}

impl SessionInbox {
    pub fn open_sessions(&self) -> &[(ContinuationToken, SessionRequest)] {
        &self.open
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn get(&self, token: ContinuationToken) -> Option<&SessionRequest> {
        self.open
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, request)| request)
    }

    /// Sessions that were torn down by the scheduler rather than answered.
    pub fn force_closed(&self) -> &[ContinuationToken] {
        &self.forced
    }
}

impl SessionEngine for SessionInbox {
    fn open(&mut self, token: ContinuationToken, request: SessionRequest) {
        self.open.push((token, request));
    }

    fn finish(&mut self, token: ContinuationToken) {
        self.open.retain(|(t, _)| *t != token);
    }

    fn force_close(&mut self, token: ContinuationToken) {
        let before = self.open.len();
        self.open.retain(|(t, _)| *t != token);
        if self.open.len() != before {
            self.forced.push(token);
        }
    }
}

/// One inbox per session kind.
#[derive(Debug, Default)]
pub struct Inboxes {
    pub dialog: SessionInbox,
    pub shop: SessionInbox,
    pub battle: SessionInbox,
}

impl Inboxes {
    pub fn total_open(&self) -> usize {
        self.dialog.len() + self.shop.len() + self.battle.len()
    }
}

impl EngineSet for Inboxes {
    fn engine(&mut self, kind: SessionKind) -> &mut dyn SessionEngine {
        match kind {
            SessionKind::Dialog => &mut self.dialog,
            SessionKind::Shop => &mut self.shop,
            SessionKind::Battle => &mut self.battle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::vm::DialogRequest;
    use std::collections::BTreeMap;

    fn catalog() -> ItemCatalog {
        let mut items = BTreeMap::new();
        items.insert("potion".to_string(), serde_json::json!({ "price": 10 }));
        ItemCatalog::new(items)
    }

    #[test]
    fn test_give_item_noops() {
        let mut npc = Actor::npc("n", GridPos::new(1, 1), "s", 5, 32);
        let mut player = Player::new("Player", GridPos::new(1, 2), 7, 32);
        let catalog = catalog();
        let mut flags = StoryFlags::new();
        let mut sound = SoundLog::default();
        let mut log = Vec::new();
        let mut ctx = CallContext {
            npc: &mut npc,
            player: &mut player,
            catalog: &catalog,
            flags: &mut flags,
            sound: &mut sound,
            log: &mut log,
        };

        ctx.give_item("potion", 0);
        ctx.give_item("", 3);
        ctx.give_item("excalibur", 1);
        assert_eq!(ctx.player.inventory().count("potion"), 0);
        assert!(ctx.player.inventory().is_empty());

        ctx.give_item("potion", 2);
        ctx.give_item("potion", 1);
        assert_eq!(ctx.player.inventory().count("potion"), 3);
    }

    #[test]
    fn test_log_and_sound() {
        let mut npc = Actor::npc("n", GridPos::new(1, 1), "s", 5, 32);
        let mut player = Player::new("Player", GridPos::new(1, 2), 7, 32);
        let catalog = ItemCatalog::default();
        let mut flags = StoryFlags::new();
        let mut sound = SoundLog::default();
        let mut log = Vec::new();
        {
            let mut ctx = CallContext {
                npc: &mut npc,
                player: &mut player,
                catalog: &catalog,
                flags: &mut flags,
                sound: &mut sound,
                log: &mut log,
            };
            ctx.log("jotaro", "hello");
            ctx.play_music("town");
            ctx.set_flag("flag_met", true);
        }
        assert_eq!(log, vec!["jotaro/ hello"]);
        assert_eq!(sound.drain(), vec![SoundEvent::Music("town".into())]);
        assert!(sound.events().is_empty());
        assert!(flags.contains("flag_met"));
    }

    #[test]
    fn test_inbox_force_close_only_records_open_sessions() {
        let mut inbox = SessionInbox::default();
        let request = SessionRequest::Dialog(DialogRequest {
            text: "hi".into(),
            options: vec![],
        });
        inbox.open(ContinuationToken(1), request.clone());
        inbox.open(ContinuationToken(2), request);
        inbox.finish(ContinuationToken(1));
        inbox.force_close(ContinuationToken(1));
        assert!(inbox.force_closed().is_empty());

        inbox.force_close(ContinuationToken(2));
        assert_eq!(inbox.force_closed(), &[ContinuationToken(2)]);
        assert!(inbox.is_empty());
    }
}
