//! The game session: one loaded map, the player, story state and the
//! script scheduler, advanced one tick at a time.

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::content::{ContentKind, ContentSource};
use crate::error::{ResourceLoadError, SchedulerError, SessionError, WorldError};
use crate::model::{Direction, GridPos, SaveFile, StoryFlags};
use crate::parser;
use crate::player::{ItemCatalog, Player};
use crate::script::ScriptLibrary;
use crate::script::capability::{
    CallContext, ContinuationToken, EngineSet, Inboxes, SoundEvent, SoundLog, SoundSink,
};
use crate::script::scheduler::{Outcome, Scheduler};
use crate::script::vm::SessionResult;
use crate::world::map::{ActorRef, Map, NpcId};
use crate::world::tile::TilesetCache;

/// What pressing the interact button did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    /// A script is suspended; the session is modal.
    Busy,
    /// No NPC in front of the player, or one without a script.
    Nothing,
    /// The NPC's script could not be loaded; logged and ignored.
    ScriptUnavailable,
    Ran { npc: NpcId, outcome: Outcome },
}

pub struct GameSession<E: EngineSet = Inboxes> {
    config: EngineConfig,
    content: Box<dyn ContentSource>,
    tilesets: TilesetCache,
    scripts: ScriptLibrary,
    map: Map,
    player: Player,
    flags: StoryFlags,
    catalog: ItemCatalog,
    scheduler: Scheduler,
    engines: E,
    sound: SoundLog,
    script_log: Vec<String>,
}

impl<E: EngineSet> GameSession<E> {
    /// Restore the savefile (or defaults), load the item catalog and the
    /// current map.
    pub fn new(
        config: EngineConfig,
        content: Box<dyn ContentSource>,
        engines: E,
    ) -> Result<Self, SessionError> {
        let save = read_savefile(content.as_ref(), &config.savefile);
        let catalog = read_catalog(content.as_ref(), &config.item_catalog);

        let map_name = save
            .current_map
            .clone()
            .unwrap_or_else(|| config.start_map.clone());
        let mut tilesets = TilesetCache::new();
        let map = Map::load(
            &map_name,
            content.as_ref(),
            &mut tilesets,
            config.world_options(),
        )?;

        let player = Player::from_save(
            &save,
            GridPos::new(0, 0),
            config.player_speed,
            config.tile_size,
        );
        ensure_inside(&map, player.actor.position())?;

        let mut sound = SoundLog::default();
        if let Some(music) = map.background_music() {
            sound.play(SoundEvent::Music(music.to_string()));
        }

        info!(map = %map_name, player = player.name(), "session started");
        Ok(Self {
            config,
            content,
            tilesets,
            scripts: ScriptLibrary::new(),
            map,
            player,
            flags: save.flags,
            catalog,
            scheduler: Scheduler::new(),
            engines,
            sound,
            script_log: Vec::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut Map {
        &mut self.map
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    pub fn flags(&self) -> &StoryFlags {
        &self.flags
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn engines(&self) -> &E {
        &self.engines
    }

    pub fn engines_mut(&mut self) -> &mut E {
        &mut self.engines
    }

    pub fn content_mut(&mut self) -> &mut dyn ContentSource {
        self.content.as_mut()
    }

    /// Lines written by scripts' `log`, oldest first.
    pub fn script_log(&self) -> &[String] {
        &self.script_log
    }

    pub fn drain_sound_events(&mut self) -> Vec<SoundEvent> {
        self.sound.drain()
    }

    /// True while any script waits on a dialog, shop or battle.
    pub fn is_modal(&self) -> bool {
        self.scheduler.has_suspended()
    }

    pub fn draw_order(&self) -> Vec<ActorRef> {
        self.map.draw_order(&self.player.actor)
    }

    /// Buffer a player step. Ignored while modal.
    pub fn queue_player_move(&mut self, dir: Direction) -> bool {
        if self.is_modal() {
            return false;
        }
        self.player.actor.enqueue_move(dir);
        true
    }

    /// One full tick: resolve the player's next move, advance every actor,
    /// rebuild dirty batches, then follow a connection the player arrived on.
    pub fn tick(&mut self) -> Result<(), SessionError> {
        if self.is_modal() {
            self.player.actor.clear_moves();
        } else if !self.player.actor.is_moving() {
            if let Some(dir) = self.player.actor.pop_movement() {
                self.map
                    .move_actor(ActorRef::Player, dir, &mut self.player.actor)?;
            }
        }
        self.player.actor.update();
        self.map.update_actors(&mut self.player.actor)?;

        if self.map.batches_dirty() {
            self.map.rebuild_render_batches()?;
        }

        if !self.player.actor.is_moving() {
            if let Some(connection) = self.map.take_connection() {
                debug!(to = %connection.target_map, "following connection");
                self.change_map(&connection.target_map, connection.target)?;
            }
        }
        Ok(())
    }

    /// Talk to whatever stands in front of the player.
    pub fn interact(&mut self) -> Result<Interaction, SessionError> {
        if self.is_modal() {
            return Ok(Interaction::Busy);
        }
        let facing = self.player.actor.facing();
        let Some(target) = self
            .player
            .actor
            .position()
            .step(facing)
            .filter(|pos| self.map.size().contains(*pos))
        else {
            return Ok(Interaction::Nothing);
        };
        let Some(id) = self.map.find_npc(target) else {
            return Ok(Interaction::Nothing);
        };

        let npc = self.map.npc_mut(id).ok_or(WorldError::UnknownNpc(id.0))?;
        (npc.kind().hooks().on_interact)(npc, facing);
        let Some(script) = npc.script().map(str::to_string) else {
            return Ok(Interaction::Nothing);
        };

        let program = match self.scripts.load(&script, self.content.as_ref()) {
            Ok(program) => program,
            Err(err) => {
                warn!(npc = id.0, script = %script, error = %err, "interaction skipped");
                return Ok(Interaction::ScriptUnavailable);
            }
        };

        let npc = self.map.npc_mut(id).ok_or(WorldError::UnknownNpc(id.0))?;
        let mut host = CallContext {
            npc,
            player: &mut self.player,
            catalog: &self.catalog,
            flags: &mut self.flags,
            sound: &mut self.sound,
            log: &mut self.script_log,
        };
        let outcome = self
            .scheduler
            .start(program, id, &mut host, &mut self.engines);
        Ok(Interaction::Ran { npc: id, outcome })
    }

    /// A dialog, shop or battle session reports its result.
    pub fn respond(
        &mut self,
        token: ContinuationToken,
        result: SessionResult,
    ) -> Result<Outcome, SessionError> {
        let id = self
            .scheduler
            .npc_for(token)
            .ok_or(SchedulerError::UnknownToken(token.0))?;
        let npc = self.map.npc_mut(id).ok_or(WorldError::UnknownNpc(id.0))?;
        let mut host = CallContext {
            npc,
            player: &mut self.player,
            catalog: &self.catalog,
            flags: &mut self.flags,
            sound: &mut self.sound,
            log: &mut self.script_log,
        };
        let outcome = self
            .scheduler
            .complete(token, result, &mut host, &mut self.engines)?;
        Ok(outcome)
    }

    /// The session bound to `token` was closed without an answer.
    pub fn cancel(&mut self, token: ContinuationToken) -> Result<Outcome, SessionError> {
        self.respond(token, SessionResult::Cancelled)
    }

    /// Replace the current map. On failure the old map stays installed and
    /// nothing else changes.
    pub fn change_map(&mut self, name: &str, position: GridPos) -> Result<(), SessionError> {
        let map = Map::load(
            name,
            self.content.as_ref(),
            &mut self.tilesets,
            self.config.world_options(),
        )?;
        ensure_inside(&map, position)?;

        self.scheduler.abort_all(&mut self.engines);
        self.player.actor.place(position);
        if let Some(music) = map.background_music() {
            if self.map.background_music() != Some(music) {
                self.sound.play(SoundEvent::Music(music.to_string()));
            }
        }
        info!(from = self.map.name(), to = name, %position, "map changed");
        self.map = map;
        Ok(())
    }

    pub fn to_savefile(&self) -> SaveFile {
        let mut save = SaveFile {
            current_map: Some(self.map.name().to_string()),
            flags: self.flags.clone(),
            ..SaveFile::default()
        };
        self.player.write_save(&mut save);
        save
    }

    pub fn save(&mut self) -> Result<(), SessionError> {
        let save = self.to_savefile();
        crate::writer::save::emit(&save, &self.config.savefile, self.content.as_mut())?;
        Ok(())
    }
}

fn ensure_inside(map: &Map, pos: GridPos) -> Result<(), SessionError> {
    if map.size().contains(pos) {
        Ok(())
    } else {
        Err(SessionError::PlayerOutOfBounds {
            map: map.name().to_string(),
            x: pos.x,
            y: pos.y,
        })
    }
}

/// Absent or broken savefiles fall back to defaults.
fn read_savefile(content: &dyn ContentSource, name: &str) -> SaveFile {
    match content.read(ContentKind::Savefile, name) {
        Ok(text) => parser::parse_savefile(&text),
        Err(ResourceLoadError::Missing { .. }) => {
            info!(savefile = name, "no savefile, starting fresh");
            SaveFile::default()
        }
        Err(err) => {
            warn!(savefile = name, error = %err, "savefile unreadable, starting fresh");
            SaveFile::default()
        }
    }
}

/// Without a catalog every `give` is a no-op; that is logged, not fatal.
fn read_catalog(content: &dyn ContentSource, name: &str) -> ItemCatalog {
    let parsed = content
        .read(ContentKind::Catalog, name)
        .and_then(|text| parser::load_item_catalog(name, &text));
    match parsed {
        Ok(items) => ItemCatalog::new(items),
        Err(err) => {
            warn!(catalog = name, error = %err, "item catalog unavailable");
            ItemCatalog::default()
        }
    }
}
