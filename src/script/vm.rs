//! Script contexts: a shared program, a program counter and the locals a
//! script can observe after it resumes.
//!
//! A context runs synchronously until it finishes or reaches one of the four
//! suspending ops (`say`, `ask`, `shop`, `battle`). Nothing else yields.

use std::sync::Arc;

use tracing::trace;

use super::assembler::{Op, Program};
use super::ast::{Condition, FaceTarget, ShopDescriptor};
use super::capability::ScriptHost;
use crate::error::{RuntimeFault, ScriptRuntimeError};
use crate::model::Direction;
use crate::world::map::NpcId;

/// What a suspended context is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suspension {
    None,
    AwaitingDialog,
    AwaitingShop,
    AwaitingBattle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptState {
    Running,
    Suspended(Suspension),
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Dialog,
    Shop,
    Battle,
}

impl SessionKind {
    pub fn suspension(self) -> Suspension {
        match self {
            SessionKind::Dialog => Suspension::AwaitingDialog,
            SessionKind::Shop => Suspension::AwaitingShop,
            SessionKind::Battle => Suspension::AwaitingBattle,
        }
    }
}

/// A `say` has no options; an `ask` has at least one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogRequest {
    pub text: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BattleRequest {
    pub npc: NpcId,
}

/// What a suspending op asks the outside world to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRequest {
    Dialog(DialogRequest),
    Shop(ShopDescriptor),
    Battle(BattleRequest),
}

impl SessionRequest {
    pub fn kind(&self) -> SessionKind {
        match self {
            SessionRequest::Dialog(_) => SessionKind::Dialog,
            SessionRequest::Shop(_) => SessionKind::Shop,
            SessionRequest::Battle(_) => SessionKind::Battle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleOutcome {
    Won,
    Lost,
}

/// What a session reports when it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionResult {
    /// `choice` is the picked option for an `ask`, `None` for a `say`.
    Dialog { choice: Option<usize> },
    ShopClosed,
    Battle(BattleOutcome),
    /// The window was closed without a terminal answer.
    Cancelled,
}

impl SessionResult {
    pub fn label(&self) -> &'static str {
        match self {
            SessionResult::Dialog { .. } => "dialog",
            SessionResult::ShopClosed => "shop",
            SessionResult::Battle(_) => "battle",
            SessionResult::Cancelled => "cancelled",
        }
    }

    /// `None` for `Cancelled`, which fits every session kind.
    pub fn kind(&self) -> Option<SessionKind> {
        match self {
            SessionResult::Dialog { .. } => Some(SessionKind::Dialog),
            SessionResult::ShopClosed => Some(SessionKind::Shop),
            SessionResult::Battle(_) => Some(SessionKind::Battle),
            SessionResult::Cancelled => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll {
    Finished,
    Suspended(SessionRequest),
}

/// State a script can read back after a suspension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locals {
    /// Option picked in the most recent answered `ask`.
    pub last_choice: Option<usize>,
    /// Set once any `ask` has come back, answered or cancelled.
    pub asked: bool,
    pub last_battle: Option<BattleOutcome>,
    /// The most recent session was cancelled.
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
pub struct ScriptContext {
    program: Arc<Program>,
    npc: NpcId,
    pc: usize,
    state: ScriptState,
    locals: Locals,
    pending: Option<SessionRequest>,
}

impl ScriptContext {
    pub fn new(program: Arc<Program>, npc: NpcId) -> Self {
        Self {
            program,
            npc,
            pc: 0,
            state: ScriptState::Running,
            locals: Locals::default(),
            pending: None,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn script_name(&self) -> &str {
        &self.program.name
    }

    pub fn npc(&self) -> NpcId {
        self.npc
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn state(&self) -> ScriptState {
        self.state
    }

    pub fn locals(&self) -> &Locals {
        &self.locals
    }

    /// The session this context is waiting on, while suspended.
    pub fn pending(&self) -> Option<&SessionRequest> {
        self.pending.as_ref()
    }

    /// Hand the session's result back. The caller has already checked that
    /// `result` fits the suspension; the context continues on the next `run`.
    pub fn resume(&mut self, result: SessionResult) {
        let pending = self.pending.take();
        let was_ask = matches!(
            &pending,
            Some(SessionRequest::Dialog(dialog)) if !dialog.options.is_empty()
        );

        self.locals.cancelled = false;
        match result {
            SessionResult::Dialog { choice } => {
                if was_ask {
                    self.locals.asked = true;
                    self.locals.last_choice = choice;
                }
            }
            SessionResult::ShopClosed => {}
            SessionResult::Battle(outcome) => self.locals.last_battle = Some(outcome),
            SessionResult::Cancelled => {
                self.locals.cancelled = true;
                match pending.as_ref().map(SessionRequest::kind) {
                    Some(SessionKind::Dialog) if was_ask => {
                        self.locals.asked = true;
                        self.locals.last_choice = None;
                    }
                    Some(SessionKind::Battle) => self.locals.last_battle = None,
                    _ => {}
                }
            }
        }
        self.state = ScriptState::Running;
    }

    /// Run until the script finishes or suspends.
    pub fn run(&mut self, host: &mut dyn ScriptHost) -> Result<Poll, ScriptRuntimeError> {
        if self.state == ScriptState::Terminated {
            return Ok(Poll::Finished);
        }
        self.state = ScriptState::Running;

        match self.execute(host) {
            Ok(Poll::Finished) => {
                self.state = ScriptState::Terminated;
                Ok(Poll::Finished)
            }
            Ok(Poll::Suspended(request)) => {
                self.state = ScriptState::Suspended(request.kind().suspension());
                self.pending = Some(request.clone());
                Ok(Poll::Suspended(request))
            }
            Err(fault) => {
                self.state = ScriptState::Terminated;
                Err(ScriptRuntimeError {
                    script: self.program.name.clone(),
                    pc: self.pc,
                    fault,
                })
            }
        }
    }

    fn execute(&mut self, host: &mut dyn ScriptHost) -> Result<Poll, RuntimeFault> {
        let program = Arc::clone(&self.program);
        while let Some(op) = program.ops.get(self.pc) {
            trace!(script = %program.name, pc = self.pc, op = op.mnemonic(), "exec");
            let mut next = self.pc + 1;

            match op {
                Op::Log(text) => host.log(&program.name, text),
                Op::Say(text) => {
                    self.pc = next;
                    return Ok(Poll::Suspended(SessionRequest::Dialog(DialogRequest {
                        text: text.clone(),
                        options: Vec::new(),
                    })));
                }
                Op::Ask { question, options } => {
                    self.pc = next;
                    return Ok(Poll::Suspended(SessionRequest::Dialog(DialogRequest {
                        text: question.clone(),
                        options: options.clone(),
                    })));
                }
                Op::Shop(shop) => {
                    self.pc = next;
                    return Ok(Poll::Suspended(SessionRequest::Shop(shop.clone())));
                }
                Op::Battle => {
                    self.pc = next;
                    return Ok(Poll::Suspended(SessionRequest::Battle(BattleRequest {
                        npc: self.npc,
                    })));
                }
                Op::Give { item, count } => host.give_item(item, *count),
                Op::Sound(name) => host.play_sound(name),
                Op::Music(name) => host.play_music(name),
                Op::Move(dir) => host.npc().enqueue_move(*dir),
                Op::Face(FaceTarget::Dir(dir)) => host.npc().set_facing(*dir),
                Op::Face(FaceTarget::Player) => {
                    let player = host.player_position();
                    let npc = host.npc();
                    if let Some(dir) = Direction::towards(npc.position(), player) {
                        npc.set_facing(dir);
                    }
                }
                Op::Speed(0) => return Err(RuntimeFault::ZeroSpeed),
                Op::Speed(ticks) => host.npc().set_movement_speed(*ticks),
                Op::SetStat { stat, value } => {
                    host.npc().statistics_mut().insert(stat.clone(), *value);
                }
                Op::AddStat { stat, delta } => {
                    let slot = host
                        .npc()
                        .statistics_mut()
                        .get_mut(stat)
                        .ok_or_else(|| RuntimeFault::UnknownStat(stat.clone()))?;
                    *slot = slot
                        .checked_add(*delta)
                        .ok_or_else(|| RuntimeFault::StatOverflow(stat.clone()))?;
                }
                Op::SetFlag(flag) => host.set_flag(flag, true),
                Op::UnsetFlag(flag) => host.set_flag(flag, false),
                Op::JumpUnless { condition, target } => {
                    if !self.eval(condition, host)? {
                        next = *target;
                    }
                }
                Op::Jump(target) => next = *target,
                Op::Fail(message) => return Err(RuntimeFault::Raised(message.clone())),
                Op::End => {
                    self.pc = program.ops.len();
                    return Ok(Poll::Finished);
                }
            }
            self.pc = next;
        }
        Ok(Poll::Finished)
    }

    fn eval(&self, condition: &Condition, host: &mut dyn ScriptHost) -> Result<bool, RuntimeFault> {
        let value = match condition {
            Condition::FlagSet(flag) => host.flag(flag),
            Condition::FlagClear(flag) => !host.flag(flag),
            Condition::Choice(n) => {
                if !self.locals.asked {
                    return Err(RuntimeFault::NoChoice);
                }
                self.locals.last_choice == Some(*n)
            }
            Condition::Cancelled => self.locals.cancelled,
            Condition::Won => self.locals.last_battle == Some(BattleOutcome::Won),
            Condition::Lost => self.locals.last_battle == Some(BattleOutcome::Lost),
            Condition::Stat { stat, cmp, value } => {
                let current = host
                    .npc()
                    .statistics()
                    .get(stat)
                    .copied()
                    .ok_or_else(|| RuntimeFault::UnknownStat(stat.clone()))?;
                cmp.holds(current, *value)
            }
        };
        Ok(value)
    }
}
