//! Cooperative scheduler for script contexts.
//!
//! At most one context runs at a time (the caller holds `&mut Scheduler`
//! while it does). Any number may be suspended, each bound 1:1 to the
//! dialog, shop or battle session it waits on through a continuation token.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, error, warn};

use super::assembler::Program;
use super::capability::{ContinuationToken, EngineSet, ScriptHost};
use super::vm::{Poll, ScriptContext, SessionKind, SessionRequest, SessionResult, Suspension};
use crate::error::{SchedulerError, ScriptRuntimeError};
use crate::world::map::NpcId;

/// How a start or resume ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Finished,
    Suspended {
        token: ContinuationToken,
        reason: Suspension,
    },
    /// The script hit a runtime error; its context is gone.
    Failed(ScriptRuntimeError),
}

#[derive(Debug)]
struct Waiting {
    context: ScriptContext,
    kind: SessionKind,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    next_token: u64,
    waiting: BTreeMap<ContinuationToken, Waiting>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context for `npc` and run it until it finishes or suspends.
    pub fn start(
        &mut self,
        program: Arc<Program>,
        npc: NpcId,
        host: &mut dyn ScriptHost,
        engines: &mut dyn EngineSet,
    ) -> Outcome {
        debug!(script = %program.name, npc = npc.0, "script started");
        let context = ScriptContext::new(program, npc);
        self.drive(context, host, engines)
    }

    /// Resume the context bound to `token` with the session's result.
    ///
    /// A result that does not fit the suspension is rejected and the context
    /// stays suspended.
    pub fn complete(
        &mut self,
        token: ContinuationToken,
        result: SessionResult,
        host: &mut dyn ScriptHost,
        engines: &mut dyn EngineSet,
    ) -> Result<Outcome, SchedulerError> {
        let waiting = self
            .waiting
            .get(&token)
            .ok_or(SchedulerError::UnknownToken(token.0))?;
        validate(token, waiting, &result)?;

        let Some(Waiting { mut context, kind }) = self.waiting.remove(&token) else {
            return Err(SchedulerError::UnknownToken(token.0));
        };
        debug!(%token, script = context.script_name(), result = result.label(), "resuming");

        context.resume(result);
        let outcome = self.drive(context, host, engines);
        // the answered session stays open until the script has run past it
        let engine = engines.engine(kind);
        match outcome {
            Outcome::Failed(_) => engine.force_close(token),
            _ => engine.finish(token),
        }
        Ok(outcome)
    }

    /// The session bound to `token` was closed without an answer.
    pub fn cancel(
        &mut self,
        token: ContinuationToken,
        host: &mut dyn ScriptHost,
        engines: &mut dyn EngineSet,
    ) -> Result<Outcome, SchedulerError> {
        self.complete(token, SessionResult::Cancelled, host, engines)
    }

    /// NPC whose script waits on `token`.
    pub fn npc_for(&self, token: ContinuationToken) -> Option<NpcId> {
        self.waiting.get(&token).map(|w| w.context.npc())
    }

    pub fn context(&self, token: ContinuationToken) -> Option<&ScriptContext> {
        self.waiting.get(&token).map(|w| &w.context)
    }

    pub fn has_suspended(&self) -> bool {
        !self.waiting.is_empty()
    }

    pub fn suspended_count(&self) -> usize {
        self.waiting.len()
    }

    pub fn tokens(&self) -> impl Iterator<Item = ContinuationToken> + '_ {
        self.waiting.keys().copied()
    }

    /// Drop every context and force-close the sessions they wait on. Used
    /// when the map they belong to goes away.
    pub fn abort_all(&mut self, engines: &mut dyn EngineSet) {
        for (token, waiting) in std::mem::take(&mut self.waiting) {
            warn!(%token, script = waiting.context.script_name(), "script aborted");
            engines.engine(waiting.kind).force_close(token);
        }
    }

    fn drive(
        &mut self,
        mut context: ScriptContext,
        host: &mut dyn ScriptHost,
        engines: &mut dyn EngineSet,
    ) -> Outcome {
        match context.run(host) {
            Ok(Poll::Finished) => {
                debug!(script = context.script_name(), "script finished");
                Outcome::Finished
            }
            Ok(Poll::Suspended(request)) => {
                let token = ContinuationToken(self.next_token);
                self.next_token += 1;
                let kind = request.kind();
                let reason = kind.suspension();
                debug!(%token, script = context.script_name(), ?reason, "script suspended");

                engines.engine(kind).open(token, request);
                self.waiting.insert(token, Waiting { context, kind });
                Outcome::Suspended { token, reason }
            }
            Err(err) => {
                error!(script = %err.script, pc = err.pc, "{err}");
                Outcome::Failed(err)
            }
        }
    }
}

fn validate(
    token: ContinuationToken,
    waiting: &Waiting,
    result: &SessionResult,
) -> Result<(), SchedulerError> {
    let expected = waiting.kind.suspension();
    let mismatch = |got| SchedulerError::ResultMismatch {
        token: token.0,
        expected,
        got,
    };

    match result.kind() {
        None => return Ok(()),
        Some(kind) if kind != waiting.kind => return Err(mismatch(result.label())),
        Some(_) => {}
    }

    if let (SessionResult::Dialog { choice }, Some(SessionRequest::Dialog(dialog))) =
        (result, waiting.context.pending())
    {
        let options = dialog.options.len();
        match choice {
            _ if options == 0 => {}
            None => return Err(mismatch("dialog without a choice")),
            Some(choice) if *choice >= options => {
                return Err(SchedulerError::ChoiceOutOfRange {
                    token: token.0,
                    choice: *choice,
                    options,
                });
            }
            Some(_) => {}
        }
    }
    Ok(())
}
