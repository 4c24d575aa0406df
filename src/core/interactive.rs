//! # Interactive controller: menu-driven dispatcher.
//!
//! Each interrupt opens the root menu. The controller is a two-state machine:
//!
//! ```text
//!            ┌──────────── Root ◄──────────────┐
//!            │  interrupt all / force root /   │ back, cancel
//!            │  ignore / cancel ─► resume      │
//!            │  stop / exit / abort ─► leave   │
//!            │  interrupt one scope            │
//!            ▼                                 │
//!          Scope ── pick scope: interrupt it, stay in Scope
//! ```
//!
//! Every menu prompt is a suspension point, so a forced interrupt of the
//! dispatcher ends it even while the operator is deciding. Answers arriving
//! after the bridge was closed are discarded.

use std::sync::Arc;

use super::bridge::WakeHandle;
use super::dispatcher::receive;
use super::hub::Interrupts;
use crate::error::DispatcherError;
use crate::events::{Event, EventKind};
use crate::policies::Debouncer;
use crate::tasks::TaskCtx;

const ROOT_PROMPT: &str = "Interrupt received. What would you like to do?";
const SCOPE_PROMPT: &str = "Interrupt which scope?";
const GO_BACK: &str = "Go back";

/// Which menu is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    /// Top-level actions.
    Root,
    /// Scope picker.
    Scope,
}

/// Entries of the root menu, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootChoice {
    InterruptAll,
    InterruptScope,
    ForceRoot,
    Ignore,
    StopHandler,
    ExitProcess,
    AbortProcess,
}

impl RootChoice {
    /// All entries in display order.
    pub const ALL: [RootChoice; 7] = [
        RootChoice::InterruptAll,
        RootChoice::InterruptScope,
        RootChoice::ForceRoot,
        RootChoice::Ignore,
        RootChoice::StopHandler,
        RootChoice::ExitProcess,
        RootChoice::AbortProcess,
    ];

    /// Text shown to the operator.
    pub fn label(&self) -> &'static str {
        match self {
            RootChoice::InterruptAll => "Interrupt all",
            RootChoice::InterruptScope => "Interrupt only...",
            RootChoice::ForceRoot => "Force-interrupt the root task",
            RootChoice::Ignore => "Ignore it",
            RootChoice::StopHandler => "Stop this handler",
            RootChoice::ExitProcess => "Exit the process",
            RootChoice::AbortProcess => "Abort the process",
        }
    }

    /// Stable label for events.
    pub fn as_str(&self) -> &'static str {
        match self {
            RootChoice::InterruptAll => "interrupt_all",
            RootChoice::InterruptScope => "interrupt_scope",
            RootChoice::ForceRoot => "force_root",
            RootChoice::Ignore => "ignore",
            RootChoice::StopHandler => "stop_handler",
            RootChoice::ExitProcess => "exit_process",
            RootChoice::AbortProcess => "abort_process",
        }
    }

    /// Maps a menu index back to an entry.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    fn transition(self) -> Transition {
        match self {
            RootChoice::InterruptScope => Transition::Enter(MenuState::Scope),
            RootChoice::InterruptAll | RootChoice::ForceRoot | RootChoice::Ignore => {
                Transition::Finish(Action::Resume)
            }
            RootChoice::StopHandler => Transition::Finish(Action::Stop),
            RootChoice::ExitProcess => Transition::Finish(Action::Exit),
            RootChoice::AbortProcess => Transition::Finish(Action::Abort),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Resume,
    Stop,
    Exit,
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Enter(MenuState),
    Finish(Action),
}

pub(crate) async fn run(ctx: &TaskCtx, bridge: &WakeHandle) -> Result<(), DispatcherError> {
    let hub = ctx.interrupts();
    let mut debouncer = Debouncer::new(hub.config().escalation());

    while receive(ctx, bridge, &mut debouncer).await? {
        match drive_menu(ctx, bridge).await? {
            Action::Resume => {}
            Action::Stop => return Ok(()),
            Action::Exit => {
                hub.process().exit(hub.config().exit_code);
                return Ok(());
            }
            Action::Abort => {
                hub.process().abort();
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Runs menu steps until an action is chosen.
///
/// A closed bridge means this incarnation was replaced or stopped: the
/// operator's answer is discarded and the dispatcher leaves.
async fn drive_menu(ctx: &TaskCtx, bridge: &WakeHandle) -> Result<Action, DispatcherError> {
    let hub = ctx.interrupts();
    let mut state = MenuState::Root;

    loop {
        if bridge.is_closed() {
            return Ok(Action::Stop);
        }
        let transition = match state {
            MenuState::Root => root_step(ctx, hub, bridge).await?,
            MenuState::Scope => scope_step(ctx, hub, bridge).await?,
        };
        match transition {
            Transition::Enter(next) => state = next,
            Transition::Finish(action) => return Ok(action),
        }
    }
}

async fn root_step(
    ctx: &TaskCtx,
    hub: &Arc<Interrupts>,
    bridge: &WakeHandle,
) -> Result<Transition, DispatcherError> {
    let options: Vec<String> = RootChoice::ALL.iter().map(|c| c.label().to_string()).collect();
    let pick = ctx.interruptible(hub.menu().choose(ROOT_PROMPT, &options)).await??;
    if bridge.is_closed() {
        return Ok(Transition::Finish(Action::Stop));
    }
    let choice = pick
        .and_then(RootChoice::from_index)
        .unwrap_or(RootChoice::Ignore);

    hub.publish(Event::new(EventKind::MenuSelected).with_reason(choice.as_str()));
    match choice {
        RootChoice::InterruptAll => {
            hub.interrupt_all();
        }
        RootChoice::ForceRoot => {
            hub.force_interrupt_root();
        }
        _ => {}
    }
    Ok(choice.transition())
}

async fn scope_step(
    ctx: &TaskCtx,
    hub: &Arc<Interrupts>,
    bridge: &WakeHandle,
) -> Result<Transition, DispatcherError> {
    let scopes = hub.scopes();
    let mut options: Vec<String> = scopes.iter().map(|s| s.to_string()).collect();
    options.push(GO_BACK.to_string());

    let pick = ctx.interruptible(hub.menu().choose(SCOPE_PROMPT, &options)).await??;
    if bridge.is_closed() {
        return Ok(Transition::Finish(Action::Stop));
    }
    match pick.and_then(|i| scopes.get(i)) {
        Some(scope) => {
            hub.publish(
                Event::new(EventKind::MenuSelected)
                    .with_reason("interrupt_scope")
                    .with_scope(scope.clone()),
            );
            hub.interrupt_scope(scope);
            Ok(Transition::Enter(MenuState::Scope))
        }
        None => Ok(Transition::Enter(MenuState::Root)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_display_order() {
        assert_eq!(RootChoice::from_index(0), Some(RootChoice::InterruptAll));
        assert_eq!(RootChoice::from_index(6), Some(RootChoice::AbortProcess));
        assert_eq!(RootChoice::from_index(7), None);
    }

    #[test]
    fn transition_table() {
        assert_eq!(
            RootChoice::InterruptScope.transition(),
            Transition::Enter(MenuState::Scope)
        );
        for resume in [RootChoice::InterruptAll, RootChoice::ForceRoot, RootChoice::Ignore] {
            assert_eq!(resume.transition(), Transition::Finish(Action::Resume));
        }
        assert_eq!(
            RootChoice::StopHandler.transition(),
            Transition::Finish(Action::Stop)
        );
        assert_eq!(
            RootChoice::ExitProcess.transition(),
            Transition::Finish(Action::Exit)
        );
        assert_eq!(
            RootChoice::AbortProcess.transition(),
            Transition::Finish(Action::Abort)
        );
    }
}
