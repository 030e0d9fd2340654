//! Supervisor state machine.

use serde::{Deserialize, Serialize};

/// Where a supervisor invocation currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupervisorState {
    #[default]
    ResolvingConfig,
    CheckingDaemon,
    DaemonLive,
    Launching,
    Notifying,
    Done,
    Failed,
}

impl SupervisorState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `next` may follow `self`. `Failed` is reachable from any
    /// non-terminal state.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use SupervisorState::{
            CheckingDaemon, DaemonLive, Done, Failed, Launching, Notifying, ResolvingConfig,
        };
        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed)
            | (ResolvingConfig, CheckingDaemon)
            | (CheckingDaemon, DaemonLive | Launching)
            | (DaemonLive | Launching, Notifying)
            | (Notifying, Done) => true,
            _ => false,
        }
    }
}

/// Tracks one invocation's progress through [`SupervisorState`].
#[derive(Debug, Clone)]
pub struct SupervisorStateMachine {
    state: SupervisorState,
    history: Vec<SupervisorState>,
}

impl Default for SupervisorStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SupervisorStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SupervisorState::ResolvingConfig,
            history: vec![SupervisorState::ResolvingConfig],
        }
    }

    #[must_use]
    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Every state visited so far, in order.
    #[must_use]
    pub fn history(&self) -> &[SupervisorState] {
        &self.history
    }

    pub fn transition(&mut self, new_state: SupervisorState) {
        debug_assert!(
            self.state.can_transition_to(new_state),
            "invalid transition {:?} -> {:?}",
            self.state,
            new_state
        );
        tracing::debug!(from = ?self.state, to = ?new_state, "State transition");
        self.state = new_state;
        self.history.push(new_state);
    }

    /// Move to `Failed` unless already terminal.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.transition(SupervisorState::Failed);
        }
    }
}
