//! Batch state machine
//!
//! Batch states: IDLE → RESOLVED → SIGNED → RECONCILED → SCRUBBED → REMAPPED → DONE,
//! with FAILED reachable from any non-terminal state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Batch state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchState {
    /// Nothing done yet
    Idle,
    /// Input identities read
    Resolved,
    /// Unsigned artifacts signed
    Signed,
    /// Intra-batch references fixed
    Reconciled,
    /// Invalid friend declarations removed
    Scrubbed,
    /// Auxiliary paths rewritten
    Remapped,
    /// Batch completed
    Done,
    /// Batch aborted on an unrecoverable condition
    Failed,
}

impl BatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Done | BatchState::Failed)
    }

    /// Check if transition from this state to target is valid
    pub fn can_transition_to(&self, target: BatchState) -> bool {
        match (self, target) {
            (BatchState::Idle, BatchState::Resolved) => true,
            (BatchState::Resolved, BatchState::Signed) => true,
            (BatchState::Signed, BatchState::Reconciled) => true,
            (BatchState::Reconciled, BatchState::Scrubbed) => true,
            (BatchState::Scrubbed, BatchState::Remapped) => true,
            (BatchState::Remapped, BatchState::Done) => true,

            // Empty batch
            (BatchState::Idle, BatchState::Done) => true,

            (from, BatchState::Failed) => !from.is_terminal(),

            _ => false,
        }
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatchState::Idle => "IDLE",
            BatchState::Resolved => "RESOLVED",
            BatchState::Signed => "SIGNED",
            BatchState::Reconciled => "RECONCILED",
            BatchState::Scrubbed => "SCRUBBED",
            BatchState::Remapped => "REMAPPED",
            BatchState::Done => "DONE",
            BatchState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Invalid state transition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid batch state transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: BatchState,
    pub to: BatchState,
}

/// Current state plus the path taken to reach it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    state: BatchState,
    history: Vec<BatchState>,
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchProgress {
    pub fn new() -> Self {
        Self {
            state: BatchState::Idle,
            history: vec![BatchState::Idle],
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn history(&self) -> &[BatchState] {
        &self.history
    }

    pub fn advance(&mut self, target: BatchState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(target) {
            return Err(TransitionError {
                from: self.state,
                to: target,
            });
        }
        self.state = target;
        self.history.push(target);
        Ok(())
    }

    /// Move to FAILED; a no-op once terminal
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = BatchState::Failed;
            self.history.push(BatchState::Failed);
        }
    }
}
