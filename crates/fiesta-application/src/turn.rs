//! Turn lifecycle types.

use fiesta_core::ModelKind;

/// Orchestrator state for the most recent turn.
///
/// `Idle` only before the first submission; afterwards the state cycles
/// `Dispatching -> AwaitingAll -> Settled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    /// Placeholders are being appended and pane tasks launched.
    Dispatching,
    /// Every pane task is running; waiting on the barrier.
    AwaitingAll,
    /// Every pane task has finished.
    Settled,
}

/// Terminal state of one pane within a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneStatus {
    Succeeded,
    /// The pane's placeholder (or the code slot) carries the error text.
    Failed(String),
    /// A newer turn superseded this one before the pane finished.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneOutcome {
    pub pane_id: String,
    pub kind: ModelKind,
    pub status: PaneStatus,
}

/// Returned by `submit` once every pane of the turn has settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub turn_id: String,
    /// One entry per pane, in pane order.
    pub outcomes: Vec<PaneOutcome>,
}

impl TurnReport {
    pub fn outcome(&self, pane_id: &str) -> Option<&PaneOutcome> {
        self.outcomes.iter().find(|o| o.pane_id == pane_id)
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.status == PaneStatus::Succeeded)
    }

    pub fn failures(&self) -> impl Iterator<Item = &PaneOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, PaneStatus::Failed(_)))
    }

    pub fn was_cancelled(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.status == PaneStatus::Cancelled)
    }
}
