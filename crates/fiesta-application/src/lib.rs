//! Turn orchestration: fans one prompt out to every active pane and
//! reconciles the replies into the shared conversation store.

pub mod orchestrator;
pub mod turn;

pub use orchestrator::RequestOrchestrator;
pub use turn::{PaneOutcome, PaneStatus, TurnReport, TurnState};
