//! Process-level tracing setup and the turn event feed for front ends.

pub mod logging;
pub mod tracing_layer;

pub use logging::{LogGuard, init_tracing};
pub use tracing_layer::{TurnEvent, TurnEventLayer};
