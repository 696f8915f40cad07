//! The set of active panes.

use crate::error::{FiestaError, Result};
use serde::{Deserialize, Serialize};

/// Default upper bound on simultaneously active panes.
pub const MAX_PANES: usize = 5;

/// Ordered set of active pane ids.
///
/// Ids are unique; insertion order is kept because it is the display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneSet {
    panes: Vec<String>,
    max: usize,
}

impl Default for PaneSet {
    fn default() -> Self {
        Self::with_limit(MAX_PANES)
    }
}

impl PaneSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(max: usize) -> Self {
        Self {
            panes: Vec::new(),
            max,
        }
    }

    /// Adds a pane.
    ///
    /// Returns `Ok(false)` when the pane is already active, and
    /// [`FiestaError::PaneLimit`] when the set is full.
    pub fn add(&mut self, pane_id: impl Into<String>) -> Result<bool> {
        let pane_id = pane_id.into();
        if self.contains(&pane_id) {
            return Ok(false);
        }
        if self.panes.len() >= self.max {
            return Err(FiestaError::PaneLimit { max: self.max });
        }
        self.panes.push(pane_id);
        Ok(true)
    }

    /// Removes a pane, returning whether it was present.
    pub fn remove(&mut self, pane_id: &str) -> bool {
        let before = self.panes.len();
        self.panes.retain(|id| id != pane_id);
        self.panes.len() != before
    }

    pub fn contains(&self, pane_id: &str) -> bool {
        self.panes.iter().any(|id| id == pane_id)
    }

    pub fn ids(&self) -> &[String] {
        &self.panes
    }

    pub fn len(&self) -> usize {
        self.panes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.panes.len() >= self.max
    }

    pub fn limit(&self) -> usize {
        self.max
    }
}
