//! Presentation pacing for text replies.
//!
//! Providers return complete replies; a pacer turns one into a sequence of
//! growing prefixes so panes fill in word by word. A provider with real
//! streaming can plug in its own pacer without touching the orchestrator.

use fiesta_core::config::PacingConfig;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

pub trait PresentationPacer: Send + Sync {
    /// Finite stream of strictly growing prefixes of `full_text`.
    fn pace(&self, full_text: String) -> BoxStream<'static, String>;
}

/// Emits one word at a time with a random pause in `[min, max)` between
/// emissions.
///
/// Words are split on single spaces and every emission carries a trailing
/// space, so the final one is `full_text` plus one space.
#[derive(Debug, Clone)]
pub struct WordPacer {
    min: Duration,
    max: Duration,
}

impl WordPacer {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    fn pause(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..self.max)
    }
}

impl Default for WordPacer {
    fn default() -> Self {
        Self::new(Duration::from_millis(50), Duration::from_millis(100))
    }
}

struct PaceState {
    words: std::vec::IntoIter<String>,
    shown: String,
    first: bool,
}

impl PresentationPacer for WordPacer {
    fn pace(&self, full_text: String) -> BoxStream<'static, String> {
        let pacer = self.clone();
        let words: Vec<String> = full_text.split(' ').map(str::to_string).collect();
        let state = PaceState {
            words: words.into_iter(),
            shown: String::with_capacity(full_text.len() + 1),
            first: true,
        };

        stream::unfold(state, move |mut state| {
            let pacer = pacer.clone();
            async move {
                let word = state.words.next()?;
                if !state.first {
                    tokio::time::sleep(pacer.pause()).await;
                }
                state.first = false;
                state.shown.push_str(&word);
                state.shown.push(' ');
                Some((state.shown.clone(), state))
            }
        })
        .boxed()
    }
}

/// Emits the whole text at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantPacer;

impl PresentationPacer for InstantPacer {
    fn pace(&self, full_text: String) -> BoxStream<'static, String> {
        stream::once(async move { full_text }).boxed()
    }
}

pub fn pacer_from_config(config: &PacingConfig) -> Arc<dyn PresentationPacer> {
    if config.enabled {
        Arc::new(WordPacer::new(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        ))
    } else {
        Arc::new(InstantPacer)
    }
}
