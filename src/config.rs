//! Session configuration

use crate::x::input::Stroke;
use serde::{Deserialize, Serialize};

/// What a [`Session`](crate::Session) should grab and how its notification
/// channels behave
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The key combinations to grab on the root window
    pub strokes:       Vec<Stroke>,
    /// Buffer size for the notification channels. `None` (the default) makes
    /// every channel a rendezvous point: the dispatch loop blocks until each
    /// notification has been consumed.
    pub channel_bound: Option<usize>,
}

impl Config {
    /// Create a [`Config`] grabbing the given strokes
    #[must_use]
    pub fn new(strokes: Vec<Stroke>) -> Self {
        Self { strokes, channel_bound: None }
    }

    /// Buffer the notification channels instead of rendezvousing
    #[must_use]
    pub fn buffered(mut self, bound: usize) -> Self {
        self.channel_bound = Some(bound);
        self
    }
}
