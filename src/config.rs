// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! How a replica is put together.

use crate::clock::Clock;
use crate::clock::LamportClock;
use crate::clock::WallClock;
use crate::id::Id;
use crate::undo::KeyFilter;

/// Which clock stamps local writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClockKind {
    #[default]
    Lamport,
    Wall,
}

impl ClockKind {
    pub(crate) fn build(self) -> Box<dyn Clock> {
        return match self {
            ClockKind::Lamport => Box::new(LamportClock::new()),
            ClockKind::Wall => Box::new(WallClock::new()),
        };
    }
}

/// Settings for one replica.
///
/// ```
/// use canopy::config::{ClockKind, Config};
///
/// let config = Config::new("alice").clock(ClockKind::Wall).undo(false);
/// assert_eq!(config.writer.as_str(), "alice");
/// ```
pub struct Config {
    /// The id every local write is tagged with. Must be unique per replica.
    pub writer: Id,
    pub clock: ClockKind,
    /// Whether local writes are recorded for undo.
    pub undo: bool,
    pub(crate) filter: Option<KeyFilter>,
}

impl Config {
    pub fn new(writer: impl Into<Id>) -> Config {
        return Config {
            writer: writer.into(),
            clock: ClockKind::default(),
            undo: true,
            filter: None,
        };
    }

    pub fn clock(mut self, clock: ClockKind) -> Config {
        self.clock = clock;
        return self;
    }

    pub fn undo(mut self, enabled: bool) -> Config {
        self.undo = enabled;
        return self;
    }

    /// Only record writes to keys accepted by `filter`.
    pub fn record_keys(mut self, filter: impl Fn(&Id) -> bool + 'static) -> Config {
        self.filter = Some(Box::new(filter));
        return self;
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f
            .debug_struct("Config")
            .field("writer", &self.writer)
            .field("clock", &self.clock)
            .field("undo", &self.undo)
            .field("filtered", &self.filter.is_some())
            .finish();
    }
}
