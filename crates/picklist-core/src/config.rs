// ── Engine configuration ──
//
// Tuning for seeding, flush cadence, and page limits. Loading from disk
// lives in `picklist-config`; this type is constructed and handed in.

use std::time::Duration;

pub const DEFAULT_SEED_COUNT: u64 = 1_000_000;
pub const DEFAULT_ADD_FLUSH_INTERVAL: Duration = Duration::from_millis(10_000);
pub const DEFAULT_ACTION_FLUSH_INTERVAL: Duration = Duration::from_millis(1_000);
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_MAX_PAGE_SIZE: usize = 500;

/// Runtime configuration for an [`Engine`](crate::Engine).
///
/// A zero flush interval disables that timer; flushes then only happen
/// through [`Engine::flush_adds`](crate::Engine::flush_adds) /
/// [`Engine::flush_actions`](crate::Engine::flush_actions).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Items `1..=seed_count` created at startup, named `"Item {id}"`.
    pub seed_count: u64,
    pub add_flush_interval: Duration,
    pub action_flush_interval: Duration,
    /// Page size used when a caller passes none.
    pub default_page_size: usize,
    /// Upper clamp for requested page sizes.
    pub max_page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed_count: DEFAULT_SEED_COUNT,
            add_flush_interval: DEFAULT_ADD_FLUSH_INTERVAL,
            action_flush_interval: DEFAULT_ACTION_FLUSH_INTERVAL,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl EngineConfig {
    /// Same as the default, with both timers off. Intended for tests and
    /// tools that drive flushes explicitly.
    pub fn manual(seed_count: u64) -> Self {
        Self {
            seed_count,
            add_flush_interval: Duration::ZERO,
            action_flush_interval: Duration::ZERO,
            ..Self::default()
        }
    }
}
