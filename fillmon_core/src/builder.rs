//! Type-state builder for `Engine`.
//!
//! The builder enforces at compile time that an `EventSink` is provided
//! before `build()` is available. Layout and config default to the standard
//! four-tank line; `build()` validates both.

use std::sync::Arc;

use fillmon_traits::{Clock, EventSink, SystemClock};

use crate::config::{EngineCfg, LineLayout};
use crate::engine::Engine;
use crate::error::BuildError;
use crate::registry::SessionRegistry;

// ── Type-state marker ────────────────────────────────────────────────────────

/// Placeholder for a sink that has not been provided yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct Missing;

pub struct EngineBuilder<K> {
    sink: K,
    cfg: Option<EngineCfg>,
    layout: Option<LineLayout>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
}

impl Default for EngineBuilder<Missing> {
    fn default() -> Self {
        Self {
            sink: Missing,
            cfg: None,
            layout: None,
            clock: None,
        }
    }
}

impl<K> EngineBuilder<K> {
    /// Provide the outbound sink; unlocks `build()`.
    pub fn with_sink<T: EventSink>(self, sink: T) -> EngineBuilder<T> {
        EngineBuilder {
            sink,
            cfg: self.cfg,
            layout: self.layout,
            clock: self.clock,
        }
    }

    pub fn with_cfg(mut self, cfg: EngineCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    pub fn with_layout(mut self, layout: LineLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Defaults to `SystemClock`.
    pub fn with_clock<C: Clock + Send + Sync + 'static>(mut self, clock: C) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Build from a loaded config file (`[line]`, `[tolerance]`, `[session]`, ...).
    pub fn with_config(self, cfg: &fillmon_config::Config) -> Self {
        self.with_cfg(EngineCfg::from(cfg))
            .with_layout(LineLayout::from(cfg))
    }
}

impl<K: EventSink> EngineBuilder<K> {
    pub fn build(self) -> Result<Engine<K>, BuildError> {
        let cfg = self.cfg.unwrap_or_default();
        let layout = self.layout.unwrap_or_default();
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock + Send + Sync>);
        let registry = SessionRegistry::new(&layout, &cfg, clock)?;
        tracing::debug!(
            tanks = layout.tanks.len(),
            pairs = layout.exclusive_pairs.len(),
            prefix = %cfg.topic_prefix,
            "engine built"
        );
        Ok(Engine::from_parts(registry, self.sink, cfg))
    }
}
