//! Values fixed for an engine's lifetime.

use std::sync::Arc;

use patchwire_core::RenderContext;
use patchwire_units::UnitRegistry;

use crate::config::{ConfigError, EngineConfig};

/// Sample rate, block capacity, channel count and the unit registry.
///
/// Built once from a validated [`EngineConfig`] and shared by the engine and
/// every control handle, so racks built on the control side always match the
/// engine they are sent to.
pub struct EngineContext {
    config: EngineConfig,
    registry: UnitRegistry,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("config", &self.config)
            .field("units", &self.registry.len())
            .finish()
    }
}

impl EngineContext {
    /// Validates `config` and builds the shared context.
    pub fn new(config: EngineConfig) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        Ok(Arc::new(Self {
            config,
            registry: UnitRegistry::new(),
        }))
    }

    /// The configuration this context was built from.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.config.sample_rate
    }

    /// Largest block the engine renders.
    pub fn max_block_frames(&self) -> usize {
        self.config.max_block_frames
    }

    /// Channel count of every port buffer.
    pub fn channels(&self) -> usize {
        self.config.channels
    }

    /// The unit registry.
    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    /// Render context for block `block`.
    pub fn render_context(&self, block: u64) -> RenderContext {
        RenderContext {
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
            block,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_config() {
        let config = EngineConfig {
            channels: 0,
            ..EngineConfig::default()
        };
        assert!(EngineContext::new(config).is_err());
    }

    #[test]
    fn render_context_carries_block() {
        let ctx = EngineContext::new(EngineConfig::default()).unwrap();
        let rc = ctx.render_context(7);
        assert_eq!(rc.block, 7);
        assert_eq!(rc.channels, 2);
        assert_eq!(rc.sample_rate, 48000.0);
        assert_eq!(ctx.registry().len(), 10);
    }
}
