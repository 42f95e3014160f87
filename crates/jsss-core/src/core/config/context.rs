use anyhow::Result;

use crate::core::config::{Config, ConfigOverrides, GlobalOptions};
use crate::core::effects::{Effects, SharedEffects, SystemEffects};

/// Everything a command handler needs: options, configuration, effects.
pub struct CommandContext<'a> {
    pub global: &'a GlobalOptions,
    config: Config,
    effects: SharedEffects,
}

impl<'a> CommandContext<'a> {
    /// Loads configuration and wires the real storage/origin/archive effects.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be prepared.
    pub fn new(global: &'a GlobalOptions, overrides: &ConfigOverrides) -> Result<Self> {
        let config = Config::load(overrides)?;
        let effects = SystemEffects::shared(config.http_timeout())?;
        Ok(Self::with_parts(global, config, effects))
    }

    #[must_use]
    pub fn with_parts(global: &'a GlobalOptions, config: Config, effects: SharedEffects) -> Self {
        Self {
            global,
            config,
            effects,
        }
    }

    pub fn effects(&self) -> &dyn Effects {
        self.effects.as_ref()
    }

    pub fn shared_effects(&self) -> &SharedEffects {
        &self.effects
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
