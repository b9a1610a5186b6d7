use crate::core::graph::connectivity::RotatableBounds;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Parameters of a search-based join.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinConfig {
    /// Number of evenly spaced angles sampled per rotatable edge.
    pub grid_steps: usize,
    /// Scale applied to summed contact radii before a pair counts as a
    /// clash; 1.0 means touching contact spheres overlap.
    pub contact_scale: f64,
    /// Bounds used when enumerating the rotatable edges of a junction.
    pub rotatable_bounds: RotatableBounds,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            grid_steps: 36,
            contact_scale: 0.8,
            rotatable_bounds: RotatableBounds::default(),
        }
    }
}

#[derive(Default)]
pub struct JoinConfigBuilder {
    grid_steps: Option<usize>,
    contact_scale: Option<f64>,
    rotatable_bounds: Option<RotatableBounds>,
}

impl JoinConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid_steps(mut self, steps: usize) -> Self {
        self.grid_steps = Some(steps);
        self
    }

    pub fn contact_scale(mut self, scale: f64) -> Self {
        self.contact_scale = Some(scale);
        self
    }

    pub fn rotatable_bounds(mut self, bounds: RotatableBounds) -> Self {
        self.rotatable_bounds = Some(bounds);
        self
    }

    pub fn build(self) -> Result<JoinConfig, ConfigError> {
        let defaults = JoinConfig::default();
        let config = JoinConfig {
            grid_steps: self.grid_steps.unwrap_or(defaults.grid_steps),
            contact_scale: self.contact_scale.unwrap_or(defaults.contact_scale),
            rotatable_bounds: self.rotatable_bounds.unwrap_or(defaults.rotatable_bounds),
        };
        if config.grid_steps == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "grid_steps",
                reason: "at least one sample per edge is required".to_string(),
            });
        }
        if config.contact_scale <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "contact_scale",
                reason: format!("must be positive, got {}", config.contact_scale),
            });
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_defaults_and_accepts_overrides() {
        let config = JoinConfigBuilder::new().grid_steps(72).build().unwrap();
        assert_eq!(config.grid_steps, 72);
        assert_eq!(config.contact_scale, JoinConfig::default().contact_scale);
    }

    #[test]
    fn degenerate_parameters_are_rejected() {
        assert!(matches!(
            JoinConfigBuilder::new().grid_steps(0).build(),
            Err(ConfigError::InvalidParameter {
                name: "grid_steps",
                ..
            })
        ));
        assert!(matches!(
            JoinConfigBuilder::new().contact_scale(-1.0).build(),
            Err(ConfigError::InvalidParameter {
                name: "contact_scale",
                ..
            })
        ));
    }
}
