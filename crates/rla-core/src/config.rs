use serde::{Deserialize, Serialize};

use crate::error::{AuditError, AuditResult};
use crate::risk::validate_risk_limit;

pub const DEFAULT_RISK_LIMIT: f64 = 0.1;
/// Shortest seed accepted for a public random selection.
pub const MIN_SEED_LENGTH: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub risk_limit: f64,
    pub min_seed_length: usize,
    /// Accept only seeds made of decimal digits (dice rolls).
    pub require_decimal_seed: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            risk_limit: DEFAULT_RISK_LIMIT,
            min_seed_length: MIN_SEED_LENGTH,
            require_decimal_seed: true,
        }
    }
}

impl AuditConfig {
    pub fn new(risk_limit: f64) -> AuditResult<Self> {
        let config = Self {
            risk_limit,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_slice(payload: &[u8]) -> AuditResult<Self> {
        let config: Self = serde_json::from_slice(payload)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AuditResult<()> {
        validate_risk_limit(self.risk_limit)?;
        Ok(())
    }

    pub fn validate_seed(&self, seed: &str) -> AuditResult<()> {
        let length = seed.chars().count();
        if length < self.min_seed_length {
            return Err(AuditError::InvalidSeed(format!(
                "seed has {length} characters, at least {} required",
                self.min_seed_length
            )));
        }
        if self.require_decimal_seed && !seed.chars().all(|c| c.is_ascii_digit()) {
            return Err(AuditError::InvalidSeed(
                "seed must consist of decimal digits".to_string(),
            ));
        }
        Ok(())
    }
}
