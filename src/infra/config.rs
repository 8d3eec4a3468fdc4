use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infra::rng_seed::RngSeed;

/// Ошибки чтения конфига движка.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Не удалось прочитать конфиг {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Некорректный конфиг: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Недопустимое значение {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Конфиг движка столов.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Лимит на один вызов модуля правил (initialize / validate / apply).
    pub rule_timeout_ms: u64,
    /// Сколько ждать замок стола, прежде чем вернуть ConcurrencyTimeout.
    pub lock_timeout_ms: u64,
    /// Базовый seed раздач. None: случайный при старте.
    pub master_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rule_timeout_ms: 2_000,
            lock_timeout_ms: 5_000,
            master_seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: EngineConfig = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rule_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "rule_timeout_ms",
                reason: "должно быть > 0".into(),
            });
        }
        if self.lock_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "lock_timeout_ms",
                reason: "должно быть > 0".into(),
            });
        }
        Ok(())
    }

    pub fn rule_timeout(&self) -> Duration {
        Duration::from_millis(self.rule_timeout_ms)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn master_seed(&self) -> RngSeed {
        match self.master_seed {
            Some(seed) => RngSeed::from_u64(seed),
            None => RngSeed::random(),
        }
    }
}
