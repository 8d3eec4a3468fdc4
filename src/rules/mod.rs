//! Подключаемые модули правил.
//!
//! Модуль правил: это три чистые функции над данными:
//!   - `initialize(config, members, seed) -> GameState`
//!   - `validate<Type>(config, state, player, payload) -> Verdict`
//!   - `apply<Type>(config, state, player, payload) -> GameState`
//!
//! Вместо поиска функции по имени (`validate` + PascalCase(type)) каждый
//! модуль один раз при загрузке заполняет `ActionRegistry`: тег действия ->
//! пара (validate, apply). Имена точек входа остаются только для диагностики.
//!
//! Все вызовы идут через `RuleSandbox`: отдельная blocking-задача,
//! лимит времени, перехват паники.

pub mod four_color;
pub mod loader;
pub mod sandbox;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ActionType, GameState, PlayerId, RuleMeta, RuleModuleRecord};
use crate::engine::errors::EngineError;
use crate::infra::rng_seed::RngSeed;

pub use loader::{LogicFactory, RuleModuleLoader};
pub use sandbox::RuleSandbox;

/// Ошибки внутри модуля правил.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Некорректный конфиг правил: {0}")]
    InvalidConfig(String),

    #[error("Состояние партии не соответствует правилам: {0}")]
    InvalidState(String),

    #[error("Некорректные данные действия: {0}")]
    InvalidPayload(String),
}

/// Результат проверки действия.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    pub valid: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Verdict {
    pub fn accept() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

pub type ValidateFn =
    fn(&serde_json::Value, &GameState, PlayerId, &serde_json::Value) -> Result<Verdict, RuleError>;

pub type ApplyFn =
    fn(&serde_json::Value, &GameState, PlayerId, &serde_json::Value) -> Result<GameState, RuleError>;

/// Пара функций одного типа действия.
#[derive(Clone, Copy, Debug)]
pub struct ActionHandler {
    pub validate: ValidateFn,
    pub apply: ApplyFn,
}

/// Реестр действий модуля: тег -> (validate, apply).
#[derive(Clone, Debug, Default)]
pub struct ActionRegistry {
    handlers: BTreeMap<ActionType, ActionHandler>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tag: &str, validate: ValidateFn, apply: ApplyFn) -> Result<(), RuleError> {
        let action_type = ActionType::parse(tag).map_err(RuleError::InvalidConfig)?;
        if self.handlers.contains_key(&action_type) {
            return Err(RuleError::InvalidConfig(format!(
                "действие {tag} зарегистрировано дважды"
            )));
        }
        self.handlers.insert(action_type, ActionHandler { validate, apply });
        Ok(())
    }

    pub fn get(&self, action_type: &ActionType) -> Option<ActionHandler> {
        self.handlers.get(action_type).copied()
    }

    pub fn action_types(&self) -> impl Iterator<Item = &ActionType> {
        self.handlers.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Реализация логики игры.
pub trait RuleLogic: Send + Sync {
    /// Начальное состояние партии. Должно быть детерминированным при одинаковом seed.
    fn initialize(
        &self,
        config: &serde_json::Value,
        members: &[PlayerId],
        seed: &RngSeed,
    ) -> Result<GameState, RuleError>;

    /// Заполнить реестр поддерживаемых действий.
    fn register_actions(&self, actions: &mut ActionRegistry) -> Result<(), RuleError>;
}

/// Загруженный и закэшированный модуль правил.
pub struct LoadedRule {
    pub record: RuleModuleRecord,
    pub meta: RuleMeta,
    pub logic: Arc<dyn RuleLogic>,
    pub actions: ActionRegistry,
}

impl LoadedRule {
    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Найти обработчик действия. Нет обработчика, нет точки входа.
    pub fn handler(&self, action_type: &ActionType) -> Result<ActionHandler, EngineError> {
        self.actions
            .get(action_type)
            .ok_or_else(|| EngineError::UnsupportedAction {
                rule: self.record.name.clone(),
                action_type: action_type.to_string(),
                entry_point: action_type.validate_entry_point(),
            })
    }
}

impl std::fmt::Debug for LoadedRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedRule")
            .field("name", &self.record.name)
            .field("logic", &self.record.logic)
            .field("meta", &self.meta)
            .field("actions", &self.actions.action_types().collect::<Vec<_>>())
            .finish()
    }
}
