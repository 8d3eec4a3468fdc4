use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::{RuleMeta, RuleModuleRecord};
use crate::engine::errors::EngineError;
use crate::infra::persistence::GameStore;
use crate::rules::{four_color, ActionRegistry, LoadedRule, RuleError, RuleLogic};

/// Фабрика логики: по конфигу модуля строит реализацию.
pub type LogicFactory =
    Arc<dyn Fn(&serde_json::Value) -> Result<Arc<dyn RuleLogic>, RuleError> + Send + Sync>;

/// Загрузчик модулей правил.
///
/// - по имени модуля берёт запись из хранилища;
/// - по `record.logic` находит фабрику в каталоге;
/// - один раз строит реестр действий;
/// - кэширует успешную загрузку. Неудачная загрузка не кэшируется,
///   следующий вызов попробует снова.
pub struct RuleModuleLoader {
    store: Arc<dyn GameStore>,
    catalog: RwLock<HashMap<String, LogicFactory>>,
    cache: RwLock<HashMap<String, Arc<LoadedRule>>>,
}

impl RuleModuleLoader {
    /// Пустой каталог логики.
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self {
            store,
            catalog: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Каталог со встроенными играми.
    pub fn with_builtin_logic(store: Arc<dyn GameStore>) -> Self {
        let loader = Self::new(store);
        loader.register_logic(four_color::LOGIC_REF, |config: &serde_json::Value| {
            let logic: Arc<dyn RuleLogic> = Arc::new(four_color::FourColorCard::from_config(config)?);
            Ok(logic)
        });
        loader
    }

    /// Зарегистрировать реализацию логики под ключом `logic_ref`.
    pub fn register_logic<F>(&self, logic_ref: &str, factory: F)
    where
        F: Fn(&serde_json::Value) -> Result<Arc<dyn RuleLogic>, RuleError> + Send + Sync + 'static,
    {
        self.catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(logic_ref.to_string(), Arc::new(factory));
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Загрузить модуль по имени (из кэша, если уже был загружен).
    pub fn load(&self, name: &str) -> Result<Arc<LoadedRule>, EngineError> {
        if let Some(rule) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(Arc::clone(rule));
        }

        let record = self
            .store
            .load_rule(name)?
            .ok_or_else(|| EngineError::RuleNotFound(name.to_string()))?;

        let loaded = match self.build(record) {
            Ok(loaded) => Arc::new(loaded),
            Err(err) => {
                log::warn!("rule {name}: загрузка не удалась, повторим при следующем обращении: {err}");
                return Err(err);
            }
        };

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        // Параллельная загрузка могла успеть раньше, берём ту, что уже в кэше.
        let entry = cache
            .entry(name.to_string())
            .or_insert_with(|| Arc::clone(&loaded));
        log::debug!("rule {name}: модуль загружен ({:?})", entry);
        Ok(Arc::clone(entry))
    }

    fn build(&self, record: RuleModuleRecord) -> Result<LoadedRule, EngineError> {
        let load_error = |reason: String| EngineError::RuleModule {
            rule: record.name.clone(),
            entry_point: "load".to_string(),
            reason,
        };

        let factory = self
            .catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&record.logic)
            .cloned()
            .ok_or_else(|| load_error(format!("логика {:?} не найдена в каталоге", record.logic)))?;

        let meta = RuleMeta::from_config(&record.config).map_err(load_error)?;
        let logic = factory(&record.config).map_err(|e| load_error(e.to_string()))?;

        let mut actions = ActionRegistry::new();
        logic
            .register_actions(&mut actions)
            .map_err(|e| load_error(e.to_string()))?;

        if actions.is_empty() {
            return Err(EngineError::RuleProtocol(format!(
                "модуль {} не объявил ни одного действия",
                record.name
            )));
        }

        Ok(LoadedRule {
            record,
            meta,
            logic,
            actions,
        })
    }
}
