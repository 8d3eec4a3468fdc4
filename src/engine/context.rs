use std::sync::Arc;

use crate::domain::{Table, TableId, TableStatus};
use crate::engine::errors::EngineError;
use crate::engine::locks::TableLocks;
use crate::infra::config::EngineConfig;
use crate::infra::ids::IdGenerator;
use crate::infra::persistence::GameStore;
use crate::infra::rng_seed::RngSeed;
use crate::rules::{RuleModuleLoader, RuleSandbox};

/// Всё, что делят между собой реестр, секвенсор и лог.
pub struct EngineContext {
    pub store: Arc<dyn GameStore>,
    pub loader: Arc<RuleModuleLoader>,
    pub sandbox: RuleSandbox,
    pub locks: TableLocks,
    pub ids: IdGenerator,
    pub master_seed: RngSeed,
}

impl EngineContext {
    /// Собрать контекст. Нумерация ID продолжается после того, что уже лежит в хранилище.
    pub fn new(
        store: Arc<dyn GameStore>,
        loader: Arc<RuleModuleLoader>,
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        let tables = store.list_tables()?;
        let last_table = tables.iter().map(|t| t.id).max().unwrap_or(0);
        let last_game_state = tables.iter().filter_map(|t| t.current_game).max().unwrap_or(0);

        Ok(Self {
            store,
            loader,
            sandbox: RuleSandbox::new(config.rule_timeout()),
            locks: TableLocks::new(config.lock_timeout()),
            ids: IdGenerator::starting_after(last_table, last_game_state),
            master_seed: config.master_seed(),
        })
    }

    pub fn load_table(&self, table_id: TableId) -> Result<Table, EngineError> {
        self.store
            .load_table(table_id)?
            .ok_or(EngineError::TableNotFound(table_id))
    }

    /// Стол в статусе Waiting, иначе `AlreadyStarted`.
    pub fn load_waiting_table(&self, table_id: TableId) -> Result<Table, EngineError> {
        let table = self.load_table(table_id)?;
        if table.status != TableStatus::Waiting {
            return Err(EngineError::AlreadyStarted(table_id));
        }
        Ok(table)
    }
}
