// src/engine/table_manager.rs

use std::sync::Arc;

use crate::domain::{Action, GameState, GameStateRecord, PlayerId, SeqNo, Table, TableId};
use crate::engine::actions::{CreateTable, SubmitAction};
use crate::engine::context::EngineContext;
use crate::engine::errors::EngineError;
use crate::engine::{action_log, registry, sequencer};
use crate::infra::config::EngineConfig;
use crate::infra::persistence::GameStore;
use crate::rules::RuleModuleLoader;

/// Менеджер столов: единый фасад движка:
/// - реестр столов (создание, вход, готовность, старт, удаление);
/// - секвенсор действий (`submit`);
/// - лог действий и реплей.
///
/// Дёшево клонируется: все клоны смотрят в одно хранилище и одни замки.
#[derive(Clone)]
pub struct TableManager {
    ctx: Arc<EngineContext>,
}

impl TableManager {
    /// Менеджер поверх хранилища и загрузчика правил.
    pub fn new(
        store: Arc<dyn GameStore>,
        loader: Arc<RuleModuleLoader>,
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            ctx: Arc::new(EngineContext::new(store, loader, config)?),
        })
    }

    /// Менеджер со встроенным каталогом логики.
    pub fn with_builtin_rules(store: Arc<dyn GameStore>, config: &EngineConfig) -> Result<Self, EngineError> {
        let loader = Arc::new(RuleModuleLoader::with_builtin_logic(Arc::clone(&store)));
        Self::new(store, loader, config)
    }

    pub fn loader(&self) -> &RuleModuleLoader {
        &self.ctx.loader
    }

    pub fn store(&self) -> &dyn GameStore {
        self.ctx.store.as_ref()
    }

    /// Сколько столов держат замок в памяти.
    pub fn tracked_locks(&self) -> usize {
        self.ctx.locks.tracked()
    }

    // --- Реестр столов ---

    pub async fn create_table(&self, request: CreateTable) -> Result<Table, EngineError> {
        registry::create_table(&self.ctx, request).await
    }

    pub async fn join(
        &self,
        table_id: TableId,
        player_id: PlayerId,
        secret: Option<&str>,
    ) -> Result<Table, EngineError> {
        registry::join(&self.ctx, table_id, player_id, secret).await
    }

    pub async fn leave(&self, table_id: TableId, player_id: PlayerId) -> Result<Table, EngineError> {
        registry::leave(&self.ctx, table_id, player_id).await
    }

    pub async fn set_ready(
        &self,
        table_id: TableId,
        player_id: PlayerId,
        ready: bool,
    ) -> Result<Table, EngineError> {
        registry::set_ready(&self.ctx, table_id, player_id, ready).await
    }

    pub async fn request_start(
        &self,
        table_id: TableId,
        requester: PlayerId,
    ) -> Result<(Table, GameStateRecord), EngineError> {
        registry::request_start(&self.ctx, table_id, requester).await
    }

    pub async fn delete_table(&self, table_id: TableId, requester: PlayerId) -> Result<(), EngineError> {
        registry::delete_table(&self.ctx, table_id, requester).await
    }

    // --- Действия ---

    pub async fn submit(&self, request: SubmitAction) -> Result<Action, EngineError> {
        sequencer::submit(Arc::clone(&self.ctx), request).await
    }

    // --- Чтение ---

    pub fn table(&self, table_id: TableId) -> Result<Table, EngineError> {
        self.ctx.load_table(table_id)
    }

    pub fn list_tables(&self) -> Result<Vec<Table>, EngineError> {
        Ok(self.ctx.store.list_tables()?)
    }

    pub fn game_state(&self, table_id: TableId) -> Result<GameStateRecord, EngineError> {
        self.ctx.load_table(table_id)?;
        self.ctx
            .store
            .load_game_state(table_id)?
            .ok_or(EngineError::GameStateNotFound(table_id))
    }

    pub fn actions_since(&self, table_id: TableId, after_seq: SeqNo) -> Result<Vec<Action>, EngineError> {
        action_log::list_since(&self.ctx, table_id, after_seq)
    }

    pub async fn replay(&self, table_id: TableId) -> Result<GameState, EngineError> {
        action_log::replay(&self.ctx, table_id).await
    }

    pub async fn replay_to(&self, table_id: TableId, seq: SeqNo) -> Result<GameState, EngineError> {
        action_log::replay_to(&self.ctx, table_id, seq).await
    }
}
