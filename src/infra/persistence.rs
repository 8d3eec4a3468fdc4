use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use crate::domain::{
    Action, GameStateRecord, RuleModuleRecord, SeqNo, Table, TableId,
};

/// Ошибки хранилища.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Версия состояния стола {table_id}: ожидалась {expected:?}, в хранилище {found:?}")]
    VersionConflict {
        table_id: TableId,
        expected: Option<u64>,
        found: Option<u64>,
    },

    #[error("Номер действия на столе {table_id}: ожидался {expected}, пришёл {got}")]
    SequenceConflict {
        table_id: TableId,
        expected: SeqNo,
        got: SeqNo,
    },

    #[error("Стол {0} не найден в хранилище")]
    MissingTable(TableId),

    #[error("Хранилище недоступно: {0}")]
    Unavailable(String),
}

/// Набор записей, который фиксируется атомарно: либо всё, либо ничего.
#[derive(Clone, Debug, Default)]
pub struct CommitBatch {
    /// Новая версия стола (статус, current_game, участники).
    pub table: Option<Table>,
    /// Новая запись состояния (заменяет старую целиком).
    pub game_state: Option<GameStateRecord>,
    /// Compare-and-swap: какая версия состояния должна лежать сейчас.
    /// `Some(None)`: состояния ещё не должно быть (initialize).
    pub expected_state_version: Option<Option<u64>>,
    /// Принятое действие для лога.
    pub action: Option<Action>,
}

impl CommitBatch {
    fn table_id(&self) -> Option<TableId> {
        self.table
            .as_ref()
            .map(|t| t.id)
            .or_else(|| self.game_state.as_ref().map(|s| s.table_id))
            .or_else(|| self.action.as_ref().map(|a| a.table_id))
    }
}

/// Абстракция хранилища записей (модули правил, столы, состояния, лог действий).
///
/// Внешняя record-store система реализует этот трейт; для тестов и
/// локального запуска есть `InMemoryGameStore`.
pub trait GameStore: Send + Sync {
    fn load_rule(&self, name: &str) -> Result<Option<RuleModuleRecord>, StorageError>;

    /// Вставить модуль правил, если модуля с таким именем ещё нет.
    /// Возвращает true, если вставили.
    fn insert_rule_if_absent(&self, rule: RuleModuleRecord) -> Result<bool, StorageError>;

    fn load_table(&self, id: TableId) -> Result<Option<Table>, StorageError>;

    fn list_tables(&self) -> Result<Vec<Table>, StorageError>;

    /// Сохранить стол без изменения состояния партии (участники, готовность).
    fn save_table(&self, table: &Table) -> Result<(), StorageError>;

    fn load_game_state(&self, table_id: TableId) -> Result<Option<GameStateRecord>, StorageError>;

    /// Номер последнего принятого действия (0, если действий нет).
    fn last_sequence_number(&self, table_id: TableId) -> Result<SeqNo, StorageError>;

    /// Действия с номером > `after`, по возрастанию номера.
    fn list_actions_since(&self, table_id: TableId, after: SeqNo) -> Result<Vec<Action>, StorageError>;

    /// Атомарная фиксация набора записей.
    fn commit(&self, batch: CommitBatch) -> Result<(), StorageError>;

    /// Удалить стол каскадно вместе с состоянием и логом.
    fn delete_table(&self, id: TableId) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
struct Inner {
    rules: HashMap<String, RuleModuleRecord>,
    tables: BTreeMap<TableId, Table>,
    game_states: HashMap<TableId, GameStateRecord>,
    actions: HashMap<TableId, Vec<Action>>,
}

/// Простая in-memory реализация для тестов и локального запуска.
///
/// Все записи под одним RwLock: `commit` проверяет CAS и номер действия,
/// и только потом пишет, поэтому частичный коммит невозможен.
#[derive(Debug, Default)]
pub struct InMemoryGameStore {
    inner: RwLock<Inner>,
}

impl InMemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StorageError> {
        self.inner
            .read()
            .map_err(|_| StorageError::Unavailable("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StorageError> {
        self.inner
            .write()
            .map_err(|_| StorageError::Unavailable("lock poisoned".into()))
    }
}

impl GameStore for InMemoryGameStore {
    fn load_rule(&self, name: &str) -> Result<Option<RuleModuleRecord>, StorageError> {
        Ok(self.read()?.rules.get(name).cloned())
    }

    fn insert_rule_if_absent(&self, rule: RuleModuleRecord) -> Result<bool, StorageError> {
        let mut inner = self.write()?;
        if inner.rules.contains_key(&rule.name) {
            return Ok(false);
        }
        inner.rules.insert(rule.name.clone(), rule);
        Ok(true)
    }

    fn load_table(&self, id: TableId) -> Result<Option<Table>, StorageError> {
        Ok(self.read()?.tables.get(&id).cloned())
    }

    fn list_tables(&self) -> Result<Vec<Table>, StorageError> {
        Ok(self.read()?.tables.values().cloned().collect())
    }

    fn save_table(&self, table: &Table) -> Result<(), StorageError> {
        self.write()?.tables.insert(table.id, table.clone());
        Ok(())
    }

    fn load_game_state(&self, table_id: TableId) -> Result<Option<GameStateRecord>, StorageError> {
        Ok(self.read()?.game_states.get(&table_id).cloned())
    }

    fn last_sequence_number(&self, table_id: TableId) -> Result<SeqNo, StorageError> {
        Ok(self
            .read()?
            .actions
            .get(&table_id)
            .and_then(|log| log.last())
            .map(|a| a.sequence_number)
            .unwrap_or(0))
    }

    fn list_actions_since(&self, table_id: TableId, after: SeqNo) -> Result<Vec<Action>, StorageError> {
        Ok(self
            .read()?
            .actions
            .get(&table_id)
            .map(|log| {
                log.iter()
                    .filter(|a| a.sequence_number > after)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn commit(&self, batch: CommitBatch) -> Result<(), StorageError> {
        let Some(table_id) = batch.table_id() else {
            return Ok(());
        };

        let mut inner = self.write()?;

        // 1. Проверки. До первой записи.
        if !inner.tables.contains_key(&table_id) {
            return Err(StorageError::MissingTable(table_id));
        }

        if let Some(expected) = batch.expected_state_version {
            let found = inner.game_states.get(&table_id).map(|s| s.version);
            if found != expected {
                return Err(StorageError::VersionConflict {
                    table_id,
                    expected,
                    found,
                });
            }
        }

        if let Some(action) = &batch.action {
            let last = inner
                .actions
                .get(&table_id)
                .and_then(|log| log.last())
                .map(|a| a.sequence_number)
                .unwrap_or(0);
            if action.sequence_number != last + 1 {
                return Err(StorageError::SequenceConflict {
                    table_id,
                    expected: last + 1,
                    got: action.sequence_number,
                });
            }
        }

        // 2. Запись.
        if let Some(record) = batch.game_state {
            inner.game_states.insert(table_id, record);
        }
        if let Some(action) = batch.action {
            inner.actions.entry(table_id).or_default().push(action);
        }
        if let Some(table) = batch.table {
            inner.tables.insert(table_id, table);
        }

        Ok(())
    }

    fn delete_table(&self, id: TableId) -> Result<(), StorageError> {
        let mut inner = self.write()?;
        if inner.tables.remove(&id).is_none() {
            return Err(StorageError::MissingTable(id));
        }
        inner.game_states.remove(&id);
        inner.actions.remove(&id);
        Ok(())
    }
}
