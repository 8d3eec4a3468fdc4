use crate::domain::{PlayerId, TableId};
use crate::infra::persistence::StorageError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Класс ошибки: по нему клиент решает, показывать ли её и можно ли повторить.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Стол / состояние / модуль правил не найдены.
    NotFound,
    /// Обычный отказ `validate`: не исключение.
    ValidationRejected,
    /// Ошибка загрузки или выполнения модуля правил.
    RuleModule,
    /// Модуль вернул результат неправильной формы.
    RuleProtocol,
    /// Не дождались замка стола или модуля: можно повторить.
    ConcurrencyTimeout,
    /// Ошибка хранилища: весь набор записей откатан.
    Storage,
    /// Команда не подходит к текущему статусу стола.
    Conflict,
    /// Нет прав.
    Forbidden,
    /// Некорректный запрос.
    BadRequest,
}

/// Ошибки движка столов.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Стол {0} не найден")]
    TableNotFound(TableId),

    #[error("У стола {0} нет состояния партии")]
    GameStateNotFound(TableId),

    #[error("Модуль правил {0:?} не найден")]
    RuleNotFound(String),

    #[error("Игрок {player_id} не сидит за столом {table_id}")]
    PlayerNotAtTable {
        table_id: TableId,
        player_id: PlayerId,
    },

    #[error("Стол {0} заполнен")]
    TableFull(TableId),

    #[error("К столу {0} уже нельзя присоединиться")]
    TableNotJoinable(TableId),

    #[error("Доступ запрещён: {0}")]
    Forbidden(String),

    #[error("Игрок {player_id} не владелец стола {table_id}")]
    NotOwner {
        table_id: TableId,
        player_id: PlayerId,
    },

    #[error("Стол не готов к старту: {0}")]
    NotReady(String),

    #[error("Партия за столом {0} уже запущена")]
    AlreadyStarted(TableId),

    #[error("Стол {0} не принимает действия")]
    TableClosed(TableId),

    #[error("Некорректный запрос: {0}")]
    BadRequest(String),

    #[error("Действие отклонено: {reason}")]
    ActionRejected { reason: String },

    #[error("Модуль {rule:?} не поддерживает действие {action_type:?} (нет {entry_point})")]
    UnsupportedAction {
        rule: String,
        action_type: String,
        entry_point: String,
    },

    #[error("Не удалось начать партию за столом {table_id}: {reason}")]
    RuleInit { table_id: TableId, reason: String },

    #[error("Ошибка модуля {rule:?} в {entry_point}: {reason}")]
    RuleModule {
        rule: String,
        entry_point: String,
        reason: String,
    },

    #[error("Модуль {rule:?}: {entry_point} не уложился в {timeout_ms} мс")]
    RuleTimeout {
        rule: String,
        entry_point: String,
        timeout_ms: u64,
    },

    #[error("Модуль правил нарушил протокол: {0}")]
    RuleProtocol(String),

    #[error("Не дождались очереди за столом {0}")]
    ConcurrencyTimeout(TableId),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Лог действий повреждён: {0}")]
    LogCorrupted(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        use EngineError::*;
        match self {
            TableNotFound(_) | GameStateNotFound(_) | RuleNotFound(_) | PlayerNotAtTable { .. } => {
                ErrorKind::NotFound
            }
            ActionRejected { .. } => ErrorKind::ValidationRejected,
            UnsupportedAction { .. } | RuleInit { .. } | RuleModule { .. } => ErrorKind::RuleModule,
            RuleProtocol(_) | LogCorrupted(_) => ErrorKind::RuleProtocol,
            RuleTimeout { .. } | ConcurrencyTimeout(_) => ErrorKind::ConcurrencyTimeout,
            Storage(_) | Internal(_) => ErrorKind::Storage,
            TableFull(_) | TableNotJoinable(_) | NotReady(_) | AlreadyStarted(_) | TableClosed(_) => {
                ErrorKind::Conflict
            }
            Forbidden(_) | NotOwner { .. } => ErrorKind::Forbidden,
            BadRequest(_) => ErrorKind::BadRequest,
        }
    }

    /// Можно ли повторить ту же команду без изменений.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::RuleTimeout { .. } | EngineError::ConcurrencyTimeout(_)
        )
    }
}
