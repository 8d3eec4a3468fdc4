use serde::{Deserialize, Serialize};

use crate::engine::{EngineError, ErrorKind};

/// Ошибки внешнего API (то, что отдаём клиенту).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum ApiError {
    /// Неправильные входные данные (например, битый JSON).
    BadRequest(String),

    /// Стол / состояние / модуль правил не найдены.
    NotFound(String),

    /// Модуль правил отклонил действие. Это нормальный ответ, не сбой.
    Rejected(String),

    /// Команда не подходит к текущему статусу стола.
    Conflict(String),

    /// Нет прав на команду.
    Forbidden(String),

    /// Можно повторить позже (таймаут замка или модуля).
    Retry(String),

    /// Сбой модуля правил или хранилища.
    Internal(String),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        if err.is_retryable() {
            return ApiError::Retry(err.to_string());
        }
        let message = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => ApiError::NotFound(message),
            ErrorKind::ValidationRejected => ApiError::Rejected(message),
            ErrorKind::Conflict => ApiError::Conflict(message),
            ErrorKind::Forbidden => ApiError::Forbidden(message),
            ErrorKind::BadRequest => ApiError::BadRequest(message),
            ErrorKind::ConcurrencyTimeout => ApiError::Retry(message),
            ErrorKind::RuleModule | ErrorKind::RuleProtocol | ErrorKind::Storage => {
                ApiError::Internal(message)
            }
        }
    }
}
