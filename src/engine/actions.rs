use serde::{Deserialize, Serialize};

use crate::domain::{PlayerId, TableId};

/// Запрос на создание стола.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CreateTable {
    /// Имя стола (отображается в лобби).
    pub name: String,
    /// Имя модуля правил.
    pub rule: String,
    pub owner: PlayerId,
    #[serde(default)]
    pub is_private: bool,
    /// Пароль приватного стола. Для публичного игнорируется.
    #[serde(default)]
    pub secret: Option<String>,
}

/// Действие игрока, пришедшее от клиента.
///
/// Номера в запросе нет: его назначает секвенсор в момент коммита.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SubmitAction {
    pub table_id: TableId,
    pub player_id: PlayerId,
    /// Тег действия, например `play_cards`.
    pub action_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl SubmitAction {
    pub fn new(
        table_id: TableId,
        player_id: PlayerId,
        action_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            table_id,
            player_id,
            action_type: action_type.into(),
            payload,
        }
    }
}
