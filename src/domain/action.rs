use core::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{GameStateId, PlayerId, SeqNo, TableId};

/// Тип действия: lower_snake_case тег, например `play_cards`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct ActionType(String);

impl ActionType {
    /// Проверить и обернуть тег: `[a-z][a-z0-9]*(_[a-z0-9]+)*`.
    pub fn parse(tag: &str) -> Result<Self, String> {
        let valid_tokens = !tag.is_empty()
            && tag.split('_').all(|tok| {
                !tok.is_empty()
                    && tok
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            });
        let starts_with_letter = tag.chars().next().is_some_and(|c| c.is_ascii_lowercase());

        if valid_tokens && starts_with_letter {
            Ok(Self(tag.to_string()))
        } else {
            Err(format!("Некорректный тип действия: {tag:?}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `play_cards` -> `PlayCards`: первая буква и буква после каждого `_` заглавные.
    pub fn pascal_case(&self) -> String {
        let mut out = String::with_capacity(self.0.len());
        let mut upper = true;
        for c in self.0.chars() {
            if c == '_' {
                upper = true;
            } else if upper {
                out.push(c.to_ascii_uppercase());
                upper = false;
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Имя точки входа проверки: `validatePlayCards`.
    pub fn validate_entry_point(&self) -> String {
        format!("validate{}", self.pascal_case())
    }

    /// Имя точки входа применения: `applyPlayCards`.
    pub fn apply_entry_point(&self) -> String {
        format!("apply{}", self.pascal_case())
    }
}

impl TryFrom<String> for ActionType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ActionType> for String {
    fn from(value: ActionType) -> Self {
        value.0
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Принятое действие игрока. После записи не меняется.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Action {
    pub table_id: TableId,
    pub sequence_number: SeqNo,
    /// Запись состояния, против которой действие проверялось.
    pub game_state_id: GameStateId,
    /// Версия этого состояния ДО применения действия.
    pub state_version: u64,
    pub player_id: PlayerId,
    pub action_type: ActionType,
    pub payload: serde_json::Value,
}
