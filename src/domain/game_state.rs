use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::card::Card;
use crate::domain::deck::Deck;
use crate::domain::{GameStateId, PlayerId, TableId};

/// Ключ в `game_data`, по которому движок видит конец партии.
pub const TERMINAL_FLAG: &str = "game_ended";

/// Последний розыгрыш (сброс или добор).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LastPlay {
    pub player: PlayerId,
    pub cards: Vec<Card>,
    /// Что это было: "play" (сброс) или "draw" (добор из колоды).
    pub kind: String,
}

/// Завершённая комбинация игрока («мелд»).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Meld {
    pub kind: String,
    pub cards: Vec<Card>,
    pub points: i64,
}

/// Состояние партии, которое видит модуль правил.
///
/// Модуль правил получает его на вход и возвращает новое целиком;
/// движок никогда не правит отдельные поля.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct GameState {
    pub round: u32,
    /// Порядок мест (совпадает с порядком участников стола).
    pub players: Vec<PlayerId>,
    pub current_turn: Option<PlayerId>,
    pub hands: BTreeMap<PlayerId, Vec<Card>>,
    pub draw_pile: Deck,
    pub discard_pile: Vec<Card>,
    pub last_play: Option<LastPlay>,
    pub melds: BTreeMap<PlayerId, Vec<Meld>>,
    /// Непрозрачные данные модуля правил.
    #[serde(default)]
    pub game_data: serde_json::Value,
}

impl GameState {
    /// Поставлен ли модулем правил флаг конца партии.
    pub fn is_terminal(&self) -> bool {
        self.game_data
            .get(TERMINAL_FLAG)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    pub fn hand(&self, player_id: PlayerId) -> &[Card] {
        self.hands.get(&player_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Сколько карт всего в игре: руки + колода + сброс + мелды.
    pub fn unit_count(&self) -> usize {
        let in_hands: usize = self.hands.values().map(Vec::len).sum();
        let in_melds: usize = self
            .melds
            .values()
            .flat_map(|m| m.iter())
            .map(|m| m.cards.len())
            .sum();
        in_hands + self.draw_pile.len() + self.discard_pile.len() + in_melds
    }

    /// Следующий по кругу после `player_id`.
    pub fn next_player(&self, player_id: PlayerId) -> Option<PlayerId> {
        let idx = self.players.iter().position(|&p| p == player_id)?;
        self.players.get((idx + 1) % self.players.len()).copied()
    }

    /// Предыдущий по кругу перед `player_id`.
    pub fn previous_player(&self, player_id: PlayerId) -> Option<PlayerId> {
        let idx = self.players.iter().position(|&p| p == player_id)?;
        let len = self.players.len();
        self.players.get((idx + len - 1) % len).copied()
    }

    /// Структурная проверка результата модуля правил относительно состава стола.
    ///
    /// Возвращает описание первого нарушения.
    pub fn check_shape(&self, members: &[PlayerId]) -> Result<(), String> {
        if self.players != members {
            return Err(format!(
                "порядок мест {:?} не совпадает с участниками стола {:?}",
                self.players, members
            ));
        }

        let allowed: BTreeSet<PlayerId> = members.iter().copied().collect();

        if let Some(turn) = self.current_turn {
            if !allowed.contains(&turn) {
                return Err(format!("ход у игрока {turn}, которого нет за столом"));
            }
        }

        if let Some(stranger) = self.hands.keys().find(|p| !allowed.contains(p)) {
            return Err(format!("рука у игрока {stranger}, которого нет за столом"));
        }

        if let Some(stranger) = self.melds.keys().find(|p| !allowed.contains(p)) {
            return Err(format!("мелды у игрока {stranger}, которого нет за столом"));
        }

        if !self.game_data.is_null() && !self.game_data.is_object() {
            return Err("game_data должен быть объектом".into());
        }

        Ok(())
    }
}

/// Сохранённая запись состояния: одна на стол, заменяется целиком.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GameStateRecord {
    pub id: GameStateId,
    pub table_id: TableId,
    /// 0 сразу после initialize, +1 на каждое принятое действие.
    pub version: u64,
    pub state: GameState,
}

impl GameStateRecord {
    pub fn initial(id: GameStateId, table_id: TableId, state: GameState) -> Self {
        Self {
            id,
            table_id,
            version: 0,
            state,
        }
    }

    /// Следующая версия той же записи с новым содержимым.
    pub fn successor(&self, state: GameState) -> Self {
        Self {
            id: self.id,
            table_id: self.table_id,
            version: self.version + 1,
            state,
        }
    }
}
