use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Вид карты по умолчанию.
pub const REGULAR_KIND: &str = "regular";

/// Игровая единица («карта»).
///
/// Движок не знает, какие масти и ранги бывают в конкретной игре:
/// модуль правил кодирует колоду строками `suit` / `rank`,
/// а `kind` различает обычные и особые карты.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Card {
    pub suit: String,
    pub rank: String,
    #[serde(default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    REGULAR_KIND.to_string()
}

impl Card {
    pub fn new(suit: impl Into<String>, rank: impl Into<String>) -> Self {
        Self {
            suit: suit.into(),
            rank: rank.into(),
            kind: default_kind(),
        }
    }

    pub fn with_kind(suit: impl Into<String>, rank: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            suit: suit.into(),
            rank: rank.into(),
            kind: kind.into(),
        }
    }

    /// Та же масть и тот же ранг (вид не учитывается, так сравнивают карты при розыгрыше).
    pub fn same_face(&self, other: &Card) -> bool {
        self.suit == other.suit && self.rank == other.rank
    }

    pub fn is_regular(&self) -> bool {
        self.kind == REGULAR_KIND
    }
}

impl fmt::Display for Card {
    /// Формат вида `red:车` или `red:公#jin_tiao`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_regular() {
            write!(f, "{}:{}", self.suit, self.rank)
        } else {
            write!(f, "{}:{}#{}", self.suit, self.rank, self.kind)
        }
    }
}

/// Парсинг строки вида `red:车` / `red:公#jin_tiao`.
impl FromStr for Card {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (face, kind) = match s.split_once('#') {
            Some((face, kind)) if !kind.is_empty() => (face, kind),
            Some(_) => return Err(format!("Пустой вид карты: {s}")),
            None => (s, REGULAR_KIND),
        };

        let (suit, rank) = face
            .split_once(':')
            .ok_or_else(|| format!("Карта должна иметь вид suit:rank, получено: {s}"))?;

        if suit.is_empty() || rank.is_empty() {
            return Err(format!("Пустая масть или ранг: {s}"));
        }

        Ok(Card::with_kind(suit, rank, kind))
    }
}

/// Убрать из руки одну карту с тем же лицом. Возвращает убранную карту.
pub fn take_matching(hand: &mut Vec<Card>, wanted: &Card) -> Option<Card> {
    let idx = hand.iter().position(|c| c.same_face(wanted))?;
    Some(hand.remove(idx))
}

/// Сколько карт в руке совпадает по лицу с `wanted`.
pub fn count_matching(hand: &[Card], wanted: &Card) -> usize {
    hand.iter().filter(|c| c.same_face(wanted)).count()
}
