use serde::{Deserialize, Serialize};

use crate::domain::card::Card;

/// Колода (прикуп). В домене это просто упорядоченный список карт,
/// верх колоды в начале вектора.
/// Перемешивание делает модуль правил (через RNG из infra), НЕ здесь.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Deck {
    pub cards: Vec<Card>,
}

impl Deck {
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Взять одну карту сверху колоды.
    pub fn draw_one(&mut self) -> Option<Card> {
        if self.cards.is_empty() {
            None
        } else {
            Some(self.cards.remove(0))
        }
    }

    /// Взять n карт сверху (меньше, если колода кончилась).
    pub fn draw_n(&mut self, n: usize) -> Vec<Card> {
        let n = n.min(self.cards.len());
        self.cards.drain(..n).collect()
    }
}
