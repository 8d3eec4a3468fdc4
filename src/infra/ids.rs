use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::{GameStateId, TableId};

/// Простая генерация ID на основе монотонных счётчиков.
///
/// Номера действий здесь НЕ выдаются: их назначает секвенсор
/// в момент коммита (last + 1 под замком стола).
#[derive(Debug)]
pub struct IdGenerator {
    table_counter: AtomicU64,
    game_state_counter: AtomicU64,
}

impl IdGenerator {
    /// Создать генератор с начальным значением 1 для всех сущностей.
    pub fn new() -> Self {
        Self::starting_after(0, 0)
    }

    /// Продолжить нумерацию после уже существующих записей (например, после загрузки хранилища).
    pub fn starting_after(last_table: TableId, last_game_state: GameStateId) -> Self {
        Self {
            table_counter: AtomicU64::new(last_table + 1),
            game_state_counter: AtomicU64::new(last_game_state + 1),
        }
    }

    #[inline]
    pub fn next_table_id(&self) -> TableId {
        self.table_counter.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn next_game_state_id(&self) -> GameStateId {
        self.game_state_counter.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
