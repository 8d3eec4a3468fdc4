//! Доменная модель платформы: карты, столы, состояние партии, действия, правила.

pub mod action;
pub mod card;
pub mod deck;
pub mod game_state;
pub mod rule;
pub mod table;

// Базовые идентификаторы.
pub type PlayerId = u64;
pub type TableId = u64;
pub type GameStateId = u64;
/// Порядковый номер принятого действия внутри стола (начинается с 1).
pub type SeqNo = u64;

// Удобные реэкспорты, чтобы в других модулях писать crate::domain::Card и т.п.
pub use action::*;
pub use card::*;
pub use deck::*;
pub use game_state::*;
pub use rule::*;
pub use table::*;
