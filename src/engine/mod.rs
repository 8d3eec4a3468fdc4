//! Движок игровых сессий: столы, действия, лог.
//!
//! Высокоуровневый объект: `TableManager`
//! Основные операции:
//!   - `create_table` / `join` / `set_ready` / `request_start` – жизненный цикл стола
//!   - `submit` – принять действие игрока (validate -> apply -> коммит)
//!   - `replay` – восстановить состояние из лога

pub mod action_log;
pub mod actions;
pub mod context;
pub mod errors;
pub mod locks;
pub mod registry;
pub mod sequencer;
pub mod table_manager;

pub use actions::{CreateTable, SubmitAction};
pub use errors::{EngineError, ErrorKind};
pub use table_manager::TableManager;
