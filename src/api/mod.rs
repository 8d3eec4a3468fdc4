//! Клиентский слой над `TableManager`.
//!
//! `execute` принимает `Command` (всё, что меняет столы и партии),
//! `run_query` отвечает на `Query`. Наружу уходят только DTO:
//! чужие руки и пароли столов в них не попадают. Ошибки движка
//! сворачиваются в `ApiError`.

pub mod commands;
pub mod dto;
pub mod errors;
pub mod queries;

pub use commands::*;
pub use dto::*;
pub use errors::*;
pub use queries::*;
