//! Движок игровых сессий для пошаговых карточных игр.
//!
//! Игроки садятся за стол, владелец запускает партию, дальше каждое
//! действие проходит через подключаемый модуль правил:
//! `validate` -> `apply` -> атомарный коммит состояния и записи лога.
//!
//! Слои:
//! - `domain` – карты, столы, состояние партии, действия;
//! - `rules` – модули правил, загрузчик, песочница, встроенная игра 四色牌;
//! - `engine` – реестр столов, секвенсор действий, лог и реплей;
//! - `infra` – хранилище, конфиг, RNG, засев правил;
//! - `api` – команды, запросы и DTO для клиента.

pub mod api;
pub mod bot;
pub mod domain;
pub mod engine;
pub mod infra;
pub mod rules;
