use serde::{Deserialize, Serialize};

use crate::domain::{PlayerId, SeqNo, TableId};
use crate::engine::TableManager;

use super::dto::{ActionDto, GameStateViewDto, TableViewDto};
use super::errors::ApiError;

/// Запросы "только чтение".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Query {
    /// Получить стол.
    GetTable { table_id: TableId },

    /// Список столов (для лобби).
    ListTables,

    /// Состояние партии глазами `viewer` (None: зритель, рук не видно).
    GetGameState {
        table_id: TableId,
        #[serde(default)]
        viewer: Option<PlayerId>,
    },

    /// Действия с номером > `after_seq`.
    ListActions { table_id: TableId, after_seq: SeqNo },
}

/// Результат запроса "только чтение".
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum QueryResponse {
    Table(TableViewDto),
    Tables(Vec<TableViewDto>),
    GameState(GameStateViewDto),
    Actions(Vec<ActionDto>),
}

pub fn run_query(manager: &TableManager, query: Query) -> Result<QueryResponse, ApiError> {
    let response = match query {
        Query::GetTable { table_id } => {
            QueryResponse::Table(TableViewDto::from_table(&manager.table(table_id)?))
        }
        Query::ListTables => QueryResponse::Tables(
            manager
                .list_tables()?
                .iter()
                .map(TableViewDto::from_table)
                .collect(),
        ),
        Query::GetGameState { table_id, viewer } => {
            let record = manager.game_state(table_id)?;
            // Руки видят только участники стола.
            let viewer = viewer.filter(|p| record.state.players.contains(p));
            QueryResponse::GameState(GameStateViewDto::for_viewer(&record, viewer))
        }
        Query::ListActions {
            table_id,
            after_seq,
        } => QueryResponse::Actions(
            manager
                .actions_since(table_id, after_seq)?
                .iter()
                .map(ActionDto::from)
                .collect(),
        ),
    };
    Ok(response)
}
