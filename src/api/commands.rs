use serde::{Deserialize, Serialize};

use crate::domain::{PlayerId, TableId};
use crate::engine::{CreateTable, SubmitAction, TableManager};

use super::dto::{ActionDto, GameStateViewDto, TableViewDto};
use super::errors::ApiError;

/// Команда верхнего уровня (всё, что меняет состояние).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Command {
    /// Создать новый стол.
    CreateTable(CreateTable),

    /// Операция над существующим столом.
    TableCommand(TableCommand),
}

/// Команды, которые относятся к существующему столу.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum TableCommand {
    /// Сесть за стол (для приватного: с паролем).
    Join {
        table_id: TableId,
        player_id: PlayerId,
        #[serde(default)]
        secret: Option<String>,
    },

    /// Выйти из-за стола до начала партии.
    Leave { table_id: TableId, player_id: PlayerId },

    /// Отметить готовность.
    SetReady {
        table_id: TableId,
        player_id: PlayerId,
        ready: bool,
    },

    /// Владелец запускает партию.
    RequestStart { table_id: TableId, requester: PlayerId },

    /// Действие игрока в партии.
    SubmitAction(SubmitAction),

    /// Удалить стол (владелец, не во время партии).
    DeleteTable { table_id: TableId, requester: PlayerId },
}

/// Ответ на команду.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum CommandResponse {
    Table(TableViewDto),
    /// Старт партии: стол + начальное состояние глазами владельца.
    Started {
        table: TableViewDto,
        game: GameStateViewDto,
    },
    ActionAccepted(ActionDto),
    Deleted(TableId),
}

/// Выполнить команду через менеджер столов.
pub async fn execute(manager: &TableManager, command: Command) -> Result<CommandResponse, ApiError> {
    let response = match command {
        Command::CreateTable(request) => {
            let table = manager.create_table(request).await?;
            CommandResponse::Table(TableViewDto::from_table(&table))
        }
        Command::TableCommand(cmd) => execute_table_command(manager, cmd).await?,
    };
    Ok(response)
}

async fn execute_table_command(
    manager: &TableManager,
    command: TableCommand,
) -> Result<CommandResponse, ApiError> {
    let response = match command {
        TableCommand::Join {
            table_id,
            player_id,
            secret,
        } => {
            let table = manager.join(table_id, player_id, secret.as_deref()).await?;
            CommandResponse::Table(TableViewDto::from_table(&table))
        }
        TableCommand::Leave {
            table_id,
            player_id,
        } => {
            let table = manager.leave(table_id, player_id).await?;
            CommandResponse::Table(TableViewDto::from_table(&table))
        }
        TableCommand::SetReady {
            table_id,
            player_id,
            ready,
        } => {
            let table = manager.set_ready(table_id, player_id, ready).await?;
            CommandResponse::Table(TableViewDto::from_table(&table))
        }
        TableCommand::RequestStart {
            table_id,
            requester,
        } => {
            let (table, record) = manager.request_start(table_id, requester).await?;
            CommandResponse::Started {
                table: TableViewDto::from_table(&table),
                game: GameStateViewDto::for_viewer(&record, Some(requester)),
            }
        }
        TableCommand::SubmitAction(request) => {
            let action = manager.submit(request).await?;
            CommandResponse::ActionAccepted(ActionDto::from(&action))
        }
        TableCommand::DeleteTable {
            table_id,
            requester,
        } => {
            manager.delete_table(table_id, requester).await?;
            CommandResponse::Deleted(table_id)
        }
    };
    Ok(response)
}
