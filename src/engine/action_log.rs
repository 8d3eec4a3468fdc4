//! Лог принятых действий: чтение и детерминированный реплей.
//!
//! Реплей = `initialize` с seed стола, затем `apply` каждого действия
//! по порядку номеров. `validate` не вызывается: в лог попадают только
//! уже проверенные действия.

use std::sync::Arc;

use crate::domain::{Action, GameState, SeqNo, TableId, TableStatus};
use crate::engine::context::EngineContext;
use crate::engine::errors::EngineError;
use crate::engine::registry::INITIALIZE_ENTRY_POINT;

/// Действия стола с номером > `after_seq`, по возрастанию.
pub fn list_since(
    ctx: &EngineContext,
    table_id: TableId,
    after_seq: SeqNo,
) -> Result<Vec<Action>, EngineError> {
    ctx.load_table(table_id)?;
    Ok(ctx.store.list_actions_since(table_id, after_seq)?)
}

/// Состояние после всех действий лога.
pub async fn replay(ctx: &EngineContext, table_id: TableId) -> Result<GameState, EngineError> {
    replay_until(ctx, table_id, None).await
}

/// Состояние сразу после действия `seq` (0: начальная раздача).
pub async fn replay_to(
    ctx: &EngineContext,
    table_id: TableId,
    seq: SeqNo,
) -> Result<GameState, EngineError> {
    replay_until(ctx, table_id, Some(seq)).await
}

async fn replay_until(
    ctx: &EngineContext,
    table_id: TableId,
    upto: Option<SeqNo>,
) -> Result<GameState, EngineError> {
    let table = ctx.load_table(table_id)?;
    if table.status == TableStatus::Waiting {
        return Err(EngineError::GameStateNotFound(table_id));
    }

    let actions = ctx.store.list_actions_since(table_id, 0)?;
    let last = actions.last().map(|a| a.sequence_number).unwrap_or(0);
    if let Some(seq) = upto {
        if seq > last {
            return Err(EngineError::BadRequest(format!(
                "в логе стола {table_id} нет действия #{seq} (последнее #{last})"
            )));
        }
    }

    let rule = ctx.loader.load(&table.rule)?;

    let mut state = {
        let loaded = Arc::clone(&rule);
        let members = table.members.clone();
        let seed = table.seed.clone();
        ctx.sandbox
            .run(rule.name(), INITIALIZE_ENTRY_POINT, move || {
                loaded.logic.initialize(&loaded.record.config, &members, &seed)
            })
            .await?
    };

    for (position, action) in actions.into_iter().enumerate() {
        if upto.is_some_and(|seq| action.sequence_number > seq) {
            break;
        }

        let expected_seq = position as SeqNo + 1;
        if action.sequence_number != expected_seq || action.state_version != position as u64 {
            return Err(EngineError::LogCorrupted(format!(
                "стол {table_id}: на позиции {position} действие #{} против версии {}, ожидалось #{expected_seq} против версии {position}",
                action.sequence_number, action.state_version
            )));
        }

        let handler = rule.handler(&action.action_type)?;
        let loaded = Arc::clone(&rule);
        let player_id = action.player_id;
        let payload = action.payload;
        state = ctx
            .sandbox
            .run(
                rule.name(),
                &action.action_type.apply_entry_point(),
                move || (handler.apply)(&loaded.record.config, &state, player_id, &payload),
            )
            .await?;
    }

    log::debug!("table {table_id}: реплей до #{} выполнен", upto.unwrap_or(last));
    Ok(state)
}
