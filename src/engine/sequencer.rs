//! Секвенсор действий: единственная точка записи в партию.
//!
//! Конвейер под замком стола:
//!   1. стол играет, игрок за столом;
//!   2. текущее состояние + модуль правил;
//!   3. `validate`: отказ ничего не меняет и не пишет в лог;
//!   4. `apply` + проверка формы результата;
//!   5. номер = последний + 1;
//!   6. один атомарный коммит: состояние (CAS по версии), действие, стол.

use std::sync::Arc;

use crate::domain::{Action, ActionType, TableStatus};
use crate::engine::actions::SubmitAction;
use crate::engine::context::EngineContext;
use crate::engine::errors::EngineError;
use crate::infra::persistence::CommitBatch;

/// Принять действие игрока.
///
/// Конвейер идёт отдельной задачей tokio: если вызывающий бросит future,
/// действие всё равно либо закоммитится целиком, либо не оставит следа.
pub async fn submit(ctx: Arc<EngineContext>, request: SubmitAction) -> Result<Action, EngineError> {
    let task = tokio::spawn(async move { run_pipeline(&ctx, request).await });
    task.await
        .map_err(|e| EngineError::Internal(format!("конвейер действия прерван: {e}")))?
}

async fn run_pipeline(ctx: &EngineContext, request: SubmitAction) -> Result<Action, EngineError> {
    let SubmitAction {
        table_id,
        player_id,
        action_type,
        payload,
    } = request;
    let action_type = ActionType::parse(&action_type).map_err(EngineError::BadRequest)?;

    let guard = ctx.locks.acquire(table_id).await?;

    // 1. Стол.
    let table = ctx.load_table(table_id)?;
    if table.status != TableStatus::Playing {
        return Err(EngineError::TableClosed(table_id));
    }
    if !table.is_member(player_id) {
        return Err(EngineError::PlayerNotAtTable {
            table_id,
            player_id,
        });
    }

    // 2. Состояние и правила.
    let record = ctx
        .store
        .load_game_state(table_id)?
        .ok_or(EngineError::GameStateNotFound(table_id))?;
    let rule = ctx.loader.load(&table.rule)?;
    let handler = rule.handler(&action_type)?;
    let state = Arc::new(record.state.clone());
    let payload = Arc::new(payload);

    // 3. validate.
    let verdict = {
        let (loaded, state, payload) = (Arc::clone(&rule), Arc::clone(&state), Arc::clone(&payload));
        ctx.sandbox
            .run(rule.name(), &action_type.validate_entry_point(), move || {
                (handler.validate)(&loaded.record.config, &state, player_id, &payload)
            })
            .await?
    };
    if !verdict.valid {
        let reason = verdict
            .reason
            .unwrap_or_else(|| "действие не прошло проверку".to_string());
        log::info!("table {table_id}: {action_type} от игрока {player_id} отклонено: {reason}");
        return Err(EngineError::ActionRejected { reason });
    }

    // 4. apply.
    let next_state = {
        let (loaded, state, payload) = (Arc::clone(&rule), Arc::clone(&state), Arc::clone(&payload));
        ctx.sandbox
            .run(rule.name(), &action_type.apply_entry_point(), move || {
                (handler.apply)(&loaded.record.config, &state, player_id, &payload)
            })
            .await?
    };
    next_state.check_shape(&table.members).map_err(|reason| {
        let entry_point = action_type.apply_entry_point();
        log::error!("table {table_id}: {entry_point} вернул некорректное состояние: {reason}");
        EngineError::RuleProtocol(format!("{entry_point}: {reason}"))
    })?;

    // 5. Номер.
    let sequence_number = ctx.store.last_sequence_number(table_id)? + 1;

    // 6. Коммит.
    let action = Action {
        table_id,
        sequence_number,
        game_state_id: record.id,
        state_version: record.version,
        player_id,
        action_type,
        payload: Arc::unwrap_or_clone(payload),
    };
    let next_record = record.successor(next_state);
    let finished = next_record.state.is_terminal();

    let mut next_table = table;
    next_table.current_game = Some(next_record.id);
    if finished {
        next_table.advance_status(TableStatus::Finished);
    }

    ctx.store
        .commit(CommitBatch {
            table: Some(next_table),
            game_state: Some(next_record),
            expected_state_version: Some(Some(record.version)),
            action: Some(action.clone()),
        })
        .map_err(|err| {
            log::error!("table {table_id}: действие #{sequence_number} откатано: {err}");
            err
        })?;

    log::info!(
        "table {table_id}: #{sequence_number} {} от игрока {player_id}",
        action.action_type
    );
    if finished {
        drop(guard);
        ctx.locks.forget(table_id);
        log::info!("table {table_id}: партия завершена");
    }
    Ok(action)
}
