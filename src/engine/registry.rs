//! Реестр столов: создание, вход/выход, готовность, старт, удаление.
//!
//! Все записи по существующему столу идут под его замком, тем же,
//! что и у секвенсора действий.

use std::sync::Arc;

use crate::domain::{
    GameStateRecord, PlayerId, SecretDigest, StartPolicy, Table, TableId, TableStatus,
};
use crate::engine::actions::CreateTable;
use crate::engine::context::EngineContext;
use crate::engine::errors::EngineError;
use crate::infra::persistence::CommitBatch;
use crate::rules::LoadedRule;

/// Точка входа `initialize` для диагностики.
pub const INITIALIZE_ENTRY_POINT: &str = "initializeGame";

/// Создать стол в статусе Waiting. Владелец сразу становится участником.
pub async fn create_table(ctx: &EngineContext, request: CreateTable) -> Result<Table, EngineError> {
    if request.name.trim().is_empty() {
        return Err(EngineError::BadRequest("пустое имя стола".into()));
    }

    // Проверяем, что модуль существует и загружается.
    ctx.loader.load(&request.rule)?;

    let secret = match (request.is_private, request.secret.as_deref()) {
        (true, Some(secret)) if !secret.is_empty() => Some(SecretDigest::of(secret)),
        (true, _) => {
            return Err(EngineError::BadRequest(
                "для приватного стола нужен пароль".into(),
            ))
        }
        (false, _) => None,
    };

    let id = ctx.ids.next_table_id();
    let mut table = Table::new(
        id,
        request.name,
        request.rule,
        request.owner,
        ctx.master_seed.derive_for_table(id),
    );
    table.is_private = request.is_private;
    table.secret = secret;

    ctx.store.save_table(&table)?;
    log::info!(
        "table {id}: создан стол {:?} (правила {:?}, владелец {})",
        table.name,
        table.rule,
        table.owner
    );
    Ok(table)
}

/// Присоединиться к столу. Повторный вход участника ничего не меняет.
pub async fn join(
    ctx: &EngineContext,
    table_id: TableId,
    player_id: PlayerId,
    secret: Option<&str>,
) -> Result<Table, EngineError> {
    let _guard = ctx.locks.acquire(table_id).await?;
    let mut table = ctx.load_table(table_id)?;

    if table.is_member(player_id) {
        return Ok(table);
    }
    if table.status != TableStatus::Waiting {
        return Err(EngineError::TableNotJoinable(table_id));
    }
    if !table.admits(secret) {
        return Err(EngineError::Forbidden(format!(
            "неверный пароль стола {table_id}"
        )));
    }

    let rule = ctx.loader.load(&table.rule)?;
    if table.member_count() >= rule.meta.player_count.max {
        return Err(EngineError::TableFull(table_id));
    }

    table.add_member(player_id);
    ctx.store.save_table(&table)?;
    log::info!(
        "table {table_id}: игрок {player_id} сел за стол ({}/{})",
        table.member_count(),
        rule.meta.player_count.max
    );
    Ok(table)
}

/// Выйти из-за стола до начала партии. Владелец выйти не может.
pub async fn leave(
    ctx: &EngineContext,
    table_id: TableId,
    player_id: PlayerId,
) -> Result<Table, EngineError> {
    let _guard = ctx.locks.acquire(table_id).await?;
    let mut table = ctx.load_waiting_table(table_id)?;

    if player_id == table.owner {
        return Err(EngineError::Forbidden(
            "владелец не может покинуть свой стол".into(),
        ));
    }
    if !table.remove_member(player_id) {
        return Err(EngineError::PlayerNotAtTable {
            table_id,
            player_id,
        });
    }

    ctx.store.save_table(&table)?;
    log::info!("table {table_id}: игрок {player_id} вышел");
    Ok(table)
}

/// Отметить готовность. При политике `auto_when_all_ready` последняя отметка запускает партию.
pub async fn set_ready(
    ctx: &EngineContext,
    table_id: TableId,
    player_id: PlayerId,
    ready: bool,
) -> Result<Table, EngineError> {
    let _guard = ctx.locks.acquire(table_id).await?;
    let mut table = ctx.load_waiting_table(table_id)?;

    if !table.is_member(player_id) {
        return Err(EngineError::PlayerNotAtTable {
            table_id,
            player_id,
        });
    }
    let rule = ctx.loader.load(&table.rule)?;
    table.player_states.entry(player_id).or_default().ready = ready;

    // Автостарт пишет флаг вместе со стартом: упавший initialize не оставит следа.
    let auto = rule.meta.start_policy == StartPolicy::AutoWhenAllReady;
    if auto && ready && check_startable(&table, &rule).is_ok() {
        log::info!("table {table_id}: все готовы, автостарт");
        let (table, _) = start_game(ctx, table, &rule).await?;
        return Ok(table);
    }

    ctx.store.save_table(&table)?;
    log::debug!("table {table_id}: игрок {player_id} ready={ready}");
    Ok(table)
}

/// Запрос владельца на старт партии.
pub async fn request_start(
    ctx: &EngineContext,
    table_id: TableId,
    requester: PlayerId,
) -> Result<(Table, GameStateRecord), EngineError> {
    let _guard = ctx.locks.acquire(table_id).await?;
    let table = ctx.load_table(table_id)?;

    if table.owner != requester {
        return Err(EngineError::NotOwner {
            table_id,
            player_id: requester,
        });
    }
    if table.status != TableStatus::Waiting {
        return Err(EngineError::AlreadyStarted(table_id));
    }

    let rule = ctx.loader.load(&table.rule)?;
    check_startable(&table, &rule)?;
    start_game(ctx, table, &rule).await
}

/// Удалить стол вместе с состоянием и логом. Только владелец и не во время партии.
pub async fn delete_table(
    ctx: &EngineContext,
    table_id: TableId,
    requester: PlayerId,
) -> Result<(), EngineError> {
    let guard = ctx.locks.acquire(table_id).await?;
    let table = ctx.load_table(table_id)?;

    if table.owner != requester {
        return Err(EngineError::NotOwner {
            table_id,
            player_id: requester,
        });
    }
    if table.status == TableStatus::Playing {
        return Err(EngineError::AlreadyStarted(table_id));
    }

    ctx.store.delete_table(table_id)?;
    drop(guard);
    ctx.locks.forget(table_id);
    log::info!("table {table_id}: удалён");
    Ok(())
}

/// Хватает ли игроков и (если нужно) готовности для старта.
fn check_startable(table: &Table, rule: &LoadedRule) -> Result<(), EngineError> {
    let limits = rule.meta.player_count;
    let count = table.member_count();
    if count < limits.min {
        return Err(EngineError::NotReady(format!(
            "за столом {count} игроков, нужно минимум {}",
            limits.min
        )));
    }
    if count > limits.max {
        return Err(EngineError::NotReady(format!(
            "за столом {count} игроков, максимум {}",
            limits.max
        )));
    }
    if rule.meta.start_policy.requires_all_ready() && !table.all_ready() {
        return Err(EngineError::NotReady("не все игроки готовы".into()));
    }
    Ok(())
}

/// Переход waiting -> playing: `initialize` в песочнице и один атомарный коммит
/// (стол + начальное состояние). При любой ошибке стол остаётся в Waiting.
async fn start_game(
    ctx: &EngineContext,
    table: Table,
    rule: &Arc<LoadedRule>,
) -> Result<(Table, GameStateRecord), EngineError> {
    let table_id = table.id;

    let loaded = Arc::clone(rule);
    let members = table.members.clone();
    let seed = table.seed.clone();
    let state = ctx
        .sandbox
        .run(rule.name(), INITIALIZE_ENTRY_POINT, move || {
            loaded.logic.initialize(&loaded.record.config, &members, &seed)
        })
        .await
        .map_err(|err| match err {
            EngineError::RuleModule { reason, .. } => EngineError::RuleInit { table_id, reason },
            other => other,
        })?;

    state
        .check_shape(&table.members)
        .map_err(|reason| EngineError::RuleInit { table_id, reason })?;

    let record = GameStateRecord::initial(ctx.ids.next_game_state_id(), table_id, state);
    let mut started = table;
    if !started.advance_status(TableStatus::Playing) {
        return Err(EngineError::AlreadyStarted(table_id));
    }
    started.current_game = Some(record.id);

    ctx.store
        .commit(CommitBatch {
            table: Some(started.clone()),
            game_state: Some(record.clone()),
            expected_state_version: Some(None),
            action: None,
        })
        .map_err(|err| {
            log::error!("table {table_id}: старт откатан: {err}");
            err
        })?;

    log::info!(
        "table {table_id}: партия началась (состояние {}, игроков {})",
        record.id,
        started.member_count()
    );
    Ok((started, record))
}
