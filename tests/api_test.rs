// tests/api_test.rs
//
// API слой: команды, запросы, маппинг ошибок, видимость рук и добранной карты.

mod common;

use serde_json::json;

use common::*;

use card_table_engine::api::{
    execute, run_query, ApiError, Command, CommandResponse, Query, QueryResponse, TableCommand,
    TableViewDto,
};
use card_table_engine::domain::{Table, TableStatus};
use card_table_engine::engine::{CreateTable, EngineError};
use card_table_engine::infra::{RngSeed, StorageError};
use card_table_engine::rules::four_color;

async fn run(manager: &card_table_engine::engine::TableManager, cmd: TableCommand) -> CommandResponse {
    execute(manager, Command::TableCommand(cmd)).await.unwrap()
}

#[tokio::test]
async fn full_lobby_flow_through_commands() {
    let manager = test_manager();

    let created = execute(
        &manager,
        Command::CreateTable(CreateTable {
            name: "вечерний стол".into(),
            rule: four_color::RULE_NAME.into(),
            owner: 1,
            is_private: true,
            secret: Some("дракон".into()),
        }),
    )
    .await
    .unwrap();
    let CommandResponse::Table(view) = created else {
        panic!("ожидали Table");
    };
    assert!(view.is_private && view.has_secret);
    assert_eq!(view.status, TableStatus::Waiting);
    let table_id = view.table_id;

    for p in 2..=4 {
        run(
            &manager,
            TableCommand::Join {
                table_id,
                player_id: p,
                secret: Some("дракон".into()),
            },
        )
        .await;
    }

    let started = run(&manager, TableCommand::RequestStart { table_id, requester: 1 }).await;
    let CommandResponse::Started { table, game } = started else {
        panic!("ожидали Started");
    };
    assert_eq!(table.status, TableStatus::Playing);
    assert_eq!(table.members.len(), 4);
    assert!(table.members[0].is_owner);
    // Начальное состояние, глазами владельца.
    assert_eq!(game.my_hand.as_ref().map(Vec::len), game.hand_sizes.get(&1).copied());

    let dealer = game.current_turn.unwrap();
    let state = manager.game_state(table_id).unwrap().state;
    let card = state.hand(dealer)[0].clone();
    let accepted = run(
        &manager,
        TableCommand::SubmitAction(submit(table_id, dealer, "play_cards", json!({ "cards": [card] }))),
    )
    .await;
    let CommandResponse::ActionAccepted(action) = accepted else {
        panic!("ожидали ActionAccepted");
    };
    assert_eq!(action.sequence_number, 1);
    assert_eq!(action.action_type, "play_cards");

    let QueryResponse::Actions(log) = run_query(&manager, Query::ListActions { table_id, after_seq: 0 }).unwrap()
    else {
        panic!("ожидали Actions");
    };
    assert_eq!(log, vec![action]);
}

#[tokio::test]
async fn viewer_sees_only_own_hand() {
    let manager = test_manager();
    let table_id = four_color_table(&manager).await;
    let record = manager.game_state(table_id).unwrap();

    let QueryResponse::GameState(view) = run_query(
        &manager,
        Query::GetGameState {
            table_id,
            viewer: Some(2),
        },
    )
    .unwrap() else {
        panic!("ожидали GameState");
    };
    assert_eq!(view.my_hand.as_deref(), Some(record.state.hand(2)));
    assert_eq!(view.hand_sizes.len(), 4);
    assert_eq!(view.draw_pile_size, record.state.draw_pile.len());

    // Чужой для стола игрок и зритель рук не видят.
    for viewer in [Some(99), None] {
        let QueryResponse::GameState(view) =
            run_query(&manager, Query::GetGameState { table_id, viewer }).unwrap()
        else {
            panic!("ожидали GameState");
        };
        assert!(view.my_hand.is_none());
        assert_eq!(view.hand_sizes[&1], record.state.hand(1).len());
    }

    // В JSON вида нет чужих карт.
    let raw = serde_json::to_value(&view).unwrap();
    assert!(raw.get("hands").is_none());
}

#[tokio::test]
async fn drawn_card_is_visible_only_to_drawer() {
    let manager = test_manager();
    let table_id = four_color_table(&manager).await;
    let dealer = manager.game_state(table_id).unwrap().state.current_turn.unwrap();
    let other = (1..=4).find(|p| *p != dealer).unwrap();

    manager.submit(submit(table_id, dealer, "draw", json!({}))).await.unwrap();
    let state = manager.game_state(table_id).unwrap().state;
    let drawn = state.hand(dealer).last().cloned().unwrap();

    let QueryResponse::GameState(own) =
        run_query(&manager, Query::GetGameState { table_id, viewer: Some(dealer) }).unwrap()
    else {
        panic!("ожидали GameState");
    };
    let own_play = own.last_play.unwrap();
    assert_eq!(own_play.kind, "draw");
    assert_eq!(own_play.cards, vec![drawn.clone()]);

    for viewer in [Some(other), Some(99), None] {
        let QueryResponse::GameState(view) =
            run_query(&manager, Query::GetGameState { table_id, viewer }).unwrap()
        else {
            panic!("ожидали GameState");
        };
        let play = view.last_play.unwrap();
        assert_eq!((play.player, play.kind.as_str()), (dealer, "draw"));
        assert!(play.cards.is_empty(), "зритель {viewer:?} увидел добранную карту");
        assert_eq!(view.hand_sizes[&dealer], state.hand(dealer).len());
    }
}

#[test]
fn seat_index_survives_large_tables() {
    let mut table = Table::new(1, "большой стол".into(), COUNTER.into(), 0, RngSeed::from_u64(1));
    for player in 1..300 {
        table.add_member(player);
    }

    let view = TableViewDto::from_table(&table);
    assert_eq!(view.members.len(), 300);
    let last = view.members.last().unwrap();
    assert_eq!((last.player_id, last.seat_index), (299, 299));
}

#[tokio::test]
async fn lobby_queries() {
    let manager = test_manager();
    let a = manager.create_table(create_request(COUNTER, 1)).await.unwrap();
    let b = manager.create_table(create_request(COUNTER, 2)).await.unwrap();

    let QueryResponse::Tables(tables) = run_query(&manager, Query::ListTables).unwrap() else {
        panic!("ожидали Tables");
    };
    let ids: Vec<u64> = tables.iter().map(|t| t.table_id).collect();
    assert_eq!(ids, vec![a.id, b.id]);

    let QueryResponse::Table(view) = run_query(&manager, Query::GetTable { table_id: b.id }).unwrap() else {
        panic!("ожидали Table");
    };
    assert_eq!(view.owner, 2);
    assert!(!view.has_secret);

    assert!(matches!(
        run_query(&manager, Query::GetGameState { table_id: a.id, viewer: None }),
        Err(ApiError::NotFound(_))
    ));
}

#[tokio::test]
async fn engine_errors_map_to_api_errors() {
    let manager = test_manager();
    let table_id = started_table(&manager, COUNTER, &[1, 2]).await;

    let err = execute(
        &manager,
        Command::TableCommand(TableCommand::SubmitAction(submit(table_id, 1, "reject", json!({})))),
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::Rejected("Действие отклонено: так нельзя".into()));

    let err = execute(
        &manager,
        Command::TableCommand(TableCommand::DeleteTable { table_id, requester: 2 }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    let cases = [
        (EngineError::TableNotFound(1), "NotFound"),
        (EngineError::BadRequest("x".into()), "BadRequest"),
        (EngineError::AlreadyStarted(1), "Conflict"),
        (EngineError::ConcurrencyTimeout(1), "Retry"),
        (
            EngineError::RuleTimeout {
                rule: "r".into(),
                entry_point: "applyDraw".into(),
                timeout_ms: 10,
            },
            "Retry",
        ),
        (EngineError::RuleProtocol("x".into()), "Internal"),
        (EngineError::Storage(StorageError::Unavailable("x".into())), "Internal"),
        (EngineError::LogCorrupted("x".into()), "Internal"),
    ];
    for (engine_err, expected) in cases {
        let api = ApiError::from(engine_err);
        let name = match api {
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::NotFound(_) => "NotFound",
            ApiError::Rejected(_) => "Rejected",
            ApiError::Conflict(_) => "Conflict",
            ApiError::Forbidden(_) => "Forbidden",
            ApiError::Retry(_) => "Retry",
            ApiError::Internal(_) => "Internal",
        };
        assert_eq!(name, expected);
    }
}

#[tokio::test]
async fn commands_deserialize_from_json() {
    let manager = test_manager();
    let cmd: Command = serde_json::from_value(json!({
        "CreateTable": { "name": "из json", "rule": COUNTER, "owner": 5 }
    }))
    .unwrap();
    let CommandResponse::Table(view) = execute(&manager, cmd).await.unwrap() else {
        panic!("ожидали Table");
    };
    assert!(!view.is_private);

    let cmd: Command = serde_json::from_value(json!({
        "TableCommand": { "Join": { "table_id": view.table_id, "player_id": 6 } }
    }))
    .unwrap();
    let CommandResponse::Table(view) = execute(&manager, cmd).await.unwrap() else {
        panic!("ожидали Table");
    };
    assert_eq!(view.members.len(), 2);

    let cmd: Command = serde_json::from_value(json!({
        "TableCommand": { "DeleteTable": { "table_id": view.table_id, "requester": 5 } }
    }))
    .unwrap();
    assert_eq!(
        execute(&manager, cmd).await.unwrap(),
        CommandResponse::Deleted(view.table_id)
    );
}
