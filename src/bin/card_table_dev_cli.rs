// src/bin/card_table_dev_cli.rs

use std::path::PathBuf;
use std::sync::Arc;

use card_table_engine::api::{run_query, GameStateViewDto, Query, QueryResponse};
use card_table_engine::bot::{play_until_finished, BotPlayer};
use card_table_engine::domain::{PlayerId, TableId};
use card_table_engine::engine::{CreateTable, EngineError, TableManager};
use card_table_engine::infra::{seed_builtin_rules, EngineConfig, InMemoryGameStore, SystemRng};
use card_table_engine::rules::four_color::{self, FourColorCard, FourColorData};

const NUM_TABLES: usize = 3;
const MAX_ACTIONS_PER_GAME: usize = 2_000;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run().await {
        eprintln!("card_table_dev_cli: ошибка: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("card_table_dev_cli: стартуем dev-CLI движка столов…");

    // 1. Конфиг движка: путь первым аргументом, иначе значения по умолчанию.
    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => EngineConfig::from_file(&path)?,
        None => EngineConfig::default(),
    };

    // 2. Хранилище + встроенные правила.
    let store = Arc::new(InMemoryGameStore::new());
    let seeded = seed_builtin_rules(store.as_ref())?;
    println!("Засеяны модули правил: {seeded:?}");

    let manager = TableManager::with_builtin_rules(store, &config)?;
    let rule = manager.loader().load(four_color::RULE_NAME)?;
    let rules = FourColorCard::from_config(&rule.record.config)?;

    println!();
    println!("================ MULTI-TABLE SIMULATION =================");

    // 3. Столы играют параллельно: у каждого свой замок.
    let mut games = Vec::new();
    for n in 0..NUM_TABLES {
        let manager = manager.clone();
        let rules = rules.clone();
        let first_player = 100 * (n as PlayerId + 1);
        games.push(tokio::spawn(async move {
            play_table(&manager, rules, n + 1, first_player).await
        }));
    }

    let mut table_ids = Vec::new();
    for game in games {
        table_ids.push(game.await??);
    }

    // 4. Итоги.
    for table_id in table_ids {
        print_summary(&manager, table_id).await?;
    }

    println!("card_table_dev_cli: готово.");
    Ok(())
}

/// Создать стол, посадить четырёх ботов, сыграть партию до конца.
async fn play_table(
    manager: &TableManager,
    rules: FourColorCard,
    n: usize,
    first_player: PlayerId,
) -> Result<TableId, EngineError> {
    let players: Vec<PlayerId> = (first_player..first_player + 4).collect();

    let table = manager
        .create_table(CreateTable {
            name: format!("AUTO TABLE {n}"),
            rule: four_color::RULE_NAME.to_string(),
            owner: players[0],
            is_private: false,
            secret: None,
        })
        .await?;
    for &player in &players[1..] {
        manager.join(table.id, player, None).await?;
    }
    manager.request_start(table.id, players[0]).await?;

    let mut bots: Vec<BotPlayer<SystemRng>> = players
        .iter()
        .map(|&p| BotPlayer::new(p, table.id, rules.clone(), SystemRng))
        .collect();
    let accepted = play_until_finished(manager, &mut bots, MAX_ACTIONS_PER_GAME).await?;
    log::info!("table {}: сыграно {accepted} действий", table.id);
    Ok(table.id)
}

async fn print_summary(manager: &TableManager, table_id: TableId) -> Result<(), Box<dyn std::error::Error>> {
    let record = manager.game_state(table_id)?;
    let data = FourColorData::read(&record.state)?;
    let actions = manager.actions_since(table_id, 0)?;

    println!();
    println!("--- Стол {table_id} ---");
    println!("Действий в логе: {}", actions.len());
    println!("Исход: {}", data.outcome.as_deref().unwrap_or("-"));
    if let Some(winner) = data.winner {
        println!("Победитель: игрок {winner}");
    }
    if let Some(scores) = &data.final_scores {
        for (player, score) in scores {
            println!("  игрок {player}: {score:+}");
        }
    }

    // Реплей лога должен дать ровно то же состояние.
    let replayed = manager.replay(table_id).await?;
    println!(
        "Реплей совпадает с живым состоянием: {}",
        if replayed == record.state { "да" } else { "НЕТ" }
    );

    // Как партию видит зритель (без чужих рук).
    if let QueryResponse::GameState(GameStateViewDto {
        draw_pile_size,
        hand_sizes,
        ..
    }) = run_query(
        manager,
        Query::GetGameState {
            table_id,
            viewer: None,
        },
    )
    .map_err(|e| format!("{e:?}"))?
    {
        println!("Прикуп: {draw_pile_size}, карт на руках: {hand_sizes:?}");
    }

    Ok(())
}
