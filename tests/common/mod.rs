// tests/common/mod.rs
//
// Общие помощники интеграционных тестов:
//  - «счётчик»: крошечный модуль правил для проверки конвейера;
//  - FlakyStore: хранилище, у которого можно сломать commit;
//  - конструкторы менеджера и стартовавших столов.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use card_table_engine::domain::{
    Action, GameState, GameStateRecord, PlayerId, RuleModuleRecord, SeqNo, Table, TableId,
};
use card_table_engine::engine::{CreateTable, SubmitAction, TableManager};
use card_table_engine::infra::{
    seed_builtin_rules, CommitBatch, EngineConfig, GameStore, InMemoryGameStore, RngSeed,
    StorageError,
};
use card_table_engine::rules::four_color;
use card_table_engine::rules::{ActionRegistry, RuleError, RuleLogic, RuleModuleLoader, Verdict};

pub const COUNTER: &str = "Counter";
pub const COUNTER_READY: &str = "Counter Ready";
pub const COUNTER_AUTO: &str = "Counter Auto";
pub const BROKEN_INIT: &str = "Broken Init";
pub const BROKEN_AUTO: &str = "Broken Auto";
pub const COUNTER_LOGIC: &str = "counter";
pub const BROKEN_LOGIC: &str = "broken_init";

// ---------------------------------------------------
// «СЧЁТЧИК»: game_data = { count, last_player }
// ---------------------------------------------------

pub struct CounterRules;

pub fn count(state: &GameState) -> u64 {
    state.game_data["count"].as_u64().unwrap_or(0)
}

fn bump(state: &GameState, player_id: PlayerId) -> GameState {
    let mut next = state.clone();
    next.game_data = json!({ "count": count(state) + 1, "last_player": player_id });
    next.round += 1;
    next
}

fn always(
    _c: &serde_json::Value,
    _s: &GameState,
    _p: PlayerId,
    _d: &serde_json::Value,
) -> Result<Verdict, RuleError> {
    Ok(Verdict::accept())
}

fn never(
    _c: &serde_json::Value,
    _s: &GameState,
    _p: PlayerId,
    _d: &serde_json::Value,
) -> Result<Verdict, RuleError> {
    Ok(Verdict::reject("так нельзя"))
}

fn apply_inc(
    _c: &serde_json::Value,
    s: &GameState,
    p: PlayerId,
    _d: &serde_json::Value,
) -> Result<GameState, RuleError> {
    Ok(bump(s, p))
}

fn apply_finish(
    _c: &serde_json::Value,
    s: &GameState,
    p: PlayerId,
    _d: &serde_json::Value,
) -> Result<GameState, RuleError> {
    let mut next = bump(s, p);
    next.game_data["game_ended"] = json!(true);
    Ok(next)
}

/// Спит `payload.ms` миллисекунд, потом работает как inc.
fn apply_slow(
    _c: &serde_json::Value,
    s: &GameState,
    p: PlayerId,
    d: &serde_json::Value,
) -> Result<GameState, RuleError> {
    let ms = d["ms"].as_u64().unwrap_or(0);
    std::thread::sleep(Duration::from_millis(ms));
    Ok(bump(s, p))
}

fn apply_boom(
    _c: &serde_json::Value,
    _s: &GameState,
    _p: PlayerId,
    _d: &serde_json::Value,
) -> Result<GameState, RuleError> {
    panic!("модуль упал");
}

/// Отдаёт ход игроку, которого нет за столом.
fn apply_bad_shape(
    _c: &serde_json::Value,
    s: &GameState,
    p: PlayerId,
    _d: &serde_json::Value,
) -> Result<GameState, RuleError> {
    let mut next = bump(s, p);
    next.current_turn = Some(999_999);
    Ok(next)
}

fn apply_bad_state(
    _c: &serde_json::Value,
    _s: &GameState,
    _p: PlayerId,
    _d: &serde_json::Value,
) -> Result<GameState, RuleError> {
    Err(RuleError::InvalidState("счётчик сломан".into()))
}

impl RuleLogic for CounterRules {
    fn initialize(
        &self,
        _config: &serde_json::Value,
        members: &[PlayerId],
        _seed: &RngSeed,
    ) -> Result<GameState, RuleError> {
        Ok(GameState {
            players: members.to_vec(),
            current_turn: members.first().copied(),
            hands: members.iter().map(|&p| (p, Vec::new())).collect(),
            game_data: json!({ "count": 0 }),
            ..GameState::default()
        })
    }

    fn register_actions(&self, actions: &mut ActionRegistry) -> Result<(), RuleError> {
        actions.register("inc", always, apply_inc)?;
        actions.register("finish", always, apply_finish)?;
        actions.register("reject", never, apply_inc)?;
        actions.register("slow", always, apply_slow)?;
        actions.register("boom", always, apply_boom)?;
        actions.register("bad_shape", always, apply_bad_shape)?;
        actions.register("bad_state", always, apply_bad_state)?;
        Ok(())
    }
}

/// Логика, у которой initialize всегда падает.
pub struct BrokenInitRules;

impl RuleLogic for BrokenInitRules {
    fn initialize(
        &self,
        _config: &serde_json::Value,
        _members: &[PlayerId],
        _seed: &RngSeed,
    ) -> Result<GameState, RuleError> {
        Err(RuleError::InvalidConfig("колода не собирается".into()))
    }

    fn register_actions(&self, actions: &mut ActionRegistry) -> Result<(), RuleError> {
        actions.register("inc", always, apply_inc)
    }
}

pub fn counter_record(name: &str, start_policy: &str, logic: &str) -> RuleModuleRecord {
    RuleModuleRecord {
        name: name.to_string(),
        description: "тестовый счётчик".to_string(),
        config: json!({
            "meta": {
                "player_count": { "min": 2, "max": 3 },
                "start_policy": start_policy
            }
        }),
        logic: logic.to_string(),
    }
}

// ---------------------------------------------------
// ХРАНИЛИЩЕ С ЛОМАЮЩИМСЯ COMMIT
// ---------------------------------------------------

#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemoryGameStore,
    pub fail_commits: AtomicBool,
}

impl FlakyStore {
    pub fn set_failing(&self, failing: bool) {
        self.fail_commits.store(failing, Ordering::SeqCst);
    }
}

impl GameStore for FlakyStore {
    fn load_rule(&self, name: &str) -> Result<Option<RuleModuleRecord>, StorageError> {
        self.inner.load_rule(name)
    }

    fn insert_rule_if_absent(&self, rule: RuleModuleRecord) -> Result<bool, StorageError> {
        self.inner.insert_rule_if_absent(rule)
    }

    fn load_table(&self, id: TableId) -> Result<Option<Table>, StorageError> {
        self.inner.load_table(id)
    }

    fn list_tables(&self) -> Result<Vec<Table>, StorageError> {
        self.inner.list_tables()
    }

    fn save_table(&self, table: &Table) -> Result<(), StorageError> {
        self.inner.save_table(table)
    }

    fn load_game_state(&self, table_id: TableId) -> Result<Option<GameStateRecord>, StorageError> {
        self.inner.load_game_state(table_id)
    }

    fn last_sequence_number(&self, table_id: TableId) -> Result<SeqNo, StorageError> {
        self.inner.last_sequence_number(table_id)
    }

    fn list_actions_since(&self, table_id: TableId, after: SeqNo) -> Result<Vec<Action>, StorageError> {
        self.inner.list_actions_since(table_id, after)
    }

    fn commit(&self, batch: CommitBatch) -> Result<(), StorageError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("диск отвалился".into()));
        }
        self.inner.commit(batch)
    }

    fn delete_table(&self, id: TableId) -> Result<(), StorageError> {
        self.inner.delete_table(id)
    }
}

// ---------------------------------------------------
// КОНСТРУКТОРЫ
// ---------------------------------------------------

pub fn test_config() -> EngineConfig {
    EngineConfig {
        rule_timeout_ms: 300,
        lock_timeout_ms: 2_000,
        master_seed: Some(42),
    }
}

/// Засеять встроенные правила и тестовые счётчики.
pub fn seed_test_rules(store: &dyn GameStore) {
    seed_builtin_rules(store).unwrap();
    store
        .insert_rule_if_absent(counter_record(COUNTER, "owner", COUNTER_LOGIC))
        .unwrap();
    store
        .insert_rule_if_absent(counter_record(COUNTER_READY, "owner_when_all_ready", COUNTER_LOGIC))
        .unwrap();
    store
        .insert_rule_if_absent(counter_record(COUNTER_AUTO, "auto_when_all_ready", COUNTER_LOGIC))
        .unwrap();
    store
        .insert_rule_if_absent(counter_record(BROKEN_INIT, "owner", BROKEN_LOGIC))
        .unwrap();
    store
        .insert_rule_if_absent(counter_record(BROKEN_AUTO, "auto_when_all_ready", BROKEN_LOGIC))
        .unwrap();
}

pub fn test_loader(store: Arc<dyn GameStore>) -> Arc<RuleModuleLoader> {
    let loader = RuleModuleLoader::with_builtin_logic(store);
    loader.register_logic(COUNTER_LOGIC, |_config: &serde_json::Value| {
        let logic: Arc<dyn RuleLogic> = Arc::new(CounterRules);
        Ok(logic)
    });
    loader.register_logic(BROKEN_LOGIC, |_config: &serde_json::Value| {
        let logic: Arc<dyn RuleLogic> = Arc::new(BrokenInitRules);
        Ok(logic)
    });
    Arc::new(loader)
}

pub fn manager_with_store(store: Arc<dyn GameStore>, config: EngineConfig) -> TableManager {
    seed_test_rules(store.as_ref());
    let loader = test_loader(Arc::clone(&store));
    TableManager::new(store, loader, &config).unwrap()
}

pub fn test_manager() -> TableManager {
    manager_with_store(Arc::new(InMemoryGameStore::new()), test_config())
}

pub fn create_request(rule: &str, owner: PlayerId) -> CreateTable {
    CreateTable {
        name: format!("стол игрока {owner}"),
        rule: rule.to_string(),
        owner,
        is_private: false,
        secret: None,
    }
}

/// Стол с заданными игроками (первый из них владелец), партия запущена.
pub async fn started_table(manager: &TableManager, rule: &str, players: &[PlayerId]) -> TableId {
    let table = manager.create_table(create_request(rule, players[0])).await.unwrap();
    for &p in &players[1..] {
        manager.join(table.id, p, None).await.unwrap();
    }
    manager.request_start(table.id, players[0]).await.unwrap();
    table.id
}

pub async fn four_color_table(manager: &TableManager) -> TableId {
    started_table(manager, four_color::RULE_NAME, &[1, 2, 3, 4]).await
}

pub fn submit(table_id: TableId, player_id: PlayerId, action_type: &str, payload: serde_json::Value) -> SubmitAction {
    SubmitAction::new(table_id, player_id, action_type, payload)
}
