use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{GameStateId, PlayerId, TableId};
use crate::infra::rng_seed::RngSeed;

/// Статус стола. Переходы только вперёд: Waiting → Playing → Finished.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    /// Набор игроков, партии ещё нет.
    Waiting,
    /// Идёт партия, стол принимает действия.
    Playing,
    /// Партия завершена, стол только для чтения.
    Finished,
}

impl TableStatus {
    /// Разрешён ли переход `self -> next`.
    pub fn can_transition_to(self, next: TableStatus) -> bool {
        matches!(
            (self, next),
            (TableStatus::Waiting, TableStatus::Playing) | (TableStatus::Playing, TableStatus::Finished)
        )
    }
}

/// Вспомогательное состояние игрока за столом (флаг готовности + произвольные поля).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PlayerState {
    #[serde(default)]
    pub ready: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Секрет приватного стола. Храним только SHA-256 от пароля.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretDigest(pub [u8; 32]);

impl SecretDigest {
    pub fn of(secret: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"CARD_TABLE_SECRET_V1");
        hasher.update(secret.as_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        Self(out)
    }

    pub fn matches(&self, secret: &str) -> bool {
        *self == Self::of(secret)
    }
}

/// Стол: одна сессия одной игры с фиксированным модулем правил.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    /// Имя модуля правил (RuleModule.name).
    pub rule: String,
    pub owner: PlayerId,
    pub status: TableStatus,

    /// Участники в порядке входа (он же порядок мест). Владелец всегда первый.
    pub members: Vec<PlayerId>,

    /// Вспомогательное состояние по игрокам (готовность и т.п.).
    pub player_states: BTreeMap<PlayerId, PlayerState>,

    pub is_private: bool,
    pub secret: Option<SecretDigest>,

    /// Seed, из которого модуль правил тасует колоду. Нужен для реплея.
    pub seed: RngSeed,

    /// Текущее состояние партии. Есть тогда и только тогда, когда status != Waiting.
    pub current_game: Option<GameStateId>,
}

impl Table {
    /// Создать стол в статусе Waiting, владелец становится первым участником.
    pub fn new(
        id: TableId,
        name: String,
        rule: String,
        owner: PlayerId,
        seed: RngSeed,
    ) -> Self {
        let mut player_states = BTreeMap::new();
        player_states.insert(owner, PlayerState::default());
        Self {
            id,
            name,
            rule,
            owner,
            status: TableStatus::Waiting,
            members: vec![owner],
            player_states,
            is_private: false,
            secret: None,
            seed,
            current_game: None,
        }
    }

    pub fn is_member(&self, player_id: PlayerId) -> bool {
        self.members.contains(&player_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Добавить участника. false, если он уже за столом.
    pub fn add_member(&mut self, player_id: PlayerId) -> bool {
        if self.is_member(player_id) {
            return false;
        }
        self.members.push(player_id);
        self.player_states.entry(player_id).or_default();
        true
    }

    /// Убрать участника. false, если его не было.
    pub fn remove_member(&mut self, player_id: PlayerId) -> bool {
        let before = self.members.len();
        self.members.retain(|&p| p != player_id);
        self.player_states.remove(&player_id);
        before != self.members.len()
    }

    pub fn is_ready(&self, player_id: PlayerId) -> bool {
        self.player_states
            .get(&player_id)
            .map(|s| s.ready)
            .unwrap_or(false)
    }

    pub fn all_ready(&self) -> bool {
        self.members.iter().all(|&p| self.is_ready(p))
    }

    /// Перевести стол в новый статус. Обратные и «прыжковые» переходы запрещены.
    pub fn advance_status(&mut self, next: TableStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }

    /// Доступ к приватному столу: пароль должен совпасть.
    pub fn admits(&self, secret: Option<&str>) -> bool {
        if !self.is_private {
            return true;
        }
        match (&self.secret, secret) {
            (Some(digest), Some(given)) => digest.matches(given),
            (None, _) => true,
            (Some(_), None) => false,
        }
    }
}
