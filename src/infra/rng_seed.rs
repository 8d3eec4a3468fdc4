//! RngSeed: доменный seed для RNG модулей правил.
//!
//! Позволяет:
//!   - хранить базовый seed движка ([u8;32])
//!   - выводить seed конкретного стола детерминированным хэшем:
//!         table = H(domain || master || table_id)
//!   - создавать DeterministicRng из seed
//!
//! Seed стола сохраняется в самом столе, поэтому реплей лога
//! воспроизводит ту же раздачу, что и живая партия.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::TableId;
use crate::infra::rng::DeterministicRng;

/// 32-байтовый seed для RNG.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RngSeed {
    pub bytes: [u8; 32],
}

impl RngSeed {
    /// Создать seed из 32 байт.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Создать seed из u64 (для удобства тестов и конфига).
    pub fn from_u64(x: u64) -> Self {
        let mut b = [0u8; 32];
        b[..8].copy_from_slice(&x.to_le_bytes());
        Self { bytes: b }
    }

    /// Случайный seed (если в конфиге движка seed не задан).
    pub fn random() -> Self {
        Self::from_bytes(rand::random())
    }

    /// Seed конкретного стола.
    pub fn derive_for_table(&self, table_id: TableId) -> Self {
        let mut hasher = Sha256::new();

        // Доменный префикс
        hasher.update(b"CARD_TABLE_RNG_V1");
        hasher.update(self.bytes);
        hasher.update(table_id.to_le_bytes());

        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());

        Self { bytes: out }
    }

    /// Создать DeterministicRng из seed.
    pub fn to_rng(&self) -> DeterministicRng {
        DeterministicRng::from_seed(self.bytes)
    }
}
