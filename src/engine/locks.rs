use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::TableId;
use crate::engine::errors::EngineError;

/// Замок конкретного стола. Пока guard жив, за столом никто другой не пишет.
pub type TableGuard = OwnedMutexGuard<()>;

/// Замки столов: по одному async-мьютексу на стол, создаются лениво.
///
/// Общий std-мьютекс держим только на время поиска в карте,
/// через `.await` он не переживает.
#[derive(Debug)]
pub struct TableLocks {
    locks: Mutex<HashMap<TableId, Arc<AsyncMutex<()>>>>,
    wait: Duration,
}

impl TableLocks {
    pub fn new(wait: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            wait,
        }
    }

    fn slot(&self, table_id: TableId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if !locks.contains_key(&table_id) {
            // Единственная ссылка у карты: замок никто не держит и не ждёт.
            locks.retain(|_, slot| Arc::strong_count(slot) > 1);
        }
        Arc::clone(locks.entry(table_id).or_default())
    }

    /// Дождаться замка стола, но не дольше `wait`.
    pub async fn acquire(&self, table_id: TableId) -> Result<TableGuard, EngineError> {
        let slot = self.slot(table_id);
        tokio::time::timeout(self.wait, slot.lock_owned())
            .await
            .map_err(|_| {
                log::warn!("table {table_id}: замок не получен за {} мс", self.wait.as_millis());
                EngineError::ConcurrencyTimeout(table_id)
            })
    }

    /// Сколько столов сейчас в карте замков.
    pub fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Забыть замок удалённого или завершённого стола, если его никто не держит и не ждёт.
    pub fn forget(&self, table_id: TableId) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(&table_id).is_some_and(|slot| Arc::strong_count(slot) == 1) {
            locks.remove(&table_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn idle_locks_are_pruned() {
        let locks = TableLocks::new(Duration::from_millis(100));
        for table_id in 1..=50 {
            let guard = locks.acquire(table_id).await.unwrap();
            drop(guard);
        }
        // Остаётся только последний созданный слот.
        assert_eq!(locks.tracked(), 1);

        let held = locks.acquire(7).await.unwrap();
        let _other = locks.acquire(8).await.unwrap();
        assert_eq!(locks.tracked(), 2);

        // Занятый замок не выбрасывается и по-прежнему исключает второго.
        assert!(matches!(
            locks.acquire(7).await,
            Err(EngineError::ConcurrencyTimeout(7))
        ));
        drop(held);
        assert!(locks.acquire(7).await.is_ok());
    }

    #[tokio::test]
    async fn forget_keeps_held_lock() {
        let locks = TableLocks::new(Duration::from_millis(100));
        let held = locks.acquire(3).await.unwrap();

        locks.forget(3);
        assert_eq!(locks.tracked(), 1);
        assert!(matches!(
            locks.acquire(3).await,
            Err(EngineError::ConcurrencyTimeout(3))
        ));

        drop(held);
        locks.forget(3);
        assert_eq!(locks.tracked(), 0);
    }
}
