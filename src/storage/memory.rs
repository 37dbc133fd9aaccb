use super::theater::{Theater, TheaterId};
use crate::core::{EngineError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Source of truth for theater capacity.
pub struct TheaterStore {
    /// Театры с индивидуальными блокировками
    theaters: HashMap<TheaterId, Arc<RwLock<Theater>>>,
    /// Следующий id; создание идёт под внешним write lock'ом
    next_id: AtomicU64,
}

impl TheaterStore {
    pub fn new() -> Self {
        Self {
            theaters: HashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Создать театр
    pub fn create_theater(&mut self, total_seats: u32) -> Result<Theater> {
        if total_seats == 0 {
            return Err(EngineError::InvalidRequest(
                "total_seats must be at least 1".to_string(),
            ));
        }

        let id = TheaterId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let theater = Theater::new(id, total_seats);
        self.theaters
            .insert(id, Arc::new(RwLock::new(theater.clone())));
        Ok(theater)
    }

    /// Получить handle на театр для конкурентного доступа
    pub fn get_theater(&self, id: TheaterId) -> Result<Arc<RwLock<Theater>>> {
        self.theaters
            .get(&id)
            .cloned()
            .ok_or(EngineError::TheaterNotFound(id))
    }

    pub fn theater_exists(&self, id: TheaterId) -> bool {
        self.theaters.contains_key(&id)
    }

    pub fn theater_count(&self) -> usize {
        self.theaters.len()
    }

    /// Point-in-time copy of every theater, sorted by id.
    pub async fn snapshot(&self) -> Vec<Theater> {
        let mut theaters = Vec::with_capacity(self.theaters.len());
        for handle in self.theaters.values() {
            theaters.push(handle.read().await.clone());
        }
        theaters.sort_by_key(|theater| theater.id);
        theaters
    }

    /// Current remaining count for one theater.
    pub async fn remaining_seats(&self, id: TheaterId) -> Result<u32> {
        let handle = self.get_theater(id)?;
        let theater = handle.read().await;
        Ok(theater.remaining_seats)
    }

    /// Adjust a theater's remaining seats as a standalone atomic step.
    ///
    /// Callers that need to compose the adjustment with other work under the
    /// same critical section lock the handle from [`TheaterStore::get_theater`]
    /// themselves and call [`Theater::try_adjust_remaining`] directly.
    pub async fn try_adjust_remaining(&self, id: TheaterId, delta: i64) -> Result<u32> {
        let handle = self.get_theater(id)?;
        let mut theater = handle.write().await;
        theater.try_adjust_remaining(delta)
    }
}

impl Default for TheaterStore {
    fn default() -> Self {
        Self::new()
    }
}
