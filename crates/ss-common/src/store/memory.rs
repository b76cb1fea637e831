use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::{sleep, timeout};

use super::{
    FeedbackLedger, MatchRecord, MatchStore, Neighbor, ProfileSource, Slot, StoreError,
    StoredEmbedding, VectorStore,
};
use crate::encoder::vector::inner_product_distance;
use crate::profile::{SkillDirection, UserProfile};

#[derive(Debug, Clone)]
struct UserRow {
    name: String,
    bio: Option<String>,
}

#[derive(Default)]
struct Inner {
    users: BTreeMap<i64, UserRow>,
    user_skills: Vec<(i64, String, SkillDirection)>,
    /// One row per stored embedding, like the `user_embeddings` table.
    embeddings: Vec<StoredEmbedding>,
    matches: BTreeMap<i64, MatchRecord>,
}

impl Inner {
    fn embedding_of(&self, user_id: i64) -> Option<&StoredEmbedding> {
        self.embeddings.iter().find(|e| e.user_id == user_id)
    }

    /// Replace the user's row in place, or append one when there is none.
    fn upsert_embedding_row(&mut self, row: StoredEmbedding) {
        match self.embeddings.iter_mut().find(|e| e.user_id == row.user_id) {
            Some(existing) => *existing = row,
            None => self.embeddings.push(row),
        }
    }
}

/// Process-local store with the same semantics as the Postgres store.
///
/// The lock is only held for the duration of a single operation and never across an
/// await point.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    offline: AtomicBool,
    write_latency_ms: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay every embedding write by `latency` before it is applied.
    pub fn set_write_latency(&self, latency: Duration) {
        self.write_latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Seed an embedding row directly, bypassing latency and the offline switch.
    pub fn insert_embedding(&self, user_id: i64, vector: &[f32]) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.upsert_embedding_row(StoredEmbedding {
            user_id,
            vector: vector.to_vec(),
            generated_at: Utc::now(),
        });
    }

    pub fn insert_user(&self, user_id: i64, name: &str, bio: Option<&str>) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.users.insert(
            user_id,
            UserRow {
                name: name.to_string(),
                bio: bio.map(str::to_string),
            },
        );
    }

    pub fn add_skill(&self, user_id: i64, skill: &str, direction: SkillDirection) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .user_skills
            .push((user_id, skill.to_string(), direction));
    }

    pub fn insert_match(&self, match_id: i64, user1_id: i64, user2_id: i64) -> MatchRecord {
        let record = MatchRecord::new(match_id, user1_id, user2_id);
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.matches.insert(match_id, record.clone());
        record
    }

    pub fn match_record(&self, match_id: i64) -> Option<MatchRecord> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.matches.get(&match_id).cloned()
    }

    pub fn embedding_rows(&self, user_id: i64) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .embeddings
            .iter()
            .filter(|e| e.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl ProfileSource for MemoryStore {
    async fn fetch_profile(&self, user_id: i64) -> Result<Option<UserProfile>, StoreError> {
        let inner = self.lock()?;
        let Some(user) = inner.users.get(&user_id) else {
            return Ok(None);
        };

        let mut profile = UserProfile {
            user_id,
            name: user.name.clone(),
            bio: user.bio.clone(),
            ..Default::default()
        };
        for (_, skill, direction) in inner.user_skills.iter().filter(|s| s.0 == user_id) {
            profile.push_skill(skill.clone(), *direction);
        }
        Ok(Some(profile))
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn find_embedding(&self, user_id: i64) -> Result<Option<StoredEmbedding>, StoreError> {
        Ok(self.lock()?.embedding_of(user_id).cloned())
    }

    async fn upsert_embedding(
        &self,
        user_id: i64,
        vector: &[f32],
        generated_at: DateTime<Utc>,
        deadline: Duration,
    ) -> Result<(), StoreError> {
        let latency = Duration::from_millis(self.write_latency_ms.load(Ordering::SeqCst));
        if !latency.is_zero() && timeout(deadline, sleep(latency)).await.is_err() {
            return Err(StoreError::Timeout {
                operation: "upsert_embedding",
                after: deadline,
            });
        }

        let mut inner = self.lock()?;
        inner.upsert_embedding_row(StoredEmbedding {
            user_id,
            vector: vector.to_vec(),
            generated_at,
        });
        Ok(())
    }

    async fn nearest_neighbors(
        &self,
        user_id: i64,
        target: &[f32],
    ) -> Result<Vec<Neighbor>, StoreError> {
        let inner = self.lock()?;
        let mut neighbors = Vec::with_capacity(inner.embeddings.len());
        for row in inner.embeddings.iter().filter(|e| e.user_id != user_id) {
            let Some(user) = inner.users.get(&row.user_id) else {
                continue;
            };
            // pgvector rejects the whole query on a dimension mismatch
            let distance = inner_product_distance(target, &row.vector).ok_or_else(|| {
                StoreError::InvalidData(format!(
                    "different vector dimensions {} and {} for user {}",
                    target.len(),
                    row.vector.len(),
                    row.user_id
                ))
            })?;
            neighbors.push(Neighbor {
                user_id: row.user_id,
                name: user.name.clone(),
                distance,
            });
        }

        neighbors.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.user_id.cmp(&b.user_id))
        });
        Ok(neighbors)
    }
}

#[async_trait]
impl FeedbackLedger for MemoryStore {
    async fn find_match(&self, match_id: i64) -> Result<Option<MatchRecord>, StoreError> {
        Ok(self.lock()?.matches.get(&match_id).cloned())
    }

    async fn write_rating(
        &self,
        match_id: i64,
        slot: Slot,
        rating: i32,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        match inner.matches.get_mut(&match_id) {
            Some(record) => {
                record.set_rating(slot, rating);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn feedback_given_by(&self, user_id: i64) -> Result<HashMap<i64, i32>, StoreError> {
        let inner = self.lock()?;
        let mut feedback = HashMap::new();
        // ascending id order, so later matches overwrite earlier ones
        for record in inner.matches.values() {
            if let (Some(counterpart), Some(rating)) =
                (record.counterpart_of(user_id), record.feedback_from(user_id))
            {
                feedback.insert(counterpart, rating);
            }
        }
        Ok(feedback)
    }

    async fn matches_involving(&self, user_id: i64) -> Result<Vec<MatchRecord>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .matches
            .values()
            .rev()
            .filter(|m| m.slot_of(user_id).is_some())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}
