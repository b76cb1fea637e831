use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use super::scoring::rank_candidates;
use super::weights::{FeedbackBlend, FEEDBACK_BLEND};
use crate::api::match_response::MatchCandidate;
use crate::config::EngineConfig;
use crate::encoder::{vector, EncodeError, ProfileEncoder};
use crate::error::{InfraError, MatchError};
use crate::store::{MatchRecord, MatchStore, Slot, StoreError};

/// Embedding generation, match scoring and feedback recording over an injected store and
/// encoder.
///
/// Built once per process and shared; every call is an independent unit of work that
/// checks out its own store resources.
pub struct MatchEngine {
    store: Arc<dyn MatchStore>,
    encoder: Arc<dyn ProfileEncoder>,
    config: EngineConfig,
    blend: FeedbackBlend,
}

impl MatchEngine {
    pub fn new(
        store: Arc<dyn MatchStore>,
        encoder: Arc<dyn ProfileEncoder>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            encoder,
            config,
            blend: FEEDBACK_BLEND,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn store_call<T, F>(&self, operation: &'static str, fut: F) -> Result<T, MatchError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match timeout(self.config.store_timeout, fut).await {
            Ok(result) => result.map_err(MatchError::from),
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.config.store_timeout.as_millis() as u64,
                    "store call timed out"
                );
                Err(InfraError::Timeout {
                    operation,
                    after: self.config.store_timeout,
                }
                .into())
            }
        }
    }

    /// Run the encoder on the blocking pool and return a unit-length vector.
    async fn encode(&self, text: String) -> Result<Vec<f32>, MatchError> {
        let encoder = Arc::clone(&self.encoder);
        let task = tokio::task::spawn_blocking(move || encoder.encode(&text));

        let joined = timeout(self.config.encode_timeout, task)
            .await
            .map_err(|_| InfraError::Timeout {
                operation: "encode",
                after: self.config.encode_timeout,
            })?;
        let mut embedding = joined.map_err(|err| InfraError::Task(err.to_string()))??;

        let expected = self.encoder.dimension();
        if embedding.len() != expected {
            return Err(EncodeError::Dimension {
                expected,
                actual: embedding.len(),
            }
            .into());
        }
        if !vector::l2_normalize(&mut embedding) {
            return Err(EncodeError::Degenerate.into());
        }
        Ok(embedding)
    }

    /// Build the user's profile text, embed it and upsert the single embedding row.
    ///
    /// On any failure, including a timeout, the previously stored embedding is left as it
    /// was.
    #[instrument(skip(self))]
    pub async fn generate_and_store(&self, user_id: i64) -> Result<(), MatchError> {
        let started = Instant::now();

        let profile = self
            .store_call("fetch_profile", self.store.fetch_profile(user_id))
            .await?
            .ok_or(MatchError::UserNotFound(user_id))?;

        let embedding = self.encode(profile.profile_text()).await?;

        // The store bounds the write up to its commit and then waits for the outcome, so a
        // timeout here always means the previous row is untouched.
        self.store
            .upsert_embedding(user_id, &embedding, Utc::now(), self.config.store_timeout)
            .await?;

        info!(
            user_id,
            encoder = self.encoder.name(),
            encoder_version = self.encoder.version(),
            dimension = embedding.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "embedding stored"
        );
        Ok(())
    }

    /// Best `top_k` candidates for `user_id`, ranked by similarity blended with the
    /// ratings `user_id` gave in earlier matches.
    #[instrument(skip(self))]
    pub async fn top_matches(
        &self,
        user_id: i64,
        top_k: usize,
    ) -> Result<Vec<MatchCandidate>, MatchError> {
        if top_k == 0 {
            return Err(MatchError::InvalidTopK);
        }
        let started = Instant::now();

        let target = self
            .store_call("find_embedding", self.store.find_embedding(user_id))
            .await?
            .ok_or(MatchError::NoEmbedding(user_id))?;

        let (neighbors, feedback) = tokio::try_join!(
            self.store_call(
                "nearest_neighbors",
                self.store.nearest_neighbors(user_id, &target.vector),
            ),
            self.store_call("feedback_given_by", self.store.feedback_given_by(user_id)),
        )?;

        let candidates = neighbors.len();
        let rated = feedback.len();
        let ranked = rank_candidates(user_id, neighbors, &feedback, &self.blend, top_k);

        info!(
            user_id,
            top_k,
            candidates,
            rated,
            returned = ranked.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "matches ranked"
        );
        Ok(ranked)
    }

    /// Store `rating` in the rater's own slot of the match, replacing any earlier rating.
    #[instrument(skip(self))]
    pub async fn submit_feedback(
        &self,
        match_id: i64,
        user_id: i64,
        rating: i32,
    ) -> Result<Slot, MatchError> {
        let record = self
            .store_call("find_match", self.store.find_match(match_id))
            .await?
            .ok_or(MatchError::MatchNotFound(match_id))?;

        let slot = record
            .slot_of(user_id)
            .ok_or(MatchError::NotParticipant { match_id, user_id })?;

        let written = self
            .store_call(
                "write_rating",
                self.store.write_rating(match_id, slot, rating),
            )
            .await?;
        if !written {
            return Err(MatchError::MatchNotFound(match_id));
        }

        info!(match_id, user_id, slot = slot.as_ref(), rating, "feedback recorded");
        Ok(slot)
    }

    pub async fn matches_involving(&self, user_id: i64) -> Result<Vec<MatchRecord>, MatchError> {
        self.store_call("matches_involving", self.store.matches_involving(user_id))
            .await
    }

    pub async fn ping(&self) -> Result<(), MatchError> {
        self.store_call("ping", self.store.ping()).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::encoder::vector::l2_norm;
    use crate::encoder::{EncoderConfig, HashEncoder};
    use crate::error::ErrorKind;
    use crate::profile::{SkillDirection, UserProfile};
    use crate::store::{
        FeedbackLedger, MemoryStore, Neighbor, ProfileSource, StoredEmbedding, VectorStore,
    };
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::collections::HashMap;

    /// Returns the same raw vector for every text.
    struct FixedEncoder {
        output: Vec<f32>,
        dimension: usize,
        delay: Duration,
    }

    impl ProfileEncoder for FixedEncoder {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn version(&self) -> &str {
            "test"
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn encode(&self, _text: &str) -> Result<Vec<f32>, EncodeError> {
            std::thread::sleep(self.delay);
            Ok(self.output.clone())
        }
    }

    fn engine_with(store: Arc<MemoryStore>, encoder: Arc<dyn ProfileEncoder>) -> MatchEngine {
        MatchEngine::new(store, encoder, EngineConfig::default())
    }

    fn hash_engine(store: Arc<MemoryStore>) -> MatchEngine {
        let encoder = Arc::new(HashEncoder::new(EncoderConfig {
            dimension: 64,
            bigram_weight: 0.5,
        }));
        engine_with(store, encoder)
    }

    /// Unit vector in 2D whose inner product with `[1, 0]` is `similarity`.
    fn at_similarity(similarity: f32) -> Vec<f32> {
        vec![similarity, (1.0 - similarity * similarity).sqrt()]
    }

    /// Requester 1 at `[1, 0]`, candidates 2.. at the given similarities.
    async fn seeded_store(similarities: &[f32]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.insert_user(1, "requester", None);
        store.insert_embedding(1, &[1.0, 0.0]);
        for (i, sim) in similarities.iter().enumerate() {
            let id = i as i64 + 2;
            store.insert_user(id, &format!("candidate-{id}"), None);
            store.insert_embedding(id, &at_similarity(*sim));
        }
        store
    }

    /// Applies writes immediately but acknowledges them late, like a commit whose reply
    /// is slow to arrive.
    struct SlowAckStore {
        inner: Arc<MemoryStore>,
        ack_delay: Duration,
    }

    #[async_trait]
    impl ProfileSource for SlowAckStore {
        async fn fetch_profile(&self, user_id: i64) -> Result<Option<UserProfile>, StoreError> {
            self.inner.fetch_profile(user_id).await
        }
    }

    #[async_trait]
    impl VectorStore for SlowAckStore {
        async fn find_embedding(
            &self,
            user_id: i64,
        ) -> Result<Option<StoredEmbedding>, StoreError> {
            self.inner.find_embedding(user_id).await
        }

        async fn upsert_embedding(
            &self,
            user_id: i64,
            vector: &[f32],
            generated_at: DateTime<Utc>,
            deadline: Duration,
        ) -> Result<(), StoreError> {
            self.inner
                .upsert_embedding(user_id, vector, generated_at, deadline)
                .await?;
            tokio::time::sleep(self.ack_delay).await;
            Ok(())
        }

        async fn nearest_neighbors(
            &self,
            user_id: i64,
            target: &[f32],
        ) -> Result<Vec<Neighbor>, StoreError> {
            self.inner.nearest_neighbors(user_id, target).await
        }
    }

    #[async_trait]
    impl FeedbackLedger for SlowAckStore {
        async fn find_match(&self, match_id: i64) -> Result<Option<MatchRecord>, StoreError> {
            self.inner.find_match(match_id).await
        }

        async fn write_rating(
            &self,
            match_id: i64,
            slot: Slot,
            rating: i32,
        ) -> Result<bool, StoreError> {
            self.inner.write_rating(match_id, slot, rating).await
        }

        async fn feedback_given_by(
            &self,
            user_id: i64,
        ) -> Result<HashMap<i64, i32>, StoreError> {
            self.inner.feedback_given_by(user_id).await
        }

        async fn matches_involving(
            &self,
            user_id: i64,
        ) -> Result<Vec<MatchRecord>, StoreError> {
            self.inner.matches_involving(user_id).await
        }
    }

    #[async_trait]
    impl MatchStore for SlowAckStore {
        async fn ping(&self) -> Result<(), StoreError> {
            self.inner.ping().await
        }
    }

    fn fixed_encoder(output: Vec<f32>) -> Arc<FixedEncoder> {
        Arc::new(FixedEncoder {
            dimension: output.len(),
            output,
            delay: Duration::ZERO,
        })
    }

    fn short_store_budget() -> EngineConfig {
        EngineConfig {
            store_timeout: Duration::from_millis(50),
            ..EngineConfig::default()
        }
    }

    #[tokio::test]
    async fn repeated_embedding_keeps_one_unit_row() {
        let store = Arc::new(MemoryStore::new());
        store.insert_user(1, "ann", Some("Gardener"));
        store.add_skill(1, "botany", SkillDirection::Teach);
        store.add_skill(1, "spanish", SkillDirection::Learn);
        let engine = hash_engine(store.clone());

        for _ in 0..3 {
            engine.generate_and_store(1).await.unwrap();
        }

        assert_eq!(store.embedding_rows(1), 1);
        let stored = store.find_embedding(1).await.unwrap().unwrap();
        assert_eq!(stored.vector.len(), 64);
        assert!((l2_norm(&stored.vector) - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn concurrent_embedding_of_one_user_keeps_one_unit_row() {
        let store = Arc::new(MemoryStore::new());
        store.insert_user(1, "ann", Some("Gardener"));
        store.add_skill(1, "botany", SkillDirection::Teach);
        let engine = Arc::new(hash_engine(store.clone()));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let engine = Arc::clone(&engine);
            tasks.spawn(async move { engine.generate_and_store(1).await });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        assert_eq!(store.embedding_rows(1), 1);
        let stored = store.find_embedding(1).await.unwrap().unwrap();
        assert!((l2_norm(&stored.vector) - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn store_timeout_before_commit_keeps_previous_row() {
        let store = Arc::new(MemoryStore::new());
        store.insert_user(1, "ann", None);
        store.insert_embedding(1, &[0.0, 1.0]);
        store.set_write_latency(Duration::from_millis(200));
        let engine = MatchEngine::new(
            store.clone(),
            fixed_encoder(vec![1.0, 0.0]),
            short_store_budget(),
        );

        let err = engine.generate_and_store(1).await.unwrap_err();

        assert!(err.is_timeout());
        let stored = store.find_embedding(1).await.unwrap().unwrap();
        assert_eq!(stored.vector, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn slow_commit_acknowledgement_is_not_reported_as_timeout() {
        let memory = Arc::new(MemoryStore::new());
        memory.insert_user(1, "ann", None);
        memory.insert_embedding(1, &[0.0, 1.0]);
        let store = Arc::new(SlowAckStore {
            inner: memory.clone(),
            ack_delay: Duration::from_millis(200),
        });
        let engine = MatchEngine::new(store, fixed_encoder(vec![1.0, 0.0]), short_store_budget());

        let result = engine.generate_and_store(1).await;

        // the reported outcome has to agree with what is stored
        let stored = memory.find_embedding(1).await.unwrap().unwrap();
        assert!(result.is_ok(), "unexpected error: {result:?}");
        assert_eq!(stored.vector, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn encoder_output_is_normalized_before_storing() {
        let store = Arc::new(MemoryStore::new());
        store.insert_user(1, "ann", None);
        let encoder = Arc::new(FixedEncoder {
            output: vec![3.0, 4.0],
            dimension: 2,
            delay: Duration::ZERO,
        });
        let engine = engine_with(store.clone(), encoder);

        engine.generate_and_store(1).await.unwrap();

        let stored = store.find_embedding(1).await.unwrap().unwrap();
        assert!((stored.vector[0] - 0.6).abs() < 1e-6);
        assert!((stored.vector[1] - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn embedding_unknown_user_is_not_found() {
        let engine = hash_engine(Arc::new(MemoryStore::new()));
        let err = engine.generate_and_store(404).await.unwrap_err();
        assert!(matches!(err, MatchError::UserNotFound(404)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn wrong_dimension_is_infrastructure_error() {
        let store = Arc::new(MemoryStore::new());
        store.insert_user(1, "ann", None);
        let encoder = Arc::new(FixedEncoder {
            output: vec![1.0, 0.0],
            dimension: 3,
            delay: Duration::ZERO,
        });
        let engine = engine_with(store.clone(), encoder);

        let err = engine.generate_and_store(1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert_eq!(store.embedding_rows(1), 0);
    }

    #[tokio::test]
    async fn encode_timeout_leaves_previous_embedding() {
        let store = Arc::new(MemoryStore::new());
        store.insert_user(1, "ann", None);
        store.insert_embedding(1, &[0.0, 1.0]);
        let encoder = Arc::new(FixedEncoder {
            output: vec![1.0, 0.0],
            dimension: 2,
            delay: Duration::from_millis(200),
        });
        let config = EngineConfig {
            encode_timeout: Duration::from_millis(20),
            ..EngineConfig::default()
        };
        let engine = MatchEngine::new(store.clone(), encoder, config);

        let err = engine.generate_and_store(1).await.unwrap_err();
        assert!(err.is_timeout());
        let stored = store.find_embedding(1).await.unwrap().unwrap();
        assert_eq!(stored.vector, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn store_outage_surfaces_as_infrastructure() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);
        let engine = hash_engine(store);

        let err = engine.top_matches(1, 5).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
    }

    #[tokio::test]
    async fn matching_before_embedding_is_no_embedding() {
        let store = Arc::new(MemoryStore::new());
        store.insert_user(1, "ann", None);
        let engine = hash_engine(store);

        let err = engine.top_matches(1, 5).await.unwrap_err();
        assert!(matches!(err, MatchError::NoEmbedding(1)));
    }

    #[tokio::test]
    async fn zero_top_k_is_rejected() {
        let engine = hash_engine(seeded_store(&[0.5]).await);
        let err = engine.top_matches(1, 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn requester_never_matches_itself() {
        let store = seeded_store(&[0.2, 0.4]).await;
        let engine = hash_engine(store);

        for user_id in [1, 2, 3] {
            let matches = engine.top_matches(user_id, 10).await.unwrap();
            assert_eq!(matches.len(), 2);
            assert!(matches.iter().all(|m| m.user_id != user_id));
        }
    }

    #[tokio::test]
    async fn ranks_by_similarity_and_truncates() {
        let engine = hash_engine(seeded_store(&[0.9, 0.5, 0.8]).await);

        let matches = engine.top_matches(1, 2).await.unwrap();

        let sims: Vec<f64> = matches.iter().map(|m| m.similarity).collect();
        assert_eq!(sims.len(), 2);
        assert!((sims[0] - 0.9).abs() < 1e-4);
        assert!((sims[1] - 0.8).abs() < 1e-4);
    }

    #[tokio::test]
    async fn top_k_returns_exactly_the_best_two_of_five() {
        let engine = hash_engine(seeded_store(&[0.1, 0.7, 0.3, 0.95, 0.6]).await);

        let matches = engine.top_matches(1, 2).await.unwrap();

        let ids: Vec<i64> = matches.iter().map(|m| m.user_id).collect();
        assert_eq!(ids, vec![5, 3]);
    }

    #[tokio::test]
    async fn unrated_candidates_keep_their_similarity() {
        let engine = hash_engine(seeded_store(&[0.65, 0.3]).await);

        let matches = engine.top_matches(1, 5).await.unwrap();

        for m in &matches {
            assert_eq!(m.previous_feedback, None);
            assert_eq!(m.score, m.similarity);
        }
    }

    #[tokio::test]
    async fn ratings_blend_into_score() {
        let store = seeded_store(&[0.8, 0.6]).await;
        store.insert_match(10, 1, 2);
        store.insert_match(11, 3, 1);
        let engine = hash_engine(store);

        engine.submit_feedback(10, 1, 5).await.unwrap();
        engine.submit_feedback(11, 1, 1).await.unwrap();
        let matches = engine.top_matches(1, 5).await.unwrap();

        let best = &matches[0];
        assert_eq!(best.user_id, 2);
        assert_eq!(best.previous_feedback, Some(5));
        assert!((best.score - (0.7 * 0.8 + 0.3)).abs() < 1e-4);

        let worst = &matches[1];
        assert_eq!(worst.user_id, 3);
        assert_eq!(worst.previous_feedback, Some(1));
        assert!((worst.score - 0.7 * 0.6).abs() < 1e-4);
    }

    #[tokio::test]
    async fn feedback_only_counts_for_the_rater() {
        let store = seeded_store(&[0.5]).await;
        store.insert_match(7, 2, 1);
        let engine = hash_engine(store.clone());

        let slot = engine.submit_feedback(7, 1, 4).await.unwrap();
        assert_eq!(slot, Slot::Second);
        assert_eq!(store.match_record(7).unwrap().feedback_user2, Some(4));

        let as_rater = engine.top_matches(1, 5).await.unwrap();
        assert_eq!(as_rater[0].user_id, 2);
        assert_eq!(as_rater[0].previous_feedback, Some(4));

        let as_rated = engine.top_matches(2, 5).await.unwrap();
        assert_eq!(as_rated[0].user_id, 1);
        assert_eq!(as_rated[0].previous_feedback, None);
    }

    #[tokio::test]
    async fn resubmitting_overwrites_the_slot() {
        let store = seeded_store(&[0.5]).await;
        store.insert_match(7, 1, 2);
        let engine = hash_engine(store.clone());

        engine.submit_feedback(7, 1, 2).await.unwrap();
        engine.submit_feedback(7, 1, 5).await.unwrap();

        let record = store.match_record(7).unwrap();
        assert_eq!(record.feedback_user1, Some(5));
        assert_eq!(record.feedback_user2, None);
    }

    #[tokio::test]
    async fn strangers_cannot_rate_a_match() {
        let store = seeded_store(&[0.5, 0.5]).await;
        store.insert_match(7, 1, 2);
        let engine = hash_engine(store.clone());

        let err = engine.submit_feedback(7, 3, 3).await.unwrap_err();
        assert!(matches!(
            err,
            MatchError::NotParticipant {
                match_id: 7,
                user_id: 3
            }
        ));
        assert_eq!(store.match_record(7).unwrap(), MatchRecord::new(7, 1, 2));
    }

    #[tokio::test]
    async fn rating_unknown_match_is_not_found() {
        let engine = hash_engine(Arc::new(MemoryStore::new()));
        let err = engine.submit_feedback(77, 1, 3).await.unwrap_err();
        assert!(matches!(err, MatchError::MatchNotFound(77)));
    }

    #[tokio::test]
    async fn embedded_profiles_rank_by_shared_skills() {
        let store = Arc::new(MemoryStore::new());
        store.insert_user(1, "ann", Some("Rust developer"));
        store.add_skill(1, "rust", SkillDirection::Teach);
        store.add_skill(1, "piano", SkillDirection::Learn);
        store.insert_user(2, "ben", Some("Rust developer"));
        store.add_skill(2, "rust", SkillDirection::Teach);
        store.add_skill(2, "piano", SkillDirection::Learn);
        store.insert_user(3, "cat", Some("Pastry chef"));
        store.add_skill(3, "baking", SkillDirection::Teach);
        let engine = hash_engine(store);

        for id in [1, 2, 3] {
            engine.generate_and_store(id).await.unwrap();
        }
        let matches = engine.top_matches(1, 5).await.unwrap();

        assert_eq!(matches[0].user_id, 2);
        assert!((matches[0].similarity - 1.0).abs() < 1e-4);
        assert_eq!(matches.len(), 2);
    }
}
