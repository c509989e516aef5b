use crate::error::{RaffleError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub type RequestId = u64;

/// Outbound call shape for a randomness request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomnessRequest {
    pub gas_lane: String,
    pub callback_gas_limit: u32,
    pub request_confirmations: u16,
    pub num_words: u32,
}

/// External randomness provider boundary. `request_randomness` returns
/// immediately with a correlation id; the word arrives later through an
/// independent delivery, possibly after an arbitrary delay.
#[async_trait]
pub trait RandomnessProvider: Send + Sync {
    async fn request_randomness(&self, request: RandomnessRequest) -> Result<RequestId>;
}

/// Correlates outstanding requests issued through this client. The provider
/// is not trusted to deliver at most once, so the client tracks which ids
/// are still live and rejects everything else.
pub struct OracleClient {
    provider: Arc<dyn RandomnessProvider>,
    outstanding: HashSet<RequestId>,
}

impl OracleClient {
    pub fn new(provider: Arc<dyn RandomnessProvider>) -> Self {
        Self {
            provider,
            outstanding: HashSet::new(),
        }
    }

    pub async fn request(&mut self, request: RandomnessRequest) -> Result<RequestId> {
        let request_id = self.provider.request_randomness(request).await?;
        self.outstanding.insert(request_id);
        tracing::debug!("issued randomness request {}", request_id);
        Ok(request_id)
    }

    pub fn is_outstanding(&self, request_id: RequestId) -> bool {
        self.outstanding.contains(&request_id)
    }

    /// Marks a delivered request as spent. Fails with `NonexistentRequest`
    /// if the id was never issued here or was already consumed.
    pub fn consume(&mut self, request_id: RequestId) -> Result<()> {
        if !self.outstanding.remove(&request_id) {
            return Err(RaffleError::NonexistentRequest { request_id });
        }
        Ok(())
    }
}

impl std::fmt::Debug for OracleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleClient")
            .field("outstanding", &self.outstanding)
            .finish()
    }
}

/// In-process randomness coordinator for tests and local simulation. Hands
/// out sequential request ids and derives each word by hashing the seed with
/// the request id, so a fixed seed replays the same words.
pub struct MockCoordinator {
    seed: u64,
    next_id: Mutex<RequestId>,
    pending: Mutex<HashMap<RequestId, RandomnessRequest>>,
}

impl MockCoordinator {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            next_id: Mutex::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Derives the random word for an accepted request and removes it from
    /// the pending table. Each request can be fulfilled exactly once.
    pub fn fulfillment(&self, request_id: RequestId) -> Result<u64> {
        if self.pending.lock().remove(&request_id).is_none() {
            return Err(RaffleError::NonexistentRequest { request_id });
        }
        Ok(self.derive_word(request_id))
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn pending_request(&self, request_id: RequestId) -> Option<RandomnessRequest> {
        self.pending.lock().get(&request_id).cloned()
    }

    fn derive_word(&self, request_id: RequestId) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(request_id.to_le_bytes());
        let digest = hasher.finalize();

        let mut word = [0u8; 8];
        word.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(word)
    }
}

#[async_trait]
impl RandomnessProvider for MockCoordinator {
    async fn request_randomness(&self, request: RandomnessRequest) -> Result<RequestId> {
        let mut next_id = self.next_id.lock();
        let request_id = *next_id;
        *next_id += 1;

        self.pending.lock().insert(request_id, request);
        tracing::debug!("mock coordinator accepted request {}", request_id);
        Ok(request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_request() -> RandomnessRequest {
        RandomnessRequest {
            gas_lane: "00".repeat(32),
            callback_gas_limit: 500_000,
            request_confirmations: 3,
            num_words: 1,
        }
    }

    #[tokio::test]
    async fn coordinator_hands_out_sequential_ids() {
        let coordinator = MockCoordinator::new(7);

        let first = coordinator.request_randomness(test_request()).await.unwrap();
        let second = coordinator.request_randomness(test_request()).await.unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(coordinator.pending_count(), 2);
    }

    #[tokio::test]
    async fn fulfillment_is_exactly_once() {
        let coordinator = MockCoordinator::new(7);
        let request_id = coordinator.request_randomness(test_request()).await.unwrap();

        coordinator.fulfillment(request_id).unwrap();
        let err = coordinator.fulfillment(request_id).unwrap_err();

        assert!(matches!(err, RaffleError::NonexistentRequest { .. }));
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn unknown_request_cannot_be_fulfilled() {
        let coordinator = MockCoordinator::new(7);
        let err = coordinator.fulfillment(99).unwrap_err();
        assert!(matches!(
            err,
            RaffleError::NonexistentRequest { request_id: 99 }
        ));
    }

    #[tokio::test]
    async fn words_are_deterministic_for_a_seed() {
        let a = MockCoordinator::new(42);
        let b = MockCoordinator::new(42);
        let c = MockCoordinator::new(43);

        let id_a = a.request_randomness(test_request()).await.unwrap();
        let id_b = b.request_randomness(test_request()).await.unwrap();
        let id_c = c.request_randomness(test_request()).await.unwrap();

        let word_a = a.fulfillment(id_a).unwrap();
        let word_b = b.fulfillment(id_b).unwrap();
        let word_c = c.fulfillment(id_c).unwrap();

        assert_eq!(word_a, word_b);
        assert_ne!(word_a, word_c);
    }

    #[tokio::test]
    async fn client_tracks_outstanding_requests() {
        let coordinator = Arc::new(MockCoordinator::new(7));
        let mut client = OracleClient::new(coordinator);

        let request_id = client.request(test_request()).await.unwrap();
        assert!(client.is_outstanding(request_id));

        client.consume(request_id).unwrap();
        assert!(!client.is_outstanding(request_id));

        let err = client.consume(request_id).unwrap_err();
        assert!(matches!(err, RaffleError::NonexistentRequest { .. }));
    }

    #[tokio::test]
    async fn unissued_request_cannot_be_consumed() {
        let coordinator = Arc::new(MockCoordinator::new(7));
        let mut client = OracleClient::new(coordinator);

        let err = client.consume(12).unwrap_err();
        assert!(matches!(
            err,
            RaffleError::NonexistentRequest { request_id: 12 }
        ));
    }
}
