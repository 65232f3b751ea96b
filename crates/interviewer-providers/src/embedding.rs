//! Offline, deterministic embeddings.
//!
//! [`HashedEmbedder`] feature-hashes the lemmatized keyword set of a text into a
//! fixed number of buckets and L2-normalizes the result. Texts sharing many
//! keywords land close together; unrelated texts are near-orthogonal.

use async_trait::async_trait;

use interviewer_core::keywords::KeywordGapExtractor;
use interviewer_core::traits::EmbeddingGateway;

pub const DEFAULT_DIMENSION: usize = 256;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

#[derive(Debug, Clone)]
pub struct HashedEmbedder {
    dimension: usize,
    extractor: KeywordGapExtractor,
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl HashedEmbedder {
    /// `dimension` is clamped to at least 8 buckets.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(8),
            extractor: KeywordGapExtractor::default(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for keyword in self.extractor.extract_keywords(text) {
            let hash = fnv1a(keyword.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            // High bit picks the sign so collisions tend to cancel rather than pile up.
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingGateway for HashedEmbedder {
    fn name(&self) -> &str {
        "hashed"
    }

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
}
