//! BM25-style sparse encoder.
//!
//! Produces the sparse side of a hybrid point without any external model:
//! tokens are lowercased alphanumeric runs, indices are a stable hash of
//! the token, and values are BM25 term-frequency weights. Document and
//! query encoding share the tokenizer so indices line up; queries use a
//! plain presence weight.

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Bm25SparseEncoder {
    k1: f32,
    b: f32,
    /// Assumed average document length in tokens.
    avg_len: f32,
}

impl Default for Bm25SparseEncoder {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75, avg_len: 256.0 }
    }
}

impl Bm25SparseEncoder {
    /// Encode a document: BM25 term-frequency saturation with length
    /// normalization.
    pub fn encode_document(&self, text: &str) -> (Vec<u32>, Vec<f32>) {
        let tokens = tokenize(text);
        let doc_len = tokens.len() as f32;

        let mut term_freq: HashMap<u32, f32> = HashMap::new();
        for token in &tokens {
            *term_freq.entry(token_index(token)).or_insert(0.0) += 1.0;
        }

        let norm = 1.0 - self.b + self.b * (doc_len / self.avg_len);
        let mut entries: Vec<(u32, f32)> = term_freq
            .into_iter()
            .map(|(index, tf)| {
                let weight = tf * (self.k1 + 1.0) / (tf + self.k1 * norm);
                (index, weight)
            })
            .collect();
        entries.sort_by_key(|(index, _)| *index);

        entries.into_iter().unzip()
    }

    /// Encode a query: every distinct token with unit weight.
    pub fn encode_query(&self, text: &str) -> (Vec<u32>, Vec<f32>) {
        let mut indices: Vec<u32> = tokenize(text).iter().map(|t| token_index(t)).collect();
        indices.sort_unstable();
        indices.dedup();
        let values = vec![1.0; indices.len()];
        (indices, values)
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| s.len() >= 2)
        .map(|s| s.to_string())
        .collect()
}

/// Stable token → dimension mapping (FNV-1a over the token bytes).
fn token_index(token: &str) -> u32 {
    let mut hash: u32 = 0x811c9dc5;
    for byte in token.as_bytes() {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(0x01000193);
    }
    hash
}
