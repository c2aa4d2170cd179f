//! Recursive character splitter.
//!
//! Fallback chunking for résumés without structured data: split on the
//! most meaningful separator available (paragraph, line, word, char),
//! then greedily merge pieces up to the chunk size, retaining a tail of
//! the previous chunk as overlap.

/// Character-budget recursive splitter.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for RecursiveSplitter {
    fn default() -> Self {
        Self::new(1000, 200)
    }
}

impl RecursiveSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                " ".to_string(),
                String::new(),
            ],
        }
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        // Pick the first separator that actually occurs; "" always matches.
        let (index, separator) = separators
            .iter()
            .enumerate()
            .find(|(_, sep)| sep.is_empty() || text.contains(sep.as_str()))
            .map(|(i, sep)| (i, sep.clone()))
            .unwrap_or((separators.len() - 1, String::new()));
        let remaining = &separators[index + 1..];

        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(|c| c.to_string()).collect()
        } else {
            text.split(separator.as_str()).map(|s| s.to_string()).collect()
        };

        let mut chunks = Vec::new();
        let mut mergeable: Vec<String> = Vec::new();

        for piece in pieces {
            if char_len(&piece) < self.chunk_size {
                mergeable.push(piece);
                continue;
            }

            if !mergeable.is_empty() {
                chunks.extend(self.merge(&mergeable, &separator));
                mergeable.clear();
            }

            if remaining.is_empty() {
                push_trimmed(&mut chunks, &piece);
            } else {
                chunks.extend(self.split_recursive(&piece, remaining));
            }
        }

        if !mergeable.is_empty() {
            chunks.extend(self.merge(&mergeable, &separator));
        }

        chunks
    }

    /// Greedily pack pieces into chunks of at most `chunk_size` chars,
    /// carrying an overlap tail between consecutive chunks.
    fn merge(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: Vec<String> = Vec::new();
        let mut window_len = 0usize;

        for piece in pieces {
            let piece_len = char_len(piece);
            let joined_len = window_len + piece_len + if window.is_empty() { 0 } else { sep_len };

            if joined_len > self.chunk_size && !window.is_empty() {
                push_trimmed(&mut chunks, &window.join(separator));

                // Drop from the front until the retained tail fits the
                // overlap budget and leaves room for the next piece.
                while window_len > self.chunk_overlap
                    || (window_len + piece_len + sep_len > self.chunk_size && window_len > 0)
                {
                    let removed = char_len(&window.remove(0));
                    window_len -= removed + if window.is_empty() { 0 } else { sep_len };
                }
            }

            if !window.is_empty() {
                window_len += sep_len;
            }
            window_len += piece_len;
            window.push(piece.clone());
        }

        if !window.is_empty() {
            push_trimmed(&mut chunks, &window.join(separator));
        }

        chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_trimmed(chunks: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
