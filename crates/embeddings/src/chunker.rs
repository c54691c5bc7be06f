use anyhow::Result;
use std::collections::VecDeque;

/// Separators tried in order, from paragraph breaks down to single characters.
const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A text chunk with metadata
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub content: String,
    pub chunk_id: usize,
}

/// Configuration for text chunking, measured in characters
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub overlap_size: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap_size: 50,
        }
    }
}

impl ChunkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            anyhow::bail!("chunk_size must be greater than zero");
        }
        if self.overlap_size >= self.chunk_size {
            anyhow::bail!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.overlap_size,
                self.chunk_size
            );
        }
        Ok(())
    }
}

/// Recursive character splitter.
///
/// Text is split on the coarsest separator it contains, pieces shorter than
/// `chunk_size` are greedily merged back together, and pieces that are still
/// too long are split again with the next separator. Adjacent chunks share up
/// to `overlap_size` characters of trailing context.
pub struct TextChunker {
    config: ChunkConfig,
}

impl TextChunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    pub fn chunk_text(&self, text: &str) -> Vec<TextChunk> {
        if text.trim().is_empty() {
            return vec![];
        }

        self.split_recursive(text, &DEFAULT_SEPARATORS)
            .into_iter()
            .enumerate()
            .map(|(chunk_id, content)| TextChunk { content, chunk_id })
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[&'static str]) -> Vec<String> {
        let (separator, remaining) = pick_separator(text, separators);

        let splits: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator)
                .filter(|piece| !piece.is_empty())
                .map(str::to_string)
                .collect()
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for split in splits {
            if char_len(&split) < self.config.chunk_size {
                pending.push(split);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge_splits(&pending, separator));
                pending.clear();
            }

            if remaining.is_empty() {
                chunks.push(split);
            } else {
                chunks.extend(self.split_recursive(&split, remaining));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge_splits(&pending, separator));
        }

        chunks
    }

    fn merge_splits(&self, splits: &[String], separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for split in splits {
            let len = char_len(split);
            let joined_len = |current: &VecDeque<&str>, total: usize| {
                total + len + if current.is_empty() { 0 } else { separator_len }
            };

            if joined_len(&current, total) > self.config.chunk_size {
                if total > self.config.chunk_size {
                    tracing::warn!(
                        length = total,
                        chunk_size = self.config.chunk_size,
                        "created a chunk longer than the configured size"
                    );
                }

                if !current.is_empty() {
                    if let Some(chunk) = join_trimmed(&current, separator) {
                        chunks.push(chunk);
                    }

                    while total > self.config.overlap_size
                        || (joined_len(&current, total) > self.config.chunk_size && total > 0)
                    {
                        let dropped_separator = if current.len() > 1 { separator_len } else { 0 };
                        let Some(first) = current.pop_front() else {
                            break;
                        };
                        total = total.saturating_sub(char_len(first) + dropped_separator);
                    }
                }
            }

            current.push_back(split.as_str());
            total += len + if current.len() > 1 { separator_len } else { 0 };
        }

        if let Some(chunk) = join_trimmed(&current, separator) {
            chunks.push(chunk);
        }

        chunks
    }

    /// Number of characters, the unit `chunk_size` is measured in
    pub fn measure(&self, text: &str) -> usize {
        char_len(text)
    }
}

fn pick_separator<'s>(
    text: &str,
    separators: &'s [&'static str],
) -> (&'static str, &'s [&'static str]) {
    for (i, &separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return (separator, &[]);
        }
        if text.contains(separator) {
            return (separator, &separators[i + 1..]);
        }
    }
    ("", &[])
}

fn join_trimmed(parts: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = parts.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
