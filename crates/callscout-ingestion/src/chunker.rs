//! Fixed-size document chunker feeding the similarity index.

/// Chunk window in characters. Small enough that a chunk stays on one
/// topic, large enough to carry a full sentence or table row.
pub const CHUNK_SIZE: usize = 400;

/// Split a document into consecutive non-overlapping windows of at most
/// `size` characters. Chunks are trimmed; all-whitespace windows are
/// dropped. The final chunk may be shorter than `size`. A zero size is
/// treated as 1.
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);

    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size)
        .filter_map(|window| {
            let chunk: String = window.iter().collect();
            let trimmed = chunk.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}
