//! Overlapping text chunking for knowledge-base indexing.

/// Characters per chunk.
pub const CHUNK_SIZE: usize = 1500;

/// Characters shared between consecutive chunks.
pub const CHUNK_OVERLAP: usize = 100;

/// Split text into overlapping character windows.
///
/// Consecutive chunks share `overlap` characters so content spanning a
/// boundary remains findable.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let step = chunk_size.saturating_sub(overlap).max(1);
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();

    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        start += step;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk_text("hello world", CHUNK_SIZE, CHUNK_OVERLAP);
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunk_text("", CHUNK_SIZE, CHUNK_OVERLAP).is_empty());
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let text = "ab".repeat(1200);
        let chunks = chunk_text(&text, 1500, 100);
        assert_eq!(chunks.len(), 2);
        let first_tail: String = chunks[0].chars().skip(1400).collect();
        let second_head: String = chunks[1].chars().take(100).collect();
        assert_eq!(first_tail, second_head);
    }

    #[test]
    fn degenerate_overlap_still_terminates() {
        let chunks = chunk_text(&"x".repeat(10), 4, 4);
        assert!(!chunks.is_empty());
        assert!(chunks.len() <= 10);
    }
}
