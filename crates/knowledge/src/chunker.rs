//! Text chunking with configurable size and overlap.
//!
//! Sizes are measured in characters. A chunk ends at the last paragraph
//! break, line break or space inside its window when one exists past the
//! window's midpoint, so rows and sentences are rarely cut in half.

use crate::types::ChunkCandidate;

const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Chunk text into overlapping segments.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<ChunkCandidate> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    if chars.is_empty() || chunk_size == 0 {
        return vec![];
    }

    let overlap = overlap.min(chunk_size.saturating_sub(1));
    let byte_at = |i: usize| chars.get(i).map(|(b, _)| *b).unwrap_or(text.len());

    let mut chunks = Vec::new();
    let mut position = 0u32;
    let mut start = 0usize;

    while start < chars.len() {
        let window_end = (start + chunk_size).min(chars.len());
        let end = if window_end == chars.len() {
            window_end
        } else {
            let min = byte_at(start + chunk_size / 2 + 1);
            split_point(text, byte_at(start), min, byte_at(window_end))
                .map(|byte| chars.partition_point(|(b, _)| *b < byte))
                .unwrap_or(window_end)
        };

        let piece = text[byte_at(start)..byte_at(end)].trim();
        if !piece.is_empty() {
            chunks.push(ChunkCandidate {
                position,
                text: piece.to_string(),
            });
            position += 1;
        }

        if end == chars.len() {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

/// Byte offset just past the last separator inside `text[from..to]`, taking
/// the coarsest separator that still ends the chunk at or after `min`.
fn split_point(text: &str, from: usize, min: usize, to: usize) -> Option<usize> {
    let window = &text[from..to];
    SEPARATORS.iter().find_map(|sep| {
        window
            .rfind(sep)
            .map(|i| from + i + sep.len())
            .filter(|&end| end >= min)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_wider_than_early_split() {
        // The space splits the first window at 6, before the 9-char overlap.
        let text = "aaaaa bbbbbbbbbbbbbbbbbbbb";
        let chunks = chunk_text(text, 10, 9);

        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].text, "aaaaa");
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 10));
        assert!(chunks.last().unwrap().text.ends_with("bbbb"));
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.position, i as u32);
        }
    }

    #[test]
    fn test_chunk_text_basic() {
        let text = "a".repeat(1000);
        let chunks = chunk_text(&text, 200, 50);

        assert_eq!(chunks[0].position, 0);
        assert_eq!(chunks[1].position, 1);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 200));
        // 0..200, 150..350, ... 750..950, 900..1000
        assert_eq!(chunks.len(), 7);
    }

    #[test]
    fn test_chunk_text_no_overlap() {
        let text = "a".repeat(300);
        let chunks = chunk_text(&text, 100, 0);

        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("", 100, 10).is_empty());
        assert!(chunk_text("   ", 100, 10).is_empty());
    }

    #[test]
    fn test_chunk_prefers_line_breaks() {
        let rows: Vec<String> = (1..=20)
            .map(|i| format!("Row {}: metric: m{} | value: {}", i, i, i * 10))
            .collect();
        let text = rows.join("\n");

        let chunks = chunk_text(&text, 120, 30);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(rows.iter().any(|r| chunk.text.ends_with(r.as_str())));
        }
    }

    #[test]
    fn test_chunk_text_multibyte() {
        let text = "é".repeat(250);
        let chunks = chunk_text(&text, 100, 10);

        assert!(chunks.iter().all(|c| c.text.chars().count() <= 100));
        assert_eq!(chunks[0].text.chars().count(), 100);
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("Row 1: id: 7", 700, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Row 1: id: 7");
    }
}
