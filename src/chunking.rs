/// Maximum chunk length in characters.
pub const CHUNK_SIZE: usize = 1000;
/// Characters shared between adjacent chunks.
pub const CHUNK_OVERLAP: usize = 200;

/// Represents a text chunk with metadata
#[derive(Debug, Clone)]
pub struct TextChunk {
    /// The actual text content of this chunk
    pub text: String,
    /// URL of the document this chunk was extracted from
    pub source: String,
    /// Zero-based index of the page the chunk starts on
    pub page: usize,
}

/// Split text into a sliding window of character chunks.
///
/// Windows advance by `CHUNK_SIZE - CHUNK_OVERLAP`, so for a text of length
/// `L > CHUNK_SIZE` adjacent chunks share exactly `CHUNK_OVERLAP` characters
/// and the chunk count is `ceil((L - overlap) / (size - overlap))`. Empty
/// input produces no chunks.
pub fn split_text(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let step = CHUNK_SIZE - CHUNK_OVERLAP;
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = usize::min(start + CHUNK_SIZE, chars.len());
        chunks.push(chars[start..end].iter().collect());

        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

/// Split page-level text units into chunks carrying provenance metadata.
pub fn split_pages(pages: &[String], source: &str) -> Vec<TextChunk> {
    let mut chunks = Vec::new();

    for (page, text) in pages.iter().enumerate() {
        for piece in split_text(text) {
            chunks.push(TextChunk {
                text: piece,
                source: source.to_string(),
                page,
            });
        }
    }

    chunks
}
