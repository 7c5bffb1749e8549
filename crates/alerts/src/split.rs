/// Split `body` into chunks of at most `max_chars` characters.
///
/// Lines are packed greedily and joined with `\n`; a chunk boundary always
/// falls between lines unless a single line is longer than `max_chars`, in
/// which case that line is cut hard. Always yields at least one chunk.
pub fn split_body(body: &str, max_chars: usize) -> Vec<String> {
    assert!(max_chars > 0, "chunk size must be positive");

    let mut pieces: Vec<String> = Vec::new();
    for line in body.lines() {
        if line.chars().count() <= max_chars {
            pieces.push(line.to_string());
        } else {
            let chars: Vec<char> = line.chars().collect();
            pieces.extend(chars.chunks(max_chars).map(|c| c.iter().collect::<String>()));
        }
    }

    let mut chunks = Vec::new();
    let mut current: Option<(String, usize)> = None;
    for piece in pieces {
        let len = piece.chars().count();
        match current.as_mut() {
            Some((buf, used)) if *used + 1 + len <= max_chars => {
                buf.push('\n');
                buf.push_str(&piece);
                *used += 1 + len;
            }
            _ => {
                if let Some((buf, _)) = current.take() {
                    chunks.push(buf);
                }
                current = Some((piece, len));
            }
        }
    }
    if let Some((buf, _)) = current {
        chunks.push(buf);
    }

    if chunks.is_empty() {
        chunks.push(String::new());
    }
    chunks
}
