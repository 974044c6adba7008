/// Rough token estimate used by the rebalance/filter passes to judge
/// chunk size after splitting. Not a tokenizer-accurate count.
pub fn estimate_tokens(text: &str) -> usize {
    text.split_whitespace().count().max(1)
}

/// Assumed average tokens per source line, used to translate a
/// token-oriented budget into a concrete line-window size for the
/// line-count splitter.
const ASSUMED_TOKENS_PER_LINE: usize = 2;

/// Splits content into fixed-size, overlapping line windows: a sliding
/// window of `target_tokens` (translated to lines via
/// [`ASSUMED_TOKENS_PER_LINE`]) that advances by `window - overlap_lines`
/// each step, so consecutive chunks share their last `overlap_lines` lines.
/// `target_tokens` is translated into a line count; the last window holds
/// whatever remains and is not padded out to full size.
pub fn split(content: &str, target_tokens: usize, max_tokens: usize, overlap_lines: usize) -> Vec<(usize, usize, String)> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let target_lines = (target_tokens / ASSUMED_TOKENS_PER_LINE).max(1);
    let max_lines = (max_tokens / ASSUMED_TOKENS_PER_LINE).max(target_lines);
    let window = target_lines.min(max_lines);
    let overlap = overlap_lines.min(window.saturating_sub(1));

    let mut chunks = Vec::new();
    let mut start_idx = 0usize;
    loop {
        let end_idx = (start_idx + window).min(lines.len());
        chunks.push((start_idx + 1, end_idx, lines[start_idx..end_idx].join("\n")));
        if end_idx >= lines.len() {
            break;
        }
        start_idx = end_idx - overlap;
    }
    chunks
}

/// Splits content along top-level brace nesting: a new chunk starts each
/// time depth returns to zero after having gone positive. Depth tracking
/// is a simple character count and does not account for braces inside
/// string or character literals.
pub fn split_bracket_balanced(content: &str) -> Vec<(usize, usize, String)> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start_idx = 0usize;
    let mut depth: i64 = 0;
    let mut opened = false;

    for (idx, line) in lines.iter().enumerate() {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }

        if opened && depth <= 0 {
            let chunk_lines = &lines[start_idx..=idx];
            chunks.push((start_idx + 1, idx + 1, chunk_lines.join("\n")));
            start_idx = idx + 1;
            depth = 0;
            opened = false;
        }
    }

    if start_idx < lines.len() {
        let chunk_lines = &lines[start_idx..];
        chunks.push((start_idx + 1, lines.len(), chunk_lines.join("\n")));
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_split_windows_at_assumed_tokens_per_line() {
        let content = (0..20).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let chunks = split(&content, 20, 10_000, 0);
        assert_eq!(chunks[0].0, 1);
        assert_eq!(chunks[0].1, 10);
        assert_eq!(chunks[1].0, 11);
    }

    #[test]
    fn line_split_with_overlap_repeats_trailing_lines_in_the_next_window() {
        let content = (0..20).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let chunks = split(&content, 20, 10_000, 3);
        assert_eq!(chunks[0], (1, 10, (0..10).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n")));
        // Second window starts 3 lines before the first one ended.
        assert_eq!(chunks[1].0, 8);
        assert_eq!(chunks[1].1, 17);
    }

    #[test]
    fn bracket_split_closes_at_depth_zero() {
        let content = "fn a() {\n  1\n}\nfn b() {\n  2\n}\n";
        let chunks = split_bracket_balanced(content);
        assert_eq!(chunks.len(), 2);
    }
}
