use crate::ast_split;
use crate::chunk::{ChunkMetadata, CodeChunk};
use crate::config::{ChunkerConfig, ChunkingStrategy, OverlapStrategy};
use crate::contextual_imports::{extract_imports_from_lines, filter_relevant_imports};
use crate::error::Result;
use crate::language::Language;
use crate::line_split::{estimate_tokens, split as line_split, split_bracket_balanced};

/// Upper bound, as a fraction of a chunk's own line count, on how much the
/// symbol-balance-fix pass will trim off the end before giving up and
/// dropping the chunk instead.
const BALANCE_REPAIR_BUDGET_RATIO: f64 = 0.2;

fn bracket_depth(lines: &[&str]) -> i64 {
    let mut depth: i64 = 0;
    for line in lines {
        for ch in line.chars() {
            match ch {
                '{' | '(' | '[' => depth += 1,
                '}' | ')' | ']' => depth -= 1,
                _ => {}
            }
        }
    }
    depth
}

/// Splits source files into model-sized chunks and annotates each with the
/// symbol, scope, documentation and import context a downstream embedder
/// or graph builder needs, without ever rewriting the chunk's own text.
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    #[must_use]
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    pub fn chunk_str(&self, content: &str, file_path: Option<&str>) -> Result<Vec<CodeChunk>> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let file_path = file_path.unwrap_or("<memory>");
        let language = Language::from_path(file_path);
        if !self.config.accepts(language) {
            return Ok(Vec::new());
        }

        let mut chunks = self.split(content, file_path, language)?;
        self.apply_language_tag(&mut chunks, language);
        self.clear_disabled_metadata(&mut chunks);
        self.fix_symbol_balance(&mut chunks);
        self.filter_small(&mut chunks);
        self.rebalance(&mut chunks);
        self.trim_blank_boundaries(&mut chunks);
        self.inject_overlap_context(&mut chunks, content, language);

        Ok(chunks)
    }

    fn split(&self, content: &str, file_path: &str, language: Language) -> Result<Vec<CodeChunk>> {
        let use_ast = match self.config.strategy {
            ChunkingStrategy::Ast => true,
            ChunkingStrategy::Auto => language.supports_ast(),
            ChunkingStrategy::BracketBalance | ChunkingStrategy::LineCount => false,
        };

        if use_ast && language.supports_ast() {
            let units = ast_split::split(content, language, self.config.max_chunk_tokens)?;
            if !units.is_empty() {
                return Ok(units
                    .into_iter()
                    .map(|unit| ast_split::to_chunk(file_path, unit))
                    .collect());
            }
            // Parsed but found nothing chunkable (e.g. a header-only file);
            // fall through to a generic split instead of returning empty.
        }

        let use_bracket = matches!(self.config.strategy, ChunkingStrategy::BracketBalance)
            || (matches!(self.config.strategy, ChunkingStrategy::Auto) && !use_ast);

        let overlap_lines = match self.config.overlap {
            OverlapStrategy::Fixed(n) => n,
            OverlapStrategy::None | OverlapStrategy::Contextual => 0,
        };

        let windows = if use_bracket {
            let split = split_bracket_balanced(content);
            if split.len() > 1 {
                split
            } else {
                line_split(content, self.config.target_chunk_tokens, self.config.max_chunk_tokens, overlap_lines)
            }
        } else {
            line_split(content, self.config.target_chunk_tokens, self.config.max_chunk_tokens, overlap_lines)
        };

        Ok(windows
            .into_iter()
            .map(|(start, end, text)| CodeChunk::new(file_path, start, end, text, ChunkMetadata::default()))
            .collect())
    }

    fn apply_language_tag(&self, chunks: &mut [CodeChunk], language: Language) {
        for chunk in chunks {
            chunk.metadata.language = Some(language.as_str().to_string());
        }
    }

    fn clear_disabled_metadata(&self, chunks: &mut [CodeChunk]) {
        for chunk in chunks {
            if !self.config.include_documentation {
                chunk.metadata.documentation = None;
            }
            if !self.config.include_parent_context {
                chunk.metadata.parent_scope = None;
                chunk.metadata.qualified_name = chunk.metadata.symbol_name.clone();
            } else if let Some(symbol) = chunk.metadata.symbol_name.clone() {
                chunk.metadata.qualified_name = match &chunk.metadata.parent_scope {
                    Some(scope) => Some(format!("{scope}::{symbol}")),
                    None => Some(symbol),
                };
            }
        }
    }

    /// Closes unmatched opening brackets by trimming trailing incomplete
    /// lines off the end of a chunk (a window that ends mid-block, not one
    /// that *starts* mid-block, which is a normal and harmless result of
    /// line/overlap splitting). A chunk that is still unbalanced after
    /// trimming more than [`BALANCE_REPAIR_BUDGET_RATIO`] of its own lines
    /// is dropped rather than indexed half-formed.
    fn fix_symbol_balance(&self, chunks: &mut Vec<CodeChunk>) {
        let mut kept = Vec::with_capacity(chunks.len());
        for mut chunk in chunks.drain(..) {
            let mut lines: Vec<&str> = chunk.content.lines().collect();
            if lines.is_empty() {
                kept.push(chunk);
                continue;
            }

            let mut depth = bracket_depth(&lines);
            if depth <= 0 {
                kept.push(chunk);
                continue;
            }

            let budget = ((lines.len() as f64 * BALANCE_REPAIR_BUDGET_RATIO).ceil() as usize).max(3);
            let mut trims = 0usize;
            while depth > 0 && trims < budget && lines.len() > 1 {
                lines.pop();
                trims += 1;
                depth = bracket_depth(&lines);
            }

            if depth != 0 {
                continue;
            }
            if trims > 0 {
                chunk.content = lines.join("\n");
                chunk.end_line = chunk.end_line.saturating_sub(trims);
            }
            kept.push(chunk);
        }
        *chunks = kept;
    }

    /// Drops generic (non-symbol) chunks under the configured floor.
    /// Chunks with a known symbol are always kept: a one-line function is
    /// still a meaningful unit regardless of its size.
    fn filter_small(&self, chunks: &mut Vec<CodeChunk>) {
        if self.config.min_chunk_tokens == 0 {
            return;
        }
        let mut kept: Vec<CodeChunk> = chunks
            .drain(..)
            .filter(|c| {
                c.metadata.chunk_type.is_some()
                    || estimate_tokens(&c.content) >= self.config.min_chunk_tokens
            })
            .collect();
        if kept.is_empty() {
            if let Some(c) = chunks.pop() {
                kept.push(c);
            }
        }
        *chunks = kept;
    }

    /// Merges adjacent generic (non-symbol) chunks below half of the
    /// target size into their neighbor, so line/bracket splitting doesn't
    /// leave stray slivers. Symbol-bearing chunks are never merged: their
    /// boundaries come from the language's own grammar, not an arbitrary
    /// size budget.
    fn rebalance(&self, chunks: &mut Vec<CodeChunk>) {
        let soft_threshold = self.config.target_chunk_tokens / 2;
        if soft_threshold == 0 {
            return;
        }

        let mut merged: Vec<CodeChunk> = Vec::with_capacity(chunks.len());
        for chunk in chunks.drain(..) {
            let Some(prev) = merged.last_mut() else {
                merged.push(chunk);
                continue;
            };

            let prev_mergeable = prev.metadata.chunk_type.is_none();
            let curr_mergeable = chunk.metadata.chunk_type.is_none();
            let prev_small = estimate_tokens(&prev.content) < soft_threshold;
            let combined_tokens = estimate_tokens(&prev.content) + estimate_tokens(&chunk.content);

            if prev_mergeable && curr_mergeable && prev_small && combined_tokens <= self.config.max_chunk_tokens {
                prev.end_line = chunk.end_line;
                prev.content.push('\n');
                prev.content.push_str(&chunk.content);
            } else {
                merged.push(chunk);
            }
        }
        *chunks = merged;
    }

    fn trim_blank_boundaries(&self, chunks: &mut [CodeChunk]) {
        for chunk in chunks {
            let lines: Vec<&str> = chunk.content.lines().collect();
            let leading_blank = lines.iter().take_while(|l| l.trim().is_empty()).count();
            let trailing_blank = lines
                .iter()
                .rev()
                .take_while(|l| l.trim().is_empty())
                .count();
            if leading_blank == 0 && trailing_blank == 0 {
                continue;
            }
            if leading_blank + trailing_blank >= lines.len() {
                continue;
            }
            let trimmed = &lines[leading_blank..lines.len() - trailing_blank];
            chunk.start_line += leading_blank;
            chunk.end_line -= trailing_blank;
            chunk.content = trimmed.join("\n");
        }
    }

    fn inject_overlap_context(&self, chunks: &mut [CodeChunk], full_content: &str, language: Language) {
        if self.config.include_imports {
            let all_lines: Vec<&str> = full_content.lines().collect();
            let file_imports = extract_imports_from_lines(language, &all_lines, usize::MAX);
            for chunk in chunks.iter_mut() {
                let relevant = filter_relevant_imports(
                    language,
                    &file_imports,
                    &chunk.content,
                    self.config.max_imports_per_chunk,
                );
                chunk.metadata.context_imports = relevant;
            }
        } else {
            for chunk in chunks.iter_mut() {
                chunk.metadata.context_imports.clear();
            }
        }

        if let OverlapStrategy::Fixed(n) = self.config.overlap {
            if n > 0 {
                let mut previous_tail: Option<String> = None;
                for chunk in chunks.iter_mut() {
                    if let Some(tail) = previous_tail.take() {
                        chunk.content = format!("{tail}\n{}", chunk.content);
                    }
                    let lines: Vec<&str> = chunk.content.lines().collect();
                    let tail_start = lines.len().saturating_sub(n);
                    previous_tail = Some(lines[tail_start..].join("\n"));
                }
            }
        }
    }
}
