use crate::chunk::{ChunkMetadata, ChunkType, CodeChunk};
use crate::error::{ChunkerError, Result};
use crate::language::Language;
use crate::line_split::{estimate_tokens, split_bracket_balanced};
use tree_sitter::{Node, Parser};

/// A single candidate span produced by the AST splitter, before
/// post-processing filters, merges and annotates it further.
pub struct RawUnit {
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    pub chunk_type: ChunkType,
    pub symbol_name: String,
    pub parent_scope: Option<String>,
    pub documentation: Option<String>,
}

/// Splits `content` along its syntax tree, then enforces `max_tokens` on
/// every emitted unit: a node within budget is kept as-is; one over budget
/// falls back to bracket-balanced splitting for that node only, since the
/// grammar has already put it in a single declaration and the language
/// visitors below don't descend any further into it.
pub fn split(content: &str, language: Language, max_tokens: usize) -> Result<Vec<RawUnit>> {
    let ts_language = language.tree_sitter_language()?;
    let mut parser = Parser::new();
    parser
        .set_language(&ts_language)
        .map_err(|e| ChunkerError::ParseError {
            language: language.as_str().to_string(),
            reason: e.to_string(),
        })?;
    let tree = parser.parse(content, None).ok_or_else(|| ChunkerError::ParseError {
        language: language.as_str().to_string(),
        reason: "parser returned no tree".to_string(),
    })?;

    let mut units = Vec::new();
    let root = tree.root_node();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        visit_top_level(child, content, language, None, &mut units);
    }
    Ok(units.into_iter().flat_map(|unit| enforce_size_budget(unit, max_tokens)).collect())
}

fn enforce_size_budget(unit: RawUnit, max_tokens: usize) -> Vec<RawUnit> {
    if max_tokens == 0 || estimate_tokens(&unit.content) <= max_tokens {
        return vec![unit];
    }
    let pieces = split_bracket_balanced(&unit.content);
    if pieces.len() <= 1 {
        return vec![unit];
    }
    pieces
        .into_iter()
        .enumerate()
        .map(|(i, (rel_start, rel_end, text))| RawUnit {
            start_line: unit.start_line + rel_start - 1,
            end_line: unit.start_line + rel_end - 1,
            content: text,
            chunk_type: unit.chunk_type,
            symbol_name: unit.symbol_name.clone(),
            parent_scope: unit.parent_scope.clone(),
            documentation: if i == 0 { unit.documentation.clone() } else { None },
        })
        .collect()
}

fn visit_top_level(
    node: Node,
    source: &str,
    language: Language,
    container: Option<&str>,
    out: &mut Vec<RawUnit>,
) {
    match language {
        Language::Rust => visit_rust(node, source, container, out),
        Language::Python => visit_python(node, source, container, out),
        Language::JavaScript | Language::TypeScript => visit_js(node, source, container, out),
        _ => {}
    }
}

fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

fn span(node: Node) -> (usize, usize) {
    (node.start_position().row + 1, node.end_position().row + 1)
}

fn leading_doc_comment(node: Node, source: &str, prefix: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut cursor = node.prev_sibling();
    while let Some(sibling) = cursor {
        let kind = sibling.kind();
        if kind == "line_comment" || kind == "comment" {
            let text = node_text(sibling, source).trim();
            if text.starts_with(prefix) {
                lines.push(text.to_string());
                cursor = sibling.prev_sibling();
                continue;
            }
        }
        break;
    }
    if lines.is_empty() {
        return None;
    }
    lines.reverse();
    let joined = lines
        .iter()
        .map(|l| l.trim_start_matches(prefix).trim())
        .collect::<Vec<_>>()
        .join("\n");
    Some(joined)
}

fn visit_rust(node: Node, source: &str, container: Option<&str>, out: &mut Vec<RawUnit>) {
    match node.kind() {
        "function_item" => {
            if let Some(name) = node.child_by_field_name("name") {
                let (start_line, end_line) = span(node);
                out.push(RawUnit {
                    start_line,
                    end_line,
                    content: node_text(node, source).to_string(),
                    chunk_type: if container.is_some() {
                        ChunkType::Method
                    } else {
                        ChunkType::Function
                    },
                    symbol_name: node_text(name, source).to_string(),
                    parent_scope: container.map(str::to_string),
                    documentation: leading_doc_comment(node, source, "///"),
                });
            }
        }
        "impl_item" => {
            if let Some(self_type) = node.child_by_field_name("type") {
                let type_text = node_text(self_type, source).to_string();
                if let Some(body) = node.child_by_field_name("body") {
                    let mut cursor = body.walk();
                    for member in body.children(&mut cursor) {
                        visit_rust(member, source, Some(&type_text), out);
                    }
                }
            }
        }
        "struct_item" => push_named(node, source, ChunkType::Struct, out),
        "enum_item" => push_named(node, source, ChunkType::Enum, out),
        "trait_item" => push_named(node, source, ChunkType::Trait, out),
        "mod_item" => push_named(node, source, ChunkType::Module, out),
        _ => {}
    }
}

fn push_named(node: Node, source: &str, chunk_type: ChunkType, out: &mut Vec<RawUnit>) {
    if let Some(name) = node.child_by_field_name("name") {
        let (start_line, end_line) = span(node);
        out.push(RawUnit {
            start_line,
            end_line,
            content: node_text(node, source).to_string(),
            chunk_type,
            symbol_name: node_text(name, source).to_string(),
            parent_scope: None,
            documentation: leading_doc_comment(node, source, "///"),
        });
    }
}

fn visit_python(node: Node, source: &str, container: Option<&str>, out: &mut Vec<RawUnit>) {
    match node.kind() {
        "function_definition" => {
            if let Some(name) = node.child_by_field_name("name") {
                let (start_line, end_line) = span(node);
                out.push(RawUnit {
                    start_line,
                    end_line,
                    content: node_text(node, source).to_string(),
                    chunk_type: if container.is_some() {
                        ChunkType::Method
                    } else {
                        ChunkType::Function
                    },
                    symbol_name: node_text(name, source).to_string(),
                    parent_scope: container.map(str::to_string),
                    documentation: leading_doc_comment(node, source, "#"),
                });
            }
        }
        "class_definition" => {
            if let Some(name) = node.child_by_field_name("name") {
                let class_name = node_text(name, source).to_string();
                let (start_line, end_line) = span(node);
                out.push(RawUnit {
                    start_line,
                    end_line,
                    content: node_text(node, source).to_string(),
                    chunk_type: ChunkType::Class,
                    symbol_name: class_name.clone(),
                    parent_scope: None,
                    documentation: leading_doc_comment(node, source, "#"),
                });
                if let Some(body) = node.child_by_field_name("body") {
                    let mut cursor = body.walk();
                    for member in body.children(&mut cursor) {
                        visit_python(member, source, Some(&class_name), out);
                    }
                }
            }
        }
        _ => {}
    }
}

fn visit_js(node: Node, source: &str, container: Option<&str>, out: &mut Vec<RawUnit>) {
    match node.kind() {
        "function_declaration" => {
            if let Some(name) = node.child_by_field_name("name") {
                let (start_line, end_line) = span(node);
                out.push(RawUnit {
                    start_line,
                    end_line,
                    content: node_text(node, source).to_string(),
                    chunk_type: ChunkType::Function,
                    symbol_name: node_text(name, source).to_string(),
                    parent_scope: container.map(str::to_string),
                    documentation: None,
                });
            }
        }
        "method_definition" => {
            if let Some(name) = node.child_by_field_name("name") {
                let (start_line, end_line) = span(node);
                out.push(RawUnit {
                    start_line,
                    end_line,
                    content: node_text(node, source).to_string(),
                    chunk_type: ChunkType::Method,
                    symbol_name: node_text(name, source).to_string(),
                    parent_scope: container.map(str::to_string),
                    documentation: None,
                });
            }
        }
        "class_declaration" => {
            if let Some(name) = node.child_by_field_name("name") {
                let class_name = node_text(name, source).to_string();
                let (start_line, end_line) = span(node);
                out.push(RawUnit {
                    start_line,
                    end_line,
                    content: node_text(node, source).to_string(),
                    chunk_type: ChunkType::Class,
                    symbol_name: class_name.clone(),
                    parent_scope: None,
                    documentation: None,
                });
                if let Some(body) = node.child_by_field_name("body") {
                    let mut cursor = body.walk();
                    for member in body.children(&mut cursor) {
                        visit_js(member, source, Some(&class_name), out);
                    }
                }
            }
        }
        "interface_declaration" => {
            if let Some(name) = node.child_by_field_name("name") {
                let (start_line, end_line) = span(node);
                out.push(RawUnit {
                    start_line,
                    end_line,
                    content: node_text(node, source).to_string(),
                    chunk_type: ChunkType::Interface,
                    symbol_name: node_text(name, source).to_string(),
                    parent_scope: container.map(str::to_string),
                    documentation: None,
                });
            }
        }
        _ => {}
    }
}

/// Wraps a [`RawUnit`] into a plain [`CodeChunk`]; caller applies
/// config-driven metadata adjustments afterwards.
pub fn to_chunk(file_path: &str, unit: RawUnit) -> CodeChunk {
    let metadata = ChunkMetadata::default()
        .chunk_type(unit.chunk_type)
        .symbol_name(unit.symbol_name);
    let metadata = match unit.parent_scope {
        Some(scope) => metadata.parent_scope(scope),
        None => metadata,
    };
    let metadata = match unit.documentation {
        Some(doc) => metadata.documentation(doc),
        None => metadata,
    };
    CodeChunk::new(file_path, unit.start_line, unit.end_line, unit.content, metadata)
}
