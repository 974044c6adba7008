//! Per-chunk entity/relationship extraction. One entity is produced for
//! the chunk's own declared symbol (mirroring the teacher's
//! `GraphBuilder::extract_symbol`), plus unresolved relationship
//! candidates found by walking the chunk's own parse tree for calls,
//! type references, and imports (mirroring
//! `GraphBuilder::traverse_for_calls`/`traverse_for_types`, generalized
//! to also recognize import statements and to run per-chunk rather than
//! over the whole project graph at once).

use codeindex_chunker::{ChunkType, CodeChunk, Language};
use codeindex_ids::entity_id;
use tree_sitter::{Node, Parser};

use crate::error::{NormalizerError, Result};
use crate::types::{Entity, EntityKind, RelationshipCategory, UnresolvedRelationship};

fn ts_language(language: Language) -> Result<tree_sitter::Language> {
    match language {
        Language::Rust => Ok(tree_sitter_rust::LANGUAGE.into()),
        Language::Python => Ok(tree_sitter_python::LANGUAGE.into()),
        Language::JavaScript => Ok(tree_sitter_javascript::LANGUAGE.into()),
        Language::TypeScript => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        _ => Err(NormalizerError::UnsupportedLanguage),
    }
}

fn entity_kind_for_chunk(chunk_type: Option<&ChunkType>) -> EntityKind {
    match chunk_type {
        Some(ChunkType::Method) => EntityKind::Method,
        Some(ChunkType::Struct) => EntityKind::Struct,
        Some(ChunkType::Class) => EntityKind::Class,
        Some(ChunkType::Enum) => EntityKind::Enum,
        Some(ChunkType::Interface) => EntityKind::Interface,
        Some(ChunkType::Trait) => EntityKind::Trait,
        Some(ChunkType::Module) => EntityKind::Module,
        Some(ChunkType::Variable) => EntityKind::Variable,
        _ => EntityKind::Function,
    }
}

/// Extract the chunk's own declared entity, plus unresolved relationship
/// candidates found within its content. Returns `Ok((None, vec![]))` for
/// languages the normalizer doesn't understand rather than erroring,
/// matching the "unknown constructs are ignored" rule for unrecognized
/// node patterns within a supported language.
pub fn normalize(
    chunk: &CodeChunk,
    chunk_id: &str,
    language: Language,
) -> Result<(Option<Entity>, Vec<UnresolvedRelationship>)> {
    let Some(symbol_name) = chunk.metadata.symbol_name.clone() else {
        return Ok((None, Vec::new()));
    };

    let kind = entity_kind_for_chunk(chunk.metadata.chunk_type.as_ref());
    let qualified_name = chunk.metadata.qualified_name.clone();

    let id = entity_id(
        kind.as_str(),
        qualified_name.as_deref().unwrap_or(&symbol_name),
        &chunk.file_path,
        chunk.start_line,
    );

    let entity = Entity {
        entity_id: id.clone(),
        kind,
        name: symbol_name,
        qualified_name,
        file_path: chunk.file_path.clone(),
        start_line: chunk.start_line,
        end_line: chunk.end_line,
        source_chunk_id: Some(chunk_id.to_string()),
    };

    let relationships = match ts_language(language) {
        Ok(ts_lang) => extract_relationships(chunk, language, ts_lang, &id)?,
        Err(_) => Vec::new(),
    };

    Ok((Some(entity), relationships))
}

fn extract_relationships(
    chunk: &CodeChunk,
    language: Language,
    ts_lang: tree_sitter::Language,
    from_entity_id: &str,
) -> Result<Vec<UnresolvedRelationship>> {
    let mut parser = Parser::new();
    parser
        .set_language(&ts_lang)
        .map_err(|e| NormalizerError::ParseError(e.to_string()))?;

    let tree = parser
        .parse(&chunk.content, None)
        .ok_or_else(|| NormalizerError::ParseError("tree-sitter returned no tree".to_string()))?;

    let mut out = Vec::new();
    walk(
        tree.root_node(),
        &chunk.content,
        language,
        from_entity_id,
        &mut out,
    );
    Ok(out)
}

fn walk(
    node: Node,
    content: &str,
    language: Language,
    from_entity_id: &str,
    out: &mut Vec<UnresolvedRelationship>,
) {
    let kind = node.kind();

    let is_call = match language {
        Language::Python => kind == "call",
        _ => kind == "call_expression",
    };
    if is_call {
        if let Some(function_node) = node.child_by_field_name("function") {
            let name = last_identifier(function_node, content);
            if !name.is_empty() {
                out.push(UnresolvedRelationship {
                    from_entity_id: from_entity_id.to_string(),
                    to_name: name,
                    category: RelationshipCategory::Calls,
                    rel_type: "calls".to_string(),
                    metadata: serde_json::Value::Null,
                });
            }
        }
    }

    let is_type_ref = match language {
        Language::Rust => kind == "type_identifier" || kind == "generic_type",
        Language::Python => kind == "type",
        Language::JavaScript | Language::TypeScript => kind == "type_identifier",
        _ => false,
    };
    if is_type_ref {
        let name = node_text(node, content);
        if !name.is_empty() {
            out.push(UnresolvedRelationship {
                from_entity_id: from_entity_id.to_string(),
                to_name: name,
                category: RelationshipCategory::References,
                rel_type: "uses-type".to_string(),
                metadata: serde_json::Value::Null,
            });
        }
    }

    let is_import = matches!(
        kind,
        "use_declaration" | "import_statement" | "import_from_statement"
    );
    if is_import {
        let path = node_text(node, content);
        out.push(UnresolvedRelationship {
            from_entity_id: from_entity_id.to_string(),
            to_name: path.trim().to_string(),
            category: RelationshipCategory::Imports,
            rel_type: "imports".to_string(),
            metadata: serde_json::Value::Null,
        });
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, content, language, from_entity_id, out);
    }
}

fn node_text(node: Node, content: &str) -> String {
    content[node.start_byte()..node.end_byte()].to_string()
}

fn last_identifier(node: Node, content: &str) -> String {
    fn is_identifier_like(kind: &str) -> bool {
        if kind == "identifier" {
            return true;
        }
        if matches!(kind, "scoped_identifier" | "scoped_type_identifier") {
            return false;
        }
        kind.ends_with("_identifier")
    }

    fn find_last(node: Node, content: &str) -> Option<String> {
        if is_identifier_like(node.kind()) {
            return Some(node_text(node, content));
        }
        let mut cursor = node.walk();
        let mut last = None;
        for child in node.children(&mut cursor) {
            if let Some(found) = find_last(child, content) {
                last = Some(found);
            }
        }
        last
    }

    find_last(node, content).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeindex_chunker::{ChunkMetadata, ChunkType};

    fn chunk(content: &str, symbol: &str, chunk_type: ChunkType) -> CodeChunk {
        CodeChunk::new(
            "src/lib.rs".to_string(),
            1,
            3,
            content.to_string(),
            ChunkMetadata::default()
                .symbol_name(symbol)
                .chunk_type(chunk_type),
        )
    }

    #[test]
    fn extracts_declared_entity_and_call_relationship() {
        let c = chunk("fn foo() { bar(); }", "foo", ChunkType::Function);
        let (entity, rels) = normalize(&c, "chunk_test", Language::Rust).unwrap();
        let entity = entity.expect("entity");
        assert_eq!(entity.name, "foo");
        assert_eq!(entity.kind, EntityKind::Function);
        assert!(rels
            .iter()
            .any(|r| r.to_name == "bar" && r.category == RelationshipCategory::Calls));
    }

    #[test]
    fn resolves_scoped_call_to_last_segment() {
        let c = chunk("fn caller() { crate::foo(); }", "caller", ChunkType::Function);
        let (_, rels) = normalize(&c, "chunk_test", Language::Rust).unwrap();
        assert!(rels.iter().any(|r| r.to_name == "foo"));
    }

    #[test]
    fn chunk_without_symbol_name_yields_no_entity() {
        let c = CodeChunk::new(
            "src/lib.rs".to_string(),
            1,
            3,
            "// a generic comment block".to_string(),
            ChunkMetadata::default(),
        );
        let (entity, rels) = normalize(&c, "chunk_test", Language::Rust).unwrap();
        assert!(entity.is_none());
        assert!(rels.is_empty());
    }

    #[test]
    fn unsupported_language_yields_entity_without_relationships() {
        let c = chunk("int foo() { bar(); }", "foo", ChunkType::Function);
        let (entity, rels) = normalize(&c, "chunk_test", Language::C).unwrap();
        assert!(entity.is_some());
        assert!(rels.is_empty());
    }
}
