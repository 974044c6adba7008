//! Turns a project's [`UnresolvedRelationship`]s into concrete
//! [`Relationship`]s once the full entity set is known. Mirrors the
//! teacher's two-phase `GraphBuilder::build` (all nodes first, then edges
//! resolved by name), but produces a store-agnostic value instead of
//! mutating a `petgraph::Graph` directly.

use std::collections::HashMap;

use codeindex_ids::relationship_id;

use crate::types::{Entity, Relationship, UnresolvedRelationship};

/// Resolve unresolved relationships against an entity set, dropping any
/// whose target name has no matching entity. A bare name can match more
/// than one entity (e.g. two files each define `new`); all matches get an
/// edge, mirroring the teacher's name-indexed lookup which is similarly
/// last-registration-wins per exact name and doesn't attempt scope
/// disambiguation.
#[must_use]
pub fn resolve(entities: &[Entity], unresolved: &[UnresolvedRelationship]) -> Vec<Relationship> {
    let mut by_name: HashMap<&str, Vec<&Entity>> = HashMap::new();
    for entity in entities {
        by_name.entry(entity.name.as_str()).or_default().push(entity);
        if let Some(qualified) = &entity.qualified_name {
            by_name.entry(qualified.as_str()).or_default().push(entity);
        }
    }

    let mut out = Vec::new();
    for rel in unresolved {
        let Some(targets) = by_name.get(rel.to_name.as_str()) else {
            continue;
        };
        for target in targets {
            if target.entity_id == rel.from_entity_id {
                continue;
            }
            out.push(Relationship {
                rel_id: relationship_id(&rel.from_entity_id, &target.entity_id, &rel.rel_type),
                from_entity_id: rel.from_entity_id.clone(),
                to_entity_id: target.entity_id.clone(),
                category: rel.category,
                rel_type: rel.rel_type.clone(),
                metadata: rel.metadata.clone(),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityKind, RelationshipCategory};

    fn entity(id: &str, name: &str) -> Entity {
        Entity {
            entity_id: id.to_string(),
            kind: EntityKind::Function,
            name: name.to_string(),
            qualified_name: None,
            file_path: "src/lib.rs".to_string(),
            start_line: 1,
            end_line: 1,
            source_chunk_id: None,
        }
    }

    #[test]
    fn resolves_matching_call_target() {
        let entities = vec![entity("ent_foo", "foo"), entity("ent_bar", "bar")];
        let unresolved = vec![UnresolvedRelationship {
            from_entity_id: "ent_foo".to_string(),
            to_name: "bar".to_string(),
            category: RelationshipCategory::Calls,
            rel_type: "calls".to_string(),
            metadata: serde_json::Value::Null,
        }];

        let resolved = resolve(&entities, &unresolved);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].to_entity_id, "ent_bar");
    }

    #[test]
    fn dangling_target_is_dropped() {
        let entities = vec![entity("ent_foo", "foo")];
        let unresolved = vec![UnresolvedRelationship {
            from_entity_id: "ent_foo".to_string(),
            to_name: "does_not_exist".to_string(),
            category: RelationshipCategory::Calls,
            rel_type: "calls".to_string(),
            metadata: serde_json::Value::Null,
        }];

        assert!(resolve(&entities, &unresolved).is_empty());
    }

    #[test]
    fn self_reference_is_dropped() {
        let entities = vec![entity("ent_foo", "foo")];
        let unresolved = vec![UnresolvedRelationship {
            from_entity_id: "ent_foo".to_string(),
            to_name: "foo".to_string(),
            category: RelationshipCategory::Calls,
            rel_type: "calls".to_string(),
            metadata: serde_json::Value::Null,
        }];

        assert!(resolve(&entities, &unresolved).is_empty());
    }
}
