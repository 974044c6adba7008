//! Deterministic identifier and content-hash derivation.
//!
//! All ids in the system are pure functions of their inputs: the same path,
//! chunk span and content always produce the same id, independent of the
//! indexing run that produced it. That lets the coordinator diff in-memory
//! plans against on-disk state by id equality rather than by carrying
//! opaque database-assigned keys across processes.

use sha2::{Digest, Sha256};

/// Truncated hex-encoded SHA-256 digest, used for all id flavors below.
fn digest_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}

fn short_hex(parts: &[&[u8]], len: usize) -> String {
    let full = digest_hex(parts);
    full[..len.min(full.len())].to_string()
}

/// Content hash of raw file bytes, used for change detection and chunk ids.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Derives a stable project id from its canonicalized root path.
///
/// Two different absolute paths always yield different ids; the same path
/// yields the same id across process restarts and machines.
#[must_use]
pub fn project_id(canonical_root: &str) -> String {
    format!("proj_{}", short_hex(&[b"project", canonical_root.as_bytes()], 16))
}

/// Derives a chunk id from the tuple that uniquely identifies it within a
/// project: the file it came from, its line span and the content it holds.
/// Re-chunking identical content at the identical span reproduces the same
/// id, which is what lets incremental indexing diff by id.
#[must_use]
pub fn chunk_id(
    project_id: &str,
    relative_path: &str,
    start_line: usize,
    end_line: usize,
    content_hash: &str,
) -> String {
    format!(
        "chunk_{}",
        short_hex(
            &[
                project_id.as_bytes(),
                relative_path.as_bytes(),
                start_line.to_string().as_bytes(),
                end_line.to_string().as_bytes(),
                content_hash.as_bytes(),
            ],
            24
        )
    )
}

/// Derives an entity (symbol) id from its kind, qualified name, declaring
/// file and starting line. Qualified name alone is not enough: two
/// identically-named symbols can live in different files (or be
/// overloaded/shadowed), so the tuple disambiguates them.
#[must_use]
pub fn entity_id(kind: &str, qualified_name: &str, file_path: &str, start_line: usize) -> String {
    format!(
        "ent_{}",
        short_hex(
            &[
                kind.as_bytes(),
                qualified_name.as_bytes(),
                file_path.as_bytes(),
                start_line.to_string().as_bytes(),
            ],
            20
        )
    )
}

/// Derives a relationship id from its endpoints and kind. Relationship ids
/// are stable under re-extraction: the same (from, to, kind) triple always
/// collapses to the same edge rather than duplicating it.
#[must_use]
pub fn relationship_id(from_entity_id: &str, to_entity_id: &str, kind: &str) -> String {
    format!(
        "rel_{}",
        short_hex(&[from_entity_id.as_bytes(), to_entity_id.as_bytes(), kind.as_bytes()], 20)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn project_id_is_deterministic_and_path_sensitive() {
        let a1 = project_id("/home/user/proj-a");
        let a2 = project_id("/home/user/proj-a");
        let b = project_id("/home/user/proj-b");
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert!(a1.starts_with("proj_"));
    }

    #[test]
    fn chunk_id_changes_with_content_hash() {
        let pid = project_id("/repo");
        let h1 = content_hash(b"fn foo() {}");
        let h2 = content_hash(b"fn foo() { /* changed */ }");
        let c1 = chunk_id(&pid, "src/lib.rs", 1, 3, &h1);
        let c2 = chunk_id(&pid, "src/lib.rs", 1, 3, &h2);
        assert_ne!(c1, c2);
    }

    #[test]
    fn chunk_id_stable_across_recomputation() {
        let pid = project_id("/repo");
        let h = content_hash(b"struct Foo;");
        let c1 = chunk_id(&pid, "src/lib.rs", 10, 12, &h);
        let c2 = chunk_id(&pid, "src/lib.rs", 10, 12, &h);
        assert_eq!(c1, c2);
    }

    #[test]
    fn entity_id_disambiguates_same_name_different_file() {
        let e1 = entity_id("function", "foo", "a.rs", 1);
        let e2 = entity_id("function", "foo", "b.rs", 1);
        assert_ne!(e1, e2);
    }

    #[test]
    fn relationship_id_is_directional() {
        let e1 = entity_id("function", "foo", "a.rs", 1);
        let e2 = entity_id("function", "bar", "a.rs", 10);
        let forward = relationship_id(&e1, &e2, "calls");
        let backward = relationship_id(&e2, &e1, "calls");
        assert_ne!(forward, backward);
    }

    #[test]
    fn content_hash_is_sensitive_to_every_byte() {
        assert_ne!(content_hash(b"a"), content_hash(b"b"));
        assert_eq!(content_hash(b"same"), content_hash(b"same"));
    }
}
