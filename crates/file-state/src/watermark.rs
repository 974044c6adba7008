use serde::{Deserialize, Serialize};

/// A cheap summary of project state used to decide whether a persisted
/// index is still fresh, without re-walking and re-hashing every file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Watermark {
    Git {
        #[serde(skip_serializing_if = "Option::is_none")]
        computed_at_unix_ms: Option<u64>,
        git_head: String,
        git_dirty: bool,
    },
    Filesystem {
        #[serde(skip_serializing_if = "Option::is_none")]
        computed_at_unix_ms: Option<u64>,
        file_count: u64,
        max_mtime_ms: u64,
        total_bytes: u64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StaleReason {
    IndexMissing,
    IndexCorrupt,
    WatermarkMissing,
    GitHeadMismatch,
    GitDirtyMismatch,
    FilesystemChanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleAssessment {
    pub stale: bool,
    pub reasons: Vec<StaleReason>,
}

#[must_use]
pub fn assess_staleness(
    project_watermark: &Watermark,
    index_exists: bool,
    index_corrupt: bool,
    index_watermark: Option<&Watermark>,
) -> StaleAssessment {
    let mut reasons = Vec::new();

    if !index_exists {
        reasons.push(StaleReason::IndexMissing);
    }
    if index_corrupt {
        reasons.push(StaleReason::IndexCorrupt);
    }

    match index_watermark {
        None => {
            if index_exists {
                reasons.push(StaleReason::WatermarkMissing);
            }
        }
        Some(index_mark) => match (index_mark, project_watermark) {
            (
                Watermark::Git {
                    git_head: idx_head,
                    git_dirty: idx_dirty,
                    ..
                },
                Watermark::Git {
                    git_head: cur_head,
                    git_dirty: cur_dirty,
                    ..
                },
            ) => {
                if idx_head != cur_head {
                    reasons.push(StaleReason::GitHeadMismatch);
                }
                if idx_dirty != cur_dirty {
                    reasons.push(StaleReason::GitDirtyMismatch);
                }
            }
            (
                Watermark::Filesystem {
                    file_count: idx_files,
                    max_mtime_ms: idx_mtime,
                    total_bytes: idx_bytes,
                    ..
                },
                Watermark::Filesystem {
                    file_count: cur_files,
                    max_mtime_ms: cur_mtime,
                    total_bytes: cur_bytes,
                    ..
                },
            ) => {
                if idx_files != cur_files || idx_mtime != cur_mtime || idx_bytes != cur_bytes {
                    reasons.push(StaleReason::FilesystemChanged);
                }
            }
            _ => reasons.push(StaleReason::FilesystemChanged),
        },
    }

    let stale = !reasons.is_empty();
    StaleAssessment { stale, reasons }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn git(head: &str, dirty: bool) -> Watermark {
        Watermark::Git {
            computed_at_unix_ms: None,
            git_head: head.to_string(),
            git_dirty: dirty,
        }
    }

    fn fs(files: u64, max_mtime_ms: u64, bytes: u64) -> Watermark {
        Watermark::Filesystem {
            computed_at_unix_ms: None,
            file_count: files,
            max_mtime_ms,
            total_bytes: bytes,
        }
    }

    #[test]
    fn stale_when_index_missing() {
        let out = assess_staleness(&git("abc", false), false, false, None);
        assert_eq!(out.stale, true);
        assert_eq!(out.reasons, vec![StaleReason::IndexMissing]);
    }

    #[test]
    fn stale_when_git_head_mismatch() {
        let out = assess_staleness(&git("bbb", false), true, false, Some(&git("aaa", false)));
        assert_eq!(out.reasons, vec![StaleReason::GitHeadMismatch]);
    }

    #[test]
    fn stale_when_filesystem_changed() {
        let out = assess_staleness(&fs(10, 123, 50), true, false, Some(&fs(10, 124, 50)));
        assert_eq!(out.reasons, vec![StaleReason::FilesystemChanged]);
    }

    #[test]
    fn fresh_when_watermarks_equal() {
        let mark = fs(10, 123, 50);
        let out = assess_staleness(&mark, true, false, Some(&mark));
        assert_eq!(out.stale, false);
        assert_eq!(out.reasons, Vec::<StaleReason>::new());
    }
}
