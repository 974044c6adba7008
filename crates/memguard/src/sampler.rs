use std::fs;

#[derive(Debug, Clone, Copy)]
pub struct MemorySample {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

/// Source of process memory usage. Kept as a trait so tests can supply
/// fixed samples instead of depending on the host's actual memory
/// pressure.
pub trait MemorySampler: Send + Sync {
    fn sample(&self) -> Option<MemorySample>;
}

/// Reads resident set size from `/proc/self/status` and total system
/// memory from `/proc/meminfo`. Returns `None` on non-Linux platforms or
/// if either file is unreadable; callers should treat that as "no signal"
/// rather than an error, the same as a slow or missing health probe.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcSelfStatusSampler;

impl MemorySampler for ProcSelfStatusSampler {
    fn sample(&self) -> Option<MemorySample> {
        let used_kb = parse_kb_field(&fs::read_to_string("/proc/self/status").ok()?, "VmRSS:")?;
        let total_kb = parse_kb_field(&fs::read_to_string("/proc/meminfo").ok()?, "MemTotal:")?;
        Some(MemorySample {
            used_bytes: used_kb * 1024,
            total_bytes: total_kb * 1024,
        })
    }
}

fn parse_kb_field(contents: &str, prefix: &str) -> Option<u64> {
    contents
        .lines()
        .find(|line| line.starts_with(prefix))
        .and_then(|line| line.trim_start_matches(prefix).trim().split_whitespace().next())
        .and_then(|kb| kb.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kb_field_from_proc_style_text() {
        let text = "VmPeak:\t  123 kB\nVmRSS:\t   4096 kB\nThreads:\t4\n";
        assert_eq!(parse_kb_field(text, "VmRSS:"), Some(4096));
    }

    #[test]
    fn missing_field_yields_none() {
        let text = "Threads:\t4\n";
        assert_eq!(parse_kb_field(text, "VmRSS:"), None);
    }
}
