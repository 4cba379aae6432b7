//! Summary of a completed split conversion.

use std::fmt;

use crate::ir::Split;
use crate::shard::ShardSummary;

/// What a successful split run produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitReport {
    pub split: Split,
    /// Annotations loaded from the source.
    pub annotations: usize,
    /// One entry per shard, in shard index order.
    pub shards: Vec<ShardSummary>,
}

impl SplitReport {
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Distinct images seen, including skipped entries.
    pub fn total_groups(&self) -> usize {
        self.shards.iter().map(|s| s.groups).sum()
    }

    pub fn total_records(&self) -> u64 {
        self.shards.iter().map(|s| s.records).sum()
    }

    pub fn total_skipped(&self) -> u64 {
        self.shards.iter().map(|s| s.skipped).sum()
    }
}

impl fmt::Display for SplitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Split '{}': wrote {} record(s) from {} annotation(s) into {} shard(s)",
            self.split,
            self.total_records(),
            self.annotations,
            self.shard_count()
        )?;
        if self.total_skipped() > 0 {
            writeln!(f, "  skipped {} non-image entr(y/ies)", self.total_skipped())?;
        }
        for shard in &self.shards {
            writeln!(f, "  {}: {} record(s)", shard.path.display(), shard.records)?;
        }
        Ok(())
    }
}
