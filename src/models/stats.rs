// src/models/stats.rs

use serde::{Deserialize, Serialize};

use crate::models::matching::{CrossRefStatus, MatchedAccountRecord};

/// Running counts for one chunk (and accumulated across chunks by callers).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ChunkStats {
    pub both: usize,
    pub dim_only: usize,
    pub sf_only: usize,
    pub new: usize,
    pub ai_validated: usize,
}

impl ChunkStats {
    pub fn record(&mut self, status: CrossRefStatus) {
        match status {
            CrossRefStatus::Both => self.both += 1,
            CrossRefStatus::DimOnly => self.dim_only += 1,
            CrossRefStatus::SfOnly => self.sf_only += 1,
            CrossRefStatus::New => self.new += 1,
        }
    }

    pub fn merge(&mut self, other: &ChunkStats) {
        self.both += other.both;
        self.dim_only += other.dim_only;
        self.sf_only += other.sf_only;
        self.new += other.new;
        self.ai_validated += other.ai_validated;
    }
}

/// Complete result of one chunk invocation. `matches` preserves the input
/// page order; no source record is ever dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkResult {
    pub matches: Vec<MatchedAccountRecord>,
    pub total_source_accounts: i64,
    pub processed_count: usize,
    pub has_more: bool,
    pub stats: ChunkStats,
}

impl ChunkResult {
    pub fn empty(total_source_accounts: i64) -> Self {
        Self {
            matches: Vec::new(),
            total_source_accounts,
            processed_count: 0,
            has_more: false,
            stats: ChunkStats::default(),
        }
    }
}
