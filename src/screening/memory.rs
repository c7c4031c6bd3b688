use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::domain::{ContextEntry, MemorySnapshot};
use super::repository::{RepositoryError, ScreeningRepository};

/// Compaction tunables: when to fire and how tight the output bound is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompactionConfig {
    /// Entry-count trigger.
    pub max_entries: usize,
    /// Byte-size trigger over the concatenated entry text.
    pub max_bytes: usize,
    /// Sessions idle longer than this are compacted by the sweep.
    pub staleness_hours: i64,
    /// Ephemeral entries older than this window are evicted.
    pub recency_window_minutes: i64,
    /// How many salient entries the summary condenses.
    pub summary_entries: usize,
    /// Hard bound on the summary string.
    pub summary_max_chars: usize,
    /// Per-entry excerpt bound inside the summary.
    pub excerpt_max_chars: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            max_entries: 50,
            max_bytes: 16 * 1024,
            staleness_hours: 24,
            recency_window_minutes: 30,
            summary_entries: 5,
            summary_max_chars: 480,
            excerpt_max_chars: 160,
        }
    }
}

/// Pluggable information-density strategy: indices of `entries` ordered
/// most informative first. Implementations must be deterministic so
/// re-compaction of identical input reproduces the same summary.
pub trait EntryRanker: Send + Sync {
    fn rank(&self, entries: &[ContextEntry]) -> Vec<usize>;
}

/// Rule-based default: distinct-token ratio scaled by log length, ties
/// broken by position.
#[derive(Debug, Default, Clone, Copy)]
pub struct DensityRanker;

impl EntryRanker for DensityRanker {
    fn rank(&self, entries: &[ContextEntry]) -> Vec<usize> {
        let mut scored: Vec<(usize, f32)> = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (index, density(&entry.text)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.into_iter().map(|(index, _)| index).collect()
    }
}

fn density(text: &str) -> f32 {
    let tokens: Vec<String> = text
        .split_whitespace()
        .map(|token| token.to_ascii_lowercase())
        .collect();
    if tokens.is_empty() {
        return 0.0;
    }
    let mut distinct = tokens.clone();
    distinct.sort();
    distinct.dedup();
    let ratio = distinct.len() as f32 / tokens.len() as f32;
    ratio * (1.0 + tokens.len() as f32).ln()
}

/// Outcome counts for one compaction sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompactionReport {
    pub compacted: usize,
    pub skipped: usize,
}

/// How many times the read-compact-swap cycle is replayed when appends
/// land between the context read and the write-back.
const COMPACTION_CAS_RETRY_LIMIT: u32 = 4;

/// Condenses a session's accumulated context into a bounded snapshot:
/// salient entries survive verbatim, stale ephemeral entries are evicted,
/// and the summary is a deterministic extract of the densest salient
/// entries. Each session key holds at most one snapshot; compaction
/// overwrites it.
pub struct MemoryCompactor<R> {
    repository: Arc<R>,
    ranker: Arc<dyn EntryRanker>,
    config: CompactionConfig,
}

impl<R> MemoryCompactor<R>
where
    R: ScreeningRepository,
{
    pub fn new(repository: Arc<R>, config: CompactionConfig) -> Self {
        Self::with_ranker(repository, Arc::new(DensityRanker), config)
    }

    pub fn with_ranker(
        repository: Arc<R>,
        ranker: Arc<dyn EntryRanker>,
        config: CompactionConfig,
    ) -> Self {
        Self {
            repository,
            ranker,
            config,
        }
    }

    pub fn config(&self) -> &CompactionConfig {
        &self.config
    }

    /// Size/age predicate shared by the on-demand trigger and the sweep.
    pub fn needs_compaction(&self, entries: &[ContextEntry], now: DateTime<Utc>) -> bool {
        if entries.is_empty() {
            return false;
        }
        if entries.len() > self.config.max_entries {
            return true;
        }
        let bytes: usize = entries.iter().map(|entry| entry.text.len()).sum();
        if bytes > self.config.max_bytes {
            return true;
        }
        let newest = entries
            .iter()
            .map(|entry| entry.recorded_at)
            .max()
            .unwrap_or(now);
        now - newest >= Duration::hours(self.config.staleness_hours)
    }

    /// Compact regardless of thresholds. Deterministic given the stored
    /// entries and `now`: identical input always produces byte-identical
    /// summary and context. The cycle re-reads and replays when an append
    /// lands between the read and the swap, so live entries are never
    /// dropped.
    pub fn compact(
        &self,
        session_key: &str,
        now: DateTime<Utc>,
    ) -> Result<MemorySnapshot, RepositoryError> {
        let mut attempts = 0;
        loop {
            let entries = self.repository.context(session_key)?;
            match self.commit(session_key, &entries, now) {
                Ok(snapshot) => return Ok(snapshot),
                Err(RepositoryError::VersionConflict)
                    if attempts < COMPACTION_CAS_RETRY_LIMIT =>
                {
                    attempts += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One compaction attempt over a consistent read of the context. The
    /// swap is conditional on the entry count still matching `entries`; an
    /// append racing the cycle surfaces as `VersionConflict` for replay
    /// instead of being overwritten.
    fn commit(
        &self,
        session_key: &str,
        entries: &[ContextEntry],
        now: DateTime<Utc>,
    ) -> Result<MemorySnapshot, RepositoryError> {
        let window = Duration::minutes(self.config.recency_window_minutes);
        let retained: Vec<ContextEntry> = entries
            .iter()
            .filter(|entry| entry.salient || now - entry.recorded_at <= window)
            .cloned()
            .collect();

        let salient: Vec<&ContextEntry> =
            retained.iter().filter(|entry| entry.salient).collect();
        let summary = self.summarize(&salient);

        let words_before: usize = entries.iter().map(|entry| word_count(&entry.text)).sum();
        let words_after = word_count(&summary)
            + retained
                .iter()
                .map(|entry| word_count(&entry.text))
                .sum::<usize>();
        let compression_ratio = round2(words_before as f32 / words_after.max(1) as f32);

        let snapshot = MemorySnapshot {
            session_key: session_key.to_string(),
            summary,
            compacted_context: retained.clone(),
            words_before,
            words_after,
            compression_ratio,
            compacted_at: now,
        };

        self.repository
            .replace_context(session_key, entries.len(), retained)?;
        self.repository.upsert_snapshot(snapshot.clone())?;
        info!(
            session_key,
            dropped = entries.len() - snapshot.compacted_context.len(),
            ratio = snapshot.compression_ratio,
            "session context compacted"
        );
        Ok(snapshot)
    }

    /// On-demand trigger: compacts the stored context when it exceeds the
    /// configured thresholds.
    pub fn compact_if_needed(
        &self,
        session_key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<MemorySnapshot>, RepositoryError> {
        let mut attempts = 0;
        loop {
            let entries = self.repository.context(session_key)?;
            if !self.needs_compaction(&entries, now) {
                debug!(session_key, "context below compaction thresholds");
                return Ok(None);
            }
            match self.commit(session_key, &entries, now) {
                Ok(snapshot) => return Ok(Some(snapshot)),
                Err(RepositoryError::VersionConflict)
                    if attempts < COMPACTION_CAS_RETRY_LIMIT =>
                {
                    attempts += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Periodic sweep over every tracked session key.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<CompactionReport, RepositoryError> {
        let mut report = CompactionReport::default();
        for key in self.repository.context_keys()? {
            match self.compact_if_needed(&key, now)? {
                Some(_) => report.compacted += 1,
                None => report.skipped += 1,
            }
        }
        Ok(report)
    }

    /// Extractive summary: the N densest salient entries, excerpted in
    /// their original order, joined and bounded.
    fn summarize(&self, salient: &[&ContextEntry]) -> String {
        if salient.is_empty() {
            return String::new();
        }

        let owned: Vec<ContextEntry> = salient.iter().map(|entry| (*entry).clone()).collect();
        let mut chosen: Vec<usize> = self
            .ranker
            .rank(&owned)
            .into_iter()
            .take(self.config.summary_entries)
            .collect();
        chosen.sort_unstable();

        let joined = chosen
            .into_iter()
            .map(|index| truncate_chars(owned[index].text.trim(), self.config.excerpt_max_chars))
            .collect::<Vec<_>>()
            .join("; ");
        truncate_chars(&joined, self.config.summary_max_chars)
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}
