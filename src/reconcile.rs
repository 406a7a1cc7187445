//! Single-pass mate pairing by query name.
//!
//! The first record seen for a name waits in a pending table; the next
//! record with that name is paired with it and both are handed to the
//! caller, first-seen as mate 1. Which record carries the first/second-in-pair
//! bit does not matter. Secondary alignments never enter the table.

use crate::policy::{OrphanPolicy, ReconcileOptions};
use crate::record::AlignmentRecord;

use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconciliationStats {
    pub records_read: u64,
    pub pairs_written: u64,
    pub secondary_skipped: u64,
    /// Names currently waiting for a mate.
    pub pending: usize,
    /// Records left without a mate at end of stream.
    pub orphans: u64,
    pub unmapped_collected: u64,
    /// Pairs produced by the sorted pass over collected unmapped records.
    pub unmapped_pairs: u64,
}

pub struct PairReconciler {
    pending: HashMap<String, AlignmentRecord>,
    unmapped: Vec<AlignmentRecord>,
    opts: ReconcileOptions,
    stats: ReconciliationStats,
    started: Instant,
}

impl Default for PairReconciler {
    fn default() -> Self {
        Self::new(ReconcileOptions::default())
    }
}

impl PairReconciler {
    pub fn new(opts: ReconcileOptions) -> Self {
        Self {
            pending: HashMap::new(),
            unmapped: Vec::new(),
            opts,
            stats: ReconciliationStats::default(),
            started: Instant::now(),
        }
    }

    pub fn stats(&self) -> ReconciliationStats {
        ReconciliationStats {
            pending: self.pending.len(),
            ..self.stats
        }
    }

    /// Feed one record; `on_pair` runs if it completes a pair.
    pub fn push<F, E>(&mut self, record: AlignmentRecord, on_pair: &mut F) -> Result<(), E>
    where
        F: FnMut(AlignmentRecord, AlignmentRecord) -> Result<(), E>,
    {
        self.stats.records_read += 1;
        let outcome = self.pair(record, on_pair);
        if self.opts.progress_interval > 0
            && self.stats.records_read % self.opts.progress_interval == 0
        {
            self.log_progress();
        }
        outcome
    }

    fn pair<F, E>(&mut self, record: AlignmentRecord, on_pair: &mut F) -> Result<(), E>
    where
        F: FnMut(AlignmentRecord, AlignmentRecord) -> Result<(), E>,
    {
        if record.is_secondary() {
            self.stats.secondary_skipped += 1;
            return Ok(());
        }
        if self.opts.orphan_policy == OrphanPolicy::CollectUnmapped
            && record.is_unmapped()
            && record.mate_is_unmapped()
        {
            self.stats.unmapped_collected += 1;
            self.unmapped.push(record);
            return Ok(());
        }
        match self.pending.remove(&record.query_name) {
            Some(first) => {
                on_pair(first, record)?;
                self.stats.pairs_written += 1;
                Ok(())
            }
            None => {
                self.pending.insert(record.query_name.clone(), record);
                Ok(())
            }
        }
    }

    /// End of stream: run the unmapped pass if enabled and account for orphans.
    pub fn finish<F, E>(mut self, on_pair: &mut F) -> Result<ReconciliationStats, E>
    where
        F: FnMut(AlignmentRecord, AlignmentRecord) -> Result<(), E>,
    {
        let mut unmapped = std::mem::take(&mut self.unmapped);
        unmapped.sort_by(|a, b| a.query_name.cmp(&b.query_name));
        let mut iter = unmapped.into_iter().peekable();
        while let Some(first) = iter.next() {
            match iter.next_if(|next| next.query_name == first.query_name) {
                Some(second) => {
                    on_pair(first, second)?;
                    self.stats.pairs_written += 1;
                    self.stats.unmapped_pairs += 1;
                }
                None => {
                    log::debug!("unpaired unmapped record: {}", first.query_name);
                    self.stats.orphans += 1;
                }
            }
        }

        for name in self.pending.keys() {
            log::debug!("orphan record: {name}");
        }
        self.stats.orphans += self.pending.len() as u64;
        if self.stats.orphans > 0 {
            log::info!("{} records had no mate in the stream", self.stats.orphans);
        }
        self.pending.clear();

        let stats = self.stats();
        log::info!(
            "read {} records, wrote {} pairs, skipped {} secondary alignments in {:.1}s",
            stats.records_read,
            stats.pairs_written,
            stats.secondary_skipped,
            self.started.elapsed().as_secs_f64()
        );
        Ok(stats)
    }

    fn log_progress(&self) {
        log::info!(
            "{} records read, {} reads written, {} pending, {} secondary skipped ({:.1}s)",
            self.stats.records_read,
            2 * self.stats.pairs_written,
            self.pending.len(),
            self.stats.secondary_skipped,
            self.started.elapsed().as_secs_f64()
        );
    }
}

/// Pair a whole record stream. The first error, from the input or from
/// `on_pair`, ends the pass.
pub fn reconcile<I, F, E>(
    records: I,
    opts: ReconcileOptions,
    mut on_pair: F,
) -> Result<ReconciliationStats, E>
where
    I: IntoIterator<Item = Result<AlignmentRecord, E>>,
    F: FnMut(AlignmentRecord, AlignmentRecord) -> Result<(), E>,
{
    let mut reconciler = PairReconciler::new(opts);
    for record in records {
        reconciler.push(record?, &mut on_pair)?;
    }
    reconciler.finish(&mut on_pair)
}
