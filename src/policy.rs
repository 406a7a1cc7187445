use crate::source::DumpTool;

use std::time::Duration;

/// What happens to records whose mate never shows up under the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrphanPolicy {
    /// Count and log them; nothing is emitted (the conservative default).
    #[default]
    Discard,
    /// Divert records with both the unmapped and mate-unmapped bits set into
    /// a side list, then sort it by name at end of stream and pair adjacent
    /// equal names. Memory grows with the number of such records.
    CollectUnmapped,
}

/// What the SAM stream sink does once its broken-pipe retries run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExhaustedPolicy {
    /// Drop the pair with a warning and keep going.
    #[default]
    Drop,
    /// Abort with `ConvertError::SinkRetriesExhausted`.
    Fail,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before retry `n` is `backoff_step * n`.
    pub backoff_step: Duration,
    pub on_exhausted: ExhaustedPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff_step: Duration::from_millis(100),
            on_exhausted: ExhaustedPolicy::Drop,
        }
    }
}

impl RetryPolicy {
    #[inline]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputCompression {
    #[default]
    Plain,
    /// gzip at the given level (0-9).
    Gzip(u32),
}

impl OutputCompression {
    pub fn is_gzip(&self) -> bool {
        matches!(self, Self::Gzip(_))
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub orphan_policy: OrphanPolicy,
    /// Log progress every this many input records; 0 disables it.
    pub progress_interval: u64,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            orphan_policy: OrphanPolicy::Discard,
            progress_interval: 100_000,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub tool: DumpTool,
    pub region: Option<String>,
    /// Ask the dump tool to drop secondary alignments (`-F 256`).
    pub exclude_secondary: bool,
    pub reconcile: ReconcileOptions,
}
