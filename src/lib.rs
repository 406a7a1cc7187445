//! Streaming SAM/BAM to paired FASTQ conversion, split by read group.
//!
//! - Decoding is delegated to `samtools view`; records arrive as text lines on its stdout.
//! - Mates are paired by query name in a single pass; the first one seen becomes mate 1.
//! - Reverse-strand reads are reverse-complemented back to sequencing orientation.
//! - FASTQ output goes to `<read_group>.1.fq` / `<read_group>.2.fq` (optionally `.gz`).
//! - Alternatively, pairs are re-emitted as de-mapped SAM on stdout, riding out broken pipes.
//! - Optional async record stream behind the `async` feature.

pub mod error;
pub mod flag;
pub mod format;
pub mod header;
pub mod parser;
pub mod pipeline;
pub mod policy;
pub mod reconcile;
pub mod record;
pub mod sink;
pub mod source;
mod util;

#[cfg(feature = "async")]
pub mod async_source;

pub use crate::error::{ConvertError, LineContext, RecordError};
pub use crate::flag::Flags;
pub use crate::header::{ReadGroup, ReadGroupCatalog, SamHeader, read_header};
pub use crate::parser::parse_record;
pub use crate::pipeline::{ConversionSummary, Converter, convert_lines};
pub use crate::policy::{
    ConvertOptions, ExhaustedPolicy, OrphanPolicy, OutputCompression, ReconcileOptions,
    RetryPolicy,
};
pub use crate::reconcile::{PairReconciler, ReconciliationStats, reconcile};
pub use crate::record::AlignmentRecord;
pub use crate::sink::{FastqSink, OutputSink, SamSink, SinkSummary};
pub use crate::source::{DumpTool, RecordStream};
pub use crate::util::{fastq_path, read_group_file_path};

#[cfg(feature = "async")]
pub use crate::async_source::{AsyncRecordStream, run_async};
