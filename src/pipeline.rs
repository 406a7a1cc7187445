//! Wires header reading, the record stream, pairing and output together.

use crate::error::{ConvertError, LineContext};
use crate::header::{ReadGroupCatalog, SamHeader, read_header};
use crate::parser::parse_record;
use crate::policy::{ConvertOptions, ReconcileOptions};
use crate::record::AlignmentRecord;
use crate::reconcile::{PairReconciler, ReconciliationStats};
use crate::sink::{OutputSink, SinkSummary};
use crate::source::RecordStream;
use crate::util::read_group_file_path;

use std::io::Write;
use std::path::Path;
use std::process::ExitStatus;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone)]
pub struct ConversionSummary {
    pub header: SamHeader,
    pub stats: ReconciliationStats,
    pub sink: SinkSummary,
    pub exit_status: ExitStatus,
}

pub struct Converter {
    opts: ConvertOptions,
    cancel: Arc<AtomicBool>,
}

impl Converter {
    pub fn new(opts: ConvertOptions) -> Self {
        Self {
            opts,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Setting the flag stops the run at the next record: the dump tool is
    /// killed, outputs are closed and `ConvertError::Cancelled` is returned.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn read_header(&self, input: &Path) -> Result<SamHeader, ConvertError> {
        read_header(&self.opts.tool, input)
    }

    /// Convert `input` into `sink`. In FASTQ mode the read-group declarations
    /// are also written next to the FASTQ files.
    pub fn run<W: Write>(
        &self,
        input: &Path,
        mut sink: OutputSink<W>,
    ) -> Result<ConversionSummary, ConvertError> {
        let header = self.read_header(input)?;
        if let OutputSink::Fastq(fastq) = &sink {
            let rg_file = read_group_file_path(fastq.out_dir(), input);
            header.read_groups.write_declarations_to(&rg_file)?;
        }

        let mut stream = RecordStream::open(
            &self.opts.tool,
            input,
            self.opts.region.as_deref(),
            self.opts.exclude_secondary,
        )?;
        let stats = match convert_lines(
            &mut stream,
            &header.read_groups,
            self.opts.reconcile.clone(),
            &mut sink,
            &self.cancel,
        ) {
            Ok(stats) => stats,
            Err(e) => {
                stream.terminate();
                if matches!(e, ConvertError::Cancelled) {
                    sink.finish()?;
                }
                return Err(e);
            }
        };
        let exit_status = stream.finish()?;
        let sink = sink.finish()?;
        Ok(ConversionSummary {
            header,
            stats,
            sink,
            exit_status,
        })
    }
}

/// Parse, pair and emit every line of `lines`. Line numbers in errors count
/// from 1 over what `lines` yields.
pub fn convert_lines<I, W>(
    lines: I,
    read_groups: &ReadGroupCatalog,
    opts: ReconcileOptions,
    sink: &mut OutputSink<W>,
    cancel: &AtomicBool,
) -> Result<ReconciliationStats, ConvertError>
where
    I: IntoIterator<Item = Result<String, ConvertError>>,
    W: Write,
{
    let single_group = read_groups.single_id();
    let mut reconciler = PairReconciler::new(opts);
    let mut on_pair = |m1: AlignmentRecord, m2: AlignmentRecord| sink.emit(&m1, &m2);
    let mut line_num = 0u64;
    for line in lines {
        if cancel.load(Ordering::Relaxed) {
            log::warn!("cancelled after {line_num} lines");
            return Err(ConvertError::Cancelled);
        }
        let line = line?;
        line_num += 1;
        let record = parse_record(&line, single_group)
            .map_err(|e| ConvertError::record_err(e, LineContext { line_num }))?;
        reconciler.push(record, &mut on_pair)?;
    }
    reconciler.finish(&mut on_pair)
}
