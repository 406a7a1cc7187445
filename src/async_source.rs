#![cfg(feature = "async")]

use crate::error::{ConvertError, LineContext};
use crate::header::ReadGroupCatalog;
use crate::parser::parse_record;
use crate::policy::ReconcileOptions;
use crate::reconcile::{PairReconciler, ReconciliationStats};
use crate::record::AlignmentRecord;
use crate::sink::OutputSink;
use crate::source::DumpTool;

use std::io::Write;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};

/// Async counterpart of `RecordStream`; the child is killed if the stream is
/// dropped before `finish`.
pub struct AsyncRecordStream {
    program: String,
    child: Child,
    rdr: BufReader<ChildStdout>,
    line_num: u64,
}

impl AsyncRecordStream {
    pub async fn open(
        tool: &DumpTool,
        path: &Path,
        region: Option<&str>,
        exclude_secondary: bool,
    ) -> Result<Self, ConvertError> {
        let program = tool.program().display().to_string();
        let mut cmd = Command::from(tool.records_command(path, region, exclude_secondary));
        let mut child = cmd
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ConvertError::SourceUnavailable {
                program: program.clone(),
                source,
            })?;
        let stdout = child.stdout.take().ok_or_else(|| ConvertError::SourceUnavailable {
            program: program.clone(),
            source: io::Error::other("stdout was not captured"),
        })?;
        Ok(Self {
            program,
            child,
            rdr: BufReader::with_capacity(256 * 1024, stdout),
            line_num: 0,
        })
    }

    /// Next line without its terminator, or `None` at end of output.
    pub async fn next_line(&mut self) -> Option<Result<String, ConvertError>> {
        let mut buf = String::with_capacity(512);
        match self.rdr.read_line(&mut buf).await {
            Ok(0) => None,
            Ok(_) => {
                self.line_num += 1;
                if buf.ends_with('\n') {
                    buf.pop();
                }
                if buf.ends_with('\r') {
                    buf.pop();
                }
                Some(Ok(buf))
            }
            Err(e) => Some(Err(ConvertError::io_err(e, None))),
        }
    }

    #[inline]
    pub fn ctx(&self) -> LineContext {
        LineContext {
            line_num: self.line_num,
        }
    }

    pub async fn finish(mut self) -> Result<ExitStatus, ConvertError> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| ConvertError::io_err(e, None))?;
        if !status.success() {
            log::warn!(
                "{} exited with {status} after {} lines",
                self.program,
                self.line_num
            );
        }
        Ok(status)
    }
}

/// Drain `stream` through the reconciler into `sink`. The sink is left open.
pub async fn run_async<W: Write>(
    mut stream: AsyncRecordStream,
    read_groups: &ReadGroupCatalog,
    opts: ReconcileOptions,
    sink: &mut OutputSink<W>,
) -> Result<(ReconciliationStats, ExitStatus), ConvertError> {
    let single_group = read_groups.single_id();
    let mut reconciler = PairReconciler::new(opts);
    let mut on_pair = |m1: AlignmentRecord, m2: AlignmentRecord| sink.emit(&m1, &m2);
    while let Some(line) = stream.next_line().await {
        let line = line?;
        let record = parse_record(&line, single_group)
            .map_err(|e| ConvertError::record_err(e, stream.ctx()))?;
        reconciler.push(record, &mut on_pair)?;
    }
    let stats = reconciler.finish(&mut on_pair)?;
    let status = stream.finish().await?;
    Ok((stats, status))
}
