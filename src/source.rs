use crate::error::ConvertError;

use std::ffi::OsString;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};

/// `samtools view -F` mask dropping secondary alignments.
pub const SECONDARY_FILTER_MASK: &str = "256";

/// The external program that decodes SAM/BAM into text.
#[derive(Debug, Clone)]
pub struct DumpTool {
    program: PathBuf,
    leading_args: Vec<OsString>,
}

impl Default for DumpTool {
    fn default() -> Self {
        Self::new("samtools")
    }
}

impl DumpTool {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Argument placed before `view`, e.g. for wrappers like `singularity exec <image> samtools`.
    pub fn arg<S: Into<OsString>>(mut self, arg: S) -> Self {
        self.leading_args.push(arg.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub(crate) fn display_name(&self) -> String {
        self.program.display().to_string()
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args).arg("view");
        cmd
    }

    /// `view -H <path>`
    pub fn header_command(&self, path: &Path) -> Command {
        let mut cmd = self.base_command();
        cmd.arg("-H").arg(path);
        cmd
    }

    /// `view [-F 256] <path> [region]`
    pub fn records_command(
        &self,
        path: &Path,
        region: Option<&str>,
        exclude_secondary: bool,
    ) -> Command {
        let mut cmd = self.base_command();
        if exclude_secondary {
            cmd.arg("-F").arg(SECONDARY_FILTER_MASK);
        }
        cmd.arg(path);
        if let Some(region) = region {
            cmd.arg(region);
        }
        cmd
    }
}

/// Lines printed by a running dump tool. Single pass; dropping an unfinished
/// stream kills the process.
pub struct RecordStream {
    program: String,
    child: Child,
    rdr: BufReader<ChildStdout>,
    line_num: u64,
    done: bool,
}

impl RecordStream {
    pub fn open(
        tool: &DumpTool,
        path: &Path,
        region: Option<&str>,
        exclude_secondary: bool,
    ) -> Result<Self, ConvertError> {
        log::info!(
            "streaming records from {}{}",
            path.display(),
            region.map(|r| format!(" (region {r})")).unwrap_or_default()
        );
        Self::spawn(
            tool.display_name(),
            tool.records_command(path, region, exclude_secondary),
        )
    }

    /// Spawn an arbitrary command and stream its stdout.
    pub fn spawn(program: String, mut cmd: Command) -> Result<Self, ConvertError> {
        let mut child = cmd
            .stdout(Stdio::piped())
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
            done: false,
        })
    }

    /// Read the next line into `buf` without its line terminator.
    /// Returns `false` at end of output.
    pub fn read_line(&mut self, buf: &mut String) -> Result<bool, ConvertError> {
        buf.clear();
        let n = self
            .rdr
            .read_line(buf)
            .map_err(|e| ConvertError::io_err(e, None))?;
        if n == 0 {
            return Ok(false);
        }
        self.line_num += 1;
        if buf.ends_with('\n') {
            buf.pop();
        }
        if buf.ends_with('\r') {
            buf.pop();
        }
        Ok(true)
    }

    /// Wait for the process. A failing exit status is logged, not returned:
    /// records already read stay valid.
    pub fn finish(mut self) -> Result<ExitStatus, ConvertError> {
        self.done = true;
        let status = self
            .child
            .wait()
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

    /// Kill the process and reap it.
    pub fn terminate(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        if let Err(e) = self.child.kill() {
            log::debug!("killing {}: {e}", self.program);
        }
        let _ = self.child.wait();
    }
}

impl Iterator for RecordStream {
    type Item = Result<String, ConvertError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = String::with_capacity(512);
        match self.read_line(&mut buf) {
            Ok(true) => Some(Ok(buf)),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl Drop for RecordStream {
    fn drop(&mut self) {
        self.terminate();
    }
}
