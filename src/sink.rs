use crate::error::ConvertError;
use crate::format::{write_fastq, write_sam};
use crate::policy::{ExhaustedPolicy, OutputCompression, RetryPolicy};
use crate::record::AlignmentRecord;
use crate::util::fastq_path;

#[cfg(feature = "gzip")]
use flate2::{Compression, write::GzEncoder};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkSummary {
    pub pairs_written: u64,
    /// SAM mode only: pairs given up on after the retry budget.
    pub dropped_pairs: u64,
    /// FASTQ mode only: files created, in read-group order.
    pub files: Vec<PathBuf>,
}

/// Where matched pairs go. Chosen once at startup.
pub enum OutputSink<W: Write = Stdout> {
    Fastq(FastqSink),
    Sam(SamSink<W>),
}

impl<W: Write> OutputSink<W> {
    pub fn emit(
        &mut self,
        mate1: &AlignmentRecord,
        mate2: &AlignmentRecord,
    ) -> Result<(), ConvertError> {
        match self {
            Self::Fastq(s) => s.emit(mate1, mate2),
            Self::Sam(s) => s.emit(mate1, mate2),
        }
    }

    /// Flush and close every destination.
    pub fn finish(self) -> Result<SinkSummary, ConvertError> {
        match self {
            Self::Fastq(s) => s.finish(),
            Self::Sam(s) => s.finish(),
        }
    }
}

enum FastqWriter {
    Plain(BufWriter<File>),
    #[cfg(feature = "gzip")]
    Gzip(GzEncoder<BufWriter<File>>),
}

impl FastqWriter {
    fn create(path: &Path, compression: OutputCompression) -> Result<Self, ConvertError> {
        let open = || {
            File::create(path)
                .map(|f| BufWriter::with_capacity(256 * 1024, f))
                .map_err(|e| ConvertError::io_err(e, Some(path.into())))
        };
        match compression {
            OutputCompression::Plain => Ok(Self::Plain(open()?)),
            #[cfg(feature = "gzip")]
            OutputCompression::Gzip(level) => {
                Ok(Self::Gzip(GzEncoder::new(open()?, Compression::new(level))))
            }
            #[cfg(not(feature = "gzip"))]
            OutputCompression::Gzip(_) => Err(ConvertError::GzipDisabled),
        }
    }

    fn finish(self) -> io::Result<()> {
        match self {
            Self::Plain(mut w) => w.flush(),
            #[cfg(feature = "gzip")]
            Self::Gzip(enc) => enc.finish()?.flush(),
        }
    }
}

impl Write for FastqWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            #[cfg(feature = "gzip")]
            Self::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            #[cfg(feature = "gzip")]
            Self::Gzip(w) => w.flush(),
        }
    }
}

struct MateFiles {
    paths: [PathBuf; 2],
    writers: [FastqWriter; 2],
}

/// One `.1.fq`/`.2.fq` pair per read group, opened on first use.
pub struct FastqSink {
    out_dir: PathBuf,
    compression: OutputCompression,
    groups: HashMap<String, MateFiles>,
    pairs_written: u64,
}

impl FastqSink {
    pub fn new<P: Into<PathBuf>>(out_dir: P, compression: OutputCompression) -> Self {
        Self {
            out_dir: out_dir.into(),
            compression,
            groups: HashMap::new(),
            pairs_written: 0,
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Read groups with open files.
    pub fn read_groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn emit(
        &mut self,
        mate1: &AlignmentRecord,
        mate2: &AlignmentRecord,
    ) -> Result<(), ConvertError> {
        if !self.groups.contains_key(&mate1.read_group) {
            let files = self.open_group(&mate1.read_group)?;
            self.groups.insert(mate1.read_group.clone(), files);
        }
        if let Some(files) = self.groups.get_mut(&mate1.read_group) {
            for (i, rec) in [mate1, mate2].into_iter().enumerate() {
                write_fastq(&mut files.writers[i], rec)
                    .map_err(|e| ConvertError::io_err(e, Some(files.paths[i].clone())))?;
            }
            self.pairs_written += 1;
        }
        Ok(())
    }

    fn open_group(&self, read_group: &str) -> Result<MateFiles, ConvertError> {
        let gzip = self.compression.is_gzip();
        let paths = [
            fastq_path(&self.out_dir, read_group, 1, gzip),
            fastq_path(&self.out_dir, read_group, 2, gzip),
        ];
        if let Some((other, _)) = self.groups.iter().find(|(_, f)| f.paths[0] == paths[0]) {
            return Err(ConvertError::OutputCollision {
                read_group: read_group.to_string(),
                other: other.clone(),
                path: paths[0].clone(),
            });
        }
        log::info!("opening output for read group {read_group}");
        let writers = [
            FastqWriter::create(&paths[0], self.compression)?,
            FastqWriter::create(&paths[1], self.compression)?,
        ];
        Ok(MateFiles { paths, writers })
    }

    pub fn finish(self) -> Result<SinkSummary, ConvertError> {
        let mut groups: Vec<(String, MateFiles)> = self.groups.into_iter().collect();
        groups.sort_by(|a, b| a.0.cmp(&b.0));
        let mut files = Vec::with_capacity(groups.len() * 2);
        for (_, MateFiles { paths, writers }) in groups {
            for (path, writer) in paths.into_iter().zip(writers) {
                writer
                    .finish()
                    .map_err(|e| ConvertError::io_err(e, Some(path.clone())))?;
                files.push(path);
            }
        }
        Ok(SinkSummary {
            pairs_written: self.pairs_written,
            dropped_pairs: 0,
            files,
        })
    }
}

/// Both mates as de-mapped SAM lines on one shared writer, retrying when the
/// reader on the other end of a pipe goes away.
pub struct SamSink<W: Write> {
    out: W,
    retry: RetryPolicy,
    buf: Vec<u8>,
    pairs_written: u64,
    dropped_pairs: u64,
}

impl SamSink<Stdout> {
    pub fn stdout(retry: RetryPolicy) -> Self {
        Self::new(io::stdout(), retry)
    }
}

impl<W: Write> SamSink<W> {
    pub fn new(out: W, retry: RetryPolicy) -> Self {
        Self {
            out,
            retry,
            buf: Vec::with_capacity(1024),
            pairs_written: 0,
            dropped_pairs: 0,
        }
    }

    pub fn emit(
        &mut self,
        mate1: &AlignmentRecord,
        mate2: &AlignmentRecord,
    ) -> Result<(), ConvertError> {
        self.buf.clear();
        write_sam(&mut self.buf, mate1)?;
        write_sam(&mut self.buf, mate2)?;
        if self.write_with_retry()? {
            self.pairs_written += 1;
        } else {
            self.dropped_pairs += 1;
        }
        Ok(())
    }

    /// Write all of `buf`, resuming after the bytes already accepted when a
    /// broken pipe interrupts it. `Ok(false)` means the retry budget ran out
    /// under `ExhaustedPolicy::Drop`.
    fn write_with_retry(&mut self) -> Result<bool, ConvertError> {
        let mut written = 0;
        let mut attempt = 0u32;
        while written < self.buf.len() {
            match self.out.write(&self.buf[written..]) {
                Ok(0) => {
                    return Err(ConvertError::io_err(
                        io::Error::from(io::ErrorKind::WriteZero),
                        None,
                    ));
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    attempt += 1;
                    if !self.wait_for_reader(attempt)? {
                        return Ok(false);
                    }
                }
                Err(e) => return Err(ConvertError::io_err(e, None)),
            }
        }
        Ok(true)
    }

    /// Sleep before retry `attempt`, or report that the budget is spent:
    /// `Ok(false)` to drop, `Err` to fail.
    fn wait_for_reader(&self, attempt: u32) -> Result<bool, ConvertError> {
        if attempt >= self.retry.max_attempts {
            return match self.retry.on_exhausted {
                ExhaustedPolicy::Drop => {
                    log::warn!("broken pipe persisted over {attempt} attempts; dropping output");
                    Ok(false)
                }
                ExhaustedPolicy::Fail => {
                    Err(ConvertError::SinkRetriesExhausted { attempts: attempt })
                }
            };
        }
        let delay = self.retry.backoff(attempt);
        log::debug!("broken pipe (attempt {attempt}), retrying in {delay:?}");
        std::thread::sleep(delay);
        Ok(true)
    }

    pub fn finish(mut self) -> Result<SinkSummary, ConvertError> {
        let mut attempt = 0u32;
        loop {
            match self.out.flush() {
                Ok(()) => break,
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    attempt += 1;
                    if !self.wait_for_reader(attempt)? {
                        break;
                    }
                }
                Err(e) => return Err(ConvertError::io_err(e, None)),
            }
        }
        Ok(SinkSummary {
            pairs_written: self.pairs_written,
            dropped_pairs: self.dropped_pairs,
            files: Vec::new(),
        })
    }

    /// The underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}
