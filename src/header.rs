//! Contig and read-group declarations from the `samtools view -H` output.

use crate::error::ConvertError;
use crate::source::DumpTool;

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::process::Stdio;

/// One `@RG` line: the declaration as written to the provenance file, and its `ID`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadGroup {
    pub declaration: String,
    pub id: String,
}

/// Read groups in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadGroupCatalog {
    groups: Vec<ReadGroup>,
}

impl ReadGroupCatalog {
    pub fn new(groups: Vec<ReadGroup>) -> Self {
        Self { groups }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReadGroup> {
        self.groups.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.id.as_str())
    }

    /// The id to stamp on every record, if exactly one group is declared.
    pub fn single_id(&self) -> Option<&str> {
        match self.groups.as_slice() {
            [only] => Some(only.id.as_str()),
            _ => None,
        }
    }

    /// Write one declaration per line.
    pub fn write_declarations<W: Write>(&self, mut w: W) -> io::Result<()> {
        for group in &self.groups {
            writeln!(w, "{}", group.declaration)?;
        }
        w.flush()
    }

    pub fn write_declarations_to(&self, path: &Path) -> Result<(), ConvertError> {
        let f = File::create(path).map_err(|e| ConvertError::io_err(e, Some(path.into())))?;
        self.write_declarations(BufWriter::new(f))
            .map_err(|e| ConvertError::io_err(e, Some(path.into())))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SamHeader {
    pub contigs: Vec<String>,
    pub read_groups: ReadGroupCatalog,
}

impl SamHeader {
    pub fn parse<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut header = Self::default();
        for line in reader.lines() {
            header.push_line(&line?);
        }
        Ok(header)
    }

    /// Take one header line; anything but `@SQ` and `@RG` is ignored.
    pub fn push_line(&mut self, line: &str) {
        let line = line.trim_end_matches(['\n', '\r']);
        let mut fields = line.split('\t');
        match fields.next() {
            Some("@SQ") => {
                let rest: Vec<&str> = fields.collect();
                let name = rest
                    .iter()
                    .find_map(|f| f.strip_prefix("SN:"))
                    .or_else(|| rest.first().and_then(|f| f.split_once(':')).map(|(_, v)| v));
                match name {
                    Some(name) => self.contigs.push(name.to_string()),
                    None => log::warn!("ignoring @SQ line without a name: {line}"),
                }
            }
            Some("@RG") => {
                let rest: Vec<&str> = fields.collect();
                match rest.iter().find_map(|f| f.strip_prefix("ID:")) {
                    Some(id) => self.read_groups.groups.push(ReadGroup {
                        declaration: rest.join(" "),
                        id: id.to_string(),
                    }),
                    None => log::warn!("ignoring @RG line without an ID: {line}"),
                }
            }
            _ => {}
        }
    }
}

/// Run the dump tool in header-only mode and parse what it prints.
pub fn read_header(tool: &DumpTool, path: &Path) -> Result<SamHeader, ConvertError> {
    let program = tool.display_name();
    let mut child = tool
        .header_command(path)
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|e| ConvertError::HeaderUnavailable {
            program: program.clone(),
            reason: e.to_string(),
        })?;

    let mut header = SamHeader::default();
    let mut lines_seen = 0u64;
    if let Some(stdout) = child.stdout.take() {
        for line in BufReader::new(stdout).lines() {
            let line = line.map_err(|e| ConvertError::HeaderUnavailable {
                program: program.clone(),
                reason: e.to_string(),
            })?;
            lines_seen += 1;
            header.push_line(&line);
        }
    }

    let status = child.wait().map_err(|e| ConvertError::HeaderUnavailable {
        program: program.clone(),
        reason: e.to_string(),
    })?;
    if !status.success() {
        if lines_seen == 0 {
            return Err(ConvertError::HeaderUnavailable {
                program,
                reason: format!("exited with {status}"),
            });
        }
        log::warn!("{program} exited with {status} after printing the header");
    }

    log::info!(
        "header: {} contigs, {} read groups",
        header.contigs.len(),
        header.read_groups.len()
    );
    Ok(header)
}
