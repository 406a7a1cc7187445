//! FASTQ and de-mapped SAM serialization of single records.

use crate::flag;
use crate::record::AlignmentRecord;

use std::borrow::Cow;
use std::io::{self, Write};

/// Watson-Crick complement; N and any other byte are returned unchanged, case is kept.
#[inline]
pub const fn complement_base(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'a' => b't',
        b't' => b'a',
        b'c' => b'g',
        b'g' => b'c',
        _ => base,
    }
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement_base(b)).collect()
}

/// Sequence and quality in the orientation the instrument read them.
pub fn original_orientation(rec: &AlignmentRecord) -> (Cow<'_, [u8]>, Cow<'_, [u8]>) {
    if rec.is_reverse_strand() {
        let mut qual = rec.quality.clone();
        qual.reverse();
        (
            Cow::Owned(reverse_complement(&rec.sequence)),
            Cow::Owned(qual),
        )
    } else {
        (
            Cow::Borrowed(rec.sequence.as_slice()),
            Cow::Borrowed(rec.quality.as_slice()),
        )
    }
}

pub fn write_fastq<W: Write + ?Sized>(w: &mut W, rec: &AlignmentRecord) -> io::Result<()> {
    let (seq, qual) = original_orientation(rec);
    w.write_all(b"@")?;
    w.write_all(rec.query_name.as_bytes())?;
    w.write_all(b"\n")?;
    w.write_all(&seq)?;
    w.write_all(b"\n+\n")?;
    w.write_all(&qual)?;
    w.write_all(b"\n")
}

/// Twelve tab-separated columns: name, de-mapped flag, placeholders for
/// RNAME..TLEN, sequence, quality and the `RG:Z:` tag.
pub fn write_sam<W: Write + ?Sized>(w: &mut W, rec: &AlignmentRecord) -> io::Result<()> {
    let (seq, qual) = original_orientation(rec);
    write!(
        w,
        "{}\t{}\t*\t0\t0\t*\t*\t0\t0\t",
        rec.query_name,
        flag::demapped(rec.flag)
    )?;
    w.write_all(&seq)?;
    w.write_all(b"\t")?;
    w.write_all(&qual)?;
    writeln!(w, "\tRG:Z:{}", rec.read_group)
}
