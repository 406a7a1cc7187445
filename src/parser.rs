use crate::error::RecordError;
use crate::record::AlignmentRecord;

/// Mandatory SAM columns before the optional tags.
pub const MANDATORY_FIELDS: usize = 11;

/// Fill byte for records whose quality column is `*`.
pub const MISSING_QUALITY: u8 = b'!';

/// Parse one alignment line.
///
/// With `known_single_group` set the record is assigned that group and its
/// tags are never looked at; otherwise the `RG` tag is required.
pub fn parse_record(
    line: &str,
    known_single_group: Option<&str>,
) -> Result<AlignmentRecord, RecordError> {
    let line = line.trim_end_matches(['\n', '\r']);
    let fields: Vec<&str> = if line.contains('\t') {
        line.split('\t').collect()
    } else {
        line.split_ascii_whitespace().collect()
    };
    if fields.len() < MANDATORY_FIELDS {
        return Err(RecordError::TooFewFields {
            found: fields.len(),
        });
    }

    let query_name = fields[0];
    let flag = fields[1]
        .parse::<u16>()
        .map_err(|_| RecordError::InvalidFlag {
            value: fields[1].to_string(),
        })?;

    let sequence = fields[9].as_bytes().to_vec();
    let quality = match fields[10] {
        "*" => vec![MISSING_QUALITY; sequence.len()],
        q if q.len() != sequence.len() => {
            return Err(RecordError::LengthMismatch {
                seq: sequence.len(),
                qual: q.len(),
            });
        }
        q => q.as_bytes().to_vec(),
    };

    let read_group = match known_single_group {
        Some(rg) => rg,
        None => read_group_tag(&fields[MANDATORY_FIELDS..]).ok_or_else(|| {
            RecordError::MissingReadGroup {
                name: query_name.to_string(),
            }
        })?,
    };

    Ok(AlignmentRecord::new(
        query_name, flag, sequence, quality, read_group,
    ))
}

/// Value of the first `RG` tag, without its `RG:Z:` prefix.
pub fn read_group_tag<'a>(tags: &[&'a str]) -> Option<&'a str> {
    let tag: &'a str = tags.iter().copied().find(|t| t.starts_with("RG"))?;
    // RG:Z:<value>; ids may themselves contain ':'
    let mut parts = tag.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(_), Some(value)) => Some(value),
        _ => tag.rsplit(':').next(),
    }
}
