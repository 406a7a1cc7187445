use bam2fastq::{ReadGroup, ReadGroupCatalog, SamHeader};
use std::io::BufReader;

const HEADER: &str = "\
@HD\tVN:1.6\tSO:coordinate
@SQ\tSN:chr1\tLN:248956422
@SQ\tSN:chrM\tLN:16569
@RG\tID:lane1\tSM:sample\tPL:ILLUMINA
@RG\tSM:sample\tID:lane2
@RG\tSM:no_id
@PG\tID:bwa\tPN:bwa
";

#[test]
fn contigs_and_read_groups_in_order() {
    let header = SamHeader::parse(BufReader::new(HEADER.as_bytes())).unwrap();
    assert_eq!(header.contigs, ["chr1", "chrM"]);

    let ids: Vec<&str> = header.read_groups.ids().collect();
    assert_eq!(ids, ["lane1", "lane2"]);
    let first = header.read_groups.iter().next().unwrap();
    assert_eq!(first.declaration, "ID:lane1 SM:sample PL:ILLUMINA");
    assert_eq!(header.read_groups.single_id(), None);
}

#[test]
fn single_read_group_is_exposed() {
    let header = SamHeader::parse(BufReader::new(
        "@SQ\tSN:c\tLN:1\n@RG\tID:solo\tSM:x\n".as_bytes(),
    ))
    .unwrap();
    assert_eq!(header.read_groups.single_id(), Some("solo"));
    assert_eq!(ReadGroupCatalog::default().single_id(), None);
}

#[test]
fn declarations_file_has_one_line_per_group() {
    let catalog = ReadGroupCatalog::new(vec![
        ReadGroup {
            declaration: "ID:a SM:s".into(),
            id: "a".into(),
        },
        ReadGroup {
            declaration: "ID:b SM:s".into(),
            id: "b".into(),
        },
    ]);
    let mut out = Vec::new();
    catalog.write_declarations(&mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "ID:a SM:s\nID:b SM:s\n");
}
