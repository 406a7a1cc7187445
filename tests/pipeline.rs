#[cfg(unix)]
mod t {
    use bam2fastq::{
        ConvertError, ConvertOptions, Converter, DumpTool, FastqSink, OutputCompression,
        OutputSink, ReadGroupCatalog, ReconcileOptions, RecordStream, RetryPolicy, SamSink,
        convert_lines, read_header,
    };
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::{TempDir, tempdir};

    const HEADER: &str = "@HD\tVN:1.6\n@SQ\tSN:chr1\tLN:1000\n@RG\tID:lane1\tSM:s\n@RG\tID:lane2\tSM:s\n";

    const RECORDS: &str = "\
A\t99\tchr1\t10\t60\t4M\t=\t50\t44\tAACG\tABCD\tRG:Z:lane1
B\t65\tchr1\t20\t60\t4M\t=\t60\t44\tGGGG\tIIII\tRG:Z:lane2
A\t355\tchr1\t30\t0\t4M\t=\t50\t24\tTTTT\tIIII\tRG:Z:lane1
B\t145\tchr1\t60\t60\t4M\t=\t20\t-44\tACCA\t1234\tRG:Z:lane2
A\t147\tchr1\t50\t60\t4M\t=\t10\t-44\tCCAA\tWXYZ\tRG:Z:lane1
orphan\t73\tchr1\t70\t60\t4M\t=\t70\t0\tNNNN\t####\tRG:Z:lane1
";

    /// A stand-in for `samtools view` that prints canned text and records its arguments.
    fn fake_samtools(dir: &Path, header: &str, records: &str) -> DumpTool {
        fs::write(dir.join("header.sam"), header).unwrap();
        fs::write(dir.join("records.sam"), records).unwrap();
        let script = format!(
            "echo \"$@\" > '{d}/args.txt'\n\
             if [ \"$2\" = \"-H\" ]; then cat '{d}/header.sam'; exit 0; fi\n\
             cat '{d}/records.sam'\n",
            d = dir.display()
        );
        let script_path = dir.join("samtools.sh");
        fs::write(&script_path, script).unwrap();
        DumpTool::new("sh").arg(script_path)
    }

    fn workspace() -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        (dir, out)
    }

    #[test]
    fn fastq_conversion_end_to_end() {
        let (dir, out) = workspace();
        let tool = fake_samtools(dir.path(), HEADER, RECORDS);
        let converter = Converter::new(ConvertOptions {
            tool,
            ..ConvertOptions::default()
        });
        let input = dir.path().join("sample.bam");
        let sink: OutputSink = OutputSink::Fastq(FastqSink::new(&out, OutputCompression::Plain));
        let summary = converter.run(&input, sink).unwrap();

        assert_eq!(summary.header.contigs, ["chr1"]);
        assert_eq!(summary.stats.records_read, 6);
        assert_eq!(summary.stats.pairs_written, 2);
        assert_eq!(summary.stats.secondary_skipped, 1);
        assert_eq!(summary.stats.orphans, 1);
        assert!(summary.exit_status.success());

        let read = |name: &str| fs::read_to_string(out.join(name)).unwrap();
        assert_eq!(read("lane1.1.fq"), "@A\nAACG\n+\nABCD\n");
        // 147 is reverse strand
        assert_eq!(read("lane1.2.fq"), "@A\nTTGG\n+\nZYXW\n");
        assert_eq!(read("lane2.1.fq"), "@B\nGGGG\n+\nIIII\n");
        assert_eq!(read("lane2.2.fq"), "@B\nTGGT\n+\n4321\n");
        assert_eq!(read("sample.bam.rg.txt"), "ID:lane1 SM:s\nID:lane2 SM:s\n");

        let args = fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert_eq!(args.trim(), format!("view {}", input.display()));
    }

    #[test]
    fn region_and_secondary_filter_reach_the_tool() {
        let (dir, out) = workspace();
        let tool = fake_samtools(dir.path(), HEADER, "");
        let converter = Converter::new(ConvertOptions {
            tool,
            region: Some("chr1:1-100".into()),
            exclude_secondary: true,
            ..ConvertOptions::default()
        });
        let input = dir.path().join("in.bam");
        let sink: OutputSink = OutputSink::Fastq(FastqSink::new(&out, OutputCompression::Plain));
        let summary = converter.run(&input, sink).unwrap();
        assert_eq!(summary.stats.records_read, 0);

        let args = fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert_eq!(
            args.trim(),
            format!("view -F 256 {} chr1:1-100", input.display())
        );
    }

    #[test]
    fn single_read_group_needs_no_tags() {
        let (dir, out) = workspace();
        let records = "r\t77\t*\t0\t0\t*\t*\t0\t0\tAC\tII\nr\t141\t*\t0\t0\t*\t*\t0\t0\tGT\tJJ\n";
        let tool = fake_samtools(dir.path(), "@RG\tID:solo\n", records);
        let converter = Converter::new(ConvertOptions {
            tool,
            ..ConvertOptions::default()
        });
        let sink: OutputSink = OutputSink::Fastq(FastqSink::new(&out, OutputCompression::Plain));
        converter.run(&dir.path().join("x.sam"), sink).unwrap();
        assert_eq!(fs::read_to_string(out.join("solo.2.fq")).unwrap(), "@r\nGT\n+\nJJ\n");
    }

    #[test]
    fn sam_mode_writes_demapped_pairs() {
        let dir = tempdir().unwrap();
        let tool = fake_samtools(dir.path(), HEADER, RECORDS);
        let converter = Converter::new(ConvertOptions {
            tool,
            exclude_secondary: true,
            ..ConvertOptions::default()
        });
        let mut buf = Vec::new();
        let sink = OutputSink::Sam(SamSink::new(&mut buf, RetryPolicy::default()));
        let summary = converter.run(&dir.path().join("in.bam"), sink).unwrap();
        assert_eq!(summary.sink.pairs_written, 2);

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "B\t77\t*\t0\t0\t*\t*\t0\t0\tGGGG\tIIII\tRG:Z:lane2");
        assert_eq!(lines[1], "B\t141\t*\t0\t0\t*\t*\t0\t0\tTGGT\t4321\tRG:Z:lane2");
        assert!(lines[2].starts_with("A\t77\t"));
        assert!(lines[3].starts_with("A\t141\t"));
    }

    #[test]
    fn malformed_record_aborts() {
        let (dir, out) = workspace();
        let records = "A\t99\tchr1\t10\nA\t147\t*\t0\t0\t*\t*\t0\t0\tAC\tII\tRG:Z:lane1\n";
        let tool = fake_samtools(dir.path(), HEADER, records);
        let converter = Converter::new(ConvertOptions {
            tool,
            ..ConvertOptions::default()
        });
        let sink: OutputSink = OutputSink::Fastq(FastqSink::new(&out, OutputCompression::Plain));
        match converter.run(&dir.path().join("in.bam"), sink) {
            Err(ConvertError::MalformedRecord { ctx, .. }) => assert_eq!(ctx.line_num, 1),
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn missing_read_group_aborts() {
        let (dir, out) = workspace();
        let records = "A\t99\tchr1\t10\t60\t2M\t=\t50\t44\tAC\tII\n";
        let tool = fake_samtools(dir.path(), HEADER, records);
        let converter = Converter::new(ConvertOptions {
            tool,
            ..ConvertOptions::default()
        });
        let sink: OutputSink = OutputSink::Fastq(FastqSink::new(&out, OutputCompression::Plain));
        match converter.run(&dir.path().join("in.bam"), sink) {
            Err(ConvertError::MissingReadGroup { name, .. }) => assert_eq!(name, "A"),
            other => panic!("expected MissingReadGroup, got {other:?}"),
        }
    }

    #[test]
    fn missing_tool_is_reported() {
        let tool = DumpTool::new("/definitely/not/samtools");
        match read_header(&tool, Path::new("x.bam")) {
            Err(ConvertError::HeaderUnavailable { program, .. }) => {
                assert_eq!(program, "/definitely/not/samtools")
            }
            other => panic!("expected HeaderUnavailable, got {other:?}"),
        }
        match RecordStream::open(&tool, Path::new("x.bam"), None, false) {
            Err(ConvertError::SourceUnavailable { .. }) => {}
            Err(other) => panic!("expected SourceUnavailable, got {other:?}"),
            Ok(_) => panic!("expected SourceUnavailable"),
        }
    }

    #[test]
    fn failing_header_without_output_is_fatal() {
        let tool = DumpTool::new("sh").arg("-c").arg("exit 3");
        assert!(matches!(
            read_header(&tool, Path::new("x.bam")),
            Err(ConvertError::HeaderUnavailable { .. })
        ));
    }

    #[test]
    fn failing_header_after_output_keeps_it() {
        let tool = DumpTool::new("sh")
            .arg("-c")
            .arg("printf '@RG\\tID:x\\n'; exit 2");
        let header = read_header(&tool, Path::new("x.bam")).unwrap();
        assert_eq!(header.read_groups.single_id(), Some("x"));
    }

    #[test]
    fn nonzero_exit_after_records_keeps_them() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("recs.sam"), RECORDS).unwrap();
        let script = format!("cat '{}/recs.sam'; exit 1", dir.path().display());
        let tool = DumpTool::new("sh").arg("-c").arg(script);
        let mut stream = RecordStream::open(&tool, Path::new("x.bam"), None, false).unwrap();
        let lines: Vec<String> = stream.by_ref().map(Result::unwrap).collect();
        assert_eq!(lines.len(), 6);
        assert!(!lines[0].ends_with('\n'));
        assert!(!stream.finish().unwrap().success());
    }

    #[test]
    fn cancellation_stops_before_the_next_record() {
        let dir = tempdir().unwrap();
        let mut sink: OutputSink =
            OutputSink::Fastq(FastqSink::new(dir.path(), OutputCompression::Plain));
        let cancel = AtomicBool::new(false);
        let lines = RECORDS.lines().enumerate().map(|(i, l)| {
            if i == 2 {
                cancel.store(true, Ordering::Relaxed);
            }
            Ok(l.to_string())
        });
        let err = convert_lines(
            lines,
            &ReadGroupCatalog::default(),
            ReconcileOptions::default(),
            &mut sink,
            &cancel,
        )
        .unwrap_err();
        assert!(matches!(err, ConvertError::Cancelled));
        assert!(sink.finish().unwrap().files.is_empty());
    }
}
