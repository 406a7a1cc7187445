use std::path::{Path, PathBuf};

/// Read-group ids go into file names; keep them inside the output directory.
pub fn file_safe_id(read_group: &str) -> String {
    read_group.replace(['/', '\\'], "_")
}

/// `<out_dir>/<read_group>.<mate>.fq[.gz]`
pub fn fastq_path(out_dir: &Path, read_group: &str, mate: u8, gzip: bool) -> PathBuf {
    let ext = if gzip { "fq.gz" } else { "fq" };
    out_dir.join(format!("{}.{mate}.{ext}", file_safe_id(read_group)))
}

/// `<out_dir>/<basename(input)>.rg.txt`
pub fn read_group_file_path(out_dir: &Path, input: &Path) -> PathBuf {
    let base = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    out_dir.join(format!("{base}.rg.txt"))
}
