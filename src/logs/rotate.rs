use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use filetime::FileTime;
use flate2::write::GzEncoder;
use flate2::Compression;

pub fn generation_path(log_path: &Path, generation: usize) -> PathBuf {
    let mut name = log_path.as_os_str().to_os_string();
    name.push(format!(".{}.gz", generation));
    PathBuf::from(name)
}

/// Shifts `<log>.N.gz` up by one and compresses `<log>` into `<log>.1.gz`,
/// keeping `keep - 1` compressed generations. The compressed file takes the
/// access and modification times of the plaintext log, which is removed.
pub fn rotate_logs(log_path: &Path, keep: usize) -> io::Result<()> {
    let oldest = keep.saturating_sub(1);
    if oldest == 0 {
        return Ok(());
    }
    let mut stale = oldest;
    while generation_path(log_path, stale).exists() {
        fs::remove_file(generation_path(log_path, stale))?;
        stale += 1;
    }
    for generation in (1..oldest).rev() {
        let from = generation_path(log_path, generation);
        match fs::rename(&from, generation_path(log_path, generation + 1)) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
    }

    let meta = match fs::metadata(log_path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };
    let atime = FileTime::from_last_access_time(&meta);
    let mtime = FileTime::from_last_modification_time(&meta);

    let target = generation_path(log_path, 1);
    compress_file(log_path, &target)?;
    filetime::set_file_times(&target, atime, mtime)?;
    fs::remove_file(log_path)?;
    Ok(())
}

fn compress_file(source: &Path, target: &Path) -> io::Result<()> {
    let mut reader = BufReader::new(File::open(source)?);
    let mut encoder = GzEncoder::new(BufWriter::new(File::create(target)?), Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    let mut writer = encoder.finish()?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    fn write_gz(path: &Path, text: &str) {
        let mut encoder = GzEncoder::new(File::create(path).expect("create"), Compression::default());
        encoder.write_all(text.as_bytes()).expect("write");
        encoder.finish().expect("finish");
    }

    fn read_gz(path: &Path) -> String {
        let mut text = String::new();
        GzDecoder::new(File::open(path).expect("open"))
            .read_to_string(&mut text)
            .expect("read");
        text
    }

    #[test]
    fn generations_shift_up_and_current_log_becomes_first() {
        let dir = TempDir::new().expect("tempdir");
        let log = dir.path().join("home.log");
        write_gz(&generation_path(&log, 1), "run-1");
        write_gz(&generation_path(&log, 2), "run-2");
        fs::write(&log, "current run\n").expect("write");

        rotate_logs(&log, 5).expect("rotate");

        assert!(!log.exists());
        assert_eq!(read_gz(&generation_path(&log, 1)), "current run\n");
        assert_eq!(read_gz(&generation_path(&log, 2)), "run-1");
        assert_eq!(read_gz(&generation_path(&log, 3)), "run-2");
        assert!(!generation_path(&log, 4).exists());
    }

    #[test]
    fn generations_beyond_retention_are_discarded() {
        let dir = TempDir::new().expect("tempdir");
        let log = dir.path().join("home.log");
        for generation in 1..=3 {
            write_gz(&generation_path(&log, generation), &format!("run-{}", generation));
        }
        fs::write(&log, "current").expect("write");

        rotate_logs(&log, 3).expect("rotate");

        assert_eq!(read_gz(&generation_path(&log, 1)), "current");
        assert_eq!(read_gz(&generation_path(&log, 2)), "run-1");
        assert!(!generation_path(&log, 3).exists());
    }

    #[test]
    fn missing_plaintext_log_only_shifts() {
        let dir = TempDir::new().expect("tempdir");
        let log = dir.path().join("home.log");
        write_gz(&generation_path(&log, 1), "run-1");

        rotate_logs(&log, 5).expect("rotate");

        assert!(!generation_path(&log, 1).exists());
        assert_eq!(read_gz(&generation_path(&log, 2)), "run-1");
    }

    #[test]
    fn compressed_log_keeps_modification_time() {
        let dir = TempDir::new().expect("tempdir");
        let log = dir.path().join("home.log");
        fs::write(&log, "old run").expect("write");
        let stamp = FileTime::from_unix_time(1_500_000_000, 0);
        filetime::set_file_times(&log, stamp, stamp).expect("set times");

        rotate_logs(&log, 5).expect("rotate");

        let meta = fs::metadata(generation_path(&log, 1)).expect("metadata");
        assert_eq!(FileTime::from_last_modification_time(&meta), stamp);
    }
}
