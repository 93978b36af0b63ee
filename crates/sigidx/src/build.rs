//! Directory-wide index builds.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use sigidx_error::{Result, SigIdxError};
use sigidx_index::{build_signal_index, save_index};
use sigidx_store::OpenStore;
use tracing::{debug, error, info, warn};

use crate::config::{ReaderConfig, index_path_for};

/// Every data file under `dir`, recursively, in sorted path order.
pub fn collect_data_files(dir: &Path, config: &ReaderConfig) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(SigIdxError::config(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(next) = pending.pop() {
        for entry in fs::read_dir(&next)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if config.is_data_file(&path) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Build and save the index of one data file. Returns the entry count.
pub fn build_file_index<S: OpenStore>(data_path: &Path, index_path: &Path) -> Result<usize> {
    let store = S::open(data_path)?;
    let index = build_signal_index(&store)?;
    save_index(&index, index_path)?;
    Ok(index.len())
}

/// Build an index for every data file under `dir` that lacks one, or for all
/// of them when `force` is set.
///
/// Per-file failures are logged and skipped. Returns the data files that
/// were targeted.
pub fn build_dir_indexes<S: OpenStore>(
    dir: &Path,
    config: &ReaderConfig,
    force: bool,
) -> Result<Vec<PathBuf>> {
    config.validate()?;
    let data_files = collect_data_files(dir, config)?;
    if data_files.is_empty() {
        warn!(
            dir = %dir.display(),
            extension = %config.data_extension,
            "no data files found"
        );
        return Ok(data_files);
    }
    let targets: Vec<PathBuf> = data_files
        .into_iter()
        .filter(|path| force || !index_path_for(path, &config.index_suffix).exists())
        .collect();
    if targets.is_empty() {
        info!(dir = %dir.display(), "every data file already has an index");
        return Ok(targets);
    }

    let workers = config
        .build_workers
        .unwrap_or_else(|| default_build_workers(dir))
        .clamp(1, targets.len());
    info!(
        dir = %dir.display(),
        files = targets.len(),
        workers,
        force,
        "building signal indexes"
    );

    let chunk_len = targets.len().div_ceil(workers);
    let suffix = config.index_suffix.as_str();
    let failures: usize = thread::scope(|scope| {
        let handles: Vec<_> = targets
            .chunks(chunk_len)
            .map(|chunk| scope.spawn(move || build_chunk::<S>(chunk, suffix)))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    error!("index build worker panicked");
                    chunk_len
                })
            })
            .sum()
    });

    if failures > 0 {
        warn!(failures, files = targets.len(), "some signal indexes were not built");
    } else {
        info!(files = targets.len(), "signal indexes built");
    }
    Ok(targets)
}

/// Returns the number of files that failed.
fn build_chunk<S: OpenStore>(chunk: &[PathBuf], suffix: &str) -> usize {
    let mut failures = 0;
    for data_path in chunk {
        let index_path = index_path_for(data_path, suffix);
        match build_file_index::<S>(data_path, &index_path) {
            Ok(entries) => {
                debug!(path = %data_path.display(), entries, "index written");
            }
            Err(err) => {
                failures += 1;
                error!(path = %data_path.display(), error = %err, "index build failed");
            }
        }
    }
    failures
}

/// One worker on spinning or unknown media, every core on solid-state disks.
#[must_use]
pub fn default_build_workers(path: &Path) -> usize {
    match is_rotational(path) {
        Some(false) => thread::available_parallelism().map_or(1, usize::from),
        Some(true) | None => 1,
    }
}

/// Whether the block device holding `path` is a rotational disk.
///
/// `None` when the device cannot be identified.
#[cfg(target_os = "linux")]
#[must_use]
pub fn is_rotational(path: &Path) -> Option<bool> {
    use std::os::unix::fs::MetadataExt;

    let (major, minor) = split_device_number(fs::metadata(path).ok()?.dev());
    let device = fs::canonicalize(format!("/sys/dev/block/{major}:{minor}")).ok()?;

    // Partitions have no queue directory; their parent device does.
    let flag = fs::read_to_string(device.join("queue/rotational"))
        .ok()
        .or_else(|| fs::read_to_string(device.parent()?.join("queue/rotational")).ok())?;
    match flag.trim() {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}

/// `(major, minor)` of a Linux `dev_t`, laid out the way glibc encodes it.
#[cfg(target_os = "linux")]
const fn split_device_number(dev: u64) -> (u64, u64) {
    let major = ((dev >> 32) & 0xffff_f000) | ((dev >> 8) & 0xfff);
    let minor = ((dev >> 12) & 0xffff_ff00) | (dev & 0xff);
    (major, minor)
}

#[cfg(not(target_os = "linux"))]
#[must_use]
pub fn is_rotational(_path: &Path) -> Option<bool> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_walks_subdirectories_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("b");
        fs::create_dir(&nested).expect("mkdir");
        for path in [
            dir.path().join("c.pod5"),
            dir.path().join("a.pod5"),
            dir.path().join("a.pod5.idx"),
            dir.path().join("notes.txt"),
            nested.join("z.pod5"),
        ] {
            fs::write(&path, b"{}").expect("write");
        }

        let found = collect_data_files(dir.path(), &ReaderConfig::default()).expect("scan");
        assert_eq!(
            found,
            vec![
                dir.path().join("a.pod5"),
                nested.join("z.pod5"),
                dir.path().join("c.pod5"),
            ]
        );
    }

    #[test]
    fn collect_rejects_non_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("x.pod5");
        fs::write(&file, b"{}").expect("write");
        let err = collect_data_files(&file, &ReaderConfig::default()).expect_err("file");
        assert!(matches!(err, SigIdxError::Config { .. }));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn device_number_split_matches_glibc_layout() {
        fn makedev(major: u64, minor: u64) -> u64 {
            ((major & 0xfff) << 8)
                | ((major & 0xffff_f000) << 32)
                | (minor & 0xff)
                | ((minor & 0xffff_ff00) << 12)
        }
        assert_eq!(split_device_number(makedev(8, 1)), (8, 1));
        assert_eq!(split_device_number(makedev(259, 0x1_2345)), (259, 0x1_2345));
        assert_eq!(
            split_device_number(makedev(0xffff_ffff, 0x0000_0100)),
            (0xffff_ffff, 0x0000_0100)
        );
        assert_eq!(
            split_device_number(makedev(0x0000_1000, 0xffff_ffff)),
            (0x0000_1000, 0xffff_ffff)
        );
    }

    #[test]
    fn empty_dir_builds_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("notes.txt"), b"x").expect("write");
        let built = build_dir_indexes::<sigidx_store::MemoryStore>(
            dir.path(),
            &ReaderConfig::default(),
            true,
        )
        .expect("empty dir is not an error");
        assert!(built.is_empty());
    }

    #[test]
    fn default_workers_is_at_least_one() {
        assert!(default_build_workers(Path::new("/")) >= 1);
        assert_eq!(default_build_workers(Path::new("/definitely/not/here")), 1);
    }
}
