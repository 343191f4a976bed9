use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use super::error::{CheckpointError, IoContext};

/// Complete lines of a checkpoint file, plus the byte length they cover.
///
/// Bytes after the last newline belong to a torn write and are ignored. With `repair`
/// they are also truncated away so the next append starts on a fresh line.
pub(crate) fn read_lines(path: &Path, repair: bool) -> Result<(Vec<String>, u64), CheckpointError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok((Vec::new(), 0)),
        Err(e) => return Err(CheckpointError::Io { path: path.to_path_buf(), source: e }),
    };

    let complete = bytes.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
    if complete < bytes.len() {
        warn!(path = %path.display(), dropped_bytes = bytes.len() - complete, "Ignoring torn trailing checkpoint line");
        if repair {
            OpenOptions::new().write(true).open(path).at(path)?.set_len(complete as u64).at(path)?;
        }
    }

    let lines = String::from_utf8_lossy(&bytes[..complete])
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    Ok((lines, complete as u64))
}

/// Append one newline-terminated line, then flush and sync.
pub(crate) fn append_line(path: &Path, line: &str) -> Result<(), CheckpointError> {
    let mut file = OpenOptions::new().create(true).append(true).open(path).at(path)?;
    file.write_all(line.as_bytes()).at(path)?;
    file.flush().at(path)?;
    file.sync_data().at(path)
}

/// Replace `path` with `contents` via a synced sibling file and a rename.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), CheckpointError> {
    let tmp = tmp_path(path);
    let mut file = File::create(&tmp).at(&tmp)?;
    file.write_all(contents).at(&tmp)?;
    file.sync_all().at(&tmp)?;
    fs::rename(&tmp, path).at(path)
}

pub(crate) fn remove_if_exists(path: &Path) -> Result<(), CheckpointError> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(CheckpointError::Io { path: path.to_path_buf(), source: e }),
        _ => Ok(()),
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
