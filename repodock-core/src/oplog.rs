//! Operation logs
//!
//! Each worker kind appends progress lines to its own plain-text log file in
//! the log directory. Readers tail those files with a bounded backwards read,
//! and only ever by bare file name: names that could escape the log
//! directory are rejected here, in one place.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};

use crate::error::ValidationError;
use crate::{Error, Result};

/// Upper bound on lines returned by a single tail
pub const MAX_TAIL_LINES: usize = 500;

/// Upper bound on bytes read from the end of a log by a single tail
pub const MAX_TAIL_BYTES: u64 = 1024 * 1024;

/// Lines longer than this are cut short in tail output
pub const MAX_LINE_BYTES: usize = 4 * 1024;

const TRUNCATED_MARKER: &str = " [truncated]";

const TAIL_CHUNK: usize = 8 * 1024;

/// Resolve a log file name inside `log_dir`
///
/// Rejects names that contain `..` or path separators.
pub fn log_path(
    log_dir: &Path,
    log_name: &str,
) -> std::result::Result<PathBuf, ValidationError> {
    if log_name.trim().is_empty() {
        return Err(ValidationError::InvalidInput(
            "'file_name' is required.".to_string(),
        ));
    }

    if log_name.contains("..")
        || log_name.contains('/')
        || log_name.contains('\\')
        || log_name.contains('\0')
    {
        return Err(ValidationError::PathTraversal(log_name.to_string()));
    }

    Ok(log_dir.join(log_name))
}

/// Append-only log written by a worker
#[derive(Debug, Clone)]
pub struct OperationLog {
    path: PathBuf,
}

impl OperationLog {
    /// Open the log `log_name` inside `log_dir`
    pub fn new(log_dir: &Path, log_name: &str) -> Result<Self> {
        Ok(Self {
            path: log_path(log_dir, log_name)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a timestamped line
    ///
    /// Each line goes out in one `write_all` on an append-mode handle, so
    /// lines from concurrent workers do not interleave.
    pub fn append(&self, message: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let line = format!(
            "{} {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            message.replace('\n', " ")
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;

        Ok(())
    }

    /// The last `line_count` lines of this log
    pub fn tail(&self, line_count: usize) -> Result<Vec<String>> {
        tail_file(&self.path, line_count)
    }
}

/// Read the last `line_count` lines of `path`, oldest first
///
/// `line_count` is capped at [`MAX_TAIL_LINES`], and at most
/// [`MAX_TAIL_BYTES`] are read from the end of the file. Lines longer than
/// [`MAX_LINE_BYTES`] are cut short. A missing file has no lines.
pub fn tail_file(path: &Path, line_count: usize) -> Result<Vec<String>> {
    let line_count = line_count.min(MAX_TAIL_LINES);
    if line_count == 0 {
        return Ok(Vec::new());
    }

    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::Io(e)),
    };

    let len = file.seek(SeekFrom::End(0))?;
    let floor = len.saturating_sub(MAX_TAIL_BYTES);
    let mut pos = len;
    let mut chunks: Vec<Vec<u8>> = Vec::new();
    let mut newlines = 0;
    // one newline more than lines wanted marks where the first kept line starts
    let mut wanted = line_count;

    while pos > floor && newlines < wanted {
        let step = (TAIL_CHUNK as u64).min(pos - floor);
        pos -= step;
        file.seek(SeekFrom::Start(pos))?;

        let mut chunk = vec![0u8; step as usize];
        file.read_exact(&mut chunk)?;

        if chunks.is_empty() && chunk.last() == Some(&b'\n') {
            wanted += 1;
        }
        newlines += chunk.iter().filter(|&&b| b == b'\n').count();
        chunks.push(chunk);
    }

    chunks.reverse();
    let buf = chunks.concat();
    let text = String::from_utf8_lossy(&buf);
    let mut lines: Vec<&str> = text.lines().collect();

    // The first line is partial unless we read from the start of the file
    if pos > 0 && !lines.is_empty() {
        lines.remove(0);
    }

    let skip = lines.len().saturating_sub(line_count);
    Ok(lines[skip..].iter().map(|line| truncate_line(line)).collect())
}

fn truncate_line(line: &str) -> String {
    if line.len() <= MAX_LINE_BYTES {
        return line.to_string();
    }

    let mut end = MAX_LINE_BYTES;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &line[..end], TRUNCATED_MARKER)
}
