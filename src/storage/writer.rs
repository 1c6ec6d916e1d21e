//! Descriptor writer
//!
//! Applies an [`UpdatePlan`] to its descriptor by editing raw bytes. Each
//! replacement lands exactly at the line and column the reader recorded;
//! every other byte (comments, indentation, line endings, encoding) is
//! copied through untouched.
//!
//! Writes are atomic: the full new content goes to a locked temp file
//! which then replaces the descriptor.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, info};

use super::descriptor::DescriptorError;
use crate::domain::{EditKind, UpdatePlan, VersionEdit};

/// Splits a raw line into content and its terminator (`\n`, `\r\n` or nothing)
fn split_terminator(line: &[u8]) -> (&[u8], &[u8]) {
    if let Some(body) = line.strip_suffix(b"\r\n") {
        (body, b"\r\n")
    } else if let Some(body) = line.strip_suffix(b"\n") {
        (body, b"\n")
    } else {
        (line, b"")
    }
}

/// Replaces the version token `current` starting at byte `column`
///
/// Returns `None` unless the whole token sits exactly there.
fn replace_at(line: &mut Vec<u8>, column: usize, current: &str, next: &str) -> Option<()> {
    let end = column + current.len();
    if line.get(column..end)? != current.as_bytes() {
        return None;
    }
    match line.get(end) {
        None | Some(b'<') => {}
        Some(b) if b.is_ascii_whitespace() => {}
        Some(_) => return None,
    }

    line.splice(column..end, next.bytes());
    Some(())
}

/// Builds the version line inserted after `anchor`
fn inserted_line(anchor: &[u8], version: &str, terminator: &[u8]) -> Vec<u8> {
    let mut line: Vec<u8> = anchor
        .iter()
        .copied()
        .take_while(|b| *b == b' ' || *b == b'\t')
        .collect();
    line.extend_from_slice(b"<version>");
    line.extend_from_slice(version.as_bytes());
    line.extend_from_slice(b"</version>");
    line.extend_from_slice(terminator);
    line
}

fn stale(path: &Path, edit: &VersionEdit) -> DescriptorError {
    DescriptorError::StaleLocation {
        path: path.to_path_buf(),
        line: edit.line,
        expected: match &edit.kind {
            EditKind::Replace { current } => current.clone(),
            EditKind::InsertAfter => String::new(),
        },
    }
}

/// Applies edits to raw descriptor bytes, returning the new bytes
///
/// Line numbers in `edits` refer to `content` as read; insertions do not
/// shift the lines of other edits.
pub fn render(path: &Path, content: &[u8], edits: &[VersionEdit]) -> Result<Vec<u8>, DescriptorError> {
    let lines: Vec<&[u8]> = content.split_inclusive(|b| *b == b'\n').collect();
    let default_terminator: &[u8] = if content.windows(2).any(|w| w == b"\r\n") {
        b"\r\n"
    } else {
        b"\n"
    };

    // Only ASCII is spelled the same in every encoding we read
    if std::str::from_utf8(content).is_err() {
        if let Some(edit) = edits.iter().find(|e| !e.new_version.is_ascii()) {
            return Err(DescriptorError::parse(
                path,
                format!("cannot write non-ASCII version '{}' into a non-UTF-8 descriptor", edit.new_version),
            ));
        }
    }

    let mut by_line: BTreeMap<usize, Vec<&VersionEdit>> = BTreeMap::new();
    for edit in edits {
        if edit.line == 0 || edit.line > lines.len() {
            return Err(stale(path, edit));
        }
        by_line.entry(edit.line).or_default().push(edit);
    }

    let mut output = Vec::with_capacity(content.len() + 64);
    for (pos, raw) in lines.iter().enumerate() {
        let line_no = pos + 1;
        let Some(line_edits) = by_line.get_mut(&line_no) else {
            output.extend_from_slice(raw);
            continue;
        };

        let (body, terminator) = split_terminator(raw);
        let mut body = body.to_vec();
        let mut insertions = Vec::new();

        // Right to left, so earlier columns stay valid
        line_edits.sort_by(|a, b| b.column.cmp(&a.column));
        for edit in line_edits.iter() {
            match &edit.kind {
                EditKind::Replace { current } => {
                    replace_at(&mut body, edit.column, current, &edit.new_version)
                        .ok_or_else(|| stale(path, edit))?;
                    debug!(
                        path = %path.display(),
                        line = line_no,
                        column = edit.column,
                        to = %edit.new_version,
                        "Replaced version"
                    );
                }
                EditKind::InsertAfter => {
                    insertions.push(edit.new_version.as_str());
                }
            }
        }

        output.extend_from_slice(&body);
        if insertions.is_empty() {
            output.extend_from_slice(terminator);
            continue;
        }

        // An anchor on the last line ends without a terminator; keep it that way
        let eol = if terminator.is_empty() { default_terminator } else { terminator };
        output.extend_from_slice(eol);
        let count = insertions.len();
        for (i, version) in insertions.into_iter().enumerate() {
            let line_end = if i + 1 == count { terminator } else { eol };
            output.extend_from_slice(&inserted_line(&body, version, line_end));
            debug!(path = %path.display(), after = line_no, to = version, "Inserted version");
        }
    }

    Ok(output)
}

/// Writes content atomically (locked temp file + rename)
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), DescriptorError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "descriptor".to_string());
    let temp_path: PathBuf = path.with_file_name(format!(".{}.nonsnapshot.tmp", file_name));

    let write = || -> std::io::Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;

        // Lock is released when file is dropped
        file.lock_exclusive()?;

        let mut writer = BufWriter::new(&file);
        writer.write_all(content)?;
        writer.flush()?;
        Ok(())
    };

    write()
        .and_then(|()| fs::rename(&temp_path, path))
        .map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            DescriptorError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        })
}

/// Applies a plan to its descriptor file
///
/// Returns `Ok(false)` without touching the file if the plan is empty.
pub fn apply_updates(plan: &UpdatePlan) -> Result<bool, DescriptorError> {
    if plan.is_empty() {
        return Ok(false);
    }

    let path = plan.path.as_path();
    let content = fs::read(path).map_err(|e| DescriptorError::io(path, e))?;

    let updated = render(path, &content, &plan.edits)?;
    if updated == content {
        return Ok(false);
    }

    write_atomic(path, &updated)?;
    info!(
        path = %path.display(),
        module = %plan.module,
        edits = plan.edits.len(),
        version = %plan.final_version,
        "Updated descriptor"
    );

    Ok(true)
}
