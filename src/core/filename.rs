// File naming conventions for case files

use crate::core::error::Result;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Restart,
    Summary,
}

impl FileKind {
    fn step_letter(self, formatted: bool) -> char {
        match (self, formatted) {
            (FileKind::Restart, false) => 'X',
            (FileKind::Restart, true) => 'F',
            (FileKind::Summary, false) => 'S',
            (FileKind::Summary, true) => 'A',
        }
    }

    fn unified_extension(self, formatted: bool) -> &'static str {
        match (self, formatted) {
            (FileKind::Restart, false) => "UNRST",
            (FileKind::Restart, true) => "FUNRST",
            (FileKind::Summary, false) => "UNSMRY",
            (FileKind::Summary, true) => "FUNSMRY",
        }
    }
}

/// Parsed `.Xnnnn` style suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSuffix {
    pub kind: FileKind,
    pub formatted: bool,
    pub step: i32,
}

pub fn parse_step_suffix(path: &Path) -> Option<StepSuffix> {
    let ext = path.extension()?.to_str()?;
    let mut chars = ext.chars();
    let letter = chars.next()?;
    let digits = chars.as_str();
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let (kind, formatted) = match letter.to_ascii_uppercase() {
        'X' => (FileKind::Restart, false),
        'F' => (FileKind::Restart, true),
        'S' => (FileKind::Summary, false),
        'A' => (FileKind::Summary, true),
        _ => return None,
    };

    Some(StepSuffix {
        kind,
        formatted,
        step: digits.parse().ok()?,
    })
}

/// `root` with `.ext` appended; dots already in the case name are kept.
pub fn with_extension_appended(root: &Path, ext: &str) -> PathBuf {
    let mut s: OsString = root.as_os_str().to_owned();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

pub fn step_file_path(root: &Path, kind: FileKind, formatted: bool, step: i32) -> PathBuf {
    with_extension_appended(root, &format!("{}{:04}", kind.step_letter(formatted), step))
}

pub fn unified_path(root: &Path, kind: FileKind, formatted: bool) -> PathBuf {
    with_extension_appended(root, kind.unified_extension(formatted))
}

pub fn is_unified(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_uppercase())
        .is_some_and(|e| matches!(e.as_str(), "UNRST" | "FUNRST" | "UNSMRY" | "FUNSMRY"))
}

/// Case root (path without extension).
pub fn case_root(path: &Path) -> PathBuf {
    path.with_extension("")
}

/// Per-step files of `root`, sorted by step.
pub fn list_step_files(root: &Path, kind: FileKind, formatted: bool) -> Result<Vec<(i32, PathBuf)>> {
    let dir = match root.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let Some(base) = root.file_name() else {
        return Ok(Vec::new());
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let path = entry?.path();
        if path.file_stem() != Some(base) {
            continue;
        }
        if let Some(suffix) = parse_step_suffix(&path) {
            if suffix.kind == kind && suffix.formatted == formatted {
                files.push((suffix.step, path));
            }
        }
    }

    files.sort_by_key(|(step, _)| *step);
    Ok(files)
}
