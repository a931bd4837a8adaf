//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use ecl_reader::core::constants::DUMMY_WGNAME;
use ecl_reader::{GridDims, SummaryHeader, SummaryVectorKey, SummaryWriter};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

pub fn start_date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Header with `TIME` followed by `RPR:<r>` for every region.
pub fn region_header(regions: &[i32]) -> SummaryHeader {
    let mut header = SummaryHeader::new(GridDims::new(10, 10, 3), start_date());
    header.add_node("TIME", DUMMY_WGNAME, 0, "DAYS");
    for &r in regions {
        header.add_vector(&SummaryVectorKey::region("RPR", r).unwrap(), "BARSA");
    }
    header
}

/// Writes a unified case. Each row is `(report_step, values)`.
pub fn write_case(dir: &Path, name: &str, header: SummaryHeader, rows: &[(i32, Vec<f32>)]) -> PathBuf {
    let root = dir.join(name);
    let mut writer = SummaryWriter::new(&root, header);
    for (step, values) in rows {
        writer.add_ministep(*step, values).unwrap();
    }
    writer.write_unified().unwrap();
    root
}

pub fn smspec(root: &Path) -> PathBuf {
    PathBuf::from(format!("{}.SMSPEC", root.display()))
}

pub fn unsmry(root: &Path) -> PathBuf {
    PathBuf::from(format!("{}.UNSMRY", root.display()))
}

/// Cuts `path` down to `len` bytes.
pub fn truncate(path: &Path, len: u64) {
    let file = OpenOptions::new().write(true).open(path).unwrap();
    file.set_len(len).unwrap();
}

pub fn file_len(path: &Path) -> u64 {
    fs::metadata(path).unwrap().len()
}
