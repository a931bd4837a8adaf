// Writers for container files and summary cases

use crate::core::codec;
use crate::core::constants::*;
use crate::core::error::{EclError, Result};
use crate::core::filename::{self, FileKind};
use crate::core::format::ArrayData;
use crate::core::smspec::SummaryHeader;
use chrono::{Datelike, Timelike};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub struct EclWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    records: usize,
}

impl EclWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = BufWriter::new(File::create(&path)?);
        Ok(Self {
            path,
            writer,
            records: 0,
        })
    }

    pub fn write_array(&mut self, name: &str, data: &ArrayData) -> Result<()> {
        codec::write_record(&mut self.writer, name, data)?;
        self.records += 1;
        Ok(())
    }

    pub fn write_int(&mut self, name: &str, values: &[i32]) -> Result<()> {
        self.write_array(name, &ArrayData::Inte(values.to_vec()))
    }

    pub fn write_float(&mut self, name: &str, values: &[f32]) -> Result<()> {
        self.write_array(name, &ArrayData::Real(values.to_vec()))
    }

    pub fn write_double(&mut self, name: &str, values: &[f64]) -> Result<()> {
        self.write_array(name, &ArrayData::Doub(values.to_vec()))
    }

    pub fn write_bool(&mut self, name: &str, values: &[bool]) -> Result<()> {
        self.write_array(name, &ArrayData::Logi(values.to_vec()))
    }

    pub fn write_char<S: AsRef<str>>(&mut self, name: &str, values: &[S]) -> Result<()> {
        let values = values.iter().map(|s| s.as_ref().to_string()).collect();
        self.write_array(name, &ArrayData::Char(values))
    }

    pub fn write_message(&mut self, name: &str) -> Result<()> {
        self.write_array(name, &ArrayData::Mess)
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        info!("wrote {} records to {}", self.records, self.path.display());
        Ok(())
    }
}

/// Splits `root` into the 8-character chunks of a RESTART array.
fn restart_chunks(root: &str) -> Vec<String> {
    let chars: Vec<char> = root.chars().collect();
    let mut chunks: Vec<String> = chars.chunks(CHAR_WIDTH).map(|c| c.iter().collect()).collect();
    while chunks.len() < 9 {
        chunks.push(String::new());
    }
    chunks
}

#[derive(Debug, Clone)]
struct Ministep {
    report_step: i32,
    values: Vec<f32>,
}

/// Collects ministeps for a header and writes them as a summary case.
pub struct SummaryWriter {
    root: PathBuf,
    header: SummaryHeader,
    ministeps: Vec<Ministep>,
}

impl SummaryWriter {
    /// `root` is the case path without extension.
    pub fn new<P: AsRef<Path>>(root: P, header: SummaryHeader) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            header,
            ministeps: Vec::new(),
        }
    }

    pub fn header(&self) -> &SummaryHeader {
        &self.header
    }

    pub fn add_ministep(&mut self, report_step: i32, values: &[f32]) -> Result<()> {
        if values.len() != self.header.len() {
            return Err(EclError::ParameterCount {
                expected: self.header.len(),
                actual: values.len(),
            });
        }
        self.ministeps.push(Ministep {
            report_step,
            values: values.to_vec(),
        });
        Ok(())
    }

    pub fn smspec_path(&self) -> PathBuf {
        filename::with_extension_appended(&self.root, "SMSPEC")
    }

    pub fn write_header(&self) -> Result<PathBuf> {
        let path = self.smspec_path();
        let h = &self.header;
        let mut w = EclWriter::create(&path)?;

        w.write_int(
            DIMENS,
            &[h.len() as i32, h.dims.nx, h.dims.ny, h.dims.nz, 0, h.restart_step],
        )?;
        if let Some(root) = &h.restart_root {
            w.write_char(RESTART, &restart_chunks(root))?;
        }

        let keywords: Vec<&str> = h.nodes.iter().map(|n| n.keyword.as_str()).collect();
        let wgnames: Vec<&str> = h.nodes.iter().map(|n| n.wgname.as_str()).collect();
        let nums: Vec<i32> = h.nodes.iter().map(|n| n.num).collect();
        let units: Vec<&str> = h.nodes.iter().map(|n| n.unit.as_str()).collect();
        w.write_char(KEYWORDS, &keywords)?;
        w.write_char(WGNAMES, &wgnames)?;
        w.write_int(NUMS, &nums)?;

        if h.has_lgr_nodes() {
            let lgr = |f: fn(&crate::core::key::LgrCell) -> i32| -> Vec<i32> {
                h.nodes.iter().map(|n| n.lgr.as_ref().map_or(0, f)).collect()
            };
            let names: Vec<&str> = h
                .nodes
                .iter()
                .map(|n| n.lgr.as_ref().map_or("", |c| c.lgr.as_str()))
                .collect();
            w.write_char(LGRS, &names)?;
            w.write_int(NUMLX, &lgr(|c| c.i))?;
            w.write_int(NUMLY, &lgr(|c| c.j))?;
            w.write_int(NUMLZ, &lgr(|c| c.k))?;
        }

        w.write_char(UNITS, &units)?;

        let d = h.start_date;
        w.write_int(
            STARTDAT,
            &[
                d.day() as i32,
                d.month() as i32,
                d.year(),
                d.hour() as i32,
                d.minute() as i32,
                d.second() as i32 * 1_000_000,
            ],
        )?;
        w.finish()?;
        Ok(path)
    }

    fn write_ministeps<'a>(w: &mut EclWriter, steps: impl Iterator<Item = (usize, &'a Ministep)>) -> Result<()> {
        let mut current: Option<i32> = None;
        for (index, step) in steps {
            if current != Some(step.report_step) {
                w.write_int(SEQHDR, &[0])?;
                current = Some(step.report_step);
            }
            w.write_int(MINISTEP, &[index as i32])?;
            w.write_float(PARAMS, &step.values)?;
        }
        Ok(())
    }

    /// Writes SMSPEC + UNSMRY.
    pub fn write_unified(&self) -> Result<PathBuf> {
        self.write_header()?;
        let path = filename::unified_path(&self.root, FileKind::Summary, false);
        let mut w = EclWriter::create(&path)?;
        Self::write_ministeps(&mut w, self.ministeps.iter().enumerate())?;
        w.finish()?;
        Ok(path)
    }

    /// Writes SMSPEC + one `.Snnnn` file per report step.
    pub fn write_multiple(&self) -> Result<Vec<PathBuf>> {
        self.write_header()?;
        let mut steps: Vec<i32> = self.ministeps.iter().map(|m| m.report_step).collect();
        steps.dedup();

        let mut paths = Vec::with_capacity(steps.len());
        for step in steps {
            let path = filename::step_file_path(&self.root, FileKind::Summary, false, step);
            let mut w = EclWriter::create(&path)?;
            let ministeps = self
                .ministeps
                .iter()
                .enumerate()
                .filter(|(_, m)| m.report_step == step);
            Self::write_ministeps(&mut w, ministeps)?;
            w.finish()?;
            paths.push(path);
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reader::EclFile;
    use tempfile::TempDir;

    #[test]
    fn test_restart_chunks() {
        let chunks = restart_chunks("../BASE/CASE_1");
        assert_eq!(chunks.len(), 9);
        assert_eq!(chunks[0], "../BASE/");
        assert_eq!(chunks[1], "CASE_1");
        assert_eq!(chunks.concat(), "../BASE/CASE_1");
    }

    #[test]
    fn test_write_all_types() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ALL.INIT");
        let mut w = EclWriter::create(&path).unwrap();
        w.write_int("I", &[1, -2]).unwrap();
        w.write_float("F", &[1.5]).unwrap();
        w.write_double("D", &[2.25]).unwrap();
        w.write_bool("L", &[true, false]).unwrap();
        w.write_char("C", &["AB"]).unwrap();
        w.write_message("ENDSOL").unwrap();
        w.finish().unwrap();

        let mut f = EclFile::open(&path).unwrap();
        assert_eq!(f.len(), 6);
        assert_eq!(f.get_int("I").unwrap(), vec![1, -2]);
        assert_eq!(f.get_float("F").unwrap(), vec![1.5]);
        assert_eq!(f.get_double("D").unwrap(), vec![2.25]);
        assert_eq!(f.get_bool("L").unwrap(), vec![true, false]);
        assert_eq!(f.get_char("C").unwrap(), vec!["AB"]);
        assert_eq!(f.get("ENDSOL").unwrap(), &ArrayData::Mess);
    }

    #[test]
    fn test_ministep_width_checked() {
        use crate::core::key::GridDims;
        let start = chrono::NaiveDate::from_ymd_opt(2000, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut header = SummaryHeader::new(GridDims::new(1, 1, 1), start);
        header.add_node("TIME", DUMMY_WGNAME, 0, "DAYS");

        let mut w = SummaryWriter::new("unused", header);
        assert!(w.add_ministep(1, &[1.0]).is_ok());
        assert!(matches!(
            w.add_ministep(1, &[1.0, 2.0]),
            Err(EclError::ParameterCount { expected: 1, actual: 2 })
        ));
    }
}
