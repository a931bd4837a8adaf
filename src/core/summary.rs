// Summary cases with the RESTART chain of base runs merged in front

use crate::core::config::ReaderOptions;
use crate::core::constants::*;
use crate::core::error::{EclError, Result};
use crate::core::filename::{self, FileKind};
use crate::core::key::SummaryVectorKey;
use crate::core::reader::EclFile;
use crate::core::resolve::ParamTable;
use crate::core::series::SummaryTimeSeries;
use crate::core::smspec::SummaryHeader;
use chrono::{Duration, NaiveDateTime};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

#[derive(Debug)]
pub struct SummaryCase {
    root: PathBuf,
    header: SummaryHeader,
    series: SummaryTimeSeries,
    chain: Vec<PathBuf>,
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Case root from an `.SMSPEC` path or a bare root.
fn case_root_of(path: &Path) -> Result<PathBuf> {
    let ext = path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_uppercase());
    match ext.as_deref() {
        Some("SMSPEC") => Ok(filename::case_root(path)),
        Some("FSMSPEC") => Err(EclError::UnsupportedFormat(format!(
            "{}: formatted summary files are not supported",
            path.display()
        ))),
        _ => Ok(path.to_path_buf()),
    }
}

/// Summary data files of `root`: the unified file, or the per-step files,
/// whichever was written last.
fn data_files(root: &Path) -> Result<(bool, Vec<(i32, PathBuf)>)> {
    let unified = filename::unified_path(root, FileKind::Summary, false);
    let steps = filename::list_step_files(root, FileKind::Summary, false)?;

    let unified_time = unified.exists().then(|| modified(&unified)).flatten();
    let steps_time = steps.iter().filter_map(|(_, p)| modified(p)).max();

    match (unified.exists(), steps.is_empty()) {
        (true, true) => Ok((true, vec![(0, unified)])),
        (false, false) => Ok((false, steps)),
        (true, false) => {
            let use_steps = steps_time > unified_time;
            warn!(
                "{}: both unified and per-step summary data present, using the {} set",
                root.display(),
                if use_steps { "per-step" } else { "unified" }
            );
            if use_steps {
                Ok((false, steps))
            } else {
                Ok((true, vec![(0, unified)]))
            }
        }
        (false, true) => {
            let formatted = filename::unified_path(root, FileKind::Summary, true);
            if formatted.exists() || !filename::list_step_files(root, FileKind::Summary, true)?.is_empty() {
                return Err(EclError::UnsupportedFormat(format!(
                    "{}: formatted summary data is not supported",
                    root.display()
                )));
            }
            Err(EclError::FileNotFound(unified))
        }
    }
}

/// Reads `MINISTEP`/`PARAMS` pairs from one data file into `series`.
/// `report` is the step number in effect before the file's first `SEQHDR`.
fn read_data_file(
    path: &Path,
    options: &ReaderOptions,
    time_index: usize,
    series: &mut SummaryTimeSeries,
    mut report: i32,
    unified: bool,
) -> Result<i32> {
    let mut file = EclFile::open_with(path, options)?;
    let entries = file.entries().to_vec();
    let mut seen_seqhdr = false;

    let mut id = 0;
    while id < entries.len() {
        let entry = &entries[id];
        match entry.name.as_str() {
            SEQHDR => {
                if unified {
                    report += 1;
                }
                seen_seqhdr = true;
                id += 1;
            }
            MINISTEP => {
                if unified && !seen_seqhdr {
                    report += 1;
                    seen_seqhdr = true;
                }
                let Some(params) = entries.get(id + 1) else {
                    warn!("{}: trailing MINISTEP without PARAMS dropped", path.display());
                    break;
                };
                if params.name != PARAMS {
                    return Err(EclError::malformed(
                        params.offset,
                        format!("expected PARAMS after MINISTEP, found {}", params.name),
                    ));
                }

                let values: Vec<f64> = file
                    .read_record(params)?
                    .as_float(PARAMS)?
                    .iter()
                    .map(|v| *v as f64)
                    .collect();
                let days = values.get(time_index).copied().ok_or(EclError::ParameterCount {
                    expected: series.segments().last().map_or(0, |s| s.width()),
                    actual: values.len(),
                })?;
                series.append_step(report, days * SECONDS_PER_DAY, values)?;
                id += 2;
            }
            other => {
                return Err(EclError::malformed(
                    entry.offset,
                    format!("unexpected {} record in summary data", other),
                ));
            }
        }
    }
    Ok(report)
}

impl SummaryCase {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &ReaderOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, options: &ReaderOptions) -> Result<Self> {
        let mut visited = HashSet::new();
        Self::open_chain(path.as_ref(), options, &mut visited)
    }

    fn open_chain(path: &Path, options: &ReaderOptions, visited: &mut HashSet<PathBuf>) -> Result<Self> {
        let root = case_root_of(path)?;
        if !visited.insert(root.clone()) {
            return Err(EclError::CircularRestart(root));
        }

        let smspec = filename::with_extension_appended(&root, "SMSPEC");
        let header = SummaryHeader::read_with(&smspec, options)?;
        let own = Self::load_data(&root, &header, options)?;

        let mut case = Self {
            root: root.clone(),
            header,
            series: own,
            chain: vec![root.clone()],
        };

        if options.include_restart {
            if let Some(base_root) = case.restart_root() {
                let base_smspec = filename::with_extension_appended(&base_root, "SMSPEC");
                if base_smspec.exists() {
                    let base = Self::open_chain(&base_root, options, visited)?;
                    case.attach_base(base);
                } else {
                    warn!(
                        "{}: restart case {} not found, reading this case alone",
                        root.display(),
                        base_root.display()
                    );
                }
            }
        }

        info!(
            "{}: {} samples, {} parameters, chain of {}",
            root.display(),
            case.series.len(),
            case.series.params().len(),
            case.chain.len()
        );
        Ok(case)
    }

    /// Base case root named by RESTART, resolved against this case's directory.
    fn restart_root(&self) -> Option<PathBuf> {
        let name = self.header.restart_root.as_deref()?;
        let name = Path::new(name);
        if name.is_absolute() {
            return Some(name.to_path_buf());
        }
        let dir = self.root.parent().unwrap_or_else(|| Path::new(""));
        Some(dir.join(name))
    }

    fn attach_base(&mut self, base: SummaryCase) {
        let mut merged = base.series;
        merged.retain_through_report_step(self.header.restart_step);
        let own = std::mem::replace(&mut self.series, merged);
        self.series.merge_case(own);

        let mut chain = base.chain;
        chain.append(&mut self.chain);
        self.chain = chain;
    }

    fn load_data(root: &Path, header: &SummaryHeader, options: &ReaderOptions) -> Result<SummaryTimeSeries> {
        let time_index = header.time_index().ok_or_else(|| EclError::UnknownVector("TIME".to_string()))?;
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut series = SummaryTimeSeries::new(name, ParamTable::from_header(header));

        let (unified, files) = data_files(root)?;
        let mut report = header.restart_step;
        for (step, path) in files {
            if !unified {
                report = step;
            }
            report = read_data_file(&path, options, time_index, &mut series, report, unified)?;
        }
        Ok(series)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn header(&self) -> &SummaryHeader {
        &self.header
    }

    pub fn series(&self) -> &SummaryTimeSeries {
        &self.series
    }

    pub fn params(&self) -> &ParamTable {
        self.series.params()
    }

    /// Case roots from the oldest base run to this case.
    pub fn restart_chain(&self) -> &[PathBuf] {
        &self.chain
    }

    pub fn resolve(&self, key: &SummaryVectorKey) -> Result<usize> {
        self.params().resolve(key)
    }

    pub fn has_vector(&self, name: &str) -> bool {
        self.params().has_vector(name)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.params().keys()
    }

    pub fn keys_matching(&self, pattern: &str) -> Result<Vec<&str>> {
        self.params().keys_matching(pattern)
    }

    /// Every sample of vector `name`.
    pub fn get(&self, name: &str) -> Result<Vec<f64>> {
        let index = self.params().resolve_name(name)?;
        self.series.values(index)
    }

    /// Vector `name` at the end of each report step.
    pub fn get_at_report_steps(&self, name: &str) -> Result<Vec<f64>> {
        let index = self.params().resolve_name(name)?;
        self.series.values_at_report_steps(index)
    }

    pub fn value_at_time(&self, name: &str, sim_seconds: f64) -> Result<f64> {
        let index = self.params().resolve_name(name)?;
        self.series.value_at_time(index, sim_seconds)
    }

    pub fn report_steps(&self) -> Vec<i32> {
        self.series.report_steps()
    }

    pub fn has_report_step(&self, step: i32) -> bool {
        self.series.has_report_step(step)
    }

    pub fn start_date(&self) -> NaiveDateTime {
        self.header.start_date
    }

    /// Calendar date of every sample.
    pub fn dates(&self) -> Result<Vec<NaiveDateTime>> {
        let start = self.start_date();
        self.series
            .samples()
            .iter()
            .map(|s| {
                let millis = (s.sim_seconds * 1000.0).round();
                if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
                    return Err(EclError::InvalidTime(s.sim_seconds));
                }
                Duration::try_milliseconds(millis as i64)
                    .and_then(|d| start.checked_add_signed(d))
                    .ok_or(EclError::InvalidTime(s.sim_seconds))
            })
            .collect()
    }

    /// Writes a REPORT / INDEX / DATE / DAYS table of the report steps.
    pub fn summarize<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "REPORT         INDEX              DATE                 DAYS")?;
        writeln!(out, "---------------------------------------------------------------")?;

        let dates = self.dates()?;
        for step in self.report_steps() {
            let Some((_, last)) = self.series.report_step_range(step) else {
                continue;
            };
            let sample = &self.series.samples()[last];
            writeln!(
                out,
                "{:04}          {:6}               {}           {:7.2}",
                step,
                last,
                dates[last].format("%d/%m/%Y"),
                sample.sim_seconds / SECONDS_PER_DAY
            )?;
        }
        writeln!(out, "---------------------------------------------------------------")?;
        Ok(())
    }

    /// Writes `DAYS,DATE,<keys>` followed by one row per sample.
    pub fn export_csv<W: Write>(&self, out: &mut W, keys: &[&str]) -> Result<()> {
        let indices = keys
            .iter()
            .map(|k| self.params().resolve_name(k))
            .collect::<Result<Vec<_>>>()?;

        write!(out, "DAYS,DATE")?;
        for key in keys {
            write!(out, ",{}", key)?;
        }
        writeln!(out)?;

        let dates = self.dates()?;
        for (row, sample) in self.series.samples().iter().enumerate() {
            write!(
                out,
                "{:.6},{}",
                sample.sim_seconds / SECONDS_PER_DAY,
                dates[row].format("%Y-%m-%d")
            )?;
            for &index in &indices {
                write!(out, ",{:.6}", self.series.value_at_index(index, row)?)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}
