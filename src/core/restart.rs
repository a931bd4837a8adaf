// Restart files, unified or one file per report step

use crate::core::config::ReaderOptions;
use crate::core::constants::*;
use crate::core::error::{EclError, Result};
use crate::core::filename::{self, FileKind};
use crate::core::format::{ArrayData, ReportStepRange};
use crate::core::reader::EclFile;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Records of one local grid inside a report step, `last` inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LgrSpan {
    pub name: String,
    pub step: i32,
    pub first: usize,
    pub last: usize,
}

/// A unified file is split into report steps at every `SEQNUM` record; a
/// non-unified file is one step numbered by its `.Xnnnn` suffix. Records
/// between `LGR` and `ENDLGR` belong to that local grid.
#[derive(Debug)]
pub struct RestartFile {
    file: EclFile,
    unified: bool,
    steps: Vec<ReportStepRange>,
    step_lookup: HashMap<i32, usize>,
    loaded: HashSet<i32>,
    lgr_spans: Vec<LgrSpan>,
    record_lgr: HashMap<usize, usize>,
}

fn step_names<'a>(file: &'a EclFile, range: &ReportStepRange) -> Vec<&'a str> {
    range
        .ids()
        .filter_map(|id| file.entry(id))
        .map(|e| e.name.as_str())
        .collect()
}

impl RestartFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &ReaderOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, options: &ReaderOptions) -> Result<Self> {
        let path = path.as_ref();
        if filename::parse_step_suffix(path).is_some_and(|s| s.formatted)
            || path.extension().is_some_and(|e| e.eq_ignore_ascii_case("FUNRST"))
        {
            return Err(EclError::UnsupportedFormat(format!(
                "{}: formatted restart files are not supported",
                path.display()
            )));
        }

        let mut file = EclFile::open_with(path, options)?;
        let unified = file.has_key(SEQNUM);
        let steps = if unified {
            Self::unified_ranges(&mut file)?
        } else {
            Self::single_range(&file, path)?
        };

        let step_lookup = steps.iter().enumerate().map(|(i, r)| (r.step, i)).collect();
        let mut restart = Self {
            file,
            unified,
            steps,
            step_lookup,
            loaded: HashSet::new(),
            lgr_spans: Vec::new(),
            record_lgr: HashMap::new(),
        };
        restart.index_lgrs()?;

        info!(
            "{}: {} report steps, {} local grid blocks",
            path.display(),
            restart.steps.len(),
            restart.lgr_spans.len()
        );

        if !options.lazy_load {
            for step in restart.report_steps() {
                restart.load_step(step)?;
            }
        }
        Ok(restart)
    }

    fn unified_ranges(file: &mut EclFile) -> Result<Vec<ReportStepRange>> {
        let markers: Vec<usize> = (0..file.count_occurrences(SEQNUM))
            .filter_map(|occ| file.find(SEQNUM, occ))
            .collect();

        let mut steps: Vec<ReportStepRange> = Vec::with_capacity(markers.len());
        for (n, &id) in markers.iter().enumerate() {
            let first = file.load_record(id)?.as_int(SEQNUM)?.first().copied();
            let step = match first {
                Some(s) => s,
                None => {
                    let offset = file.entry(id).map_or(0, |e| e.offset);
                    return Err(EclError::malformed(offset, "empty SEQNUM record"));
                }
            };
            if let Some(prev) = steps.last() {
                if step <= prev.step {
                    let offset = file.entry(id).map_or(0, |e| e.offset);
                    return Err(EclError::malformed(
                        offset,
                        format!("SEQNUM {} follows {}", step, prev.step),
                    ));
                }
            }

            let last = markers.get(n + 1).map_or(file.len() - 1, |next| next - 1);
            steps.push(ReportStepRange { step, first: id, last });
        }

        if Self::tail_is_incomplete(file, &steps) {
            if let Some(tail) = steps.pop() {
                warn!(
                    "{}: report step {} is incomplete, ignoring it",
                    file.path().display(),
                    tail.step
                );
            }
        }
        Ok(steps)
    }

    /// A trailing step whose record names are a strict prefix of the step
    /// before it was cut short while being written.
    fn tail_is_incomplete(file: &EclFile, steps: &[ReportStepRange]) -> bool {
        let [.., prev, tail] = steps else {
            return false;
        };
        let (prev, tail) = (step_names(file, prev), step_names(file, tail));
        tail.len() < prev.len() && prev.starts_with(&tail)
    }

    fn single_range(file: &EclFile, path: &Path) -> Result<Vec<ReportStepRange>> {
        let suffix = filename::parse_step_suffix(path)
            .filter(|s| s.kind == FileKind::Restart)
            .ok_or_else(|| EclError::not_container(path, "no SEQNUM record and no report step suffix"))?;

        Ok(vec![ReportStepRange {
            step: suffix.step,
            first: 0,
            last: file.len() - 1,
        }])
    }

    fn index_lgrs(&mut self) -> Result<()> {
        for range in self.steps.clone() {
            let mut open: Option<usize> = None;
            for id in range.ids() {
                let name = match self.file.entry(id) {
                    Some(e) => e.name.clone(),
                    None => continue,
                };

                if name == LGR {
                    let lgr_name = self
                        .file
                        .load_record(id)?
                        .as_char(LGR)?
                        .first()
                        .cloned()
                        .unwrap_or_default();
                    self.lgr_spans.push(LgrSpan {
                        name: lgr_name,
                        step: range.step,
                        first: id,
                        last: range.last,
                    });
                    open = Some(self.lgr_spans.len() - 1);
                }

                if let Some(span) = open {
                    self.record_lgr.insert(id, span);
                }

                if name == ENDLGR {
                    if let Some(span) = open.take() {
                        self.lgr_spans[span].last = id;
                    }
                }
            }
            if let Some(span) = open {
                debug!("LGR {} in step {} has no ENDLGR", self.lgr_spans[span].name, range.step);
            }
        }
        Ok(())
    }

    pub fn file(&self) -> &EclFile {
        &self.file
    }

    pub fn file_mut(&mut self) -> &mut EclFile {
        &mut self.file
    }

    pub fn is_unified(&self) -> bool {
        self.unified
    }

    pub fn report_steps(&self) -> Vec<i32> {
        self.steps.iter().map(|r| r.step).collect()
    }

    pub fn has_step(&self, step: i32) -> bool {
        self.step_lookup.contains_key(&step)
    }

    pub fn step_range(&self, step: i32) -> Result<ReportStepRange> {
        self.step_lookup
            .get(&step)
            .map(|&i| self.steps[i])
            .ok_or(EclError::UnknownReportStep(step))
    }

    pub fn list_arrays(&self, step: i32) -> Result<Vec<(String, ArrayType, usize)>> {
        let range = self.step_range(step)?;
        Ok(self.file.entries()[range.first..=range.last]
            .iter()
            .map(|e| (e.name.clone(), e.array_type, e.count))
            .collect())
    }

    /// Materializes every record of `step`.
    pub fn load_step(&mut self, step: i32) -> Result<()> {
        let range = self.step_range(step)?;
        if self.loaded.contains(&step) {
            return Ok(());
        }
        debug!("{}: loading report step {}", self.file.path().display(), step);
        self.file.load_ids(range.ids())?;
        self.loaded.insert(step);
        Ok(())
    }

    pub fn is_step_loaded(&self, step: i32) -> bool {
        self.loaded.contains(&step)
    }

    /// Drops cached payloads of `step`.
    pub fn unload_step(&mut self, step: i32) -> Result<()> {
        let range = self.step_range(step)?;
        for id in range.ids() {
            self.file.unload(id);
        }
        self.loaded.remove(&step);
        Ok(())
    }

    fn ids_named<'a>(&'a self, name: &'a str, range: ReportStepRange) -> impl Iterator<Item = usize> + 'a {
        let entries = self.file.entries();
        range.ids().filter(move |&id| entries[id].name == name)
    }

    pub fn count_occurrences(&self, name: &str, step: i32) -> Result<usize> {
        let range = self.step_range(step)?;
        Ok(self.ids_named(name, range).count())
    }

    pub fn has_array(&self, name: &str, step: i32) -> bool {
        self.step_range(step)
            .map(|range| self.ids_named(name, range).next().is_some())
            .unwrap_or(false)
    }

    /// Array `name` in `step`, loading its payload on first access.
    pub fn get_array(&mut self, name: &str, step: i32, occurrence: usize) -> Result<&ArrayData> {
        let range = self.step_range(step)?;
        let id = self
            .ids_named(name, range)
            .nth(occurrence)
            .ok_or_else(|| EclError::array_not_found(name, occurrence))?;
        self.file.load_record(id)
    }

    pub fn get_int(&mut self, name: &str, step: i32, occurrence: usize) -> Result<Vec<i32>> {
        Ok(self.get_array(name, step, occurrence)?.as_int(name)?.to_vec())
    }

    pub fn get_float(&mut self, name: &str, step: i32, occurrence: usize) -> Result<Vec<f32>> {
        Ok(self.get_array(name, step, occurrence)?.as_float(name)?.to_vec())
    }

    pub fn get_double(&mut self, name: &str, step: i32, occurrence: usize) -> Result<Vec<f64>> {
        Ok(self.get_array(name, step, occurrence)?.as_double(name)?.to_vec())
    }

    pub fn get_bool(&mut self, name: &str, step: i32, occurrence: usize) -> Result<Vec<bool>> {
        Ok(self.get_array(name, step, occurrence)?.as_bool(name)?.to_vec())
    }

    pub fn get_char(&mut self, name: &str, step: i32, occurrence: usize) -> Result<Vec<String>> {
        Ok(self.get_array(name, step, occurrence)?.as_char(name)?.to_vec())
    }

    /// Names of the local grids present in `step`, in file order.
    pub fn lgr_names(&self, step: i32) -> Result<Vec<String>> {
        self.step_range(step)?;
        Ok(self
            .lgr_spans
            .iter()
            .filter(|s| s.step == step)
            .map(|s| s.name.clone())
            .collect())
    }

    /// Local grid owning record `id`, if any.
    pub fn lgr_of_record(&self, id: usize) -> Option<&str> {
        self.record_lgr.get(&id).map(|&span| self.lgr_spans[span].name.as_str())
    }

    /// Array `name` inside local grid `lgr` of `step`.
    pub fn get_lgr_array(&mut self, name: &str, step: i32, lgr: &str) -> Result<&ArrayData> {
        self.step_range(step)?;
        let span = self
            .lgr_spans
            .iter()
            .position(|s| s.step == step && s.name == lgr)
            .ok_or_else(|| EclError::array_not_found(format!("{}@{}", name, lgr), 0))?;

        let id = self
            .record_lgr
            .iter()
            .filter(|(_, s)| **s == span)
            .map(|(&id, _)| id)
            .filter(|&id| self.file.entries()[id].name == name)
            .min()
            .ok_or_else(|| EclError::array_not_found(format!("{}@{}", name, lgr), 0))?;
        self.file.load_record(id)
    }
}
