// SMSPEC header: the static table giving meaning to each PARAMS slot

use crate::core::config::ReaderOptions;
use crate::core::constants::*;
use crate::core::error::{EclError, Result};
use crate::core::key::{GridDims, LgrCell, SummaryVectorKey, VarCategory};
use crate::core::reader::EclFile;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One `PARAMS` slot as declared in the header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryNode {
    pub params_index: usize,
    pub keyword: String,
    pub wgname: String,
    pub num: i32,
    pub unit: String,
    pub lgr: Option<LgrCell>,
    pub default_value: f64,
    /// `None` when the qualifiers are dummies; the slot is then unreachable by key.
    pub key: Option<SummaryVectorKey>,
}

#[derive(Debug, Clone)]
pub struct SummaryHeader {
    pub path: Option<PathBuf>,
    pub dims: GridDims,
    pub restart_root: Option<String>,
    pub restart_step: i32,
    pub start_date: NaiveDateTime,
    pub nodes: Vec<SummaryNode>,
}

fn make_date(values: &[i32], offset: u64) -> Result<NaiveDateTime> {
    if values.len() < 3 {
        return Err(EclError::malformed(offset, format!("STARTDAT has {} elements", values.len())));
    }
    let (day, month, year) = (values[0], values[1], values[2]);
    let (hour, minute, micros) = if values.len() >= 6 {
        (values[3], values[4], values[5])
    } else {
        (0, 0, 0)
    };

    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .and_then(|d| d.and_hms_opt(hour as u32, minute as u32, (micros / 1_000_000) as u32))
        .ok_or_else(|| {
            EclError::malformed(offset, format!("invalid STARTDAT {}/{}/{}", day, month, year))
        })
}

fn make_key(keyword: &str, wgname: &str, num: i32, lgr: Option<LgrCell>) -> Option<SummaryVectorKey> {
    let category = VarCategory::from_keyword(keyword);
    SummaryVectorKey::new(category, keyword, Some(wgname), Some(num), lgr).ok()
}

impl SummaryHeader {
    pub fn new(dims: GridDims, start_date: NaiveDateTime) -> Self {
        Self {
            path: None,
            dims,
            restart_root: None,
            restart_step: 0,
            start_date,
            nodes: Vec::new(),
        }
    }

    pub fn with_restart(mut self, root: impl Into<String>, step: i32) -> Self {
        self.restart_root = Some(root.into());
        self.restart_step = step;
        self
    }

    /// Appends a raw header entry, returning its params index.
    pub fn add_node(&mut self, keyword: &str, wgname: &str, num: i32, unit: &str) -> usize {
        let params_index = self.nodes.len();
        self.nodes.push(SummaryNode {
            params_index,
            keyword: keyword.to_string(),
            wgname: wgname.to_string(),
            num,
            unit: unit.to_string(),
            lgr: None,
            default_value: PARAMS_GLOBAL_DEFAULT,
            key: make_key(keyword, wgname, num, None),
        });
        params_index
    }

    /// Appends an entry for `key`, returning its params index.
    pub fn add_vector(&mut self, key: &SummaryVectorKey, unit: &str) -> usize {
        let params_index = self.nodes.len();
        self.nodes.push(SummaryNode {
            params_index,
            keyword: key.keyword.clone(),
            wgname: key.qualifying_name.clone().unwrap_or_else(|| DUMMY_WGNAME.to_string()),
            num: key.qualifying_number.unwrap_or(0),
            unit: unit.to_string(),
            lgr: key.lgr.clone(),
            default_value: PARAMS_GLOBAL_DEFAULT,
            key: Some(key.clone()),
        });
        params_index
    }

    pub fn set_default(&mut self, params_index: usize, value: f64) {
        if let Some(node) = self.nodes.get_mut(params_index) {
            node.default_value = value;
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn has_lgr_nodes(&self) -> bool {
        self.nodes.iter().any(|n| n.lgr.is_some())
    }

    /// Params index holding simulated time in days.
    pub fn time_index(&self) -> Option<usize> {
        ["TIME", "DAYS"]
            .iter()
            .find_map(|kw| self.nodes.iter().position(|n| n.keyword == *kw))
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read_with(path, &ReaderOptions::default())
    }

    pub fn read_with<P: AsRef<Path>>(path: P, options: &ReaderOptions) -> Result<Self> {
        let path = path.as_ref();
        let mut file = EclFile::open_with(path, options)?;

        let offset_of = |file: &EclFile, name: &str| {
            file.find(name, 0)
                .and_then(|id| file.entry(id))
                .map_or(0, |e| e.offset)
        };

        let dimens = file.get_int(DIMENS)?;
        if dimens.len() < DIMENS_SIZE {
            return Err(EclError::malformed(
                offset_of(&file, DIMENS),
                format!("DIMENS has {} elements", dimens.len()),
            ));
        }
        let nlist = dimens[0].max(0) as usize;
        let dims = GridDims::new(dimens[1], dimens[2], dimens[3]);
        let restart_step = dimens[DIMENS_RESTART_STEP_INDEX];

        let keywords = file.get_char(KEYWORDS)?;
        let wgnames = if file.has_key(WGNAMES) {
            file.get_char(WGNAMES)?
        } else {
            file.get_char(NAMES)?
        };
        let nums = if file.has_key(NUMS) {
            file.get_int(NUMS)?
        } else {
            vec![0; keywords.len()]
        };
        let units = file.get_char(UNITS)?;

        for (name, len) in [
            (KEYWORDS, keywords.len()),
            (WGNAMES, wgnames.len()),
            (NUMS, nums.len()),
            (UNITS, units.len()),
        ] {
            if len != nlist {
                return Err(EclError::malformed(
                    offset_of(&file, name),
                    format!("{} has {} elements, DIMENS declares {}", name, len, nlist),
                ));
            }
        }

        let start_date = make_date(&file.get_int(STARTDAT)?, offset_of(&file, STARTDAT))?;

        let restart_root = if file.has_key(RESTART) {
            let joined: String = file.get_char(RESTART)?.concat();
            let joined = joined.trim().to_string();
            (!joined.is_empty()).then_some(joined)
        } else {
            None
        };

        let lgrs = if file.has_key(LGRS) { file.get_char(LGRS)? } else { Vec::new() };
        let numlx = if file.has_key(NUMLX) { file.get_int(NUMLX)? } else { Vec::new() };
        let numly = if file.has_key(NUMLY) { file.get_int(NUMLY)? } else { Vec::new() };
        let numlz = if file.has_key(NUMLZ) { file.get_int(NUMLZ)? } else { Vec::new() };

        let mut nodes = Vec::with_capacity(nlist);
        for i in 0..nlist {
            let keyword = keywords[i].trim().to_string();
            let lgr = match (lgrs.get(i), numlx.get(i), numly.get(i), numlz.get(i)) {
                (Some(name), Some(&li), Some(&lj), Some(&lk)) if !name.trim().is_empty() => Some(LgrCell {
                    lgr: name.trim().to_string(),
                    i: li,
                    j: lj,
                    k: lk,
                }),
                _ => None,
            };
            let key = make_key(&keyword, &wgnames[i], nums[i], lgr.clone());
            if key.is_none() {
                debug!("{}: slot {} ({}) has no resolvable key", path.display(), i, keyword);
            }

            nodes.push(SummaryNode {
                params_index: i,
                keyword,
                wgname: wgnames[i].trim().to_string(),
                num: nums[i],
                unit: units[i].trim().to_string(),
                lgr,
                default_value: PARAMS_GLOBAL_DEFAULT,
                key,
            });
        }

        info!(
            "{}: {} summary parameters, restart {:?} at step {}",
            path.display(),
            nodes.len(),
            restart_root,
            restart_step
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            dims,
            restart_root,
            restart_step,
            start_date,
            nodes,
        })
    }
}
