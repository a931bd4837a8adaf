// Summary vector keys and their canonical strings

use crate::core::constants::*;
use crate::core::error::{EclError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

// Keywords that break the first-letter naming convention
const SPECIAL_MISC_VARS: &[&str] = &[
    "NEWTON", "NAIMFRAC", "NLINEARS", "NLINSMIN", "NLINSMAX", "ELAPSED", "MAXDPR", "MAXDSO", "MAXDSG",
    "MAXDSW", "STEPTYPE", "WNEWTON", "SEPARATE", "SUMTHIN",
];

const RATE_VARS: &[&str] = &[
    "OPR", "GPR", "WPR", "LPR", "OIR", "GIR", "WIR", "LIR", "GOR", "WCT", "OFR", "GFR", "WFR",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarCategory {
    Aquifer,
    Block,
    Completion,
    Field,
    Group,
    LocalBlock,
    LocalCompletion,
    LocalWell,
    Network,
    Region,
    RegionToRegion,
    Segment,
    Well,
    Misc,
}

impl VarCategory {
    /// Classifies a keyword by the ECLIPSE naming convention.
    pub fn from_keyword(keyword: &str) -> Self {
        if SPECIAL_MISC_VARS.contains(&keyword) {
            return VarCategory::Misc;
        }

        let bytes = keyword.as_bytes();
        match bytes.first() {
            Some(b'A') => VarCategory::Aquifer,
            Some(b'B') => VarCategory::Block,
            Some(b'C') => VarCategory::Completion,
            Some(b'F') => VarCategory::Field,
            Some(b'G') => VarCategory::Group,
            Some(b'L') => match bytes.get(1) {
                Some(b'B') => VarCategory::LocalBlock,
                Some(b'C') => VarCategory::LocalCompletion,
                Some(b'W') => VarCategory::LocalWell,
                _ => VarCategory::Misc,
            },
            Some(b'N') => VarCategory::Network,
            Some(b'R') => Self::classify_region(keyword),
            Some(b'S') => VarCategory::Segment,
            Some(b'W') => VarCategory::Well,
            _ => VarCategory::Misc,
        }
    }

    fn classify_region(keyword: &str) -> Self {
        let b = keyword.as_bytes();
        if b.len() == 3 && b[2] == b'F' {
            return VarCategory::RegionToRegion;
        }
        if keyword == "RNLF" {
            return VarCategory::RegionToRegion;
        }
        if keyword == "RORFR" {
            return VarCategory::Region;
        }
        if b.len() >= 4 && b[2] == b'F' && (b[3] == b'T' || b[3] == b'R') {
            return VarCategory::RegionToRegion;
        }
        if b.len() >= 5 && b[3] == b'F' && (b[4] == b'T' || b[4] == b'R') {
            return VarCategory::RegionToRegion;
        }
        VarCategory::Region
    }

    pub fn requires_name(self) -> bool {
        matches!(
            self,
            VarCategory::Completion
                | VarCategory::Group
                | VarCategory::Well
                | VarCategory::Segment
                | VarCategory::LocalWell
                | VarCategory::LocalCompletion
        )
    }

    pub fn requires_number(self) -> bool {
        matches!(
            self,
            VarCategory::Aquifer
                | VarCategory::Block
                | VarCategory::Completion
                | VarCategory::Region
                | VarCategory::RegionToRegion
                | VarCategory::Segment
        )
    }

    pub fn is_local(self) -> bool {
        matches!(
            self,
            VarCategory::LocalBlock | VarCategory::LocalCompletion | VarCategory::LocalWell
        )
    }
}

/// Returns true for keywords that hold rates (`WOPR`, `GWCT`, ...).
pub fn is_rate_keyword(keyword: &str) -> bool {
    keyword
        .get(1..)
        .is_some_and(|tail| RATE_VARS.iter().any(|v| tail.starts_with(v)))
}

/// Main grid dimensions, used to unpack global cell numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridDims {
    pub nx: i32,
    pub ny: i32,
    pub nz: i32,
}

impl GridDims {
    pub fn new(nx: i32, ny: i32, nz: i32) -> Self {
        Self { nx, ny, nz }
    }

    /// 1-based (i, j, k) of a 1-based global cell number.
    pub fn ijk_from_global(self, num: i32) -> Option<(i32, i32, i32)> {
        if self.nx <= 0 || self.ny <= 0 || num <= 0 {
            return None;
        }
        let mut g = num - 1;
        let i = 1 + g % self.nx;
        g /= self.nx;
        let j = 1 + g % self.ny;
        let k = 1 + g / self.ny;
        Some((i, j, k))
    }

    pub fn global_from_ijk(self, i: i32, j: i32, k: i32) -> i32 {
        (i - 1) + (j - 1) * self.nx + (k - 1) * self.nx * self.ny + 1
    }
}

/// Cell inside a local grid refinement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LgrCell {
    pub lgr: String,
    pub i: i32,
    pub j: i32,
    pub k: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SummaryVectorKey {
    pub category: VarCategory,
    pub keyword: String,
    pub qualifying_name: Option<String>,
    pub qualifying_number: Option<i32>,
    pub lgr: Option<LgrCell>,
}

fn valid_name(name: Option<&str>) -> Option<String> {
    let name = name?.trim();
    if name.is_empty() || name == DUMMY_WGNAME {
        None
    } else {
        Some(name.to_string())
    }
}

impl SummaryVectorKey {
    /// Builds a key, enforcing the qualifiers its category requires.
    /// Qualifiers a category does not use are dropped.
    pub fn new(
        category: VarCategory,
        keyword: &str,
        name: Option<&str>,
        number: Option<i32>,
        lgr: Option<LgrCell>,
    ) -> Result<Self> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(EclError::InvalidKey("empty keyword".to_string()));
        }

        let name = valid_name(name);
        let number = number.filter(|n| *n > 0);

        if category.requires_name() && name.is_none() {
            return Err(EclError::InvalidKey(format!("{} requires a well/group name", keyword)));
        }
        if category.requires_number() && number.is_none() {
            return Err(EclError::InvalidKey(format!("{} requires a positive number", keyword)));
        }
        if category.is_local() && lgr.is_none() {
            return Err(EclError::InvalidKey(format!("{} requires an LGR cell", keyword)));
        }

        let keeps_name = category.requires_name() || category == VarCategory::Network;
        Ok(Self {
            category,
            keyword: keyword.to_string(),
            qualifying_name: if keeps_name { name } else { None },
            qualifying_number: if category.requires_number() { number } else { None },
            lgr: if category.is_local() { lgr } else { None },
        })
    }

    /// Builds a key with the category inferred from the keyword.
    pub fn from_keyword(keyword: &str, name: Option<&str>, number: Option<i32>) -> Result<Self> {
        Self::new(VarCategory::from_keyword(keyword.trim()), keyword, name, number, None)
    }

    pub fn field(keyword: &str) -> Result<Self> {
        Self::new(VarCategory::Field, keyword, None, None, None)
    }

    pub fn misc(keyword: &str) -> Result<Self> {
        Self::new(VarCategory::Misc, keyword, None, None, None)
    }

    pub fn well(keyword: &str, well: &str) -> Result<Self> {
        Self::new(VarCategory::Well, keyword, Some(well), None, None)
    }

    pub fn group(keyword: &str, group: &str) -> Result<Self> {
        Self::new(VarCategory::Group, keyword, Some(group), None, None)
    }

    pub fn region(keyword: &str, region: i32) -> Result<Self> {
        Self::new(VarCategory::Region, keyword, None, Some(region), None)
    }

    pub fn region_pair(keyword: &str, r1: i32, r2: i32) -> Result<Self> {
        let num = r1 + REGION_PAIR_SHIFT * (r2 + REGION_PAIR_OFFSET);
        Self::new(VarCategory::RegionToRegion, keyword, None, Some(num), None)
    }

    pub fn aquifer(keyword: &str, aquifer: i32) -> Result<Self> {
        Self::new(VarCategory::Aquifer, keyword, None, Some(aquifer), None)
    }

    /// Block key from a 1-based global cell number.
    pub fn block(keyword: &str, cell: i32) -> Result<Self> {
        Self::new(VarCategory::Block, keyword, None, Some(cell), None)
    }

    pub fn block_ijk(keyword: &str, dims: GridDims, i: i32, j: i32, k: i32) -> Result<Self> {
        Self::block(keyword, dims.global_from_ijk(i, j, k))
    }

    pub fn completion(keyword: &str, well: &str, cell: i32) -> Result<Self> {
        Self::new(VarCategory::Completion, keyword, Some(well), Some(cell), None)
    }

    pub fn segment(keyword: &str, well: &str, segment: i32) -> Result<Self> {
        Self::new(VarCategory::Segment, keyword, Some(well), Some(segment), None)
    }

    pub fn local_block(keyword: &str, lgr: LgrCell) -> Result<Self> {
        Self::new(VarCategory::LocalBlock, keyword, None, None, Some(lgr))
    }

    pub fn local_well(keyword: &str, lgr: &str, well: &str) -> Result<Self> {
        let cell = LgrCell {
            lgr: lgr.to_string(),
            i: 0,
            j: 0,
            k: 0,
        };
        Self::new(VarCategory::LocalWell, keyword, Some(well), None, Some(cell))
    }

    pub fn local_completion(keyword: &str, well: &str, lgr: LgrCell) -> Result<Self> {
        Self::new(VarCategory::LocalCompletion, keyword, Some(well), None, Some(lgr))
    }

    pub fn is_rate(&self) -> bool {
        is_rate_keyword(&self.keyword)
    }

    fn ijk(&self, dims: GridDims) -> String {
        let num = self.qualifying_number.unwrap_or(0);
        match dims.ijk_from_global(num) {
            Some((i, j, k)) => format!("{},{},{}", i, j, k),
            None => num.to_string(),
        }
    }

    /// Canonical `KEYWORD:qualifiers` string. Cell numbers are unpacked to
    /// 1-based `I,J,K` with `dims`.
    pub fn canonical(&self, dims: GridDims) -> String {
        let kw = &self.keyword;
        let name = self.qualifying_name.as_deref().unwrap_or("");
        let num = self.qualifying_number.unwrap_or(0);

        match self.category {
            VarCategory::Field | VarCategory::Misc => kw.clone(),
            VarCategory::Network => match &self.qualifying_name {
                Some(n) => format!("{}:{}", kw, n),
                None => kw.clone(),
            },
            VarCategory::Well | VarCategory::Group => format!("{}:{}", kw, name),
            VarCategory::Aquifer | VarCategory::Region => format!("{}:{}", kw, num),
            VarCategory::RegionToRegion => {
                let r1 = num % REGION_PAIR_SHIFT;
                let r2 = num / REGION_PAIR_SHIFT - REGION_PAIR_OFFSET;
                format!("{}:{}-{}", kw, r1, r2)
            }
            VarCategory::Block => format!("{}:{}", kw, self.ijk(dims)),
            VarCategory::Completion => format!("{}:{}:{}", kw, name, self.ijk(dims)),
            VarCategory::Segment => format!("{}:{}:{}", kw, name, num),
            VarCategory::LocalBlock => match &self.lgr {
                Some(c) => format!("{}:{}:{},{},{}", kw, c.lgr, c.i, c.j, c.k),
                None => kw.clone(),
            },
            VarCategory::LocalWell => match &self.lgr {
                Some(c) => format!("{}:{}:{}", kw, c.lgr, name),
                None => kw.clone(),
            },
            VarCategory::LocalCompletion => match &self.lgr {
                Some(c) => format!("{}:{}:{}:{},{},{}", kw, c.lgr, name, c.i, c.j, c.k),
                None => kw.clone(),
            },
        }
    }
}

impl fmt::Display for SummaryVectorKey {
    /// Canonical form without grid dimensions; cell numbers stay packed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical(GridDims::default()))
    }
}

/// Anchored regex for a shell-style pattern using `*` and `?`.
pub fn wildcard_regex(pattern: &str) -> Result<Regex> {
    let body = regex::escape(pattern).replace(r"\*", ".*").replace(r"\?", ".");
    Ok(Regex::new(&format!("^(?:{})$", body))?)
}
