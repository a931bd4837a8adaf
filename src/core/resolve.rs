// Parameter table: summary keys <-> parameter indices

use crate::core::error::{EclError, Result};
use crate::core::key::{wildcard_regex, GridDims, SummaryVectorKey};
use crate::core::smspec::SummaryHeader;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata of one parameter in a series' index space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamInfo {
    pub key: Option<SummaryVectorKey>,
    /// Canonical key string, or the bare keyword for unkeyed slots.
    pub canonical: String,
    pub unit: String,
    pub default_value: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ParamTable {
    dims: GridDims,
    params: Vec<ParamInfo>,
    by_key: HashMap<String, usize>,
}

impl ParamTable {
    pub fn new(dims: GridDims) -> Self {
        Self {
            dims,
            params: Vec::new(),
            by_key: HashMap::new(),
        }
    }

    /// One parameter per header slot, in `PARAMS` order.
    pub fn from_header(header: &SummaryHeader) -> Self {
        let mut table = Self::new(header.dims);
        for node in &header.nodes {
            let canonical = match &node.key {
                Some(key) => key.canonical(header.dims),
                None => node.keyword.clone(),
            };
            table.push(ParamInfo {
                key: node.key.clone(),
                canonical,
                unit: node.unit.clone(),
                default_value: node.default_value,
            });
        }
        table
    }

    /// Appends a parameter. A repeated key keeps resolving to its first index.
    pub fn push(&mut self, info: ParamInfo) -> usize {
        let index = self.params.len();
        if info.key.is_some() {
            self.by_key.entry(info.canonical.clone()).or_insert(index);
        }
        self.params.push(info);
        index
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamInfo> {
        self.params.iter()
    }

    pub fn info(&self, index: usize) -> Result<&ParamInfo> {
        self.params
            .get(index)
            .ok_or_else(|| EclError::UnknownVector(format!("#{}", index)))
    }

    pub fn resolve(&self, key: &SummaryVectorKey) -> Result<usize> {
        self.resolve_name(&key.canonical(self.dims))
    }

    /// Index of the parameter whose canonical string is `name`.
    pub fn resolve_name(&self, name: &str) -> Result<usize> {
        self.by_key
            .get(name)
            .copied()
            .ok_or_else(|| EclError::UnknownVector(name.to_string()))
    }

    pub fn has_vector(&self, name: &str) -> bool {
        self.by_key.contains_key(name)
    }

    pub fn canonical_key_string(&self, index: usize) -> Result<&str> {
        Ok(self.info(index)?.canonical.as_str())
    }

    pub fn default_value(&self, index: usize) -> Result<f64> {
        Ok(self.info(index)?.default_value)
    }

    pub fn unit(&self, index: usize) -> Result<&str> {
        Ok(self.info(index)?.unit.as_str())
    }

    pub fn is_rate(&self, index: usize) -> bool {
        self.params
            .get(index)
            .and_then(|p| p.key.as_ref())
            .is_some_and(|k| k.is_rate())
    }

    /// Resolvable key strings, in index order.
    pub fn keys(&self) -> Vec<&str> {
        self.params
            .iter()
            .enumerate()
            .filter(|(i, p)| self.by_key.get(&p.canonical) == Some(i))
            .map(|(_, p)| p.canonical.as_str())
            .collect()
    }

    /// Keys matching a `*`/`?` pattern.
    pub fn keys_matching(&self, pattern: &str) -> Result<Vec<&str>> {
        let re = wildcard_regex(pattern)?;
        Ok(self.keys().into_iter().filter(|k| re.is_match(k)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::{DUMMY_WGNAME, PARAMS_GLOBAL_DEFAULT};
    use chrono::NaiveDate;

    fn header() -> SummaryHeader {
        let start = NaiveDate::from_ymd_opt(2001, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let dims = GridDims::new(20, 20, 10);
        let mut h = SummaryHeader::new(dims, start);
        h.add_node("TIME", DUMMY_WGNAME, 0, "DAYS");
        h.add_node("WOPR", "OP_1", 0, "SM3/DAY");
        h.add_node("WOPR", DUMMY_WGNAME, 0, "SM3/DAY");
        h.add_node("BPR", DUMMY_WGNAME, dims.global_from_ijk(10, 12, 3), "BARSA");
        h.add_node("WWCT", "OP_1", 0, "");
        h.add_node("WOPR", "OP_1", 0, "SM3/DAY");
        h
    }

    #[test]
    fn test_resolve() {
        let table = ParamTable::from_header(&header());
        assert_eq!(table.len(), 6);

        let key = SummaryVectorKey::block_ijk("BPR", table.dims(), 10, 12, 3).unwrap();
        assert_eq!(table.resolve(&key).unwrap(), 3);
        assert_eq!(table.canonical_key_string(3).unwrap(), "BPR:10,12,3");
        assert_eq!(table.resolve_name("WOPR:OP_1").unwrap(), 1);
        assert_eq!(table.default_value(1).unwrap(), PARAMS_GLOBAL_DEFAULT);
        assert_eq!(table.unit(3).unwrap(), "BARSA");

        assert!(matches!(
            table.resolve_name("WOPR:OP_2"),
            Err(EclError::UnknownVector(_))
        ));
        assert!(table.default_value(99).is_err());
    }

    #[test]
    fn test_keys_skip_unkeyed_and_duplicates() {
        let table = ParamTable::from_header(&header());
        assert_eq!(
            table.keys(),
            vec!["TIME", "WOPR:OP_1", "BPR:10,12,3", "WWCT:OP_1"]
        );
        assert_eq!(table.keys_matching("W*").unwrap(), vec!["WOPR:OP_1", "WWCT:OP_1"]);
        assert!(table.is_rate(1));
        assert!(table.is_rate(4));
        assert!(!table.is_rate(0));
    }
}
