// Data structures for ECLIPSE binary records

use crate::core::constants::{ArrayType, HEADER_RECORD_SIZE};
use crate::core::error::{EclError, Result};
use serde::{Deserialize, Serialize};

/// One tagged record found while scanning a file. `offset` points at the
/// leading length marker of the header record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub name: String,
    pub array_type: ArrayType,
    pub count: usize,
    pub offset: u64,
}

impl RecordEntry {
    /// Offset of the first payload marker.
    pub fn data_offset(&self) -> u64 {
        self.offset + HEADER_RECORD_SIZE as u64
    }

    /// Offset of the record following this one.
    pub fn end_offset(&self) -> u64 {
        self.data_offset() + crate::core::constants::size_on_disk(self.count, self.array_type)
    }
}

/// Contiguous run of records belonging to one report step. Indices are
/// record ids into the owning file's entry list, `last` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStepRange {
    pub step: i32,
    pub first: usize,
    pub last: usize,
}

impl ReportStepRange {
    pub fn contains(&self, record_id: usize) -> bool {
        record_id >= self.first && record_id <= self.last
    }

    pub fn ids(&self) -> std::ops::RangeInclusive<usize> {
        self.first..=self.last
    }
}

/// Decoded payload of one record.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Inte(Vec<i32>),
    Real(Vec<f32>),
    Doub(Vec<f64>),
    Logi(Vec<bool>),
    Char(Vec<String>),
    Mess,
}

impl ArrayData {
    pub fn array_type(&self) -> ArrayType {
        match self {
            ArrayData::Inte(_) => ArrayType::Inte,
            ArrayData::Real(_) => ArrayType::Real,
            ArrayData::Doub(_) => ArrayType::Doub,
            ArrayData::Logi(_) => ArrayType::Logi,
            ArrayData::Char(_) => ArrayType::Char,
            ArrayData::Mess => ArrayType::Mess,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ArrayData::Inte(v) => v.len(),
            ArrayData::Real(v) => v.len(),
            ArrayData::Doub(v) => v.len(),
            ArrayData::Logi(v) => v.len(),
            ArrayData::Char(v) => v.len(),
            ArrayData::Mess => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn mismatch(&self, name: &str, expected: ArrayType) -> EclError {
        EclError::ArrayTypeMismatch {
            name: name.to_string(),
            expected,
            actual: self.array_type(),
        }
    }

    pub fn as_int(&self, name: &str) -> Result<&[i32]> {
        match self {
            ArrayData::Inte(v) => Ok(v),
            _ => Err(self.mismatch(name, ArrayType::Inte)),
        }
    }

    pub fn as_float(&self, name: &str) -> Result<&[f32]> {
        match self {
            ArrayData::Real(v) => Ok(v),
            _ => Err(self.mismatch(name, ArrayType::Real)),
        }
    }

    pub fn as_double(&self, name: &str) -> Result<&[f64]> {
        match self {
            ArrayData::Doub(v) => Ok(v),
            _ => Err(self.mismatch(name, ArrayType::Doub)),
        }
    }

    pub fn as_bool(&self, name: &str) -> Result<&[bool]> {
        match self {
            ArrayData::Logi(v) => Ok(v),
            _ => Err(self.mismatch(name, ArrayType::Logi)),
        }
    }

    pub fn as_char(&self, name: &str) -> Result<&[String]> {
        match self {
            ArrayData::Char(v) => Ok(v),
            _ => Err(self.mismatch(name, ArrayType::Char)),
        }
    }
}
