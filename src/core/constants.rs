// Format constants for ECLIPSE unformatted binary files

use serde::{Deserialize, Serialize};

// Every physical record is wrapped by a 4-byte big-endian byte count before and after
pub const MARKER_SIZE: usize = 4;

// Header record: name(8) count(i32) type(4)
pub const HEADER_BODY_SIZE: usize = 8 + 4 + 4; // 16 bytes
pub const HEADER_RECORD_SIZE: usize = HEADER_BODY_SIZE + 2 * MARKER_SIZE; // 24 bytes

pub const NAME_WIDTH: usize = 8;
pub const CHAR_WIDTH: usize = 8;

// Largest number of elements stored in one physical record
pub const BLOCK_SIZE_NUMERIC: usize = 1000;
pub const BLOCK_SIZE_CHAR: usize = 105;

// Marker records
pub const SEQNUM: &str = "SEQNUM";
pub const SEQHDR: &str = "SEQHDR";
pub const MINISTEP: &str = "MINISTEP";
pub const PARAMS: &str = "PARAMS";
pub const LGR: &str = "LGR";
pub const ENDLGR: &str = "ENDLGR";

// SMSPEC arrays
pub const DIMENS: &str = "DIMENS";
pub const KEYWORDS: &str = "KEYWORDS";
pub const WGNAMES: &str = "WGNAMES";
pub const NAMES: &str = "NAMES";
pub const NUMS: &str = "NUMS";
pub const UNITS: &str = "UNITS";
pub const STARTDAT: &str = "STARTDAT";
pub const RESTART: &str = "RESTART";
pub const LGRS: &str = "LGRS";
pub const NUMLX: &str = "NUMLX";
pub const NUMLY: &str = "NUMLY";
pub const NUMLZ: &str = "NUMLZ";

// DIMENS = [nlist, nx, ny, nz, unused, restart_step]
pub const DIMENS_SIZE: usize = 6;
pub const DIMENS_RESTART_STEP_INDEX: usize = 5;

pub const DUMMY_WGNAME: &str = ":+:+:+:+";
pub const PARAMS_GLOBAL_DEFAULT: f64 = -99.0;
pub const SECONDS_PER_DAY: f64 = 86_400.0;

// Region-to-region NUMS = R1 + 32768*(R2 + 10)
pub const REGION_PAIR_SHIFT: i32 = 1 << 15;
pub const REGION_PAIR_OFFSET: i32 = 10;

/// Element type tag of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArrayType {
    Inte,
    Real,
    Doub,
    Logi,
    Char,
    Mess,
}

impl ArrayType {
    pub fn from_tag(tag: &[u8; 4]) -> Option<Self> {
        match tag {
            b"INTE" => Some(ArrayType::Inte),
            b"REAL" => Some(ArrayType::Real),
            b"DOUB" => Some(ArrayType::Doub),
            b"LOGI" => Some(ArrayType::Logi),
            b"CHAR" => Some(ArrayType::Char),
            b"MESS" => Some(ArrayType::Mess),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static [u8; 4] {
        match self {
            ArrayType::Inte => b"INTE",
            ArrayType::Real => b"REAL",
            ArrayType::Doub => b"DOUB",
            ArrayType::Logi => b"LOGI",
            ArrayType::Char => b"CHAR",
            ArrayType::Mess => b"MESS",
        }
    }

    /// Bytes per element on disk.
    pub fn width(self) -> usize {
        match self {
            ArrayType::Inte | ArrayType::Real | ArrayType::Logi => 4,
            ArrayType::Doub => 8,
            ArrayType::Char => CHAR_WIDTH,
            ArrayType::Mess => 0,
        }
    }

    /// Elements per physical record.
    pub fn block_size(self) -> usize {
        match self {
            ArrayType::Char => BLOCK_SIZE_CHAR,
            _ => BLOCK_SIZE_NUMERIC,
        }
    }
}

impl std::fmt::Display for ArrayType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(std::str::from_utf8(self.tag()).unwrap_or("????"))
    }
}

/// Number of payload bytes, framing included, that `count` elements occupy on disk.
pub fn size_on_disk(count: usize, array_type: ArrayType) -> u64 {
    let width = array_type.width();
    if count == 0 || width == 0 {
        return 0;
    }
    let blocks = count.div_ceil(array_type.block_size());
    (count * width + blocks * 2 * MARKER_SIZE) as u64
}
