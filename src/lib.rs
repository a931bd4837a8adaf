// ECLIPSE binary output reader
// Main library entry point

pub mod core;

// Re-export main types
pub use crate::core::config::{FramingMode, ReaderOptions, StreamMode};
pub use crate::core::constants::ArrayType;
pub use crate::core::error::{EclError, Result};
pub use crate::core::format::{ArrayData, RecordEntry, ReportStepRange};
pub use crate::core::key::{GridDims, LgrCell, SummaryVectorKey, VarCategory};
pub use crate::core::reader::EclFile;
pub use crate::core::resolve::{ParamInfo, ParamTable};
pub use crate::core::restart::RestartFile;
pub use crate::core::series::{SummaryTimeSeries, TimeSample};
pub use crate::core::smspec::{SummaryHeader, SummaryNode};
pub use crate::core::summary::SummaryCase;
pub use crate::core::writer::{EclWriter, SummaryWriter};
