//! Binary layout definitions for lazymat files
//!
//! Pure data structure definitions for the on-disk format. No I/O lives here.

pub mod constants;
pub mod header;
pub mod labels;

pub use header::{DataType, MatHeader, StorageOrder};
pub use labels::{LabelArrayHeader, LabelArrayView, LabelTableBuilder, LabelTableHeader, LabelTableView};
