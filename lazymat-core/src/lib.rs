//! lazymat core - selectors, labeled axes, pair enumeration and file layout
//!
//! This crate holds the pieces of lazymat that never touch a file or an
//! array buffer:
//!
//! - **Selectors**: caller-facing [`Selector`]s, their resolution against an
//!   axis length and the composition of resolved selections
//! - **Axes**: [`LabeledAxis`] with lazily built label lookup
//! - **Pairs**: the [`Pairs`] enumerator with O(1) random access
//! - **Format**: header and label table layout of memory-mapped files
//! - **Errors**: the shared [`ErrorKind`] taxonomy

pub mod axis;
pub mod element;
pub mod error;
pub mod format;
pub mod pairs;
pub mod selector;
pub mod validation;

pub use axis::{Iid, Label, LabeledAxis};
pub use element::Element;
pub use error::{CoreError, ErrorKind, Result};
pub use format::{DataType, MatHeader, StorageOrder};
pub use pairs::{PairIter, Pairs};
pub use selector::{Resolved, Selector};
