//! lazymat - lazy, composable views over labeled matrix datasets
//!
//! A dataset is a 2-D (optionally 3-D) value matrix with labeled rows and
//! columns and a numeric property matrix per axis. Every dataset implements
//! [`Reader`]; selecting rows and columns yields a [`Subset`] that records
//! the selection and defers all work until values are actually read.
//!
//! ## Architecture
//!
//! - **lazymat-core**: selectors and their composition, labeled axes, pair
//!   enumeration and the on-disk layout (no I/O)
//! - **lazymat**: the reader contract, in-memory and memory-mapped datasets,
//!   views, standardizers, the pair-product dataset and file storage
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lazymat::{Data, ReadOptions, ReaderExt, Selector};
//! use std::sync::Arc;
//!
//! fn example() -> lazymat::Result<()> {
//!     let val = ndarray::Array2::<f64>::zeros((4, 3)).into_dyn();
//!     let data = Arc::new(Data::try_from(val)?);
//!
//!     // Every other row, columns 2 and 0; nothing is read yet
//!     let view = data.subset(Selector::slice(None, None, 2), vec![2usize, 0])?;
//!     let nested = view.subset(vec![1usize], ..)?;
//!
//!     // One physical read against `data`, converted to f32
//!     let values: Data<f32> = nested.read(&ReadOptions::default())?;
//!     assert_eq!(values.val().shape(), &[1, 2]);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **mmap** (default): the memory-mapped [`MemMap`] backend and [`Writer`]
//! - **serde** (default): serialization of selectors, options and headers

pub mod config;
pub mod data;
pub mod error;
pub mod file_cache;
pub(crate) mod gather;
#[cfg(feature = "mmap")]
pub mod memmap_backend;
pub mod pair_reader;
pub mod reader;
pub mod standardize;
pub mod subset;

pub use config::{resolve_num_threads, Order, ReadOptions, WriteConfig, THREAD_ENV_VARS};
pub use data::{Data, DataBuilder, IntoShared, DEFAULT_ATOL, DEFAULT_RTOL};
pub use error::{Error, ErrorKind, Result};
pub use file_cache::{FileCache, LocalCache, ReadGuard, Walk, WriteGuard};
pub use pair_reader::{PairReader, DEFAULT_LABEL_LIMIT};
pub use reader::{Reader, ReaderExt};
pub use standardize::{Beta, Identity, Standardizer, Unit};
pub use subset::Subset;

#[cfg(feature = "mmap")]
pub use memmap_backend::{MapStatus, MemMap, Writer};

pub use lazymat_core::{
    CoreError, DataType, Element, Iid, LabeledAxis, MatHeader, Pairs, Resolved, Selector,
    StorageOrder,
};
