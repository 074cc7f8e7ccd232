//! Read and write configuration

use lazymat_core::StorageOrder;

/// Environment variables consulted for the default thread count, in order
pub const THREAD_ENV_VARS: [&str; 3] = ["LAZYMAT_NUM_THREADS", "NUM_THREADS", "MKL_NUM_THREADS"];

/// Requested memory layout of a read result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Order {
    /// Row-major
    C,
    /// Column-major
    #[default]
    F,
    /// Whatever the backing store holds
    Any,
}

impl Order {
    /// Concrete layout, falling back to `native` for [`Order::Any`]
    pub fn resolve(self, native: StorageOrder) -> StorageOrder {
        match self {
            Order::C => StorageOrder::C,
            Order::F => StorageOrder::F,
            Order::Any => native,
        }
    }
}

impl From<StorageOrder> for Order {
    fn from(order: StorageOrder) -> Self {
        match order {
            StorageOrder::C => Order::C,
            StorageOrder::F => Order::F,
        }
    }
}

/// Options for a single read
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReadOptions {
    pub order: Order,
    /// Allow the result to share its buffer with the source
    pub allow_view: bool,
    /// Worker threads; `None` consults the environment
    pub num_threads: Option<usize>,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn with_allow_view(mut self, allow_view: bool) -> Self {
        self.allow_view = allow_view;
        self
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    pub fn threads(&self) -> usize {
        resolve_num_threads(self.num_threads)
    }
}

/// Options for writing a dataset to a file backend
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WriteConfig {
    /// Storage order of the written value region
    pub order: StorageOrder,
    /// Columns copied per block; `None` derives it from the row count
    pub block_size: Option<usize>,
    pub num_threads: Option<usize>,
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            order: StorageOrder::F,
            block_size: None,
            num_threads: None,
        }
    }
}

impl WriteConfig {
    pub fn with_order(mut self, order: StorageOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = Some(block_size.max(1));
        self
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Columns per block for a dataset with `row_count` rows
    pub fn block_size_for(&self, row_count: usize) -> usize {
        self.block_size
            .unwrap_or_else(|| (100_000 / row_count.max(1)).max(1))
    }

    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            order: self.order.into(),
            allow_view: true,
            num_threads: self.num_threads,
        }
    }
}

/// Thread count: explicit request, then environment, then available cores
pub fn resolve_num_threads(requested: Option<usize>) -> usize {
    if let Some(n) = requested.filter(|&n| n > 0) {
        return n;
    }
    THREAD_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find_map(|value| value.trim().parse::<usize>().ok().filter(|&n| n > 0))
        .unwrap_or_else(rayon::current_num_threads)
}
