//! Format constants and magic bytes for lazymat files

/// Default alignment boundary for every region in a file
pub const ALIGNMENT_BOUNDARY: usize = 8;

/// Maximum reasonable label stride (64KB)
pub const MAX_LABEL_STRIDE: u32 = 65536;

/// Label table constants
pub mod labels {
    /// Magic bytes for the label table
    pub const MAGIC: [u8; 4] = *b"META";

    /// Current label table version
    pub const VERSION: u8 = 1;

    /// Fixed size of the label table header
    pub const HEADER_SIZE: usize = 56;

    /// Fixed size of a label array header
    pub const LABEL_ARRAY_HEADER_SIZE: usize = 8;
}
