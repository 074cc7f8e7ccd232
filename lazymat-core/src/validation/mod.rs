//! Layout and bounds validation
//!
//! Pure functions over sizes, offsets and text. No I/O.

pub mod bounds;
pub mod layout;
pub mod parsing;

pub use bounds::{checked_byte_len, validate_alignment, validate_array_bounds, validate_typed_slice};
pub use layout::{align_to_8, align_to_boundary};
pub use parsing::parse_isize;
