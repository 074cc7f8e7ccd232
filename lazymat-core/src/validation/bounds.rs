//! Array bounds and alignment validation
//!
//! Overflow-checked size arithmetic used when laying out and mapping files.

use crate::CoreError;

/// Validate a byte length for an array of `T`, returning the element count
pub const fn validate_array_bounds<T>(byte_len: usize) -> Result<usize, CoreError> {
    let element_size = core::mem::size_of::<T>();

    if byte_len % element_size != 0 {
        return Err(CoreError::ArrayAlignment);
    }

    let count = byte_len / element_size;

    // Keep headroom for downstream offset arithmetic
    if count > usize::MAX / 8 {
        return Err(CoreError::ArraySizeOverflow);
    }

    Ok(count)
}

/// Validate that a pointer is aligned for `T`
pub fn validate_alignment<T>(ptr: *const u8) -> Result<(), CoreError> {
    if (ptr as usize) % core::mem::align_of::<T>() != 0 {
        return Err(CoreError::ArrayAlignment);
    }
    Ok(())
}

/// Combined length and alignment check for a byte slice viewed as `[T]`
pub fn validate_typed_slice<T>(data: &[u8]) -> Result<usize, CoreError> {
    validate_alignment::<T>(data.as_ptr())?;
    validate_array_bounds::<T>(data.len())
}

/// Byte length of `count` elements of `element_size` bytes
pub const fn checked_byte_len(count: usize, element_size: usize) -> Result<usize, CoreError> {
    match count.checked_mul(element_size) {
        Some(len) => Ok(len),
        None => Err(CoreError::ArraySizeOverflow),
    }
}
