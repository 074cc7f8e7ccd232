//! Offset alignment helpers for file layout

/// Align an offset up to a power-of-two boundary
pub const fn align_to_boundary(offset: usize, boundary: usize) -> usize {
    (offset + boundary - 1) & !(boundary - 1)
}

/// Align an offset to the 8-byte region boundary
pub const fn align_to_8(offset: usize) -> usize {
    align_to_boundary(offset, 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align() {
        assert_eq!(align_to_8(0), 0);
        assert_eq!(align_to_8(1), 8);
        assert_eq!(align_to_8(96), 96);
        assert_eq!(align_to_boundary(97, 16), 112);
    }
}
