//! Deterministic payload buffer
//!
//! The same byte sequence serves as the data payload (writer, client) and as
//! the verification reference (reader). Byte `i` is always `i % 100`,
//! independent of chunk size, so any aligned slice of a written file can be
//! checked without knowing the chunk size it was produced with.

/// Modulo applied to the byte offset when filling the pattern buffer.
pub const DATA_MODULO: usize = 100;

/// Build a pattern buffer of `chunk_size` bytes.
pub fn pattern_buffer(chunk_size: usize) -> Vec<u8> {
    let mut buffer = vec![0u8; chunk_size];
    fill_pattern(&mut buffer);
    buffer
}

/// Fill `buffer` in place with the repeating 0..DATA_MODULO sequence.
pub fn fill_pattern(buffer: &mut [u8]) {
    for (i, byte) in buffer.iter_mut().enumerate() {
        *byte = (i % DATA_MODULO) as u8;
    }
}

/// Compare a chunk (possibly short) against the reference buffer.
///
/// Returns false on any byte mismatch. A chunk shorter than the reference is
/// compared only over the bytes actually read.
pub fn verify_chunk(chunk: &[u8], reference: &[u8]) -> bool {
    chunk == &reference[..chunk.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_modulo() {
        for chunk_size in [1, 99, 100, 101, 8000, 1_000_000] {
            let buffer = pattern_buffer(chunk_size);
            for (i, &byte) in buffer.iter().enumerate() {
                assert_eq!(byte as usize, i % DATA_MODULO, "offset {}", i);
            }
        }
    }

    #[test]
    fn test_verify_full_chunk() {
        let reference = pattern_buffer(8000);
        let chunk = pattern_buffer(8000);
        assert!(verify_chunk(&chunk, &reference));
    }

    #[test]
    fn test_verify_short_chunk() {
        let reference = pattern_buffer(8000);
        assert!(verify_chunk(&reference[..50], &reference));
    }

    #[test]
    fn test_verify_detects_mismatch() {
        let reference = pattern_buffer(8000);
        let mut chunk = pattern_buffer(8000);
        chunk[137] ^= 0xff;
        assert!(!verify_chunk(&chunk, &reference));
    }
}
