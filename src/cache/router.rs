//! Hash Router
//!
//! Maps keys to shard indices with 32-bit FNV-1a.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a hash of `bytes`.
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Returns the shard index for `key`.
///
/// `mask` must be `shard_count - 1` with `shard_count` a power of two.
pub fn shard_index(key: &str, mask: u32) -> usize {
    (fnv1a_32(key.as_bytes()) & mask) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_reference_vectors() {
        assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn test_shard_index_in_range_and_deterministic() {
        for mask in [0u32, 1, 3, 15, 255] {
            for i in 0..500 {
                let key = format!("order-{}", i);
                let idx = shard_index(&key, mask);
                assert!(idx <= mask as usize);
                assert_eq!(idx, shard_index(&key, mask));
            }
        }
    }

    #[test]
    fn test_shard_index_spreads_keys() {
        let mask = 7u32;
        let mut counts = [0usize; 8];
        for i in 0..8000 {
            counts[shard_index(&format!("key_{}", i), mask)] += 1;
        }
        // Every shard gets a reasonable share
        assert!(counts.iter().all(|&c| c > 400), "skewed distribution: {:?}", counts);
    }
}
