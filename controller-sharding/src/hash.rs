use sha2::{Digest, Sha256};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a.
pub fn fnv1a_32(data: &[u8]) -> u32 {
    data.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Maps a cluster id to a shard with `fnv1a_32(id) % replicas`.
///
/// Depends on nothing but its arguments, so every replica computes the same
/// answer. An empty id, or a zero replica count, maps to shard 0.
pub fn get_shard_by_id(id: &str, replicas: u32) -> u32 {
    if id.is_empty() || replicas == 0 {
        return 0;
    }
    fnv1a_32(id.as_bytes()) % replicas
}

/// 64-bit ring position: the first eight bytes of SHA-256, little-endian.
pub fn ring_hash(key: &str) -> u64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_reference_vectors() {
        assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn empty_id_is_shard_zero() {
        for replicas in 0..10 {
            assert_eq!(get_shard_by_id("", replicas), 0);
        }
    }

    #[test]
    fn zero_replicas_is_shard_zero() {
        assert_eq!(get_shard_by_id("1", 0), 0);
    }

    #[test]
    fn known_assignments() {
        let shards: Vec<u32> = ["1", "2", "3", "4"]
            .iter()
            .map(|id| get_shard_by_id(id, 5))
            .collect();
        assert_eq!(shards, vec![4, 1, 2, 2]);

        assert_eq!(get_shard_by_id("1", 2), 0);
        assert_eq!(get_shard_by_id("2", 2), 1);
    }

    #[test]
    fn output_within_range() {
        for replicas in 1..8 {
            for i in 0..500 {
                let shard = get_shard_by_id(&format!("cluster-{i}"), replicas);
                assert!(shard < replicas, "cluster-{i} mapped to {shard}");
            }
        }
    }

    #[test]
    fn ring_hash_is_deterministic() {
        assert_eq!(ring_hash("0-17"), ring_hash("0-17"));
        assert_ne!(ring_hash("0"), ring_hash("1"));
    }
}
