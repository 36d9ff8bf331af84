use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generate a prefixed record id like `plt-3f9a` with a short hash
/// suffix, retrying while `exists` reports a collision.
pub fn generate_record_id<F>(prefix: &str, mut exists: F) -> String
where
    F: FnMut(&str) -> bool,
{
    for _ in 0..64 {
        let seed = Uuid::now_v7().to_string();
        let mut hasher = Sha256::new();
        hasher.update(seed.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        let candidate = format!("{}-{}", prefix, &digest[..4]);
        if !exists(&candidate) {
            return candidate;
        }
    }

    format!("{}-{}", prefix, &Uuid::now_v7().simple().to_string()[..8])
}

pub fn display_id(id: &str) -> &str {
    id.rsplit_once('-').map_or(id, |(_, suffix)| suffix)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{display_id, generate_record_id};

    #[test]
    fn generated_ids_follow_prefix_short_hash_shape() {
        let seen: HashSet<String> = HashSet::new();
        let id = generate_record_id("plt", |candidate| seen.contains(candidate));
        assert!(id.starts_with("plt-"));
        assert_eq!(id.len(), "plt-".len() + 4);
    }

    #[test]
    fn collisions_fall_through_to_a_longer_suffix() {
        let id = generate_record_id("tsk", |_| true);
        assert!(id.starts_with("tsk-"));
        assert_eq!(id.len(), "tsk-".len() + 8);
    }

    #[test]
    fn display_id_strips_prefix() {
        assert_eq!(display_id("plt-3f9a"), "3f9a");
        assert_eq!(display_id("nohyphen"), "nohyphen");
    }
}
