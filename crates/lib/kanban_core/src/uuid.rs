// Helper for generating UUIDv7 (timestamp-sortable UUIDs).
//
// Users and the board hierarchy get app-side v7 ids so that inserts stay
// index-friendly and rows sort by creation time. Refresh and revocation
// rows are keyed by token fingerprint instead.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuidv7_is_valid() {
        let id = uuidv7();
        assert_eq!(id.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn uuidv7_is_monotonic() {
        let a = uuidv7();
        let b = uuidv7();
        assert!(b >= a);
    }
}
