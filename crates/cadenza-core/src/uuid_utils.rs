//! Time-ordered identifiers.
//!
//! Audit entries, templates, versions and events carry UUIDv7 ids. A later id
//! compares greater than an earlier one, which is what lets audit listings
//! break `created_at` ties by id.

use uuid::Uuid;

/// Fresh UUIDv7.
///
/// ```
/// let id = cadenza_core::new_v7();
/// assert!(cadenza_core::is_v7(&id));
/// ```
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

#[inline]
pub fn is_v7(id: &Uuid) -> bool {
    id.get_version_num() == 7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_v7_and_increase() {
        let first = new_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = new_v7();

        assert!(is_v7(&first));
        assert!(second > first);
        assert!(!is_v7(&Uuid::new_v4()));
    }
}
