//! Client-side helpers for connecting to and consuming the directory
//! service's `DirectoryEvents` streaming RPC.

pub mod daemon_client;
pub mod stream;

/// Stable crate label used by bootstrap smoke tests.
pub fn crate_label() -> &'static str {
    "dirsvc-client"
}

#[cfg(test)]
mod tests {
    use super::crate_label;

    #[test]
    fn crate_label_is_stable() {
        assert_eq!(crate_label(), "dirsvc-client");
    }
}
