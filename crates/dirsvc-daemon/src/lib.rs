//! dirsvc-daemon: the directory service's event bus, request limiter, and
//! streaming gRPC surface.

pub mod bootstrap;
pub mod bus;
pub mod errors;
pub mod filter;
pub mod limiter;
pub mod server;

/// Stable crate label used by bootstrap smoke tests.
pub fn crate_label() -> &'static str {
    "dirsvc-daemon"
}

#[cfg(test)]
mod tests {
    use super::crate_label;

    #[test]
    fn crate_label_is_stable() {
        assert_eq!(crate_label(), "dirsvc-daemon");
    }
}
