//! # kanban_core
//!
//! Session and access-control core for the Kanban backend: credential
//! issuance and verification, revocation, refresh rotation, role gating and
//! board ownership resolution.

pub mod auth;
pub mod migrate;
pub mod models;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
