//! # Twofactor (Pluggable Second-Factor Authentication)
//!
//! `twofactor` handles enrollment, credential storage and token
//! verification for second-factor providers. Two mechanisms are built in:
//! locally verified time-based codes (`totp`) and a remote push/SMS
//! verification service (`authy`).
//!
//! ## Providers
//!
//! The provider set is a closed enum ([`provider::ProviderKind`]); the
//! registry exposes a fixed, ordered catalog and exact-id resolution.
//! Each provider implements the same operations: account-level check,
//! form rendering/parsing, enrollment and stateless token validation.
//!
//! ## Credential store
//!
//! Enrollment state persists in a line-oriented file, one
//! `username:provider:id:api_key` record per user. Writers serialize on a
//! whole-store lock held across read-modify-write; writes go through a
//! temp file and rename. No configured file means the store is disabled:
//! reads come back empty and writes fail.
//!
//! ## Surfaces
//!
//! The orchestrator ([`service::TwoFactorService`]) is the only entry
//! point the surrounding UI needs; the bundled CLI binary drives the same
//! orchestrator for admin use.

pub mod cli;
pub mod errors;
pub mod provider;
pub mod service;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        // Should be a hex string (full SHA-1 is 40 chars, but could be short)
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
