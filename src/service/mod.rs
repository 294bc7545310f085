//! Enrollment/validation orchestrator.
//!
//! Thin coordination between the provider registry and the credential
//! store; the surrounding UI (or the CLI binary) calls in here. Providers
//! never touch the store themselves, and validation never mutates it.

use crate::cli::globals::ServiceConfig;
use crate::errors::{Error, Result};
use crate::provider::forms::FormInput;
use crate::provider::totp::Provisioning;
use crate::provider::{providers, ProviderDescriptor, ProviderKind};
use crate::store::{CredentialStore, UserRecord};
use secrecy::ExposeSecret;
use tracing::{debug, instrument};

#[derive(Debug, Default)]
pub struct TwoFactorService {
    store: CredentialStore,
}

impl TwoFactorService {
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: CredentialStore::new(),
        }
    }

    /// The fixed provider catalog, in display order.
    #[must_use]
    pub fn providers() -> [ProviderDescriptor; 2] {
        providers()
    }

    /// Check account-level prerequisites for one provider.
    ///
    /// # Errors
    /// See [`ProviderKind::check_api_key`].
    pub async fn check_api_key(kind: ProviderKind, config: &ServiceConfig) -> Result<()> {
        kind.check_api_key(config).await
    }

    /// Enroll `username` with `kind`: parse the submitted form, run the
    /// provider's enrollment effect, persist the resulting record.
    /// Re-enrollment overwrites in place.
    ///
    /// Returns provisioning material for providers that produce any.
    ///
    /// # Errors
    /// Form validation, provider and store errors, in that order; nothing
    /// is persisted unless the provider effect succeeded.
    #[instrument(skip(self, input, config))]
    pub async fn enroll(
        &self,
        username: &str,
        kind: ProviderKind,
        input: &FormInput,
        config: &ServiceConfig,
    ) -> Result<Option<Provisioning>> {
        let mut record = UserRecord::unenrolled(username);
        record.provider = Some(kind);

        let request = kind.parse_enroll_form(input, &record)?;
        let provisioning = kind.enroll(request, &mut record, config).await?;

        self.store
            .save(
                username,
                config,
                Some(kind),
                &record.provider_user_id,
                &record.api_key,
            )
            .await?;

        debug!(user = %username, provider = kind.as_str(), "enrollment stored");
        Ok(provisioning)
    }

    /// Validate a submitted token for `username` against whatever provider
    /// the user is enrolled with. Read-only.
    ///
    /// # Errors
    /// `Error::NotEnrolled` when the user has no record; otherwise the
    /// provider's validation errors.
    #[instrument(skip(self, token, config))]
    pub async fn verify(
        &self,
        username: &str,
        token: &str,
        config: &ServiceConfig,
    ) -> Result<()> {
        let record = self
            .store
            .load(username, config)
            .await?
            .ok_or_else(|| Error::NotEnrolled(username.to_string()))?;
        let Some(kind) = record.provider else {
            return Err(Error::NotEnrolled(username.to_string()));
        };

        // Prefer the key captured at enrollment; fall back to the account
        // key for records from before keys were persisted per user.
        let api_key = if record.api_key.is_empty() {
            config.api_key.expose_secret().to_string()
        } else {
            record.api_key.clone()
        };

        kind.validate(config, &record.provider_user_id, token, &api_key)
            .await
    }

    /// Drop `username`'s enrollment, whatever its provider.
    ///
    /// # Errors
    /// Store errors only; removing an unenrolled user succeeds.
    pub async fn unenroll(&self, username: &str, config: &ServiceConfig) -> Result<()> {
        self.store.save(username, config, None, "", "").await
    }

    /// Current enrollment state, or `None` when not enrolled.
    ///
    /// # Errors
    /// Store errors only.
    pub async fn status(
        &self,
        username: &str,
        config: &ServiceConfig,
    ) -> Result<Option<UserRecord>> {
        self.store.load(username, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::totp;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tempfile::TempDir;

    const SECRET: &str = "JBSWY3DPEHPK3PXP";

    fn config(dir: &TempDir) -> ServiceConfig {
        ServiceConfig::new(
            String::new().into(),
            false,
            Some(dir.path().join("users.db")),
        )
    }

    fn secret_input(secret: &str) -> FormInput {
        [("secret", secret)].into_iter().collect()
    }

    fn current_code(secret: &str) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        totp::code_at(secret, now).unwrap()
    }

    #[tokio::test]
    async fn enroll_verify_unenroll_flow() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let service = TwoFactorService::new();

        let provisioning = service
            .enroll("alice", ProviderKind::Totp, &secret_input(SECRET), &config)
            .await
            .unwrap()
            .expect("totp enrollment returns provisioning");
        assert_eq!(provisioning.secret, SECRET);

        let status = service.status("alice", &config).await.unwrap().unwrap();
        assert_eq!(status.provider, Some(ProviderKind::Totp));
        assert_eq!(status.provider_user_id, SECRET);

        let code = current_code(SECRET);
        service.verify("alice", &code, &config).await.unwrap();

        assert!(matches!(
            service.verify("alice", "000000", &config).await,
            // one in a million chance the random window holds 000000
            Err(Error::TokenMismatch) | Ok(())
        ));

        service.unenroll("alice", &config).await.unwrap();
        assert!(service.status("alice", &config).await.unwrap().is_none());
        assert!(matches!(
            service.verify("alice", &code, &config).await,
            Err(Error::NotEnrolled(_))
        ));
    }

    #[tokio::test]
    async fn enroll_rejects_bad_form_without_persisting() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let service = TwoFactorService::new();

        let result = service
            .enroll("alice", ProviderKind::Totp, &secret_input("bogus!"), &config)
            .await;
        assert!(matches!(result, Err(Error::InvalidField { .. })));
        assert!(service.status("alice", &config).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn push_enroll_validates_details_before_any_remote_call() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let service = TwoFactorService::new();

        let input: FormInput = [
            ("email", "not-an-email"),
            ("country_code", "44"),
            ("phone", "555-1234"),
        ]
        .into_iter()
        .collect();

        let result = service
            .enroll("alice", ProviderKind::Authy, &input, &config)
            .await;
        assert!(matches!(
            result,
            Err(Error::InvalidField { field: "email", .. })
        ));
    }

    #[tokio::test]
    async fn verify_unknown_user_is_not_enrolled() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let service = TwoFactorService::new();

        assert!(matches!(
            service.verify("nobody", "123456", &config).await,
            Err(Error::NotEnrolled(username)) if username == "nobody"
        ));
    }

    #[test]
    fn catalog_pass_through_matches_registry() {
        let catalog = TwoFactorService::providers();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].id, "totp");
    }
}
