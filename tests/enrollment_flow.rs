//! End-to-end exercise of the library surface: enroll, inspect, verify
//! and remove against a real temp-file credential store.

use secrecy::SecretString;
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::TempDir;
use twofactor::cli::globals::ServiceConfig;
use twofactor::errors::Error;
use twofactor::provider::forms::FormInput;
use twofactor::provider::{totp, ProviderKind};
use twofactor::service::TwoFactorService;

fn config(dir: &TempDir) -> ServiceConfig {
    ServiceConfig::new(
        SecretString::from(String::new()),
        false,
        Some(dir.path().join("users.db")),
    )
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_secs()
}

#[tokio::test]
async fn totp_enrollment_lifecycle() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let service = TwoFactorService::new();

    // catalog is fixed and ordered
    let catalog = TwoFactorService::providers();
    assert_eq!(catalog[0].id, "totp");
    assert_eq!(catalog[1].id, "authy");

    // enroll with a generated secret
    let provisioning = service
        .enroll("alice", ProviderKind::Totp, &FormInput::new(), &config)
        .await
        .unwrap()
        .expect("totp enrollment produces provisioning material");
    assert!(provisioning.otpauth_uri.starts_with("otpauth://totp/"));

    // the store reflects the enrollment
    let record = service.status("alice", &config).await.unwrap().unwrap();
    assert_eq!(record.provider, Some(ProviderKind::Totp));
    assert_eq!(record.provider_user_id, provisioning.secret);

    // a current code verifies; a stale one does not
    let good = totp::code_at(&provisioning.secret, now()).unwrap();
    service.verify("alice", &good, &config).await.unwrap();

    let stale = totp::code_at(&provisioning.secret, now() - 120).unwrap();
    if stale != good {
        assert!(matches!(
            service.verify("alice", &stale, &config).await,
            Err(Error::TokenMismatch)
        ));
    }

    // removal is final
    service.unenroll("alice", &config).await.unwrap();
    assert!(service.status("alice", &config).await.unwrap().is_none());
    assert!(matches!(
        service.verify("alice", &good, &config).await,
        Err(Error::NotEnrolled(_))
    ));
}

#[tokio::test]
async fn re_enrollment_overwrites_in_place() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let service = TwoFactorService::new();

    let first = service
        .enroll("bob", ProviderKind::Totp, &FormInput::new(), &config)
        .await
        .unwrap()
        .unwrap();
    let second = service
        .enroll("bob", ProviderKind::Totp, &FormInput::new(), &config)
        .await
        .unwrap()
        .unwrap();
    assert_ne!(first.secret, second.secret);

    let record = service.status("bob", &config).await.unwrap().unwrap();
    assert_eq!(record.provider_user_id, second.secret);

    // exactly one line for bob on disk
    let contents =
        std::fs::read_to_string(config.credential_file.as_ref().unwrap()).unwrap();
    assert_eq!(contents.lines().count(), 1);
}

#[tokio::test]
async fn disabled_store_blocks_enrollment() {
    let service = TwoFactorService::new();
    let config = ServiceConfig::new(SecretString::from(String::new()), false, None);

    assert!(matches!(
        service
            .enroll("alice", ProviderKind::Totp, &FormInput::new(), &config)
            .await,
        Err(Error::StoreDisabled)
    ));
    assert!(service.status("alice", &config).await.unwrap().is_none());
}
