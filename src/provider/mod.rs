//! Second-factor providers: catalog, resolution and dispatch.
//!
//! The provider set is closed. Each variant of [`ProviderKind`] is one
//! mechanism; dispatch is a `match`, so adding a provider means adding a
//! variant and letting the compiler point at every site that needs it.

pub mod authy;
pub mod forms;
pub mod totp;

use crate::cli::globals::ServiceConfig;
use crate::errors::{Error, Result};
use crate::store::UserRecord;
use authy::EnrollmentDetails;
use forms::{FormField, FormInput};
use serde::{Deserialize, Serialize};
use totp::Provisioning;

/// Catalog entry for one provider.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProviderDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub info_url: &'static str,
}

/// The available second-factor mechanisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Locally verified time-based codes.
    Totp,
    /// Remote push/SMS verification.
    Authy,
}

/// Provider-specific payload produced by form parsing and consumed once by
/// [`ProviderKind::enroll`].
#[derive(Debug, Clone)]
pub enum EnrollmentRequest {
    /// `None` asks the provider to generate a secret.
    Totp { secret: Option<String> },
    Authy(EnrollmentDetails),
}

impl ProviderKind {
    /// Catalog order is fixed and user-visible.
    pub const ALL: [Self; 2] = [Self::Totp, Self::Authy];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Totp => "totp",
            Self::Authy => "authy",
        }
    }

    /// Resolve a provider id by exact match.
    ///
    /// # Errors
    /// Returns `Error::UnknownProvider` for anything not in the catalog.
    pub fn resolve(id: &str) -> Result<Self> {
        match id {
            "totp" => Ok(Self::Totp),
            "authy" => Ok(Self::Authy),
            other => Err(Error::UnknownProvider(other.to_string())),
        }
    }

    #[must_use]
    pub const fn descriptor(self) -> ProviderDescriptor {
        match self {
            Self::Totp => ProviderDescriptor {
                id: "totp",
                display_name: "Time-based code",
                info_url: "https://en.wikipedia.org/wiki/Time-based_one-time_password",
            },
            Self::Authy => ProviderDescriptor {
                id: "authy",
                display_name: "Push verification",
                info_url: "https://authy.com/",
            },
        }
    }

    /// Check the account-level prerequisites for this provider: the code
    /// capability for local codes, the configured API key for the remote
    /// service.
    ///
    /// # Errors
    /// `Error::CapabilityUnavailable`, `Error::ApiKeyRejected` or
    /// `Error::Remote`, depending on provider and failure.
    pub async fn check_api_key(self, config: &ServiceConfig) -> Result<()> {
        match self {
            Self::Totp => totp::check_capability(),
            Self::Authy => authy::check_api_key(config).await,
        }
    }

    #[must_use]
    pub fn render_api_key_form(self, _config: &ServiceConfig) -> Vec<FormField> {
        match self {
            Self::Totp => totp::render_api_key_form(),
            Self::Authy => authy::render_api_key_form(),
        }
    }

    #[must_use]
    pub fn render_enroll_form(self, _user: &UserRecord) -> Vec<FormField> {
        match self {
            Self::Totp => totp::render_enroll_form(),
            Self::Authy => authy::render_enroll_form(),
        }
    }

    /// Validate the submitted API-key form and return the accepted key.
    ///
    /// # Errors
    /// `Error::InvalidField` on the first invalid field.
    pub fn parse_api_key_form(self, input: &FormInput) -> Result<String> {
        match self {
            Self::Totp => Ok(String::new()),
            Self::Authy => authy::parse_api_key_form(input),
        }
    }

    /// Validate the submitted enrollment form into a provider-specific
    /// request. Pure validation; nothing is contacted and nothing mutated.
    ///
    /// # Errors
    /// `Error::InvalidField` on the first invalid field.
    pub fn parse_enroll_form(self, input: &FormInput, _user: &UserRecord) -> Result<EnrollmentRequest> {
        match self {
            Self::Totp => Ok(EnrollmentRequest::Totp {
                secret: totp::parse_enroll_form(input)?,
            }),
            Self::Authy => Ok(EnrollmentRequest::Authy(authy::parse_enroll_form(input)?)),
        }
    }

    /// Perform the provider-side enrollment effect and stamp the resulting
    /// provider user id (and API key where relevant) on the record. The
    /// caller owns the store write.
    ///
    /// Returns provisioning material for providers that have any.
    ///
    /// # Errors
    /// Provider-specific; also `Error::InvalidField` if `request` was
    /// parsed for a different provider.
    pub async fn enroll(
        self,
        request: EnrollmentRequest,
        user: &mut UserRecord,
        config: &ServiceConfig,
    ) -> Result<Option<Provisioning>> {
        match (self, request) {
            (Self::Totp, EnrollmentRequest::Totp { secret }) => {
                Ok(Some(totp::enroll(secret, user)?))
            }
            (Self::Authy, EnrollmentRequest::Authy(details)) => {
                authy::enroll(&details, user, config).await?;
                Ok(None)
            }
            (kind, _) => Err(Error::InvalidField {
                field: "enrollment",
                reason: format!("details were not produced for provider {}", kind.as_str()),
            }),
        }
    }

    /// Stateless token check against the enrolled credential.
    ///
    /// # Errors
    /// `Error::TokenMismatch` / `Error::TokenRejected` for a bad token,
    /// `Error::Remote` for remote transport failures.
    pub async fn validate(
        self,
        config: &ServiceConfig,
        provider_user_id: &str,
        token: &str,
        api_key: &str,
    ) -> Result<()> {
        match self {
            Self::Totp => totp::validate(provider_user_id, token),
            Self::Authy => authy::validate(config, provider_user_id, token, api_key).await,
        }
    }
}

/// The fixed, ordered provider catalog.
#[must_use]
pub fn providers() -> [ProviderDescriptor; 2] {
    [
        ProviderKind::Totp.descriptor(),
        ProviderKind::Authy.descriptor(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_ordered_and_stable() {
        let catalog = providers();
        assert_eq!(catalog[0].id, "totp");
        assert_eq!(catalog[0].display_name, "Time-based code");
        assert_eq!(catalog[1].id, "authy");
        assert_eq!(catalog[1].display_name, "Push verification");
    }

    #[test]
    fn resolve_is_exact_match_only() {
        assert_eq!(ProviderKind::resolve("totp").unwrap(), ProviderKind::Totp);
        assert_eq!(ProviderKind::resolve("authy").unwrap(), ProviderKind::Authy);
        assert!(matches!(
            ProviderKind::resolve("TOTP"),
            Err(Error::UnknownProvider(_))
        ));
        assert!(matches!(
            ProviderKind::resolve("tot"),
            Err(Error::UnknownProvider(_))
        ));
        assert!(matches!(
            ProviderKind::resolve(""),
            Err(Error::UnknownProvider(_))
        ));
    }

    #[test]
    fn as_str_round_trips_through_resolve() {
        for kind in ProviderKind::ALL {
            assert_eq!(ProviderKind::resolve(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn enroll_forms_match_parse_expectations() {
        let user = UserRecord::unenrolled("alice");
        let config = ServiceConfig::new(String::new().into(), true, None);

        // totp advertises the secret field it parses
        let fields = ProviderKind::Totp.render_enroll_form(&user);
        assert!(fields.iter().any(|f| f.name == "secret"));
        assert!(ProviderKind::Totp.render_api_key_form(&config).is_empty());

        // authy advertises exactly the fields its parser consumes
        let names: Vec<&str> = ProviderKind::Authy
            .render_enroll_form(&user)
            .iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, ["email", "country_code", "phone"]);
    }

    #[tokio::test]
    async fn mismatched_enrollment_request_is_rejected() {
        let config = ServiceConfig::new(String::new().into(), true, None);
        let mut user = UserRecord::unenrolled("alice");
        let request = EnrollmentRequest::Totp { secret: None };

        assert!(matches!(
            ProviderKind::Authy.enroll(request, &mut user, &config).await,
            Err(Error::InvalidField { field: "enrollment", .. })
        ));
    }
}
