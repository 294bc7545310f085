//! Remote push/SMS verification provider.
//!
//! Talks to the verification service's XML API: an account-details check,
//! user creation at enrollment, and per-token verification. Responses are
//! XML-ish fragments; values are pulled out by tag presence rather than a
//! strict parse so that malformed-but-tagged bodies keep working.

use crate::cli::globals::ServiceConfig;
use crate::errors::{Error, Result};
use crate::provider::forms::{self, FieldKind, FormField, FormInput};
use crate::store::UserRecord;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, info_span, Instrument};

const PRODUCTION_URL: &str = "https://api.authy.com:443";
const SANDBOX_URL: &str = "http://sandbox-api.authy.com:80";

/// One attempt per call, no retries.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Details collected from the enrollment form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentDetails {
    pub email: String,
    /// Dialing prefix, digits only (leading `+` already stripped).
    pub country_code: String,
    /// Digits, dashes and spaces.
    pub phone: String,
}

fn base_url(test_mode: bool) -> &'static str {
    if test_mode {
        SANDBOX_URL
    } else {
        PRODUCTION_URL
    }
}

fn client() -> Result<Client> {
    Client::builder()
        .user_agent(crate::APP_USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| Error::Remote(e.to_string()))
}

/// Check the configured account API key against the remote service.
///
/// # Errors
/// `Error::ApiKeyRejected` when the service answers 401, `Error::Remote`
/// for any other failure.
pub async fn check_api_key(config: &ServiceConfig) -> Result<()> {
    app_details(base_url(config.test_mode), config.api_key.expose_secret()).await
}

async fn app_details(base: &str, api_key: &str) -> Result<()> {
    let url = format!("{base}/protected/xml/app/details");

    let span = info_span!("push.app_details", http.method = "GET", url = %url);
    let response = client()?
        .get(&url)
        .query(&[("api_key", api_key)])
        .send()
        .instrument(span)
        .await
        .map_err(|e| Error::Remote(e.to_string()))?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::ApiKeyRejected);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Remote(format!("{url} - {status}, {body}")));
    }
    Ok(())
}

#[must_use]
pub fn render_api_key_form() -> Vec<FormField> {
    vec![FormField::new("api_key", "Account API key", FieldKind::Secret)
        .with_hint("from the verification service dashboard")]
}

#[must_use]
pub fn render_enroll_form() -> Vec<FormField> {
    vec![
        FormField::new("email", "Email address", FieldKind::Text),
        FormField::new("country_code", "Phone country code", FieldKind::Text)
            .with_hint("1-3 digits, a leading + is allowed"),
        FormField::new("phone", "Phone number", FieldKind::Text)
            .with_hint("digits, dashes and spaces"),
    ]
}

/// Validate the submitted API-key form and return the accepted key.
///
/// # Errors
/// Returns `Error::InvalidField` on a missing or blank key.
pub fn parse_api_key_form(input: &FormInput) -> Result<String> {
    forms::parse_api_key(input)
}

/// Validate the submitted enrollment form, first invalid field wins.
///
/// # Errors
/// Returns `Error::InvalidField` for a malformed email, country code or
/// phone number.
pub fn parse_enroll_form(input: &FormInput) -> Result<EnrollmentDetails> {
    Ok(EnrollmentDetails {
        email: forms::parse_email(input)?,
        country_code: forms::parse_country_code(input)?,
        phone: forms::parse_phone(input)?,
    })
}

/// Register the user with the remote service and stamp the assigned id
/// (and the API key used) on the record. The store write is the caller's.
///
/// # Errors
/// `Error::Remote` carrying the response body when the service refuses the
/// registration or answers without an id.
pub async fn enroll(
    details: &EnrollmentDetails,
    user: &mut UserRecord,
    config: &ServiceConfig,
) -> Result<()> {
    let api_key = config.api_key.expose_secret();
    let id = create_user(base_url(config.test_mode), api_key, details).await?;

    debug!(user = %user.username, remote_id = %id, "registered with push verification service");

    user.provider_user_id = id;
    // Persisted so later validations keep working if the account key rotates.
    user.api_key = api_key.to_string();
    Ok(())
}

async fn create_user(base: &str, api_key: &str, details: &EnrollmentDetails) -> Result<String> {
    let url = format!("{base}/protected/xml/users/new");
    let params = [
        ("user[email]", details.email.as_str()),
        ("user[country_code]", details.country_code.as_str()),
        ("user[cellphone]", details.phone.as_str()),
    ];

    let span = info_span!("push.create_user", http.method = "POST", url = %url);
    let response = client()?
        .post(&url)
        .query(&[("api_key", api_key)])
        .form(&params)
        .send()
        .instrument(span)
        .await
        .map_err(|e| Error::Remote(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Remote(e.to_string()))?;
    if !status.is_success() {
        return Err(Error::Remote(format!("{url} - {status}, {body}")));
    }

    extract_tag(&body, "id").ok_or(Error::Remote(body))
}

/// Verify a submitted token for a remote user id.
///
/// # Errors
/// `Error::TokenRejected` when the service answers 401; `Error::Remote`
/// for transport failures, explicit failure messages, or unparseable
/// response bodies.
pub async fn validate(
    config: &ServiceConfig,
    provider_user_id: &str,
    token: &str,
    api_key: &str,
) -> Result<()> {
    verify_token(base_url(config.test_mode), api_key, provider_user_id, token).await
}

async fn verify_token(base: &str, api_key: &str, user_id: &str, token: &str) -> Result<()> {
    let url = format!("{base}/protected/xml/verify/{token}/{user_id}");

    let span = info_span!("push.verify", http.method = "GET", url = %url);
    let response = client()?
        .get(&url)
        .query(&[("api_key", api_key), ("force", "true")])
        .send()
        .instrument(span)
        .await
        .map_err(|e| Error::Remote(e.to_string()))?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::TokenRejected);
    }
    let body = response
        .text()
        .await
        .map_err(|e| Error::Remote(e.to_string()))?;
    if !status.is_success() {
        return Err(Error::Remote(format!("{url} - {status}, {body}")));
    }

    match extract_tag(&body, "success").as_deref() {
        Some("true") => Ok(()),
        Some(_) => match extract_tag(&body, "message") {
            Some(message) => Err(Error::Remote(message)),
            None => Err(Error::Remote(body)),
        },
        None => Err(Error::Remote(body)),
    }
}

/// Pull `<tag ...>value</tag>` out of an XML-ish body by substring search.
/// Attributes on the opening tag are tolerated; no entity decoding.
fn extract_tag(body: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}");
    let start = body.find(&open)?;
    let after_open = &body[start + open.len()..];
    let gt = after_open.find('>')?;
    let inner = &after_open[gt + 1..];
    let close = format!("</{tag}");
    let end = inner.find(&close)?;
    Some(inner[..end].trim().to_string())
}
