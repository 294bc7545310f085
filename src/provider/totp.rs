//! Local time-based one-time-password provider.
//!
//! Secrets are raw random bytes (10 by default), always handled in their
//! padding-free base32 form; the encoded secret doubles as the stored
//! provider user id. Codes are RFC 6238 SHA-1, 6 digits, 30 second steps,
//! accepted with one step of skew on either side of the current time.

use crate::errors::{Error, Result};
use crate::provider::forms::{FieldKind, FormField, FormInput};
use crate::store::UserRecord;
use data_encoding::BASE32_NOPAD;
use rand::{rngs::OsRng, RngCore};
use std::time::{SystemTime, UNIX_EPOCH};
use totp_rs::{Algorithm, TOTP};
use tracing::debug;

/// Raw secret size used when the caller lets us pick.
const SECRET_BYTES: usize = 10;

/// Encoded secret lengths accepted at enrollment: 10, 16 or 20 raw bytes
/// under padding-stripped base32.
pub const ACCEPTED_SECRET_LENGTHS: [usize; 3] = [16, 26, 32];

const DIGITS: usize = 6;
const STEP_SECONDS: u64 = 30;
/// Accept codes one step either side of now.
const SKEW_STEPS: u8 = 1;

/// External chart endpoint used to render the provisioning QR image.
const QR_CHART_ENDPOINT: &str = "https://chart.googleapis.com/chart";

/// Everything the user needs to finish enrolling an authenticator app.
#[derive(Debug, Clone)]
pub struct Provisioning {
    /// Base32 secret, for manual entry.
    pub secret: String,
    /// `otpauth://totp/...` URI carrying the label and secret.
    pub otpauth_uri: String,
    /// Image reference rendering the URI as a scannable QR code.
    pub qr_image_url: String,
}

/// Generate a fresh secret: `SECRET_BYTES` bytes from the OS CSPRNG,
/// base32-encoded without padding.
#[must_use]
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    BASE32_NOPAD.encode(&bytes)
}

/// Decode a base32 secret, enforcing the accepted encoded lengths.
///
/// # Errors
/// Returns `Error::InvalidField` for an unexpected length or a string that
/// is not valid base32.
pub fn decode_secret(encoded: &str) -> Result<Vec<u8>> {
    if !ACCEPTED_SECRET_LENGTHS.contains(&encoded.len()) {
        return Err(Error::InvalidField {
            field: "secret",
            reason: format!(
                "encoded length must be one of {ACCEPTED_SECRET_LENGTHS:?}, got {}",
                encoded.len()
            ),
        });
    }
    BASE32_NOPAD
        .decode(encoded.as_bytes())
        .map_err(|e| Error::InvalidField {
            field: "secret",
            reason: format!("not valid base32: {e}"),
        })
}

fn build_totp(secret: Vec<u8>, account: &str) -> TOTP {
    // new_unchecked: accepted secrets may be shorter than the RFC 4226
    // 128-bit floor, and length is already enforced by decode_secret.
    TOTP::new_unchecked(
        Algorithm::SHA1,
        DIGITS,
        SKEW_STEPS,
        STEP_SECONDS,
        secret,
        None,
        account.to_string(),
    )
}

/// Confirm the code-computation capability works on this host.
///
/// # Errors
/// Returns `Error::CapabilityUnavailable` if a generated secret cannot be
/// decoded or turned into a code.
pub fn check_capability() -> Result<()> {
    let secret = generate_secret();
    let bytes =
        decode_secret(&secret).map_err(|_| Error::CapabilityUnavailable("time-based codes"))?;
    let _ = build_totp(bytes, "probe").generate(0);
    Ok(())
}

#[must_use]
pub fn render_api_key_form() -> Vec<FormField> {
    // No account-level key for locally computed codes.
    Vec::new()
}

#[must_use]
pub fn render_enroll_form() -> Vec<FormField> {
    vec![FormField::new("secret", "Shared secret", FieldKind::Secret)
        .with_hint("base32, 16, 26 or 32 characters; leave empty to generate one")]
}

/// Validate an optionally caller-chosen secret.
///
/// Returns `None` when the caller left the field empty and wants a
/// generated secret. Supplied secrets are uppercased before validation so
/// hand-typed lowercase input is accepted.
///
/// # Errors
/// Returns `Error::InvalidField` if a supplied secret has an unexpected
/// length or is not base32.
pub fn parse_enroll_form(input: &FormInput) -> Result<Option<String>> {
    let raw = input.get("secret").unwrap_or_default().trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let secret = raw.to_ascii_uppercase();
    decode_secret(&secret)?;
    Ok(Some(secret))
}

/// Enroll a user: pick or validate the secret, stamp it on the record and
/// build the provisioning artifact.
///
/// # Errors
/// Returns `Error::InvalidField` if the supplied secret is rejected.
pub fn enroll(secret: Option<String>, user: &mut UserRecord) -> Result<Provisioning> {
    let secret = match secret {
        Some(secret) => secret,
        None => generate_secret(),
    };
    let bytes = decode_secret(&secret)?;
    let totp = build_totp(bytes, &user.username);
    let otpauth_uri = totp.get_url();
    let qr_image_url = chart_url(&otpauth_uri);

    debug!(user = %user.username, "enrolled time-based code secret");

    user.provider_user_id = secret.clone();
    Ok(Provisioning {
        secret,
        otpauth_uri,
        qr_image_url,
    })
}

fn chart_url(otpauth_uri: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(otpauth_uri.as_bytes()).collect();
    format!("{QR_CHART_ENDPOINT}?cht=qr&chs=300x300&chl={encoded}")
}

/// Compute the code for a secret at a fixed time. Useful for tests and
/// for diagnosing clock-drift reports; production validation goes through
/// [`validate`].
///
/// # Errors
/// Returns `Error::InvalidField` if the secret does not decode.
pub fn code_at(secret: &str, time: u64) -> Result<String> {
    Ok(build_totp(decode_secret(secret)?, "user").generate(time))
}

/// Validate a submitted token against the stored secret at the current
/// wall-clock time.
///
/// # Errors
/// Returns `Error::TokenMismatch` if the token matches none of the codes
/// for the previous, current and next time step.
pub fn validate(secret: &str, token: &str) -> Result<()> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| Error::CapabilityUnavailable("system clock"))?
        .as_secs();
    validate_at(secret, token, now)
}

/// Validate a submitted token against the stored secret at a fixed time.
///
/// Accepts the code for `time - 30s`, `time` and `time + 30s`; rejects
/// everything else. No rate limiting happens at this layer.
///
/// # Errors
/// Returns `Error::TokenMismatch` on a non-matching token, or
/// `Error::InvalidField` if the stored secret no longer decodes.
pub fn validate_at(secret: &str, token: &str, time: u64) -> Result<()> {
    let bytes = decode_secret(secret)?;
    let totp = build_totp(bytes, "user");
    if totp.check(token.trim(), time) {
        Ok(())
    } else {
        Err(Error::TokenMismatch)
    }
}
