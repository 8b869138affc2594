//! Request signing for the BloodHound CE API.
//!
//! Every request carries an HMAC-SHA256 signature chained over three links:
//! the operation (method and path with query), the request date truncated to
//! the hour, and the request body. The token key never leaves this module.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Local, SecondsFormat, TimeZone};
use hmac::{digest::InvalidLength, Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of the `RequestDate` prefix mixed into the date link (`YYYY-MM-DDTHH`).
const DATE_KEY_LEN: usize = 13;

/// API token pair issued by BloodHound.
#[derive(Clone)]
pub struct Credential {
    token_id: String,
    token_key: SecretString,
}

impl Credential {
    pub fn new(token_id: impl Into<String>, token_key: SecretString) -> Self {
        Self {
            token_id: token_id.into(),
            token_key,
        }
    }

    pub fn token_id(&self) -> &str {
        &self.token_id
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token_id", &self.token_id)
            .field("token_key", &"[REDACTED]")
            .finish()
    }
}

/// Headers computed for a single outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub authorization: String,
    pub request_date: String,
    pub signature: String,
}

/// Produces signed headers for outbound requests.
#[derive(Debug, Clone)]
pub struct Signer {
    credential: Credential,
}

impl Signer {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Sign a request with the current local time.
    ///
    /// A fresh timestamp is taken on every call, so retried requests are
    /// re-signed rather than replaying an earlier signature.
    pub fn sign(
        &self,
        method: &str,
        path_and_query: &str,
        body: &[u8],
    ) -> Result<SignedHeaders, InvalidLength> {
        self.sign_at(method, path_and_query, body, &Local::now())
    }

    /// Sign a request as of `now`.
    pub fn sign_at<Tz>(
        &self,
        method: &str,
        path_and_query: &str,
        body: &[u8],
        now: &DateTime<Tz>,
    ) -> Result<SignedHeaders, InvalidLength>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let request_date = now.to_rfc3339_opts(SecondsFormat::Micros, false);
        let signature = signature(
            self.credential.token_key.expose_secret().as_bytes(),
            method,
            path_and_query,
            &request_date,
            body,
        )?;

        Ok(SignedHeaders {
            authorization: format!("bhesignature {}", self.credential.token_id),
            request_date,
            signature,
        })
    }
}

/// Compute the base64 signature for one request.
///
/// `request_date` is the exact value sent in the `RequestDate` header; only
/// its first 13 characters take part in the chain.
pub fn signature(
    token_key: &[u8],
    method: &str,
    path_and_query: &str,
    request_date: &str,
    body: &[u8],
) -> Result<String, InvalidLength> {
    let operation_key = digest(token_key, format!("{method}{path_and_query}").as_bytes())?;

    let date_prefix = request_date
        .get(..DATE_KEY_LEN)
        .unwrap_or(request_date);
    let date_key = digest(&operation_key, date_prefix.as_bytes())?;

    let body_digest = digest(&date_key, body)?;
    Ok(STANDARD.encode(body_digest))
}

fn digest(key: &[u8], message: &[u8]) -> Result<Vec<u8>, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(key)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}
