//! AWS Signature Version 4 for the Amazon Product Advertising API
//!
//! The signing key is derived through four chained HMAC-SHA256 operations
//! (`"AWS4" + secret` -> date -> region -> service -> `"aws4_request"`) and
//! then used to sign a string built from the canonical request. Everything
//! here is pure: the caller supplies the clock.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::utils::error::CheckError;

type HmacSha256 = Hmac<Sha256>;

/// Signing algorithm identifier
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Headers covered by the signature, in canonical order
pub const SIGNED_HEADERS: &str = "content-type;host;x-amz-date;x-amz-target";

const TERMINATOR: &str = "aws4_request";

fn hmac_sha256(key: &[u8], msg: &[u8]) -> Result<[u8; 32], CheckError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| CheckError::Signing(format!("rejected HMAC key: {e}")))?;
    mac.update(msg);
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Lowercase hex SHA-256 of a string
pub fn sha256_hex(data: &str) -> String {
    format!("{:x}", Sha256::digest(data.as_bytes()))
}

/// Derive the request signing key for one day, region and service
pub fn signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<[u8; 32], CheckError> {
    let k_date = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, TERMINATOR.as_bytes())
}

/// The parts of a request that take part in the signature
#[derive(Debug, Clone)]
pub struct SigningRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub host: &'a str,
    pub content_type: &'a str,
    pub target: &'a str,
    pub payload: &'a str,
}

/// Headers produced by signing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// `X-Amz-Date` value (`YYYYMMDDTHHMMSSZ`)
    pub amz_date: String,
    /// `Authorization` header value
    pub authorization: String,
    /// Hex signature, also embedded in `authorization`
    pub signature: String,
}

/// Request signer bound to one credential and scope
#[derive(Debug, Clone)]
pub struct SigV4<'a> {
    pub access_key: &'a str,
    pub secret_key: &'a str,
    pub region: &'a str,
    pub service: &'a str,
}

impl<'a> SigV4<'a> {
    pub fn new(access_key: &'a str, secret_key: &'a str, region: &'a str, service: &'a str) -> Self {
        Self {
            access_key,
            secret_key,
            region,
            service,
        }
    }

    /// Credential scope `date/region/service/aws4_request`
    pub fn credential_scope(&self, date_stamp: &str) -> String {
        format!("{date_stamp}/{}/{}/{TERMINATOR}", self.region, self.service)
    }

    /// Canonical request string (empty query string)
    pub fn canonical_request(request: &SigningRequest<'_>, amz_date: &str) -> String {
        let canonical_headers = format!(
            "content-type:{}\nhost:{}\nx-amz-date:{}\nx-amz-target:{}\n",
            request.content_type, request.host, amz_date, request.target
        );
        format!(
            "{}\n{}\n\n{}\n{}\n{}",
            request.method,
            request.path,
            canonical_headers,
            SIGNED_HEADERS,
            sha256_hex(request.payload)
        )
    }

    /// String to sign for a canonical request
    pub fn string_to_sign(&self, canonical_request: &str, amz_date: &str, date_stamp: &str) -> String {
        format!(
            "{ALGORITHM}\n{amz_date}\n{}\n{}",
            self.credential_scope(date_stamp),
            sha256_hex(canonical_request)
        )
    }

    /// Sign a request at the given instant
    pub fn sign(
        &self,
        request: &SigningRequest<'_>,
        now: DateTime<Utc>,
    ) -> Result<SignedHeaders, CheckError> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();

        let canonical_request = Self::canonical_request(request, &amz_date);
        let string_to_sign = self.string_to_sign(&canonical_request, &amz_date, &date_stamp);

        let key = signing_key(self.secret_key, &date_stamp, self.region, self.service)?;
        let signature = hex(&hmac_sha256(&key, string_to_sign.as_bytes())?);

        let authorization = format!(
            "{ALGORITHM} Credential={}/{}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
            self.access_key,
            self.credential_scope(&date_stamp)
        );

        Ok(SignedHeaders {
            amz_date,
            authorization,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request(payload: &str) -> SigningRequest<'_> {
        SigningRequest {
            method: "POST",
            path: "/paapi5/getitems",
            host: "webservices.amazon.in",
            content_type: "application/json; charset=UTF-8",
            target: "com.amazon.paapi5.v1.ProductAdvertisingAPIv1.GetItems",
            payload,
        }
    }

    #[test]
    fn test_hmac_rfc4231_case_2() {
        let mac = hmac_sha256(b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            hex(&mac),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_signing_key_matches_published_example() {
        let key = signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        ).unwrap();
        assert_eq!(
            hex(&key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_canonical_request_layout() {
        let canonical = SigV4::canonical_request(&request(""), "20240101T000000Z");
        let lines: Vec<&str> = canonical.split('\n').collect();

        assert_eq!(lines[0], "POST");
        assert_eq!(lines[1], "/paapi5/getitems");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "content-type:application/json; charset=UTF-8");
        assert_eq!(lines[4], "host:webservices.amazon.in");
        assert_eq!(lines[5], "x-amz-date:20240101T000000Z");
        assert_eq!(
            lines[6],
            "x-amz-target:com.amazon.paapi5.v1.ProductAdvertisingAPIv1.GetItems"
        );
        assert_eq!(lines[7], "");
        assert_eq!(lines[8], SIGNED_HEADERS);
        // SHA-256 of the empty payload
        assert_eq!(
            lines[9],
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sign_is_deterministic() {
        let signer = SigV4::new("AKIDEXAMPLE", "secret", "eu-west-1", "ProductAdvertisingAPI");
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();

        let a = signer.sign(&request("{\"ItemIds\":[\"B0TEST\"]}"), now).unwrap();
        let b = signer.sign(&request("{\"ItemIds\":[\"B0TEST\"]}"), now).unwrap();
        let c = signer.sign(&request("{\"ItemIds\":[\"B0OTHER\"]}"), now).unwrap();

        assert_eq!(a, b);
        assert_ne!(a.signature, c.signature);
        assert_eq!(a.amz_date, "20240309T140507Z");
        assert_eq!(a.signature.len(), 64);
    }

    #[test]
    fn test_authorization_header_format() {
        let signer = SigV4::new("AKIDEXAMPLE", "secret", "eu-west-1", "ProductAdvertisingAPI");
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap();
        let signed = signer.sign(&request("{}"), now).unwrap();

        assert!(signed.authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240309/eu-west-1/ProductAdvertisingAPI/aws4_request, "
        ));
        assert!(signed
            .authorization
            .contains("SignedHeaders=content-type;host;x-amz-date;x-amz-target, "));
        assert!(signed
            .authorization
            .ends_with(&format!("Signature={}", signed.signature)));
    }
}
