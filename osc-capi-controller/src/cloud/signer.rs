use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use super::error::CloudError;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNING_ALGORITHM: &str = "OSC4-HMAC-SHA256";
pub const DATE_HEADER: &str = "x-osc-date";
pub const CONTENT_TYPE: &str = "application/json; charset=utf-8";

const SERVICE: &str = "api";
const REQUEST_TYPE: &str = "osc4_request";
const SIGNED_HEADERS: &str = "content-type;host;x-osc-date";

/// Signs OAPI requests with the OSC4 scheme, the Outscale flavour of AWS SigV4.
#[derive(Clone)]
pub struct RequestSigner {
    access_key: String,
    secret_key: String,
    region: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignedHeaders {
    pub date: String,
    pub authorization: String,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("access_key", &self.access_key)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    pub fn new(access_key: String, secret_key: String, region: String) -> Self {
        Self {
            access_key,
            secret_key,
            region,
        }
    }

    pub fn sign(
        &self,
        host: &str,
        path: &str,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<SignedHeaders, CloudError> {
        let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let scope = format!("{date}/{}/{SERVICE}/{REQUEST_TYPE}", self.region);

        let canonical_request = format!(
            "POST\n{path}\n\ncontent-type:{CONTENT_TYPE}\nhost:{host}\n{DATE_HEADER}:{timestamp}\n\n{SIGNED_HEADERS}\n{}",
            sha256_hex(body)
        );
        let string_to_sign = format!(
            "{SIGNING_ALGORITHM}\n{timestamp}\n{scope}\n{}",
            sha256_hex(canonical_request.as_bytes())
        );

        let signing_key = self.signing_key(&date)?;
        let signature = hex::encode(hmac(&signing_key, string_to_sign.as_bytes())?);

        Ok(SignedHeaders {
            date: timestamp,
            authorization: format!(
                "{SIGNING_ALGORITHM} Credential={}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
                self.access_key
            ),
        })
    }

    fn signing_key(&self, date: &str) -> Result<Vec<u8>, CloudError> {
        let date_key = hmac(format!("OSC4{}", self.secret_key).as_bytes(), date.as_bytes())?;
        let region_key = hmac(&date_key, self.region.as_bytes())?;
        let service_key = hmac(&region_key, SERVICE.as_bytes())?;

        hmac(&service_key, REQUEST_TYPE.as_bytes())
    }
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>, CloudError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|err| CloudError::Other(format!("Couldn't create the signing key: {err}")))?;
    mac.update(data);

    Ok(mac.finalize().into_bytes().to_vec())
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{sha256_hex, RequestSigner};

    fn signer() -> RequestSigner {
        RequestSigner::new(
            "AKIDEXAMPLE".to_owned(),
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_owned(),
            "eu-west-2".to_owned(),
        )
    }

    #[test]
    fn empty_body_hash_is_the_sha256_of_nothing() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn authorization_header_carries_the_credential_scope() {
        let now = Utc.with_ymd_and_hms(2023, 6, 14, 8, 30, 0).unwrap();
        let headers = signer()
            .sign("api.eu-west-2.outscale.com", "/api/v1/ReadNets", b"{}", now)
            .unwrap();

        assert_eq!(headers.date, "20230614T083000Z");
        assert!(headers.authorization.starts_with(
            "OSC4-HMAC-SHA256 Credential=AKIDEXAMPLE/20230614/eu-west-2/api/osc4_request, \
             SignedHeaders=content-type;host;x-osc-date, Signature="
        ));

        let signature = headers.authorization.rsplit('=').next().unwrap();
        assert_eq!(signature.len(), 64);
    }

    #[test]
    fn signature_depends_on_body_and_time() {
        let now = Utc.with_ymd_and_hms(2023, 6, 14, 8, 30, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2023, 6, 14, 8, 30, 1).unwrap();
        let host = "api.eu-west-2.outscale.com";
        let path = "/api/v1/CreateRoute";

        let first = signer().sign(host, path, b"{}", now).unwrap();
        let same = signer().sign(host, path, b"{}", now).unwrap();
        let other_body = signer().sign(host, path, b"{\"NetId\":\"vpc-1\"}", now).unwrap();
        let other_time = signer().sign(host, path, b"{}", later).unwrap();

        assert_eq!(first, same);
        assert_ne!(first.authorization, other_body.authorization);
        assert_ne!(first.authorization, other_time.authorization);
    }
}
