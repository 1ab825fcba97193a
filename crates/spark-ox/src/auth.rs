//! Connection URL signing.
//!
//! Spark authenticates the WebSocket upgrade through query parameters: an
//! HMAC-SHA256 signature over the host, the request date and the request line,
//! wrapped in a base64 authorization value. A signed URL embeds the date it was
//! created at and must be used immediately.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;

use crate::SparkRequestError;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_ALGORITHM: &str = "hmac-sha256";
pub const SIGNED_HEADERS: &str = "host date request-line";

/// A connection URL together with the query parameters that were embedded in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEndpoint {
    pub url: String,
    pub authorization: String,
    pub date: String,
    pub host: String,
}

/// Formats an instant as an RFC 1123 HTTP-date, e.g. `Tue, 15 Nov 1994 08:12:31 GMT`.
pub fn http_date(instant: DateTime<Utc>) -> String {
    instant.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// The exact string covered by the signature.
pub fn signature_origin(host: &str, date: &str, path: &str) -> String {
    format!("host: {host}\ndate: {date}\nGET {path} HTTP/1.1")
}

/// Split a base URL into `(host, path)`.
///
/// The host is the network location as written, so an explicit port is kept
/// even when it is the scheme default (`wss://host:443/...` signs `host:443`).
pub fn host_and_path(base_url: &str) -> Result<(String, String), SparkRequestError> {
    let url = Url::parse(base_url).map_err(|e| SparkRequestError::UrlBuildError(e.to_string()))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(SparkRequestError::UrlBuildError(format!("no host in {base_url}")));
    }

    let authority = base_url
        .split_once("://")
        .map_or(base_url, |(_, rest)| rest)
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);

    Ok((host.to_string(), url.path().to_string()))
}

/// Sign `base_url` for the given instant.
pub fn sign_url(
    base_url: &str,
    api_key: &str,
    api_secret: &str,
    instant: DateTime<Utc>,
) -> Result<SignedEndpoint, SparkRequestError> {
    let (host, path) = host_and_path(base_url)?;
    let date = http_date(instant);

    let origin = signature_origin(&host, &date, &path);
    log::trace!("Spark signature origin: {origin:?}");

    let mut mac = HmacSha256::new_from_slice(api_secret.as_bytes())
        .map_err(|e| SparkRequestError::Signing(e.to_string()))?;
    mac.update(origin.as_bytes());
    let signature = BASE64_STANDARD.encode(mac.finalize().into_bytes());

    let authorization_origin = format!(
        r#"api_key="{api_key}", algorithm="{SIGNATURE_ALGORITHM}", headers="{SIGNED_HEADERS}", signature="{signature}""#
    );
    let authorization = BASE64_STANDARD.encode(authorization_origin.as_bytes());

    let mut url = Url::parse(base_url).map_err(|e| SparkRequestError::UrlBuildError(e.to_string()))?;
    url.query_pairs_mut()
        .append_pair("authorization", &authorization)
        .append_pair("date", &date)
        .append_pair("host", &host);

    Ok(SignedEndpoint {
        url: url.to_string(),
        authorization,
        date,
        host,
    })
}

/// Sign `base_url` for the current instant.
pub fn sign_now(
    base_url: &str,
    api_key: &str,
    api_secret: &str,
) -> Result<SignedEndpoint, SparkRequestError> {
    sign_url(base_url, api_key, api_secret, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const BASE_URL: &str = "wss://spark-api.xf-yun.com/v3.5/chat";

    fn fixed_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap()
    }

    fn decoded_authorization(endpoint: &SignedEndpoint) -> String {
        String::from_utf8(BASE64_STANDARD.decode(&endpoint.authorization).unwrap()).unwrap()
    }

    #[test]
    fn test_http_date_format() {
        assert_eq!(http_date(fixed_instant()), "Thu, 07 Mar 2024 09:05:02 GMT");
    }

    #[test]
    fn test_signature_origin_has_no_trailing_newline() {
        let origin = signature_origin("spark-api.xf-yun.com", "D", "/v3.5/chat");
        assert_eq!(origin, "host: spark-api.xf-yun.com\ndate: D\nGET /v3.5/chat HTTP/1.1");
    }

    #[test]
    fn test_host_and_path_keeps_port() {
        let (host, path) = host_and_path("ws://127.0.0.1:9001/v1.1/chat").unwrap();
        assert_eq!(host, "127.0.0.1:9001");
        assert_eq!(path, "/v1.1/chat");
    }

    #[test]
    fn test_host_keeps_explicit_default_port() {
        let (host, path) = host_and_path("wss://spark-api.xf-yun.com:443/v3.5/chat").unwrap();
        assert_eq!(host, "spark-api.xf-yun.com:443");
        assert_eq!(path, "/v3.5/chat");

        let endpoint = sign_url("wss://spark-api.xf-yun.com:443/v3.5/chat", "key", "secret", fixed_instant()).unwrap();
        assert_eq!(endpoint.host, "spark-api.xf-yun.com:443");
        assert!(endpoint.url.ends_with("&host=spark-api.xf-yun.com%3A443"));
    }

    #[test]
    fn test_authorization_carries_independent_signature() {
        let endpoint = sign_url(BASE_URL, "key-123", "secret-456", fixed_instant()).unwrap();
        let authorization = decoded_authorization(&endpoint);

        let mut mac = HmacSha256::new_from_slice(b"secret-456").unwrap();
        mac.update(
            b"host: spark-api.xf-yun.com\ndate: Thu, 07 Mar 2024 09:05:02 GMT\nGET /v3.5/chat HTTP/1.1",
        );
        let expected = BASE64_STANDARD.encode(mac.finalize().into_bytes());

        assert!(authorization.contains(r#"algorithm="hmac-sha256""#));
        assert!(authorization.contains(r#"api_key="key-123""#));
        assert!(authorization.contains(r#"headers="host date request-line""#));
        assert!(authorization.contains(&format!(r#"signature="{expected}""#)));
    }

    #[test]
    fn test_url_query_parameters() {
        let endpoint = sign_url(BASE_URL, "key", "secret", fixed_instant()).unwrap();
        let url = Url::parse(&endpoint.url).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert_eq!(url.path(), "/v3.5/chat");
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0], ("authorization".to_string(), endpoint.authorization.clone()));
        assert_eq!(pairs[1], ("date".to_string(), "Thu, 07 Mar 2024 09:05:02 GMT".to_string()));
        assert_eq!(pairs[2], ("host".to_string(), "spark-api.xf-yun.com".to_string()));
        assert!(endpoint.url.contains("date=Thu%2C+07+Mar+2024+09%3A05%3A02+GMT"));
    }

    #[test]
    fn test_invalid_base_url() {
        let result = sign_url("not a url", "key", "secret", fixed_instant());
        assert!(matches!(result, Err(SparkRequestError::UrlBuildError(_))));
    }
}
