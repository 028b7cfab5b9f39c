//! RDAP (Registration Data Access Protocol) lookups.
//!
//! Only the HTTP status of `GET {base}/domain/{name}` matters here: a 404
//! means the name is not registered, anything else means it is. A single
//! 429 response is retried once after a short pause.

use crate::error::DomainScanError;
use crate::utils::extract_tld;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::time::Duration;

const RDAP_MEDIA_TYPE: &str = "application/rdap+json";
const RATE_LIMIT_PAUSE: Duration = Duration::from_millis(500);

/// RDAP client holding the per-TLD base URL table.
#[derive(Clone)]
pub struct RdapClient {
    /// HTTP client for making RDAP requests
    http_client: reqwest::Client,
    /// TLD -> base URL
    endpoints: HashMap<String, String>,
}

impl RdapClient {
    /// Create a client for the given TLD -> base URL table.
    pub fn new(endpoints: HashMap<String, String>) -> Result<Self, DomainScanError> {
        Self::with_timeout(endpoints, Duration::from_secs(10))
    }

    /// Create a client with a custom per-request timeout.
    pub fn with_timeout(
        endpoints: HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, DomainScanError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DomainScanError::network_with_source(
                    "Failed to create RDAP HTTP client",
                    e.to_string(),
                )
            })?;

        let endpoints = endpoints
            .into_iter()
            .map(|(tld, base)| (tld.to_lowercase(), base.trim_end_matches('/').to_string()))
            .collect();

        Ok(Self {
            http_client,
            endpoints,
        })
    }

    /// Base URL configured for the domain's TLD, if any.
    pub fn endpoint_for(&self, domain: &str) -> Option<&str> {
        let tld = extract_tld(domain).ok()?;
        self.endpoints.get(tld).map(String::as_str)
    }

    /// Look the domain up and report whether it is available.
    ///
    /// # Errors
    ///
    /// Returns `DomainScanError` if:
    /// - No RDAP endpoint is configured for the TLD
    /// - The request fails at the transport level
    pub async fn check_domain(&self, domain: &str) -> Result<bool, DomainScanError> {
        let base = self.endpoint_for(domain).ok_or_else(|| {
            DomainScanError::rdap(domain, "No RDAP endpoint configured for this TLD")
        })?;
        let url = format!("{}/domain/{}", base, domain);

        let mut status = self.request_status(&url, domain).await?;
        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::debug!(domain, "RDAP rate limited, retrying once");
            tokio::time::sleep(RATE_LIMIT_PAUSE).await;
            status = self.request_status(&url, domain).await?;
        }

        tracing::debug!(domain, status = status.as_u16(), "RDAP response");
        Ok(status == StatusCode::NOT_FOUND)
    }

    async fn request_status(&self, url: &str, domain: &str) -> Result<StatusCode, DomainScanError> {
        let response = self
            .http_client
            .get(url)
            .header(ACCEPT, RDAP_MEDIA_TYPE)
            .send()
            .await
            .map_err(|e| DomainScanError::rdap(domain, format!("Request failed: {}", e)))?;

        Ok(response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP status per connection, recording request heads.
    async fn http_stub(statuses: Vec<u16>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        tokio::spawn(async move {
            for status in statuses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&buf[..n]);
                }
                seen.lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&head).into_owned());

                let reply = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{{}}",
                    status
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
            }
        });

        (base, requests)
    }

    fn client_for(tld: &str, base: &str) -> RdapClient {
        RdapClient::with_timeout(
            HashMap::from([(tld.to_string(), format!("{}/", base))]),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_not_found_means_available() {
        let (base, requests) = http_stub(vec![404]).await;
        let client = client_for("com", &base);

        assert!(client.check_domain("free-name.com").await.unwrap());

        let requests = requests.lock().unwrap();
        let head = requests[0].to_lowercase();
        assert!(head.starts_with("get /domain/free-name.com http/1.1"));
        assert!(head.contains("accept: application/rdap+json"));
    }

    #[tokio::test]
    async fn test_found_means_taken() {
        let (base, _) = http_stub(vec![200]).await;
        let client = client_for("com", &base);
        assert!(!client.check_domain("google.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried_once() {
        let (base, requests) = http_stub(vec![429, 404]).await;
        let client = client_for("net", &base);

        assert!(client.check_domain("ab.net").await.unwrap());
        assert_eq!(requests.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_endpoint_lookup() {
        let client = client_for("org", "https://rdap.example.org/rdap");
        assert_eq!(
            client.endpoint_for("ab.org"),
            Some("https://rdap.example.org/rdap")
        );
        assert_eq!(client.endpoint_for("ab.ir"), None);
    }

    #[tokio::test]
    async fn test_unconfigured_tld_is_an_error() {
        let client = RdapClient::new(HashMap::new()).unwrap();
        let err = client.check_domain("ab.ir").await.unwrap_err();
        assert!(matches!(err, DomainScanError::RdapError { .. }));
    }
}
