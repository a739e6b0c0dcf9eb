//! Thin async HTTP client shared by the provider adapters

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::types::{Result, SuntrackError};

const USER_AGENT: &str = concat!("suntrack/", env!("CARGO_PKG_VERSION"));

/// JSON-over-HTTP client bound to one provider account
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    provider: String,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(
        provider: impl Into<String>,
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            provider: provider.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let request = self.client.get(self.url(path)).query(query);
        self.send(request).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.client.post(self.url(path)).json(body);
        self.send(request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        self.decode(response).await
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(SuntrackError::provider(
                &self.provider,
                format!("HTTP {}", status),
            ));
        }
        let mut body = response.bytes().await?.to_vec();
        decode_body(&self.provider, &mut body)
    }
}

/// Decode a JSON body with simd-json; failures are provider errors
pub fn decode_body<T: DeserializeOwned>(provider: &str, body: &mut [u8]) -> Result<T> {
    simd_json::from_slice(body)
        .map_err(|e| SuntrackError::provider(provider, format!("undecodable response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        value: u32,
    }

    #[test]
    fn test_decode_body_ok() {
        let mut body = br#"{"value": 7}"#.to_vec();
        let sample: Sample = decode_body("test", &mut body).unwrap();
        assert_eq!(sample, Sample { value: 7 });
    }

    #[test]
    fn test_decode_body_malformed_is_provider_error() {
        let mut body = b"<html>502 Bad Gateway</html>".to_vec();
        let err = decode_body::<Sample>("growatt", &mut body).unwrap_err();
        match err {
            SuntrackError::Provider { provider, cause } => {
                assert_eq!(provider, "growatt");
                assert!(cause.contains("undecodable"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = ApiClient::new("fs", "https://api.example/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(client.url("/thirdData/stations"), "https://api.example/thirdData/stations");
        assert_eq!(client.url("v1/plants"), "https://api.example/v1/plants");
    }
}
