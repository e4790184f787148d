//! Google Cloud Translation (v2 REST) client.
//!
//! One blocking request per fragment; no batching, caching or retries.

use pptrans_core::{Error, Result, Translator};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default v2 endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://translation.googleapis.com/language/translate/v2";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// How requests are authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// API key, sent as the `key` query parameter.
    ApiKey(String),
    /// OAuth access token, sent as a bearer token.
    AccessToken(String),
}

/// Client settings.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub endpoint: String,
    pub credentials: Credentials,
    pub timeout: Duration,
    pub proxy: Option<String>,
}

impl GoogleConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credentials,
            timeout: DEFAULT_TIMEOUT,
            proxy: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    target: &'a str,
    source: &'a str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslationList,
}

#[derive(Debug, Deserialize)]
struct TranslationList {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

/// Translator backed by the Google Cloud Translation v2 API.
pub struct GoogleTranslator {
    client: Client,
    config: GoogleConfig,
}

impl GoogleTranslator {
    /// Build the HTTP client for `config`.
    pub fn new(config: GoogleConfig) -> Result<Self> {
        let mut builder = Client::builder().timeout(config.timeout);

        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| Error::InvalidArgument(format!("bad proxy '{}': {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| Error::TranslationError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }
}

impl Translator for GoogleTranslator {
    fn translate(&self, text: &str, target: &str, source: &str) -> Result<String> {
        let body = TranslateRequest {
            q: text,
            target,
            source,
            format: "text",
        };

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        request = match &self.config.credentials {
            Credentials::ApiKey(key) => request.query(&[("key", key.as_str())]),
            Credentials::AccessToken(token) => request.bearer_auth(token),
        };

        log::debug!(
            "requesting translation {} -> {} ({} chars)",
            source,
            target,
            text.chars().count()
        );
        let response = request
            .send()
            .map_err(|e| Error::TranslationError(format!("request failed: {}", e)))?;

        let status = response.status();
        let payload = response
            .text()
            .map_err(|e| Error::TranslationError(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::TranslationError(describe_error(status.as_u16(), &payload)));
        }

        parse_translation(&payload)
    }
}

/// Extract the translated text from a successful response body.
fn parse_translation(payload: &str) -> Result<String> {
    let response: TranslateResponse = serde_json::from_str(payload)
        .map_err(|e| Error::TranslationError(format!("malformed response: {}", e)))?;

    response
        .data
        .translations
        .into_iter()
        .next()
        .map(|t| t.translated_text)
        .ok_or_else(|| Error::TranslationError("response contained no translation".to_string()))
}

/// Human-readable description of an error response.
fn describe_error(status: u16, payload: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(payload) {
        Ok(ErrorResponse { error }) if !error.message.is_empty() => {
            let code = if error.code == 0 { status } else { error.code };
            format!("service returned {}: {}", code, error.message)
        }
        _ => format!("service returned {}", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let body = TranslateRequest {
            q: "Hello",
            target: "de",
            source: "en",
            format: "text",
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"q": "Hello", "target": "de", "source": "en", "format": "text"})
        );
    }

    #[test]
    fn test_parse_translation() {
        let payload = r#"{"data":{"translations":[{"translatedText":"Hallo Welt"}]}}"#;
        assert_eq!(parse_translation(payload).unwrap(), "Hallo Welt");
    }

    #[test]
    fn test_parse_translation_rejects_empty_and_malformed() {
        assert!(matches!(
            parse_translation(r#"{"data":{"translations":[]}}"#),
            Err(Error::TranslationError(_))
        ));
        assert!(matches!(parse_translation("<html>"), Err(Error::TranslationError(_))));
    }

    #[test]
    fn test_describe_error() {
        let payload = r#"{"error":{"code":400,"message":"Invalid Value","errors":[]}}"#;
        assert_eq!(describe_error(400, payload), "service returned 400: Invalid Value");
        assert_eq!(describe_error(503, "upstream down"), "service returned 503");
    }

    #[test]
    fn test_config_builder() {
        let config = GoogleConfig::new(Credentials::ApiKey("k".to_string()))
            .with_endpoint("http://localhost:9/translate")
            .with_timeout(Duration::from_secs(5))
            .with_proxy("http://proxy:3128");
        assert_eq!(config.endpoint, "http://localhost:9/translate");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.proxy.as_deref(), Some("http://proxy:3128"));

        let translator = GoogleTranslator::new(config).unwrap();
        assert_eq!(translator.config().credentials, Credentials::ApiKey("k".to_string()));
    }

    #[test]
    fn test_unreachable_endpoint_is_a_translation_error() {
        let config = GoogleConfig::new(Credentials::ApiKey("k".to_string()))
            .with_endpoint("http://127.0.0.1:9/translate")
            .with_timeout(Duration::from_secs(2));
        let translator = GoogleTranslator::new(config).unwrap();
        assert!(matches!(
            translator.translate("Hello", "de", "en"),
            Err(Error::TranslationError(_))
        ));
    }
}
