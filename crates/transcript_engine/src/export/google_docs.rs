//! Google Docs delivery through a service account.
//!
//! Each transcript becomes a new Google Doc inside the configured Drive
//! folder: the document is created empty through Drive v3 and the text is
//! then inserted at the start of the body with a Docs v1 `batchUpdate`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use transcript_core::DestinationMode;
use transcript_logging::{transcript_debug, transcript_info};

use crate::export::{Exporter, OutputLocator};
use crate::ExportError;

const DOCUMENT_MIME_TYPE: &str = "application/vnd.google-apps.document";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const SCOPES: &str =
    "https://www.googleapis.com/auth/drive https://www.googleapis.com/auth/documents";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct DocsEndpoints {
    pub drive_base: String,
    pub docs_base: String,
    /// Prefix of the browser URL reported for a created document.
    pub document_url_base: String,
    pub request_timeout: Duration,
}

impl Default for DocsEndpoints {
    fn default() -> Self {
        Self {
            drive_base: "https://www.googleapis.com/drive/v3".to_string(),
            docs_base: "https://docs.googleapis.com/v1".to_string(),
            document_url_base: "https://docs.google.com/document/d".to_string(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// The fields of a service-account JSON key that the grant needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, ExportError> {
        let raw = std::fs::read_to_string(path).map_err(|err| ExportError::Credentials {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|err| ExportError::Credentials {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct GrantClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

struct CachedToken {
    value: String,
    refresh_after: Instant,
}

pub struct GoogleDocsExporter {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    folder_id: String,
    endpoints: DocsEndpoints,
    client: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleDocsExporter {
    /// Loads and checks the key file; a malformed key fails here rather than mid-run.
    pub fn from_key_file(
        credentials_path: impl AsRef<Path>,
        folder_id: impl Into<String>,
        endpoints: DocsEndpoints,
    ) -> Result<Self, ExportError> {
        let path = credentials_path.as_ref();
        let key = ServiceAccountKey::from_file(path)?;
        Self::new(key, path.to_path_buf(), folder_id, endpoints)
    }

    pub fn new(
        key: ServiceAccountKey,
        key_origin: PathBuf,
        folder_id: impl Into<String>,
        endpoints: DocsEndpoints,
    ) -> Result<Self, ExportError> {
        let signing_key =
            EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|err| {
                ExportError::Credentials {
                    path: key_origin,
                    message: err.to_string(),
                }
            })?;
        let client = reqwest::Client::builder()
            .timeout(endpoints.request_timeout)
            .build()
            .map_err(|err| ExportError::Request(err.to_string()))?;
        Ok(Self {
            key,
            signing_key,
            folder_id: folder_id.into(),
            endpoints,
            client,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, ExportError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_after {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.request_token().await?;
        let value = fresh.access_token.clone();
        let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        *cached = Some(CachedToken {
            value: fresh.access_token,
            refresh_after: Instant::now() + lifetime,
        });
        Ok(value)
    }

    async fn request_token(&self) -> Result<TokenResponse, ExportError> {
        let now = chrono::Utc::now().timestamp();
        let claims = GrantClaims {
            iss: &self.key.client_email,
            scope: SCOPES,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let assertion =
            jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
                .map_err(|err| ExportError::Auth(err.to_string()))?;

        transcript_debug!("Requesting access token for {}", self.key.client_email);
        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|err| ExportError::Auth(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ExportError::Auth(err.to_string()))?;
        if !status.is_success() {
            return Err(ExportError::Auth(format!("{status}: {body}")));
        }
        serde_json::from_str(&body).map_err(|err| ExportError::Auth(err.to_string()))
    }

    async fn create_document(&self, token: &str, title: &str) -> Result<String, ExportError> {
        let url = format!("{}/files", self.endpoints.drive_base.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .query(&[("fields", "id"), ("supportsAllDrives", "true")])
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&json!({
                "name": title,
                "mimeType": DOCUMENT_MIME_TYPE,
                "parents": [self.folder_id],
            }))
            .send()
            .await
            .map_err(|err| ExportError::Request(err.to_string()))?;

        let body = checked_body(response).await?;
        let created: CreatedFile =
            serde_json::from_str(&body).map_err(|err| ExportError::Decode(err.to_string()))?;
        Ok(created.id)
    }

    async fn insert_text(&self, token: &str, document_id: &str, text: &str) -> Result<(), ExportError> {
        let url = format!(
            "{}/documents/{}:batchUpdate",
            self.endpoints.docs_base.trim_end_matches('/'),
            document_id
        );
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&json!({
                "requests": [
                    { "insertText": { "location": { "index": 1 }, "text": text } }
                ]
            }))
            .send()
            .await
            .map_err(|err| ExportError::Request(err.to_string()))?;

        checked_body(response).await?;
        Ok(())
    }
}

async fn checked_body(response: reqwest::Response) -> Result<String, ExportError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| ExportError::Request(err.to_string()))?;
    if !status.is_success() {
        return Err(ExportError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

#[async_trait::async_trait]
impl Exporter for GoogleDocsExporter {
    fn destination(&self) -> DestinationMode {
        DestinationMode::DocumentService
    }

    async fn deliver(&self, title: &str, text: &str) -> Result<OutputLocator, ExportError> {
        let token = self.access_token().await?;
        let id = self.create_document(&token, title).await?;
        // The Docs API rejects an empty insertText.
        if !text.is_empty() {
            self.insert_text(&token, &id, text).await?;
        }
        transcript_info!("Created document {} ({})", title, id);

        let url = format!(
            "{}/{}",
            self.endpoints.document_url_base.trim_end_matches('/'),
            id
        );
        Ok(OutputLocator::Document { id, url })
    }
}
