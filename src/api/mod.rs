use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::config::ApiOptions;
use crate::entry::EntryId;
use crate::session::AuthSession;
use crate::wire::{EntryUpload, StoredEntry, IMAGES_FIELD};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not signed in or session expired")]
    Unauthorized,
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("server error ({status})")]
    Server { status: u16 },
    #[error("network failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("could not build upload: {0}")]
    InvalidUpload(String),
}

impl ApiError {
    /// Whether repeating the same request later can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Server { .. })
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return ApiError::Unauthorized;
        }
        if status.is_server_error() {
            return ApiError::Server {
                status: status.as_u16(),
            };
        }
        #[derive(Deserialize)]
        struct ErrorBody {
            error: String,
        }
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|parsed| parsed.error)
            .unwrap_or_else(|_| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                } else {
                    trimmed.to_string()
                }
            });
        ApiError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

/// The storage collaborator the composer and views talk to.
#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn create_entry(
        &self,
        session: &AuthSession,
        upload: EntryUpload,
    ) -> Result<Option<EntryId>, ApiError>;

    async fn list_entries(&self, session: &AuthSession) -> Result<Vec<StoredEntry>, ApiError>;

    async fn delete_entry(&self, session: &AuthSession, id: &EntryId) -> Result<(), ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpEntryStore {
    client: Client,
    base_url: String,
    max_attempts: u32,
}

impl HttpEntryStore {
    pub fn new(options: &ApiOptions) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(options.timeout()).build()?;
        Ok(Self {
            client,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            max_attempts: options.max_attempts.max(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, session: &AuthSession) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, url)
            .bearer_auth(session.token())
    }

    /// Sends an idempotent request, retrying network failures and 5xx answers.
    async fn send_idempotent(
        &self,
        method: Method,
        path: &str,
        session: &AuthSession,
    ) -> Result<Response, ApiError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            tracing::debug!(%method, path, attempt, "sending request");
            let result = self.request(method.clone(), path, session).send().await;
            match result {
                Ok(resp) if resp.status().is_server_error() && attempt < self.max_attempts => {
                    tracing::warn!(status = %resp.status(), path, attempt, "server error, retrying");
                }
                Ok(resp) => return check_status(resp).await,
                Err(err) if attempt < self.max_attempts => {
                    tracing::warn!(?err, path, attempt, "request failed, retrying");
                }
                Err(err) => return Err(err.into()),
            }
            tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
        }
    }
}

#[async_trait]
impl EntryStore for HttpEntryStore {
    async fn create_entry(
        &self,
        session: &AuthSession,
        upload: EntryUpload,
    ) -> Result<Option<EntryId>, ApiError> {
        let form = build_form(upload)?;
        tracing::debug!(path = "/entries", "submitting entry");
        // sent exactly once; a blind retry could store the entry twice
        let resp = self
            .request(Method::POST, "/entries", session)
            .multipart(form)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let body = resp.text().await?;
        Ok(parse_created_id(&body))
    }

    async fn list_entries(&self, session: &AuthSession) -> Result<Vec<StoredEntry>, ApiError> {
        let resp = self
            .send_idempotent(Method::GET, "/entries", session)
            .await?;
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))
    }

    async fn delete_entry(&self, session: &AuthSession, id: &EntryId) -> Result<(), ApiError> {
        let path = format!("/entries/{id}");
        self.send_idempotent(Method::DELETE, &path, session)
            .await?;
        Ok(())
    }
}

async fn check_status(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::from_status(status, &body))
}

fn build_form(upload: EntryUpload) -> Result<Form, ApiError> {
    let layout_fields = upload
        .layout_fields()
        .map_err(|err| ApiError::InvalidUpload(err.to_string()))?;

    let mut form = Form::new();
    for (name, value) in upload.fields {
        form = form.text(name, value);
    }
    for part in upload.images {
        let file = Part::bytes(part.image.bytes)
            .file_name(part.image.file_name)
            .mime_str(&part.image.mime)
            .map_err(|err| ApiError::InvalidUpload(err.to_string()))?;
        form = form.part(IMAGES_FIELD, file);
    }
    for (name, json) in layout_fields {
        form = form.text(name, json);
    }
    Ok(form)
}

fn parse_created_id(body: &str) -> Option<EntryId> {
    #[derive(Deserialize)]
    struct Created {
        #[serde(alias = "_id")]
        id: EntryId,
    }
    match serde_json::from_str::<Created>(body) {
        Ok(created) => Some(created.id),
        Err(err) => {
            tracing::debug!(?err, "create response carried no entry id");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::wire::{ImageLayout, StoredImage};

    /// In-process stand-in for the storage API.
    #[derive(Default)]
    pub struct MemoryEntryStore {
        pub entries: Mutex<Vec<StoredEntry>>,
        pub calls: AtomicUsize,
        pub fail_next: Mutex<Option<ApiError>>,
    }

    impl MemoryEntryStore {
        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn fail_next(&self, err: ApiError) {
            *self.fail_next.lock().unwrap() = Some(err);
        }

        fn take_failure(&self) -> Result<(), ApiError> {
            match self.fail_next.lock().unwrap().take() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl EntryStore for MemoryEntryStore {
        async fn create_entry(
            &self,
            _session: &AuthSession,
            upload: EntryUpload,
        ) -> Result<Option<EntryId>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.take_failure()?;
            let mut entries = self.entries.lock().unwrap();
            let id = EntryId::new((entries.len() + 1).to_string());
            let images = upload
                .layout_fields()
                .map_err(|err| ApiError::InvalidUpload(err.to_string()))?
                .into_iter()
                .zip(upload.images.iter())
                .map(|((_, json), part)| {
                    let layout: ImageLayout = serde_json::from_str(&json)
                        .map_err(|err| ApiError::Decode(err.to_string()))?;
                    Ok(StoredImage {
                        x: layout.x,
                        y: layout.y,
                        width: layout.width,
                        height: layout.height,
                        image_url: format!("/uploads/{}", part.image.file_name),
                    })
                })
                .collect::<Result<Vec<_>, ApiError>>()?;
            let field = |name: &str| upload.field(name).map(str::to_string);
            entries.push(StoredEntry {
                id: id.clone(),
                title: field("title").unwrap_or_default(),
                text: field("text").unwrap_or_default(),
                name: field("name"),
                date: Some("2026-10-18T12:00:00Z".to_string()),
                font_family: field("fontFamily"),
                font_size: field("fontSize"),
                font_style: field("fontStyle"),
                font_weight: field("fontWeight"),
                color: field("color"),
                images,
            });
            Ok(Some(id))
        }

        async fn list_entries(&self, _session: &AuthSession) -> Result<Vec<StoredEntry>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.take_failure()?;
            Ok(self.entries.lock().unwrap().clone())
        }

        async fn delete_entry(&self, _session: &AuthSession, id: &EntryId) -> Result<(), ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.take_failure()?;
            let mut entries = self.entries.lock().unwrap();
            let before = entries.len();
            entries.retain(|entry| &entry.id != id);
            if entries.len() == before {
                return Err(ApiError::Rejected {
                    status: 404,
                    message: "Entry not found".into(),
                });
            }
            Ok(())
        }
    }
}
