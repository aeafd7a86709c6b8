//! Hosted record-store client.
//!
//! Talks to a table-oriented record API:
//!
//! | call   | request                                                   |
//! |--------|-----------------------------------------------------------|
//! | list   | `POST   {base}/tables/{table}/fetch`   `{"fields": [..]}`  |
//! | get    | `GET    {base}/tables/{table}/records/{id}`                |
//! | create | `POST   {base}/tables/{table}/records` `{"records": [..]}` |
//! | update | `PATCH  {base}/tables/{table}/records` `{"records": [..]}` |
//! | delete | `DELETE {base}/tables/{table}/records` `{"RecordIds": [..]}` |
//!
//! Every response is an [`Envelope`]. Field naming is handled by [`super::adapter`].

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::adapter::{self, Envelope, BOOKMARK_FIELDS, FOLDER_FIELDS};
use super::{BatchOutcome, RecordStore};
use crate::types::bookmark::{Bookmark, BookmarkDraft, Folder, FolderDraft};
use crate::types::errors::StoreError;
use crate::types::settings::RemoteStoreSettings;

/// Record store backed by the hosted record API.
pub struct RemoteStore {
    client: Client,
    base_url: String,
    bookmark_table: String,
    folder_table: String,
    api_key: Option<Zeroizing<String>>,
}

impl RemoteStore {
    pub fn new(
        base_url: &str,
        bookmark_table: &str,
        folder_table: &str,
        api_key: Option<Zeroizing<String>>,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent(concat!("tagshelf/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bookmark_table: bookmark_table.to_string(),
            folder_table: folder_table.to_string(),
            api_key,
        })
    }

    /// Builds a client from settings; the key is read from the configured environment variable.
    pub fn from_settings(settings: &RemoteStoreSettings) -> Result<Self, StoreError> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(Zeroizing::new);
        if api_key.is_none() {
            warn!(env = %settings.api_key_env, "remote store key not set, sending unauthenticated requests");
        }
        Self::new(
            &settings.base_url,
            &settings.bookmark_table,
            &settings.folder_table,
            api_key,
        )
    }

    fn records_url(&self, table: &str) -> String {
        format!("{}/tables/{}/records", self.base_url, table)
    }

    async fn call(&self, method: Method, url: String, body: Option<Value>) -> Result<Envelope, StoreError> {
        debug!(%method, %url, "remote store call");
        let mut request = self.client.request(method, &url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.as_str());
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        match serde_json::from_str::<Envelope>(&text) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => {
                Err(StoreError::Transport(format!("HTTP {} from {}", status, url)))
            }
            Err(e) => Err(StoreError::Malformed(format!("unreadable response: {}", e))),
        }
    }

    async fn fetch_all(&self, table: &str, fields: &[&str]) -> Result<Value, StoreError> {
        let url = format!("{}/tables/{}/fetch", self.base_url, table);
        let fields: Vec<Value> = fields.iter().map(|f| json!({ "field": { "Name": f } })).collect();
        self.call(Method::POST, url, Some(json!({ "fields": fields })))
            .await?
            .into_data()
    }

    async fn write(&self, method: Method, table: &str, records: Vec<Value>) -> Result<Envelope, StoreError> {
        self.call(method, self.records_url(table), Some(json!({ "records": records })))
            .await
    }

    async fn write_one(&self, method: Method, table: &str, record: Value) -> Result<Value, StoreError> {
        self.write(method, table, vec![record])
            .await?
            .into_single()?
            .ok_or_else(|| StoreError::Malformed("write returned no record".into()))
    }

    async fn delete(&self, table: &str, id: i64) -> Result<(), StoreError> {
        self.call(
            Method::DELETE,
            self.records_url(table),
            Some(json!({ "RecordIds": [id] })),
        )
        .await?
        .into_single()?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for RemoteStore {
    fn backend_name(&self) -> &'static str {
        "remote"
    }

    async fn list_bookmarks(&self) -> Result<Vec<Bookmark>, StoreError> {
        let data = self.fetch_all(&self.bookmark_table, BOOKMARK_FIELDS).await?;
        adapter::records_from_list(data, adapter::bookmark_from_record)
    }

    async fn get_bookmark(&self, id: i64) -> Result<Bookmark, StoreError> {
        let url = format!("{}/{}", self.records_url(&self.bookmark_table), id);
        match self.call(Method::GET, url, None).await?.into_data() {
            Ok(data) => adapter::bookmark_from_record(data),
            Err(StoreError::Malformed(_)) | Err(StoreError::Rejected(_)) => {
                Err(StoreError::BookmarkNotFound(id))
            }
            Err(e) => Err(e),
        }
    }

    async fn create_bookmark(&self, draft: &BookmarkDraft) -> Result<Bookmark, StoreError> {
        let record = adapter::bookmark_to_record(None, draft);
        let data = self.write_one(Method::POST, &self.bookmark_table, record).await?;
        adapter::bookmark_from_record(data)
    }

    async fn create_bookmarks(
        &self,
        drafts: &[BookmarkDraft],
    ) -> Result<BatchOutcome<Bookmark>, StoreError> {
        let records = drafts
            .iter()
            .map(|d| adapter::bookmark_to_record(None, d))
            .collect();
        let raw = self
            .write(Method::POST, &self.bookmark_table, records)
            .await?
            .into_outcome()?;
        Ok(adapter::translate_outcome(raw, adapter::bookmark_from_record))
    }

    async fn update_bookmark(&self, id: i64, draft: &BookmarkDraft) -> Result<Bookmark, StoreError> {
        let record = adapter::bookmark_to_record(Some(id), draft);
        let data = self.write_one(Method::PATCH, &self.bookmark_table, record).await?;
        adapter::bookmark_from_record(data)
    }

    async fn set_score(&self, id: i64, score: f64) -> Result<(), StoreError> {
        self.write(
            Method::PATCH,
            &self.bookmark_table,
            vec![adapter::score_to_record(id, score)],
        )
        .await?
        .into_single()?;
        Ok(())
    }

    async fn delete_bookmark(&self, id: i64) -> Result<(), StoreError> {
        self.delete(&self.bookmark_table, id).await
    }

    async fn list_folders(&self) -> Result<Vec<Folder>, StoreError> {
        let data = self.fetch_all(&self.folder_table, FOLDER_FIELDS).await?;
        adapter::records_from_list(data, adapter::folder_from_record)
    }

    async fn create_folder(&self, draft: &FolderDraft) -> Result<Folder, StoreError> {
        let record = adapter::folder_to_record(None, draft);
        let data = self.write_one(Method::POST, &self.folder_table, record).await?;
        adapter::folder_from_record(data)
    }

    async fn update_folder(&self, id: i64, draft: &FolderDraft) -> Result<Folder, StoreError> {
        let record = adapter::folder_to_record(Some(id), draft);
        let data = self.write_one(Method::PATCH, &self.folder_table, record).await?;
        adapter::folder_from_record(data)
    }

    /// Deletes the folder record. The hosted store nulls lookup fields that
    /// pointed at a deleted record, so bookmarks keep existing with no folder.
    async fn delete_folder(&self, id: i64) -> Result<(), StoreError> {
        self.delete(&self.folder_table, id).await
    }
}
