use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use reqwest::{multipart, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{map_status, ApiError, Operation, Result};
use crate::types::{ClientConfig, FileRecord, FilterSet, StorageStats};

/// The remote operations of the file storage service.
///
/// [`FileHubClient`] talks HTTP; tests and embedders can provide their own
/// implementation.
#[async_trait::async_trait]
pub trait FileApi: Send + Sync {
    /// Upload `content` under `filename`. The server answers with the created
    /// record, which may be a duplicate reference to earlier content.
    async fn upload(&self, content: Vec<u8>, filename: &str) -> Result<FileRecord>;

    /// Unfiltered listing
    async fn list(&self) -> Result<Vec<FileRecord>>;

    /// Filtered listing, only the present fields of `filter` are sent
    async fn search(&self, filter: &FilterSet) -> Result<Vec<FileRecord>>;

    /// Delete a record by id
    async fn remove(&self, id: &str) -> Result<()>;

    /// Current aggregate statistics
    async fn stats(&self) -> Result<StorageStats>;

    /// Fetch the content of `id` and save it locally as `filename`,
    /// returning where it was written.
    async fn download(&self, id: &str, filename: &str) -> Result<PathBuf>;
}

/// Read a local file for upload, returning its file name and content
pub async fn read_upload(path: &Path) -> Result<(String, Vec<u8>)> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ApiError::FileSystemError(format!("invalid file name: {}", path.display())))?
        .to_string();

    let content = tokio::fs::read(path).await.map_err(|e| {
        ApiError::FileSystemError(format!("failed to read {}: {}", path.display(), e))
    })?;

    Ok((filename, content))
}

/// HTTP client for the file storage API
#[derive(Clone)]
pub struct FileHubClient {
    http: reqwest::Client,
    base: Url,
    download_dir: PathBuf,
}

impl FileHubClient {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)?;
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(config.base_url));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("filehub-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base,
            download_dir: config.download_dir,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Builds `<base>/<segments..>/`, the server expects the trailing slash.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    async fn send(&self, op: Operation, request: RequestBuilder) -> Result<Bytes> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            debug!("server returned {} ({} bytes body)", status, body.len());
            return Err(map_status(op, status.as_u16(), &body));
        }

        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let body = self.send(Operation::Query, request).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_records(&self, request: RequestBuilder) -> Result<Vec<FileRecord>> {
        let records: Vec<FileRecord> = self.get_json(request).await?;
        Ok(records.into_iter().map(FileRecord::normalize).collect())
    }

    /// Upload a file from disk under its own file name
    pub async fn upload_path<P: AsRef<Path>>(&self, path: P) -> Result<FileRecord> {
        let (filename, content) = read_upload(path.as_ref()).await?;
        self.upload(content, &filename).await
    }

    /// Raw content of a record, nothing is written locally
    pub async fn fetch(&self, id: &str) -> Result<Bytes> {
        let url = self.endpoint(&["files", id])?;
        debug!("fetching content from {}", url);

        self.send(Operation::Download, self.http.get(url)).await
    }
}

#[async_trait::async_trait]
impl FileApi for FileHubClient {
    async fn upload(&self, content: Vec<u8>, filename: &str) -> Result<FileRecord> {
        let url = self.endpoint(&["files"])?;
        let mime = mime_guess::from_path(filename).first_or_octet_stream();
        info!("uploading {} ({} bytes, {})", filename, content.len(), mime);

        let part = multipart::Part::bytes(content)
            .file_name(filename.to_string())
            .mime_str(mime.essence_str())?;
        let form = multipart::Form::new().part("file", part);

        let body = self
            .send(Operation::Upload, self.http.post(url).multipart(form))
            .await?;
        let record: FileRecord = serde_json::from_slice(&body)?;
        let record = record.normalize();

        if record.is_duplicate {
            info!("{} stored as duplicate reference ({})", filename, record.id);
        } else {
            info!("{} stored as {}", filename, record.id);
        }
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<FileRecord>> {
        let url = self.endpoint(&["files"])?;
        debug!("listing files from {}", url);

        self.get_records(self.http.get(url)).await
    }

    async fn search(&self, filter: &FilterSet) -> Result<Vec<FileRecord>> {
        let url = self.endpoint(&["files", "search"])?;
        let params = filter.query_pairs();
        debug!("searching {} with {:?}", url, params);

        let mut request = self.http.get(url);
        if !params.is_empty() {
            request = request.query(&params);
        }
        self.get_records(request).await
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&["files", id])?;
        info!("deleting file {}", id);

        self.send(Operation::Query, self.http.delete(url)).await?;
        Ok(())
    }

    async fn stats(&self) -> Result<StorageStats> {
        let url = self.endpoint(&["files", "stats"])?;
        debug!("fetching storage stats from {}", url);

        self.get_json(self.http.get(url)).await
    }

    async fn download(&self, id: &str, filename: &str) -> Result<PathBuf> {
        // only the body of a successful response ever reaches the disk
        let content = self.fetch(id).await?;

        let name = Path::new(filename)
            .file_name()
            .map(|n| n.to_owned())
            .unwrap_or_else(|| "download".into());
        let output = self.download_dir.join(name);

        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| ApiError::FileSystemError(format!("failed to create directory: {}", e)))?;

        if let Err(e) = tokio::fs::write(&output, &content).await {
            let _ = tokio::fs::remove_file(&output).await;
            return Err(ApiError::FileSystemError(format!(
                "failed to write {}: {}",
                output.display(),
                e
            )));
        }

        info!(
            "downloaded {} to {} ({} bytes)",
            id,
            output.display(),
            content.len()
        );
        Ok(output)
    }
}
