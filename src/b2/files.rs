//! File operations
//!
//! Thin wrappers around the B2 file endpoints. Downloads go through the
//! byte transport and rebuild a [`FileInfo`] from the response headers;
//! uploads read the whole local file, hash it and post it to an upload URL
//! obtained from [`B2Client::get_upload_url`].

use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use serde::Serialize;
use sha1::{Digest, Sha1};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use super::client::{request_bytes, request_json, B2Client};
use super::endpoints::Endpoint;
use super::errors::{B2Error, Result};
use super::types::{
    File, FileCollection, FileInfo, FileVersion, UploadUrlDetails, SRC_LAST_MODIFIED_MILLIS,
};

/// Largest page B2 accepts for file listings
pub const MAX_FILE_COUNT: u32 = 1000;

/// Page size used by the plain listing calls
pub const DEFAULT_FILE_COUNT: u32 = 100;

/// Content type that lets B2 pick the MIME type from the file name
pub const AUTO_CONTENT_TYPE: &str = "b2/x-auto";

/// Header prefix for caller-supplied file metadata (compared case-insensitively)
pub const FILE_INFO_HEADER_PREFIX: &str = "x-bz-info-";

const FILE_ID_HEADER: &str = "x-bz-file-id";
const FILE_NAME_HEADER: &str = "x-bz-file-name";
const CONTENT_SHA1_HEADER: &str = "x-bz-content-sha1";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileIdRequest<'a> {
    file_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteFileVersionRequest<'a> {
    file_name: &'a str,
    file_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetUploadUrlRequest<'a> {
    bucket_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HideFileRequest<'a> {
    bucket_id: &'a str,
    file_name: &'a str,
}

/// Request body for b2_list_file_names and b2_list_file_versions
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListFilesRequest<'a> {
    bucket_id: &'a str,
    start_file_name: &'a str,
    max_file_count: u32,
}

/// Reject page sizes outside `[1, MAX_FILE_COUNT]`
fn validate_max_file_count(max_file_count: u32) -> Result<()> {
    if (1..=MAX_FILE_COUNT).contains(&max_file_count) {
        Ok(())
    } else {
        Err(B2Error::InvalidArgument(format!(
            "maxFileCount must be between 1 and {}, got {}",
            MAX_FILE_COUNT, max_file_count
        )))
    }
}

/// Hex SHA-1 of the given content, as expected in X-Bz-Content-Sha1
pub fn content_sha1(content: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Percent-encode each segment of a file name, keeping `/` separators
fn encode_file_path(file_name: &str) -> String {
    file_name
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// Path of a file under the download URL, with the bucket name and every
/// file name segment percent-encoded
fn download_path(bucket_name: &str, file_name: &str) -> String {
    format!(
        "/file/{}/{}",
        urlencoding::encode(bucket_name),
        encode_file_path(file_name)
    )
}

/// Milliseconds since the epoch, or None for times before it
fn millis_since_epoch(time: SystemTime) -> Option<u128> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_millis())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Build a FileInfo from download response headers.
///
/// `X-Bz-Info-*` headers are matched case-insensitively and stored under the
/// header name as received. When several values share a name, the first wins.
pub fn file_info_from_headers(headers: &HeaderMap, body_len: usize) -> FileInfo {
    let content_length = header_str(headers, CONTENT_LENGTH.as_str())
        .parse::<u64>()
        .unwrap_or(body_len as u64);

    let raw_name = header_str(headers, FILE_NAME_HEADER);
    let file_name = urlencoding::decode(raw_name)
        .map(|name| name.into_owned())
        .unwrap_or_else(|_| raw_name.to_string());

    let mut info = FileInfo {
        content_length,
        content_type: header_str(headers, CONTENT_TYPE.as_str()).to_string(),
        file_id: header_str(headers, FILE_ID_HEADER).to_string(),
        file_name,
        content_sha1: header_str(headers, CONTENT_SHA1_HEADER).to_string(),
        ..FileInfo::default()
    };

    for (name, value) in headers {
        let key = name.as_str();
        let is_file_info = key
            .get(..FILE_INFO_HEADER_PREFIX.len())
            .map_or(false, |p| p.eq_ignore_ascii_case(FILE_INFO_HEADER_PREFIX));
        if !is_file_info || info.info.contains_key(key) {
            continue;
        }
        if let Ok(value) = value.to_str() {
            info.info.insert(key.to_string(), value.to_string());
        }
    }

    info
}

impl B2Client {
    /// Permanently delete one version of a file
    pub async fn delete_file_version(&self, file_name: &str, file_id: &str) -> Result<FileVersion> {
        info!(file = file_name, file_id = file_id, "Deleting file version from B2");

        let request = DeleteFileVersionRequest { file_name, file_id };
        self.call(Endpoint::DeleteFileVersion, &request).await
    }

    /// Download a file by its ID
    ///
    /// # Returns
    /// File content and the FileInfo carried in the response headers
    pub async fn download_file_by_id(&self, file_id: &str) -> Result<(Vec<u8>, FileInfo)> {
        let url = self.download_url(Endpoint::DownloadFileById.path());
        debug!(file_id = file_id, url = %url, "Downloading file by ID from B2");

        let request = self.post_json(&url, &FileIdRequest { file_id })?;
        let (data, headers) = request_bytes(request).await?;
        let info = file_info_from_headers(&headers, data.len());

        debug!(file_id = file_id, size = data.len(), "Downloaded file from B2");
        Ok((data, info))
    }

    /// Download the latest version of a file by bucket and file name
    pub async fn download_file_by_name(
        &self,
        bucket_name: &str,
        file_name: &str,
    ) -> Result<(Vec<u8>, FileInfo)> {
        let url = self.download_url(&download_path(bucket_name, file_name));
        debug!(file = file_name, url = %url, "Downloading file by name from B2");

        let request = self
            .http_client()
            .get(&url)
            .header(AUTHORIZATION, &self.session().authorization_token);
        let (data, headers) = request_bytes(request).await?;
        let info = file_info_from_headers(&headers, data.len());

        debug!(file = file_name, size = data.len(), "Downloaded file from B2");
        Ok((data, info))
    }

    /// Get the stored information of a file version
    pub async fn get_file_info(&self, file_id: &str) -> Result<FileInfo> {
        self.call(Endpoint::GetFileInfo, &FileIdRequest { file_id })
            .await
    }

    /// Get an upload URL and token for a bucket
    pub async fn get_upload_url(&self, bucket_id: &str) -> Result<UploadUrlDetails> {
        let details: UploadUrlDetails = self
            .call(Endpoint::GetUploadUrl, &GetUploadUrlRequest { bucket_id })
            .await?;

        debug!(url = %details.upload_url, "Got B2 upload URL");
        Ok(details)
    }

    /// Hide a file name so it no longer shows up in b2_list_file_names
    pub async fn hide_file(&self, bucket_id: &str, file_name: &str) -> Result<File> {
        info!(file = file_name, bucket_id = bucket_id, "Hiding file in B2");

        self.call(Endpoint::HideFile, &HideFileRequest { bucket_id, file_name })
            .await
    }

    /// List the first page of file names in a bucket
    pub async fn list_file_names(&self, bucket_id: &str) -> Result<FileCollection> {
        self.list_file_names_with_count_and_offset(bucket_id, "", DEFAULT_FILE_COUNT)
            .await
    }

    /// List file names starting at `start_file_name`
    ///
    /// # Arguments
    /// * `bucket_id` - Bucket to list
    /// * `start_file_name` - First name to return; empty starts at the beginning
    /// * `max_file_count` - Page size, 1 to 1000
    pub async fn list_file_names_with_count_and_offset(
        &self,
        bucket_id: &str,
        start_file_name: &str,
        max_file_count: u32,
    ) -> Result<FileCollection> {
        self.list_files(
            Endpoint::ListFileNames,
            bucket_id,
            start_file_name,
            max_file_count,
        )
        .await
    }

    /// List the first page of file versions in a bucket
    pub async fn list_file_versions(&self, bucket_id: &str) -> Result<FileCollection> {
        self.list_file_versions_with_count_and_offset(bucket_id, "", DEFAULT_FILE_COUNT)
            .await
    }

    /// List file versions starting at `start_file_name`
    pub async fn list_file_versions_with_count_and_offset(
        &self,
        bucket_id: &str,
        start_file_name: &str,
        max_file_count: u32,
    ) -> Result<FileCollection> {
        self.list_files(
            Endpoint::ListFileVersions,
            bucket_id,
            start_file_name,
            max_file_count,
        )
        .await
    }

    async fn list_files(
        &self,
        endpoint: Endpoint,
        bucket_id: &str,
        start_file_name: &str,
        max_file_count: u32,
    ) -> Result<FileCollection> {
        validate_max_file_count(max_file_count)?;

        debug!(
            endpoint = endpoint.name(),
            bucket_id = bucket_id,
            start = start_file_name,
            max = max_file_count,
            "Listing files from B2"
        );

        let request = ListFilesRequest {
            bucket_id,
            start_file_name,
            max_file_count,
        };
        let page: FileCollection = self.call(endpoint, &request).await?;

        debug!(count = page.files.len(), next = ?page.next_file_name, "Listed files from B2");
        Ok(page)
    }

    /// Upload a local file, named after its base name
    pub async fn upload_file(
        &self,
        upload_url: &str,
        upload_auth_token: &str,
        file_path: impl AsRef<Path>,
    ) -> Result<FileInfo> {
        let file_path = file_path.as_ref();
        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                B2Error::InvalidArgument(format!(
                    "cannot derive a file name from {}",
                    file_path.display()
                ))
            })?;

        self.upload_file_with_file_name(upload_url, upload_auth_token, file_path, file_name)
            .await
    }

    /// Upload a local file under the given B2 file name
    ///
    /// Reads the whole file, computes its SHA-1 and records its modification
    /// time as `src_last_modified_millis` metadata. A modification time before
    /// the Unix epoch is not recorded.
    pub async fn upload_file_with_file_name(
        &self,
        upload_url: &str,
        upload_auth_token: &str,
        file_path: impl AsRef<Path>,
        file_name: &str,
    ) -> Result<FileInfo> {
        let file_path = file_path.as_ref();

        let metadata = tokio::fs::metadata(file_path).await?;
        let last_modified_millis = millis_since_epoch(metadata.modified()?);

        let content = tokio::fs::read(file_path).await?;
        let hash = content_sha1(&content);

        info!(
            file = file_name,
            path = %file_path.display(),
            size = content.len(),
            "Uploading file to B2"
        );

        let mut request = self
            .http_client()
            .post(upload_url)
            .header(AUTHORIZATION, upload_auth_token)
            .header("X-Bz-File-Name", urlencoding::encode(file_name).into_owned())
            .header(CONTENT_TYPE, AUTO_CONTENT_TYPE)
            .header("X-Bz-Content-Sha1", &hash);

        if let Some(millis) = last_modified_millis {
            request = request.header(
                format!("X-Bz-Info-{}", SRC_LAST_MODIFIED_MILLIS),
                millis.to_string(),
            );
        }

        let request = request.body(content);

        let uploaded: FileInfo = request_json(request).await?;

        info!(file = file_name, file_id = %uploaded.file_id, "File uploaded to B2");
        Ok(uploaded)
    }

    /// Upload a local file using details from [`B2Client::get_upload_url`]
    pub async fn upload_to(
        &self,
        upload: &UploadUrlDetails,
        file_path: impl AsRef<Path>,
    ) -> Result<FileInfo> {
        self.upload_file(&upload.upload_url, &upload.authorization_token, file_path)
            .await
    }
}
