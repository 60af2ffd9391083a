//! B2 API types
//!
//! Value records mirroring the JSON shapes of B2 API requests and responses.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::errors::B2Error;

/// Metadata key B2 tools use for the source file's modification time
pub const SRC_LAST_MODIFIED_MILLIS: &str = "src_last_modified_millis";

/// Deserialize a number that might be encoded as a string or null.
/// B2 API sometimes returns numeric fields as strings (e.g. "1536964279000")
/// and may return null for folder/hide entries.
fn deserialize_flexible_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de;

    struct FlexibleU64Visitor;

    impl<'de> de::Visitor<'de> for FlexibleU64Visitor {
        type Value = u64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a u64, a string containing a u64, or null")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<u64, E> {
            u64::try_from(value).map_err(|_| de::Error::custom("negative value for u64"))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<u64, E> {
            value.parse::<u64>().map_err(de::Error::custom)
        }

        fn visit_none<E: de::Error>(self) -> Result<u64, E> {
            Ok(0)
        }

        fn visit_unit<E: de::Error>(self) -> Result<u64, E> {
            Ok(0)
        }
    }

    deserializer.deserialize_any(FlexibleU64Visitor)
}

/// Account credentials used to authorize with B2
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account ID or application key ID
    pub account_id: String,
    /// Application key
    pub application_key: String,
}

impl Credentials {
    pub fn new(account_id: impl Into<String>, application_key: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            application_key: application_key.into(),
        }
    }
}

/// Authorized session returned by b2_authorize_account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub account_id: String,
    /// Base URL for all API calls except downloads
    pub api_url: String,
    /// Token sent in the Authorization header of every API call
    pub authorization_token: String,
    /// Base URL for file downloads
    pub download_url: String,
}

/// Error document returned by B2 for any non-success response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub status: u16,
}

/// Bucket visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BucketType {
    #[serde(rename = "allPrivate")]
    AllPrivate,
    #[serde(rename = "allPublic")]
    AllPublic,
}

impl BucketType {
    pub fn as_str(self) -> &'static str {
        match self {
            BucketType::AllPrivate => "allPrivate",
            BucketType::AllPublic => "allPublic",
        }
    }
}

impl fmt::Display for BucketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for BucketType {
    type Err = B2Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allPrivate" => Ok(BucketType::AllPrivate),
            "allPublic" => Ok(BucketType::AllPublic),
            other => Err(B2Error::InvalidArgument(format!(
                "unknown bucket type '{}' (expected allPrivate or allPublic)",
                other
            ))),
        }
    }
}

/// Bucket snapshot from B2
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub bucket_id: String,
    pub account_id: String,
    pub bucket_name: String,
    /// Type as reported by B2; may be a value other than the two visibilities, e.g. "snapshot"
    pub bucket_type: String,
}

impl Bucket {
    /// Visibility of the bucket, if it is a plain private or public bucket
    pub fn visibility(&self) -> Option<BucketType> {
        self.bucket_type.parse().ok()
    }
}

/// Response from b2_list_buckets API
#[derive(Debug, Deserialize)]
pub(crate) struct ListBucketsResponse {
    pub buckets: Vec<Bucket>,
}

/// What a file entry represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    /// A visible, uploaded file version
    Upload,
    /// A hide marker; the file name is logically deleted
    Hide,
    /// A large file upload that has been started but not finished
    Start,
    /// A virtual folder returned when listing with a delimiter
    Folder,
}

/// File entry from listings and from b2_hide_file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    /// File ID (null for folder entries)
    #[serde(default)]
    pub file_id: Option<String>,
    pub file_name: String,
    /// Upload timestamp in milliseconds since epoch
    #[serde(default, deserialize_with = "deserialize_flexible_u64")]
    pub upload_timestamp: u64,
    pub action: FileAction,
    /// Size in bytes (0 for hide markers and folders)
    #[serde(default, alias = "contentLength", deserialize_with = "deserialize_flexible_u64")]
    pub size: u64,
}

impl File {
    pub fn is_hidden(&self) -> bool {
        self.action == FileAction::Hide
    }
}

/// One page of b2_list_file_names or b2_list_file_versions
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCollection {
    pub files: Vec<File>,
    /// Start name for the next page
    #[serde(default)]
    pub next_file_name: Option<String>,
    /// Start file ID for the next page of a versions listing
    #[serde(default)]
    pub next_file_id: Option<String>,
}

impl FileCollection {
    /// Whether B2 returned a cursor for another page
    pub fn has_more(&self) -> bool {
        self.next_file_name.as_deref().map_or(false, |n| !n.is_empty())
    }
}

/// Identifier pair of a single file version
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileVersion {
    pub file_id: String,
    pub file_name: String,
}

/// Detailed file information, from b2_get_file_info, uploads and download headers
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileInfo {
    #[serde(deserialize_with = "deserialize_flexible_u64")]
    pub content_length: u64,
    pub content_type: String,
    pub file_id: String,
    pub file_name: String,
    pub content_sha1: String,
    pub bucket_id: String,
    pub account_id: String,
    /// Caller-supplied metadata. Keys from download headers are the full
    /// header names in lowercase (e.g. `x-bz-info-author`); use
    /// [`FileInfo::metadata`] for case-insensitive lookup.
    #[serde(rename = "fileInfo")]
    pub info: HashMap<String, String>,
}

impl FileInfo {
    /// Look up a metadata value, ignoring case.
    ///
    /// `key` may be the bare name (`author`) or the header form
    /// (`X-Bz-Info-author`); both match either storage form.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        let bare = strip_info_prefix(key);
        self.info
            .iter()
            .find(|(k, _)| strip_info_prefix(k).eq_ignore_ascii_case(bare))
            .map(|(_, v)| v.as_str())
    }

    /// Source modification time recorded at upload, if present
    pub fn src_last_modified_millis(&self) -> Option<u64> {
        self.metadata(SRC_LAST_MODIFIED_MILLIS)
            .and_then(|v| v.parse().ok())
    }
}

/// Drop a leading `x-bz-info-` (any case) from a metadata key
fn strip_info_prefix(key: &str) -> &str {
    const PREFIX: &str = "x-bz-info-";
    match key.get(..PREFIX.len()) {
        Some(p) if p.eq_ignore_ascii_case(PREFIX) => &key[PREFIX.len()..],
        _ => key,
    }
}

/// Upload URL and token from b2_get_upload_url
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlDetails {
    pub bucket_id: String,
    pub upload_url: String,
    pub authorization_token: String,
}
