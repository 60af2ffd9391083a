//! B2 API endpoint paths
//!
//! Each endpoint is a fixed path suffix appended to either the session's
//! API URL or its download URL.

/// B2 API endpoints used by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    AuthorizeAccount,
    ListBuckets,
    CreateBucket,
    DeleteBucket,
    UpdateBucket,
    DeleteFileVersion,
    DownloadFileById,
    GetFileInfo,
    GetUploadUrl,
    HideFile,
    ListFileNames,
    ListFileVersions,
}

impl Endpoint {
    /// Path suffix for this endpoint
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::AuthorizeAccount => "/b2api/v1/b2_authorize_account",
            Endpoint::ListBuckets => "/b2api/v1/b2_list_buckets",
            Endpoint::CreateBucket => "/b2api/v1/b2_create_bucket",
            Endpoint::DeleteBucket => "/b2api/v1/b2_delete_bucket",
            Endpoint::UpdateBucket => "/b2api/v1/b2_update_bucket",
            Endpoint::DeleteFileVersion => "/b2api/v1/b2_delete_file_version",
            Endpoint::DownloadFileById => "/b2api/v1/b2_download_file_by_id",
            Endpoint::GetFileInfo => "/b2api/v1/b2_get_file_info",
            Endpoint::GetUploadUrl => "/b2api/v1/b2_get_upload_url",
            Endpoint::HideFile => "/b2api/v1/b2_hide_file",
            Endpoint::ListFileNames => "/b2api/v1/b2_list_file_names",
            Endpoint::ListFileVersions => "/b2api/v1/b2_list_file_versions",
        }
    }

    /// Operation name, used as a log field
    pub fn name(self) -> &'static str {
        self.path().rsplit('/').next().unwrap_or_default()
    }
}
