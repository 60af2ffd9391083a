//! Bucket operations

use serde::Serialize;
use tracing::{debug, info};

use super::client::B2Client;
use super::endpoints::Endpoint;
use super::errors::Result;
use super::types::{Bucket, BucketType, ListBucketsResponse};

/// Request body for b2_list_buckets API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListBucketsRequest<'a> {
    account_id: &'a str,
}

/// Request body for b2_create_bucket API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBucketRequest<'a> {
    account_id: &'a str,
    bucket_name: &'a str,
    bucket_type: BucketType,
}

/// Request body for b2_delete_bucket API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteBucketRequest<'a> {
    account_id: &'a str,
    bucket_id: &'a str,
}

/// Request body for b2_update_bucket API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBucketRequest<'a> {
    account_id: &'a str,
    bucket_id: &'a str,
    bucket_type: BucketType,
}

impl B2Client {
    /// List all buckets of the account, in the order B2 returns them
    pub async fn list_buckets(&self) -> Result<Vec<Bucket>> {
        let request = ListBucketsRequest {
            account_id: self.account_id(),
        };

        let response: ListBucketsResponse = self.call(Endpoint::ListBuckets, &request).await?;

        debug!(count = response.buckets.len(), "Listed buckets from B2");
        Ok(response.buckets)
    }

    /// Create a new bucket
    ///
    /// # Arguments
    /// * `bucket_name` - Globally unique bucket name
    /// * `bucket_type` - Private or public visibility
    pub async fn create_bucket(&self, bucket_name: &str, bucket_type: BucketType) -> Result<Bucket> {
        info!(bucket = bucket_name, bucket_type = %bucket_type, "Creating bucket in B2");

        let request = CreateBucketRequest {
            account_id: self.account_id(),
            bucket_name,
            bucket_type,
        };

        self.call(Endpoint::CreateBucket, &request).await
    }

    /// Delete an empty bucket, returning its last snapshot
    pub async fn delete_bucket(&self, bucket_id: &str) -> Result<Bucket> {
        info!(bucket_id = bucket_id, "Deleting bucket from B2");

        let request = DeleteBucketRequest {
            account_id: self.account_id(),
            bucket_id,
        };

        self.call(Endpoint::DeleteBucket, &request).await
    }

    /// Change a bucket's visibility
    pub async fn update_bucket(&self, bucket_id: &str, bucket_type: BucketType) -> Result<Bucket> {
        info!(bucket_id = bucket_id, bucket_type = %bucket_type, "Updating bucket in B2");

        let request = UpdateBucketRequest {
            account_id: self.account_id(),
            bucket_id,
            bucket_type,
        };

        self.call(Endpoint::UpdateBucket, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn bucket_json(id: &str, name: &str, bucket_type: &str) -> serde_json::Value {
        json!({
            "bucketId": id,
            "accountId": "a",
            "bucketName": name,
            "bucketType": bucket_type
        })
    }

    #[test]
    fn test_create_request_serialization() {
        let request = CreateBucketRequest {
            account_id: "a",
            bucket_name: "test",
            bucket_type: BucketType::AllPrivate,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"accountId":"a","bucketName":"test","bucketType":"allPrivate"}"#
        );
    }

    #[tokio::test]
    async fn test_list_buckets_preserves_order() {
        let server = MockServer::start_async().await;

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/b2api/v1/b2_list_buckets")
                    .header("authorization", "t")
                    .json_body(json!({"accountId": "a"}));
                then.status(200).json_body(json!({
                    "buckets": [
                        bucket_json("b1", "zeta", "allPublic"),
                        bucket_json("b2", "alpha", "allPrivate"),
                    ]
                }));
            })
            .await;

        let client = B2Client::for_tests(&server.base_url());
        let buckets = client.list_buckets().await.unwrap();

        mock.assert_async().await;
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].bucket_name, "zeta");
        assert_eq!(buckets[0].visibility(), Some(BucketType::AllPublic));
        assert_eq!(buckets[1].bucket_name, "alpha");
        assert_eq!(buckets[1].visibility(), Some(BucketType::AllPrivate));
    }

    #[tokio::test]
    async fn test_list_buckets_keeps_snapshot_buckets() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(POST).path("/b2api/v1/b2_list_buckets");
                then.status(200).json_body(json!({
                    "buckets": [
                        bucket_json("b1", "photos", "allPrivate"),
                        bucket_json("b2", "photos-snapshot", "snapshot"),
                    ]
                }));
            })
            .await;

        let client = B2Client::for_tests(&server.base_url());
        let buckets = client.list_buckets().await.unwrap();

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].visibility(), Some(BucketType::AllPrivate));
        assert_eq!(buckets[1].bucket_name, "photos-snapshot");
        assert_eq!(buckets[1].bucket_type, "snapshot");
        assert_eq!(buckets[1].visibility(), None);
    }

    #[tokio::test]
    async fn test_create_bucket() {
        let server = MockServer::start_async().await;

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/b2api/v1/b2_create_bucket")
                    .header("authorization", "t")
                    .json_body(json!({
                        "accountId": "a",
                        "bucketName": "test",
                        "bucketType": "allPrivate"
                    }));
                then.status(200)
                    .json_body(bucket_json("4a48fe8875c6214145260818", "test", "allPrivate"));
            })
            .await;

        let client = B2Client::for_tests(&server.base_url());
        let bucket = client
            .create_bucket("test", BucketType::AllPrivate)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            bucket,
            Bucket {
                bucket_id: "4a48fe8875c6214145260818".to_string(),
                account_id: "a".to_string(),
                bucket_name: "test".to_string(),
                bucket_type: "allPrivate".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_create_bucket_duplicate_name() {
        let server = MockServer::start_async().await;

        server
            .mock_async(|when, then| {
                when.method(POST).path("/b2api/v1/b2_create_bucket");
                then.status(400).json_body(json!({
                    "code": "duplicate_bucket_name",
                    "message": "Bucket name is already in use.",
                    "status": 400
                }));
            })
            .await;

        let client = B2Client::for_tests(&server.base_url());
        let err = client
            .create_bucket("taken", BucketType::AllPublic)
            .await
            .unwrap_err();

        assert_eq!(err.api_error().unwrap().code, "duplicate_bucket_name");
        assert!(!err.is_local());
    }

    #[tokio::test]
    async fn test_delete_bucket() {
        let server = MockServer::start_async().await;

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/b2api/v1/b2_delete_bucket")
                    .json_body(json!({"accountId": "a", "bucketId": "b1"}));
                then.status(200).json_body(bucket_json("b1", "old", "allPrivate"));
            })
            .await;

        let client = B2Client::for_tests(&server.base_url());
        let bucket = client.delete_bucket("b1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(bucket.bucket_id, "b1");
        assert_eq!(bucket.bucket_name, "old");
    }

    #[tokio::test]
    async fn test_update_bucket() {
        let server = MockServer::start_async().await;

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/b2api/v1/b2_update_bucket")
                    .json_body(json!({
                        "accountId": "a",
                        "bucketId": "b1",
                        "bucketType": "allPublic"
                    }));
                then.status(200).json_body(bucket_json("b1", "photos", "allPublic"));
            })
            .await;

        let client = B2Client::for_tests(&server.base_url());
        let bucket = client
            .update_bucket("b1", BucketType::AllPublic)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(bucket.visibility(), Some(BucketType::AllPublic));
    }
}
