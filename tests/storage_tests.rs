use honor_guard_site::storage::{MockStorageService, S3StorageClient, StorageService, StoredObject, sanitize_key};

#[cfg(test)]
mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let mock = MockStorageService::new();
        let key = "gallery/desfile.mp4";
        let url = mock.get_presigned_upload_url(key, "video/mp4").await.unwrap();

        assert!(url.contains("signature=fake"));
        assert!(url.contains(key));
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockStorageService::new_failing();
        assert!(mock.get_presigned_upload_url("gallery/a.mp4", "video/mp4").await.is_err());
        assert!(mock.upload_object("site/logo.png", "image/png", vec![1, 2, 3]).await.is_err());
        assert!(mock.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_mock_sanitization() {
        let mock = MockStorageService::new();
        let url = mock.get_presigned_upload_url("../../etc/passwd", "text/plain").await.unwrap();

        assert!(!url.contains(".."));
        assert!(url.contains("etc/passwd"));
    }

    #[tokio::test]
    async fn test_mock_upload_is_recorded() {
        let mock = MockStorageService::new();
        let url = mock.upload_object("site/logo-1.png", "image/png", vec![0; 42]).await.unwrap();

        assert_eq!(url, "http://localhost:9000/mock-bucket/site/logo-1.png");
        assert_eq!(
            mock.uploads(),
            vec![StoredObject {
                key: "site/logo-1.png".to_string(),
                content_type: "image/png".to_string(),
                size: 42,
            }]
        );
    }

    #[tokio::test]
    async fn test_mock_clones_share_uploads() {
        let mock = MockStorageService::new();
        let handle = mock.clone();
        mock.upload_object("site/favicon.ico", "image/x-icon", vec![1]).await.unwrap();
        assert_eq!(handle.uploads().len(), 1);
    }
}

#[cfg(test)]
mod s3_tests {
    use super::*;

    async fn client() -> S3StorageClient {
        S3StorageClient::new(
            "http://localhost:9000",
            "us-east-1",
            "testkey",
            "testsecret",
            "testbucket",
            "http://cdn.local/testbucket/",
        )
        .await
    }

    #[tokio::test]
    async fn test_s3_public_url_trims_base_and_sanitizes() {
        let client = client().await;
        assert_eq!(client.public_url("gallery/a.jpg"), "http://cdn.local/testbucket/gallery/a.jpg");
        assert_eq!(client.public_url("/../gallery//a.jpg"), "http://cdn.local/testbucket/gallery/a.jpg");
    }

    #[tokio::test]
    async fn test_s3_presign_is_offline_and_path_style() {
        let client = client().await;
        let url = client.get_presigned_upload_url("gallery/b.png", "image/png").await.unwrap();

        assert!(url.starts_with("http://localhost:9000/testbucket/gallery/b.png"));
        assert!(url.contains("X-Amz-Signature"));
    }
}

#[test]
fn test_sanitize_key_drops_traversal_segments() {
    assert_eq!(sanitize_key("site/./logo.png"), "site/logo.png");
    assert_eq!(sanitize_key("../../etc/passwd"), "etc/passwd");
    assert_eq!(sanitize_key("//gallery///x.jpg"), "gallery/x.jpg");
}
