use asset_manager::{
    models::UploadKind,
    storage::{MockStorageService, S3StorageClient, StorageService, object_key, sanitize_key},
};
use uuid::Uuid;

#[cfg(test)]
mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let mock = MockStorageService::new();
        let key = "documents/report.pdf";
        let url = mock
            .presigned_upload_url(key, "application/pdf")
            .await
            .unwrap();

        assert!(url.contains("signature=fake"));
        assert!(url.contains(key));

        let download = mock.presigned_download_url(key).await.unwrap();
        assert!(download.contains("op=get"));
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockStorageService::new_failing();
        assert!(mock.presigned_upload_url("documents/a.mp4", "video/mp4").await.is_err());
        assert!(mock.presigned_download_url("documents/a.mp4").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_sanitization() {
        let mock = MockStorageService::new();
        let url = mock
            .presigned_upload_url("../../etc/passwd", "text/plain")
            .await
            .unwrap();
        assert!(!url.contains(".."));
    }
}

mod key_tests {
    use super::*;

    #[test]
    fn test_sanitize_key_drops_traversal_segments() {
        assert_eq!(sanitize_key("../../etc/passwd"), "etc/passwd");
        assert_eq!(sanitize_key("/documents//./a.pdf"), "documents/a.pdf");
    }

    #[test]
    fn test_object_key_keeps_only_the_extension() {
        let key = object_key(UploadKind::Document, "Quarterly Report.PDF");
        let rest = key.strip_prefix("documents/").unwrap();
        let (id, ext) = rest.split_once('.').unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(ext, "pdf");

        let bare = object_key(UploadKind::DigitalAsset, "README");
        let id = bare.strip_prefix("digital-assets/").unwrap();
        assert!(Uuid::parse_str(id).is_ok());

        // Extensions that are not plain alphanumerics are dropped.
        let odd = object_key(UploadKind::Document, "x.p$f");
        assert!(!odd.contains('$'));
    }
}

#[cfg(test)]
mod s3_tests {
    use super::*;

    async fn local_client() -> S3StorageClient {
        S3StorageClient::new(
            "http://localhost:9000",
            "us-east-1",
            "testkey",
            "testsecret",
            "testbucket",
        )
        .await
    }

    #[tokio::test]
    async fn test_s3_presigned_url_format() {
        let client = local_client().await;
        let key = format!("documents/{}.pdf", Uuid::new_v4());

        // Presigning is local; no request reaches the endpoint.
        let url = client
            .presigned_upload_url(&key, "application/pdf")
            .await
            .unwrap();
        assert!(url.contains("localhost:9000"));
        assert!(url.contains("testbucket"));
        assert!(url.contains(&key));

        let download = client.presigned_download_url(&key).await.unwrap();
        assert!(download.contains(&key));
        assert!(download.contains("X-Amz-Signature"));
    }
}
