//! Tests against a real S3 endpoint.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use s3lite_client::{CallOutcome, S3Client};
    use tokio_util::sync::CancellationToken;

    use crate::{ReqwestTransport, init_tracing};

    #[tokio::test]
    #[ignore = "requires live S3 credentials"]
    async fn test_should_list_buckets_from_live_endpoint() {
        init_tracing();
        let transport = Arc::new(ReqwestTransport::new().expect("transport"));
        let client = S3Client::from_env(transport).expect("client");

        let mut session = client.list_buckets();
        let outcome = session
            .load(&CancellationToken::new())
            .await
            .expect("list buckets");

        assert!(matches!(outcome, CallOutcome::Completed(_)));
        assert!(!session.owner().id.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires live S3 credentials"]
    async fn test_should_list_objects_from_live_endpoint() {
        init_tracing();
        let bucket = std::env::var("S3LITE_TEST_BUCKET").expect("S3LITE_TEST_BUCKET");
        let transport = Arc::new(ReqwestTransport::new().expect("transport"));
        let client = S3Client::from_env(transport).expect("client");

        let mut session = client.list_objects(bucket).with_delimiter("/").with_max_keys(100);
        session
            .load_all(&CancellationToken::new())
            .await
            .expect("list objects");

        assert!(!session.is_truncated());
    }
}
