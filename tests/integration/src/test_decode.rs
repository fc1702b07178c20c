//! Response decoding integration tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use http::StatusCode;
    use s3lite_client::ClientError;
    use s3lite_model::Record;
    use tokio_util::sync::CancellationToken;

    use crate::{Script, ScriptedTransport, scripted_client};

    #[tokio::test]
    async fn test_should_append_completed_records_before_decode_error() {
        let transport = Arc::new(ScriptedTransport::new().ok(
            "<ListBucketResult><Name>photos</Name>\
             <CommonPrefixes><Prefix>2023/</Prefix></CommonPrefixes>\
             <Contents><Key>a.jpg</Key></Contents>\
             <Contents><Key>b.jpg</Key></Contentz>",
        ));
        let client = scripted_client(transport);
        let mut session = client.list_objects("photos");

        let err = session
            .load(&CancellationToken::new())
            .await
            .expect_err("decode error");

        assert!(matches!(err, ClientError::Decode { appended: 2, .. }));
        let keys: Vec<&str> = session.collection().iter().map(Record::key).collect();
        assert_eq!(keys, vec!["2023/", "a.jpg"]);
    }

    #[tokio::test]
    async fn test_should_surface_service_error() {
        let transport = Arc::new(ScriptedTransport::new().then(Script::Respond(
            StatusCode::FORBIDDEN,
            Bytes::from_static(
                b"<Error><Code>SignatureDoesNotMatch</Code>\
                  <Message>The request signature we calculated does not match</Message></Error>",
            ),
        )));
        let client = scripted_client(transport);
        let mut session = client.list_buckets();

        let err = session
            .load(&CancellationToken::new())
            .await
            .expect_err("service error");

        match err {
            ClientError::Service {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 403);
                assert_eq!(code, "SignatureDoesNotMatch");
                assert!(message.starts_with("The request signature"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(session.collection().is_empty());
    }

    #[tokio::test]
    async fn test_should_tolerate_unknown_elements() {
        let transport = Arc::new(ScriptedTransport::new().ok(
            "<ListBucketResult><Name>photos</Name><EncodingType>url</EncodingType>\
             <KeyCount>1</KeyCount><Contents><Key>a.jpg</Key>\
             <ChecksumAlgorithm>CRC32</ChecksumAlgorithm><Size>12</Size></Contents>\
             </ListBucketResult>",
        ));
        let client = scripted_client(transport);
        let mut session = client.list_objects("photos");

        session
            .load(&CancellationToken::new())
            .await
            .expect("list objects");

        let Some(Record::Object(object)) = session.collection().at(0) else {
            panic!("expected object record");
        };
        assert_eq!(object.key, "a.jpg");
        assert_eq!(object.size, 12);
    }
}
