//! Service-level (list buckets) integration tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::header::{AUTHORIZATION, DATE};
    use s3lite_auth::sigv2::compute_signature;
    use s3lite_client::{CallOutcome, CollectionChange, TransportRequest};
    use s3lite_model::Record;
    use tokio_util::sync::CancellationToken;

    use crate::{
        ScriptedTransport, TEST_ACCESS_KEY, TEST_SECRET_KEY, parse_authorization, scripted_client,
    };

    const LIST_BUCKETS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListAllMyBucketsResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Owner>
    <ID>bcaf1ffd86f461ca5fb16fd081034f</ID>
    <DisplayName>webfile</DisplayName>
  </Owner>
  <Buckets>
    <Bucket>
      <Name>quotes</Name>
      <CreationDate>2006-02-03T16:45:09.000Z</CreationDate>
    </Bucket>
    <Bucket>
      <Name>samples</Name>
      <CreationDate>2006-02-03T16:41:58.000Z</CreationDate>
    </Bucket>
  </Buckets>
</ListAllMyBucketsResult>"#;

    fn header<'a>(request: &'a TransportRequest, name: http::HeaderName) -> &'a str {
        request
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_else(|| panic!("missing header"))
    }

    #[tokio::test]
    async fn test_should_list_buckets_in_document_order() {
        let transport = Arc::new(ScriptedTransport::new().ok(LIST_BUCKETS));
        let client = scripted_client(transport.clone());
        let mut session = client.list_buckets();
        let mut changes = session.subscribe();

        let outcome = session
            .load(&CancellationToken::new())
            .await
            .expect("list buckets");

        assert!(matches!(outcome, CallOutcome::Completed(ref s) if s.appended == 2));
        assert_eq!(session.owner().display_name, "webfile");

        let names: Vec<&str> = session.collection().iter().map(Record::key).collect();
        assert_eq!(names, vec!["quotes", "samples"]);
        assert_eq!(
            changes.try_recv().expect("change"),
            CollectionChange {
                range: 0..2,
                count: 2
            }
        );
        assert!(changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_should_send_verifiable_signature() {
        let transport = Arc::new(ScriptedTransport::new().ok(LIST_BUCKETS));
        let client = scripted_client(transport.clone());

        client
            .list_buckets()
            .load(&CancellationToken::new())
            .await
            .expect("list buckets");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.uri.to_string(), "https://s3.amazonaws.com/");

        let date = header(request, DATE);
        let (access_key_id, signature) =
            parse_authorization(header(request, AUTHORIZATION)).expect("authorization");
        assert_eq!(access_key_id, TEST_ACCESS_KEY);

        let expected = compute_signature(TEST_SECRET_KEY, &format!("GET\n\n\n{date}\n/"));
        assert_eq!(signature, expected);
    }
}
