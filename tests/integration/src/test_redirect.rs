//! Redirect-following integration tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::header::{AUTHORIZATION, DATE};
    use s3lite_auth::sigv2::compute_signature;
    use s3lite_client::{
        CallOutcome, ClientError, DriverEvent, DriverState, PaginatedCollection, SendRequest,
    };
    use s3lite_core::Verb;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::{Script, ScriptedTransport, TEST_SECRET_KEY, parse_authorization, scripted_client};

    const REGIONAL: &str = "https://photos.s3-eu-west-1.amazonaws.com/";

    const LISTING: &str = "<ListBucketResult><Name>photos</Name><IsTruncated>false</IsTruncated>\
        <Contents><Key>a.jpg</Key></Contents><Contents><Key>b.jpg</Key></Contents>\
        </ListBucketResult>";

    #[tokio::test]
    async fn test_should_resign_once_for_redirect_target_before_appending() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .then(Script::Redirect(REGIONAL.to_owned()))
                .ok(LISTING),
        );
        let client = scripted_client(transport.clone());
        let mut session = client.list_objects("photos");
        let mut changes = session.subscribe();
        let mut events = session.subscribe_events();

        let outcome = session
            .load(&CancellationToken::new())
            .await
            .expect("list objects");

        let CallOutcome::Completed(summary) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(summary.redirects, 1);

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].uri.to_string(), "https://photos.s3.amazonaws.com/");
        assert_eq!(requests[1].uri.to_string(), REGIONAL);
        assert_eq!(requests[1].verb, Verb::Get);
        assert!(requests[1].headers.contains_key(AUTHORIZATION));

        // A single append, after the redirected response.
        let change = changes.try_recv().expect("change");
        assert_eq!(change.range, 0..2);
        assert!(changes.try_recv().is_err());

        let mut states = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let DriverEvent::StateChanged(state) = event {
                states.push(state);
            }
        }
        assert_eq!(
            states,
            vec![
                DriverState::Signing,
                DriverState::InFlight,
                DriverState::Redirecting,
                DriverState::Signing,
                DriverState::InFlight,
                DriverState::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_should_preserve_verb_and_body_across_redirect() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .then(Script::Redirect(
                    "https://bucket.s3-eu-west-1.amazonaws.com/hello.txt".to_owned(),
                ))
                .ok(""),
        );
        let client = scripted_client(transport.clone());
        let mut collection = PaginatedCollection::new();

        client
            .driver()
            .sign_and_send(
                SendRequest::builder()
                    .verb(Verb::Put)
                    .url(
                        "https://bucket.s3.amazonaws.com/hello.txt"
                            .parse()
                            .expect("url"),
                    )
                    .body("hello world")
                    .content_type("text/plain")
                    .build(),
                &mut collection,
                &CancellationToken::new(),
            )
            .await
            .expect("put");

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        let redirected = &requests[1];
        assert_eq!(redirected.verb, Verb::Put);
        assert_eq!(redirected.body, "hello world");

        let date = redirected
            .headers
            .get(DATE)
            .and_then(|v| v.to_str().ok())
            .expect("date");
        let (_, signature) = parse_authorization(
            redirected
                .headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .expect("authorization"),
        )
        .expect("parse");
        let string_to_sign = format!(
            "PUT\n5eb63bbbe01eeed093cb22bb8f5acdc3\ntext/plain\n{date}\n/bucket/hello.txt"
        );
        assert_eq!(signature, compute_signature(TEST_SECRET_KEY, &string_to_sign));
        assert!(collection.is_empty());
    }

    #[tokio::test]
    async fn test_should_fail_redirect_loop_without_appending() {
        let mut script = ScriptedTransport::new();
        for _ in 0..10 {
            script = script.then(Script::Redirect(REGIONAL.to_owned()));
        }
        let transport = Arc::new(script);
        let client = scripted_client(transport.clone());
        let mut session = client.list_objects("photos");

        let err = session
            .load(&CancellationToken::new())
            .await
            .expect_err("redirect loop");

        assert!(matches!(err, ClientError::RedirectLoop { hops: 5 }));
        assert_eq!(transport.request_count(), 6);
        assert!(session.collection().is_empty());
    }

    #[tokio::test]
    async fn test_should_report_failed_state_for_transport_error() {
        let transport = Arc::new(ScriptedTransport::new().then(Script::Fail(
            s3lite_client::TransportError::Connect("connection refused".to_owned()),
        )));
        let client = scripted_client(transport.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut collection = PaginatedCollection::new();

        let err = client
            .driver()
            .sign_and_send(
                SendRequest::builder()
                    .verb(Verb::Get)
                    .url(REGIONAL.parse().expect("url"))
                    .events(tx)
                    .build(),
                &mut collection,
                &CancellationToken::new(),
            )
            .await
            .expect_err("transport error");

        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(transport.request_count(), 1);

        let mut last_state = None;
        while let Ok(event) = rx.try_recv() {
            if let DriverEvent::StateChanged(state) = event {
                last_state = Some(state);
            }
        }
        assert_eq!(last_state, Some(DriverState::Failed));
    }
}
