use chorus_http::{Auth, HttpClient, HttpError, OAuth1Keys, RequestOpts};
use futures::StreamExt;
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{basic_auth, bearer_token, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn retries_server_errors_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/items"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/items"))
        .and(query_param("max_results", "5"))
        .and(bearer_token("abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap().with_retries(1);
    let got: Value = client
        .get_json(
            "v1/items",
            RequestOpts {
                auth: Some(Auth::Bearer("abc")),
                query: Some(vec![("max_results", "5".into())]),
                ..Default::default()
            },
        )
        .await
        .expect("second attempt succeeds");

    assert_eq!(got, json!({"ok": true}));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/missing"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"errors": [{"detail": "Could not find user"}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap().with_retries(3);
    let err = client
        .get_json::<Value>("v1/missing", RequestOpts::default())
        .await
        .unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
    match err {
        HttpError::Api { message, .. } => assert_eq!(message, "Could not find user"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn posts_forms_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(basic_auth("key", "secret"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "t"})))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let got: Value = client
        .post_form(
            "oauth2/token",
            &[("grant_type", "client_credentials")],
            RequestOpts {
                auth: Some(Auth::Basic {
                    username: "key",
                    password: "secret",
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(got["access_token"], "t");
}

#[tokio::test]
async fn streams_body_line_by_line() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"a\":1}\r\n\r\n{\"b\":2}\n{\"c\":3}"))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let lines: Vec<String> = client
        .get_lines(
            "v1/stream",
            RequestOpts {
                timeout: Some(Duration::from_secs(5)),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .map(|line| line.unwrap())
        .collect()
        .await;

    assert_eq!(lines, vec!["{\"a\":1}", "", "{\"b\":2}", "{\"c\":3}"]);
}

#[tokio::test]
async fn stream_rejections_carry_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/stream"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({"title": "Too Many Connections"})))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let err = match client.get_lines("v1/stream", RequestOpts::default()).await {
        Ok(_) => panic!("expected rejection"),
        Err(err) => err,
    };
    assert_eq!(err.status().map(|s| s.as_u16()), Some(429));
}

#[tokio::test]
async fn oauth1_requests_carry_a_signed_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/users/7/timelines/reverse_chronological"))
        .and(query_param("max_results", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"meta": {"result_count": 0}})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap().with_retries(0);
    let _: Value = client
        .get_json(
            "2/users/7/timelines/reverse_chronological",
            RequestOpts {
                auth: Some(Auth::OAuth1(OAuth1Keys {
                    consumer_key: "ck",
                    consumer_secret: "cs",
                    token: "7-user",
                    token_secret: "ts",
                })),
                query: Some(vec![("max_results", "5".into())]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    let header = received[0]
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(header.starts_with("OAuth "));
    assert!(header.contains("oauth_consumer_key=\"ck\""));
    assert!(header.contains("oauth_token=\"7-user\""));
    assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
    assert!(header.contains("oauth_signature=\""));
    assert!(header.contains("oauth_version=\"1.0\""));
}
