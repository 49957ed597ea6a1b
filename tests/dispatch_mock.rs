//! Dispatcher behaviour against a mock Ark server, for both API modes.

mod common;

use std::time::Duration;

use common::{dispatcher, dispatcher_with_timeout, hanging_server, refused_url, MockServerFixture};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use volcano_llm::error_code::ErrorClass;
use volcano_llm::transport::TransportError;
use volcano_llm::{
    build, ApiMode, Attachment, Error, ErrorKind, NormalizedResult, PromptRequest, UsageInfo,
};

const MODES: [ApiMode; 2] = [ApiMode::OpenApiCompatible, ApiMode::Rest];

#[tokio::test]
async fn test_round_trip_both_modes() {
    for mode in MODES {
        let fixture = MockServerFixture::new().await;
        let mock = fixture
            .mock_json_response(200, &MockServerFixture::chat_body("hello", (3, 1, 4)))
            .await;

        let result = dispatcher()
            .send(&fixture.descriptor(mode), &PromptRequest::new("Hi"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.response_text, "hello", "mode {}", mode);
        assert_eq!(result.usage_info, UsageInfo::new(3, 1, 4));
        assert_eq!(result.finish_reason.as_deref(), Some("stop"));
        assert_eq!(
            result.info(),
            r#"{"prompt_tokens":3,"completion_tokens":1,"total_tokens":4}"#
        );
    }
}

#[tokio::test]
async fn test_defaults_reach_the_wire() {
    for mode in MODES {
        let fixture = MockServerFixture::new().await;
        let mock = fixture
            .mock_matching(
                json!({
                    "model": "ep-test",
                    "max_tokens": 1024,
                    "temperature": 0.7,
                    "top_p": 0.9
                }),
                &MockServerFixture::chat_body("ok", (1, 1, 2)),
            )
            .await;

        dispatcher()
            .send(&fixture.descriptor(mode), &PromptRequest::new("Hi"))
            .await
            .unwrap();
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_multimodal_parts_in_order() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_matching(
            json!({
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": [
                        {"type": "text", "text": "compare"},
                        {"type": "image_url", "image_url": {"url": "data:image/png;base64,aW1nQQ=="}},
                        {"type": "video_url", "video_url": {"url": "data:video/mp4;base64,dmlkQg=="}}
                    ]}
                ]
            }),
            &MockServerFixture::chat_body("same", (10, 1, 11)),
        )
        .await;

    let request = PromptRequest::new("compare")
        .system_prompt("be brief")
        .attachment(Attachment::image_base64("aW1nQQ==", "image/png"))
        .attachment(Attachment::video_base64("dmlkQg==", "video/mp4"));
    let result = dispatcher()
        .send(&fixture.descriptor(ApiMode::Rest), &request)
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(result.response_text, "same");
}

#[tokio::test]
async fn test_empty_content_and_missing_usage() {
    for mode in MODES {
        let fixture = MockServerFixture::new().await;
        let _mock = fixture
            .mock_json_response(200, r#"{"choices":[{"message":{"role":"assistant","content":""}}]}"#)
            .await;

        let result = dispatcher()
            .send(&fixture.descriptor(mode), &PromptRequest::new("Hi"))
            .await
            .unwrap();
        assert_eq!(result, NormalizedResult::default());
    }
}

#[tokio::test]
async fn test_status_classification() {
    let cases = [
        (401, r#"{"error":{"code":"AuthenticationError","message":"bad key"}}"#, ErrorKind::Auth),
        (403, r#"{"error":{"message":"forbidden"}}"#, ErrorKind::Auth),
        (400, r#"{"error":{"code":"InvalidParameter","message":"bad top_p"}}"#, ErrorKind::Validation),
        (429, r#"{"error":{"message":"slow down"}}"#, ErrorKind::Transport),
        (500, "upstream exploded", ErrorKind::Transport),
    ];
    for mode in MODES {
        for (status, body, kind) in cases {
            let fixture = MockServerFixture::new().await;
            let _mock = fixture.mock_json_response(status, body).await;

            let err = dispatcher()
                .send(&fixture.descriptor(mode), &PromptRequest::new("Hi"))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), kind, "mode {} status {}", mode, status);
            assert_eq!(err.http_status(), Some(status as u16));
            assert!(!err.to_string().contains(common::TEST_KEY));
        }
    }
}

#[tokio::test]
async fn test_rate_limit_is_retryable_hint() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json_response(429, r#"{"error":{"message":"too many requests"}}"#)
        .await;
    let err = dispatcher()
        .send(&fixture.descriptor(ApiMode::OpenApiCompatible), &PromptRequest::new("Hi"))
        .await
        .unwrap_err();
    assert!(err.is_transient());
    match err {
        Error::Remote { class, message, .. } => {
            assert_eq!(class, ErrorClass::RateLimited);
            assert_eq!(message, "too many requests");
        }
        other => panic!("expected remote error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_format_error() {
    for mode in MODES {
        for body in ["<html>gateway</html>", r#"{"data":"unexpected"}"#, r#"{"choices":[]}"#] {
            let fixture = MockServerFixture::new().await;
            let _mock = fixture.mock_json_response(200, body).await;

            let err = dispatcher()
                .send(&fixture.descriptor(mode), &PromptRequest::new("Hi"))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ResponseFormat, "mode {} body {}", mode, body);
        }
    }
}

#[tokio::test]
async fn test_error_payload_in_success_body() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json_response(200, r#"{"error":{"code":"InvalidApiKey","message":"key revoked"}}"#)
        .await;
    let err = dispatcher()
        .send(&fixture.descriptor(ApiMode::Rest), &PromptRequest::new("Hi"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
}

#[tokio::test]
async fn test_validation_fails_before_network() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_chat_expecting(0, &MockServerFixture::chat_body("never", (0, 0, 0)))
        .await;

    let bad_requests = [
        PromptRequest::new(""),
        PromptRequest::new("hi").max_tokens(0),
        PromptRequest::new("hi").temperature(2.5),
        PromptRequest::new("hi").top_p(0.0),
        PromptRequest::new("hi").attachment(Attachment::image_base64("!!!", "image/png")),
        PromptRequest::new("hi").attachment(Attachment::video_base64("dmlk", "image/png")),
    ];
    for request in &bad_requests {
        let err = dispatcher()
            .send(&fixture.descriptor(ApiMode::OpenApiCompatible), request)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{:?}", request);
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_invalid_base_url_is_config_error() {
    let descriptor = build("OpenAPI", "ep-1", "key", None, Some("not a url")).unwrap();
    let err = dispatcher()
        .send(&descriptor, &PromptRequest::new("Hi"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let base_url = hanging_server().await;
    for mode in MODES {
        let descriptor = volcano_llm::ConnectionBuilder::new(mode)
            .endpoint_id("ep-1")
            .api_key("key")
            .custom_base_url(&base_url)
            .build()
            .unwrap();

        let started = std::time::Instant::now();
        let err = dispatcher_with_timeout(Duration::from_millis(200))
            .send(&descriptor, &PromptRequest::new("Hi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(matches!(err, Error::Transport(TransportError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let base_url = refused_url().await;
    let descriptor = build("REST API", "ep-1", "key", None, Some(&base_url)).unwrap();
    let err = dispatcher()
        .send(&descriptor, &PromptRequest::new("Hi"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_cancel_aborts_in_flight_request() {
    let base_url = hanging_server().await;
    let descriptor = build("OpenAPI", "ep-1", "key", None, Some(&base_url)).unwrap();
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = dispatcher()
        .send_with_cancel(&descriptor, &PromptRequest::new("Hi"), token)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Cancelled)));
}

#[tokio::test]
async fn test_descriptor_shared_across_concurrent_calls() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_chat_expecting(4, &MockServerFixture::chat_body("pong", (1, 1, 2)))
        .await;
    let descriptor = fixture.descriptor(ApiMode::OpenApiCompatible);
    let dispatcher = dispatcher();

    let calls = (0..4).map(|i| {
        let request = PromptRequest::new(format!("ping {}", i));
        let dispatcher = dispatcher.clone();
        let descriptor = &descriptor;
        async move { dispatcher.send(descriptor, &request).await }
    });
    let results = futures::future::join_all(calls).await;
    assert!(results.iter().all(|r| r.as_ref().map(|r| r.response_text == "pong").unwrap_or(false)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_list_models_and_check_connection() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_models(200, r#"{"object":"list","data":[{"id":"doubao-pro-32k"},{"id":"doubao-vision"}]}"#)
        .await;
    let descriptor = fixture.descriptor(ApiMode::OpenApiCompatible);

    let models = dispatcher().list_models(&descriptor).await.unwrap();
    assert_eq!(models, vec!["doubao-pro-32k", "doubao-vision"]);
    dispatcher().check_connection(&descriptor).await.unwrap();
}

#[tokio::test]
async fn test_check_connection_classifies_failures() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_models(401, r#"{"error":{"message":"invalid key"}}"#).await;
    let err = dispatcher()
        .check_connection(&fixture.descriptor(ApiMode::Rest))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);

    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_models(404, "not found").await;
    let err = dispatcher()
        .check_connection(&fixture.descriptor(ApiMode::Rest))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Remote { class: ErrorClass::NotFound, .. }));
}
