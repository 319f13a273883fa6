use serde_json::json;
use solarman_rs::api::request::Call;
use solarman_rs::api::{Failure, HttpTransport, Transport};
use solarman_rs::model::Token;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn server_responding(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/station/v1.0/list"))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

fn call(server: &MockServer) -> Call<'static> {
    Call::new(
        format!("{}/station/v1.0/list", server.uri()),
        &json!({"page": 1, "size": 50}),
    )
    .unwrap()
}

#[tokio::test]
async fn json_body_is_returned() {
    let server = server_responding(
        ResponseTemplate::new(200).set_body_json(json!({"success": true, "total": 0})),
    )
    .await;

    let value = HttpTransport::new().unwrap().send(&call(&server)).await;
    assert_eq!(Ok(json!({"success": true, "total": 0})), value);
}

#[tokio::test]
async fn throttling_and_server_errors_are_retryable() {
    for status in [429, 500, 503] {
        let server = server_responding(ResponseTemplate::new(status)).await;
        let failure = HttpTransport::new()
            .unwrap()
            .send(&call(&server))
            .await
            .unwrap_err();
        assert_eq!(Failure::Http(status), failure);
        assert!(failure.is_retryable(), "{}", status);
    }
}

#[tokio::test]
async fn client_errors_are_not_retryable() {
    for status in [400, 401, 404] {
        let server = server_responding(ResponseTemplate::new(status)).await;
        let failure = HttpTransport::new()
            .unwrap()
            .send(&call(&server))
            .await
            .unwrap_err();
        assert_eq!(Failure::Http(status), failure);
        assert!(!failure.is_retryable(), "{}", status);
    }
}

#[tokio::test]
async fn malformed_body_is_classified() {
    let server =
        server_responding(ResponseTemplate::new(200).set_body_string("{\"success\": tr")).await;

    let failure = HttpTransport::new()
        .unwrap()
        .send(&call(&server))
        .await
        .unwrap_err();
    assert!(matches!(failure, Failure::MalformedBody(_)), "{:?}", failure);
    assert!(!failure.is_retryable());
}

#[tokio::test]
async fn token_and_body_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/station/v1.0/device"))
        .and(header("Authorization", "bearer secret-token"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({"stationId": 1234567})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let token = Token::new("secret-token");
    let call = Call::new(
        format!("{}/station/v1.0/device", server.uri()),
        &json!({"stationId": 1234567}),
    )
    .unwrap()
    .bearer(&token);

    let value = HttpTransport::new().unwrap().send(&call).await;
    assert_eq!(Ok(json!({"success": true})), value);
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = server_responding(
        ResponseTemplate::new(200)
            .set_body_json(json!({"success": true}))
            .set_delay(Duration::from_secs(5)),
    )
    .await;

    let call = call(&server).timeout(Duration::from_millis(200));
    let failure = HttpTransport::new().unwrap().send(&call).await.unwrap_err();
    assert_eq!(Failure::Timeout, failure);
    assert!(failure.is_retryable());
}

#[tokio::test]
async fn refused_connection_is_classified() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let call = Call::new(
        format!("http://127.0.0.1:{}/account/v1.0/token", port),
        &json!({}),
    )
    .unwrap();

    let failure = HttpTransport::new().unwrap().send(&call).await.unwrap_err();
    assert!(matches!(failure, Failure::Connection(_)), "{:?}", failure);
    assert!(failure.is_retryable());
}
