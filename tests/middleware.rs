mod common;

use astra_service::error::ErrorBody;
use common::{MockProbe, spawn_app, test_config, test_config_with};

#[tokio::test]
async fn unknown_route_returns_not_found_with_method_and_path() {
    let address = spawn_app(test_config(), MockProbe::connected()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{address}/api/does-not-exist"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    let body: ErrorBody = response.json().await.expect("Failed to parse response");
    assert_eq!(body.status, "error");
    assert!(body.message.contains("POST"));
    assert!(body.message.contains("/api/does-not-exist"));
}

#[tokio::test]
async fn routes_outside_prefix_are_not_found() {
    let address = spawn_app(test_config(), MockProbe::connected()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{address}/status"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let body: ErrorBody = response.json().await.expect("Failed to parse response");
    assert_eq!(body.message, "Route GET /status not found");
}

#[tokio::test]
async fn custom_api_prefix_is_honored() {
    let config = test_config_with(&[("API_PREFIX", "/internal/v2/")]);
    let address = spawn_app(config, MockProbe::connected()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{address}/internal/v2/status"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let response = client
        .get(format!("{address}/api/status"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn requests_over_the_limit_are_rejected() {
    let config = test_config_with(&[("RATE_LIMIT_MAX_REQUESTS", "3")]);
    let address = spawn_app(config, MockProbe::connected()).await;
    let client = reqwest::Client::new();

    for remaining in (0..3).rev() {
        let response = client
            .get(format!("{address}/api/status"))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.headers()["ratelimit-limit"], "3");
        assert_eq!(
            response.headers()["ratelimit-remaining"],
            remaining.to_string().as_str()
        );
        assert!(response.headers().contains_key("ratelimit-reset"));
    }

    let response = client
        .get(format!("{address}/api/status"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), reqwest::StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));
    let body = response.text().await.expect("Failed to read response body");
    assert_eq!(body, "Too many requests from this IP, please try again later.");
}

#[tokio::test]
async fn rate_limit_window_resets() {
    let config = test_config_with(&[
        ("RATE_LIMIT_MAX_REQUESTS", "1"),
        ("RATE_LIMIT_WINDOW_MS", "200"),
    ]);
    let address = spawn_app(config, MockProbe::connected()).await;
    let client = reqwest::Client::new();
    let url = format!("{address}/api/status");

    let first = client.get(&url).send().await.unwrap();
    assert_eq!(first.status(), reqwest::StatusCode::OK);

    let second = client.get(&url).send().await.unwrap();
    assert_eq!(second.status(), reqwest::StatusCode::TOO_MANY_REQUESTS);

    tokio::time::sleep(std::time::Duration::from_millis(250)).await;

    let third = client.get(&url).send().await.unwrap();
    assert_eq!(third.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn security_headers_are_set() {
    let address = spawn_app(test_config(), MockProbe::connected()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{address}/api/status"))
        .send()
        .await
        .expect("Failed to execute request");

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
    assert_eq!(headers["referrer-policy"], "no-referrer");
    assert!(headers.contains_key("strict-transport-security"));
    assert!(headers.contains_key("content-security-policy"));
}

#[tokio::test]
async fn error_responses_carry_security_headers() {
    let address = spawn_app(test_config(), MockProbe::connected()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{address}/missing"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn cors_allows_configured_origins_only() {
    let config = test_config_with(&[(
        "CORS_ORIGIN",
        "http://localhost:3000,https://app.example.com",
    )]);
    let address = spawn_app(config, MockProbe::connected()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{address}/api/status"))
        .header("Origin", "https://app.example.com")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://app.example.com"
    );
    assert_eq!(
        response.headers()["access-control-allow-credentials"],
        "true"
    );

    let response = client
        .get(format!("{address}/api/status"))
        .header("Origin", "https://evil.example.com")
        .send()
        .await
        .expect("Failed to execute request");

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn cors_preflight_is_answered() {
    let address = spawn_app(test_config(), MockProbe::connected()).await;
    let client = reqwest::Client::new();

    let response = client
        .request(reqwest::Method::OPTIONS, format!("{address}/api/health"))
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "GET")
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:3000"
    );
}

#[tokio::test]
async fn wildcard_origin_is_skipped_by_the_router() {
    let mut config = test_config();
    config.cors.origins = vec!["*".to_string(), "http://localhost:3000".to_string()];
    let address = spawn_app(config, MockProbe::connected()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{address}/api/status"))
        .header("Origin", "https://anywhere.example.com")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );

    let response = client
        .get(format!("{address}/api/status"))
        .header("Origin", "http://localhost:3000")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:3000"
    );
}
