#![allow(dead_code)]

use std::time::Duration;

use serde_json::Value;
use warplink::config::LinkConfig;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config pointing every endpoint at `server`.
pub fn config_for(server: &MockServer) -> LinkConfig {
    LinkConfig::default()
        .with_api_base(format!("{}/link", server.uri()))
        .with_me_endpoint(format!("{}/me", server.uri()))
}

/// Same as [`config_for`] with a short poll period for timer-driven tests.
pub fn fast_config_for(server: &MockServer) -> LinkConfig {
    config_for(server).with_poll_interval(Duration::from_millis(50))
}

pub async fn mount_code(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/link/code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_user(server: &MockServer, code: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path("/link/user"))
        .and(query_param("code", code))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Answer "not linked yet" for the first `times` status checks.
pub async fn mount_pending(server: &MockServer, code: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path("/link/user"))
        .and(query_param("code", code))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .up_to_n_times(times)
        .mount(server)
        .await;
}

pub async fn mount_account(server: &MockServer, token: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(query_param("auth", token))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Number of requests `server` received for `request_path`.
pub async fn hits(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .count()
}
