use crate::common::{create_test_config, spawn_mock_cloudflare};
use loadguard::{Actuator, CloudflareClient, GuardError, SecurityLevel};

#[tokio::test]
async fn test_enable_and_disable_are_idempotent() {
    let api = spawn_mock_cloudflare().await;
    let client = CloudflareClient::new(&create_test_config(&api.base_url())).unwrap();

    client.enable().await.unwrap();
    client.enable().await.unwrap();
    assert_eq!(api.level(), "under_attack");

    client.disable().await.unwrap();
    client.disable().await.unwrap();
    assert_eq!(api.level(), "medium");

    let bodies = api.patches();
    assert_eq!(bodies.len(), 4);
    assert_eq!(bodies[0], r#"{"value":"under_attack"}"#);
    assert_eq!(bodies[3], r#"{"value":"medium"}"#);
}

#[tokio::test]
async fn test_requests_carry_credentials() {
    let api = spawn_mock_cloudflare().await;
    let client = CloudflareClient::new(&create_test_config(&api.base_url())).unwrap();

    client.enable().await.unwrap();

    let request = &api.requests()[0];
    assert_eq!(request.method, "PATCH");
    assert_eq!(request.path, "/client/v4/zones/zone-test/settings/security_level");
    assert_eq!(request.header("X-Auth-Email"), Some("ops@example.com"));
    assert_eq!(request.header("X-Auth-Key"), Some("test-key"));
    assert_eq!(request.header("Content-Type"), Some("application/json"));
}

#[tokio::test]
async fn test_disable_uses_configured_normal_level() {
    let api = spawn_mock_cloudflare().await;
    let mut config = (*create_test_config(&api.base_url())).clone();
    config.normal_security_level = SecurityLevel::High;
    let client = CloudflareClient::new(&config).unwrap();

    client.disable().await.unwrap();

    assert_eq!(api.level(), "high");
}

#[tokio::test]
async fn test_current_state_reads_setting() {
    let api = spawn_mock_cloudflare().await;
    let client = CloudflareClient::new(&create_test_config(&api.base_url())).unwrap();

    assert_eq!(client.current_state().await.unwrap(), SecurityLevel::Medium);
    client.enable().await.unwrap();
    assert_eq!(
        client.current_state().await.unwrap(),
        SecurityLevel::UnderAttack
    );
    assert_eq!(api.requests()[0].method, "GET");
}

#[tokio::test]
async fn test_api_rejection_maps_to_api_error() {
    let api = spawn_mock_cloudflare().await;
    api.set_failing(true);
    let client = CloudflareClient::new(&create_test_config(&api.base_url())).unwrap();

    let err = client.enable().await.unwrap_err();
    assert!(matches!(err, GuardError::Api { code: 10000, .. }));
    assert_eq!(
        err.to_string(),
        "Cloudflare API error: Authentication error (code: 10000)"
    );
}

#[tokio::test]
async fn test_non_json_body_is_unexpected_response() {
    let api = spawn_mock_cloudflare().await;
    api.set_raw_response(502, "<html>Bad Gateway</html>");
    let client = CloudflareClient::new(&create_test_config(&api.base_url())).unwrap();

    let err = client.disable().await.unwrap_err();
    assert!(matches!(err, GuardError::UnexpectedResponse(_)));
}

#[tokio::test]
async fn test_unsuccessful_envelope_without_errors() {
    let api = spawn_mock_cloudflare().await;
    api.set_raw_response(200, r#"{"success":false,"errors":[],"result":null}"#);
    let client = CloudflareClient::new(&create_test_config(&api.base_url())).unwrap();

    let err = client.enable().await.unwrap_err();
    assert!(matches!(err, GuardError::Api { code: 0, .. }));
}
