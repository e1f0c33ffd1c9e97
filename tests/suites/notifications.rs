use crate::common::{ScriptedSampler, create_test_config, spawn_mock_cloudflare};
use loadguard::{CloudflareClient, Supervisor, TickOutcome, WebhookNotifier};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_transitions_are_announced() {
    let api = spawn_mock_cloudflare().await;
    // The mock accepts any POST with a 200, so it doubles as the webhook sink.
    let sink = spawn_mock_cloudflare().await;

    let mut config = (*create_test_config(&api.base_url())).clone();
    config.webhook_url = Some(format!("http://{}/alerts", sink.addr));
    config.webhook_token = Some("tk_alerts".to_string());
    let config = Arc::new(config);

    let client = Arc::new(CloudflareClient::new(&config).unwrap());
    let mut supervisor = Supervisor::new(&config, ScriptedSampler::constant(97.0), client)
        .with_notifier(WebhookNotifier::new(&config));

    for _ in 0..3 {
        supervisor.tick().await;
    }

    let mut alerts = Vec::new();
    for _ in 0..100 {
        alerts = sink.requests();
        if !alerts.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.method, "POST");
    assert_eq!(alert.path, "/alerts");
    assert_eq!(alert.header("Title"), Some("Under Attack Mode Enabled"));
    assert_eq!(alert.header("Priority"), Some("5"));
    assert_eq!(alert.header("Authorization"), Some("Bearer tk_alerts"));
    assert!(alert.body.contains("97.00"));

    // Shutdown delivery is awaited before the report is returned.
    let report = supervisor.shutdown().await;
    assert_eq!(report.transitions, 1);
    let alerts = sink.requests();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[1].header("Title"), Some("Monitor Stopped, Defense Lifted"));
}

#[tokio::test]
async fn test_disabled_notifier_sends_nothing() {
    let api = spawn_mock_cloudflare().await;
    let config = create_test_config(&api.base_url());
    let client = Arc::new(CloudflareClient::new(&config).unwrap());
    let mut supervisor = Supervisor::new(&config, ScriptedSampler::constant(97.0), client)
        .with_notifier(WebhookNotifier::new(&config));

    for _ in 0..3 {
        supervisor.tick().await;
    }
    assert!(matches!(
        supervisor.tick().await,
        TickOutcome::Observed { .. }
    ));
    assert_eq!(api.requests().len(), 1);
}
