#![allow(dead_code)]

use async_trait::async_trait;
use loadguard::config::{Config, GuardError, Result, SecurityLevel};
use loadguard::features::sampler::LoadSampler;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// In-process stand-in for the Cloudflare security level endpoint.
#[derive(Clone)]
pub struct MockCloudflare {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
    pub level: Arc<Mutex<String>>,
    pub fail: Arc<AtomicBool>,
    pub raw_override: Arc<Mutex<Option<(u16, String)>>>,
}

impl MockCloudflare {
    pub fn base_url(&self) -> String {
        format!("http://{}/client/v4", self.addr)
    }

    pub fn level(&self) -> String {
        self.level.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn patches(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "PATCH")
            .map(|r| r.body)
            .collect()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn set_raw_response(&self, status: u16, body: &str) {
        *self.raw_override.lock().unwrap() = Some((status, body.to_string()));
    }

    pub async fn wait_for_level(&self, level: &str, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.level() == level {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut data = Vec::new();
    let mut buf = [0u8; 2048];
    let (head_end, content_length) = loop {
        let n = socket.read(&mut buf).await.ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&data);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .filter_map(|l| l.split_once(':'))
                .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            break (head_end, content_length);
        }
    };

    while data.len() < head_end + 4 + content_length {
        let n = socket.read(&mut buf).await.ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
    }

    let text = String::from_utf8_lossy(&data).into_owned();
    let (head, body) = text.split_at(head_end);
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    Some(RecordedRequest {
        method,
        path,
        headers,
        body: body.trim_start_matches("\r\n\r\n").to_string(),
    })
}

fn respond(mock: &MockCloudflare, request: &RecordedRequest) -> (u16, String) {
    if let Some(raw) = mock.raw_override.lock().unwrap().clone() {
        return raw;
    }
    if mock.fail.load(Ordering::SeqCst) {
        return (
            403,
            r#"{"success":false,"errors":[{"code":10000,"message":"Authentication error"}],"messages":[],"result":null}"#.to_string(),
        );
    }

    if request.method == "PATCH" {
        let value = serde_json::from_str::<serde_json::Value>(&request.body)
            .ok()
            .and_then(|v| v.get("value").and_then(|v| v.as_str()).map(str::to_string));
        match value {
            Some(value) => *mock.level.lock().unwrap() = value,
            None => {
                return (
                    400,
                    r#"{"success":false,"errors":[{"code":1007,"message":"Invalid value for zone setting security_level"}],"result":null}"#.to_string(),
                );
            }
        }
    }

    let level = mock.level();
    (
        200,
        format!(
            r#"{{"success":true,"errors":[],"messages":[],"result":{{"id":"security_level","value":"{level}","editable":true,"modified_on":"2026-01-01T00:00:00.000000Z"}}}}"#
        ),
    )
}

pub async fn spawn_mock_cloudflare() -> MockCloudflare {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mock = MockCloudflare {
        addr: listener.local_addr().unwrap(),
        requests: Arc::new(Mutex::new(Vec::new())),
        level: Arc::new(Mutex::new("medium".to_string())),
        fail: Arc::new(AtomicBool::new(false)),
        raw_override: Arc::new(Mutex::new(None)),
    };

    let server = mock.clone();
    tokio::spawn(async move {
        loop {
            if let Ok((mut socket, _)) = listener.accept().await {
                let server = server.clone();
                tokio::spawn(async move {
                    let Some(request) = read_request(&mut socket).await else {
                        return;
                    };
                    let (status, body) = respond(&server, &request);
                    server.requests.lock().unwrap().push(request);
                    let response = format!(
                        "HTTP/1.1 {status} MOCK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        }
    });

    mock
}

pub fn create_test_config(api_base_url: &str) -> Arc<Config> {
    Arc::new(Config {
        cloudflare_api_key: "test-key".to_string(),
        cloudflare_email: "ops@example.com".to_string(),
        cloudflare_zone_id: "zone-test".to_string(),
        cloudflare_api_base_url: api_base_url.to_string(),
        cloudflare_timeout_secs: 5,
        normal_security_level: SecurityLevel::Medium,
        cpu_threshold: 80,
        monitoring_interval_secs: 1,
        required_high_readings: 3,
        required_low_readings: 5,
        cpu_sample_window_ms: 200,
        webhook_url: None,
        webhook_token: None,
        log_format: "pretty".to_string(),
    })
}

/// Replays scripted readings; `None` is a sampler failure. Repeats `fallback` once drained.
pub struct ScriptedSampler {
    readings: VecDeque<Option<f64>>,
    fallback: Option<f64>,
}

impl ScriptedSampler {
    pub fn boxed(readings: &[Option<f64>], fallback: Option<f64>) -> Box<Self> {
        Box::new(Self {
            readings: readings.iter().copied().collect(),
            fallback,
        })
    }

    pub fn constant(load: f64) -> Box<Self> {
        Self::boxed(&[], Some(load))
    }
}

#[async_trait]
impl LoadSampler for ScriptedSampler {
    async fn sample(&mut self) -> Result<f64> {
        self.readings
            .pop_front()
            .unwrap_or(self.fallback)
            .ok_or_else(|| GuardError::Sampler("scripted failure".into()))
    }
}
