//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use gatekeeper::config::{GatekeeperConfig, PasswordHashConfig};
use gatekeeper::lifecycle::{LifecycleError, ShutdownOutcome};
use gatekeeper::storage::{MemoryUserStore, UserStore};
use gatekeeper::{HttpServer, Shutdown};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const SECRET: &str = "integration-test-secret-0123456789";

/// Config with cheap password hashing and a signing secret.
pub fn test_config() -> GatekeeperConfig {
    let mut config = GatekeeperConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.auth.jwt_secret = SECRET.into();
    config.auth.password_hash = PasswordHashConfig {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    };
    config
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<ShutdownOutcome, LifecycleError>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server to finish.
    pub async fn stop(self) -> ShutdownOutcome {
        self.shutdown.trigger();
        self.handle.await.unwrap().unwrap()
    }
}

pub async fn start_server(config: GatekeeperConfig) -> TestServer {
    start_server_with_store(config, Arc::new(MemoryUserStore::new())).await
}

pub async fn start_server_with_store(
    config: GatekeeperConfig,
    store: Arc<dyn UserStore>,
) -> TestServer {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, store).unwrap();
    let handle = tokio::spawn(server.run(listener, shutdown.clone()));
    TestServer { addr, shutdown, handle }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Register `email` and return the issued token.
pub async fn register(client: &reqwest::Client, server: &TestServer, email: &str, password: &str) -> String {
    let res = client
        .post(server.url("/auth/register"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    let body: Value = res.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}
