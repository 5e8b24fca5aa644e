//! Shared setup for the gRPC integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use calculator_service::proto::calculator_service_server::CalculatorServiceServer;
use calculator_service::{CalculatorClient, CalculatorServer, CallStats, HandlerSettings};
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

/// A calculator server running on a random local port.
pub struct TestServer {
    pub addr: std::net::SocketAddr,
    pub shutdown: CancellationToken,
    pub stats: Arc<CallStats>,
    pub handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn client(&self) -> CalculatorClient {
        CalculatorClient::connect(self.endpoint()).await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Start a test gRPC server with the given handler settings.
pub async fn start_server(settings: HandlerSettings) -> TestServer {
    let shutdown = CancellationToken::new();
    let server = CalculatorServer::new(settings, shutdown.clone());
    let stats = server.stats();

    // Find an available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        Server::builder()
            .add_service(CalculatorServiceServer::new(server))
            .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        shutdown,
        stats,
        handle,
    }
}

/// Handler settings without artificial pauses.
pub fn immediate() -> HandlerSettings {
    HandlerSettings::immediate()
}
