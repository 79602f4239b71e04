//! Shared test utilities for flowctl-controller integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use flowctl_controller::proto::controller::controller_private_service_client::ControllerPrivateServiceClient;
use flowctl_controller::store::{KvStore, MemoryStore};
use flowctl_controller::{ControllerPrivateServiceServer, ControllerServiceImpl, ResourceRepository};
use tokio::sync::oneshot;
use tonic::transport::{Channel, Server};

/// Allocate an available port for testing.
pub fn allocate_port() -> u16 {
    portpicker::pick_unused_port().expect("No available port")
}

/// Serve `router` on a fresh local port until the returned sender fires or drops.
pub async fn spawn_grpc(router: tonic::transport::server::Router) -> (SocketAddr, oneshot::Sender<()>) {
    let addr: SocketAddr = format!("127.0.0.1:{}", allocate_port()).parse().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        router
            .serve_with_shutdown(addr, async {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("Server error");
    });

    // Small delay to ensure server is ready
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown_tx)
}

/// Controller gRPC API on the in-memory store.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: ControllerPrivateServiceClient<Channel>,
    pub store: Arc<MemoryStore>,
    pub repo: Arc<ResourceRepository>,
    shutdown_tx: oneshot::Sender<()>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let store = Arc::new(MemoryStore::new());
        let repo = Arc::new(ResourceRepository::new(
            store.clone() as Arc<dyn KvStore>,
            Duration::from_secs(1),
        ));

        let router = Server::builder().add_service(ControllerPrivateServiceServer::new(
            ControllerServiceImpl::new(repo.clone()),
        ));
        let (addr, shutdown_tx) = spawn_grpc(router).await;

        let client = ControllerPrivateServiceClient::connect(format!("http://{}", addr))
            .await
            .expect("Failed to connect");

        Self {
            addr,
            client,
            store,
            repo,
            shutdown_tx,
        }
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}
