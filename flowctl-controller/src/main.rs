//! flowctl-controller: resource state controller for the pipeline platform.
//!
//! This daemon:
//! - Probes the liveness of every backend service
//! - Checks models and connectors, following their in-flight operations
//! - Derives pipeline states from their dependencies
//! - Stores one state per resource in etcd and serves it over gRPC

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flowctl_controller::backend::{
    ConnectorClient, ConnectorProbe, GrpcOperationPoller, InferenceClient, LivenessProbe,
    MgmtClient, ModelClient, PipelineClient,
};
use flowctl_controller::reconciler::{CheckedReconciler, PipelineReconciler, ServiceReconciler};
use flowctl_controller::store::{EtcdStore, KvStore, MemoryStore};
use flowctl_controller::{
    ControlLoop, ControllerConfig, ControllerPrivateServiceServer, ControllerServiceImpl,
    ResourceRepository, Schedule,
};

/// flowctl resource state controller
#[derive(Parser, Debug)]
#[command(name = "flowctl-controller", version, about)]
struct Args {
    /// Listen address for the controller gRPC API
    #[arg(short, long, default_value = "[::]:3085")]
    listen: String,

    /// Seconds between reconciliation ticks
    #[arg(long, default_value = "3")]
    interval: u64,

    /// Upper bound in seconds on one resource kind's pass
    #[arg(long, default_value = "120")]
    tick_timeout: u64,

    /// Deadline in seconds for backend RPCs
    #[arg(long, default_value = "10")]
    rpc_timeout: u64,

    /// Deadline in seconds for etcd requests
    #[arg(long, default_value = "5")]
    store_timeout: u64,

    /// Max concurrent per-entity checks within one resource kind
    #[arg(long, default_value = "32")]
    concurrency: usize,

    /// Page size for list RPCs
    #[arg(long, default_value = "10")]
    page_size: i32,

    /// Longest pause in seconds between ticks while etcd is unreachable
    #[arg(long, default_value = "60")]
    backoff_ceiling: u64,

    /// Check connectors on every tick, not only after start or an etcd outage
    #[arg(long)]
    probe_connectors_every_tick: bool,

    /// Run in development mode (in-memory store instead of etcd)
    #[arg(long)]
    dev: bool,

    /// etcd endpoint (can be repeated)
    #[arg(long = "etcd-endpoint", default_value = "http://127.0.0.1:2379")]
    etcd_endpoints: Vec<String>,

    /// Model backend public endpoint
    #[arg(long, default_value = "http://model-backend:8083")]
    model_public_endpoint: String,

    /// Model backend private endpoint
    #[arg(long, default_value = "http://model-backend:3083")]
    model_private_endpoint: String,

    /// Connector backend public endpoint
    #[arg(long, default_value = "http://connector-backend:8082")]
    connector_public_endpoint: String,

    /// Connector backend private endpoint
    #[arg(long, default_value = "http://connector-backend:3082")]
    connector_private_endpoint: String,

    /// Pipeline backend public endpoint
    #[arg(long, default_value = "http://pipeline-backend:8081")]
    pipeline_public_endpoint: String,

    /// Pipeline backend private endpoint
    #[arg(long, default_value = "http://pipeline-backend:3081")]
    pipeline_private_endpoint: String,

    /// Management backend public endpoint
    #[arg(long, default_value = "http://mgmt-backend:8084")]
    mgmt_public_endpoint: String,

    /// Inference server gRPC endpoint
    #[arg(long, default_value = "http://triton-server:8001")]
    inference_endpoint: String,
}

impl Args {
    fn config(&self) -> ControllerConfig {
        ControllerConfig {
            interval: Duration::from_secs(self.interval),
            tick_timeout: Duration::from_secs(self.tick_timeout),
            rpc_timeout: Duration::from_secs(self.rpc_timeout),
            store_timeout: Duration::from_secs(self.store_timeout),
            concurrency: self.concurrency,
            page_size: self.page_size,
            backoff_ceiling: Duration::from_secs(self.backoff_ceiling),
            probe_connectors_every_tick: self.probe_connectors_every_tick,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "flowctl_controller=info,tonic=warn,tower=warn,hyper=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = args.config();
    let addr: SocketAddr = args
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address {}", args.listen))?;

    info!("Starting flowctl-controller on {}", addr);

    // State store
    let kv: Arc<dyn KvStore> = if args.dev {
        info!("Development mode: using in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        info!("Connecting to etcd: {:?}", args.etcd_endpoints);
        Arc::new(
            EtcdStore::connect(&args.etcd_endpoints, config.store_timeout)
                .await
                .context("Failed to connect to etcd")?,
        )
    };
    let repo = Arc::new(ResourceRepository::new(kv, config.store_timeout));

    // Backend clients
    let model = ModelClient::new(
        &args.model_public_endpoint,
        &args.model_private_endpoint,
        config.rpc_timeout,
        config.page_size,
    )
    .context("Failed to create model backend client")?;
    let connector = ConnectorClient::new(
        &args.connector_public_endpoint,
        &args.connector_private_endpoint,
        config.rpc_timeout,
        config.page_size,
    )
    .context("Failed to create connector backend client")?;
    let pipeline = PipelineClient::new(
        &args.pipeline_public_endpoint,
        &args.pipeline_private_endpoint,
        config.rpc_timeout,
        config.page_size,
    )
    .context("Failed to create pipeline backend client")?;
    let mgmt = MgmtClient::new(&args.mgmt_public_endpoint, config.rpc_timeout)
        .context("Failed to create mgmt backend client")?;
    let inference = InferenceClient::new(&args.inference_endpoint, config.rpc_timeout)
        .context("Failed to create inference server client")?;

    // Reconcilers
    let poller = Arc::new(GrpcOperationPoller::new(model.clone(), connector.clone()));
    let services: Vec<Arc<dyn LivenessProbe>> = vec![
        Arc::new(model.clone()),
        Arc::new(connector.clone()),
        Arc::new(pipeline.clone()),
        Arc::new(mgmt),
        Arc::new(inference),
    ];
    let connector_schedule = if config.probe_connectors_every_tick {
        Schedule::EveryTick
    } else {
        Schedule::Repopulate
    };

    let control = ControlLoop::new(repo.clone(), &config)
        .with_reconciler(
            Schedule::EveryTick,
            Arc::new(ServiceReconciler::new(services, repo.clone())),
        )
        .with_reconciler(
            Schedule::EveryTick,
            Arc::new(CheckedReconciler::new(
                Arc::new(model),
                poller.clone(),
                repo.clone(),
                config.concurrency,
            )),
        )
        .with_reconciler(
            connector_schedule,
            Arc::new(CheckedReconciler::new(
                Arc::new(ConnectorProbe::source(connector.clone())),
                poller.clone(),
                repo.clone(),
                config.concurrency,
            )),
        )
        .with_reconciler(
            connector_schedule,
            Arc::new(CheckedReconciler::new(
                Arc::new(ConnectorProbe::destination(connector)),
                poller,
                repo.clone(),
                config.concurrency,
            )),
        )
        .with_reconciler(
            Schedule::EveryTick,
            Arc::new(PipelineReconciler::new(
                Arc::new(pipeline),
                repo.clone(),
                config.concurrency,
            )),
        );

    // Bind before spawning anything so a taken port aborts startup
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("gRPC API listening on {}", addr);

    // Shutdown signal shared by the control loop and the gRPC server
    let shutdown = CancellationToken::new();
    let control_handle = tokio::spawn(control.run(shutdown.clone()));

    let grpc_shutdown = shutdown.clone();
    let grpc_handle = tokio::spawn(async move {
        Server::builder()
            .add_service(ControllerPrivateServiceServer::new(
                ControllerServiceImpl::new(repo),
            ))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                grpc_shutdown.cancelled().await;
            })
            .await
    });

    // Wait for shutdown signal
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .context("Failed to install SIGTERM handler")?;

    tokio::select! {
        _ = signal::ctrl_c() => info!("Received SIGINT"),
        _ = sigterm.recv() => info!("Received SIGTERM"),
    }

    shutdown.cancel();

    // The in-flight tick finishes before the loop exits
    control_handle.await.context("Control loop task failed")?;
    grpc_handle
        .await
        .context("gRPC server task failed")?
        .context("gRPC server error")?;

    info!("Shutdown complete");
    Ok(())
}
