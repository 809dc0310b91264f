//! Node binary entry point (spec.md §6, §10): parse arguments, resolve a
//! port and an initial peer (auto-probing localhost where either is
//! omitted), then run the node until a shutdown signal arrives.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use corelib::{Error, Location};
use rpc::RpcClient;
use rpc::RpcServer;
use store::StoreNode;

use cli::discovery::{self, DEFAULT_PORT, DEFAULT_SERVICE, PEER_PROBE_MAX, PORT_PROBE_MAX};
use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Cli::parse();

    let port = match args.port {
        Some(port) => {
            let probe = Location::new("127.0.0.1", port);
            if RpcClient::ping(&probe).await.is_ok() {
                return Err(Error::AlreadyInUse(probe).into());
            }
            port
        }
        None => {
            let start = Location::new("127.0.0.1", DEFAULT_PORT);
            discovery::ping_until_not_found(&start, PORT_PROBE_MAX)
                .await
                .context("no free port found while auto-probing localhost")?
                .port
        }
    };

    let peer = match args.host {
        Some(host) => Some(host.parse::<Location>().context("invalid --host value")?),
        None => {
            let start = Location::new("127.0.0.1", DEFAULT_PORT);
            discovery::find_matching_service(&start, DEFAULT_SERVICE, PEER_PROBE_MAX).await
        }
    };

    let self_location = Location::new("127.0.0.1", port);
    let node = Arc::new(StoreNode::new(self_location.clone()));

    let server = RpcServer::bind("127.0.0.1", port)
        .await
        .with_context(|| format!("failed to bind {self_location}"))?;

    // Accept connections before announcing ourselves to a peer: the join
    // handler on the other end may ping and hand data off to us right away,
    // and it needs someone listening when it does.
    let serve_task = tokio::spawn(server.serve(Arc::clone(&node) as Arc<dyn rpc::Service>));

    node.local_join(peer).await;
    tracing::info!(%self_location, "starting the server");

    tokio::select! {
        result = serve_task => {
            result.context("rpc server task panicked")?.context("rpc server stopped unexpectedly")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    node.cleanup().await;
    tracing::info!("done");
    Ok(())
}
