//! Development server command.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use sluice_config::Project;
use sluice_pipeline::TaskGraph;
use sluice_server::{DevServer, DevServerConfig, TriggerFn, Watcher};

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Command-line overrides for `[serve]`.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub port: Option<u16>,
    pub open: bool,
}

/// Build, serve and watch until interrupted.
pub async fn run(project: &Project, graph: &TaskGraph, options: &ServeOptions) -> Result<()> {
    let settings = project.serve();

    tracing::info!("Running initial build: {}", settings.build.join(", "));
    if let Err(e) = graph.run_all(&settings.build).await {
        tracing::error!("{}", e);
    }

    let config = DevServerConfig {
        root: project.paths().target_root(settings.target).to_path_buf(),
        port: options.port.unwrap_or(settings.port),
        host: settings.host.clone(),
        open: options.open && settings.open,
        target: settings.target,
    };
    let server = DevServer::new(config, graph.events().clone())
        .bind()
        .await?;

    let watcher = Watcher::new(
        project.root(),
        project.watch().to_vec(),
        project.debounce(),
        trigger(graph.clone()),
    )
    .start()?;

    tokio::select! {
        result = server.serve() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    watcher.shutdown().await;
    Ok(())
}

/// Run a watch binding's tasks in order; failures are logged and the next
/// change retries.
fn trigger(graph: TaskGraph) -> TriggerFn {
    Arc::new(move |tasks: Vec<String>| -> BoxFuture {
        let graph = graph.clone();
        Box::pin(async move {
            if let Err(e) = graph.run_all(&tasks).await {
                tracing::error!("{}", e);
            }
        })
    })
}
