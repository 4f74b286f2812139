//! KubePostgres Kubernetes Operator binary.
//!
//! Runs the Database controller, which manages a PostgreSQL StatefulSet and
//! Service for every Database custom resource in the cluster.

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Service;
use kube::runtime::Controller;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::{Api, Client, CustomResourceExt, Resource};
use kubepostgres_operator::cancel::{Cancellation, cancellation};
use kubepostgres_operator::controller::{
    ControllerContext, DatabaseController, database_error_policy, reconcile_database,
};
use kubepostgres_operator::crd::Database;
use kubepostgres_operator::store::KubeStore;
use kubepostgres_operator::OperatorConfig;
use kubepostgres_operator::telemetry::{TracingConfig, init_tracing};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;

/// KubePostgres operator.
#[derive(Parser)]
#[command(name = "kubepostgres-operator")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the CRD manifests as YAML and exit
    #[arg(long)]
    generate_crds: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.generate_crds {
        generate_crds()?;
        return Ok(());
    }

    let default_filter = match cli.verbose {
        0 => "kubepostgres_operator=info,kube=info",
        1 => "kubepostgres_operator=debug,kube=info",
        _ => "kubepostgres_operator=trace,kube=debug",
    };
    init_tracing(&TracingConfig::from_env(default_filter))?;

    tracing::info!("Starting KubePostgres operator");

    let config = OperatorConfig::from_env()?;
    tracing::info!(
        namespace = config.watch_namespace.as_deref().unwrap_or("<all>"),
        field_manager = %config.field_manager,
        error_requeue = ?config.error_requeue,
        "Operator configuration loaded"
    );

    // Connect to Kubernetes
    let client = Client::try_default().await?;
    tracing::info!("Connected to Kubernetes cluster");

    let (handle, token) = cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested, cancelling in-flight reconciliations");
            handle.cancel();
        }
    });

    run_database_controller(client, config, token).await
}

/// Api for `K`, cluster-wide or scoped to one namespace.
fn api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<DynamicType = (), Scope = k8s_openapi::NamespaceResourceScope>
        + Clone
        + DeserializeOwned
        + Debug,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Run the Database controller until shutdown.
async fn run_database_controller(
    client: Client,
    config: OperatorConfig,
    token: Cancellation,
) -> Result<()> {
    tracing::info!("Starting Database controller");

    let namespace = config.watch_namespace.as_deref();
    let databases: Api<Database> = api(&client, namespace);
    let statefulsets: Api<StatefulSet> = api(&client, namespace);
    let services: Api<Service> = api(&client, namespace);

    let store = Arc::new(KubeStore::new(client.clone(), config.field_manager.clone()));
    let ctx = Arc::new(ControllerContext::new(
        DatabaseController::new(store, token),
        config.error_requeue,
    ));

    Controller::new(databases, WatcherConfig::default())
        .owns(statefulsets, WatcherConfig::default())
        .owns(services, WatcherConfig::default())
        .shutdown_on_signal()
        .run(
            reconcile_database::<KubeStore>,
            database_error_policy::<KubeStore>,
            ctx,
        )
        .for_each(|result| async move {
            match result {
                Ok((obj, action)) => {
                    tracing::debug!(
                        database = %obj.name,
                        namespace = obj.namespace.as_deref().unwrap_or_default(),
                        ?action,
                        "Reconciled Database"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "Database controller stream error");
                }
            }
        })
        .await;

    tracing::info!("Database controller stopped");
    Ok(())
}

/// Generate CRD YAML.
fn generate_crds() -> Result<()> {
    println!("---");
    println!("{}", serde_yaml::to_string(&Database::crd())?);
    Ok(())
}
