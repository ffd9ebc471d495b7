// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! registry-submit
//!
//! Submits documents to the registry through the sliding-window throttle.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables and may be overridden
//! on the command line:
//!
//! - `THROTTLE_CAPACITY`: admissions per window (default: 10)
//! - `THROTTLE_WINDOW_MS`: window length in milliseconds (default: 1000)
//! - `REGISTRY_BASE_URL`: registry base URL (default: https://ismp.crpt.ru)
//! - `REGISTRY_TIMEOUT_SECS`: request timeout (default: 30)
//! - `REGISTRY_TOKEN`: bearer token
//!
//! Ctrl-C cancels every submission still waiting for a slot.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use registry_throttle::{
    config::Config,
    transport::{DocumentRequest, DocumentType, ProductGroup},
    ClientError, GateError, RegistryClient,
};

#[derive(Parser)]
#[command(name = "registry-submit", about = "Throttled document submission to the registry")]
struct Args {
    /// File holding the product document
    #[arg(long)]
    document: PathBuf,

    /// File holding the document signature
    #[arg(long)]
    signature: PathBuf,

    /// Document type (LP_INTRODUCE_GOODS, LP_INTRODUCE_GOODS_CSV, LP_INTRODUCE_GOODS_XML)
    #[arg(long, default_value = "LP_INTRODUCE_GOODS")]
    document_type: DocumentType,

    /// Product group name (clothes, shoes, tobacco, ...)
    #[arg(long)]
    product_group: ProductGroup,

    /// Bearer token for the registry
    #[arg(long, env = "REGISTRY_TOKEN", hide_env_values = true)]
    token: String,

    /// Submit the document this many times concurrently
    #[arg(long, default_value_t = 1)]
    repeat: usize,

    /// Override the admissions-per-window limit
    #[arg(long)]
    capacity: Option<u32>,

    /// Override the window length in milliseconds
    #[arg(long)]
    window_ms: Option<u64>,

    /// Print gate metrics when done
    #[arg(long)]
    print_metrics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(capacity) = args.capacity {
        config.throttle.capacity = capacity;
    }
    if let Some(window_ms) = args.window_ms {
        config.throttle.window_ms = window_ms;
    }
    info!(
        base_url = %config.registry.base_url,
        capacity = config.throttle.capacity,
        window_ms = config.throttle.window_ms,
        repeat = args.repeat,
        "Starting registry submission"
    );

    let document = tokio::fs::read_to_string(&args.document)
        .await
        .with_context(|| format!("reading document {}", args.document.display()))?;
    let signature = tokio::fs::read_to_string(&args.signature)
        .await
        .with_context(|| format!("reading signature {}", args.signature.display()))?;

    let request = Arc::new(DocumentRequest {
        document,
        signature,
        document_type: args.document_type,
        product_group: args.product_group,
        token: args.token,
    });
    let client = Arc::new(RegistryClient::from_config(&config)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling pending submissions");
            let _ = shutdown_tx.send(true);
        }
    });

    let handles: Vec<_> = (0..args.repeat)
        .map(|index| {
            let client = client.clone();
            let request = request.clone();
            let mut shutdown = shutdown_rx.clone();
            tokio::spawn(async move {
                let cancel = async move {
                    // A closed channel means no interrupt can arrive.
                    if shutdown.wait_for(|stop| *stop).await.is_err() {
                        std::future::pending::<()>().await;
                    }
                };
                (index, client.create_document_with_cancel(&request, cancel).await)
            })
        })
        .collect();

    let mut failures = 0usize;
    for handle in handles {
        let (index, result) = handle.await?;
        match result {
            Ok(body) => {
                info!(index, response_len = body.len(), "Document submitted");
                println!("{body}");
            }
            Err(ClientError::Gate(GateError::Cancelled)) => {
                info!(index, "Submission cancelled");
                failures += 1;
            }
            Err(e) => {
                error!(index, error = %e, "Submission failed");
                failures += 1;
            }
        }
    }

    if args.print_metrics {
        print!("{}", client.gate().metrics().render());
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} submissions did not complete", args.repeat);
    }
    Ok(())
}
