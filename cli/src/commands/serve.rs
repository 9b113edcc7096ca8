use std::path::Path;

use hookline_interactions::{CliFlags, InteractionsConfig, Webhook};
use tokio_util::sync::CancellationToken;

use crate::builtin;

pub async fn handle_serve(config_path: Option<&Path>, bind: Option<String>) -> Result<(), String> {
    let cli = CliFlags {
        bind,
        ..Default::default()
    };
    let config = InteractionsConfig::load(config_path, &cli)
        .map_err(|error| format!("Failed to load config: {error}"))?;

    let webhook = builtin::register(Webhook::builder(config))
        .build()
        .map_err(|error| format!("Failed to initialize webhook: {error}"))?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    println!(
        "Interactions endpoint: http://{}{}",
        webhook.config().server.bind,
        webhook.config().server.path
    );

    webhook
        .serve(cancel)
        .await
        .map_err(|error| format!("Webhook server error: {error:#}"))
}
