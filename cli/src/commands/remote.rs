use std::path::Path;

use hookline_interactions::{
    CliFlags, CommandScope, InteractionApi, InteractionsConfig, RestClient, WebhookBuilder,
    rest::sync_commands,
};

use crate::builtin;

fn load_client(config_path: Option<&Path>) -> Result<(InteractionsConfig, RestClient), String> {
    let config = InteractionsConfig::load(config_path, &CliFlags::default())
        .map_err(|error| format!("Failed to load config: {error}"))?;
    let client = config
        .rest_client()
        .map_err(|error| format!("Failed to create API client: {error}"))?;
    Ok((config, client))
}

fn scope_for(guild: Option<String>) -> CommandScope {
    match guild {
        Some(guild) => CommandScope::guild(guild),
        None => CommandScope::Global,
    }
}

pub async fn handle_sync(config_path: Option<&Path>, guild: Option<String>) -> Result<(), String> {
    let (config, client) = load_client(config_path)?;
    let builder = builtin::register(WebhookBuilder::new(config));
    let scope = scope_for(guild);

    let synced = sync_commands(&client, builder.registry(), &scope)
        .await
        .map_err(|error| format!("Failed to sync {scope} commands: {error}"))?;

    println!("✓ Synced {} {scope} command(s)", synced.len());
    for command in synced {
        println!("  {} ({})", command.name, command.id);
    }
    Ok(())
}

pub async fn handle_list(
    config_path: Option<&Path>,
    guild: Option<String>,
    with_localizations: bool,
) -> Result<(), String> {
    let (_, client) = load_client(config_path)?;
    let scope = scope_for(guild);

    let commands = client
        .list_commands(&scope, with_localizations.then_some(true))
        .await
        .map_err(|error| format!("Failed to list {scope} commands: {error}"))?;

    let text = serde_json::to_string_pretty(&commands)
        .map_err(|error| format!("Failed to render commands: {error}"))?;
    println!("{text}");
    Ok(())
}

pub async fn handle_latency(config_path: Option<&Path>) -> Result<(), String> {
    let (_, client) = load_client(config_path)?;

    let latency = client
        .gateway_latency()
        .await
        .map_err(|error| format!("Failed to reach the platform API: {error}"))?;

    println!("{} ms", latency.as_millis());
    Ok(())
}
