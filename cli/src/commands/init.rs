use std::{
    io::{self, Write},
    path::Path,
};

use hookline_interactions::{InteractionsConfig, SignatureVerifier, config::default_config_path};

pub fn handle_init(
    config_path: Option<&Path>,
    application_id: Option<String>,
    public_key: Option<String>,
    token: Option<String>,
    bind: Option<String>,
    force: bool,
) -> Result<(), String> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);
    if path.exists() && !force {
        return Err(format!(
            "Config already exists at {}. Use --force to overwrite.",
            path.display()
        ));
    }

    let non_interactive = application_id.is_some() || public_key.is_some() || token.is_some();

    let application_id = if non_interactive {
        application_id
    } else {
        prompt_optional("Application id: ")?
    }
    .and_then(clean_value);

    let public_key = if non_interactive {
        public_key
    } else {
        prompt_optional("Public key (hex): ")?
    }
    .and_then(clean_value);

    let token = if non_interactive {
        token
    } else {
        prompt_optional("Bot token (leave empty to skip): ")?
    }
    .and_then(clean_value);

    let Some(public_key) = public_key else {
        return Err("A public key is required to verify interactions.".to_string());
    };
    SignatureVerifier::from_hex(&public_key)
        .map_err(|error| format!("Invalid public key: {error}"))?;

    let mut config = InteractionsConfig::default();
    config.application.id = application_id.unwrap_or_default();
    config.application.public_key = public_key;
    config.application.token = token.unwrap_or_default();
    if let Some(bind) = bind {
        config.server.bind = bind;
    }

    config
        .validate()
        .map_err(|error| format!("Invalid config: {error}"))?;
    let saved = config
        .save(Some(&path))
        .map_err(|error| format!("Failed to save config: {error}"))?;

    println!("✓ Config saved to {}", saved.display());
    println!(
        "  Interactions endpoint: http://{}{}",
        config.server.bind, config.server.path
    );
    Ok(())
}

fn clean_value(value: String) -> Option<String> {
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn prompt_optional(prompt: &str) -> Result<Option<String>, String> {
    print!("{prompt}");
    io::stdout()
        .flush()
        .map_err(|error| format!("Failed to flush stdout: {error}"))?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(|error| format!("Failed to read input: {error}"))?;

    Ok(clean_value(input))
}
