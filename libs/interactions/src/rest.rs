use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Method, StatusCode, header::AUTHORIZATION};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    registry::{CommandDeclaration, CommandRegistry},
    response::{InteractionResponse, MessageData},
    types::{CommandScope, CommandType},
};

pub const DEFAULT_API_BASE_URL: &str = "https://discord.com/api/v10";

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("platform returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("not found: {0}")]
    NotFound(String),
}

/// A command definition as stored by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCommand {
    pub id: String,
    #[serde(default)]
    pub application_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: CommandType,
    #[serde(default)]
    pub version: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMessage {
    pub id: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outbound calls handlers make while processing an interaction, plus the
/// command-management endpoints used by sync.
#[async_trait]
pub trait InteractionApi: Send + Sync + 'static {
    fn application_id(&self) -> &str;

    async fn create_response(
        &self,
        interaction_id: &str,
        token: &str,
        response: &InteractionResponse,
    ) -> Result<(), RestError>;

    async fn get_original_response(&self, token: &str) -> Result<RemoteMessage, RestError>;

    async fn edit_original_response(
        &self,
        token: &str,
        message: &MessageData,
    ) -> Result<RemoteMessage, RestError>;

    async fn delete_original_response(&self, token: &str) -> Result<(), RestError>;

    async fn create_followup(
        &self,
        token: &str,
        message: &MessageData,
    ) -> Result<RemoteMessage, RestError>;

    async fn get_followup(&self, token: &str, message_id: &str)
    -> Result<RemoteMessage, RestError>;

    async fn edit_followup(
        &self,
        token: &str,
        message_id: &str,
        message: &MessageData,
    ) -> Result<RemoteMessage, RestError>;

    async fn delete_followup(&self, token: &str, message_id: &str) -> Result<(), RestError>;

    async fn list_commands(
        &self,
        scope: &CommandScope,
        with_localizations: Option<bool>,
    ) -> Result<Vec<RemoteCommand>, RestError>;

    async fn create_command(
        &self,
        scope: &CommandScope,
        command: &CommandDeclaration,
    ) -> Result<RemoteCommand, RestError>;

    async fn get_command(
        &self,
        scope: &CommandScope,
        command_id: &str,
    ) -> Result<RemoteCommand, RestError>;

    async fn edit_command(
        &self,
        scope: &CommandScope,
        command_id: &str,
        patch: &Value,
    ) -> Result<RemoteCommand, RestError>;

    async fn delete_command(&self, scope: &CommandScope, command_id: &str)
    -> Result<(), RestError>;

    async fn overwrite_commands(
        &self,
        scope: &CommandScope,
        commands: &[CommandDeclaration],
    ) -> Result<Vec<RemoteCommand>, RestError>;
}

/// Replaces the remote command set for `scope` with the registry's.
pub async fn sync_commands(
    api: &dyn InteractionApi,
    registry: &CommandRegistry,
    scope: &CommandScope,
) -> Result<Vec<RemoteCommand>, RestError> {
    let snapshot = registry.snapshot(scope);
    debug!(scope = %scope, commands = snapshot.len(), "syncing commands");
    api.overwrite_commands(scope, &snapshot).await
}

#[derive(Clone)]
pub struct RestClient {
    base_url: String,
    application_id: String,
    token: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("application_id", &self.application_id)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    pub fn new(application_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_API_BASE_URL, application_id, token)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        application_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            application_id: application_id.into(),
            token: token.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Round trip to `GET /gateway`.
    pub async fn gateway_latency(&self) -> Result<Duration, RestError> {
        let started = Instant::now();
        let response = self.request(Method::GET, "/gateway", None::<&()>).await?;
        ensure_success(response).await?;
        Ok(started.elapsed())
    }

    fn commands_path(&self, scope: &CommandScope) -> String {
        match scope {
            CommandScope::Global => format!("/applications/{}/commands", self.application_id),
            CommandScope::Guild(guild_id) => format!(
                "/applications/{}/guilds/{guild_id}/commands",
                self.application_id
            ),
        }
    }

    fn command_path(&self, scope: &CommandScope, command_id: &str) -> String {
        format!("{}/{command_id}", self.commands_path(scope))
    }

    fn webhook_path(&self, token: &str) -> String {
        format!("/webhooks/{}/{token}", self.application_id)
    }

    fn webhook_message_path(&self, token: &str, message_id: &str) -> String {
        format!("{}/messages/{message_id}", self.webhook_path(token))
    }

    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, RestError> {
        let mut request = self
            .http
            .request(method, format!("{}{}", self.base_url, path));

        if !self.token.is_empty() {
            request = request.header(AUTHORIZATION, format!("Bot {}", self.token));
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }

    async fn request_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, RestError> {
        let response = self.request(method, path, body).await?;
        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    async fn request_empty<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), RestError> {
        let response = self.request(method, path, body).await?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl InteractionApi for RestClient {
    fn application_id(&self) -> &str {
        &self.application_id
    }

    async fn create_response(
        &self,
        interaction_id: &str,
        token: &str,
        response: &InteractionResponse,
    ) -> Result<(), RestError> {
        self.request_empty(
            Method::POST,
            &format!("/interactions/{interaction_id}/{token}/callback"),
            Some(response),
        )
        .await
    }

    async fn get_original_response(&self, token: &str) -> Result<RemoteMessage, RestError> {
        self.request_json(
            Method::GET,
            &self.webhook_message_path(token, "@original"),
            None::<&()>,
        )
        .await
    }

    async fn edit_original_response(
        &self,
        token: &str,
        message: &MessageData,
    ) -> Result<RemoteMessage, RestError> {
        self.request_json(
            Method::PATCH,
            &self.webhook_message_path(token, "@original"),
            Some(message),
        )
        .await
    }

    async fn delete_original_response(&self, token: &str) -> Result<(), RestError> {
        self.request_empty(
            Method::DELETE,
            &self.webhook_message_path(token, "@original"),
            None::<&()>,
        )
        .await
    }

    async fn create_followup(
        &self,
        token: &str,
        message: &MessageData,
    ) -> Result<RemoteMessage, RestError> {
        self.request_json(Method::POST, &self.webhook_path(token), Some(message))
            .await
    }

    async fn get_followup(
        &self,
        token: &str,
        message_id: &str,
    ) -> Result<RemoteMessage, RestError> {
        self.request_json(
            Method::GET,
            &self.webhook_message_path(token, message_id),
            None::<&()>,
        )
        .await
    }

    async fn edit_followup(
        &self,
        token: &str,
        message_id: &str,
        message: &MessageData,
    ) -> Result<RemoteMessage, RestError> {
        self.request_json(
            Method::PATCH,
            &self.webhook_message_path(token, message_id),
            Some(message),
        )
        .await
    }

    async fn delete_followup(&self, token: &str, message_id: &str) -> Result<(), RestError> {
        self.request_empty(
            Method::DELETE,
            &self.webhook_message_path(token, message_id),
            None::<&()>,
        )
        .await
    }

    async fn list_commands(
        &self,
        scope: &CommandScope,
        with_localizations: Option<bool>,
    ) -> Result<Vec<RemoteCommand>, RestError> {
        let mut path = self.commands_path(scope);
        if let Some(with_localizations) = with_localizations {
            path.push_str(&format!("?with_localizations={with_localizations}"));
        }
        self.request_json(Method::GET, &path, None::<&()>).await
    }

    async fn create_command(
        &self,
        scope: &CommandScope,
        command: &CommandDeclaration,
    ) -> Result<RemoteCommand, RestError> {
        self.request_json(Method::POST, &self.commands_path(scope), Some(command))
            .await
    }

    async fn get_command(
        &self,
        scope: &CommandScope,
        command_id: &str,
    ) -> Result<RemoteCommand, RestError> {
        self.request_json(
            Method::GET,
            &self.command_path(scope, command_id),
            None::<&()>,
        )
        .await
    }

    async fn edit_command(
        &self,
        scope: &CommandScope,
        command_id: &str,
        patch: &Value,
    ) -> Result<RemoteCommand, RestError> {
        self.request_json(
            Method::PATCH,
            &self.command_path(scope, command_id),
            Some(patch),
        )
        .await
    }

    async fn delete_command(
        &self,
        scope: &CommandScope,
        command_id: &str,
    ) -> Result<(), RestError> {
        self.request_empty(
            Method::DELETE,
            &self.command_path(scope, command_id),
            None::<&()>,
        )
        .await
    }

    async fn overwrite_commands(
        &self,
        scope: &CommandScope,
        commands: &[CommandDeclaration],
    ) -> Result<Vec<RemoteCommand>, RestError> {
        self.request_json(Method::PUT, &self.commands_path(scope), Some(commands))
            .await
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, RestError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::NOT_FOUND => Err(RestError::NotFound(body)),
        _ => Err(RestError::Api {
            status: status.as_u16(),
            body,
        }),
    }
}
