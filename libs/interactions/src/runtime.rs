use std::sync::Arc;

use anyhow::{Context as _, Result};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    chain::{HandlerChain, HandlerEntry},
    config::InteractionsConfig,
    context::Context,
    dispatcher::Dispatcher,
    handler::{AutocompleteHandler, CommandHandler, NoSuggestions},
    registry::{CommandBundle, CommandRegistry},
    rest::{InteractionApi, RemoteCommand, sync_commands},
    server::{InteractionServer, router, serve, serve_listener},
    types::CommandScope,
};

/// Collects commands and chain entries before anything is served.
pub struct WebhookBuilder {
    config: InteractionsConfig,
    registry: CommandRegistry,
    chain: HandlerChain,
    default_autocomplete: Arc<dyn AutocompleteHandler>,
}

impl WebhookBuilder {
    pub fn new(config: InteractionsConfig) -> Self {
        let registry = CommandRegistry::new(config.dispatch.scope_policy);
        Self {
            config,
            registry,
            chain: HandlerChain::new(),
            default_autocomplete: Arc::new(NoSuggestions),
        }
    }

    pub fn command(mut self, scope: CommandScope, bundle: CommandBundle) -> Self {
        self.registry.register(scope, bundle);
        self
    }

    pub fn handler(mut self, entry: HandlerEntry) -> Self {
        self.chain.push(entry);
        self
    }

    pub fn fallback(mut self, handler: impl CommandHandler) -> Self {
        self.chain.set_fallback(Arc::new(handler));
        self
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn default_autocomplete(mut self, handler: impl AutocompleteHandler) -> Self {
        self.default_autocomplete = Arc::new(handler);
        self
    }

    /// Builds against the platform REST API described by the config.
    pub fn build(self) -> Result<Webhook> {
        let api = Arc::new(self.config.rest_client()?);
        self.build_with_api(api)
    }

    pub fn build_with_api(self, api: Arc<dyn InteractionApi>) -> Result<Webhook> {
        self.config.validate()?;
        let verifier = self.config.verifier()?;

        let context = Context::new(api);
        let dispatcher = Dispatcher::new(
            Arc::new(self.registry),
            Arc::new(self.chain),
            context.clone(),
        )
        .with_ack_mode(self.config.dispatch.ack_mode)
        .with_default_autocomplete(self.default_autocomplete);

        let server = Arc::new(InteractionServer::new(
            verifier,
            dispatcher,
            self.config.server.body_limit_bytes,
        ));

        Ok(Webhook {
            config: self.config,
            context,
            server,
        })
    }
}

pub struct Webhook {
    config: InteractionsConfig,
    context: Context,
    server: Arc<InteractionServer>,
}

impl Webhook {
    pub fn builder(config: InteractionsConfig) -> WebhookBuilder {
        WebhookBuilder::new(config)
    }

    pub fn router(&self) -> Router {
        router(self.server.clone(), &self.config.server.path)
    }

    pub fn registry(&self) -> &CommandRegistry {
        self.server.dispatcher.registry()
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn config(&self) -> &InteractionsConfig {
        &self.config
    }

    pub async fn sync_commands(&self, scope: &CommandScope) -> Result<Vec<RemoteCommand>> {
        sync_commands(self.context.api().as_ref(), self.registry(), scope)
            .await
            .with_context(|| format!("failed to sync {scope} commands"))
    }

    /// Syncs every scope that has registered commands.
    pub async fn sync_all(&self) -> Result<usize> {
        let mut total = 0;
        for scope in self.registry().scopes() {
            let synced = self.sync_commands(&scope).await?;
            info!(scope = %scope, commands = synced.len(), "synced commands");
            total += synced.len();
        }
        Ok(total)
    }

    /// Serves until `cancel` fires, then waits for acknowledged handlers.
    pub async fn serve(&self, cancel: CancellationToken) -> Result<()> {
        self.log_start();
        serve(
            &self.config.server.bind,
            self.router(),
            self.server.tasks.clone(),
            cancel,
        )
        .await
    }

    pub async fn serve_on(&self, listener: TcpListener, cancel: CancellationToken) -> Result<()> {
        self.log_start();
        serve_listener(listener, self.router(), self.server.tasks.clone(), cancel).await
    }

    fn log_start(&self) {
        info!(
            path = %self.config.server.path,
            commands = self.registry().len(),
            ack_mode = ?self.config.dispatch.ack_mode,
            "starting interaction webhook"
        );
    }
}
