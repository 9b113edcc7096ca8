use std::{fmt, sync::Arc};

use futures_util::{FutureExt, future::BoxFuture};
use serde::{Deserialize, Serialize};
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

use crate::{
    chain::HandlerChain,
    context::Context,
    error::DispatchError,
    handler::{AutocompleteHandler, NoSuggestions},
    registry::CommandRegistry,
    response::AutocompleteData,
    types::Interaction,
};

/// When command, component and modal interactions are acknowledged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckMode {
    /// Acknowledge with `202` first and run the handler on a spawned task.
    #[default]
    Immediate,
    /// Await the handler; `204` on success, `500` on failure.
    AfterHandler,
}

/// Handler work that has not started yet. Returned in [`Reply::Accepted`] so
/// the serving layer can acknowledge before it runs.
pub struct DeferredWork {
    interaction_id: String,
    kind: &'static str,
    future: BoxFuture<'static, Result<(), DispatchError>>,
}

impl fmt::Debug for DeferredWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredWork")
            .field("interaction_id", &self.interaction_id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl DeferredWork {
    pub fn interaction_id(&self) -> &str {
        &self.interaction_id
    }

    pub async fn run(self) -> Result<(), DispatchError> {
        self.future.await
    }

    /// Runs the work on the tokio runtime, logging a failure since nobody is
    /// left to answer it.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.logged())
    }

    /// Like [`Self::spawn`], but tracked so shutdown can wait for it.
    pub fn spawn_tracked(self, tracker: &TaskTracker) -> tokio::task::JoinHandle<()> {
        tracker.spawn(self.logged())
    }

    async fn logged(self) {
        let interaction_id = self.interaction_id;
        let kind = self.kind;
        if let Err(err) = self.future.await {
            error!(interaction_id = %interaction_id, kind, error = %err, "interaction handler failed");
        }
    }
}

/// What the serving layer should answer.
#[derive(Debug)]
pub enum Reply {
    Pong,
    /// Acknowledge now, then run the work.
    Accepted(DeferredWork),
    /// The handler already ran to completion.
    Completed,
    Autocomplete(AutocompleteData),
    /// Autocomplete produced nothing; empty acknowledgement.
    NoChanges,
    Unhandled { kind: u16 },
}

/// Routes authenticated interactions to registry handlers, the handler chain,
/// or autocomplete providers.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    chain: Arc<HandlerChain>,
    default_autocomplete: Arc<dyn AutocompleteHandler>,
    context: Context,
    ack_mode: AckMode,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("commands", &self.registry.len())
            .field("chain", &self.chain.len())
            .field("ack_mode", &self.ack_mode)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(registry: Arc<CommandRegistry>, chain: Arc<HandlerChain>, context: Context) -> Self {
        Self {
            registry,
            chain,
            default_autocomplete: Arc::new(NoSuggestions),
            context,
            ack_mode: AckMode::default(),
        }
    }

    pub fn with_ack_mode(mut self, ack_mode: AckMode) -> Self {
        self.ack_mode = ack_mode;
        self
    }

    /// Used for autocomplete on commands whose bundle has no provider.
    pub fn with_default_autocomplete(mut self, handler: Arc<dyn AutocompleteHandler>) -> Self {
        self.default_autocomplete = handler;
        self
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn ack_mode(&self) -> AckMode {
        self.ack_mode
    }

    pub async fn dispatch(&self, interaction: Interaction) -> Result<Reply, DispatchError> {
        match &interaction {
            Interaction::Ping(_) => {
                debug!(interaction_id = %interaction.id(), "answering ping");
                Ok(Reply::Pong)
            }
            Interaction::Autocomplete { .. } => self.autocomplete(&interaction).await,
            Interaction::Unknown { kind, .. } => {
                debug!(interaction_id = %interaction.id(), kind, "ignoring unknown interaction kind");
                Ok(Reply::Unhandled { kind: *kind })
            }
            Interaction::ApplicationCommand { .. }
            | Interaction::MessageComponent { .. }
            | Interaction::ModalSubmit { .. } => match self.ack_mode {
                AckMode::Immediate => Ok(Reply::Accepted(self.defer(interaction))),
                AckMode::AfterHandler => {
                    self.route(&interaction).await?;
                    Ok(Reply::Completed)
                }
            },
        }
    }

    fn defer(&self, interaction: Interaction) -> DeferredWork {
        let dispatcher = self.clone();
        let interaction_id = interaction.id().to_string();
        let kind = interaction.kind_name();
        DeferredWork {
            interaction_id,
            kind,
            future: async move { dispatcher.route(&interaction).await }.boxed(),
        }
    }

    /// Runs the registry handler for a command, or the chain for anything
    /// the registry does not claim.
    pub async fn route(&self, interaction: &Interaction) -> Result<(), DispatchError> {
        if let Interaction::ApplicationCommand { data, .. } = interaction {
            let scope = interaction.scope();
            let handler = self
                .registry
                .lookup(&scope, data.kind, &data.name)
                .and_then(|bundle| bundle.handler.clone());

            if let Some(handler) = handler {
                debug!(scope = %scope, name = %data.name, "routing to command handler");
                return handler
                    .handle(&self.context, interaction)
                    .await
                    .map_err(|error| DispatchError::Command {
                        name: data.name.clone(),
                        error,
                    });
            }

            debug!(scope = %scope, name = %data.name, "no command handler, running chain");
        }

        let handled = self
            .chain
            .run(&self.context, interaction)
            .await
            .map_err(DispatchError::Chain)?;
        debug!(
            interaction_id = %interaction.id(),
            kind = interaction.kind_name(),
            handled,
            "handler chain finished"
        );
        Ok(())
    }

    async fn autocomplete(&self, interaction: &Interaction) -> Result<Reply, DispatchError> {
        let Some(data) = interaction.command() else {
            return Ok(Reply::NoChanges);
        };

        let scope = interaction.scope();
        let handler = self
            .registry
            .lookup(&scope, data.kind, &data.name)
            .and_then(|bundle| bundle.autocomplete.clone())
            .unwrap_or_else(|| self.default_autocomplete.clone());

        let result = handler
            .complete(interaction)
            .await
            .map_err(|error| DispatchError::Autocomplete {
                name: data.name.clone(),
                error,
            })?;

        Ok(match result {
            Some(choices) => Reply::Autocomplete(choices),
            None => Reply::NoChanges,
        })
    }
}
