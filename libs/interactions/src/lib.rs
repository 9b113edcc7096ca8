pub mod chain;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod registry;
pub mod response;
pub mod rest;
pub mod runtime;
pub mod server;
pub mod types;
pub mod verify;

pub use chain::{HandlerChain, HandlerEntry};
pub use config::{CliFlags, InteractionsConfig};
pub use context::Context;
pub use dispatcher::{AckMode, DeferredWork, Dispatcher, Reply};
pub use error::{AuthError, DispatchError, ParseError, VerifierError};
pub use handler::{
    AutocompleteHandler, CommandHandler, InteractionPredicate, NoSuggestions, NoopHandler,
    autocomplete_fn, handler_fn, matches_fn, predicate_fn,
};
pub use registry::{
    CommandBundle, CommandDeclaration, CommandKey, CommandRegistry, CommandSchema, ScopePolicy,
};
pub use response::{
    AutocompleteChoice, AutocompleteData, EPHEMERAL, InteractionResponse, MessageData, ModalData,
};
pub use rest::{InteractionApi, RemoteCommand, RemoteMessage, RestClient, RestError};
pub use runtime::{Webhook, WebhookBuilder};
pub use server::InteractionServer;
pub use types::{CommandScope, CommandType, GuildId, Interaction, InteractionMeta};
pub use verify::{InboundBody, SignatureHeaders, SignatureVerifier};
