use std::{collections::HashMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    handler::{AutocompleteHandler, CommandHandler},
    types::{CommandScope, CommandType},
};

/// Declaration fields sent to the platform. Options and anything else
/// (`default_member_permissions`, localizations, ...) are passed through as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandSchema {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CommandSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_option(mut self, option: Value) -> Self {
        self.options.push(option);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Schema-only view of a bundle, as pushed to the remote command set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDeclaration {
    #[serde(rename = "type")]
    pub kind: CommandType,
    #[serde(flatten)]
    pub schema: CommandSchema,
}

#[derive(Clone)]
pub struct CommandBundle {
    pub kind: CommandType,
    pub schema: CommandSchema,
    pub handler: Option<Arc<dyn CommandHandler>>,
    pub autocomplete: Option<Arc<dyn AutocompleteHandler>>,
}

impl fmt::Debug for CommandBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBundle")
            .field("kind", &self.kind)
            .field("schema", &self.schema)
            .field("handler", &self.handler.is_some())
            .field("autocomplete", &self.autocomplete.is_some())
            .finish()
    }
}

impl CommandBundle {
    pub fn new(kind: CommandType, schema: CommandSchema) -> Self {
        Self {
            kind,
            schema,
            handler: None,
            autocomplete: None,
        }
    }

    pub fn chat_input(schema: CommandSchema) -> Self {
        Self::new(CommandType::ChatInput, schema)
    }

    pub fn user(schema: CommandSchema) -> Self {
        Self::new(CommandType::User, schema)
    }

    pub fn message(schema: CommandSchema) -> Self {
        Self::new(CommandType::Message, schema)
    }

    pub fn with_handler(mut self, handler: impl CommandHandler) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn with_autocomplete(mut self, autocomplete: impl AutocompleteHandler) -> Self {
        self.autocomplete = Some(Arc::new(autocomplete));
        self
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn declaration(&self) -> CommandDeclaration {
        CommandDeclaration {
            kind: self.kind,
            schema: self.schema.clone(),
        }
    }
}

#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct CommandKey {
    pub scope: CommandScope,
    pub kind: CommandType,
    pub name: String,
}

/// How a guild-scoped lookup treats commands registered globally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopePolicy {
    /// Guild interactions only see guild commands.
    #[default]
    Strict,
    /// Guild interactions that miss fall back to the global namespace.
    FallbackToGlobal,
}

/// Commands keyed by (scope, type, name). Built before serving, read-only after.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    policy: ScopePolicy,
    entries: HashMap<CommandKey, CommandBundle>,
    order: Vec<CommandKey>,
}

impl CommandRegistry {
    pub fn new(policy: ScopePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> ScopePolicy {
        self.policy
    }

    /// Inserts or replaces. A replaced command keeps its original position in
    /// snapshots.
    pub fn register(&mut self, scope: CommandScope, bundle: CommandBundle) {
        let key = CommandKey {
            scope,
            kind: bundle.kind,
            name: bundle.schema.name.clone(),
        };

        if self.entries.insert(key.clone(), bundle).is_some() {
            debug!(scope = %key.scope, name = %key.name, "replaced command");
        } else {
            debug!(scope = %key.scope, name = %key.name, "registered command");
            self.order.push(key);
        }
    }

    pub fn lookup(&self, scope: &CommandScope, kind: CommandType, name: &str) -> Option<&CommandBundle> {
        let key = CommandKey {
            scope: scope.clone(),
            kind,
            name: name.to_string(),
        };

        match self.entries.get(&key) {
            Some(bundle) => Some(bundle),
            None if self.policy == ScopePolicy::FallbackToGlobal
                && matches!(scope, CommandScope::Guild(_)) =>
            {
                self.entries.get(&CommandKey {
                    scope: CommandScope::Global,
                    ..key
                })
            }
            None => None,
        }
    }

    /// Declarations registered in exactly `scope`, in registration order.
    pub fn snapshot(&self, scope: &CommandScope) -> Vec<CommandDeclaration> {
        self.order
            .iter()
            .filter(|key| &key.scope == scope)
            .filter_map(|key| self.entries.get(key))
            .map(CommandBundle::declaration)
            .collect()
    }

    /// Every scope with at least one command, global first.
    pub fn scopes(&self) -> Vec<CommandScope> {
        let mut scopes: Vec<CommandScope> = Vec::new();
        for key in &self.order {
            if !scopes.contains(&key.scope) {
                scopes.push(key.scope.clone());
            }
        }
        scopes.sort_by_key(|scope| !matches!(scope, CommandScope::Global));
        scopes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
