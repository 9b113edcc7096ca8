use std::{fmt, sync::Arc};

use anyhow::{Context as _, Result};
use tracing::debug;

use crate::{
    context::Context,
    handler::{CommandHandler, InteractionPredicate, NoopHandler, matches_fn},
    types::Interaction,
};

/// One link in the fallback chain.
#[derive(Clone)]
pub struct HandlerEntry {
    predicate: Arc<dyn InteractionPredicate>,
    action: Arc<dyn CommandHandler>,
    continue_chain: bool,
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("continue_chain", &self.continue_chain)
            .finish_non_exhaustive()
    }
}

impl HandlerEntry {
    pub fn new(predicate: impl InteractionPredicate, action: impl CommandHandler) -> Self {
        Self {
            predicate: Arc::new(predicate),
            action: Arc::new(action),
            continue_chain: false,
        }
    }

    /// Entry with a synchronous predicate.
    pub fn when<F>(predicate: F, action: impl CommandHandler) -> Self
    where
        F: Fn(&Interaction) -> bool + Send + Sync + 'static,
    {
        Self::new(matches_fn(predicate), action)
    }

    /// Lets later entries run after this one matches.
    pub fn continue_chain(mut self) -> Self {
        self.continue_chain = true;
        self
    }

    pub fn continues(&self) -> bool {
        self.continue_chain
    }
}

/// Ordered entries for interactions the registry does not claim, followed by
/// a default handler.
#[derive(Clone)]
pub struct HandlerChain {
    entries: Vec<HandlerEntry>,
    fallback: Arc<dyn CommandHandler>,
}

impl Default for HandlerChain {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl HandlerChain {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            fallback: Arc::new(NoopHandler),
        }
    }

    pub fn with_fallback(mut self, fallback: impl CommandHandler) -> Self {
        self.fallback = Arc::new(fallback);
        self
    }

    pub fn set_fallback(&mut self, fallback: Arc<dyn CommandHandler>) {
        self.fallback = fallback;
    }

    pub fn append(&mut self, entries: impl IntoIterator<Item = HandlerEntry>) {
        self.entries.extend(entries);
    }

    pub fn push(&mut self, entry: HandlerEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs matching entries in order. The default handler runs unless a
    /// matching entry without `continue_chain` stopped the chain. Returns
    /// whether any entry matched.
    pub async fn run(&self, ctx: &Context, interaction: &Interaction) -> Result<bool> {
        let mut handled = false;

        for (index, entry) in self.entries.iter().enumerate() {
            let matched = entry
                .predicate
                .matches(interaction)
                .await
                .with_context(|| format!("predicate of chain entry {index} failed"))?;
            if !matched {
                continue;
            }

            handled = true;
            debug!(index, interaction_id = %interaction.id(), "chain entry matched");
            entry
                .action
                .handle(ctx, interaction)
                .await
                .with_context(|| format!("action of chain entry {index} failed"))?;

            if !entry.continue_chain {
                return Ok(true);
            }
        }

        self.fallback
            .handle(ctx, interaction)
            .await
            .context("default interaction handler failed")?;

        Ok(handled)
    }
}
