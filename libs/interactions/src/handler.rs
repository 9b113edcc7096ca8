use std::future::Future;

use anyhow::Result;
use async_trait::async_trait;

use crate::{context::Context, response::AutocompleteData, types::Interaction};

/// Runs a command, or a handler-chain action, for one interaction.
#[async_trait]
pub trait CommandHandler: Send + Sync + 'static {
    async fn handle(&self, ctx: &Context, interaction: &Interaction) -> Result<()>;
}

/// Produces suggestions for an autocomplete interaction. `None` means
/// "no changes" and is answered with an empty acknowledgement.
#[async_trait]
pub trait AutocompleteHandler: Send + Sync + 'static {
    async fn complete(&self, interaction: &Interaction) -> Result<Option<AutocompleteData>>;
}

/// Decides whether a handler-chain entry claims an interaction.
#[async_trait]
pub trait InteractionPredicate: Send + Sync + 'static {
    async fn matches(&self, interaction: &Interaction) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

#[async_trait]
impl CommandHandler for NoopHandler {
    async fn handle(&self, _ctx: &Context, _interaction: &Interaction) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoSuggestions;

#[async_trait]
impl AutocompleteHandler for NoSuggestions {
    async fn complete(&self, _interaction: &Interaction) -> Result<Option<AutocompleteData>> {
        Ok(None)
    }
}

pub struct HandlerFn<F>(F);

/// Adapts an async closure into a [`CommandHandler`]. The closure receives
/// owned clones so its future can be `'static`.
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Context, Interaction) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    HandlerFn(f)
}

#[async_trait]
impl<F, Fut> CommandHandler for HandlerFn<F>
where
    F: Fn(Context, Interaction) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn handle(&self, ctx: &Context, interaction: &Interaction) -> Result<()> {
        (self.0)(ctx.clone(), interaction.clone()).await
    }
}

pub struct AutocompleteFn<F>(F);

pub fn autocomplete_fn<F, Fut>(f: F) -> AutocompleteFn<F>
where
    F: Fn(Interaction) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<AutocompleteData>>> + Send + 'static,
{
    AutocompleteFn(f)
}

#[async_trait]
impl<F, Fut> AutocompleteHandler for AutocompleteFn<F>
where
    F: Fn(Interaction) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<AutocompleteData>>> + Send + 'static,
{
    async fn complete(&self, interaction: &Interaction) -> Result<Option<AutocompleteData>> {
        (self.0)(interaction.clone()).await
    }
}

pub struct PredicateFn<F>(F);

/// Async predicate from a closure over an owned interaction.
pub fn predicate_fn<F, Fut>(f: F) -> PredicateFn<F>
where
    F: Fn(Interaction) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool>> + Send + 'static,
{
    PredicateFn(f)
}

#[async_trait]
impl<F, Fut> InteractionPredicate for PredicateFn<F>
where
    F: Fn(Interaction) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool>> + Send + 'static,
{
    async fn matches(&self, interaction: &Interaction) -> Result<bool> {
        (self.0)(interaction.clone()).await
    }
}

pub struct MatchesFn<F>(F);

/// Synchronous predicate, for the common `custom_id`/name checks.
pub fn matches_fn<F>(f: F) -> MatchesFn<F>
where
    F: Fn(&Interaction) -> bool + Send + Sync + 'static,
{
    MatchesFn(f)
}

#[async_trait]
impl<F> InteractionPredicate for MatchesFn<F>
where
    F: Fn(&Interaction) -> bool + Send + Sync + 'static,
{
    async fn matches(&self, interaction: &Interaction) -> Result<bool> {
        Ok((self.0)(interaction))
    }
}
