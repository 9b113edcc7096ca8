use hookline_interactions::{
    CommandBundle, CommandSchema, CommandScope, MessageData, WebhookBuilder, handler_fn,
};
use tracing::debug;

/// The commands `hookline` ships with, registered globally.
pub fn register(builder: WebhookBuilder) -> WebhookBuilder {
    builder
        .command(CommandScope::Global, ping())
        .fallback(handler_fn(|_ctx, interaction| async move {
            debug!(
                interaction_id = %interaction.id(),
                kind = interaction.kind_name(),
                "no handler claimed interaction"
            );
            Ok(())
        }))
}

pub fn ping() -> CommandBundle {
    CommandBundle::chat_input(CommandSchema::new("ping", "Check that the webhook is alive"))
        .with_handler(handler_fn(|ctx, interaction| async move {
            ctx.send_reply(&interaction, MessageData::text("Pong!"), true)
                .await?;
            Ok(())
        }))
}
