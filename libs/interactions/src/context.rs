use std::sync::Arc;

use crate::{
    response::{InteractionResponse, MessageData, ModalData},
    rest::{InteractionApi, RemoteMessage, RestError},
    types::Interaction,
};

/// Handed to every handler. Wraps the outbound API so handlers can answer the
/// interaction they were given without holding on to the client directly.
#[derive(Clone)]
pub struct Context {
    api: Arc<dyn InteractionApi>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("application_id", &self.api.application_id())
            .finish()
    }
}

impl Context {
    pub fn new(api: Arc<dyn InteractionApi>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &Arc<dyn InteractionApi> {
        &self.api
    }

    async fn respond(
        &self,
        interaction: &Interaction,
        response: InteractionResponse,
    ) -> Result<(), RestError> {
        self.api
            .create_response(interaction.id(), interaction.token(), &response)
            .await
    }

    pub async fn send_reply(
        &self,
        interaction: &Interaction,
        message: MessageData,
        ephemeral: bool,
    ) -> Result<(), RestError> {
        let message = if ephemeral { message.ephemeral() } else { message };
        self.respond(
            interaction,
            InteractionResponse::ChannelMessageWithSource(message),
        )
        .await
    }

    pub async fn defer_reply(
        &self,
        interaction: &Interaction,
        ephemeral: bool,
    ) -> Result<(), RestError> {
        self.respond(
            interaction,
            InteractionResponse::DeferredChannelMessageWithSource { ephemeral },
        )
        .await
    }

    pub async fn defer_update(&self, interaction: &Interaction) -> Result<(), RestError> {
        self.respond(interaction, InteractionResponse::DeferredMessageUpdate)
            .await
    }

    /// Edits the message a component is attached to.
    pub async fn send_update(
        &self,
        interaction: &Interaction,
        message: MessageData,
    ) -> Result<(), RestError> {
        self.respond(interaction, InteractionResponse::UpdateMessage(message))
            .await
    }

    pub async fn send_modal(
        &self,
        interaction: &Interaction,
        modal: ModalData,
    ) -> Result<(), RestError> {
        self.respond(interaction, InteractionResponse::Modal(modal))
            .await
    }

    pub async fn fetch_reply(&self, interaction: &Interaction) -> Result<RemoteMessage, RestError> {
        self.api.get_original_response(interaction.token()).await
    }

    pub async fn edit_reply(
        &self,
        interaction: &Interaction,
        message: &MessageData,
    ) -> Result<RemoteMessage, RestError> {
        self.api
            .edit_original_response(interaction.token(), message)
            .await
    }

    pub async fn delete_reply(&self, interaction: &Interaction) -> Result<(), RestError> {
        self.api.delete_original_response(interaction.token()).await
    }

    pub async fn send_followup(
        &self,
        interaction: &Interaction,
        message: MessageData,
        ephemeral: bool,
    ) -> Result<RemoteMessage, RestError> {
        let message = if ephemeral { message.ephemeral() } else { message };
        self.api
            .create_followup(interaction.token(), &message)
            .await
    }

    pub async fn fetch_followup(
        &self,
        interaction: &Interaction,
        message_id: &str,
    ) -> Result<RemoteMessage, RestError> {
        self.api
            .get_followup(interaction.token(), message_id)
            .await
    }

    pub async fn edit_followup(
        &self,
        interaction: &Interaction,
        message_id: &str,
        message: &MessageData,
    ) -> Result<RemoteMessage, RestError> {
        self.api
            .edit_followup(interaction.token(), message_id, message)
            .await
    }

    pub async fn delete_followup(
        &self,
        interaction: &Interaction,
        message_id: &str,
    ) -> Result<(), RestError> {
        self.api
            .delete_followup(interaction.token(), message_id)
            .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::{Map, Value, json};

    use super::Context;
    use crate::{
        registry::CommandDeclaration,
        response::{InteractionResponse, MessageData},
        rest::{InteractionApi, RemoteCommand, RemoteMessage, RestError},
        types::{CommandScope, Interaction},
    };

    /// Records every outbound call as `"<method> <target>"` plus its payload.
    #[derive(Default)]
    pub(crate) struct RecordingApi {
        pub(crate) calls: Mutex<Vec<(String, Value)>>,
    }

    impl RecordingApi {
        fn record(&self, call: String, payload: Value) {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((call, payload));
            }
        }

        pub(crate) fn calls(&self) -> Vec<(String, Value)> {
            match self.calls.lock() {
                Ok(calls) => calls.clone(),
                Err(error) => panic!("calls lock poisoned: {error}"),
            }
        }

        fn message(id: &str) -> RemoteMessage {
            RemoteMessage {
                id: id.to_string(),
                channel_id: "c1".to_string(),
                content: String::new(),
                extra: Map::new(),
            }
        }
    }

    fn to_value<T: serde::Serialize + ?Sized>(value: &T) -> Value {
        serde_json::to_value(value).unwrap_or(Value::Null)
    }

    #[async_trait]
    impl InteractionApi for RecordingApi {
        fn application_id(&self) -> &str {
            "app"
        }

        async fn create_response(
            &self,
            interaction_id: &str,
            token: &str,
            response: &InteractionResponse,
        ) -> Result<(), RestError> {
            self.record(
                format!("callback {interaction_id}/{token}"),
                to_value(response),
            );
            Ok(())
        }

        async fn get_original_response(&self, token: &str) -> Result<RemoteMessage, RestError> {
            self.record(format!("get_original {token}"), Value::Null);
            Ok(Self::message("@original"))
        }

        async fn edit_original_response(
            &self,
            token: &str,
            message: &MessageData,
        ) -> Result<RemoteMessage, RestError> {
            self.record(format!("edit_original {token}"), to_value(message));
            Ok(Self::message("@original"))
        }

        async fn delete_original_response(&self, token: &str) -> Result<(), RestError> {
            self.record(format!("delete_original {token}"), Value::Null);
            Ok(())
        }

        async fn create_followup(
            &self,
            token: &str,
            message: &MessageData,
        ) -> Result<RemoteMessage, RestError> {
            self.record(format!("followup {token}"), to_value(message));
            Ok(Self::message("f1"))
        }

        async fn get_followup(
            &self,
            token: &str,
            message_id: &str,
        ) -> Result<RemoteMessage, RestError> {
            self.record(format!("get_followup {token}/{message_id}"), Value::Null);
            Ok(Self::message(message_id))
        }

        async fn edit_followup(
            &self,
            token: &str,
            message_id: &str,
            message: &MessageData,
        ) -> Result<RemoteMessage, RestError> {
            self.record(
                format!("edit_followup {token}/{message_id}"),
                to_value(message),
            );
            Ok(Self::message(message_id))
        }

        async fn delete_followup(&self, token: &str, message_id: &str) -> Result<(), RestError> {
            self.record(format!("delete_followup {token}/{message_id}"), Value::Null);
            Ok(())
        }

        async fn list_commands(
            &self,
            scope: &CommandScope,
            _with_localizations: Option<bool>,
        ) -> Result<Vec<RemoteCommand>, RestError> {
            self.record(format!("list {scope}"), Value::Null);
            Ok(Vec::new())
        }

        async fn create_command(
            &self,
            scope: &CommandScope,
            command: &CommandDeclaration,
        ) -> Result<RemoteCommand, RestError> {
            self.record(format!("create {scope}"), to_value(command));
            Err(RestError::NotFound("unsupported in fake".to_string()))
        }

        async fn get_command(
            &self,
            scope: &CommandScope,
            command_id: &str,
        ) -> Result<RemoteCommand, RestError> {
            self.record(format!("get {scope}/{command_id}"), Value::Null);
            Err(RestError::NotFound(command_id.to_string()))
        }

        async fn edit_command(
            &self,
            scope: &CommandScope,
            command_id: &str,
            patch: &Value,
        ) -> Result<RemoteCommand, RestError> {
            self.record(format!("edit {scope}/{command_id}"), patch.clone());
            Err(RestError::NotFound(command_id.to_string()))
        }

        async fn delete_command(
            &self,
            scope: &CommandScope,
            command_id: &str,
        ) -> Result<(), RestError> {
            self.record(format!("delete {scope}/{command_id}"), Value::Null);
            Ok(())
        }

        async fn overwrite_commands(
            &self,
            scope: &CommandScope,
            commands: &[CommandDeclaration],
        ) -> Result<Vec<RemoteCommand>, RestError> {
            self.record(format!("overwrite {scope}"), to_value(commands));
            Ok(Vec::new())
        }
    }

    pub(crate) fn recording_context() -> (Context, Arc<RecordingApi>) {
        let api = Arc::new(RecordingApi::default());
        (Context::new(api.clone()), api)
    }

    fn component_interaction() -> Interaction {
        let value = json!({
            "type": 3,
            "id": "i1",
            "application_id": "app",
            "token": "tok",
            "data": {"custom_id": "vote", "component_type": 2}
        });
        match Interaction::from_value(value) {
            Ok(interaction) => interaction,
            Err(error) => panic!("fixture should parse: {error}"),
        }
    }

    #[tokio::test]
    async fn replies_go_through_the_interaction_callback() {
        let (ctx, api) = recording_context();
        let interaction = component_interaction();

        if let Err(error) = ctx
            .send_reply(&interaction, MessageData::text("thanks"), true)
            .await
        {
            panic!("reply failed: {error}");
        }
        if let Err(error) = ctx.defer_update(&interaction).await {
            panic!("defer failed: {error}");
        }

        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "callback i1/tok");
        assert_eq!(
            calls[0].1,
            json!({"type": 4, "data": {"content": "thanks", "flags": 64}})
        );
        assert_eq!(calls[1].1, json!({"type": 6}));
    }

    #[tokio::test]
    async fn followups_and_original_reply_use_the_token() {
        let (ctx, api) = recording_context();
        let interaction = component_interaction();

        let followup = match ctx
            .send_followup(&interaction, MessageData::text("later"), false)
            .await
        {
            Ok(message) => message,
            Err(error) => panic!("followup failed: {error}"),
        };
        assert_eq!(followup.id, "f1");

        if let Err(error) = ctx.delete_followup(&interaction, "f1").await {
            panic!("delete followup failed: {error}");
        }
        if let Err(error) = ctx.edit_reply(&interaction, &MessageData::text("edited")).await {
            panic!("edit reply failed: {error}");
        }

        let calls: Vec<String> = api.calls().into_iter().map(|(call, _)| call).collect();
        assert_eq!(
            calls,
            vec![
                "followup tok".to_string(),
                "delete_followup tok/f1".to_string(),
                "edit_original tok".to_string(),
            ]
        );
    }
}
