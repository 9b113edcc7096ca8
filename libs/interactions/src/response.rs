use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Message flag making a reply visible only to the invoking user.
pub const EPHEMERAL: u64 = 1 << 6;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts: Option<bool>,
    /// Fields passed through untouched (`allowed_mentions`, `attachments`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MessageData {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// ORs the ephemeral flag into any flags already set.
    pub fn ephemeral(mut self) -> Self {
        self.flags = Some(self.flags.unwrap_or(0) | EPHEMERAL);
        self
    }

    pub fn is_ephemeral(&self) -> bool {
        self.flags.is_some_and(|flags| flags & EPHEMERAL != 0)
    }

    pub fn with_component(mut self, component: Value) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_embed(mut self, embed: Value) -> Self {
        self.embeds.push(embed);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutocompleteChoice {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutocompleteData {
    pub choices: Vec<AutocompleteChoice>,
}

impl AutocompleteData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn choice(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.choices.push(AutocompleteChoice {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalData {
    pub custom_id: String,
    pub title: String,
    pub components: Vec<Value>,
}

/// Body of an interaction callback, serialised as `{"type": n, "data": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionResponse {
    Pong,
    ChannelMessageWithSource(MessageData),
    DeferredChannelMessageWithSource { ephemeral: bool },
    DeferredMessageUpdate,
    UpdateMessage(MessageData),
    AutocompleteResult(AutocompleteData),
    Modal(ModalData),
}

impl InteractionResponse {
    pub fn code(&self) -> u8 {
        match self {
            InteractionResponse::Pong => 1,
            InteractionResponse::ChannelMessageWithSource(_) => 4,
            InteractionResponse::DeferredChannelMessageWithSource { .. } => 5,
            InteractionResponse::DeferredMessageUpdate => 6,
            InteractionResponse::UpdateMessage(_) => 7,
            InteractionResponse::AutocompleteResult(_) => 8,
            InteractionResponse::Modal(_) => 9,
        }
    }
}

#[derive(Serialize)]
struct WireResponse<'a> {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<WireData<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WireData<'a> {
    Message(&'a MessageData),
    Autocomplete(&'a AutocompleteData),
    Modal(&'a ModalData),
    Flags { flags: u64 },
}

impl Serialize for InteractionResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let data = match self {
            InteractionResponse::Pong | InteractionResponse::DeferredMessageUpdate => None,
            InteractionResponse::ChannelMessageWithSource(message)
            | InteractionResponse::UpdateMessage(message) => Some(WireData::Message(message)),
            InteractionResponse::DeferredChannelMessageWithSource { ephemeral } => {
                ephemeral.then_some(WireData::Flags { flags: EPHEMERAL })
            }
            InteractionResponse::AutocompleteResult(choices) => {
                Some(WireData::Autocomplete(choices))
            }
            InteractionResponse::Modal(modal) => Some(WireData::Modal(modal)),
        };

        WireResponse {
            kind: self.code(),
            data,
        }
        .serialize(serializer)
    }
}
