use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::ParseError;

#[derive(Debug, Clone, Serialize, Deserialize, Hash, Eq, PartialEq)]
pub struct GuildId(pub String);

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GuildId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for GuildId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Where a command is visible: platform-wide or inside a single guild.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum CommandScope {
    Global,
    Guild(GuildId),
}

impl CommandScope {
    pub fn guild(id: impl Into<GuildId>) -> Self {
        Self::Guild(id.into())
    }

    pub fn from_guild(guild_id: Option<&GuildId>) -> Self {
        match guild_id {
            Some(id) => Self::Guild(id.clone()),
            None => Self::Global,
        }
    }
}

impl fmt::Display for CommandScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandScope::Global => write!(f, "global"),
            CommandScope::Guild(id) => write!(f, "guild:{id}"),
        }
    }
}

/// Application command type, carried as an integer on the wire.
///
/// Types this crate does not know about are kept as `Other` so that they miss
/// the registry and reach the handler chain instead of failing the request.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Default)]
pub enum CommandType {
    #[default]
    ChatInput,
    User,
    Message,
    Other(u16),
}

impl CommandType {
    pub fn code(self) -> u16 {
        match self {
            CommandType::ChatInput => 1,
            CommandType::User => 2,
            CommandType::Message => 3,
            CommandType::Other(code) => code,
        }
    }

    pub fn from_code(code: u16) -> Self {
        match code {
            1 => CommandType::ChatInput,
            2 => CommandType::User,
            3 => CommandType::Message,
            other => CommandType::Other(other),
        }
    }
}

impl Serialize for CommandType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}

impl<'de> Deserialize<'de> for CommandType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u16::deserialize(deserializer)?;
        Ok(Self::from_code(code))
    }
}

/// Fields shared by every interaction kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionMeta {
    pub id: String,
    pub application_id: String,
    pub token: String,
    pub guild_id: Option<GuildId>,
    pub channel_id: Option<String>,
    pub member: Option<Value>,
    pub user: Option<Value>,
    pub locale: Option<String>,
}

impl InteractionMeta {
    /// The invoking user's id, from `member.user` in guilds or `user` in DMs.
    pub fn user_id(&self) -> Option<&str> {
        self.member
            .as_ref()
            .and_then(|member| member.get("user"))
            .or(self.user.as_ref())
            .and_then(|user| user.get("id"))
            .and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandData {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: CommandType,
    #[serde(default)]
    pub options: Vec<Value>,
    #[serde(default)]
    pub resolved: Option<Value>,
    #[serde(default)]
    pub target_id: Option<String>,
}

impl CommandData {
    /// Top-level option by name.
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options
            .iter()
            .find(|option| option.get("name").and_then(Value::as_str) == Some(name))
    }

    /// The option the user is typing into during autocomplete, searched
    /// through subcommand groups.
    pub fn focused_option(&self) -> Option<&Value> {
        find_focused(&self.options)
    }
}

fn find_focused(options: &[Value]) -> Option<&Value> {
    options.iter().find_map(|option| {
        if option.get("focused").and_then(Value::as_bool) == Some(true) {
            return Some(option);
        }
        option
            .get("options")
            .and_then(Value::as_array)
            .and_then(|nested| find_focused(nested))
    })
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComponentData {
    pub custom_id: String,
    pub component_type: u16,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub resolved: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModalSubmitData {
    pub custom_id: String,
    #[serde(default)]
    pub components: Vec<Value>,
}

impl ModalSubmitData {
    /// Submitted value of the text input with the given `custom_id`.
    pub fn text_input(&self, custom_id: &str) -> Option<&str> {
        self.components
            .iter()
            .filter_map(|row| row.get("components").and_then(Value::as_array))
            .flatten()
            .find(|input| input.get("custom_id").and_then(Value::as_str) == Some(custom_id))
            .and_then(|input| input.get("value"))
            .and_then(Value::as_str)
    }
}

/// An inbound event, classified once at the parse boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    Ping(InteractionMeta),
    ApplicationCommand {
        meta: InteractionMeta,
        data: CommandData,
    },
    MessageComponent {
        meta: InteractionMeta,
        data: ComponentData,
        message: Option<Value>,
    },
    Autocomplete {
        meta: InteractionMeta,
        data: CommandData,
    },
    ModalSubmit {
        meta: InteractionMeta,
        data: ModalSubmitData,
        message: Option<Value>,
    },
    Unknown {
        meta: InteractionMeta,
        kind: u16,
    },
}

pub const PING: u16 = 1;
pub const APPLICATION_COMMAND: u16 = 2;
pub const MESSAGE_COMPONENT: u16 = 3;
pub const APPLICATION_COMMAND_AUTOCOMPLETE: u16 = 4;
pub const MODAL_SUBMIT: u16 = 5;

#[derive(Debug, Deserialize)]
struct RawInteraction {
    #[serde(rename = "type")]
    kind: u16,
    id: String,
    #[serde(default)]
    application_id: String,
    #[serde(default)]
    token: String,
    #[serde(default)]
    guild_id: Option<String>,
    #[serde(default)]
    channel_id: Option<String>,
    #[serde(default)]
    member: Option<Value>,
    #[serde(default)]
    user: Option<Value>,
    #[serde(default)]
    locale: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
}

impl Interaction {
    pub fn parse(body: &[u8]) -> Result<Self, ParseError> {
        let raw: RawInteraction = serde_json::from_slice(body)?;
        Self::from_raw(raw)
    }

    pub fn from_value(value: Value) -> Result<Self, ParseError> {
        let raw: RawInteraction = serde_json::from_value(value)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawInteraction) -> Result<Self, ParseError> {
        let kind = raw.kind;
        let meta = InteractionMeta {
            id: raw.id,
            application_id: raw.application_id,
            token: raw.token,
            guild_id: raw.guild_id.map(GuildId),
            channel_id: raw.channel_id,
            member: raw.member,
            user: raw.user,
            locale: raw.locale,
        };

        let interaction = match kind {
            PING => Interaction::Ping(meta),
            APPLICATION_COMMAND => Interaction::ApplicationCommand {
                meta,
                data: decode_data(kind, raw.data)?,
            },
            MESSAGE_COMPONENT => Interaction::MessageComponent {
                meta,
                data: decode_data(kind, raw.data)?,
                message: raw.message,
            },
            APPLICATION_COMMAND_AUTOCOMPLETE => Interaction::Autocomplete {
                meta,
                data: decode_data(kind, raw.data)?,
            },
            MODAL_SUBMIT => Interaction::ModalSubmit {
                meta,
                data: decode_data(kind, raw.data)?,
                message: raw.message,
            },
            other => Interaction::Unknown { meta, kind: other },
        };

        Ok(interaction)
    }

    pub fn meta(&self) -> &InteractionMeta {
        match self {
            Interaction::Ping(meta)
            | Interaction::ApplicationCommand { meta, .. }
            | Interaction::MessageComponent { meta, .. }
            | Interaction::Autocomplete { meta, .. }
            | Interaction::ModalSubmit { meta, .. }
            | Interaction::Unknown { meta, .. } => meta,
        }
    }

    pub fn id(&self) -> &str {
        &self.meta().id
    }

    pub fn token(&self) -> &str {
        &self.meta().token
    }

    pub fn guild_id(&self) -> Option<&GuildId> {
        self.meta().guild_id.as_ref()
    }

    pub fn scope(&self) -> CommandScope {
        CommandScope::from_guild(self.guild_id())
    }

    pub fn kind_code(&self) -> u16 {
        match self {
            Interaction::Ping(_) => PING,
            Interaction::ApplicationCommand { .. } => APPLICATION_COMMAND,
            Interaction::MessageComponent { .. } => MESSAGE_COMPONENT,
            Interaction::Autocomplete { .. } => APPLICATION_COMMAND_AUTOCOMPLETE,
            Interaction::ModalSubmit { .. } => MODAL_SUBMIT,
            Interaction::Unknown { kind, .. } => *kind,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Interaction::Ping(_) => "ping",
            Interaction::ApplicationCommand { .. } => "application_command",
            Interaction::MessageComponent { .. } => "message_component",
            Interaction::Autocomplete { .. } => "autocomplete",
            Interaction::ModalSubmit { .. } => "modal_submit",
            Interaction::Unknown { .. } => "unknown",
        }
    }

    /// Command data for application command and autocomplete interactions.
    pub fn command(&self) -> Option<&CommandData> {
        match self {
            Interaction::ApplicationCommand { data, .. } | Interaction::Autocomplete { data, .. } => {
                Some(data)
            }
            _ => None,
        }
    }

    /// `custom_id` of the component or modal that produced this interaction.
    pub fn custom_id(&self) -> Option<&str> {
        match self {
            Interaction::MessageComponent { data, .. } => Some(&data.custom_id),
            Interaction::ModalSubmit { data, .. } => Some(&data.custom_id),
            _ => None,
        }
    }
}

fn decode_data<T: serde::de::DeserializeOwned>(
    kind: u16,
    data: Option<Value>,
) -> Result<T, ParseError> {
    let data = data.ok_or(ParseError::MissingData { kind })?;
    serde_json::from_value(data).map_err(|error| ParseError::InvalidData { kind, error })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{CommandScope, CommandType, GuildId, Interaction};
    use crate::error::ParseError;

    fn parse(value: serde_json::Value) -> Interaction {
        match Interaction::from_value(value) {
            Ok(interaction) => interaction,
            Err(error) => panic!("failed to parse interaction: {error}"),
        }
    }

    #[test]
    fn parses_ping() {
        let interaction = parse(json!({"type": 1, "id": "1", "application_id": "app", "token": "t"}));

        assert!(matches!(interaction, Interaction::Ping(_)));
        assert_eq!(interaction.id(), "1");
        assert_eq!(interaction.scope(), CommandScope::Global);
    }

    #[test]
    fn parses_guild_chat_input_command() {
        let raw = br#"{
            "type": 2,
            "id": "99",
            "application_id": "app",
            "token": "tok",
            "guild_id": "g1",
            "member": {"user": {"id": "u1", "username": "alice"}},
            "data": {"id": "c1", "name": "ping", "type": 1, "options": [{"name": "loud", "type": 5, "value": true}]}
        }"#;

        let interaction = match Interaction::parse(raw) {
            Ok(value) => value,
            Err(error) => panic!("failed to parse: {error}"),
        };

        let Interaction::ApplicationCommand { meta, data } = &interaction else {
            panic!("expected application command, got {interaction:?}");
        };
        assert_eq!(data.name, "ping");
        assert_eq!(data.kind, CommandType::ChatInput);
        assert_eq!(data.option("loud").and_then(|v| v.get("value")), Some(&json!(true)));
        assert_eq!(meta.user_id(), Some("u1"));
        assert_eq!(interaction.scope(), CommandScope::Guild(GuildId::from("g1")));
    }

    #[test]
    fn unknown_command_type_is_preserved() {
        let interaction = parse(json!({
            "type": 2, "id": "1", "token": "t",
            "data": {"name": "launch", "type": 4}
        }));

        assert_eq!(
            interaction.command().map(|data| data.kind),
            Some(CommandType::Other(4))
        );
    }

    #[test]
    fn finds_focused_option_inside_subcommand() {
        let interaction = parse(json!({
            "type": 4, "id": "1", "token": "t",
            "data": {"name": "tag", "type": 1, "options": [
                {"name": "get", "type": 1, "options": [
                    {"name": "name", "type": 3, "value": "fo", "focused": true}
                ]}
            ]}
        }));

        let focused = interaction.command().and_then(|data| data.focused_option());
        assert_eq!(focused.and_then(|v| v.get("value")), Some(&json!("fo")));
    }

    #[test]
    fn parses_component_and_modal_custom_ids() {
        let component = parse(json!({
            "type": 3, "id": "1", "token": "t",
            "data": {"custom_id": "confirm", "component_type": 2},
            "message": {"id": "m1"}
        }));
        assert_eq!(component.custom_id(), Some("confirm"));

        let modal = parse(json!({
            "type": 5, "id": "2", "token": "t",
            "data": {"custom_id": "feedback", "components": [
                {"type": 1, "components": [{"type": 4, "custom_id": "body", "value": "great"}]}
            ]}
        }));
        let Interaction::ModalSubmit { data, .. } = &modal else {
            panic!("expected modal submit, got {modal:?}");
        };
        assert_eq!(modal.custom_id(), Some("feedback"));
        assert_eq!(data.text_input("body"), Some("great"));
        assert_eq!(data.text_input("missing"), None);
    }

    #[test]
    fn unknown_interaction_kind_is_not_an_error() {
        let interaction = parse(json!({"type": 42, "id": "1", "token": "t"}));

        assert!(matches!(interaction, Interaction::Unknown { kind: 42, .. }));
        assert_eq!(interaction.kind_code(), 42);
    }

    #[test]
    fn kind_codes_beyond_a_byte_stay_forward_compatible() {
        let interaction = parse(json!({"type": 300, "id": "1", "token": "t"}));
        assert!(matches!(interaction, Interaction::Unknown { kind: 300, .. }));

        let command = parse(json!({
            "type": 2, "id": "1", "token": "t",
            "data": {"name": "launch", "type": 300}
        }));
        assert_eq!(
            command.command().map(|data| data.kind),
            Some(CommandType::Other(300))
        );
    }

    #[test]
    fn command_without_data_is_rejected() {
        let result = Interaction::from_value(json!({"type": 2, "id": "1", "token": "t"}));

        assert!(matches!(result, Err(ParseError::MissingData { kind: 2 })));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let result = Interaction::parse(b"{not json");

        assert!(matches!(result, Err(ParseError::Json(_))));
    }
}
