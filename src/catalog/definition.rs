//! Command definitions and parameter schemas.

use std::{fmt, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{catalog::CommandHandler, permissions::CapabilitySet};

/// The kind of a command parameter.
///
/// Mirrors the option types accepted by the platform's structured-command registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterKind {
    String,
    Integer,
    Number,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Attachment,
    /// A kind the registry does not know. Only allowed on text-only commands.
    Unrecognized(String),
}

impl ParameterKind {
    /// Parses a kind name as written in a command source file.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "string" | "text" => ParameterKind::String,
            "integer" | "int" => ParameterKind::Integer,
            "number" | "float" => ParameterKind::Number,
            "boolean" | "bool" => ParameterKind::Boolean,
            "user" => ParameterKind::User,
            "channel" => ParameterKind::Channel,
            "role" => ParameterKind::Role,
            "mentionable" => ParameterKind::Mentionable,
            "attachment" => ParameterKind::Attachment,
            _ => ParameterKind::Unrecognized(raw.to_owned()),
        }
    }

    /// Returns the registry's numeric option type, or `None` for unrecognized kinds.
    pub fn registry_type(&self) -> Option<u8> {
        match self {
            ParameterKind::String => Some(3),
            ParameterKind::Integer => Some(4),
            ParameterKind::Boolean => Some(5),
            ParameterKind::User => Some(6),
            ParameterKind::Channel => Some(7),
            ParameterKind::Role => Some(8),
            ParameterKind::Mentionable => Some(9),
            ParameterKind::Number => Some(10),
            ParameterKind::Attachment => Some(11),
            ParameterKind::Unrecognized(_) => None,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, ParameterKind::Unrecognized(_))
    }

    /// Returns `true` for the kinds the registry accepts choices on.
    pub fn accepts_choices(&self) -> bool {
        matches!(
            self,
            ParameterKind::String | ParameterKind::Integer | ParameterKind::Number
        )
    }

    /// Converts `choice` to the value type of this kind.
    ///
    /// Numeric text is parsed for numeric kinds and numbers are written out for
    /// string kinds. Returns `None` when the choice cannot be expressed, including
    /// every choice on a kind that does not accept choices.
    pub fn choice_value(&self, choice: ChoiceValue) -> Option<ChoiceValue> {
        match (self, choice) {
            (ParameterKind::String, ChoiceValue::String(text)) => Some(ChoiceValue::String(text)),
            (ParameterKind::String, number) => Some(ChoiceValue::String(number.to_string())),
            (ParameterKind::Integer, ChoiceValue::Integer(number)) => {
                Some(ChoiceValue::Integer(number))
            }
            (ParameterKind::Integer, ChoiceValue::String(text)) => {
                text.trim().parse().ok().map(ChoiceValue::Integer)
            }
            (ParameterKind::Number, ChoiceValue::Number(number)) if number.is_finite() => {
                Some(ChoiceValue::Number(number))
            }
            (ParameterKind::Number, ChoiceValue::Integer(number)) => {
                Some(ChoiceValue::Number(number as f64))
            }
            (ParameterKind::Number, ChoiceValue::String(text)) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|number| number.is_finite())
                .map(ChoiceValue::Number),
            _ => None,
        }
    }
}

/// The value of a parameter choice, typed by the parameter's kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    String(String),
    Integer(i64),
    Number(f64),
}

impl fmt::Display for ChoiceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChoiceValue::String(text) => f.write_str(text),
            ChoiceValue::Integer(number) => write!(f, "{}", number),
            ChoiceValue::Number(number) => write!(f, "{}", number),
        }
    }
}

impl From<&str> for ChoiceValue {
    fn from(text: &str) -> Self {
        ChoiceValue::String(text.to_owned())
    }
}

impl From<String> for ChoiceValue {
    fn from(text: String) -> Self {
        ChoiceValue::String(text)
    }
}

impl From<i64> for ChoiceValue {
    fn from(number: i64) -> Self {
        ChoiceValue::Integer(number)
    }
}

impl From<f64> for ChoiceValue {
    fn from(number: f64) -> Self {
        ChoiceValue::Number(number)
    }
}

/// One entry of a command's ordered parameter schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    pub description: String,
    pub required: bool,
    /// Allowed values, empty when the parameter is free-form.
    pub choices: Vec<ChoiceValue>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, kind: ParameterKind, required: bool) -> Self {
        ParameterSpec {
            name: name.into().to_ascii_lowercase(),
            kind,
            description: String::new(),
            required,
            choices: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_choices(
        mut self,
        choices: impl IntoIterator<Item = impl Into<ChoiceValue>>,
    ) -> Self {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }
}

/// An immutable command definition, held for the whole process lifetime.
///
/// Definitions are built with [`CommandDefinition::new`] and the `with_*`
/// builders, or loaded from YAML sources by [`crate::catalog::Catalog::load`].
#[derive(Clone)]
pub struct CommandDefinition {
    /// Canonical lowercase name, unique across the catalog.
    pub name: String,
    pub description: String,
    /// Alternative names, unique across names and aliases of the catalog.
    pub aliases: Vec<String>,
    /// Derived from the containing directory name.
    pub category: String,
    pub supports_structured: bool,
    pub supports_text: bool,
    /// Rejects invocations outside of a guild.
    pub guild_only: bool,
    pub cooldown: Duration,
    pub required_caller: CapabilitySet,
    pub required_bot: CapabilitySet,
    pub parameters: Vec<ParameterSpec>,
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandDefinition {
    /// Creates a definition reachable from both invocation channels, with no
    /// cooldown and no requirements.
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
    ) -> Self {
        CommandDefinition {
            name: name.into().to_ascii_lowercase(),
            description: String::new(),
            aliases: Vec::new(),
            category: category.into(),
            supports_structured: true,
            supports_text: true,
            guild_only: false,
            cooldown: Duration::ZERO,
            required_caller: CapabilitySet::new(),
            required_bot: CapabilitySet::new(),
            parameters: Vec::new(),
            handler,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_aliases(mut self, aliases: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.aliases = aliases
            .into_iter()
            .map(|alias| alias.into().to_ascii_lowercase())
            .collect();
        self
    }

    pub fn with_triggers(mut self, structured: bool, text: bool) -> Self {
        self.supports_structured = structured;
        self.supports_text = text;
        self
    }

    pub fn guild_only(mut self) -> Self {
        self.guild_only = true;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_caller_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.required_caller = capabilities;
        self
    }

    pub fn with_bot_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.required_bot = capabilities;
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }
}

impl fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("category", &self.category)
            .field("supports_structured", &self.supports_structured)
            .field("supports_text", &self.supports_text)
            .field("guild_only", &self.guild_only)
            .field("cooldown", &self.cooldown)
            .field("required_caller", &self.required_caller)
            .field("required_bot", &self.required_bot)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}
