//! Command source units as written on disk.
//!
//! A source unit is a YAML file at `<root>/<category>/<command>.yaml`. The category
//! is taken from the directory name and is never declared in the file itself.
//!
//! ```yaml
//! name: announce
//! description: Post an announcement after confirmation
//! aliases: [ann]
//! structured: true
//! text: true
//! guild_only: true
//! cooldown_seconds: 30
//! caller_capabilities: [ManageMessages]
//! bot_capabilities: [SendMessages]
//! parameters:
//!   - name: message
//!     kind: string
//!     description: Text to announce
//!     required: true
//!   - name: priority
//!     kind: integer
//!     choices: [1, 2, 3]
//! ```

use std::{path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Format, Yaml},
};
use serde::Deserialize;

use crate::{
    catalog::{
        CatalogError, ChoiceValue, CommandDefinition, HandlerRegistry, ParameterKind,
        ParameterSpec,
    },
    permissions::{Capability, CapabilitySet},
};

fn default_true() -> bool {
    true
}

/// A parameter as written in a source unit.
#[derive(Debug, Deserialize)]
pub struct ParameterSource {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    /// Allowed values. Only string, integer and number parameters take choices.
    #[serde(default)]
    pub choices: Vec<ChoiceValue>,
}

/// A command as written in a source unit.
#[derive(Debug, Deserialize)]
pub struct CommandSource {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default = "default_true")]
    pub structured: bool,
    #[serde(default = "default_true")]
    pub text: bool,
    #[serde(default)]
    pub guild_only: bool,
    #[serde(default)]
    pub cooldown_seconds: u64,
    #[serde(default)]
    pub caller_capabilities: Vec<String>,
    #[serde(default)]
    pub bot_capabilities: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterSource>,
    /// Handler key, defaults to `name`.
    pub handler: Option<String>,
}

impl CommandSource {
    /// Reads a source unit from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Malformed`] when the file cannot be read or does not
    /// match the expected shape.
    pub fn read(path: &Path) -> Result<Self, CatalogError> {
        Figment::from(Yaml::file_exact(path))
            .extract()
            .map_err(|e| CatalogError::Malformed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
    }

    /// Converts the source into a definition in `category`, binding its handler.
    ///
    /// # Errors
    ///
    /// * [`CatalogError::InvalidName`] - the name is empty or contains whitespace
    /// * [`CatalogError::UnknownCapability`] - a capability name is not known
    /// * [`CatalogError::UnknownParameterKind`] - a structured-capable command uses
    ///   a parameter kind the registry cannot express
    /// * [`CatalogError::ChoicesNotSupported`] - choices are declared on a kind that
    ///   takes none
    /// * [`CatalogError::InvalidChoice`] - a choice does not fit its parameter kind
    /// * [`CatalogError::MissingHandler`] - no handler is registered under the key
    pub fn into_definition(
        self,
        category: &str,
        handlers: &HandlerRegistry,
    ) -> Result<CommandDefinition, CatalogError> {
        let name = self.name.trim().to_ascii_lowercase();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(CatalogError::InvalidName(self.name));
        }

        let handler_key = self.handler.unwrap_or_else(|| name.clone());
        let handler = handlers
            .get(&handler_key)
            .ok_or_else(|| CatalogError::MissingHandler {
                command: name.clone(),
                handler: handler_key.clone(),
            })?;

        let required_caller = parse_capabilities(&name, &self.caller_capabilities)?;
        let required_bot = parse_capabilities(&name, &self.bot_capabilities)?;

        let mut parameters = Vec::with_capacity(self.parameters.len());
        for parameter in self.parameters {
            let kind = ParameterKind::parse(&parameter.kind);
            if self.structured && !kind.is_recognized() {
                return Err(CatalogError::UnknownParameterKind {
                    command: name,
                    parameter: parameter.name,
                    kind: parameter.kind,
                });
            }
            let choices = parse_choices(
                &name,
                &parameter.name,
                &parameter.kind,
                &kind,
                parameter.choices,
            )?;
            parameters.push(
                ParameterSpec::new(parameter.name, kind, parameter.required)
                    .with_description(parameter.description)
                    .with_choices(choices),
            );
        }

        let mut definition = CommandDefinition::new(name, category, handler)
            .with_description(self.description)
            .with_aliases(self.aliases)
            .with_triggers(self.structured, self.text)
            .with_cooldown(Duration::from_secs(self.cooldown_seconds))
            .with_caller_capabilities(required_caller)
            .with_bot_capabilities(required_bot);
        definition.parameters = parameters;
        definition.guild_only = self.guild_only;

        Ok(definition)
    }
}

fn parse_choices(
    command: &str,
    parameter: &str,
    raw_kind: &str,
    kind: &ParameterKind,
    choices: Vec<ChoiceValue>,
) -> Result<Vec<ChoiceValue>, CatalogError> {
    if choices.is_empty() {
        return Ok(choices);
    }
    if !kind.accepts_choices() {
        return Err(CatalogError::ChoicesNotSupported {
            command: command.to_owned(),
            parameter: parameter.to_owned(),
            kind: raw_kind.to_owned(),
        });
    }

    choices
        .into_iter()
        .map(|choice| {
            let raw = choice.to_string();
            kind.choice_value(choice)
                .ok_or_else(|| CatalogError::InvalidChoice {
                    command: command.to_owned(),
                    parameter: parameter.to_owned(),
                    choice: raw,
                })
        })
        .collect()
}

fn parse_capabilities(command: &str, names: &[String]) -> Result<CapabilitySet, CatalogError> {
    names
        .iter()
        .map(|raw| {
            raw.parse::<Capability>()
                .map_err(|_| CatalogError::UnknownCapability {
                    command: command.to_owned(),
                    capability: raw.clone(),
                })
        })
        .collect()
}
