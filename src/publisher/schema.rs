//! Serialized form of structured commands, as accepted by the remote registry.

use serde::{Deserialize, Serialize};

use crate::{
    catalog::{ChoiceValue, CommandDefinition, ParameterSpec},
    utils::truncate_chars,
};

/// Longest description the registry accepts.
pub const MAX_DESCRIPTION_CHARS: usize = 100;

/// Substituted for empty descriptions, which the registry rejects.
pub const DEFAULT_DESCRIPTION: &str = "No description provided.";

/// Registry type of a chat input command.
const CHAT_INPUT: u8 = 1;

/// A command as sent to the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredCommand {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<RegisteredOption>,
    /// Decimal permission bitfield a member needs to see the command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_member_permissions: Option<String>,
    #[serde(default = "default_true")]
    pub dm_permission: bool,
}

/// One option of a [`RegisteredCommand`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredOption {
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<OptionChoice>,
}

/// A choice of a [`RegisteredOption`]. The value type follows the option type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChoice {
    pub name: String,
    pub value: ChoiceValue,
}

fn default_true() -> bool {
    true
}

/// Trims a description to the registry limits, substituting a placeholder for
/// empty text.
pub fn normalize_description(description: &str) -> String {
    let description = description.trim();
    if description.is_empty() {
        return DEFAULT_DESCRIPTION.to_owned();
    }
    truncate_chars(description, MAX_DESCRIPTION_CHARS)
}

impl RegisteredCommand {
    /// Serializes a structured-capable definition.
    ///
    /// Required options are listed before optional ones, as the registry demands,
    /// keeping their relative order otherwise.
    pub fn from_definition(definition: &CommandDefinition) -> Self {
        let mut parameters: Vec<&ParameterSpec> = definition.parameters.iter().collect();
        parameters.sort_by_key(|parameter| !parameter.required);

        let options = parameters
            .into_iter()
            .filter_map(|parameter| {
                let kind = parameter.kind.registry_type()?;
                Some(RegisteredOption {
                    kind,
                    name: parameter.name.clone(),
                    description: normalize_description(&parameter.description),
                    required: parameter.required,
                    choices: parameter
                        .choices
                        .iter()
                        .map(|choice| OptionChoice {
                            name: choice.to_string(),
                            value: choice.clone(),
                        })
                        .collect(),
                })
            })
            .collect();

        RegisteredCommand {
            name: definition.name.clone(),
            kind: CHAT_INPUT,
            description: normalize_description(&definition.description),
            options,
            default_member_permissions: (!definition.required_caller.is_empty())
                .then(|| definition.required_caller.to_bitfield()),
            dm_permission: !definition.guild_only,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        catalog::{ParameterKind, handler_fn},
        permissions::{Capability, CapabilitySet},
    };

    fn definition() -> CommandDefinition {
        CommandDefinition::new("announce", "moderation", handler_fn(|_, _| async { Ok(()) }))
            .with_description("Post an announcement")
            .guild_only()
            .with_caller_capabilities(CapabilitySet::from([Capability::ManageMessages]))
            .with_parameter(ParameterSpec::new("pin", ParameterKind::Boolean, false))
            .with_parameter(
                ParameterSpec::new("message", ParameterKind::String, true)
                    .with_description("Text to announce"),
            )
    }

    #[test]
    fn test_normalize_description() {
        assert_eq!(normalize_description("  "), DEFAULT_DESCRIPTION);
        assert_eq!(normalize_description(" Ping "), "Ping");

        let long = normalize_description(&"x".repeat(250));
        assert_eq!(long.chars().count(), MAX_DESCRIPTION_CHARS);
        assert!(long.ends_with('…'));
    }

    #[test]
    fn test_from_definition_orders_required_options_first() {
        let command = RegisteredCommand::from_definition(&definition());

        let names: Vec<_> = command.options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["message", "pin"]);
        assert_eq!(command.options[1].description, DEFAULT_DESCRIPTION);
    }

    #[test]
    fn test_serialized_shape() {
        let command = RegisteredCommand::from_definition(&definition());

        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            json!({
                "name": "announce",
                "type": 1,
                "description": "Post an announcement",
                "options": [
                    {"type": 3, "name": "message", "description": "Text to announce", "required": true},
                    {"type": 5, "name": "pin", "description": DEFAULT_DESCRIPTION, "required": false}
                ],
                "default_member_permissions": "8192",
                "dm_permission": false
            })
        );
    }

    #[test]
    fn test_choice_values_keep_their_type() {
        let definition = CommandDefinition::new("roll", "fun", handler_fn(|_, _| async { Ok(()) }))
            .with_parameter(
                ParameterSpec::new("sides", ParameterKind::Integer, true)
                    .with_choices([6i64, 20]),
            )
            .with_parameter(
                ParameterSpec::new("mode", ParameterKind::String, false)
                    .with_choices(["fast", "fair"]),
            );

        let command = RegisteredCommand::from_definition(&definition);
        let options = serde_json::to_value(&command).unwrap()["options"].clone();

        assert_eq!(
            options[0]["choices"],
            json!([{"name": "6", "value": 6}, {"name": "20", "value": 20}])
        );
        assert!(options[0]["choices"][0]["value"].is_number());
        assert_eq!(
            options[1]["choices"],
            json!([{"name": "fast", "value": "fast"}, {"name": "fair", "value": "fair"}])
        );
    }
}
