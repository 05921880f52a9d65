//! Structured command export and registration.
//!
//! Exported top-level routes become structured commands. A route with
//! children exports them as sub-commands, and a child that has children of
//! its own becomes a sub-command group. Leaf routes export their arguments
//! as typed options.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::argument::{Argument, ArgumentKind, Bound};
use crate::error::{ClientError, ExportError};
use crate::interaction::OptionKind;
use crate::model::Id;
use crate::route::{RouteId, Router};

/// A structured command as registered with the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSchema {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionSchema>,
}

/// One option of a [`CommandSchema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSchema {
    #[serde(rename = "type")]
    pub kind: OptionKind,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ChoiceSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<Bound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<Bound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub autocomplete: bool,
}

impl OptionSchema {
    fn new(kind: OptionKind, name: String, description: String) -> Self {
        Self {
            kind,
            name,
            description,
            required: false,
            choices: Vec::new(),
            options: Vec::new(),
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            autocomplete: false,
        }
    }
}

/// A choice typed for the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceSchema {
    pub name: String,
    pub value: ChoiceValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    Integer(i64),
    Number(f64),
    String(String),
}

/// A command known to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredCommand {
    pub id: Id,
    pub name: String,
}

/// The platform's command registration API.
#[async_trait]
pub trait CommandRegistrar: Send + Sync {
    /// Commands currently registered, globally or for one guild.
    async fn commands(&self, guild_id: Option<Id>) -> Result<Vec<RegisteredCommand>, ClientError>;

    async fn create_command(
        &self,
        guild_id: Option<Id>,
        command: &CommandSchema,
    ) -> Result<RegisteredCommand, ClientError>;

    async fn edit_command(
        &self,
        guild_id: Option<Id>,
        command_id: Id,
        command: &CommandSchema,
    ) -> Result<RegisteredCommand, ClientError>;
}

/// Translate every exported top-level route into a command schema.
///
/// Fails on the first route or argument that cannot be exported, so no
/// command is registered with partial information.
pub fn export_commands(router: &Router) -> Result<Vec<CommandSchema>, ExportError> {
    router
        .children(RouteId::ROOT)
        .filter(|&id| router.route(id).is_exported())
        .map(|id| export_command(router, id))
        .collect()
}

/// Translate one route into a command schema.
pub fn export_command(router: &Router, id: RouteId) -> Result<CommandSchema, ExportError> {
    let (name, description) = describe(router, id)?;
    let options = if router.route(id).has_children() {
        subcommands(router, id, 0)?
    } else {
        argument_options(router, id)?
    };

    Ok(CommandSchema {
        name,
        description,
        options,
    })
}

/// Register exported commands, editing the ones the platform already has.
pub async fn register_commands(
    router: &Router,
    registrar: &dyn CommandRegistrar,
    guild_id: Option<Id>,
) -> Result<Vec<RegisteredCommand>, ExportError> {
    let schemas = export_commands(router)?;
    let existing = registrar
        .commands(guild_id)
        .await
        .map_err(|source| ExportError::ListCommands { source })?;

    let mut registered = Vec::with_capacity(schemas.len());
    for schema in &schemas {
        let result = match existing.iter().find(|c| c.name == schema.name) {
            Some(current) => {
                debug!(command = %schema.name, id = %current.id, "editing command");
                registrar.edit_command(guild_id, current.id, schema).await
            }
            None => {
                debug!(command = %schema.name, "creating command");
                registrar.create_command(guild_id, schema).await
            }
        };

        let command = result.map_err(|source| ExportError::Registration {
            command: schema.name.clone(),
            source,
        })?;
        registered.push(command);
    }

    info!(count = registered.len(), guild = ?guild_id, "registered commands");
    Ok(registered)
}

fn describe(router: &Router, id: RouteId) -> Result<(String, String), ExportError> {
    let route = router.route(id);
    let path = router.path(id).join(" ");

    let name = crate::argument::export_name(route.name());
    if name.is_empty() {
        return Err(ExportError::InvalidName {
            path,
            name: route.name().to_string(),
        });
    }
    if route.description().trim().is_empty() {
        return Err(ExportError::MissingDescription { path });
    }

    Ok((name, route.description().to_string()))
}

fn subcommands(
    router: &Router,
    id: RouteId,
    depth: usize,
) -> Result<Vec<OptionSchema>, ExportError> {
    let mut options = Vec::new();

    for child in router.children(id) {
        let route = router.route(child);
        if !route.is_exported() {
            continue;
        }

        let (name, description) = describe(router, child)?;
        let option = if route.has_children() {
            if depth > 0 {
                return Err(ExportError::TooDeep {
                    path: router.path(child).join(" "),
                });
            }
            OptionSchema {
                options: subcommands(router, child, depth + 1)?,
                ..OptionSchema::new(OptionKind::SubCommandGroup, name, description)
            }
        } else {
            OptionSchema {
                options: argument_options(router, child)?,
                ..OptionSchema::new(OptionKind::SubCommand, name, description)
            }
        };
        options.push(option);
    }

    Ok(options)
}

fn argument_options(router: &Router, id: RouteId) -> Result<Vec<OptionSchema>, ExportError> {
    let path = router.path(id).join(" ");
    let mut options = router
        .route(id)
        .arguments()
        .iter()
        .map(|argument| argument_option(&path, argument))
        .collect::<Result<Vec<_>, _>>()?;

    // Required options must come first.
    options.sort_by_key(|o| !o.required);
    Ok(options)
}

fn argument_option(path: &str, argument: &Argument) -> Result<OptionSchema, ExportError> {
    let name = argument.export_name();
    if name.is_empty() {
        return Err(ExportError::InvalidName {
            path: path.to_string(),
            name: argument.name.clone(),
        });
    }
    if argument.description.trim().is_empty() {
        return Err(ExportError::MissingArgumentDescription {
            path: path.to_string(),
            argument: argument.name.clone(),
        });
    }

    let kind = match argument.kind {
        ArgumentKind::String | ArgumentKind::Emoji => OptionKind::String,
        ArgumentKind::Integer => OptionKind::Integer,
        ArgumentKind::Float => OptionKind::Number,
        ArgumentKind::Boolean => OptionKind::Boolean,
        ArgumentKind::User => OptionKind::User,
        ArgumentKind::Channel => OptionKind::Channel,
        ArgumentKind::Role => OptionKind::Role,
    };

    let mut option = OptionSchema::new(kind, name, argument.description.clone());
    option.required = argument.required;
    option.autocomplete = argument.autocomplete.is_some() && argument.choices.is_empty();

    for choice in &argument.choices {
        let invalid = || ExportError::InvalidChoice {
            path: path.to_string(),
            argument: argument.name.clone(),
            value: choice.value.clone(),
        };
        let value = match argument.kind {
            ArgumentKind::String | ArgumentKind::Emoji => ChoiceValue::String(choice.value.clone()),
            ArgumentKind::Integer => {
                ChoiceValue::Integer(choice.value.trim().parse().map_err(|_| invalid())?)
            }
            ArgumentKind::Float => {
                ChoiceValue::Number(choice.value.trim().parse().map_err(|_| invalid())?)
            }
            _ => return Err(invalid()),
        };
        option.choices.push(ChoiceSchema {
            name: choice.name.clone(),
            value,
        });
    }

    match argument.kind {
        ArgumentKind::String => {
            option.min_length = length(argument.min);
            option.max_length = length(argument.max);
        }
        ArgumentKind::Integer | ArgumentKind::Float => {
            option.min_value = argument.min;
            option.max_value = argument.max;
        }
        _ => {}
    }

    Ok(option)
}

fn length(bound: Option<Bound>) -> Option<u32> {
    match bound? {
        Bound::Integer(v) => u32::try_from(v).ok(),
        Bound::Float(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{Handler, handler};
    use crate::testing::MockRegistrar;
    use pretty_assertions::assert_eq;

    fn noop() -> Handler {
        handler(|_ctx| Box::pin(async {}))
    }

    fn router() -> Router {
        let mut router = Router::new();
        router
            .root()
            .on("ping", Some(noop()))
            .describe("Check the bot is alive");

        router
            .root()
            .on("roll [sides int min:2 max:100] <Label!>", Some(noop()))
            .export(true)
            .describe("Roll a die")
            .argument("sides", |a| {
                a.describe("Number of sides");
            })
            .argument("label!", |a| {
                a.describe("What the roll is for");
            });

        let settings = router
            .root()
            .on("settings", None)
            .export(true)
            .describe("Server settings")
            .id();
        router
            .at(settings)
            .on("show", Some(noop()))
            .describe("Show settings");
        router
            .at(settings)
            .on("notify", None)
            .describe("Notifications")
            .on("set <#channel>", Some(noop()))
            .describe("Set the notification channel")
            .argument("channel", |a| {
                a.describe("Target channel");
            });

        router
    }

    #[test]
    fn test_export_skips_unexported() {
        let commands = export_commands(&router()).unwrap();
        let names: Vec<&str> = commands.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["roll", "settings"]);
    }

    #[test]
    fn test_export_leaf_options() {
        let commands = export_commands(&router()).unwrap();
        let roll = &commands[0];

        assert_eq!(roll.options.len(), 2);
        assert_eq!(roll.options[0].name, "label");
        assert!(roll.options[0].required);
        assert_eq!(roll.options[1].name, "sides");
        assert_eq!(roll.options[1].kind, OptionKind::Integer);
        assert_eq!(roll.options[1].min_value, Some(Bound::Integer(2)));
        assert_eq!(roll.options[1].max_value, Some(Bound::Integer(100)));
    }

    #[test]
    fn test_export_nesting() {
        let commands = export_commands(&router()).unwrap();
        let settings = &commands[1];

        let kinds: Vec<(&str, OptionKind)> = settings
            .options
            .iter()
            .map(|o| (o.name.as_str(), o.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("show", OptionKind::SubCommand),
                ("notify", OptionKind::SubCommandGroup),
            ]
        );

        let set = &settings.options[1].options[0];
        assert_eq!(set.kind, OptionKind::SubCommand);
        assert_eq!(set.options[0].kind, OptionKind::Channel);
    }

    #[test]
    fn test_export_requires_descriptions() {
        let mut router = Router::new();
        router.root().on("bare", Some(noop())).export(true);
        assert_eq!(
            export_commands(&router),
            Err(ExportError::MissingDescription {
                path: "bare".to_string()
            })
        );

        let mut router = Router::new();
        router
            .root()
            .on("echo <text>", Some(noop()))
            .export(true)
            .describe("Echo text");
        assert_eq!(
            export_commands(&router),
            Err(ExportError::MissingArgumentDescription {
                path: "echo".to_string(),
                argument: "text".to_string(),
            })
        );
    }

    #[test]
    fn test_export_rejects_too_deep() {
        let mut router = Router::new();
        router
            .root()
            .on("a", None)
            .export(true)
            .describe("a")
            .on("b", None)
            .describe("b")
            .on("c", None)
            .describe("c")
            .on("d", Some(noop()))
            .describe("d");

        assert_eq!(
            export_commands(&router),
            Err(ExportError::TooDeep {
                path: "a b c".to_string()
            })
        );
    }

    #[test]
    fn test_export_typed_choices() {
        let mut router = Router::new();
        router
            .root()
            .on("pick <n int options:\"One=1\",\"Two=2\">", Some(noop()))
            .export(true)
            .describe("Pick")
            .argument("n", |a| {
                a.describe("A number");
            });

        let commands = export_commands(&router).unwrap();
        assert_eq!(
            commands[0].options[0].choices,
            vec![
                ChoiceSchema {
                    name: "One".into(),
                    value: ChoiceValue::Integer(1)
                },
                ChoiceSchema {
                    name: "Two".into(),
                    value: ChoiceValue::Integer(2)
                },
            ]
        );

        let mut router = Router::new();
        router
            .root()
            .on("pick <n int>", Some(noop()))
            .export(true)
            .describe("Pick")
            .argument("n", |a| {
                a.describe("A number").choice("Many", "lots");
            });
        assert!(matches!(
            export_commands(&router),
            Err(ExportError::InvalidChoice { .. })
        ));
    }

    #[test]
    fn test_schema_json() {
        let commands = export_commands(&router()).unwrap();
        let json = serde_json::to_value(&commands[0]).unwrap();

        assert_eq!(json["name"], "roll");
        assert_eq!(json["options"][1]["type"], "integer");
        assert_eq!(json["options"][1]["min_value"], 2);
        assert!(json["options"][1].get("choices").is_none());
    }

    #[tokio::test]
    async fn test_register_edits_existing_and_creates_rest() {
        let registrar = MockRegistrar::with_existing(vec![RegisteredCommand {
            id: Id::new(500),
            name: "settings".into(),
        }]);

        let registered = register_commands(&router(), &registrar, Some(Id::new(1)))
            .await
            .unwrap();

        assert_eq!(registered.len(), 2);
        assert_eq!(registrar.created(), vec!["roll".to_string()]);
        assert_eq!(registrar.edited(), vec![(Id::new(500), "settings".to_string())]);
    }

    #[tokio::test]
    async fn test_register_is_preflighted() {
        let mut router = router();
        router.root().on("broken", Some(noop())).export(true);

        let registrar = MockRegistrar::default();
        let err = register_commands(&router, &registrar, None).await.unwrap_err();

        assert!(matches!(err, ExportError::MissingDescription { .. }));
        assert!(registrar.created().is_empty());
    }
}
