//! Signature compiler.
//!
//! A signature declares a route and its arguments in one line:
//!
//! ```text
//! ban <@user> [reason] [days int min:0 max:7]
//! track <type options:"Twitch=twitch","YouTube=youtube"> <name>
//! ```
//!
//! `<...>` declares a required argument and `[...]` an optional one. A leading
//! `:` `@` `#` or `&` makes the argument an emoji, user, channel or role
//! reference. Otherwise the second word may be `int`, `float` or `bool`.
//! Trailing `key:value` words set `min`, `max` and `options` (alias
//! `choices`). A closer preceded by `\` is part of the argument text.

use tracing::trace;

use crate::argument::{Argument, ArgumentKind, Bound, Choice};
use crate::error::{SignatureError, SignatureResult};

/// A compiled signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    /// Route name as written.
    pub name: String,
    /// The full signature text, used for help output.
    pub usage: String,
    /// Declared arguments in signature order.
    pub arguments: Vec<Argument>,
}

impl Signature {
    /// Number of required arguments.
    pub fn required_count(&self) -> usize {
        self.arguments.iter().filter(|a| a.required).count()
    }
}

/// Compile a signature string.
pub fn parse_signature(signature: &str) -> SignatureResult<Signature> {
    let trimmed = signature.trim();
    let (name, rest) = trimmed
        .split_once(char::is_whitespace)
        .unwrap_or((trimmed, ""));

    if name.is_empty() {
        return Err(SignatureError::MissingName {
            signature: signature.to_string(),
        });
    }

    let offset = trimmed.len() - rest.len();
    let mut arguments: Vec<Argument> = Vec::new();
    let mut pos = 0;

    while let Some(found) = rest[pos..].find(['<', '[']) {
        let start = pos + found;
        let required = rest[start..].starts_with('<');
        let (opener, closer) = if required { ('<', '>') } else { ('[', ']') };

        let Some(end) = find_closer(rest, start + 1, closer) else {
            return Err(SignatureError::Unterminated {
                signature: signature.to_string(),
                opener,
                position: offset + start,
            });
        };

        let body = rest[start + 1..end].replace(&format!("\\{closer}"), &closer.to_string());
        let argument = parse_argument(signature, arguments.len(), &body, required, offset + start)?;

        if arguments.iter().any(|a| a.name == argument.name) {
            return Err(SignatureError::DuplicateArgument {
                signature: signature.to_string(),
                argument: argument.name,
            });
        }

        arguments.push(argument);
        pos = end + 1;
    }

    trace!(name, arguments = arguments.len(), "compiled signature");

    Ok(Signature {
        name: name.to_string(),
        usage: trimmed.to_string(),
        arguments,
    })
}

fn find_closer(text: &str, from: usize, closer: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in text[from..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
        } else if c == closer {
            return Some(from + i);
        }
    }
    None
}

fn parse_argument(
    signature: &str,
    index: usize,
    body: &str,
    required: bool,
    position: usize,
) -> SignatureResult<Argument> {
    let empty = || SignatureError::EmptyArgument {
        signature: signature.to_string(),
        position,
    };

    let mut fields = split_fields(body).into_iter().peekable();
    let first = fields.next().ok_or_else(empty)?;

    let sigil = first.chars().next().and_then(ArgumentKind::from_sigil);
    let name = if sigil.is_some() { &first[1..] } else { &first[..] };
    if name.is_empty() {
        return Err(empty());
    }

    let mut argument = Argument::new(
        index,
        name.to_lowercase(),
        sigil.unwrap_or_default(),
        required,
    );

    if sigil.is_none()
        && let Some(kind) = fields.peek().and_then(|f| ArgumentKind::from_keyword(f))
    {
        argument.kind = kind;
        fields.next();
    }

    for field in fields {
        let Some((key, value)) = field.split_once(':') else {
            return Err(SignatureError::UnexpectedToken {
                argument: argument.name,
                token: field,
            });
        };
        apply_attribute(&mut argument, key, value)?;
    }

    if let (Some(min), Some(max)) = (argument.min, argument.max)
        && min.as_f64() > max.as_f64()
    {
        return Err(SignatureError::InvalidAttribute {
            argument: argument.name,
            attribute: "max".to_string(),
            value: max.to_string(),
        });
    }

    Ok(argument)
}

fn apply_attribute(argument: &mut Argument, key: &str, value: &str) -> SignatureResult<()> {
    let invalid = |argument: &Argument| SignatureError::InvalidAttribute {
        argument: argument.name.clone(),
        attribute: key.to_string(),
        value: value.to_string(),
    };

    match key.to_lowercase().as_str() {
        "min" | "max" => {
            let bound = Bound::parse(argument.kind, value).ok_or_else(|| invalid(argument))?;
            if key.eq_ignore_ascii_case("min") {
                argument.min = Some(bound);
            } else {
                argument.max = Some(bound);
            }
        }
        "options" | "choices" => {
            if !matches!(
                argument.kind,
                ArgumentKind::String | ArgumentKind::Integer | ArgumentKind::Float
            ) {
                return Err(invalid(argument));
            }
            let items = split_choices(value);
            if items.is_empty() {
                return Err(invalid(argument));
            }
            argument.choices = items
                .into_iter()
                .map(|item| match item.split_once('=') {
                    Some((name, value)) => Choice::new(name.trim(), value.trim()),
                    None => Choice::new(item.clone(), item),
                })
                .collect();
        }
        _ => {
            return Err(SignatureError::UnknownAttribute {
                argument: argument.name.clone(),
                attribute: key.to_string(),
            });
        }
    }

    Ok(())
}

/// Split on whitespace outside double quotes. Quotes are kept.
fn split_fields(text: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in text.chars() {
        if c == '"' {
            quoted = !quoted;
            current.push(c);
        } else if c.is_whitespace() && !quoted {
            if !current.is_empty() {
                fields.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }

    if !current.is_empty() {
        fields.push(current);
    }
    fields
}

/// Split a comma-separated list, honouring double quotes. Quotes are removed
/// and empty items dropped.
fn split_choices(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in text.chars() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    items.push(current);

    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_name_only() {
        let sig = parse_signature("Ping").unwrap();
        assert_eq!(sig.name, "Ping");
        assert_eq!(sig.usage, "Ping");
        assert!(sig.arguments.is_empty());
    }

    #[test]
    fn test_missing_name() {
        assert!(matches!(
            parse_signature("   "),
            Err(SignatureError::MissingName { .. })
        ));
    }

    #[test]
    fn test_full_signature() {
        let sig = parse_signature(
            "test <stringarg> <:emojiarg> <@mentionarg> <#channelarg> <intarg int> <floatarg float> <boolarg bool> [optional]",
        )
        .unwrap();

        let summary: Vec<(usize, &str, ArgumentKind, bool)> = sig
            .arguments
            .iter()
            .map(|a| (a.index, a.name.as_str(), a.kind, a.required))
            .collect();

        assert_eq!(
            summary,
            vec![
                (0, "stringarg", ArgumentKind::String, true),
                (1, "emojiarg", ArgumentKind::Emoji, true),
                (2, "mentionarg", ArgumentKind::User, true),
                (3, "channelarg", ArgumentKind::Channel, true),
                (4, "intarg", ArgumentKind::Integer, true),
                (5, "floatarg", ArgumentKind::Float, true),
                (6, "boolarg", ArgumentKind::Boolean, true),
                (7, "optional", ArgumentKind::String, false),
            ]
        );
        assert_eq!(sig.required_count(), 7);
    }

    #[test]
    fn test_role_sigil() {
        let sig = parse_signature("grant <&role> [@user]").unwrap();
        assert_eq!(sig.arguments[0].kind, ArgumentKind::Role);
        assert_eq!(sig.arguments[0].name, "role");
        assert_eq!(sig.arguments[1].kind, ArgumentKind::User);
        assert!(!sig.arguments[1].required);
    }

    #[test]
    fn test_argument_names_lowercased() {
        let sig = parse_signature("find <Query>").unwrap();
        assert_eq!(sig.arguments[0].name, "query");
    }

    #[test]
    fn test_bounds() {
        let sig = parse_signature("roll [sides int min:2 max:100] [weight float min:0.5]").unwrap();
        assert_eq!(sig.arguments[0].min, Some(Bound::Integer(2)));
        assert_eq!(sig.arguments[0].max, Some(Bound::Integer(100)));
        assert_eq!(sig.arguments[1].min, Some(Bound::Float(0.5)));
        assert_eq!(sig.arguments[1].max, None);
    }

    #[test]
    fn test_string_length_bounds() {
        let sig = parse_signature("nick <name min:2 max:32>").unwrap();
        assert_eq!(sig.arguments[0].kind, ArgumentKind::String);
        assert_eq!(sig.arguments[0].min, Some(Bound::Integer(2)));
        assert_eq!(sig.arguments[0].max, Some(Bound::Integer(32)));
    }

    #[test]
    fn test_invalid_bounds() {
        let err = parse_signature("roll <sides int min:two>").unwrap_err();
        assert_eq!(
            err,
            SignatureError::InvalidAttribute {
                argument: "sides".to_string(),
                attribute: "min".to_string(),
                value: "two".to_string(),
            }
        );

        assert!(matches!(
            parse_signature("roll <sides int min:10 max:1>"),
            Err(SignatureError::InvalidAttribute { .. })
        ));
        assert!(matches!(
            parse_signature("toggle <on bool max:1>"),
            Err(SignatureError::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn test_options() {
        let sig = parse_signature("color <name options:red,green,blue>").unwrap();
        let values: Vec<&str> = sig.arguments[0]
            .choices
            .iter()
            .map(|c| c.value.as_str())
            .collect();
        assert_eq!(values, vec!["red", "green", "blue"]);
        assert_eq!(sig.arguments[0].choices[0].name, "red");
    }

    #[test]
    fn test_quoted_choices_with_display_names() {
        let sig =
            parse_signature(r#"track <type choices:"Twitch TV=twitch","You, Tube=youtube"> <name>"#)
                .unwrap();
        assert_eq!(
            sig.arguments[0].choices,
            vec![
                Choice::new("Twitch TV", "twitch"),
                Choice::new("You, Tube", "youtube"),
            ]
        );
        assert_eq!(sig.arguments[1].name, "name");
        assert_eq!(sig.arguments[1].index, 1);
    }

    #[test]
    fn test_escaped_closer() {
        let sig = parse_signature(r"cmp <a\>b> [c\]d]").unwrap();
        assert_eq!(sig.arguments[0].name, "a>b");
        assert_eq!(sig.arguments[1].name, "c]d");
    }

    #[test]
    fn test_unterminated_fails_fast() {
        let err = parse_signature("say <text [loud bool").unwrap_err();
        assert_eq!(
            err,
            SignatureError::Unterminated {
                signature: "say <text [loud bool".to_string(),
                opener: '<',
                position: 4,
            }
        );

        assert!(matches!(
            parse_signature("say <text> [loud"),
            Err(SignatureError::Unterminated { opener: '[', .. })
        ));
    }

    #[test]
    fn test_empty_argument() {
        assert!(matches!(
            parse_signature("x <>"),
            Err(SignatureError::EmptyArgument { .. })
        ));
        assert!(matches!(
            parse_signature("x <@>"),
            Err(SignatureError::EmptyArgument { .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_words() {
        assert_eq!(
            parse_signature("x <a b>").unwrap_err(),
            SignatureError::UnexpectedToken {
                argument: "a".to_string(),
                token: "b".to_string(),
            }
        );
        assert_eq!(
            parse_signature("x <a size:3>").unwrap_err(),
            SignatureError::UnknownAttribute {
                argument: "a".to_string(),
                attribute: "size".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_argument() {
        assert!(matches!(
            parse_signature("x <a> [A]"),
            Err(SignatureError::DuplicateArgument { .. })
        ));
    }

    #[test]
    fn test_reparse_is_identical() {
        let text = "ban <@user> [reason] [days int min:0 max:7]";
        assert_eq!(parse_signature(text).unwrap(), parse_signature(text).unwrap());
    }
}
