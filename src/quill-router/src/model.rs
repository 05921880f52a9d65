//! Platform value types.
//!
//! These are the entities a [`PlatformClient`](crate::client::PlatformClient)
//! hands back and the values reference arguments convert into.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use bitflags::bitflags;
use regex::Regex;
use serde::{Deserialize, Serialize};

static USER_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<@!?(\d+)>$").expect("valid regex"));
static CHANNEL_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<#(\d+)>$").expect("valid regex"));
static ROLE_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<@&(\d+)>$").expect("valid regex"));
static CUSTOM_EMOJI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<(a?):([^:>]+):(\d+)>$").expect("valid regex"));

/// Numeric platform identifier (snowflake).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(u64);

impl Id {
    /// Wrap a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Extract the id from a user mention (`<@id>` or `<@!id>`).
    pub fn from_user_mention(text: &str) -> Option<Self> {
        capture_id(&USER_MENTION, text)
    }

    /// Extract the id from a channel mention (`<#id>`).
    pub fn from_channel_mention(text: &str) -> Option<Self> {
        capture_id(&CHANNEL_MENTION, text)
    }

    /// Extract the id from a role mention (`<@&id>`).
    pub fn from_role_mention(text: &str) -> Option<Self> {
        capture_id(&ROLE_MENTION, text)
    }
}

fn capture_id(pattern: &Regex, text: &str) -> Option<Id> {
    pattern
        .captures(text.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Id {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<u64> for Id {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Kind of platform entity, used in lookups and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Member,
    Channel,
    Guild,
    Role,
    Emoji,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Member => "member",
            Self::Channel => "channel",
            Self::Guild => "guild",
            Self::Role => "role",
            Self::Emoji => "emoji",
        };
        f.write_str(name)
    }
}

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    /// Mention text for this user.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// A user's membership in a guild.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Member {
    pub user: User,
    pub guild_id: Id,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Id>,
}

impl Member {
    /// Nickname if set, otherwise the user name.
    pub fn display_name(&self) -> &str {
        self.nick.as_deref().unwrap_or(&self.user.name)
    }
}

/// Channel types the router distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    #[default]
    GuildText,
    Dm,
    GuildVoice,
    GroupDm,
    GuildCategory,
    GuildNews,
    GuildStageVoice,
    GuildForum,
    Thread,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GuildText => "text",
            Self::Dm => "direct message",
            Self::GuildVoice => "voice",
            Self::GroupDm => "group direct message",
            Self::GuildCategory => "category",
            Self::GuildNews => "announcement",
            Self::GuildStageVoice => "stage",
            Self::GuildForum => "forum",
            Self::Thread => "thread",
        };
        f.write_str(name)
    }
}

/// A channel, optionally belonging to a guild.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Channel {
    pub id: Id,
    #[serde(default)]
    pub guild_id: Option<Id>,
    pub name: String,
    #[serde(default)]
    pub kind: ChannelKind,
    #[serde(default)]
    pub nsfw: bool,
}

impl Channel {
    /// Mention text for this channel.
    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}

/// A guild (server).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Guild {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub owner_id: Option<Id>,
}

/// A guild role.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Role {
    pub id: Id,
    pub guild_id: Id,
    pub name: String,
    #[serde(default)]
    pub permissions: Permissions,
}

impl Role {
    /// Mention text for this role.
    pub fn mention(&self) -> String {
        format!("<@&{}>", self.id)
    }
}

bitflags! {
    /// Guild permissions a role grants.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Permissions: u64 {
        const CREATE_INVITE    = 1;
        const KICK_MEMBERS     = 1 << 1;
        const BAN_MEMBERS      = 1 << 2;
        /// Implies every other permission.
        const ADMINISTRATOR    = 1 << 3;
        const MANAGE_CHANNELS  = 1 << 4;
        const MANAGE_GUILD     = 1 << 5;
        const ADD_REACTIONS    = 1 << 6;
        const VIEW_CHANNEL     = 1 << 10;
        const SEND_MESSAGES    = 1 << 11;
        const MANAGE_MESSAGES  = 1 << 13;
        const EMBED_LINKS      = 1 << 14;
        const ATTACH_FILES     = 1 << 15;
        const MENTION_EVERYONE = 1 << 17;
        const CONNECT          = 1 << 20;
        const SPEAK            = 1 << 21;
        const MANAGE_ROLES     = 1 << 28;
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::empty()
    }
}

impl Permissions {
    /// Permissions a member holds in a guild.
    ///
    /// Sums the guild's everyone role (the role whose id is the guild id) and
    /// the member's own roles found in `roles`. The guild owner and
    /// administrators hold every permission.
    pub fn for_member(guild: &Guild, member: &Member, roles: &[Role]) -> Self {
        if guild.owner_id == Some(member.user.id) {
            return Self::all();
        }

        let granted = roles
            .iter()
            .filter(|r| r.guild_id == guild.id)
            .filter(|r| r.id == guild.id || member.roles.contains(&r.id))
            .fold(Self::empty(), |acc, r| acc | r.permissions);

        if granted.contains(Self::ADMINISTRATOR) {
            Self::all()
        } else {
            granted
        }
    }
}

/// Lowercase names separated by commas, such as `kick members, ban members`.
impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .iter_names()
            .map(|(name, _)| name.to_lowercase().replace('_', " "))
            .collect();
        f.write_str(&names.join(", "))
    }
}

/// An emoji: either a guild custom emoji or a standard unicode one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emoji {
    /// Set for custom emoji only.
    pub id: Option<Id>,
    /// Custom emoji name, or the unicode sequence itself.
    pub name: String,
    #[serde(default)]
    pub animated: bool,
}

impl Emoji {
    /// A guild custom emoji.
    pub fn custom(id: Id, name: impl Into<String>, animated: bool) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            animated,
        }
    }

    /// A standard unicode emoji.
    pub fn unicode(glyph: impl Into<String>) -> Self {
        Self {
            id: None,
            name: glyph.into(),
            animated: false,
        }
    }

    pub fn is_custom(&self) -> bool {
        self.id.is_some()
    }

    /// Text that renders this emoji in a message.
    pub fn mention(&self) -> String {
        match self.id {
            Some(id) if self.animated => format!("<a:{}:{}>", self.name, id),
            Some(id) => format!("<:{}:{}>", self.name, id),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for Emoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mention())
    }
}

/// Parse emoji text.
///
/// Accepts a custom emoji mention (`<:name:id>` / `<a:name:id>`), a unicode
/// emoji, or a shortcode such as `:thumbsup:` or `thumbsup`.
pub fn parse_emoji(text: &str) -> Option<Emoji> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = CUSTOM_EMOJI.captures(text) {
        let id = caps.get(3)?.as_str().parse().ok()?;
        let animated = caps.get(1).is_some_and(|m| !m.is_empty());
        return Some(Emoji::custom(id, caps.get(2)?.as_str(), animated));
    }

    if let Some(found) = emojis::get(text) {
        return Some(Emoji::unicode(found.as_str()));
    }

    let shortcode = text.trim_matches(':');
    emojis::get_by_shortcode(shortcode).map(|found| Emoji::unicode(found.as_str()))
}

/// A message sent through a [`Responder`](crate::client::Responder).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    pub id: Id,
    pub channel_id: Id,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mentions() {
        assert_eq!(Id::from_user_mention("<@123>"), Some(Id::new(123)));
        assert_eq!(Id::from_user_mention("<@!123>"), Some(Id::new(123)));
        assert_eq!(Id::from_user_mention("<#123>"), None);
        assert_eq!(Id::from_user_mention("123"), None);

        assert_eq!(Id::from_channel_mention("<#42>"), Some(Id::new(42)));
        assert_eq!(Id::from_channel_mention("<@42>"), None);

        assert_eq!(Id::from_role_mention("<@&9>"), Some(Id::new(9)));
        assert_eq!(Id::from_user_mention("<@&9>"), None);
    }

    #[test]
    fn test_member_permissions() {
        let guild = Guild {
            id: Id::new(1),
            name: "home".into(),
            owner_id: Some(Id::new(99)),
        };
        let role = |id, permissions| Role {
            id: Id::new(id),
            guild_id: Id::new(1),
            permissions,
            ..Default::default()
        };
        let roles = [
            role(1, Permissions::SEND_MESSAGES),
            role(30, Permissions::KICK_MEMBERS),
            role(31, Permissions::ADMINISTRATOR),
        ];
        let member = |id, roles: &[u64]| Member {
            user: User {
                id: Id::new(id),
                ..Default::default()
            },
            guild_id: Id::new(1),
            roles: roles.iter().copied().map(Id::new).collect(),
            ..Default::default()
        };

        assert_eq!(
            Permissions::for_member(&guild, &member(10, &[]), &roles),
            Permissions::SEND_MESSAGES
        );
        assert_eq!(
            Permissions::for_member(&guild, &member(10, &[30]), &roles),
            Permissions::SEND_MESSAGES | Permissions::KICK_MEMBERS
        );
        assert_eq!(
            Permissions::for_member(&guild, &member(10, &[31]), &roles),
            Permissions::all()
        );
        assert_eq!(
            Permissions::for_member(&guild, &member(99, &[]), &[]),
            Permissions::all()
        );
    }

    #[test]
    fn test_permissions_display() {
        let perms = Permissions::KICK_MEMBERS | Permissions::MANAGE_ROLES;
        assert_eq!(perms.to_string(), "kick members, manage roles");
        assert_eq!(Permissions::empty().to_string(), "");
    }

    #[test]
    fn test_id_parse_and_display() {
        let id: Id = "805430097426513930".parse().unwrap();
        assert_eq!(id.get(), 805430097426513930);
        assert_eq!(id.to_string(), "805430097426513930");
        assert!("abc".parse::<Id>().is_err());
    }

    #[test]
    fn test_parse_custom_emoji() {
        let emoji = parse_emoji("<:blob:123>").unwrap();
        assert_eq!(emoji, Emoji::custom(Id::new(123), "blob", false));
        assert_eq!(emoji.mention(), "<:blob:123>");

        let emoji = parse_emoji("<a:party:77>").unwrap();
        assert!(emoji.animated);
        assert_eq!(emoji.mention(), "<a:party:77>");
    }

    #[test]
    fn test_parse_unicode_emoji() {
        let emoji = parse_emoji("🚀").unwrap();
        assert!(!emoji.is_custom());
        assert_eq!(emoji.name, "🚀");

        let emoji = parse_emoji(":rocket:").unwrap();
        assert_eq!(emoji.name, "🚀");

        assert_eq!(parse_emoji("definitely not an emoji"), None);
        assert_eq!(parse_emoji(""), None);
    }

    #[test]
    fn test_member_display_name() {
        let mut member = Member {
            user: User {
                id: Id::new(1),
                name: "ana".to_string(),
                bot: false,
            },
            guild_id: Id::new(2),
            ..Default::default()
        };
        assert_eq!(member.display_name(), "ana");
        member.nick = Some("Ana B".to_string());
        assert_eq!(member.display_name(), "Ana B");
    }
}
