//! Invocation context: who is calling and from where.
//!
//! The kernel never talks to the chat platform. A gateway builds an
//! `InvocationContext` per incoming call and the kernel only reads it:
//! predicates inspect the caller and origin, entity parameters resolve ids
//! against the guild the call came from.

use serde::{Deserialize, Serialize};

/// Platform identifier for users, guilds, channels, roles and attachments.
///
/// Always a non-empty run of ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snowflake(pub String);

impl Snowflake {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse free text as an id. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(trimmed.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Snowflake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRef {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRef {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
    pub kind: ChannelKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    pub id: Snowflake,
    pub filename: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub size: u64,
}

/// A user or a role; the value of a mentionable parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mentionable {
    User(UserRef),
    Role(RoleRef),
}

impl Mentionable {
    pub fn id(&self) -> &Snowflake {
        match self {
            Self::User(user) => &user.id,
            Self::Role(role) => &role.id,
        }
    }
}

/// Channel kinds known to the registration protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChannelKind {
    #[serde(rename = "text")]
    GuildText,
    #[serde(rename = "dm")]
    Dm,
    #[serde(rename = "voice")]
    GuildVoice,
    #[serde(rename = "group-dm")]
    GroupDm,
    #[serde(rename = "category")]
    GuildCategory,
    #[serde(rename = "announcement")]
    GuildAnnouncement,
    #[serde(rename = "announcement-thread")]
    AnnouncementThread,
    #[serde(rename = "public-thread")]
    PublicThread,
    #[serde(rename = "private-thread")]
    PrivateThread,
    #[serde(rename = "stage")]
    GuildStageVoice,
    #[serde(rename = "directory")]
    GuildDirectory,
    #[serde(rename = "forum")]
    GuildForum,
    #[serde(rename = "media")]
    GuildMedia,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 13] = [
        Self::GuildText,
        Self::Dm,
        Self::GuildVoice,
        Self::GroupDm,
        Self::GuildCategory,
        Self::GuildAnnouncement,
        Self::AnnouncementThread,
        Self::PublicThread,
        Self::PrivateThread,
        Self::GuildStageVoice,
        Self::GuildDirectory,
        Self::GuildForum,
        Self::GuildMedia,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::GuildText => "text",
            Self::Dm => "dm",
            Self::GuildVoice => "voice",
            Self::GroupDm => "group-dm",
            Self::GuildCategory => "category",
            Self::GuildAnnouncement => "announcement",
            Self::AnnouncementThread => "announcement-thread",
            Self::PublicThread => "public-thread",
            Self::PrivateThread => "private-thread",
            Self::GuildStageVoice => "stage",
            Self::GuildDirectory => "directory",
            Self::GuildForum => "forum",
            Self::GuildMedia => "media",
        }
    }

    /// Numeric channel type used on the wire.
    pub fn protocol_code(self) -> u8 {
        match self {
            Self::GuildText => 0,
            Self::Dm => 1,
            Self::GuildVoice => 2,
            Self::GroupDm => 3,
            Self::GuildCategory => 4,
            Self::GuildAnnouncement => 5,
            Self::AnnouncementThread => 10,
            Self::PublicThread => 11,
            Self::PrivateThread => 12,
            Self::GuildStageVoice => 13,
            Self::GuildDirectory => 14,
            Self::GuildForum => 15,
            Self::GuildMedia => 16,
        }
    }

    pub fn from_protocol_code(code: u8) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.protocol_code() == code)
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Guild-scoped handles for an invocation that came from a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildOrigin {
    pub guild_id: Snowflake,
    pub owner_id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub member_roles: Vec<Snowflake>,
}

/// Where an invocation originated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Origin {
    Guild(GuildOrigin),
    #[serde(rename_all = "camelCase")]
    Direct { channel_id: Snowflake },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationContext {
    pub caller: UserRef,
    pub origin: Origin,
}

impl InvocationContext {
    pub fn in_guild(caller: UserRef, guild: GuildOrigin) -> Self {
        Self {
            caller,
            origin: Origin::Guild(guild),
        }
    }

    pub fn direct(caller: UserRef, channel_id: Snowflake) -> Self {
        Self {
            caller,
            origin: Origin::Direct { channel_id },
        }
    }

    pub fn guild(&self) -> Option<&GuildOrigin> {
        match &self.origin {
            Origin::Guild(guild) => Some(guild),
            Origin::Direct { .. } => None,
        }
    }

    pub fn is_guild(&self) -> bool {
        self.guild().is_some()
    }

    /// `"guild"` or `"direct"`.
    pub fn scope_label(&self) -> &'static str {
        match self.origin {
            Origin::Guild(_) => "guild",
            Origin::Direct { .. } => "direct",
        }
    }
}
