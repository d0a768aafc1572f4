use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;

/// Placeholder written over the name of a soft-deleted spreadsheet row.
pub const REDACTED_NAME: &str = "[已刪除]";

// Spreadsheet cells and form fields arrive as strings, numbers, booleans or null.
#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Loose {
    fn into_string(self) -> String {
        match self {
            Loose::Bool(b) => b.to_string(),
            Loose::Int(i) => i.to_string(),
            Loose::Float(f) => f.to_string(),
            Loose::String(s) => s,
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Loose>::deserialize(deserializer)?
        .map(Loose::into_string)
        .unwrap_or_default())
}

/// Like `lenient_string`, with null and blank cells as `None`.
fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Loose>::deserialize(deserializer)?
        .map(Loose::into_string)
        .filter(|s| !s.trim().is_empty()))
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Loose>::deserialize(deserializer)?
        .map(|value| match value {
            Loose::Bool(b) => b,
            other => is_truthy(&other.into_string()),
        })
        .unwrap_or(false))
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "yes" | "true" | "on" | "1"
    )
}

/// Boolean answer persisted as the strings `"yes"` / `"no"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum YesNo {
    Yes,
    #[default]
    No,
}

impl YesNo {
    pub fn as_str(self) -> &'static str {
        match self {
            YesNo::Yes => "yes",
            YesNo::No => "no",
        }
    }

    pub fn is_yes(self) -> bool {
        self == YesNo::Yes
    }
}

impl From<bool> for YesNo {
    fn from(value: bool) -> Self {
        if value { YesNo::Yes } else { YesNo::No }
    }
}

impl<'de> Deserialize<'de> for YesNo {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        lenient_flag(deserializer).map(YesNo::from)
    }
}

impl std::fmt::Display for YesNo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the visitor heard about the church.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum HeardVia {
    FriendFamily,
    SocialMedia,
    PassingBy,
    Event,
    Other,
    #[default]
    #[sqlx(rename = "")]
    Unspecified,
}

impl HeardVia {
    /// Options offered by the sign-in form, in display order.
    pub const OPTIONS: [HeardVia; 5] = [
        HeardVia::FriendFamily,
        HeardVia::SocialMedia,
        HeardVia::PassingBy,
        HeardVia::Event,
        HeardVia::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HeardVia::FriendFamily => "friend_family",
            HeardVia::SocialMedia => "social_media",
            HeardVia::PassingBy => "passing_by",
            HeardVia::Event => "event",
            HeardVia::Other => "other",
            HeardVia::Unspecified => "",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HeardVia::FriendFamily => "親友介紹",
            HeardVia::SocialMedia => "網站 / 社群媒體",
            HeardVia::PassingBy => "路過",
            HeardVia::Event => "教會活動",
            HeardVia::Other => "其他",
            HeardVia::Unspecified => "",
        }
    }

    /// Unknown tags collapse to `Unspecified`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "friend_family" => HeardVia::FriendFamily,
            "social_media" => HeardVia::SocialMedia,
            "passing_by" => HeardVia::PassingBy,
            "event" => HeardVia::Event,
            "other" => HeardVia::Other,
            _ => HeardVia::Unspecified,
        }
    }
}

impl Serialize for HeardVia {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for HeardVia {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        lenient_string(deserializer).map(|tag| HeardVia::from_tag(&tag))
    }
}

/// A single sign-in record.
///
/// The JSON shape is the one the browser client and the spreadsheet service
/// exchange: camelCase form fields plus snake_case timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase", default)]
pub struct Visitor {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(deserialize_with = "lenient_string")]
    pub phone: String,
    #[serde(deserialize_with = "lenient_string")]
    pub address: String,
    pub how_did_you_hear: HeardVia,
    #[serde(deserialize_with = "lenient_string")]
    pub how_did_you_hear_other: String,
    pub is_first_visit: YesNo,
    pub wants_contact: YesNo,
    #[serde(deserialize_with = "lenient_string")]
    pub prayer_request: String,
    #[serde(rename = "created_at", deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(
        rename = "updated_at",
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<String>,
    #[serde(deserialize_with = "lenient_flag", skip_serializing_if = "std::ops::Not::not")]
    #[sqlx(default)]
    pub deleted: bool,
    #[serde(
        rename = "deleted_at",
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    #[sqlx(default)]
    pub deleted_at: Option<String>,
}

impl Visitor {
    /// Case-insensitive substring match on name or email.
    ///
    /// `needle` must already be lowercased.
    pub fn matches(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.name.to_lowercase().contains(needle)
            || self.email.to_lowercase().contains(needle)
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }
}

/// Timestamp-shaped token used for ids and server-assigned times.
pub fn timestamp_token(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Accepts RFC 3339 as well as SQLite's `YYYY-MM-DD HH:MM:SS`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
