//! Records produced by the readers and consumed by the writer.

use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of post types in the export schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Answer,
    Link,
    Photo,
    Regular,
    Video,
}

impl PostType {
    pub const ALL: [PostType; 5] =
        [PostType::Answer, PostType::Link, PostType::Photo, PostType::Regular, PostType::Video];

    pub fn as_str(self) -> &'static str {
        match self {
            PostType::Answer => "answer",
            PostType::Link => "link",
            PostType::Photo => "photo",
            PostType::Regular => "regular",
            PostType::Video => "video",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostType {
    type Err = CodecError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PostType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CodecError::UnknownType(s.to_string()))
    }
}

/// Common record shared by every post type.
///
/// `id` stays a string: platform ids overflow the range a double can hold exactly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub url: String,
    pub url_with_slug: String,
    pub date_gmt: String,
    pub date: String,
    pub unix_timestamp: i64,
    pub reblog_key: String,
    pub slug: String,
    pub is_reblog: bool,
    pub tumblelog: String,
    pub post_type: PostType,
    pub state: String,
    pub tags: String,
    pub is_read: bool,
    pub is_favourite: bool,
    pub width: Option<u32>,  // photo posts only
    pub height: Option<u32>, // photo posts only
}

impl Post {
    pub fn new(id: impl Into<String>, post_type: PostType) -> Self {
        Self {
            id: id.into(),
            url: String::new(),
            url_with_slug: String::new(),
            date_gmt: String::new(),
            date: String::new(),
            unix_timestamp: 0,
            reblog_key: String::new(),
            slug: String::new(),
            is_reblog: false,
            tumblelog: String::new(),
            post_type,
            state: String::new(),
            tags: String::new(),
            is_read: false,
            is_favourite: false,
            width: None,
            height: None,
        }
    }

    /// Append a tag in document order: the first tag is stored bare, later ones after ", ".
    pub fn push_tag(&mut self, tag: &str) {
        if self.tags.is_empty() {
            self.tags.push_str(tag);
        } else {
            self.tags.push_str(", ");
            self.tags.push_str(tag);
        }
    }

    /// Individual tags of the stored tag string (comma split, trimmed, empties dropped).
    pub fn tag_list(&self) -> impl Iterator<Item = &str> {
        self.tags.split(',').map(str::trim).filter(|t| !t.is_empty())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regular {
    /// An empty title is the same as no title: it is neither read nor written.
    pub title: Option<String>,
    pub body: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub text: Option<String>,
    pub url: String,
    pub description: Option<String>,
}

/// The six renditions every photo is exported in, keyed by `max-width`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhotoSize {
    W1280,
    W500,
    W400,
    W250,
    W100,
    W75,
}

impl PhotoSize {
    /// Document order of the `photo-url` elements.
    pub const ALL: [PhotoSize; 6] =
        [PhotoSize::W1280, PhotoSize::W500, PhotoSize::W400, PhotoSize::W250, PhotoSize::W100, PhotoSize::W75];

    pub fn max_width(self) -> &'static str {
        match self {
            PhotoSize::W1280 => "1280",
            PhotoSize::W500 => "500",
            PhotoSize::W400 => "400",
            PhotoSize::W250 => "250",
            PhotoSize::W100 => "100",
            PhotoSize::W75 => "75",
        }
    }

    pub fn from_max_width(s: &str) -> Option<Self> {
        PhotoSize::ALL.into_iter().find(|p| p.max_width() == s)
    }
}

/// One photo of a photo post. A post owns one or more, ordered by `offset`;
/// an empty offset marks the only photo of a single-photo post.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub post_id: String,
    pub caption: String,
    pub link_url: Option<String>,
    pub offset: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub url_1280: String,
    pub url_500: String,
    pub url_400: String,
    pub url_250: String,
    pub url_100: String,
    pub url_75: String,
}

impl Photo {
    pub fn url(&self, size: PhotoSize) -> &str {
        match size {
            PhotoSize::W1280 => &self.url_1280,
            PhotoSize::W500 => &self.url_500,
            PhotoSize::W400 => &self.url_400,
            PhotoSize::W250 => &self.url_250,
            PhotoSize::W100 => &self.url_100,
            PhotoSize::W75 => &self.url_75,
        }
    }

    pub fn set_url(&mut self, size: PhotoSize, url: String) {
        match size {
            PhotoSize::W1280 => self.url_1280 = url,
            PhotoSize::W500 => self.url_500 = url,
            PhotoSize::W400 => self.url_400 = url,
            PhotoSize::W250 => self.url_250 = url,
            PhotoSize::W100 => self.url_100 = url,
            PhotoSize::W75 => self.url_75 = url,
        }
    }
}

/// Video metadata. The player embed markup is not kept.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub content_type: String,
    pub extension: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<u32>,
    pub revision: String,
    pub caption: String,
}

/// Type-specific payload; exactly one per post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Payload {
    Regular(Regular),
    Answer(Answer),
    Link(Link),
    Photos { photos: Vec<Photo> },
    Video(Video),
}

impl Payload {
    pub fn kind(&self) -> PostType {
        match self {
            Payload::Regular(_) => PostType::Regular,
            Payload::Answer(_) => PostType::Answer,
            Payload::Link(_) => PostType::Link,
            Payload::Photos { .. } => PostType::Photo,
            Payload::Video(_) => PostType::Video,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hashtag {
    pub tag: String,
    pub blog: String,
}

/// A conversation with the one participant that is not the archive owner.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub participant: String,
    pub participant_avatar_url: String,
    pub participant_id: Option<String>,
    pub num_messages: usize,
    pub blog: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    Text,
    Image,
    PostRef,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Text => "TEXT",
            MessageKind::Image => "IMAGE",
            MessageKind::PostRef => "POSTREF",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = CodecError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TEXT" => Ok(MessageKind::Text),
            "IMAGE" => Ok(MessageKind::Image),
            "POSTREF" => Ok(MessageKind::PostRef),
            other => Err(CodecError::UnknownType(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Filled in once the parent conversation has been persisted.
    pub conversation_id: Option<u64>,
    pub timestamp: i64,
    pub received: bool,
    pub kind: MessageKind,
    pub message: String,
}

/// Strip a deactivated-account suffix (`-deactivated`, usually followed by a date).
pub fn normalize_participant_name(name: &str) -> &str {
    match name.find("-deactivated") {
        Some(idx) => &name[..idx],
        None => name,
    }
}
