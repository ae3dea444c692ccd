//! Rich message embeds.
//!
//! [`EmbedBuilder`] assembles an [`Embed`], the serialisable rich-message
//! payload handed to the platform. Colours come from an [`EmbedColors`]
//! palette so every embed the bot sends shares one look.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ===========================================================================
// Palette
// ===========================================================================

/// Named colours used by embeds, as 24-bit RGB values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedColors {
    pub main: u32,
    pub green: u32,
    pub yellow: u32,
    pub blue: u32,
    pub purple: u32,
    pub red: u32,
}

impl Default for EmbedColors {
    fn default() -> Self {
        Self {
            main: 0x5865F2,
            green: 0x57F287,
            yellow: 0xFEE75C,
            blue: 0x3498DB,
            purple: 0x9B59B6,
            red: 0xED4245,
        }
    }
}

impl EmbedColors {
    /// Resolves a palette key.
    pub fn get(&self, key: ColorKey) -> u32 {
        match key {
            ColorKey::Main => self.main,
            ColorKey::Green => self.green,
            ColorKey::Yellow => self.yellow,
            ColorKey::Blue => self.blue,
            ColorKey::Purple => self.purple,
            ColorKey::Red => self.red,
        }
    }
}

/// Key into an [`EmbedColors`] palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorKey {
    Main,
    Green,
    Yellow,
    Blue,
    Purple,
    Red,
}

// ===========================================================================
// Embed
// ===========================================================================

/// A rich message embed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    /// RFC 3339 timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedMedia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedMedia>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

/// A name/value pair shown in an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

impl EmbedField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: false,
        }
    }

    /// Marks the field as inline.
    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Image or thumbnail reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedMedia {
    pub url: String,
}

// ===========================================================================
// Builder
// ===========================================================================

/// Timestamp option for [`EmbedBuilder::timestamp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedTimestamp {
    /// The current time.
    Now,
    /// No timestamp. Sticky: later edits never bring back the default one.
    None,
    /// A fixed point in time.
    At(OffsetDateTime),
}

/// Builder for [`Embed`].
///
/// Starts with the palette's `main` colour and, unless told otherwise, stamps
/// the embed with the time it is built.
///
/// ```ignore
/// let embed = EmbedBuilder::success(&palette)
///     .title("Reloaded")
///     .field(EmbedField::new("event", "ready").inline())
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct EmbedBuilder {
    palette: EmbedColors,
    inner: Embed,
    stamp: Option<OffsetDateTime>,
    no_timestamp: bool,
}

impl EmbedBuilder {
    /// Creates a builder in the palette's main colour.
    pub fn new(palette: &EmbedColors) -> Self {
        Self {
            palette: *palette,
            inner: Embed {
                color: Some(palette.main),
                ..Embed::default()
            },
            stamp: None,
            no_timestamp: false,
        }
    }

    /// Creates a builder in the palette's green.
    pub fn success(palette: &EmbedColors) -> Self {
        Self::new(palette).color_key(ColorKey::Green)
    }

    /// Creates a builder in the palette's red.
    pub fn error(palette: &EmbedColors) -> Self {
        Self::new(palette).color_key(ColorKey::Red)
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.inner.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.inner.description = Some(description.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.inner.url = Some(url.into());
        self
    }

    /// Sets a raw 24-bit RGB colour.
    pub fn color(mut self, color: u32) -> Self {
        self.inner.color = Some(color);
        self
    }

    /// Sets a colour from the palette.
    pub fn color_key(mut self, key: ColorKey) -> Self {
        self.inner.color = Some(self.palette.get(key));
        self
    }

    pub fn author(mut self, author: EmbedAuthor) -> Self {
        self.inner.author = Some(author);
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.inner.footer = Some(EmbedFooter {
            text: text.into(),
            icon_url: None,
        });
        self
    }

    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.inner.image = Some(EmbedMedia { url: url.into() });
        self
    }

    pub fn thumbnail(mut self, url: impl Into<String>) -> Self {
        self.inner.thumbnail = Some(EmbedMedia { url: url.into() });
        self
    }

    /// Appends one field.
    pub fn field(mut self, field: EmbedField) -> Self {
        self.inner.fields.push(field);
        self
    }

    /// Appends several fields.
    pub fn add_fields(mut self, fields: impl IntoIterator<Item = EmbedField>) -> Self {
        self.inner.fields.extend(fields);
        self
    }

    /// Removes `delete_count` fields starting at `index` and inserts `fields`
    /// in their place. Out-of-range bounds are clamped.
    pub fn splice_fields(
        mut self,
        index: usize,
        delete_count: usize,
        fields: impl IntoIterator<Item = EmbedField>,
    ) -> Self {
        let len = self.inner.fields.len();
        let start = index.min(len);
        let end = start.saturating_add(delete_count).min(len);
        self.inner.fields.splice(start..end, fields);
        self
    }

    pub fn timestamp(mut self, timestamp: EmbedTimestamp) -> Self {
        match timestamp {
            EmbedTimestamp::Now => self.stamp = Some(OffsetDateTime::now_utc()),
            EmbedTimestamp::At(at) => self.stamp = Some(at),
            EmbedTimestamp::None => {
                self.stamp = None;
                self.no_timestamp = true;
            }
        }
        self
    }

    /// Finishes the embed.
    pub fn build(&self) -> Embed {
        let stamp = match (self.stamp, self.no_timestamp) {
            (Some(at), _) => Some(at),
            (None, true) => None,
            (None, false) => Some(OffsetDateTime::now_utc()),
        };

        Embed {
            timestamp: stamp.and_then(|at| at.format(&Rfc3339).ok()),
            ..self.inner.clone()
        }
    }

    /// Finishes the embed as a JSON value.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self.build())
    }
}
