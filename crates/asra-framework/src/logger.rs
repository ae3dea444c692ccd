//! Bot-facing log lines and log embeds.
//!
//! `tracing` carries the actual output. [`BotLogger`] only adds the bot's
//! presentation: the emoji/label prefix for console lines and the coloured
//! code-block embed used when a log line is posted to a channel.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::embed::{ColorKey, Embed, EmbedBuilder, EmbedColors, EmbedTimestamp};

/// Severity of a bot log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Success,
    Warn,
    Info,
    Debug,
    Error,
}

impl LogLevel {
    /// Every level, in display order.
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Success,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Error,
    ];

    /// Emoji leading console lines at this level.
    pub fn emoji(&self) -> &'static str {
        match self {
            LogLevel::Success => "✅",
            LogLevel::Warn => "⚠️",
            LogLevel::Info => "ℹ️",
            LogLevel::Debug => "🐛",
            LogLevel::Error => "❌",
        }
    }

    /// Human-readable level name.
    pub fn label(&self) -> &'static str {
        match self {
            LogLevel::Success => "Success",
            LogLevel::Warn => "Warning",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Error => "Error",
        }
    }

    /// Palette colour of embeds at this level.
    pub fn color_key(&self) -> ColorKey {
        match self {
            LogLevel::Success => ColorKey::Green,
            LogLevel::Warn => ColorKey::Yellow,
            LogLevel::Info => ColorKey::Blue,
            LogLevel::Debug => ColorKey::Purple,
            LogLevel::Error => ColorKey::Red,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.emoji(), self.label())
    }
}

/// Presentation context for bot log lines.
///
/// Built once at startup from the configured palette and passed to whatever
/// needs it.
#[derive(Debug, Clone, Default)]
pub struct BotLogger {
    palette: EmbedColors,
}

impl BotLogger {
    /// Creates a logger presenting with `palette`.
    pub fn new(palette: EmbedColors) -> Self {
        Self { palette }
    }

    /// Colours used for log embeds and handler-built embeds.
    pub fn palette(&self) -> &EmbedColors {
        &self.palette
    }

    /// Renders `"<emoji> <label> >> <message>"`.
    ///
    /// The time prefix is left to the subscriber's timer.
    pub fn prepare_message(&self, level: LogLevel, message: &str) -> String {
        format!("{level} >> {message}")
    }

    /// Emits `message` as a `tracing` event. `Success` maps to `INFO`.
    pub fn log(&self, level: LogLevel, message: &str) {
        let line = self.prepare_message(level, message);
        match level {
            LogLevel::Success | LogLevel::Info => info!(target: "asra::bot", "{line}"),
            LogLevel::Warn => warn!(target: "asra::bot", "{line}"),
            LogLevel::Debug => debug!(target: "asra::bot", "{line}"),
            LogLevel::Error => error!(target: "asra::bot", "{line}"),
        }
    }

    /// Builds the embed posted for a log line: the message in a code block,
    /// in the level's colour, without a timestamp.
    pub fn log_embed(&self, level: LogLevel, message: &str) -> Embed {
        EmbedBuilder::new(&self.palette)
            .timestamp(EmbedTimestamp::None)
            .color_key(level.color_key())
            .description(format!("```\n{message}```"))
            .build()
    }
}
