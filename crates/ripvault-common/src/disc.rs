//! Disc table of contents as reported by the ripping engine.

use serde::{Deserialize, Serialize};

use crate::paths::resolution_label;

/// Source playlist that marks the main feature on most Blu-ray discs.
pub const MAIN_FEATURE_SOURCE: &str = "00800.mpls";

/// Full title table of one disc.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub volume_name: String,
    #[serde(default)]
    pub titles: Vec<TitleInfo>,
}

/// One rippable title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleInfo {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub source_file_name: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub chapter_count: u32,
    #[serde(default)]
    pub disk_size: String,
    #[serde(default)]
    pub streams: Vec<StreamInfo>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitles,
    #[default]
    Other,
}

impl StreamKind {
    pub fn from_engine(s: &str) -> Self {
        match s {
            "Video" => Self::Video,
            "Audio" => Self::Audio,
            "Subtitles" => Self::Subtitles,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub kind: StreamKind,
    #[serde(default)]
    pub codec: String,
    /// `WxH`, video streams only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl DiscInfo {
    pub fn title(&self, id: u32) -> Option<&TitleInfo> {
        self.titles.iter().find(|t| t.id == id)
    }

    /// The title most likely to be the feature.
    pub fn main_title(&self) -> Option<&TitleInfo> {
        self.titles
            .iter()
            .find(|t| t.source_file_name == MAIN_FEATURE_SOURCE)
            .or_else(|| self.titles.first())
    }

    /// Human name guess for the main feature.
    ///
    /// The disc name wins when the engine reports one distinct from the raw
    /// volume label; otherwise the main title's name is used.
    pub fn guess_name(&self) -> Option<String> {
        if !self.name.is_empty() && self.name != self.volume_name {
            return Some(self.name.clone());
        }
        self.main_title()
            .map(|t| t.name.clone())
            .filter(|n| !n.is_empty())
    }
}

impl TitleInfo {
    /// Resolution label from the first video stream, if its size is known.
    pub fn resolution(&self) -> Option<String> {
        self.streams
            .iter()
            .filter(|s| s.kind == StreamKind::Video)
            .find_map(|s| s.video_size.as_deref())
            .and_then(|size| size.split_once('x'))
            .and_then(|(_, h)| h.trim().parse::<u32>().ok())
            .map(resolution_label)
    }
}
