//! Source references and thumbnail derivation.

use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Video id used when a link carries no recognizable id
pub const PLACEHOLDER_VIDEO_ID: &str = "dQw4w9WgXcQ";

/// Where an entry came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceRef {
    /// Remote video link
    Link { url: String },

    /// Uploaded local file
    LocalFile { filename: String },
}

impl SourceRef {
    pub fn link(url: impl Into<String>) -> Self {
        SourceRef::Link { url: url.into() }
    }

    pub fn local_file(filename: impl Into<String>) -> Self {
        SourceRef::LocalFile {
            filename: filename.into(),
        }
    }

    /// The link, for link entries
    pub fn url(&self) -> Option<&str> {
        match self {
            SourceRef::Link { url } => Some(url),
            SourceRef::LocalFile { .. } => None,
        }
    }
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceRef::Link { url } => write!(f, "{}", url),
            SourceRef::LocalFile { filename } => write!(f, "file:{}", filename),
        }
    }
}

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Extract a YouTube video id from a link.
///
/// Recognizes `watch?v=`, `youtu.be/`, `/embed/`, `/shorts/`, `/live/` and `/v/` forms.
pub fn youtube_video_id(link: &str) -> Option<String> {
    let url = Url::parse(link.trim()).ok()?;
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    let candidate = match host {
        "youtu.be" => url.path_segments()?.next().map(str::to_string),
        "youtube.com" | "music.youtube.com" | "youtube-nocookie.com" => {
            let from_query = url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned());

            from_query.or_else(|| {
                let mut segments = url.path_segments()?;
                match segments.next()? {
                    "embed" | "shorts" | "live" | "v" => segments.next().map(str::to_string),
                    _ => None,
                }
            })
        }
        _ => None,
    }?;

    is_video_id(&candidate).then_some(candidate)
}

/// Thumbnail URL for a link, falling back to the placeholder video id
pub fn thumbnail_for_link(link: &str) -> String {
    let id = youtube_video_id(link).unwrap_or_else(|| PLACEHOLDER_VIDEO_ID.to_string());
    format!("https://img.youtube.com/vi/{}/hqdefault.jpg", id)
}
