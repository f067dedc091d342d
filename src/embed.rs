//! Video platform identifiers and embed URLs.
//!
//! Admins paste whatever link the platform gave them; only the bare platform id
//! is stored, and embed/thumbnail URLs are rebuilt from it when rendering.

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Rumble,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Rumble => "rumble",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Platform::Youtube => "YouTube",
            Platform::Rumble => "Rumble",
        }
    }

    /// Guesses the platform from a pasted link. Bare ids are ambiguous.
    pub fn detect(input: &str) -> Option<Platform> {
        if input.contains("youtube.com/") || input.contains("youtu.be/") {
            Some(Platform::Youtube)
        } else if input.contains("rumble.com/") {
            Some(Platform::Rumble)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn segment_after<'a>(input: &'a str, marker: &str, terminator: char) -> &'a str {
    input
        .split_once(marker)
        .map(|(_, rest)| rest.split(terminator).next().unwrap_or(""))
        .unwrap_or("")
}

/// Pulls the platform id out of a pasted URL, or returns the input itself when
/// it matches no known pattern. `None` when nothing usable remains.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();

    let id = if input.contains("youtube.com/shorts/") {
        segment_after(input, "youtube.com/shorts/", '?')
    } else if input.contains("youtube.com/watch?v=") {
        segment_after(input, "v=", '&')
    } else if input.contains("youtu.be/") {
        segment_after(input, "youtu.be/", '?')
    } else if input.contains("rumble.com/") {
        input
            .rsplit('/')
            .next()
            .and_then(|last| last.split('-').next())
            .unwrap_or("")
    } else {
        input
    };

    let id = id.trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// `base` with `segments` appended as path segments. Each segment is
/// percent-encoded, so an id can never change the host or the path depth.
fn url_with_segments(base: &str, segments: &[&str]) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub fn embed_url(platform: Platform, video_id: &str, origin: Option<&str>) -> Result<Url, url::ParseError> {
    match platform {
        Platform::Youtube => {
            let mut url = url_with_segments("https://www.youtube.com/embed/", &[video_id])?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("enablejsapi", "1")
                    .append_pair("rel", "0")
                    .append_pair("modestbranding", "1")
                    .append_pair("playsinline", "1");
                if let Some(origin) = origin {
                    query.append_pair("origin", origin);
                }
            }
            Ok(url)
        }
        Platform::Rumble => url_with_segments("https://rumble.com/embed/", &[video_id, ""]),
    }
}

pub fn thumbnail_url(platform: Platform, video_id: &str) -> Option<String> {
    match platform {
        Platform::Youtube => Some(format!("https://img.youtube.com/vi/{}/hqdefault.jpg", video_id)),
        Platform::Rumble => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_youtube_watch_id_without_extra_params() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s").as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn extracts_short_link_and_shorts_ids() {
        assert_eq!(
            extract_video_id("https://youtu.be/ABC123?si=tracking").as_deref(),
            Some("ABC123")
        );
        assert_eq!(
            extract_video_id("https://youtube.com/shorts/XyZ987?feature=share").as_deref(),
            Some("XyZ987")
        );
    }

    #[test]
    fn extracts_rumble_id_from_slug() {
        assert_eq!(
            extract_video_id("https://rumble.com/v4abc12-dino-canta-o-abc.html").as_deref(),
            Some("v4abc12")
        );
    }

    #[test]
    fn bare_ids_pass_through_trimmed() {
        assert_eq!(extract_video_id("  ABC123 ").as_deref(), Some("ABC123"));
    }

    #[test]
    fn empty_results_are_rejected() {
        assert_eq!(extract_video_id(""), None);
        assert_eq!(extract_video_id("https://youtu.be/"), None);
        assert_eq!(extract_video_id("https://rumble.com/"), None);
    }

    #[test]
    fn detects_platform_from_links() {
        assert_eq!(Platform::detect("https://youtu.be/x"), Some(Platform::Youtube));
        assert_eq!(Platform::detect("https://rumble.com/v1-x.html"), Some(Platform::Rumble));
        assert_eq!(Platform::detect("ABC123"), None);
    }

    #[test]
    fn youtube_embed_enables_js_api_and_origin() {
        let url = embed_url(Platform::Youtube, "ABC123", Some("https://mundomusical.pt")).unwrap();
        assert_eq!(url.path(), "/embed/ABC123");
        let query = url.query().unwrap();
        assert!(query.contains("enablejsapi=1"));
        assert!(query.contains("origin=https%3A%2F%2Fmundomusical.pt"));
    }

    #[test]
    fn rumble_embed_uses_trailing_slash() {
        let url = embed_url(Platform::Rumble, "v4abc12", None).unwrap();
        assert_eq!(url.as_str(), "https://rumble.com/embed/v4abc12/");
        assert_eq!(thumbnail_url(Platform::Rumble, "v4abc12"), None);
    }

    #[test]
    fn ids_that_look_like_urls_stay_on_the_embed_host() {
        let url = embed_url(Platform::Youtube, "https://m.youtube.com/watch?feature=share&v=ID", None).unwrap();
        assert_eq!(url.host_str(), Some("www.youtube.com"));
        assert_eq!(url.path_segments().unwrap().count(), 2);

        let url = embed_url(Platform::Youtube, "//evil.example/x", None).unwrap();
        assert_eq!(url.host_str(), Some("www.youtube.com"));

        let url = embed_url(Platform::Rumble, "../../x", None).unwrap();
        assert_eq!(url.host_str(), Some("rumble.com"));
        assert!(url.path().starts_with("/embed/"));
    }
}
