//! Helpers for the externally hosted player.

use reqwest::Url;

/// Extract the hosted-player video id from a share or watch link.
///
/// Accepts `https://www.youtube.com/watch?v=<id>` (any `youtube.com`
/// host) and `https://youtu.be/<id>`. Anything else yields `None`.
pub fn extract_video_id(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let host = url.host_str()?;

    let id = if host.contains("youtube.com") {
        url.query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
    } else if host == "youtu.be" {
        url.path().strip_prefix('/').map(str::to_owned)
    } else {
        None
    };

    id.filter(|id| !id.is_empty())
}
