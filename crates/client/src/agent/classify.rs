//! Request classification.
//!
//! Every intercepted request falls into exactly one [`RequestClass`], which
//! picks the policy that answers it.

use serde::Serialize;
use shellcache_core::Request;

/// File extensions that mark a request as video.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogg", "mov", "mkv", "m4v"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestClass {
    /// Top-level page load: network first, app shell when offline.
    Navigation,
    /// Media: network only, never cached.
    Video,
    /// Everything else: stale-while-revalidate.
    Static,
}

/// Classify a request. Total and side-effect free.
pub fn classify(request: &Request) -> RequestClass {
    if request.is_navigation() {
        RequestClass::Navigation
    } else if has_video_extension(request) || accepts_video(request) {
        RequestClass::Video
    } else {
        RequestClass::Static
    }
}

fn has_video_extension(request: &Request) -> bool {
    let segment = request.url.path().rsplit('/').next().unwrap_or_default();
    segment
        .rsplit_once('.')
        .is_some_and(|(_, ext)| VIDEO_EXTENSIONS.iter().any(|v| ext.eq_ignore_ascii_case(v)))
}

fn accepts_video(request: &Request) -> bool {
    request
        .accept()
        .is_some_and(|accept| accept.to_ascii_lowercase().contains("video/"))
}
