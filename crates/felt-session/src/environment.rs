//! Decides which interactive sign-in flow fits the current environment.

/// Surfaces where a secondary sign-in window is unreliable or impossible.
const MOBILE_MARKERS: &[&str] = &["iphone", "ipad", "ipod", "android", "mobile"];

/// Embedded browsers and app shells that suppress popups outright.
const EMBEDDED_MARKERS: &[&str] = &[
    "; wv)",
    "webview",
    "electron",
    "fbav",
    "fban",
    "instagram",
    "micromessenger",
];

/// Whether this environment should sign in by handing over the primary
/// surface instead of opening a secondary window.
///
/// Pure string inspection, ASCII-case-insensitive. An empty or
/// unrecognizable description gets the popup flow; worst case the popup
/// is rejected at runtime and the attempt falls back to redirect anyway.
pub fn prefers_redirect(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    MOBILE_MARKERS
        .iter()
        .chain(EMBEDDED_MARKERS)
        .any(|marker| ua.contains(marker))
}
