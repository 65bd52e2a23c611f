//! Session identifier extraction from cookie headers.

/// Cookie key carrying the session identifier.
pub const SESSION_COOKIE: &str = "sessid";

/// Extract the session identifier from a `;`-separated cookie header value.
///
/// Returns the value of the first `sessid` cookie, or `None` if the header
/// carries no such cookie.
pub fn session_id_from_cookies(header: &str) -> Option<String> {
    header.split(';').find_map(|cookie| {
        let (key, value) = cookie.trim().split_once('=')?;
        (key == SESSION_COOKIE).then(|| value.to_string())
    })
}
