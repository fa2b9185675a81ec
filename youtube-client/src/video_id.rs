use regex::Regex;
use std::sync::OnceLock;

fn video_id_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(
                r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)([a-zA-Z0-9_-]{11})",
            )
            .expect("video link pattern should compile"),
            Regex::new(r"^([a-zA-Z0-9_-]{11})$").expect("video id pattern should compile"),
        ]
    })
}

/// Extract the 11-character video id from a YouTube link, or accept a bare id.
pub fn extract_video_id(url_or_id: &str) -> Option<String> {
    let candidate = url_or_id.trim();

    video_id_patterns()
        .iter()
        .find_map(|pattern| pattern.captures(candidate))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}
