use std::path::Path;

/// Language codes offered to the user, with their display names.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("es", "Spanish"),
    ("en", "English"),
    ("multi", "Multilingual"),
    ("fr", "French"),
    ("pt", "Portuguese"),
    ("de", "German"),
    ("it", "Italian"),
    ("hi", "Hindi"),
    ("ja", "Japanese"),
    ("ru", "Russian"),
    ("nl", "Dutch"),
];

/// Extensions uploaded as-is; everything else is treated as video.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac", "m4a", "opus", "wma"];

/// Extensions accepted as job inputs.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "mov", "avi", "webm", "flv", "wmv", "m4a", "mp3", "wav", "ogg", "flac",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn of(path: &Path) -> Self {
        if is_audio_file(path) {
            MediaKind::Audio
        } else {
            MediaKind::Video
        }
    }
}

/// Resolves a language code to its display name; unknown codes map to themselves.
pub fn language_label(code: &str) -> &str {
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or(code)
}

pub fn is_audio_file(path: &Path) -> bool {
    extension_in(path, AUDIO_EXTENSIONS)
}

pub fn is_supported_media(path: &Path) -> bool {
    extension_in(path, SUPPORTED_EXTENSIONS)
}

/// MIME type announced when uploading the bytes of `path`.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = lower_extension(path);
    match ext.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg") | Some("opus") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("m4a") => "audio/mp4",
        Some("wma") => "audio/x-ms-wma",
        Some("mp4") => "video/mp4",
        Some("mkv") => "video/x-matroska",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("webm") => "video/webm",
        _ => "application/octet-stream",
    }
}

fn extension_in(path: &Path, allowed: &[&str]) -> bool {
    lower_extension(path)
        .map(|ext| allowed.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn lower_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
