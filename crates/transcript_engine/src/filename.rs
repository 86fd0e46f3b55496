/// Filesystem-safe stem for an output title.
///
/// Every character that is not alphanumeric, `-`, `_` or a space becomes `_`.
/// Titles that collide with reserved Windows device names get a trailing `_`.
pub fn safe_file_stem(title: &str) -> String {
    let mut cleaned: String = title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim().is_empty() {
        cleaned = "untitled".to_string();
    }
    if is_reserved_windows_name(&cleaned) {
        cleaned.push('_');
    }
    cleaned
}

/// `{safe stem}.md`
pub fn markdown_filename(title: &str) -> String {
    format!("{}.md", safe_file_stem(title))
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
