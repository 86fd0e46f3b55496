use std::path::Path;

/// `prefix_N` for sequential naming.
pub fn sequential_title(prefix: &str, number: u32) -> String {
    format!("{prefix}_{number}")
}

/// `prefix_<stem>` for original naming.
pub fn original_title(prefix: &str, source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{prefix}_{stem}")
}

/// Returns `base` if free, otherwise the first of `base_2`, `base_3`, ... that is free.
///
/// `is_taken` is consulted in order and may fail; the first error is returned.
pub fn dedupe_title<E>(
    base: &str,
    mut is_taken: impl FnMut(&str) -> Result<bool, E>,
) -> Result<String, E> {
    let mut title = base.to_string();
    let mut suffix: u32 = 2;
    while is_taken(&title)? {
        title = format!("{base}_{suffix}");
        suffix += 1;
    }
    Ok(title)
}
