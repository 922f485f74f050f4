use smol_str::SmolStr;

/// Name normalization (§3): non-alphanumerics become `_`, comparison is
/// case-insensitive. Arrow and class names are stored already normalized so
/// later phases can compare them with plain equality.
pub fn normalize_name(raw: &str) -> SmolStr {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !ch.is_ascii() && ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else {
            out.push('_');
        }
    }
    SmolStr::new(out)
}

/// For a single-column direct FK, the candidate link name derived from the
/// referring column minus the trailing target-key-column suffix, e.g.
/// `school_code` referencing `school.code` yields `school`. Returns `None`
/// when the referring column doesn't end with `_<target column>` (or equals
/// it outright), in which case the caller falls back to the target table
/// name.
pub fn strip_key_suffix(referring_column: &str, target_column: &str) -> Option<SmolStr> {
    let referring = referring_column.to_ascii_lowercase();
    let target = target_column.to_ascii_lowercase();
    if referring == target {
        return None;
    }
    let suffix = format!("_{target}");
    referring
        .strip_suffix(&suffix)
        .filter(|prefix| !prefix.is_empty())
        .map(normalize_name)
}
