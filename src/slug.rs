//! Name folding for implicit categories.
//!
//! Inventory rows carry free-text category names ("SIHHİ TESİSAT",
//! "Gıda"). Materializing them needs a stable id per name and a comparison
//! key that treats "Gıda", "GIDA" and "gida" as the same category.

use std::collections::HashSet;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Prefix of ids derived from implicit category names.
pub const IMPLICIT_ID_PREFIX: &str = "cat-";

/// Lowercase, strip diacritics and map the dotless `ı` so Turkish names fold
/// onto plain ASCII where possible. Whitespace runs collapse to one space.
pub fn fold_key(name: &str) -> String {
    let lowered: String = name
        .trim()
        .chars()
        .map(|c| match c {
            'I' => 'ı',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect();
    let stripped: String = lowered
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c == 'ı' { 'i' } else { c })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `cat-<slug>` id for an implicit category name.
pub fn implicit_category_id(name: &str) -> String {
    let mut slug = String::new();
    for c in fold_key(name).chars() {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    format!("{IMPLICIT_ID_PREFIX}{slug}")
}

/// [`implicit_category_id`] with a `-2`, `-3`, ... suffix when the slug is
/// already in `taken`. Names that differ only in punctuation share a slug.
pub fn free_implicit_category_id(name: &str, taken: &HashSet<String>) -> String {
    let base = implicit_category_id(name);
    if !taken.contains(&base) {
        return base;
    }
    (2u32..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(base)
}
