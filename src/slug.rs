use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// generate_slug
///
/// Derives a URL-safe identifier from a display name: diacritics are stripped
/// (NFD decomposition, combining marks dropped), ASCII letters are lowercased,
/// every run of other characters becomes a single `-`, and leading/trailing
/// hyphens are trimmed.
///
/// Pure and deterministic: `generate_slug("Categoría Épica!!") == "categoria-epica"`.
pub fn generate_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Returns the explicit slug when it carries any content, otherwise `None`.
pub(crate) fn explicit_slug(slug: Option<&str>) -> Option<String> {
    slug.map(generate_slug).filter(|s| !s.is_empty())
}
