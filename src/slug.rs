//! Identifier normalization. Every article is keyed by a slug derived from
//! the record's explicit slug column or, failing that, its title.

/// Normalizes `input` into a slug: lowercase ASCII alphanumerics separated by
/// single `-`s, with no leading or trailing separator. Non-ASCII letters are
/// transliterated first, so `Привет мир` becomes `privet-mir`. Returns
/// `placeholder` if nothing survives normalization.
///
/// Normalization is idempotent: `normalize(&normalize(s, p), p) ==
/// normalize(s, p)` as long as `placeholder` is itself a valid slug.
pub fn normalize(input: &str, placeholder: &str) -> String {
    let slug = ::slug::slugify(input.trim());
    if slug.is_empty() {
        placeholder.to_owned()
    } else {
        slug
    }
}
