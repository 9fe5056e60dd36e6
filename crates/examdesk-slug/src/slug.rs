//! The slug normalizer.

/// Normalize `text` into a slug.
///
/// Steps, in order: lowercase, trim, whitespace runs to one hyphen, drop
/// everything that is not `[a-z0-9_-]`, collapse hyphen runs, trim hyphens.
/// Empty input gives an empty slug, and `slugify(&slugify(x)) == slugify(x)`.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();

    let mut out = String::with_capacity(lowered.len());
    let mut prev_hyphen = false;
    for c in lowered.trim_matches(is_space).chars() {
        let c = if is_space(c) { '-' } else { c };
        if c == '-' {
            if !prev_hyphen {
                out.push('-');
            }
            prev_hyphen = true;
        } else if is_word_char(c) {
            out.push(c);
            prev_hyphen = false;
        }
        // Anything else is dropped without breaking a hyphen run, so
        // "a - & - b" still collapses to "a-b".
    }

    out.trim_matches('-').to_string()
}

/// Check whether `candidate` is already a canonical slug.
pub fn is_slug(candidate: &str) -> bool {
    !candidate.is_empty() && slugify(candidate) == candidate
}

/// The whitespace class slugs split on. U+0085 is not in it; U+FEFF is.
fn is_space(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\u{0B}' | '\u{0C}' | '\r' | ' '
            | '\u{A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
            | '\u{FEFF}'
    )
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
