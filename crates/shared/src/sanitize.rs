//! Markup stripping used to detect HTML injected into free-text fields.

use std::{borrow::Cow, sync::LazyLock};

use regex::Regex;

static COMMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?(?:-->|$)").expect("comment pattern"));

// Elements whose contents are dropped along with the tags.
static RAW_TEXT_ELEMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
        .expect("raw text element pattern")
});

static TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(?:/?[A-Za-z]|!)[^>]*>").expect("tag pattern"));

/// Removes comments, `<script>`/`<style>` elements and every start or end tag.
///
/// A `<` that does not open a tag (`a < b`) is left alone.
pub fn strip_markup(input: &str) -> Cow<'_, str> {
    let mut text = Cow::Borrowed(input);
    for pattern in [&*COMMENTS, &*RAW_TEXT_ELEMENTS, &*TAGS] {
        let stripped = match pattern.replace_all(&text, "") {
            Cow::Owned(stripped) => Some(stripped),
            Cow::Borrowed(_) => None,
        };
        if let Some(stripped) = stripped {
            text = Cow::Owned(stripped);
        }
    }
    text
}
