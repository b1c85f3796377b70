use std::sync::LazyLock;

use regex::Regex;

pub const READING_SPEED_WPM: usize = 200;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("HTML_TAG must be a valid regex"));
static IMG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<img\b[^>]*>").expect("IMG_TAG must be a valid regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE must be a valid regex"));
static NON_SLUG_SYMBOLS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9_\s-]").expect("NON_SLUG_SYMBOLS must be a valid regex")
});
static DASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-+").expect("DASHES must be a valid regex"));

/// Text content of an HTML fragment with whitespace collapsed.
pub fn plain_text(html: &str) -> String {
    let without_tags = HTML_TAG.replace_all(html, " ");
    WHITESPACE.replace_all(&without_tags, " ").trim().to_owned()
}

pub fn word_count(html: &str) -> usize {
    plain_text(html).split_whitespace().count()
}

/// Minutes needed to read the fragment, at least one for non-empty content.
pub fn estimate_read_time(html: &str) -> i64 {
    let words = word_count(html);
    if words == 0 {
        return 0;
    }
    words.div_ceil(READING_SPEED_WPM).max(1) as i64
}

/// Embedded `<img>` tags plus non-empty comma separated urls.
pub fn count_images(html: &str, image_urls: &str) -> usize {
    let embedded = IMG_TAG.find_iter(html).count();
    let referenced = image_urls.split(',').filter(|url| !url.trim().is_empty()).count();
    embedded + referenced
}

pub fn slugify(base: &str) -> String {
    let lowered = base.to_lowercase();
    let cleaned = NON_SLUG_SYMBOLS.replace_all(lowered.trim(), "");
    let dashed = WHITESPACE.replace_all(&cleaned, "-");
    DASHES.replace_all(&dashed, "-").into_owned()
}

/// Splits a comma separated value into trimmed, non-empty entries.
pub fn parse_delimited(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

pub fn join_delimited<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",")
}
