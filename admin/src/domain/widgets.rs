use std::sync::LazyLock;

use luminair_common::text::{join_delimited, parse_delimited};
use regex::Regex;

static PASTE_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,;\n\t]").expect("PASTE_SEPARATORS must be a valid regex"));

/// Key presses the tag input reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKey {
    Enter,
    Comma,
    Backspace,
}

/// Editing state of a tag field, stored in the draft as comma separated text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagInput {
    tags: Vec<String>,
    input: String,
    max_tags: Option<usize>,
    allow_duplicates: bool,
}

impl TagInput {
    pub fn new(tags: Vec<String>) -> Self {
        Self {
            tags,
            ..Self::default()
        }
    }

    /// Tags of a comma separated draft value.
    pub fn from_delimited(raw: &str) -> Self {
        Self::new(parse_delimited(raw))
    }

    pub fn with_max_tags(mut self, max_tags: usize) -> Self {
        self.max_tags = Some(max_tags);
        self
    }

    pub fn allowing_duplicates(mut self) -> Self {
        self.allow_duplicates = true;
        self
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn to_delimited(&self) -> String {
        join_delimited(&self.tags)
    }

    pub fn type_text(&mut self, text: &str) {
        self.input = text.to_owned();
    }

    /// Adds one tag, returns false when it was empty, a duplicate or over the limit.
    /// The typed text is only cleared when the tag was added.
    pub fn add(&mut self, raw: &str) -> bool {
        let trimmed = raw.trim();
        if trimmed.is_empty() || self.is_full() || self.is_duplicate(trimmed) {
            return false;
        }
        self.tags.push(trimmed.to_owned());
        self.input.clear();
        true
    }

    pub fn remove(&mut self, index: usize) -> Option<String> {
        (index < self.tags.len()).then(|| self.tags.remove(index))
    }

    /// Enter and comma commit the typed text, backspace on an empty input drops the last tag.
    pub fn key(&mut self, key: TagKey) -> bool {
        match key {
            TagKey::Enter | TagKey::Comma => {
                let typed = self.input.clone();
                !typed.is_empty() && self.add(&typed)
            }
            TagKey::Backspace if self.input.is_empty() => self.tags.pop().is_some(),
            TagKey::Backspace => false,
        }
    }

    /// Splits pasted text on commas, semicolons, newlines and tabs.
    /// Returns the number of tags added.
    pub fn paste(&mut self, text: &str) -> usize {
        let before = self.tags.len();
        for candidate in PASTE_SEPARATORS.split(text) {
            let candidate = candidate.trim();
            if candidate.is_empty() || self.is_full() || self.is_duplicate(candidate) {
                continue;
            }
            self.tags.push(candidate.to_owned());
        }
        self.tags.len() - before
    }

    fn is_full(&self) -> bool {
        self.max_tags.is_some_and(|max| self.tags.len() >= max)
    }

    fn is_duplicate(&self, tag: &str) -> bool {
        !self.allow_duplicates
            && self
                .tags
                .iter()
                .any(|existing| existing.to_lowercase() == tag.to_lowercase())
    }
}
