//! Headless admin for the content API.
//!
//! `domain` holds the editing model (drafts are saved by a debounced auto-save
//! task, listings are shown through a selectable table) and `infrastructure`
//! binds it to the REST backend, configuration and the command line.

pub mod domain;
pub mod infrastructure;

#[cfg(test)]
mod test_utils;
