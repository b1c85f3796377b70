pub mod content_types;
