//! Content conversion for page bodies

mod markdown;

pub use markdown::MarkdownRenderer;
