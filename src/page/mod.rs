//! Page tree: descriptors, index resolution and the tree builder

mod builder;
mod config;
mod handler;
mod index;
mod node;

pub use builder::{resolve_template_ref, BuildError, PageTreeBuilder};
pub use config::{compare_order, OrderKey, PageConfig, DESCRIPTOR_FILE, VALID_USER};
pub use handler::{ContextMap, HandlerOutcome, HandlerRegistry, PageHandler, Preprocessor};
pub use index::{resolve_index, DEFAULT_INDEX_FILES};
pub use node::{PageNode, PageType};
