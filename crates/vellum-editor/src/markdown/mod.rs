//! Bidirectional markdown codec assembled from extension rules.

pub mod parser;
pub mod serializer;

pub use parser::MarkdownParser;
pub use serializer::{MarkRule, MarkdownSerializer, NodeSerializeFn, SerializerState};
