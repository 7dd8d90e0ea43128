pub mod document;
pub mod element;
pub mod error;
pub mod format;
pub mod loader;
pub mod logging;
pub mod mapper;
pub mod node;
pub mod options;
mod tree;
pub mod value;

pub use document::Document;
pub use element::Element;
pub use error::ConfigError;
pub use loader::Loader;
pub use mapper::{Deserializable, Serializable, ValueType};
pub use node::Node;
pub use options::Options;
pub use value::{Coerce, Key, Scalar};
