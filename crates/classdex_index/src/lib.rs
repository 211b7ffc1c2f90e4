// classdex_index - Class-file scanning and name resolution for documentation links
pub mod config;
pub mod link;
pub mod metadata;
pub mod reference;

pub use config::{ConfigError, DuplicateClassPolicy, IndexConfig, CONFIG_FILE_NAME};
pub use link::{AnchorStyle, JavadocLinker};
pub use metadata::{
    BuildReport, ClassDescriptor, IndexError, JavaIndex, JavaIndexBuilder, MethodDescriptor,
    ResolveError,
};
pub use reference::{MethodReference, ReferenceError, Resolved, SymbolReference};
