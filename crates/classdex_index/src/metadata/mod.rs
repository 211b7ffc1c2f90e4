//! Class metadata indexing for documentation links.
//!
//! This module locates the classpath roots that contain a base namespace,
//! walks them for compiled classes, parses each class file and builds an
//! immutable index that resolves short class and method references into
//! fully-qualified descriptors. Unreadable roots and malformed class files
//! are logged and skipped; only an unusable base namespace aborts the build.

mod builder;
mod classfile;
mod index;
mod locator;
mod resolve;
mod scanner;

pub use builder::{BuildReport, IndexError, JavaIndexBuilder, SkipReason, SkippedEntry};
pub use classfile::{
    parse_class, parse_method_parameters, ClassParseError, FieldType, ParsedClass, ParsedMethod,
};
pub use index::{ClassDescriptor, JavaIndex, MethodDescriptor, CONSTRUCTOR_NAME};
pub use locator::{package_path, ClasspathRoot, ResourceLocator, RootKind};
pub use resolve::ResolveError;
pub use scanner::{ClassScanner, ScannedClass};
