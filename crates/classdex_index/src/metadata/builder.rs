use super::classfile::{parse_class, ClassParseError};
use super::index::{ClassDescriptor, JavaIndex};
use super::locator::{package_path, ResourceLocator};
use super::scanner::ClassScanner;
use crate::config::{DuplicateClassPolicy, IndexConfig};
use indexmap::map::Entry;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failures that abort index construction.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("classpath scan failed: invalid base package '{base_package}': {reason}")]
    InvalidBasePackage {
        base_package: String,
        reason: &'static str,
    },
    #[error("classpath scan failed: class '{name}' found in both {first} and {second}")]
    DuplicateClass {
        name: String,
        first: String,
        second: String,
    },
}

/// Why a scanned entry did not make it into the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The entry could not be parsed as a class file.
    Malformed(String),
    /// A later entry with the same fully-qualified name replaced this one.
    Replaced { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub origin: PathBuf,
    pub reason: SkipReason,
}

/// Summary of one index construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub roots_located: usize,
    pub entries_scanned: usize,
    pub classes_indexed: usize,
    pub skipped: Vec<SkippedEntry>,
}

/// Collects construction inputs and runs locate, scan, parse and build.
#[derive(Debug, Clone)]
pub struct JavaIndexBuilder {
    base_package: String,
    roots: Vec<PathBuf>,
    duplicate_policy: DuplicateClassPolicy,
}

impl JavaIndexBuilder {
    pub fn new(base_package: impl Into<String>) -> Self {
        Self {
            base_package: base_package.into(),
            roots: Vec::new(),
            duplicate_policy: DuplicateClassPolicy::default(),
        }
    }

    pub fn from_config(config: &IndexConfig) -> Self {
        Self::new(config.base_package.clone())
            .with_roots(config.roots())
            .with_duplicate_policy(config.duplicate_classes)
    }

    pub fn with_roots<I>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.roots.extend(roots);
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicateClassPolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn build(&self) -> Result<JavaIndex, IndexError> {
        let located = ResourceLocator::new(&self.roots).locate(&self.base_package)?;
        let base_path = package_path(&self.base_package)?;

        let mut report = BuildReport {
            roots_located: located.len(),
            ..BuildReport::default()
        };
        let mut classes: IndexMap<String, ClassDescriptor> = IndexMap::new();
        let mut origins: HashMap<String, PathBuf> = HashMap::new();

        for scanned in ClassScanner::new(located, base_path) {
            report.entries_scanned += 1;
            let parsed = match parse_class(&scanned.bytes) {
                Ok(parsed) => parsed,
                Err(error) => {
                    skip_malformed(&mut report, scanned.origin, error);
                    continue;
                }
            };

            let descriptor = ClassDescriptor::from(parsed);
            let name = descriptor.name().to_string();
            match classes.entry(name.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(descriptor);
                    origins.insert(name, scanned.origin);
                }
                Entry::Occupied(mut slot) => {
                    let previous = origins
                        .insert(name.clone(), scanned.origin.clone())
                        .unwrap_or_default();
                    if self.duplicate_policy == DuplicateClassPolicy::Fail {
                        return Err(IndexError::DuplicateClass {
                            name,
                            first: previous.display().to_string(),
                            second: scanned.origin.display().to_string(),
                        });
                    }
                    warn!(
                        class = %name,
                        replaced = %previous.display(),
                        by = %scanned.origin.display(),
                        "duplicate class; keeping the later definition"
                    );
                    slot.insert(descriptor);
                    report.skipped.push(SkippedEntry {
                        origin: previous,
                        reason: SkipReason::Replaced { name },
                    });
                }
            }
        }

        report.classes_indexed = classes.len();
        info!(
            base_package = %self.base_package,
            roots = report.roots_located,
            classes = report.classes_indexed,
            skipped = report.skipped.len(),
            "built class index"
        );
        Ok(JavaIndex::from_classes(
            self.base_package.clone(),
            classes,
            report,
        ))
    }
}

fn skip_malformed(report: &mut BuildReport, origin: PathBuf, error: ClassParseError) {
    warn!(path = %origin.display(), error = %error, "skipping malformed class file");
    report.skipped.push(SkippedEntry {
        origin,
        reason: SkipReason::Malformed(error.to_string()),
    });
}

impl JavaIndex {
    /// Scans `roots` for classes under `base_package` using default settings.
    pub fn new<I>(base_package: &str, roots: I) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        debug!(base_package, "building class index");
        JavaIndexBuilder::new(base_package).with_roots(roots).build()
    }
}
