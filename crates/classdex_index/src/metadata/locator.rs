use super::builder::IndexError;
use indexmap::IndexSet;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::ZipArchive;

/// How a classpath root stores its classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    Directory,
    Archive,
    Unsupported,
}

/// One classpath entry known to contain the requested namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClasspathRoot {
    pub path: PathBuf,
    pub kind: RootKind,
}

impl ClasspathRoot {
    /// Classifies `path` by what it is on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kind = if path.is_dir() {
            RootKind::Directory
        } else if path.is_file() && is_archive(&path) {
            RootKind::Archive
        } else {
            RootKind::Unsupported
        };
        Self { path, kind }
    }
}

/// Finds the caller-supplied roots that contain a base namespace.
pub struct ResourceLocator<'a> {
    roots: &'a [PathBuf],
}

impl<'a> ResourceLocator<'a> {
    pub fn new(roots: &'a [PathBuf]) -> Self {
        Self { roots }
    }

    /// Returns every root whose contents include `base_package`, in the order
    /// the roots were supplied. Duplicate roots collapse into one.
    pub fn locate(&self, base_package: &str) -> Result<Vec<ClasspathRoot>, IndexError> {
        let base_path = package_path(base_package)?;

        let mut seen = IndexSet::new();
        for path in self.roots {
            let key = fs::canonicalize(path).unwrap_or_else(|_| path.clone());
            if !seen.insert(key) {
                debug!(path = %path.display(), "skipping duplicate classpath root");
            }
        }

        let mut located = Vec::new();
        for path in seen {
            let root = ClasspathRoot::new(path);
            if root_contains(&root, &base_path) {
                debug!(path = %root.path.display(), kind = ?root.kind, "located classpath root");
                located.push(root);
            }
        }
        Ok(located)
    }
}

/// Converts a dotted namespace into its slash-separated path form. An empty
/// namespace selects everything under each root.
pub fn package_path(base_package: &str) -> Result<String, IndexError> {
    if base_package.is_empty() {
        return Ok(String::new());
    }

    for segment in base_package.split('.') {
        let reason = if segment.is_empty() {
            Some("empty namespace segment")
        } else if segment.contains(['/', '\\']) || segment.chars().any(char::is_whitespace) {
            Some("namespace segments may not contain separators or whitespace")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(IndexError::InvalidBasePackage {
                base_package: base_package.to_string(),
                reason,
            });
        }
    }

    Ok(base_package.replace('.', "/"))
}

fn root_contains(root: &ClasspathRoot, base_path: &str) -> bool {
    match root.kind {
        RootKind::Directory => root.path.join(base_path).is_dir(),
        RootKind::Archive => match archive_contains(&root.path, base_path) {
            Ok(found) => found,
            Err(error) => {
                warn!(path = %root.path.display(), error = %error, "unable to read classpath archive");
                false
            }
        },
        RootKind::Unsupported => {
            debug!(path = %root.path.display(), "ignoring unsupported classpath root");
            false
        }
    }
}

fn archive_contains(path: &Path, base_path: &str) -> Result<bool, zip::result::ZipError> {
    let file = File::open(path)?;
    let archive = ZipArchive::new(BufReader::new(file))?;
    if base_path.is_empty() {
        return Ok(true);
    }
    let prefix = format!("{base_path}/");
    let found = archive.file_names().any(|name| name.starts_with(&prefix));
    Ok(found)
}

pub(crate) fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| ["jar", "zip"].iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}
