use super::locator::{ClasspathRoot, RootKind};
use std::collections::VecDeque;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::ZipArchive;

const CLASS_SUFFIX: &str = ".class";

/// File names that share the class suffix but do not describe a class.
const NON_CLASS_FILES: &[&str] = &["module-info.class", "package-info.class"];

/// Raw bytes of one compiled class together with where they came from.
#[derive(Debug, Clone)]
pub struct ScannedClass {
    /// Filesystem path, or `archive.jar!/entry` for archive members.
    pub origin: PathBuf,
    pub bytes: Vec<u8>,
}

/// Lazily walks classpath roots and yields every compiled class under a
/// namespace path. Failures on one root or entry are logged and skipped;
/// they never end the walk.
pub struct ClassScanner {
    roots: VecDeque<ClasspathRoot>,
    base_path: String,
    current: Option<RootWalk>,
}

impl ClassScanner {
    /// `base_path` is the slash-separated namespace path (see
    /// [`package_path`](super::locator::package_path)).
    pub fn new<I>(roots: I, base_path: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = ClasspathRoot>,
    {
        Self {
            roots: roots.into_iter().collect(),
            base_path: base_path.into(),
            current: None,
        }
    }

    fn open(&self, root: &ClasspathRoot) -> Option<RootWalk> {
        match root.kind {
            RootKind::Directory => {
                let start = root.path.join(&self.base_path);
                Some(RootWalk::Directory(DirectoryWalk {
                    pending: vec![start],
                }))
            }
            RootKind::Archive => match ArchiveWalk::open(&root.path, &self.base_path) {
                Ok(walk) => Some(RootWalk::Archive(walk)),
                Err(error) => {
                    warn!(path = %root.path.display(), error = %error, "unable to open classpath archive");
                    None
                }
            },
            RootKind::Unsupported => {
                debug!(path = %root.path.display(), "unsupported classpath root yields no classes");
                None
            }
        }
    }
}

impl Iterator for ClassScanner {
    type Item = ScannedClass;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(walk) = self.current.as_mut() {
                let next = match walk {
                    RootWalk::Directory(walk) => walk.next(),
                    RootWalk::Archive(walk) => walk.next(),
                };
                if next.is_some() {
                    return next;
                }
                self.current = None;
            }

            let root = self.roots.pop_front()?;
            self.current = self.open(&root);
        }
    }
}

enum RootWalk {
    Directory(DirectoryWalk),
    Archive(ArchiveWalk),
}

/// Depth-first walk in lexical order. Symlinked directories are not followed.
struct DirectoryWalk {
    pending: Vec<PathBuf>,
}

impl DirectoryWalk {
    fn next(&mut self) -> Option<ScannedClass> {
        while let Some(path) = self.pending.pop() {
            if path.is_dir() {
                self.expand(&path);
                continue;
            }

            if !is_class_file_name(&path) {
                continue;
            }

            match fs::read(&path) {
                Ok(bytes) => {
                    return Some(ScannedClass {
                        origin: path,
                        bytes,
                    })
                }
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "unable to read class file");
                }
            }
        }
        None
    }

    fn expand(&mut self, dir: &Path) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(error) => {
                warn!(path = %dir.display(), error = %error, "unable to list directory");
                return;
            }
        };

        let mut children = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    let linked = entry.file_type().map(|kind| kind.is_symlink()).unwrap_or(false);
                    if linked && path.is_dir() {
                        debug!(path = %path.display(), "not following symlinked directory");
                        continue;
                    }
                    children.push(path);
                }
                Err(error) => {
                    warn!(path = %dir.display(), error = %error, "unable to read directory entry");
                }
            }
        }
        children.sort();
        self.pending.extend(children.into_iter().rev());
    }
}

fn is_class_file_name(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(OsStr::to_str) else {
        return false;
    };
    has_class_suffix(name) && !NON_CLASS_FILES.contains(&name)
}

fn has_class_suffix(name: &str) -> bool {
    name.len() > CLASS_SUFFIX.len()
        && name
            .get(name.len() - CLASS_SUFFIX.len()..)
            .map(|suffix| suffix.eq_ignore_ascii_case(CLASS_SUFFIX))
            .unwrap_or(false)
}

struct ArchiveWalk {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
    prefix: String,
    next_index: usize,
}

impl ArchiveWalk {
    fn open(path: &Path, base_path: &str) -> Result<Self, zip::result::ZipError> {
        let file = File::open(path)?;
        let archive = ZipArchive::new(BufReader::new(file))?;
        let prefix = if base_path.is_empty() {
            String::new()
        } else {
            format!("{base_path}/")
        };
        Ok(Self {
            path: path.to_path_buf(),
            archive,
            prefix,
            next_index: 0,
        })
    }

    fn next(&mut self) -> Option<ScannedClass> {
        while self.next_index < self.archive.len() {
            let idx = self.next_index;
            self.next_index += 1;

            let mut entry = match self.archive.by_index(idx) {
                Ok(entry) => entry,
                Err(error) => {
                    warn!(path = %self.path.display(), index = idx, error = %error, "unable to read archive entry");
                    continue;
                }
            };

            if !entry.is_file() {
                continue;
            }

            let name = entry.name().to_string();
            if !wants_entry(&self.prefix, &name) {
                continue;
            }

            let mut bytes = Vec::with_capacity(entry.size() as usize);
            if let Err(error) = entry.read_to_end(&mut bytes) {
                warn!(path = %self.path.display(), entry = %name, error = %error, "unable to read archive entry");
                continue;
            }

            return Some(ScannedClass {
                origin: archive_entry_path(&self.path, &name),
                bytes,
            });
        }
        None
    }
}

fn wants_entry(prefix: &str, name: &str) -> bool {
    if !name.starts_with(prefix) || name.starts_with("META-INF/") {
        return false;
    }
    let file_name = name.rsplit('/').next().unwrap_or(name);
    has_class_suffix(file_name) && !NON_CLASS_FILES.contains(&file_name)
}

fn archive_entry_path(archive: &Path, entry: &str) -> PathBuf {
    let mut display = archive.display().to_string();
    display.push('!');
    display.push('/');
    display.push_str(entry);
    PathBuf::from(display)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::{empty_class, write_class, write_jar};
    use tempfile::TempDir;

    fn origins(scanner: ClassScanner) -> Vec<String> {
        scanner
            .map(|class| {
                class
                    .origin
                    .to_string_lossy()
                    .replace('\\', "/")
                    .rsplit_once("/com/")
                    .map(|(_, rest)| format!("com/{rest}"))
                    .unwrap_or_default()
            })
            .collect()
    }

    #[test]
    fn walks_directories_in_lexical_order() {
        let dir = TempDir::new().unwrap();
        for name in ["com/example/two/Charlie", "com/example/one/Bravo", "com/example/one/Alpha"] {
            write_class(dir.path(), name, &empty_class(name));
        }
        fs::write(dir.path().join("com/example/one/readme.txt"), "ignored").unwrap();
        write_class(dir.path(), "com/example/package-info", b"ignored");

        let scanner = ClassScanner::new([ClasspathRoot::new(dir.path())], "com/example");
        assert_eq!(
            origins(scanner),
            vec![
                "com/example/one/Alpha.class",
                "com/example/one/Bravo.class",
                "com/example/two/Charlie.class",
            ]
        );
    }

    #[test]
    fn directory_walk_starts_at_the_namespace_path() {
        let dir = TempDir::new().unwrap();
        write_class(dir.path(), "com/example/one/Alpha", &empty_class("com/example/one/Alpha"));
        write_class(dir.path(), "com/example/two/Bravo", &empty_class("com/example/two/Bravo"));

        let scanner = ClassScanner::new([ClasspathRoot::new(dir.path())], "com/example/one");
        assert_eq!(origins(scanner), vec!["com/example/one/Alpha.class"]);
    }

    #[test]
    fn archive_entries_are_filtered_by_namespace_and_suffix() {
        let dir = TempDir::new().unwrap();
        let jar = write_jar(
            &dir.path().join("lib.jar"),
            &[
                ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n".to_vec()),
                ("com/example/one/Alpha.class", empty_class("com/example/one/Alpha")),
                ("com/example/one/notes.txt", b"text".to_vec()),
                ("com/example/module-info.class", b"ignored".to_vec()),
                ("org/other/Zulu.class", empty_class("org/other/Zulu")),
            ],
        );

        let scanned: Vec<ScannedClass> =
            ClassScanner::new([ClasspathRoot::new(&jar)], "com/example").collect();
        assert_eq!(scanned.len(), 1);
        assert!(scanned[0]
            .origin
            .to_string_lossy()
            .ends_with("lib.jar!/com/example/one/Alpha.class"));
        assert_eq!(scanned[0].bytes, empty_class("com/example/one/Alpha"));
    }

    #[test]
    fn failing_root_does_not_stop_the_scan() {
        let dir = TempDir::new().unwrap();
        let broken = dir.path().join("broken.jar");
        fs::write(&broken, b"not a zip").unwrap();
        let classes = dir.path().join("classes");
        write_class(&classes, "com/example/Alpha", &empty_class("com/example/Alpha"));

        let roots = [
            ClasspathRoot {
                path: broken,
                kind: RootKind::Archive,
            },
            ClasspathRoot {
                path: dir.path().join("missing"),
                kind: RootKind::Directory,
            },
            ClasspathRoot::new(dir.path().join("notes.txt")),
            ClasspathRoot::new(&classes),
        ];
        let scanned: Vec<ScannedClass> = ClassScanner::new(roots, "com/example").collect();
        assert_eq!(scanned.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_followed() {
        let dir = TempDir::new().unwrap();
        for name in ["com/example/one/Alpha", "com/example/two/Bravo"] {
            write_class(dir.path(), name, &empty_class(name));
        }
        let base = dir.path().join("com/example");
        std::os::unix::fs::symlink(base.join("two"), base.join("one/alias")).unwrap();
        std::os::unix::fs::symlink(&base, base.join("two/cycle")).unwrap();
        std::os::unix::fs::symlink(base.join("two/Bravo.class"), base.join("one/Linked.class"))
            .unwrap();

        let scanner = ClassScanner::new([ClasspathRoot::new(dir.path())], "com/example");
        assert_eq!(
            origins(scanner),
            vec![
                "com/example/one/Alpha.class",
                "com/example/one/Linked.class",
                "com/example/two/Bravo.class",
            ]
        );
    }

    #[test]
    fn class_suffix_is_case_insensitive() {
        assert!(has_class_suffix("Alpha.CLASS"));
        assert!(has_class_suffix("Alpha.class"));
        assert!(!has_class_suffix(".class"));
        assert!(!has_class_suffix("Alpha.classes"));
    }
}
