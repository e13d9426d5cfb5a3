//! Filesystems that view sources are loaded from

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::PathBuf;

use parking_lot::RwLock;

/// A read-only tree of view files addressed by `/`-separated relative paths.
///
/// The root directory is `""`.
pub trait ViewFs: Send + Sync + fmt::Debug {
    /// Names of the regular files directly inside `dir`, sorted.
    /// A missing directory has no files.
    fn list(&self, dir: &str) -> io::Result<Vec<String>>;

    /// Contents of the file at `path`
    fn read(&self, path: &str) -> io::Result<String>;

    /// Whether the filesystem can be used at all
    fn check(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Join a directory and a file name
pub(crate) fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// View files in a directory on disk
#[derive(Debug, Clone)]
pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }
}

impl ViewFs for DirFs {
    fn list(&self, dir: &str) -> io::Result<Vec<String>> {
        let entries = match std::fs::read_dir(self.resolve(dir)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().into_string().map_err(|name| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("file name {:?} is not valid UTF-8", name),
                )
            })?;
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    fn read(&self, path: &str) -> io::Result<String> {
        std::fs::read_to_string(self.resolve(path))
    }

    fn check(&self) -> io::Result<()> {
        let meta = std::fs::metadata(&self.root)?;
        if meta.is_dir() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", self.root.display()),
            ))
        }
    }
}

/// View files held in memory.
///
/// Files can be changed while a renderer is using the filesystem; a hot
/// reloading renderer picks the changes up on its next render.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: RwLock<BTreeMap<String, String>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filesystem from `(path, contents)` pairs
    pub fn from_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        let fs = Self::new();
        for (path, contents) in files {
            fs.insert(path, contents);
        }
        fs
    }

    /// Add or replace a file
    pub fn insert(&self, path: impl Into<String>, contents: impl Into<String>) {
        self.files.write().insert(path.into(), contents.into());
    }

    /// Remove a file, returning its contents
    pub fn remove(&self, path: &str) -> Option<String> {
        self.files.write().remove(path)
    }
}

impl ViewFs for MemoryFs {
    fn list(&self, dir: &str) -> io::Result<Vec<String>> {
        let prefix = join(dir, "");
        let files = self.files.read();
        Ok(files
            .keys()
            .filter_map(|path| path.strip_prefix(prefix.as_str()))
            .filter(|name| !name.is_empty() && !name.contains('/'))
            .map(str::to_string)
            .collect())
    }

    fn read(&self, path: &str) -> io::Result<String> {
        self.files.read().get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_fs_lists_direct_children_only() {
        let fs = MemoryFs::from_files([
            ("default.base.html", "b"),
            ("pages/home.html", "h"),
            ("pages/about.html", "a"),
            ("pages/nested/deep.html", "d"),
        ]);
        assert_eq!(fs.list("").expect("list"), vec!["default.base.html"]);
        assert_eq!(
            fs.list("pages").expect("list"),
            vec!["about.html", "home.html"]
        );
        assert!(fs.list("components").expect("list").is_empty());
    }

    #[test]
    fn test_memory_fs_mutation() {
        let fs = MemoryFs::new();
        fs.insert("pages/a.html", "one");
        assert_eq!(fs.read("pages/a.html").expect("read"), "one");
        fs.insert("pages/a.html", "two");
        assert_eq!(fs.read("pages/a.html").expect("read"), "two");
        assert_eq!(fs.remove("pages/a.html").as_deref(), Some("two"));
        assert!(fs.read("pages/a.html").is_err());
    }

    #[test]
    fn test_dir_fs() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("pages")).expect("mkdir");
        std::fs::create_dir(dir.path().join("pages/sub")).expect("mkdir");
        std::fs::write(dir.path().join("pages/b.html"), "B").expect("write");
        std::fs::write(dir.path().join("pages/a.html"), "A").expect("write");

        let fs = DirFs::new(dir.path());
        assert!(fs.check().is_ok());
        assert_eq!(fs.list("pages").expect("list"), vec!["a.html", "b.html"]);
        assert!(fs.list("components").expect("list").is_empty());
        assert_eq!(fs.read("pages/b.html").expect("read"), "B");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_dir_fs_rejects_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("pages")).expect("mkdir");
        let name = OsStr::from_bytes(b"bad\xff.html");
        std::fs::write(dir.path().join("pages").join(name), "x").expect("write");

        let err = DirFs::new(dir.path())
            .list("pages")
            .expect_err("non UTF-8 names should fail the listing");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_dir_fs_check_fails_for_missing_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fs = DirFs::new(dir.path().join("missing"));
        assert!(fs.check().is_err());
    }
}
