// Shared-directory catalog: what the server offers and where it lives

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use crate::common::error::{Error, Result};
use crate::common::utils::sanitize_file_name;

/// Outcome of looking up a requested name.
pub enum Lookup {
    Found { path: PathBuf, file: File, len: u64 },
    Missing(String),
    Invalid,
}

pub struct Catalog {
    root: PathBuf,
}

impl Catalog {
    pub fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::ConfigError(format!(
                "shared directory {} does not exist",
                root.display()
            )));
        }
        Ok(Self { root: root.to_path_buf() })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Regular files directly under the root, sorted. Non-UTF-8 names are skipped.
    pub fn names(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root)
            .map_err(|e| Error::storage(&format!("listing {}", self.root.display()), e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::storage("reading directory entry", e))?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) if !name.contains('\n') => names.push(name),
                Ok(name) => log::warn!("Skipping name with newline: {:?}", name),
                Err(raw) => log::warn!("Skipping non-UTF-8 name: {:?}", raw),
            }
        }
        names.sort();
        Ok(names)
    }

    /// Resolve a raw requested name, reduced to its base component.
    pub fn lookup(&self, raw: &[u8]) -> Lookup {
        let Ok(requested) = std::str::from_utf8(raw) else {
            return Lookup::Invalid;
        };
        let Some(base) = sanitize_file_name(requested) else {
            return Lookup::Invalid;
        };

        let path = self.root.join(base);
        let opened = File::open(&path).and_then(|file| {
            let meta = file.metadata()?;
            Ok((file, meta))
        });
        match opened {
            Ok((file, meta)) if meta.is_file() => Lookup::Found { path, file, len: meta.len() },
            _ => Lookup::Missing(base.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn shared_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), b"bee").unwrap();
        fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        dir
    }

    #[test]
    fn test_names_sorted_files_only() {
        let dir = shared_dir();
        let catalog = Catalog::open(dir.path()).unwrap();
        assert_eq!(catalog.names().unwrap(), vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_lookup_found() {
        let dir = shared_dir();
        let catalog = Catalog::open(dir.path()).unwrap();

        match catalog.lookup(b"a.txt") {
            Lookup::Found { len, .. } => assert_eq!(len, 5),
            _ => panic!("expected a.txt to be found"),
        }
    }

    #[test]
    fn test_lookup_strips_traversal() {
        let dir = shared_dir();
        let catalog = Catalog::open(dir.path()).unwrap();

        assert!(matches!(catalog.lookup(b"../../a.txt"), Lookup::Found { .. }));
        assert!(matches!(catalog.lookup(b"../secret"), Lookup::Missing(ref n) if n == "secret"));
    }

    #[test]
    fn test_lookup_rejects_bad_names() {
        let dir = shared_dir();
        let catalog = Catalog::open(dir.path()).unwrap();

        assert!(matches!(catalog.lookup(b""), Lookup::Invalid));
        assert!(matches!(catalog.lookup(b".."), Lookup::Invalid));
        assert!(matches!(catalog.lookup(&[0xff, 0x00]), Lookup::Invalid));
        assert!(matches!(catalog.lookup(b"nested"), Lookup::Missing(_)));
    }

    #[test]
    fn test_missing_root() {
        let dir = TempDir::new().unwrap();
        assert!(Catalog::open(&dir.path().join("nope")).is_err());
    }
}
