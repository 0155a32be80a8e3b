use relative_path::{RelativePath, RelativePathBuf};
use std::path::Path;

/* 📖 # Why use RelativePathBuf for FilePath?

Every path handed to the PAL is relative to the PAL's base directory (the project root
for RealPal, an in-memory namespace for MockPal). Wrapping RelativePathBuf makes that
explicit in signatures and gives forward-slash semantics on every platform, which
keeps route slugs and docs paths identical between Windows and Unix.
*/

/// Type-safe wrapper for file paths relative to the PAL base directory.
///
/// # Examples
///
/// ```
/// use livewire_base::FilePath;
///
/// let docs = FilePath::from("docs");
/// assert_eq!(docs.join("01_intro.md").to_string(), "docs/01_intro.md");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilePath(RelativePathBuf);

impl FilePath {
    /// Returns the underlying RelativePath.
    pub fn as_relative(&self) -> &RelativePath {
        &self.0
    }

    /// Converts to a regular Path, without any base directory.
    pub fn as_path(&self) -> &Path {
        Path::new(self.0.as_str())
    }

    /// Returns true for the PAL root (`""` or `"."`).
    pub fn is_root(&self) -> bool {
        matches!(self.0.as_str(), "" | ".")
    }

    /// Appends a relative component. Joining onto the root yields the component itself.
    pub fn join(&self, component: impl AsRef<str>) -> FilePath {
        if self.is_root() {
            FilePath::from(component.as_ref())
        } else {
            FilePath(self.0.join(component.as_ref()))
        }
    }

    /// The final path component, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name()
    }

    /// The parent directory, if any.
    pub fn parent(&self) -> Option<FilePath> {
        self.0
            .parent()
            .filter(|p| !p.as_str().is_empty())
            .map(FilePath::from)
    }

    /// Path of `self` relative to `base`, if `self` lives under it.
    pub fn strip_prefix(&self, base: &FilePath) -> Option<FilePath> {
        if base.is_root() {
            return Some(self.clone());
        }
        self.0.strip_prefix(&base.0).ok().map(FilePath::from)
    }
}

impl From<&str> for FilePath {
    fn from(s: &str) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl From<String> for FilePath {
    fn from(s: String) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl From<&RelativePath> for FilePath {
    fn from(p: &RelativePath) -> Self {
        Self(p.to_relative_path_buf())
    }
}

impl From<&Path> for FilePath {
    fn from(p: &Path) -> Self {
        Self(RelativePathBuf::from(p.to_string_lossy().replace('\\', "/")))
    }
}

impl std::fmt::Display for FilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<RelativePath> for FilePath {
    fn as_ref(&self) -> &RelativePath {
        &self.0
    }
}
