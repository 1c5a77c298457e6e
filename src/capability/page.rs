//! Page rendering for HTML responses.

use std::io;
use std::path::{Path, PathBuf};

/// Turns a page file into HTML.
pub trait PageRenderer: Send + Sync {
    fn render(&self, path: &Path) -> io::Result<String>;
}

/// Serves page files as-is, resolving relative paths against a root.
#[derive(Clone, Debug, Default)]
pub struct FilePages {
    root: Option<PathBuf>,
}

impl FilePages {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl PageRenderer for FilePages {
    fn render(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(self.resolve(path))
    }
}
