use crate::format;
use crate::loader::{Loader, mkdirs};
use crate::node::Node;
use crate::options::Options;
use serde::de::DeserializeOwned;
use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, error, warn};

/// A root node bound to one location and one loader.
///
/// Construction never fails: a missing or unreadable document yields an
/// empty tree. Dereferences to the root [`Node`].
///
/// Subtrees replaced by later writes stay allocated until the document is
/// dropped. A long-lived document that keeps rewriting values should be
/// swapped for [`Document::reload`] after saving, which starts from a compact
/// tree.
#[derive(Debug)]
pub struct Document {
    root: Node,
    path: PathBuf,
    loader: Rc<Loader>,
}

impl Document {
    /// Loads or creates the document at `path`. The format follows the extension.
    pub fn must(path: impl AsRef<Path>) -> Document {
        Self::must_with(path, Options::default())
    }

    pub fn must_with(path: impl AsRef<Path>, options: Options) -> Document {
        let path = absolute(path.as_ref());
        let loader = Loader::file(path.clone(), format::for_path(&path), options);
        Self::from_loader(loader, path)
    }

    pub fn must_in(dir: impl AsRef<Path>, file: impl AsRef<Path>) -> Document {
        Self::must(dir.as_ref().join(file))
    }

    pub fn must_parts<I, S>(parts: I) -> Document
    where
        I: IntoIterator<Item = S>,
        S: AsRef<Path>,
    {
        let path: PathBuf = parts.into_iter().collect();
        Self::must(path)
    }

    /// Uses an arbitrary loader, e.g. one over reader/writer factories.
    pub fn from_loader(loader: Loader, path: impl Into<PathBuf>) -> Document {
        let loader = Rc::new(loader);
        let root = read(&loader);
        Document {
            root,
            path: path.into(),
            loader,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// A fresh document read from the same location. `self` is left as is.
    pub fn reload(&self) -> Document {
        Document {
            root: read(&self.loader),
            path: self.path.clone(),
            loader: Rc::clone(&self.loader),
        }
    }

    pub fn try_save(&self) -> anyhow::Result<()> {
        mkdirs(self.loader.path().and_then(Path::parent));
        self.loader.save(&self.root)
    }

    /// Writes the tree out. Failures are logged and reported as `false`.
    pub fn save(&self) -> bool {
        match self.try_save() {
            Ok(()) => true,
            Err(e) => {
                let cause = format!("{:#}", e);
                error!(path = %self.path.display(), error = %cause, "Failed to save document");
                false
            }
        }
    }

    /// Saves only if nothing exists at the location yet.
    pub fn save_if_absent(&self) -> bool {
        if self.loader.exists() {
            return true;
        }
        self.save()
    }

    /// Every file in `dir` whose name ends with `extension`, in path order.
    /// An unreadable directory yields nothing.
    pub fn all(dir: impl AsRef<Path>, extension: &str) -> impl Iterator<Item = Document> {
        Self::all_with(dir, extension, Options::default())
    }

    pub fn all_with(
        dir: impl AsRef<Path>,
        extension: &str,
        options: Options,
    ) -> impl Iterator<Item = Document> {
        list(dir.as_ref(), extension)
            .into_iter()
            .map(move |path| Document::must_with(path, options))
    }

    /// Documents bound to `T`; ones that do not bind are skipped.
    pub fn all_bound<T: DeserializeOwned>(
        dir: impl AsRef<Path>,
        extension: &str,
    ) -> impl Iterator<Item = T> {
        Self::all(dir, extension).filter_map(|doc| doc.try_bind::<T>())
    }
}

impl Deref for Document {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.root
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn read(loader: &Loader) -> Node {
    if !loader.exists() {
        debug!(path = ?loader.path(), "No document yet, starting empty");
        return loader.create_empty();
    }
    match loader.load() {
        Ok(node) => node,
        Err(e) => {
            let cause = format!("{:#}", e);
            warn!(path = ?loader.path(), error = %cause, "Unreadable document, starting empty");
            loader.create_empty()
        }
    }
}

fn list(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "Cannot list directory");
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(extension))
        })
        .collect();
    paths.sort();
    paths
}
