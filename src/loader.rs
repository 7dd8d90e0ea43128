use crate::format::Format;
use crate::node::Node;
use crate::options::Options;
use anyhow::{Context, Result};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub type ReaderFactory = Box<dyn Fn() -> io::Result<Box<dyn Read>>>;
pub type WriterFactory = Box<dyn Fn() -> io::Result<Box<dyn Write>>>;

/// Where a loader reads from and writes to.
pub enum Source {
    File(PathBuf),
    /// Scoped reader/writer factories, e.g. for embedded resources.
    Streams {
        reader: ReaderFactory,
        writer: WriterFactory,
    },
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => f.debug_tuple("File").field(path).finish(),
            Source::Streams { .. } => f.write_str("Streams"),
        }
    }
}

/// A format adapter bound to a source and the options of the trees it produces.
#[derive(Debug)]
pub struct Loader {
    format: Box<dyn Format>,
    source: Source,
    options: Options,
}

impl Loader {
    pub fn file(path: impl Into<PathBuf>, format: Box<dyn Format>, options: Options) -> Self {
        Self {
            format,
            source: Source::File(path.into()),
            options,
        }
    }

    pub fn streams(
        reader: ReaderFactory,
        writer: WriterFactory,
        format: Box<dyn Format>,
        options: Options,
    ) -> Self {
        Self {
            format,
            source: Source::Streams { reader, writer },
            options,
        }
    }

    pub fn format(&self) -> &dyn Format {
        self.format.as_ref()
    }

    pub fn options(&self) -> Options {
        self.options
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            Source::File(path) => Some(path),
            Source::Streams { .. } => None,
        }
    }

    /// Stream sources always count as present.
    pub fn exists(&self) -> bool {
        self.path().is_none_or(Path::exists)
    }

    pub fn create_empty(&self) -> Node {
        Node::with_options(self.options)
    }

    pub fn load(&self) -> Result<Node> {
        let mut text = String::new();
        match &self.source {
            Source::File(path) => {
                let file = File::open(path)
                    .with_context(|| format!("Failed to open file: {}", path.display()))?;
                BufReader::new(file)
                    .read_to_string(&mut text)
                    .with_context(|| format!("Failed to read file: {}", path.display()))?;
            }
            Source::Streams { reader, .. } => {
                let reader = reader().context("Failed to open reader")?;
                BufReader::new(reader)
                    .read_to_string(&mut text)
                    .context("Failed to read from reader")?;
            }
        }

        let node = self
            .format
            .read(&text, self.options)
            .with_context(|| format!("Failed to parse {} document", self.format.name()))?;
        Ok(node)
    }

    pub fn save(&self, node: &Node) -> Result<()> {
        let text = self.format.write(node)?;
        match &self.source {
            Source::File(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to write to file: {}", path.display()))?;
                let mut writer = BufWriter::new(file);
                writer.write_all(text.as_bytes())?;
                writer.flush()?;
            }
            Source::Streams { writer, .. } => {
                let writer = writer().context("Failed to open writer")?;
                let mut writer = BufWriter::new(writer);
                writer.write_all(text.as_bytes())?;
                writer.flush()?;
            }
        }
        Ok(())
    }
}

/// Creates `dir` and its parents. Failure is logged, not returned.
pub(crate) fn mkdirs(dir: Option<&Path>) {
    let Some(dir) = dir else {
        return;
    };
    if dir.as_os_str().is_empty() {
        return;
    }
    if let Err(e) = fs::create_dir_all(dir) {
        tracing::error!(dir = %dir.display(), error = %e, "Failed to create directories");
    }
}
