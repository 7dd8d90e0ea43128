use serde::{Deserialize, Serialize};

/// Per-tree behaviour switches, fixed when the tree is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Write the caller's default back into the tree when a read misses.
    #[serde(default = "default_true")]
    pub copy_defaults: bool,
}

fn default_true() -> bool {
    true
}

impl Options {
    /// Reads never mutate the tree.
    pub fn pure() -> Self {
        Self {
            copy_defaults: false,
        }
    }

    pub fn with_copy_defaults(mut self, copy_defaults: bool) -> Self {
        self.copy_defaults = copy_defaults;
        self
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            copy_defaults: default_true(),
        }
    }
}
