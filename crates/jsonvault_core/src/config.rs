//! Store configuration.

/// Configuration for opening a document store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the storage directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Name of the backup directory inside the storage directory.
    pub backup_dir_name: String,

    /// Whether to fsync document files after each atomic replace.
    pub sync_writes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            backup_dir_name: "backups".to_string(),
            sync_writes: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the storage directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the backup directory name.
    #[must_use]
    pub fn backup_dir_name(mut self, name: impl Into<String>) -> Self {
        self.backup_dir_name = name.into();
        self
    }

    /// Sets whether to fsync after document writes.
    #[must_use]
    pub const fn sync_writes(mut self, value: bool) -> Self {
        self.sync_writes = value;
        self
    }
}
