//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::{EntityId, EntityPrefix};

/// Represents an MQT project
#[derive(Debug)]
pub struct Project {
    /// Root directory of the project (parent of .mqt/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current =
            std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            let mqt_dir = current.join(".mqt");
            if mqt_dir.is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        let mqt_dir = root.join(".mqt");
        if mqt_dir.exists() {
            return Err(ProjectError::AlreadyExists(root.clone()));
        }

        std::fs::create_dir_all(&mqt_dir)
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        // Create default config
        let config_path = mqt_dir.join("config.yaml");
        std::fs::write(&config_path, Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        Self::create_record_dirs(&root)?;

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# MQT Project Configuration

# Default author for new records (can be overridden by global config)
# author: ""

# Editor to use for `mqt ncr edit` (default: $EDITOR)
# editor: ""
"#
    }

    fn create_record_dirs(root: &Path) -> Result<(), ProjectError> {
        let dirs = [
            "quality/plans",
            "quality/charts",
            "quality/regimes",
            "quality/ncrs",
        ];

        for dir in dirs {
            std::fs::create_dir_all(root.join(dir))
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        Ok(())
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .mqt configuration directory
    pub fn mqt_dir(&self) -> PathBuf {
        self.root.join(".mqt")
    }

    /// Get the path for a new record file
    pub fn entity_path(&self, id: &EntityId) -> PathBuf {
        let subdir = Self::entity_directory(id.prefix());
        self.root.join(subdir).join(format!("{}.mqt.yaml", id))
    }

    /// Get the directory for a given entity prefix
    pub fn entity_directory(prefix: EntityPrefix) -> &'static str {
        match prefix {
            EntityPrefix::Plan => "quality/plans",
            EntityPrefix::Chart => "quality/charts",
            EntityPrefix::Ncr => "quality/ncrs",
            EntityPrefix::Capa => "quality/capas",
        }
    }

    /// Directory holding switching-rule regime records
    pub fn regime_dir(&self) -> PathBuf {
        self.root.join("quality/regimes")
    }

    /// Iterate all record files of a given prefix type
    pub fn iter_entity_files(&self, prefix: EntityPrefix) -> impl Iterator<Item = PathBuf> {
        let dir = self.root.join(Self::entity_directory(prefix));
        walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().to_string_lossy().ends_with(".mqt.yaml"))
            .map(|e| e.path().to_path_buf())
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not an MQT project (searched from {searched_from:?}). Run 'mqt init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("MQT project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
