//! Projects on disk, keyed by unique name.
//!
//! One `<name>.json` project file per project inside the library directory.

use crate::project::Project;
use crate::serialization::ProjectFile;
use std::path::{Path, PathBuf};
use tintcut_core::{Result, TintcutError};
use tracing::info;

const EXTENSION: &str = "json";

/// A directory of saved projects.
#[derive(Debug, Clone)]
pub struct ProjectLibrary {
    dir: PathBuf,
}

impl ProjectLibrary {
    /// Open (creating if needed) the library at `dir`.
    pub fn open_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        let trimmed = name.trim();
        if trimmed.is_empty()
            || trimmed.starts_with('.')
            || trimmed.contains(&['/', '\\'][..])
            || trimmed != name
        {
            return Err(TintcutError::InvalidParameter(format!(
                "invalid project name {:?}",
                name
            )));
        }
        Ok(self.dir.join(format!("{}.{}", name, EXTENSION)))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Saved project names, sorted.
    pub fn names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Create and save an empty project. The name must be free.
    pub fn create(&self, name: &str) -> Result<Project> {
        if self.exists(name) {
            return Err(TintcutError::InvalidParameter(format!(
                "a project named {:?} already exists",
                name
            )));
        }
        let project = Project::new(name);
        self.save(&project)?;
        info!(project = name, "Project created");
        Ok(project)
    }

    pub fn open(&self, name: &str) -> Result<Project> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(TintcutError::NotFound(format!("project {:?}", name)));
        }
        let mut project = ProjectFile::read_from(&path)?.project;
        // The file name is authoritative.
        project.name = name.to_string();
        info!(project = name, "Project opened");
        Ok(project)
    }

    /// Write the snapshot back under its name.
    pub fn save(&self, project: &Project) -> Result<()> {
        let path = self.path_for(&project.name)?;
        ProjectFile::new(project.clone()).write_to(&path)
    }

    /// Rename a saved project. The new name must be free.
    pub fn rename(&self, from: &str, to: &str) -> Result<Project> {
        if from == to {
            return self.open(from);
        }
        if self.exists(to) {
            return Err(TintcutError::InvalidParameter(format!(
                "a project named {:?} already exists",
                to
            )));
        }
        let mut project = self.open(from)?;
        project.name = to.to_string();
        self.save(&project)?;
        std::fs::remove_file(self.path_for(from)?)?;
        info!(from, to, "Project renamed");
        Ok(project)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(project = name, "Project deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TintcutError::NotFound(format!("project {:?}", name)))
            }
            Err(e) => Err(e.into()),
        }
    }
}
