//! Working-directory sink for files produced by a run.

use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

/// Whole-file writer scoped to one run's working directory.
pub trait Sandbox {
    fn write_file(&self, relative_path: &str, contents: &str) -> io::Result<()>;

    /// Human-readable location of `relative_path`, for log lines.
    fn locate(&self, relative_path: &str) -> String {
        relative_path.to_string()
    }
}

/// Sandbox rooted at a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct DirSandbox {
    root: PathBuf,
}

impl DirSandbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative_path: &str) -> io::Result<PathBuf> {
        let rel = Path::new(relative_path);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || relative_path.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path escapes the sandbox: {relative_path}"),
            ));
        }
        Ok(self.root.join(rel))
    }
}

impl Sandbox for DirSandbox {
    fn write_file(&self, relative_path: &str, contents: &str) -> io::Result<()> {
        let path = self.resolve(relative_path)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents)?;
        debug!(path = %path.display(), bytes = contents.len(), "wrote sandbox file");
        Ok(())
    }

    fn locate(&self, relative_path: &str) -> String {
        self.root.join(relative_path).display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_whole_file_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = DirSandbox::new(dir.path());
        sandbox.write_file("cluster.props", "a=1\n").unwrap();
        sandbox.write_file("cluster.props", "b=2\n").unwrap();
        let written = std::fs::read_to_string(dir.path().join("cluster.props")).unwrap();
        assert_eq!(written, "b=2\n");
    }

    #[test]
    fn rejects_paths_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = DirSandbox::new(dir.path());
        let err = sandbox.write_file("../escape.props", "x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(sandbox.write_file("/etc/passwd", "x").is_err());
    }
}
