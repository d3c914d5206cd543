//! The collaborator the evaluator calls through for `@file` and `@package`
//! directives. The core only depends on the trait; everything below it is
//! ambient plumbing so `parse_file` has something to hand the evaluator by
//! default.

use std::collections::HashMap;
use std::path::{Path as FsPath, PathBuf};

use crate::error::{CoilError, Result, StructError};

/// Supplies source text for `@file` and `@package` directives. Injected so
/// the evaluator stays free of filesystem/packaging concerns and so tests
/// can sandbox resolution.
pub trait IncludeResolver {
    /// Returns the source text named by `@file: "path"`.
    fn resolve_file(&self, path: &str) -> Result<String>;
    /// Returns the source text named by `@package: "package:resource"`.
    fn resolve_package(&self, package: &str, resource: &str) -> Result<String>;
}

/// Rejects every include. Used as the default resolver for `parse()`, which
/// has no filesystem context to resolve `@file` against.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullIncludeResolver;

impl IncludeResolver for NullIncludeResolver {
    fn resolve_file(&self, path: &str) -> Result<String> {
        Err(StructError::new(format!(
            "cannot resolve '@file: \"{}\"': no include resolver is configured",
            path
        ))
        .into())
    }

    fn resolve_package(&self, package: &str, resource: &str) -> Result<String> {
        Err(StructError::new(format!(
            "cannot resolve '@package: \"{}:{}\"': no include resolver is configured",
            package, resource
        ))
        .into())
    }
}

/// Resolves `@file` paths relative to a base directory using `std::fs`.
/// `@package` resolution is opt-in: it fails unless a search directory was
/// registered for the requested package via [`FsIncludeResolver::with_package_dir`].
#[derive(Debug, Clone)]
pub struct FsIncludeResolver {
    base_dir: PathBuf,
    package_dirs: HashMap<String, PathBuf>,
}

impl FsIncludeResolver {
    /// `@file` paths are resolved relative to `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        FsIncludeResolver { base_dir: base_dir.into(), package_dirs: HashMap::new() }
    }

    /// Registers `dir` as the search path for `@package: "package:..."`.
    pub fn with_package_dir(mut self, package: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.package_dirs.insert(package.into(), dir.into());
        self
    }

    pub fn base_dir(&self) -> &FsPath {
        &self.base_dir
    }
}

impl IncludeResolver for FsIncludeResolver {
    fn resolve_file(&self, path: &str) -> Result<String> {
        let full = self.base_dir.join(path);
        std::fs::read_to_string(full).map_err(CoilError::Io)
    }

    fn resolve_package(&self, package: &str, resource: &str) -> Result<String> {
        let dir = self.package_dirs.get(package).ok_or_else(|| {
            StructError::new(format!("no search directory registered for package '{}'", package))
        })?;
        let full = dir.join(resource);
        std::fs::read_to_string(full).map_err(CoilError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_resolver_rejects_everything() {
        let r = NullIncludeResolver;
        assert!(r.resolve_file("x").is_err());
        assert!(r.resolve_package("pkg", "x").is_err());
    }

    #[test]
    fn test_fs_resolver_reads_relative_to_base() {
        let dir = std::env::temp_dir().join(format!("coil-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("inc.coil"), "x: 1").unwrap();
        let r = FsIncludeResolver::new(&dir);
        assert_eq!(r.resolve_file("inc.coil").unwrap(), "x: 1");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_fs_resolver_rejects_unregistered_package() {
        let r = FsIncludeResolver::new(".");
        assert!(r.resolve_package("nosuch", "x").is_err());
    }
}
