//! An isolated loading context for documentation runs.
//!
//! A [`MetadataUniverse`] owns the modules it loads: they stay resident as long as the universe
//! does and become collectable once it is disposed. Modules are only decoded, never executed.
//!
//! The universe knows a *resolution set*: explicitly listed module paths plus every file with a
//! probe extension found by scanning the probe directories recursively. It registers itself as an
//! [`AssemblyResolver`] with its provider, so a type reference into an assembly of the resolution
//! set loads that assembly on demand.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotdoc::metadata::universe::MetadataUniverse;
//!
//! let universe = MetadataUniverse::builder()
//!     .path("bin/App.dll")
//!     .probe_directory("bin/deps")
//!     .build()?;
//!
//! let app = universe.load_from_path("bin/App.dll")?;
//! println!("{} defines {} types", app.assembly_name(), app.type_count());
//!
//! universe.dispose();
//! # Ok::<(), dotdoc::Error>(())
//! ```

use std::{
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
    sync::{Arc, RwLock, Weak},
};

use crate::{
    metadata::{
        module::{Module, ModuleRc},
        provider::{AssemblyResolver, MetadataProvider},
    },
    Error, Result,
};

/// Extensions probed by default
pub const DEFAULT_PROBE_EXTENSIONS: [&str; 3] = ["dll", "exe", "winmd"];

/// Configures a [`MetadataUniverse`].
#[derive(Debug, Clone)]
pub struct MetadataUniverseBuilder {
    paths: Vec<PathBuf>,
    probe_directories: Vec<PathBuf>,
    extensions: Vec<String>,
    provider: Option<MetadataProvider>,
}

impl Default for MetadataUniverseBuilder {
    fn default() -> Self {
        MetadataUniverseBuilder {
            paths: Vec::new(),
            probe_directories: Vec::new(),
            extensions: DEFAULT_PROBE_EXTENSIONS
                .iter()
                .map(|extension| (*extension).to_string())
                .collect(),
            provider: None,
        }
    }
}

impl MetadataUniverseBuilder {
    /// Adds a module file to the resolution set
    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Adds module files to the resolution set
    #[must_use]
    pub fn paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Adds a directory whose module files, subdirectories included, join the resolution set
    #[must_use]
    pub fn probe_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.probe_directories.push(directory.into());
        self
    }

    /// Replaces the probed file extensions (compared case-insensitively, without the dot)
    #[must_use]
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|extension| extension.into().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Registers loaded modules with `provider` instead of [`MetadataProvider::global`]
    #[must_use]
    pub fn provider(mut self, provider: MetadataProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Scans the probe directories and creates the universe.
    ///
    /// Paths and directories that do not exist are skipped; duplicates are removed.
    ///
    /// # Errors
    /// Returns [`Error::FileError`] if the working directory can not be determined.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(paths = self.paths.len(), probes = self.probe_directories.len())
    )]
    pub fn build(self) -> Result<MetadataUniverse> {
        let mut candidates = Vec::new();
        for path in &self.paths {
            let path = absolute(path)?;
            if path.is_file() {
                candidates.push(normalize(&path));
            }
        }
        for directory in &self.probe_directories {
            let directory = absolute(directory)?;
            probe(&directory, &self.extensions, &mut candidates);
        }

        let mut seen = std::collections::HashSet::new();
        candidates.retain(|path| seen.insert(path.clone()));
        tracing::debug!(candidates = candidates.len(), "resolution set ready");

        let provider = self
            .provider
            .unwrap_or_else(|| MetadataProvider::global().clone());
        let inner = Arc::new(UniverseInner {
            provider: provider.clone(),
            state: RwLock::new(UniverseState {
                disposed: false,
                candidates,
                loaded: HashMap::new(),
            }),
        });
        let resolver: Weak<dyn AssemblyResolver> =
            Arc::downgrade(&inner) as Weak<dyn AssemblyResolver>;
        provider.add_resolver(resolver);

        Ok(MetadataUniverse { inner })
    }
}

/// Resolves `path` against the working directory
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// The key a module file is tracked under; symlinks and `..` collapse where the file exists
fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn probe(directory: &Path, extensions: &[String], found: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(directory) else {
        return;
    };

    let mut paths: Vec<PathBuf> = entries.flatten().map(|entry| entry.path()).collect();
    paths.sort();
    for path in paths {
        if path.is_dir() {
            probe(&path, extensions, found);
        } else if path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| {
                extensions
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(extension))
            })
        {
            found.push(normalize(&path));
        }
    }
}

struct UniverseState {
    disposed: bool,
    candidates: Vec<PathBuf>,
    loaded: HashMap<PathBuf, ModuleRc>,
}

struct UniverseInner {
    provider: MetadataProvider,
    state: RwLock<UniverseState>,
}

impl UniverseInner {
    fn check_live(&self) -> Result<()> {
        if read_lock!(self.state).disposed {
            return Err(Error::Disposed);
        }
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<ModuleRc> {
        self.check_live()?;
        let path = absolute(path)?;
        if !path.is_file() {
            return Err(Error::NotFound(path));
        }
        let key = normalize(&path);

        if let Some(module) = self.loaded(&key)? {
            return Ok(module);
        }

        let module = Module::from_path(&key)?;
        let mut state = write_lock!(self.state);
        if state.disposed {
            return Err(Error::Disposed);
        }
        // a concurrent load of the same file may have won
        let module = state.loaded.entry(key).or_insert(module).clone();
        drop(state);

        self.provider.register_module(&module);
        Ok(module)
    }

    fn loaded(&self, key: &Path) -> Result<Option<ModuleRc>> {
        let state = read_lock!(self.state);
        if state.disposed {
            return Err(Error::Disposed);
        }
        Ok(state.loaded.get(key).cloned())
    }

    fn load_assembly(&self, assembly: &str) -> Result<Option<ModuleRc>> {
        let candidate = {
            let state = read_lock!(self.state);
            if state.disposed {
                return Err(Error::Disposed);
            }
            if let Some(module) = state
                .loaded
                .values()
                .find(|module| module.assembly_name().eq_ignore_ascii_case(assembly))
            {
                return Ok(Some(module.clone()));
            }
            state
                .candidates
                .iter()
                .find(|path| {
                    path.file_stem()
                        .and_then(|stem| stem.to_str())
                        .is_some_and(|stem| stem.eq_ignore_ascii_case(assembly))
                })
                .cloned()
        };
        candidate.map(|path| self.load(&path)).transpose()
    }
}

impl AssemblyResolver for UniverseInner {
    fn resolve_assembly(&self, assembly: &str) -> Option<ModuleRc> {
        match self.load_assembly(assembly) {
            Ok(module) => module,
            Err(Error::Disposed) => None,
            Err(error) => {
                tracing::warn!(%error, assembly, "failed to load referenced assembly");
                None
            }
        }
    }
}

/// An isolated, non-executing loading context.
///
/// Cloning a universe yields another handle to the same context.
#[derive(Clone)]
pub struct MetadataUniverse {
    inner: Arc<UniverseInner>,
}

impl MetadataUniverse {
    /// Starts configuring a universe
    #[must_use]
    pub fn builder() -> MetadataUniverseBuilder {
        MetadataUniverseBuilder::default()
    }

    /// A universe over `paths`, registering into the global provider.
    ///
    /// # Errors
    /// See [`MetadataUniverseBuilder::build`].
    pub fn from_paths<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::builder().paths(paths).build()
    }

    /// The provider loaded modules are registered with
    #[must_use]
    pub fn provider(&self) -> &MetadataProvider {
        &self.inner.provider
    }

    /// Loads the module at `path`, or returns it if it is already loaded. Relative paths are
    /// resolved against the working directory.
    ///
    /// # Errors
    /// Returns [`Error::Disposed`] after [`MetadataUniverse::dispose`],
    /// [`Error::InvalidArgument`] for an empty path, [`Error::NotFound`] if there is no file at
    /// `path`, and the decoding errors of [`Module::from_path`].
    pub fn load_from_path(&self, path: impl AsRef<Path>) -> Result<ModuleRc> {
        self.inner.check_live()?;
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidArgument("empty module path".to_string()));
        }
        self.inner.load(path)
    }

    /// Loads the module of `assembly` from the resolution set, matching file stems
    /// case-insensitively. `Ok(None)` if the resolution set has no such file.
    ///
    /// # Errors
    /// Returns [`Error::Disposed`] after [`MetadataUniverse::dispose`] and the errors of
    /// [`MetadataUniverse::load_from_path`].
    pub fn load_from_assembly_name(&self, assembly: &str) -> Result<Option<ModuleRc>> {
        self.inner.check_live()?;
        if assembly.is_empty() {
            return Err(Error::InvalidArgument("empty assembly name".to_string()));
        }
        self.inner.load_assembly(assembly)
    }

    /// Loads every module of the resolution set. Files that fail to decode are logged and
    /// skipped.
    ///
    /// # Errors
    /// Returns [`Error::Disposed`] after [`MetadataUniverse::dispose`].
    pub fn load_all(&self) -> Result<Vec<ModuleRc>> {
        let mut modules = Vec::new();
        for path in self.candidates()? {
            match self.inner.load(&path) {
                Ok(module) => modules.push(module),
                Err(Error::Disposed) => return Err(Error::Disposed),
                Err(error) => {
                    tracing::warn!(%error, path = %path.display(), "skipping module");
                }
            }
        }
        Ok(modules)
    }

    /// The files of the resolution set
    ///
    /// # Errors
    /// Returns [`Error::Disposed`] after [`MetadataUniverse::dispose`].
    pub fn candidates(&self) -> Result<Vec<PathBuf>> {
        let state = read_lock!(self.inner.state);
        if state.disposed {
            return Err(Error::Disposed);
        }
        Ok(state.candidates.clone())
    }

    /// Modules loaded so far
    ///
    /// # Errors
    /// Returns [`Error::Disposed`] after [`MetadataUniverse::dispose`].
    pub fn modules(&self) -> Result<Vec<ModuleRc>> {
        let state = read_lock!(self.inner.state);
        if state.disposed {
            return Err(Error::Disposed);
        }
        Ok(state.loaded.values().cloned().collect())
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        read_lock!(self.inner.state).disposed
    }

    /// Tears the universe down: releases every loaded module and evicts their cache entries.
    /// Disposing twice has no further effect.
    pub fn dispose(&self) {
        let released = {
            let mut state = write_lock!(self.inner.state);
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.candidates.clear();
            std::mem::take(&mut state.loaded)
        };
        let count = released.len();
        drop(released);
        let resolver: Weak<dyn AssemblyResolver> =
            Arc::downgrade(&self.inner) as Weak<dyn AssemblyResolver>;
        self.inner.provider.remove_resolver(&resolver);
        let evicted = self.inner.provider.sweep();
        tracing::debug!(modules = count, evicted, "universe disposed");
    }
}

impl fmt::Debug for MetadataUniverse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = read_lock!(self.inner.state);
        f.debug_struct("MetadataUniverse")
            .field("disposed", &state.disposed)
            .field("candidates", &state.candidates.len())
            .field("loaded", &state.loaded.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::builder::{ModuleBuilder, TypeBuilder};
    use tempfile::TempDir;

    fn write_module(directory: &Path, file: &str, assembly: &str) -> PathBuf {
        let mut module = ModuleBuilder::new(assembly);
        TypeBuilder::class(assembly, "Widget").build(&mut module).unwrap();
        let path = directory.join(file);
        module.write_to(&path).unwrap();
        path
    }

    #[test]
    fn resolution_set() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("deps").join("more");
        fs::create_dir_all(&nested).unwrap();
        let app = write_module(dir.path(), "App.dll", "App");
        write_module(&nested, "Lib.DLL", "Lib");
        write_module(&nested, "notes.txt", "Notes");

        let universe = MetadataUniverse::builder()
            .provider(MetadataProvider::new())
            .path(&app)
            .path(&app)
            .path(dir.path().join("missing.dll"))
            .probe_directory(dir.path())
            .probe_directory(dir.path().join("absent"))
            .build()
            .unwrap();

        let names: Vec<String> = universe
            .candidates()
            .unwrap()
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["App.dll", "Lib.DLL"]);
    }

    #[test]
    fn load_from_path() {
        let dir = TempDir::new().unwrap();
        let app = write_module(dir.path(), "App.dll", "App");
        let provider = MetadataProvider::new();
        let universe = MetadataUniverse::builder()
            .provider(provider.clone())
            .build()
            .unwrap();

        let first = universe.load_from_path(&app).unwrap();
        let second = universe.load_from_path(&app).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(universe.modules().unwrap().len(), 1);
        assert!(provider.find_type_by_full_name("App.Widget").is_some());

        let missing = dir.path().join("missing.dll");
        assert!(matches!(
            universe.load_from_path(&missing),
            Err(Error::NotFound(path)) if path == missing
        ));
        assert!(matches!(
            universe.load_from_path(""),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn resolves_assemblies_by_stem() {
        let dir = TempDir::new().unwrap();
        write_module(dir.path(), "lib.dll", "Lib");
        let provider = MetadataProvider::new();
        let universe = MetadataUniverse::builder()
            .provider(provider.clone())
            .probe_directory(dir.path())
            .build()
            .unwrap();

        assert!(universe.modules().unwrap().is_empty());
        let module = universe.load_from_assembly_name("LIB").unwrap().unwrap();
        assert_eq!(module.assembly_name(), "Lib");
        assert!(universe.load_from_assembly_name("Other").unwrap().is_none());
        assert!(matches!(
            universe.load_from_assembly_name(""),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn dispose() {
        let dir = TempDir::new().unwrap();
        let app = write_module(dir.path(), "App.dll", "App");
        let provider = MetadataProvider::new();
        let universe = MetadataUniverse::builder()
            .provider(provider.clone())
            .path(&app)
            .build()
            .unwrap();
        assert_eq!(universe.load_all().unwrap().len(), 1);
        let widget = Arc::downgrade(&provider.find_type_by_full_name("App.Widget").unwrap());
        assert_eq!(provider.inner().resolvers().len(), 1);

        universe.dispose();
        // the handle is still alive, but the provider no longer consults it
        assert!(provider.inner().resolvers().is_empty());
        universe.dispose();
        assert!(universe.is_disposed());
        assert!(matches!(universe.load_from_path(&app), Err(Error::Disposed)));
        // teardown wins over argument and existence checks
        assert!(matches!(
            universe.load_from_path(dir.path().join("missing.dll")),
            Err(Error::Disposed)
        ));
        assert!(matches!(universe.load_from_path(""), Err(Error::Disposed)));
        assert!(matches!(universe.load_from_assembly_name(""), Err(Error::Disposed)));
        assert!(matches!(universe.modules(), Err(Error::Disposed)));
        assert!(matches!(universe.candidates(), Err(Error::Disposed)));
        assert!(matches!(universe.load_all(), Err(Error::Disposed)));

        // the cache did not keep the module alive
        assert!(provider.find_type_by_full_name("App.Widget").is_none());
        assert!(widget.upgrade().is_none());
    }
}
