//! The virtual file map shared by every engine a factory creates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use path_clean::PathClean;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::mpsc::UnboundedSender;
use weft::WatchUpdate;

struct Watcher {
    interest: Arc<Mutex<FxHashSet<PathBuf>>>,
    tx: UnboundedSender<WatchUpdate>,
}

/// An in-memory filesystem.
///
/// Files are keyed by cleaned absolute-style paths. Writing a file that
/// a watch-mode engine's last compilation visited notifies that engine.
pub struct MemoryFs {
    files: RwLock<FxHashMap<PathBuf, String>>,
    watchers: Mutex<Vec<Watcher>>,
}

impl MemoryFs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { files: RwLock::new(FxHashMap::default()), watchers: Mutex::new(Vec::new()) })
    }

    /// Create or replace a file, notifying interested watch-mode
    /// engines.
    pub fn write(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        let path = path.into().clean();
        self.files.write().insert(path.clone(), content.into());

        let mut watchers = self.watchers.lock();
        watchers.retain(|watcher| {
            if watcher.tx.is_closed() {
                return false;
            }
            if watcher.interest.lock().contains(&path) {
                let _ = watcher.tx.send(WatchUpdate { paths: vec![path.clone()] });
            }
            true
        });
    }

    pub fn read(&self, path: &Path) -> Option<String> {
        self.files.read().get(&path.to_path_buf().clean()).cloned()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.read().contains_key(&path.to_path_buf().clean())
    }

    pub(crate) fn register_watcher(
        &self,
        interest: Arc<Mutex<FxHashSet<PathBuf>>>,
        tx: UnboundedSender<WatchUpdate>,
    ) {
        self.watchers.lock().push(Watcher { interest, tx });
    }

    /// Resolve a module specifier the way the engine does: relative
    /// specifiers against the importing directory, bare specifiers
    /// through the search paths; both with an optional `.js` suffix.
    pub(crate) fn resolve(
        &self,
        from_dir: &Path,
        spec: &str,
        search_paths: &[PathBuf],
    ) -> Option<PathBuf> {
        let spec_path = Path::new(spec);
        let candidates: Vec<PathBuf> = if spec_path.is_absolute() {
            vec![spec_path.to_path_buf()]
        } else if spec.starts_with("./") || spec.starts_with("../") {
            vec![from_dir.join(spec_path)]
        } else {
            search_paths.iter().map(|base| base.join(spec_path)).collect()
        };

        for candidate in candidates {
            let candidate = candidate.clean();
            if self.contains(&candidate) {
                return Some(candidate);
            }
            let with_suffix = PathBuf::from(format!("{}.js", candidate.display()));
            if self.contains(&with_suffix) {
                return Some(with_suffix);
            }
        }
        None
    }
}
