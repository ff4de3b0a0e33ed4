//! File watching for `serve`.
//!
//! Each watch binding runs as its own task:
//!
//! ```text
//! Idle -> Watching -> Debouncing -> Triggering -> Watching
//! ```
//!
//! A matching change moves a binding to Debouncing. Further matches inside
//! the window restart it; once it elapses the bound tasks run once.

use std::collections::BTreeSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use globset::GlobSet;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use sluice_config::{build_globset, literal_prefix, normalize, ConfigError, WatchBinding};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Runs a binding's task list. Errors are the callback's to report.
pub type TriggerFn =
    Arc<dyn Fn(Vec<String>) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Errors that can occur while setting up file watching.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Cannot watch {path}: {message}")]
    Register { path: PathBuf, message: String },

    #[error("File watcher failed: {0}")]
    Backend(String),
}

/// Lifecycle of a single binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingState {
    Idle,
    Watching,
    Debouncing,
    Triggering,
}

/// A binding with its globs compiled and watch roots resolved.
struct Route {
    index: usize,
    globs: GlobSet,
    roots: Vec<PathBuf>,
    tx: mpsc::UnboundedSender<String>,
}

/// Watches the project tree and triggers task chains for matching changes.
pub struct Watcher {
    root: PathBuf,
    bindings: Vec<WatchBinding>,
    debounce: Duration,
    trigger: TriggerFn,
}

impl Watcher {
    /// `root` is the directory binding globs are relative to.
    pub fn new(
        root: impl Into<PathBuf>,
        bindings: Vec<WatchBinding>,
        debounce: Duration,
        trigger: TriggerFn,
    ) -> Self {
        Self {
            root: root.into(),
            bindings,
            debounce,
            trigger,
        }
    }

    /// Register watches and start one worker per binding.
    ///
    /// Bindings whose directories cannot be watched are logged and dropped;
    /// the rest keep running.
    pub fn start(self) -> Result<WatcherHandle, WatchError> {
        let root = self.root.canonicalize().unwrap_or_else(|_| normalize(&self.root));

        let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = event_tx.send(res);
        })
        .map_err(|e| WatchError::Backend(e.to_string()))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut routes = Vec::new();
        let mut workers = Vec::new();

        for (index, binding) in self.bindings.into_iter().enumerate() {
            let prepared = build_globset(&binding.globs)
                .map_err(WatchError::from)
                .and_then(|globs| Ok((globs, watch_roots(&root, &binding.globs)?)));

            let (globs, roots) = match prepared {
                Ok(prepared) => prepared,
                Err(e) => {
                    tracing::warn!("Watch binding #{} dropped: {}", index, e);
                    continue;
                }
            };

            let (tx, rx) = mpsc::unbounded_channel();
            workers.push(tokio::spawn(run_binding(
                index,
                binding.tasks,
                self.debounce,
                Arc::clone(&self.trigger),
                rx,
                shutdown_rx.clone(),
            )));
            routes.push(Route {
                index,
                globs,
                roots,
                tx,
            });
        }

        let all_roots: BTreeSet<PathBuf> = routes
            .iter()
            .flat_map(|r| r.roots.iter().cloned())
            .collect();
        for dir in collapse_roots(all_roots) {
            if let Err(e) = watcher.watch(&dir, RecursiveMode::Recursive) {
                let err = WatchError::Register {
                    path: dir.clone(),
                    message: e.to_string(),
                };
                drop_routes_under(&mut routes, &[dir], &err);
                continue;
            }
            tracing::debug!("Watching {}", dir.display());
        }

        let active: Vec<usize> = routes.iter().map(|r| r.index).collect();
        tracing::info!("Watching {} bindings", active.len());

        let dispatcher = tokio::spawn(dispatch(root, routes, event_rx));

        Ok(WatcherHandle {
            watcher: Some(watcher),
            shutdown: shutdown_tx,
            dispatcher,
            workers,
            active,
        })
    }
}

/// Keeps the watches alive; [`shutdown`](Self::shutdown) stops them.
pub struct WatcherHandle {
    watcher: Option<RecommendedWatcher>,
    shutdown: watch::Sender<bool>,
    dispatcher: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
    active: Vec<usize>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("active", &self.active)
            .finish()
    }
}

impl WatcherHandle {
    /// Indexes of the bindings that are being watched.
    pub fn active_bindings(&self) -> &[usize] {
        &self.active
    }

    /// Stop watching. Task chains already running are allowed to finish.
    pub async fn shutdown(mut self) {
        self.watcher.take();
        let _ = self.shutdown.send(true);
        let _ = (&mut self.dispatcher).await;
        for worker in self.workers.drain(..) {
            let _ = worker.await;
        }
        tracing::debug!("File watcher stopped");
    }
}

/// Route notify events to the bindings whose globs match.
async fn dispatch(
    root: PathBuf,
    mut routes: Vec<Route>,
    mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
) {
    while let Some(res) = events.recv().await {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                let err = WatchError::Backend(e.to_string());
                if e.paths.is_empty() {
                    tracing::warn!("{}", err);
                } else {
                    drop_routes_under(&mut routes, &e.paths, &err);
                }
                continue;
            }
        };

        if !is_change(&event.kind) {
            continue;
        }

        for path in &event.paths {
            let Some(rel) = relative_str(&root, path) else {
                continue;
            };
            for route in &routes {
                if route.globs.is_match(&rel) {
                    tracing::debug!("{} matches binding #{}", rel, route.index);
                    let _ = route.tx.send(rel.clone());
                }
            }
        }
    }
}

/// One binding's state machine.
async fn run_binding(
    index: usize,
    tasks: Vec<String>,
    debounce: Duration,
    trigger: TriggerFn,
    mut changes: mpsc::UnboundedReceiver<String>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut state = BindingState::Idle;
    let mut transition = |next: BindingState| {
        tracing::trace!("binding #{}: {:?} -> {:?}", index, state, next);
        state = next;
    };

    transition(BindingState::Watching);
    loop {
        let first = tokio::select! {
            _ = shutdown.changed() => break,
            change = changes.recv() => match change {
                Some(path) => path,
                None => break,
            },
        };

        transition(BindingState::Debouncing);
        let mut changed = vec![first];
        loop {
            tokio::select! {
                _ = shutdown.changed() => return,
                change = changes.recv() => match change {
                    Some(path) => changed.push(path),
                    None => return,
                },
                _ = tokio::time::sleep(debounce) => break,
            }
        }

        changed.sort();
        changed.dedup();
        tracing::info!(
            "{} changed, running {}",
            summarize(&changed),
            tasks.join(", ")
        );

        transition(BindingState::Triggering);
        trigger(tasks.clone()).await;
        transition(BindingState::Watching);
    }
}

fn summarize(paths: &[String]) -> String {
    match paths {
        [one] => one.clone(),
        [first, rest @ ..] => format!("{} (+{} more)", first, rest.len()),
        [] => String::new(),
    }
}

/// Directories that must be watched for a binding's globs.
///
/// A glob's literal prefix is watched recursively; a fully literal glob
/// watches its parent so replaced files are still seen.
fn watch_roots(root: &Path, globs: &[String]) -> Result<Vec<PathBuf>, WatchError> {
    let mut dirs = BTreeSet::new();
    for glob in globs {
        let prefix = root.join(literal_prefix(glob));
        let literal = !glob.contains(['*', '?', '[', '{']);
        let dir = if literal {
            prefix.parent().map(Path::to_path_buf).unwrap_or(prefix)
        } else {
            prefix
        };

        if !dir.is_dir() {
            return Err(WatchError::Register {
                path: dir,
                message: "directory not found".to_string(),
            });
        }
        dirs.insert(dir);
    }
    Ok(collapse_roots(dirs))
}

/// Drop directories already covered by a recursive watch on an ancestor.
fn collapse_roots(dirs: BTreeSet<PathBuf>) -> Vec<PathBuf> {
    let mut collapsed: Vec<PathBuf> = Vec::new();
    for dir in dirs {
        if collapsed.iter().any(|kept| dir.starts_with(kept)) {
            continue;
        }
        collapsed.push(dir);
    }
    collapsed
}

fn drop_routes_under(routes: &mut Vec<Route>, failed: &[PathBuf], err: &WatchError) {
    routes.retain(|route| {
        let affected = route
            .roots
            .iter()
            .any(|r| failed.iter().any(|f| r.starts_with(f) || f.starts_with(r)));
        if affected {
            tracing::warn!("Watch binding #{} dropped: {}", route.index, err);
        }
        !affected
    });
}

fn is_change(kind: &EventKind) -> bool {
    use notify::event::{AccessKind, AccessMode};

    match kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => true,
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
        _ => false,
    }
}

/// Convert a path into a string relative to `root`, with forward slashes.
fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn binding(globs: &[&str], tasks: &[&str]) -> WatchBinding {
        WatchBinding {
            globs: globs.iter().map(|s| s.to_string()).collect(),
            tasks: tasks.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Trigger that records every task list it is asked to run.
    fn recorder() -> (TriggerFn, Arc<Mutex<Vec<Vec<String>>>>) {
        let runs = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&runs);
        let trigger: TriggerFn = Arc::new(move |tasks: Vec<String>| -> Pin<Box<dyn Future<Output = ()> + Send>> {
            let sink = Arc::clone(&sink);
            Box::pin(async move {
                sink.lock().unwrap().push(tasks);
            })
        });
        (trigger, runs)
    }

    fn runs_of(runs: &Arc<Mutex<Vec<Vec<String>>>>, task: &str) -> usize {
        runs.lock()
            .unwrap()
            .iter()
            .filter(|r| r.first().map(String::as_str) == Some(task))
            .count()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    #[test]
    fn resolves_and_collapses_roots() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/scss/spaces")).unwrap();
        fs::create_dir_all(temp.path().join("src/html")).unwrap();

        let roots = watch_roots(
            temp.path(),
            &[
                "src/scss/spaces/**/*.scss".to_string(),
                "src/scss/spaces.scss".to_string(),
            ],
        )
        .unwrap();
        assert_eq!(roots, vec![temp.path().join("src/scss")]);

        let roots = watch_roots(
            temp.path(),
            &["src/html/**/*.html".to_string(), "src/*.html".to_string()],
        )
        .unwrap();
        assert_eq!(roots, vec![temp.path().join("src")]);
    }

    #[test]
    fn missing_directory_is_a_watch_error() {
        let temp = TempDir::new().unwrap();
        let err = watch_roots(temp.path(), &["node_modules/**/*.*".to_string()]).unwrap_err();

        assert!(matches!(err, WatchError::Register { .. }));
    }

    #[tokio::test]
    async fn coalesces_rapid_changes_into_one_run() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("src/scss");
        fs::create_dir_all(&dir).unwrap();

        let (trigger, runs) = recorder();
        let handle = Watcher::new(
            temp.path(),
            vec![binding(&["src/scss/**/*.scss"], &["scss"])],
            Duration::from_millis(300),
            trigger,
        )
        .start()
        .unwrap();
        settle().await;

        for i in 0..4 {
            fs::write(dir.join("spaces.scss"), format!("a {{ b: {i} }}")).unwrap();
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        tokio::time::sleep(Duration::from_millis(1000)).await;

        assert_eq!(runs_of(&runs, "scss"), 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn bindings_trigger_independently() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/scss")).unwrap();
        fs::create_dir_all(temp.path().join("src/assets")).unwrap();

        let (trigger, runs) = recorder();
        let handle = Watcher::new(
            temp.path(),
            vec![
                binding(&["src/scss/**/*.scss"], &["scss"]),
                binding(&["src/assets/**/*.*"], &["assets"]),
            ],
            Duration::from_millis(150),
            trigger,
        )
        .start()
        .unwrap();
        settle().await;

        fs::write(temp.path().join("src/scss/a.scss"), "a {}").unwrap();
        fs::write(temp.path().join("src/assets/logo.svg"), "<svg/>").unwrap();
        tokio::time::sleep(Duration::from_millis(800)).await;

        assert_eq!(runs_of(&runs, "scss"), 1);
        assert_eq!(runs_of(&runs, "assets"), 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn drops_unwatchable_bindings_and_keeps_the_rest() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/assets")).unwrap();

        let (trigger, _runs) = recorder();
        let handle = Watcher::new(
            temp.path(),
            vec![
                binding(&["node_modules/**/*.*"], &["vendor"]),
                binding(&["src/assets/**/*.*"], &["assets"]),
            ],
            Duration::from_millis(100),
            trigger,
        )
        .start()
        .unwrap();

        assert_eq!(handle.active_bindings(), &[1]);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn ignores_non_matching_changes_and_stops_on_shutdown() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("src/scss");
        fs::create_dir_all(&dir).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let trigger: TriggerFn = Arc::new(move |_tasks: Vec<String>| -> Pin<Box<dyn Future<Output = ()> + Send>> {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });

        let handle = Watcher::new(
            temp.path(),
            vec![binding(&["src/scss/**/*.scss"], &["scss"])],
            Duration::from_millis(100),
            trigger,
        )
        .start()
        .unwrap();
        settle().await;

        fs::write(dir.join("notes.txt"), "not a stylesheet").unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        handle.shutdown().await;
        fs::write(dir.join("late.scss"), "a {}").unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
