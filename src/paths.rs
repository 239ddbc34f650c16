use std::env;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// Environment variable that pins the toolkit root and skips discovery.
pub const TOOLKIT_ROOT_ENV: &str = "AITK_TOOLKIT_ROOT";

const LAUNCHER_FILE: &str = "run.py";
const PACKAGE_DIR: &str = "toolkit";

const DATASETS_DIR: &str = "datasets";
const TRAINING_DIR: &str = "output";
const DATA_DIR: &str = "data";
const SETTINGS_FILE: &str = "aitk_settings.json";

static TOOLKIT_ROOT: OnceLock<PathBuf> = OnceLock::new();

/// The toolkit installation root for this process. Computed on first use and
/// fixed afterwards.
pub fn toolkit_root() -> &'static Path {
    TOOLKIT_ROOT.get_or_init(|| {
        let root = discover_toolkit_root();
        tracing::info!(toolkit_root = %root.display(), "toolkit root resolved");
        root
    })
}

/// Finds the toolkit root: `AITK_TOOLKIT_ROOT` if set, else the nearest
/// ancestor of the executable's directory or the working directory that
/// carries the launcher markers, else the parent of the working directory.
pub fn discover_toolkit_root() -> PathBuf {
    let env_override = env::var(TOOLKIT_ROOT_ENV).ok();
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let cwd = env::current_dir().ok();
    discover_from(env_override.as_deref(), exe_dir.as_deref(), cwd.as_deref())
}

fn discover_from(env_override: Option<&str>, exe_dir: Option<&Path>, cwd: Option<&Path>) -> PathBuf {
    if let Some(raw) = env_override.map(str::trim).filter(|v| !v.is_empty()) {
        let raw = Path::new(raw);
        return match cwd {
            Some(cwd) if !raw.is_absolute() => normalize_lexical(&cwd.join(raw)),
            _ => normalize_lexical(raw),
        };
    }

    for start in [exe_dir, cwd].into_iter().flatten() {
        if let Some(found) = find_upwards(start) {
            return found;
        }
    }

    // usual layout: the server is launched from ui/ inside the toolkit
    match cwd {
        Some(cwd) => normalize_lexical(&cwd.join("..")),
        None => PathBuf::from(std::path::MAIN_SEPARATOR_STR),
    }
}

fn find_upwards(start: &Path) -> Option<PathBuf> {
    let mut current = normalize_lexical(start);
    loop {
        if looks_like_toolkit_root(&current) {
            return Some(current);
        }
        // parent() is None once the filesystem root is reached
        current = current.parent()?.to_path_buf();
    }
}

fn looks_like_toolkit_root(dir: &Path) -> bool {
    dir.join(LAUNCHER_FILE).exists() && dir.join(PACKAGE_DIR).is_dir()
}

/// Collapses `.` and `..` without touching the filesystem. `..` at the
/// filesystem root stays at the root.
pub fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::Prefix(_) | Component::RootDir => out.push(comp.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            Component::Normal(seg) => out.push(seg),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Joins a relative path onto the working directory. `None` when the working
/// directory itself cannot be determined.
pub fn absolutize(path: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        Some(path.to_path_buf())
    } else {
        env::current_dir().ok().map(|cwd| cwd.join(path))
    }
}

/// Directory layout anchored at a toolkit root. Owns the default locations
/// and the rules for turning raw setting values into absolute directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn discover() -> Self {
        Self::new(toolkit_root())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn default_datasets_folder(&self) -> PathBuf {
        self.root.join(DATASETS_DIR)
    }

    pub fn default_training_folder(&self) -> PathBuf {
        self.root.join(TRAINING_DIR)
    }

    pub fn default_data_root(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn default_settings_file(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    /// Empty resolves to the root itself, absolute paths are normalized,
    /// anything else is taken relative to the root.
    pub fn resolve_from_root(&self, p: &str) -> PathBuf {
        if p.is_empty() {
            return self.root.clone();
        }
        let p = Path::new(p);
        if p.is_absolute() {
            normalize_lexical(p)
        } else {
            normalize_lexical(&self.root.join(p))
        }
    }

    /// Turns a stored setting value into an absolute directory. Blank values
    /// yield `fallback` untouched. Purely lexical.
    pub fn resolve_configured_path(&self, raw: Option<&str>, fallback: &Path) -> PathBuf {
        let value = raw.map(str::trim).unwrap_or_default();
        if value.is_empty() {
            return fallback.to_path_buf();
        }
        self.resolve_from_root(value)
    }
}
