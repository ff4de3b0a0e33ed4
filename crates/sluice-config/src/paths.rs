//! Path table: where each asset category is read from and written to.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::glob::{build_globset, normalize};
use crate::model::{CategoryConfig, TargetsSection};

/// One of the parallel output trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildTarget {
    /// Ephemeral output served while watching
    Temp,
    /// Development output (beautified)
    Dev,
    /// Distribution output (minified, optimized)
    Dist,
}

impl BuildTarget {
    pub const ALL: [BuildTarget; 3] = [BuildTarget::Temp, BuildTarget::Dev, BuildTarget::Dist];

    pub fn as_str(self) -> &'static str {
        match self {
            BuildTarget::Temp => "temp",
            BuildTarget::Dev => "dev",
            BuildTarget::Dist => "dist",
        }
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temp" => Ok(BuildTarget::Temp),
            "dev" => Ok(BuildTarget::Dev),
            "dist" => Ok(BuildTarget::Dist),
            other => Err(format!(
                "unknown build target '{}' (expected temp, dev or dist)",
                other
            )),
        }
    }
}

/// Resolved locations for one asset category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    /// Category name (e.g. "css")
    pub category: String,

    /// Directory source globs are evaluated against
    pub base: PathBuf,

    /// Source globs, relative to `base`
    pub sources: Vec<String>,

    /// Sub-directory under each target root ("" for the root itself)
    pub output: String,

    temp_dir: PathBuf,
    dev_dir: PathBuf,
    dist_dir: PathBuf,
}

impl PathEntry {
    /// Destination directory for a build target.
    pub fn dest(&self, target: BuildTarget) -> &Path {
        match target {
            BuildTarget::Temp => &self.temp_dir,
            BuildTarget::Dev => &self.dev_dir,
            BuildTarget::Dist => &self.dist_dir,
        }
    }

    /// Whether this category writes directly into the target roots.
    pub fn writes_to_root(&self) -> bool {
        self.output.trim_matches('/').is_empty()
    }
}

/// Immutable mapping from category to source and destination directories.
#[derive(Debug, Clone)]
pub struct PathTable {
    root: PathBuf,
    temp_root: PathBuf,
    dev_root: PathBuf,
    dist_root: PathBuf,
    entries: BTreeMap<String, PathEntry>,
}

impl PathTable {
    /// Build and validate a path table.
    ///
    /// Relative paths are resolved against `root`.
    pub fn new(
        root: &Path,
        targets: &TargetsSection,
        categories: &BTreeMap<String, CategoryConfig>,
    ) -> Result<Self, ConfigError> {
        let root = normalize(root);
        let resolve = |p: &str| normalize(&root.join(p));

        let temp_root = resolve(&targets.temp);
        let dev_root = resolve(&targets.dev);
        let dist_root = resolve(&targets.dist);

        validate_target_roots(&root, targets, [&temp_root, &dev_root, &dist_root])?;

        let mut entries = BTreeMap::new();
        for (name, cfg) in categories {
            if cfg.sources.is_empty() {
                return Err(ConfigError::InvalidCategory {
                    category: name.clone(),
                    message: "at least one source glob is required".to_string(),
                });
            }
            build_globset(&cfg.sources)?;

            if Path::new(&cfg.output).is_absolute() || cfg.output.split('/').any(|p| p == "..") {
                return Err(ConfigError::InvalidCategory {
                    category: name.clone(),
                    message: format!(
                        "output '{}' must be a relative path inside the target root",
                        cfg.output
                    ),
                });
            }

            let output = cfg.output.trim_matches('/').to_string();
            let under = |target_root: &Path| normalize(&target_root.join(&output));

            let base = resolve(&cfg.base);
            check_outside_targets(
                [&temp_root, &dev_root, &dist_root],
                &format!("the base of category '{}'", name),
                &base,
            )?;

            entries.insert(
                name.clone(),
                PathEntry {
                    category: name.clone(),
                    base,
                    sources: cfg.sources.clone(),
                    temp_dir: under(&temp_root),
                    dev_dir: under(&dev_root),
                    dist_dir: under(&dist_root),
                    output,
                },
            );
        }

        Ok(Self {
            root,
            temp_root,
            dev_root,
            dist_root,
            entries,
        })
    }

    /// Project root all paths were resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Root directory of a build target.
    pub fn target_root(&self, target: BuildTarget) -> &Path {
        match target {
            BuildTarget::Temp => &self.temp_root,
            BuildTarget::Dev => &self.dev_root,
            BuildTarget::Dist => &self.dist_root,
        }
    }

    /// Look up a category.
    pub fn entry(&self, category: &str) -> Option<&PathEntry> {
        self.entries.get(category)
    }

    /// Destination directory of a category for a build target.
    pub fn dest(&self, category: &str, target: BuildTarget) -> Option<&Path> {
        self.entry(category).map(|e| e.dest(target))
    }

    /// All categories in name order.
    pub fn categories(&self) -> impl Iterator<Item = &PathEntry> {
        self.entries.values()
    }

    /// Reject a source directory that a target root contains or lies inside.
    pub fn ensure_outside_targets(&self, what: &str, dir: &Path) -> Result<(), ConfigError> {
        check_outside_targets(
            [&self.temp_root, &self.dev_root, &self.dist_root],
            what,
            &normalize(dir),
        )
    }
}

fn check_outside_targets(
    target_roots: [&PathBuf; 3],
    what: &str,
    dir: &Path,
) -> Result<(), ConfigError> {
    for (target, target_root) in BuildTarget::ALL.iter().zip(target_roots) {
        if dir.starts_with(target_root) || target_root.starts_with(dir) {
            return Err(ConfigError::InvalidTargets(format!(
                "the {} target root {} overlaps {} ({})",
                target,
                target_root.display(),
                what,
                dir.display()
            )));
        }
    }
    Ok(())
}

fn validate_target_roots(
    root: &Path,
    targets: &TargetsSection,
    resolved: [&PathBuf; 3],
) -> Result<(), ConfigError> {
    for (target, raw) in BuildTarget::ALL
        .iter()
        .zip([&targets.temp, &targets.dev, &targets.dist])
    {
        if raw.trim().is_empty() {
            return Err(ConfigError::InvalidTargets(format!(
                "the {} target root is empty",
                target
            )));
        }
    }

    for (target, path) in BuildTarget::ALL.iter().zip(resolved) {
        if root.starts_with(path) {
            return Err(ConfigError::InvalidTargets(format!(
                "the {} target root {} contains the project root",
                target,
                path.display()
            )));
        }
    }

    for i in 0..3 {
        for j in (i + 1)..3 {
            if resolved[i] == resolved[j] {
                return Err(ConfigError::InvalidTargets(format!(
                    "{} and {} share the output directory {}",
                    BuildTarget::ALL[i],
                    BuildTarget::ALL[j],
                    resolved[i].display()
                )));
            }
            if resolved[i].starts_with(resolved[j]) || resolved[j].starts_with(resolved[i]) {
                return Err(ConfigError::InvalidTargets(format!(
                    "the {} and {} target roots are nested ({} and {})",
                    BuildTarget::ALL[i],
                    BuildTarget::ALL[j],
                    resolved[i].display(),
                    resolved[j].display()
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn categories() -> BTreeMap<String, CategoryConfig> {
        let mut map = BTreeMap::new();
        map.insert(
            "css".to_string(),
            CategoryConfig {
                base: "src/scss".to_string(),
                sources: vec!["spaces/**/*.scss".to_string(), "spaces.scss".to_string()],
                output: "css".to_string(),
            },
        );
        map.insert(
            "index".to_string(),
            CategoryConfig {
                base: "src".to_string(),
                sources: vec!["*.html".to_string()],
                output: String::new(),
            },
        );
        map
    }

    #[test]
    fn resolves_destinations_per_target() {
        let table =
            PathTable::new(Path::new("/site"), &TargetsSection::default(), &categories()).unwrap();

        let css = table.entry("css").unwrap();
        assert_eq!(css.base, PathBuf::from("/site/src/scss"));
        assert_eq!(css.dest(BuildTarget::Temp), Path::new("/site/.temp/css"));
        assert_eq!(css.dest(BuildTarget::Dev), Path::new("/site/html&css/css"));
        assert_eq!(css.dest(BuildTarget::Dist), Path::new("/site/dist/css"));

        let index = table.entry("index").unwrap();
        assert!(index.writes_to_root());
        assert_eq!(index.dest(BuildTarget::Dist), Path::new("/site/dist"));
    }

    #[test]
    fn every_category_has_distinct_non_empty_destinations() {
        let table =
            PathTable::new(Path::new("/site"), &TargetsSection::default(), &categories()).unwrap();

        for entry in table.categories() {
            let dests: Vec<&Path> = BuildTarget::ALL.iter().map(|t| entry.dest(*t)).collect();
            for dest in &dests {
                assert!(!dest.as_os_str().is_empty());
            }
            assert_ne!(dests[0], dests[1]);
            assert_ne!(dests[0], dests[2]);
            assert_ne!(dests[1], dests[2]);
        }
    }

    #[test]
    fn rejects_shared_target_roots() {
        let targets = TargetsSection {
            temp: "out".to_string(),
            dev: "./out".to_string(),
            dist: "dist".to_string(),
        };

        let err = PathTable::new(Path::new("/site"), &targets, &categories()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTargets(_)));
    }

    #[test]
    fn rejects_target_root_at_project_root() {
        let targets = TargetsSection {
            dist: ".".to_string(),
            ..Default::default()
        };

        let err = PathTable::new(Path::new("/site"), &targets, &categories()).unwrap_err();
        assert!(err.to_string().contains("contains the project root"));
    }

    #[test]
    fn rejects_target_root_over_sources() {
        let targets = TargetsSection {
            dist: "src".to_string(),
            ..Default::default()
        };

        let err = PathTable::new(Path::new("/site"), &targets, &categories()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTargets(_)));
        assert!(err.to_string().contains("overlaps the base of category"), "{err}");

        let targets = TargetsSection {
            dev: "src/scss/out".to_string(),
            ..Default::default()
        };
        let err = PathTable::new(Path::new("/site"), &targets, &categories()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTargets(_)));
    }

    #[test]
    fn rejects_nested_target_roots() {
        let targets = TargetsSection {
            dev: "dist/dev".to_string(),
            ..Default::default()
        };

        let err = PathTable::new(Path::new("/site"), &targets, &categories()).unwrap_err();
        assert!(err.to_string().contains("nested"), "{err}");
    }

    #[test]
    fn checks_extra_source_directories() {
        let table =
            PathTable::new(Path::new("/site"), &TargetsSection::default(), &categories()).unwrap();

        assert!(table
            .ensure_outside_targets("the partials directory", Path::new("/site/src/partials"))
            .is_ok());
        let err = table
            .ensure_outside_targets("the partials directory", Path::new("/site/dist/partials"))
            .unwrap_err();
        assert!(err.to_string().contains("partials directory"), "{err}");
    }

    #[test]
    fn rejects_categories_without_sources() {
        let mut cats = categories();
        cats.get_mut("css").unwrap().sources.clear();

        let err = PathTable::new(Path::new("/site"), &TargetsSection::default(), &cats).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCategory { .. }));
    }

    #[test]
    fn rejects_escaping_output() {
        let mut cats = categories();
        cats.get_mut("css").unwrap().output = "../elsewhere".to_string();

        let err = PathTable::new(Path::new("/site"), &TargetsSection::default(), &cats).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCategory { .. }));
    }

    #[test]
    fn parses_targets() {
        assert_eq!("Dist".parse::<BuildTarget>().unwrap(), BuildTarget::Dist);
        assert!("prod".parse::<BuildTarget>().is_err());
    }
}
