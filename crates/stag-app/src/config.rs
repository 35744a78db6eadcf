// Configuration loading and parsing (config/league.toml).

use serde::Deserialize;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use stag_core::{FormatError, FormatTable};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("no defaults/ or config/ directory under {base}; run from the league directory")]
    NoConfigDir { base: PathBuf },

    #[error("failed to seed {path}: {source}")]
    SeedError {
        path: PathBuf,
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire league.toml file.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueSection,
    data: DirSection,
    output: DirSection,
    #[serde(default)]
    formats: Option<FormatsSection>,
    run: RunConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueSection {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DirSection {
    dir: String,
}

#[derive(Debug, Clone, Deserialize)]
struct FormatsSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Years to resolve, in any order.
    pub seasons: Vec<u16>,
    /// Seasons resolved at the same time.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    4
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

/// Validated configuration. Relative paths are resolved against the
/// directory the config was loaded from.
#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueSection,
    pub run: RunConfig,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Era table override; the built-in table is used when absent.
    pub formats_path: Option<PathBuf>,
}

impl Config {
    /// The era table this run resolves seasons against.
    pub fn format_table(&self) -> Result<FormatTable, FormatError> {
        match &self.formats_path {
            Some(path) => FormatTable::from_path(path),
            None => FormatTable::builtin(),
        }
    }

    /// Seasons to run, ascending and without repeats.
    pub fn seasons(&self) -> Vec<u16> {
        let unique: BTreeSet<u16> = self.run.seasons.iter().copied().collect();
        unique.into_iter().collect()
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/league.toml` relative to `base_dir`.
///
/// This does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let league_path = base_dir.join("config").join("league.toml");
    let league_text = read_file(&league_path)?;
    let file: LeagueFile = toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
        path: league_path.clone(),
        source: e,
    })?;

    validate(&file)?;

    let resolve = |p: &str| {
        let path = PathBuf::from(p);
        if path.is_absolute() {
            path
        } else {
            base_dir.join(path)
        }
    };

    Ok(Config {
        data_dir: resolve(&file.data.dir),
        output_dir: resolve(&file.output.dir),
        formats_path: file.formats.as_ref().map(|f| resolve(&f.path)),
        league: file.league,
        run: file.run,
    })
}

/// Name of the editable era table seeded into `config/`.
pub const ERA_TABLE_FILE: &str = "eras.toml";

/// Seed `config/` for a first run. Files in `defaults/` that are missing
/// from `config/` are copied (`.example` files are skipped), then
/// `config/eras.toml` is written from the built-in era table so a
/// `[formats]` override has a starting point. Existing files are never
/// touched. Returns the files created.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() && !config_dir.exists() {
        return Err(ConfigError::NoConfigDir {
            base: base_dir.to_path_buf(),
        });
    }
    std::fs::create_dir_all(&config_dir).map_err(|source| ConfigError::SeedError {
        path: config_dir.clone(),
        source,
    })?;

    let mut created = Vec::new();
    for source in default_files(&defaults_dir)? {
        let Some(file_name) = source.file_name() else {
            continue;
        };
        let target = config_dir.join(file_name);
        if target.exists() {
            continue;
        }
        let content = std::fs::read(&source).map_err(|e| ConfigError::SeedError {
            path: source.clone(),
            source: e,
        })?;
        if write_if_missing(&target, &content)? {
            created.push(target);
        }
    }

    let eras = config_dir.join(ERA_TABLE_FILE);
    if write_if_missing(&eras, FormatTable::builtin_source().as_bytes())? {
        created.push(eras);
    }

    Ok(created)
}

/// Regular files in `defaults/`, sorted, without `.example` templates.
fn default_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let seed_err = |source| ConfigError::SeedError {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(seed_err)? {
        let path = entry.map_err(seed_err)?.path();
        let is_template = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".example"));
        if path.is_file() && !is_template {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Create `target` with `content` unless it already exists.
fn write_if_missing(target: &Path, content: &[u8]) -> Result<bool, ConfigError> {
    let seed_err = |source| ConfigError::SeedError {
        path: target.to_path_buf(),
        source,
    };
    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
    {
        Ok(mut file) => {
            file.write_all(content).map_err(seed_err)?;
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(seed_err(e)),
    }
}

/// Load config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(file: &LeagueFile) -> Result<(), ConfigError> {
    if file.league.name.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "league.name".into(),
            message: "must not be empty".into(),
        });
    }

    let dirs: &[(&str, &str)] = &[
        ("data.dir", file.data.dir.as_str()),
        ("output.dir", file.output.dir.as_str()),
    ];
    for (name, val) in dirs {
        if val.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    if file.formats.as_ref().is_some_and(|f| f.path.trim().is_empty()) {
        return Err(ConfigError::ValidationError {
            field: "formats.path".into(),
            message: "must not be empty when [formats] is present".into(),
        });
    }

    if file.run.seasons.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "run.seasons".into(),
            message: "must list at least one year".into(),
        });
    }
    if file.run.workers == 0 {
        return Err(ConfigError::ValidationError {
            field: "run.workers".into(),
            message: "must be > 0".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const LEAGUE_TOML: &str = r#"
[league]
name = "Test League"

[data]
dir = "data"

[output]
dir = "out"

[run]
seasons = [2019, 2012, 2019]
workers = 2
"#;

    /// Fresh temp dir with `config/league.toml` holding `text`.
    fn config_dir(name: &str, text: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config/league.toml"), text).unwrap();
        tmp
    }

    fn expect_field(err: ConfigError, expected: &str) {
        match err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn loads_and_resolves_relative_paths() {
        let tmp = config_dir("stag_config_valid", LEAGUE_TOML);
        let config = load_config_from(&tmp).expect("should load valid config");

        assert_eq!(config.league.name, "Test League");
        assert_eq!(config.data_dir, tmp.join("data"));
        assert_eq!(config.output_dir, tmp.join("out"));
        assert!(config.formats_path.is_none());
        assert_eq!(config.run.workers, 2);
        assert_eq!(config.seasons(), vec![2012, 2019]);
        assert!(config.format_table().is_ok());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn workers_default_when_omitted() {
        let text = LEAGUE_TOML.replace("workers = 2\n", "");
        let tmp = config_dir("stag_config_default_workers", &text);
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.run.workers, 4);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn formats_override_is_loaded_from_path() {
        let text = format!("{LEAGUE_TOML}\n[formats]\npath = \"eras.toml\"\n");
        let tmp = config_dir("stag_config_formats", &text);
        fs::write(tmp.join("eras.toml"), "not = [valid").unwrap();

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.formats_path, Some(tmp.join("eras.toml")));
        assert!(matches!(config.format_table(), Err(FormatError::Parse { .. })));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_workers() {
        let text = LEAGUE_TOML.replace("workers = 2", "workers = 0");
        let tmp = config_dir("stag_config_zero_workers", &text);
        expect_field(load_config_from(&tmp).unwrap_err(), "run.workers");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_seasons() {
        let text = LEAGUE_TOML.replace("seasons = [2019, 2012, 2019]", "seasons = []");
        let tmp = config_dir("stag_config_no_seasons", &text);
        expect_field(load_config_from(&tmp).unwrap_err(), "run.seasons");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_blank_league_name() {
        let text = LEAGUE_TOML.replace("\"Test League\"", "\"  \"");
        let tmp = config_dir("stag_config_blank_name", &text);
        expect_field(load_config_from(&tmp).unwrap_err(), "league.name");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_names_the_file() {
        let tmp = config_dir("stag_config_parse_error", "[league\nname = 1");
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with("config/league.toml")),
            other => panic!("expected ParseError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_league_toml() {
        let tmp = std::env::temp_dir().join("stag_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::FileNotFound { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_missing_and_keeps_existing() {
        let tmp = std::env::temp_dir().join("stag_config_ensure");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("defaults/league.toml"), LEAGUE_TOML).unwrap();
        fs::write(tmp.join("defaults/extra.toml"), "x = 1").unwrap();
        fs::write(tmp.join("defaults/secret.toml.example"), "x = 2").unwrap();
        fs::write(tmp.join("config/extra.toml"), "x = 9").unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert_eq!(
            copied,
            vec![tmp.join("config/league.toml"), tmp.join("config/eras.toml")]
        );
        assert_eq!(fs::read_to_string(tmp.join("config/extra.toml")).unwrap(), "x = 9");
        assert!(!tmp.join("config/secret.toml.example").exists());

        // Second run copies nothing.
        assert!(ensure_config_files(&tmp).unwrap().is_empty());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn seeded_era_table_matches_builtin_and_is_kept() {
        let tmp = config_dir("stag_config_seed_eras", LEAGUE_TOML);
        let eras = tmp.join("config/eras.toml");

        // config/ alone, no defaults/.
        assert_eq!(ensure_config_files(&tmp).unwrap(), vec![eras.clone()]);
        assert_eq!(
            FormatTable::from_path(&eras).unwrap(),
            FormatTable::builtin().unwrap()
        );

        fs::write(&eras, "# edited\n").unwrap();
        assert!(ensure_config_files(&tmp).unwrap().is_empty());
        assert_eq!(fs::read_to_string(&eras).unwrap(), "# edited\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_without_any_dirs_fails() {
        let tmp = std::env::temp_dir().join("stag_config_no_dirs");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        assert!(matches!(
            ensure_config_files(&tmp),
            Err(ConfigError::NoConfigDir { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn shipped_defaults_are_valid() {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let tmp = std::env::temp_dir().join("stag_config_shipped");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::copy(root.join("defaults/league.toml"), tmp.join("config/league.toml")).unwrap();

        let config = load_config_from(&tmp).expect("shipped league.toml should load");
        assert!(!config.seasons().is_empty());
        assert!(config.format_table().is_ok());

        let _ = fs::remove_dir_all(&tmp);
    }
}
