// Configuration loading and section validation

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use chrono::Local;
use directories::ProjectDirs;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::archive::ArchiveOptions;
use crate::constants::{
    CONFIG_CANDIDATES, CONFIG_ENV_PREFIX, CONFIG_FILENAME, DEFAULT_ARCHIVE_SIZE_CAP,
    DEFAULT_TIME_CUTOFF_MINUTES,
};
use crate::error::{ImportrrError, Result};
use crate::ingest::cutoff_before;

/// Raw settings as read from the TOML file and `IMPORTRR_*` environment overrides.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub album_dir: PathBuf,
    #[serde(default)]
    pub archive_dir: Option<PathBuf>,
    #[serde(default = "default_time_cutoff")]
    pub time_cutoff_minutes: i64,
    #[serde(default = "default_size_cap")]
    pub archive_size_cap: u64,
    #[serde(default = "default_true")]
    pub transcode: bool,
    #[serde(default, rename = "section")]
    pub sections: Vec<SectionSettings>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SectionSettings {
    pub name: String,
    pub import_dirs: Vec<String>,
    #[serde(default)]
    pub serial: Option<String>,
    /// Set to false to keep this section out of the archive.
    #[serde(default = "default_true")]
    pub archive: bool,
}

fn default_time_cutoff() -> i64 {
    DEFAULT_TIME_CUTOFF_MINUTES
}

fn default_size_cap() -> u64 {
    DEFAULT_ARCHIVE_SIZE_CAP
}

fn default_true() -> bool {
    true
}

/// One album/archive pair fed by one or more import folders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub name: String,
    pub album_dir: PathBuf,
    pub archive_dir: Option<PathBuf>,
    /// Relative to `album_dir`.
    pub import_dirs: Vec<String>,
    pub serial: Option<String>,
}

impl Section {
    pub fn new(
        name: impl Into<String>,
        album_dir: PathBuf,
        archive_dir: Option<PathBuf>,
        import_dirs: Vec<String>,
        serial: Option<String>,
    ) -> Result<Self> {
        let section = Self {
            name: name.into(),
            album_dir,
            archive_dir,
            import_dirs,
            serial,
        };
        section.check_dirs()?;
        section.check_import_slugs()?;
        Ok(section)
    }

    /// Album directory, and archive directory when configured, must be directories.
    pub fn check_dirs(&self) -> Result<()> {
        require_dir(&self.album_dir)?;
        if let Some(ref archive_dir) = self.archive_dir {
            require_dir(archive_dir)?;
        }
        Ok(())
    }

    /// With several import folders every folder needs its own non-empty slug,
    /// otherwise two folders would write containers under the same name.
    fn check_import_slugs(&self) -> Result<()> {
        if self.import_dirs.len() < 2 {
            return Ok(());
        }
        let mut seen = HashSet::new();
        for dir in &self.import_dirs {
            let slug = slug(dir);
            if slug.is_empty() {
                return Err(ImportrrError::Config(format!(
                    "import dir '{}' has no usable characters for an archive name",
                    dir
                )));
            }
            if !seen.insert(slug.clone()) {
                return Err(ImportrrError::Config(format!(
                    "import dirs of section '{}' clash on archive name '{}'",
                    self.name, slug
                )));
            }
        }
        Ok(())
    }

    /// Stem shared by the containers of one import folder for one run. Sections
    /// fed by several folders append a folder slug so their containers never collide.
    pub fn archive_prefix(&self, run_prefix: &str, import_dir: &str) -> String {
        let mut prefix = match self.serial.as_deref().map(str::trim) {
            Some(serial) if !serial.is_empty() => format!("{}_{}", serial, run_prefix),
            _ => run_prefix.to_string(),
        };
        if self.import_dirs.len() > 1 {
            prefix.push('_');
            prefix.push_str(&slug(import_dir));
        }
        prefix
    }
}

fn slug(value: &str) -> String {
    let slug: String = value
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    slug.trim_matches('-').to_string()
}

fn require_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else if path.exists() {
        Err(ImportrrError::NotADirectory(path.to_path_buf()))
    } else {
        Err(ImportrrError::MissingDirectory(path.to_path_buf()))
    }
}

/// Validated configuration for one process invocation.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub album_root: PathBuf,
    pub archive_root: Option<PathBuf>,
    pub time_cutoff_minutes: i64,
    pub archive: ArchiveOptions,
    pub sections: Vec<Section>,
}

impl Config {
    /// Locate, read and validate the configuration.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = locate(explicit)?;
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", path.display());
        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(CONFIG_ENV_PREFIX));
        Self::from_figment(figment)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Self::from_figment(Figment::new().merge(Toml::string(toml)))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment.extract()?;
        Self::from_settings(settings)
    }

    pub fn from_settings(settings: Settings) -> Result<Self> {
        if settings.time_cutoff_minutes < 0 {
            return Err(ImportrrError::Config(format!(
                "time_cutoff_minutes must not be negative, got {}",
                settings.time_cutoff_minutes
            )));
        }
        if cutoff_before(Local::now(), settings.time_cutoff_minutes).is_none() {
            return Err(ImportrrError::Config(format!(
                "time_cutoff_minutes {} is out of range",
                settings.time_cutoff_minutes
            )));
        }
        if settings.archive_size_cap == 0 {
            return Err(ImportrrError::Config("archive_size_cap must be greater than zero".to_string()));
        }

        let album_root = settings.album_dir;
        let archive_root = settings.archive_dir;
        log::info!("Album root directory: {}", album_root.display());
        match archive_root {
            Some(ref root) => log::info!("Archive root directory: {}", root.display()),
            None => log::info!("No archive directory configured, archival disabled"),
        }

        let mut sections = Vec::with_capacity(settings.sections.len());
        for raw in settings.sections {
            log::debug!("Processing configuration section: {}", raw.name);
            sections.push(build_section(&album_root, archive_root.as_deref(), raw)?);
        }

        if sections.is_empty() {
            log::warn!("Configuration has no sections, nothing will be imported");
        }
        log::info!("Configuration loaded successfully with {} sections", sections.len());

        Ok(Self {
            album_root,
            archive_root,
            time_cutoff_minutes: settings.time_cutoff_minutes,
            archive: ArchiveOptions {
                size_cap: settings.archive_size_cap,
                transcode: settings.transcode,
            },
            sections,
        })
    }

    /// Serial label of the section archiving into `archive_dir`.
    pub fn serial_for(&self, archive_dir: &Path) -> Result<Option<&str>> {
        self.sections
            .iter()
            .find(|s| s.archive_dir.as_deref() == Some(archive_dir))
            .map(|s| s.serial.as_deref())
            .ok_or_else(|| ImportrrError::Config(format!("No serial for {}", archive_dir.display())))
    }
}

fn build_section(album_root: &Path, archive_root: Option<&Path>, raw: SectionSettings) -> Result<Section> {
    let name = raw.name.trim().to_string();
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(ImportrrError::Config(format!("invalid section name '{}'", raw.name)));
    }

    let import_dirs: Vec<String> = raw
        .import_dirs
        .iter()
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect();
    if import_dirs.is_empty() {
        return Err(ImportrrError::Config(format!("section '{}' has no import_dirs", name)));
    }

    let archive_dir = if raw.archive {
        archive_root.map(|root| root.join(&name))
    } else {
        None
    };

    let section = Section::new(name.clone(), album_root.join(&name), archive_dir, import_dirs, raw.serial)
        .map_err(|e| ImportrrError::Config(format!("section '{}': {}", name, e)))?;
    log::debug!("Added section: {} with {} import directories", name, section.import_dirs.len());
    Ok(section)
}

/// First existing configuration file: explicit path, then the fixed candidates,
/// then the platform config directory.
pub fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(ImportrrError::Config(format!("Configuration file not found: {}", path.display())));
    }

    let mut candidates: Vec<PathBuf> = CONFIG_CANDIDATES.iter().map(PathBuf::from).collect();
    if let Some(dirs) = ProjectDirs::from("", "", "importrr") {
        candidates.push(dirs.config_dir().join(CONFIG_FILENAME));
    }

    if let Some(found) = candidates.iter().find(|c| c.is_file()) {
        return Ok(found.clone());
    }

    log::warn!("No configuration file found in: {:?}", candidates);
    Err(ImportrrError::Config(format!("Configuration file not found in: {:?}", candidates)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Roots {
        tmp: TempDir,
    }

    impl Roots {
        fn new(sections: &[&str]) -> Self {
            let tmp = TempDir::new().unwrap();
            for name in sections {
                fs::create_dir_all(tmp.path().join("album").join(name)).unwrap();
                fs::create_dir_all(tmp.path().join("archive").join(name)).unwrap();
            }
            Self { tmp }
        }

        fn album(&self) -> PathBuf {
            self.tmp.path().join("album")
        }

        fn archive(&self) -> PathBuf {
            self.tmp.path().join("archive")
        }

        fn header(&self) -> String {
            format!(
                "album_dir = {:?}\narchive_dir = {:?}\n",
                self.album().to_string_lossy(),
                self.archive().to_string_lossy()
            )
        }
    }

    #[test]
    fn test_sections_keep_file_order_and_defaults() {
        let roots = Roots::new(&["family", "work"]);
        let toml = format!(
            "{}\n[[section]]\nname = \"work\"\nimport_dirs = [\"inbox\"]\n\n[[section]]\nname = \"family\"\nimport_dirs = [\"alice\", \"bob\"]\nserial = \"A1\"\n",
            roots.header()
        );

        let config = Config::from_toml_str(&toml).unwrap();

        assert_eq!(config.time_cutoff_minutes, DEFAULT_TIME_CUTOFF_MINUTES);
        assert_eq!(config.archive.size_cap, DEFAULT_ARCHIVE_SIZE_CAP);
        assert!(config.archive.transcode);

        let names: Vec<&str> = config.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["work", "family"]);

        let family = &config.sections[1];
        assert_eq!(family.album_dir, roots.album().join("family"));
        assert_eq!(family.archive_dir, Some(roots.archive().join("family")));
        assert_eq!(family.import_dirs, vec!["alice", "bob"]);
        assert_eq!(config.serial_for(&roots.archive().join("family")).unwrap(), Some("A1"));
        assert_eq!(config.serial_for(&roots.archive().join("work")).unwrap(), None);
        assert!(config.serial_for(&roots.archive().join("other")).is_err());
    }

    #[test]
    fn test_missing_album_dir_is_a_config_error() {
        let roots = Roots::new(&[]);
        let toml = format!("{}\n[[section]]\nname = \"ghost\"\nimport_dirs = [\"in\"]\n", roots.header());

        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(err.is_config(), "{}", err);
    }

    #[test]
    fn test_missing_archive_dir_is_a_config_error() {
        let roots = Roots::new(&[]);
        fs::create_dir_all(roots.album().join("solo")).unwrap();
        let toml = format!("{}\n[[section]]\nname = \"solo\"\nimport_dirs = [\"in\"]\n", roots.header());

        assert!(Config::from_toml_str(&toml).unwrap_err().is_config());
    }

    #[test]
    fn test_archive_opt_out_skips_archive_validation() {
        let roots = Roots::new(&[]);
        fs::create_dir_all(roots.album().join("solo")).unwrap();
        let toml = format!(
            "{}\n[[section]]\nname = \"solo\"\nimport_dirs = [\"in\"]\narchive = false\n",
            roots.header()
        );

        let config = Config::from_toml_str(&toml).unwrap();
        assert_eq!(config.sections[0].archive_dir, None);
    }

    #[test]
    fn test_missing_required_key() {
        let err = Config::from_toml_str("archive_size_cap = 10\n").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_empty_import_dirs_rejected() {
        let roots = Roots::new(&["family"]);
        let toml = format!("{}\n[[section]]\nname = \"family\"\nimport_dirs = [\" \"]\n", roots.header());
        assert!(Config::from_toml_str(&toml).unwrap_err().is_config());
    }

    #[test]
    fn test_zero_size_cap_rejected() {
        let roots = Roots::new(&[]);
        let toml = format!("{}archive_size_cap = 0\n", roots.header());
        assert!(Config::from_toml_str(&toml).unwrap_err().is_config());
    }

    #[test]
    fn test_archive_prefix_uses_serial() {
        let roots = Roots::new(&["family"]);
        let with = Section::new(
            "family",
            roots.album().join("family"),
            None,
            vec!["in".to_string()],
            Some("A1".to_string()),
        )
        .unwrap();
        assert_eq!(with.archive_prefix("20240101120000", "in"), "A1_20240101120000");

        let without = Section { serial: None, ..with };
        assert_eq!(without.archive_prefix("20240101120000", "in"), "20240101120000");

        let shared = Section {
            import_dirs: vec!["uploads/alice".to_string(), "uploads/bob".to_string()],
            ..without
        };
        assert_eq!(
            shared.archive_prefix("20240101120000", "uploads/bob"),
            "20240101120000_uploads-bob"
        );
    }

    #[test]
    fn test_out_of_range_cutoff_rejected() {
        let roots = Roots::new(&[]);
        let toml = format!("{}time_cutoff_minutes = 1000000000000
", roots.header());
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(err.is_config(), "{}", err);
    }

    #[test]
    fn test_clashing_import_slugs_rejected() {
        let roots = Roots::new(&["family"]);
        let clash = format!(
            "{}\n[[section]]\nname = \"family\"\nimport_dirs = [\"a b\", \"a-b\"]\n",
            roots.header()
        );
        assert!(Config::from_toml_str(&clash).unwrap_err().is_config());

        let blank = format!(
            "{}\n[[section]]\nname = \"family\"\nimport_dirs = [\"in\", \"__\"]\n",
            roots.header()
        );
        assert!(Config::from_toml_str(&blank).unwrap_err().is_config());

        let distinct = format!(
            "{}\n[[section]]\nname = \"family\"\nimport_dirs = [\"Ålesund\", \"Oslo\"]\n",
            roots.header()
        );
        let config = Config::from_toml_str(&distinct).unwrap();
        assert_eq!(
            config.sections[0].archive_prefix("20240101120000", "Ålesund"),
            "20240101120000_Ålesund"
        );
    }

    #[test]
    fn test_file_with_env_override() {
        let roots = Roots::new(&["family"]);
        let path = roots.tmp.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            format!("{}time_cutoff_minutes = 5\n[[section]]\nname = \"family\"\nimport_dirs = [\"in\"]\n", roots.header()),
        )
        .unwrap();

        assert_eq!(locate(Some(&path)).unwrap(), path);
        assert!(locate(Some(&roots.tmp.path().join("nope.toml"))).is_err());

        std::env::set_var("IMPORTRR_ARCHIVE_SIZE_CAP", "1234");
        let config = Config::from_file(&path);
        std::env::remove_var("IMPORTRR_ARCHIVE_SIZE_CAP");

        let config = config.unwrap();
        assert_eq!(config.time_cutoff_minutes, 5);
        assert_eq!(config.archive.size_cap, 1234);
    }
}
