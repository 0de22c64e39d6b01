//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "the-jury";
const PROJECT_FILES: [&str; 2] = ["jury.toml", ".jury.toml"];
const ENV_PREFIX: &str = "JURY_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `JURY_` environment variables (`JURY_TRIAL__MAX_ROUNDS=3`)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./jury.toml` or `./.jury.toml`
    /// 4. XDG config: `$XDG_CONFIG_HOME/the-jury/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, Box<figment::Error>> {
        Self::figment(
            Self::global_config_path().as_deref(),
            Self::project_config_path().as_deref(),
            config_path,
        )
        .extract()
        .map_err(Box::new)
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    fn figment(global: Option<&Path>, project: Option<&Path>, explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        for path in [global, project].into_iter().flatten() {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        // An explicit file must exist; figment reports a missing one on extract
        if let Some(path) = explicit {
            figment = figment.merge(Toml::file_exact(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the global config file path
    ///
    /// Returns XDG_CONFIG_HOME/the-jury/config.toml if set,
    /// otherwise the platform config directory equivalent
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Print the config file locations being used (for debugging)
    pub fn print_config_sources(explicit: Option<&Path>) {
        println!("Configuration sources (in priority order):");

        println!("  [ENV  ] Environment: {ENV_PREFIX}* (nested keys joined with __)");

        if let Some(path) = explicit {
            let mark = if path.exists() { "FOUND" } else { "MISSING" };
            println!("  [{mark:<5}] Explicit: {}", path.display());
        }

        if let Some(path) = Self::project_config_path() {
            println!("  [FOUND] Project: {}", path.display());
        } else {
            println!("  [     ] Project: ./jury.toml or ./.jury.toml");
        }

        if let Some(path) = Self::global_config_path() {
            if path.exists() {
                println!("  [FOUND] Global:  {}", path.display());
            } else {
                println!("  [     ] Global:  {}", path.display());
            }
        }

        println!("  [     ] Default: built-in defaults");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn extract(global: Option<&Path>, project: Option<&Path>, explicit: Option<&Path>) -> FileConfig {
        ConfigLoader::figment(global, project, explicit)
            .extract()
            .unwrap()
    }

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert!(config.personas.is_empty());
        assert_eq!(config.trial.max_rounds, 5);
    }

    #[test]
    fn test_global_config_path_returns_some() {
        let path = ConfigLoader::global_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().to_string_lossy().contains("the-jury"));
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.toml");
        let config = extract(Some(&absent), Some(&absent), None);
        assert_eq!(config.model.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_project_overrides_global() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.toml");
        let project = dir.path().join("jury.toml");
        fs::write(
            &global,
            "[trial]\nmax_rounds = 2\ninitial_timeout_secs = 90\n",
        )
        .unwrap();
        fs::write(&project, "[trial]\nmax_rounds = 4\n").unwrap();

        let config = extract(Some(&global), Some(&project), None);
        assert_eq!(config.trial.max_rounds, 4);
        // Keys absent from the project file survive from the global file
        assert_eq!(config.trial.initial_timeout_secs, 90);
        assert_eq!(config.trial.follow_up_timeout_secs, 30);
    }

    #[test]
    fn test_explicit_overrides_project() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("jury.toml");
        let explicit = dir.path().join("custom.toml");
        fs::write(&project, "[model]\nmodel = \"project-model\"\n").unwrap();
        fs::write(
            &explicit,
            "[model]\nmodel = \"explicit-model\"\n\n[[personas]]\nname = \"Judge\"\n",
        )
        .unwrap();

        let config = extract(None, Some(&project), Some(&explicit));
        assert_eq!(config.model.model, "explicit-model");
        assert_eq!(config.personas.len(), 1);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("nope.toml");
        let result: Result<FileConfig, _> =
            ConfigLoader::figment(None, None, Some(&explicit)).extract();
        assert!(result.is_err());
    }
}
