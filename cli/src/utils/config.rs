use anyhow::{anyhow, Context, Result};
use gogen_sdk::OutputDefaults;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the project configuration
pub const CONFIG_FILE: &str = "gogen.yaml";

/// Main configuration structure for gogen projects
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GogenConfig {
    /// Output pattern used when neither the annotation nor the file names one
    pub default_output: Option<String>,
    pub goroot: Option<PathBuf>,
    pub gomodcache: Option<PathBuf>,
    /// Quiet period before dev mode regenerates a directory
    pub debounce_ms: u64,
    pub generators: BTreeMap<String, GeneratorConfig>,
}

/// Per-generator settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub output: Option<String>,
    pub enabled: bool,
}

/// Configuration manager that handles loading project configurations
pub struct ConfigManager {
    project_config: Option<GogenConfig>,
    project_path: PathBuf,
    config_file: Option<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output: None,
            enabled: true,
        }
    }
}

impl Default for GogenConfig {
    fn default() -> Self {
        Self {
            default_output: None,
            goroot: None,
            gomodcache: None,
            debounce_ms: 300,
            generators: BTreeMap::new(),
        }
    }
}

impl GogenConfig {
    /// Load `gogen.yaml` from a directory
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_file(path.as_ref().join(CONFIG_FILE))
    }

    /// Load a configuration file by its own path
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref();

        if !config_path.exists() {
            return Err(anyhow!(
                "Configuration file not found at: {}",
                config_path.display()
            ));
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: GogenConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        Ok(config)
    }

    /// Apply environment overrides; `lookup` stands in for `std::env::var`
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(goroot) = lookup("GOROOT").filter(|v| !v.is_empty()) {
            self.goroot = Some(PathBuf::from(goroot));
        }

        if let Some(cache) = lookup("GOMODCACHE").filter(|v| !v.is_empty()) {
            self.gomodcache = Some(PathBuf::from(cache));
        }

        if let Some(output) = lookup("GOGEN_OUTPUT").filter(|v| !v.is_empty()) {
            self.default_output = Some(output);
        }
    }

    /// Output patterns handed to the generation pipeline
    pub fn output_defaults(&self) -> OutputDefaults {
        OutputDefaults {
            global: self.default_output.clone(),
            per_generator: self
                .generators
                .iter()
                .filter_map(|(name, g)| g.output.clone().map(|o| (name.clone(), o)))
                .collect(),
        }
    }

    /// Names of generators switched off in the configuration
    pub fn disabled_generators(&self) -> Vec<String> {
        self.generators
            .iter()
            .filter(|(_, g)| !g.enabled)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.debounce_ms == 0 {
            return Err(anyhow!("debounce_ms must be greater than zero"));
        }

        if let Some(output) = &self.default_output {
            validate_pattern(output).context("Invalid default_output")?;
        }

        let known: Vec<String> = gogen_sdk::builtin_registry()
            .by_priority()
            .iter()
            .map(|g| g.name().to_string())
            .collect();
        for (name, generator) in &self.generators {
            if !known.contains(name) {
                return Err(anyhow!(
                    "Unknown generator '{}' (known: {})",
                    name,
                    known.join(", ")
                ));
            }
            if let Some(output) = &generator.output {
                validate_pattern(output).with_context(|| format!("Invalid output for generator {}", name))?;
            }
        }

        Ok(())
    }
}

fn validate_pattern(pattern: &str) -> Result<()> {
    if pattern.trim().is_empty() {
        return Err(anyhow!("output pattern cannot be empty"));
    }
    if !pattern.ends_with(".go") {
        return Err(anyhow!("output pattern '{}' must name a .go file", pattern));
    }
    Ok(())
}

impl ConfigManager {
    /// Create a new configuration manager for a project
    pub fn new<P: AsRef<Path>>(project_path: P) -> Self {
        Self {
            project_config: None,
            project_path: project_path.as_ref().to_path_buf(),
            config_file: None,
        }
    }

    /// Manager for the project enclosing `dir`, or `dir` itself outside any project
    pub fn for_directory<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self::new(Self::find_project_root(dir).unwrap_or_else(|| dir.to_path_buf()))
    }

    /// Use an explicit configuration file instead of `<project>/gogen.yaml`
    pub fn with_config_file<P: AsRef<Path>>(mut self, file: P) -> Self {
        self.config_file = Some(file.as_ref().to_path_buf());
        self
    }

    /// Load project configuration
    pub fn load(&mut self) -> Result<()> {
        if let Some(file) = &self.config_file {
            self.project_config = Some(GogenConfig::load_file(file)?);
            return Ok(());
        }

        if self.project_path.join(CONFIG_FILE).exists() {
            self.project_config = Some(GogenConfig::load_from_path(&self.project_path)?);
        }

        Ok(())
    }

    /// Get the effective configuration with environment variable overrides
    pub fn get_effective_config(&self) -> Result<GogenConfig> {
        let mut config = self.project_config.clone().unwrap_or_default();

        config.apply_env_overrides(|key| env::var(key).ok());

        config.validate()?;
        Ok(config)
    }

    /// Get the project configuration
    pub fn get_project_config(&self) -> Option<&GogenConfig> {
        self.project_config.as_ref()
    }

    /// Find the project root by looking for gogen.yaml or go.mod
    pub fn find_project_root<P: AsRef<Path>>(start_path: P) -> Option<PathBuf> {
        let mut current = start_path.as_ref().to_path_buf();

        loop {
            if current.join(CONFIG_FILE).exists() || current.join("go.mod").exists() {
                return Some(current);
            }

            if !current.pop() {
                break;
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn create_test_config() -> GogenConfig {
        let mut generators = BTreeMap::new();
        generators.insert(
            "pick".to_string(),
            GeneratorConfig {
                output: Some("$FILE_views.go".to_string()),
                enabled: true,
            },
        );
        generators.insert(
            "mock".to_string(),
            GeneratorConfig {
                output: None,
                enabled: false,
            },
        );
        GogenConfig {
            default_output: Some("zz_generated.go".to_string()),
            goroot: Some(PathBuf::from("/usr/local/go")),
            gomodcache: None,
            debounce_ms: 150,
            generators,
        }
    }

    #[test]
    fn test_config_serialization() {
        let config = create_test_config();
        let yaml_str = serde_yaml::to_string(&config).unwrap();
        let deserialized: GogenConfig = serde_yaml::from_str(&yaml_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: GogenConfig = serde_yaml::from_str("generators:\n  gsql:\n    output: tables_gen.go\n").unwrap();
        assert_eq!(config.debounce_ms, 300);
        assert!(config.generators["gsql"].enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = create_test_config();
        assert!(config.validate().is_ok());

        config.debounce_ms = 0;
        assert!(config.validate().is_err());

        config = create_test_config();
        config.default_output = Some("generated.txt".to_string());
        assert!(config.validate().is_err());

        config = create_test_config();
        config.generators.insert("protobuf".to_string(), GeneratorConfig::default());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Unknown generator 'protobuf'"));
    }

    #[test]
    fn test_output_defaults_and_disabled() {
        let config = create_test_config();
        let defaults = config.output_defaults();
        assert_eq!(defaults.global.as_deref(), Some("zz_generated.go"));
        assert_eq!(defaults.per_generator.get("pick").map(String::as_str), Some("$FILE_views.go"));
        assert!(!defaults.per_generator.contains_key("mock"));
        assert_eq!(config.disabled_generators(), ["mock"]);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GOROOT", "/opt/go"),
            ("GOMODCACHE", ""),
            ("GOGEN_OUTPUT", "all_gen.go"),
        ]);
        let mut config = create_test_config();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.goroot, Some(PathBuf::from("/opt/go")));
        assert_eq!(config.gomodcache, None);
        assert_eq!(config.default_output.as_deref(), Some("all_gen.go"));
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_test_config();

        fs::write(temp_dir.path().join(CONFIG_FILE), serde_yaml::to_string(&config).unwrap()).unwrap();

        let loaded_config = GogenConfig::load_from_path(temp_dir.path()).unwrap();
        assert_eq!(config, loaded_config);

        let mut manager = ConfigManager::new(temp_dir.path());
        manager.load().unwrap();
        assert_eq!(manager.get_project_config(), Some(&config));
    }

    #[test]
    fn test_explicit_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("custom.yaml");
        fs::write(&file, "debounce_ms: 50\n").unwrap();

        let mut manager = ConfigManager::new(temp_dir.path()).with_config_file(&file);
        manager.load().unwrap();
        assert_eq!(manager.get_project_config().unwrap().debounce_ms, 50);

        let mut missing = ConfigManager::new(temp_dir.path()).with_config_file(temp_dir.path().join("nope.yaml"));
        assert!(missing.load().is_err());
    }

    #[test]
    fn test_find_project_root() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join("go.mod"), "module example.com/x\n").unwrap();

        let root = ConfigManager::find_project_root(&nested).unwrap();
        assert_eq!(root, temp_dir.path());

        // gogen.yaml in the project root is picked up from a nested directory
        fs::write(root.join(CONFIG_FILE), "debounce_ms: 75\n").unwrap();
        let mut manager = ConfigManager::for_directory(&nested);
        manager.load().unwrap();
        assert_eq!(manager.get_effective_config().unwrap().debounce_ms, 75);
    }
}
