//! Configuration management for strictqa.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - Config file (`<workspace>/.strictqa/config.yaml` or `--config`)
//! - Environment variables
//! - Command-line flags
//!
//! All on-disk state (answer cache, document index, prompt overrides) lives
//! under `<workspace>/.strictqa/`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".strictqa";

/// Answer generator providers with a working client.
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["ollama"];

/// Embedding providers the document index can use.
pub const KNOWN_EMBEDDING_PROVIDERS: &[&str] = &["trigram", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .strictqa/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Answer generator settings
    pub llm: LlmSettings,

    /// Document folder and retrieval settings
    pub documents: DocumentSettings,

    /// Embedding provider settings
    pub embedding: EmbeddingSettings,

    /// Answer cache settings
    pub cache: CacheSettings,

    /// Calculation service chain settings
    pub calculation: CalculationSettings,

    /// Deadline for a whole resolution, applied by the CLI
    pub resolve_timeout_secs: Option<u64>,
}

/// Answer generator (LLM) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: String,
    pub model: String,
    pub endpoint: String,
    pub temperature: Option<f32>,
    #[serde(rename = "timeoutSecs")]
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "phi3".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            temperature: Some(0.0),
            timeout_secs: 120,
        }
    }
}

/// Document folder, chunking and retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    /// Folder scanned for documents, relative to the workspace
    pub dir: PathBuf,
    #[serde(rename = "chunkSize")]
    pub chunk_size: usize,
    #[serde(rename = "chunkOverlap")]
    pub chunk_overlap: usize,
    /// Number of candidates requested from the index per question
    #[serde(rename = "topK")]
    pub top_k: usize,
    /// Minimum similarity for a snippet to be admitted
    #[serde(rename = "minSimilarity")]
    pub min_similarity: f32,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("documents"),
            chunk_size: 700,
            chunk_overlap: 100,
            top_k: 3,
            min_similarity: 0.5,
        }
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    /// Ollama endpoint, only used by the `ollama` provider
    pub endpoint: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "bge-m3".to_string(),
            dimensions: 384,
            endpoint: "http://localhost:11434".to_string(),
        }
    }
}

/// Answer cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// SQLite file, relative to the workspace
    pub path: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(STATE_DIR).join("cache.sqlite"),
        }
    }
}

/// Calculation service chain settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculationSettings {
    /// Per-call timeout
    #[serde(rename = "timeoutSecs")]
    pub timeout_secs: u64,

    /// Services in priority order
    pub services: Vec<CalculationServiceSettings>,
}

impl Default for CalculationSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            services: vec![
                CalculationServiceSettings {
                    label: "Factorization API".to_string(),
                    url: "http://localhost:8003".to_string(),
                    path: "/factors".to_string(),
                    default_category: "factorization".to_string(),
                },
                CalculationServiceSettings {
                    label: "Math API".to_string(),
                    url: "http://localhost:8002".to_string(),
                    path: "/calculate".to_string(),
                    default_category: "unknown".to_string(),
                },
            ],
        }
    }
}

/// One calculation service endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculationServiceSettings {
    pub label: String,
    pub url: String,
    pub path: String,
    #[serde(rename = "defaultCategory", default = "default_category")]
    pub default_category: String,
}

fn default_category() -> String {
    "unknown".to_string()
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSettings>,
    documents: Option<DocumentSettings>,
    embedding: Option<EmbeddingSettings>,
    cache: Option<CacheSettings>,
    calculation: Option<CalculationSettings>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    #[serde(rename = "resolveTimeoutSecs")]
    resolve_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: LlmSettings::default(),
            documents: DocumentSettings::default(),
            embedding: EmbeddingSettings::default(),
            cache: CacheSettings::default(),
            calculation: CalculationSettings::default(),
            resolve_timeout_secs: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and environment.
    ///
    /// Environment variables:
    /// - `STRICTQA_WORKSPACE`: Override workspace path
    /// - `STRICTQA_CONFIG`: Path to config file
    /// - `STRICTQA_PROVIDER`: Answer generator provider
    /// - `STRICTQA_MODEL`: Answer generator model
    /// - `STRICTQA_DOCUMENTS_DIR`: Document folder
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use strictqa_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Load configuration, with an explicit workspace and config file taking
    /// precedence over `STRICTQA_WORKSPACE` / `STRICTQA_CONFIG`.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace
            .or_else(|| std::env::var("STRICTQA_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var("STRICTQA_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.state_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override the config file
        if let Ok(provider) = std::env::var("STRICTQA_PROVIDER") {
            config.llm.provider = provider;
        }

        if let Ok(model) = std::env::var("STRICTQA_MODEL") {
            config.llm.model = model;
        }

        if let Ok(dir) = std::env::var("STRICTQA_DOCUMENTS_DIR") {
            config.documents.dir = PathBuf::from(dir);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file = Self::parse_config_file(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.merge_file(file))
    }

    fn parse_config_file(contents: &str) -> Result<ConfigFile, serde_yaml::Error> {
        // An empty file deserializes to unit, not to a mapping
        if contents.trim().is_empty() {
            return Ok(ConfigFile::default());
        }
        serde_yaml::from_str(contents)
    }

    fn merge_file(&self, file: ConfigFile) -> Self {
        let mut result = self.clone();

        if let Some(ws) = file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = file.llm {
            result.llm = llm;
        }
        if let Some(documents) = file.documents {
            result.documents = documents;
        }
        if let Some(embedding) = file.embedding {
            result.embedding = embedding;
        }
        if let Some(cache) = file.cache {
            result.cache = cache;
        }
        if let Some(calculation) = file.calculation {
            result.calculation = calculation;
        }
        if file.resolve_timeout_secs.is_some() {
            result.resolve_timeout_secs = file.resolve_timeout_secs;
        }

        result
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Flags take precedence over the config file and environment.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.llm.provider = provider;
        }

        if let Some(model) = model {
            self.llm.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .strictqa directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the .strictqa directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// Absolute path of the document folder.
    pub fn documents_dir(&self) -> PathBuf {
        self.resolve_path(&self.documents.dir)
    }

    /// Absolute path of the answer cache database.
    pub fn cache_path(&self) -> PathBuf {
        self.resolve_path(&self.cache.path)
    }

    /// Absolute path of the document index database.
    pub fn index_path(&self) -> PathBuf {
        self.state_dir().join("index.sqlite")
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.llm.provider.as_str();
        if !KNOWN_LLM_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_LLM_PROVIDERS.join(", ")
            )));
        }

        let embedding = self.embedding.provider.as_str();
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&embedding) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                embedding,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        let min = self.documents.min_similarity;
        if !(0.0..=1.0).contains(&min) {
            return Err(AppError::Config(format!(
                "minSimilarity must be within [0, 1], got {}",
                min
            )));
        }

        if self.documents.top_k == 0 {
            return Err(AppError::Config("topK must be at least 1".to_string()));
        }

        if self.documents.chunk_size == 0 || self.documents.chunk_overlap >= self.documents.chunk_size
        {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than a non-zero chunkSize ({})",
                self.documents.chunk_overlap, self.documents.chunk_size
            )));
        }

        if self.calculation.timeout_secs == 0 || self.llm.timeout_secs == 0 {
            return Err(AppError::Config(
                "Timeouts must be greater than zero".to_string(),
            ));
        }

        if self.resolve_timeout_secs == Some(0) {
            return Err(AppError::Config(
                "resolveTimeoutSecs must be greater than zero".to_string(),
            ));
        }

        let mut labels = HashSet::new();
        for service in &self.calculation.services {
            if !labels.insert(service.label.as_str()) {
                return Err(AppError::Config(format!(
                    "Duplicate calculation service label: {}",
                    service.label
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.model, "phi3");
        assert_eq!(config.documents.top_k, 3);
        assert_eq!(config.calculation.timeout_secs, 10);
        assert_eq!(config.calculation.services[0].label, "Factorization API");
        assert_eq!(config.calculation.services[1].label, "Math API");
        assert!(!config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_state_paths() {
        let mut config = AppConfig::default();
        config.workspace = PathBuf::from("/srv/qa");
        assert!(config.state_dir().ends_with(".strictqa"));
        assert_eq!(config.documents_dir(), PathBuf::from("/srv/qa/documents"));
        assert_eq!(
            config.cache_path(),
            PathBuf::from("/srv/qa/.strictqa/cache.sqlite")
        );
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.llm.model, "llama3.2");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_partial_yaml() {
        let yaml = r#"
documents:
  dir: kb
  minSimilarity: 0.6
calculation:
  timeoutSecs: 3
  services:
    - label: Factorization API
      url: http://calc:9003
      path: /factors
      defaultCategory: factorization
logging:
  level: warn
"#;
        let file = AppConfig::parse_config_file(yaml).unwrap();
        let merged = AppConfig::default().merge_file(file);

        assert_eq!(merged.documents.dir, PathBuf::from("kb"));
        assert_eq!(merged.documents.min_similarity, 0.6);
        // Unspecified fields in a given section keep their defaults
        assert_eq!(merged.documents.top_k, 3);
        assert_eq!(merged.calculation.timeout_secs, 3);
        assert_eq!(merged.calculation.services.len(), 1);
        assert_eq!(merged.log_level, Some("warn".to_string()));
        assert_eq!(merged.llm.model, "phi3");
    }

    #[test]
    fn test_empty_yaml_is_defaults() {
        let file = AppConfig::parse_config_file("   \n").unwrap();
        let merged = AppConfig::default().merge_file(file);
        assert_eq!(merged.documents.chunk_size, 700);
    }

    #[test]
    fn test_load_with_workspace_file() {
        let temp = TempDir::new().unwrap();
        let state = temp.path().join(STATE_DIR);
        std::fs::create_dir_all(&state).unwrap();
        std::fs::write(state.join("config.yaml"), "llm:\n  model: mistral\n").unwrap();

        let config = AppConfig::load_with(Some(temp.path().to_path_buf()), None).unwrap();
        assert_eq!(config.workspace, temp.path());
        // STRICTQA_MODEL may be set in the environment running the tests
        if std::env::var("STRICTQA_MODEL").is_err() {
            assert_eq!(config.llm.model, "mistral");
        }
    }

    #[test]
    fn test_load_missing_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load_with(
            Some(temp.path().to_path_buf()),
            Some(temp.path().join("absent.yaml")),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.llm.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_similarity_range() {
        let mut config = AppConfig::default();
        config.documents.min_similarity = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_service_labels() {
        let mut config = AppConfig::default();
        let first = config.calculation.services[0].clone();
        config.calculation.services.push(first);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate calculation service label"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = AppConfig::default();
        config.calculation.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
