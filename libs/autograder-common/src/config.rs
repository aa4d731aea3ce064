// Process-wide grader configuration, loaded once at startup
use crate::types::{MatchPolicy, ScoringProfile};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/grader.json";
pub const CONFIG_PATH_ENV: &str = "GRADER_CONFIG";

const WEIGHT_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    pub command: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub test_timeout_ms: u64,
    pub perf_timeout_ms: u64,
    /// Runtime recorded when the performance run times out
    pub perf_timeout_penalty_secs: f64,
    pub max_output_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub groq_model: String,
    pub groq_endpoint: String,
    pub gemini_model: String,
    pub gemini_endpoint: String,
    pub request_timeout_secs: u64,
    /// Upper bound on the serialized evaluation sent to the report model
    pub report_context_chars: usize,
    #[serde(skip)]
    pub groq_api_key: Option<String>,
    #[serde(skip)]
    pub gemini_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactWeights {
    pub design: f64,
    pub tests: f64,
    pub performance: f64,
    pub optimization: f64,
    pub static_analysis: f64,
}

impl ArtifactWeights {
    pub fn total(&self) -> f64 {
        self.design + self.tests + self.performance + self.optimization + self.static_analysis
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningWeights {
    pub compile: f64,
    pub structure: f64,
    pub logic: f64,
    pub tests: f64,
}

impl ReasoningWeights {
    pub fn total(&self) -> f64 {
        self.compile + self.structure + self.logic + self.tests
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightTable {
    pub artifact: ArtifactWeights,
    pub reasoning: ReasoningWeights,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraderConfig {
    pub profile: ScoringProfile,
    pub match_policy: MatchPolicy,
    pub compiler: ToolConfig,
    pub analyzer: ToolConfig,
    pub execution: ExecutionConfig,
    pub models: ModelConfig,
    pub weights: WeightTable,
    pub static_penalty_per_warning: f64,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            profile: ScoringProfile::Artifact,
            match_policy: MatchPolicy::Exact,
            compiler: ToolConfig {
                command: "gcc".to_string(),
                args: vec!["-std=c11".to_string(), "-Wall".to_string(), "-O2".to_string()],
                timeout_secs: 15,
            },
            analyzer: ToolConfig {
                command: "cppcheck".to_string(),
                args: vec![
                    "--enable=warning,style,performance,portability".to_string(),
                    "--suppress=missingIncludeSystem".to_string(),
                    "--quiet".to_string(),
                ],
                timeout_secs: 20,
            },
            execution: ExecutionConfig {
                test_timeout_ms: 2000,
                perf_timeout_ms: 1000,
                perf_timeout_penalty_secs: 5.0,
                max_output_bytes: 64 * 1024,
            },
            models: ModelConfig {
                groq_model: "meta-llama/llama-4-maverick-17b-128e-instruct".to_string(),
                groq_endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
                gemini_model: "gemini-2.5-flash".to_string(),
                gemini_endpoint: "https://generativelanguage.googleapis.com".to_string(),
                request_timeout_secs: 60,
                report_context_chars: 6000,
                groq_api_key: None,
                gemini_api_key: None,
            },
            weights: WeightTable {
                artifact: ArtifactWeights {
                    design: 15.0,
                    tests: 30.0,
                    performance: 15.0,
                    optimization: 20.0,
                    static_analysis: 20.0,
                },
                reasoning: ReasoningWeights {
                    compile: 0.20,
                    structure: 0.35,
                    logic: 0.25,
                    tests: 0.20,
                },
            },
            static_penalty_per_warning: 1.5,
        }
    }
}

impl GraderConfig {
    /// Load configuration from a JSON file and merge API keys from the environment
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Grader config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let mut config: GraderConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Path from GRADER_CONFIG, or config/grader.json
    pub fn default_path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load with the default path; a missing file is an error
    pub fn load_default() -> Result<Self> {
        Self::load(&Self::default_path())
    }

    /// Load with the default path, falling back to built-in defaults when absent
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            return Self::load(&path);
        }
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Merge API keys and model overrides from the environment
    pub fn apply_env(&mut self) {
        self.models.groq_api_key = non_empty_env("GROQ_API_KEY");
        self.models.gemini_api_key = non_empty_env("GEMINI_API_KEY");
        if let Some(model) = non_empty_env("GROQ_MODEL") {
            self.models.groq_model = model;
        }
        if let Some(model) = non_empty_env("GEMINI_MODEL") {
            self.models.gemini_model = model;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let artifact = &self.weights.artifact;
        let artifact_weights = [
            artifact.design,
            artifact.tests,
            artifact.performance,
            artifact.optimization,
            artifact.static_analysis,
        ];
        if artifact_weights.iter().any(|w| *w < 0.0) {
            bail!("Artifact weights must not be negative");
        }
        if (artifact.total() - 100.0).abs() > WEIGHT_EPSILON {
            bail!("Artifact weights must sum to 100, got {}", artifact.total());
        }

        let reasoning = &self.weights.reasoning;
        let reasoning_weights = [reasoning.compile, reasoning.structure, reasoning.logic, reasoning.tests];
        if reasoning_weights.iter().any(|w| *w < 0.0) {
            bail!("Reasoning weights must not be negative");
        }
        if (reasoning.total() - 1.0).abs() > WEIGHT_EPSILON {
            bail!("Reasoning weights must sum to 1.0, got {}", reasoning.total());
        }

        if self.compiler.command.trim().is_empty() {
            bail!("Compiler command must not be empty");
        }
        if self.compiler.timeout_secs == 0 || self.analyzer.timeout_secs == 0 {
            bail!("Tool timeouts must be greater than zero");
        }
        if self.execution.test_timeout_ms == 0 || self.execution.perf_timeout_ms == 0 {
            bail!("Execution timeouts must be greater than zero");
        }
        if self.static_penalty_per_warning < 0.0 {
            bail!("Static analysis penalty must not be negative");
        }
        Ok(())
    }

    /// Write configuration as pretty JSON (API keys are never serialized)
    pub fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json_content = serde_json::to_string_pretty(self)
            .context("Failed to serialize grader config")?;
        fs::write(config_path, json_content)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
