//! Configuration management for Curator.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - YAML config file (`--config`, `CURATOR_CONFIG`, or `./curator.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! Every section and every key in the YAML file is optional.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "curator.yaml";

/// Generation providers understood by `curator-llm`.
pub const KNOWN_PROVIDERS: [&str; 2] = ["llama-cpp", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Config file the values were read from, if any
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// Log filter override
    #[serde(skip)]
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    #[serde(skip)]
    pub verbose: bool,

    /// Disable colored output
    #[serde(skip)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[serde(skip)]
    pub log_json: bool,

    pub embed: EmbedConfig,
    pub llm: LlmConfig,
    pub perf: PerfConfig,
    pub search: SearchConfig,
    pub disambiguation: DisambiguationConfig,
    pub domain: DomainConfig,
    pub ranking: RankingConfig,
    pub terms: TermsConfig,
    pub intents: Vec<IntentRuleConfig>,
    pub prompts: PromptsConfig,
    pub corpus: CorpusConfig,
}

/// Embedding service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Endpoint accepting `{"text": ...}`
    pub url: String,
    /// Hard ceiling for a single embedding call
    pub timeout_ms: u64,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5001/embed".to_string(),
            timeout_ms: 15_000,
        }
    }
}

/// Text-generation backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Master switch; when false no generation call is ever made
    pub enabled: bool,
    /// `llama-cpp` or `ollama`
    pub provider: String,
    pub url: String,
    /// Model name (ignored by llama-cpp)
    pub model: String,
    pub timeout_ms: u64,
    /// Suffix appended to generated answers
    pub mark: String,
    /// Suffix appended to locally produced summaries
    pub fallback_mark: String,
    /// Minimum article length before a rewrite or summary is offered
    pub summarize_min_chars: usize,
    /// Minimum top score before the final answer may be rewritten
    pub min_score_to_use: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "llama-cpp".to_string(),
            url: "http://127.0.0.1:8081/completion".to_string(),
            model: "llama3.2".to_string(),
            timeout_ms: 12_000,
            mark: " [LLM]".to_string(),
            fallback_mark: " (automatic summary)".to_string(),
            summarize_min_chars: 500,
            min_score_to_use: 0.0,
        }
    }
}

/// Latency budget settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerfConfig {
    /// Total budget of one inbound query
    pub ask_budget_ms: u64,
    /// Cap for the embedding stage
    pub embed_timeout_ms: u64,
    /// Cap for short generation steps (query rewrite, rerank, answer rewrite)
    pub llm_step_max_ms: u64,
    /// Cap for the summary step
    pub summary_step_max_ms: u64,
    /// Maximum concurrent rerank scoring calls
    pub rerank_max_candidates: usize,
    /// Optional stages are skipped when less than this remains; defaults to `llm_step_max_ms`
    pub min_useful_ms: Option<u64>,
    /// Floor applied to every per-call timeout
    pub min_timeout_ms: u64,
    /// Ceiling applied to every per-call timeout
    pub max_timeout_ms: u64,
}

impl Default for PerfConfig {
    fn default() -> Self {
        Self {
            ask_budget_ms: 3_500,
            embed_timeout_ms: 1_800,
            llm_step_max_ms: 600,
            summary_step_max_ms: 1_200,
            rerank_max_candidates: 3,
            min_useful_ms: None,
            min_timeout_ms: 100,
            max_timeout_ms: 60_000,
        }
    }
}

impl PerfConfig {
    pub fn effective_min_useful_ms(&self) -> u64 {
        self.min_useful_ms.unwrap_or(self.llm_step_max_ms)
    }
}

/// Retrieval and scoring settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub top_k: usize,
    pub sim_threshold: f32,
    pub min_best_score: f32,
    pub snippet_chars: usize,
    pub tag_match_bonus: f32,
    pub overlap_bonus_per_token: f32,
    pub overlap_bonus_max: f32,
    pub tag_bypass_sim: f32,
    /// Context word appended to example reformulations in the no-results tip
    pub default_context: String,
    pub rerank_with_llm: bool,
    pub rerank_top_k: usize,
    pub rerank_min_chars: usize,
    pub llm_query_expand: bool,
    pub llm_query_rewrite_on_low_conf: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            sim_threshold: 0.16,
            min_best_score: 0.70,
            snippet_chars: 1_500,
            tag_match_bonus: 0.04,
            overlap_bonus_per_token: 0.0,
            overlap_bonus_max: 0.0,
            tag_bypass_sim: 0.70,
            default_context: String::new(),
            rerank_with_llm: false,
            rerank_top_k: 4,
            rerank_min_chars: 400,
            llm_query_expand: true,
            llm_query_rewrite_on_low_conf: false,
        }
    }
}

/// What to do with a query the domain gate rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenericPolicy {
    Refine,
    Choices,
}

/// How a near tie after a confident top hit is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NearTiePolicy {
    /// Same branching as the low-confidence case
    DomainGate,
    /// Always offer choices
    AlwaysChoices,
}

/// Disambiguation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisambiguationConfig {
    pub choice_delta: f32,
    pub gate_by_domain: bool,
    pub generic_single_word_policy: GenericPolicy,
    pub near_tie_policy: NearTiePolicy,
}

impl Default for DisambiguationConfig {
    fn default() -> Self {
        Self {
            choice_delta: 0.02,
            gate_by_domain: true,
            generic_single_word_policy: GenericPolicy::Refine,
            near_tie_policy: NearTiePolicy::DomainGate,
        }
    }
}

/// Domain vocabulary used by the domain gate and the strong boost.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    pub name: String,
    /// Substrings that mark a query as in-domain
    pub hints: Vec<String>,
    /// Interrogative prefixes that mark a query as a real question
    pub wh_prefixes: Vec<String>,
    pub min_words_for_choices: usize,
    pub allow_year_as_signal: bool,
    /// Refine message; `{q}` is replaced by the raw query
    pub refine_message: String,
    /// Normalized token naming the home institution, e.g. a town name stem
    pub anchor: Option<String>,
    /// Normalized stems that mark a title as a founding record
    pub founding_stems: Vec<String>,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            hints: Vec::new(),
            wh_prefixes: [
                "cuando", "cuándo", "donde", "dónde", "que", "qué", "quien", "quién", "cual",
                "cuál", "como", "cómo", "when", "where", "what", "who", "which", "how",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            min_words_for_choices: 2,
            allow_year_as_signal: true,
            refine_message: "The query \u{201c}{q}\u{201d} is too broad for this collection. \
                             Add a clue (institution, year or place) to narrow it down."
                .to_string(),
            anchor: None,
            founding_stems: vec!["fundacion".to_string(), "foundation".to_string()],
        }
    }
}

/// Per-term weights for intent adjustments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingWeights {
    pub prefer: f32,
    pub avoid: f32,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            prefer: 0.08,
            avoid: 0.10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub weights: RankingWeights,
    /// Additive boost for an exact founding-record title match
    pub strong_boost: f32,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            weights: RankingWeights::default(),
            strong_boost: 0.50,
        }
    }
}

/// Terms applied on top of every detected intent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TermsConfig {
    pub prefer_terms: Vec<String>,
    pub avoid_terms: Vec<String>,
}

/// One configured intent rule. Rules are evaluated in file order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentRuleConfig {
    #[serde(default)]
    pub name: String,
    /// Regex tested case-insensitively against the raw query
    pub detect: String,
    #[serde(default)]
    pub prefer_terms: Vec<String>,
    #[serde(default)]
    pub avoid_terms: Vec<String>,
    /// Prompt mode used when rewriting the answer
    #[serde(default = "default_prompt_mode")]
    pub prompt: String,
}

fn default_prompt_mode() -> String {
    "natural".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory of `*.yml` prompt overrides
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// JSON array or JSON-lines document file
    pub path: Option<PathBuf>,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    embed: Option<EmbedConfig>,
    llm: Option<LlmConfig>,
    perf: Option<PerfConfig>,
    search: Option<SearchConfig>,
    disambiguation: Option<DisambiguationConfig>,
    domain: Option<DomainConfig>,
    ranking: Option<RankingConfig>,
    terms: Option<TermsConfig>,
    intents: Option<Vec<IntentRuleConfig>>,
    prompts: Option<PromptsConfig>,
    corpus: Option<CorpusConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// The file is `config_file` if given, else `CURATOR_CONFIG`, else
    /// `./curator.yaml` when it exists. An explicitly named file that does not
    /// exist is an error.
    ///
    /// Environment variables:
    /// - `CURATOR_CONFIG`: Path to config file
    /// - `CURATOR_EMBED_URL`: Embedding endpoint
    /// - `CURATOR_LLM_URL`: Generation endpoint
    /// - `CURATOR_LLM_ENABLED`: `true`/`false`
    /// - `CURATOR_CORPUS`: Corpus file
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use curator_core::config::AppConfig;
    ///
    /// let config = AppConfig::load(None).expect("Failed to load config");
    /// println!("Budget: {}ms", config.perf.ask_budget_ms);
    /// ```
    pub fn load(config_file: Option<&Path>) -> AppResult<Self> {
        let explicit = config_file
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("CURATOR_CONFIG").ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Config file does not exist: {:?}",
                        path
                    )));
                }
                Self::from_yaml_file(&path)?
            }
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::from_yaml_file(&fallback)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Read a YAML config file on top of the defaults.
    pub fn from_yaml_file(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let mut config = Self::from_yaml_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;
        config.config_file = Some(path.to_path_buf());

        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Parse YAML text on top of the defaults.
    pub fn from_yaml_str(contents: &str) -> AppResult<Self> {
        // An empty document deserializes to unit, not to an empty map
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let file: ConfigFile = serde_yaml::from_str(contents)?;
        let mut config = Self::default();

        if let Some(embed) = file.embed {
            config.embed = embed;
        }
        if let Some(llm) = file.llm {
            config.llm = llm;
        }
        if let Some(perf) = file.perf {
            config.perf = perf;
        }
        if let Some(search) = file.search {
            config.search = search;
        }
        if let Some(disambiguation) = file.disambiguation {
            config.disambiguation = disambiguation;
        }
        if let Some(domain) = file.domain {
            config.domain = domain;
        }
        if let Some(ranking) = file.ranking {
            config.ranking = ranking;
        }
        if let Some(terms) = file.terms {
            config.terms = terms;
        }
        if let Some(intents) = file.intents {
            config.intents = intents;
        }
        if let Some(prompts) = file.prompts {
            config.prompts = prompts;
        }
        if let Some(corpus) = file.corpus {
            config.corpus = corpus;
        }
        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                config.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                config.no_color = !color;
            }
            if let Some(json) = logging.json {
                config.log_json = json;
            }
        }

        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CURATOR_EMBED_URL") {
            self.embed.url = url;
        }

        if let Some(url) = lookup("CURATOR_LLM_URL") {
            self.llm.url = url;
        }

        if let Some(enabled) = lookup("CURATOR_LLM_ENABLED") {
            match enabled.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.llm.enabled = true,
                "0" | "false" | "no" | "off" => self.llm.enabled = false,
                other => tracing::warn!("Ignoring CURATOR_LLM_ENABLED={}", other),
            }
        }

        if let Some(corpus) = lookup("CURATOR_CORPUS") {
            self.corpus.path = Some(PathBuf::from(corpus));
        }

        if let Some(level) = lookup("RUST_LOG") {
            self.log_level = Some(level);
        }

        if lookup("NO_COLOR").is_some() {
            self.no_color = true;
        }
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over the file and the environment.
    pub fn with_overrides(
        mut self,
        corpus: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        log_json: bool,
        llm_enabled: Option<bool>,
    ) -> Self {
        if let Some(corpus) = corpus {
            self.corpus.path = Some(corpus);
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

        if log_json {
            self.log_json = true;
        }

        if let Some(enabled) = llm_enabled {
            self.llm.enabled = enabled;
        }

        self
    }

    /// Validate value ranges.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.llm.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.perf.ask_budget_ms == 0 {
            return Err(AppError::Config(
                "perf.ask_budget_ms must be positive".to_string(),
            ));
        }

        if self.perf.min_timeout_ms > self.perf.max_timeout_ms {
            return Err(AppError::Config(format!(
                "perf.min_timeout_ms ({}) exceeds perf.max_timeout_ms ({})",
                self.perf.min_timeout_ms, self.perf.max_timeout_ms
            )));
        }

        // Per-call ceilings apply after the floor clamp, so they may not undercut it
        for (name, value) in [
            ("embed.timeout_ms", self.embed.timeout_ms),
            ("llm.timeout_ms", self.llm.timeout_ms),
        ] {
            if value < self.perf.min_timeout_ms {
                return Err(AppError::Config(format!(
                    "{} ({}) is below perf.min_timeout_ms ({})",
                    name, value, self.perf.min_timeout_ms
                )));
            }
        }

        if self.perf.rerank_max_candidates == 0 {
            return Err(AppError::Config(
                "perf.rerank_max_candidates must be at least 1".to_string(),
            ));
        }

        if self.search.top_k == 0 {
            return Err(AppError::Config("search.top_k must be at least 1".to_string()));
        }

        for (name, value) in [
            ("search.sim_threshold", self.search.sim_threshold),
            ("search.min_best_score", self.search.min_best_score),
            ("search.tag_bypass_sim", self.search.tag_bypass_sim),
        ] {
            if !(-1.0..=1.0).contains(&value) {
                return Err(AppError::Config(format!(
                    "{} must be within [-1, 1], got {}",
                    name, value
                )));
            }
        }

        if self.disambiguation.choice_delta < 0.0 {
            return Err(AppError::Config(
                "disambiguation.choice_delta must not be negative".to_string(),
            ));
        }

        for rule in &self.intents {
            if rule.detect.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "Intent '{}' has an empty detect pattern",
                    rule.name
                )));
            }
        }

        Ok(())
    }
}
