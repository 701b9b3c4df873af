//! Configuration management
//!
//! 設定は以下の優先順位で読み込まれます:
//! 1. 環境変数
//! 2. zoominary.toml 設定ファイル
//! 3. デフォルト値
//!
//! 設定ファイル内では `${VAR_NAME}` 形式で環境変数を展開できます。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::Error;

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "zoominary.toml";

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key
    pub api_key: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL (optional, for custom endpoints)
    pub base_url: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Additional attempts after a transient failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// How a new conversation is primed with the transcripts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimerConfig {
    /// Inline instruction block sent as the system instruction
    pub instruction: Option<String>,

    /// File holding the instruction block (used when `instruction` is unset)
    ///
    /// A relative path in a config file is resolved against that file's
    /// directory.
    pub instruction_path: Option<String>,

    /// Line placed before the concatenated transcripts
    #[serde(default = "default_transcript_header")]
    pub transcript_header: String,

    /// Show the model's reply to the priming message in the chat history
    #[serde(default)]
    pub show_priming_reply: bool,
}

impl Default for PrimerConfig {
    fn default() -> Self {
        Self {
            instruction: None,
            instruction_path: None,
            transcript_header: default_transcript_header(),
            show_priming_reply: false,
        }
    }
}

impl PrimerConfig {
    /// Resolve the instruction block, reading `instruction_path` if needed
    pub fn resolve_instruction(&self) -> crate::Result<Option<String>> {
        if let Some(text) = &self.instruction {
            return Ok(Some(text.clone()));
        }

        match &self.instruction_path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read primer instruction {}: {}", path, e))
                })?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }
}

/// Web UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Bind host
    #[serde(default = "default_web_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_web_port")]
    pub port: u16,

    /// Seconds without activity before a session is dropped (0 keeps them forever)
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

/// Main configuration for zoominary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// LLM configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Conversation priming
    #[serde(default)]
    pub primer: PrimerConfig,

    /// Web UI
    #[serde(default)]
    pub web: WebConfig,
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    1
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_transcript_header() -> String {
    "Here are the transcripts:".to_string()
}

fn default_web_host() -> String {
    "127.0.0.1".to_string()
}

fn default_web_port() -> u16 {
    8501
}

fn default_session_idle_secs() -> u64 {
    3600
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl Config {
    /// 設定ファイルから環境変数を展開する
    ///
    /// `${VAR_NAME}` 形式の文字列を環境変数の値に置換します。
    /// 環境変数が存在しない場合は空文字列になります。
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // '{' を消費

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// TOML 設定ファイルから設定を読み込む
    ///
    /// 設定ファイル内の `${VAR_NAME}` は環境変数の値に置換されます。
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let mut cfg = Self::from_toml_str(&toml_content)?;
        if let Some(base) = path.parent() {
            cfg.resolve_relative_paths(base);
        }

        // 既存の環境変数で上書き（環境変数が優先）
        cfg.apply_env_overrides();
        cfg.validate()?;

        Ok(cfg)
    }

    /// Parse TOML text (after `${VAR}` expansion) without env overrides
    fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded_content = Self::expand_env_vars(content);

        let toml: TomlConfig = toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        Ok(Self::from_toml_config(toml))
    }

    /// Resolve relative file paths in the config against `base`
    fn resolve_relative_paths(&mut self, base: &Path) {
        if let Some(path) = &self.primer.instruction_path {
            let path = Path::new(path);
            if path.is_relative() {
                self.primer.instruction_path =
                    Some(base.join(path).to_string_lossy().into_owned());
            }
        }
    }

    /// 設定を読み込む
    ///
    /// 以下の順序で設定ファイルを探します:
    /// 1. 明示的に指定されたパス
    /// 2. `./zoominary.toml`
    /// 3. 見つからない場合は環境変数のみ
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        if let Some(path) = path {
            return Self::from_toml_file(path);
        }

        let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            return Self::from_toml_file(default_path);
        }

        Self::from_env()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// TOML 構造から Config を構築
    fn from_toml_config(toml: TomlConfig) -> Self {
        let llm = toml.llm.unwrap_or_default();
        let llm_config = LlmConfig {
            api_key: llm.api_key.unwrap_or_default(),
            model: llm.model.unwrap_or_else(default_model),
            base_url: llm.base_url,
            timeout_secs: llm.timeout_secs.unwrap_or_else(default_timeout_secs),
            max_retries: llm.max_retries.unwrap_or_else(default_max_retries),
            retry_delay_ms: llm.retry_delay_ms.unwrap_or_else(default_retry_delay_ms),
        };

        let primer = toml.primer.unwrap_or_default();
        let primer_config = PrimerConfig {
            instruction: primer.instruction,
            instruction_path: primer.instruction_path,
            transcript_header: primer
                .transcript_header
                .unwrap_or_else(default_transcript_header),
            show_priming_reply: primer.show_priming_reply.unwrap_or(false),
        };

        let web = toml.web.unwrap_or_default();
        let web_config = WebConfig {
            host: web.host.unwrap_or_else(default_web_host),
            port: web.port.unwrap_or_else(default_web_port),
            session_idle_secs: web
                .session_idle_secs
                .unwrap_or_else(default_session_idle_secs),
        };

        Config {
            llm: llm_config,
            primer: primer_config,
            web: web_config,
        }
    }

    /// 環境変数で設定を上書きする
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(api_key) = non_empty("GEMINI_API_KEY") {
            self.llm.api_key = api_key;
        }
        if let Some(api_key) = non_empty("LLM_API_KEY") {
            self.llm.api_key = api_key;
        }
        if let Some(model) = non_empty("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(base_url) = non_empty("LLM_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }
        if let Some(secs) = lookup("LLM_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.llm.timeout_secs = secs;
        }
        if let Some(retries) = lookup("LLM_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            self.llm.max_retries = retries;
        }

        // Primer 設定の上書き
        // 環境変数のパスはファイル内のインライン指定より優先
        if let Some(path) = non_empty("PRIMER_INSTRUCTION_PATH") {
            self.primer.instruction_path = Some(path);
            self.primer.instruction = None;
        }
        if let Some(instruction) = lookup("PRIMER_INSTRUCTION") {
            self.primer.instruction = Some(instruction);
        }
        if let Some(flag) = lookup("SHOW_PRIMING_REPLY") {
            self.primer.show_priming_reply = parse_flag(&flag);
        }

        // Web 設定の上書き
        if let Some(host) = non_empty("WEB_HOST") {
            self.web.host = host;
        }
        if let Some(port) = lookup("WEB_PORT").and_then(|p| p.parse().ok()) {
            self.web.port = port;
        }
        if let Some(secs) = lookup("WEB_SESSION_IDLE_SECS").and_then(|v| v.parse().ok()) {
            self.web.session_idle_secs = secs;
        }
    }

    fn validate(&self) -> crate::Result<()> {
        if self.llm.api_key.trim().is_empty() {
            return Err(Error::Config(
                "GEMINI_API_KEY or LLM_API_KEY not set".to_string(),
            ));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::Config("llm.timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// TOML 構造体定義（ファイル解析用）
// ============================================================================

/// TOML ファイル用のトップレベル構造
#[derive(Debug, Deserialize)]
struct TomlConfig {
    llm: Option<TomlLlmConfig>,
    primer: Option<TomlPrimerConfig>,
    web: Option<TomlWebConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlLlmConfig {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default)]
    max_retries: Option<u32>,
    #[serde(default)]
    retry_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlPrimerConfig {
    instruction: Option<String>,
    instruction_path: Option<String>,
    transcript_header: Option<String>,
    show_priming_reply: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlWebConfig {
    host: Option<String>,
    port: Option<u16>,
    session_idle_secs: Option<u64>,
}
