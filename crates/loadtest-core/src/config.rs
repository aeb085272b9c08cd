use crate::{ConfigError, Message, Role};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const HUMAN_MARKER: &str = "\n\nHuman:";
const ASSISTANT_MARKER: &str = "\n\nAssistant:";

const STORY: &str = "Rex and Charlie were best friends who did everything together. \
They lived next door to each other with their human families and spent all day playing in the backyard. \
Rex was a golden retriever, always happy and eager for fun. Charlie was a German shepherd, more serious but very loyal.\n\
Every morning, Rex and Charlie would wake up and bark excitedly, ready to start the day's adventures. \
Their families would let them out into the backyard and they'd run around chasing each other and sniffing for interesting smells. \
After tiring themselves out, they'd nap in the shade of the big oak tree, Rex's tail still thumping contentedly even in his sleep.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    pub model: ModelConfig,
    #[serde(default)]
    pub payload: PayloadConfig,
    #[serde(default)]
    pub load: LoadConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// On-demand model name or provisioned-throughput ARN.
    pub id: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    #[serde(default)]
    pub aws_region: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            id: "anthropic.claude-v2".to_string(),
            max_tokens: 200,
            temperature: 0.1,
            top_p: 0.9,
            aws_region: None,
        }
    }
}

impl ModelConfig {
    /// True for `arn:aws:bedrock:<region>:<account>:provisioned-model/<id>`.
    pub fn is_provisioned(&self) -> bool {
        let parts: Vec<&str> = self.id.splitn(6, ':').collect();
        parts.len() == 6
            && parts[0] == "arn"
            && parts[2] == "bedrock"
            && parts[5]
                .strip_prefix("provisioned-model/")
                .is_some_and(|id| !id.is_empty())
    }

    pub fn with_env_overrides(&self) -> Result<Self, ConfigError> {
        Ok(Self {
            id: env::var("LOADTEST_MODEL_ID").unwrap_or_else(|_| self.id.clone()),
            max_tokens: parse_env("LOADTEST_MAX_TOKENS")?.unwrap_or(self.max_tokens),
            temperature: parse_env("LOADTEST_TEMPERATURE")?.unwrap_or(self.temperature),
            top_p: parse_env("LOADTEST_TOP_P")?.unwrap_or(self.top_p),
            aws_region: env::var("AWS_REGION").ok().or_else(|| self.aws_region.clone()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PayloadFormat {
    /// Single prompt string with Human/Assistant turn markers.
    #[default]
    TextCompletion,
    /// Anthropic messages API with a system instruction.
    Messages,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PayloadConfig {
    #[serde(default)]
    pub format: PayloadFormat,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl PayloadConfig {
    pub fn prompt(&self, max_tokens: u32) -> String {
        self.prompt.clone().unwrap_or_else(|| {
            format!(
                "{HUMAN_MARKER} \nWrite a long and high-quality story about two dogs. \
                 Make the story longer than {max_tokens}\n\n{STORY}\n{ASSISTANT_MARKER}"
            )
        })
    }

    pub fn system(&self, max_tokens: u32) -> String {
        self.system.clone().unwrap_or_else(|| {
            format!(
                "You are a long and high-quality story teller. Make the story longer than {max_tokens}"
            )
        })
    }

    pub fn messages(&self) -> Vec<Message> {
        if self.messages.is_empty() {
            vec![Message::user(STORY)]
        } else {
            self.messages.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadConfig {
    pub users: usize,
    /// Iterations per virtual user.
    #[serde(default)]
    pub iterations: Option<u64>,
    #[serde(default)]
    pub run_time_secs: Option<u64>,
    #[serde(default)]
    pub wait_min_ms: u64,
    #[serde(default)]
    pub wait_max_ms: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            users: 1,
            iterations: None,
            run_time_secs: None,
            wait_min_ms: 0,
            wait_max_ms: 0,
        }
    }
}

impl LoadConfig {
    pub fn with_env_overrides(&self) -> Result<Self, ConfigError> {
        Ok(Self {
            users: parse_env("LOADTEST_USERS")?.unwrap_or(self.users),
            ..self.clone()
        })
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default_config_path() -> String {
        "./config.toml".to_string()
    }

    /// Loads `path`, else `CONFIG_PATH`, else `./config.toml`. Returns
    /// `Ok(None)` only when no path was given and the default file is absent;
    /// a file that was found but cannot be read or parsed is an error.
    pub fn resolve(path: Option<PathBuf>) -> anyhow::Result<Option<Self>> {
        let explicit = path.or_else(|| env::var_os("CONFIG_PATH").map(PathBuf::from));
        Self::resolve_with_default(
            explicit.as_deref(),
            Path::new(&Self::default_config_path()),
        )
    }

    fn resolve_with_default(
        explicit: Option<&Path>,
        default_path: &Path,
    ) -> anyhow::Result<Option<Self>> {
        let path = match explicit {
            Some(path) => path,
            None if default_path.exists() => default_path,
            None => return Ok(None),
        };
        let config = Self::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
        Ok(Some(config))
    }

    pub fn with_env_overrides(&self) -> Result<Self, ConfigError> {
        Ok(Self {
            model: self.model.with_env_overrides()?,
            payload: self.payload.clone(),
            load: self.load.with_env_overrides()?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let model = &self.model;
        if !(0.0..=1.0).contains(&model.temperature) {
            return Err(ConfigError::Temperature(model.temperature));
        }
        if !(0.0..=1.0).contains(&model.top_p) {
            return Err(ConfigError::TopP(model.top_p));
        }
        if model.max_tokens == 0 {
            return Err(ConfigError::MaxTokens);
        }
        if self.load.users == 0 {
            return Err(ConfigError::Users);
        }
        if self.load.wait_min_ms > self.load.wait_max_ms {
            return Err(ConfigError::WaitRange {
                min: self.load.wait_min_ms,
                max: self.load.wait_max_ms,
            });
        }

        match self.payload.format {
            PayloadFormat::TextCompletion => {
                let prompt = self.payload.prompt(model.max_tokens);
                let human = prompt.find(HUMAN_MARKER).ok_or(ConfigError::PromptMarkers)?;
                if !prompt[human..].contains(ASSISTANT_MARKER) {
                    return Err(ConfigError::PromptMarkers);
                }
            }
            PayloadFormat::Messages => {
                let messages = self.payload.messages();
                match messages.first() {
                    None => return Err(ConfigError::NoMessages),
                    Some(first) if first.role != Role::User => {
                        return Err(ConfigError::FirstMessageRole)
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(())
    }
}

fn parse_env<T: FromStr>(var: &str) -> Result<Option<T>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvOverride {
                var: var.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}
