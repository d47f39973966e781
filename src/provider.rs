use crate::constants::{API_MAX_TOKENS, API_TIMEOUT_SECS, CLAUDE_TIMEOUT_SECS};
use crate::warning;
use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const OPENAI_BASE_URL: &str = "https://api.openai.com";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// something that turns a prompt into text
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;
    fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    ClaudeCli,
    Anthropic,
    #[value(name = "openai")]
    #[serde(rename = "openai")]
    OpenAi,
    /// no AI; rule-based analysis only
    Rules,
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
}

/// build the configured provider; `Rules` yields none
pub fn build(settings: &ProviderSettings) -> Result<Option<Box<dyn Provider>>> {
    let provider: Box<dyn Provider> = match settings.kind {
        ProviderKind::Rules => return Ok(None),
        ProviderKind::ClaudeCli => Box::new(ClaudeCli {
            model: settings.model.clone(),
            timeout: Duration::from_secs(CLAUDE_TIMEOUT_SECS),
        }),
        ProviderKind::Anthropic => Box::new(Anthropic {
            agent: http_agent(),
            api_key: api_key(settings, "ANTHROPIC_API_KEY")?,
            base_url: base_url(settings, ANTHROPIC_BASE_URL),
            model: model(settings, ANTHROPIC_DEFAULT_MODEL),
        }),
        ProviderKind::OpenAi => Box::new(OpenAi {
            agent: http_agent(),
            api_key: api_key(settings, "OPENAI_API_KEY")?,
            base_url: base_url(settings, OPENAI_BASE_URL),
            model: model(settings, OPENAI_DEFAULT_MODEL),
        }),
    };
    Ok(Some(provider))
}

fn api_key(settings: &ProviderSettings, default_env: &str) -> Result<String> {
    let env = settings.api_key_env.as_deref().unwrap_or(default_env);
    match std::env::var(env) {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => bail!("{env} is not set (use --provider rules to skip AI analysis)"),
    }
}

fn base_url(settings: &ProviderSettings, default: &str) -> String {
    settings
        .base_url
        .as_deref()
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

fn model(settings: &ProviderSettings, default: &str) -> String {
    settings.model.clone().unwrap_or_else(|| default.to_string())
}

fn http_agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(API_TIMEOUT_SECS)))
        .build()
        .into()
}

/// the `claude` command-line tool, fed the prompt on stdin
pub struct ClaudeCli {
    model: Option<String>,
    timeout: Duration,
}

impl Provider for ClaudeCli {
    fn name(&self) -> &str {
        "claude"
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        let mut command = Command::new("claude");
        command.args(["--print", "--tools", ""]);
        if let Some(model) = &self.model {
            command.args(["--model", model]);
        }

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| anyhow!("failed to spawn claude process: {e}"))?;

        // write input to stdin and close it
        if let Some(mut stdin) = child.stdin.take()
            && let Err(e) = stdin.write_all(prompt.as_bytes())
        {
            let _ = child.kill();
            let _ = child.wait();
            bail!("failed to write to claude stdin: {e}");
        }

        let mut stdout = child
            .stdout
            .take()
            .context("failed to take stdout from claude process")?;
        let mut stderr = child
            .stderr
            .take()
            .context("failed to take stderr from claude process")?;

        match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => {
                let mut stdout_data = Vec::new();
                let mut stderr_data = Vec::new();

                if let Err(e) = stdout.read_to_end(&mut stdout_data) {
                    warning!("failed to read claude stdout: {}", e);
                }
                if let Err(e) = stderr.read_to_end(&mut stderr_data) {
                    warning!("failed to read claude stderr: {}", e);
                }

                if !status.success() {
                    let detail = String::from_utf8_lossy(&stderr_data).trim().to_string();
                    bail!("claude exited with {status}: {detail}");
                }

                Ok(String::from_utf8_lossy(&stdout_data).trim().to_string())
            }
            Ok(None) => {
                // timeout occurred, kill the process
                if let Err(e) = child.kill() {
                    warning!("failed to kill claude process: {}", e);
                }
                let _ = child.wait();
                bail!("claude thought for too long")
            }
            Err(e) => bail!("failed to wait for claude process: {e}"),
        }
    }
}

/// Anthropic Messages API
pub struct Anthropic {
    agent: ureq::Agent,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl Provider for Anthropic {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: API_MAX_TOKENS,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut response = self
            .agent
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send_json(&request)
            .context("anthropic request failed")?;
        let parsed: AnthropicResponse = response
            .body_mut()
            .read_json()
            .context("failed to parse anthropic response")?;

        let text: Vec<String> = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect();
        if text.is_empty() {
            bail!("anthropic response contained no text");
        }
        Ok(text.join("\n").trim().to_string())
    }
}

/// OpenAI chat completions, or any compatible endpoint
pub struct OpenAi {
    agent: ureq::Agent,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

impl Provider for OpenAi {
    fn name(&self) -> &str {
        "openai"
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        let request = OpenAiRequest {
            model: &self.model,
            max_tokens: API_MAX_TOKENS,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut response = self
            .agent
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send_json(&request)
            .context("openai request failed")?;
        let parsed: OpenAiResponse = response
            .body_mut()
            .read_json()
            .context("failed to parse openai response")?;

        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| anyhow!("openai response contained no text"))
    }
}
