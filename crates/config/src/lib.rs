//! Gateway configuration structures to map the gateway.toml configuration.

#![deny(missing_docs)]

mod loader;
mod models;
mod server;
mod upstream;

use std::path::Path;

pub use models::{ModelsConfig, ReasoningEffort};
use serde::Deserialize;
pub use server::ServerConfig;
pub use upstream::UpstreamConfig;

/// Main configuration structure for the gateway.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration settings.
    pub server: ServerConfig,
    /// Upstream Copilot endpoint configuration.
    pub upstream: UpstreamConfig,
    /// Model routing and prompt configuration.
    pub models: ModelsConfig,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        loader::load(path)
    }

    /// Reasoning effort for a model, honoring per-model overrides.
    pub fn reasoning_effort_for(&self, model: &str) -> ReasoningEffort {
        self.models
            .reasoning_effort
            .get(model)
            .copied()
            .unwrap_or(ReasoningEffort::High)
    }

    /// Model used for warmup and title-generation requests, if configured.
    pub fn small_model(&self) -> Option<&str> {
        self.models.small_model.as_deref()
    }

    /// Extra system prompt appended for a model, if configured.
    pub fn extra_prompt_for(&self, model: &str) -> Option<&str> {
        self.models.extra_prompts.get(model).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_debug_snapshot;

    use crate::Config;

    #[test]
    fn defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_debug_snapshot!(&config, @r#"
        Config {
            server: ServerConfig {
                listen_address: None,
            },
            upstream: UpstreamConfig {
                base_url: "https://api.githubcopilot.com",
                token: None,
            },
            models: ModelsConfig {
                small_model: None,
                reasoning_effort: {},
                extra_prompts: {},
            },
        }
        "#);
    }

    #[test]
    fn full_config() {
        let config: Config = toml::from_str(
            r#"
            [server]
            listen_address = "127.0.0.1:4141"

            [upstream]
            base_url = "https://proxy.example.com"
            token = "ghu_secret"

            [models]
            small_model = "gpt-5-mini"

            [models.reasoning_effort]
            "gpt-5-mini" = "low"

            [models.extra_prompts]
            "gpt-5" = "Prefer terse answers."
            "#,
        )
        .unwrap();

        assert_eq!(
            config.server.listen_address,
            Some("127.0.0.1:4141".parse().unwrap())
        );
        assert_eq!(config.upstream.base_url, "https://proxy.example.com");
        assert!(config.upstream.token.is_some());
        assert_eq!(config.small_model(), Some("gpt-5-mini"));
        assert_eq!(
            config.reasoning_effort_for("gpt-5-mini"),
            crate::ReasoningEffort::Low
        );
        assert_eq!(
            config.reasoning_effort_for("gpt-5"),
            crate::ReasoningEffort::High
        );
        assert_eq!(config.extra_prompt_for("gpt-5"), Some("Prefer terse answers."));
        assert_eq!(config.extra_prompt_for("gpt-5-mini"), None);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<Config, _> = toml::from_str("[servre]\nlisten_address = \"127.0.0.1:1\"");
        assert!(result.is_err());
    }
}
