use std::path::Path;

use anyhow::Context;

use crate::Config;

pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref();

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration from {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("failed to parse configuration from {}", path.display()))?;

    if config.upstream.token.is_none() {
        log::warn!("no upstream token configured, requests will be sent unauthenticated");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use indoc::indoc;

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();

        file.write_all(
            indoc! {r#"
                [server]
                listen_address = "0.0.0.0:8080"

                [models]
                small_model = "gpt-5-mini"
            "#}
            .as_bytes(),
        )
        .unwrap();

        let config = super::load(file.path()).unwrap();

        assert_eq!(config.server.listen_address, Some("0.0.0.0:8080".parse().unwrap()));
        assert_eq!(config.small_model(), Some("gpt-5-mini"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let error = super::load("/nonexistent/gateway.toml").unwrap_err();
        assert!(error.to_string().contains("failed to read configuration"));
    }
}
