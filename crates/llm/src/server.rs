//! Gateway server state: configuration, upstream client, model catalog.

use config::Config;

use crate::routing::ModelCatalog;
use crate::upstream::CopilotClient;

/// Process-wide state shared by all request handlers.
pub(crate) struct GatewayServer {
    pub(crate) config: Config,
    pub(crate) client: CopilotClient,
    pub(crate) catalog: ModelCatalog,
}

impl GatewayServer {
    /// Connect to the upstream and load the model catalog once.
    pub(crate) async fn initialize(config: Config) -> anyhow::Result<Self> {
        let client = CopilotClient::new(&config.upstream);

        let models = client
            .list_models()
            .await
            .map_err(|e| anyhow::anyhow!("failed to load the upstream model catalog: {e}"))?;

        log::info!("loaded {} models from the upstream catalog", models.len());

        Ok(Self {
            config,
            client,
            catalog: ModelCatalog::new(models),
        })
    }
}

/// Cap the requested output tokens to the model's advertised limit,
/// defaulting to the limit when the client sent none.
pub(crate) fn clamp_max_tokens(requested: Option<u64>, limit: Option<u64>) -> Option<u64> {
    match (requested, limit) {
        (Some(requested), Some(limit)) if requested > limit => {
            log::debug!("clamping requested max tokens {requested} to model limit {limit}");
            Some(limit)
        }
        (None, Some(limit)) => Some(limit),
        (requested, _) => requested,
    }
}
