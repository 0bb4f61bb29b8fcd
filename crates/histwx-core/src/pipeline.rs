use anyhow::Result;

use crate::types::SampleEnvelope;

/// Receives changed samples from a polling loop.
#[async_trait::async_trait]
pub trait SampleSink: Send + Sync {
    async fn emit(&mut self, envelope: &SampleEnvelope) -> Result<()>;
}
