//! Multi-channel embedding gateway.
//!
//! Each [`EmbeddingChannel`] pairs a provider with the collection suffix
//! its vectors are stored under (`""` for the primary model, `"_bge"` for a
//! secondary one, and so on). Vectors from different models are never
//! comparable, so a query is embedded once per channel and each vector is
//! only searched against its own channel's collections.

use std::sync::Arc;

use tracing::debug;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::provider::EmbeddingProvider;

/// A provider plus the collection suffix its vectors live under.
#[derive(Clone)]
pub struct EmbeddingChannel {
    /// Channel name used in logs.
    pub name: String,

    /// Suffix appended to knowledge-base collection names.
    pub collection_suffix: String,

    /// The provider producing this channel's vectors.
    pub provider: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingChannel {
    /// Create a channel.
    pub fn new(
        name: impl Into<String>,
        collection_suffix: impl Into<String>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            name: name.into(),
            collection_suffix: collection_suffix.into(),
            provider,
        }
    }
}

impl std::fmt::Debug for EmbeddingChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingChannel")
            .field("name", &self.name)
            .field("collection_suffix", &self.collection_suffix)
            .field("model", &self.provider.model())
            .finish()
    }
}

/// A single query vector produced by one channel.
#[derive(Debug, Clone)]
pub struct ChannelEmbedding {
    /// Channel name.
    pub channel: String,

    /// Collection suffix of the channel.
    pub collection_suffix: String,

    /// The vector.
    pub embedding: Embedding,
}

/// Vectors for a batch of texts produced by one channel.
#[derive(Debug, Clone)]
pub struct ChannelBatch {
    /// Channel name.
    pub channel: String,

    /// Collection suffix of the channel.
    pub collection_suffix: String,

    /// Vector dimension reported by the provider.
    pub dimension: usize,

    /// One vector per input text, in input order.
    pub embeddings: Vec<Embedding>,
}

/// Uniform vector-producing interface over one or more providers.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingGateway {
    channels: Vec<EmbeddingChannel>,
}

impl EmbeddingGateway {
    /// Create an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gateway with a single unsuffixed channel.
    pub fn single(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let name = provider.name().to_string();
        Self::new().with_channel(EmbeddingChannel::new(name, "", provider))
    }

    /// Add a channel.
    pub fn with_channel(mut self, channel: EmbeddingChannel) -> Self {
        self.channels.push(channel);
        self
    }

    /// The configured channels, in order.
    pub fn channels(&self) -> &[EmbeddingChannel] {
        &self.channels
    }

    /// Embed a query once per channel.
    ///
    /// Fails if any channel fails; a partial set of query vectors would
    /// silently skip collections.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<ChannelEmbedding>> {
        if self.channels.is_empty() {
            return Err(EmbeddingError::NoChannels);
        }

        let input = [query.to_string()];
        let mut out = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            let embedding = channel
                .provider
                .embed(&input)
                .await?
                .into_iter()
                .next()
                .ok_or(EmbeddingError::CountMismatch {
                    expected: 1,
                    actual: 0,
                })?;
            debug!(
                "Embedded query on channel {} ({} dims)",
                channel.name,
                embedding.len()
            );
            out.push(ChannelEmbedding {
                channel: channel.name.clone(),
                collection_suffix: channel.collection_suffix.clone(),
                embedding,
            });
        }
        Ok(out)
    }

    /// Embed a batch of document texts with every channel.
    pub async fn embed_documents(&self, texts: &[String]) -> Result<Vec<ChannelBatch>> {
        if self.channels.is_empty() {
            return Err(EmbeddingError::NoChannels);
        }

        let mut out = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            let embeddings = channel.provider.embed(texts).await?;
            if embeddings.len() != texts.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: texts.len(),
                    actual: embeddings.len(),
                });
            }
            let dimension = embeddings
                .first()
                .map_or_else(|| channel.provider.dimension(), Vec::len);
            out.push(ChannelBatch {
                channel: channel.name.clone(),
                collection_suffix: channel.collection_suffix.clone(),
                dimension,
                embeddings,
            });
        }
        Ok(out)
    }
}
