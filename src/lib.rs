//! # keyseal
//!
//! Resource-data filter chain that keeps API key secrets inside an
//! encryption envelope.
//!
//! Every resource call runs through a [`FilterPipeline`]: an ordered list of
//! filters in front of a terminal handler (the transport). The
//! [`ApiKeyQueryFilter`] injects `encryptSecret`, key size, iteration count,
//! and a fresh salt into any api key query that does not already choose,
//! and echoes the envelope in effect back onto every returned key under
//! `encryptionMetadata`.
//!
//! ## Public API
//!
//! The public surface is narrow. Collaborator seams (`SaltGenerator`,
//! `QueryStringFactory`) and their inputs are re-exported here; their
//! modules are `pub(crate)`.

pub mod apikey;
pub mod chain;
pub(crate) mod criteria;
pub mod error;
pub(crate) mod params;
pub mod request;
pub(crate) mod salt;
pub mod uri;

pub use apikey::{ApiKeyQueryFilter, EncryptionMetadata};
pub use chain::{Filter, FilterChain, FilterPipeline, FilterPipelineBuilder, ResourceHandler};
pub use criteria::{
    Criteria, CriteriaValue, DefaultQueryStringFactory, EqualsExpression, QueryStringFactory,
};
pub use error::FilterError;
pub use params::{
    ApiKeyParameter, EncryptionConfig, DEFAULT_ENCRYPTION_ITERATIONS, DEFAULT_ENCRYPTION_SIZE,
};
pub use request::{ResourceAction, ResourceDataRequest, ResourceDataResult, ResourceKind};
pub use salt::{DefaultSaltGenerator, SaltGenerator};
pub use uri::{CanonicalUri, QueryString};

/// Build a pipeline with the api key filter in front of `terminal`.
///
/// Callers that need more filters, or a different order, should use
/// [`FilterPipeline::builder`] directly.
pub fn api_key_pipeline(terminal: impl ResourceHandler + 'static) -> FilterPipeline {
    FilterPipeline::builder()
        .filter(ApiKeyQueryFilter::new())
        .build(terminal)
}
