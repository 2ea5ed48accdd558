//! Minimal example: api key reads through a filter pipeline.
//!
//! Demonstrates envelope injection on the way out and metadata decoration
//! on the way back, with a second filter composed in front.
//! Run with: `RUST_LOG=keyseal=debug cargo run --example apikey_roundtrip`

use std::sync::Arc;

use keyseal::{
    ApiKeyQueryFilter, CanonicalUri, EncryptionConfig, Filter, FilterChain, FilterError,
    FilterPipeline, ResourceAction, ResourceDataRequest, ResourceDataResult, ResourceKind,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Prints each outgoing URI, standing in for a request-signing filter.
struct PrintUri;

impl Filter for PrintUri {
    fn filter(
        &self,
        request: ResourceDataRequest,
        chain: FilterChain<'_>,
    ) -> Result<ResourceDataResult, FilterError> {
        let action = request.action();
        let path = request.uri().absolute_path().to_string();
        let result = chain.filter(request)?;
        println!("{action} {path} -> {} field(s)", result.data().len());
        Ok(result)
    }
}

/// Fake transport: reports the query it was sent and returns two keys.
fn transport(request: ResourceDataRequest) -> Result<ResourceDataResult, FilterError> {
    println!("  wire: {}", request.uri());
    ResourceDataResult::from_value(json!({
        "href": request.uri().absolute_path(),
        "items": [{ "id": "k1" }, { "id": "k2" }]
    }))
    .ok_or_else(|| FilterError::UnexpectedPayload("non-object payload".into()))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. Setup: envelope config from JSON, unspecified fields defaulted.
    let config = EncryptionConfig::from_json(r#"{ "key_iterations": 4096 }"#)?;
    let api_keys = Arc::new(ApiKeyQueryFilter::with_config(config)?);

    // The printing filter sees the result after metadata was attached.
    let pipeline = FilterPipeline::builder()
        .filter(PrintUri)
        .shared_filter(api_keys)
        .build(transport);

    // 2. Caller did not ask for encryption: the filter supplies it.
    let request = ResourceDataRequest::new(
        ResourceAction::Read,
        CanonicalUri::parse("/applications/a1/apiKeys?limit=2")?,
        ResourceKind::ApiKeyList,
        None,
    );
    let result = pipeline.execute(request)?;
    println!("{}", serde_json::to_string_pretty(result.data())?);

    // 3. Caller explicitly opted out: sent verbatim, nothing attached.
    let request = ResourceDataRequest::new(
        ResourceAction::Read,
        CanonicalUri::parse("/applications/a1/apiKeys?encryptSecret=false")?,
        ResourceKind::ApiKeyList,
        None,
    );
    let result = pipeline.execute(request)?;
    println!("{}", serde_json::to_string_pretty(result.data())?);

    Ok(())
}
