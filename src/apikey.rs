//! Encryption envelope enforcement for API key resources.
//!
//! [`ApiKeyQueryFilter`] sits in the resource pipeline and guarantees that
//! every create, read, or update of an `ApiKey` or `ApiKeyList` travels with
//! an encryption envelope, and that every returned key carries the
//! effective envelope back as metadata.
//!
//! ## Per request
//!
//! ```text
//! DELETE, or not an api key      -> pass through untouched
//! query lacks encryptSecret      -> merge in encryptSecret=true, size,
//!                                   iterations, fresh salt
//! criteria added, or
//! encryptSecret == "true"        -> attach encryptionMetadata to the result
//!                                   (each item for a collection payload)
//! ```
//!
//! A caller-supplied `encryptSecret` is never overridden, even when it is
//! `false`. In that case nothing is injected and nothing is attached.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::chain::{Filter, FilterChain};
use crate::criteria::{Criteria, DefaultQueryStringFactory, QueryStringFactory};
use crate::error::FilterError;
use crate::params::{ApiKeyParameter, EncryptionConfig};
use crate::request::{
    is_collection_resource, ResourceAction, ResourceDataRequest, ResourceDataResult, ResourceKind,
    ITEMS_PROPERTY_NAME,
};
use crate::salt::{DefaultSaltGenerator, SaltGenerator};
use crate::uri::QueryString;

const ENCRYPT_SECRET: &str = ApiKeyParameter::EncryptSecret.name();
const ENCRYPTION_KEY_SALT: &str = ApiKeyParameter::EncryptionKeySalt.name();
const ENCRYPTION_KEY_SIZE: &str = ApiKeyParameter::EncryptionKeySize.name();
const ENCRYPTION_KEY_ITERATIONS: &str = ApiKeyParameter::EncryptionKeyIterations.name();
const ENCRYPTION_METADATA: &str = ApiKeyParameter::EncryptionMetadata.name();

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// The envelope in effect for a call, echoed onto returned keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionMetadata {
    /// `None` when the caller enabled encryption without sending a salt.
    pub salt: Option<String>,
    pub size: u32,
    pub iterations: u32,
}

impl EncryptionMetadata {
    /// Resolve the effective envelope from an outgoing query. Absent size or
    /// iterations take the configured defaults; present but non-integer
    /// values are an error.
    pub fn from_query(query: &QueryString, config: &EncryptionConfig) -> Result<Self, FilterError> {
        Ok(Self {
            salt: query.get(ENCRYPTION_KEY_SALT).map(str::to_string),
            size: parse_param(query, ENCRYPTION_KEY_SIZE, config.key_size)?,
            iterations: parse_param(query, ENCRYPTION_KEY_ITERATIONS, config.key_iterations)?,
        })
    }

    /// Read back the metadata attached to a single decorated resource.
    pub fn from_resource(resource: &Map<String, Value>) -> Option<Self> {
        let meta = resource.get(ENCRYPTION_METADATA)?.as_object()?;
        Some(Self {
            salt: meta
                .get(ENCRYPTION_KEY_SALT)
                .and_then(Value::as_str)
                .map(str::to_string),
            size: u32::try_from(meta.get(ENCRYPTION_KEY_SIZE)?.as_u64()?).ok()?,
            iterations: u32::try_from(meta.get(ENCRYPTION_KEY_ITERATIONS)?.as_u64()?).ok()?,
        })
    }

    /// JSON object in wire order: salt, size, iterations.
    pub fn to_value(&self) -> Value {
        let mut meta = Map::new();
        meta.insert(
            ENCRYPTION_KEY_SALT.to_string(),
            self.salt.clone().map_or(Value::Null, Value::String),
        );
        meta.insert(ENCRYPTION_KEY_SIZE.to_string(), Value::from(self.size));
        meta.insert(ENCRYPTION_KEY_ITERATIONS.to_string(), Value::from(self.iterations));
        Value::Object(meta)
    }
}

fn parse_param(query: &QueryString, name: &'static str, default: u32) -> Result<u32, FilterError> {
    match query.get(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|source| FilterError::MalformedParameter {
                name,
                value: raw.to_string(),
                source,
            }),
    }
}

fn is_true(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Injects encryption criteria into api key queries and decorates api key
/// results with the envelope that was in effect.
///
/// Stateless apart from its collaborators; one instance may be shared by
/// any number of concurrent pipelines.
#[derive(Clone)]
pub struct ApiKeyQueryFilter {
    salt_generator: Arc<dyn SaltGenerator>,
    query_string_factory: Arc<dyn QueryStringFactory>,
    config: EncryptionConfig,
}

impl std::fmt::Debug for ApiKeyQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyQueryFilter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for ApiKeyQueryFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiKeyQueryFilter {
    /// A filter with the system salt generator, the default query-string
    /// factory, and the default envelope.
    pub fn new() -> Self {
        let config = EncryptionConfig::default();
        Self {
            salt_generator: Arc::new(DefaultSaltGenerator::with_len(config.salt_bytes)),
            query_string_factory: Arc::new(DefaultQueryStringFactory),
            config,
        }
    }

    /// A filter using a validated custom envelope configuration.
    pub fn with_config(config: EncryptionConfig) -> Result<Self, FilterError> {
        config.validate()?;
        Ok(Self {
            salt_generator: Arc::new(DefaultSaltGenerator::with_len(config.salt_bytes)),
            query_string_factory: Arc::new(DefaultQueryStringFactory),
            config,
        })
    }

    pub fn with_salt_generator(mut self, generator: Arc<dyn SaltGenerator>) -> Self {
        self.salt_generator = generator;
        self
    }

    pub fn with_query_string_factory(mut self, factory: Arc<dyn QueryStringFactory>) -> Self {
        self.query_string_factory = factory;
        self
    }

    /// Shape an outgoing query without running a request through the chain.
    ///
    /// For api key kinds whose query lacks `encryptSecret`, returns a new
    /// query holding the full envelope followed by every non-envelope entry
    /// of `query`. Otherwise returns `query` as given.
    pub fn filter_query(
        &self,
        kind: &ResourceKind,
        query: Option<QueryString>,
    ) -> Result<Option<QueryString>, FilterError> {
        let has_secret_flag = query
            .as_ref()
            .is_some_and(|q| q.contains_key(ENCRYPT_SECRET));
        if !kind.is_api_key() || has_secret_flag {
            return Ok(query);
        }

        let mut shaped = self.encryption_query()?;
        if let Some(original) = query {
            for (key, value) in original
                .iter()
                .filter(|(key, _)| !ApiKeyParameter::is_envelope_key(key))
            {
                shaped.put(key, value);
            }
        }
        debug!(?kind, params = shaped.len(), "shaped api key query");
        Ok(Some(shaped))
    }

    /// Fresh envelope criteria as query parameters. Draws a new salt.
    fn encryption_query(&self) -> Result<QueryString, FilterError> {
        let criteria = Criteria::new()
            .add_eq(ENCRYPT_SECRET, true)
            .add_eq(ENCRYPTION_KEY_SIZE, self.config.key_size)
            .add_eq(ENCRYPTION_KEY_ITERATIONS, self.config.key_iterations)
            .add_eq(ENCRYPTION_KEY_SALT, self.salt_generator.generate()?);
        Ok(self.query_string_factory.create_query_string(&criteria))
    }

    /// Merge the envelope into the request's query, or give the request a
    /// query if it has none.
    fn add_encryption_criteria(
        &self,
        mut request: ResourceDataRequest,
    ) -> Result<ResourceDataRequest, FilterError> {
        let encryption = self.encryption_query()?;
        if let Some(query) = request.query_mut() {
            query.put_all(&encryption);
            return Ok(request);
        }
        let uri = request.uri().with_query(encryption);
        Ok(request.with_uri(uri))
    }
}

/// Attach `metadata` to each item of a collection payload, or once to a
/// single-resource payload. Returns how many resources were decorated.
fn add_encryption_metadata(
    result: &mut ResourceDataResult,
    metadata: &EncryptionMetadata,
) -> Result<usize, FilterError> {
    let value = metadata.to_value();
    let data = result.data_mut();

    if is_collection_resource(data) {
        if let Some(Value::Array(items)) = data.get_mut(ITEMS_PROPERTY_NAME) {
            for (index, item) in items.iter_mut().enumerate() {
                let Value::Object(resource) = item else {
                    return Err(FilterError::UnexpectedPayload(format!(
                        "collection item {index} is not an object"
                    )));
                };
                resource.insert(ENCRYPTION_METADATA.to_string(), value.clone());
            }
            return Ok(items.len());
        }
    }

    data.insert(ENCRYPTION_METADATA.to_string(), value);
    Ok(1)
}

impl Filter for ApiKeyQueryFilter {
    /// Inject criteria, dispatch, then decorate the result.
    ///
    /// The request moves into the chain, so salt, size, and iterations are
    /// read from the outgoing query before dispatch. Two consequences:
    /// in-place query changes made by later filters never reach the
    /// metadata, and a malformed size or iteration count fails the call
    /// before the transport runs, so it wins over any transport error.
    fn filter(
        &self,
        request: ResourceDataRequest,
        chain: FilterChain<'_>,
    ) -> Result<ResourceDataResult, FilterError> {
        if request.action() == ResourceAction::Delete || !request.kind().is_api_key() {
            return chain.filter(request);
        }

        let is_collection = request.kind().is_collection();
        let add_criteria = request
            .uri()
            .query()
            .map_or(true, |query| !query.contains_key(ENCRYPT_SECRET));

        let request = if add_criteria {
            debug!(
                action = %request.action(),
                path = request.uri().absolute_path(),
                is_collection,
                "injecting encryption criteria"
            );
            self.add_encryption_criteria(request)?
        } else {
            request
        };

        // The request moves into the chain, so the envelope in effect is
        // resolved from the outgoing query here.
        let metadata = match request.uri().query() {
            Some(query)
                if add_criteria || query.get(ENCRYPT_SECRET).is_some_and(is_true) =>
            {
                Some(EncryptionMetadata::from_query(query, &self.config)?)
            }
            _ => None,
        };

        let mut result = chain.filter(request)?;

        if let Some(metadata) = metadata {
            if is_collection != is_collection_resource(result.data()) {
                warn!(is_collection, "api key payload shape does not match resource kind");
            }
            let decorated = add_encryption_metadata(&mut result, &metadata)?;
            debug!(decorated, "attached encryption metadata");
        }

        Ok(result)
    }

    fn name(&self) -> &'static str {
        "ApiKeyQueryFilter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::FilterPipeline;
    use crate::uri::CanonicalUri;
    use serde_json::json;
    use tracing_test::traced_test;

    struct FixedSalt(&'static str);

    impl SaltGenerator for FixedSalt {
        fn generate(&self) -> Result<String, FilterError> {
            Ok(self.0.to_string())
        }
    }

    struct NoEntropy;

    impl SaltGenerator for NoEntropy {
        fn generate(&self) -> Result<String, FilterError> {
            Err(FilterError::RandomnessFailure)
        }
    }

    fn fixed_filter() -> ApiKeyQueryFilter {
        ApiKeyQueryFilter::new().with_salt_generator(Arc::new(FixedSalt("s4lt")))
    }

    #[test]
    fn test_filter_query_adds_envelope_and_keeps_other_params() {
        let original: QueryString = [
            ("limit", "10"),
            ("encryptionKeySize", "512"),
            ("name", "ci"),
        ]
        .into_iter()
        .collect();

        let shaped = fixed_filter()
            .filter_query(&ResourceKind::ApiKeyList, Some(original))
            .unwrap()
            .unwrap();

        assert_eq!(
            shaped.to_string(),
            "encryptSecret=true&encryptionKeySize=128&encryptionKeyIterations=1024\
             &encryptionKeySalt=s4lt&limit=10&name=ci"
        );
    }

    #[test]
    fn test_filter_query_leaves_existing_flag_and_other_kinds() {
        let filter = fixed_filter();
        let flagged: QueryString = [("encryptSecret", "false")].into_iter().collect();

        let same = filter
            .filter_query(&ResourceKind::ApiKey, Some(flagged.clone()))
            .unwrap();
        assert_eq!(same, Some(flagged));

        let other = filter
            .filter_query(&ResourceKind::other("Account"), None)
            .unwrap();
        assert_eq!(other, None);

        let fresh = filter.filter_query(&ResourceKind::ApiKey, None).unwrap().unwrap();
        assert_eq!(fresh.len(), 4);
    }

    #[test]
    fn test_metadata_from_query_defaults_and_errors() {
        let config = EncryptionConfig::default();

        let bare: QueryString = [("encryptSecret", "true")].into_iter().collect();
        let meta = EncryptionMetadata::from_query(&bare, &config).unwrap();
        assert_eq!(meta.salt, None);
        assert_eq!((meta.size, meta.iterations), (128, 1024));

        let bad: QueryString = [("encryptSecret", "true"), ("encryptionKeyIterations", "lots")]
            .into_iter()
            .collect();
        let err = EncryptionMetadata::from_query(&bad, &config).unwrap_err();
        assert!(matches!(
            err,
            FilterError::MalformedParameter { name: "encryptionKeyIterations", .. }
        ));
    }

    #[test]
    fn test_numeric_params_are_unsigned_32_bit() {
        let config = EncryptionConfig::default();
        let query = |size: &str| -> QueryString {
            [("encryptSecret", "true"), ("encryptionKeySize", size)]
                .into_iter()
                .collect()
        };

        let large = EncryptionMetadata::from_query(&query("3000000000"), &config).unwrap();
        assert_eq!(large.size, 3_000_000_000);

        for rejected in ["-1", "4294967296", "12.5", ""] {
            assert!(
                matches!(
                    EncryptionMetadata::from_query(&query(rejected), &config),
                    Err(FilterError::MalformedParameter { name: "encryptionKeySize", .. })
                ),
                "{rejected:?} should be malformed"
            );
        }
    }

    /// Writes the default query, then tags it so its use can be observed.
    struct TaggingFactory;

    impl QueryStringFactory for TaggingFactory {
        fn create_query_string(&self, criteria: &Criteria) -> QueryString {
            let mut query = DefaultQueryStringFactory.create_query_string(criteria);
            query.put("factory", "tagging");
            query
        }
    }

    #[test]
    fn test_custom_query_string_factory_is_used() {
        let filter = fixed_filter().with_query_string_factory(Arc::new(TaggingFactory));

        // 1. Query-only shaping returns the factory's output.
        let shaped = filter
            .filter_query(&ResourceKind::ApiKey, None)
            .unwrap()
            .unwrap();
        assert_eq!(shaped.get("factory"), Some("tagging"));
        assert_eq!(shaped.get("encryptionKeySalt"), Some("s4lt"));

        // 2. The chain path sends the factory's output to the transport.
        let pipeline = FilterPipeline::builder().filter(filter).build(
            |request: ResourceDataRequest| -> Result<ResourceDataResult, FilterError> {
                let sent = request.uri().to_string();
                Ok(ResourceDataResult::from_value(json!({ "sent": sent })).unwrap())
            },
        );
        let request = ResourceDataRequest::new(
            ResourceAction::Read,
            CanonicalUri::new("/apiKeys/k1", None).unwrap(),
            ResourceKind::ApiKey,
            None,
        );
        let result = pipeline.execute(request).unwrap();

        assert_eq!(
            result.data()["sent"],
            json!(
                "/apiKeys/k1?encryptSecret=true&encryptionKeySize=128\
                 &encryptionKeyIterations=1024&encryptionKeySalt=s4lt&factory=tagging"
            )
        );
    }

    #[test]
    fn test_metadata_value_order() {
        let meta = EncryptionMetadata {
            salt: Some("abc".into()),
            size: 256,
            iterations: 2048,
        };
        assert_eq!(
            serde_json::to_string(&meta.to_value()).unwrap(),
            r#"{"encryptionKeySalt":"abc","encryptionKeySize":256,"encryptionKeyIterations":2048}"#
        );
    }

    #[test]
    fn test_collection_item_must_be_object() {
        let mut result =
            ResourceDataResult::from_value(json!({ "items": [{ "id": "k1" }, 7] })).unwrap();
        let meta = EncryptionMetadata {
            salt: None,
            size: 128,
            iterations: 1024,
        };
        assert!(matches!(
            add_encryption_metadata(&mut result, &meta),
            Err(FilterError::UnexpectedPayload(_))
        ));
    }

    #[test]
    fn test_salt_failure_aborts_before_dispatch() {
        let pipeline = FilterPipeline::builder()
            .filter(ApiKeyQueryFilter::new().with_salt_generator(Arc::new(NoEntropy)))
            .build(|_req: ResourceDataRequest| -> Result<ResourceDataResult, FilterError> {
                panic!("transport must not run without a salt")
            });

        let request = ResourceDataRequest::new(
            ResourceAction::Create,
            CanonicalUri::new("/accounts/a1/apiKeys", None).unwrap(),
            ResourceKind::ApiKey,
            None,
        );
        assert!(matches!(
            pipeline.execute(request),
            Err(FilterError::RandomnessFailure)
        ));
    }

    #[test]
    #[traced_test]
    fn test_salt_never_logged() {
        let filter = ApiKeyQueryFilter::new().with_salt_generator(Arc::new(FixedSalt(
            "do-not-log-this-salt",
        )));
        let pipeline = FilterPipeline::builder()
            .filter(filter)
            .build(|_req: ResourceDataRequest| -> Result<ResourceDataResult, FilterError> {
                Ok(ResourceDataResult::from_value(json!({ "id": "k1" })).unwrap())
            });

        let request = ResourceDataRequest::new(
            ResourceAction::Read,
            CanonicalUri::new("/apiKeys/k1", None).unwrap(),
            ResourceKind::ApiKey,
            None,
        );
        pipeline.execute(request).unwrap();

        assert!(logs_contain("injecting encryption criteria"));
        assert!(logs_contain("attached encryption metadata"));
        assert!(!logs_contain("do-not-log-this-salt"));
    }
}
