//! Request and result envelopes passed through the filter chain.

use std::fmt;

use serde_json::{Map, Value};

use crate::uri::{CanonicalUri, QueryString};

/// A decoded JSON object payload.
pub type ResourceData = Map<String, Value>;

/// Property holding the members of a collection payload.
pub const ITEMS_PROPERTY_NAME: &str = "items";

/// Returns true if `data` is shaped like a collection resource: it has an
/// `items` property holding an array.
pub fn is_collection_resource(data: &ResourceData) -> bool {
    matches!(data.get(ITEMS_PROPERTY_NAME), Some(Value::Array(_)))
}

/// What the caller wants done to the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceAction {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for ResourceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// The target resource kind, resolved once when the request is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A single API key.
    ApiKey,
    /// A collection of API keys.
    ApiKeyList,
    /// Any other resource, named for diagnostics only.
    Other(String),
}

impl ResourceKind {
    pub fn other(name: impl Into<String>) -> Self {
        Self::Other(name.into())
    }

    /// Returns true for `ApiKey` and `ApiKeyList`.
    pub fn is_api_key(&self) -> bool {
        matches!(self, Self::ApiKey | Self::ApiKeyList)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::ApiKeyList)
    }
}

/// An outgoing resource call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDataRequest {
    action: ResourceAction,
    uri: CanonicalUri,
    kind: ResourceKind,
    data: Option<ResourceData>,
}

impl ResourceDataRequest {
    pub fn new(
        action: ResourceAction,
        uri: CanonicalUri,
        kind: ResourceKind,
        data: Option<ResourceData>,
    ) -> Self {
        Self {
            action,
            uri,
            kind,
            data,
        }
    }

    pub fn action(&self) -> ResourceAction {
        self.action
    }

    pub fn uri(&self) -> &CanonicalUri {
        &self.uri
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn data(&self) -> Option<&ResourceData> {
        self.data.as_ref()
    }

    /// In-place access to an existing query. `None` when the URI has no
    /// query; supply one with [`ResourceDataRequest::with_uri`].
    pub fn query_mut(&mut self) -> Option<&mut QueryString> {
        self.uri.query_mut()
    }

    /// The same request aimed at a different URI.
    pub fn with_uri(self, uri: CanonicalUri) -> Self {
        Self { uri, ..self }
    }
}

/// The decoded payload returned by the rest of the chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceDataResult {
    data: ResourceData,
}

impl ResourceDataResult {
    pub fn new(data: ResourceData) -> Self {
        Self { data }
    }

    /// Build a result from a JSON value. Non-object values yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(data) => Some(Self::new(data)),
            _ => None,
        }
    }

    pub fn data(&self) -> &ResourceData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ResourceData {
        &mut self.data
    }
}
