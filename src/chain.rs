//! Chain-of-responsibility execution.
//!
//! A [`FilterPipeline`] owns an ordered list of filters and a terminal
//! handler. Running a request hands it to the first filter together with a
//! [`FilterChain`] over the rest. A filter may rewrite the request, call
//! `chain.filter(..)` to continue, inspect or rewrite the result on the way
//! back, or return without continuing to short-circuit.
//!
//! The engine has no knowledge of which filters exist. Order is whatever the
//! builder was given.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::FilterError;
use crate::request::{ResourceDataRequest, ResourceDataResult};

/// One stage of the pipeline.
pub trait Filter: Send + Sync {
    fn filter(
        &self,
        request: ResourceDataRequest,
        chain: FilterChain<'_>,
    ) -> Result<ResourceDataResult, FilterError>;

    /// Name used in diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// The end of the chain, normally the transport that performs the call.
pub trait ResourceHandler: Send + Sync {
    fn handle(&self, request: ResourceDataRequest) -> Result<ResourceDataResult, FilterError>;
}

impl<F> ResourceHandler for F
where
    F: Fn(ResourceDataRequest) -> Result<ResourceDataResult, FilterError> + Send + Sync,
{
    fn handle(&self, request: ResourceDataRequest) -> Result<ResourceDataResult, FilterError> {
        self(request)
    }
}

/// The remainder of a pipeline, as seen from inside a filter.
#[derive(Clone, Copy)]
pub struct FilterChain<'a> {
    filters: &'a [Arc<dyn Filter>],
    terminal: &'a dyn ResourceHandler,
}

impl<'a> FilterChain<'a> {
    pub fn new(filters: &'a [Arc<dyn Filter>], terminal: &'a dyn ResourceHandler) -> Self {
        Self { filters, terminal }
    }

    /// Continue with the next filter, or the terminal handler once every
    /// filter has run.
    pub fn filter(self, request: ResourceDataRequest) -> Result<ResourceDataResult, FilterError> {
        match self.filters.split_first() {
            Some((head, rest)) => {
                trace!(filter = head.name(), remaining = rest.len(), "invoking filter");
                head.filter(request, FilterChain::new(rest, self.terminal))
            }
            None => {
                debug!(
                    action = %request.action(),
                    path = request.uri().absolute_path(),
                    "dispatching to terminal handler"
                );
                self.terminal.handle(request)
            }
        }
    }
}

impl fmt::Debug for FilterChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("remaining", &self.filters.len())
            .finish()
    }
}

/// An ordered filter list bound to a terminal handler.
///
/// Holds no per-call state; one pipeline may serve any number of
/// concurrent callers.
#[derive(Clone)]
pub struct FilterPipeline {
    filters: Vec<Arc<dyn Filter>>,
    terminal: Arc<dyn ResourceHandler>,
}

impl FilterPipeline {
    pub fn builder() -> FilterPipelineBuilder {
        FilterPipelineBuilder::default()
    }

    /// Run `request` through every filter and the terminal handler.
    pub fn execute(
        &self,
        request: ResourceDataRequest,
    ) -> Result<ResourceDataResult, FilterError> {
        FilterChain::new(&self.filters, self.terminal.as_ref()).filter(request)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterPipeline")
            .field(
                "filters",
                &self.filters.iter().map(|filter| filter.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Collects filters in declaration order.
#[derive(Default)]
pub struct FilterPipelineBuilder {
    filters: Vec<Arc<dyn Filter>>,
}

impl FilterPipelineBuilder {
    pub fn filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Add a filter that is shared with other pipelines.
    pub fn shared_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn build(self, terminal: impl ResourceHandler + 'static) -> FilterPipeline {
        FilterPipeline {
            filters: self.filters,
            terminal: Arc::new(terminal),
        }
    }
}
