//! Request/response/error interceptor chains.
//!
//! Interceptors are ordered, synchronous transforms applied around each
//! logical request: request interceptors run once before the retry loop,
//! response interceptors on the successful response, error interceptors on
//! the final error. They are meant for cross-cutting concerns such as auth
//! header injection and logging, not for retry decisions.

use std::sync::Arc;

use crate::client::request::{RequestConfig, ServiceResponse};
use crate::error::Error;

/// A single interceptor. All hooks default to the identity transform, so an
/// implementation only overrides what it cares about.
pub trait Interceptor: Send + Sync {
    fn on_request(&self, request: RequestConfig) -> RequestConfig {
        request
    }

    fn on_response(&self, response: ServiceResponse) -> ServiceResponse {
        response
    }

    fn on_error(&self, error: Error) -> Error {
        error
    }
}

/// Ordered chain shared by a client.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self { interceptors }
    }

    pub fn apply_request(&self, mut request: RequestConfig) -> RequestConfig {
        for interceptor in &self.interceptors {
            request = interceptor.on_request(request);
        }
        request
    }

    pub fn apply_response(&self, mut response: ServiceResponse) -> ServiceResponse {
        for interceptor in &self.interceptors {
            response = interceptor.on_response(response);
        }
        response
    }

    pub fn apply_error(&self, mut error: Error) -> Error {
        for interceptor in &self.interceptors {
            error = interceptor.on_error(error);
        }
        error
    }
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain").field("len", &self.interceptors.len()).finish()
    }
}

/// Adds a fixed header to every outbound request. The typical use is a
/// static auth token shared by all calls to one downstream.
pub struct HeaderInterceptor {
    name: String,
    value: String,
}

impl HeaderInterceptor {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

impl Interceptor for HeaderInterceptor {
    fn on_request(&self, request: RequestConfig) -> RequestConfig {
        request.header(self.name.clone(), self.value.clone())
    }
}
