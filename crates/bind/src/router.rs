//! Minimal method + path dispatch in front of compiled handlers.
//!
//! Paths use `matchit` syntax (`/users/{id}`); captured parameters are percent-decoded and
//! inserted into the request extensions as [`PathParams`] for the `path` binding tag. Unknown paths are
//! answered with `404 Not Found`, known paths with an unregistered method with
//! `405 Method Not Allowed` and an `Allow` header, both rendered as error envelopes.

use crate::body::ResponseBody;
use crate::encoding::{Encoder, Format, JsonEncoding};
use crate::error::{HttpError, StatusError};
use crate::handler::{RequestHandler, internal_server_error};
use crate::negotiate::Negotiator;
use crate::response::Empty;
use crate::source::PathParams;
use async_trait::async_trait;
use http::header::{ACCEPT, ALLOW, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method, Request, Response};
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{error, trace};

type InnerRouter<T> = matchit::Router<T>;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("route `{method} {path}` is registered twice")]
    DuplicateRoute { method: Method, path: String },

    #[error("invalid route `{path}`: {source}")]
    InvalidRoute {
        path: String,
        #[source]
        source: matchit::InsertError,
    },
}

pub struct Router<B> {
    inner_router: InnerRouter<Vec<RouterItem<B>>>,
    responder: ErrorResponder,
}

pub struct RouterItem<B> {
    method: Method,
    handler: Box<dyn RequestHandler<B>>,
}

pub struct RouteResult<'router, B> {
    router_items: &'router [RouterItem<B>],
    params: PathParams,
}

impl<B> Router<B> {
    pub fn builder() -> RouterBuilder<B> {
        RouterBuilder::new()
    }

    pub fn at(&self, path: &str) -> RouteResult<'_, B> {
        match self.inner_router.at(path) {
            Ok(matched) => {
                let params = matched
                    .params
                    .iter()
                    .map(|(key, value)| (key, percent_decode_str(value).decode_utf8_lossy().into_owned()))
                    .collect();
                RouteResult { router_items: matched.value.as_slice(), params }
            }
            Err(e) => {
                trace!(path, cause = %e, "no route matched");
                RouteResult { router_items: &[], params: PathParams::new() }
            }
        }
    }
}

impl<B: Send + 'static> Router<B> {
    /// Dispatches `req` to the handler registered for its method and path.
    pub async fn handle(&self, mut req: Request<B>) -> Response<ResponseBody> {
        let route = self.at(req.uri().path());
        if route.is_empty() {
            return self.responder.respond(req.headers(), StatusError::NotFound.into());
        }

        match route.router_items.iter().find(|item| item.method == *req.method()) {
            Some(item) => {
                req.extensions_mut().insert(route.params);
                item.handler.invoke(req).await
            }
            None => {
                let allow = route.allowed_methods().join(", ");
                let mut err = HttpError::from(StatusError::MethodNotAllowed);
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    err = err.with_header(ALLOW, value);
                }
                self.responder.respond(req.headers(), err)
            }
        }
    }
}

#[async_trait]
impl<B: Send + 'static> RequestHandler<B> for Router<B> {
    async fn invoke(&self, req: Request<B>) -> Response<ResponseBody> {
        self.handle(req).await
    }
}

impl<B> fmt::Debug for Router<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("responder", &self.responder).finish_non_exhaustive()
    }
}

impl<B> RouterItem<B> {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn handler(&self) -> &dyn RequestHandler<B> {
        self.handler.as_ref()
    }
}

impl<'router, B> RouteResult<'router, B> {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.router_items.is_empty()
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn router_items(&self) -> &'router [RouterItem<B>] {
        self.router_items
    }

    pub fn allowed_methods(&self) -> Vec<&'router str> {
        self.router_items.iter().map(|item| item.method.as_str()).collect()
    }
}

pub struct RouterBuilder<B> {
    data: HashMap<String, Vec<RouterItemBuilder<B>>>,
    responder: ErrorResponder,
}

impl<B> RouterBuilder<B> {
    fn new() -> Self {
        Self { data: HashMap::new(), responder: ErrorResponder::default() }
    }

    #[must_use]
    pub fn route(mut self, route: impl Into<String>, item_builder: RouterItemBuilder<B>) -> Self {
        self.data.entry(route.into()).or_default().push(item_builder);
        self
    }

    /// Renders routing errors in `format` as well, when accepted directly or through an alias.
    #[must_use]
    pub fn error_format<F: Format>(mut self, format: F, aliases: &[&str]) -> Self {
        self.responder.encoders.register(Format::mimetype(&format), Box::new(format), aliases);
        self
    }

    pub fn build(self) -> Result<Router<B>, RouterError> {
        let mut inner_router = InnerRouter::new();

        for (path, items) in self.data {
            let mut router_items: Vec<RouterItem<B>> = Vec::with_capacity(items.len());
            for item in items {
                if router_items.iter().any(|existing| existing.method == item.method) {
                    error!(method = %item.method, path, "duplicate route");
                    return Err(RouterError::DuplicateRoute { method: item.method, path });
                }
                router_items.push(item.build());
            }

            if let Err(source) = inner_router.insert(path.as_str(), router_items) {
                error!(path, cause = %source, "invalid route");
                return Err(RouterError::InvalidRoute { path, source });
            }
        }

        Ok(Router { inner_router, responder: self.responder })
    }
}

impl<B> fmt::Debug for RouterBuilder<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder").field("routes", &self.data.keys()).finish_non_exhaustive()
    }
}

macro_rules! method_route {
    ($name:ident, $method:ident) => {
        pub fn $name<B, H: RequestHandler<B> + 'static>(handler: H) -> RouterItemBuilder<B> {
            RouterItemBuilder { method: Method::$method, handler: Box::new(handler) }
        }
    };
}

method_route!(get, GET);
method_route!(post, POST);
method_route!(put, PUT);
method_route!(delete, DELETE);
method_route!(head, HEAD);
method_route!(options, OPTIONS);
method_route!(patch, PATCH);

pub struct RouterItemBuilder<B> {
    method: Method,
    handler: Box<dyn RequestHandler<B>>,
}

impl<B> RouterItemBuilder<B> {
    fn build(self) -> RouterItem<B> {
        RouterItem { method: self.method, handler: self.handler }
    }
}

impl<B> fmt::Debug for RouterItemBuilder<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterItemBuilder").field("method", &self.method).finish_non_exhaustive()
    }
}

/// Renders routing failures, which happen before any handler options are known.
struct ErrorResponder {
    encoders: Negotiator<Box<dyn Encoder<Empty>>>,
}

impl Default for ErrorResponder {
    fn default() -> Self {
        let mut encoders: Negotiator<Box<dyn Encoder<Empty>>> = Negotiator::new();
        encoders.register(Format::mimetype(&JsonEncoding), Box::new(JsonEncoding), &["*/*"]);
        Self { encoders }
    }
}

impl ErrorResponder {
    fn respond(&self, headers: &HeaderMap, err: HttpError) -> Response<ResponseBody> {
        let negotiated = headers
            .get(ACCEPT)
            .and_then(|accept| accept.to_str().ok())
            .and_then(|accept| self.encoders.get(accept).ok());
        let encoder: &dyn Encoder<Empty> = match negotiated {
            Some(encoder) => encoder.as_ref(),
            None => &JsonEncoding,
        };

        let bytes = match encoder.encode_error(&err) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(cause = %e, error = %err, "failed to encode routing error");
                return internal_server_error();
            }
        };

        let mut response = Response::new(ResponseBody::from(bytes));
        *response.status_mut() = err.status_code();
        let response_headers = response.headers_mut();
        response_headers.extend(err.headers().clone());
        if let Ok(value) = HeaderValue::from_str(&format!("{}; charset=utf-8", encoder.mimetype())) {
            response_headers.insert(CONTENT_TYPE, value);
        }
        response
    }
}

impl fmt::Debug for ErrorResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorResponder").field("encoders", &self.encoders).finish()
    }
}
