//! The typed handler adapter.
//!
//! A [`CompiledHandler`] turns an `async fn(Context, T) -> Result<O, E>` into a
//! [`RequestHandler`]. Every request walks the same states, in order:
//!
//! ```text
//! negotiate encoder -> defaults -> body? (+ defaults it left out) -> request sources -> invoke -> encode result | encode error
//! ```
//!
//! Everything the walk needs (binders, negotiation registries, the empty check, the error
//! policy and the container) is compiled once by [`HandlerBuilder`](crate::HandlerBuilder)
//! and only read afterwards.

use crate::binder::{ArgumentsBinder, Bind, FieldBinder};
use crate::body::ResponseBody;
use crate::container::Container;
use crate::context::Context;
use crate::empty::EmptyCheck;
use crate::encoding::{Decoder, Encoder, JsonEncoding};
use crate::error::{BoxError, HttpError, StatusError, error};
use crate::negotiate::Negotiator;
use crate::response::Reply;
use crate::source::DefaultSource;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use http::request::Parts;
use http::{HeaderMap, HeaderValue, Request, Response, StatusCode};
use http_body::Body;
use http_body_util::BodyExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

/// An object-safe request handler, the unit the router dispatches to.
#[async_trait]
pub trait RequestHandler<B>: Send + Sync {
    async fn invoke(&self, req: Request<B>) -> Response<ResponseBody>;
}

/// A typed handler function: `async fn(Context, T) -> Result<O, E>`.
///
/// The error converts into an [`HttpError`]: a [`StatusError`], an envelope, a boxed error, or
/// any error implementing [`StatusCoder`](crate::StatusCoder), which keeps its own status.
pub trait Handle<T>: Send + Sync + 'static {
    type Output: Reply;
    type Error: Into<HttpError>;

    fn call(&self, ctx: Context, request: T) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

impl<Func, Fut, T, O, E> Handle<T> for Func
where
    Func: Fn(Context, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, E>> + Send,
    O: Reply,
    E: Into<HttpError>,
{
    type Output = O;
    type Error = E;

    #[inline]
    fn call(&self, ctx: Context, request: T) -> impl Future<Output = Result<O, E>> + Send {
        (self)(ctx, request)
    }
}

/// Maps any handler or adapter error into the envelope that is sent to the client.
pub type ErrorHandler = Arc<dyn Fn(BoxError) -> HttpError + Send + Sync>;

pub(crate) fn default_error_handler() -> ErrorHandler {
    Arc::new(|err| error(err, StatusCode::INTERNAL_SERVER_ERROR))
}

/// A typed handler compiled together with everything needed to serve it.
pub struct CompiledHandler<H, T>
where
    H: Handle<T>,
{
    pub(crate) handler: H,
    pub(crate) defaults: Option<FieldBinder<T>>,
    pub(crate) arguments: ArgumentsBinder<T>,
    pub(crate) decoders: Negotiator<Box<dyn Decoder<T>>>,
    pub(crate) encoders: Negotiator<Box<dyn Encoder<H::Output>>>,
    pub(crate) default_encoding: String,
    pub(crate) empty_check: EmptyCheck<H::Output>,
    pub(crate) error_handler: ErrorHandler,
    pub(crate) container: Arc<Container>,
}

impl<H, T> CompiledHandler<H, T>
where
    H: Handle<T>,
    T: Bind,
{
    /// Serves one request.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<ResponseBody>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();

        let encoder = match self.negotiate_encoder(&parts.headers) {
            Some(encoder) => encoder,
            None => {
                debug!(accept = ?parts.headers.get(ACCEPT), "no acceptable response media type");
                return self.encode_error(self.fallback_encoder(), StatusError::NotAcceptable.into());
            }
        };

        match self.bind_request(&parts, body).await {
            Ok(request) => {
                let ctx = self.context(&parts);
                match self.handler.call(ctx, request).await {
                    Ok(value) => self.encode_success(encoder, &value),
                    Err(err) => self.encode_error(encoder, handler_error(err.into())),
                }
            }
            Err(err) => self.encode_error(encoder, err),
        }
    }

    fn negotiate_encoder(&self, headers: &HeaderMap) -> Option<&dyn Encoder<H::Output>> {
        let accept = header_str(headers, &ACCEPT).unwrap_or(&self.default_encoding);
        self.encoders.get(accept).ok().map(|encoder| encoder.as_ref())
    }

    /// The encoder of the default encoding, or plain JSON when none is registered.
    fn fallback_encoder(&self) -> &dyn Encoder<H::Output> {
        match self.encoders.lookup(&self.default_encoding) {
            Some(encoder) => encoder.as_ref(),
            None => &JsonEncoding,
        }
    }

    async fn bind_request<B>(&self, parts: &Parts, body: B) -> Result<T, BoxError>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let mut request = T::default();

        if let Some(defaults) = &self.defaults {
            defaults.bind(&DefaultSource, &mut request).map_err(|e| error(e, StatusCode::BAD_REQUEST))?;
        }

        if declared_length(&parts.headers, &body) > 0 {
            let content_type = header_str(&parts.headers, &CONTENT_TYPE).unwrap_or(&self.default_encoding);
            let decoder = self.decoders.get(content_type).map_err(|e| {
                debug!(cause = %e, "unsupported request media type");
                error(StatusError::UnsupportedMediaType, None)
            })?;

            let bytes = body.collect().await.map_err(|e| error(e, StatusCode::BAD_REQUEST))?.to_bytes();
            request = decoder.decode(&bytes).map_err(|e| {
                debug!(cause = %e, "failed to decode request body");
                error(e, StatusCode::BAD_REQUEST)
            })?;

            // decoding replaced the whole value, restore the defaults the body left out
            if let Some(defaults) = &self.defaults {
                match decoder.fields(&bytes) {
                    Ok(supplied) => defaults
                        .bind_unsupplied(&DefaultSource, &mut request, &supplied)
                        .map_err(|e| error(e, StatusCode::BAD_REQUEST))?,
                    Err(e) => trace!(cause = %e, "request body has no members, defaults stay decoded"),
                }
            }
        }

        self.arguments.bind(parts, &mut request).map_err(|e| {
            debug!(cause = %e, "failed to bind request");
            error(e, StatusCode::BAD_REQUEST)
        })?;

        Ok(request)
    }

    fn context(&self, parts: &Parts) -> Context {
        let cancellation = parts.extensions.get::<CancellationToken>().cloned().unwrap_or_default();
        Context::new(cancellation, Arc::clone(&self.container))
    }

    fn encode_success(&self, encoder: &dyn Encoder<H::Output>, value: &H::Output) -> Response<ResponseBody> {
        let mut headers = HeaderMap::new();
        if let Some(headerer) = value.headerer() {
            headers.extend(headerer.headers());
        }
        let status = value.status_coder().map(|coder| coder.status_code());

        if self.empty_check.is_empty(value) {
            return respond(status.unwrap_or(StatusCode::NO_CONTENT), headers, ResponseBody::empty());
        }

        match encoder.encode(value) {
            Ok(bytes) => {
                set_content_type(&mut headers, encoder.mimetype());
                respond(status.unwrap_or(StatusCode::OK), headers, bytes.into())
            }
            Err(e) => {
                error!(cause = %e, mimetype = encoder.mimetype(), "failed to encode response");
                internal_server_error()
            }
        }
    }

    fn encode_error(&self, encoder: &dyn Encoder<H::Output>, err: BoxError) -> Response<ResponseBody> {
        let err = (self.error_handler)(err);
        let mut headers = err.headers().clone();

        match encoder.encode_error(&err) {
            Ok(bytes) => {
                set_content_type(&mut headers, encoder.mimetype());
                respond(err.status_code(), headers, bytes.into())
            }
            Err(e) => {
                error!(cause = %e, error = %err, mimetype = encoder.mimetype(), "failed to encode error response");
                internal_server_error()
            }
        }
    }
}

#[async_trait]
impl<H, T, B> RequestHandler<B> for CompiledHandler<H, T>
where
    H: Handle<T>,
    T: Bind,
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    async fn invoke(&self, req: Request<B>) -> Response<ResponseBody> {
        self.handle(req).await
    }
}

impl<H, T> fmt::Debug for CompiledHandler<H, T>
where
    H: Handle<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledHandler")
            .field("request", &std::any::type_name::<T>())
            .field("response", &std::any::type_name::<H::Output>())
            .field("arguments", &self.arguments)
            .field("decoders", &self.decoders)
            .field("encoders", &self.encoders)
            .field("default_encoding", &self.default_encoding)
            .finish_non_exhaustive()
    }
}

/// Errors that carry a status keep their envelope, the rest are left to the error handler.
fn handler_error(err: HttpError) -> BoxError {
    if err.has_status() { Box::new(err) } else { err.into_inner() }
}

/// A non-empty header value, absent when missing or not visible ASCII.
fn header_str<'h>(headers: &'h HeaderMap, name: &http::HeaderName) -> Option<&'h str> {
    headers.get(name).and_then(|value| value.to_str().ok()).filter(|value| !value.trim().is_empty())
}

fn declared_length<B: Body>(headers: &HeaderMap, body: &B) -> u64 {
    match headers.get(CONTENT_LENGTH) {
        Some(value) => value.to_str().ok().and_then(|value| value.trim().parse().ok()).unwrap_or(0),
        None => body.size_hint().exact().unwrap_or(0),
    }
}

fn set_content_type(headers: &mut HeaderMap, mimetype: &str) {
    if headers.contains_key(CONTENT_TYPE) {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{mimetype}; charset=utf-8")) {
        headers.insert(CONTENT_TYPE, value);
    }
}

fn respond(status: StatusCode, headers: HeaderMap, body: ResponseBody) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

pub(crate) fn internal_server_error() -> Response<ResponseBody> {
    let mut headers = HeaderMap::with_capacity(1);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    respond(StatusCode::INTERNAL_SERVER_ERROR, headers, ResponseBody::from(StatusError::InternalServerError.message()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::Schema;
    use crate::options::{HandlerBuilder, typed_handler};
    use crate::response::{CreatedResponse, Empty, Headerer, StatusCoder};
    use http_body_util::Full;
    use serde::{Deserialize, Serialize};
    use std::convert::Infallible;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Greet {
        name: String,
        age: u32,
    }

    impl Bind for Greet {
        fn schema(schema: &mut Schema<Self>) {
            schema.field("name", |g| &mut g.name).query("name");
            schema.field("age", |g| &mut g.age).header("X-User-Age").default("18");
        }
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename = "greeting")]
    struct Greeting {
        data: String,
    }

    impl Reply for Greeting {}

    async fn greet(_ctx: Context, req: Greet) -> Result<Greeting, StatusError> {
        if req.name.is_empty() {
            return Err(StatusError::BadRequest);
        }
        Ok(Greeting { data: format!("Hello {}, you're {} years old.", req.name, req.age) })
    }

    fn request(uri: &str) -> http::request::Builder {
        Request::builder().uri(uri)
    }

    fn empty_body() -> Full<Bytes> {
        Full::new(Bytes::new())
    }

    async fn body_of(response: Response<ResponseBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn content_type(response: &Response<ResponseBody>) -> Option<&str> {
        response.headers().get(CONTENT_TYPE).map(|value| value.to_str().unwrap())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn binds_query_header_and_encodes_json() {
        let handler = typed_handler(greet).build().unwrap();
        let req = request("/greet?name=Ada").header("X-User-Age", "30").body(empty_body()).unwrap();

        let response = handler.invoke(req).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), Some("application/json; charset=utf-8"));
        assert_eq!(body_of(response).await, r#"{"data":"Hello Ada, you're 30 years old."}"#);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn handler_errors_use_the_envelope() {
        let handler = typed_handler(greet).build().unwrap();
        let req = request("/greet?name=").header("X-User-Age", "30").body(empty_body()).unwrap();

        let response = handler.invoke(req).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(response).await, r#"{"message":"Bad Request"}"#);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn defaults_apply_when_the_header_is_missing() {
        let handler = typed_handler(greet).build().unwrap();
        let response = handler.invoke(request("/greet?name=Bob").body(empty_body()).unwrap()).await;

        assert_eq!(body_of(response).await, r#"{"data":"Hello Bob, you're 18 years old."}"#);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn conversion_failures_are_bad_requests() {
        let handler = typed_handler(greet).build().unwrap();
        let req = request("/greet?name=Ada").header("X-User-Age", "thirty").body(empty_body()).unwrap();

        let response = handler.invoke(req).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_of(response).await.contains("X-User-Age"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn unknown_accept_is_not_acceptable() {
        let handler = HandlerBuilder::new(greet).outputs_json(&[]).build().unwrap();
        let req = request("/greet?name=Ada").header(ACCEPT, "application/octet-stream").body(empty_body()).unwrap();

        let response = handler.invoke(req).await;

        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(content_type(&response), Some("application/json; charset=utf-8"));
        assert_eq!(body_of(response).await, r#"{"message":"Not Acceptable"}"#);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn accept_picks_the_first_listed_encoding() {
        let handler = typed_handler(greet).outputs_xml(&[]).build().unwrap();
        let req = request("/greet?name=Ada")
            .header(ACCEPT, "application/xml;q=0.1, application/json")
            .body(empty_body())
            .unwrap();

        let response = handler.invoke(req).await;

        assert_eq!(content_type(&response), Some("application/xml; charset=utf-8"));
        let body = body_of(response).await;
        assert!(body.starts_with("<greeting><data>Hello Ada"));
        assert!(body.ends_with("</data></greeting>"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn body_is_decoded_and_request_sources_override_it() {
        let handler = typed_handler(greet).build().unwrap();
        let payload = r#"{"name":"Body","age":41}"#;
        let req = request("/greet")
            .method("POST")
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, payload.len())
            .body(Full::new(Bytes::from_static(payload.as_bytes())))
            .unwrap();
        assert_eq!(body_of(handler.invoke(req).await).await, r#"{"data":"Hello Body, you're 41 years old."}"#);

        let req = request("/greet?name=Query")
            .method("POST")
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from_static(payload.as_bytes())))
            .unwrap();
        assert_eq!(body_of(handler.invoke(req).await).await, r#"{"data":"Hello Query, you're 41 years old."}"#);
    }

    fn post_json(payload: &'static str) -> Request<Full<Bytes>> {
        request("/greet")
            .method("POST")
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from_static(payload.as_bytes())))
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn defaults_fill_members_the_body_leaves_out() {
        let handler = typed_handler(greet).build().unwrap();

        let response = handler.invoke(post_json(r#"{"name":"Ann"}"#)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, r#"{"data":"Hello Ann, you're 18 years old."}"#);

        let response = handler.invoke(post_json(r#"{"name":"Ann","age":0}"#)).await;
        assert_eq!(body_of(response).await, r#"{"data":"Hello Ann, you're 0 years old."}"#);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn defaults_fill_members_an_xml_body_leaves_out() {
        let handler = typed_handler(greet).accepts_xml(&[]).build().unwrap();
        let req = request("/greet")
            .method("POST")
            .header(CONTENT_TYPE, "application/xml")
            .body(Full::new(Bytes::from_static(b"<greet><name>Ann</name></greet>")))
            .unwrap();

        let response = handler.invoke(req).await;
        assert_eq!(body_of(response).await, r#"{"data":"Hello Ann, you're 18 years old."}"#);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn unsupported_and_malformed_bodies() {
        let handler = typed_handler(greet).build().unwrap();

        let req = request("/greet")
            .method("POST")
            .header(CONTENT_TYPE, "text/plain")
            .body(Full::new(Bytes::from_static(b"name=Ada")))
            .unwrap();
        assert_eq!(handler.invoke(req).await.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let req = request("/greet")
            .method("POST")
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from_static(b"{broken")))
            .unwrap();
        assert_eq!(handler.invoke(req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn nil_results_have_no_body() {
        async fn lookup(_ctx: Context, _req: Empty) -> Result<Option<Greeting>, Infallible> {
            Ok(None)
        }

        let handler = typed_handler(lookup).build().unwrap();
        let response = handler.invoke(request("/").body(empty_body()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(content_type(&response).is_none());
        assert_eq!(body_of(response).await, "");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn present_markers_have_no_body() {
        async fn forget(_ctx: Context, _req: Empty) -> Result<Option<Empty>, Infallible> {
            Ok(Some(Empty))
        }

        let handler = typed_handler(forget).build().unwrap();
        let response = handler.invoke(request("/").body(empty_body()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(content_type(&response).is_none());
        assert_eq!(body_of(response).await, "");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn zero_values_are_still_encoded() {
        #[derive(Serialize, Default)]
        struct Counter {
            count: u32,
        }
        impl Reply for Counter {}

        async fn count(_ctx: Context, _req: Empty) -> Result<Counter, Infallible> {
            Ok(Counter::default())
        }

        let handler = typed_handler(count).build().unwrap();
        let response = handler.invoke(request("/").body(empty_body()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, r#"{"count":0}"#);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn created_response_sets_status_and_location() {
        async fn create(_ctx: Context, _req: Empty) -> Result<CreatedResponse, Infallible> {
            Ok(CreatedResponse::new("/users/1"))
        }

        let handler = typed_handler(create).build().unwrap();
        let response = handler.invoke(request("/users").method("POST").body(empty_body()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get(http::header::LOCATION).unwrap(), "/users/1");
        assert_eq!(body_of(response).await, "");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn status_and_headers_capabilities_are_applied() {
        #[derive(Serialize)]
        struct Accepted {
            id: u32,
        }
        impl Reply for Accepted {
            fn status_coder(&self) -> Option<&dyn StatusCoder> {
                Some(self)
            }
            fn headerer(&self) -> Option<&dyn Headerer> {
                Some(self)
            }
        }
        impl StatusCoder for Accepted {
            fn status_code(&self) -> StatusCode {
                StatusCode::ACCEPTED
            }
        }
        impl Headerer for Accepted {
            fn headers(&self) -> HeaderMap {
                let mut headers = HeaderMap::new();
                headers.insert("x-job-id", HeaderValue::from(self.id));
                headers
            }
        }

        async fn enqueue(_ctx: Context, _req: Empty) -> Result<Accepted, Infallible> {
            Ok(Accepted { id: 9 })
        }

        let handler = typed_handler(enqueue).build().unwrap();
        let response = handler.invoke(request("/jobs").body(empty_body()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers().get("x-job-id").unwrap(), "9");
        assert_eq!(body_of(response).await, r#"{"id":9}"#);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn plain_errors_are_internal_server_errors() {
        async fn fail(_ctx: Context, _req: Empty) -> Result<Greeting, std::io::Error> {
            Err(std::io::Error::other("disk on fire"))
        }

        let handler = typed_handler(fail).build().unwrap();
        let response = handler.invoke(request("/").body(empty_body()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await, r#"{"message":"disk on fire"}"#);
    }

    #[derive(Debug, thiserror::Error)]
    #[error("member `{0}` already exists")]
    struct Conflict(String);

    impl StatusCoder for Conflict {
        fn status_code(&self) -> StatusCode {
            StatusCode::CONFLICT
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn handler_errors_keep_their_own_status() {
        async fn join(_ctx: Context, req: Greet) -> Result<Greeting, Conflict> {
            Err(Conflict(req.name))
        }

        let handler = typed_handler(join).build().unwrap();
        let response = handler.invoke(request("/members?name=ann").body(empty_body()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(content_type(&response), Some("application/json; charset=utf-8"));
        assert_eq!(body_of(response).await, r#"{"message":"member `ann` already exists"}"#);

        let handler = typed_handler(join).with_error_handler(|err| error(err, StatusCode::SERVICE_UNAVAILABLE)).build().unwrap();
        let response = handler.invoke(request("/members?name=ann").body(empty_body()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn unencodable_results_fall_back_to_plain_text() {
        struct Unencodable;

        impl Serialize for Unencodable {
            fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("cannot encode"))
            }
        }

        impl Reply for Unencodable {}

        async fn broken(_ctx: Context, _req: Empty) -> Result<Unencodable, Infallible> {
            Ok(Unencodable)
        }

        let handler = typed_handler(broken).build().unwrap();
        let response = handler.invoke(request("/").body(empty_body()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(content_type(&response), Some("text/plain; charset=utf-8"));
        assert_eq!(body_of(response).await, "Internal Server Error");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn context_carries_the_inbound_cancellation_token() {
        async fn cancelled(ctx: Context, _req: Empty) -> Result<bool, Infallible> {
            Ok(ctx.is_cancelled())
        }

        let handler = typed_handler(cancelled).build().unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let mut req = request("/").body(empty_body()).unwrap();
        req.extensions_mut().insert(token);

        assert_eq!(body_of(handler.invoke(req).await).await, "true");
        assert_eq!(body_of(handler.invoke(request("/").body(empty_body()).unwrap()).await).await, "false");
    }
}
