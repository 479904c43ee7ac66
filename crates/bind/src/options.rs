//! Registration-time configuration of typed handlers.
//!
//! [`typed_handler`] starts from the default options: JSON in and out, both also answering
//! for `*/*`, `application/json` as the default encoding, the global container and the
//! default error policy. [`HandlerBuilder::new`] starts with no codecs at all, so the named
//! options below fully describe the handler.

use crate::binder::{ArgumentsBinder, Bind, FieldBinder, Schema, Tag};
use crate::container::Container;
use crate::empty::EmptyCheck;
use crate::encoding::{Decoder, Encoder, Format, JsonEncoding, XmlEncoding};
use crate::error::{BindError, BoxError, HttpError};
use crate::handler::{CompiledHandler, ErrorHandler, Handle, default_error_handler};
use crate::negotiate::Negotiator;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

const DEFAULT_ENCODING: &str = "application/json";

/// Wraps `handler` with the default options.
///
/// # Example
/// ```
/// use micro_bind::{typed_handler, Context, Empty};
/// use std::convert::Infallible;
///
/// async fn ping(_ctx: Context, _req: Empty) -> Result<&'static str, Infallible> {
///     Ok("pong")
/// }
///
/// let handler = typed_handler(ping).build().unwrap();
/// ```
pub fn typed_handler<H, T>(handler: H) -> HandlerBuilder<H, T>
where
    H: Handle<T>,
    T: Bind + DeserializeOwned,
{
    HandlerBuilder::new(handler).accepts_json(&["*/*"]).outputs_json(&["*/*"])
}

/// Collects the options of one typed handler and compiles it.
pub struct HandlerBuilder<H, T>
where
    H: Handle<T>,
{
    handler: H,
    decoders: Negotiator<Box<dyn Decoder<T>>>,
    encoders: Negotiator<Box<dyn Encoder<H::Output>>>,
    default_encoding: String,
    container: Option<Arc<Container>>,
    error_handler: ErrorHandler,
}

impl<H, T> HandlerBuilder<H, T>
where
    H: Handle<T>,
    T: Bind + DeserializeOwned,
{
    /// A builder without any codec registered.
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            decoders: Negotiator::new(),
            encoders: Negotiator::new(),
            default_encoding: DEFAULT_ENCODING.to_owned(),
            container: None,
            error_handler: default_error_handler(),
        }
    }

    /// Decodes request bodies of the format's media type, and of every alias.
    #[must_use]
    pub fn accepts<F: Format>(mut self, format: F, aliases: &[&str]) -> Self {
        self.decoders.register(Format::mimetype(&format), Box::new(format), aliases);
        self
    }

    /// Encodes responses in the format's media type, when accepted directly or through an alias.
    #[must_use]
    pub fn outputs<F: Format>(mut self, format: F, aliases: &[&str]) -> Self {
        self.encoders.register(Format::mimetype(&format), Box::new(format), aliases);
        self
    }

    #[must_use]
    pub fn accepts_json(self, aliases: &[&str]) -> Self {
        self.accepts(JsonEncoding, aliases)
    }

    #[must_use]
    pub fn outputs_json(self, aliases: &[&str]) -> Self {
        self.outputs(JsonEncoding, aliases)
    }

    #[must_use]
    pub fn accepts_xml(self, aliases: &[&str]) -> Self {
        self.accepts(XmlEncoding, aliases)
    }

    #[must_use]
    pub fn outputs_xml(self, aliases: &[&str]) -> Self {
        self.outputs(XmlEncoding, aliases)
    }

    #[must_use]
    pub fn register_decoder<D>(mut self, mimetype: &str, decoder: D, aliases: &[&str]) -> Self
    where
        D: Decoder<T> + 'static,
    {
        self.decoders.register(mimetype, Box::new(decoder), aliases);
        self
    }

    #[must_use]
    pub fn register_encoder<E>(mut self, mimetype: &str, encoder: E, aliases: &[&str]) -> Self
    where
        E: Encoder<H::Output> + 'static,
    {
        self.encoders.register(mimetype, Box::new(encoder), aliases);
        self
    }

    /// The media type assumed for requests without `Accept` or `Content-Type`, and used to
    /// render errors when the `Accept` header cannot be satisfied.
    #[must_use]
    pub fn default_output_encoding(mut self, mimetype: &str) -> Self {
        mimetype.clone_into(&mut self.default_encoding);
        self
    }

    /// Uses `container` instead of a snapshot of [`Container::global`].
    #[must_use]
    pub fn with_container(mut self, container: impl Into<Arc<Container>>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Replaces the policy turning errors into the envelope sent to the client.
    #[must_use]
    pub fn with_error_handler<F>(mut self, error_handler: F) -> Self
    where
        F: Fn(BoxError) -> HttpError + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(error_handler);
        self
    }

    /// Compiles the binders of `T` and freezes the options.
    pub fn build(self) -> Result<CompiledHandler<H, T>, BindError> {
        let schema = Schema::<T>::of();
        let arguments = ArgumentsBinder::new(&schema)?;
        let defaults = if schema.has_tag(Tag::Default) { Some(FieldBinder::new(&schema, Tag::Default)?) } else { None };

        Ok(CompiledHandler {
            handler: self.handler,
            defaults,
            arguments,
            decoders: self.decoders,
            encoders: self.encoders,
            default_encoding: self.default_encoding,
            empty_check: EmptyCheck::new(),
            error_handler: self.error_handler,
            container: self.container.unwrap_or_else(Container::global),
        })
    }
}

impl<H, T> fmt::Debug for HandlerBuilder<H, T>
where
    H: Handle<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBuilder")
            .field("decoders", &self.decoders)
            .field("encoders", &self.encoders)
            .field("default_encoding", &self.default_encoding)
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}
