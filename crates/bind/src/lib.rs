//! Typed request handlers over `http` requests.
//!
//! A handler is a plain async function taking a [`Context`] and a request shape and
//! returning a reply:
//!
//! ```
//! use micro_bind::{typed_handler, Bind, Context, Reply, StatusError};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Default, Deserialize, Bind)]
//! struct Greet {
//!     #[bind(query = "name")]
//!     name: String,
//!     #[bind(header = "X-User-Age", default = "18")]
//!     age: u32,
//! }
//!
//! #[derive(Serialize, Reply)]
//! struct Greeting {
//!     data: String,
//! }
//!
//! async fn greet(_ctx: Context, req: Greet) -> Result<Greeting, StatusError> {
//!     if req.name.is_empty() {
//!         return Err(StatusError::BadRequest);
//!     }
//!     Ok(Greeting { data: format!("Hello {}, you're {} years old.", req.name, req.age) })
//! }
//!
//! let handler = typed_handler(greet).build().unwrap();
//! ```
//!
//! Compiling the handler extracts the binding schema of the request shape once; serving a
//! request then negotiates the response format, binds defaults, the body and the request
//! sources, calls the function and encodes the result or the error envelope.

extern crate self as micro_bind;

mod body;
mod context;
mod handler;
mod options;

pub mod binder;
pub mod container;
pub mod empty;
pub mod encoding;
pub mod error;
pub mod negotiate;
pub mod response;
pub mod router;
pub mod source;

pub use binder::{ArgumentsBinder, Bind, FieldBinder, FromSource, FromValue, Schema, Tag};
pub use body::ResponseBody;
pub use container::{Container, ContainerError};
pub use context::Context;
pub use empty::{EmptyCheck, Emptiness};
pub use encoding::{BodyFields, Decoder, Encoder, Format, JsonEncoding, XmlEncoding};
pub use error::{BindError, BoxError, ConversionError, HttpError, StatusError, ValueError, error};
pub use handler::{CompiledHandler, ErrorHandler, Handle, RequestHandler};
pub use negotiate::{NegotiationError, Negotiator};
pub use options::{HandlerBuilder, typed_handler};
pub use response::{CreatedResponse, Empty, Headerer, Reply, StatusCoder};
pub use router::Router;
pub use source::{PathParams, RemoteAddr, SourceGetter};

pub use micro_bind_macros::{Bind, Reply};
