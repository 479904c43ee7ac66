//! Response shapes and the optional capabilities a response value may expose.
//!
//! A handler's success type implements [`Reply`]. Besides being serializable it may
//! advertise, per value:
//!
//! - a status code, through [`StatusCoder`]
//! - extra response headers, through [`Headerer`]
//! - that it carries no body at all, through [`Reply::EMPTINESS`]
//!
//! Most user types get these from `#[derive(Reply)]`.

use crate::binder::{Bind, Schema};
use crate::empty::Emptiness;
use http::header::LOCATION;
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A response value that chooses its own status code.
pub trait StatusCoder {
    fn status_code(&self) -> StatusCode;
}

/// A response value that contributes response headers.
pub trait Headerer {
    fn headers(&self) -> HeaderMap;
}

/// A value a handler may answer with.
pub trait Reply: Serialize + Send + 'static {
    /// How values of this type are classified as empty.
    const EMPTINESS: Emptiness = Emptiness::Never;

    /// Whether this particular value is empty, consulted for [`Emptiness::Nil`] and
    /// [`Emptiness::Zero`] types only.
    fn is_empty_value(&self) -> bool {
        false
    }

    fn status_coder(&self) -> Option<&dyn StatusCoder> {
        None
    }

    fn headerer(&self) -> Option<&dyn Headerer> {
        None
    }
}

impl Reply for () {
    const EMPTINESS: Emptiness = Emptiness::Nil;

    fn is_empty_value(&self) -> bool {
        true
    }
}

impl Reply for String {
    const EMPTINESS: Emptiness = Emptiness::Zero;

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl Reply for &'static str {
    const EMPTINESS: Emptiness = Emptiness::Zero;

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Reply> Reply for Option<T> {
    const EMPTINESS: Emptiness = Emptiness::Nil;

    /// `None`, or a marker value such as `Some(Empty)`.
    fn is_empty_value(&self) -> bool {
        match self {
            None => true,
            Some(value) => matches!(T::EMPTINESS, Emptiness::Marker) && value.is_empty_value(),
        }
    }

    fn status_coder(&self) -> Option<&dyn StatusCoder> {
        self.as_ref().and_then(T::status_coder)
    }

    fn headerer(&self) -> Option<&dyn Headerer> {
        self.as_ref().and_then(T::headerer)
    }
}

impl<T: Reply> Reply for Box<T> {
    const EMPTINESS: Emptiness = T::EMPTINESS;

    fn is_empty_value(&self) -> bool {
        (**self).is_empty_value()
    }

    fn status_coder(&self) -> Option<&dyn StatusCoder> {
        (**self).status_coder()
    }

    fn headerer(&self) -> Option<&dyn Headerer> {
        (**self).headerer()
    }
}

impl Reply for serde_json::Value {
    const EMPTINESS: Emptiness = Emptiness::Nil;

    fn is_empty_value(&self) -> bool {
        self.is_null()
    }
}

impl<T: Serialize + Send + 'static> Reply for Vec<T> {}

impl<K, V, S> Reply for HashMap<K, V, S>
where
    K: Serialize + Send + 'static,
    V: Serialize + Send + 'static,
    S: Send + 'static,
{
}

impl<K: Serialize + Send + 'static, V: Serialize + Send + 'static> Reply for BTreeMap<K, V> {}

macro_rules! impl_reply_never_empty {
    ($($ty:ty),* $(,)?) => {
        $(impl Reply for $ty {})*
    };
}

impl_reply_never_empty!(bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

/// Marker reply for handlers that never produce a body. Answered with `204 No Content`.
///
/// It also serves as the request shape of handlers that bind nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Empty;

impl Reply for Empty {
    const EMPTINESS: Emptiness = Emptiness::Marker;

    fn is_empty_value(&self) -> bool {
        true
    }

    fn status_coder(&self) -> Option<&dyn StatusCoder> {
        Some(self)
    }
}

impl StatusCoder for Empty {
    fn status_code(&self) -> StatusCode {
        StatusCode::NO_CONTENT
    }
}

impl<'de> Deserialize<'de> for Empty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer).map(|_| Empty)
    }
}

impl Bind for Empty {
    fn schema(_schema: &mut Schema<Self>) {}
}

/// Answers `201 Created` with a `Location` header and no body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedResponse {
    location: String,
}

impl CreatedResponse {
    pub fn new(location: impl Into<String>) -> Self {
        Self { location: location.into() }
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl Reply for CreatedResponse {
    const EMPTINESS: Emptiness = Emptiness::Marker;

    fn is_empty_value(&self) -> bool {
        true
    }

    fn status_coder(&self) -> Option<&dyn StatusCoder> {
        Some(self)
    }

    fn headerer(&self) -> Option<&dyn Headerer> {
        Some(self)
    }
}

impl StatusCoder for CreatedResponse {
    fn status_code(&self) -> StatusCode {
        StatusCode::CREATED
    }
}

impl Headerer for CreatedResponse {
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(1);
        // a location that is not a valid header value is dropped
        if let Ok(value) = HeaderValue::from_str(&self.location) {
            headers.insert(LOCATION, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_response_carries_status_and_location() {
        let created = CreatedResponse::new("/users/42");

        assert_eq!(created.status_coder().unwrap().status_code(), StatusCode::CREATED);
        assert_eq!(created.headerer().unwrap().headers().get(LOCATION).unwrap(), "/users/42");
        assert!(matches!(CreatedResponse::EMPTINESS, Emptiness::Marker));
    }

    #[test]
    fn option_delegates_capabilities_to_its_value() {
        let some = Some(CreatedResponse::new("/a"));
        let none: Option<CreatedResponse> = None;

        assert_eq!(some.status_coder().unwrap().status_code(), StatusCode::CREATED);
        assert!(none.status_coder().is_none());
        assert!(none.headerer().is_none());
    }

    #[test]
    fn option_of_a_marker_is_empty_when_present() {
        assert!(Some(Empty).is_empty_value());
        assert!(Some(CreatedResponse::new("/a")).is_empty_value());
        assert!(None::<Empty>.is_empty_value());
        assert!(!Some(String::new()).is_empty_value());
        assert!(!Some(0_u32).is_empty_value());
    }

    #[test]
    fn plain_values_have_no_capabilities() {
        assert!(42_u32.status_coder().is_none());
        assert!(String::from("x").headerer().is_none());
        assert!(matches!(<Vec<u8> as Reply>::EMPTINESS, Emptiness::Never));
    }

    #[test]
    fn empty_accepts_any_body() {
        let empty: Empty = serde_json::from_str(r#"{"ignored":[1,2,3]}"#).unwrap();
        assert_eq!(empty, Empty);
        assert_eq!(Empty.status_coder().unwrap().status_code(), StatusCode::NO_CONTENT);
    }
}
