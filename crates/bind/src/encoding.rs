//! Body formats used to decode request payloads and encode responses.
//!
//! A [`Format`] is a serde data format bound to one media type. Handlers work with the
//! object-safe [`Decoder`] and [`Encoder`] views of it, fixed to their request and response
//! types, so the negotiation registries can hold formats of different kinds side by side.

use crate::error::{BoxError, HttpError};
use bytes::Bytes;
use serde::de::{DeserializeOwned, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A serde-backed body format.
pub trait Format: Send + Sync + 'static {
    /// The canonical media type, without parameters.
    fn mimetype(&self) -> &'static str;

    fn serialize<V: Serialize + ?Sized>(&self, value: &V) -> Result<Bytes, BoxError>;

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, BoxError>;

    /// The top-level members of a payload, without decoding their values.
    fn fields(&self, bytes: &[u8]) -> Result<BodyFields, BoxError> {
        self.deserialize(bytes)
    }
}

/// Names of the top-level members a request body supplied.
///
/// XML attributes are listed with their `@` prefix, the way serde sees them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyFields(HashSet<String>);

impl BodyFields {
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for BodyFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MembersVisitor;

        impl<'de> Visitor<'de> for MembersVisitor {
            type Value = BodyFields;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of members")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<BodyFields, A::Error> {
                let mut names = HashSet::new();
                while let Some(name) = map.next_key::<String>()? {
                    map.next_value::<IgnoredAny>()?;
                    names.insert(name);
                }
                Ok(BodyFields(names))
            }
        }

        deserializer.deserialize_map(MembersVisitor)
    }
}

/// `application/json` through `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoding;

impl Format for JsonEncoding {
    fn mimetype(&self) -> &'static str {
        "application/json"
    }

    fn serialize<V: Serialize + ?Sized>(&self, value: &V) -> Result<Bytes, BoxError> {
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, BoxError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// `application/xml` through the serde support of `quick-xml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlEncoding;

impl Format for XmlEncoding {
    fn mimetype(&self) -> &'static str {
        "application/xml"
    }

    fn serialize<V: Serialize + ?Sized>(&self, value: &V) -> Result<Bytes, BoxError> {
        Ok(Bytes::from(quick_xml::se::to_string(value)?))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, BoxError> {
        let text = std::str::from_utf8(bytes)?;
        Ok(quick_xml::de::from_str(text)?)
    }
}

/// Writes responses of type `O`, and error envelopes, in one media type.
pub trait Encoder<O>: Send + Sync {
    fn mimetype(&self) -> &'static str;

    fn encode(&self, value: &O) -> Result<Bytes, BoxError>;

    fn encode_error(&self, error: &HttpError) -> Result<Bytes, BoxError>;
}

impl<O: Serialize, F: Format> Encoder<O> for F {
    fn mimetype(&self) -> &'static str {
        Format::mimetype(self)
    }

    fn encode(&self, value: &O) -> Result<Bytes, BoxError> {
        self.serialize(value)
    }

    fn encode_error(&self, error: &HttpError) -> Result<Bytes, BoxError> {
        self.serialize(error)
    }
}

/// Reads request payloads of type `T` in one media type.
pub trait Decoder<T>: Send + Sync {
    fn mimetype(&self) -> &'static str;

    fn decode(&self, bytes: &[u8]) -> Result<T, BoxError>;

    /// The top-level members the payload supplied, see [`BodyFields`].
    fn fields(&self, bytes: &[u8]) -> Result<BodyFields, BoxError>;
}

impl<T: DeserializeOwned, F: Format> Decoder<T> for F {
    fn mimetype(&self) -> &'static str {
        Format::mimetype(self)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, BoxError> {
        self.deserialize(bytes)
    }

    fn fields(&self, bytes: &[u8]) -> Result<BodyFields, BoxError> {
        Format::fields(self, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatusError;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename = "greeting")]
    struct Greeting {
        data: String,
    }

    #[test]
    fn json_round_trips_through_the_object_safe_views() {
        let encoder: &dyn Encoder<Greeting> = &JsonEncoding;
        let decoder: &dyn Decoder<Greeting> = &JsonEncoding;

        let bytes = encoder.encode(&Greeting { data: "hi".into() }).unwrap();
        assert_eq!(bytes, Bytes::from_static(br#"{"data":"hi"}"#));
        assert_eq!(decoder.decode(&bytes).unwrap(), Greeting { data: "hi".into() });
        assert_eq!(encoder.mimetype(), "application/json");
    }

    #[test]
    fn xml_encodes_with_the_type_name_as_root() {
        let encoder: &dyn Encoder<Greeting> = &XmlEncoding;
        let bytes = encoder.encode(&Greeting { data: "hi".into() }).unwrap();
        assert_eq!(bytes, Bytes::from_static(b"<greeting><data>hi</data></greeting>"));

        let decoder: &dyn Decoder<Greeting> = &XmlEncoding;
        assert_eq!(decoder.decode(b"<greeting><data>yo</data></greeting>").unwrap(), Greeting { data: "yo".into() });
    }

    #[test]
    fn errors_encode_as_their_message() {
        let err = HttpError::from(StatusError::NotAcceptable);

        let json = Encoder::<Greeting>::encode_error(&JsonEncoding, &err).unwrap();
        assert_eq!(json, Bytes::from_static(br#"{"message":"Not Acceptable"}"#));

        let xml = Encoder::<Greeting>::encode_error(&XmlEncoding, &err).unwrap();
        assert_eq!(xml, Bytes::from_static(b"<error><message>Not Acceptable</message></error>"));
    }

    #[test]
    fn body_fields_list_the_supplied_members() {
        let decoder: &dyn Decoder<Greeting> = &JsonEncoding;
        let fields = decoder.fields(br#"{"name":"Ann","address":{"city":"Oslo"},"tags":[1,2]}"#).unwrap();
        assert_eq!(fields.len(), 3);
        assert!(fields.contains("name") && fields.contains("address") && fields.contains("tags"));
        assert!(!fields.contains("city"));

        let decoder: &dyn Decoder<Greeting> = &XmlEncoding;
        let fields = decoder.fields(br#"<invite org="acme"><email>ann@acme.test</email></invite>"#).unwrap();
        assert!(fields.contains("email"));
        assert!(fields.contains("@org"));
        assert!(!fields.contains("org"));

        assert!(JsonEncoding.deserialize::<BodyFields>(b"[1,2]").is_err());
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        let decoder: &dyn Decoder<Greeting> = &JsonEncoding;
        assert!(decoder.decode(b"{not json").is_err());

        let decoder: &dyn Decoder<Greeting> = &XmlEncoding;
        assert!(decoder.decode(&[0xff, 0xfe]).is_err());
    }
}
