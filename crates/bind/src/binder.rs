//! Declarative binding of request values into typed request shapes.
//!
//! A request shape implements [`Bind`] and describes its fields once in a [`Schema`]: for
//! each field an accessor plus the sources it is read from. Compiling a handler turns the
//! schema into one [`FieldBinder`] per source in use, composed by an [`ArgumentsBinder`]
//! that applies them in a fixed order:
//!
//! ```text
//! header -> query -> cookie -> path -> request
//! ```
//!
//! so for a field reachable through several sources the last applied one wins. Literal
//! defaults are bound separately: before the body is decoded, and once more after it for
//! the fields whose member the body left out. Field names are therefore the names of the
//! members as they appear in the body.
//!
//! # Example
//! ```
//! use micro_bind::{Bind, Schema};
//!
//! #[derive(Default)]
//! struct Page {
//!     size: u32,
//!     tags: Vec<String>,
//! }
//!
//! impl Bind for Page {
//!     fn schema(schema: &mut Schema<Self>) {
//!         schema.field("size", |page| &mut page.size).query("size").default("100");
//!         schema.field("tags", |page| &mut page.tags).query("tag");
//!     }
//! }
//!
//! let schema = Schema::<Page>::of();
//! assert!(schema.check().is_ok());
//! ```

use crate::encoding::BodyFields;
use crate::error::{BindError, ConversionError, ValueError};
use crate::source::{CookieSource, DefaultSource, PathParams, QuerySource, RequestMeta, SourceGetter};
use http::request::Parts;
use std::fmt;
use std::sync::Arc;

/// The source a field value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Path,
    Query,
    Header,
    Cookie,
    Request,
    Default,
}

impl Tag {
    /// The order request sources are applied in.
    pub const BINDING_ORDER: [Tag; 5] = [Tag::Header, Tag::Query, Tag::Cookie, Tag::Path, Tag::Request];

    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Path => "path",
            Tag::Query => "query",
            Tag::Header => "header",
            Tag::Cookie => "cookie",
            Tag::Request => "request",
            Tag::Default => "default",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request shape whose fields can be bound from request sources.
///
/// Usually derived with `#[derive(Bind)]`.
pub trait Bind: Default + Send + 'static {
    fn schema(schema: &mut Schema<Self>);
}

/// Parses one raw source value.
///
/// `Ok(None)` means the value counts as absent, which is the case for an empty value of
/// any type except `String`.
pub trait FromValue: Sized {
    fn from_value(value: &str) -> Result<Option<Self>, ValueError>;
}

impl FromValue for String {
    fn from_value(value: &str) -> Result<Option<Self>, ValueError> {
        Ok(Some(value.to_owned()))
    }
}

impl FromValue for bool {
    fn from_value(value: &str) -> Result<Option<Self>, ValueError> {
        match value {
            "" => Ok(None),
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(Some(true)),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(Some(false)),
            _ => Err(ValueError::new(value, "not a boolean")),
        }
    }
}

impl FromValue for char {
    fn from_value(value: &str) -> Result<Option<Self>, ValueError> {
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (None, _) => Ok(None),
            (Some(c), None) => Ok(Some(c)),
            (Some(_), Some(_)) => Err(ValueError::new(value, "expected a single character")),
        }
    }
}

macro_rules! impl_from_value_parse {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &str) -> Result<Option<Self>, ValueError> {
                    if value.is_empty() {
                        return Ok(None);
                    }
                    value.parse::<$ty>().map(Some).map_err(|e| ValueError::new(value, e))
                }
            }
        )*
    };
}

impl_from_value_parse!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

/// Assigns a field from a source, reporting whether a value was found.
pub trait FromSource: Send + 'static {
    fn bind_from(slot: &mut Self, source: &dyn SourceGetter, key: &str) -> Result<bool, ValueError>;
}

fn bind_scalar<V: FromValue>(slot: &mut V, source: &dyn SourceGetter, key: &str) -> Result<bool, ValueError> {
    let Some(raw) = source.get(key) else {
        return Ok(false);
    };
    match V::from_value(raw)? {
        Some(value) => {
            *slot = value;
            Ok(true)
        }
        None => Ok(false),
    }
}

macro_rules! impl_from_source_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromSource for $ty {
                fn bind_from(slot: &mut Self, source: &dyn SourceGetter, key: &str) -> Result<bool, ValueError> {
                    bind_scalar(slot, source, key)
                }
            }
        )*
    };
}

impl_from_source_scalar!(String, bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl<V: FromValue + Send + 'static> FromSource for Option<V> {
    fn bind_from(slot: &mut Self, source: &dyn SourceGetter, key: &str) -> Result<bool, ValueError> {
        let Some(raw) = source.get(key) else {
            return Ok(false);
        };
        match V::from_value(raw)? {
            Some(value) => {
                *slot = Some(value);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<V: FromValue + Send + 'static> FromSource for Vec<V> {
    fn bind_from(slot: &mut Self, source: &dyn SourceGetter, key: &str) -> Result<bool, ValueError> {
        let raw_values = source.values(key);
        if raw_values.is_empty() {
            return Ok(false);
        }

        let mut values = Vec::with_capacity(raw_values.len());
        for raw in raw_values {
            if let Some(value) = V::from_value(raw)? {
                values.push(value);
            }
        }
        *slot = values;
        Ok(true)
    }
}

type Assign<T> = Arc<dyn Fn(&mut T, &dyn SourceGetter, &str) -> Result<bool, ValueError> + Send + Sync>;

/// One (field, source, key) binding of a request shape.
pub struct FieldSpec<T> {
    name: String,
    tag: Tag,
    key: String,
    assign: Assign<T>,
}

impl<T> FieldSpec<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The top-level body member the field belongs to: `paging` for `paging.size`.
    pub fn member(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }
}

impl<T> Clone for FieldSpec<T> {
    fn clone(&self) -> Self {
        Self { name: self.name.clone(), tag: self.tag, key: self.key.clone(), assign: Arc::clone(&self.assign) }
    }
}

impl<T> fmt::Debug for FieldSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec").field("name", &self.name).field("tag", &self.tag).field("key", &self.key).finish()
    }
}

/// The binding annotations of a request shape.
///
/// Declaration problems are collected instead of raised, and surface when the schema is
/// compiled into binders.
pub struct Schema<T> {
    fields: Vec<FieldSpec<T>>,
    errors: Vec<BindError>,
}

impl<T: Bind> Schema<T> {
    /// Extracts the schema declared by `T`.
    pub fn of() -> Self {
        let mut schema = Self::new();
        T::schema(&mut schema);
        schema
    }
}

impl<T: 'static> Schema<T> {
    pub fn new() -> Self {
        Self { fields: Vec::new(), errors: Vec::new() }
    }

    /// Starts declaring the bindings of one field, named like its body member.
    pub fn field<F: FromSource>(&mut self, name: &'static str, accessor: fn(&mut T) -> &mut F) -> FieldBuilder<'_, T, F> {
        FieldBuilder { schema: self, name, accessor }
    }

    /// Binds the fields of a nested request shape through the same sources.
    pub fn nested<N: Bind>(&mut self, name: &'static str, accessor: fn(&mut T) -> &mut N) {
        let inner = Schema::<N>::of();
        self.errors.extend(inner.errors);

        for spec in inner.fields {
            let assign = spec.assign;
            self.push(
                format!("{name}.{}", spec.name),
                spec.tag,
                spec.key,
                Arc::new(move |target: &mut T, source: &dyn SourceGetter, key: &str| assign(accessor(target), source, key)),
            );
        }
    }

    /// Like [`Schema::nested`], but the nested shape is only allocated once one of its
    /// fields is found.
    pub fn nested_optional<N: Bind>(&mut self, name: &'static str, accessor: fn(&mut T) -> &mut Option<N>) {
        let inner = Schema::<N>::of();
        self.errors.extend(inner.errors);

        for spec in inner.fields {
            let assign = spec.assign;
            self.push(
                format!("{name}.{}", spec.name),
                spec.tag,
                spec.key,
                Arc::new(move |target: &mut T, source: &dyn SourceGetter, key: &str| {
                    let slot = accessor(target);
                    if let Some(nested) = slot.as_mut() {
                        return assign(nested, source, key);
                    }

                    let mut nested = N::default();
                    let found = assign(&mut nested, source, key)?;
                    if found {
                        *slot = Some(nested);
                    }
                    Ok(found)
                }),
            );
        }
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.fields.iter().any(|spec| spec.tag == tag)
    }

    pub fn fields(&self) -> &[FieldSpec<T>] {
        &self.fields
    }

    /// Fails with the first declaration problem, if any.
    pub fn check(&self) -> Result<(), BindError> {
        match self.errors.first() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn push(&mut self, name: String, tag: Tag, key: String, assign: Assign<T>) {
        if key.is_empty() {
            self.errors.push(BindError::EmptyKey { field: name, tag });
            return;
        }
        if self.fields.iter().any(|spec| spec.name == name && spec.tag == tag) {
            self.errors.push(BindError::DuplicateTag { field: name, tag });
            return;
        }
        if tag == Tag::Request && !RequestMeta::is_known_key(&key) {
            self.errors.push(BindError::UnknownRequestKey { field: name, key });
            return;
        }
        self.fields.push(FieldSpec { name, tag, key, assign });
    }
}

impl<T: 'static> Default for Schema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema").field("fields", &self.fields).field("errors", &self.errors).finish()
    }
}

/// Declares the sources of a single field, see [`Schema::field`].
pub struct FieldBuilder<'s, T, F> {
    schema: &'s mut Schema<T>,
    name: &'static str,
    accessor: fn(&mut T) -> &mut F,
}

impl<T: 'static, F: FromSource> FieldBuilder<'_, T, F> {
    pub fn path(self, key: &str) -> Self {
        self.tag(Tag::Path, key)
    }

    pub fn query(self, key: &str) -> Self {
        self.tag(Tag::Query, key)
    }

    pub fn header(self, key: &str) -> Self {
        self.tag(Tag::Header, key)
    }

    pub fn cookie(self, key: &str) -> Self {
        self.tag(Tag::Cookie, key)
    }

    /// Binds request metadata, one of [`RequestMeta::KEYS`].
    pub fn request(self, key: &str) -> Self {
        self.tag(Tag::Request, key)
    }

    /// A literal applied before the body and every other source.
    pub fn default(self, literal: &str) -> Self {
        self.tag(Tag::Default, literal)
    }

    pub fn tag(self, tag: Tag, key: &str) -> Self {
        let accessor = self.accessor;
        self.schema.push(
            self.name.to_owned(),
            tag,
            key.to_owned(),
            Arc::new(move |target: &mut T, source: &dyn SourceGetter, key: &str| F::bind_from(accessor(target), source, key)),
        );
        self
    }
}

impl<T, F> fmt::Debug for FieldBuilder<'_, T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBuilder").field("name", &self.name).finish()
    }
}

/// Binds every field of a request shape that is tagged with one source.
pub struct FieldBinder<T> {
    tag: Tag,
    fields: Vec<FieldSpec<T>>,
}

impl<T: Bind> FieldBinder<T> {
    /// Compiles the binder of `tag`.
    ///
    /// The defaults binder is checked right away: every literal has to convert into its field.
    pub fn new(schema: &Schema<T>, tag: Tag) -> Result<Self, BindError> {
        schema.check()?;

        let fields = schema.fields.iter().filter(|spec| spec.tag == tag).cloned().collect();
        let binder = Self { tag, fields };

        if tag == Tag::Default {
            let mut sample = T::default();
            binder
                .bind(&DefaultSource, &mut sample)
                .map_err(|source| BindError::InvalidDefault { field: source.field().to_owned(), source })?;
        }

        Ok(binder)
    }
}

impl<T> FieldBinder<T> {
    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Reads every field of this binder from `source`, stopping at the first failure.
    pub fn bind(&self, source: &dyn SourceGetter, target: &mut T) -> Result<(), ConversionError> {
        for spec in &self.fields {
            (spec.assign)(target, source, &spec.key)
                .map_err(|cause| ConversionError::new(&spec.name, self.tag, &spec.key, cause))?;
        }
        Ok(())
    }

    /// Like [`bind`](Self::bind), but leaves alone the fields whose top-level member the
    /// request body supplied.
    pub fn bind_unsupplied(
        &self,
        source: &dyn SourceGetter,
        target: &mut T,
        supplied: &BodyFields,
    ) -> Result<(), ConversionError> {
        for spec in self.fields.iter().filter(|spec| !supplied.contains(spec.member())) {
            (spec.assign)(target, source, &spec.key)
                .map_err(|cause| ConversionError::new(&spec.name, self.tag, &spec.key, cause))?;
        }
        Ok(())
    }
}

impl<T> fmt::Debug for FieldBinder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinder").field("tag", &self.tag).field("fields", &self.fields).finish()
    }
}

/// Applies the binders of every request source a shape uses, in [`Tag::BINDING_ORDER`].
pub struct ArgumentsBinder<T> {
    binders: Vec<FieldBinder<T>>,
}

impl<T: Bind> ArgumentsBinder<T> {
    pub fn new(schema: &Schema<T>) -> Result<Self, BindError> {
        schema.check()?;

        let binders = Tag::BINDING_ORDER
            .into_iter()
            .filter(|tag| schema.has_tag(*tag))
            .map(|tag| FieldBinder::new(schema, tag))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { binders })
    }
}

impl<T> ArgumentsBinder<T> {
    pub fn is_empty(&self) -> bool {
        self.binders.is_empty()
    }

    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.binders.iter().map(FieldBinder::tag)
    }

    /// Binds `target` from the request head. Sources are only materialised for the tags in use.
    pub fn bind(&self, parts: &Parts, target: &mut T) -> Result<(), ConversionError> {
        for binder in &self.binders {
            match binder.tag {
                Tag::Header => binder.bind(&parts.headers, target)?,
                Tag::Query => binder.bind(&QuerySource::from_uri(&parts.uri), target)?,
                Tag::Cookie => binder.bind(&CookieSource::from_headers(&parts.headers), target)?,
                Tag::Path => match parts.extensions.get::<PathParams>() {
                    Some(params) => binder.bind(params, target)?,
                    None => binder.bind(&PathParams::new(), target)?,
                },
                Tag::Request => binder.bind(&RequestMeta::new(parts), target)?,
                Tag::Default => binder.bind(&DefaultSource, target)?,
            }
        }
        Ok(())
    }
}

impl<T> fmt::Debug for ArgumentsBinder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.binders).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RemoteAddr;
    use http::Request;

    #[derive(Debug, Default)]
    struct User {
        id: u64,
        name: String,
        age: i32,
        admin: bool,
        nickname: Option<String>,
        score: Option<f64>,
        tags: Vec<String>,
        session: String,
        method: String,
        address: Address,
        paging: Option<Paging>,
    }

    #[derive(Debug, Default, PartialEq)]
    struct Address {
        city: String,
        zip: u32,
    }

    #[derive(Debug, Default, PartialEq)]
    struct Paging {
        page: u32,
        size: u32,
    }

    impl Bind for Address {
        fn schema(schema: &mut Schema<Self>) {
            schema.field("city", |a| &mut a.city).query("city");
            schema.field("zip", |a| &mut a.zip).query("zip");
        }
    }

    impl Bind for Paging {
        fn schema(schema: &mut Schema<Self>) {
            schema.field("page", |p| &mut p.page).query("page");
            schema.field("size", |p| &mut p.size).query("size");
        }
    }

    impl Bind for User {
        fn schema(schema: &mut Schema<Self>) {
            schema.field("id", |u| &mut u.id).path("id");
            schema.field("name", |u| &mut u.name).query("name").header("X-Name").default("anonymous");
            schema.field("age", |u| &mut u.age).query("age").default("18");
            schema.field("admin", |u| &mut u.admin).header("X-Admin");
            schema.field("nickname", |u| &mut u.nickname).query("nick");
            schema.field("score", |u| &mut u.score).query("score");
            schema.field("tags", |u| &mut u.tags).query("tag");
            schema.field("session", |u| &mut u.session).cookie("session");
            schema.field("method", |u| &mut u.method).request("method");
            schema.nested("address", |u| &mut u.address);
            schema.nested_optional("paging", |u| &mut u.paging);
        }
    }

    fn parts(uri: &str) -> Parts {
        let mut parts = Request::builder()
            .uri(uri)
            .header("x-name", "from-header")
            .header("x-admin", "T")
            .header(http::header::COOKIE, "session=s3cr3t")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        parts.extensions.insert([("id", "7")].into_iter().collect::<PathParams>());
        parts
    }

    fn bind(uri: &str) -> Result<User, ConversionError> {
        let schema = Schema::<User>::of();
        let defaults = FieldBinder::new(&schema, Tag::Default).unwrap();
        let arguments = ArgumentsBinder::new(&schema).unwrap();

        let parts = parts(uri);
        let mut user = User::default();
        defaults.bind(&DefaultSource, &mut user)?;
        arguments.bind(&parts, &mut user)?;
        Ok(user)
    }

    #[test]
    fn binds_every_source() {
        let user = bind("/users/7?name=Ada&age=30&tag=a&tag=b&nick=ace&city=Paris&zip=75001").unwrap();

        assert_eq!(user.id, 7);
        assert_eq!(user.name, "Ada");
        assert_eq!(user.age, 30);
        assert!(user.admin);
        assert_eq!(user.nickname.as_deref(), Some("ace"));
        assert_eq!(user.tags, vec!["a", "b"]);
        assert_eq!(user.session, "s3cr3t");
        assert_eq!(user.method, "GET");
        assert_eq!(user.address, Address { city: "Paris".into(), zip: 75001 });
    }

    #[test]
    fn query_is_applied_after_header() {
        let user = bind("/users/7?name=from-query").unwrap();
        assert_eq!(user.name, "from-query");

        let user = bind("/users/7").unwrap();
        assert_eq!(user.name, "from-header");
    }

    #[test]
    fn defaults_apply_when_sources_are_silent() {
        let user = bind("/users/7").unwrap();
        assert_eq!(user.age, 18);
        assert_eq!(user.nickname, None);
        assert_eq!(user.score, None);
        assert!(user.tags.is_empty());
    }

    #[test]
    fn empty_values_are_absent_except_for_strings() {
        let user = bind("/users/7?age=&nick=&score=").unwrap();

        assert_eq!(user.age, 18);
        assert_eq!(user.nickname.as_deref(), Some(""));
        assert_eq!(user.score, None);
    }

    #[test]
    fn optional_nested_shapes_are_allocated_on_demand() {
        assert_eq!(bind("/users/7").unwrap().paging, None);
        assert_eq!(bind("/users/7?size=20").unwrap().paging, Some(Paging { page: 0, size: 20 }));
    }

    #[test]
    fn conversion_failure_names_the_field() {
        let err = bind("/users/7?age=old").unwrap_err();

        assert_eq!(err.field(), "age");
        assert_eq!(err.tag(), Tag::Query);
        assert_eq!(err.key(), "age");
        assert_eq!(err.value(), "old");
    }

    #[test]
    fn nested_conversion_failure_uses_the_dotted_name() {
        let err = bind("/users/7?zip=north").unwrap_err();
        assert_eq!(err.field(), "address.zip");
    }

    #[test]
    fn only_used_sources_get_a_binder() {
        let schema = Schema::<Paging>::of();
        let arguments = ArgumentsBinder::new(&schema).unwrap();

        assert_eq!(arguments.tags().collect::<Vec<_>>(), vec![Tag::Query]);
        assert!(FieldBinder::new(&schema, Tag::Default).unwrap().is_empty());
    }

    #[test]
    fn sources_are_applied_in_binding_order() {
        let schema = Schema::<User>::of();
        let arguments = ArgumentsBinder::new(&schema).unwrap();

        assert_eq!(
            arguments.tags().collect::<Vec<_>>(),
            vec![Tag::Header, Tag::Query, Tag::Cookie, Tag::Path, Tag::Request]
        );
    }

    #[test]
    fn booleans_accept_the_usual_spellings() {
        for raw in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(bool::from_value(raw).unwrap(), Some(true));
        }
        for raw in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(bool::from_value(raw).unwrap(), Some(false));
        }
        assert!(bool::from_value("yes").is_err());
        assert_eq!(char::from_value("x").unwrap(), Some('x'));
        assert!(char::from_value("xy").is_err());
    }

    #[test]
    fn request_metadata_reads_the_remote_address() {
        #[derive(Default)]
        struct Peer {
            addr: String,
        }

        impl Bind for Peer {
            fn schema(schema: &mut Schema<Self>) {
                schema.field("addr", |p| &mut p.addr).request("remote-addr");
            }
        }

        let mut parts = Request::builder().uri("/").body(()).unwrap().into_parts().0;
        parts.extensions.insert(RemoteAddr("127.0.0.1:9000".parse().unwrap()));

        let arguments = ArgumentsBinder::new(&Schema::<Peer>::of()).unwrap();
        let mut peer = Peer::default();
        arguments.bind(&parts, &mut peer).unwrap();
        assert_eq!(peer.addr, "127.0.0.1:9000");
    }

    #[test]
    fn declaration_errors_fail_compilation() {
        #[derive(Default)]
        struct Duplicate {
            a: String,
        }
        impl Bind for Duplicate {
            fn schema(schema: &mut Schema<Self>) {
                schema.field("a", |d| &mut d.a).query("x").query("y");
            }
        }

        #[derive(Default)]
        struct EmptyKey {
            a: String,
        }
        impl Bind for EmptyKey {
            fn schema(schema: &mut Schema<Self>) {
                schema.field("a", |d| &mut d.a).header("");
            }
        }

        #[derive(Default)]
        struct UnknownMeta {
            a: String,
        }
        impl Bind for UnknownMeta {
            fn schema(schema: &mut Schema<Self>) {
                schema.field("a", |d| &mut d.a).request("user-agent");
            }
        }

        #[derive(Default)]
        struct BadDefault {
            a: u8,
        }
        impl Bind for BadDefault {
            fn schema(schema: &mut Schema<Self>) {
                schema.field("a", |d| &mut d.a).default("300");
            }
        }

        assert!(matches!(
            ArgumentsBinder::new(&Schema::<Duplicate>::of()),
            Err(BindError::DuplicateTag { tag: Tag::Query, .. })
        ));
        assert!(matches!(ArgumentsBinder::new(&Schema::<EmptyKey>::of()), Err(BindError::EmptyKey { .. })));
        assert!(matches!(
            ArgumentsBinder::new(&Schema::<UnknownMeta>::of()),
            Err(BindError::UnknownRequestKey { .. })
        ));
        assert!(matches!(
            FieldBinder::new(&Schema::<BadDefault>::of(), Tag::Default),
            Err(BindError::InvalidDefault { .. })
        ));
    }

    #[test]
    fn defaults_skip_members_the_body_supplied() {
        let schema = Schema::<User>::of();
        let defaults = FieldBinder::new(&schema, Tag::Default).unwrap();
        let supplied: BodyFields = serde_json::from_str(r#"{"name":"Ann","address":{"city":"Oslo"}}"#).unwrap();

        let mut user = User { name: "Ann".into(), ..User::default() };
        defaults.bind_unsupplied(&DefaultSource, &mut user, &supplied).unwrap();

        assert_eq!(user.name, "Ann");
        assert_eq!(user.age, 18);
    }
}
