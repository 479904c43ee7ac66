use bytes::Bytes;
use http::Request;
use http_body_util::Full;
use micro_bind::{Bind, Context, Reply};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    request: TestRequest,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, request: TestRequest) -> Self {
        Self { name, group, request }
    }

    pub fn small(name: &'static str, request: TestRequest) -> Self {
        Self::new(name, TestGroup::Small, request)
    }

    pub fn large(name: &'static str, request: TestRequest) -> Self {
        Self::new(name, TestGroup::Large, request)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn request(&self) -> &TestRequest {
        &self.request
    }
}

/// The static description of one request fed to a benchmark.
#[derive(Debug, Copy, Clone)]
pub struct TestRequest {
    uri: &'static str,
    headers: &'static [(&'static str, &'static str)],
    body: &'static str,
}

impl TestRequest {
    pub const fn new(uri: &'static str, headers: &'static [(&'static str, &'static str)], body: &'static str) -> Self {
        Self { uri, headers, body }
    }

    pub fn uri(&self) -> &'static str {
        self.uri
    }

    pub fn body(&self) -> &'static str {
        self.body
    }

    /// Builds a fresh `http` request.
    ///
    /// # Panics
    /// When the description is not a valid request.
    pub fn build(&self) -> Request<Full<Bytes>> {
        let mut builder = Request::builder().method(if self.body.is_empty() { "GET" } else { "POST" }).uri(self.uri);
        for (name, value) in self.headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Full::new(Bytes::from_static(self.body.as_bytes()))).expect("test request should be valid")
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Large,
}

#[derive(Debug, Default, Deserialize, Bind)]
#[serde(default)]
pub struct Search {
    #[bind(query = "q")]
    pub query: String,
    #[bind(query = "size", default = "20")]
    pub size: u32,
    #[bind(query = "page", default = "1")]
    pub page: u32,
    #[bind(query = "tag")]
    pub tags: Vec<String>,
    #[bind(header = "X-Request-Id")]
    pub request_id: Option<String>,
    #[bind(header = "X-Tenant", default = "public")]
    pub tenant: String,
    #[bind(cookie = "session")]
    pub session: Option<String>,
    #[bind(request = "method")]
    pub method: String,
    pub filter: Option<String>,
}

#[derive(Debug, Serialize, Reply)]
pub struct SearchResult {
    pub query: String,
    pub tenant: String,
    pub hits: Vec<u32>,
}

#[allow(clippy::unused_async, reason = "typed handlers are async functions")]
pub async fn search(_ctx: Context, req: Search) -> Result<SearchResult, Infallible> {
    Ok(SearchResult { query: req.query, tenant: req.tenant, hits: (req.page..req.page + req.size.min(50)).collect() })
}

pub static SMALL_SEARCH: TestRequest = TestRequest::new("/search?q=rust", &[], "");

pub static LARGE_SEARCH: TestRequest = TestRequest::new(
    "/search?q=rust&size=40&page=3&tag=async&tag=http&tag=serde&tag=tokio",
    &[
        ("Accept", "text/html, application/xhtml+xml, application/json;q=0.9, */*;q=0.8"),
        ("X-Request-Id", "6f1c2a54-0d9e-4c1b-9a3e-5b7f8d2c1e90"),
        ("X-Tenant", "acme"),
        ("Cookie", "theme=dark; locale=en; session=2b7e151628aed2a6abf7158809cf4f3c"),
        ("Content-Type", "application/json"),
    ],
    r#"{"filter":"stars>100"}"#,
);

pub fn create_test_cases() -> Vec<TestCase> {
    vec![TestCase::small("small_search", SMALL_SEARCH), TestCase::large("large_search", LARGE_SEARCH)]
}
