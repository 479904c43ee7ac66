use bytes::Bytes;
use http::{Method, Request};
use http_body_util::{BodyExt, Full};
use micro_bind::router::{get, post};
use micro_bind::{Bind, Context, CreatedResponse, Reply, RequestHandler, Router, StatusError, typed_handler};
use serde::{Deserialize, Serialize};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Default, Deserialize, Bind)]
struct Greet {
    #[bind(query = "name")]
    name: String,
    #[bind(header = "X-User-Age", default = "18")]
    age: u32,
}

#[derive(Serialize, Reply)]
struct Greeting {
    data: String,
}

async fn greet(_ctx: Context, req: Greet) -> Result<Greeting, StatusError> {
    if req.name.is_empty() {
        return Err(StatusError::BadRequest);
    }
    Ok(Greeting { data: format!("Hello {}, you're {} years old.", req.name, req.age) })
}

#[derive(Default, Deserialize, Bind)]
struct NewUser {
    name: String,
    #[bind(request = "url:path")]
    #[serde(skip)]
    path: String,
}

async fn create_user(_ctx: Context, req: NewUser) -> Result<CreatedResponse, StatusError> {
    if req.name.is_empty() {
        return Err(StatusError::BadRequest);
    }
    Ok(CreatedResponse::new(format!("{}/{}", req.path, req.name)))
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let router = Router::builder()
        .route("/greet", get(typed_handler(greet).build().expect("greet handler")))
        .route("/users", post(typed_handler(create_user).accepts_xml(&[]).build().expect("user handler")))
        .build()
        .expect("routes should not conflict");

    let requests = vec![
        Request::get("/greet?name=Ann").header("X-User-Age", "30").body(Full::new(Bytes::new())),
        Request::get("/greet?name=Bo").body(Full::new(Bytes::new())),
        Request::get("/greet").body(Full::new(Bytes::new())),
        Request::get("/greet?name=Ann").header("Accept", "text/html").body(Full::new(Bytes::new())),
        Request::post("/users")
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from_static(br#"{"name":"ann"}"#))),
        Request::post("/users")
            .header("Content-Type", "application/xml")
            .body(Full::new(Bytes::from_static(b"<user><name>bo</name></user>"))),
        Request::builder().method(Method::PUT).uri("/users").body(Full::new(Bytes::new())),
    ];

    for request in requests {
        let request = request.expect("request should be valid");
        let line = format!("{} {}", request.method(), request.uri());

        let response = router.invoke(request).await;
        let status = response.status();
        let location = response.headers().get("location").cloned();
        let body = response.into_body().collect().await.expect("body is infallible").to_bytes();

        info!(%status, ?location, body = %String::from_utf8_lossy(&body), "{line}");
    }
}
