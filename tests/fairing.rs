//! This crate tests using `rocket_cors_policy` using Fairings
use rocket::http::{Header, Status};
use rocket::local::blocking::Client;
use rocket::{get, options, routes, Responder};
use rocket_cors_policy::headers::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE,
    ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN, VARY,
};
use rocket_cors_policy::{Cors, CorsSettings};

#[derive(Responder)]
struct WithVary {
    inner: &'static str,
    vary: Header<'static>,
}

#[get("/")]
fn cors() -> &'static str {
    "Hello CORS"
}

#[get("/vary")]
fn vary() -> WithVary {
    WithVary {
        inner: "Hello CORS",
        vary: Header::new("Vary", "Accept-Encoding"),
    }
}

#[options("/passthrough")]
fn application_preflight() -> &'static str {
    "Application preflight"
}

fn make_settings() -> CorsSettings {
    CorsSettings {
        allowed_origins: vec!["https://www.acme.com".to_string()],
        allowed_methods: vec!["GET".to_string()],
        allowed_headers: vec!["Authorization".to_string(), "Accept".to_string()],
        exposed_headers: vec!["X-Total-Count".to_string()],
        allow_credentials: true,
        ..Default::default()
    }
}

fn rocket(fairing: Cors) -> rocket::Rocket<rocket::Build> {
    rocket::build()
        .mount("/", routes![cors, vary, application_preflight])
        .attach(fairing)
}

fn client() -> Client {
    Client::tracked(rocket(make_settings().to_cors())).unwrap()
}

#[test]
fn smoke_test() {
    let client = client();

    // `Options` pre-flight checks
    let req = client
        .options("/")
        .header(Header::new(ORIGIN, "https://www.acme.com"))
        .header(Header::new(ACCESS_CONTROL_REQUEST_METHOD, "GET"))
        .header(Header::new(ACCESS_CONTROL_REQUEST_HEADERS, "Authorization"));

    let response = req.dispatch();
    assert!(response.status().class().is_success());

    // "Actual" request
    let req = client
        .get("/")
        .header(Header::new(ORIGIN, "https://www.acme.com"))
        .header(Header::new("Authorization", "let me in"));

    let response = req.dispatch();
    assert!(response.status().class().is_success());
    let origin_header = response
        .headers()
        .get_one(ACCESS_CONTROL_ALLOW_ORIGIN)
        .expect("to exist");
    assert_eq!("https://www.acme.com", origin_header);
    let body_str = response.into_string();
    assert_eq!(body_str, Some("Hello CORS".to_string()));
}

#[test]
fn cors_options_check() {
    let client = client();

    let req = client
        .options("/")
        .header(Header::new(ORIGIN, "https://www.acme.com"))
        .header(Header::new(ACCESS_CONTROL_REQUEST_METHOD, "get"))
        .header(Header::new(ACCESS_CONTROL_REQUEST_HEADERS, "Authorization, Accept"));

    let response = req.dispatch();
    assert_eq!(response.status(), Status::NoContent);

    let headers = response.headers();
    assert_eq!(
        headers.get_one(ACCESS_CONTROL_ALLOW_ORIGIN),
        Some("https://www.acme.com")
    );
    assert_eq!(headers.get_one(ACCESS_CONTROL_ALLOW_METHODS), Some("GET"));
    assert_eq!(
        headers.get_one(ACCESS_CONTROL_ALLOW_HEADERS),
        Some("authorization, accept")
    );
    assert_eq!(headers.get_one(ACCESS_CONTROL_ALLOW_CREDENTIALS), Some("true"));
    assert_eq!(
        headers.get_one(VARY),
        Some("Origin, Access-Control-Request-Method, Access-Control-Request-Headers")
    );
    assert!(headers.get_one(ACCESS_CONTROL_MAX_AGE).is_none());
    assert!(headers.get_one(ACCESS_CONTROL_EXPOSE_HEADERS).is_none());
}

#[test]
fn cors_options_max_age() {
    let mut settings = make_settings();
    settings.max_age = 3600;
    let client = Client::tracked(rocket(settings.to_cors())).unwrap();

    let response = client
        .options("/")
        .header(Header::new(ORIGIN, "https://www.acme.com"))
        .header(Header::new(ACCESS_CONTROL_REQUEST_METHOD, "GET"))
        .dispatch();

    assert_eq!(
        response.headers().get_one(ACCESS_CONTROL_MAX_AGE),
        Some("3600")
    );
    assert!(response.headers().get_one(ACCESS_CONTROL_ALLOW_HEADERS).is_none());
}

/// Preflights failing a check are still answered, without any `Access-Control-Allow-*` header
#[test]
fn cors_options_bad_origin() {
    let client = client();

    let response = client
        .options("/")
        .header(Header::new(ORIGIN, "https://www.bad-origin.com"))
        .header(Header::new(ACCESS_CONTROL_REQUEST_METHOD, "GET"))
        .dispatch();

    assert_eq!(response.status(), Status::NoContent);
    assert!(response.headers().get_one(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    assert_eq!(
        response.headers().get_one(VARY),
        Some("Origin, Access-Control-Request-Method, Access-Control-Request-Headers")
    );
}

#[test]
fn cors_options_missing_origin() {
    let client = client();

    let response = client
        .options("/")
        .header(Header::new(ACCESS_CONTROL_REQUEST_METHOD, "GET"))
        .dispatch();

    assert_eq!(response.status(), Status::NoContent);
    assert!(response.headers().get_one(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[test]
fn cors_options_bad_request_method() {
    let client = client();

    let response = client
        .options("/")
        .header(Header::new(ORIGIN, "https://www.acme.com"))
        .header(Header::new(ACCESS_CONTROL_REQUEST_METHOD, "POST"))
        .dispatch();

    assert_eq!(response.status(), Status::NoContent);
    assert!(response.headers().get_one(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    assert!(response.headers().get_one(ACCESS_CONTROL_ALLOW_METHODS).is_none());
}

#[test]
fn cors_options_bad_request_header() {
    let client = client();

    let response = client
        .options("/")
        .header(Header::new(ORIGIN, "https://www.acme.com"))
        .header(Header::new(ACCESS_CONTROL_REQUEST_METHOD, "GET"))
        .header(Header::new(ACCESS_CONTROL_REQUEST_HEADERS, "Foobar"))
        .dispatch();

    assert_eq!(response.status(), Status::NoContent);
    assert!(response.headers().get_one(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

/// Preflights never reach the application's own `OPTIONS` routes unless passed through
#[test]
fn cors_options_short_circuits_application_route() {
    let client = client();

    let response = client
        .options("/passthrough")
        .header(Header::new(ORIGIN, "https://www.acme.com"))
        .header(Header::new(ACCESS_CONTROL_REQUEST_METHOD, "GET"))
        .dispatch();

    assert_eq!(response.status(), Status::NoContent);
    assert_eq!(
        response.headers().get_one(ACCESS_CONTROL_ALLOW_ORIGIN),
        Some("https://www.acme.com")
    );
}

#[test]
fn cors_options_passthrough() {
    let mut settings = make_settings();
    settings.options_passthrough = true;
    let client = Client::tracked(rocket(settings.to_cors())).unwrap();

    let response = client
        .options("/passthrough")
        .header(Header::new(ORIGIN, "https://www.acme.com"))
        .header(Header::new(ACCESS_CONTROL_REQUEST_METHOD, "GET"))
        .dispatch();

    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        response.headers().get_one(ACCESS_CONTROL_ALLOW_ORIGIN),
        Some("https://www.acme.com")
    );
    assert_eq!(
        response.into_string(),
        Some("Application preflight".to_string())
    );
}

#[test]
fn cors_get_check() {
    let client = client();

    let response = client
        .get("/")
        .header(Header::new(ORIGIN, "https://www.acme.com"))
        .header(Header::new("Authorization", "let me in"))
        .dispatch();

    assert!(response.status().class().is_success());
    let headers = response.headers();
    assert_eq!(
        headers.get_one(ACCESS_CONTROL_ALLOW_ORIGIN),
        Some("https://www.acme.com")
    );
    assert_eq!(headers.get_one(ACCESS_CONTROL_ALLOW_CREDENTIALS), Some("true"));
    assert_eq!(
        headers.get_one(ACCESS_CONTROL_EXPOSE_HEADERS),
        Some("x-total-count")
    );
    assert_eq!(headers.get_one(VARY), Some("Origin"));
    assert!(headers.get_one(ACCESS_CONTROL_ALLOW_METHODS).is_none());
}

/// This test is to check that non CORS compliant requests to GET should still work. (i.e. curl)
#[test]
fn cors_get_no_origin() {
    let client = client();

    let response = client
        .get("/")
        .header(Header::new("Authorization", "let me in"))
        .dispatch();

    assert!(response.status().class().is_success());
    assert!(response.headers().get_one(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    assert_eq!(response.headers().get_one(VARY), Some("Origin"));
    assert_eq!(response.into_string(), Some("Hello CORS".to_string()));
}

/// Requests from origins that are not allowed are not rejected by the server
#[test]
fn cors_get_bad_origin() {
    let client = client();

    let response = client
        .get("/")
        .header(Header::new(ORIGIN, "https://www.bad-origin.com"))
        .dispatch();

    assert_eq!(response.status(), Status::Ok);
    assert!(response.headers().get_one(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    assert!(response
        .headers()
        .get_one(ACCESS_CONTROL_ALLOW_CREDENTIALS)
        .is_none());
}

#[test]
fn cors_get_appends_to_existing_vary() {
    let client = client();

    let response = client
        .get("/vary")
        .header(Header::new(ORIGIN, "https://www.acme.com"))
        .dispatch();

    let vary: Vec<_> = response.headers().get(VARY).collect();
    assert_eq!(vary, vec!["Accept-Encoding", "Origin"]);
}

#[test]
fn all_origins_are_sent_as_wildcard() {
    let settings = CorsSettings {
        allowed_origins: vec!["*".to_string()],
        ..Default::default()
    };
    let client = Client::tracked(rocket(settings.to_cors())).unwrap();

    let response = client
        .get("/")
        .header(Header::new(ORIGIN, "https://www.example.com"))
        .dispatch();

    assert_eq!(
        response.headers().get_one(ACCESS_CONTROL_ALLOW_ORIGIN),
        Some("*")
    );
    assert!(response
        .headers()
        .get_one(ACCESS_CONTROL_ALLOW_CREDENTIALS)
        .is_none());
}

#[test]
fn all_origins_with_credentials_echo_the_origin() {
    let settings = CorsSettings {
        allowed_origins: vec!["*".to_string()],
        allow_credentials: true,
        ..Default::default()
    };
    let client = Client::tracked(rocket(settings.to_cors())).unwrap();

    let response = client
        .get("/")
        .header(Header::new(ORIGIN, "https://www.example.com"))
        .dispatch();

    assert_eq!(
        response.headers().get_one(ACCESS_CONTROL_ALLOW_ORIGIN),
        Some("https://www.example.com")
    );
    assert_eq!(
        response.headers().get_one(ACCESS_CONTROL_ALLOW_CREDENTIALS),
        Some("true")
    );
}

#[test]
fn disabled_fairing_leaves_requests_alone() {
    let mut settings = make_settings();
    settings.enabled = false;
    let client = Client::tracked(rocket(settings.to_cors())).unwrap();

    let response = client
        .get("/")
        .header(Header::new(ORIGIN, "https://www.acme.com"))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert!(response.headers().get_one(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    assert!(response.headers().get_one(VARY).is_none());

    // Nothing answers preflights either
    let response = client
        .options("/")
        .header(Header::new(ORIGIN, "https://www.acme.com"))
        .header(Header::new(ACCESS_CONTROL_REQUEST_METHOD, "GET"))
        .dispatch();
    assert_eq!(response.status(), Status::NotFound);
    assert!(response.headers().get_one(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
