//! CORS specific request headers, and the seams through which a host exposes its requests and
//! responses to the engine
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest};
use unicase::UniCase;

/// `Origin` request header
pub const ORIGIN: &str = "Origin";
/// `Access-Control-Request-Method` request header
pub const ACCESS_CONTROL_REQUEST_METHOD: &str = "Access-Control-Request-Method";
/// `Access-Control-Request-Headers` request header
pub const ACCESS_CONTROL_REQUEST_HEADERS: &str = "Access-Control-Request-Headers";
/// `Access-Control-Allow-Origin` response header
pub const ACCESS_CONTROL_ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
/// `Access-Control-Allow-Methods` response header
pub const ACCESS_CONTROL_ALLOW_METHODS: &str = "Access-Control-Allow-Methods";
/// `Access-Control-Allow-Headers` response header
pub const ACCESS_CONTROL_ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";
/// `Access-Control-Allow-Credentials` response header
pub const ACCESS_CONTROL_ALLOW_CREDENTIALS: &str = "Access-Control-Allow-Credentials";
/// `Access-Control-Expose-Headers` response header
pub const ACCESS_CONTROL_EXPOSE_HEADERS: &str = "Access-Control-Expose-Headers";
/// `Access-Control-Max-Age` response header
pub const ACCESS_CONTROL_MAX_AGE: &str = "Access-Control-Max-Age";
/// `Vary` response header
pub const VARY: &str = "Vary";

/// A case insensitive header name
#[derive(Eq, PartialEq, Clone, Debug, Hash)]
pub struct HeaderFieldName(UniCase<String>);

impl Deref for HeaderFieldName {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        self.0.deref()
    }
}

impl fmt::Display for HeaderFieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'a> From<&'a str> for HeaderFieldName {
    fn from(s: &'a str) -> Self {
        HeaderFieldName(UniCase::new(s.to_string()))
    }
}

impl From<String> for HeaderFieldName {
    fn from(s: String) -> Self {
        HeaderFieldName(UniCase::new(s))
    }
}

/// Read access to an incoming request, as much as the engine needs of it.
///
/// Header lookups are case insensitive.
pub trait RequestView {
    /// The request method, for example `GET` or `OPTIONS`
    fn method(&self) -> &str;

    /// The first value of the header `name`, if any
    fn header(&self, name: &str) -> Option<&str>;

    /// Every value of the header `name`, in the order they were received
    fn header_values(&self, name: &str) -> Vec<&str>;
}

/// Write access to an outgoing response's headers
pub trait HeaderSink {
    /// Replace every existing value of `name` with `value`
    fn set_header(&mut self, name: &str, value: &str);

    /// Add `value` to the values of `name`, keeping the existing ones
    fn append_header(&mut self, name: &str, value: &str);
}

impl RequestView for rocket::Request<'_> {
    fn method(&self) -> &str {
        rocket::Request::method(self).as_str()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers().get_one(name)
    }

    fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers().get(name).collect()
    }
}

impl HeaderSink for rocket::Response<'_> {
    fn set_header(&mut self, name: &str, value: &str) {
        let _ = self.set_raw_header(name.to_string(), value.to_string());
    }

    fn append_header(&mut self, name: &str, value: &str) {
        self.adjoin_raw_header(name.to_string(), value.to_string());
    }
}

/// A host agnostic request: a method and a list of headers.
///
/// Use this to run the engine from a host that is not Rocket.
///
/// ```rust
/// use rocket_cors_policy::headers::{RequestParts, RequestView};
///
/// let request = RequestParts::new("GET").with_header("origin", "https://www.acme.com");
/// assert_eq!(request.header("Origin"), Some("https://www.acme.com"));
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RequestParts {
    method: String,
    headers: Vec<(HeaderFieldName, String)>,
}

impl RequestParts {
    /// A request with `method` and no headers
    pub fn new(method: &str) -> Self {
        Self {
            method: method.to_string(),
            headers: Vec::new(),
        }
    }

    /// Consumes the request and returns it with one more header value
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.into(), value.to_string()));
        self
    }
}

impl RequestView for RequestParts {
    fn method(&self) -> &str {
        &self.method
    }

    fn header(&self, name: &str) -> Option<&str> {
        let name = HeaderFieldName::from(name);
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    fn header_values(&self, name: &str) -> Vec<&str> {
        let name = HeaderFieldName::from(name);
        self.headers
            .iter()
            .filter(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

/// A host agnostic response, reduced to its headers.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResponseParts {
    headers: Vec<(HeaderFieldName, String)>,
}

impl ResponseParts {
    /// A response without headers
    pub fn new() -> Self {
        Self::default()
    }

    /// The first value of `name`
    pub fn get_one(&self, name: &str) -> Option<&str> {
        self.get(name).into_iter().next()
    }

    /// Every value of `name`
    pub fn get(&self, name: &str) -> Vec<&str> {
        let name = HeaderFieldName::from(name);
        self.headers
            .iter()
            .filter(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// Number of header values, counting repeated names separately
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Whether there are no headers at all
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl HeaderSink for ResponseParts {
    fn set_header(&mut self, name: &str, value: &str) {
        let name = HeaderFieldName::from(name);
        self.headers.retain(|(key, _)| *key != name);
        self.headers.push((name, value.to_string()));
    }

    fn append_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.into(), value.to_string()));
    }
}

/// The `Origin` request header used in CORS
///
/// The value is kept exactly as received. It is echoed back verbatim in
/// `Access-Control-Allow-Origin`.
///
/// You can use this as a rocket [Request Guard](https://rocket.rs/guide/requests/#request-guards)
/// to ensure that a non-empty `Origin` is present.
#[derive(Eq, PartialEq, Clone, Hash, Debug)]
pub struct Origin(pub String);

impl Origin {
    /// The `Origin` of a request. Absent and empty headers both yield `None`.
    pub fn from_view<R: RequestView + ?Sized>(request: &R) -> Option<Self> {
        request
            .header(ORIGIN)
            .filter(|origin| !origin.is_empty())
            .map(|origin| Origin(origin.to_string()))
    }

    /// Derives an instance of `Self` from the incoming request metadata.
    ///
    /// `Forward` is returned when the header is absent or empty.
    pub fn from_request_sync(request: &'_ rocket::Request<'_>) -> request::Outcome<Self, ()> {
        match Self::from_view(request) {
            Some(origin) => Outcome::Success(origin),
            None => Outcome::Forward(Status::default()),
        }
    }
}

impl Deref for Origin {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Origin {
    type Error = ();

    async fn from_request(request: &'r rocket::Request<'_>) -> request::Outcome<Self, ()> {
        Origin::from_request_sync(request)
    }
}

/// The `Access-Control-Request-Method` request header, upper-cased
///
/// You can use this as a rocket [Request Guard](https://rocket.rs/guide/requests/#request-guards)
/// to ensure that the header is passed in.
#[derive(Eq, PartialEq, Clone, Debug)]
pub struct AccessControlRequestMethod(pub String);

impl AccessControlRequestMethod {
    /// The requested method of a preflight. An absent header yields an empty method, which
    /// no policy allows.
    pub fn from_view<R: RequestView + ?Sized>(request: &R) -> Self {
        AccessControlRequestMethod(
            request
                .header(ACCESS_CONTROL_REQUEST_METHOD)
                .unwrap_or_default()
                .to_ascii_uppercase(),
        )
    }

    /// Derives an instance of `Self` from the incoming request metadata.
    ///
    /// `Forward` is returned when the header is absent.
    pub fn from_request_sync(request: &'_ rocket::Request<'_>) -> request::Outcome<Self, ()> {
        match request.headers().get_one(ACCESS_CONTROL_REQUEST_METHOD) {
            Some(method) => match Self::from_str(method) {
                Ok(method) => Outcome::Success(method),
                Err(()) => Outcome::Error((Status::BadRequest, ())),
            },
            None => Outcome::Forward(Status::default()),
        }
    }
}

impl Deref for AccessControlRequestMethod {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Fails on an empty or blank method
impl FromStr for AccessControlRequestMethod {
    type Err = ();

    fn from_str(method: &str) -> Result<Self, Self::Err> {
        let method = method.trim();
        if method.is_empty() {
            return Err(());
        }
        Ok(AccessControlRequestMethod(method.to_ascii_uppercase()))
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AccessControlRequestMethod {
    type Error = ();

    async fn from_request(request: &'r rocket::Request<'_>) -> request::Outcome<Self, ()> {
        AccessControlRequestMethod::from_request_sync(request)
    }
}

/// The `Access-Control-Request-Headers` request header, tokenized
///
/// Tokens are lower-cased and trimmed, empty tokens are dropped, and the order in which
/// the client listed them is kept.
///
/// You can use this as a rocket [Request Guard](https://rocket.rs/guide/requests/#request-guards)
/// to ensure that the header is passed in.
#[derive(Eq, PartialEq, Clone, Debug, Default)]
pub struct AccessControlRequestHeaders(pub Vec<String>);

impl AccessControlRequestHeaders {
    /// Tokenize every `Access-Control-Request-Headers` value of a request. Repeated header
    /// lines are treated as one comma separated list.
    pub fn from_view<R: RequestView + ?Sized>(request: &R) -> Self {
        let joined = request
            .header_values(ACCESS_CONTROL_REQUEST_HEADERS)
            .join(",");
        Self::tokenize(&joined)
    }

    /// Split a comma separated list into lower-cased, trimmed, non-empty tokens
    pub fn tokenize(headers: &str) -> Self {
        let headers = headers
            .to_ascii_lowercase()
            .split(',')
            .map(str::trim)
            .filter(|header| !header.is_empty())
            .map(ToString::to_string)
            .collect();
        AccessControlRequestHeaders(headers)
    }

    /// Derives an instance of `Self` from the incoming request metadata.
    ///
    /// `Forward` is returned when the header is absent.
    pub fn from_request_sync(request: &'_ rocket::Request<'_>) -> request::Outcome<Self, ()> {
        if request.headers().contains(ACCESS_CONTROL_REQUEST_HEADERS) {
            Outcome::Success(Self::from_view(request))
        } else {
            Outcome::Forward(Status::default())
        }
    }

    /// The tokens, comma joined
    pub fn joined(&self) -> String {
        self.0.join(", ")
    }
}

impl Deref for AccessControlRequestHeaders {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Will never fail
impl FromStr for AccessControlRequestHeaders {
    type Err = ();

    /// Will never fail
    fn from_str(headers: &str) -> Result<Self, Self::Err> {
        Ok(Self::tokenize(headers))
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AccessControlRequestHeaders {
    type Error = ();

    async fn from_request(request: &'r rocket::Request<'_>) -> request::Outcome<Self, ()> {
        AccessControlRequestHeaders::from_request_sync(request)
    }
}
