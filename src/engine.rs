//! The CORS decision engine
//!
//! Everything here is a pure function of a [`Policy`] and a request. Nothing is logged and
//! nothing is written; the result is an [`Outcome`] that an adapter applies to a response.
//!
//! Both flows stop at the first failing check. A stopped flow still carries the `Vary`
//! header so that caches keep responses for different origins apart.
use std::fmt;

use crate::headers::{
    self, AccessControlRequestHeaders, AccessControlRequestMethod, HeaderSink, Origin,
    RequestView,
};
use crate::policy::Policy;

/// Value of `Vary` on every preflight response
pub const PREFLIGHT_VARY: &str = "Origin, Access-Control-Request-Method, Access-Control-Request-Headers";

/// How a header is written to the response
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// Replace any existing value
    Set,
    /// Add to the existing values
    Append,
}

/// A single header write
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HeaderMutation {
    /// Header name
    pub name: &'static str,
    /// Header value
    pub value: String,
    /// Replace or append
    pub mode: Mode,
}

impl HeaderMutation {
    fn set<V: Into<String>>(name: &'static str, value: V) -> Self {
        Self {
            name,
            value: value.into(),
            mode: Mode::Set,
        }
    }

    fn append<V: Into<String>>(name: &'static str, value: V) -> Self {
        Self {
            name,
            value: value.into(),
            mode: Mode::Append,
        }
    }
}

/// Which flow produced an outcome
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestKind {
    /// `OPTIONS` preflight
    Preflight,
    /// Any other method
    Actual,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RequestKind::Preflight => f.write_str("Preflight request"),
            RequestKind::Actual => f.write_str("Actual request"),
        }
    }
}

/// The check that stopped a flow
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Denial {
    /// The `Origin` header is absent or empty
    MissingOrigin,
    /// The origin is not in the policy
    OriginNotAllowed(String),
    /// The method, or the requested method of a preflight, is not allowed
    MethodNotAllowed(String),
    /// At least one of the requested headers is not allowed
    HeadersNotAllowed(Vec<String>),
    /// An `OPTIONS` request reached the actual request flow
    OptionsRequest,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Denial::MissingOrigin => f.write_str("empty Origin header"),
            Denial::OriginNotAllowed(ref origin) => write!(f, "origin \"{}\" not allowed", origin),
            Denial::MethodNotAllowed(ref method) => write!(f, "method \"{}\" not allowed", method),
            Denial::HeadersNotAllowed(ref headers) => {
                write!(f, "headers \"{}\" not allowed", headers.join(", "))
            }
            Denial::OptionsRequest => f.write_str("method == OPTIONS"),
        }
    }
}

/// The result of running the engine on one request
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Outcome {
    kind: RequestKind,
    headers: Vec<HeaderMutation>,
    short_circuit: bool,
    denial: Option<Denial>,
}

impl Outcome {
    fn new(kind: RequestKind) -> Self {
        Self {
            kind,
            headers: Vec::new(),
            short_circuit: false,
            denial: None,
        }
    }

    fn push(&mut self, mutation: HeaderMutation) {
        self.headers.push(mutation);
    }

    fn deny(mut self, denial: Denial) -> Self {
        self.denial = Some(denial);
        self
    }

    /// Which flow produced this outcome
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Header writes, in the order they must be applied
    pub fn headers(&self) -> &[HeaderMutation] {
        &self.headers
    }

    /// Whether the host should answer right away instead of running its own handling.
    ///
    /// Only ever true for preflights without `options_passthrough`.
    pub fn is_short_circuit(&self) -> bool {
        self.short_circuit
    }

    /// The check that stopped the flow, if one did
    pub fn denial(&self) -> Option<&Denial> {
        self.denial.as_ref()
    }

    /// Whether every check passed
    pub fn is_allowed(&self) -> bool {
        self.denial.is_none()
    }

    /// The value of the last write to `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|mutation| mutation.name.eq_ignore_ascii_case(name))
            .map(|mutation| mutation.value.as_str())
    }

    /// Write every header to `sink`, in order
    pub fn apply<S: HeaderSink + ?Sized>(&self, sink: &mut S) {
        for mutation in &self.headers {
            match mutation.mode {
                Mode::Set => sink.set_header(mutation.name, &mutation.value),
                Mode::Append => sink.append_header(mutation.name, &mutation.value),
            }
        }
    }
}

/// Run the preflight flow for `OPTIONS` requests and the actual request flow otherwise
pub fn decide<R: RequestView + ?Sized>(policy: &Policy, request: &R) -> Outcome {
    if request.method().eq_ignore_ascii_case("OPTIONS") {
        preflight(policy, request)
    } else {
        actual_request(policy, request)
    }
}

/// `*` when every origin is allowed and credentials are not, otherwise the origin verbatim
fn allow_origin(policy: &Policy, origin: &Origin) -> HeaderMutation {
    if policy.allow_all_origins() && !policy.allow_credentials() {
        HeaderMutation::set(headers::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
    } else {
        HeaderMutation::set(headers::ACCESS_CONTROL_ALLOW_ORIGIN, origin.0.as_str())
    }
}

/// Build the response for a preflight request
///
/// This implementation references the
/// [W3C recommendation](https://www.w3.org/TR/cors/#resource-preflight-requests).
pub fn preflight<R: RequestView + ?Sized>(policy: &Policy, request: &R) -> Outcome {
    let mut outcome = Outcome::new(RequestKind::Preflight);
    outcome.short_circuit = !policy.options_passthrough();

    // https://github.com/rs/cors/issues/10
    outcome.push(HeaderMutation::set(headers::VARY, PREFLIGHT_VARY));

    let origin = match Origin::from_view(request) {
        Some(origin) => origin,
        None => return outcome.deny(Denial::MissingOrigin),
    };

    if !policy.is_origin_allowed(&origin) {
        return outcome.deny(Denial::OriginNotAllowed(origin.0));
    }

    let AccessControlRequestMethod(method) = AccessControlRequestMethod::from_view(request);
    if !policy.is_method_allowed(&method) {
        return outcome.deny(Denial::MethodNotAllowed(method));
    }

    let requested_headers = AccessControlRequestHeaders::from_view(request);
    if !policy.are_headers_allowed(&requested_headers.0) {
        return outcome.deny(Denial::HeadersNotAllowed(requested_headers.0));
    }

    outcome.push(allow_origin(policy, &origin));

    // The list of methods can be unbounded, so only the requested one is returned
    outcome.push(HeaderMutation::set(
        headers::ACCESS_CONTROL_ALLOW_METHODS,
        method,
    ));

    // Same for headers
    if !requested_headers.is_empty() {
        outcome.push(HeaderMutation::set(
            headers::ACCESS_CONTROL_ALLOW_HEADERS,
            requested_headers.joined(),
        ));
    }

    if policy.allow_credentials() {
        outcome.push(HeaderMutation::set(
            headers::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            "true",
        ));
    }

    if policy.max_age() > 0 {
        outcome.push(HeaderMutation::set(
            headers::ACCESS_CONTROL_MAX_AGE,
            policy.max_age().to_string(),
        ));
    }

    outcome
}

/// Build the response for an actual request
///
/// This implementation references the
/// [W3C recommendation](https://www.w3.org/TR/cors/#resource-requests).
pub fn actual_request<R: RequestView + ?Sized>(policy: &Policy, request: &R) -> Outcome {
    let mut outcome = Outcome::new(RequestKind::Actual);

    let method = request.method().to_ascii_uppercase();
    if method == "OPTIONS" {
        return outcome.deny(Denial::OptionsRequest);
    }

    outcome.push(HeaderMutation::append(headers::VARY, headers::ORIGIN));

    let origin = match Origin::from_view(request) {
        Some(origin) => origin,
        None => return outcome.deny(Denial::MissingOrigin),
    };

    if !policy.is_origin_allowed(&origin) {
        return outcome.deny(Denial::OriginNotAllowed(origin.0));
    }

    // The W3C model only checks methods on preflights. Checking them here as well lets a
    // policy refuse simple methods like GET or POST.
    if !policy.is_method_allowed(&method) {
        return outcome.deny(Denial::MethodNotAllowed(method));
    }

    outcome.push(allow_origin(policy, &origin));

    if !policy.exposed_headers().is_empty() {
        outcome.push(HeaderMutation::set(
            headers::ACCESS_CONTROL_EXPOSE_HEADERS,
            policy.exposed_headers().join(", "),
        ));
    }

    if policy.allow_credentials() {
        outcome.push(HeaderMutation::set(
            headers::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            "true",
        ));
    }

    outcome
}
