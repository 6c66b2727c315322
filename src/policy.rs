//! Normalized CORS policy and the origin, method and header matchers
use std::collections::HashSet;

use crate::config::CorsSettings;

/// An allowed origin containing a single `*`, split into the text before and after it.
///
/// `https://*.acme.com` becomes the prefix `https://` and the suffix `.acme.com`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct WildcardOrigin {
    prefix: String,
    suffix: String,
}

impl WildcardOrigin {
    /// Split a lower-cased pattern at its first `*`. Returns `None` if there is no `*`.
    fn parse(pattern: &str) -> Option<Self> {
        pattern.find('*').map(|i| Self {
            prefix: pattern[..i].to_string(),
            suffix: pattern[i + 1..].to_string(),
        })
    }

    /// The part of the pattern before the `*`
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The part of the pattern after the `*`
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Match an already lower-cased origin.
    ///
    /// The length guard keeps the prefix and the suffix from claiming the same characters,
    /// so `*.acme.com` does not match `.acme.com` and `https://*` does not match `https:/`.
    pub fn matches(&self, origin: &str) -> bool {
        origin.len() >= self.prefix.len() + self.suffix.len()
            && origin.starts_with(&self.prefix)
            && origin.ends_with(&self.suffix)
    }
}

/// The CORS policy, normalized once from [`CorsSettings`] and never mutated afterwards.
///
/// A `Policy` is plain data. It can be shared between any number of concurrent requests
/// without synchronization.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Policy {
    enabled: bool,
    allow_all_origins: bool,
    plain_origins: HashSet<String>,
    wildcard_origins: Vec<WildcardOrigin>,
    allow_all_headers: bool,
    /// Whether any header was configured at all, before `origin` is added
    restrict_headers: bool,
    allowed_headers: HashSet<String>,
    exposed_headers: Vec<String>,
    allowed_methods: HashSet<String>,
    allow_credentials: bool,
    max_age: i64,
    options_passthrough: bool,
}

impl Policy {
    /// Normalize raw settings into a policy.
    ///
    /// This never fails. Settings that make no sense degrade to restrictive behaviour, for
    /// example an empty method list denies every request including preflights.
    pub fn new(settings: &CorsSettings) -> Self {
        let mut allow_all_origins = false;
        let mut plain_origins = HashSet::new();
        let mut wildcard_origins = Vec::new();

        for origin in &settings.allowed_origins {
            let origin = origin.to_ascii_lowercase();
            if origin == "*" {
                // Everything after an "allow all" entry is irrelevant
                allow_all_origins = true;
                plain_origins.clear();
                wildcard_origins.clear();
                break;
            }
            match WildcardOrigin::parse(&origin) {
                Some(wildcard) => wildcard_origins.push(wildcard),
                None => {
                    let _ = plain_origins.insert(origin);
                }
            }
        }

        // Some browsers always list `Origin` in `Access-Control-Request-Headers`
        let mut allowed_headers: Vec<String> = settings.allowed_headers.clone();
        if !allowed_headers
            .iter()
            .any(|header| header.eq_ignore_ascii_case(crate::headers::ORIGIN))
        {
            allowed_headers.push(crate::headers::ORIGIN.to_string());
        }
        let allowed_headers: HashSet<String> = allowed_headers
            .iter()
            .map(|header| header.to_ascii_lowercase())
            .collect();
        let allow_all_headers = allowed_headers.contains("*");

        let exposed_headers = settings
            .exposed_headers
            .iter()
            .map(|header| header.to_ascii_lowercase())
            .collect();

        let allowed_methods = settings
            .allowed_methods
            .iter()
            .map(|method| method.to_ascii_uppercase())
            .collect();

        Self {
            enabled: settings.enabled,
            allow_all_origins,
            plain_origins,
            wildcard_origins,
            allow_all_headers,
            restrict_headers: !settings.allowed_headers.is_empty(),
            allowed_headers,
            exposed_headers,
            allowed_methods,
            allow_credentials: settings.allow_credentials,
            max_age: settings.max_age,
            options_passthrough: settings.options_passthrough,
        }
    }

    /// Returns whether `origin` may make cross-origin requests.
    ///
    /// With "allow all" configured this is true for every input, including the empty string.
    /// Callers reject empty origins before asking.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.allow_all_origins {
            return true;
        }
        let origin = origin.to_ascii_lowercase();
        if self.plain_origins.contains(&origin) {
            return true;
        }
        self.wildcard_origins
            .iter()
            .any(|wildcard| wildcard.matches(&origin))
    }

    /// Returns whether `method` is allowed, case-insensitively.
    ///
    /// An empty method list denies everything, `OPTIONS` included, which turns preflight
    /// handling off. Otherwise `OPTIONS` is always allowed.
    pub fn is_method_allowed(&self, method: &str) -> bool {
        if self.allowed_methods.is_empty() {
            return false;
        }
        let method = method.to_ascii_uppercase();
        if method == "OPTIONS" {
            return true;
        }
        self.allowed_methods.contains(&method)
    }

    /// Returns whether every requested header is allowed.
    ///
    /// `requested` holds lower-cased, trimmed tokens. Unlike methods, an empty header
    /// list places no restriction at all.
    pub fn are_headers_allowed<S: AsRef<str>>(&self, requested: &[S]) -> bool {
        if self.allow_all_headers || !self.restrict_headers {
            return true;
        }
        requested
            .iter()
            .all(|header| self.allowed_headers.contains(header.as_ref()))
    }

    /// Whether CORS handling is switched on at all
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a `*` entry allowed every origin
    pub fn allow_all_origins(&self) -> bool {
        self.allow_all_origins
    }

    /// Lower-cased origins without a wildcard
    pub fn plain_origins(&self) -> &HashSet<String> {
        &self.plain_origins
    }

    /// Origins with a single wildcard, in configured order
    pub fn wildcard_origins(&self) -> &[WildcardOrigin] {
        &self.wildcard_origins
    }

    /// Whether a `*` entry allowed every header
    pub fn allow_all_headers(&self) -> bool {
        self.allow_all_headers
    }

    /// Lower-cased allowed headers, always including `origin`
    pub fn allowed_headers(&self) -> &HashSet<String> {
        &self.allowed_headers
    }

    /// Lower-cased exposed headers, in configured order
    pub fn exposed_headers(&self) -> &[String] {
        &self.exposed_headers
    }

    /// Upper-cased allowed methods
    pub fn allowed_methods(&self) -> &HashSet<String> {
        &self.allowed_methods
    }

    /// Whether `Access-Control-Allow-Credentials: true` is announced
    pub fn allow_credentials(&self) -> bool {
        self.allow_credentials
    }

    /// Seconds a preflight result may be cached. Zero or less omits `Access-Control-Max-Age`.
    pub fn max_age(&self) -> i64 {
        self.max_age
    }

    /// Whether preflight requests continue to application routes
    pub fn options_passthrough(&self) -> bool {
        self.options_passthrough
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::new(&CorsSettings::default())
    }
}

impl<'a> From<&'a CorsSettings> for Policy {
    fn from(settings: &'a CorsSettings) -> Self {
        Self::new(settings)
    }
}
