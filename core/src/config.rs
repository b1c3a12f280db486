//! Client construction: explicit builder or environment variables.

use std::env;

use url::Url;

use crate::client::Trestle;
use crate::endpoint::{Endpoints, Service};
use crate::error::TrestleError;
use crate::http::{Transport, UreqTransport};
use crate::types::{Credentials, ReturnFormat};

pub const ENV_API_KEY: &str = "TRESTLE_API_KEY";
pub const ENV_API_SECRET: &str = "TRESTLE_API_SECRET";
pub const ENV_BASE_URL: &str = "TRESTLE_BASE_URL";
pub const ENV_RETURN_FORMAT: &str = "TRESTLE_RETURN_FORMAT";

/// Builder for `Trestle` clients.
///
/// Credentials are fixed here and cannot change for the client's lifetime.
pub struct TrestleBuilder {
    credentials: Credentials,
    root: Option<String>,
    overrides: Vec<(Service, String)>,
    format: ReturnFormat,
    transport: Option<Box<dyn Transport>>,
}

impl TrestleBuilder {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(key, secret),
            root: None,
            overrides: Vec::new(),
            format: ReturnFormat::default(),
            transport: None,
        }
    }

    /// Read `TRESTLE_API_KEY`, `TRESTLE_API_SECRET` and, when set,
    /// `TRESTLE_BASE_URL` and `TRESTLE_RETURN_FORMAT`.
    pub fn from_env() -> Result<Self, TrestleError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TrestleError> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| TrestleError::Config(format!("{name} is not set")))
        };
        let mut builder = Self::new(required(ENV_API_KEY)?, required(ENV_API_SECRET)?);
        if let Some(root) = lookup(ENV_BASE_URL).filter(|v| !v.is_empty()) {
            builder = builder.root(root);
        }
        if let Some(format) = lookup(ENV_RETURN_FORMAT).filter(|v| !v.is_empty()) {
            builder = builder.return_format(format.parse()?);
        }
        Ok(builder)
    }

    /// Replace the API root every service hangs off.
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Point one service at its own base URL.
    pub fn endpoint(mut self, service: Service, base_url: impl Into<String>) -> Self {
        self.overrides.push((service, base_url.into()));
        self
    }

    pub fn return_format(mut self, format: ReturnFormat) -> Self {
        self.format = format;
        self
    }

    /// Use a custom transport instead of the default blocking agent.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Fails with `TrestleError::Config` when any endpoint is not an
    /// absolute http(s) URL.
    pub fn build(self) -> Result<Trestle, TrestleError> {
        let mut endpoints = match &self.root {
            Some(root) => Endpoints::with_root(root),
            None => Endpoints::new(),
        };
        for (service, base) in &self.overrides {
            endpoints = endpoints.with_service(*service, base);
        }
        for service in Service::ALL {
            check_endpoint(&endpoints.base(service))?;
        }

        let transport = self
            .transport
            .unwrap_or_else(|| Box::new(UreqTransport::new()));
        Ok(Trestle::from_parts(self.credentials, endpoints, self.format, transport))
    }
}

fn check_endpoint(base: &str) -> Result<(), TrestleError> {
    let url = Url::parse(base)
        .map_err(|e| TrestleError::Config(format!("invalid endpoint '{base}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(TrestleError::Config(format!(
            "invalid endpoint '{base}': unsupported scheme '{other}'"
        ))),
    }
}
