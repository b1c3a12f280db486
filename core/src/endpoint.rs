//! Service names and their base URLs.

use std::collections::HashMap;
use std::fmt;

/// Root every service hangs off unless overridden.
pub const DEFAULT_ROOT: &str = "https://www.trestleapp.com/v1";

/// One addressable category of remote entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    User,
    Object,
    Geo,
    Audio,
    Image,
    Job,
    Mailbox,
    S3,
    Stat,
    Email,
}

impl Service {
    pub const ALL: [Service; 10] = [
        Service::User,
        Service::Object,
        Service::Geo,
        Service::Audio,
        Service::Image,
        Service::Job,
        Service::Mailbox,
        Service::S3,
        Service::Stat,
        Service::Email,
    ];

    /// Path segment under the API root.
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::User => "user",
            Service::Object => "object",
            Service::Geo => "geo",
            Service::Audio => "audio",
            Service::Image => "image",
            Service::Job => "job",
            Service::Mailbox => "mailbox",
            Service::S3 => "s3",
            Service::Stat => "stat",
            Service::Email => "email",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base URL per service.
///
/// A service resolves to its explicit override when one is set, otherwise to
/// `{root}/{service}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    root: String,
    overrides: HashMap<Service, String>,
}

impl Endpoints {
    pub fn new() -> Self {
        Self::with_root(DEFAULT_ROOT)
    }

    pub fn with_root(root: &str) -> Self {
        Self {
            root: root.trim_end_matches('/').to_string(),
            overrides: HashMap::new(),
        }
    }

    /// Point a single service somewhere else.
    pub fn with_service(mut self, service: Service, base_url: &str) -> Self {
        self.overrides
            .insert(service, base_url.trim_end_matches('/').to_string());
        self
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn base(&self, service: Service) -> String {
        match self.overrides.get(&service) {
            Some(url) => url.clone(),
            None => format!("{}/{}", self.root, service),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_hang_off_the_public_root() {
        let endpoints = Endpoints::new();
        assert_eq!(endpoints.base(Service::User), "https://www.trestleapp.com/v1/user");
        assert_eq!(endpoints.base(Service::S3), "https://www.trestleapp.com/v1/s3");
    }

    #[test]
    fn every_service_has_a_distinct_base() {
        let endpoints = Endpoints::new();
        let mut bases: Vec<String> = Service::ALL.iter().map(|s| endpoints.base(*s)).collect();
        bases.sort();
        bases.dedup();
        assert_eq!(bases.len(), Service::ALL.len());
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let endpoints = Endpoints::with_root("http://localhost:3000/v1/");
        assert_eq!(endpoints.root(), "http://localhost:3000/v1");
        assert_eq!(endpoints.base(Service::Geo), "http://localhost:3000/v1/geo");
        assert_eq!(Endpoints::new().root(), DEFAULT_ROOT);
    }

    #[test]
    fn single_service_override_wins() {
        let endpoints = Endpoints::new().with_service(Service::Stat, "http://stats.local/v2/stat/");
        assert_eq!(endpoints.base(Service::Stat), "http://stats.local/v2/stat");
        assert_eq!(endpoints.base(Service::Job), "https://www.trestleapp.com/v1/job");
    }
}
