//! Probe route matching.

use axum::http::Method;

/// A diagnostic route answered by the supervisor itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// `GET /`
    Root,
    /// `GET /health`
    Health,
    /// `GET /db`
    Database,
    /// `GET /redis`
    Cache,
}

impl Probe {
    /// Metric label for this probe.
    pub fn label(self) -> &'static str {
        match self {
            Probe::Root => "root",
            Probe::Health => "health",
            Probe::Database => "db",
            Probe::Cache => "redis",
        }
    }
}

/// Priority-ordered routing table.
const ROUTES: [(&str, Probe); 4] = [
    ("/", Probe::Root),
    ("/health", Probe::Health),
    ("/db", Probe::Database),
    ("/redis", Probe::Cache),
];

/// Path portion of a raw request target: everything before the first `?`.
/// An absent target yields the empty string.
pub fn request_path(target: Option<&str>) -> &str {
    match target {
        Some(target) => target.split('?').next().unwrap_or_default(),
        None => "",
    }
}

/// Match a request against the probe table.
pub fn match_probe(method: &Method, target: Option<&str>) -> Option<Probe> {
    if method != Method::GET {
        return None;
    }
    let path = request_path(target);
    ROUTES
        .iter()
        .find(|(route, _)| *route == path)
        .map(|(_, probe)| *probe)
}
