//! Route categorization for metrics and logging.

use axum::http::Uri;

/// Route classification for metrics grouping.
///
/// Categorizes routes based on their URI path for aggregated metrics and
/// performance-threshold selection. Each category represents a distinct
/// functional area of the OGC API Processes surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteCategory {
    /// Process listing, description, and execution routes (`/processes/*`).
    Execution,
    /// Job status, results, logs, and dismiss routes (`/jobs/*`).
    Jobs,
    /// Operator routes for resource and queue introspection (`/admin/*`).
    Admin,
    /// Health and conformance routes (`/healthz`, `/conformance`).
    Health,
    /// API documentation routes (`/api/*`).
    Docs,
    /// Unknown or uncategorized routes.
    Unknown,
}

impl RouteCategory {
    /// Categorizes a route based on its URI path.
    pub fn from_uri(uri: &Uri) -> Self {
        let path = uri.path();

        if path.starts_with("/processes") {
            Self::Execution
        } else if path.starts_with("/jobs") {
            Self::Jobs
        } else if path.starts_with("/admin") {
            Self::Admin
        } else if path.starts_with("/healthz") || path.starts_with("/conformance") {
            Self::Health
        } else if path.starts_with("/api") {
            Self::Docs
        } else {
            Self::Unknown
        }
    }

    /// Returns the string representation for logging and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Execution => "execution",
            Self::Jobs => "jobs",
            Self::Admin => "admin",
            Self::Health => "health",
            Self::Docs => "docs",
            Self::Unknown => "unknown",
        }
    }
}

/// Performance thresholds for different route categories.
pub struct PerformanceThresholds {
    pub warn_ms: u64,
    pub error_ms: u64,
}

impl PerformanceThresholds {
    /// Returns performance thresholds for a route category.
    ///
    /// `Execution` gets the widest berth since a sync-execute request can
    /// legitimately block on a job finishing; `Health` and `Admin` are
    /// expected to answer from in-memory state and stay fast.
    pub fn for_category(category: &RouteCategory) -> Self {
        match category {
            RouteCategory::Execution => Self {
                warn_ms: 5_000,
                error_ms: 60_000,
            },
            RouteCategory::Jobs => Self {
                warn_ms: 500,
                error_ms: 5_000,
            },
            RouteCategory::Admin => Self {
                warn_ms: 200,
                error_ms: 1_000,
            },
            RouteCategory::Health => Self {
                warn_ms: 100,
                error_ms: 500,
            },
            RouteCategory::Docs => Self {
                warn_ms: 500,
                error_ms: 2_000,
            },
            RouteCategory::Unknown => Self {
                warn_ms: 1_000,
                error_ms: 5_000,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorizes_known_prefixes() {
        let cases = [
            ("/processes", RouteCategory::Execution),
            ("/processes/tile-stats/execution", RouteCategory::Execution),
            ("/jobs/abc", RouteCategory::Jobs),
            ("/admin/resources", RouteCategory::Admin),
            ("/healthz", RouteCategory::Health),
            ("/conformance", RouteCategory::Health),
            ("/api/openapi.json", RouteCategory::Docs),
            ("/unmapped", RouteCategory::Unknown),
        ];

        for (path, expected) in cases {
            let uri: Uri = path.parse().unwrap();
            assert_eq!(RouteCategory::from_uri(&uri), expected, "path: {path}");
        }
    }

    #[test]
    fn execution_gets_the_widest_thresholds() {
        let thresholds = PerformanceThresholds::for_category(&RouteCategory::Execution);
        assert_eq!(thresholds.warn_ms, 5_000);
        assert_eq!(thresholds.error_ms, 60_000);
    }
}
