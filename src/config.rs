//! Build-time settings for the browser bundle and environment settings for the host.

/// Backend the host proxies to when `BACKEND_URL` is not set.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5001";

/// Path prefix the browser sends REST calls to.
pub const DEFAULT_API_BASE: &str = "/api";

/// Base URL of the REST API as seen from the browser. Overridden at build time with
/// `RUGBY_API_BASE`, e.g. to talk to a backend on another origin directly.
pub fn api_base() -> &'static str {
    option_env!("RUGBY_API_BASE").unwrap_or(DEFAULT_API_BASE)
}

/// Email of the account allowed to hide, restore and purge competitions. Unset disables those
/// actions.
pub fn super_admin_email() -> Option<&'static str> {
    option_env!("RUGBY_SUPERADMIN_EMAIL").filter(|email| !email.is_empty())
}

pub fn is_super_admin(email: &str) -> bool {
    super_admin_email().is_some_and(|admin| admin.eq_ignore_ascii_case(email))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub backend_url: String,
}

impl HostConfig {
    /// Loads `.env` if present, then reads the process environment.
    #[cfg(feature = "ssr")]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let backend_url = lookup("BACKEND_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        Self { backend_url }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
