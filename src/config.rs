use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_LLM_PROVIDER: &str = "groq";
pub const DEFAULT_LLM_MODEL: &str = "llama-4-scout";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Base URL of the copy backend, without trailing slash.
    pub api_url: String,
    pub port: u16,
    pub llm_provider: String,
    pub llm_model: String,
    pub http_timeout: Duration,
    /// Fallback URL attached to share intents when the page does not send one.
    pub public_url: String,
    /// Sessions not looked up for this long are evicted.
    pub session_ttl: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            port: 8080,
            llm_provider: DEFAULT_LLM_PROVIDER.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            http_timeout: Duration::from_secs(60),
            public_url: "http://localhost:8080".to_string(),
            session_ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Settings::default();
        let non_empty = |k: &str| get(k).filter(|v| !v.trim().is_empty());

        let api_url = non_empty("MANGO_API_URL")
            .or_else(|| non_empty("VITE_API_URL"))
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);
        let port = non_empty("PORT").and_then(|v| v.parse().ok()).unwrap_or(defaults.port);
        let http_timeout = non_empty("MANGO_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.http_timeout);
        let session_ttl = non_empty("MANGO_SESSION_TTL_SECS")
            .and_then(|v| v.parse().ok())
            .filter(|secs: &u64| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.session_ttl);

        Self {
            api_url,
            port,
            llm_provider: non_empty("MANGO_LLM_PROVIDER").unwrap_or(defaults.llm_provider),
            llm_model: non_empty("MANGO_LLM_MODEL").unwrap_or(defaults.llm_model),
            http_timeout,
            public_url: non_empty("MANGO_PUBLIC_URL").unwrap_or_else(|| format!("http://localhost:{}", port)),
            session_ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn unset_env_uses_local_backend() {
        assert_eq!(Settings::from_lookup(lookup(&[])), Settings::default());
    }

    #[test]
    fn api_url_prefers_mango_var_and_strips_slash() {
        let s = Settings::from_lookup(lookup(&[
            ("MANGO_API_URL", "https://copy.example.com/"),
            ("VITE_API_URL", "http://ignored"),
            ("PORT", "9000"),
        ]));
        assert_eq!(s.api_url, "https://copy.example.com");
        assert_eq!(s.port, 9000);
    }

    #[test]
    fn bad_numbers_fall_back() {
        let s = Settings::from_lookup(lookup(&[("PORT", "abc"), ("MANGO_HTTP_TIMEOUT_SECS", "-1")]));
        assert_eq!(s.port, 8080);
        assert_eq!(s.http_timeout, Duration::from_secs(60));
    }

    #[test]
    fn session_ttl_from_env() {
        let s = Settings::from_lookup(lookup(&[("MANGO_SESSION_TTL_SECS", "90")]));
        assert_eq!(s.session_ttl, Duration::from_secs(90));
        let zero = Settings::from_lookup(lookup(&[("MANGO_SESSION_TTL_SECS", "0")]));
        assert_eq!(zero.session_ttl, Duration::from_secs(3600));
    }
}
