//! Forwards `/api/*` from the host to the backend, keeping the `/api` prefix.

/// Path prefix the host forwards.
pub const API_PREFIX: &str = "/api";

/// Upstream URL for a proxied request. `path` is the part after `/api/`.
pub fn upstream_url(backend_url: &str, path: &str, query: Option<&str>) -> String {
    let mut url = format!(
        "{}{}/{}",
        backend_url.trim_end_matches('/'),
        API_PREFIX,
        path.trim_start_matches('/')
    );
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}

#[cfg(feature = "ssr")]
pub use host::{router, BackendProxy};

#[cfg(feature = "ssr")]
mod host {
    use axum::body::Bytes;
    use axum::extract::{Path, State};
    use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
    use axum::response::{IntoResponse, Response};
    use axum::routing::any;
    use axum::Router;
    use leptos::logging::{error, log};

    use super::upstream_url;
    use crate::config::HostConfig;

    /// Request headers passed on to the backend.
    const FORWARDED_HEADERS: [header::HeaderName; 3] =
        [header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT];

    #[derive(Clone)]
    pub struct BackendProxy {
        client: reqwest::Client,
        backend_url: String,
    }

    impl BackendProxy {
        pub fn new(config: &HostConfig) -> Self {
            Self {
                client: reqwest::Client::new(),
                backend_url: config.backend_url.clone(),
            }
        }

        async fn forward(
            &self,
            method: Method,
            url: String,
            headers: &HeaderMap,
            body: Bytes,
        ) -> Result<Response, reqwest::Error> {
            let mut request = self.client.request(method, &url);
            for name in FORWARDED_HEADERS {
                if let Some(value) = headers.get(&name) {
                    request = request.header(name, value.clone());
                }
            }
            if !body.is_empty() {
                request = request.body(body);
            }

            let upstream = request.send().await?;
            let status = upstream.status();
            let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
            let bytes = upstream.bytes().await?;

            let mut response = (status, bytes).into_response();
            if let Some(content_type) = content_type {
                response
                    .headers_mut()
                    .insert(header::CONTENT_TYPE, content_type);
            }
            Ok(response)
        }
    }

    async fn proxy_handler(
        State(proxy): State<BackendProxy>,
        Path(path): Path<String>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        let url = upstream_url(&proxy.backend_url, &path, uri.query());
        match proxy.forward(method.clone(), url.clone(), &headers, body).await {
            Ok(response) => response,
            Err(e) => {
                error!("Proxy error for {} {}: {}", method, url, e);
                (StatusCode::BAD_GATEWAY, format!("Backend unavailable: {}", e)).into_response()
            }
        }
    }

    /// Router serving `/api/{*path}`, ready to be merged into the application router.
    pub fn router<S>(config: &HostConfig) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        log!("Proxying /api to {}", config.backend_url);
        Router::new()
            .route("/api/{*path}", any(proxy_handler))
            .with_state(BackendProxy::new(config))
    }
}
