//! Thin client for the predictions REST API.
//!
//! Requests are plain values ([`ApiRequest`]) so they can be inspected without a browser. Sending
//! goes through `fetch` in the hydrated bundle; anywhere else it fails with
//! [`ApiError::Network`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::model::{
    ActionResponse, Competition, CompetitionId, LeaderboardEntry, LoginRequest, LoginResponse,
    Match, MatchId, NewCompetition, NewMatch, NewUser, Prediction, PredictionId,
    PredictionSubmission, SessionVersion, User, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),
    /// The server answered with a non-2xx status.
    #[error("API error: {status} - {body}")]
    Status { status: u16, body: String },
    /// The response body was not the JSON we expected.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Maps a raw response to its body, or to [`ApiError::Status`] when it is not a success.
pub fn check_status(status: u16, body: String) -> Result<String, ApiError> {
    if (200..300).contains(&status) {
        Ok(body)
    } else {
        Err(ApiError::Status { status, body })
    }
}

pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Like [`decode`], but an empty body yields the default value. Admin actions do not always
/// send one back.
pub fn decode_or_default<T: DeserializeOwned + Default>(body: &str) -> Result<T, ApiError> {
    if body.trim().is_empty() {
        Ok(T::default())
    } else {
        decode(body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request(&self, method: Method, path: &str) -> ApiRequest {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(token) = &self.token {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }
        ApiRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            headers,
            body: None,
        }
    }

    pub fn request_with_body<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<ApiRequest, ApiError> {
        let mut request = self.request(method, path);
        request.body =
            Some(serde_json::to_string(body).map_err(|e| ApiError::Decode(e.to_string()))?);
        Ok(request)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let body = send(&request).await?;
        decode(&body)
    }

    async fn fetch_action(&self, request: ApiRequest) -> Result<ActionResponse, ApiError> {
        let body = send(&request).await?;
        decode_or_default(&body)
    }

    async fn fetch_unit(&self, request: ApiRequest) -> Result<(), ApiError> {
        send(&request).await.map(|_| ())
    }

    /// Health check used by the status footer.
    pub async fn hello(&self) -> Result<(), ApiError> {
        self.fetch_unit(self.request(Method::Get, "/hello")).await
    }

    pub async fn session_version(&self) -> Result<Option<String>, ApiError> {
        let version: SessionVersion = self
            .fetch_json(self.request(Method::Get, "/session-version"))
            .await?;
        Ok(version.session_version)
    }

    pub async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let request = self.request_with_body(Method::Post, "/users/login", credentials)?;
        self.fetch_json(request).await
    }

    // Competitions.

    pub async fn competitions(&self, include_archived: bool) -> Result<Vec<Competition>, ApiError> {
        let path = if include_archived {
            "/competitions?includeArchived=1"
        } else {
            "/competitions"
        };
        self.fetch_json(self.request(Method::Get, path)).await
    }

    pub async fn create_competition(
        &self,
        competition: &NewCompetition,
    ) -> Result<Competition, ApiError> {
        let request = self.request_with_body(Method::Post, "/competitions", competition)?;
        self.fetch_json(request).await
    }

    pub async fn update_competition(&self, competition: &Competition) -> Result<(), ApiError> {
        let path = format!("/competitions/{}", competition.id);
        let request = self.request_with_body(Method::Put, &path, competition)?;
        self.fetch_unit(request).await
    }

    pub async fn delete_competition(&self, id: CompetitionId) -> Result<(), ApiError> {
        let path = format!("/competitions/{}", id);
        self.fetch_unit(self.request(Method::Delete, &path)).await
    }

    /// Pulls the competition's external feed. The response reports how many matches were added.
    pub async fn refresh_competition(&self, id: CompetitionId) -> Result<ActionResponse, ApiError> {
        let path = format!("/competitions/{}/refresh", id);
        self.fetch_action(self.request(Method::Post, &path)).await
    }

    pub async fn hide_competition(&self, id: CompetitionId) -> Result<(), ApiError> {
        let path = format!("/competitions/{}/hide", id);
        self.fetch_unit(self.request(Method::Post, &path)).await
    }

    pub async fn restore_competition(&self, id: CompetitionId) -> Result<(), ApiError> {
        let path = format!("/competitions/{}/restore", id);
        self.fetch_unit(self.request(Method::Post, &path)).await
    }

    /// Hard delete of a competition with all of its matches and predictions.
    pub async fn purge_competition(&self, id: CompetitionId) -> Result<(), ApiError> {
        let path = format!("/superadmin/competitions/{}", id);
        self.fetch_unit(self.request(Method::Delete, &path)).await
    }

    // Matches.

    pub async fn matches(&self) -> Result<Vec<Match>, ApiError> {
        self.fetch_json(self.request(Method::Get, "/matches")).await
    }

    pub async fn create_match(&self, new_match: &NewMatch) -> Result<Match, ApiError> {
        let request = self.request_with_body(Method::Post, "/matches", new_match)?;
        self.fetch_json(request).await
    }

    pub async fn update_match(&self, fixture: &Match) -> Result<(), ApiError> {
        let path = format!("/matches/{}", fixture.id);
        let request = self.request_with_body(Method::Put, &path, fixture)?;
        self.fetch_unit(request).await
    }

    pub async fn delete_match(&self, id: MatchId) -> Result<(), ApiError> {
        let path = format!("/matches/{}", id);
        self.fetch_unit(self.request(Method::Delete, &path)).await
    }

    // Predictions.

    /// Predictions of the logged in user; the server derives the user from the token.
    pub async fn my_predictions(&self) -> Result<Vec<Prediction>, ApiError> {
        self.fetch_json(self.request(Method::Get, "/predictions"))
            .await
    }

    pub async fn all_predictions(&self) -> Result<Vec<Prediction>, ApiError> {
        self.fetch_json(self.request(Method::Get, "/predictions?all=1&expand=1"))
            .await
    }

    pub async fn submit_predictions(
        &self,
        submissions: &[PredictionSubmission],
    ) -> Result<(), ApiError> {
        let request = self.request_with_body(Method::Post, "/predictions", &submissions)?;
        self.fetch_unit(request).await
    }

    pub async fn update_prediction(&self, prediction: &Prediction) -> Result<(), ApiError> {
        let path = format!("/admin/predictions/{}", prediction.id);
        let request = self.request_with_body(Method::Put, &path, prediction)?;
        self.fetch_unit(request).await
    }

    pub async fn delete_prediction(&self, id: PredictionId) -> Result<(), ApiError> {
        let path = format!("/admin/predictions/{}", id);
        self.fetch_unit(self.request(Method::Delete, &path)).await
    }

    // Users.

    pub async fn users(&self) -> Result<Vec<User>, ApiError> {
        self.fetch_json(self.request(Method::Get, "/users")).await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        let request = self.request_with_body(Method::Post, "/users", user)?;
        self.fetch_json(request).await
    }

    pub async fn update_user(&self, user: &User) -> Result<(), ApiError> {
        let path = format!("/users/{}", user.id);
        let request = self.request_with_body(Method::Put, &path, user)?;
        self.fetch_unit(request).await
    }

    pub async fn delete_user(&self, id: UserId) -> Result<(), ApiError> {
        let path = format!("/users/{}", id);
        self.fetch_unit(self.request(Method::Delete, &path)).await
    }

    // Leaderboard and admin actions.

    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, ApiError> {
        self.fetch_json(self.request(Method::Get, "/leaderboard"))
            .await
    }

    /// Invalidates every session by bumping the server session version.
    pub async fn force_logout(&self) -> Result<ActionResponse, ApiError> {
        self.fetch_action(self.request(Method::Post, "/admin/force-logout"))
            .await
    }

    pub async fn recalc_leaderboard(&self) -> Result<ActionResponse, ApiError> {
        self.fetch_action(self.request(Method::Post, "/admin/recalc-leaderboard"))
            .await
    }

    pub async fn unlock_predictions(&self) -> Result<ActionResponse, ApiError> {
        self.fetch_action(self.request(Method::Post, "/admin/predictions/unlock"))
            .await
    }
}

/// Sends the request and returns the body of a successful response.
pub async fn send(request: &ApiRequest) -> Result<String, ApiError> {
    let (status, body) = transmit(request).await?;
    check_status(status, body)
}

#[cfg(feature = "hydrate")]
async fn transmit(request: &ApiRequest) -> Result<(u16, String), ApiError> {
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_futures::JsFuture;

    fn network(e: JsValue) -> ApiError {
        ApiError::Network(format!("{:?}", e))
    }

    let window = web_sys::window().ok_or_else(|| ApiError::Network("no window".to_string()))?;

    let init = web_sys::RequestInit::new();
    init.set_method(request.method.as_str());
    let headers = web_sys::Headers::new().map_err(network)?;
    for (name, value) in &request.headers {
        headers.set(name, value).map_err(network)?;
    }
    init.set_headers(&headers);
    if let Some(body) = &request.body {
        init.set_body(&JsValue::from_str(body));
    }

    let fetch_request =
        web_sys::Request::new_with_str_and_init(&request.url, &init).map_err(network)?;
    let response: web_sys::Response = JsFuture::from(window.fetch_with_request(&fetch_request))
        .await
        .map_err(network)?
        .dyn_into()
        .map_err(network)?;

    let status = response.status();
    let text = JsFuture::from(response.text().map_err(network)?)
        .await
        .map_err(network)?;
    Ok((status, text.as_string().unwrap_or_default()))
}

#[cfg(not(feature = "hydrate"))]
async fn transmit(request: &ApiRequest) -> Result<(u16, String), ApiError> {
    Err(ApiError::Network(format!(
        "{} {} can only be sent from the browser",
        request.method.as_str(),
        request.url
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_headers() {
        let anonymous = ApiClient::new("/api/").request(Method::Get, "/matches");
        assert_eq!(anonymous.url, "/api/matches");
        assert_eq!(anonymous.header("content-type"), Some("application/json"));
        assert_eq!(anonymous.header("Authorization"), None);

        let client = ApiClient::new("/api").with_token(Some("abc123".to_string()));
        let request = client.request(Method::Delete, "/users/4");
        assert_eq!(request.method.as_str(), "DELETE");
        assert_eq!(request.header("Authorization"), Some("Bearer abc123"));

        // An empty token is the same as no token.
        let request = ApiClient::new("/api")
            .with_token(Some(String::new()))
            .request(Method::Get, "/users");
        assert_eq!(request.header("Authorization"), None);
    }

    #[test]
    fn test_request_body() {
        let credentials = LoginRequest {
            email: "jo@example.com".to_string(),
            firstname: "Jo".to_string(),
            surname: "Bloggs".to_string(),
        };
        let request = ApiClient::new("http://localhost:5001")
            .request_with_body(Method::Post, "/users/login", &credentials)
            .unwrap();
        assert_eq!(request.url, "http://localhost:5001/users/login");
        let body: serde_json::Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["email"], "jo@example.com");
        assert_eq!(body["surname"], "Bloggs");
    }

    #[test]
    fn test_check_status() {
        assert_eq!(check_status(200, "[]".to_string()), Ok("[]".to_string()));
        assert_eq!(check_status(204, String::new()), Ok(String::new()));

        let err = check_status(403, "forbidden".to_string()).unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.to_string(), "API error: 403 - forbidden");

        assert_eq!(
            check_status(500, String::new()).unwrap_err().status(),
            Some(500)
        );
        assert_eq!(ApiError::Network("offline".to_string()).status(), None);
    }

    #[test]
    fn test_decode() {
        let users: Vec<User> = decode(
            r#"[{"id": 1, "email": "a@b.c", "firstname": "Ann", "surname": "Lee", "isAdmin": true}]"#,
        )
        .unwrap();
        assert_eq!(users.len(), 1);
        assert!(users[0].is_admin);
        assert_eq!(users[0].display_name(), "Ann Lee");

        assert!(matches!(
            decode::<Vec<User>>("<html>"),
            Err(ApiError::Decode(_))
        ));

        let empty: ActionResponse = decode_or_default("").unwrap();
        assert_eq!(empty, ActionResponse::default());
        let refreshed: ActionResponse = decode_or_default(r#"{"added": 3}"#).unwrap();
        assert_eq!(refreshed.added, Some(3));
    }

    #[test]
    fn test_decode_session_version() {
        let numeric: SessionVersion = decode(r#"{"sessionVersion": 3}"#).unwrap();
        assert_eq!(numeric.session_version.as_deref(), Some("3"));
        let text: SessionVersion = decode(r#"{"sessionVersion": "3"}"#).unwrap();
        assert_eq!(text, numeric);
        let missing: SessionVersion = decode("{}").unwrap();
        assert_eq!(missing.session_version, None);
        let null: SessionVersion = decode(r#"{"sessionVersion": null}"#).unwrap();
        assert_eq!(null.session_version, None);
    }

    #[test]
    fn test_decode_login_response() {
        let response: LoginResponse = decode(
            r#"{"id": 9, "email": "x@y.z", "firstname": "X", "surname": "Y", "isAdmin": false, "token": "t0k"}"#,
        )
        .unwrap();
        assert_eq!(response.user.id, 9);
        assert_eq!(response.token, "t0k");
    }

    #[test]
    fn test_decode_prediction_aliases() {
        let predictions: Vec<Prediction> = decode(
            r#"[
                {"id": 1, "userId": 2, "matchId": 3, "team": "Leinster", "margin": 7},
                {"id": 4, "userId": 2, "matchId": 5, "predictedWinner": "Munster", "locked": true}
            ]"#,
        )
        .unwrap();
        assert_eq!(predictions[0].predicted_winner.as_deref(), Some("Leinster"));
        assert!(!predictions[0].locked);
        assert_eq!(predictions[1].predicted_winner.as_deref(), Some("Munster"));
        assert!(predictions[1].locked);
        assert_eq!(predictions[1].margin, None);
    }
}
