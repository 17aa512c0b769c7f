use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub type CompetitionId = i64;
pub type MatchId = i64;
pub type PredictionId = i64;
pub type UserId = i64;

/// Colour given to competitions created from the admin panel.
pub const DEFAULT_COMPETITION_COLOR: &str = "#1976d2";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.firstname, self.surname)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub firstname: String,
    pub surname: String,
    pub email: String,
    pub is_admin: bool,
}

/// Body of the login-or-register request. There is no password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub firstname: String,
    pub surname: String,
}

/// The login endpoint answers with the user record plus the issued token.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionVersion {
    #[serde(default, deserialize_with = "session_version_text")]
    pub session_version: Option<String>,
}

/// Reads the session version as text. The counter may arrive as a JSON string or number, and
/// either form compares equal to the same text.
pub fn session_version_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    }))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competition {
    pub id: CompetitionId,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub hidden: bool,
}

impl Competition {
    pub fn status(&self) -> &'static str {
        if self.hidden {
            "Hidden"
        } else if self.archived {
            "Archived"
        } else {
            "Active"
        }
    }

    /// Archived and hidden competitions are only listed on request in the admin panel.
    pub fn is_shelved(&self) -> bool {
        self.archived || self.hidden
    }
}

fn default_color() -> String {
    DEFAULT_COMPETITION_COLOR.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCompetition {
    pub name: String,
    pub url: String,
    pub color: String,
}

impl Default for NewCompetition {
    fn default() -> Self {
        Self {
            name: String::new(),
            url: String::new(),
            color: default_color(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(default)]
    pub winner: Option<String>,
    #[serde(default)]
    pub margin: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: MatchId,
    pub competition_id: CompetitionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competition_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competition_color: Option<String>,
    pub team_a: String,
    pub team_b: String,
    pub kickoff: DateTime<Utc>,
    #[serde(default)]
    pub result: Option<MatchResult>,
}

impl Match {
    pub fn title(&self) -> String {
        format!("{} vs {}", self.team_a, self.team_b)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMatch {
    pub competition_id: CompetitionId,
    pub team_a: String,
    pub team_b: String,
    pub kickoff: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub id: PredictionId,
    pub user_id: UserId,
    pub match_id: MatchId,
    #[serde(default, alias = "team", alias = "winner")]
    pub predicted_winner: Option<String>,
    #[serde(default)]
    pub margin: Option<u32>,
    #[serde(default)]
    pub locked: bool,
    // Present on expanded listings only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competition_id: Option<CompetitionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_a: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_b: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kickoff: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<MatchResult>,
}

/// One entry of a prediction submission. The server takes an array of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionSubmission {
    pub match_id: MatchId,
    pub user_id: UserId,
    pub predicted_winner: String,
    pub margin: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionStanding {
    pub competition_id: CompetitionId,
    #[serde(default)]
    pub earned: i64,
    #[serde(default)]
    pub submitted: u32,
    #[serde(default)]
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user: String,
    #[serde(default)]
    pub earned: i64,
    #[serde(default)]
    pub submitted: u32,
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub competitions: Vec<CompetitionStanding>,
}

/// Reply of the admin actions (refresh, unlock, recalculate).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub added: Option<u32>,
}
