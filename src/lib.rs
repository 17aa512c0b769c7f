pub mod admin;
pub mod api;
pub mod app;
pub mod config;
pub mod model;
pub mod proxy;
pub mod session;

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::model::{
    Competition, CompetitionId, LeaderboardEntry, Match, MatchId, Prediction, PredictionId,
    PredictionSubmission, User, UserId,
};

#[cfg(feature = "hydrate")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn hydrate() {
    use crate::app::*;
    console_error_panic_hook::set_once();
    leptos::mount::hydrate_body(App);
}

/// True once the match has kicked off. Kickoff itself counts as started.
pub fn match_started(fixture: &Match, now: DateTime<Utc>) -> bool {
    now >= fixture.kickoff
}

/// A prediction is editable strictly before kickoff, unless it has been locked explicitly. When
/// the match is unknown only the explicit flag applies.
pub fn is_locked(prediction: &Prediction, fixture: Option<&Match>, now: DateTime<Utc>) -> bool {
    prediction.locked || fixture.is_some_and(|m| match_started(m, now))
}

/// Title shown in the top bar and the browser tab for a route.
pub fn page_title(path: &str) -> &'static str {
    match path.trim_end_matches('/') {
        "" | "/matches" => "Matches",
        "/leaderboard" => "Leaderboard",
        "/mypredictions" => "My predictions",
        "/profile" => "Profile",
        "/login" => "Login",
        "/admin" => "Admin",
        _ => "Rugby Predictions",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompetitionGroup {
    pub competition_id: CompetitionId,
    pub name: String,
    pub color: Option<String>,
    pub matches: Vec<Match>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixtureDay {
    pub date: NaiveDate,
    pub competitions: Vec<CompetitionGroup>,
}

/// Groups matches by calendar day in `tz`, then by competition in order of first appearance.
/// Matches are sorted by kickoff first. `only` restricts the result to one competition; days left
/// without matches are dropped.
pub fn group_fixtures<Tz: TimeZone>(
    matches: &[Match],
    competitions: &[Competition],
    only: Option<CompetitionId>,
    tz: &Tz,
) -> Vec<FixtureDay> {
    let mut sorted: Vec<&Match> = matches
        .iter()
        .filter(|m| only.is_none_or(|id| m.competition_id == id))
        .collect();
    sorted.sort_by_key(|m| m.kickoff);

    let mut days: BTreeMap<NaiveDate, Vec<CompetitionGroup>> = BTreeMap::new();
    for fixture in sorted {
        let date = fixture.kickoff.with_timezone(tz).date_naive();
        let groups = days.entry(date).or_default();
        match groups
            .iter_mut()
            .find(|g| g.competition_id == fixture.competition_id)
        {
            Some(group) => group.matches.push(fixture.clone()),
            None => {
                let competition = competitions
                    .iter()
                    .find(|c| c.id == fixture.competition_id);
                groups.push(CompetitionGroup {
                    competition_id: fixture.competition_id,
                    name: competition
                        .map(|c| c.name.clone())
                        .or_else(|| fixture.competition_name.clone())
                        .unwrap_or_else(|| "Unknown".to_string()),
                    color: competition
                        .map(|c| c.color.clone())
                        .or_else(|| fixture.competition_color.clone()),
                    matches: vec![fixture.clone()],
                });
            }
        }
    }

    days.into_iter()
        .map(|(date, competitions)| FixtureDay { date, competitions })
        .collect()
}

/// Unsaved pick for one match on the matches page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredictionDraft {
    pub team: Option<String>,
    pub margin: Option<u32>,
    /// Carried over from a saved prediction the server has locked.
    pub locked: bool,
}

impl PredictionDraft {
    pub fn is_locked(&self, fixture: &Match, now: DateTime<Utc>) -> bool {
        self.locked || match_started(fixture, now)
    }
}

/// Lock state of a fixture row, whether or not the user has a draft for it.
pub fn fixture_locked(
    fixture: &Match,
    draft: Option<&PredictionDraft>,
    now: DateTime<Utc>,
) -> bool {
    draft.map_or_else(|| match_started(fixture, now), |d| d.is_locked(fixture, now))
}

/// Seeds the drafts with the user's saved predictions.
pub fn drafts_from_predictions(predictions: &[Prediction]) -> HashMap<MatchId, PredictionDraft> {
    predictions
        .iter()
        .map(|p| {
            (
                p.match_id,
                PredictionDraft {
                    team: p.predicted_winner.clone(),
                    margin: p.margin,
                    locked: p.locked,
                },
            )
        })
        .collect()
}

/// Builds the submission for a group of matches. Started matches and locked predictions are never
/// submitted, nor are drafts without a chosen team.
pub fn collect_submissions(
    matches: &[Match],
    drafts: &HashMap<MatchId, PredictionDraft>,
    user_id: UserId,
    now: DateTime<Utc>,
) -> Vec<PredictionSubmission> {
    matches
        .iter()
        .filter_map(|m| {
            let draft = drafts.get(&m.id)?;
            if draft.is_locked(m, now) {
                return None;
            }
            let team = draft.team.clone().filter(|t| !t.is_empty())?;
            Some(PredictionSubmission {
                match_id: m.id,
                user_id,
                predicted_winner: team,
                margin: draft.margin,
            })
        })
        .collect()
}

/// Parses a margin typed into a form. Values are clamped to 1..=999; anything that is not a
/// number clears the margin.
pub fn parse_margin(input: &str) -> Option<u32> {
    input
        .trim()
        .parse::<i64>()
        .ok()
        .map(|v| v.clamp(1, 999) as u32)
}

/// Parses the value of a `datetime-local` input. The value is taken to be UTC, which is also how
/// [`kickoff_input_value`] renders it.
pub fn parse_kickoff_input(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn kickoff_input_value(kickoff: DateTime<Utc>) -> String {
    kickoff.format("%Y-%m-%dT%H:%M").to_string()
}

/// "TBD" until a result is in, then "winner" or "winner by margin".
pub fn result_label(prediction: &Prediction) -> String {
    let result = prediction.result.as_ref();
    let winner = result
        .and_then(|r| r.winner.clone())
        .filter(|w| !w.is_empty())
        .unwrap_or_else(|| "TBD".to_string());
    match result.and_then(|r| r.margin) {
        Some(margin) if margin > 0 => format!("{} by {}", winner, margin),
        _ => winner,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionDay {
    pub date: NaiveDate,
    pub predictions: Vec<Prediction>,
}

/// Groups the user's predictions by kickoff day, earliest first. Predictions without a kickoff
/// cannot be placed and are left out.
pub fn group_predictions_by_day<Tz: TimeZone>(
    predictions: &[Prediction],
    only: Option<CompetitionId>,
    tz: &Tz,
) -> Vec<PredictionDay> {
    let mut days: BTreeMap<NaiveDate, Vec<Prediction>> = BTreeMap::new();
    for prediction in predictions {
        if only.is_some_and(|id| prediction.competition_id != Some(id)) {
            continue;
        }
        let Some(kickoff) = prediction.kickoff else {
            continue;
        };
        days.entry(kickoff.with_timezone(tz).date_naive())
            .or_default()
            .push(prediction.clone());
    }
    days.into_iter()
        .map(|(date, mut predictions)| {
            predictions.sort_by_key(|p| p.kickoff);
            PredictionDay { date, predictions }
        })
        .collect()
}

/// DOM id of a day's section on the my predictions page, used by "Jump to today".
pub fn day_anchor(date: NaiveDate) -> String {
    format!("date-{}", date.format("%Y-%m-%d"))
}

/// The day "Jump to today" scrolls to: today if listed, else the next listed day, else the last.
pub fn jump_target(days: &[NaiveDate], today: NaiveDate) -> Option<NaiveDate> {
    days.iter()
        .copied()
        .find(|day| *day >= today)
        .or_else(|| days.last().copied())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub rank: usize,
    pub user: String,
    pub earned: i64,
    pub submitted: u32,
    pub accuracy: f64,
    /// Places gained since the previously displayed table; negative when dropped.
    pub movement: i64,
}

/// Ranks the leaderboard, overall or for one competition, against the ordering that was on
/// screen before. Users missing from the previous ordering show no movement.
pub fn standings(
    entries: &[LeaderboardEntry],
    competition: Option<CompetitionId>,
    previous: &[String],
) -> Vec<Standing> {
    let mut rows: Vec<(String, i64, u32, f64)> = entries
        .iter()
        .map(|entry| match competition {
            None => (
                entry.user.clone(),
                entry.earned,
                entry.submitted,
                entry.accuracy,
            ),
            Some(id) => {
                let stats = entry.competitions.iter().find(|c| c.competition_id == id);
                (
                    entry.user.clone(),
                    stats.map_or(0, |s| s.earned),
                    stats.map_or(0, |s| s.submitted),
                    stats.map_or(0.0, |s| s.accuracy),
                )
            }
        })
        .collect();
    // Stable, so ties keep the server's order.
    rows.sort_by(|a, b| b.1.cmp(&a.1));

    rows.into_iter()
        .enumerate()
        .map(|(index, (user, earned, submitted, accuracy))| {
            let movement = previous
                .iter()
                .position(|u| *u == user)
                .map_or(0, |prev| prev as i64 - index as i64);
            Standing {
                rank: index + 1,
                user,
                earned,
                submitted,
                accuracy,
                movement,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchView {
    #[default]
    All,
    Upcoming,
    Completed,
}

impl MatchView {
    /// All → Upcoming → Completed → All.
    pub fn next(self) -> Self {
        match self {
            MatchView::All => MatchView::Upcoming,
            MatchView::Upcoming => MatchView::Completed,
            MatchView::Completed => MatchView::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MatchView::All => "Showing: All Matches",
            MatchView::Upcoming => "Showing: Upcoming Only",
            MatchView::Completed => "Showing: Completed Only",
        }
    }

    fn admits(self, fixture: &Match, now: DateTime<Utc>) -> bool {
        match self {
            MatchView::All => true,
            MatchView::Upcoming => fixture.kickoff >= now,
            MatchView::Completed => fixture.kickoff < now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSortKey {
    Kickoff,
    Competition,
    TeamA,
    TeamB,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Ascending => "↑",
            SortDirection::Descending => "↓",
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSort {
    pub key: MatchSortKey,
    pub direction: SortDirection,
}

impl Default for MatchSort {
    fn default() -> Self {
        Self {
            key: MatchSortKey::Kickoff,
            direction: SortDirection::Ascending,
        }
    }
}

impl MatchSort {
    /// Clicking a column header sorts by that column and flips the direction.
    pub fn toggle(self, key: MatchSortKey) -> Self {
        Self {
            key,
            direction: self.direction.flip(),
        }
    }

    pub fn indicator(self, key: MatchSortKey) -> &'static str {
        if self.key == key {
            self.direction.arrow()
        } else {
            ""
        }
    }
}

fn competition_name_of<'a>(fixture: &'a Match, competitions: &'a [Competition]) -> &'a str {
    competitions
        .iter()
        .find(|c| c.id == fixture.competition_id)
        .map(|c| c.name.as_str())
        .or(fixture.competition_name.as_deref())
        .unwrap_or("")
}

/// Rows of the admin matches table: text search over the teams and competition name, the view
/// mode filter, then the chosen sort.
pub fn admin_match_rows(
    matches: &[Match],
    competitions: &[Competition],
    query: &str,
    view: MatchView,
    sort: MatchSort,
    now: DateTime<Utc>,
) -> Vec<Match> {
    let query = query.trim().to_lowercase();
    let mut rows: Vec<Match> = matches
        .iter()
        .filter(|m| {
            query.is_empty()
                || m.team_a.to_lowercase().contains(&query)
                || m.team_b.to_lowercase().contains(&query)
                || competition_name_of(m, competitions)
                    .to_lowercase()
                    .contains(&query)
        })
        .filter(|m| view.admits(m, now))
        .cloned()
        .collect();

    rows.sort_by(|a, b| {
        let ordering = match sort.key {
            MatchSortKey::Kickoff => a.kickoff.cmp(&b.kickoff),
            MatchSortKey::Competition => {
                competition_name_of(a, competitions).cmp(competition_name_of(b, competitions))
            }
            MatchSortKey::TeamA => a.team_a.cmp(&b.team_a),
            MatchSortKey::TeamB => a.team_b.cmp(&b.team_b),
        };
        sort.direction.apply(ordering)
    });
    rows
}

/// Case-insensitive search over first name, surname and email.
pub fn filter_users(users: &[User], query: &str) -> Vec<User> {
    let query = query.trim().to_lowercase();
    users
        .iter()
        .filter(|u| {
            [&u.firstname, &u.surname, &u.email]
                .iter()
                .any(|field| field.to_lowercase().contains(&query))
        })
        .cloned()
        .collect()
}

/// Lock state of a listed prediction, read from the latest copy of the list. A prediction that
/// is no longer listed counts as unlocked.
pub fn listed_prediction_locked(
    predictions: &[Prediction],
    id: PredictionId,
    fixture: Option<&Match>,
    now: DateTime<Utc>,
) -> bool {
    predictions
        .iter()
        .find(|p| p.id == id)
        .is_some_and(|p| is_locked(p, fixture, now))
}

/// A prediction with the records it refers to, as listed in the admin predictions table.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRow {
    pub prediction: Prediction,
    pub fixture: Option<Match>,
    pub user: Option<User>,
    pub competition: Option<Competition>,
}

impl PredictionRow {
    fn haystack(&self) -> String {
        [
            self.prediction.predicted_winner.clone().unwrap_or_default(),
            self.prediction
                .margin
                .map(|m| m.to_string())
                .unwrap_or_default(),
            self.fixture
                .as_ref()
                .map(|m| m.team_a.clone())
                .unwrap_or_default(),
            self.fixture
                .as_ref()
                .map(|m| m.team_b.clone())
                .unwrap_or_default(),
            self.competition
                .as_ref()
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            self.user
                .as_ref()
                .map(|u| u.email.clone())
                .unwrap_or_default(),
        ]
        .join(" ")
        .to_lowercase()
    }
}

/// Joins predictions with their match, user and competition, keeps those matching the search and
/// sorts them by kickoff. Rows whose match is gone sort as if they kicked off at the epoch.
pub fn admin_prediction_rows(
    predictions: &[Prediction],
    matches: &[Match],
    users: &[User],
    competitions: &[Competition],
    query: &str,
    direction: SortDirection,
) -> Vec<PredictionRow> {
    let matches: HashMap<MatchId, &Match> = matches.iter().map(|m| (m.id, m)).collect();
    let users: HashMap<UserId, &User> = users.iter().map(|u| (u.id, u)).collect();
    let competitions: HashMap<CompetitionId, &Competition> =
        competitions.iter().map(|c| (c.id, c)).collect();
    let query = query.trim().to_lowercase();

    let mut rows: Vec<PredictionRow> = predictions
        .iter()
        .map(|p| {
            let fixture = matches.get(&p.match_id).map(|m| (*m).clone());
            let competition = fixture
                .as_ref()
                .and_then(|m| competitions.get(&m.competition_id))
                .map(|c| (*c).clone());
            PredictionRow {
                prediction: p.clone(),
                user: users.get(&p.user_id).map(|u| (*u).clone()),
                fixture,
                competition,
            }
        })
        .filter(|row| query.is_empty() || row.haystack().contains(&query))
        .collect();

    rows.sort_by(|a, b| {
        let kickoff = |row: &PredictionRow| {
            row.fixture
                .as_ref()
                .map(|m| m.kickoff)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        };
        direction.apply(kickoff(a).cmp(&kickoff(b)))
    });
    rows
}

/// Which competitions the admin competitions table shows.
pub fn visible_competitions(competitions: &[Competition], show_shelved: bool) -> Vec<Competition> {
    competitions
        .iter()
        .filter(|c| show_shelved || !c.is_shelved())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CompetitionStanding, MatchResult};
    use chrono::{FixedOffset, TimeZone};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn competition(id: CompetitionId, name: &str) -> Competition {
        Competition {
            id,
            name: name.to_string(),
            url: String::new(),
            color: format!("#00000{}", id),
            archived: false,
            hidden: false,
        }
    }

    fn fixture(id: MatchId, competition_id: CompetitionId, a: &str, b: &str, kickoff: &str) -> Match {
        Match {
            id,
            competition_id,
            competition_name: None,
            competition_color: None,
            team_a: a.to_string(),
            team_b: b.to_string(),
            kickoff: at(kickoff),
            result: None,
        }
    }

    fn prediction(id: i64, user_id: UserId, match_id: MatchId) -> Prediction {
        Prediction {
            id,
            user_id,
            match_id,
            predicted_winner: None,
            margin: None,
            locked: false,
            competition_id: None,
            team_a: None,
            team_b: None,
            kickoff: None,
            result: None,
        }
    }

    fn user(id: UserId, firstname: &str, surname: &str, email: &str) -> User {
        User {
            id,
            email: email.to_string(),
            firstname: firstname.to_string(),
            surname: surname.to_string(),
            is_admin: false,
        }
    }

    #[test]
    fn test_lock_boundary() {
        let m = fixture(1, 1, "Leinster", "Munster", "2025-01-01T15:00:00Z");
        let p = prediction(1, 1, 1);

        assert!(!is_locked(&p, Some(&m), at("2025-01-01T14:59:59Z")));
        assert!(is_locked(&p, Some(&m), at("2025-01-01T15:00:00Z")));
        assert!(is_locked(&p, Some(&m), at("2025-01-01T15:00:01Z")));
    }

    #[test]
    fn test_lock_flag() {
        let m = fixture(1, 1, "Leinster", "Munster", "2025-01-01T15:00:00Z");
        let mut p = prediction(1, 1, 1);
        p.locked = true;

        assert!(is_locked(&p, Some(&m), at("2024-12-01T00:00:00Z")));
        assert!(is_locked(&p, None, at("2024-12-01T00:00:00Z")));

        // Without the flag, an unknown match does not lock the prediction.
        p.locked = false;
        assert!(!is_locked(&p, None, at("2030-01-01T00:00:00Z")));
    }

    #[test]
    fn test_page_title() {
        assert_eq!(page_title("/"), "Matches");
        assert_eq!(page_title("/matches"), "Matches");
        assert_eq!(page_title("/mypredictions"), "My predictions");
        assert_eq!(page_title("/admin/"), "Admin");
        assert_eq!(page_title("/nowhere"), "Rugby Predictions");
    }

    #[test]
    fn test_group_fixtures() {
        let competitions = vec![competition(1, "URC"), competition(2, "Top 14")];
        let matches = vec![
            fixture(3, 2, "Toulouse", "Racing", "2025-01-02T20:00:00Z"),
            fixture(1, 1, "Leinster", "Munster", "2025-01-01T15:00:00Z"),
            fixture(2, 1, "Ulster", "Connacht", "2025-01-01T17:30:00Z"),
            fixture(4, 2, "Toulon", "Clermont", "2025-01-01T13:00:00Z"),
        ];

        let days = group_fixtures(&matches, &competitions, None, &Utc);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        // Competition order follows the first kickoff of the day.
        let names: Vec<&str> = days[0].competitions.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Top 14", "URC"]);
        let urc: Vec<MatchId> = days[0].competitions[1].matches.iter().map(|m| m.id).collect();
        assert_eq!(urc, vec![1, 2]);
        assert_eq!(days[0].competitions[1].color.as_deref(), Some("#000001"));

        let filtered = group_fixtures(&matches, &competitions, Some(1), &Utc);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].competitions.len(), 1);
        assert_eq!(filtered[0].competitions[0].matches.len(), 2);
    }

    #[test]
    fn test_group_fixtures_uses_local_day() {
        let matches = vec![fixture(1, 1, "A", "B", "2025-01-01T23:30:00Z")];
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let days = group_fixtures(&matches, &[], None, &plus_two);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        // Unknown competitions still get a heading.
        assert_eq!(days[0].competitions[0].name, "Unknown");
    }

    #[test]
    fn test_collect_submissions_skips_locked_and_incomplete() {
        let matches = vec![
            fixture(1, 1, "Leinster", "Munster", "2025-01-01T15:00:00Z"),
            fixture(2, 1, "Ulster", "Connacht", "2025-01-01T17:30:00Z"),
            fixture(3, 1, "Glasgow", "Edinburgh", "2025-01-01T19:00:00Z"),
        ];
        let mut drafts = HashMap::new();
        drafts.insert(
            1,
            PredictionDraft {
                team: Some("Munster".to_string()),
                margin: Some(5),
                locked: false,
            },
        );
        drafts.insert(
            2,
            PredictionDraft {
                team: Some("Ulster".to_string()),
                margin: None,
                locked: false,
            },
        );
        drafts.insert(
            3,
            PredictionDraft {
                team: None,
                margin: Some(10),
                locked: false,
            },
        );

        // Match 1 has kicked off.
        let submissions = collect_submissions(&matches, &drafts, 42, at("2025-01-01T16:00:00Z"));
        assert_eq!(
            submissions,
            vec![PredictionSubmission {
                match_id: 2,
                user_id: 42,
                predicted_winner: "Ulster".to_string(),
                margin: None,
            }]
        );

        let before = collect_submissions(&matches, &drafts, 42, at("2025-01-01T10:00:00Z"));
        assert_eq!(before.len(), 2);
    }

    #[test]
    fn test_collect_submissions_skips_server_locked_prediction() {
        let matches = vec![fixture(1, 1, "Leinster", "Munster", "2025-01-01T15:00:00Z")];
        let mut p = prediction(1, 7, 1);
        p.predicted_winner = Some("Leinster".to_string());
        p.margin = Some(3);
        p.locked = true;
        let now = at("2025-01-01T10:00:00Z");
        assert!(is_locked(&p, Some(&matches[0]), now));

        let drafts = drafts_from_predictions(&[p]);
        assert!(fixture_locked(&matches[0], drafts.get(&1), now));
        assert!(collect_submissions(&matches, &drafts, 7, now).is_empty());

        // Without a draft only kickoff locks the row.
        assert!(!fixture_locked(&matches[0], None, now));
        assert!(fixture_locked(&matches[0], None, at("2025-01-01T15:00:00Z")));
    }

    #[test]
    fn test_drafts_from_predictions() {
        let mut p = prediction(1, 1, 9);
        p.predicted_winner = Some("Scarlets".to_string());
        p.margin = Some(3);
        let drafts = drafts_from_predictions(&[p]);
        assert_eq!(
            drafts.get(&9),
            Some(&PredictionDraft {
                team: Some("Scarlets".to_string()),
                margin: Some(3),
                locked: false,
            })
        );
    }

    #[test]
    fn test_listed_prediction_follows_reload() {
        let m = fixture(1, 1, "Leinster", "Munster", "2025-01-01T15:00:00Z");
        let now = at("2025-01-01T10:00:00Z");
        let mut p = prediction(5, 7, 1);
        p.locked = true;
        assert!(listed_prediction_locked(&[p.clone()], 5, Some(&m), now));

        // The list after "Unlock predictions" clears the flag.
        p.locked = false;
        assert!(!listed_prediction_locked(&[p.clone()], 5, Some(&m), now));
        assert!(listed_prediction_locked(&[p], 5, Some(&m), at("2025-01-01T15:00:00Z")));
        assert!(!listed_prediction_locked(&[], 5, Some(&m), now));
    }

    #[test]
    fn test_competition_status() {
        let mut c = competition(1, "Six Nations");
        assert_eq!(c.status(), "Active");
        c.archived = true;
        assert_eq!(c.status(), "Archived");
        c.hidden = true;
        assert_eq!(c.status(), "Hidden");
    }

    #[test]
    fn test_parse_margin() {
        assert_eq!(parse_margin("7"), Some(7));
        assert_eq!(parse_margin(" 12 "), Some(12));
        assert_eq!(parse_margin("0"), Some(1));
        assert_eq!(parse_margin("-4"), Some(1));
        assert_eq!(parse_margin("5000"), Some(999));
        assert_eq!(parse_margin(""), None);
        assert_eq!(parse_margin("seven"), None);
    }

    #[test]
    fn test_kickoff_input() {
        let kickoff = parse_kickoff_input("2025-03-15T14:45").unwrap();
        assert_eq!(kickoff, at("2025-03-15T14:45:00Z"));
        assert_eq!(kickoff_input_value(kickoff), "2025-03-15T14:45");
        assert_eq!(
            parse_kickoff_input("2025-03-15T14:45:30"),
            Some(at("2025-03-15T14:45:30Z"))
        );
        assert_eq!(parse_kickoff_input("15/03/2025"), None);
    }

    #[test]
    fn test_result_label() {
        let mut p = prediction(1, 1, 1);
        assert_eq!(result_label(&p), "TBD");
        p.result = Some(MatchResult {
            winner: Some("Leinster".to_string()),
            margin: Some(8),
        });
        assert_eq!(result_label(&p), "Leinster by 8");
        p.result = Some(MatchResult {
            winner: Some("Leinster".to_string()),
            margin: None,
        });
        assert_eq!(result_label(&p), "Leinster");
    }

    #[test]
    fn test_group_predictions_by_day() {
        let mut late = prediction(1, 1, 1);
        late.kickoff = Some(at("2025-02-08T17:00:00Z"));
        late.competition_id = Some(1);
        let mut early = prediction(2, 1, 2);
        early.kickoff = Some(at("2025-02-01T14:00:00Z"));
        early.competition_id = Some(2);
        let mut same_day = prediction(3, 1, 3);
        same_day.kickoff = Some(at("2025-02-08T13:00:00Z"));
        same_day.competition_id = Some(1);
        let unscheduled = prediction(4, 1, 4);

        let days = group_predictions_by_day(
            &[late.clone(), early.clone(), same_day.clone(), unscheduled],
            None,
            &Utc,
        );
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].predictions, vec![early]);
        assert_eq!(days[1].predictions, vec![same_day, late]);
        assert_eq!(day_anchor(days[1].date), "date-2025-02-08");

        let only_two = group_predictions_by_day(&days[0].predictions, Some(1), &Utc);
        assert!(only_two.is_empty());
    }

    #[test]
    fn test_jump_target() {
        let day = |d| NaiveDate::from_ymd_opt(2025, 2, d).unwrap();
        let days = [day(1), day(8), day(15)];
        assert_eq!(jump_target(&days, day(8)), Some(day(8)));
        assert_eq!(jump_target(&days, day(9)), Some(day(15)));
        assert_eq!(jump_target(&days, day(20)), Some(day(15)));
        assert_eq!(jump_target(&[], day(20)), None);
    }

    fn entry(user: &str, earned: i64, per_competition: &[(CompetitionId, i64)]) -> LeaderboardEntry {
        LeaderboardEntry {
            user: user.to_string(),
            earned,
            submitted: 10,
            accuracy: 50.0,
            competitions: per_competition
                .iter()
                .map(|&(competition_id, earned)| CompetitionStanding {
                    competition_id,
                    earned,
                    submitted: 5,
                    accuracy: 40.0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_standings_overall() {
        let entries = vec![
            entry("ann", 10, &[(1, 10)]),
            entry("bob", 30, &[(1, 5), (2, 25)]),
            entry("cat", 20, &[(2, 20)]),
        ];
        let table = standings(&entries, None, &[]);
        let order: Vec<(&str, usize)> = table.iter().map(|s| (s.user.as_str(), s.rank)).collect();
        assert_eq!(order, vec![("bob", 1), ("cat", 2), ("ann", 3)]);
        assert!(table.iter().all(|s| s.movement == 0));
    }

    #[test]
    fn test_standings_per_competition_and_movement() {
        let entries = vec![
            entry("ann", 10, &[(1, 10)]),
            entry("bob", 30, &[(1, 5), (2, 25)]),
            entry("cat", 20, &[(2, 20)]),
        ];
        let previous: Vec<String> = vec!["bob".into(), "cat".into(), "ann".into()];

        let table = standings(&entries, Some(1), &previous);
        assert_eq!(table[0].user, "ann");
        assert_eq!(table[0].earned, 10);
        assert_eq!(table[0].movement, 2);
        assert_eq!(table[1].user, "bob");
        assert_eq!(table[1].movement, -1);
        // No stats for the competition counts as zero.
        assert_eq!(table[2].user, "cat");
        assert_eq!(table[2].earned, 0);
        assert_eq!(table[2].accuracy, 0.0);
        assert_eq!(table[2].movement, -1);
    }

    #[test]
    fn test_match_view_cycle() {
        assert_eq!(MatchView::All.next(), MatchView::Upcoming);
        assert_eq!(MatchView::Upcoming.next(), MatchView::Completed);
        assert_eq!(MatchView::Completed.next(), MatchView::All);
    }

    #[test]
    fn test_admin_match_rows() {
        let competitions = vec![competition(1, "URC"), competition(2, "Top 14")];
        let matches = vec![
            fixture(1, 1, "Leinster", "Munster", "2025-01-01T15:00:00Z"),
            fixture(2, 2, "Toulouse", "Racing", "2025-01-03T20:00:00Z"),
            fixture(3, 1, "Ulster", "Connacht", "2025-01-02T17:30:00Z"),
        ];
        let now = at("2025-01-02T00:00:00Z");
        let ids = |rows: Vec<Match>| rows.iter().map(|m| m.id).collect::<Vec<_>>();

        let all = admin_match_rows(&matches, &competitions, "", MatchView::All, MatchSort::default(), now);
        assert_eq!(ids(all), vec![1, 3, 2]);

        let upcoming = admin_match_rows(&matches, &competitions, "", MatchView::Upcoming, MatchSort::default(), now);
        assert_eq!(ids(upcoming), vec![3, 2]);

        let completed = admin_match_rows(&matches, &competitions, "", MatchView::Completed, MatchSort::default(), now);
        assert_eq!(ids(completed), vec![1]);

        let searched = admin_match_rows(&matches, &competitions, "urc", MatchView::All, MatchSort::default(), now);
        assert_eq!(ids(searched), vec![1, 3]);

        let by_team = MatchSort::default().toggle(MatchSortKey::TeamA);
        assert_eq!(by_team.direction, SortDirection::Descending);
        assert_eq!(by_team.indicator(MatchSortKey::TeamA), "↓");
        assert_eq!(by_team.indicator(MatchSortKey::Kickoff), "");
        let sorted = admin_match_rows(&matches, &competitions, "", MatchView::All, by_team, now);
        assert_eq!(ids(sorted), vec![3, 2, 1]);
    }

    #[test]
    fn test_filter_users() {
        let users = vec![
            user(1, "Eoin", "Connor", "eoin@example.com"),
            user(2, "Aoife", "Byrne", "aoife@example.com"),
        ];
        assert_eq!(filter_users(&users, "").len(), 2);
        assert_eq!(filter_users(&users, "BYR")[0].id, 2);
        assert_eq!(filter_users(&users, "eoin@")[0].id, 1);
        assert!(filter_users(&users, "zzz").is_empty());
    }

    #[test]
    fn test_admin_prediction_rows() {
        let competitions = vec![competition(1, "URC")];
        let matches = vec![
            fixture(1, 1, "Leinster", "Munster", "2025-01-05T15:00:00Z"),
            fixture(2, 1, "Ulster", "Connacht", "2025-01-01T17:30:00Z"),
        ];
        let users = vec![user(7, "Eoin", "Connor", "eoin@example.com")];
        let mut first = prediction(10, 7, 1);
        first.predicted_winner = Some("Munster".to_string());
        first.margin = Some(12);
        let second = prediction(11, 8, 2);
        let orphan = prediction(12, 7, 99);
        let predictions = vec![first, second, orphan];

        let rows = admin_prediction_rows(
            &predictions,
            &matches,
            &users,
            &competitions,
            "",
            SortDirection::Ascending,
        );
        let ids: Vec<i64> = rows.iter().map(|r| r.prediction.id).collect();
        assert_eq!(ids, vec![12, 11, 10]);
        assert!(rows[0].fixture.is_none());
        assert!(rows[1].user.is_none());
        assert_eq!(rows[2].competition.as_ref().map(|c| c.id), Some(1));

        let now = at("2025-01-03T00:00:00Z");
        assert!(is_locked(&rows[1].prediction, rows[1].fixture.as_ref(), now));
        assert!(!is_locked(&rows[2].prediction, rows[2].fixture.as_ref(), now));

        for query in ["munster", "12", "EOIN@", "urc"] {
            let found = admin_prediction_rows(
                &predictions,
                &matches,
                &users,
                &competitions,
                query,
                SortDirection::Ascending,
            );
            assert!(found.iter().any(|r| r.prediction.id == 10), "query {}", query);
        }

        let descending = admin_prediction_rows(
            &predictions,
            &matches,
            &users,
            &competitions,
            "",
            SortDirection::Descending,
        );
        assert_eq!(descending[0].prediction.id, 10);
    }

    #[test]
    fn test_visible_competitions() {
        let mut hidden = competition(2, "Old Cup");
        hidden.hidden = true;
        let mut archived = competition(3, "Older Cup");
        archived.archived = true;
        let competitions = vec![competition(1, "URC"), hidden, archived];
        assert_eq!(visible_competitions(&competitions, false).len(), 1);
        assert_eq!(visible_competitions(&competitions, true).len(), 3);
    }

    #[test]
    fn test_kickoff_timezone_helper() {
        let kickoff = Utc.with_ymd_and_hms(2025, 1, 1, 15, 0, 0).unwrap();
        let m = fixture(1, 1, "A", "B", "2025-01-01T15:00:00Z");
        assert_eq!(m.kickoff, kickoff);
        assert!(match_started(&m, kickoff));
    }
}
