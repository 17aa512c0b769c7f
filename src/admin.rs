//! Admin panel: competitions, matches, users and predictions.
//!
//! Every save or delete is its own request followed by a reload of the affected list. Rows are
//! keyed by id so editing one does not rebuild the table.

use chrono::Utc;
use leptos::ev::SubmitEvent;
use leptos::logging::{error, log};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::{hooks::use_navigate, NavigateOptions};

use crate::api::ApiError;
use crate::config::is_super_admin;
use crate::model::{
    Competition, CompetitionId, Match, MatchResult, NewCompetition, NewMatch, NewUser, Prediction,
    User,
};
use crate::session::{use_user, UserContext};
use crate::{
    admin_match_rows, admin_prediction_rows, filter_users, kickoff_input_value,
    listed_prediction_locked, parse_kickoff_input, parse_margin, visible_competitions, MatchSort,
    MatchSortKey, MatchView, PredictionRow, SortDirection,
};

fn alert(message: &str) {
    leptos::leptos_dom::helpers::window()
        .alert_with_message(message)
        .unwrap_or_default();
}

fn confirm(message: &str) -> bool {
    leptos::leptos_dom::helpers::window()
        .confirm_with_message(message)
        .unwrap_or(false)
}

fn report(action: &str, e: ApiError) {
    error!("{} failed: {}", action, e);
    alert(&format!("{} failed: {}", action, e));
}

/// Lists shown by the panel, shared with every section through context.
#[derive(Debug, Clone, Copy)]
struct AdminData {
    user: UserContext,
    competitions: RwSignal<Vec<Competition>>,
    matches: RwSignal<Vec<Match>>,
    users: RwSignal<Vec<User>>,
    predictions: RwSignal<Vec<Prediction>>,
}

impl AdminData {
    fn new(user: UserContext) -> Self {
        Self {
            user,
            competitions: RwSignal::new(Vec::new()),
            matches: RwSignal::new(Vec::new()),
            users: RwSignal::new(Vec::new()),
            predictions: RwSignal::new(Vec::new()),
        }
    }

    // Archived and hidden competitions are always fetched; the table filters them.
    fn load_competitions(self) {
        spawn_local(async move {
            match self.user.api().competitions(true).await {
                Ok(list) => self.competitions.set(list),
                Err(e) => error!("Failed to load competitions: {}", e),
            }
        });
    }

    fn load_matches(self) {
        spawn_local(async move {
            match self.user.api().matches().await {
                Ok(list) => self.matches.set(list),
                Err(e) => error!("Failed to load matches: {}", e),
            }
        });
    }

    fn load_users(self) {
        spawn_local(async move {
            match self.user.api().users().await {
                Ok(list) => self.users.set(list),
                Err(e) => error!("Failed to load users: {}", e),
            }
        });
    }

    fn load_predictions(self) {
        spawn_local(async move {
            match self.user.api().all_predictions().await {
                Ok(list) => self.predictions.set(list),
                Err(e) => error!("Failed to load predictions: {}", e),
            }
        });
    }

    fn load_all(self) {
        self.load_competitions();
        self.load_matches();
        self.load_users();
        self.load_predictions();
    }

    fn is_super_admin(&self) -> bool {
        self.user.user().is_some_and(|u| is_super_admin(&u.email))
    }
}

fn use_admin_data() -> AdminData {
    expect_context::<AdminData>()
}

#[component]
pub fn AdminPanel() -> impl IntoView {
    let user = use_user();

    view! {
        <Show
            when=move || user.is_admin()
            fallback=|| view! { <p class="banner">"You need to be an admin to view this page."</p> }
        >
            <AdminDashboard />
        </Show>
    }
}

#[component]
fn AdminDashboard() -> impl IntoView {
    let data = AdminData::new(use_user());
    provide_context(data);

    Effect::new(move || data.load_all());

    let recalc = move |_| {
        spawn_local(async move {
            match data.user.api().recalc_leaderboard().await {
                Ok(response) => alert(
                    &response
                        .message
                        .unwrap_or_else(|| "Leaderboard recalculated.".to_string()),
                ),
                Err(e) => report("Recalculating the leaderboard", e),
            }
        });
    };

    let unlock = move |_| {
        if !confirm("Unlock all predictions?") {
            return;
        }
        spawn_local(async move {
            match data.user.api().unlock_predictions().await {
                Ok(response) => {
                    alert(
                        &response
                            .message
                            .unwrap_or_else(|| "Predictions unlocked.".to_string()),
                    );
                    data.load_predictions();
                }
                Err(e) => report("Unlocking predictions", e),
            }
        });
    };

    view! {
        <div class="admin-container">
            <header class="admin-header">
                <h1>"Admin"</h1>
                <div class="toolbar">
                    <button class="btn-secondary" on:click=recalc>
                        "Recalculate leaderboard"
                    </button>
                    <button class="btn-secondary" on:click=unlock>
                        "Unlock predictions"
                    </button>
                </div>
            </header>
            <CompetitionsSection />
            <MatchesSection />
            <UsersSection />
            <PredictionsSection />
        </div>
    }
}

#[component]
fn CompetitionsSection() -> impl IntoView {
    let data = use_admin_data();
    let show_shelved = RwSignal::new(false);
    let new_competition = RwSignal::new(NewCompetition::default());
    let form_error = RwSignal::new(String::new());

    let add = move |ev: SubmitEvent| {
        ev.prevent_default();
        let competition = new_competition.get();
        if competition.name.trim().is_empty() || competition.url.trim().is_empty() {
            form_error.set("Name and feed URL are required.".to_string());
            return;
        }
        spawn_local(async move {
            match data.user.api().create_competition(&competition).await {
                Ok(created) => {
                    log!("Created competition {}", created.name);
                    form_error.set(String::new());
                    new_competition.set(NewCompetition::default());
                    data.load_competitions();
                }
                Err(e) => form_error.set(e.to_string()),
            }
        });
    };

    view! {
        <section class="admin-section">
            <h2>"Competitions"</h2>
            <form class="admin-form" on:submit=add>
                <input
                    class="form-input"
                    type="text"
                    placeholder="Name"
                    prop:value=move || new_competition.with(|c| c.name.clone())
                    on:input=move |ev| new_competition.update(|c| c.name = event_target_value(&ev))
                />
                <input
                    class="form-input"
                    type="url"
                    placeholder="Feed URL"
                    prop:value=move || new_competition.with(|c| c.url.clone())
                    on:input=move |ev| new_competition.update(|c| c.url = event_target_value(&ev))
                />
                <input
                    type="color"
                    prop:value=move || new_competition.with(|c| c.color.clone())
                    on:input=move |ev| new_competition.update(|c| c.color = event_target_value(&ev))
                />
                <button type="submit" class="btn-primary">
                    "Add competition"
                </button>
            </form>
            {move || {
                (!form_error.get().is_empty())
                    .then(|| view! { <p class="error">{form_error.get()}</p> })
            }}
            <label class="checkbox">
                <input
                    type="checkbox"
                    prop:checked=move || show_shelved.get()
                    on:change=move |ev| show_shelved.set(event_target_checked(&ev))
                />
                "Show archived and hidden"
            </label>
            <div class="table-responsive">
                <table class="admin-table">
                    <thead>
                        <tr>
                            <th>"Name"</th>
                            <th>"Feed URL"</th>
                            <th>"Colour"</th>
                            <th>"Status"</th>
                            <th>"Actions"</th>
                        </tr>
                    </thead>
                    <tbody>
                        <For
                            each=move || {
                                data.competitions.with(|list| visible_competitions(list, show_shelved.get()))
                            }
                            key=|competition| competition.id
                            children=move |competition| view! { <CompetitionRow competition /> }
                        />
                    </tbody>
                </table>
            </div>
        </section>
    }
}

#[component]
fn CompetitionRow(competition: Competition) -> impl IntoView {
    let data = use_admin_data();
    let id = competition.id;
    // The row survives reloads, so flags come from the latest list.
    let hidden = move || {
        data.competitions
            .with(|list| list.iter().any(|c| c.id == id && c.hidden))
    };
    let status = move || {
        data.competitions.with(|list| {
            list.iter()
                .find(|c| c.id == id)
                .map(Competition::status)
                .unwrap_or_default()
        })
    };
    let draft = RwSignal::new(competition);

    let save = move |_| {
        let competition = draft.get();
        spawn_local(async move {
            match data.user.api().update_competition(&competition).await {
                Ok(()) => data.load_competitions(),
                Err(e) => report("Saving the competition", e),
            }
        });
    };

    let refresh = move |_| {
        spawn_local(async move {
            match data.user.api().refresh_competition(id).await {
                Ok(response) => {
                    alert(&format!("Added {} matches.", response.added.unwrap_or(0)));
                    data.load_matches();
                    data.load_competitions();
                }
                Err(e) => report("Refreshing the competition", e),
            }
        });
    };

    let delete = move |_| {
        if !confirm("Delete this competition?") {
            return;
        }
        spawn_local(async move {
            match data.user.api().delete_competition(id).await {
                Ok(()) => {
                    data.load_competitions();
                    data.load_matches();
                }
                Err(e) => report("Deleting the competition", e),
            }
        });
    };

    let toggle_hidden = move |_| {
        let hidden_now = untrack(hidden);
        spawn_local(async move {
            let api = data.user.api();
            let result = if hidden_now {
                api.restore_competition(id).await
            } else {
                api.hide_competition(id).await
            };
            match result {
                Ok(()) => data.load_competitions(),
                Err(e) => report("Updating the competition", e),
            }
        });
    };

    let purge = move |_| {
        let name = draft.with_untracked(|c| c.name.clone());
        if !confirm(&format!(
            "Permanently delete {} with all of its matches and predictions? This cannot be undone.",
            name
        )) {
            return;
        }
        spawn_local(async move {
            match data.user.api().purge_competition(id).await {
                Ok(()) => {
                    log!("Purged competition {}", name);
                    data.load_all();
                }
                Err(e) => report("Purging the competition", e),
            }
        });
    };

    view! {
        <tr>
            <td>
                <input
                    class="form-input"
                    type="text"
                    prop:value=move || draft.with(|c| c.name.clone())
                    on:input=move |ev| draft.update(|c| c.name = event_target_value(&ev))
                />
            </td>
            <td>
                <input
                    class="form-input"
                    type="url"
                    prop:value=move || draft.with(|c| c.url.clone())
                    on:input=move |ev| draft.update(|c| c.url = event_target_value(&ev))
                />
            </td>
            <td>
                <input
                    type="color"
                    prop:value=move || draft.with(|c| c.color.clone())
                    on:input=move |ev| draft.update(|c| c.color = event_target_value(&ev))
                />
            </td>
            <td>{status}</td>
            <td>
                <button class="btn-secondary" on:click=refresh>
                    "Refresh"
                </button>
                <button class="btn-primary" on:click=save>
                    "Save"
                </button>
                <button class="btn-danger" on:click=delete>
                    "Delete"
                </button>
                <Show when=move || data.is_super_admin()>
                    <button class="btn-secondary" on:click=toggle_hidden>
                        {move || if hidden() { "Restore" } else { "Hide" }}
                    </button>
                    <button class="btn-danger" on:click=purge>
                        "Purge"
                    </button>
                </Show>
            </td>
        </tr>
    }
}

#[component]
fn MatchesSection() -> impl IntoView {
    let data = use_admin_data();
    let query = RwSignal::new(String::new());
    let view_mode = RwSignal::new(MatchView::default());
    let sort = RwSignal::new(MatchSort::default());

    let competition_id = RwSignal::new(None::<CompetitionId>);
    let team_a = RwSignal::new(String::new());
    let team_b = RwSignal::new(String::new());
    let kickoff = RwSignal::new(String::new());
    let form_error = RwSignal::new(String::new());

    let add = move |ev: SubmitEvent| {
        ev.prevent_default();
        let (Some(competition_id), Some(kickoff_at)) =
            (competition_id.get(), parse_kickoff_input(&kickoff.get()))
        else {
            form_error.set("Competition, teams and kickoff are required.".to_string());
            return;
        };
        let new_match = NewMatch {
            competition_id,
            team_a: team_a.get().trim().to_string(),
            team_b: team_b.get().trim().to_string(),
            kickoff: kickoff_at,
        };
        if new_match.team_a.is_empty() || new_match.team_b.is_empty() {
            form_error.set("Competition, teams and kickoff are required.".to_string());
            return;
        }
        spawn_local(async move {
            match data.user.api().create_match(&new_match).await {
                Ok(created) => {
                    log!("Created match {}", created.title());
                    form_error.set(String::new());
                    team_a.set(String::new());
                    team_b.set(String::new());
                    data.load_matches();
                }
                Err(e) => form_error.set(e.to_string()),
            }
        });
    };

    let sort_header = move |key: MatchSortKey, label: &'static str| {
        view! {
            <th>
                <button class="sort-header" on:click=move |_| sort.update(|s| *s = s.toggle(key))>
                    {label}
                    " "
                    {move || sort.get().indicator(key)}
                </button>
            </th>
        }
    };

    view! {
        <section class="admin-section">
            <h2>"Matches"</h2>
            <form class="admin-form" on:submit=add>
                <select
                    class="form-select"
                    prop:value=move || competition_id.get().map(|id| id.to_string()).unwrap_or_default()
                    on:change=move |ev| competition_id.set(event_target_value(&ev).parse().ok())
                >
                    <option value="">"Select competition"</option>
                    {move || {
                        data.competitions
                            .with(|list| visible_competitions(list, false))
                            .into_iter()
                            .map(|c| view! { <option value=c.id.to_string()>{c.name}</option> })
                            .collect_view()
                    }}
                </select>
                <input
                    class="form-input"
                    type="text"
                    placeholder="Team A"
                    prop:value=move || team_a.get()
                    on:input=move |ev| team_a.set(event_target_value(&ev))
                />
                <input
                    class="form-input"
                    type="text"
                    placeholder="Team B"
                    prop:value=move || team_b.get()
                    on:input=move |ev| team_b.set(event_target_value(&ev))
                />
                <input
                    class="form-input"
                    type="datetime-local"
                    prop:value=move || kickoff.get()
                    on:input=move |ev| kickoff.set(event_target_value(&ev))
                />
                <button type="submit" class="btn-primary">
                    "Add match"
                </button>
            </form>
            {move || {
                (!form_error.get().is_empty())
                    .then(|| view! { <p class="error">{form_error.get()}</p> })
            }}
            <div class="table-controls">
                <input
                    class="form-input"
                    type="search"
                    placeholder="Search teams or competition"
                    prop:value=move || query.get()
                    on:input=move |ev| query.set(event_target_value(&ev))
                />
                <button class="btn-secondary" on:click=move |_| view_mode.update(|v| *v = v.next())>
                    {move || view_mode.get().label()}
                </button>
            </div>
            <div class="table-responsive">
                <table class="admin-table">
                    <thead>
                        <tr>
                            {sort_header(MatchSortKey::Kickoff, "Kickoff (UTC)")}
                            {sort_header(MatchSortKey::Competition, "Competition")}
                            {sort_header(MatchSortKey::TeamA, "Team A")}
                            {sort_header(MatchSortKey::TeamB, "Team B")}
                            <th>"Winner"</th>
                            <th>"Margin"</th>
                            <th>"Actions"</th>
                        </tr>
                    </thead>
                    <tbody>
                        <For
                            each=move || {
                                data.matches
                                    .with(|matches| {
                                        data.competitions
                                            .with(|competitions| {
                                                admin_match_rows(
                                                    matches,
                                                    competitions,
                                                    &query.get(),
                                                    view_mode.get(),
                                                    sort.get(),
                                                    Utc::now(),
                                                )
                                            })
                                    })
                            }
                            key=|fixture| fixture.id
                            children=move |fixture| view! { <MatchRow fixture /> }
                        />
                    </tbody>
                </table>
            </div>
        </section>
    }
}

#[component]
fn MatchRow(fixture: Match) -> impl IntoView {
    let data = use_admin_data();
    let id = fixture.id;
    let kickoff = RwSignal::new(kickoff_input_value(fixture.kickoff));
    let draft = RwSignal::new(fixture);

    let competition_name = move || {
        let competition_id = draft.with(|m| m.competition_id);
        data.competitions.with(|list| {
            list.iter()
                .find(|c| c.id == competition_id)
                .map(|c| c.name.clone())
                .unwrap_or_default()
        })
    };

    let save = move |_| {
        let Some(parsed) = parse_kickoff_input(&kickoff.get()) else {
            alert("Kickoff is not a valid date and time.");
            return;
        };
        draft.update(|m| m.kickoff = parsed);
        let fixture = draft.get();
        spawn_local(async move {
            match data.user.api().update_match(&fixture).await {
                Ok(()) => {
                    data.load_matches();
                    data.load_predictions();
                }
                Err(e) => report("Saving the match", e),
            }
        });
    };

    let delete = move |_| {
        if !confirm("Delete this match?") {
            return;
        }
        spawn_local(async move {
            match data.user.api().delete_match(id).await {
                Ok(()) => {
                    data.load_matches();
                    data.load_predictions();
                }
                Err(e) => report("Deleting the match", e),
            }
        });
    };

    let winner = move || {
        draft.with(|m| {
            m.result
                .as_ref()
                .and_then(|r| r.winner.clone())
                .unwrap_or_default()
        })
    };

    view! {
        <tr>
            <td>
                <input
                    class="form-input"
                    type="datetime-local"
                    prop:value=move || kickoff.get()
                    on:input=move |ev| kickoff.set(event_target_value(&ev))
                />
            </td>
            <td>{competition_name}</td>
            <td>
                <input
                    class="form-input"
                    type="text"
                    prop:value=move || draft.with(|m| m.team_a.clone())
                    on:input=move |ev| draft.update(|m| m.team_a = event_target_value(&ev))
                />
            </td>
            <td>
                <input
                    class="form-input"
                    type="text"
                    prop:value=move || draft.with(|m| m.team_b.clone())
                    on:input=move |ev| draft.update(|m| m.team_b = event_target_value(&ev))
                />
            </td>
            <td>
                <select
                    class="form-select"
                    prop:value=winner
                    on:change=move |ev| {
                        let value = event_target_value(&ev);
                        draft
                            .update(|m| {
                                m.result.get_or_insert_with(MatchResult::default).winner = (!value
                                    .is_empty())
                                    .then_some(value);
                            })
                    }
                >
                    <option value="">"Not played"</option>
                    {move || {
                        let (a, b) = draft.with(|m| (m.team_a.clone(), m.team_b.clone()));
                        view! {
                            <option value=a.clone() selected={winner() == a}>{a.clone()}</option>
                            <option value=b.clone() selected={winner() == b}>{b.clone()}</option>
                        }
                    }}
                </select>
            </td>
            <td>
                <input
                    class="margin-input"
                    type="number"
                    min="0"
                    prop:value=move || {
                        draft
                            .with(|m| m.result.as_ref().and_then(|r| r.margin))
                            .map(|margin| margin.to_string())
                            .unwrap_or_default()
                    }
                    on:input=move |ev| {
                        let margin = event_target_value(&ev).trim().parse::<u32>().ok();
                        draft.update(|m| m.result.get_or_insert_with(MatchResult::default).margin = margin)
                    }
                />
            </td>
            <td>
                <button class="btn-primary" on:click=save>
                    "Save"
                </button>
                <button class="btn-danger" on:click=delete>
                    "Delete"
                </button>
            </td>
        </tr>
    }
}

#[component]
fn UsersSection() -> impl IntoView {
    let data = use_admin_data();
    let query = RwSignal::new(String::new());
    let firstname = RwSignal::new(String::new());
    let surname = RwSignal::new(String::new());
    let email = RwSignal::new(String::new());
    let is_admin = RwSignal::new(false);
    let form_error = RwSignal::new(String::new());

    let add = move |ev: SubmitEvent| {
        ev.prevent_default();
        let new_user = NewUser {
            firstname: firstname.get().trim().to_string(),
            surname: surname.get().trim().to_string(),
            email: email.get().trim().to_string(),
            is_admin: is_admin.get(),
        };
        if new_user.firstname.is_empty() || new_user.surname.is_empty() || new_user.email.is_empty()
        {
            form_error.set("First name, surname and email are required.".to_string());
            return;
        }
        spawn_local(async move {
            match data.user.api().create_user(&new_user).await {
                Ok(created) => {
                    log!("Created user {}", created.email);
                    form_error.set(String::new());
                    firstname.set(String::new());
                    surname.set(String::new());
                    email.set(String::new());
                    is_admin.set(false);
                    data.load_users();
                }
                Err(e) => form_error.set(e.to_string()),
            }
        });
    };

    let navigate = use_navigate();
    let force_logout = move |_| {
        if !confirm("Log out every user, including you?") {
            return;
        }
        let navigate = navigate.clone();
        spawn_local(async move {
            match data.user.api().force_logout().await {
                Ok(response) => {
                    alert(
                        &response
                            .message
                            .unwrap_or_else(|| "All users have been logged out.".to_string()),
                    );
                    // The acting admin's session is invalid too.
                    data.user.logout();
                    navigate("/login", NavigateOptions::default());
                }
                Err(e) => report("Forcing logout", e),
            }
        });
    };

    view! {
        <section class="admin-section">
            <h2>"Users"</h2>
            <form class="admin-form" on:submit=add>
                <input
                    class="form-input"
                    type="text"
                    placeholder="First name"
                    prop:value=move || firstname.get()
                    on:input=move |ev| firstname.set(event_target_value(&ev))
                />
                <input
                    class="form-input"
                    type="text"
                    placeholder="Surname"
                    prop:value=move || surname.get()
                    on:input=move |ev| surname.set(event_target_value(&ev))
                />
                <input
                    class="form-input"
                    type="email"
                    placeholder="Email"
                    prop:value=move || email.get()
                    on:input=move |ev| email.set(event_target_value(&ev))
                />
                <label class="checkbox">
                    <input
                        type="checkbox"
                        prop:checked=move || is_admin.get()
                        on:change=move |ev| is_admin.set(event_target_checked(&ev))
                    />
                    "Admin"
                </label>
                <button type="submit" class="btn-primary">
                    "Add user"
                </button>
            </form>
            {move || {
                (!form_error.get().is_empty())
                    .then(|| view! { <p class="error">{form_error.get()}</p> })
            }}
            <div class="table-controls">
                <input
                    class="form-input"
                    type="search"
                    placeholder="Search users"
                    prop:value=move || query.get()
                    on:input=move |ev| query.set(event_target_value(&ev))
                />
                <button class="btn-danger" on:click=force_logout>
                    "Force logout all users"
                </button>
            </div>
            <div class="table-responsive">
                <table class="admin-table">
                    <thead>
                        <tr>
                            <th>"First name"</th>
                            <th>"Surname"</th>
                            <th>"Email"</th>
                            <th>"Admin"</th>
                            <th>"Actions"</th>
                        </tr>
                    </thead>
                    <tbody>
                        <For
                            each=move || data.users.with(|users| filter_users(users, &query.get()))
                            key=|user| user.id
                            children=move |user| view! { <UserRow user /> }
                        />
                    </tbody>
                </table>
            </div>
        </section>
    }
}

#[component]
fn UserRow(user: User) -> impl IntoView {
    let data = use_admin_data();
    let id = user.id;
    let draft = RwSignal::new(user);

    let save = move |_| {
        let user = draft.get();
        spawn_local(async move {
            match data.user.api().update_user(&user).await {
                Ok(()) => data.load_users(),
                Err(e) => report("Saving the user", e),
            }
        });
    };

    let delete = move |_| {
        if !confirm("Delete this user?") {
            return;
        }
        spawn_local(async move {
            match data.user.api().delete_user(id).await {
                Ok(()) => {
                    data.load_users();
                    data.load_predictions();
                }
                Err(e) => report("Deleting the user", e),
            }
        });
    };

    view! {
        <tr>
            <td>
                <input
                    class="form-input"
                    type="text"
                    prop:value=move || draft.with(|u| u.firstname.clone())
                    on:input=move |ev| draft.update(|u| u.firstname = event_target_value(&ev))
                />
            </td>
            <td>
                <input
                    class="form-input"
                    type="text"
                    prop:value=move || draft.with(|u| u.surname.clone())
                    on:input=move |ev| draft.update(|u| u.surname = event_target_value(&ev))
                />
            </td>
            <td>
                <input
                    class="form-input"
                    type="email"
                    prop:value=move || draft.with(|u| u.email.clone())
                    on:input=move |ev| draft.update(|u| u.email = event_target_value(&ev))
                />
            </td>
            <td>
                <input
                    type="checkbox"
                    prop:checked=move || draft.with(|u| u.is_admin)
                    on:change=move |ev| draft.update(|u| u.is_admin = event_target_checked(&ev))
                />
            </td>
            <td>
                <button class="btn-primary" on:click=save>
                    "Save"
                </button>
                <button class="btn-danger" on:click=delete>
                    "Delete"
                </button>
            </td>
        </tr>
    }
}

#[component]
fn PredictionsSection() -> impl IntoView {
    let data = use_admin_data();
    let query = RwSignal::new(String::new());
    let direction = RwSignal::new(SortDirection::Ascending);

    let rows = move || {
        let query = query.get();
        let direction = direction.get();
        data.predictions.with(|predictions| {
            data.matches.with(|matches| {
                data.users.with(|users| {
                    data.competitions.with(|competitions| {
                        admin_prediction_rows(
                            predictions,
                            matches,
                            users,
                            competitions,
                            &query,
                            direction,
                        )
                    })
                })
            })
        })
    };

    view! {
        <section class="admin-section">
            <h2>"Predictions"</h2>
            <div class="table-controls">
                <input
                    class="form-input"
                    type="search"
                    placeholder="Search winner, margin, teams, competition or email"
                    prop:value=move || query.get()
                    on:input=move |ev| query.set(event_target_value(&ev))
                />
            </div>
            <div class="table-responsive">
                <table class="admin-table">
                    <thead>
                        <tr>
                            <th>
                                <button
                                    class="sort-header"
                                    on:click=move |_| direction.update(|d| *d = d.flip())
                                >
                                    "Kickoff (UTC) "
                                    {move || direction.get().arrow()}
                                </button>
                            </th>
                            <th>"Competition"</th>
                            <th>"Match"</th>
                            <th>"User"</th>
                            <th>"Winner"</th>
                            <th>"Margin"</th>
                            <th></th>
                            <th>"Actions"</th>
                        </tr>
                    </thead>
                    <tbody>
                        <For
                            each=rows
                            key=|row| row.prediction.id
                            children=move |row| view! { <PredictionEditor row /> }
                        />
                    </tbody>
                </table>
            </div>
        </section>
    }
}

#[component]
fn PredictionEditor(row: PredictionRow) -> impl IntoView {
    let data = use_admin_data();
    let id = row.prediction.id;
    // The row survives reloads, so the lock comes from the latest list.
    let locked = {
        let fixture = row.fixture.clone();
        Memo::new(move |_| {
            data.predictions
                .with(|list| listed_prediction_locked(list, id, fixture.as_ref(), Utc::now()))
        })
    };
    let winner = RwSignal::new(row.prediction.predicted_winner.clone().unwrap_or_default());
    let margin = RwSignal::new(row.prediction.margin);
    let prediction = row.prediction.clone();

    let kickoff = row
        .fixture
        .as_ref()
        .map(|m| m.kickoff.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    let title = row.fixture.as_ref().map(Match::title).unwrap_or_default();
    let teams = row
        .fixture
        .as_ref()
        .map(|m| vec![m.team_a.clone(), m.team_b.clone()])
        .unwrap_or_default();

    let save = move |_| {
        let mut updated = data
            .predictions
            .with_untracked(|list| list.iter().find(|p| p.id == id).cloned())
            .unwrap_or_else(|| prediction.clone());
        updated.predicted_winner = Some(winner.get()).filter(|w| !w.is_empty());
        updated.margin = margin.get();
        spawn_local(async move {
            match data.user.api().update_prediction(&updated).await {
                Ok(()) => data.load_predictions(),
                Err(e) => report("Saving the prediction", e),
            }
        });
    };

    let delete = move |_| {
        if !confirm("Delete this prediction?") {
            return;
        }
        spawn_local(async move {
            match data.user.api().delete_prediction(id).await {
                Ok(()) => data.load_predictions(),
                Err(e) => report("Deleting the prediction", e),
            }
        });
    };

    view! {
        <tr class:locked=move || locked.get()>
            <td>{kickoff}</td>
            <td>{row.competition.map(|c| c.name).unwrap_or_default()}</td>
            <td>{title}</td>
            <td>{row.user.map(|u| u.email).unwrap_or_default()}</td>
            <td>
                <select
                    class="form-select"
                    disabled=move || locked.get()
                    prop:value=move || winner.get()
                    on:change=move |ev| winner.set(event_target_value(&ev))
                >
                    <option value="">"No pick"</option>
                    {teams
                        .into_iter()
                        .map(|team| {
                            let selected = winner.get_untracked() == team;
                            view! {
                                <option value=team.clone() selected=selected>
                                    {team.clone()}
                                </option>
                            }
                        })
                        .collect_view()}
                </select>
            </td>
            <td>
                <input
                    class="margin-input"
                    type="number"
                    min="1"
                    max="999"
                    disabled=move || locked.get()
                    prop:value=move || margin.get().map(|m| m.to_string()).unwrap_or_default()
                    on:input=move |ev| margin.set(parse_margin(&event_target_value(&ev)))
                />
            </td>
            <td>
                {move || locked.get().then(|| view! { <span class="lock" title="Locked">"🔒"</span> })}
            </td>
            <td>
                <button class="btn-primary" on:click=save>
                    "Save"
                </button>
                <button class="btn-danger" on:click=delete>
                    "Delete"
                </button>
            </td>
        </tr>
    }
}
