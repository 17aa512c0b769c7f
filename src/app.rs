use std::collections::HashMap;

use chrono::{Local, Utc};
use gloo_timers::future::TimeoutFuture;
use leptos::ev::SubmitEvent;
use leptos::logging::{error, log, warn};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_meta::{provide_meta_context, MetaTags, Stylesheet, Title};
use leptos_router::{
    components::{Route, Router, Routes},
    hooks::{use_location, use_navigate},
    path, NavigateOptions,
};

use crate::admin::AdminPanel;
use crate::api::ApiClient;
use crate::config::api_base;
use crate::model::{
    Competition, CompetitionId, LeaderboardEntry, LoginRequest, Match, MatchId, Prediction,
};
use crate::session::{use_user, UserContext};
use crate::{
    collect_submissions, day_anchor, drafts_from_predictions, fixture_locked, group_fixtures,
    group_predictions_by_day, jump_target, page_title, parse_margin, result_label,
    standings, CompetitionGroup, PredictionDraft, Standing,
};

/// How long the logout notice on the profile page stays up.
const NOTICE_TIMEOUT_MS: u32 = 5_000;

pub fn shell(options: LeptosOptions) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8" />
                <meta name="viewport" content="width=device-width, initial-scale=1" />
                <AutoReload options=options.clone() />
                <HydrationScripts options />
                <MetaTags />
            </head>
            <body>
                <App />
            </body>
        </html>
    }
}

#[component]
pub fn App() -> impl IntoView {
    // Provides context that manages stylesheets, titles, meta tags, etc.
    provide_meta_context();

    let user = UserContext::new();
    provide_context(user);
    let session_notice = RwSignal::new(None::<String>);

    // Runs once on the client: pick up the stored session, then drop it if an admin has forced
    // everyone out since it was issued.
    Effect::new(move || {
        user.restore();
        if !untrack(|| user.is_logged_in()) {
            return;
        }
        spawn_local(async move {
            match user.refresh_server_version().await {
                Ok(()) => {
                    if !user.is_session_valid() {
                        log!("Stored session is out of date, logging out");
                        user.logout();
                        session_notice
                            .set(Some("Your session has expired. Please log in again.".to_string()));
                    }
                }
                Err(e) => warn!("Failed to check session version: {}", e),
            }
        });
    });

    view! {
        <Stylesheet id="leptos" href="/pkg/rugby-predictions.css" />

        <Router>
            <TopBar />
            {move || {
                session_notice
                    .get()
                    .map(|notice| view! { <p class="banner warning">{notice}</p> })
            }}
            <main>
                <Routes fallback=|| "Page not found.".into_view()>
                    <Route path=path!("/") view=MatchesPage />
                    <Route path=path!("/matches") view=MatchesPage />
                    <Route path=path!("/mypredictions") view=MyPredictionsPage />
                    <Route path=path!("/leaderboard") view=LeaderboardPage />
                    <Route path=path!("/profile") view=ProfilePage />
                    <Route path=path!("/login") view=LoginPage />
                    <Route path=path!("/admin") view=AdminPanel />
                </Routes>
            </main>
            <BackendStatus />
        </Router>
    }
}

#[component]
fn TopBar() -> impl IntoView {
    let user = use_user();
    let location = use_location();
    let navigate = use_navigate();
    let drawer_open = RwSignal::new(false);

    let pathname = location.pathname;
    let title = move || page_title(&pathname.get()).to_string();

    let logout = move |_| {
        user.logout();
        drawer_open.set(false);
        navigate("/login", NavigateOptions::default());
    };

    view! {
        <Title text=title />
        <header class="top-bar">
            <button class="menu-button" on:click=move |_| drawer_open.update(|open| *open = !*open)>
                "☰"
            </button>
            <h1>{title}</h1>
            <Show
                when=move || user.is_logged_in()
                fallback=|| view! { <a class="auth-link" href="/login">"Login"</a> }
            >
                <button class="auth-link" on:click=logout.clone()>
                    "Logout"
                </button>
            </Show>
        </header>
        <nav class="drawer" class:open=move || drawer_open.get() on:click=move |_| drawer_open.set(false)>
            <a href="/matches">"Matches"</a>
            <a href="/leaderboard">"Leaderboard"</a>
            <Show when=move || user.is_logged_in()>
                <a href="/mypredictions">"My predictions"</a>
                <a href="/profile">"Profile"</a>
            </Show>
            <Show when=move || user.is_admin()>
                <a href="/admin">"Admin"</a>
            </Show>
            <Show when=move || !user.is_logged_in()>
                <a href="/login">"Login"</a>
            </Show>
        </nav>
    }
}

#[component]
fn BackendStatus() -> impl IntoView {
    let status = LocalResource::new(|| async move { ApiClient::new(api_base()).hello().await });

    let label = move || match status.get() {
        None => "checking",
        Some(Ok(())) => "online",
        Some(Err(e)) => {
            warn!("Backend health check failed: {}", e);
            "offline"
        }
    };

    view! {
        <footer class="status-footer">
            "Backend: " <span class=move || format!("status {}", label())>{label}</span>
        </footer>
    }
}

/// Filter chips shared by the list pages. Clicking the selected chip goes back to all.
#[component]
fn CompetitionChips(
    competitions: RwSignal<Vec<Competition>>,
    selected: RwSignal<Option<CompetitionId>>,
) -> impl IntoView {
    view! {
        <div class="chips">
            <button
                class="chip"
                class:selected=move || selected.get().is_none()
                on:click=move |_| selected.set(None)
            >
                "ALL"
            </button>
            <For
                each=move || competitions.get()
                key=|competition| competition.id
                children=move |competition: Competition| {
                    let id = competition.id;
                    view! {
                        <button
                            class="chip"
                            style=format!("border-color: {}", competition.color)
                            class:selected=move || selected.get() == Some(id)
                            on:click=move |_| {
                                selected
                                    .update(|current| {
                                        *current = if *current == Some(id) { None } else { Some(id) };
                                    })
                            }
                        >
                            {competition.name.clone()}
                        </button>
                    }
                }
            />
        </div>
    }
}

#[component]
fn MatchesPage() -> impl IntoView {
    let user = use_user();
    let competitions = RwSignal::new(Vec::<Competition>::new());
    let matches = RwSignal::new(Vec::<Match>::new());
    let drafts = RwSignal::new(HashMap::<MatchId, PredictionDraft>::new());
    let filter = RwSignal::new(None::<CompetitionId>);
    let message = RwSignal::new(None::<String>);
    let loading = RwSignal::new(true);

    // Reloads when the session changes, so drafts follow whoever is logged in.
    Effect::new(move || {
        let logged_in = user.is_logged_in();
        spawn_local(async move {
            let api = user.api();
            match api.competitions(false).await {
                Ok(list) => competitions.set(list),
                Err(e) => error!("Failed to load competitions: {}", e),
            }
            match api.matches().await {
                Ok(mut list) => {
                    list.sort_by_key(|m| m.kickoff);
                    matches.set(list);
                }
                Err(e) => {
                    error!("Failed to load matches: {}", e);
                    message.set(Some("Could not load matches.".to_string()));
                }
            }
            if logged_in {
                match api.my_predictions().await {
                    Ok(predictions) => drafts.set(drafts_from_predictions(&predictions)),
                    Err(e) => error!("Failed to load predictions: {}", e),
                }
            } else {
                drafts.set(HashMap::new());
            }
            loading.set(false);
        });
    });

    let days = move || {
        matches.with(|m| competitions.with(|c| group_fixtures(m, c, filter.get(), &Local)))
    };

    view! {
        <div class="page matches-page">
            <CompetitionChips competitions selected=filter />
            {move || message.get().map(|text| view! { <p class="banner">{text}</p> })}
            <Show when=move || !loading.get() fallback=|| view! { <p>"Loading..."</p> }>
                {move || {
                    let days = days();
                    if days.is_empty() {
                        return view! { <p>"No matches scheduled."</p> }.into_any();
                    }
                    days.into_iter()
                        .map(|day| {
                            view! {
                                <section class="fixture-day">
                                    <h2>{day.date.format("%A %-d %B %Y").to_string()}</h2>
                                    {day
                                        .competitions
                                        .into_iter()
                                        .map(|group| view! { <CompetitionFixtures group drafts message /> })
                                        .collect_view()}
                                </section>
                            }
                        })
                        .collect_view()
                        .into_any()
                }}
            </Show>
        </div>
    }
}

#[component]
fn CompetitionFixtures(
    group: CompetitionGroup,
    drafts: RwSignal<HashMap<MatchId, PredictionDraft>>,
    message: RwSignal<Option<String>>,
) -> impl IntoView {
    let user = use_user();
    let name = group.name.clone();
    let fixtures = group.matches.clone();

    let submit = move |_| {
        let Some(current) = user.user() else {
            message.set(Some("Please log in to submit predictions.".to_string()));
            return;
        };
        let submissions =
            drafts.with(|d| collect_submissions(&fixtures, d, current.id, Utc::now()));
        if submissions.is_empty() {
            message.set(Some("Pick a team for an open match first.".to_string()));
            return;
        }
        let name = name.clone();
        spawn_local(async move {
            match user.api().submit_predictions(&submissions).await {
                Ok(()) => {
                    log!("Submitted {} predictions for {}", submissions.len(), name);
                    message.set(Some(format!("Predictions saved for {}.", name)));
                }
                Err(e) => {
                    error!("Failed to submit predictions: {}", e);
                    message.set(Some("Failed to save predictions.".to_string()));
                }
            }
        });
    };

    view! {
        <div class="competition-group">
            <h3 style=format!(
                "border-left-color: {}",
                group.color.clone().unwrap_or_default(),
            )>{group.name.clone()}</h3>
            {group
                .matches
                .into_iter()
                .map(|fixture| view! { <FixtureRow fixture drafts /> })
                .collect_view()}
            <button class="btn-primary" on:click=submit>
                "Submit predictions"
            </button>
        </div>
    }
}

#[component]
fn FixtureRow(fixture: Match, drafts: RwSignal<HashMap<MatchId, PredictionDraft>>) -> impl IntoView {
    let id = fixture.id;
    // Saved predictions arrive after the first render and may carry a server lock.
    let locked = {
        let fixture = fixture.clone();
        Memo::new(move |_| drafts.with(|d| fixture_locked(&fixture, d.get(&id), Utc::now())))
    };

    let team_chip = move |team: String| {
        let label = team.clone();
        let picked = {
            let team = team.clone();
            move || drafts.with(|d| d.get(&id).and_then(|p| p.team.as_deref()) == Some(team.as_str()))
        };
        view! {
            <button
                class="team-chip"
                class:selected=picked
                disabled=move || locked.get()
                on:click=move |_| {
                    drafts.update(|d| d.entry(id).or_default().team = Some(team.clone()))
                }
            >
                {label}
            </button>
        }
    };

    view! {
        <div class="fixture" class:locked=move || locked.get()>
            <span class="kickoff">
                {fixture.kickoff.with_timezone(&Local).format("%H:%M").to_string()}
            </span>
            {team_chip(fixture.team_a.clone())}
            <span class="versus">"vs"</span>
            {team_chip(fixture.team_b.clone())}
            <input
                class="margin-input"
                type="number"
                min="1"
                max="999"
                placeholder="Margin"
                disabled=move || locked.get()
                prop:value=move || {
                    drafts
                        .with(|d| d.get(&id).and_then(|p| p.margin))
                        .map(|m| m.to_string())
                        .unwrap_or_default()
                }
                on:input=move |ev| {
                    let margin = parse_margin(&event_target_value(&ev));
                    drafts.update(|d| d.entry(id).or_default().margin = margin);
                }
            />
            {move || locked.get().then(|| view! { <span class="lock" title="Locked">"🔒"</span> })}
        </div>
    }
}

#[component]
fn LoginRequired() -> impl IntoView {
    view! {
        <p class="banner">
            "Please " <a href="/login">"log in"</a> " to see this page."
        </p>
    }
}

#[component]
fn MyPredictionsPage() -> impl IntoView {
    let user = use_user();
    let competitions = RwSignal::new(Vec::<Competition>::new());
    let predictions = RwSignal::new(Vec::<Prediction>::new());
    let filter = RwSignal::new(None::<CompetitionId>);

    Effect::new(move || {
        if !user.is_logged_in() {
            return;
        }
        spawn_local(async move {
            let api = user.api();
            match api.competitions(false).await {
                Ok(list) => competitions.set(list),
                Err(e) => error!("Failed to load competitions: {}", e),
            }
            match api.my_predictions().await {
                Ok(list) => predictions.set(list),
                Err(e) => error!("Failed to load predictions: {}", e),
            }
        });
    });

    let days = move || predictions.with(|p| group_predictions_by_day(p, filter.get(), &Local));

    let jump_to_today = move |_| {
        let dates: Vec<_> = days().iter().map(|day| day.date).collect();
        let Some(target) = jump_target(&dates, Local::now().date_naive()) else {
            return;
        };
        let anchor = day_anchor(target);
        #[cfg(feature = "hydrate")]
        if let Some(element) = document().get_element_by_id(&anchor) {
            element.scroll_into_view();
        }
        #[cfg(not(feature = "hydrate"))]
        let _ = anchor;
    };

    view! {
        <div class="page my-predictions-page">
            <Show when=move || user.is_logged_in() fallback=|| view! { <LoginRequired /> }>
                <CompetitionChips competitions selected=filter />
                <button class="btn-secondary" on:click=jump_to_today>
                    "Jump to today"
                </button>
                {move || {
                    let days = days();
                    if days.is_empty() {
                        return view! { <p>"No predictions yet."</p> }.into_any();
                    }
                    days.into_iter()
                        .map(|day| {
                            view! {
                                <section class="prediction-day" id=day_anchor(day.date)>
                                    <h2>{day.date.format("%A %-d %B %Y").to_string()}</h2>
                                    {day
                                        .predictions
                                        .into_iter()
                                        .map(|prediction| {
                                            let competition = competitions
                                                .with(|list| {
                                                    list.iter()
                                                        .find(|c| Some(c.id) == prediction.competition_id)
                                                        .cloned()
                                                });
                                            view! { <PredictionCard prediction competition /> }
                                        })
                                        .collect_view()}
                                </section>
                            }
                        })
                        .collect_view()
                        .into_any()
                }}
            </Show>
        </div>
    }
}

#[component]
fn PredictionCard(prediction: Prediction, competition: Option<Competition>) -> impl IntoView {
    let title = format!(
        "{} vs {}",
        prediction.team_a.clone().unwrap_or_default(),
        prediction.team_b.clone().unwrap_or_default()
    );
    let pick = match (&prediction.predicted_winner, prediction.margin) {
        (Some(team), Some(margin)) => format!("{} by {}", team, margin),
        (Some(team), None) => team.clone(),
        (None, _) => "No pick".to_string(),
    };
    let color = competition
        .as_ref()
        .map(|c| c.color.clone())
        .unwrap_or_default();

    view! {
        <div class="prediction-card" style=format!("border-left-color: {}", color)>
            <span class="competition">{competition.map(|c| c.name).unwrap_or_default()}</span>
            <h3>{title}</h3>
            <p>"Your pick: " {pick}</p>
            <p>"Result: " {result_label(&prediction)}</p>
        </div>
    }
}

#[component]
fn LeaderboardPage() -> impl IntoView {
    let user = use_user();
    let competitions = RwSignal::new(Vec::<Competition>::new());
    let entries = RwSignal::new(Vec::<LeaderboardEntry>::new());
    let filter = RwSignal::new(None::<CompetitionId>);
    let rows = RwSignal::new(Vec::<Standing>::new());
    let previous_order = StoredValue::new(Vec::<String>::new());

    Effect::new(move || {
        spawn_local(async move {
            let api = user.api();
            match api.competitions(false).await {
                Ok(list) => competitions.set(list),
                Err(e) => error!("Failed to load competitions: {}", e),
            }
            match api.leaderboard().await {
                Ok(list) => entries.set(list),
                Err(e) => error!("Failed to load leaderboard: {}", e),
            }
        });
    });

    // Movement is measured against whatever table was on screen before.
    Effect::new(move || {
        let table = entries.with(|e| standings(e, filter.get(), &previous_order.get_value()));
        previous_order.set_value(table.iter().map(|s| s.user.clone()).collect());
        rows.set(table);
    });

    view! {
        <div class="page leaderboard-page">
            <CompetitionChips competitions selected=filter />
            <table class="leaderboard">
                <thead>
                    <tr>
                        <th>"#"</th>
                        <th>"Player"</th>
                        <th></th>
                        <th>"Points"</th>
                        <th>"Accuracy"</th>
                    </tr>
                </thead>
                <tbody>
                    {move || {
                        rows.get()
                            .into_iter()
                            .map(|row| {
                                let (class, movement) = match row.movement {
                                    m if m > 0 => ("up", format!("▲{}", m)),
                                    m if m < 0 => ("down", format!("▼{}", -m)),
                                    _ => ("same", "–".to_string()),
                                };
                                view! {
                                    <tr>
                                        <td>{row.rank}</td>
                                        <td>{row.user}</td>
                                        <td class=format!("movement {}", class)>{movement}</td>
                                        <td>{row.earned}</td>
                                        <td>{format!("{:.0}%", row.accuracy)}</td>
                                    </tr>
                                }
                            })
                            .collect_view()
                    }}
                </tbody>
            </table>
        </div>
    }
}

#[component]
fn ProfilePage() -> impl IntoView {
    let user = use_user();
    let notice = RwSignal::new(None::<String>);

    let logout = move |_| {
        user.logout();
        notice.set(Some("You have been logged out.".to_string()));
        spawn_local(async move {
            TimeoutFuture::new(NOTICE_TIMEOUT_MS).await;
            notice.set(None);
        });
    };

    view! {
        <div class="page profile-page">
            {move || notice.get().map(|text| view! { <p class="banner">{text}</p> })}
            {move || match user.user() {
                Some(current) => {
                    view! {
                        <div class="profile">
                            <h2>{current.display_name()}</h2>
                            <p>"Email: " {current.email.clone()}</p>
                            <p>"Role: " {if current.is_admin { "Admin" } else { "User" }}</p>
                            <button class="btn-danger" on:click=logout>
                                "Logout"
                            </button>
                        </div>
                    }
                        .into_any()
                }
                None if notice.get().is_some() => view! {}.into_any(),
                None => view! { <LoginRequired /> }.into_any(),
            }}
        </div>
    }
}

#[component]
fn LoginPage() -> impl IntoView {
    let user = use_user();
    let email = RwSignal::new(String::new());
    let firstname = RwSignal::new(String::new());
    let surname = RwSignal::new(String::new());
    let remember_me = RwSignal::new(true);
    let error_message = RwSignal::new(String::new());
    let submitting = RwSignal::new(false);

    // Already logged in, or just logged in: go to the matches.
    let navigate = use_navigate();
    Effect::new(move || {
        if user.is_logged_in() {
            navigate("/matches", NavigateOptions::default());
        }
    });

    let submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        let credentials = LoginRequest {
            email: email.get().trim().to_string(),
            firstname: firstname.get().trim().to_string(),
            surname: surname.get().trim().to_string(),
        };
        if credentials.email.is_empty()
            || credentials.firstname.is_empty()
            || credentials.surname.is_empty()
        {
            error_message.set("Please fill in all fields.".to_string());
            return;
        }
        let remember = remember_me.get();
        submitting.set(true);
        spawn_local(async move {
            match user.login(credentials, remember).await {
                Ok(session) => {
                    log!("Logged in as {}", session.user.email);
                    error_message.set(String::new());
                }
                Err(e) => {
                    error!("Login failed: {}", e);
                    error_message.set("Login failed. Please try again.".to_string());
                }
            }
            submitting.set(false);
        });
    };

    view! {
        <div class="page login-page">
            <form class="login-form" on:submit=submit>
                <label>
                    "Email: "
                    <input
                        class="form-input"
                        type="email"
                        prop:value=move || email.get()
                        on:input=move |ev| email.set(event_target_value(&ev))
                    />
                </label>
                <label>
                    "First name: "
                    <input
                        class="form-input"
                        type="text"
                        prop:value=move || firstname.get()
                        on:input=move |ev| firstname.set(event_target_value(&ev))
                    />
                </label>
                <label>
                    "Surname: "
                    <input
                        class="form-input"
                        type="text"
                        prop:value=move || surname.get()
                        on:input=move |ev| surname.set(event_target_value(&ev))
                    />
                </label>
                <label class="checkbox">
                    <input
                        type="checkbox"
                        prop:checked=move || remember_me.get()
                        on:change=move |ev| remember_me.set(event_target_checked(&ev))
                    />
                    "Remember me"
                </label>
                <button type="submit" class="btn-primary" disabled=move || submitting.get()>
                    "Login"
                </button>
            </form>
            {move || {
                (!error_message.get().is_empty())
                    .then(|| view! { <p class="error">{error_message.get()}</p> })
            }}
        </div>
    }
}
