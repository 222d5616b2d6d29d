use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::accounts::{AccountError, Accounts};
use crate::db::models::{PredictionRecord, SubscriptionTier, Team};
use crate::db::Database;
use crate::model::{compute_match_distribution, DistributionResult, ModelParams};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub accounts: Accounts,
    pub params: ModelParams,
    pub max_goals: usize,
}

/// Build the Axum router for the dashboard.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/teams", get(teams_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/demo", get(demo_handler))
        .route("/api/predict", get(predict_handler))
        .route("/api/register", post(register_handler))
        .route("/api/login", post(login_handler))
        .route("/api/subscribe", post(subscribe_handler))
        .route("/api/predictions", get(predictions_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

type ApiError = (StatusCode, Json<Value>);

fn error_body(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

fn internal(e: impl std::fmt::Display) -> ApiError {
    error_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn account_error(e: AccountError) -> ApiError {
    let status = match &e {
        AccountError::EmailTaken => StatusCode::CONFLICT,
        AccountError::WeakPassword | AccountError::InvalidEmail => StatusCode::BAD_REQUEST,
        AccountError::InvalidCredentials | AccountError::UnknownUser => StatusCode::UNAUTHORIZED,
        AccountError::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
        AccountError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, e.to_string())
}

#[derive(Debug, Serialize)]
struct PredictionResponse {
    home_team: String,
    away_team: String,
    distribution: DistributionResult,
}

#[derive(Debug, Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct AccountResponse {
    email: String,
    subscription_tier: String,
    predictions_used: u32,
}

#[derive(Debug, Deserialize)]
struct PredictQuery {
    home: String,
    away: String,
    email: String,
}

/// Serve the embedded dashboard page.
async fn index_handler() -> impl IntoResponse {
    Html(DASHBOARD_HTML)
}

/// GET /api/teams
async fn teams_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Team>>, ApiError> {
    state.db.list_teams().map(Json).map_err(internal)
}

/// GET /api/stats
async fn stats_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    state.db.get_stats().map(Json).map_err(internal)
}

/// GET /api/demo: the ungated home-page example fixture.
async fn demo_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PredictionResponse>, ApiError> {
    compute_for_pair(&state, "Arsenal", "Chelsea").map(Json)
}

/// GET /api/predict?home=&away=&email=, gated by the account's daily quota.
async fn predict_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PredictQuery>,
) -> Result<Json<PredictionResponse>, ApiError> {
    if query.home == query.away {
        return Err(error_body(
            StatusCode::BAD_REQUEST,
            "home and away teams must differ",
        ));
    }

    // Resolve both teams before touching the quota: a typo'd name must not
    // burn a paid prediction.
    let home = lookup_team(&state, &query.home)?;
    let away = lookup_team(&state, &query.away)?;

    let user = state
        .accounts
        .consume_prediction(&query.email)
        .map_err(account_error)?;

    let response = build_response(&state, home, away)?;

    let d = &response.distribution;
    let record = PredictionRecord {
        id: None,
        user_email: user.email,
        home_team: response.home_team.clone(),
        away_team: response.away_team.clone(),
        home_lambda: d.home_lambda,
        away_lambda: d.away_lambda,
        total_lambda: d.total_lambda,
        over_0_5: d.market_probabilities.over_0_5,
        created_at: Utc::now(),
    };
    // The prediction is already computed and paid for; a failed audit write
    // should not turn into a user-facing error.
    if let Err(e) = state.db.insert_prediction(&record) {
        warn!("Failed to log prediction: {e}");
    }

    Ok(Json(response))
}

fn compute_for_pair(
    state: &AppState,
    home_name: &str,
    away_name: &str,
) -> Result<PredictionResponse, ApiError> {
    let home = lookup_team(state, home_name)?;
    let away = lookup_team(state, away_name)?;
    build_response(state, home, away)
}

fn build_response(state: &AppState, home: Team, away: Team) -> Result<PredictionResponse, ApiError> {
    let home_profile = home.profile().map_err(internal)?;
    let away_profile = away.profile().map_err(internal)?;

    let distribution = compute_match_distribution(
        &home_profile,
        &away_profile,
        state.max_goals,
        &state.params,
    );

    Ok(PredictionResponse {
        home_team: home.name,
        away_team: away.name,
        distribution,
    })
}

fn lookup_team(state: &AppState, name: &str) -> Result<Team, ApiError> {
    state
        .db
        .get_team(name)
        .map_err(internal)?
        .ok_or_else(|| error_body(StatusCode::NOT_FOUND, format!("unknown team: {name}")))
}

/// POST /api/register
async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Credentials>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let user = state
        .accounts
        .register(&body.email, &body.password)
        .map_err(account_error)?;
    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            email: user.email,
            subscription_tier: user.subscription_tier.as_str().into(),
            predictions_used: user.predictions_used,
        }),
    ))
}

/// POST /api/login
async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Credentials>,
) -> Result<Json<AccountResponse>, ApiError> {
    let user = state
        .accounts
        .login(&body.email, &body.password)
        .map_err(account_error)?;
    Ok(Json(AccountResponse {
        email: user.email,
        subscription_tier: user.subscription_tier.as_str().into(),
        predictions_used: user.predictions_used,
    }))
}

#[derive(Debug, Deserialize)]
struct SubscribeRequest {
    email: String,
    password: String,
    plan: String,
}

/// POST /api/subscribe: switch an account's plan. Payment settlement happens
/// elsewhere; this only records the resulting tier.
async fn subscribe_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubscribeRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let tier = match body.plan.trim().to_lowercase().as_str() {
        "free" => SubscriptionTier::Free,
        "daily" => SubscriptionTier::Daily,
        "package" => SubscriptionTier::Package,
        "pro" => SubscriptionTier::Pro,
        "premium" => SubscriptionTier::Premium,
        other => {
            return Err(error_body(
                StatusCode::BAD_REQUEST,
                format!("unknown plan: {other}"),
            ));
        }
    };

    let user = state
        .accounts
        .login(&body.email, &body.password)
        .map_err(account_error)?;
    state.db.set_user_tier(&user.email, tier).map_err(internal)?;

    Ok(Json(AccountResponse {
        email: user.email,
        subscription_tier: tier.as_str().into(),
        predictions_used: user.predictions_used,
    }))
}

/// GET /api/predictions
async fn predictions_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .list_recent_predictions(50)
        .map(Json)
        .map_err(internal)
}


/// Embedded single-file dashboard (HTML + CSS + JS). Kept minimal: layout is
/// not this project's concern.
const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>FootballPro Analytics</title>
<style>
  :root { --bg:#0f1117; --card:#1a1d27; --border:#2a2d3a; --accent:#00c896; --text:#e0e0e0; --muted:#8888aa; }
  * { box-sizing:border-box; margin:0; padding:0; }
  body { background:var(--bg); color:var(--text); font-family:'Segoe UI',system-ui,sans-serif; }
  header { padding:1rem 2rem; border-bottom:1px solid var(--border); }
  header h1 { font-size:1.4rem; }
  main { padding:1.5rem 2rem; display:grid; gap:1.5rem; max-width:900px; }
  .panel { background:var(--card); border:1px solid var(--border); border-radius:10px; padding:1.2rem; }
  label { color:var(--muted); font-size:.8rem; text-transform:uppercase; display:block; margin:.6rem 0 .2rem; }
  select, input { background:var(--bg); color:var(--text); border:1px solid var(--border); border-radius:6px; padding:.4rem .6rem; width:100%; }
  button { background:var(--accent); color:#000; font-weight:700; border:none; border-radius:6px; padding:.5rem 1rem; margin-top:.8rem; cursor:pointer; }
  .markets { display:grid; grid-template-columns:repeat(auto-fill,minmax(140px,1fr)); gap:.8rem; margin-top:1rem; }
  .market { background:var(--bg); border:1px solid var(--border); border-radius:8px; padding:.8rem; text-align:center; }
  .market .label { color:var(--muted); font-size:.75rem; text-transform:uppercase; }
  .market .value { font-size:1.3rem; font-weight:700; color:var(--accent); }
  #chart { width:100%; height:180px; margin-top:1rem; }
  .error { color:#ff4f6a; margin-top:.6rem; font-size:.85rem; }
</style>
</head>
<body>
<header><h1>&#9917; FootballPro Analytics &mdash; First-Half Goals</h1></header>
<main>
  <div class="panel">
    <label>Home team</label><select id="home"></select>
    <label>Away team</label><select id="away"></select>
    <label>Account email (registered)</label><input id="email" placeholder="you@example.com">
    <button onclick="predict()">Predict</button>
    <div class="error" id="error"></div>
  </div>
  <div class="panel">
    <div id="title">Demo: Arsenal vs Chelsea</div>
    <div class="markets" id="markets"></div>
    <canvas id="chart"></canvas>
  </div>
</main>
<script>
const pct = v => (v*100).toFixed(1)+'%';

async function loadTeams() {
  const r = await fetch('/api/teams');
  if (!r.ok) return;
  const teams = await r.json();
  for (const id of ['home','away']) {
    const sel = document.getElementById(id);
    sel.innerHTML = teams.map(t => `<option>${t.name}</option>`).join('');
  }
  document.getElementById('away').selectedIndex = 1;
}

function render(result) {
  const d = result.distribution;
  document.getElementById('title').textContent =
    `${result.home_team} vs ${result.away_team} — λ ${d.total_lambda.toFixed(2)}`;
  const m = d.market_probabilities;
  const cards = [
    ['Over 0.5', m.over_0_5], ['Under 0.5', m.under_0_5],
    ['Over 1.5', m.over_1_5], ['Under 1.5', m.under_1_5],
    ['Over 2.5', m.over_2_5],
  ];
  document.getElementById('markets').innerHTML = cards.map(([label, v]) =>
    `<div class="market"><div class="label">${label}</div><div class="value">${pct(v)}</div></div>`
  ).join('');
  drawChart(d.exact_score_probabilities);
}

function drawChart(entries) {
  const canvas = document.getElementById('chart');
  const ctx = canvas.getContext('2d');
  const W = canvas.clientWidth, H = 180;
  canvas.width = W; canvas.height = H;
  ctx.clearRect(0, 0, W, H);
  const max = Math.max(...entries.map(e => e.probability)) || 1;
  const bw = W / entries.length;
  entries.forEach((e, i) => {
    const h = (e.probability / max) * (H - 30);
    ctx.fillStyle = '#00c896';
    ctx.fillRect(i*bw + bw*0.15, H - 20 - h, bw*0.7, h);
    ctx.fillStyle = '#8888aa';
    ctx.textAlign = 'center';
    ctx.fillText(e.goals, i*bw + bw/2, H - 6);
    ctx.fillText(pct(e.probability), i*bw + bw/2, H - 26 - h);
  });
}

async function predict() {
  const home = document.getElementById('home').value;
  const away = document.getElementById('away').value;
  const email = document.getElementById('email').value;
  const err = document.getElementById('error');
  err.textContent = '';
  const r = await fetch(`/api/predict?home=${encodeURIComponent(home)}&away=${encodeURIComponent(away)}&email=${encodeURIComponent(email)}`);
  if (!r.ok) {
    const body = await r.json().catch(() => null);
    err.textContent = body && body.error ? body.error : r.statusText;
    return;
  }
  render(await r.json());
}

async function loadDemo() {
  const r = await fetch('/api/demo');
  if (r.ok) render(await r.json());
}

loadTeams().then(loadDemo);
</script>
</body>
</html>"#;
