//! # Redirect bootstrap page
//!
//! The page a shared invite link opens in the browser. It parks the invite
//! code in the exchange under a fresh identifier, then tries to open the
//! native app through its custom URI scheme with that identifier attached.
//!
//! ## Flow
//!
//! 1. Take `?code=` from the URL, or a fallback when it is missing or does
//!    not look like a code.
//! 2. Generate an identifier (timestamp plus random suffix).
//! 3. Store the code. If that fails, serve a plain download page and stop.
//! 4. Serve the hand-off page, which navigates to the deep link and starts a
//!    timer.
//! 5. If the page is hidden before the timer fires, the app opened. If the
//!    timer fires first, the app is not installed and the page moves on to
//!    the download URL.
//!
//! ## Hand-off state machine
//!
//! The navigation timer and the visibility events race in the browser. Only
//! the first of them may decide the outcome, so the race runs through one
//! table, [`TRANSITIONS`]:
//!
//! ```text
//! Idle ──navigated──▶ Attempted ──page_hidden───▶ Succeeded
//!  │                      └───────timer_elapsed──▶ TimedOut
//!  └──store_failed──▶ Abandoned
//! ```
//!
//! The server drives `Idle → Abandoned`; the page script receives the same
//! table as JSON and drives the rest. Once a terminal state is reached every
//! further event is ignored.

use axum::{
    extract::{Query, State},
    response::Html,
};
use rand::{distr::Alphanumeric, Rng};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{error, info, warn};
use url::Url;

use crate::{config::BootstrapConfig, service::Namespace, state::AppState};

/// Length of the random part of a generated identifier.
const IDENTIFIER_SUFFIX_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffState {
    Idle,
    Attempted,
    Succeeded,
    TimedOut,
    Abandoned,
}

impl HandoffState {
    pub fn as_str(self) -> &'static str {
        match self {
            HandoffState::Idle => "idle",
            HandoffState::Attempted => "attempted",
            HandoffState::Succeeded => "succeeded",
            HandoffState::TimedOut => "timed_out",
            HandoffState::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            HandoffState::Succeeded | HandoffState::TimedOut | HandoffState::Abandoned
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffEvent {
    /// Storing the code failed; no hand-off will be attempted.
    StoreFailed,
    /// The browser was pointed at the deep link.
    Navigated,
    /// The page lost visibility, so the app most likely took over.
    PageHidden,
    /// The fallback timer expired with the page still in front.
    TimerElapsed,
}

impl HandoffEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            HandoffEvent::StoreFailed => "store_failed",
            HandoffEvent::Navigated => "navigated",
            HandoffEvent::PageHidden => "page_hidden",
            HandoffEvent::TimerElapsed => "timer_elapsed",
        }
    }
}

/// Every legal transition. Anything not listed is ignored.
pub const TRANSITIONS: &[(HandoffState, HandoffEvent, HandoffState)] = &[
    (HandoffState::Idle, HandoffEvent::StoreFailed, HandoffState::Abandoned),
    (HandoffState::Idle, HandoffEvent::Navigated, HandoffState::Attempted),
    (HandoffState::Attempted, HandoffEvent::PageHidden, HandoffState::Succeeded),
    (HandoffState::Attempted, HandoffEvent::TimerElapsed, HandoffState::TimedOut),
];

/// One hand-off attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handoff {
    state: HandoffState,
}

impl Default for Handoff {
    fn default() -> Self {
        Self::new()
    }
}

impl Handoff {
    pub fn new() -> Self {
        Self {
            state: HandoffState::Idle,
        }
    }

    pub fn state(&self) -> HandoffState {
        self.state
    }

    /// Applies `event`. Returns `true` if it moved the machine, `false` if
    /// the event was not legal in the current state.
    pub fn apply(&mut self, event: HandoffEvent) -> bool {
        match next_state(self.state, event) {
            Some(next) => {
                self.state = next;
                true
            }
            None => false,
        }
    }
}

fn next_state(state: HandoffState, event: HandoffEvent) -> Option<HandoffState> {
    TRANSITIONS
        .iter()
        .find(|(from, on, _)| *from == state && *on == event)
        .map(|(_, _, to)| *to)
}

/// [`TRANSITIONS`] as `{from: {event: to}}`, for the page script.
fn transitions_json() -> Value {
    let mut table = Map::new();
    for (from, on, to) in TRANSITIONS {
        let row = table
            .entry(from.as_str())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(row) = row {
            row.insert(on.as_str().to_owned(), Value::String(to.as_str().to_owned()));
        }
    }
    Value::Object(table)
}

/// Whether `code` is acceptable from a page URL.
pub fn is_valid_code(code: &str, strict_numeric: bool) -> bool {
    if strict_numeric {
        code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
    } else {
        (4..=10).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_alphanumeric())
    }
}

/// The code from the URL if it is valid, otherwise the configured or a
/// freshly generated fallback.
pub fn resolve_code(requested: Option<&str>, config: &BootstrapConfig) -> String {
    match requested.map(str::trim) {
        Some(code) if is_valid_code(code, config.strict_numeric_codes) => code.to_owned(),
        requested => {
            let fallback = config
                .fallback_code
                .clone()
                .unwrap_or_else(generate_fallback_code);
            match requested {
                Some(rejected) => warn!(rejected, "Malformed invite code, using fallback"),
                None => warn!("No invite code in URL, using fallback"),
            }
            fallback
        }
    }
}

/// A random six-digit code.
pub fn generate_fallback_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000))
}

/// Hex millisecond timestamp and a random alphanumeric suffix.
///
/// Not cryptographically strong; collisions within one TTL window are
/// unlikely enough for a one-day hand-off.
pub fn generate_identifier() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(IDENTIFIER_SUFFIX_LEN)
        .map(char::from)
        .collect();

    format!("{millis:x}-{suffix}")
}

/// The custom-scheme URL that opens the app.
///
/// `<scheme>://open/joinspace?deviceId=<id>`, or with `embed_code_in_link`
/// `<scheme>://open/joinspace?code=<code>&session=<id>`.
pub fn deep_link(
    config: &BootstrapConfig,
    identifier: &str,
    code: &str,
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&format!("{}://open/joinspace", config.app_scheme))?;

    if config.embed_code_in_link {
        url.query_pairs_mut()
            .append_pair("code", code)
            .append_pair("session", identifier);
    } else {
        url.query_pairs_mut().append_pair("deviceId", identifier);
    }

    Ok(url)
}

#[derive(Debug, Deserialize)]
pub struct JoinQuery {
    code: Option<String>,
}

/// `GET /join?code=...`
pub async fn join_page(
    State(state): State<AppState>,
    Query(query): Query<JoinQuery>,
) -> Html<String> {
    let config = &state.config.bootstrap;
    let code = resolve_code(query.code.as_deref(), config);
    let identifier = generate_identifier();
    let mut handoff = Handoff::new();

    let link = match state
        .exchange
        .store(Namespace::DeepLink, &identifier, &code)
        .await
    {
        Ok(_) => match deep_link(config, &identifier, &code) {
            Ok(link) => Some(link),
            Err(e) => {
                error!(error = %e, "Could not build deep link");
                None
            }
        },
        Err(e) => {
            error!(error = %e, %identifier, "Failed to save deeplink");
            None
        }
    };

    if link.is_none() {
        handoff.apply(HandoffEvent::StoreFailed);
    }

    match (handoff.state(), link) {
        (HandoffState::Idle, Some(link)) => {
            info!(%identifier, "Serving hand-off page");
            Html(render_handoff_page(&handoff, config, link.as_str()))
        }
        _ => Html(render_download_page(config)),
    }
}

/// Page that opens the app and falls back to the download after the timeout.
pub fn render_handoff_page(handoff: &Handoff, config: &BootstrapConfig, link: &str) -> String {
    let timeout_ms = config.handoff_timeout.as_millis();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Opening the app</title>
<style>
body {{ font-family: sans-serif; text-align: center; padding: 3em 1em; }}
body.attempted {{ background: #ffe0b2; }}
body.timed_out {{ background: #ffcccb; }}
</style>
</head>
<body>
<h1>Opening the app&hellip;</h1>
<p><a id="open" href="{link_attr}">Tap here if nothing happens</a></p>
<p><a id="download" href="{download_attr}">Download the app</a></p>
<script>
(function () {{
  var transitions = {transitions};
  var state = {state};
  var deepLink = {link_js};
  var downloadUrl = {download_js};

  function settle(event) {{
    var next = (transitions[state] || {{}})[event];
    if (!next) return false;
    state = next;
    document.body.className = state;
    return true;
  }}

  function hidden() {{ settle("page_hidden"); }}
  document.addEventListener("visibilitychange", function () {{
    if (document.hidden) hidden();
  }});
  window.addEventListener("pagehide", hidden);

  if (settle("navigated")) {{
    window.location.href = deepLink;
    window.setTimeout(function () {{
      if (settle("timer_elapsed")) window.location.href = downloadUrl;
    }}, {timeout_ms});
  }}
}})();
</script>
</body>
</html>
"#,
        link_attr = escape_html(link),
        download_attr = escape_html(&config.download_url),
        transitions = transitions_json(),
        state = js_string(handoff.state().as_str()),
        link_js = js_string(link),
        download_js = js_string(&config.download_url),
    )
}

/// `GET /`. Links to the download without touching the store.
pub async fn landing_page(State(state): State<AppState>) -> Html<String> {
    Html(render_landing_page(&state.config.bootstrap))
}

/// Page shown when the code could not be stored; no hand-off is attempted.
pub fn render_download_page(config: &BootstrapConfig) -> String {
    render_static_page(
        config,
        "We couldn't open the app",
        "Install it and open your invite link again.",
    )
}

pub fn render_landing_page(config: &BootstrapConfig) -> String {
    render_static_page(
        config,
        "Get the app",
        "Open an invite link on this device once the app is installed.",
    )
}

fn render_static_page(config: &BootstrapConfig, heading: &str, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Get the app</title>
</head>
<body style="font-family: sans-serif; text-align: center; padding: 3em 1em;">
<h1>{heading}</h1>
<p>{message}</p>
<p><a id="download" href="{download}">Download the app</a></p>
</body>
</html>
"#,
        heading = escape_html(heading),
        message = escape_html(message),
        download = escape_html(&config.download_url),
    )
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// A JSON string literal that cannot close the surrounding `<script>`.
fn js_string(value: &str) -> String {
    Value::String(value.to_owned())
        .to_string()
        .replace("</", "<\\/")
}
