//! Intent routing for a chat turn
//!
//! Rules are evaluated in a fixed order and the first one that produces a
//! [`Route`] wins. Only the most recent user message is inspected for
//! triggers; the rest of the history is used for context.

use std::sync::OnceLock;

use anyhow::Result;
use chrono::{Days, Local, NaiveDate};
use regex::Regex;

use crate::ai::Responder;
use crate::image::Image;
use crate::state::{last_user_message, ChatMessage, ChatRole};

const CODE_FENCE: &str = "```";

/// What to do with a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Answered locally, no remote call
    Reply(String),
    /// Send this prompt (possibly empty) to the remote model
    Delegate(String),
}

/// Everything a rule may look at
pub struct RouteContext<'a> {
    pub history: &'a [ChatMessage],
    pub last_user: Option<&'a ChatMessage>,
    pub today: NaiveDate,
}

type Rule = fn(&RouteContext) -> Option<Route>;

/// Evaluation order matters
const RULES: &[(&str, Rule)] = &[
    ("no-user-message", no_user_message),
    ("tomorrow-date", tomorrow_date),
    ("explain-code", explain_code),
    ("conversation", conversation),
];

pub fn plan(history: &[ChatMessage], today: NaiveDate) -> Route {
    let ctx = RouteContext {
        history,
        last_user: last_user_message(history),
        today,
    };

    for (name, rule) in RULES {
        if let Some(route) = rule(&ctx) {
            tracing::debug!(rule = name, "route selected");
            return route;
        }
    }

    // `conversation` always matches
    Route::Delegate(String::new())
}

fn no_user_message(ctx: &RouteContext) -> Option<Route> {
    match ctx.last_user {
        None => Some(Route::Delegate(String::new())),
        Some(_) => None,
    }
}

fn tomorrow_date(ctx: &RouteContext) -> Option<Route> {
    let text = ctx.last_user?.content.to_lowercase();
    if !(text.contains("tomorrow") && text.contains("date")) {
        return None;
    }

    let tomorrow = ctx.today.checked_add_days(Days::new(1))?;
    Some(Route::Reply(format!("Tomorrow's date is {}.", tomorrow.format("%d-%m-%Y"))))
}

fn explain_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)explain.*in\s+(\w+)").expect("valid explain pattern"))
}

fn explain_code(ctx: &RouteContext) -> Option<Route> {
    let text = ctx.last_user?.content.to_lowercase();
    let captures = explain_pattern().captures(&text)?;
    let target = captures.get(1)?.as_str().to_lowercase();

    let code = ctx
        .history
        .iter()
        .rev()
        .find(|m| m.role == ChatRole::Assistant && m.content.contains(CODE_FENCE))?;

    Some(Route::Delegate(format!(
        "Convert the following code to {target} and explain it:\n{}\nPlease provide the code in {target} with explanation.",
        code.content
    )))
}

fn conversation(ctx: &RouteContext) -> Option<Route> {
    let prompt = ctx
        .history
        .iter()
        .filter(|m| !m.content.is_empty())
        .map(ChatMessage::labelled)
        .collect::<Vec<_>>()
        .join("\n");
    Some(Route::Delegate(prompt))
}

pub struct Router<R> {
    responder: R,
    clock: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl<R: Responder> Router<R> {
    pub fn new(responder: R) -> Self {
        Self {
            responder,
            clock: local_today,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> NaiveDate) -> Self {
        self.clock = clock;
        self
    }

    pub fn responder(&self) -> &R {
        &self.responder
    }

    /// Answer the latest turn, locally when a rule allows it and through the
    /// responder otherwise. Responder errors are returned as-is.
    pub async fn route(&self, history: &[ChatMessage], image: Option<&Image>) -> Result<String> {
        match plan(history, (self.clock)()) {
            Route::Reply(text) => Ok(text),
            Route::Delegate(prompt) => {
                let text = Some(prompt.as_str()).filter(|p| !p.is_empty());
                self.responder.generate(text, image).await
            }
        }
    }
}
