//! Session context and page state machine
//!
//! A [`Session`] is created with defaults, passed explicitly to every page
//! handler, and reset by clear-chat or logout. The chat page is only
//! reachable while `authenticated` is true.

use anyhow::Result;

use crate::image::Image;
use crate::state::ChatMessage;
use crate::users::{AuthError, UserStore};

/// Content recorded for a turn that only carries an image
pub const IMAGE_ONLY_CONTENT: &str = "(Image uploaded)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Login,
    Signup,
    Chat,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub authenticated: bool,
    pub page: Page,
    pub username: String,
    pub messages: Vec<ChatMessage>,
    pub pending_image: Option<Image>,
    /// Bumped whenever the upload control must forget its previous contents
    pub upload_slot: u32,
}

/// Snapshot handed to the chat engine when a turn starts
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub prompt: String,
    pub image: Option<Image>,
    pub history: Vec<ChatMessage>,
}

/// Result of running a turn: the user message as it should be recorded and
/// the reply (or the remote failure).
#[derive(Debug)]
pub struct TurnOutcome {
    pub user_message: ChatMessage,
    pub reply: Result<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page to render: the chat page falls back to login when not authenticated
    pub fn current_page(&self) -> Page {
        match self.page {
            Page::Chat if !self.authenticated => Page::Login,
            page => page,
        }
    }

    pub fn login(&mut self, store: &UserStore, username: &str, password: &str) -> Result<(), AuthError> {
        if !store.authenticate(username, password) {
            tracing::info!(username, "login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        self.authenticated = true;
        self.username = username.to_string();
        self.page = Page::Chat;
        tracing::info!(username, "logged in");
        Ok(())
    }

    pub fn go_to_signup(&mut self) {
        self.page = Page::Signup;
    }

    pub fn go_to_login(&mut self) {
        self.page = Page::Login;
    }

    pub fn register(&mut self, store: &mut UserStore, username: &str, password: &str) -> Result<(), AuthError> {
        store.register(username, password)?;
        self.page = Page::Login;
        Ok(())
    }

    pub fn logout(&mut self) {
        tracing::info!(username = %self.username, "logged out");
        self.authenticated = false;
        self.page = Page::Login;
    }

    /// Forget the conversation and any pending upload; stay logged in.
    pub fn clear_chat(&mut self) {
        self.messages.clear();
        self.pending_image = None;
        self.upload_slot = self.upload_slot.wrapping_add(1);
    }

    pub fn attach_image(&mut self, image: Image) {
        self.pending_image = Some(image);
    }

    /// An image that will be sent on its own as soon as the chat starts
    pub fn awaiting_first_image(&self) -> bool {
        self.pending_image.is_some() && self.messages.is_empty()
    }

    /// Start a turn when there is a prompt, or when an image is waiting and
    /// the conversation has not started yet.
    pub fn prepare_turn(&self, prompt: &str) -> Option<TurnRequest> {
        if prompt.is_empty() && !self.awaiting_first_image() {
            return None;
        }

        Some(TurnRequest {
            prompt: prompt.to_string(),
            image: self.pending_image.clone(),
            history: self.messages.clone(),
        })
    }

    /// Record a finished turn. The user message is always kept; the pending
    /// image is only consumed when a reply came back and it is the image that
    /// was sent with this turn.
    pub fn complete_turn(&mut self, outcome: TurnOutcome) -> Result<()> {
        let sent_image = outcome.user_message.image.clone();
        self.messages.push(outcome.user_message);

        let reply = outcome.reply?;
        self.messages.push(ChatMessage::assistant(reply));
        if sent_image.is_some() && self.pending_image == sent_image {
            self.pending_image = None;
        }
        self.upload_slot = self.upload_slot.wrapping_add(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::sample_png;
    use crate::state::ChatRole;
    use anyhow::anyhow;
    use tempfile::TempDir;

    fn store_with(dir: &TempDir, users: &[(&str, &str)]) -> UserStore {
        let mut store = UserStore::load(dir.path().join("users.json")).unwrap();
        for (u, p) in users {
            store.register(u, p).unwrap();
        }
        store
    }

    fn logged_in() -> Session {
        let mut session = Session::new();
        session.authenticated = true;
        session.page = Page::Chat;
        session.username = "ana".to_string();
        session
    }

    #[test]
    fn test_defaults() {
        let session = Session::new();
        assert!(!session.authenticated);
        assert_eq!(session.page, Page::Login);
        assert!(session.messages.is_empty());
        assert!(session.pending_image.is_none());
        assert_eq!(session.upload_slot, 0);
    }

    #[test]
    fn test_login_success_and_failure() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, &[("ana", "pw")]);
        let mut session = Session::new();

        assert_eq!(session.login(&store, "ana", "wrong"), Err(AuthError::InvalidCredentials));
        assert!(!session.authenticated);
        assert_eq!(session.current_page(), Page::Login);

        session.login(&store, "ana", "pw").unwrap();
        assert!(session.authenticated);
        assert_eq!(session.username, "ana");
        assert_eq!(session.current_page(), Page::Chat);
    }

    #[test]
    fn test_signup_flow() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with(&dir, &[("taken", "pw")]);
        let mut session = Session::new();

        session.go_to_signup();
        assert_eq!(session.current_page(), Page::Signup);

        assert_eq!(session.register(&mut store, "taken", "x"), Err(AuthError::UsernameTaken));
        assert_eq!(session.current_page(), Page::Signup);

        session.register(&mut store, "new", "secret").unwrap();
        assert_eq!(session.current_page(), Page::Login);
        assert!(!session.authenticated);
        assert!(store.authenticate("new", "secret"));

        session.go_to_signup();
        session.go_to_login();
        assert_eq!(session.current_page(), Page::Login);
    }

    #[test]
    fn test_chat_requires_authentication() {
        let mut session = Session::new();
        session.page = Page::Chat;
        assert_eq!(session.current_page(), Page::Login);
    }

    #[test]
    fn test_logout_returns_to_login() {
        let mut session = logged_in();
        session.messages.push(ChatMessage::user("hi"));
        session.logout();
        assert!(!session.authenticated);
        assert_eq!(session.current_page(), Page::Login);
    }

    #[test]
    fn test_clear_chat_keeps_authentication() {
        let mut session = logged_in();
        session.messages.push(ChatMessage::user("hi"));
        session.attach_image(sample_png());

        session.clear_chat();
        assert!(session.messages.is_empty());
        assert!(session.pending_image.is_none());
        assert_eq!(session.upload_slot, 1);
        assert!(session.authenticated);
        assert_eq!(session.current_page(), Page::Chat);
    }

    #[test]
    fn test_prepare_turn_rules() {
        let mut session = logged_in();
        assert!(session.prepare_turn("").is_none());

        let request = session.prepare_turn("hello").unwrap();
        assert_eq!(request.prompt, "hello");
        assert!(request.image.is_none());

        session.attach_image(sample_png());
        let request = session.prepare_turn("").unwrap();
        assert!(request.image.is_some());
        assert!(request.history.is_empty());

        session.messages.push(ChatMessage::user("earlier"));
        assert!(session.prepare_turn("").is_none());
    }

    #[test]
    fn test_complete_turn_success_consumes_image() {
        let mut session = logged_in();
        session.attach_image(sample_png());

        let outcome = TurnOutcome {
            user_message: ChatMessage::user(IMAGE_ONLY_CONTENT).with_image(Some(sample_png())),
            reply: Ok("A cat".to_string()),
        };
        session.complete_turn(outcome).unwrap();

        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[1].role, ChatRole::Assistant);
        assert_eq!(session.messages[1].content, "A cat");
        assert!(session.pending_image.is_none());
        assert_eq!(session.upload_slot, 1);
    }

    #[test]
    fn test_complete_turn_keeps_image_attached_after_the_turn_started() {
        let mut session = logged_in();
        let request = session.prepare_turn("hello").unwrap();
        assert!(request.image.is_none());

        let mut later = sample_png();
        later.name = "later.png".to_string();
        session.attach_image(later.clone());

        let outcome = TurnOutcome {
            user_message: ChatMessage::user("hello"),
            reply: Ok("hi".to_string()),
        };
        session.complete_turn(outcome).unwrap();

        assert_eq!(session.messages.len(), 2);
        assert!(session.messages[0].image.is_none());
        assert_eq!(session.pending_image, Some(later));
    }

    #[test]
    fn test_complete_turn_failure_keeps_user_message_and_image() {
        let mut session = logged_in();
        session.attach_image(sample_png());

        let outcome = TurnOutcome {
            user_message: ChatMessage::user("describe"),
            reply: Err(anyhow!("network down")),
        };
        let err = session.complete_turn(outcome).unwrap_err();

        assert_eq!(err.to_string(), "network down");
        assert_eq!(session.messages.len(), 1);
        assert!(session.pending_image.is_some());
        assert_eq!(session.upload_slot, 0);
    }
}
