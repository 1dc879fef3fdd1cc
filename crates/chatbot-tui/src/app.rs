use std::path::{Path, PathBuf};
use std::sync::Arc;

use chatbot_core::export::{self, DOCUMENT_FILE_NAME, TEXT_FILE_NAME};
use chatbot_core::{
    AuthError, ChatEngine, ChatMessage, ChatRole, Config, GeminiClient, Image, Page, Router, Session,
    Translator, TurnOutcome, UserStore,
};
use tokio::task::JoinHandle;

pub type Engine = ChatEngine<GeminiClient>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Username,
    Password,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub text: String,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line text field with a character-based cursor
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    pub value: String,
    pub cursor: usize,
}

impl TextInput {
    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Rendered height of the transcript at `wrap_width`, capped at `u16::MAX`
fn transcript_lines(messages: &[ChatMessage], wrap_width: usize) -> u16 {
    let wrap_width = wrap_width.max(1);
    let mut total: u16 = 0;

    for msg in messages {
        total = total.saturating_add(1); // Role line ("You:" or "AI:")
        for line in msg.content.lines() {
            // Use character count, not byte length, for proper UTF-8 handling
            let wrapped = line.chars().count() / wrap_width + 1;
            total = total.saturating_add(u16::try_from(wrapped).unwrap_or(u16::MAX));
        }
        if msg.image.is_some() {
            total = total.saturating_add(1);
        }
        total = total.saturating_add(1); // Blank line after message
    }

    total
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub session: Session,
    pub users: UserStore,
    pub engine: Arc<Engine>,
    pub model_name: String,
    pub export_dir: PathBuf,
    pub status: Option<Status>,

    // Login / signup form
    pub username_input: TextInput,
    pub password_input: TextInput,
    pub form_field: FormField,

    // Chat state
    pub chat_input: TextInput,
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub pending_prompt: Option<String>,
    pub turn_task: Option<JoinHandle<TurnOutcome>>,

    // Image upload prompt
    pub show_upload: bool,
    pub upload_input: TextInput,
    pub upload_slot_seen: u32,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(config: &Config, users: UserStore, api_key: Option<String>) -> Self {
        let api_key = api_key.unwrap_or_default();
        let client = GeminiClient::new(&api_key, &config.model)
            .with_generation(config.generation());
        let engine = ChatEngine::new(Translator::new(), Router::new(client));

        let mut app = Self::with_engine(users, engine, config.export_dir());
        if api_key.is_empty() {
            tracing::warn!("no Gemini API key configured");
            app.set_status(
                StatusKind::Error,
                "GEMINI_API_KEY is not set; replies will fail until it is configured.",
            );
        }
        app
    }

    pub fn with_engine(users: UserStore, engine: Engine, export_dir: PathBuf) -> Self {
        let model_name = engine.router().responder().model().to_string();
        Self {
            should_quit: false,
            session: Session::new(),
            users,
            engine: Arc::new(engine),
            model_name,
            export_dir,
            status: None,

            username_input: TextInput::default(),
            password_input: TextInput::default(),
            form_field: FormField::Username,

            chat_input: TextInput::default(),
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            pending_prompt: None,
            turn_task: None,

            show_upload: false,
            upload_input: TextInput::default(),
            upload_slot_seen: 0,

            animation_frame: 0,
        }
    }

    pub fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = Some(Status { kind, text: text.into() });
    }

    pub fn is_loading(&self) -> bool {
        self.turn_task.is_some()
    }

    // Form helpers
    pub fn focused_input(&mut self) -> &mut TextInput {
        match self.form_field {
            FormField::Username => &mut self.username_input,
            FormField::Password => &mut self.password_input,
        }
    }

    pub fn toggle_form_field(&mut self) {
        self.form_field = match self.form_field {
            FormField::Username => FormField::Password,
            FormField::Password => FormField::Username,
        };
    }

    fn reset_form(&mut self) {
        self.username_input.clear();
        self.password_input.clear();
        self.form_field = FormField::Username;
    }

    pub fn submit_login(&mut self) {
        let username = self.username_input.value.clone();
        let password = self.password_input.value.clone();

        match self.session.login(&self.users, &username, &password) {
            Ok(()) => {
                self.reset_form();
                self.set_status(StatusKind::Success, "Login successful!");
            }
            Err(e) => self.set_status(StatusKind::Error, e.to_string()),
        }
    }

    pub fn submit_signup(&mut self) {
        let username = self.username_input.value.clone();
        let password = self.password_input.value.clone();

        match self.session.register(&mut self.users, &username, &password) {
            Ok(()) => {
                self.reset_form();
                self.set_status(StatusKind::Success, "Account created! Go to login.");
            }
            Err(e @ AuthError::UsernameTaken) => self.set_status(StatusKind::Error, e.to_string()),
            Err(e) => {
                tracing::error!(error = %e, "signup failed");
                self.set_status(StatusKind::Error, e.to_string());
            }
        }
    }

    pub fn go_to_signup(&mut self) {
        self.reset_form();
        self.status = None;
        self.session.go_to_signup();
    }

    pub fn go_to_login(&mut self) {
        self.reset_form();
        self.status = None;
        self.session.go_to_login();
    }

    pub fn logout(&mut self) {
        if let Some(task) = self.turn_task.take() {
            task.abort();
        }
        self.pending_prompt = None;
        self.show_upload = false;
        self.chat_input.clear();
        self.reset_form();
        self.session.logout();
        self.status = None;
    }

    /// Forget the transcript. A turn still in flight is dropped so its reply
    /// cannot land in the cleared chat.
    pub fn clear_chat(&mut self) {
        if let Some(task) = self.turn_task.take() {
            task.abort();
        }
        self.pending_prompt = None;
        self.session.clear_chat();
        self.chat_scroll = 0;
        self.sync_upload_slot();
        self.set_status(StatusKind::Info, "Chat history cleared.");
    }

    // Chat turns

    /// Start a turn from the chat input. Ignored while another turn is running.
    pub fn send_message(&mut self) {
        if self.turn_task.is_some() {
            return;
        }

        let prompt = self.chat_input.value.clone();
        let Some(request) = self.session.prepare_turn(&prompt) else {
            return;
        };

        self.pending_prompt = Some(if prompt.is_empty() {
            chatbot_core::session::IMAGE_ONLY_CONTENT.to_string()
        } else {
            prompt
        });
        self.chat_input.clear();
        self.status = None;

        let engine = Arc::clone(&self.engine);
        self.turn_task = Some(tokio::spawn(async move { engine.run_turn(request).await }));

        // Scroll to bottom so "Thinking..." is visible
        self.scroll_chat_to_bottom();
    }

    /// Collect a finished turn, if any, into the session.
    pub async fn poll_turn(&mut self) {
        if !self.turn_task.as_ref().is_some_and(|t| t.is_finished()) {
            return;
        }
        let Some(task) = self.turn_task.take() else {
            return;
        };
        self.pending_prompt = None;

        match task.await {
            Ok(outcome) => {
                if let Err(e) = self.session.complete_turn(outcome) {
                    self.set_status(StatusKind::Error, format!("Error: {:#}", e));
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "chat turn task failed");
                self.set_status(StatusKind::Error, format!("Error: {}", e));
            }
        }

        self.sync_upload_slot();
        self.scroll_chat_to_bottom();
    }

    // Image upload

    pub fn open_upload(&mut self) {
        self.show_upload = true;
    }

    pub fn close_upload(&mut self) {
        self.show_upload = false;
    }

    /// Load the image at the typed path and attach it to the next message.
    /// When the chat has not started yet the image is sent right away.
    pub fn submit_upload(&mut self) {
        let path = self.upload_input.value.trim().to_string();
        if path.is_empty() {
            return;
        }

        match Image::load(Path::new(&path)) {
            Ok(image) => {
                let name = image.name.clone();
                self.session.attach_image(image);
                self.show_upload = false;
                self.set_status(StatusKind::Info, format!("Attached {}", name));

                if self.session.awaiting_first_image() {
                    let typed = std::mem::take(&mut self.chat_input);
                    self.send_message();
                    self.chat_input = typed;
                }
            }
            Err(e) => self.set_status(StatusKind::Error, format!("{:#}", e)),
        }
    }

    /// A new upload slot means the previous upload control is gone: forget
    /// whatever path was typed into it.
    pub fn sync_upload_slot(&mut self) {
        if self.session.upload_slot != self.upload_slot_seen {
            self.upload_input.clear();
            self.show_upload = false;
            self.upload_slot_seen = self.session.upload_slot;
        }
    }

    // Downloads

    pub fn download_text(&mut self) {
        let bytes = export::to_text(&self.session.messages);
        self.write_export(TEXT_FILE_NAME, Ok(bytes));
    }

    pub fn download_pdf(&mut self) {
        let bytes = export::to_document(&self.session.messages);
        self.write_export(DOCUMENT_FILE_NAME, bytes);
    }

    pub fn downloads_enabled(&self) -> bool {
        !self.session.messages.is_empty()
    }

    fn write_export(&mut self, file_name: &str, bytes: anyhow::Result<Vec<u8>>) {
        if !self.downloads_enabled() {
            self.set_status(StatusKind::Info, "Start a chat to enable downloads.");
            return;
        }

        let path = self.export_dir.join(file_name);
        let result = bytes.and_then(|b| {
            std::fs::create_dir_all(&self.export_dir)?;
            std::fs::write(&path, b)?;
            Ok(())
        });

        match result {
            Ok(()) => {
                tracing::info!(path = %path.display(), "exported chat");
                self.set_status(StatusKind::Success, format!("Saved {}", path.display()));
            }
            Err(e) => self.set_status(StatusKind::Error, format!("Export failed: {:#}", e)),
        }
    }

    // Scrolling

    pub fn page_title(&self) -> &'static str {
        match self.session.current_page() {
            Page::Login => "Login",
            Page::Signup => "Sign Up",
            Page::Chat => "Chat",
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    /// Scroll chat to bottom so the newest message (or "Thinking...") is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines = transcript_lines(&self.session.messages, wrap_width);
        if self.pending_prompt.is_some() {
            // "You:" + prompt + blank + "AI:" + "Thinking..."
            total_lines = total_lines.saturating_add(5);
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    pub fn role_label(role: ChatRole) -> &'static str {
        match role {
            ChatRole::User => "You:",
            ChatRole::Assistant => "AI:",
        }
    }
}
