use crate::ai::Responder;
use crate::language::Translator;
use crate::router::Router;
use crate::session::{TurnOutcome, TurnRequest, IMAGE_ONLY_CONTENT};
use crate::state::ChatMessage;

/// Runs one chat turn end to end: language normalization, user message
/// construction, and routing.
pub struct ChatEngine<R> {
    translator: Translator,
    router: Router<R>,
}

impl<R: Responder> ChatEngine<R> {
    pub fn new(translator: Translator, router: Router<R>) -> Self {
        Self { translator, router }
    }

    pub fn router(&self) -> &Router<R> {
        &self.router
    }

    pub async fn run_turn(&self, request: TurnRequest) -> TurnOutcome {
        let content = if request.prompt.is_empty() {
            String::new()
        } else {
            self.translator.normalize_input(&request.prompt).await
        };

        let content = if content.is_empty() && request.image.is_some() {
            IMAGE_ONLY_CONTENT.to_string()
        } else {
            content
        };

        let user_message = ChatMessage::user(content).with_image(request.image.clone());

        let mut history = request.history;
        history.push(user_message.clone());

        let reply = self.router.route(&history, request.image.as_ref()).await;
        if let Err(e) = &reply {
            tracing::error!(error = %e, "response generation failed");
        }

        TurnOutcome { user_message, reply }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::sample_png;
    use crate::router::testing::RecordingResponder;
    use crate::session::Session;
    use reqwest::Client;

    fn engine(responder: RecordingResponder) -> ChatEngine<RecordingResponder> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let translator = Translator::new()
            .with_url(&format!("http://{}/translate", addr))
            .with_http_client(Client::builder().no_proxy().build().unwrap());
        ChatEngine::new(translator, Router::new(responder))
    }

    #[tokio::test]
    async fn test_text_turn_sends_full_conversation() {
        let engine = engine(RecordingResponder::default());
        let mut session = Session::new();
        session.messages.push(ChatMessage::user("Hello there, how are you doing today?"));
        session.messages.push(ChatMessage::assistant("Doing well."));

        let request = session
            .prepare_turn("Please write a short poem about the ocean and its waves.")
            .unwrap();
        let outcome = engine.run_turn(request).await;
        session.complete_turn(outcome).unwrap();

        assert_eq!(session.messages.len(), 4);
        assert_eq!(session.messages[3].content, "remote reply");

        let calls = engine.router().responder().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].0.as_deref(),
            Some(
                "User: Hello there, how are you doing today?\nAssistant: Doing well.\nUser: Please write a short poem about the ocean and its waves."
            )
        );
    }

    #[tokio::test]
    async fn test_image_only_turn() {
        let engine = engine(RecordingResponder::default());
        let mut session = Session::new();
        session.attach_image(sample_png());

        let request = session.prepare_turn("").unwrap();
        let outcome = engine.run_turn(request).await;
        assert_eq!(outcome.user_message.content, IMAGE_ONLY_CONTENT);
        assert!(outcome.user_message.image.is_some());

        session.complete_turn(outcome).unwrap();
        assert!(session.pending_image.is_none());

        let calls = engine.router().responder().calls();
        assert_eq!(calls[0].0.as_deref(), Some("User: (Image uploaded)"));
        assert_eq!(calls[0].1, Some(sample_png()));
    }

    #[tokio::test]
    async fn test_failed_turn_reports_error() {
        let engine = engine(RecordingResponder::failing("403 Forbidden"));
        let mut session = Session::new();

        let request = session.prepare_turn("Tell me something interesting about volcanoes.").unwrap();
        let outcome = engine.run_turn(request).await;
        assert!(outcome.reply.is_err());

        assert!(session.complete_turn(outcome).is_err());
        assert_eq!(session.messages.len(), 1);
    }
}
