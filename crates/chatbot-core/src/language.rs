//! Language detection and translation
//!
//! Both operations fail open: detection falls back to English and a failed
//! translation returns the input untouched. Neither ever surfaces an error.

use anyhow::{Result, anyhow};
use reqwest::Client;
use serde_json::Value;
use whatlang::Lang;

pub const TRANSLATE_URL: &str = "https://translate.googleapis.com/translate_a/single";

/// Best-effort ISO 639-1 code for `text`, `"en"` when unsure
pub fn detect_language(text: &str) -> String {
    match whatlang::detect(text) {
        Some(info) if info.is_reliable() => iso_code(info.lang()).to_string(),
        _ => "en".to_string(),
    }
}

fn iso_code(lang: Lang) -> &'static str {
    match lang {
        Lang::Eng => "en",
        Lang::Spa => "es",
        Lang::Fra => "fr",
        Lang::Deu => "de",
        Lang::Ita => "it",
        Lang::Por => "pt",
        Lang::Nld => "nl",
        Lang::Rus => "ru",
        Lang::Ukr => "uk",
        Lang::Pol => "pl",
        Lang::Tur => "tr",
        Lang::Ara => "ar",
        Lang::Hin => "hi",
        Lang::Jpn => "ja",
        Lang::Kor => "ko",
        Lang::Cmn => "zh",
        Lang::Swe => "sv",
        other => other.code(),
    }
}

#[derive(Clone)]
pub struct Translator {
    client: Client,
    url: String,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            url: TRANSLATE_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Translate `text` into `target`; on any failure the original text comes back.
    pub async fn translate_text(&self, text: &str, target: &str) -> String {
        match self.request(text, target).await {
            Ok(translated) => translated,
            Err(e) => {
                tracing::warn!(error = %e, target, "translation failed, keeping original text");
                text.to_string()
            }
        }
    }

    /// Translate non-English input to English, leave everything else alone.
    pub async fn normalize_input(&self, text: &str) -> String {
        let detected = detect_language(text);
        if detected == "en" {
            return text.to_string();
        }
        tracing::info!(language = %detected, "translating input to English");
        self.translate_text(text, "en").await
    }

    async fn request(&self, text: &str, target: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Translate request failed with status: {}", response.status()));
        }

        let body: Value = response.json().await?;
        parse_translation(&body)
    }
}

/// The endpoint answers with `[[["translated", "original", ...], ...], ...]`,
/// one inner entry per sentence.
fn parse_translation(body: &Value) -> Result<String> {
    let sentences = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("Unexpected translation response shape"))?;

    let translated: String = sentences
        .iter()
        .filter_map(|s| s.get(0).and_then(Value::as_str))
        .collect();

    if translated.is_empty() {
        return Err(anyhow!("Translation response contained no text"));
    }
    Ok(translated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unreachable_translator() -> Translator {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        Translator::new()
            .with_url(&format!("http://{}/translate_a/single", addr))
            .with_http_client(Client::builder().no_proxy().build().unwrap())
    }

    #[test]
    fn test_detect_english() {
        assert_eq!(
            detect_language("Could you please tell me what the weather will be like tomorrow in London?"),
            "en"
        );
    }

    #[test]
    fn test_detect_spanish() {
        assert_eq!(
            detect_language("¿Podrías decirme qué tiempo hará mañana en Madrid? Necesito saberlo para mi viaje."),
            "es"
        );
    }

    #[test]
    fn test_detect_falls_back_to_english() {
        assert_eq!(detect_language(""), "en");
        assert_eq!(detect_language("12345 !!!"), "en");
    }

    #[test]
    fn test_parse_translation_joins_sentences() {
        let body = json!([[["Hello. ", "Hola. ", null], ["How are you?", "¿Cómo estás?", null]], null, "es"]);
        assert_eq!(parse_translation(&body).unwrap(), "Hello. How are you?");
    }

    #[test]
    fn test_parse_translation_rejects_garbage() {
        assert!(parse_translation(&json!({"error": "nope"})).is_err());
        assert!(parse_translation(&json!([[]])).is_err());
    }

    #[tokio::test]
    async fn test_translate_failure_returns_original() {
        let translator = unreachable_translator();
        assert_eq!(translator.translate_text("Bonjour tout le monde", "en").await, "Bonjour tout le monde");
    }

    #[tokio::test]
    async fn test_normalize_keeps_english_without_request() {
        let translator = unreachable_translator();
        let text = "Please explain how ownership works in this program.";
        assert_eq!(translator.normalize_input(text).await, text);
    }
}
