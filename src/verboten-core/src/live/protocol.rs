//! Wire types of live sessions.
//!
//! Realtime input frames and server events are relayed verbatim; the typed
//! views here only validate frames and pick out transcripts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, VerbotenError};
use crate::judge::live_judge_instructions;
use crate::language::Language;

/// Inline media payload: base64 data plus its MIME type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub data: String,
    pub mime_type: String,
}

/// One unit of player input, as sent by the browser.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<Blob>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_chunks: Option<Vec<Blob>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_stream_end: Option<bool>,
    /// Fields this server does not interpret; kept so the frame is relayed unmodified.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RealtimeInput {
    /// Parse a client frame. Anything that is not a non-empty JSON object
    /// of the realtime-input shape is malformed.
    pub fn parse(text: &str) -> Result<Self> {
        let frame: RealtimeInput =
            serde_json::from_str(text).map_err(|e| VerbotenError::MalformedFrame(e.to_string()))?;
        if frame.is_empty() {
            return Err(VerbotenError::MalformedFrame("empty frame".to_string()));
        }
        Ok(frame)
    }

    pub fn is_empty(&self) -> bool {
        self.audio.is_none()
            && self.media_chunks.is_none()
            && self.text.is_none()
            && self.audio_stream_end.is_none()
            && self.extra.is_empty()
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Client message wrapping this frame for the backend.
    pub fn to_client_message(&self) -> Result<String> {
        Ok(serde_json::to_string(&serde_json::json!({ "realtimeInput": self }))?)
    }
}

/// A transcript fragment.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Transcription {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    inline_data: Option<Blob>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ModelTurn {
    #[serde(default)]
    parts: Vec<Part>,
}

/// Incremental content produced by the model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    model_turn: Option<ModelTurn>,
    #[serde(default)]
    pub input_transcription: Option<Transcription>,
    #[serde(default)]
    pub output_transcription: Option<Transcription>,
    #[serde(default)]
    pub turn_complete: bool,
    #[serde(default)]
    pub generation_complete: bool,
    #[serde(default)]
    pub interrupted: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerMessage {
    #[serde(default)]
    server_content: Option<ServerContent>,
    #[serde(default)]
    setup_complete: Option<Value>,
    #[serde(default)]
    go_away: Option<Value>,
}

/// One message received from a live session.
#[derive(Debug, Clone)]
pub struct ServerEvent {
    raw: Value,
    message: ServerMessage,
}

impl ServerEvent {
    pub fn from_value(raw: Value) -> Result<Self> {
        let message = ServerMessage::deserialize(&raw)?;
        Ok(Self { raw, message })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// The event exactly as the backend sent it.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.raw)?)
    }

    pub fn server_content(&self) -> Option<&ServerContent> {
        self.message.server_content.as_ref()
    }

    pub fn input_transcript(&self) -> Option<&str> {
        self.server_content()
            .and_then(|c| c.input_transcription.as_ref())
            .map(|t| t.text.as_str())
    }

    pub fn output_transcript(&self) -> Option<&str> {
        self.server_content()
            .and_then(|c| c.output_transcription.as_ref())
            .map(|t| t.text.as_str())
    }

    /// Whether the event carries audio produced by the model.
    pub fn has_audio(&self) -> bool {
        self.server_content()
            .and_then(|c| c.model_turn.as_ref())
            .map(|t| {
                t.parts.iter().any(|p| {
                    p.inline_data
                        .as_ref()
                        .is_some_and(|b| b.mime_type.starts_with("audio/"))
                })
            })
            .unwrap_or(false)
    }

    pub fn is_turn_complete(&self) -> bool {
        self.server_content()
            .map(|c| c.turn_complete || c.generation_complete)
            .unwrap_or(false)
    }

    pub fn is_setup_complete(&self) -> bool {
        self.message.setup_complete.is_some()
    }

    /// The backend announced it will drop the connection.
    pub fn is_go_away(&self) -> bool {
        self.message.go_away.is_some()
    }
}

/// How eagerly the backend detects the start or end of speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensitivity {
    Default,
    High,
    Low,
}

/// Server-side voice activity detection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityDetection {
    pub start_sensitivity: Sensitivity,
    pub end_sensitivity: Sensitivity,
    pub prefix_padding_ms: Option<u32>,
    pub silence_duration_ms: Option<u32>,
}

/// Everything needed to open one live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSessionConfig {
    pub system_instruction: String,
    pub voice_name: Option<String>,
    pub input_transcription: bool,
    pub output_transcription: bool,
    pub activity_detection: Option<ActivityDetection>,
}

impl LiveSessionConfig {
    /// The guesser: speaks its guesses, transcribes both directions, and
    /// reacts quickly to pauses.
    pub fn guesser(language: Language, voice_name: &str) -> Self {
        Self {
            system_instruction: language.live_guesser_prompt().to_string(),
            voice_name: Some(voice_name.to_string()),
            input_transcription: true,
            output_transcription: true,
            activity_detection: Some(ActivityDetection {
                start_sensitivity: Sensitivity::High,
                end_sensitivity: Sensitivity::High,
                prefix_padding_ms: Some(100),
                silence_duration_ms: Some(100),
            }),
        }
    }

    /// The judge: only its output transcript matters.
    pub fn judge(forbidden: &[String]) -> Self {
        Self {
            system_instruction: live_judge_instructions(forbidden),
            voice_name: None,
            input_transcription: false,
            output_transcription: true,
            activity_detection: None,
        }
    }

    /// First message of the session, naming the model.
    pub fn setup_message(&self, model: &str) -> Value {
        let mut generation_config = serde_json::json!({ "responseModalities": ["AUDIO"] });
        if let Some(voice) = &self.voice_name {
            generation_config["speechConfig"] = serde_json::json!({
                "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } }
            });
        }

        let mut setup = serde_json::json!({
            "model": model,
            "generationConfig": generation_config,
            "systemInstruction": { "parts": [{ "text": self.system_instruction }] },
        });
        if self.input_transcription {
            setup["inputAudioTranscription"] = serde_json::json!({});
        }
        if self.output_transcription {
            setup["outputAudioTranscription"] = serde_json::json!({});
        }
        if let Some(vad) = &self.activity_detection {
            let mut detection = serde_json::json!({
                "startOfSpeechSensitivity": start_sensitivity(vad.start_sensitivity),
                "endOfSpeechSensitivity": end_sensitivity(vad.end_sensitivity),
            });
            if let Some(ms) = vad.prefix_padding_ms {
                detection["prefixPaddingMs"] = ms.into();
            }
            if let Some(ms) = vad.silence_duration_ms {
                detection["silenceDurationMs"] = ms.into();
            }
            setup["realtimeInputConfig"] = serde_json::json!({ "automaticActivityDetection": detection });
        }

        serde_json::json!({ "setup": setup })
    }
}

fn start_sensitivity(s: Sensitivity) -> &'static str {
    match s {
        Sensitivity::Default => "START_SENSITIVITY_UNSPECIFIED",
        Sensitivity::High => "START_SENSITIVITY_HIGH",
        Sensitivity::Low => "START_SENSITIVITY_LOW",
    }
}

fn end_sensitivity(s: Sensitivity) -> &'static str {
    match s {
        Sensitivity::Default => "END_SENSITIVITY_UNSPECIFIED",
        Sensitivity::High => "END_SENSITIVITY_HIGH",
        Sensitivity::Low => "END_SENSITIVITY_LOW",
    }
}

/// Messages the server itself sends to the browser.
///
/// They sit under a `verboten` key so they never collide with relayed events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Notice {
    /// The judge caught a proscribed word.
    Lost { judge: String },
    /// This game hit an error and is closing.
    Error { message: String },
    /// The game is over.
    Ended { reason: String },
}

impl Notice {
    pub fn to_json(&self) -> String {
        serde_json::json!({ "verboten": self }).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_audio_frame_keeps_unknown_fields() {
        let text = r#"{"audio":{"data":"AAAA","mimeType":"audio/pcm;rate=16000"},"futureField":1}"#;
        let frame = RealtimeInput::parse(text).unwrap();

        assert_eq!(frame.audio.as_ref().unwrap().mime_type, "audio/pcm;rate=16000");
        let relayed: Value = serde_json::from_str(&frame.to_client_message().unwrap()).unwrap();
        assert_eq!(relayed["realtimeInput"], serde_json::from_str::<Value>(text).unwrap());
    }

    #[test]
    fn test_malformed_frames() {
        for text in ["not json", "[1, 2]", "{}", r#"{"audio": 3}"#] {
            assert!(
                matches!(RealtimeInput::parse(text), Err(VerbotenError::MalformedFrame(_))),
                "{text} should be malformed"
            );
        }
    }

    #[test]
    fn test_server_event_transcripts() {
        let event = ServerEvent::from_json(
            r#"{"serverContent":{"outputTranscription":{"text":"poussent"},"turnComplete":true}}"#,
        )
        .unwrap();

        assert_eq!(event.output_transcript(), Some("poussent"));
        assert_eq!(event.input_transcript(), None);
        assert!(event.is_turn_complete());
        assert!(!event.has_audio());
    }

    #[test]
    fn test_server_event_audio_and_raw() {
        let text = r#"{"serverContent":{"modelTurn":{"parts":[{"inlineData":{"data":"AAAA","mimeType":"audio/pcm;rate=24000"}}]}},"usageMetadata":{"totalTokenCount":3}}"#;
        let event = ServerEvent::from_json(text).unwrap();

        assert!(event.has_audio());
        assert_eq!(event.raw(), &serde_json::from_str::<Value>(text).unwrap());
    }

    #[test]
    fn test_setup_complete() {
        let event = ServerEvent::from_json(r#"{"setupComplete":{}}"#).unwrap();
        assert!(event.is_setup_complete());
        assert!(event.server_content().is_none());
    }

    #[test]
    fn test_guesser_setup_message() {
        let setup = LiveSessionConfig::guesser(Language::Fr, "Puck").setup_message("models/m");

        assert_eq!(setup["setup"]["model"], "models/m");
        assert_eq!(
            setup["setup"]["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Puck"
        );
        let vad = &setup["setup"]["realtimeInputConfig"]["automaticActivityDetection"];
        assert_eq!(vad["startOfSpeechSensitivity"], "START_SENSITIVITY_HIGH");
        assert_eq!(vad["silenceDurationMs"], 100);
        assert!(setup["setup"]["inputAudioTranscription"].is_object());
    }

    #[test]
    fn test_judge_setup_embeds_word_list() {
        let forbidden = vec!["Corde".to_string(), "Ficelle".to_string()];
        let setup = LiveSessionConfig::judge(&forbidden).setup_message("models/m");

        let instruction = setup["setup"]["systemInstruction"]["parts"][0]["text"].as_str().unwrap();
        assert!(instruction.contains("Corde, Ficelle"));
        assert!(setup["setup"]["outputAudioTranscription"].is_object());
        assert!(setup["setup"].get("inputAudioTranscription").is_none());
    }

    #[test]
    fn test_notice_shape() {
        let json = Notice::Lost { judge: "poussent".into() }.to_json();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["verboten"]["type"], "lost");
        assert_eq!(value["verboten"]["judge"], "poussent");
    }
}
