//! JSON wire format of the live coaching endpoint.
//!
//! Three message families cross the websocket:
//!
//! * [`SetupMessage`] — sent once after connecting; declares the model, the
//!   audio response modality, the voice, and the coach persona.
//! * [`RealtimeInputMessage`] — one per outbound capture chunk.
//! * [`ServerMessage`] — everything inbound: the setup acknowledgement, model
//!   turns carrying base64 audio parts, and the `interrupted` barge-in flag.
//!
//! All field names are camelCase on the wire.

use serde::{Deserialize, Serialize};

use crate::audio::MediaChunk;

// ---------------------------------------------------------------------------
// Outbound: session setup
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupMessage {
    pub setup: Setup,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub parts: Vec<Part>,
}

/// One content part; outbound setup uses `text`, inbound model turns carry
/// `inline_data` audio.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: Option<String>,
    pub data: String,
}

/// Build the one-time setup message for a session.
pub fn setup_message(model: &str, voice: &str, system_instruction: &str) -> SetupMessage {
    SetupMessage {
        setup: Setup {
            model: model.to_string(),
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.to_string(),
                        },
                    },
                },
            },
            system_instruction: Content {
                parts: vec![Part {
                    text: Some(system_instruction.to_string()),
                    inline_data: None,
                }],
            },
        },
    }
}

// ---------------------------------------------------------------------------
// Outbound: realtime audio input
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

/// Wrap one capture chunk in its `realtimeInput` envelope.
pub fn realtime_input(chunk: MediaChunk) -> RealtimeInputMessage {
    RealtimeInputMessage {
        realtime_input: RealtimeInput {
            media_chunks: vec![chunk],
        },
    }
}

// ---------------------------------------------------------------------------
// Inbound: server messages
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    pub setup_complete: Option<serde_json::Value>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<Content>,
    #[serde(default)]
    pub interrupted: Option<bool>,
    #[serde(default)]
    pub turn_complete: Option<bool>,
}

impl ServerMessage {
    /// `true` for the handshake acknowledgement that ends session setup.
    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete.is_some()
    }

    /// Base64 audio of the first inline-data part of a model turn, if any.
    pub fn audio_payload(&self) -> Option<&str> {
        self.server_content
            .as_ref()?
            .model_turn
            .as_ref()?
            .parts
            .iter()
            .find_map(|part| part.inline_data.as_ref())
            .map(|inline| inline.data.as_str())
    }

    /// `true` when the remote wants queued playback discarded (barge-in).
    pub fn is_interrupted(&self) -> bool {
        self.server_content
            .as_ref()
            .and_then(|content| content.interrupted)
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::encode_chunk;

    #[test]
    fn setup_message_uses_camel_case_keys() {
        let msg = setup_message("models/coach", "Zephyr", "Be an energetic trainer.");
        let value = serde_json::to_value(&msg).expect("serialize");

        let setup = &value["setup"];
        assert_eq!(setup["model"], "models/coach");
        assert_eq!(setup["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            setup["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Zephyr"
        );
        assert_eq!(
            setup["systemInstruction"]["parts"][0]["text"],
            "Be an energetic trainer."
        );
    }

    #[test]
    fn setup_text_part_omits_inline_data() {
        let msg = setup_message("m", "v", "s");
        let json = serde_json::to_string(&msg).expect("serialize");
        assert!(!json.contains("inlineData"));
    }

    #[test]
    fn realtime_input_envelope_shape() {
        let msg = realtime_input(encode_chunk(&[0.0; 8]));
        let value = serde_json::to_value(&msg).expect("serialize");

        let chunk = &value["realtimeInput"]["mediaChunks"][0];
        assert_eq!(chunk["mimeType"], "audio/pcm;rate=16000");
        assert!(chunk["data"].is_string());
    }

    #[test]
    fn parses_setup_complete() {
        let msg: ServerMessage = serde_json::from_str(r#"{"setupComplete": {}}"#).expect("parse");
        assert!(msg.is_setup_complete());
        assert!(msg.audio_payload().is_none());
        assert!(!msg.is_interrupted());
    }

    #[test]
    fn parses_audio_payload_from_model_turn() {
        let json = r#"{
            "serverContent": {
                "modelTurn": {
                    "parts": [
                        {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "AAAA"}}
                    ]
                }
            }
        }"#;
        let msg: ServerMessage = serde_json::from_str(json).expect("parse");
        assert_eq!(msg.audio_payload(), Some("AAAA"));
        assert!(!msg.is_interrupted());
    }

    #[test]
    fn parses_interrupted_flag() {
        let json = r#"{"serverContent": {"interrupted": true}}"#;
        let msg: ServerMessage = serde_json::from_str(json).expect("parse");
        assert!(msg.is_interrupted());
        assert!(msg.audio_payload().is_none());
    }

    #[test]
    fn audio_and_interrupted_can_share_a_message() {
        let json = r#"{
            "serverContent": {
                "modelTurn": {"parts": [{"inlineData": {"data": "AAAA"}}]},
                "interrupted": true
            }
        }"#;
        let msg: ServerMessage = serde_json::from_str(json).expect("parse");
        assert_eq!(msg.audio_payload(), Some("AAAA"));
        assert!(msg.is_interrupted());
    }

    #[test]
    fn skips_text_parts_when_extracting_audio() {
        let json = r#"{
            "serverContent": {
                "modelTurn": {
                    "parts": [
                        {"text": "thinking..."},
                        {"inlineData": {"data": "BBBB"}}
                    ]
                }
            }
        }"#;
        let msg: ServerMessage = serde_json::from_str(json).expect("parse");
        assert_eq!(msg.audio_payload(), Some("BBBB"));
    }

    #[test]
    fn unknown_message_yields_no_events() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"usageMetadata": {"tokens": 3}}"#).expect("parse");
        assert!(!msg.is_setup_complete());
        assert!(msg.audio_payload().is_none());
        assert!(!msg.is_interrupted());
    }
}
