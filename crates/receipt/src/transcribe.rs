//! Audio transcription client.
//!
//! Hands a recorded audio payload to the transcription backend and returns
//! the recognized text. Capture itself (microphone access, recording length)
//! is a host-UI concern and not handled here.

use serde::Deserialize;

use crate::store::ReceiptError;

#[derive(Debug, Deserialize)]
struct TranscriptionReply {
    #[serde(default)]
    text: Option<String>,
}

pub struct TranscriptionClient {
    base_url: String,
    http: reqwest::Client,
}

impl TranscriptionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Transcribe an audio payload. Absent text in the reply is an error:
    /// the backend answered but produced no transcription.
    pub async fn transcribe(
        &self,
        audio: Vec<u8>,
        file_name: impl Into<String>,
        mime: &str,
    ) -> Result<String, ReceiptError> {
        let part = reqwest::multipart::Part::bytes(audio)
            .file_name(file_name.into())
            .mime_str(mime)
            .map_err(|e| ReceiptError::with_source("Invalid audio mime type", e))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .http
            .post(format!("{}/whisper", self.base_url.trim_end_matches('/')))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ReceiptError::with_source("Transcription request failed", e))?;

        if !resp.status().is_success() {
            return Err(ReceiptError::new(format!(
                "Transcription HTTP error: {}",
                resp.status()
            )));
        }

        let reply = resp
            .json::<TranscriptionReply>()
            .await
            .map_err(|e| ReceiptError::with_source("Malformed transcription reply", e))?;

        match reply.text {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(ReceiptError::new("Transcription produced no text")),
        }
    }
}
