//! REST client for the Gemini generative language API.
//!
//! Supports the two calls the pipelines need: uploading a media file for
//! large-context input, and a `generateContent` call with either free text or
//! schema-constrained JSON output.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Default public API host.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Errors from the Gemini API layer.
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("Gemini API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("unexpected Gemini response: {0}")]
    Parse(String),
}

/// One part of a multimodal request: text, a previously uploaded file, or
/// inline base64 bytes.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    File {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileData {
    #[serde(rename = "fileUri")]
    pub file_uri: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineData {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Base64-encoded bytes.
    pub data: String,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn file(file_uri: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Part::File {
            file_data: FileData {
                file_uri: file_uri.into(),
                mime_type: mime_type.into(),
            },
        }
    }

    pub fn inline_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        use base64::Engine;
        Part::Inline {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: base64::engine::general_purpose::STANDARD.encode(bytes),
            },
        }
    }
}

/// Handle for a file uploaded via the file API.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedFile {
    pub uri: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: UploadedFile,
}

/// HTTP client for the Gemini API.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Create a client against a non-default host (used by tests and proxies).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    /// Upload raw bytes via the file API for use as large-context input.
    pub async fn upload_file(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> Result<UploadedFile, GeminiError> {
        let url = format!(
            "{}/upload/v1beta/files?key={}",
            self.base_url, self.api_key
        );

        let resp = self
            .client
            .post(&url)
            .header("X-Goog-Upload-Protocol", "raw")
            .header("Content-Type", mime_type)
            .body(bytes)
            .send()
            .await?;

        let resp = check_status(resp).await?;
        let upload: UploadResponse = resp.json().await?;
        Ok(upload.file)
    }

    /// Generate free-form text from the given parts.
    pub async fn generate_text(
        &self,
        model: &str,
        parts: Vec<Part>,
    ) -> Result<String, GeminiError> {
        let body = request_body(parts, None);
        let resp = self.generate(model, body).await?;
        extract_text(&resp)
    }

    /// Generate JSON output constrained by `response_schema`.
    ///
    /// The model is asked for `application/json` and the returned text is
    /// parsed as a JSON value.
    pub async fn generate_json(
        &self,
        model: &str,
        parts: Vec<Part>,
        response_schema: Value,
    ) -> Result<Value, GeminiError> {
        let body = request_body(parts, Some(response_schema));
        let resp = self.generate(model, body).await?;
        let text = extract_text(&resp)?;
        serde_json::from_str(&text)
            .map_err(|e| GeminiError::Parse(format!("model returned invalid JSON: {e}")))
    }

    async fn generate(&self, model: &str, body: Value) -> Result<Value, GeminiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let resp = self.client.post(&url).json(&body).send().await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }
}

/// Build the `generateContent` request body.
fn request_body(parts: Vec<Part>, response_schema: Option<Value>) -> Value {
    let mut body = json!({
        "contents": [{
            "role": "user",
            "parts": parts,
        }],
    });
    if let Some(schema) = response_schema {
        body["generationConfig"] = json!({
            "responseMimeType": "application/json",
            "responseSchema": schema,
        });
    }
    body
}

/// Pull the first candidate's text out of a `generateContent` response.
fn extract_text(resp: &Value) -> Result<String, GeminiError> {
    resp["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| GeminiError::Parse("no text candidate in response".into()))
}

/// Map a non-2xx response to [`GeminiError::Api`] with the raw body attached.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, GeminiError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GeminiError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_part_serialization_shapes() {
        let text = serde_json::to_value(Part::text("hello")).unwrap();
        assert_eq!(text, json!({"text": "hello"}));

        let file = serde_json::to_value(Part::file("files/abc", "audio/mp3")).unwrap();
        assert_eq!(
            file,
            json!({"fileData": {"fileUri": "files/abc", "mimeType": "audio/mp3"}})
        );

        let inline = serde_json::to_value(Part::inline_bytes("image/png", b"ab")).unwrap();
        assert_eq!(inline["inlineData"]["mimeType"], "image/png");
        assert_eq!(inline["inlineData"]["data"], "YWI=");
    }

    #[test]
    fn test_request_body_with_schema() {
        let body = request_body(
            vec![Part::text("prompt")],
            Some(json!({"type": "OBJECT"})),
        );
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn test_request_body_without_schema_has_no_generation_config() {
        let body = request_body(vec![Part::text("prompt")], None);
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_extract_text_from_candidate() {
        let resp = json!({
            "candidates": [{
                "content": {"parts": [{"text": "  {\"ok\": true}\n"}]}
            }]
        });
        assert_eq!(extract_text(&resp).unwrap(), "{\"ok\": true}");
    }

    #[test]
    fn test_extract_text_missing_candidate() {
        let resp = json!({"candidates": []});
        assert_matches!(extract_text(&resp), Err(GeminiError::Parse(_)));
    }
}
