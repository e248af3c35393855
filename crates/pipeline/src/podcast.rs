//! Pipeline for `transform-podcast-audio-into-content-for-platforms`.
//!
//! Single-stage system: the podcast audio is uploaded to Gemini as
//! large-context input and one schema-constrained generation call produces
//! platform-ready content. The job goes from `received` straight to a
//! terminal state.

use async_trait::async_trait;
use genpipe_core::error::CoreError;
use genpipe_db::models::job::Job;
use genpipe_db::repositories::JobRepo;
use genpipe_genai::gemini::Part;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::{PipelineContext, PipelineError, SystemPipeline};

pub const SLUG: &str = "transform-podcast-audio-into-content-for-platforms";

/// Flash is enough here: one multimodal call, latency matters more than
/// depth.
const MODEL: &str = "gemini-2.0-flash";

/// Submission payload.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct PodcastRequest {
    #[validate(length(min = 1, message = "client_id must not be empty"))]
    pub client_id: String,
    #[validate(length(min = 1, message = "audio_url must not be empty"))]
    pub audio_url: String,
    #[serde(default = "default_platforms")]
    pub platforms: Vec<String>,
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default)]
    pub episode_title: Option<String>,
    #[serde(default)]
    pub guest_name: Option<String>,
}

fn default_platforms() -> Vec<String> {
    vec![
        "linkedin".into(),
        "twitter".into(),
        "instagram".into(),
        "newsletter".into(),
    ]
}

fn default_tone() -> String {
    "professional".into()
}

/// Generated content, one field per supported platform plus extracted
/// quotes and topics.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContentOutput {
    pub linkedin: Vec<String>,
    /// Thread tweets followed by standalone tweets.
    pub twitter: Vec<String>,
    pub instagram: Vec<String>,
    pub newsletter: String,
    pub key_quotes: Vec<String>,
    pub topics: Vec<String>,
}

/// Parse and validate a submission payload.
pub fn parse_request(payload: &Value) -> Result<PodcastRequest, CoreError> {
    let request: PodcastRequest = serde_json::from_value(payload.clone())
        .map_err(|e| CoreError::Validation(e.to_string()))?;
    request
        .validate()
        .map_err(|e| CoreError::Validation(e.to_string()))?;
    Ok(request)
}

pub struct PodcastContentPipeline;

#[async_trait]
impl SystemPipeline for PodcastContentPipeline {
    fn slug(&self) -> &'static str {
        SLUG
    }

    fn validate(&self, payload: &Value) -> Result<(), CoreError> {
        parse_request(payload).map(|_| ())
    }

    async fn run(&self, ctx: &PipelineContext, job: &Job) -> Result<(), PipelineError> {
        let request = parse_request(&job.payload).map_err(|e| PipelineError::Payload(e.to_string()))?;

        // Fetch the episode audio and hand it to Gemini as file input.
        let (audio, content_type) = ctx.storage.fetch(&request.audio_url).await?;
        let mime = if content_type.starts_with("audio/") {
            content_type
        } else {
            "audio/mp3".to_string()
        };
        let uploaded = ctx.gemini.upload_file(audio, &mime).await?;

        tracing::debug!(job_id = %job.id, uri = %uploaded.uri, "Episode audio uploaded");

        let parts = vec![
            Part::file(uploaded.uri, uploaded.mime_type),
            Part::text(build_prompt(&request)),
        ];
        let raw = ctx.gemini.generate_json(MODEL, parts, response_schema()).await?;

        let content: ContentOutput = serde_json::from_value(raw)
            .map_err(|e| PipelineError::Output(format!("content schema mismatch: {e}")))?;

        JobRepo::complete(&ctx.pool, job.id, &json!({ "content": content })).await?;
        Ok(())
    }
}

/// Build the analysis/generation prompt for one episode.
fn build_prompt(request: &PodcastRequest) -> String {
    let mut context = String::new();
    if let Some(title) = &request.episode_title {
        context.push_str(&format!("Episode Title: {title}\n"));
    }
    if let Some(guest) = &request.guest_name {
        context.push_str(&format!("Guest Name: {guest}\n"));
    }

    let platforms = request.platforms.join(", ");

    format!(
        r#"You are an expert social media content strategist and copywriter.
Analyze the attached audio file (a podcast episode).

CONTEXT:
{context}Tone: {tone}

TASK:
1. Transcribe the audio internally (no need to output the full transcript, just use it for analysis).
2. Extract key quotes, main topics, and the most engaging/controversial moments.
3. Generate content for the following platforms: {platforms}.

PLATFORM REQUIREMENTS:
- LinkedIn: 1-2 long-form posts with strong hooks, professional yet engaging spacing, and a clear call to action.
- Twitter/X: A thread of 5-10 tweets summarizing the episode, plus 3 standalone viral-style tweets.
- Instagram: 3 caption options (short, medium, long) with relevant hashtags.
- Newsletter: A concise summary + bulleted key takeaways + "Why you should listen" section.

OUTPUT FORMAT:
Return PURE JSON matching this schema:
{{
  "linkedin": ["post 1", "post 2"],
  "twitter": ["thread tweet 1", "thread tweet 2", ... "standalone tweet 1", ...],
  "instagram": ["caption 1", "caption 2", "caption 3"],
  "newsletter": "full newsletter text...",
  "key_quotes": ["quote 1", "quote 2"],
  "topics": ["topic 1", "topic 2"]
}}"#,
        tone = request.tone,
    )
}

/// Response schema enforcing [`ContentOutput`] on the model side.
fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "linkedin": { "type": "ARRAY", "items": { "type": "STRING" } },
            "twitter": { "type": "ARRAY", "items": { "type": "STRING" } },
            "instagram": { "type": "ARRAY", "items": { "type": "STRING" } },
            "newsletter": { "type": "STRING" },
            "key_quotes": { "type": "ARRAY", "items": { "type": "STRING" } },
            "topics": { "type": "ARRAY", "items": { "type": "STRING" } },
        },
        "required": ["linkedin", "twitter", "instagram", "newsletter", "key_quotes", "topics"],
    })
}
