//! Pipeline for `generate-ai-video-ads`.
//!
//! Stage sequence: ad scripts (Gemini) → character images (flux) → per-chunk
//! narration audio (F5-TTS) and video clips (Kling) → ffmpeg assembly →
//! final upload. Progress is reported through the `scripts_generated` and
//! `images_generated` stage labels; the per-chunk media stage runs without an
//! intermediate label, matching what polling clients expect.

use std::path::PathBuf;
use std::sync::OnceLock;

use async_trait::async_trait;
use genpipe_core::assembly;
use genpipe_core::error::CoreError;
use genpipe_db::models::job::Job;
use genpipe_db::models::status::JobStatus;
use genpipe_db::repositories::JobRepo;
use genpipe_genai::fal::url_at;
use genpipe_genai::gemini::Part;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::{PipelineContext, PipelineError, SystemPipeline};

pub const SLUG: &str = "generate-ai-video-ads";

const SCRIPT_MODEL: &str = "gemini-2.5-flash";
const IMAGE_MODEL: &str = "fal-ai/flux-pro/v1.1-ultra";
const TTS_MODEL: &str = "fal-ai/f5-tts";
const VIDEO_MODEL: &str = "fal-ai/kling-video/v1.0/standard/image-to-video";

/// Reference voice for TTS (generic female voice).
const TTS_REF_AUDIO_URL: &str = "https://fal.media/files/monkey/Tx_dev_S5-JgJ7c8w8L7j.wav";

/// Character image variations generated per job.
const IMAGE_VARIATIONS: usize = 3;

/// Photos fed into the product analysis call (more adds cost, not quality).
const MAX_ANALYZED_PHOTOS: usize = 3;

/// Cap on scraped brand-context text passed into the script prompt.
const MAX_BRAND_CONTEXT_CHARS: usize = 4000;

/// How the on-screen character engages with the product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductInteraction {
    Wearing,
    Holding,
    Using,
}

impl ProductInteraction {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductInteraction::Wearing => "wearing",
            ProductInteraction::Holding => "holding",
            ProductInteraction::Using => "using",
        }
    }
}

/// Camera framing for the character images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraAngle {
    FullBody,
    WaistUp,
    CloseUp,
}

impl CameraAngle {
    pub fn as_str(self) -> &'static str {
        match self {
            CameraAngle::FullBody => "full_body",
            CameraAngle::WaistUp => "waist_up",
            CameraAngle::CloseUp => "close_up",
        }
    }

    /// Framing phrase injected into the image prompt.
    pub fn framing(self) -> &'static str {
        match self {
            CameraAngle::FullBody => "full body shot from head to toe",
            CameraAngle::WaistUp => "medium shot from the waist up",
            CameraAngle::CloseUp => "close-up shot of face and upper chest",
        }
    }
}

/// Submission payload.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct VideoAdRequest {
    #[validate(length(min = 1, message = "client_id must not be empty"))]
    pub client_id: String,
    /// Product photos as data: URIs or http(s) URLs.
    #[validate(length(min = 1, message = "at least one product photo is required"))]
    pub product_photos: Vec<String>,
    #[validate(length(min = 1, message = "product_brief must not be empty"))]
    pub product_brief: String,
    pub product_interaction: ProductInteraction,
    pub camera_angle: CameraAngle,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub brand_reference_url: Option<String>,
}

/// One 8-10 second piece of a script; each chunk becomes one audio/video clip.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScriptChunk {
    pub chunk_id: u32,
    pub text: String,
    pub duration_estimate: u32,
}

/// One complete ad script.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Script {
    pub script_id: String,
    pub hook_angle: String,
    pub full_text: String,
    pub chunks: Vec<ScriptChunk>,
}

#[derive(Debug, Deserialize)]
struct ScriptsOutput {
    scripts: Vec<Script>,
}

/// Parse and validate a submission payload.
pub fn parse_request(payload: &Value) -> Result<VideoAdRequest, CoreError> {
    let request: VideoAdRequest = serde_json::from_value(payload.clone())
        .map_err(|e| CoreError::Validation(e.to_string()))?;
    request
        .validate()
        .map_err(|e| CoreError::Validation(e.to_string()))?;
    Ok(request)
}

pub struct VideoAdsPipeline;

#[async_trait]
impl SystemPipeline for VideoAdsPipeline {
    fn slug(&self) -> &'static str {
        SLUG
    }

    fn validate(&self, payload: &Value) -> Result<(), CoreError> {
        parse_request(payload).map(|_| ())
    }

    async fn run(&self, ctx: &PipelineContext, job: &Job) -> Result<(), PipelineError> {
        let work_dir = ctx.job_dir(job.id);
        tokio::fs::create_dir_all(&work_dir).await?;

        let result = self.execute(ctx, job, &work_dir).await;

        // Scratch files are removed whatever the outcome; uploaded
        // intermediate assets stay in object storage.
        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            tracing::warn!(job_id = %job.id, error = %e, "Could not remove scratch dir");
        }

        result
    }
}

impl VideoAdsPipeline {
    async fn execute(
        &self,
        ctx: &PipelineContext,
        job: &Job,
        work_dir: &std::path::Path,
    ) -> Result<(), PipelineError> {
        let request =
            parse_request(&job.payload).map_err(|e| PipelineError::Payload(e.to_string()))?;
        let job_id = job.id;

        // --- Stage 1: ad scripts ---
        let brand_context = match &request.brand_reference_url {
            Some(url) => scrape_brand_context(ctx, url).await,
            None => String::new(),
        };
        let scripts = self.generate_scripts(ctx, &request, &brand_context).await?;
        let applied = JobRepo::advance(
            &ctx.pool,
            job_id,
            JobStatus::ScriptsGenerated,
            &json!({ "scripts": &scripts }),
        )
        .await?;
        if !applied {
            tracing::warn!(%job_id, "Job already terminal; stage update skipped");
        }
        tracing::info!(%job_id, count = scripts.len(), "Ad scripts generated");

        // --- Stage 2: character images ---
        let product_description = self.analyze_product_photos(ctx, &request).await?;
        let character_images = self
            .generate_character_images(ctx, &request, &product_description, job)
            .await?;
        let applied = JobRepo::advance(
            &ctx.pool,
            job_id,
            JobStatus::ImagesGenerated,
            &json!({
                "character_images": &character_images,
                "product_description": &product_description,
            }),
        )
        .await?;
        if !applied {
            tracing::warn!(%job_id, "Job already terminal; stage update skipped");
        }
        tracing::info!(%job_id, count = character_images.len(), "Character images generated");

        // --- Stage 3: per-chunk media for the selected script/character ---
        // Defaults: first script, first image variation.
        let selected_script = scripts
            .first()
            .ok_or_else(|| PipelineError::Output("model returned no scripts".into()))?;
        let selected_character = character_images
            .first()
            .ok_or_else(|| PipelineError::Output("no character image generated".into()))?;

        let mut merged_clips: Vec<PathBuf> = Vec::with_capacity(selected_script.chunks.len());
        for (i, chunk) in selected_script.chunks.iter().enumerate() {
            let local_audio = work_dir.join(format!("audio_{i}.wav"));
            let audio_url = self.generate_audio(ctx, &chunk.text, job, i).await?;
            ctx.storage.download_to(&audio_url, &local_audio).await?;

            let local_video = work_dir.join(format!("video_{i}.mp4"));
            let video_url = self
                .generate_video_clip(ctx, selected_character, &chunk.text, job, i)
                .await?;
            ctx.storage.download_to(&video_url, &local_video).await?;

            let merged = work_dir.join(format!("final_clip_{i}.mp4"));
            assembly::merge_clip(&local_video, &local_audio, &merged).await?;
            merged_clips.push(merged);

            tracing::debug!(%job_id, chunk = i, "Chunk media generated and merged");
        }

        // --- Stage 4: assembly and final upload ---
        let final_output = work_dir.join("final_ad.mp4");
        assembly::concat_clips(&merged_clips, &final_output).await?;

        let final_url = ctx
            .storage
            .upload_file(&format!("jobs/{job_id}/final_ad.mp4"), &final_output, "video/mp4")
            .await?;

        JobRepo::complete(
            &ctx.pool,
            job_id,
            &json!({
                "final_video_url": final_url,
                "selected_script_id": &selected_script.script_id,
                "selected_character_image": selected_character,
            }),
        )
        .await?;
        Ok(())
    }

    /// Write exactly three chunked ad scripts with Gemini in JSON mode.
    async fn generate_scripts(
        &self,
        ctx: &PipelineContext,
        request: &VideoAdRequest,
        brand_context: &str,
    ) -> Result<Vec<Script>, PipelineError> {
        let prompt = build_script_prompt(request, brand_context);
        let raw = ctx
            .gemini
            .generate_json(SCRIPT_MODEL, vec![Part::text(prompt)], scripts_schema())
            .await?;
        let output: ScriptsOutput = serde_json::from_value(raw)
            .map_err(|e| PipelineError::Output(format!("script schema mismatch: {e}")))?;
        Ok(output.scripts)
    }

    /// Describe the product from its photos for image-prompt grounding.
    ///
    /// Photos that cannot be fetched or decoded are skipped; with no usable
    /// photo the brief itself serves as the description.
    async fn analyze_product_photos(
        &self,
        ctx: &PipelineContext,
        request: &VideoAdRequest,
    ) -> Result<String, PipelineError> {
        let mut parts = vec![Part::text(
            "Describe this product in precise visual detail for image generation.",
        )];

        for photo in request.product_photos.iter().take(MAX_ANALYZED_PHOTOS) {
            if let Some((mime, bytes)) = parse_data_uri(photo) {
                parts.push(Part::inline_bytes(mime, &bytes));
            } else if photo.starts_with("http") {
                match ctx.storage.fetch(photo).await {
                    Ok((bytes, content_type)) => {
                        let mime = content_type.split(';').next().unwrap_or("image/jpeg");
                        parts.push(Part::inline_bytes(mime, &bytes));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping unreachable product photo");
                    }
                }
            }
        }

        if parts.len() == 1 {
            return Ok(request.product_brief.clone());
        }

        Ok(ctx.gemini.generate_text(SCRIPT_MODEL, parts).await?)
    }

    /// Generate the character image variations and mirror them into storage.
    async fn generate_character_images(
        &self,
        ctx: &PipelineContext,
        request: &VideoAdRequest,
        product_description: &str,
        job: &Job,
    ) -> Result<Vec<String>, PipelineError> {
        let prompt = build_image_prompt(request, product_description);

        let mut urls = Vec::with_capacity(IMAGE_VARIATIONS);
        for i in 0..IMAGE_VARIATIONS {
            let response = ctx
                .fal
                .run(
                    IMAGE_MODEL,
                    json!({
                        "prompt": prompt,
                        "aspect_ratio": "9:16",
                        "safety_tolerance": "2",
                        "seed": i * 1000 + 42,
                    }),
                )
                .await?;
            let cdn_url = url_at(&response, &["images", "0", "url"])?;
            let stored = ctx
                .storage
                .upload_from_url(
                    &format!("jobs/{}/character/variation-{}.png", job.id, i + 1),
                    cdn_url,
                )
                .await?;
            urls.push(stored);
        }
        Ok(urls)
    }

    /// Narrate one script chunk via F5-TTS; returns the mirrored storage URL.
    async fn generate_audio(
        &self,
        ctx: &PipelineContext,
        text: &str,
        job: &Job,
        chunk_index: usize,
    ) -> Result<String, PipelineError> {
        let response = ctx
            .fal
            .run(
                TTS_MODEL,
                json!({
                    "gen_text": clean_tts_text(text),
                    "ref_audio_url": TTS_REF_AUDIO_URL,
                }),
            )
            .await?;
        let cdn_url = url_at(&response, &["audio_url", "url"])?;
        Ok(ctx
            .storage
            .upload_from_url(&format!("jobs/{}/audio/chunk-{}.wav", job.id, chunk_index), cdn_url)
            .await?)
    }

    /// Animate the character image for one chunk via Kling image-to-video.
    ///
    /// Kling produces 5s or 10s clips; assembly loops the clip to the
    /// narration length.
    async fn generate_video_clip(
        &self,
        ctx: &PipelineContext,
        image_url: &str,
        prompt: &str,
        job: &Job,
        chunk_index: usize,
    ) -> Result<String, PipelineError> {
        let response = ctx
            .fal
            .run(
                VIDEO_MODEL,
                json!({
                    "prompt": prompt,
                    "image_url": image_url,
                    "duration": "5",
                    "aspect_ratio": "9:16",
                }),
            )
            .await?;
        let cdn_url = url_at(&response, &["video", "url"])?;
        Ok(ctx
            .storage
            .upload_from_url(&format!("jobs/{}/video/chunk-{}.mp4", job.id, chunk_index), cdn_url)
            .await?)
    }
}

/// Fetch the brand reference page and reduce it to plain text.
///
/// Best effort only: any failure yields an empty context rather than a
/// failed job, since the scripts work without it.
async fn scrape_brand_context(ctx: &PipelineContext, url: &str) -> String {
    match ctx.storage.fetch(url).await {
        Ok((bytes, _)) => {
            let html = String::from_utf8_lossy(&bytes);
            let mut text = strip_html(&html);
            truncate_to_boundary(&mut text, MAX_BRAND_CONTEXT_CHARS);
            text
        }
        Err(e) => {
            tracing::warn!(url, error = %e, "Brand reference fetch failed, continuing without it");
            String::new()
        }
    }
}

/// Truncate to at most `max_bytes`, backing up to a UTF-8 char boundary
/// when the cut would land inside a multibyte character.
fn truncate_to_boundary(text: &mut String, max_bytes: usize) {
    if text.len() <= max_bytes {
        return;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

/// Strip tags and collapse whitespace in an HTML document.
fn strip_html(html: &str) -> String {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    static WS_RE: OnceLock<Regex> = OnceLock::new();
    let tag_re = TAG_RE.get_or_init(|| Regex::new(r"(?s)<script.*?</script>|<style.*?</style>|<[^>]*>").unwrap());
    let ws_re = WS_RE.get_or_init(|| Regex::new(r"\s+").unwrap());

    let without_tags = tag_re.replace_all(html, " ");
    ws_re.replace_all(&without_tags, " ").trim().to_string()
}

/// Decode a `data:<mime>;base64,<payload>` URI.
fn parse_data_uri(uri: &str) -> Option<(&str, Vec<u8>)> {
    use base64::Engine;

    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.split(';').next().filter(|m| !m.is_empty())?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .ok()?;
    Some((mime, bytes))
}

/// Normalize chunk text for the TTS model.
fn clean_tts_text(text: &str) -> String {
    text.replace('"', "").replace('\n', " ").trim().to_string()
}

/// Build the script-writing prompt.
fn build_script_prompt(request: &VideoAdRequest, brand_context: &str) -> String {
    let brand_section = if brand_context.is_empty() {
        String::new()
    } else {
        format!("BRAND CONTEXT:\n{brand_context}\n")
    };
    let audience_section = request
        .target_audience
        .as_deref()
        .map(|a| format!("Target audience: {a}"))
        .unwrap_or_default();

    format!(
        r#"You are a world-class UGC ad scriptwriter.
Write exactly 3 short-form video ad scripts.
PRODUCT BRIEF: {brief}
PRODUCT INTERACTION: {interaction}
CAMERA ANGLE: {angle}
{audience_section}
{brand_section}

REQUIREMENTS:
- 3 scripts, 30-60s each.
- Hooks: Emotional, Practical, Social Proof.
- Break into 8-10s chunks.
- Natural, conversational voice."#,
        brief = request.product_brief,
        interaction = request.product_interaction.as_str(),
        angle = request.camera_angle.as_str(),
    )
}

/// Build the character-image prompt.
fn build_image_prompt(request: &VideoAdRequest, product_description: &str) -> String {
    let mut prompt = format!(
        "Photorealistic UGC-style photo of a real person {interaction} a product. \
         The product: {product_description}. Framing: {framing}. \
         Setting: casual home environment, natural lighting. \
         Authentic expression, looking at camera. \
         High quality, 4k, raw photo.",
        interaction = request.product_interaction.as_str(),
        framing = request.camera_angle.framing(),
    );
    if let Some(audience) = &request.target_audience {
        prompt = format!("Demographic: {audience}. {prompt}");
    }
    prompt
}

/// Response schema enforcing [`ScriptsOutput`] on the model side.
fn scripts_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "scripts": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "script_id": { "type": "STRING" },
                        "hook_angle": { "type": "STRING" },
                        "full_text": { "type": "STRING" },
                        "chunks": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "chunk_id": { "type": "INTEGER" },
                                    "text": { "type": "STRING" },
                                    "duration_estimate": { "type": "INTEGER" },
                                },
                                "required": ["chunk_id", "text", "duration_estimate"],
                            },
                        },
                    },
                    "required": ["script_id", "hook_angle", "full_text", "chunks"],
                },
            },
        },
        "required": ["scripts"],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn valid_payload() -> Value {
        json!({
            "client_id": "c1",
            "product_photos": ["https://x/p.jpg"],
            "product_brief": "A collapsible water bottle",
            "product_interaction": "holding",
            "camera_angle": "waist_up",
        })
    }

    #[test]
    fn test_parse_request_accepts_valid_payload() {
        let request = parse_request(&valid_payload()).unwrap();
        assert_eq!(request.product_interaction, ProductInteraction::Holding);
        assert_eq!(request.camera_angle, CameraAngle::WaistUp);
        assert!(request.target_audience.is_none());
    }

    #[test]
    fn test_parse_request_rejects_empty_photos() {
        let mut payload = valid_payload();
        payload["product_photos"] = json!([]);
        let err = parse_request(&payload).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("product photo"));
    }

    #[test]
    fn test_parse_request_rejects_unknown_interaction() {
        let mut payload = valid_payload();
        payload["product_interaction"] = json!("licking");
        assert_matches!(parse_request(&payload), Err(CoreError::Validation(_)));
    }

    #[test]
    fn test_camera_angle_framing() {
        assert_eq!(CameraAngle::FullBody.framing(), "full body shot from head to toe");
        assert_eq!(CameraAngle::CloseUp.framing(), "close-up shot of face and upper chest");
    }

    #[test]
    fn test_parse_data_uri() {
        let (mime, bytes) = parse_data_uri("data:image/png;base64,YWJj").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, b"abc");
    }

    #[test]
    fn test_parse_data_uri_rejects_plain_url() {
        assert!(parse_data_uri("https://x/p.jpg").is_none());
        assert!(parse_data_uri("data:no-comma").is_none());
    }

    #[test]
    fn test_clean_tts_text() {
        assert_eq!(clean_tts_text("  \"Hello\"\nworld "), "Hello world");
    }

    #[test]
    fn test_truncate_to_boundary_inside_multibyte_char() {
        // The cut point lands on the second byte of the two-byte 'é'.
        let mut text = "a".repeat(MAX_BRAND_CONTEXT_CHARS - 1);
        text.push('é');
        truncate_to_boundary(&mut text, MAX_BRAND_CONTEXT_CHARS);
        assert_eq!(text.len(), MAX_BRAND_CONTEXT_CHARS - 1);
        assert!(text.chars().all(|c| c == 'a'));
    }

    #[test]
    fn test_truncate_to_boundary_leaves_short_text_alone() {
        let mut text = "héllo wörld".to_string();
        truncate_to_boundary(&mut text, MAX_BRAND_CONTEXT_CHARS);
        assert_eq!(text, "héllo wörld");
    }

    #[test]
    fn test_truncate_to_boundary_on_exact_boundary() {
        let mut text = "a".repeat(MAX_BRAND_CONTEXT_CHARS + 10);
        truncate_to_boundary(&mut text, MAX_BRAND_CONTEXT_CHARS);
        assert_eq!(text.len(), MAX_BRAND_CONTEXT_CHARS);
    }

    #[test]
    fn test_strip_html_removes_tags_and_scripts() {
        let html = "<html><script>var x = 1;</script><body><h1>Brand</h1>\n<p>Bold   claims</p></body></html>";
        assert_eq!(strip_html(html), "Brand Bold claims");
    }

    #[test]
    fn test_script_prompt_mentions_interaction_and_angle() {
        let request = parse_request(&valid_payload()).unwrap();
        let prompt = build_script_prompt(&request, "");
        assert!(prompt.contains("PRODUCT INTERACTION: holding"));
        assert!(prompt.contains("CAMERA ANGLE: waist_up"));
        assert!(!prompt.contains("BRAND CONTEXT"));
    }

    #[test]
    fn test_script_prompt_includes_brand_context() {
        let request = parse_request(&valid_payload()).unwrap();
        let prompt = build_script_prompt(&request, "We sell bottles.");
        assert!(prompt.contains("BRAND CONTEXT:\nWe sell bottles."));
    }

    #[test]
    fn test_image_prompt_prepends_demographic() {
        let mut payload = valid_payload();
        payload["target_audience"] = json!("hikers aged 25-40");
        let request = parse_request(&payload).unwrap();
        let prompt = build_image_prompt(&request, "a blue bottle");
        assert!(prompt.starts_with("Demographic: hikers aged 25-40."));
        assert!(prompt.contains("a blue bottle"));
    }

    #[test]
    fn test_scripts_output_parses_model_response() {
        let raw = json!({
            "scripts": [{
                "script_id": "s1",
                "hook_angle": "Emotional",
                "full_text": "full",
                "chunks": [
                    { "chunk_id": 0, "text": "hook", "duration_estimate": 8 },
                    { "chunk_id": 1, "text": "body", "duration_estimate": 10 },
                ],
            }],
        });
        let output: ScriptsOutput = serde_json::from_value(raw).unwrap();
        assert_eq!(output.scripts[0].chunks.len(), 2);
        assert_eq!(output.scripts[0].chunks[1].text, "body");
    }
}
