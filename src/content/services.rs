use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    analysis::{
        generation_suggestions, keyword_density, readability_score, refinement_changes,
        seo_score, seo_suggestions, DENSITY_MAX, DENSITY_MIN,
    },
    dto::{
        FactCheck, GenerateRequest, ListQuery, PlagiarismRequest,
        PlagiarismResponse, RefineRequest, RefineResponse, SeoRequest, SeoResponse,
        UpdateContentRequest,
    },
    repo_types::{
        count_words, reading_time_minutes, Content, ContentPatch, ContentStatus, ContentType,
        NewContent,
    },
};
use crate::{
    error::{AppError, FieldError},
    providers::{Completion, CompletionRequest, ModelChoice, TextProvider},
    state::AppState,
};

pub const MAX_WORD_COUNT: i64 = 5000;
const MAX_PAGE_SIZE: i64 = 100;
const MIN_COMPLETION_TOKENS: u32 = 256;

/// A generation request that passed validation.
#[derive(Debug, Clone)]
pub struct GenerationBrief {
    pub title: String,
    pub content_type: ContentType,
    pub description: String,
    pub target_audience: String,
    pub tone: String,
    pub word_count: u32,
    pub keywords: Vec<String>,
    pub choice: ModelChoice,
}

fn required(value: Option<String>, field: &str, errors: &mut Vec<FieldError>) -> String {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v,
        _ => {
            errors.push(FieldError::new(field, &format!("{field} is required")));
            String::new()
        }
    }
}

fn parse_choice(preferred: Option<&str>) -> Result<ModelChoice, FieldError> {
    match preferred {
        None => Ok(ModelChoice::default()),
        Some(raw) => ModelChoice::parse(raw).ok_or_else(|| {
            FieldError::new("preferred_model", &format!("unknown provider or model {raw:?}"))
        }),
    }
}

pub fn validate_generate(req: GenerateRequest) -> Result<GenerationBrief, AppError> {
    let mut errors = Vec::new();

    let title = required(req.title, "title", &mut errors);
    let content_type = match req.content_type.as_deref().map(str::trim) {
        None | Some("") => {
            errors.push(FieldError::new("content_type", "content_type is required"));
            None
        }
        Some(raw) => match raw.parse::<ContentType>() {
            Ok(t) => Some(t),
            Err(e) => {
                errors.push(FieldError::new("content_type", &e.to_string()));
                None
            }
        },
    };
    let description = required(req.description, "description", &mut errors);
    let target_audience = required(req.target_audience, "target_audience", &mut errors);
    let tone = required(req.tone, "tone", &mut errors);
    let word_count = match req.word_count {
        None => {
            errors.push(FieldError::new("word_count", "word_count is required"));
            0
        }
        Some(n) if !(1..=MAX_WORD_COUNT).contains(&n) => {
            errors.push(FieldError::new(
                "word_count",
                &format!("word_count must be between 1 and {MAX_WORD_COUNT}"),
            ));
            0
        }
        Some(n) => n as u32,
    };
    let choice = parse_choice(req.preferred_model.as_deref()).unwrap_or_else(|e| {
        errors.push(e);
        ModelChoice::default()
    });

    match content_type {
        Some(content_type) if errors.is_empty() => Ok(GenerationBrief {
            title,
            content_type,
            description,
            target_audience,
            tone,
            word_count,
            keywords: req
                .keywords
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            choice,
        }),
        _ => Err(AppError::Validation(errors)),
    }
}

/// System and user prompt for a generation request.
pub fn build_prompt(brief: &GenerationBrief) -> (String, String) {
    let label = brief.content_type.label();
    let system = format!(
        "You are a professional {label} writer. Write in a {} tone for {}.",
        brief.tone, brief.target_audience
    );
    let mut prompt = format!(
        "Write a {label} of approximately {} words titled \"{}\".\n\nTopic: {}\nTarget audience: {}\nTone: {}",
        brief.word_count, brief.title, brief.description, brief.target_audience, brief.tone
    );
    if !brief.keywords.is_empty() {
        prompt.push_str(&format!(
            "\nWork these keywords in naturally: {}",
            brief.keywords.join(", ")
        ));
    }
    prompt.push_str("\n\nReturn only the finished text.");
    (system, prompt)
}

fn completion_request(
    st: &AppState,
    system: String,
    prompt: String,
    choice: &ModelChoice,
    max_tokens: u32,
) -> CompletionRequest {
    CompletionRequest {
        system,
        prompt,
        model: choice.model.clone(),
        max_tokens,
        temperature: st.config.providers.temperature,
    }
}

fn generation_budget(st: &AppState, word_count: u32) -> u32 {
    // Roughly 1.5 tokens per English word, with headroom.
    word_count
        .saturating_mul(2)
        .max(MIN_COMPLETION_TOKENS)
        .min(st.config.providers.max_tokens.max(MIN_COMPLETION_TOKENS))
}

async fn call_provider(
    st: &AppState,
    choice: &ModelChoice,
    req: &CompletionRequest,
) -> anyhow::Result<Completion> {
    let provider = st.providers.resolve(choice)?;
    provider.complete(req).await
}

/// Generate content and persist the outcome. Provider failures never surface
/// as errors here: they are stored as `failed` records and returned. The row
/// is written once, after the provider call, so an abandoned request leaves
/// nothing behind.
#[instrument(skip(st, req), fields(owner_id = %owner_id))]
pub async fn generate(
    st: &AppState,
    owner_id: Uuid,
    req: GenerateRequest,
) -> Result<Content, AppError> {
    let brief = validate_generate(req)?;
    let provider_kind = st.providers.target(&brief.choice);

    let mut metadata = json!({
        "description": brief.description,
        "target_audience": brief.target_audience,
        "tone": brief.tone,
        "keywords": brief.keywords,
        "requested_word_count": brief.word_count,
        "provider": provider_kind.as_str(),
    });

    let (system, prompt) = build_prompt(&brief);
    let request = completion_request(
        st,
        system,
        prompt,
        &brief.choice,
        generation_budget(st, brief.word_count),
    );

    let (status, body, word_count) = match call_provider(st, &brief.choice, &request).await {
        Ok(completion) => {
            let word_count = count_words(&completion.text);
            metadata["model"] = json!(completion.model);
            metadata["tokens_used"] = json!(completion.tokens_used);
            metadata["estimated_reading_time"] = json!(reading_time_minutes(word_count));
            metadata["suggestions"] = json!(generation_suggestions(
                &completion.text,
                brief.content_type,
                brief.word_count,
                &brief.keywords,
            ));
            (ContentStatus::Completed, completion.text, word_count)
        }
        Err(e) => {
            warn!(provider = %provider_kind, error = %e, "generation failed");
            metadata["error"] = json!(e.to_string());
            (ContentStatus::Failed, String::new(), 0)
        }
    };

    let content = st
        .contents
        .insert(NewContent {
            owner_id,
            title: brief.title,
            content_type: brief.content_type,
            status,
            body,
            word_count,
            metadata,
        })
        .await?;
    info!(
        content_id = %content.id,
        provider = %provider_kind,
        status = content.status.as_str(),
        word_count,
        "content stored"
    );
    Ok(content)
}

pub async fn list(st: &AppState, owner_id: Uuid, q: ListQuery) -> Result<Vec<Content>, AppError> {
    let content_type = match q.content_type.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<ContentType>()
                .map_err(|e| AppError::field("content_type", &e.to_string()))?,
        ),
    };
    let limit = q.limit.clamp(1, MAX_PAGE_SIZE);
    let offset = q.offset.max(0);
    Ok(st
        .contents
        .list_by_owner(owner_id, content_type, limit, offset)
        .await?)
}

/// Reads hide foreign records entirely; writes on a foreign record are
/// refused with 403.
async fn load(
    st: &AppState,
    owner_id: Uuid,
    id: Uuid,
    for_write: bool,
) -> Result<Content, AppError> {
    match st.contents.get(id).await? {
        Some(c) if c.owner_id == owner_id => Ok(c),
        Some(_) if for_write => {
            warn!(content_id = %id, user_id = %owner_id, "write on foreign content refused");
            Err(AppError::Forbidden("Not allowed to modify this content".into()))
        }
        _ => Err(AppError::NotFound("Content not found".into())),
    }
}

pub async fn get(st: &AppState, owner_id: Uuid, id: Uuid) -> Result<Content, AppError> {
    load(st, owner_id, id, false).await
}

pub async fn update(
    st: &AppState,
    owner_id: Uuid,
    id: Uuid,
    req: UpdateContentRequest,
) -> Result<Content, AppError> {
    let current = load(st, owner_id, id, true).await?;

    let mut errors = Vec::new();
    let title = req.title.map(|t| t.trim().to_string());
    if matches!(&title, Some(t) if t.is_empty()) {
        errors.push(FieldError::new("title", "title must not be empty"));
    }
    let content_type = match req.content_type {
        None => None,
        Some(raw) => match raw.parse::<ContentType>() {
            Ok(t) => Some(t),
            Err(e) => {
                errors.push(FieldError::new("content_type", &e.to_string()));
                None
            }
        },
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let word_count = req.body.as_deref().map(count_words);
    let metadata = req.metadata.map(|patch| {
        let mut merged = match current.metadata {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        merged.extend(patch);
        Value::Object(merged)
    });

    let updated = st
        .contents
        .update(
            id,
            ContentPatch {
                title,
                content_type,
                body: req.body,
                word_count,
                metadata,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound("Content not found".into()))?;
    info!(content_id = %id, user_id = %owner_id, "content updated");
    Ok(updated)
}

pub async fn delete(st: &AppState, owner_id: Uuid, id: Uuid) -> Result<(), AppError> {
    load(st, owner_id, id, true).await?;
    if !st.contents.delete(id).await? {
        return Err(AppError::NotFound("Content not found".into()));
    }
    info!(content_id = %id, user_id = %owner_id, "content deleted");
    Ok(())
}

// --- stateless agent calls ---

fn resolve_agent(
    st: &AppState,
    preferred: Option<&str>,
) -> Result<(Arc<dyn TextProvider>, ModelChoice), AppError> {
    let choice = parse_choice(preferred).map_err(|e| AppError::Validation(vec![e]))?;
    let provider = st
        .providers
        .resolve(&choice)
        .map_err(|e| AppError::Provider(e.to_string()))?;
    Ok((provider, choice))
}

async fn run_agent(
    st: &AppState,
    preferred: Option<&str>,
    system: String,
    prompt: String,
) -> Result<(Completion, String), AppError> {
    let (provider, choice) = resolve_agent(st, preferred)?;
    let request = completion_request(st, system, prompt, &choice, st.config.providers.max_tokens);
    let completion = provider.complete(&request).await.map_err(|e| {
        warn!(provider = %provider.kind(), error = %e, "agent call failed");
        AppError::Provider(e.to_string())
    })?;
    Ok((completion, provider.kind().as_str().to_string()))
}

fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::field(field, &format!("{field} is required")));
    }
    Ok(())
}

pub async fn refine(st: &AppState, req: RefineRequest) -> Result<RefineResponse, AppError> {
    require_text(&req.content, "content")?;
    let system = format!(
        "You are an editor. Rewrite text in a {} style for a {} audience, keeping its meaning.",
        req.style, req.target_audience
    );
    let prompt = format!(
        "Rewrite the following text. Target length: {}. Return only the rewritten text.\n\n{}",
        req.length, req.content
    );
    let (completion, provider) =
        run_agent(st, req.preferred_model.as_deref(), system, prompt).await?;
    Ok(RefineResponse {
        changes_made: refinement_changes(
            &req.content,
            &completion.text,
            &req.style,
            &req.target_audience,
        ),
        readability_score: readability_score(&completion.text),
        word_count: count_words(&completion.text),
        refined_content: completion.text,
        provider,
        model: completion.model,
    })
}

pub async fn optimize_seo(st: &AppState, req: SeoRequest) -> Result<SeoResponse, AppError> {
    require_text(&req.content, "content")?;
    let keywords: Vec<String> = req
        .keywords
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        return Err(AppError::field("keywords", "at least one keyword is required"));
    }

    let system = "You are an SEO specialist. Improve text for search engines without \
                  keyword stuffing: add a clear title, H2/H3 headings and a meta description."
        .to_string();
    let mut prompt = format!(
        "Target keywords: {}. Aim for a keyword density between {DENSITY_MIN}% and {DENSITY_MAX}%.",
        keywords.join(", ")
    );
    if let Some(url) = req.target_url.as_deref().filter(|u| !u.trim().is_empty()) {
        prompt.push_str(&format!("\nThe page will be published at {url}."));
    }
    prompt.push_str("\nReturn only the optimised text.\n\n");
    prompt.push_str(&req.content);

    let (completion, provider) =
        run_agent(st, req.preferred_model.as_deref(), system, prompt).await?;
    Ok(SeoResponse {
        keyword_density: keyword_density(&completion.text, &keywords),
        seo_score: seo_score(&completion.text, &keywords),
        suggestions: seo_suggestions(&completion.text, &keywords),
        optimized_content: completion.text,
        provider,
        model: completion.model,
    })
}

/// Pull a JSON object out of a reply that may wrap it in a fenced block.
pub fn extract_json_block(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let body = &text[start + 7..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }
    if let Some(start) = text.find("```") {
        let body = &text[start + 3..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text.trim(),
    }
}

#[derive(Debug, Deserialize)]
struct PlagiarismVerdict {
    plagiarism_score: f64,
    #[serde(default)]
    fact_check_results: Vec<FactCheck>,
    #[serde(default)]
    recommendations: Vec<String>,
}

pub async fn check_plagiarism(
    st: &AppState,
    req: PlagiarismRequest,
) -> Result<PlagiarismResponse, AppError> {
    require_text(&req.content, "content")?;
    let system = "You review text for originality and factual accuracy. Reply with JSON only."
        .to_string();
    let facts = if req.check_facts {
        "List each checkable factual claim in fact_check_results with verdict \
         \"supported\", \"disputed\" or \"unverifiable\"."
    } else {
        "Leave fact_check_results empty."
    };
    let prompt = format!(
        "Estimate how likely the text is copied or closely paraphrased from existing sources.\n\
         {facts}\n\
         Reply exactly as: {{\"plagiarism_score\": 0.0-1.0, \"fact_check_results\": \
         [{{\"claim\": \"...\", \"verdict\": \"...\", \"note\": \"...\"}}], \
         \"recommendations\": [\"...\"]}}\n\nText:\n{}",
        req.content
    );

    let (completion, provider) =
        run_agent(st, req.preferred_model.as_deref(), system, prompt).await?;
    let verdict: PlagiarismVerdict = serde_json::from_str(extract_json_block(&completion.text))
        .map_err(|e| AppError::Provider(format!("unreadable plagiarism verdict: {e}")))?;

    let score = if verdict.plagiarism_score.is_finite() {
        verdict.plagiarism_score.clamp(0.0, 1.0)
    } else {
        0.0
    };
    Ok(PlagiarismResponse {
        plagiarism_score: score,
        originality_score: 1.0 - score,
        fact_check_results: if req.check_facts {
            verdict.fact_check_results
        } else {
            Vec::new()
        },
        recommendations: verdict.recommendations,
        provider,
        model: completion.model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{scripted::ScriptedProvider, ProviderKind, ProviderRegistry};

    fn blog_request() -> GenerateRequest {
        GenerateRequest {
            title: Some("Rust at work".into()),
            content_type: Some("blog_post".into()),
            description: Some("Why teams adopt Rust".into()),
            target_audience: Some("engineering managers".into()),
            tone: Some("professional".into()),
            word_count: Some(500),
            keywords: vec!["rust".into(), "  ".into(), "safety".into()],
            preferred_model: None,
        }
    }

    fn state_replying(text: &str) -> (AppState, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider::replying(ProviderKind::OpenAi, text));
        let registry = ProviderRegistry::new(ProviderKind::OpenAi).with(provider.clone());
        (AppState::fake_with(registry), provider)
    }

    #[test]
    fn validate_collects_every_missing_field() {
        let err = validate_generate(GenerateRequest::default()).unwrap_err();
        let AppError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(
            names,
            ["title", "content_type", "description", "target_audience", "tone", "word_count"]
        );
    }

    #[test]
    fn validate_rejects_unknown_type_model_and_range() {
        let mut req = blog_request();
        req.content_type = Some("podcast".into());
        req.word_count = Some(0);
        req.preferred_model = Some("llama".into());
        let AppError::Validation(fields) = validate_generate(req).unwrap_err() else {
            panic!("expected validation error");
        };
        let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, ["content_type", "word_count", "preferred_model"]);
    }

    #[test]
    fn prompt_mentions_every_field() {
        let brief = validate_generate(blog_request()).unwrap();
        assert_eq!(brief.keywords, vec!["rust", "safety"]);
        let (system, prompt) = build_prompt(&brief);
        assert!(system.contains("blog post writer"));
        assert!(system.contains("professional"));
        assert!(prompt.contains("approximately 500 words"));
        assert!(prompt.contains("\"Rust at work\""));
        assert!(prompt.contains("engineering managers"));
        assert!(prompt.contains("rust, safety"));
    }

    #[tokio::test]
    async fn generate_stores_completed_record() {
        let body = "Rust gives teams memory safety without a garbage collector.";
        let (st, provider) = state_replying(body);
        let owner = Uuid::new_v4();

        let content = generate(&st, owner, blog_request()).await.unwrap();
        assert_eq!(content.status, ContentStatus::Completed);
        assert_eq!(content.body, body);
        assert_eq!(content.word_count, count_words(body));
        assert_eq!(content.owner_id, owner);
        assert_eq!(content.metadata["provider"], "openai");
        assert_eq!(content.metadata["tone"], "professional");
        assert_eq!(content.metadata["estimated_reading_time"], 1);

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].max_tokens, 1000);

        let stored = get(&st, owner, content.id).await.unwrap();
        assert_eq!(stored.status, ContentStatus::Completed);
    }

    #[tokio::test]
    async fn generate_stores_follow_up_suggestions() {
        let (st, _) = state_replying("A short note about safety.");
        let content = generate(&st, Uuid::new_v4(), blog_request()).await.unwrap();
        let suggestions: Vec<&str> = content.metadata["suggestions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s.as_str().unwrap())
            .collect();
        assert!(suggestions[0].starts_with("Text is shorter than the requested 500 words"));
        assert!(suggestions.contains(&"Keyword 'rust' does not appear in the text"));
        assert!(!suggestions.iter().any(|s| s.contains("'safety'")));
    }

    #[tokio::test]
    async fn abandoned_generation_leaves_no_record() {
        let provider = Arc::new(ScriptedProvider::hanging(ProviderKind::OpenAi));
        let st = AppState::fake_with(
            ProviderRegistry::new(ProviderKind::OpenAi).with(provider.clone()),
        );
        let owner = Uuid::new_v4();

        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            generate(&st, owner, blog_request()),
        )
        .await;
        assert!(outcome.is_err());
        assert_eq!(provider.seen.lock().unwrap().len(), 1);

        let stored = list(&st, owner, ListQuery { content_type: None, limit: 20, offset: 0 })
            .await
            .unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn generate_records_provider_failure() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderKind::OpenAi, "upstream 503"));
        let st = AppState::fake_with(ProviderRegistry::new(ProviderKind::OpenAi).with(provider));
        let owner = Uuid::new_v4();

        let content = generate(&st, owner, blog_request()).await.unwrap();
        assert_eq!(content.status, ContentStatus::Failed);
        assert_eq!(content.word_count, 0);
        assert!(content.body.is_empty());
        assert!(content.metadata["error"].as_str().unwrap().contains("upstream 503"));
    }

    #[tokio::test]
    async fn generate_with_unconfigured_provider_is_recorded_as_failed() {
        let (st, _) = state_replying("unused");
        let mut req = blog_request();
        req.preferred_model = Some("claude-3-5-haiku-latest".into());
        let content = generate(&st, Uuid::new_v4(), req).await.unwrap();
        assert_eq!(content.status, ContentStatus::Failed);
        assert_eq!(content.metadata["provider"], "anthropic");
        assert!(content.metadata["error"]
            .as_str()
            .unwrap()
            .contains("not configured"));
    }

    #[tokio::test]
    async fn model_override_reaches_provider() {
        let (st, provider) = state_replying("text");
        let mut req = blog_request();
        req.preferred_model = Some("gpt-4o".into());
        let content = generate(&st, Uuid::new_v4(), req).await.unwrap();
        assert_eq!(content.metadata["model"], "gpt-4o");
        assert_eq!(provider.seen.lock().unwrap()[0].model.as_deref(), Some("gpt-4o"));
    }

    #[tokio::test]
    async fn foreign_records_are_hidden_or_refused() {
        let (st, _) = state_replying("owned text");
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let content = generate(&st, alice, blog_request()).await.unwrap();

        assert!(matches!(get(&st, bob, content.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            update(
                &st,
                bob,
                content.id,
                UpdateContentRequest {
                    title: Some("hijacked".into()),
                    ..Default::default()
                }
            )
            .await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(delete(&st, bob, content.id).await, Err(AppError::Forbidden(_))));
        assert!(list(&st, bob, ListQuery { content_type: None, limit: 20, offset: 0 })
            .await
            .unwrap()
            .is_empty());

        let still_there = get(&st, alice, content.id).await.unwrap();
        assert_eq!(still_there.title, "Rust at work");
    }

    #[tokio::test]
    async fn update_recounts_words_and_merges_metadata() {
        let (st, _) = state_replying("one two three");
        let owner = Uuid::new_v4();
        let content = generate(&st, owner, blog_request()).await.unwrap();

        let mut patch = serde_json::Map::new();
        patch.insert("tone".into(), json!("casual"));
        patch.insert("seo_title".into(), json!("Rust!"));
        let updated = update(
            &st,
            owner,
            content.id,
            UpdateContentRequest {
                body: Some("just four words here".into()),
                content_type: Some("article".into()),
                metadata: Some(patch),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.word_count, 4);
        assert_eq!(updated.content_type, ContentType::Article);
        assert_eq!(updated.status, ContentStatus::Completed);
        assert_eq!(updated.metadata["tone"], "casual");
        assert_eq!(updated.metadata["seo_title"], "Rust!");
        assert_eq!(updated.metadata["target_audience"], "engineering managers");
    }

    #[tokio::test]
    async fn update_rejects_blank_title() {
        let (st, _) = state_replying("x");
        let owner = Uuid::new_v4();
        let content = generate(&st, owner, blog_request()).await.unwrap();
        let err = update(
            &st,
            owner,
            content.id,
            UpdateContentRequest {
                title: Some("   ".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn list_filters_by_type() {
        let (st, _) = state_replying("x");
        let owner = Uuid::new_v4();
        generate(&st, owner, blog_request()).await.unwrap();
        let mut email = blog_request();
        email.content_type = Some("email".into());
        generate(&st, owner, email).await.unwrap();

        let all = list(&st, owner, ListQuery { content_type: None, limit: 20, offset: 0 })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        let emails = list(
            &st,
            owner,
            ListQuery {
                content_type: Some("email".into()),
                limit: 20,
                offset: 0,
            },
        )
        .await
        .unwrap();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].content_type, ContentType::Email);

        let bad = list(
            &st,
            owner,
            ListQuery {
                content_type: Some("memo".into()),
                limit: 20,
                offset: 0,
            },
        )
        .await;
        assert!(matches!(bad, Err(AppError::Validation(_))));
    }

    #[test]
    fn extract_json_handles_fenced_and_bare_replies() {
        assert_eq!(extract_json_block("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(extract_json_block("Sure:\n```\n{\"a\":2}\n```"), "{\"a\":2}");
        assert_eq!(extract_json_block("Here you go {\"a\":3} thanks"), "{\"a\":3}");
        assert_eq!(extract_json_block("no json"), "no json");
    }

    #[tokio::test]
    async fn plagiarism_verdict_is_clamped_and_inverted() {
        let reply = r#"```json
{"plagiarism_score": 1.7,
 "fact_check_results": [{"claim": "Rust 1.0 shipped in 2015", "verdict": "supported"}],
 "recommendations": ["Cite sources"]}
```"#;
        let (st, _) = state_replying(reply);
        let resp = check_plagiarism(
            &st,
            PlagiarismRequest {
                content: "Rust 1.0 shipped in 2015.".into(),
                check_facts: true,
                preferred_model: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(resp.plagiarism_score, 1.0);
        assert_eq!(resp.originality_score, 0.0);
        assert_eq!(resp.fact_check_results.len(), 1);
        assert_eq!(resp.recommendations, vec!["Cite sources"]);
        assert_eq!(resp.provider, "openai");
    }

    #[tokio::test]
    async fn unreadable_plagiarism_reply_is_provider_error() {
        let (st, _) = state_replying("I cannot help with that.");
        let err = check_plagiarism(
            &st,
            PlagiarismRequest {
                content: "text".into(),
                check_facts: false,
                preferred_model: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Provider(_)));
    }

    #[tokio::test]
    async fn refine_and_seo_surface_provider_failures() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderKind::OpenAi, "timeout"));
        let st = AppState::fake_with(ProviderRegistry::new(ProviderKind::OpenAi).with(provider));
        let err = refine(
            &st,
            RefineRequest {
                content: "hello".into(),
                style: "casual".into(),
                length: "short".into(),
                target_audience: "general".into(),
                preferred_model: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Provider(ref m) if m.contains("timeout")));

        let err = optimize_seo(
            &st,
            SeoRequest {
                content: "hello".into(),
                keywords: vec![],
                target_url: None,
                preferred_model: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn refine_reports_changes_and_readability() {
        let (st, _) = state_replying("Rust is fast. It is safe.");
        let resp = refine(
            &st,
            RefineRequest {
                content: "Rust, which many teams now use, is a language that is both fast and safe."
                    .into(),
                style: "concise".into(),
                length: "short".into(),
                target_audience: "managers".into(),
                preferred_model: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(resp.changes_made[0], "Rewrote in a concise style for a managers audience");
        assert!(resp
            .changes_made
            .iter()
            .any(|c| c.starts_with("Length changed from 15 to 6 words")));
        assert_eq!(resp.readability_score, readability_score("Rust is fast. It is safe."));
        assert_eq!(resp.word_count, 6);
    }

    #[tokio::test]
    async fn seo_reports_density_of_optimised_text() {
        let (st, provider) = state_replying("# Rust guide\n\nLearn rust today.");
        let resp = optimize_seo(
            &st,
            SeoRequest {
                content: "Learn it today.".into(),
                keywords: vec!["rust".into()],
                target_url: Some("https://example.com/rust".into()),
                preferred_model: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(resp.keyword_density["rust"].count, 2);
        assert_eq!(
            resp.seo_score,
            seo_score("# Rust guide\n\nLearn rust today.", &["rust".to_string()])
        );
        assert!(resp.seo_score < 100.0);
        assert!(resp
            .suggestions
            .iter()
            .any(|s| s.starts_with("Missing meta description")));
        assert!(provider.seen.lock().unwrap()[0]
            .prompt
            .contains("https://example.com/rust"));
    }
}
