use crate::config::AdvisoryConfig;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Timelike, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionPlan {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub content: String,
    /// Minutes.
    pub duration: i32,
    pub instructions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CbtPrompt {
    pub question: String,
    pub follow_up: String,
    pub reframing_technique: String,
}

#[derive(Debug, Clone)]
pub struct MoodSample {
    pub mood: String,
    pub intensity: i32,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodInsight {
    pub pattern: String,
    pub recommendation: String,
    /// Always within [0, 1].
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationVerdict {
    pub safe: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Failures stay inside this module; every public operation substitutes a
/// constant fallback instead of surfacing one of these.
#[derive(Debug, Error)]
enum AdvisoryError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("api error: {0}")]
    Api(String),

    #[error("empty completion")]
    Empty,
}

/// Capability seam for the generative-text integration. Production uses
/// [`GeminiClient`]; tests can inject a deterministic implementation.
#[async_trait]
pub trait AdvisoryProvider: Send + Sync {
    async fn generate_intervention(
        &self,
        mood: &str,
        intensity: i32,
        recent_moods: &[String],
        user_name: &str,
    ) -> InterventionPlan;

    async fn generate_cbt_prompt(&self, mood: &str, intensity: i32, user_name: &str) -> CbtPrompt;

    async fn analyze_mood_pattern(&self, history: &[MoodSample]) -> MoodInsight;

    async fn moderate(&self, content: &str) -> ModerationVerdict;
}

pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &AdvisoryConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .expect("failed to build advisory HTTP client");
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// One JSON-mode completion round trip: send the prompt, pull the text
    /// out of the first candidate, parse it as JSON.
    async fn complete_json(
        &self,
        prompt: String,
        system: &str,
        temperature: f64,
    ) -> Result<Value, AdvisoryError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "systemInstruction": { "parts": [{ "text": system }] },
            "generationConfig": {
                "temperature": temperature,
                "responseMimeType": "application/json",
            },
        });

        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AdvisoryError::Api(format!("{status}: {text}")));
        }

        let envelope: Value = response.json().await?;
        let text = envelope["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or(AdvisoryError::Empty)?;
        Ok(serde_json::from_str(text)?)
    }

    async fn try_generate_intervention(
        &self,
        mood: &str,
        intensity: i32,
        recent_moods: &[String],
        user_name: &str,
    ) -> Result<InterventionPlan, AdvisoryError> {
        let prompt = format!(
            "Create a personalized 2-5 minute micro-intervention for {user_name}, \
             who is feeling {mood} at intensity {intensity}/5. Recent moods: {}. \
             Use an evidence-based technique (breathing, CBT, mindfulness, grounding) \
             and keep the tone supportive. Respond with JSON: \
             {{\"type\": \"breathing|cbt|meditation|grounding\", \"title\": \"...\", \
             \"content\": \"...\", \"duration\": minutes, \"instructions\": [\"...\"]}}",
            recent_moods.join(", "),
        );
        let value = self
            .complete_json(prompt, INTERVENTION_SYSTEM, 0.7)
            .await?;
        Ok(parse_intervention(&value))
    }

    async fn try_generate_cbt_prompt(
        &self,
        mood: &str,
        intensity: i32,
        user_name: &str,
    ) -> Result<CbtPrompt, AdvisoryError> {
        let prompt = format!(
            "Create a gentle CBT thought-examination prompt for {user_name}, \
             feeling {mood} at intensity {intensity}/5. Respond with JSON: \
             {{\"question\": \"...\", \"followUp\": \"...\", \"reframingTechnique\": \"...\"}}",
        );
        let value = self.complete_json(prompt, CBT_SYSTEM, 0.7).await?;
        Ok(parse_cbt_prompt(&value))
    }

    async fn try_analyze_mood_pattern(
        &self,
        history: &[MoodSample],
    ) -> Result<MoodInsight, AdvisoryError> {
        let samples: Vec<Value> = history
            .iter()
            .map(|s| {
                json!({
                    "mood": s.mood,
                    "intensity": s.intensity,
                    "dayOfWeek": s.recorded_at.weekday().num_days_from_sunday(),
                    "hour": s.recorded_at.hour(),
                })
            })
            .collect();
        let prompt = format!(
            "Analyze this mood history for patterns, trends and intensity shifts, \
             then give one actionable recommendation: {}. Respond with JSON: \
             {{\"pattern\": \"...\", \"recommendation\": \"...\", \
             \"confidence\": number_between_0_and_1}}",
            serde_json::to_string(&samples)?,
        );
        let value = self.complete_json(prompt, INSIGHT_SYSTEM, 0.3).await?;
        Ok(parse_insight(&value))
    }

    async fn try_moderate(&self, content: &str) -> Result<ModerationVerdict, AdvisoryError> {
        let prompt = format!(
            "Moderate this content for a mental-health support community: \"{content}\". \
             Flag self-harm or suicide ideation, harassment, and harmful content; \
             allow supportive content. Respond with JSON: \
             {{\"safe\": true/false, \"reason\": \"explanation if not safe\"}}",
        );
        let value = self.complete_json(prompt, MODERATION_SYSTEM, 0.1).await?;
        Ok(parse_verdict(&value))
    }
}

#[async_trait]
impl AdvisoryProvider for GeminiClient {
    async fn generate_intervention(
        &self,
        mood: &str,
        intensity: i32,
        recent_moods: &[String],
        user_name: &str,
    ) -> InterventionPlan {
        match self
            .try_generate_intervention(mood, intensity, recent_moods, user_name)
            .await
        {
            Ok(plan) => plan,
            Err(err) => {
                warn!("intervention generation failed, using fallback: {err}");
                fallback_intervention()
            }
        }
    }

    async fn generate_cbt_prompt(&self, mood: &str, intensity: i32, user_name: &str) -> CbtPrompt {
        match self.try_generate_cbt_prompt(mood, intensity, user_name).await {
            Ok(prompt) => prompt,
            Err(err) => {
                warn!("cbt prompt generation failed, using fallback: {err}");
                fallback_cbt_prompt()
            }
        }
    }

    async fn analyze_mood_pattern(&self, history: &[MoodSample]) -> MoodInsight {
        match self.try_analyze_mood_pattern(history).await {
            Ok(insight) => insight,
            Err(err) => {
                warn!("mood pattern analysis failed, using fallback: {err}");
                fallback_insight()
            }
        }
    }

    /// Moderation is fail-open: when the provider is unreachable the
    /// verdict is safe, so an outage never blocks posting.
    async fn moderate(&self, content: &str) -> ModerationVerdict {
        match self.try_moderate(content).await {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!("moderation failed, allowing content: {err}");
                ModerationVerdict {
                    safe: true,
                    reason: None,
                }
            }
        }
    }
}

const INTERVENTION_SYSTEM: &str = "You create personalized, evidence-based \
    micro-interventions for a mental-wellness app. Prioritize safety and keep \
    guidance gentle and immediately actionable.";

const CBT_SYSTEM: &str = "You create gentle, CBT-informed thought-examination \
    exercises. Be supportive and non-judgmental.";

const INSIGHT_SYSTEM: &str = "You identify patterns in mood-tracking data and \
    offer evidence-based recommendations.";

const MODERATION_SYSTEM: &str = "You moderate content for a mental-health \
    support community. Flag self-harm, suicide ideation, harassment, and \
    harmful content; allow supportive content.";

fn string_or(value: &Value, key: &str, default: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn parse_intervention(value: &Value) -> InterventionPlan {
    let instructions: Vec<String> = value
        .get("instructions")
        .and_then(Value::as_array)
        .map(|steps| {
            steps
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    InterventionPlan {
        kind: string_or(value, "type", "breathing"),
        title: string_or(value, "title", "Take a Moment"),
        content: string_or(
            value,
            "content",
            "Take a few deep breaths and be gentle with yourself.",
        ),
        duration: value
            .get("duration")
            .and_then(Value::as_i64)
            .map(|d| d as i32)
            .unwrap_or(3),
        instructions: if instructions.is_empty() {
            vec![
                "Breathe slowly".to_string(),
                "Focus on the present".to_string(),
                "Be kind to yourself".to_string(),
            ]
        } else {
            instructions
        },
    }
}

fn parse_cbt_prompt(value: &Value) -> CbtPrompt {
    CbtPrompt {
        question: string_or(
            value,
            "question",
            "What's one thought that's been on your mind today?",
        ),
        follow_up: string_or(
            value,
            "followUp",
            "What evidence do you have for and against this thought?",
        ),
        reframing_technique: string_or(
            value,
            "reframingTechnique",
            "Try viewing this situation from a friend's perspective.",
        ),
    }
}

fn parse_insight(value: &Value) -> MoodInsight {
    let confidence = value
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(0.7);
    MoodInsight {
        pattern: string_or(
            value,
            "pattern",
            "Your mood shows natural variation through the week",
        ),
        recommendation: string_or(
            value,
            "recommendation",
            "Keep up regular check-ins to sharpen these insights",
        ),
        confidence: confidence.clamp(0.0, 1.0),
    }
}

fn parse_verdict(value: &Value) -> ModerationVerdict {
    // Only an explicit false blocks the content.
    let safe = value.get("safe").and_then(Value::as_bool).unwrap_or(true);
    ModerationVerdict {
        safe,
        reason: value
            .get("reason")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

pub fn fallback_intervention() -> InterventionPlan {
    InterventionPlan {
        kind: "breathing".to_string(),
        title: "Gentle Breathing".to_string(),
        content: "Let's take a moment to breathe together. Find a comfortable \
                  position and follow along with this simple breathing exercise."
            .to_string(),
        duration: 3,
        instructions: vec![
            "Breathe in slowly for 4 counts".to_string(),
            "Hold your breath for 4 counts".to_string(),
            "Exhale slowly for 6 counts".to_string(),
            "Repeat this cycle 5 times".to_string(),
        ],
    }
}

pub fn fallback_cbt_prompt() -> CbtPrompt {
    CbtPrompt {
        question: "What's one thought that's been weighing on you today?".to_string(),
        follow_up: "Is this thought helpful or unhelpful right now?".to_string(),
        reframing_technique: "What would you tell a good friend who had this same thought?"
            .to_string(),
    }
}

pub fn fallback_insight() -> MoodInsight {
    MoodInsight {
        pattern: "Building your mood history to identify patterns".to_string(),
        recommendation: "Keep tracking your daily moods to gain insights over time".to_string(),
        confidence: 0.5,
    }
}
