use crate::advisory::MoodSample;
use crate::errors::AppError;
use crate::models::{
    CrisisResource, ExternalIdentity, GenerateRequest, NewCommunityPost, NewIntervention,
    NewMoodEntry, NewPostComment, NewUser, UserSummary, UserUpdate, MAX_INTENSITY, MIN_INTENSITY,
    MOOD_LABELS,
};
use crate::state::AppState;
use crate::stats::weekly_summary;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

fn validate_mood(mood: &str, intensity: i32) -> Result<(), AppError> {
    if !MOOD_LABELS.contains(&mood) {
        return Err(AppError::bad_request(format!(
            "mood must be one of: {}",
            MOOD_LABELS.join(", ")
        )));
    }
    if !(MIN_INTENSITY..=MAX_INTENSITY).contains(&intensity) {
        return Err(AppError::bad_request(format!(
            "intensity must be between {MIN_INTENSITY} and {MAX_INTENSITY}"
        )));
    }
    Ok(())
}

// User routes.

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> Result<Json<Value>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }
    let user = state.store.create_user(payload).await?;
    Ok(Json(json!({ "user": UserSummary::from(&user) })))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let user = state
        .store
        .user(id)
        .await
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(json!({ "user": UserSummary::from(&user) })))
}

pub async fn create_guest(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let (name, password) = {
        let mut rng = rand::thread_rng();
        let name = format!("Guest{}", rng.gen_range(0..100_000));
        let password: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        (name, password)
    };

    let user = state
        .store
        .create_user(NewUser {
            name: name.clone(),
            username: Some(name),
            email: None,
            password: Some(password),
            external_id: None,
            is_guest: true,
        })
        .await?;
    Ok(Json(json!({ "user": UserSummary::from(&user) })))
}

/// Upsert against an externally authenticated identity: create on first
/// sight, otherwise link the external id if it was never recorded.
pub async fn sync_external_user(
    State(state): State<AppState>,
    Json(payload): Json<ExternalIdentity>,
) -> Result<Json<Value>, AppError> {
    if payload.external_id.trim().is_empty() {
        return Err(AppError::bad_request("missing externalId"));
    }

    let existing = match payload.email.as_deref() {
        Some(email) => state.store.user_by_email(email).await,
        None => None,
    };

    let user = match existing {
        Some(user) if user.external_id.is_none() => state
            .store
            .update_user(
                user.id,
                UserUpdate {
                    external_id: Some(payload.external_id),
                    ..UserUpdate::default()
                },
            )
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?,
        Some(user) => user,
        None => {
            let trimmed = payload.name.as_deref().unwrap_or("").trim().to_string();
            let name = if !trimmed.is_empty() {
                trimmed
            } else if let Some(email) = payload.email.as_deref() {
                email.split('@').next().unwrap_or("Member").to_string()
            } else {
                "Member".to_string()
            };
            let email = payload
                .email
                .clone()
                .unwrap_or_else(|| format!("external_{}@example.com", payload.external_id));
            state
                .store
                .create_user(NewUser {
                    name: name.clone(),
                    username: Some(name),
                    email: Some(email),
                    password: None,
                    external_id: Some(payload.external_id),
                    is_guest: false,
                })
                .await?
        }
    };

    Ok(Json(json!({ "user": UserSummary::from(&user) })))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UserUpdate>,
) -> Result<Json<Value>, AppError> {
    // Password changes must prove knowledge of the old one.
    if payload.password.is_some() {
        let user = state
            .store
            .user(id)
            .await
            .ok_or_else(|| AppError::not_found("User not found"))?;
        if let Some(current) = user.password.as_deref() {
            if payload.old_password.as_deref() != Some(current) {
                return Err(AppError::bad_request("Old password is incorrect"));
            }
        }
    }

    let user = state
        .store
        .update_user(id, payload)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(json!({ "user": UserSummary::from(&user) })))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    info!("deleting user {id} and all owned data");
    state.store.delete_user_and_data(id).await?;
    if state.store.user(id).await.is_some() {
        return Err(AppError::internal("user was not deleted"));
    }
    Ok(Json(json!({ "success": true })))
}

// Mood tracking routes.

pub async fn create_mood_entry(
    State(state): State<AppState>,
    Json(payload): Json<NewMoodEntry>,
) -> Result<Json<Value>, AppError> {
    validate_mood(&payload.mood, payload.intensity)?;
    let user_id = payload.user_id;
    let mood = payload.mood.clone();
    let intensity = payload.intensity;

    let entry = state.store.create_mood_entry(payload).await?;

    // Bundle a recommendation into the response when we know the user.
    let response = match state.store.user(user_id).await {
        Some(user) => {
            let recent: Vec<String> = state
                .store
                .user_mood_entries(user_id, 5)
                .await
                .into_iter()
                .map(|e| e.mood)
                .collect();
            let recommendation = state
                .advisory
                .generate_intervention(&mood, intensity, &recent, &user.name)
                .await;
            json!({ "moodEntry": entry, "recommendation": recommendation })
        }
        None => json!({ "moodEntry": entry }),
    };
    Ok(Json(response))
}

pub async fn list_mood_entries(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let entries = state.store.user_mood_entries(user_id, 30).await;
    Ok(Json(json!({ "entries": entries })))
}

pub async fn weekly_mood_entries(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let entries = state.store.weekly_mood_entries(user_id).await;
    let summary = weekly_summary(&entries);
    Ok(Json(json!({ "entries": entries, "summary": summary })))
}

// Intervention routes.

pub async fn create_intervention(
    State(state): State<AppState>,
    Json(payload): Json<NewIntervention>,
) -> Result<Json<Value>, AppError> {
    if payload.duration <= 0 {
        return Err(AppError::bad_request("duration must be positive"));
    }
    let intervention = state.store.create_intervention(payload).await?;
    Ok(Json(json!({ "intervention": intervention })))
}

pub async fn list_interventions(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let interventions = state.store.user_interventions(user_id).await;
    Ok(Json(json!({ "interventions": interventions })))
}

pub async fn complete_intervention(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let intervention = state
        .store
        .complete_intervention(id)
        .await?
        .ok_or_else(|| AppError::not_found("Intervention not found"))?;
    Ok(Json(json!({ "intervention": intervention })))
}

pub async fn generate_intervention(
    State(state): State<AppState>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<Value>, AppError> {
    validate_mood(&payload.mood, payload.intensity)?;
    let user = state
        .store
        .user(payload.user_id)
        .await
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let recent: Vec<String> = state
        .store
        .user_mood_entries(payload.user_id, 5)
        .await
        .into_iter()
        .map(|e| e.mood)
        .collect();
    let plan = state
        .advisory
        .generate_intervention(&payload.mood, payload.intensity, &recent, &user.name)
        .await;
    Ok(Json(json!({ "intervention": plan })))
}

pub async fn generate_cbt_prompt(
    State(state): State<AppState>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<Value>, AppError> {
    validate_mood(&payload.mood, payload.intensity)?;
    let user = state
        .store
        .user(payload.user_id)
        .await
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let prompt = state
        .advisory
        .generate_cbt_prompt(&payload.mood, payload.intensity, &user.name)
        .await;
    Ok(Json(json!({ "prompt": prompt })))
}

// Progress routes.

pub async fn get_progress(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let progress = state
        .store
        .progress(user_id)
        .await
        .ok_or_else(|| AppError::not_found("Progress not found"))?;

    let history: Vec<MoodSample> = state
        .store
        .user_mood_entries(user_id, 30)
        .await
        .into_iter()
        .map(|e| MoodSample {
            mood: e.mood,
            intensity: e.intensity,
            recorded_at: e.created_at,
        })
        .collect();
    let insights = state.advisory.analyze_mood_pattern(&history).await;

    Ok(Json(json!({ "progress": progress, "insights": insights })))
}

pub async fn increment_streak(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    state
        .store
        .increment_streak(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Progress not found"))?;
    Ok(Json(json!({ "success": true })))
}

// Community routes.

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<usize>,
}

pub async fn create_post(
    State(state): State<AppState>,
    Json(payload): Json<NewCommunityPost>,
) -> Result<Json<Value>, AppError> {
    if payload.content.trim().is_empty() {
        return Err(AppError::bad_request("content must not be empty"));
    }

    // Moderate before anything is persisted.
    let verdict = state.advisory.moderate(&payload.content).await;
    if !verdict.safe {
        return Err(AppError::moderation(verdict.reason));
    }

    let post = state.store.create_post(payload).await?;
    Ok(Json(json!({ "post": post })))
}

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Value>, AppError> {
    let posts = state.store.community_posts(query.limit.unwrap_or(10)).await;
    Ok(Json(json!({ "posts": posts })))
}

pub async fn like_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let post = state
        .store
        .like_post(id)
        .await?
        .ok_or_else(|| AppError::not_found("Post not found"))?;
    Ok(Json(json!({ "success": true, "post": post })))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Json(payload): Json<NewPostComment>,
) -> Result<Json<Value>, AppError> {
    if payload.content.trim().is_empty() {
        return Err(AppError::bad_request("content must not be empty"));
    }

    let verdict = state.advisory.moderate(&payload.content).await;
    if !verdict.safe {
        return Err(AppError::moderation(verdict.reason));
    }

    let comment = state
        .store
        .create_comment(post_id, payload)
        .await?
        .ok_or_else(|| AppError::not_found("Post not found"))?;
    Ok(Json(json!({ "comment": comment })))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let comments = state.store.post_comments(post_id).await;
    Ok(Json(json!({ "comments": comments })))
}

// Crisis resources: static, no storage or advisory involvement.

const CRISIS_RESOURCES: [CrisisResource; 3] = [
    CrisisResource {
        name: "National Suicide Prevention Lifeline",
        phone: Some("988"),
        text: Some("Text HOME to 741741"),
        available: "24/7",
        description: "Free and confidential support for people in distress",
    },
    CrisisResource {
        name: "Crisis Text Line",
        phone: None,
        text: Some("Text HELLO to 741741"),
        available: "24/7",
        description: "Free, 24/7 support for those in crisis",
    },
    CrisisResource {
        name: "SAMHSA National Helpline",
        phone: Some("1-800-662-4357"),
        text: None,
        available: "24/7",
        description: "Treatment referral and information service",
    },
];

pub async fn crisis_resources() -> Json<Value> {
    Json(json!({ "resources": CRISIS_RESOURCES }))
}
