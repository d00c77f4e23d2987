use crate::errors::AppError;
use crate::stats::weekly_summary_at;
use crate::models::{
    AppData, CommunityPost, Intervention, MoodEntry, NewCommunityPost, NewIntervention,
    NewMoodEntry, NewPostComment, NewUser, PostComment, User, UserProgress, UserUpdate,
};
use chrono::{DateTime, Duration, Utc};
use std::{path::Path, path::PathBuf, sync::Arc};
use tokio::{fs, sync::Mutex};
use tracing::error;

pub async fn load_data(path: &Path) -> AppData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse data file: {err}");
                AppData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => AppData::default(),
        Err(err) => {
            error!("failed to read data file: {err}");
            AppData::default()
        }
    }
}

async fn persist_data(path: &Path, data: &AppData) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(data).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(AppError::internal)?;
    Ok(())
}

// Child rows must reference an existing user; the relational original
// enforces this with foreign keys, and a violation there surfaced as a
// 400 from the create routes.
fn require_user(data: &AppData, user_id: i64) -> Result<(), AppError> {
    if data.users.contains_key(&user_id) {
        Ok(())
    } else {
        Err(AppError::bad_request("user does not exist"))
    }
}

/// All reads and writes go through one lock, so multi-row operations
/// (cascade delete, counter side effects) are atomic with respect to
/// other requests, and counter increments cannot lose updates.
#[derive(Clone)]
pub struct Store {
    path: PathBuf,
    data: Arc<Mutex<AppData>>,
}

impl Store {
    pub fn new(path: PathBuf, data: AppData) -> Self {
        Self {
            path,
            data: Arc::new(Mutex::new(data)),
        }
    }

    // User operations.

    pub async fn create_user(&self, new: NewUser) -> Result<User, AppError> {
        let mut data = self.data.lock().await;

        if let Some(email) = new.email.as_deref() {
            if data.users.values().any(|u| u.email.as_deref() == Some(email)) {
                return Err(AppError::bad_request("email already in use"));
            }
        }
        if let Some(username) = new.username.as_deref() {
            if data
                .users
                .values()
                .any(|u| u.username.as_deref() == Some(username))
            {
                return Err(AppError::bad_request("username already in use"));
            }
        }

        let now = Utc::now();
        let user_id = data.allocate_id();
        let user = User {
            id: user_id,
            name: new.name,
            username: new.username,
            email: new.email,
            password: new.password,
            external_id: new.external_id,
            is_guest: new.is_guest,
            onboarding_completed: false,
            created_at: now,
        };
        data.users.insert(user_id, user.clone());

        // Every user gets exactly one progress row.
        let progress_id = data.allocate_id();
        data.user_progress.insert(
            progress_id,
            UserProgress {
                id: progress_id,
                user_id,
                streak: 0,
                total_interventions: 0,
                last_check_in: None,
                weekly_mood_data: serde_json::json!({}),
                created_at: now,
                updated_at: now,
            },
        );

        persist_data(&self.path, &data).await?;
        Ok(user)
    }

    pub async fn user(&self, id: i64) -> Option<User> {
        self.data.lock().await.users.get(&id).cloned()
    }

    pub async fn user_by_email(&self, email: &str) -> Option<User> {
        self.data
            .lock()
            .await
            .users
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned()
    }

    pub async fn update_user(&self, id: i64, updates: UserUpdate) -> Result<Option<User>, AppError> {
        let mut data = self.data.lock().await;

        if let Some(email) = updates.email.as_deref() {
            if data
                .users
                .values()
                .any(|u| u.id != id && u.email.as_deref() == Some(email))
            {
                return Err(AppError::bad_request("email already in use"));
            }
        }
        if let Some(username) = updates.username.as_deref() {
            if data
                .users
                .values()
                .any(|u| u.id != id && u.username.as_deref() == Some(username))
            {
                return Err(AppError::bad_request("username already in use"));
            }
        }

        let Some(user) = data.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = updates.name {
            user.name = name;
        }
        if let Some(username) = updates.username {
            user.username = Some(username);
        }
        if let Some(email) = updates.email {
            user.email = Some(email);
        }
        if let Some(password) = updates.password {
            user.password = Some(password);
        }
        if let Some(external_id) = updates.external_id {
            user.external_id = Some(external_id);
        }
        if let Some(done) = updates.onboarding_completed {
            user.onboarding_completed = done;
        }
        let updated = user.clone();

        persist_data(&self.path, &data).await?;
        Ok(Some(updated))
    }

    /// Removes the user and every row that references them, in one locked
    /// step: comments, posts, mood entries, interventions, progress, user.
    pub async fn delete_user_and_data(&self, id: i64) -> Result<(), AppError> {
        let mut data = self.data.lock().await;

        data.post_comments.retain(|_, c| c.user_id != id);
        let removed_posts: Vec<i64> = data
            .community_posts
            .values()
            .filter(|p| p.user_id == id)
            .map(|p| p.id)
            .collect();
        data.community_posts.retain(|_, p| p.user_id != id);
        data.post_comments
            .retain(|_, c| !removed_posts.contains(&c.post_id));
        data.mood_entries.retain(|_, e| e.user_id != id);
        data.interventions.retain(|_, i| i.user_id != id);
        data.user_progress.retain(|_, p| p.user_id != id);
        data.users.remove(&id);

        persist_data(&self.path, &data).await?;
        Ok(())
    }

    // Mood tracking operations.

    pub async fn create_mood_entry(&self, new: NewMoodEntry) -> Result<MoodEntry, AppError> {
        let mut data = self.data.lock().await;
        require_user(&data, new.user_id)?;
        let now = Utc::now();
        let id = data.allocate_id();
        let entry = MoodEntry {
            id,
            user_id: new.user_id,
            mood: new.mood,
            intensity: new.intensity,
            note: new.note,
            created_at: now,
        };
        data.mood_entries.insert(id, entry.clone());

        // Check-in stamps the progress row and refreshes the stored
        // weekly snapshot.
        let cutoff = now - Duration::days(7);
        let recent: Vec<MoodEntry> = data
            .mood_entries
            .values()
            .filter(|e| e.user_id == entry.user_id && e.created_at >= cutoff)
            .cloned()
            .collect();
        let snapshot = serde_json::to_value(weekly_summary_at(now.date_naive(), &recent))
            .map_err(AppError::internal)?;
        if let Some(progress) = data
            .user_progress
            .values_mut()
            .find(|p| p.user_id == entry.user_id)
        {
            progress.last_check_in = Some(now);
            progress.weekly_mood_data = snapshot;
            progress.updated_at = now;
        }

        persist_data(&self.path, &data).await?;
        Ok(entry)
    }

    pub async fn user_mood_entries(&self, user_id: i64, limit: usize) -> Vec<MoodEntry> {
        let data = self.data.lock().await;
        let mut entries: Vec<MoodEntry> = data
            .mood_entries
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit);
        entries
    }

    pub async fn weekly_mood_entries(&self, user_id: i64) -> Vec<MoodEntry> {
        self.weekly_mood_entries_at(user_id, Utc::now()).await
    }

    /// Entries from the trailing 7 days, newest first. The boundary is
    /// inclusive: an entry exactly 7x24h old is still returned.
    pub async fn weekly_mood_entries_at(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Vec<MoodEntry> {
        let cutoff = now - Duration::days(7);
        let data = self.data.lock().await;
        let mut entries: Vec<MoodEntry> = data
            .mood_entries
            .values()
            .filter(|e| e.user_id == user_id && e.created_at >= cutoff)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
    }

    // Intervention operations.

    pub async fn create_intervention(&self, new: NewIntervention) -> Result<Intervention, AppError> {
        let mut data = self.data.lock().await;
        require_user(&data, new.user_id)?;
        let id = data.allocate_id();
        let intervention = Intervention {
            id,
            user_id: new.user_id,
            kind: new.kind,
            title: new.title,
            content: new.content,
            duration: new.duration,
            completed: false,
            completed_at: None,
            created_at: Utc::now(),
        };
        data.interventions.insert(id, intervention.clone());
        persist_data(&self.path, &data).await?;
        Ok(intervention)
    }

    pub async fn user_interventions(&self, user_id: i64) -> Vec<Intervention> {
        let data = self.data.lock().await;
        let mut interventions: Vec<Intervention> = data
            .interventions
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        interventions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        interventions
    }

    /// Marks the intervention completed and bumps the user's
    /// totalInterventions. Completing an already-completed intervention is
    /// a no-op; the counter moves by exactly one per intervention.
    pub async fn complete_intervention(
        &self,
        id: i64,
    ) -> Result<Option<Intervention>, AppError> {
        let mut data = self.data.lock().await;
        let now = Utc::now();

        let Some(intervention) = data.interventions.get_mut(&id) else {
            return Ok(None);
        };
        if intervention.completed {
            return Ok(Some(intervention.clone()));
        }
        intervention.completed = true;
        intervention.completed_at = Some(now);
        let completed = intervention.clone();

        if let Some(progress) = data
            .user_progress
            .values_mut()
            .find(|p| p.user_id == completed.user_id)
        {
            progress.total_interventions += 1;
            progress.updated_at = now;
        }

        persist_data(&self.path, &data).await?;
        Ok(Some(completed))
    }

    // Community operations.

    pub async fn create_post(&self, new: NewCommunityPost) -> Result<CommunityPost, AppError> {
        let mut data = self.data.lock().await;
        require_user(&data, new.user_id)?;
        let id = data.allocate_id();
        let post = CommunityPost {
            id,
            user_id: new.user_id,
            content: new.content,
            anonymous: new.anonymous,
            likes: 0,
            flagged: false,
            created_at: Utc::now(),
        };
        data.community_posts.insert(id, post.clone());
        persist_data(&self.path, &data).await?;
        Ok(post)
    }

    /// Unflagged posts, newest first.
    pub async fn community_posts(&self, limit: usize) -> Vec<CommunityPost> {
        let data = self.data.lock().await;
        let mut posts: Vec<CommunityPost> = data
            .community_posts
            .values()
            .filter(|p| !p.flagged)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts.truncate(limit);
        posts
    }

    pub async fn like_post(&self, id: i64) -> Result<Option<CommunityPost>, AppError> {
        let mut data = self.data.lock().await;
        let Some(post) = data.community_posts.get_mut(&id) else {
            return Ok(None);
        };
        post.likes += 1;
        let updated = post.clone();
        persist_data(&self.path, &data).await?;
        Ok(Some(updated))
    }

    pub async fn create_comment(
        &self,
        post_id: i64,
        new: NewPostComment,
    ) -> Result<Option<PostComment>, AppError> {
        let mut data = self.data.lock().await;
        require_user(&data, new.user_id)?;
        if !data.community_posts.contains_key(&post_id) {
            return Ok(None);
        }
        let id = data.allocate_id();
        let comment = PostComment {
            id,
            post_id,
            user_id: new.user_id,
            content: new.content,
            anonymous: new.anonymous,
            created_at: Utc::now(),
        };
        data.post_comments.insert(id, comment.clone());
        persist_data(&self.path, &data).await?;
        Ok(Some(comment))
    }

    pub async fn post_comments(&self, post_id: i64) -> Vec<PostComment> {
        let data = self.data.lock().await;
        let mut comments: Vec<PostComment> = data
            .post_comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        comments
    }

    // Progress operations.

    pub async fn progress(&self, user_id: i64) -> Option<UserProgress> {
        self.data
            .lock()
            .await
            .user_progress
            .values()
            .find(|p| p.user_id == user_id)
            .cloned()
    }

    pub async fn update_progress(
        &self,
        user_id: i64,
        weekly_mood_data: serde_json::Value,
    ) -> Result<Option<UserProgress>, AppError> {
        let mut data = self.data.lock().await;
        let Some(progress) = data
            .user_progress
            .values_mut()
            .find(|p| p.user_id == user_id)
        else {
            return Ok(None);
        };
        progress.weekly_mood_data = weekly_mood_data;
        progress.updated_at = Utc::now();
        let updated = progress.clone();
        persist_data(&self.path, &data).await?;
        Ok(Some(updated))
    }

    pub async fn increment_streak(&self, user_id: i64) -> Result<Option<UserProgress>, AppError> {
        let mut data = self.data.lock().await;
        let Some(progress) = data
            .user_progress
            .values_mut()
            .find(|p| p.user_id == user_id)
        else {
            return Ok(None);
        };
        progress.streak += 1;
        progress.updated_at = Utc::now();
        let updated = progress.clone();
        persist_data(&self.path, &data).await?;
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewCommunityPost, NewIntervention, NewMoodEntry, NewUser};

    fn temp_store() -> Store {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!(
            "wellness_store_{}_{}.json",
            std::process::id(),
            nanos
        ));
        Store::new(path, AppData::default())
    }

    fn new_user(name: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            username: None,
            email: None,
            password: None,
            external_id: None,
            is_guest: false,
        }
    }

    #[tokio::test]
    async fn creating_user_creates_one_progress_row() {
        let store = temp_store();
        let user = store.create_user(new_user("Ada")).await.unwrap();

        let progress = store.progress(user.id).await.expect("missing progress");
        assert_eq!(progress.streak, 0);
        assert_eq!(progress.total_interventions, 0);
        assert!(progress.last_check_in.is_none());

        let count = store
            .data
            .lock()
            .await
            .user_progress
            .values()
            .filter(|p| p.user_id == user.id)
            .count();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = temp_store();
        let mut first = new_user("Ada");
        first.email = Some("ada@example.com".to_string());
        store.create_user(first).await.unwrap();

        let mut second = new_user("Grace");
        second.email = Some("ada@example.com".to_string());
        let err = store.create_user(second).await.unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn mood_entry_stamps_last_check_in() {
        let store = temp_store();
        let user = store.create_user(new_user("Ada")).await.unwrap();

        store
            .create_mood_entry(NewMoodEntry {
                user_id: user.id,
                mood: "calm".to_string(),
                intensity: 2,
                note: None,
            })
            .await
            .unwrap();

        let progress = store.progress(user.id).await.unwrap();
        assert!(progress.last_check_in.is_some());
    }

    #[tokio::test]
    async fn weekly_window_includes_exact_seven_day_boundary() {
        let store = temp_store();
        let user = store.create_user(new_user("Ada")).await.unwrap();
        let now = Utc::now();

        {
            let mut data = store.data.lock().await;
            for (offset_hours, mood) in [(0i64, "joy"), (7 * 24, "calm"), (7 * 24 + 1, "neutral")] {
                let id = data.allocate_id();
                data.mood_entries.insert(
                    id,
                    MoodEntry {
                        id,
                        user_id: user.id,
                        mood: mood.to_string(),
                        intensity: 3,
                        note: None,
                        created_at: now - Duration::hours(offset_hours),
                    },
                );
            }
        }

        let entries = store.weekly_mood_entries_at(user.id, now).await;
        let moods: Vec<&str> = entries.iter().map(|e| e.mood.as_str()).collect();
        assert!(moods.contains(&"joy"));
        assert!(moods.contains(&"calm"), "exactly-7-day entry must be included");
        assert!(!moods.contains(&"neutral"));
    }

    #[tokio::test]
    async fn completing_intervention_is_idempotent() {
        let store = temp_store();
        let user = store.create_user(new_user("Ada")).await.unwrap();
        let intervention = store
            .create_intervention(NewIntervention {
                user_id: user.id,
                kind: "breathing".to_string(),
                title: "Box breathing".to_string(),
                content: "Breathe in a square".to_string(),
                duration: 3,
            })
            .await
            .unwrap();

        let first = store
            .complete_intervention(intervention.id)
            .await
            .unwrap()
            .unwrap();
        assert!(first.completed);
        assert!(first.completed_at.is_some());

        store
            .complete_intervention(intervention.id)
            .await
            .unwrap()
            .unwrap();

        let progress = store.progress(user.id).await.unwrap();
        assert_eq!(progress.total_interventions, 1);
    }

    #[tokio::test]
    async fn delete_user_removes_all_owned_rows() {
        let store = temp_store();
        let user = store.create_user(new_user("Ada")).await.unwrap();
        store
            .create_mood_entry(NewMoodEntry {
                user_id: user.id,
                mood: "stressed".to_string(),
                intensity: 4,
                note: Some("deadline".to_string()),
            })
            .await
            .unwrap();
        let post = store
            .create_post(NewCommunityPost {
                user_id: user.id,
                content: "one day at a time".to_string(),
                anonymous: true,
            })
            .await
            .unwrap();
        store
            .create_comment(
                post.id,
                NewPostComment {
                    user_id: user.id,
                    content: "keep going".to_string(),
                    anonymous: true,
                },
            )
            .await
            .unwrap();

        store.delete_user_and_data(user.id).await.unwrap();

        assert!(store.user(user.id).await.is_none());
        assert!(store.progress(user.id).await.is_none());
        assert!(store.user_mood_entries(user.id, 10).await.is_empty());
        assert!(store.community_posts(10).await.is_empty());
        assert!(store.post_comments(post.id).await.is_empty());
    }

    #[tokio::test]
    async fn flagged_posts_are_excluded_from_feed() {
        let store = temp_store();
        let user = store.create_user(new_user("Ada")).await.unwrap();
        let post = store
            .create_post(NewCommunityPost {
                user_id: user.id,
                content: "visible".to_string(),
                anonymous: true,
            })
            .await
            .unwrap();

        {
            let mut data = store.data.lock().await;
            let flagged_id = data.allocate_id();
            data.community_posts.insert(
                flagged_id,
                CommunityPost {
                    id: flagged_id,
                    user_id: user.id,
                    content: "hidden".to_string(),
                    anonymous: true,
                    likes: 0,
                    flagged: true,
                    created_at: Utc::now(),
                },
            );
        }

        let posts = store.community_posts(10).await;
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, post.id);
    }

    #[tokio::test]
    async fn concurrent_likes_are_all_counted() {
        let store = temp_store();
        let user = store.create_user(new_user("Ada")).await.unwrap();
        let post = store
            .create_post(NewCommunityPost {
                user_id: user.id,
                content: "small wins".to_string(),
                anonymous: true,
            })
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            let post_id = post.id;
            tasks.push(tokio::spawn(async move {
                store.like_post(post_id).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let posts = store.community_posts(10).await;
        assert_eq!(posts[0].likes, 20);
    }

    #[tokio::test]
    async fn child_rows_require_an_existing_user() {
        let store = temp_store();
        let user = store.create_user(new_user("Ada")).await.unwrap();
        let post = store
            .create_post(NewCommunityPost {
                user_id: user.id,
                content: "hello".to_string(),
                anonymous: true,
            })
            .await
            .unwrap();

        let err = store
            .create_mood_entry(NewMoodEntry {
                user_id: 4242,
                mood: "calm".to_string(),
                intensity: 2,
                note: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);

        let err = store
            .create_intervention(NewIntervention {
                user_id: 4242,
                kind: "breathing".to_string(),
                title: "Box breathing".to_string(),
                content: "Breathe in a square".to_string(),
                duration: 3,
            })
            .await
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);

        let err = store
            .create_post(NewCommunityPost {
                user_id: 4242,
                content: "hi".to_string(),
                anonymous: true,
            })
            .await
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);

        let err = store
            .create_comment(
                post.id,
                NewPostComment {
                    user_id: 4242,
                    content: "hi".to_string(),
                    anonymous: true,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);

        let data = store.data.lock().await;
        assert!(data.mood_entries.values().all(|e| e.user_id == user.id));
        assert!(data.interventions.is_empty());
        assert!(data.community_posts.values().all(|p| p.user_id == user.id));
        assert!(data.post_comments.is_empty());
    }

    #[tokio::test]
    async fn check_in_refreshes_weekly_mood_snapshot() {
        let store = temp_store();
        let user = store.create_user(new_user("Ada")).await.unwrap();

        store
            .create_mood_entry(NewMoodEntry {
                user_id: user.id,
                mood: "joy".to_string(),
                intensity: 4,
                note: None,
            })
            .await
            .unwrap();

        let progress = store.progress(user.id).await.unwrap();
        let days = progress.weekly_mood_data["days"]
            .as_array()
            .expect("weekly snapshot missing days");
        assert_eq!(days.len(), 7);
        let today = days.last().unwrap();
        assert_eq!(today["entryCount"], 1);
        assert_eq!(today["averageIntensity"], 4.0);
    }

    #[tokio::test]
    async fn update_progress_overwrites_weekly_blob() {
        let store = temp_store();
        let user = store.create_user(new_user("Ada")).await.unwrap();

        let blob = serde_json::json!({"days": []});
        let updated = store
            .update_progress(user.id, blob.clone())
            .await
            .unwrap()
            .expect("progress row missing");
        assert_eq!(updated.weekly_mood_data, blob);

        let missing = store
            .update_progress(4242, serde_json::json!({}))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn snapshot_survives_reload() {
        let store = temp_store();
        let user = store.create_user(new_user("Ada")).await.unwrap();
        let path = store.path.clone();

        let reloaded = Store::new(path.clone(), load_data(&path).await);
        let found = reloaded.user(user.id).await.expect("user lost on reload");
        assert_eq!(found.name, "Ada");
    }
}
