use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiError, FieldError};
use crate::profiles::dto::{EducationInput, ExperienceInput, ProfileFields};
use crate::profiles::repo::{Education, Experience, Profile, ProfileStore};

/// Treats empty strings the same as absent keys.
fn present(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Comma-split with per-fragment trim. The raw string is never stored.
fn split_skills(raw: &str) -> Vec<String> {
    raw.split(',').map(|s| s.trim().to_string()).collect()
}

/// Creates or updates the caller's profile from a partial field set.
///
/// Present fields overwrite, absent fields keep whatever is stored. The merge
/// is computed in memory and applied as a single document write, so a call is
/// exactly one read plus one write against the store. Two concurrent upserts
/// for the same user race read-then-write; last write wins.
pub async fn upsert_profile(
    store: &dyn ProfileStore,
    user_id: Uuid,
    fields: ProfileFields,
) -> Result<Profile, ApiError> {
    let mut errors = Vec::new();
    if present(&fields.status).is_none() {
        errors.push(FieldError::new("status", "Status is required"));
    }
    if present(&fields.skills).is_none() {
        errors.push(FieldError::new("skills", "Skills are required"));
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let mut profile = store
        .find_by_user(user_id)
        .await?
        .unwrap_or_else(|| Profile::new(user_id));

    if let Some(status) = present(&fields.status) {
        profile.status = status;
    }
    if let Some(skills) = present(&fields.skills) {
        profile.skills = split_skills(&skills);
    }
    if let Some(v) = present(&fields.company) {
        profile.company = Some(v);
    }
    if let Some(v) = present(&fields.website) {
        profile.website = Some(v);
    }
    if let Some(v) = present(&fields.location) {
        profile.location = Some(v);
    }
    if let Some(v) = present(&fields.bio) {
        profile.bio = Some(v);
    }
    if let Some(v) = present(&fields.githubusername) {
        profile.githubusername = Some(v);
    }
    if let Some(v) = present(&fields.youtube) {
        profile.social.youtube = Some(v);
    }
    if let Some(v) = present(&fields.facebook) {
        profile.social.facebook = Some(v);
    }
    if let Some(v) = present(&fields.twitter) {
        profile.social.twitter = Some(v);
    }
    if let Some(v) = present(&fields.instagram) {
        profile.social.instagram = Some(v);
    }
    if let Some(v) = present(&fields.linkedin) {
        profile.social.linkedin = Some(v);
    }

    store.save(&profile).await?;
    debug!(user_id = %user_id, "profile upserted");
    Ok(profile)
}

async fn load_profile(store: &dyn ProfileStore, user_id: Uuid) -> Result<Profile, ApiError> {
    store
        .find_by_user(user_id)
        .await?
        .ok_or_else(ApiError::no_profile)
}

/// Validates and prepends a new experience entry, most recent first.
pub async fn add_experience(
    store: &dyn ProfileStore,
    user_id: Uuid,
    input: ExperienceInput,
) -> Result<Profile, ApiError> {
    let mut errors = Vec::new();
    if present(&input.title).is_none() {
        errors.push(FieldError::new("title", "Title is required"));
    }
    if present(&input.company).is_none() {
        errors.push(FieldError::new("company", "Company is required"));
    }
    if input.from.is_none() {
        errors.push(FieldError::new("from", "From date is required"));
    }
    let (Some(title), Some(company), Some(from)) = (
        present(&input.title),
        present(&input.company),
        input.from,
    ) else {
        return Err(ApiError::Validation(errors));
    };

    let entry = Experience {
        id: Uuid::new_v4(),
        title,
        company,
        location: present(&input.location),
        from,
        to: input.to,
        current: input.current,
        description: present(&input.description),
    };

    let mut profile = load_profile(store, user_id).await?;
    profile.experience.insert(0, entry);
    store.save(&profile).await?;
    Ok(profile)
}

/// Validates and prepends a new education entry.
pub async fn add_education(
    store: &dyn ProfileStore,
    user_id: Uuid,
    input: EducationInput,
) -> Result<Profile, ApiError> {
    let mut errors = Vec::new();
    if present(&input.school).is_none() {
        errors.push(FieldError::new("school", "School is required"));
    }
    if present(&input.degree).is_none() {
        errors.push(FieldError::new("degree", "Degree is required"));
    }
    if present(&input.fieldofstudy).is_none() {
        errors.push(FieldError::new("fieldofstudy", "Field of study is required"));
    }
    if input.from.is_none() {
        errors.push(FieldError::new("from", "From date is required"));
    }
    let (Some(school), Some(degree), Some(fieldofstudy), Some(from)) = (
        present(&input.school),
        present(&input.degree),
        present(&input.fieldofstudy),
        input.from,
    ) else {
        return Err(ApiError::Validation(errors));
    };

    let entry = Education {
        id: Uuid::new_v4(),
        school,
        degree,
        fieldofstudy,
        from,
        to: input.to,
        current: input.current,
        description: present(&input.description),
    };

    let mut profile = load_profile(store, user_id).await?;
    profile.education.insert(0, entry);
    store.save(&profile).await?;
    Ok(profile)
}

/// Removes the experience entry with the given id. An id that matches nothing
/// (including one that failed to parse) removes nothing; the unchanged
/// document is still persisted and returned.
pub async fn remove_experience(
    store: &dyn ProfileStore,
    user_id: Uuid,
    entry_id: Option<Uuid>,
) -> Result<Profile, ApiError> {
    let mut profile = load_profile(store, user_id).await?;
    if let Some(id) = entry_id {
        profile.experience.retain(|e| e.id != id);
    }
    store.save(&profile).await?;
    Ok(profile)
}

/// Same lifecycle as [`remove_experience`], for education entries.
pub async fn remove_education(
    store: &dyn ProfileStore,
    user_id: Uuid,
    entry_id: Option<Uuid>,
) -> Result<Profile, ApiError> {
    let mut profile = load_profile(store, user_id).await?;
    if let Some(id) = entry_id {
        profile.education.retain(|e| e.id != id);
    }
    store.save(&profile).await?;
    Ok(profile)
}
