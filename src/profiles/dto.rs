use serde::Deserialize;
use time::Date;

/// Partial upsert payload. Every recognized key is optional; unknown keys are
/// ignored and empty strings count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileFields {
    pub company: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub status: Option<String>,
    pub githubusername: Option<String>,
    /// Comma-separated in the request; normalized before storage.
    pub skills: Option<String>,
    pub youtube: Option<String>,
    pub facebook: Option<String>,
    pub twitter: Option<String>,
    pub instagram: Option<String>,
    pub linkedin: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExperienceInput {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub from: Option<Date>,
    pub to: Option<Date>,
    #[serde(default)]
    pub current: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EducationInput {
    pub school: Option<String>,
    pub degree: Option<String>,
    pub fieldofstudy: Option<String>,
    pub from: Option<Date>,
    pub to: Option<Date>,
    #[serde(default)]
    pub current: bool,
    pub description: Option<String>,
}
