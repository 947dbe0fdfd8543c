use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

/// Optional social links, kept as a nested object inside the document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Social {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Experience {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub from: Date,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Date>,
    #[serde(default)]
    pub current: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Education {
    pub id: Uuid,
    pub school: String,
    pub degree: String,
    pub fieldofstudy: String,
    pub from: Date,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Date>,
    #[serde(default)]
    pub current: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The persisted profile document, one per user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub user: Uuid,
    pub status: String,
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub githubusername: Option<String>,
    #[serde(default)]
    pub social: Social,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
}

impl Profile {
    /// Fresh document for a user; required fields are filled in by the merge.
    pub fn new(user: Uuid) -> Self {
        Self {
            user,
            status: String::new(),
            skills: Vec::new(),
            company: None,
            website: None,
            location: None,
            bio: None,
            githubusername: None,
            social: Social::default(),
            experience: Vec::new(),
            education: Vec::new(),
        }
    }
}

/// Limited identity fields joined onto a profile for public reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub name: String,
    pub avatar: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnedProfile {
    #[serde(flatten)]
    pub profile: Profile,
    pub owner: Owner,
}

/// Document-store contract for profiles. Injected into the merge engine and
/// list editor so tests can run against an in-memory double.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>>;
    async fn find_owned(&self, user_id: Uuid) -> anyhow::Result<Option<OwnedProfile>>;
    async fn list_all(&self) -> anyhow::Result<Vec<OwnedProfile>>;
    /// Insert-or-replace of the whole document, keyed on the owning user.
    async fn save(&self, profile: &Profile) -> anyhow::Result<()>;
    /// Removes the profile and the owning user account in one transaction.
    async fn delete_with_owner(&self, user_id: Uuid) -> anyhow::Result<()>;
}

pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn find_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        let doc = sqlx::query_scalar::<_, serde_json::Value>(
            r#"
            SELECT doc
            FROM profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        doc.map(serde_json::from_value)
            .transpose()
            .context("decode profile document")
    }

    async fn find_owned(&self, user_id: Uuid) -> anyhow::Result<Option<OwnedProfile>> {
        let row = sqlx::query_as::<_, (serde_json::Value, String, String)>(
            r#"
            SELECT p.doc, u.name, u.avatar
            FROM profiles p
            JOIN users u ON u.id = p.user_id
            WHERE p.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        row.map(|(doc, name, avatar)| {
            Ok(OwnedProfile {
                profile: serde_json::from_value(doc).context("decode profile document")?,
                owner: Owner { name, avatar },
            })
        })
        .transpose()
    }

    async fn list_all(&self) -> anyhow::Result<Vec<OwnedProfile>> {
        let rows = sqlx::query_as::<_, (serde_json::Value, String, String)>(
            r#"
            SELECT p.doc, u.name, u.avatar
            FROM profiles p
            JOIN users u ON u.id = p.user_id
            ORDER BY p.created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        rows.into_iter()
            .map(|(doc, name, avatar)| {
                Ok(OwnedProfile {
                    profile: serde_json::from_value(doc).context("decode profile document")?,
                    owner: Owner { name, avatar },
                })
            })
            .collect()
    }

    async fn save(&self, profile: &Profile) -> anyhow::Result<()> {
        let doc = serde_json::to_value(profile).context("encode profile document")?;
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, doc)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET doc = EXCLUDED.doc, updated_at = now()
            "#,
        )
        .bind(profile.user)
        .bind(doc)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn delete_with_owner(&self, user_id: Uuid) -> anyhow::Result<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

/// In-memory double used by `AppState::fake()` and the service tests.
#[derive(Default)]
pub struct MemoryStore {
    profiles: Mutex<HashMap<Uuid, Profile>>,
    owners: Mutex<HashMap<Uuid, Owner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_owner(&self, user_id: Uuid, owner: Owner) {
        self.owners.lock().expect("owners lock").insert(user_id, owner);
    }

    fn owner_of(&self, user_id: Uuid) -> Owner {
        self.owners
            .lock()
            .expect("owners lock")
            .get(&user_id)
            .cloned()
            .unwrap_or(Owner {
                name: "Test User".into(),
                avatar: "https://gravatar.test/avatar".into(),
            })
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        Ok(self
            .profiles
            .lock()
            .expect("profiles lock")
            .get(&user_id)
            .cloned())
    }

    async fn find_owned(&self, user_id: Uuid) -> anyhow::Result<Option<OwnedProfile>> {
        Ok(self.find_by_user(user_id).await?.map(|profile| OwnedProfile {
            owner: self.owner_of(user_id),
            profile,
        }))
    }

    async fn list_all(&self) -> anyhow::Result<Vec<OwnedProfile>> {
        let profiles = self.profiles.lock().expect("profiles lock");
        Ok(profiles
            .values()
            .cloned()
            .map(|profile| OwnedProfile {
                owner: self.owner_of(profile.user),
                profile,
            })
            .collect())
    }

    async fn save(&self, profile: &Profile) -> anyhow::Result<()> {
        self.profiles
            .lock()
            .expect("profiles lock")
            .insert(profile.user, profile.clone());
        Ok(())
    }

    async fn delete_with_owner(&self, user_id: Uuid) -> anyhow::Result<()> {
        self.profiles.lock().expect("profiles lock").remove(&user_id);
        self.owners.lock().expect("owners lock").remove(&user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_profile(user: Uuid) -> Profile {
        Profile {
            status: "Developer".into(),
            skills: vec!["js".into(), "node".into()],
            ..Profile::new(user)
        }
    }

    #[test]
    fn document_omits_absent_optional_fields() {
        let doc = serde_json::to_value(sample_profile(Uuid::new_v4())).unwrap();
        assert!(doc.get("company").is_none());
        assert!(doc.get("bio").is_none());
        // The social object is always present, its absent links are not.
        assert_eq!(doc["social"], serde_json::json!({}));
        assert_eq!(doc["skills"], serde_json::json!(["js", "node"]));
    }

    #[test]
    fn document_decodes_without_entry_lists() {
        let user = Uuid::new_v4();
        let doc = serde_json::json!({
            "user": user,
            "status": "Developer",
            "skills": ["rust"],
        });
        let profile: Profile = serde_json::from_value(doc).unwrap();
        assert!(profile.experience.is_empty());
        assert!(profile.education.is_empty());
        assert_eq!(profile.social, Social::default());
    }

    #[tokio::test]
    async fn memory_store_replaces_on_save() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let mut profile = sample_profile(user);
        store.save(&profile).await.unwrap();

        profile.status = "Student".into();
        store.save(&profile).await.unwrap();

        let stored = store.find_by_user(user).await.unwrap().unwrap();
        assert_eq!(stored.status, "Student");
    }

    #[tokio::test]
    async fn memory_store_joins_owner_fields() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.save(&sample_profile(user)).await.unwrap();
        store.put_owner(
            user,
            Owner {
                name: "Ada".into(),
                avatar: "https://www.gravatar.com/avatar/ada".into(),
            },
        );

        let owned = store.find_owned(user).await.unwrap().unwrap();
        assert_eq!(owned.owner.name, "Ada");
        assert_eq!(owned.profile.user, user);

        store.delete_with_owner(user).await.unwrap();
        assert!(store.find_owned(user).await.unwrap().is_none());
        assert!(store.list_all().await.unwrap().is_empty());
    }
}
