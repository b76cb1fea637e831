use std::str::FromStr;

use tracing::instrument;

use crate::db::util::TimedClientExt;
use crate::db::PgPool;
use crate::profile::{SkillDirection, UserProfile};

db_error!(ProfileStorageError {
    #[error("user {user_id} has skill {skill:?} with unknown type {kind:?}")]
    UnknownSkillType {
        user_id: i64,
        skill: String,
        kind: String,
    },
});

/// Load a user's bio and skills. Skills come back in skill-id order.
#[instrument(skip(pool))]
pub async fn fetch_profile(
    pool: &PgPool,
    user_id: i64,
) -> Result<Option<UserProfile>, ProfileStorageError> {
    let client = pool.get().await?;

    let Some(user) = client
        .timed_query_opt_cached(
            "SELECT id, name, bio FROM users WHERE id = $1",
            &[&user_id],
            "profiles.fetch_user",
        )
        .await?
    else {
        return Ok(None);
    };

    let mut profile = UserProfile {
        user_id: user.get("id"),
        name: user.get::<_, Option<String>>("name").unwrap_or_default(),
        bio: user.get("bio"),
        ..UserProfile::default()
    };

    let rows = client
        .timed_query_cached(
            "SELECT s.name, us.type
             FROM user_skills us
             JOIN skills s ON s.id = us.skill_id
             WHERE us.user_id = $1
             ORDER BY s.id ASC, us.type ASC",
            &[&user_id],
            "profiles.fetch_skills",
        )
        .await?;

    for row in rows {
        let skill: String = row.get("name");
        let kind: String = row.get("type");
        let direction = SkillDirection::from_str(&kind).map_err(|_| {
            ProfileStorageError::UnknownSkillType {
                user_id,
                skill: skill.clone(),
                kind: kind.clone(),
            }
        })?;
        profile.push_skill(skill, direction);
    }

    Ok(Some(profile))
}
