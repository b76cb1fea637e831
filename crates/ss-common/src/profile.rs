use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Whether a user offers a skill or wants to acquire it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SkillDirection {
    Teach,
    Learn,
}

/// Profile fields that feed the embedding. Skill lists keep the order the store returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: i64,
    pub name: String,
    pub bio: Option<String>,
    pub teach_skills: Vec<String>,
    pub learn_skills: Vec<String>,
}

impl UserProfile {
    pub fn push_skill(&mut self, skill: impl Into<String>, direction: SkillDirection) {
        match direction {
            SkillDirection::Teach => self.teach_skills.push(skill.into()),
            SkillDirection::Learn => self.learn_skills.push(skill.into()),
        }
    }

    pub fn profile_text(&self) -> String {
        format_profile_text(
            self.bio.as_deref(),
            &self.teach_skills,
            &self.learn_skills,
        )
    }
}

/// Render bio and skill lists into the single string handed to the encoder.
///
/// The template is fixed; changing it changes every stored embedding, so existing users
/// must be re-embedded afterwards. Skills are joined in caller order, without sorting or
/// deduplication.
pub fn format_profile_text<S: AsRef<str>>(
    bio: Option<&str>,
    teach_skills: &[S],
    learn_skills: &[S],
) -> String {
    let teach = join_skills(teach_skills);
    let learn = join_skills(learn_skills);
    format!(
        "{}. I can teach: {teach}. I want to learn: {learn}",
        bio.unwrap_or("")
    )
}

fn join_skills<S: AsRef<str>>(skills: &[S]) -> String {
    skills
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}
