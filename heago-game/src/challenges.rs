//! Challenge catalog: shared bundles of habits, dailies, todos and rewards.
//!
//! The catalog is an external collaborator. Only [`join_challenge`] touches a
//! [`SaveState`], and a catalog failure never reaches it.
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

use crate::progress::{add_daily, add_habit, add_reward, add_todo};
use crate::state::{
    DailyTemplate, EntityId, HabitTemplate, RewardTemplate, SaveState, TodoTemplate, new_id,
};

pub type ChallengeId = EntityId;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("challenge catalog unavailable: {0}")]
    Unavailable(String),
    #[error("invalid challenge: {0}")]
    Validation(String),
}

/// A published challenge as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub prize: u64,
    #[serde(default)]
    pub participants: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: String,
    #[serde(default)]
    pub is_official: bool,
    #[serde(default)]
    pub habits: Vec<HabitTemplate>,
    #[serde(default)]
    pub dailies: Vec<DailyTemplate>,
    #[serde(default)]
    pub todos: Vec<TodoTemplate>,
    #[serde(default)]
    pub rewards: Vec<RewardTemplate>,
}

/// Item counts shown on a challenge card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ChallengeStats {
    pub habits: usize,
    pub dailies: usize,
    pub todos: usize,
    pub rewards: usize,
}

impl Challenge {
    #[must_use]
    pub fn stats(&self) -> ChallengeStats {
        ChallengeStats {
            habits: self.habits.len(),
            dailies: self.dailies.len(),
            todos: self.todos.len(),
            rewards: self.rewards.len(),
        }
    }
}

/// Submission for a new challenge.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewChallenge {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub prize: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub habits: Vec<HabitTemplate>,
    #[serde(default)]
    pub dailies: Vec<DailyTemplate>,
    #[serde(default)]
    pub todos: Vec<TodoTemplate>,
    #[serde(default)]
    pub rewards: Vec<RewardTemplate>,
}

impl NewChallenge {
    /// Title, description and category are required.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] naming the first blank field.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for (field, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("category", &self.category),
        ] {
            if value.trim().is_empty() {
                return Err(CatalogError::Validation(format!("{field} is required")));
            }
        }
        Ok(())
    }

    fn into_challenge(self, id: ChallengeId) -> Challenge {
        let tags = self
            .tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect();
        Challenge {
            id,
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            creator: self.creator,
            prize: self.prize,
            participants: 0,
            tags,
            category: self.category,
            is_official: false,
            habits: self.habits,
            dailies: self.dailies,
            todos: self.todos,
            rewards: self.rewards,
        }
    }
}

/// Listing criteria; an empty filter matches everything.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeFilter {
    /// Matches the challenge category or any of its tags.
    pub category: Option<String>,
    pub tag: Option<String>,
    /// Case-insensitive substring of title or description.
    pub query: Option<String>,
    pub official_only: bool,
}

impl ChallengeFilter {
    #[must_use]
    pub fn matches(&self, challenge: &Challenge) -> bool {
        let same = |a: &str, b: &str| a.eq_ignore_ascii_case(b.trim());
        if self.official_only && !challenge.is_official {
            return false;
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.trim().is_empty()) {
            let hit = same(&challenge.category, category)
                || challenge.tags.iter().any(|tag| same(tag, category));
            if !hit {
                return false;
            }
        }
        if let Some(tag) = self.tag.as_deref().filter(|t| !t.trim().is_empty())
            && !challenge.tags.iter().any(|candidate| same(candidate, tag))
        {
            return false;
        }
        if let Some(query) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let needle = query.to_lowercase();
            return challenge.title.to_lowercase().contains(&needle)
                || challenge.description.to_lowercase().contains(&needle);
        }
        true
    }
}

/// Source of challenge listings.
pub trait ChallengeCatalog {
    /// Challenges matching `filter`, in catalog order.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be reached.
    fn list(&self, filter: &ChallengeFilter) -> Result<Vec<Challenge>, CatalogError>;

    /// Look up one challenge.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be reached.
    fn get(&self, id: &str) -> Result<Option<Challenge>, CatalogError>;

    /// Publish a new challenge and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the submission is invalid or the catalog rejects it.
    fn create(&self, challenge: NewChallenge) -> Result<ChallengeId, CatalogError>;
}

/// Catalog held in memory. Clones share the same listings.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    challenges: Rc<RefCell<Vec<Challenge>>>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_challenges(challenges: Vec<Challenge>) -> Self {
        Self {
            challenges: Rc::new(RefCell::new(challenges)),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.challenges.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.challenges.borrow().is_empty()
    }
}

impl ChallengeCatalog for InMemoryCatalog {
    fn list(&self, filter: &ChallengeFilter) -> Result<Vec<Challenge>, CatalogError> {
        Ok(self
            .challenges
            .borrow()
            .iter()
            .filter(|challenge| filter.matches(challenge))
            .cloned()
            .collect())
    }

    fn get(&self, id: &str) -> Result<Option<Challenge>, CatalogError> {
        Ok(self
            .challenges
            .borrow()
            .iter()
            .find(|challenge| challenge.id == id)
            .cloned())
    }

    fn create(&self, challenge: NewChallenge) -> Result<ChallengeId, CatalogError> {
        challenge.validate()?;
        let id = new_id();
        let challenge = challenge.into_challenge(id.clone());
        debug!("catalog: created challenge {id} ({})", challenge.title);
        self.challenges.borrow_mut().push(challenge);
        Ok(id)
    }
}

/// Result of joining a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoinOutcome {
    pub joined: bool,
    /// Entities appended to the save.
    pub created: usize,
}

/// Copy a challenge's items into `state` as fresh entities.
///
/// Joining the same challenge twice is a no-op.
pub fn join_challenge(state: &mut SaveState, challenge: &Challenge) -> JoinOutcome {
    if state.has_joined(&challenge.id) {
        debug!("challenge {} already joined", challenge.id);
        return JoinOutcome::default();
    }
    let mut outcomes = Vec::new();
    for template in &challenge.habits {
        outcomes.push(add_habit(state, template));
    }
    for template in &challenge.dailies {
        outcomes.push(add_daily(state, template));
    }
    for template in &challenge.todos {
        outcomes.push(add_todo(state, template));
    }
    for template in &challenge.rewards {
        outcomes.push(add_reward(state, template));
    }
    let created = outcomes.iter().filter(|outcome| outcome.applied).count();
    state.joined_challenges.push(challenge.id.clone());
    info!("joined challenge {} ({created} items)", challenge.title);
    JoinOutcome {
        joined: true,
        created,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::HabitKind;
    use chrono::{TimeZone, Utc};

    fn sample(id: &str, title: &str, category: &str, official: bool) -> Challenge {
        Challenge {
            id: id.to_string(),
            title: title.to_string(),
            description: format!("{title} for thirty days"),
            creator: "heago".to_string(),
            prize: 100,
            participants: 12,
            tags: vec![category.to_string(), "Beginner".to_string()],
            category: category.to_string(),
            is_official: official,
            habits: vec![HabitTemplate::new("Practice", HabitKind::Good).with_goal(2)],
            dailies: vec![DailyTemplate::new("Review notes")],
            todos: vec![TodoTemplate::new("Buy supplies")],
            rewards: vec![RewardTemplate::new("Movie night", 0)],
        }
    }

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::with_challenges(vec![
            sample("c1", "Study Sprint", "Academics", true),
            sample("c2", "Couch to 5K", "Health + Fitness", true),
            sample("c3", "Sketch Daily", "Creativity", false),
        ])
    }

    #[test]
    fn filters_by_category_query_and_official() {
        let catalog = catalog();
        let all = catalog.list(&ChallengeFilter::default()).unwrap();
        assert_eq!(all.len(), 3);

        let academics = ChallengeFilter {
            category: Some("academics".into()),
            ..ChallengeFilter::default()
        };
        assert_eq!(catalog.list(&academics).unwrap()[0].id, "c1");

        let query = ChallengeFilter {
            query: Some("  5K ".into()),
            ..ChallengeFilter::default()
        };
        assert_eq!(catalog.list(&query).unwrap().len(), 1);

        let described = ChallengeFilter {
            query: Some("thirty".into()),
            official_only: true,
            ..ChallengeFilter::default()
        };
        assert_eq!(catalog.list(&described).unwrap().len(), 2);

        let tagged = ChallengeFilter {
            tag: Some("beginner".into()),
            category: Some("Creativity".into()),
            ..ChallengeFilter::default()
        };
        assert_eq!(catalog.list(&tagged).unwrap()[0].id, "c3");
    }

    #[test]
    fn create_validates_and_publishes() {
        let catalog = InMemoryCatalog::new();
        let missing = catalog.create(NewChallenge {
            title: "Focus".into(),
            ..NewChallenge::default()
        });
        assert!(matches!(missing, Err(CatalogError::Validation(_))));
        assert!(catalog.is_empty());

        let id = catalog
            .create(NewChallenge {
                title: " Focus ".into(),
                description: "Deep work blocks".into(),
                category: "Self-Improvement".into(),
                tags: vec![" focus ".into(), String::new()],
                dailies: vec![DailyTemplate::new("Two hour block")],
                ..NewChallenge::default()
            })
            .unwrap();
        let created = catalog.get(&id).unwrap().unwrap();
        assert_eq!(created.title, "Focus");
        assert_eq!(created.tags, vec!["focus".to_string()]);
        assert!(!created.is_official);
        assert_eq!(created.stats().dailies, 1);
        assert!(catalog.get("nope").unwrap().is_none());
    }

    #[test]
    fn joining_appends_fresh_entities_once() {
        let mut state = SaveState::seeded(Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap());
        let challenge = sample("c1", "Study Sprint", "Academics", true);
        let outcome = join_challenge(&mut state, &challenge);
        assert!(outcome.joined);
        assert_eq!(outcome.created, 4);
        assert_eq!(state.habits.len(), 3);
        assert_eq!(state.habits[2].goal, Some(2));
        assert_eq!(state.habits[2].value, 0);
        assert_eq!(state.rewards[2].cost, 1);
        assert!(state.has_joined("c1"));

        let before = state.clone();
        assert_eq!(join_challenge(&mut state, &challenge), JoinOutcome::default());
        assert_eq!(state, before);
    }

    #[test]
    fn challenge_json_uses_row_field_names() {
        let json = r#"{
            "id": "x", "title": "Hydrate", "description": "Water", "category": "Health + Fitness",
            "is_official": true,
            "habits": [ { "title": "Glass", "type": "good", "goal": 8 } ]
        }"#;
        let challenge: Challenge = serde_json::from_str(json).unwrap();
        assert!(challenge.is_official);
        assert_eq!(challenge.habits[0].kind, HabitKind::Good);
        assert!(challenge.tags.is_empty());
    }
}
