//! services/api/src/adapters/memory.rs
//!
//! An in-process `StudySetStore`, used when no database is wanted (tests,
//! local experiments). Nothing survives a restart.

use async_trait::async_trait;
use chrono::Utc;
use study_set_core::domain::{NewStudySet, StudySet, StudySetSummary};
use study_set_core::ports::{PortError, PortResult, StudySetStore};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryStore {
    sets: RwLock<Vec<StudySet>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StudySetStore for InMemoryStore {
    async fn persist(&self, study_set: NewStudySet) -> PortResult<StudySet> {
        let stored = StudySet {
            id: Uuid::new_v4(),
            title: study_set.title,
            description: study_set.description,
            kind: study_set.kind,
            questions: study_set.questions,
            created_at: Utc::now(),
        };
        self.sets.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn fetch(&self, id: Uuid) -> PortResult<StudySet> {
        self.sets
            .read()
            .await
            .iter()
            .find(|set| set.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Study set {} not found", id)))
    }

    async fn update(&self, id: Uuid, study_set: NewStudySet) -> PortResult<StudySet> {
        let mut sets = self.sets.write().await;
        let stored = sets
            .iter_mut()
            .find(|set| set.id == id)
            .ok_or_else(|| PortError::NotFound(format!("Study set {} not found", id)))?;
        stored.title = study_set.title;
        stored.description = study_set.description;
        stored.kind = study_set.kind;
        stored.questions = study_set.questions;
        Ok(stored.clone())
    }

    async fn list(&self) -> PortResult<Vec<StudySetSummary>> {
        Ok(self.sets.read().await.iter().rev().map(StudySetSummary::from).collect())
    }

    async fn delete(&self, id: Uuid) -> PortResult<()> {
        let mut sets = self.sets.write().await;
        let before = sets.len();
        sets.retain(|set| set.id != id);
        if sets.len() == before {
            return Err(PortError::NotFound(format!("Study set {} not found", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_set_core::domain::{QuestionRecord, StudySetKind};

    fn new_set(title: &str) -> NewStudySet {
        NewStudySet {
            title: title.into(),
            description: "D".into(),
            kind: StudySetKind::Flashcards,
            questions: vec![QuestionRecord::flashcard("Q", "A")],
        }
    }

    #[tokio::test]
    async fn persist_fetch_list_delete() {
        let store = InMemoryStore::new();
        let first = store.persist(new_set("first")).await.unwrap();
        let second = store.persist(new_set("second")).await.unwrap();

        assert_eq!(store.fetch(first.id).await.unwrap(), first);

        let titles: Vec<String> = store.list().await.unwrap().into_iter().map(|s| s.title).collect();
        assert_eq!(titles, ["second", "first"]);

        let renamed = store.update(first.id, new_set("renamed")).await.unwrap();
        assert_eq!((renamed.id, renamed.created_at), (first.id, first.created_at));
        assert_eq!(store.fetch(first.id).await.unwrap().title, "renamed");

        store.delete(second.id).await.unwrap();
        assert!(matches!(store.fetch(second.id).await, Err(PortError::NotFound(_))));
        assert!(matches!(store.delete(second.id).await, Err(PortError::NotFound(_))));
        assert!(matches!(store.update(second.id, new_set("gone")).await, Err(PortError::NotFound(_))));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
