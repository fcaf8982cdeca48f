//! Cached list of knowledge base subjects

use std::sync::Arc;

use crate::backend::{ensure_success, BackendResult, KnowledgeBackend};

/// Subjects known to the service, refreshed on demand
pub struct SubjectDirectory {
    backend: Arc<dyn KnowledgeBackend>,
    subjects: Vec<String>,
}

impl std::fmt::Debug for SubjectDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubjectDirectory")
            .field("subjects", &self.subjects)
            .finish_non_exhaustive()
    }
}

impl SubjectDirectory {
    pub fn new(backend: Arc<dyn KnowledgeBackend>) -> Self {
        Self {
            backend,
            subjects: Vec::new(),
        }
    }

    /// Reload the list from the service
    ///
    /// On failure the previous list stays in place.
    pub async fn refresh(&mut self) -> BackendResult<()> {
        let response = match self.backend.list_subjects().await.and_then(ensure_success) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Failed to refresh subjects: {}", e);
                return Err(e);
            }
        };

        let mut subjects: Vec<String> = response
            .subjects
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        subjects.sort();
        subjects.dedup();

        tracing::debug!("Loaded {} subject(s)", subjects.len());
        self.subjects = subjects;
        Ok(())
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn contains(&self, subject: &str) -> bool {
        let subject = subject.trim();
        self.subjects.iter().any(|s| s == subject)
    }
}
