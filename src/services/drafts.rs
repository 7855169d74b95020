// src/services/drafts.rs

use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    engine::{ExamComposer, FinalizedExam},
    error::AppError,
};

struct Draft {
    owner_id: i64,
    composer: ExamComposer,
    /// Set while a submit is writing this draft to the store.
    submitting: bool,
}

/// In-memory authoring sessions, one `ExamComposer` per draft.
///
/// Each draft belongs to exactly one user; the mutex only guards the map,
/// composers themselves are never shared between owners. Drafts do not
/// survive a restart.
pub struct DraftRegistry {
    drafts: Mutex<HashMap<Uuid, Draft>>,
    max_per_owner: usize,
}

impl DraftRegistry {
    pub fn new(max_per_owner: usize) -> Self {
        Self {
            drafts: Mutex::new(HashMap::new()),
            max_per_owner,
        }
    }

    /// Registers a new draft for `owner_id` and returns its id.
    pub async fn create(&self, owner_id: i64, composer: ExamComposer) -> Result<Uuid, AppError> {
        let mut drafts = self.drafts.lock().await;

        let open = drafts.values().filter(|d| d.owner_id == owner_id).count();
        if open >= self.max_per_owner {
            return Err(AppError::Conflict(format!(
                "You already have {} open drafts; submit or discard one first",
                open
            )));
        }

        let id = Uuid::new_v4();
        drafts.insert(
            id,
            Draft {
                owner_id,
                composer,
                submitting: false,
            },
        );
        tracing::debug!("Draft {} opened by user {}", id, owner_id);

        Ok(id)
    }

    /// Runs `f` against the owner's draft while holding the registry lock.
    pub async fn with_draft<R>(
        &self,
        owner_id: i64,
        id: Uuid,
        f: impl FnOnce(&mut ExamComposer) -> Result<R, AppError>,
    ) -> Result<R, AppError> {
        let mut drafts = self.drafts.lock().await;

        let draft = drafts
            .get_mut(&id)
            .filter(|d| d.owner_id == owner_id)
            .ok_or_else(|| AppError::NotFound("Draft not found".to_string()))?;

        f(&mut draft.composer)
    }

    /// Discards the draft. Nothing is persisted.
    pub async fn remove(&self, owner_id: i64, id: Uuid) -> Result<(), AppError> {
        let mut drafts = self.drafts.lock().await;

        match drafts.get(&id) {
            Some(d) if d.owner_id == owner_id && d.submitting => Err(AppError::Conflict(
                "Draft is being submitted".to_string(),
            )),
            Some(d) if d.owner_id == owner_id => {
                drafts.remove(&id);
                tracing::debug!("Draft {} closed", id);
                Ok(())
            }
            _ => Err(AppError::NotFound("Draft not found".to_string())),
        }
    }

    /// Finalizes the draft and claims it for a single submit.
    ///
    /// A second submit of the same draft fails with `Conflict` until the
    /// returned `Submission` is completed or released.
    pub async fn begin_submit(
        self: &Arc<Self>,
        owner_id: i64,
        id: Uuid,
    ) -> Result<(FinalizedExam, Submission), AppError> {
        let mut drafts = self.drafts.lock().await;

        let draft = drafts
            .get_mut(&id)
            .filter(|d| d.owner_id == owner_id)
            .ok_or_else(|| AppError::NotFound("Draft not found".to_string()))?;

        if draft.submitting {
            return Err(AppError::Conflict(
                "Draft is already being submitted".to_string(),
            ));
        }

        let finalized = draft.composer.finalize()?;
        draft.submitting = true;

        Ok((
            finalized,
            Submission {
                registry: Arc::clone(self),
                id,
                armed: true,
            },
        ))
    }

    async fn end_submit(&self, id: Uuid, saved: bool) {
        let mut drafts = self.drafts.lock().await;

        if saved {
            drafts.remove(&id);
            tracing::debug!("Draft {} submitted", id);
        } else if let Some(draft) = drafts.get_mut(&id) {
            draft.submitting = false;
        }
    }
}

/// Claim on a draft held for the duration of one submit.
///
/// Dropping it without calling `complete` or `release` (a cancelled request)
/// releases the claim in the background.
pub struct Submission {
    registry: Arc<DraftRegistry>,
    id: Uuid,
    armed: bool,
}

impl Submission {
    /// The exam is stored; the draft is closed.
    pub async fn complete(mut self) {
        self.armed = false;
        self.registry.end_submit(self.id, true).await;
    }

    /// The save failed; the draft stays frozen and can be submitted again.
    pub async fn release(mut self) {
        self.armed = false;
        self.registry.end_submit(self.id, false).await;
    }
}

impl Drop for Submission {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let registry = Arc::clone(&self.registry);
        let id = self.id;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { registry.end_submit(id, false).await });
            }
            Err(_) => tracing::warn!("Draft {} left claimed: no runtime to release it", id),
        }
    }
}
