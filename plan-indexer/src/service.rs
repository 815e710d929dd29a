//! The plan write path.
//!
//! Every mutation is written to the primary store first and then published to
//! the replication channel. The two steps are not transactional: when the
//! publish fails the store keeps the write and the index stays stale until a
//! later mutation of the same plan.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use plan_indexer_pipeline::merge::{fingerprint, ConcurrencyMerger};
use plan_indexer_pipeline::publisher::ChangePublisher;
use plan_indexer_pipeline::PipelineError;
use plan_indexer_repository::{KeyValueStore, StoreError};
use plan_indexer_shared::{Entity, EntityError, Operation};

/// Failures of the write path, each mapping to one HTTP status.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The request body is not an acceptable plan or patch.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Plan {0} not found")]
    NotFound(String),

    /// The caller's entity tag is stale.
    #[error("Precondition failed: expected {expected}, current {current}")]
    PreconditionFailed { expected: String, current: String },

    /// The primary store or the channel could not be reached.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl ServiceError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::NotFound(_) => 404,
            ServiceError::PreconditionFailed { .. } => 412,
            ServiceError::Unavailable(_) => 503,
        }
    }
}

impl From<PipelineError> for ServiceError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::ValidationFailure(msg) | PipelineError::ParseError(msg) => {
                ServiceError::BadRequest(msg)
            }
            PipelineError::PreconditionFailed { expected, current } => {
                ServiceError::PreconditionFailed { expected, current }
            }
            other => ServiceError::Unavailable(other.to_string()),
        }
    }
}

impl From<EntityError> for ServiceError {
    fn from(err: EntityError) -> Self {
        ServiceError::BadRequest(err.to_string())
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidPattern(_) => ServiceError::BadRequest(err.to_string()),
            StoreError::Unavailable(_) => ServiceError::Unavailable(err.to_string()),
        }
    }
}

/// Result of a conditional read.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Found { entity: Entity, etag: String },
    /// The caller's `If-None-Match` tag is current.
    NotModified,
}

/// Stores plans and publishes their mutations.
#[derive(Clone)]
pub struct PlanService {
    store: Arc<dyn KeyValueStore>,
    merger: ConcurrencyMerger,
    publisher: ChangePublisher,
}

impl PlanService {
    pub fn new(store: Arc<dyn KeyValueStore>, publisher: ChangePublisher) -> Self {
        Self {
            store,
            merger: ConcurrencyMerger::new(),
            publisher,
        }
    }

    /// Store a new plan and publish `CREATE`. Returns its entity tag.
    ///
    /// A plan already stored under the same `objectId` is replaced.
    #[instrument(skip(self, plan), fields(object_id = ?plan.object_id()))]
    pub async fn create(&self, plan: Entity) -> Result<String, ServiceError> {
        plan.validate()?;
        let id = plan.object_id().ok_or(EntityError::MissingObjectId)?;

        let etag = self.save(&id, &plan).await?;
        self.publisher.publish(Operation::Create, &plan).await?;

        info!(object_id = %id, "Plan created");
        Ok(etag)
    }

    /// Read a plan, honouring `If-None-Match`.
    pub async fn get(&self, id: &str, if_none_match: Option<&str>) -> Result<Fetched, ServiceError> {
        let (entity, etag) = self.load(id).await?;
        if if_none_match == Some(etag.as_str()) {
            return Ok(Fetched::NotModified);
        }
        Ok(Fetched::Found { entity, etag })
    }

    /// Merge a partial update under `If-Match` and publish `UPDATE`.
    ///
    /// Returns the merged plan and its new entity tag.
    #[instrument(skip(self, patch, if_match))]
    pub async fn patch(
        &self,
        id: &str,
        patch: Entity,
        if_match: Option<&str>,
    ) -> Result<(Entity, String), ServiceError> {
        let (existing, current) = self.load(id).await?;
        let merged = self.merger.merge(&existing, &current, &patch, if_match)?;
        merged.validate()?;

        let etag = self.save(id, &merged).await?;
        self.publisher.publish(Operation::Update, &merged).await?;

        info!(object_id = %id, "Plan updated");
        Ok((merged, etag))
    }

    /// Remove a plan and publish `DELETE` with its last stored state.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let (existing, _) = self.load(id).await?;

        if self.store.del(id).await? == 0 {
            warn!(object_id = %id, "Plan vanished before delete");
            return Err(ServiceError::NotFound(id.to_string()));
        }
        self.publisher.publish(Operation::Delete, &existing).await?;

        info!(object_id = %id, "Plan deleted");
        Ok(())
    }

    /// Ids of all stored plans, sorted.
    pub async fn list_ids(&self) -> Result<Vec<String>, ServiceError> {
        let mut ids = self.store.keys("*").await?;
        ids.sort();
        Ok(ids)
    }

    async fn load(&self, id: &str) -> Result<(Entity, String), ServiceError> {
        let raw = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;
        let entity = Entity::from_json(&raw)
            .map_err(|e| ServiceError::Unavailable(format!("stored plan {} is corrupt: {}", id, e)))?;
        Ok((entity, fingerprint(&raw)))
    }

    async fn save(&self, id: &str, plan: &Entity) -> Result<String, ServiceError> {
        let serialized = plan.to_json()?;
        self.store.set(id, &serialized).await?;
        Ok(fingerprint(&serialized))
    }
}
