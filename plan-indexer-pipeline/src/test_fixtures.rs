//! Plan payloads and a recording search index shared by the unit tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use plan_indexer_repository::{
    DeleteDocumentRequest, IndexDocumentRequest, SearchIndexClient, SearchIndexError,
    SearchIndexProvider,
};
use plan_indexer_shared::Entity;
use serde_json::json;

pub const PLAN_ID: &str = "12xvxc345ssdsds-508";

/// A plan with one cost share and two linked plan services, each holding a
/// linked service and its own cost share: eight identifiable objects.
pub fn sample_plan() -> Entity {
    Entity::from_value(json!({
        "planCostShares": {
            "deductible": 2000,
            "_org": "example.com",
            "copay": 23,
            "objectId": "1234vxc2324sdf-501",
            "objectType": "membercostshare"
        },
        "linkedPlanServices": [
            {
                "linkedService": {
                    "_org": "example.com",
                    "objectId": "1234520xvc30asdf-502",
                    "objectType": "service",
                    "name": "Yearly physical"
                },
                "planserviceCostShares": {
                    "deductible": 10,
                    "_org": "example.com",
                    "copay": 0,
                    "objectId": "1234512xvc1314asdf-501",
                    "objectType": "membercostshare"
                },
                "_org": "example.com",
                "objectId": "27283xvx9asdff-504",
                "objectType": "planservice"
            },
            {
                "linkedService": {
                    "_org": "example.com",
                    "objectId": "1234520xvc30sfs-505",
                    "objectType": "service",
                    "name": "well baby"
                },
                "planserviceCostShares": {
                    "deductible": 10,
                    "_org": "example.com",
                    "copay": 175,
                    "objectId": "1234512xvc1314sdfsd-506",
                    "objectType": "membercostshare"
                },
                "_org": "example.com",
                "objectId": "27283xvx9sdf-507",
                "objectType": "planservice"
            }
        ],
        "_org": "example.com",
        "objectId": PLAN_ID,
        "objectType": "plan",
        "planType": "inNetwork",
        "creationDate": "12-12-2017"
    }))
    .unwrap()
}

/// A plan with a cost share and two flat linked services.
pub fn small_plan(plan_id: &str) -> Entity {
    Entity::from_value(json!({
        "objectId": plan_id,
        "objectType": "plan",
        "planType": "inNetwork",
        "planCostShares": { "objectId": format!("{}-cs", plan_id), "objectType": "membercostshare", "copay": 23 },
        "linkedPlanServices": [
            { "objectId": format!("{}-s1", plan_id), "objectType": "planservice" },
            { "objectId": format!("{}-s2", plan_id), "objectType": "planservice" }
        ]
    }))
    .unwrap()
}

/// A write observed by the [`RecordingProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexCall {
    Index { id: String, routing: Option<String> },
    Delete(String),
}

#[derive(Default)]
struct Recording {
    calls: Mutex<Vec<IndexCall>>,
    failing: Mutex<HashSet<String>>,
}

/// Search index that records every call and can fail chosen ids.
#[derive(Clone, Default)]
pub struct RecordingProvider {
    recording: Arc<Recording>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client over a clone of this provider.
    pub fn client(&self) -> Arc<SearchIndexClient> {
        Arc::new(SearchIndexClient::new(Box::new(self.clone())))
    }

    pub fn fail_on(&self, id: &str) {
        self.recording.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn heal(&self) {
        self.recording.failing.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<IndexCall> {
        self.recording.calls.lock().unwrap().clone()
    }

    pub fn indexed_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                IndexCall::Index { id, .. } => Some(id),
                IndexCall::Delete(_) => None,
            })
            .collect()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                IndexCall::Delete(id) => Some(id),
                IndexCall::Index { .. } => None,
            })
            .collect()
    }

    fn fails(&self, id: &str) -> bool {
        self.recording.failing.lock().unwrap().contains(id)
    }
}

#[async_trait]
impl SearchIndexProvider for RecordingProvider {
    async fn index_document(&self, request: &IndexDocumentRequest) -> Result<(), SearchIndexError> {
        if self.fails(&request.document_id) {
            return Err(SearchIndexError::index("Mock failure"));
        }
        self.recording.calls.lock().unwrap().push(IndexCall::Index {
            id: request.document_id.clone(),
            routing: request.routing.clone(),
        });
        Ok(())
    }

    async fn delete_document(&self, request: &DeleteDocumentRequest) -> Result<(), SearchIndexError> {
        if self.fails(&request.document_id) {
            return Err(SearchIndexError::delete("Mock failure"));
        }
        self.recording
            .calls
            .lock()
            .unwrap()
            .push(IndexCall::Delete(request.document_id.clone()));
        Ok(())
    }

    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchIndexError> {
        Ok(true)
    }
}
