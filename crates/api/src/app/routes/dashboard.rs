use std::sync::Arc;

use axum::{extract::Extension, Json};
use serde::Serialize;

use exportdesk_containers::Container;
use exportdesk_infra::{Collection, Query, Record, RecordStore};

use crate::app::services::AppServices;

#[derive(Debug, Default, Serialize)]
pub struct Counts {
    pub shippers: u64,
    pub consignees: u64,
    pub notify_parties: u64,
    pub containers: u64,
    pub users: u64,
}

#[derive(Debug, Serialize)]
pub struct Overview {
    pub counts: Counts,
    pub recent_containers: Vec<Container>,
}

/// Row count; a failing store counts as zero.
async fn count<R: Record>(store: &dyn RecordStore<R>) -> u64 {
    match store.count(&Query::new()).await {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(collection = %R::COLLECTION, error = %e, "count failed");
            0
        }
    }
}

pub async fn overview(Extension(services): Extension<Arc<AppServices>>) -> Json<Overview> {
    let (shippers, consignees, notify_parties, containers, users) = tokio::join!(
        count(&*services.shippers),
        count(&*services.consignees),
        count(&*services.notify_parties),
        count(&*services.containers),
        count(&*services.users),
    );

    let recent_containers = services
        .containers
        .select(&Query::newest_first().limit(5))
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(collection = %Collection::Containers, error = %e, "recent containers unavailable");
            Vec::new()
        });

    Json(Overview {
        counts: Counts {
            shippers,
            consignees,
            notify_parties,
            containers,
            users,
        },
        recent_containers,
    })
}
