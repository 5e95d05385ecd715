use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, ConnectionTrait, Set};
use serde_json::Value;
use uuid::Uuid;

use crate::entity::audit_logs::ActiveModel as AuditActive;

/// Records an audit entry. A failed write is logged and never fails the
/// request that triggered it.
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    actor: Option<Uuid>,
    action: &str,
    resource: &str,
    metadata: Value,
) {
    let entry = AuditActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(actor),
        action: Set(action.to_string()),
        resource: Set(resource.to_string()),
        metadata: Set(metadata),
        created_at: NotSet,
    };

    if let Err(err) = entry.insert(conn).await {
        tracing::warn!(error = %err, action, resource, "audit log failed");
    }
}
