//! Call history backed by the engine's call logs

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use voipbridge_engine_core::{CallDirection, CallLogRecord, CallLogStatus, EngineHandle, RemoteAddress};

use crate::contacts::normalize_address;
use crate::error::ClientResult;

/// One row of the call history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallHistoryEntry {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub is_incoming: bool,
    pub is_missed: bool,
    pub start_date: DateTime<Utc>,
}

impl From<&CallLogRecord> for CallHistoryEntry {
    fn from(log: &CallLogRecord) -> Self {
        Self {
            id: log.id,
            from: display_address(&log.from),
            to: display_address(&log.to),
            is_incoming: log.direction == CallDirection::Incoming,
            is_missed: log.status == CallLogStatus::Missed,
            start_date: log.start_date,
        }
    }
}

/// Display name if known, otherwise the address without its scheme
pub fn display_address(address: &RemoteAddress) -> String {
    match address.known_display_name() {
        Some(name) => name.to_string(),
        None => normalize_address(&address.uri).to_string(),
    }
}

pub async fn entries(engine: &EngineHandle) -> ClientResult<Vec<CallHistoryEntry>> {
    let logs = engine.call_logs().await?;
    Ok(logs.iter().map(CallHistoryEntry::from).collect())
}

/// URI of the most recent outgoing call
pub async fn last_called_address(engine: &EngineHandle) -> ClientResult<Option<String>> {
    let logs = engine.call_logs().await?;
    Ok(logs
        .iter()
        .filter(|log| log.direction == CallDirection::Outgoing)
        .max_by_key(|log| log.start_date)
        .map(|log| log.to.uri.clone()))
}

pub async fn remove(engine: &EngineHandle, ids: &[Uuid]) -> ClientResult<()> {
    try_join_all(ids.iter().map(|id| engine.remove_call_log(*id))).await?;
    Ok(())
}

pub async fn clear(engine: &EngineHandle) -> ClientResult<()> {
    engine.clear_call_logs().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;
    use voipbridge_engine_core::mock::MockEngine;

    fn record(direction: CallDirection, status: CallLogStatus, to: &str, hour: u32) -> CallLogRecord {
        CallLogRecord {
            id: Uuid::new_v4(),
            direction,
            from: RemoteAddress::new("sip:me@example.com", "me").with_display_name("Me"),
            to: RemoteAddress::new(format!("sip:{to}@example.com"), to),
            status,
            start_date: Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_entries_and_last_called() {
        let mock = Arc::new(MockEngine::new());
        mock.set_call_logs(vec![
            record(CallDirection::Outgoing, CallLogStatus::Success, "alice", 9),
            record(CallDirection::Incoming, CallLogStatus::Missed, "bob", 11),
            record(CallDirection::Outgoing, CallLogStatus::Declined, "carol", 10),
        ]);
        let engine: EngineHandle = mock.clone();

        let list = entries(&engine).await.unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].from, "Me");
        assert_eq!(list[0].to, "alice@example.com");
        assert!(list[1].is_missed && list[1].is_incoming);

        let last = last_called_address(&engine).await.unwrap();
        assert_eq!(last.as_deref(), Some("sip:carol@example.com"));

        remove(&engine, &[list[0].id]).await.unwrap();
        assert_eq!(entries(&engine).await.unwrap().len(), 2);

        clear(&engine).await.unwrap();
        assert!(entries(&engine).await.unwrap().is_empty());
    }
}
