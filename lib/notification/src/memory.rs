//! In-memory notification backend.

use crate::client::{ApiResponse, NotificationApi};
use crate::error::NotificationError;
use crate::subscriber::SubscriberInformation;
use async_trait::async_trait;
use loanshark_core::WorkflowKey;
use rootcause::Report;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A call received by [`InMemoryNotificationApi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiCall {
    /// `addSubscriberInformation`.
    Add,
    /// `getSubscriberInformationByKey`.
    Get,
    /// `updateSubscriberInformation`.
    Update,
}

#[derive(Debug, Default)]
struct State {
    records: HashMap<WorkflowKey, SubscriberInformation>,
    calls: Vec<ApiCall>,
    unavailable: bool,
}

/// [`NotificationApi`] keeping records in memory, last write wins per key.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationApi {
    state: Arc<Mutex<State>>,
}

impl InMemoryNotificationApi {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail as if the backend were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Returns the record stored under a key.
    #[must_use]
    pub fn record(&self, key: &WorkflowKey) -> Option<SubscriberInformation> {
        self.lock().records.get(key).cloned()
    }

    /// Returns the calls received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, call: ApiCall, endpoint: &str) -> Result<MutexGuard<'_, State>, Report<NotificationError>> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.unavailable {
            return Err(NotificationError::RequestFailed {
                endpoint: endpoint.to_string(),
                reason: "backend unavailable".to_string(),
            }
            .into());
        }
        Ok(state)
    }
}

#[async_trait]
impl NotificationApi for InMemoryNotificationApi {
    async fn add_subscriber_information(
        &self,
        record: &SubscriberInformation,
    ) -> Result<ApiResponse, Report<NotificationError>> {
        let mut state = self.begin(ApiCall::Add, "addSubscriberInformation")?;
        state.records.insert(record.key.clone(), record.clone());
        Ok(ApiResponse::ok())
    }

    async fn get_subscriber_information_by_key(
        &self,
        key: &WorkflowKey,
    ) -> Result<Option<SubscriberInformation>, Report<NotificationError>> {
        let state = self.begin(ApiCall::Get, "getSubscriberInformationByKey")?;
        Ok(state.records.get(key).cloned())
    }

    async fn update_subscriber_information(
        &self,
        record: &SubscriberInformation,
    ) -> Result<ApiResponse, Report<NotificationError>> {
        let mut state = self.begin(ApiCall::Update, "updateSubscriberInformation")?;
        state.records.insert(record.key.clone(), record.clone());
        Ok(ApiResponse::ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::NotificationChannel;
    use crate::subscriber::SubscriptionStatus;

    #[tokio::test]
    async fn add_then_get_returns_last_written_notification() {
        let api = InMemoryNotificationApi::new();
        let key = WorkflowKey::staging();
        let mut record = SubscriberInformation::new(key.clone(), "eip155:1:0xabc", vec![]);
        NotificationChannel::Telegram {
            username: "alice".to_string(),
        }
        .apply(&mut record);

        api.add_subscriber_information(&record).await.expect("add");
        let fetched = api
            .get_subscriber_information_by_key(&key)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(fetched.notification, record.notification);

        let mut updated = fetched;
        NotificationChannel::Email {
            to_list: "a@b.c".to_string(),
        }
        .apply(&mut updated);
        api.update_subscriber_information(&updated).await.expect("update");

        let fetched = api
            .get_subscriber_information_by_key(&key)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(fetched.notification, updated.notification);
        assert_eq!(fetched.notification.telegram.status, SubscriptionStatus::On);
        assert_eq!(
            api.calls(),
            vec![ApiCall::Add, ApiCall::Get, ApiCall::Update, ApiCall::Get]
        );
    }

    #[tokio::test]
    async fn unknown_key_is_absent() {
        let api = InMemoryNotificationApi::new();
        let found = api
            .get_subscriber_information_by_key(&WorkflowKey::staging())
            .await
            .expect("get");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn unavailable_backend_fails_calls() {
        let api = InMemoryNotificationApi::new();
        api.set_unavailable(true);
        let record = SubscriberInformation::empty(WorkflowKey::staging());
        let err = api.add_subscriber_information(&record).await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            NotificationError::RequestFailed { .. }
        ));
        assert!(api.record(&record.key).is_none());
    }
}
