//! Link-status polling state machine.
//!
//! A [`LinkSession`] walks `idle → fetching → waiting ⇄ checking → linked`,
//! falling to `error` whenever a request fails. After a code is issued a
//! background task re-checks the link status every
//! [`LinkConfig::poll_interval`] until a token arrives or the caller stops it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::account::Account;
use super::client::{HttpLinkClient, LinkApi};
use super::status::LinkStatus;
use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::overlay::Overlay;

/// Point-in-time copy of the session record.
///
/// `token` and `account` outlive a new code request; `linked_at` and
/// `account_fetched_at` only describe the code currently held.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkSnapshot {
    pub auth_code: String,
    pub token: String,
    pub status: LinkStatus,
    pub account: Option<Account>,
    pub code_issued_at: Option<DateTime<Utc>>,
    pub linked_at: Option<DateTime<Utc>>,
    pub account_fetched_at: Option<DateTime<Utc>>,
}

impl LinkSnapshot {
    /// The held code is linked, and its account request has finished either way.
    fn link_settled(&self) -> bool {
        self.linked_at.is_some()
            && (self.account_fetched_at.is_some() || self.status == LinkStatus::Error)
    }
}

/// Device-code linking session.
///
/// Owns the code, token, account record and status for one linking attempt,
/// plus the repeating status check. Request failures never escape: they show
/// up as [`LinkStatus::Error`] and a `warn!` event.
///
/// Dropping the session cancels its polling task.
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use warplink::config::LinkConfig;
/// use warplink::link::LinkSession;
///
/// # async fn example() -> warplink::error::Result<()> {
/// let session = LinkSession::from_config(LinkConfig::default())?;
/// session.request_code().await;
/// println!("enter {} at rotur.dev/link", session.code());
/// let linked = session.wait_until_linked(Duration::from_secs(300)).await?;
/// println!("linked as {}", session.username());
/// # let _ = linked;
/// # Ok(())
/// # }
/// ```
pub struct LinkSession {
    shared: Arc<Shared>,
    overlay: Option<Arc<dyn Overlay>>,
}

struct Shared {
    api: Arc<dyn LinkApi>,
    config: LinkConfig,
    record: Mutex<LinkSnapshot>,
    poll: Mutex<Option<PollHandle>>,
    check_in_flight: AtomicBool,
    status_tx: watch::Sender<LinkStatus>,
    snapshot_tx: watch::Sender<LinkSnapshot>,
}

struct PollHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl LinkSession {
    pub fn new(api: Arc<dyn LinkApi>, config: LinkConfig) -> Self {
        let (status_tx, _) = watch::channel(LinkStatus::Idle);
        let (snapshot_tx, _) = watch::channel(LinkSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                api,
                config,
                record: Mutex::new(LinkSnapshot::default()),
                poll: Mutex::new(None),
                check_in_flight: AtomicBool::new(false),
                status_tx,
                snapshot_tx,
            }),
            overlay: None,
        }
    }

    /// Build a session talking HTTP to the endpoints in `config`.
    pub fn from_config(config: LinkConfig) -> Result<Self> {
        config.validate()?;
        let client = HttpLinkClient::from_config(&config)?;
        Ok(Self::new(Arc::new(client), config))
    }

    /// Attach the overlay that [`teardown`](Self::teardown) should clear.
    pub fn with_overlay(mut self, overlay: Arc<dyn Overlay>) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn config(&self) -> &LinkConfig {
        &self.shared.config
    }

    /// Request a new link code and restart polling for it.
    ///
    /// On success the previous polling cycle (if any) is replaced. On failure
    /// the held code is left as it was, polling stops and the status becomes
    /// [`LinkStatus::Error`].
    pub async fn request_code(&self) {
        self.shared.request_code().await;
    }

    /// Run one link-status check for the held code. No-op without a code.
    pub async fn check_once(&self) {
        self.shared.check_once().await;
    }

    /// Stop polling and clear the overlay.
    ///
    /// Code, token and account survive unless
    /// [`LinkConfig::retain_credentials_on_reset`] is off, in which case the
    /// record returns to its idle defaults. A check already in flight is not
    /// interrupted and still records its outcome afterwards.
    pub fn teardown(&self) {
        let stopped = self.shared.cancel_poll();
        if let Some(overlay) = &self.overlay {
            overlay.clear();
        }
        if !self.shared.config.retain_credentials_on_reset {
            self.shared.update(|record| *record = LinkSnapshot::default());
        }
        debug!(stopped_poll = stopped, "link session torn down");
    }

    /// Same as [`teardown`](Self::teardown).
    pub fn reset(&self) {
        self.teardown();
    }

    pub fn code(&self) -> String {
        self.shared.record().auth_code.clone()
    }

    pub fn token(&self) -> String {
        self.shared.record().token.clone()
    }

    pub fn status(&self) -> LinkStatus {
        self.shared.record().status
    }

    /// Account username, or an empty string.
    pub fn username(&self) -> String {
        self.shared
            .record()
            .account
            .as_ref()
            .and_then(Account::username)
            .unwrap_or_default()
    }

    /// Avatar URL for the linked account, or an empty string.
    pub fn avatar_url(&self) -> String {
        self.shared
            .record()
            .account
            .as_ref()
            .and_then(|account| account.avatar_url(&self.shared.config.avatar_base))
            .unwrap_or_default()
    }

    /// Raw account record, or an empty JSON object.
    pub fn account_object(&self) -> Value {
        self.shared
            .record()
            .account
            .as_ref()
            .map(Account::to_object)
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    pub fn snapshot(&self) -> LinkSnapshot {
        self.shared.record().clone()
    }

    /// Whether a repeating check is currently scheduled.
    pub fn has_active_poll(&self) -> bool {
        self.shared
            .poll_slot()
            .as_ref()
            .is_some_and(|handle| !handle.cancel.is_cancelled() && !handle.task.is_finished())
    }

    /// Subscribe to status transitions.
    pub fn watch_status(&self) -> watch::Receiver<LinkStatus> {
        self.shared.status_tx.subscribe()
    }

    /// Subscribe to every change of the session record.
    pub fn watch_snapshot(&self) -> watch::Receiver<LinkSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    /// Wait until a token has been issued and the account request finished.
    ///
    /// Only a link of the code held at that moment counts; credentials left
    /// over from an earlier code do not. Returns the snapshot at that point.
    /// If the account request failed, `account` is whatever was held before.
    ///
    /// # Errors
    ///
    /// [`LinkError::Timeout`] if `timeout` elapses first.
    pub async fn wait_until_linked(&self, timeout: Duration) -> Result<LinkSnapshot> {
        let mut rx = self.watch_snapshot();
        let wait = async move {
            loop {
                {
                    let current = rx.borrow_and_update();
                    if current.link_settled() {
                        return current.clone();
                    }
                }
                if rx.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| LinkError::Timeout(timeout.as_millis() as u64))
    }
}

impl Drop for LinkSession {
    fn drop(&mut self) {
        self.shared.cancel_poll();
    }
}

impl Shared {
    fn record(&self) -> MutexGuard<'_, LinkSnapshot> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn poll_slot(&self) -> MutexGuard<'_, Option<PollHandle>> {
        self.poll.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate the record and broadcast the result.
    fn update<F>(&self, mutate: F)
    where
        F: FnOnce(&mut LinkSnapshot),
    {
        let snapshot = {
            let mut record = self.record();
            mutate(&mut record);
            record.clone()
        };
        self.status_tx.send_replace(snapshot.status);
        self.snapshot_tx.send_replace(snapshot);
    }

    fn set_status(&self, status: LinkStatus) {
        self.update(|record| record.status = status);
    }

    async fn request_code(self: &Arc<Self>) {
        self.set_status(LinkStatus::Fetching);
        match self.api.request_code().await {
            Ok(body) => {
                let code = body.link_code();
                info!(code = %code, "link code issued");
                self.update(|record| {
                    record.auth_code = code;
                    record.code_issued_at = Some(Utc::now());
                    record.linked_at = None;
                    record.account_fetched_at = None;
                    record.status = LinkStatus::Waiting;
                });
                self.start_polling();
            }
            Err(e) => {
                warn!(error = %e, transport = e.is_transport(), "link code request failed");
                self.cancel_poll();
                self.set_status(LinkStatus::Error);
            }
        }
    }

    async fn check_once(&self) {
        let code = {
            let record = self.record();
            if record.auth_code.is_empty() {
                return;
            }
            record.auth_code.clone()
        };

        let _in_flight = if self.config.single_flight_checks {
            match InFlight::acquire(&self.check_in_flight) {
                Some(guard) => Some(guard),
                None => {
                    debug!("link status check already in flight; skipping");
                    return;
                }
            }
        } else {
            None
        };

        self.set_status(LinkStatus::Checking);
        let reply = match self.api.poll_user(&code).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "link status check failed");
                self.set_status(LinkStatus::Error);
                return;
            }
        };

        let Some(token) = reply.linked_token() else {
            debug!(code = %code, "link still pending");
            self.set_status(LinkStatus::Waiting);
            return;
        };

        self.update(|record| {
            record.token = token.clone();
            record.linked_at = Some(Utc::now());
            record.account_fetched_at = None;
            record.status = LinkStatus::Linked;
        });
        self.cancel_poll();
        info!(code = %code, "link code redeemed");

        match self.api.fetch_account(&token).await {
            Ok(raw) => {
                let account = Account::new(raw);
                debug!(username = ?account.username(), "account record fetched");
                self.update(|record| {
                    record.account = Some(account);
                    record.account_fetched_at = Some(Utc::now());
                });
            }
            Err(e) => {
                warn!(error = %e, "account fetch failed");
                self.set_status(LinkStatus::Error);
            }
        }
    }

    /// Replace any running poll with a fresh one.
    fn start_polling(self: &Arc<Self>) {
        let mut slot = self.poll_slot();
        if let Some(previous) = slot.take() {
            previous.cancel.cancel();
        }

        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.config.poll_interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                shared.check_once().await;
            }
            debug!("link poll stopped");
        });
        *slot = Some(PollHandle { cancel, task });
    }

    /// Cancel the current poll. Returns whether one was active.
    ///
    /// The task is signalled, never aborted: a check already running (for
    /// example the one that is cancelling) finishes normally.
    fn cancel_poll(&self) -> bool {
        match self.poll_slot().take() {
            Some(handle) => {
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }
}

/// Marks a status check as outstanding until dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::client::{CodeResponse, UserResponse};
    use crate::overlay::{HeadlessOverlay, OverlayFrame};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use tokio::sync::Notify;

    /// Canned replies per endpoint. Empty queues mean: code request fails,
    /// status check reports "pending", account fetch returns `{}`.
    #[derive(Default)]
    struct ScriptedApi {
        codes: Mutex<VecDeque<Result<CodeResponse>>>,
        users: Mutex<VecDeque<Result<UserResponse>>>,
        accounts: Mutex<VecDeque<Result<Value>>>,
        calls: Mutex<Vec<String>>,
        user_gate: Option<Arc<Notify>>,
    }

    impl ScriptedApi {
        fn code(self, code: &str) -> Self {
            self.codes.lock().unwrap().push_back(Ok(CodeResponse {
                code: Some(json!(code)),
            }));
            self
        }

        fn code_failure(self) -> Self {
            self.codes.lock().unwrap().push_back(Err(offline()));
            self
        }

        fn pending(self) -> Self {
            self.users
                .lock()
                .unwrap()
                .push_back(Ok(UserResponse { token: None }));
            self
        }

        fn linked(self, token: &str) -> Self {
            self.users.lock().unwrap().push_back(Ok(UserResponse {
                token: Some(json!(token)),
            }));
            self
        }

        fn user_failure(self) -> Self {
            self.users.lock().unwrap().push_back(Err(offline()));
            self
        }

        fn account(self, raw: Value) -> Self {
            self.accounts.lock().unwrap().push_back(Ok(raw));
            self
        }

        fn account_failure(self) -> Self {
            self.accounts.lock().unwrap().push_back(Err(offline()));
            self
        }

        fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.user_gate = Some(gate);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, prefix: &str) -> usize {
            self.calls()
                .iter()
                .filter(|call| call.starts_with(prefix))
                .count()
        }
    }

    fn offline() -> LinkError {
        LinkError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "offline",
        ))
    }

    #[async_trait]
    impl LinkApi for ScriptedApi {
        async fn request_code(&self) -> Result<CodeResponse> {
            self.calls.lock().unwrap().push("code".to_string());
            self.codes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(offline()))
        }

        async fn poll_user(&self, code: &str) -> Result<UserResponse> {
            self.calls.lock().unwrap().push(format!("user:{code}"));
            if let Some(gate) = &self.user_gate {
                gate.notified().await;
            }
            self.users
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(UserResponse { token: None }))
        }

        async fn fetch_account(&self, token: &str) -> Result<Value> {
            self.calls.lock().unwrap().push(format!("me:{token}"));
            self.accounts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({})))
        }
    }

    fn session_with(api: Arc<ScriptedApi>) -> LinkSession {
        LinkSession::new(api, LinkConfig::default())
    }

    #[tokio::test]
    async fn accessors_default_to_empty_values() {
        let session = session_with(Arc::new(ScriptedApi::default()));
        assert_eq!(session.code(), "");
        assert_eq!(session.token(), "");
        assert_eq!(session.status(), LinkStatus::Idle);
        assert_eq!(session.username(), "");
        assert_eq!(session.avatar_url(), "");
        assert_eq!(session.account_object(), json!({}));
        assert!(!session.has_active_poll());
    }

    #[tokio::test]
    async fn check_without_code_is_noop() {
        let api = Arc::new(ScriptedApi::default());
        let session = session_with(api.clone());
        session.check_once().await;
        assert_eq!(session.status(), LinkStatus::Idle);
        assert!(api.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn request_code_stores_code_and_starts_polling() {
        let api = Arc::new(ScriptedApi::default().code("ABC123"));
        let session = session_with(api.clone());

        session.request_code().await;

        assert_eq!(session.code(), "ABC123");
        assert_eq!(session.status(), LinkStatus::Waiting);
        assert!(session.has_active_poll());
        assert!(session.snapshot().code_issued_at.is_some());
        assert_eq!(api.calls(), vec!["code".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_code_request_keeps_previous_code_and_stops_polling() {
        let api = Arc::new(ScriptedApi::default().code("FIRST").code_failure());
        let session = session_with(api);

        session.request_code().await;
        assert!(session.has_active_poll());

        session.request_code().await;
        assert_eq!(session.status(), LinkStatus::Error);
        assert_eq!(session.code(), "FIRST");
        assert!(!session.has_active_poll());
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_code_requests_leave_one_poll() {
        let api = Arc::new(ScriptedApi::default().code("ONE").code("TWO").code("THREE"));
        let session = session_with(api.clone());

        session.request_code().await;
        session.request_code().await;
        session.request_code().await;
        assert!(session.has_active_poll());
        assert_eq!(session.code(), "THREE");

        tokio::time::sleep(Duration::from_millis(3_100)).await;
        assert_eq!(api.count("user:"), 1);
        assert_eq!(api.calls().last().map(String::as_str), Some("user:THREE"));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_fires_every_interval_until_linked() {
        let api = Arc::new(
            ScriptedApi::default()
                .code("ABC123")
                .pending()
                .pending()
                .linked("tok_xyz")
                .account(json!({ "username": "alice" })),
        );
        let session = session_with(api.clone());

        session.request_code().await;
        tokio::time::sleep(Duration::from_millis(2_900)).await;
        assert_eq!(api.count("user:"), 0);

        let snapshot = session
            .wait_until_linked(Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(snapshot.status, LinkStatus::Linked);
        assert_eq!(api.count("user:"), 3);
        assert_eq!(session.token(), "tok_xyz");
        assert_eq!(session.username(), "alice");
        assert_eq!(session.avatar_url(), "https://avatars.rotur.dev/alice");

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.count("user:"), 3);
        assert!(!session.has_active_poll());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_check_links_and_cancels_poll() {
        let api = Arc::new(
            ScriptedApi::default()
                .code("ABC123")
                .linked("tok_xyz")
                .account(json!({ "username": "alice", "sys.currency": 4 })),
        );
        let session = session_with(api.clone());

        session.request_code().await;
        session.check_once().await;

        assert_eq!(session.status(), LinkStatus::Linked);
        assert!(!session.has_active_poll());
        assert_eq!(
            api.calls(),
            vec![
                "code".to_string(),
                "user:ABC123".to_string(),
                "me:tok_xyz".to_string()
            ]
        );
        assert_eq!(
            session.account_object(),
            json!({ "username": "alice", "sys.currency": 4 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn pending_check_returns_to_waiting_and_keeps_poll() {
        let api = Arc::new(ScriptedApi::default().code("ABC123").pending());
        let session = session_with(api);

        session.request_code().await;
        session.check_once().await;

        assert_eq!(session.status(), LinkStatus::Waiting);
        assert_eq!(session.code(), "ABC123");
        assert!(session.has_active_poll());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_check_sets_error_and_polling_retries() {
        let api = Arc::new(
            ScriptedApi::default()
                .code("ABC123")
                .user_failure()
                .linked("tok_xyz"),
        );
        let session = session_with(api.clone());

        session.request_code().await;
        session.check_once().await;
        assert_eq!(session.status(), LinkStatus::Error);
        assert!(session.has_active_poll());

        session
            .wait_until_linked(Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(session.status(), LinkStatus::Linked);
        assert_eq!(api.count("user:"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn account_failure_keeps_token() {
        let api = Arc::new(
            ScriptedApi::default()
                .code("ABC123")
                .linked("tok_xyz")
                .account_failure(),
        );
        let session = session_with(api);

        session.request_code().await;
        session.check_once().await;

        assert_eq!(session.status(), LinkStatus::Error);
        assert_eq!(session.token(), "tok_xyz");
        assert_eq!(session.username(), "");
        assert!(!session.has_active_poll());
        let snapshot = session
            .wait_until_linked(Duration::from_secs(1))
            .await
            .unwrap();
        assert!(snapshot.account.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_linked_times_out() {
        let api = Arc::new(ScriptedApi::default().code("ABC123"));
        let session = session_with(api);
        session.request_code().await;

        let err = session
            .wait_until_linked(Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::Timeout(10_000)));
    }

    #[tokio::test(start_paused = true)]
    async fn new_code_waits_for_its_own_link() {
        let api = Arc::new(
            ScriptedApi::default()
                .code("ONE")
                .linked("tok_old")
                .account(json!({ "username": "alice" }))
                .code("TWO"),
        );
        let session = session_with(api.clone());

        session.request_code().await;
        session.check_once().await;
        assert_eq!(session.status(), LinkStatus::Linked);

        session.request_code().await;
        assert_eq!(session.code(), "TWO");
        assert_eq!(session.token(), "tok_old");
        assert!(session.snapshot().linked_at.is_none());

        let err = session
            .wait_until_linked(Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::Timeout(1_000)));
        assert_eq!(session.status(), LinkStatus::Waiting);
        assert_eq!(api.count("user:"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_check_after_relink_is_not_settled() {
        let api = Arc::new(
            ScriptedApi::default()
                .code("ONE")
                .linked("tok_old")
                .account(json!({ "username": "alice" }))
                .code("TWO")
                .user_failure()
                .linked("tok_new")
                .account(json!({ "username": "bob" })),
        );
        let session = session_with(api.clone());

        session.request_code().await;
        session.check_once().await;
        session.request_code().await;
        session.check_once().await;
        assert_eq!(session.status(), LinkStatus::Error);

        let snapshot = session
            .wait_until_linked(Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(snapshot.auth_code, "TWO");
        assert_eq!(snapshot.token, "tok_new");
        assert_eq!(session.username(), "bob");
        assert_eq!(api.count("user:"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_keeps_credentials_by_default() {
        let overlay = Arc::new(HeadlessOverlay::new(800, 600));
        overlay.render(&OverlayFrame::new("data:image/svg+xml;base64,AA==", 128, 0.0));
        let api = Arc::new(
            ScriptedApi::default()
                .code("ABC123")
                .linked("tok_xyz")
                .account(json!({ "username": "alice" })),
        );
        let session = session_with(api).with_overlay(overlay.clone());

        session.request_code().await;
        session.check_once().await;
        session.teardown();

        assert!(!overlay.is_visible());
        assert_eq!(session.code(), "ABC123");
        assert_eq!(session.token(), "tok_xyz");
        assert_eq!(session.username(), "alice");
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_credentials_when_configured() {
        let api = Arc::new(ScriptedApi::default().code("ABC123"));
        let config = LinkConfig::default().with_retain_credentials_on_reset(false);
        let session = LinkSession::new(api, config);

        session.request_code().await;
        assert!(session.has_active_poll());
        session.reset();

        assert!(!session.has_active_poll());
        assert_eq!(session.snapshot(), LinkSnapshot::default());
        assert_eq!(*session.watch_status().borrow(), LinkStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn check_in_flight_during_reset_still_records_outcome() {
        let gate = Arc::new(Notify::new());
        let api = Arc::new(
            ScriptedApi::default()
                .code("ABC123")
                .pending()
                .gated(gate.clone()),
        );
        let config = LinkConfig::default().with_retain_credentials_on_reset(false);
        let session = Arc::new(LinkSession::new(api.clone(), config));
        session.request_code().await;

        let check = tokio::spawn({
            let session = session.clone();
            async move { session.check_once().await }
        });
        tokio::task::yield_now().await;
        assert_eq!(api.count("user:"), 1);

        session.reset();
        assert_eq!(session.snapshot(), LinkSnapshot::default());

        gate.notify_waiters();
        check.await.unwrap();
        assert_eq!(session.status(), LinkStatus::Waiting);
        assert_eq!(session.code(), "");
        assert!(!session.has_active_poll());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_checks_run_without_guard() {
        let gate = Arc::new(Notify::new());
        let api = Arc::new(
            ScriptedApi::default()
                .code("ABC123")
                .pending()
                .pending()
                .gated(gate.clone()),
        );
        let session = Arc::new(session_with(api.clone()));
        session.request_code().await;

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.check_once().await }
        });
        let second = tokio::spawn({
            let session = session.clone();
            async move { session.check_once().await }
        });
        tokio::task::yield_now().await;
        assert_eq!(api.count("user:"), 2);

        gate.notify_waiters();
        first.await.unwrap();
        second.await.unwrap();
        assert_eq!(session.status(), LinkStatus::Waiting);
    }

    #[tokio::test(start_paused = true)]
    async fn single_flight_guard_skips_overlapping_check() {
        let gate = Arc::new(Notify::new());
        let api = Arc::new(
            ScriptedApi::default()
                .code("ABC123")
                .pending()
                .gated(gate.clone()),
        );
        let config = LinkConfig::default().with_single_flight_checks(true);
        let session = Arc::new(LinkSession::new(api.clone(), config));
        session.request_code().await;

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.check_once().await }
        });
        tokio::task::yield_now().await;
        session.check_once().await;
        assert_eq!(api.count("user:"), 1);

        gate.notify_waiters();
        first.await.unwrap();
        assert_eq!(session.status(), LinkStatus::Waiting);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_session_stops_poll() {
        let api = Arc::new(ScriptedApi::default().code("ABC123"));
        let session = session_with(api.clone());
        session.request_code().await;
        drop(session);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(api.count("user:"), 0);
    }

    #[tokio::test]
    async fn status_watch_sees_transitions() {
        let api = Arc::new(ScriptedApi::default().code("ABC123").pending());
        let session = session_with(api);
        let rx = session.watch_status();

        session.request_code().await;
        assert_eq!(*rx.borrow(), LinkStatus::Waiting);
        session.check_once().await;
        assert_eq!(*rx.borrow(), LinkStatus::Waiting);
        session.teardown();
    }
}
