// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The persistence controller: the one handle the rest of the SDK talks to.
//!
//! Every operation is a single closure on the serialized connection, so
//! operations execute one at a time in submission order no matter how many
//! tasks share the controller.
//!
//! Reads never fail. A store that is closed, or a query that errors, yields an
//! empty result and a `warn!` event. Writes return `Err(BurrowError)` instead.
//! Deleting something that is already gone is `Ok`.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use tracing::{debug, warn};

use burrow_config::BurrowConfig;
use burrow_config::model::{RetentionConfig, StorageConfig};
use burrow_core::time::days_before;
use burrow_core::{BurrowError, HealthStatus, PluginAdapter, StorageAdapter};

use crate::adapter::SqliteStorage;
use crate::database::Database;
use crate::models::{
    Breadcrumb, Command, ConsumerInfo, Cookie, ForwardRecord, Message, NotificationMode,
    PersistenceOperation, ProductBag, Segment, Session, StandaloneCommand, StandaloneMessage,
    StandaloneUpload, Upload, UserNotification,
};
use crate::queries::maintenance::SweepReport;
use crate::queries::uploads::Pipeline;
use crate::queries::{
    breadcrumbs, commands, consumer_info, forward_records, maintenance, messages,
    notifications, product_bags, segments, sessions, standalone, uploads,
};

/// Write generation of one memo cache.
///
/// Writers bump it and drop the cached value under one lock once their
/// statement has landed. A fetch fills the cache only if the generation it
/// saw before reading is still current, so a value read before a delete can
/// never be cached after it.
#[derive(Default)]
struct CacheGeneration(Mutex<u64>);

impl CacheGeneration {
    fn lock(&self) -> MutexGuard<'_, u64> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current(&self) -> u64 {
        *self.lock()
    }

    fn invalidate(&self, drop_cached: impl FnOnce()) {
        let mut generation = self.lock();
        *generation += 1;
        drop_cached();
    }

    fn fill_if_unchanged(&self, seen: u64, fill: impl FnOnce()) {
        let generation = self.lock();
        if *generation == seen {
            fill();
        }
    }
}

pub struct PersistenceController {
    storage: SqliteStorage,
    retention: RetentionConfig,
    consumer_info: ArcSwapOption<ConsumerInfo>,
    consumer_info_generation: CacheGeneration,
    product_bags: DashMap<String, ProductBag>,
    product_bags_generation: CacheGeneration,
}

impl PersistenceController {
    /// Create a controller over a closed store. Call [`open`](Self::open) first.
    pub fn new(storage: StorageConfig, retention: RetentionConfig) -> Self {
        Self {
            storage: SqliteStorage::new(storage),
            retention,
            consumer_info: ArcSwapOption::empty(),
            consumer_info_generation: CacheGeneration::default(),
            product_bags: DashMap::new(),
            product_bags_generation: CacheGeneration::default(),
        }
    }

    pub fn from_config(config: &BurrowConfig) -> Self {
        Self::new(config.storage.clone(), config.retention.clone())
    }

    pub fn retention(&self) -> &RetentionConfig {
        &self.retention
    }

    pub fn database_path(&self) -> &str {
        &self.storage.config().database_path
    }

    /// Run a read. Any failure is logged and resolves to the empty value.
    async fn read<T, F, Fut>(&self, operation: &'static str, f: F) -> T
    where
        T: Default,
        F: FnOnce(Database) -> Fut,
        Fut: Future<Output = Result<T, BurrowError>>,
    {
        let result = match self.storage.database().await {
            Ok(db) => f(db).await,
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            warn!(operation, error = %e, "read failed, returning empty result");
            T::default()
        })
    }

    async fn write<T, F, Fut>(&self, f: F) -> Result<T, BurrowError>
    where
        F: FnOnce(Database) -> Fut,
        Fut: Future<Output = Result<T, BurrowError>>,
    {
        let db = self.storage.database().await?;
        f(db).await
    }

    // --- Lifecycle ---

    /// Open the store. Returns whether it is ready; a failure is logged, not raised.
    pub async fn open(&self) -> bool {
        match self.storage.open().await {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %self.database_path(), error = %e, "store failed to open, running degraded");
                false
            }
        }
    }

    /// Close the store and drop the caches. Closing a closed store is a no-op.
    pub async fn close(&self) -> Result<(), BurrowError> {
        self.purge_memory();
        self.storage.close().await
    }

    pub async fn is_open(&self) -> bool {
        self.storage.is_open().await
    }

    /// Drop the in-memory caches. Never touches the store.
    pub fn purge_memory(&self) {
        self.consumer_info.store(None);
        self.product_bags.clear();
        debug!("in-memory caches purged");
    }

    pub async fn health_check(&self) -> HealthStatus {
        self.storage
            .health_check()
            .await
            .unwrap_or_else(|e| HealthStatus::Unhealthy(e.to_string()))
    }

    // --- Sessions ---

    pub async fn save_session(&self, session: &Session) -> Result<i64, BurrowError> {
        self.write(|db| async move { sessions::save_session(&db, session).await })
            .await
    }

    /// Replace a stored session. An unsaved or deleted session is ignored.
    pub async fn update_session(&self, session: &Session) -> Result<(), BurrowError> {
        self.write(|db| async move { sessions::update_session(&db, session).await })
            .await
            .map(|_| ())
    }

    /// Finalize `session` and remember it as the previous session.
    pub async fn archive_session(&self, session: &Session) -> Result<Session, BurrowError> {
        self.write(|db| async move { sessions::archive_session(&db, session).await })
            .await
    }

    pub async fn delete_session(&self, session: &Session) -> Result<(), BurrowError> {
        let Some(id) = session.id else {
            return Ok(());
        };
        self.write(|db| async move { sessions::delete_session(&db, id).await })
            .await
    }

    pub async fn fetch_sessions(&self) -> Vec<Session> {
        self.read("fetch_sessions", |db| async move {
            sessions::fetch_sessions(&db).await
        })
        .await
    }

    pub async fn fetch_session(&self, id: i64) -> Option<Session> {
        self.read("fetch_session", |db| async move {
            sessions::fetch_session(&db, id).await
        })
        .await
    }

    pub async fn fetch_previous_session(&self) -> Option<Session> {
        self.read("fetch_previous_session", |db| async move {
            sessions::fetch_previous_session(&db).await
        })
        .await
    }

    pub async fn delete_previous_session(&self) -> Result<(), BurrowError> {
        self.write(|db| async move { sessions::delete_previous_session(&db).await })
            .await
    }

    pub async fn fetch_session_from_crash(&self) -> Option<Session> {
        self.read("fetch_session_from_crash", |db| async move {
            sessions::fetch_session_from_crash(&db).await
        })
        .await
    }

    pub async fn fetch_possible_sessions_from_crash(&self) -> Vec<Session> {
        self.read("fetch_possible_sessions_from_crash", |db| async move {
            sessions::fetch_possible_sessions_from_crash(&db).await
        })
        .await
    }

    // --- Messages ---

    pub async fn save_message(&self, message: &Message) -> Result<i64, BurrowError> {
        self.write(|db| async move { messages::insert_message(&db, message).await })
            .await
    }

    pub async fn fetch_messages_in_session(&self, session_id: i64) -> Vec<Message> {
        self.read("fetch_messages_in_session", |db| async move {
            messages::messages_in_session(&db, session_id).await
        })
        .await
    }

    /// Unsent messages of a session that no open upload has claimed.
    pub async fn fetch_messages_for_uploading_in_session(&self, session_id: i64) -> Vec<Message> {
        self.read("fetch_messages_for_uploading_in_session", |db| async move {
            messages::messages_for_upload_in_session(&db, session_id).await
        })
        .await
    }

    pub async fn fetch_uploaded_messages_in_session(
        &self,
        session_id: i64,
        exclude_network_performance: bool,
    ) -> Vec<Message> {
        self.read("fetch_uploaded_messages_in_session", |db| async move {
            messages::uploaded_messages_in_session(&db, session_id, exclude_network_performance)
                .await
        })
        .await
    }

    pub async fn fetch_session_end_message_in_session(&self, session_id: i64) -> Option<Message> {
        self.read("fetch_session_end_message_in_session", |db| async move {
            messages::session_end_message(&db, session_id).await
        })
        .await
    }

    pub async fn count_messages_for_upload_in_session(&self, session_id: i64) -> usize {
        self.read("count_messages_for_upload_in_session", |db| async move {
            messages::count_for_upload_in_session(&db, session_id).await
        })
        .await
    }

    /// Remove messages and commands whose session no longer exists.
    pub async fn delete_messages_with_no_session(&self) -> Result<usize, BurrowError> {
        self.write(|db| async move { messages::delete_messages_with_no_session(&db).await })
            .await
    }

    pub async fn delete_network_performance_messages(&self) -> Result<usize, BurrowError> {
        self.write(|db| async move { messages::delete_network_performance_messages(&db).await })
            .await
    }

    // --- Uploads ---

    /// Pack `message_ids` into `upload` and claim them.
    ///
    /// Fails with [`BurrowError::AlreadyClaimed`] and writes nothing when any
    /// listed message is missing or already belongs to an open upload.
    pub async fn save_upload(
        &self,
        upload: &Upload,
        message_ids: &[i64],
        operation: PersistenceOperation,
    ) -> Result<i64, BurrowError> {
        self.write(|db| async move {
            uploads::save_upload(&db, upload, message_ids, operation).await
        })
        .await
    }

    pub async fn fetch_uploads_in_session(&self, session_id: i64) -> Vec<Upload> {
        self.read("fetch_uploads_in_session", |db| async move {
            uploads::uploads_in_session(&db, session_id).await
        })
        .await
    }

    pub async fn delete_upload(&self, upload: &Upload) -> Result<(), BurrowError> {
        match upload.id {
            Some(id) => self.delete_upload_id(id).await,
            None => Ok(()),
        }
    }

    pub async fn delete_upload_id(&self, id: i64) -> Result<(), BurrowError> {
        self.write(|db| async move { uploads::delete_upload(&db, Pipeline::Session, id).await })
            .await
    }

    /// Return the members of a failed upload to the uploadable set and drop
    /// the upload. Returns how many messages were released; an upload with no
    /// surviving members is kept for a later retry and yields `0`.
    pub async fn release_upload(&self, pipeline: Pipeline, id: i64) -> Result<usize, BurrowError> {
        self.write(|db| async move { uploads::release_upload(&db, pipeline, id).await })
            .await
    }

    /// Count one more transmission attempt; `None` when the upload is gone.
    pub async fn record_upload_attempt(
        &self,
        pipeline: Pipeline,
        id: i64,
    ) -> Result<Option<u32>, BurrowError> {
        self.write(|db| async move { uploads::record_upload_attempt(&db, pipeline, id).await })
            .await
    }

    // --- Standalone records ---

    pub async fn save_standalone_message(
        &self,
        message: &StandaloneMessage,
    ) -> Result<i64, BurrowError> {
        self.write(|db| async move { standalone::insert_standalone_message(&db, message).await })
            .await
    }

    pub async fn fetch_standalone_messages(&self) -> Vec<StandaloneMessage> {
        self.read("fetch_standalone_messages", |db| async move {
            standalone::standalone_messages(&db).await
        })
        .await
    }

    pub async fn fetch_standalone_messages_for_uploading(&self) -> Vec<StandaloneMessage> {
        self.read("fetch_standalone_messages_for_uploading", |db| async move {
            standalone::standalone_messages_for_upload(&db).await
        })
        .await
    }

    pub async fn delete_standalone_message(
        &self,
        message: &StandaloneMessage,
    ) -> Result<(), BurrowError> {
        let Some(id) = message.id else {
            return Ok(());
        };
        self.write(|db| async move { standalone::delete_standalone_message(&db, id).await })
            .await
    }

    /// Delete all listed standalone messages or none of them.
    pub async fn delete_standalone_message_ids(&self, ids: &[i64]) -> Result<usize, BurrowError> {
        self.write(|db| async move { standalone::delete_standalone_message_ids(&db, ids).await })
            .await
    }

    pub async fn count_standalone_messages(&self) -> usize {
        self.read("count_standalone_messages", |db| async move {
            standalone::count_standalone_messages(&db).await
        })
        .await
    }

    pub async fn save_standalone_upload(
        &self,
        upload: &StandaloneUpload,
        message_ids: &[i64],
        operation: PersistenceOperation,
    ) -> Result<i64, BurrowError> {
        self.write(|db| async move {
            uploads::save_standalone_upload(&db, upload, message_ids, operation).await
        })
        .await
    }

    pub async fn fetch_standalone_uploads(&self) -> Vec<StandaloneUpload> {
        self.read("fetch_standalone_uploads", |db| async move {
            uploads::standalone_uploads(&db).await
        })
        .await
    }

    pub async fn delete_standalone_upload(
        &self,
        upload: &StandaloneUpload,
    ) -> Result<(), BurrowError> {
        match upload.id {
            Some(id) => self.delete_standalone_upload_id(id).await,
            None => Ok(()),
        }
    }

    pub async fn delete_standalone_upload_id(&self, id: i64) -> Result<(), BurrowError> {
        self.write(|db| async move {
            uploads::delete_upload(&db, Pipeline::Standalone, id).await
        })
        .await
    }

    // --- Commands ---

    pub async fn save_command(&self, command: &Command) -> Result<i64, BurrowError> {
        self.write(|db| async move { commands::save_command(&db, command).await })
            .await
    }

    pub async fn fetch_commands_in_session(&self, session_id: i64) -> Vec<Command> {
        self.read("fetch_commands_in_session", |db| async move {
            commands::commands_in_session(&db, session_id).await
        })
        .await
    }

    pub async fn delete_command(&self, command: &Command) -> Result<(), BurrowError> {
        let Some(id) = command.id else {
            return Ok(());
        };
        self.write(|db| async move { commands::delete_command(&db, id).await })
            .await
    }

    pub async fn save_standalone_command(
        &self,
        command: &StandaloneCommand,
    ) -> Result<i64, BurrowError> {
        self.write(|db| async move { commands::save_standalone_command(&db, command).await })
            .await
    }

    pub async fn fetch_standalone_commands(&self) -> Vec<StandaloneCommand> {
        self.read("fetch_standalone_commands", |db| async move {
            commands::standalone_commands(&db).await
        })
        .await
    }

    pub async fn delete_standalone_command(
        &self,
        command: &StandaloneCommand,
    ) -> Result<(), BurrowError> {
        let Some(id) = command.id else {
            return Ok(());
        };
        self.write(|db| async move { commands::delete_standalone_command(&db, id).await })
            .await
    }

    pub async fn delete_standalone_command_ids(&self, ids: &[i64]) -> Result<usize, BurrowError> {
        self.write(|db| async move { commands::delete_standalone_command_ids(&db, ids).await })
            .await
    }

    // --- Forwarding ---

    pub async fn save_forward_record(&self, record: &ForwardRecord) -> Result<i64, BurrowError> {
        self.write(|db| async move { forward_records::insert_forward_record(&db, record).await })
            .await
    }

    pub async fn fetch_forward_records(&self) -> Vec<ForwardRecord> {
        self.read("fetch_forward_records", |db| async move {
            forward_records::forward_records(&db).await
        })
        .await
    }

    pub async fn delete_forward_record_ids(&self, ids: &[i64]) -> Result<usize, BurrowError> {
        self.write(|db| async move { forward_records::delete_forward_record_ids(&db, ids).await })
            .await
    }

    // --- Consumer info ---

    fn invalidate_consumer_info(&self) {
        self.consumer_info_generation
            .invalidate(|| self.consumer_info.store(None));
    }

    /// Replace the consumer info and its cookies. Returns the stored record.
    pub async fn save_consumer_info(&self, info: &ConsumerInfo) -> Result<ConsumerInfo, BurrowError> {
        let saved = self
            .write(|db| async move { consumer_info::save_consumer_info(&db, info).await })
            .await;
        self.invalidate_consumer_info();
        saved
    }

    /// Same wholesale replace as [`save_consumer_info`](Self::save_consumer_info).
    pub async fn update_consumer_info(
        &self,
        info: &ConsumerInfo,
    ) -> Result<ConsumerInfo, BurrowError> {
        self.save_consumer_info(info).await
    }

    pub async fn fetch_consumer_info(&self) -> Option<ConsumerInfo> {
        if let Some(cached) = self.consumer_info.load_full() {
            return Some(ConsumerInfo::clone(&cached));
        }
        let seen = self.consumer_info_generation.current();
        let fetched = self
            .read("fetch_consumer_info", |db| async move {
                consumer_info::fetch_consumer_info(&db).await
            })
            .await;
        if let Some(info) = &fetched {
            self.consumer_info_generation.fill_if_unchanged(seen, || {
                self.consumer_info.store(Some(Arc::new(info.clone())));
            });
        }
        fetched
    }

    pub async fn delete_consumer_info(&self) -> Result<(), BurrowError> {
        let deleted = self
            .write(|db| async move { consumer_info::delete_consumer_info(&db).await })
            .await;
        self.invalidate_consumer_info();
        deleted
    }

    pub async fn fetch_cookies(&self) -> Vec<Cookie> {
        self.read("fetch_cookies", |db| async move {
            consumer_info::fetch_cookies(&db).await
        })
        .await
    }

    pub async fn delete_cookie(&self, cookie: &Cookie) -> Result<(), BurrowError> {
        let Some(id) = cookie.id else {
            return Ok(());
        };
        let deleted = self
            .write(|db| async move { consumer_info::delete_cookie(&db, id).await })
            .await;
        self.invalidate_consumer_info();
        deleted
    }

    // --- Notifications ---

    pub async fn save_user_notification(
        &self,
        notification: &UserNotification,
    ) -> Result<i64, BurrowError> {
        self.write(|db| async move { notifications::save_notification(&db, notification).await })
            .await
    }

    pub async fn update_user_notification(
        &self,
        notification: &UserNotification,
    ) -> Result<(), BurrowError> {
        self.write(|db| async move { notifications::update_notification(&db, notification).await })
            .await
            .map(|_| ())
    }

    pub async fn delete_user_notification(
        &self,
        notification: &UserNotification,
    ) -> Result<(), BurrowError> {
        let Some(id) = notification.id else {
            return Ok(());
        };
        self.write(|db| async move { notifications::delete_notification(&db, id).await })
            .await
    }

    pub async fn fetch_user_notifications(&self) -> Vec<UserNotification> {
        self.read("fetch_user_notifications", |db| async move {
            notifications::notifications(&db).await
        })
        .await
    }

    async fn displayed(&self, mode: NotificationMode, since: Option<f64>) -> Vec<UserNotification> {
        self.read("fetch_displayed_user_notifications", |db| async move {
            notifications::displayed_notifications(&db, mode, since).await
        })
        .await
    }

    pub async fn fetch_displayed_local_user_notifications(&self) -> Vec<UserNotification> {
        self.displayed(NotificationMode::Local, None).await
    }

    pub async fn fetch_displayed_remote_user_notifications(&self) -> Vec<UserNotification> {
        self.displayed(NotificationMode::Remote, None).await
    }

    pub async fn fetch_displayed_local_user_notifications_since(
        &self,
        timestamp: f64,
    ) -> Vec<UserNotification> {
        self.displayed(NotificationMode::Local, Some(timestamp)).await
    }

    pub async fn fetch_displayed_remote_user_notifications_since(
        &self,
        timestamp: f64,
    ) -> Vec<UserNotification> {
        self.displayed(NotificationMode::Remote, Some(timestamp)).await
    }

    /// Latest live displayed notification per campaign within the configured
    /// history window ending at `now`.
    pub async fn fetch_user_notification_campaign_history(&self, now: f64) -> Vec<UserNotification> {
        let since = days_before(now, self.retention.campaign_history_window_days);
        self.read("fetch_user_notification_campaign_history", |db| async move {
            notifications::campaign_history(&db, since, now).await
        })
        .await
    }

    pub async fn delete_expired_user_notifications(&self, now: f64) -> Result<usize, BurrowError> {
        self.write(|db| async move { notifications::delete_expired_notifications(&db, now).await })
            .await
    }

    // --- Product bags ---

    fn invalidate_product_bag(&self, name: &str) {
        self.product_bags_generation.invalidate(|| {
            self.product_bags.remove(name);
        });
    }

    pub async fn save_product_bag(&self, bag: &ProductBag) -> Result<i64, BurrowError> {
        let saved = self
            .write(|db| async move { product_bags::save_product_bag(&db, bag).await })
            .await;
        self.invalidate_product_bag(&bag.name);
        saved
    }

    pub async fn fetch_product_bag(&self, name: &str) -> Option<ProductBag> {
        if let Some(cached) = self.product_bags.get(name) {
            return Some(cached.value().clone());
        }
        let seen = self.product_bags_generation.current();
        let fetched = self
            .read("fetch_product_bag", |db| async move {
                product_bags::fetch_product_bag(&db, name).await
            })
            .await;
        if let Some(bag) = &fetched {
            self.product_bags_generation.fill_if_unchanged(seen, || {
                self.product_bags.insert(bag.name.clone(), bag.clone());
            });
        }
        fetched
    }

    pub async fn fetch_product_bags(&self) -> Vec<ProductBag> {
        self.read("fetch_product_bags", |db| async move {
            product_bags::fetch_product_bags(&db).await
        })
        .await
    }

    pub async fn delete_product_bag(&self, bag: &ProductBag) -> Result<(), BurrowError> {
        let deleted = self
            .write(|db| async move { product_bags::delete_product_bag(&db, &bag.name).await })
            .await;
        self.invalidate_product_bag(&bag.name);
        deleted
    }

    pub async fn delete_all_product_bags(&self) -> Result<usize, BurrowError> {
        let deleted = self
            .write(|db| async move { product_bags::delete_all_product_bags(&db).await })
            .await;
        self.product_bags_generation
            .invalidate(|| self.product_bags.clear());
        deleted
    }

    // --- Segments and breadcrumbs ---

    pub async fn save_segment(&self, segment: &Segment) -> Result<(), BurrowError> {
        self.write(|db| async move { segments::save_segment(&db, segment).await })
            .await
            .map(|_| ())
    }

    pub async fn fetch_segments(&self) -> Vec<Segment> {
        self.read("fetch_segments", |db| async move {
            segments::fetch_segments(&db).await
        })
        .await
    }

    pub async fn delete_segments(&self) -> Result<(), BurrowError> {
        self.write(|db| async move { segments::delete_segments(&db).await })
            .await
    }

    /// Record a breadcrumb derived from `message`, keeping only the newest
    /// `max_breadcrumbs` entries.
    pub async fn save_breadcrumb(
        &self,
        message: &Message,
        session: &Session,
    ) -> Result<i64, BurrowError> {
        let crumb = Breadcrumb::from_message(message, session);
        let max = self.retention.max_breadcrumbs;
        self.write(|db| async move { breadcrumbs::save_breadcrumb(&db, &crumb, max).await })
            .await
    }

    pub async fn fetch_breadcrumbs(&self) -> Vec<Breadcrumb> {
        self.read("fetch_breadcrumbs", |db| async move {
            breadcrumbs::fetch_breadcrumbs(&db).await
        })
        .await
    }

    // --- Maintenance ---

    /// Remove every record stamped strictly before `timestamp`.
    pub async fn delete_records_older_than(&self, timestamp: f64) -> Result<SweepReport, BurrowError> {
        let report = self
            .write(|db| async move { maintenance::delete_records_older_than(&db, timestamp).await })
            .await;
        self.product_bags_generation
            .invalidate(|| self.product_bags.clear());
        let report = report?;
        debug!(cutoff = timestamp, deleted = report.total(), "retention sweep complete");
        Ok(report)
    }

    /// Sweep with the configured maximum record age, measured back from `now`.
    pub async fn apply_retention(&self, now: f64) -> Result<SweepReport, BurrowError> {
        self.delete_records_older_than(days_before(now, self.retention.max_record_age_days))
            .await
    }

    pub async fn table_counts(&self) -> Result<Vec<(&'static str, usize)>, BurrowError> {
        self.write(|db| async move { maintenance::table_counts(&db).await })
            .await
    }

    pub async fn integrity_check(&self) -> Result<Vec<String>, BurrowError> {
        self.write(|db| async move { maintenance::integrity_check(&db).await })
            .await
    }

    pub async fn schema_version(&self) -> Result<Option<i64>, BurrowError> {
        self.write(|db| async move { maintenance::schema_version(&db).await })
            .await
    }
}
