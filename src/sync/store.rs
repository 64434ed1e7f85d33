//! The session document store.
//!
//! # State Machine
//! ```text
//! Uninitialized ──initialize/load──▶ Ready
//! Ready | Persisted-Local | Save-Failed ──mutation──▶ Dirty
//! Dirty ──800ms quiet──▶ Persisted-Local | Save-Failed
//! ```
//! Publishing is independent of the save state.
//!
//! # Design Decisions
//! - Every mutation clones the document and installs the clone; readers
//!   holding an `Arc` never see a half-applied edit
//! - Local saves are debounced by a background task; each mutation resets it
//! - Snapshots (document, locale, save status, page chrome) go out on a
//!   `watch` channel for presentation layers. They are built under the state
//!   lock and sent after it is released, so a subscriber holding a borrow can
//!   still call the store's readers

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, Instant};

use crate::document::bilingual::{translate, Locale};
use crate::document::edit::{self, EditError};
use crate::document::path::{set_path_in_place, FieldPath, PathError};
use crate::document::coerce_object;
use crate::sync::chrome::PageChrome;
use crate::sync::loader::ConfigLoader;
use crate::sync::local::{export_document, save_document, LocalStore, LocalStoreError};
use crate::sync::remote::{PublishError, RemotePublisher};

/// Quiet period before a burst of edits is saved locally.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Ready,
    Dirty,
    PersistedLocal,
    SaveFailed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveStatus {
    pub unsaved: bool,
    pub last_saved_at: Option<SystemTime>,
    pub save_error: Option<String>,
    /// The last save failed on the storage quota.
    pub quota_exceeded: bool,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("config not loaded yet")]
    NotReady,

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Local(#[from] LocalStoreError),
}

/// What subscribers see after every change.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Increases with every broadcast; a stale send never replaces a newer one.
    pub sequence: u64,
    pub config: Option<Arc<Value>>,
    pub locale: Locale,
    pub status: SaveStatus,
    pub chrome: Option<PageChrome>,
}

struct State {
    config: Option<Arc<Value>>,
    locale: Locale,
    status: SaveStatus,
    /// Bumped on every mutation; a save only clears `unsaved` if nothing
    /// changed while it was writing.
    revision: u64,
    sequence: u64,
}

struct Shared {
    state: Mutex<State>,
    local: Arc<dyn LocalStore>,
    publisher: Option<RemotePublisher>,
    snapshot: watch::Sender<Snapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Capture the state for subscribers. Call with the lock held.
    fn snapshot(state: &mut State) -> Snapshot {
        state.sequence += 1;
        let chrome = state
            .config
            .as_deref()
            .map(|doc| PageChrome::derive(doc, state.locale));
        Snapshot {
            sequence: state.sequence,
            config: state.config.clone(),
            locale: state.locale,
            status: state.status.clone(),
            chrome,
        }
    }

    /// Send a snapshot. Must be called without the state lock.
    fn broadcast(&self, next: Snapshot) {
        self.snapshot.send_if_modified(|current| {
            if next.sequence > current.sequence {
                *current = next;
                true
            } else {
                false
            }
        });
    }

    fn persist(&self) -> Result<(), StoreError> {
        let (doc, revision) = {
            let state = self.lock();
            let doc = state.config.clone().ok_or(StoreError::NotReady)?;
            (doc, state.revision)
        };

        let result = save_document(self.local.as_ref(), &doc);

        let mut state = self.lock();
        let current = state.revision == revision;
        match &result {
            Ok(()) => {
                state.status.last_saved_at = Some(SystemTime::now());
                if current {
                    state.status.unsaved = false;
                    state.status.save_error = None;
                    state.status.quota_exceeded = false;
                }
                tracing::debug!(revision = revision, "Saved document locally");
            }
            Err(e) => {
                if current {
                    state.status.save_error = Some(e.to_string());
                    state.status.quota_exceeded = e.is_quota();
                }
                tracing::warn!(revision = revision, error = %e, "Local save failed");
            }
        }
        let snapshot = Shared::snapshot(&mut state);
        drop(state);
        self.broadcast(snapshot);

        result.map_err(Into::into)
    }
}

/// Process-wide holder of the effective document.
///
/// Must be created inside a Tokio runtime (it spawns the save task).
/// Dropping the store flushes a pending save.
pub struct ConfigStore {
    shared: Arc<Shared>,
    dirty: mpsc::UnboundedSender<()>,
}

impl ConfigStore {
    pub fn new(local: Arc<dyn LocalStore>, publisher: Option<RemotePublisher>) -> Self {
        Self::with_debounce(local, publisher, SAVE_DEBOUNCE)
    }

    pub fn with_debounce(
        local: Arc<dyn LocalStore>,
        publisher: Option<RemotePublisher>,
        debounce: Duration,
    ) -> Self {
        let state = State {
            config: None,
            locale: Locale::default(),
            status: SaveStatus::default(),
            revision: 0,
            sequence: 0,
        };
        let (snapshot, _) = watch::channel(Snapshot {
            sequence: 0,
            config: None,
            locale: state.locale,
            status: SaveStatus::default(),
            chrome: None,
        });
        let shared = Arc::new(Shared {
            state: Mutex::new(state),
            local,
            publisher,
            snapshot,
        });

        let (dirty, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_persister(shared.clone(), rx, debounce));

        Self { shared, dirty }
    }

    /// Install a freshly loaded document. The locale comes from `site.lang`.
    pub fn initialize(&self, doc: Value) {
        let doc = coerce_object(doc);
        let mut state = self.shared.lock();
        state.locale = Locale::from_document(&doc);
        state.config = Some(Arc::new(doc));
        state.status = SaveStatus::default();
        let snapshot = Shared::snapshot(&mut state);
        drop(state);
        tracing::info!(locale = %snapshot.locale, "Config ready");
        self.shared.broadcast(snapshot);
    }

    /// Run `loader` and install its result.
    pub async fn load(&self, loader: &ConfigLoader) {
        let doc = loader.load().await;
        self.initialize(doc);
    }

    /// The current document, `None` before it is loaded.
    pub fn config(&self) -> Option<Arc<Value>> {
        self.shared.lock().config.clone()
    }

    pub fn locale(&self) -> Locale {
        self.shared.lock().locale
    }

    /// Switch the rendered locale. The document is not touched.
    pub fn set_locale(&self, locale: Locale) {
        let mut state = self.shared.lock();
        state.locale = locale;
        let snapshot = Shared::snapshot(&mut state);
        drop(state);
        self.shared.broadcast(snapshot);
    }

    pub fn translate(&self, value: &Value) -> String {
        translate(value, self.locale())
    }

    pub fn status(&self) -> SaveStatus {
        self.shared.lock().status.clone()
    }

    pub fn phase(&self) -> Phase {
        let state = self.shared.lock();
        match (&state.config, &state.status) {
            (None, _) => Phase::Uninitialized,
            (Some(_), s) if s.unsaved && s.save_error.is_some() => Phase::SaveFailed,
            (Some(_), s) if s.unsaved => Phase::Dirty,
            (Some(_), s) if s.last_saved_at.is_some() => Phase::PersistedLocal,
            (Some(_), _) => Phase::Ready,
        }
    }

    pub fn chrome(&self) -> Option<PageChrome> {
        let state = self.shared.lock();
        state.config.as_deref().map(|doc| PageChrome::derive(doc, state.locale))
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.shared.snapshot.subscribe()
    }

    /// Set the value at `path`, creating (or replacing) intermediate objects.
    pub fn update<P>(&self, path: P, value: Value) -> Result<(), StoreError>
    where
        P: TryInto<FieldPath, Error = PathError>,
    {
        let path = path.try_into()?;
        self.edit(|doc| {
            set_path_in_place(doc, &path, value);
            Ok(())
        })
    }

    /// Apply `f` to a copy of the document and install the copy.
    ///
    /// The store is locked while `f` runs; `f` must not call back into it.
    pub fn edit<R, F>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Value) -> Result<R, EditError>,
    {
        let mut state = self.shared.lock();
        let current = state.config.as_deref().ok_or(StoreError::NotReady)?;
        let mut next = current.clone();
        let out = f(&mut next)?;
        let snapshot = install(&mut state, next);
        drop(state);
        self.shared.broadcast(snapshot);
        let _ = self.dirty.send(());
        Ok(out)
    }

    /// Replace the whole document (import).
    pub fn replace(&self, doc: Value) -> Result<(), StoreError> {
        self.edit(move |current| {
            *current = coerce_object(doc);
            Ok(())
        })
    }

    pub fn ensure_section(&self, name: &str) -> Result<(), StoreError> {
        self.edit(|doc| edit::ensure_section(doc, name).map(|_| ()))
    }

    pub fn set_section_enabled(&self, section: &str, enabled: bool) -> Result<(), StoreError> {
        self.edit(|doc| edit::set_section_enabled(doc, section, enabled))
    }

    pub fn set_section_text(&self, section: &str, field: &str, locale: Locale, text: &str) -> Result<(), StoreError> {
        self.edit(|doc| edit::set_section_text(doc, section, field, locale, text))
    }

    pub fn set_section_color(&self, section: &str, role: &str, color: &str) -> Result<(), StoreError> {
        self.edit(|doc| edit::set_section_color(doc, section, role, color))
    }

    pub fn set_theme_color(&self, role: &str, color: &str) -> Result<(), StoreError> {
        self.edit(|doc| edit::set_theme_color(doc, role, color))
    }

    pub fn ensure_page(&self, key: &str) -> Result<(), StoreError> {
        self.edit(|doc| edit::ensure_page(doc, key).map(|_| ()))
    }

    pub fn set_page_text(&self, page: &str, field: &str, locale: Locale, text: &str) -> Result<(), StoreError> {
        self.edit(|doc| edit::set_page_text(doc, page, field, locale, text))
    }

    pub fn set_page_value(&self, page: &str, field: &str, value: Value) -> Result<(), StoreError> {
        self.edit(|doc| edit::set_page_value(doc, page, field, value))
    }

    /// Append to the list at `list`, returning the new index.
    pub fn push_item<P>(&self, list: P, item: Value) -> Result<usize, StoreError>
    where
        P: TryInto<FieldPath, Error = PathError>,
    {
        let list = list.try_into()?;
        self.edit(|doc| edit::push_item(doc, &list, item))
    }

    pub fn insert_item<P>(&self, list: P, index: usize, item: Value) -> Result<(), StoreError>
    where
        P: TryInto<FieldPath, Error = PathError>,
    {
        let list = list.try_into()?;
        self.edit(|doc| edit::insert_item(doc, &list, index, item))
    }

    pub fn remove_item<P>(&self, list: P, index: usize) -> Result<Value, StoreError>
    where
        P: TryInto<FieldPath, Error = PathError>,
    {
        let list = list.try_into()?;
        self.edit(|doc| edit::remove_item(doc, &list, index))
    }

    pub fn move_item<P>(&self, list: P, from: usize, to: usize) -> Result<(), StoreError>
    where
        P: TryInto<FieldPath, Error = PathError>,
    {
        let list = list.try_into()?;
        self.edit(|doc| edit::move_item(doc, &list, from, to))
    }

    pub fn swap_items<P>(&self, list: P, a: usize, b: usize) -> Result<(), StoreError>
    where
        P: TryInto<FieldPath, Error = PathError>,
    {
        let list = list.try_into()?;
        self.edit(|doc| edit::swap_items(doc, &list, a, b))
    }

    /// Set `field` (relative to the item) on the item at `index`.
    pub fn set_item_field<P, F>(&self, list: P, index: usize, field: F, value: Value) -> Result<(), StoreError>
    where
        P: TryInto<FieldPath, Error = PathError>,
        F: TryInto<FieldPath, Error = PathError>,
    {
        let list = list.try_into()?;
        let field = field.try_into()?;
        self.edit(|doc| edit::set_item_field(doc, &list, index, &field, value))
    }

    pub fn set_item_text<P>(
        &self,
        list: P,
        index: usize,
        field: &str,
        locale: Locale,
        text: &str,
    ) -> Result<(), StoreError>
    where
        P: TryInto<FieldPath, Error = PathError>,
    {
        let list = list.try_into()?;
        self.edit(|doc| edit::set_item_text(doc, &list, index, field, locale, text))
    }

    pub fn add_custom_block(&self) -> Result<usize, StoreError> {
        self.edit(edit::add_custom_block)
    }

    /// Write the current document to local storage now.
    pub fn persist_locally(&self) -> Result<(), StoreError> {
        self.shared.persist()
    }

    /// Send the current document to the remote store.
    pub async fn publish(&self) -> Result<(), PublishError> {
        let doc = self.config().ok_or(PublishError::NoConfig)?;
        let publisher = self.shared.publisher.as_ref().ok_or(PublishError::NotConfigured)?;
        publisher.publish(&doc).await
    }

    /// Write the current document, pretty-printed, to `path`.
    pub fn export_to(&self, path: &Path) -> Result<(), StoreError> {
        let doc = self.config().ok_or(StoreError::NotReady)?;
        export_document(&doc, path)?;
        Ok(())
    }
}

fn install(state: &mut State, next: Value) -> Snapshot {
    state.config = Some(Arc::new(next));
    state.revision += 1;
    state.status.unsaved = true;
    state.status.save_error = None;
    state.status.quota_exceeded = false;
    Shared::snapshot(state)
}

/// Save once per burst: each notification pushes the deadline back.
async fn run_persister(shared: Arc<Shared>, mut dirty: mpsc::UnboundedReceiver<()>, debounce: Duration) {
    while dirty.recv().await.is_some() {
        let deadline = sleep(debounce);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                () = &mut deadline => break,
                msg = dirty.recv() => match msg {
                    Some(()) => deadline.as_mut().reset(Instant::now() + debounce),
                    None => break,
                },
            }
        }
        // Failures are recorded in the save status.
        let _ = shared.persist();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::local::MemoryLocalStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingStore {
        inner: MemoryLocalStore,
        writes: AtomicUsize,
    }

    impl LocalStore for CountingStore {
        fn read(&self) -> Result<Option<String>, LocalStoreError> {
            self.inner.read()
        }
        fn write(&self, text: &str) -> Result<(), LocalStoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.write(text)
        }
    }

    fn ready_store(local: Arc<dyn LocalStore>) -> ConfigStore {
        let store = ConfigStore::new(local, None);
        store.initialize(json!({
            "site": { "lang": "ar", "title": { "en": "Acme", "ar": "أكمي" } },
            "sections": { "services": { "items": [{ "n": 1 }, { "n": 2 }] } }
        }));
        store
    }

    #[tokio::test]
    async fn test_uninitialized() {
        let store = ConfigStore::new(Arc::new(MemoryLocalStore::new()), None);
        assert_eq!(store.phase(), Phase::Uninitialized);
        assert!(store.config().is_none());
        assert!(matches!(store.update("site.title", json!("x")), Err(StoreError::NotReady)));
        assert!(matches!(store.publish().await, Err(PublishError::NoConfig)));
    }

    #[tokio::test]
    async fn test_initialize_sets_locale() {
        let store = ready_store(Arc::new(MemoryLocalStore::new()));
        assert_eq!(store.phase(), Phase::Ready);
        assert_eq!(store.locale(), Locale::Ar);
        assert_eq!(store.translate(&json!({ "en": "Hi", "ar": "" })), "Hi");
        assert_eq!(store.translate(&json!(42)), "");
    }

    #[tokio::test]
    async fn test_update_installs_a_copy() {
        let store = ready_store(Arc::new(MemoryLocalStore::new()));
        let before = store.config().unwrap();

        store.update("theme.typography.fontFamily", json!("Cairo")).unwrap();
        store.update(["site", "title"].as_slice(), json!("Plain")).unwrap();

        let after = store.config().unwrap();
        assert!(before.get("theme").is_none());
        assert_eq!(after["theme"]["typography"]["fontFamily"], "Cairo");
        assert_eq!(after["site"]["title"], "Plain");
        assert_eq!(store.phase(), Phase::Dirty);
        assert!(store.status().unsaved);
    }

    #[tokio::test]
    async fn test_set_locale_leaves_document() {
        let store = ready_store(Arc::new(MemoryLocalStore::new()));
        let before = store.config().unwrap();
        store.set_locale(Locale::En);
        assert_eq!(store.locale(), Locale::En);
        assert!(Arc::ptr_eq(&before, &store.config().unwrap()));
        assert!(!store.status().unsaved);
        assert_eq!(store.chrome().unwrap().title.as_deref(), Some("Acme"));
    }

    #[tokio::test]
    async fn test_list_helpers() {
        let store = ready_store(Arc::new(MemoryLocalStore::new()));
        let list = "sections.services.items";
        assert_eq!(store.push_item(list, json!({ "n": 3 })).unwrap(), 2);
        store.move_item(list, 2, 0).unwrap();
        store.swap_items(list, 1, 2).unwrap();
        let removed = store.remove_item(list, 0).unwrap();
        assert_eq!(removed, json!({ "n": 3 }));
        assert_eq!(store.config().unwrap()["sections"]["services"]["items"], json!([{ "n": 2 }, { "n": 1 }]));

        store.set_item_field(list, 1, "photo.url", json!("/team/1.png")).unwrap();
        assert_eq!(store.config().unwrap()["sections"]["services"]["items"][1]["photo"]["url"], "/team/1.png");
        assert!(matches!(
            store.set_item_field(list, 9, "photo.url", json!("x")),
            Err(StoreError::Edit(EditError::OutOfBounds { .. }))
        ));

        assert!(matches!(store.remove_item(list, 9), Err(StoreError::Edit(EditError::OutOfBounds { .. }))));
        assert!(matches!(store.set_section_color("hero", "bg", "red"), Err(StoreError::Edit(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_saves_once() {
        let local = Arc::new(CountingStore::default());
        let store = ready_store(local.clone());

        for i in 0..10 {
            store.update("site.footerText", json!(i)).unwrap();
            sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(local.writes.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(800)).await;
        assert_eq!(local.writes.load(Ordering::SeqCst), 1);
        assert_eq!(store.phase(), Phase::PersistedLocal);
        let saved: Value = serde_json::from_str(&local.read().unwrap().unwrap()).unwrap();
        assert_eq!(saved["site"]["footerText"], 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_edit_resets_the_timer() {
        let local = Arc::new(CountingStore::default());
        let store = ready_store(local.clone());

        store.update("site.footerText", json!("a")).unwrap();
        sleep(Duration::from_millis(500)).await;
        store.update("site.footerText", json!("b")).unwrap();
        sleep(Duration::from_millis(500)).await;
        assert_eq!(local.writes.load(Ordering::SeqCst), 0);
        assert_eq!(store.phase(), Phase::Dirty);

        sleep(Duration::from_millis(400)).await;
        assert_eq!(local.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_failure_is_reported() {
        let store = ready_store(Arc::new(MemoryLocalStore::with_quota(16)));
        store.update("site.logo", json!("data:image/png;base64,AAAAAAAAAAAAAAAA")).unwrap();
        sleep(Duration::from_millis(900)).await;

        let status = store.status();
        assert!(status.unsaved);
        assert!(status.quota_exceeded);
        assert!(status.save_error.is_some());
        assert_eq!(store.phase(), Phase::SaveFailed);

        // The next edit clears the error until the next attempt.
        store.update("site.logo", json!("")).unwrap();
        assert_eq!(store.status().save_error, None);
    }

    #[tokio::test]
    async fn test_persist_locally_is_immediate() {
        let local = Arc::new(MemoryLocalStore::new());
        let store = ready_store(local.clone());
        store.set_section_enabled("hero", false).unwrap();
        store.persist_locally().unwrap();
        assert_eq!(store.phase(), Phase::PersistedLocal);
        let saved: Value = serde_json::from_str(&local.read().unwrap().unwrap()).unwrap();
        assert_eq!(saved["sections"]["hero"]["enabled"], false);
    }

    #[tokio::test]
    async fn test_load_from_defaults_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"site":{"title":"A"}}"#).unwrap();
        let loader = ConfigLoader::new().with_defaults(crate::sync::source::FileSource::new(file.path()));

        let store = ConfigStore::new(Arc::new(MemoryLocalStore::new()), None);
        store.load(&loader).await;

        let doc = store.config().unwrap();
        assert_eq!(*doc, crate::document::migrate(json!({ "site": { "title": "A" } })));
        assert!(doc.pointer("/sections/contact").is_none());
        assert_eq!(store.phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn test_publish_without_remote() {
        let store = ready_store(Arc::new(MemoryLocalStore::new()));
        assert!(matches!(store.publish().await, Err(PublishError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = ready_store(Arc::new(MemoryLocalStore::new()));
        let mut rx = store.subscribe();
        store.set_theme_color("primary", "#123456").unwrap();
        rx.changed().await.unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert!(snapshot.status.unsaved);
        assert_eq!(snapshot.chrome.unwrap().theme_color.as_deref(), Some("#123456"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_readers_work_while_a_snapshot_is_borrowed() {
        let store = Arc::new(ready_store(Arc::new(MemoryLocalStore::new())));
        let rx = store.subscribe();
        let borrowed = rx.borrow();

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || store.update("site.title", json!("Busy")))
        };

        // The writer is parked on the channel until the borrow ends.
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while store.config().unwrap()["site"]["title"] != "Busy" {
            assert!(std::time::Instant::now() < deadline, "edit never landed");
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(store.locale(), Locale::Ar);
        assert_eq!(store.translate(&json!({ "en": "Hi", "ar": "أهلا" })), "أهلا");
        assert!(store.chrome().is_some());
        assert!(borrowed.config.as_ref().unwrap()["site"]["title"].is_object());

        drop(borrowed);
        writer.join().unwrap().unwrap();
        assert_eq!(rx.borrow().config.as_ref().unwrap()["site"]["title"], "Busy");
    }

    #[tokio::test]
    async fn test_snapshots_carry_increasing_sequence() {
        let store = ready_store(Arc::new(MemoryLocalStore::new()));
        let rx = store.subscribe();
        let first = rx.borrow().sequence;
        store.set_locale(Locale::En);
        store.update("site.logo", json!("/logo.svg")).unwrap();
        assert_eq!(rx.borrow().sequence, first + 2);
        assert_eq!(rx.borrow().locale, Locale::En);
    }
}
