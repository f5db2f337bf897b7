//! Seen-set tracking with write-through persistence.
//!
//! The seen-set lives in a single named slot of a small key-value store as a
//! JSON array of characters. A missing or malformed slot reads as "no
//! progress yet"; it is logged but never surfaced to the learner.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Slot holding the JSON array of seen characters.
pub const SEEN_SLOT: &str = "seenRadicals";

#[derive(Debug, Error)]
pub enum ProgressError {
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
  #[error("store lock poisoned")]
  Poisoned,
}

pub type Result<T> = std::result::Result<T, ProgressError>;

/// Minimal string key-value store, in the spirit of browser local storage.
pub trait KeyValueStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>>;
  fn set(&self, key: &str, value: &str) -> Result<()>;
  fn remove(&self, key: &str) -> Result<()>;
}

/// One `<key>.json` file per slot under `dir`.
///
/// Calls block on `std::fs`. Slots are a few hundred bytes, so callers on the
/// async runtime use it inline; move it behind `spawn_blocking` if slots grow.
pub struct FileStore {
  dir: PathBuf,
  write_lock: Mutex<()>,
}

impl FileStore {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into(), write_lock: Mutex::new(()) }
  }

  fn slot_path(&self, key: &str) -> PathBuf {
    self.dir.join(format!("{key}.json"))
  }
}

impl KeyValueStore for FileStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    match fs::read_to_string(self.slot_path(key)) {
      Ok(s) => Ok(Some(s)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let _guard = self.write_lock.lock().map_err(|_| ProgressError::Poisoned)?;
    fs::create_dir_all(&self.dir)?;
    let path = self.slot_path(key);
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, value)?;
    fs::rename(&tmp, &path)?;
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let _guard = self.write_lock.lock().map_err(|_| ProgressError::Poisoned)?;
    match fs::remove_file(self.slot_path(key)) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }
}

/// In-memory store; used by tests and when no progress dir is wanted.
#[derive(Default)]
pub struct MemoryStore {
  slots: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let slots = self.slots.lock().map_err(|_| ProgressError::Poisoned)?;
    Ok(slots.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let mut slots = self.slots.lock().map_err(|_| ProgressError::Poisoned)?;
    slots.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let mut slots = self.slots.lock().map_err(|_| ProgressError::Poisoned)?;
    slots.remove(key);
    Ok(())
  }
}

/// Handle to the learner's seen-set.
///
/// Clones share one in-memory set, so every session and HTTP handler built
/// from the same tracker sees the same progress; the store only ever gets
/// written from that one set.
#[derive(Clone)]
pub struct ProgressTracker {
  store: Arc<dyn KeyValueStore>,
  seen: Arc<Mutex<BTreeSet<String>>>,
}

impl ProgressTracker {
  /// Read the persisted seen-set. Never fails: absent or broken state is empty.
  #[instrument(level = "debug", skip(store))]
  pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
    let seen: BTreeSet<String> = match store.get(SEEN_SLOT) {
      Ok(Some(raw)) => match serde_json::from_str::<Vec<String>>(&raw) {
        Ok(list) => list.into_iter().collect(),
        Err(e) => {
          warn!(target: "progress", error = %e, "Malformed seen-set; starting empty");
          BTreeSet::new()
        }
      },
      Ok(None) => BTreeSet::new(),
      Err(e) => {
        warn!(target: "progress", error = %e, "Could not read seen-set; starting empty");
        BTreeSet::new()
      }
    };
    debug!(target: "progress", seen = seen.len(), "Progress loaded");
    Self { store, seen: Arc::new(Mutex::new(seen)) }
  }

  // A panic while holding the lock cannot leave the set half-updated, so a
  // poisoned lock is still safe to read through.
  fn lock(&self) -> MutexGuard<'_, BTreeSet<String>> {
    self.seen.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Snapshot of the seen characters, sorted.
  pub fn seen(&self) -> BTreeSet<String> {
    self.lock().clone()
  }

  pub fn seen_count(&self) -> usize {
    self.lock().len()
  }

  pub fn is_seen(&self, character: &str) -> bool {
    self.lock().contains(character)
  }

  /// Union `characters` into the seen-set and persist immediately.
  /// The in-memory set keeps the union even if the write fails.
  #[instrument(level = "debug", skip(self, characters))]
  pub fn mark_seen<I, S>(&self, characters: I) -> Result<()>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut seen = self.lock();
    let before = seen.len();
    seen.extend(characters.into_iter().map(Into::into));
    debug!(target: "progress", added = seen.len() - before, total = seen.len(), "Marked seen");
    let list: Vec<&String> = seen.iter().collect();
    let raw = serde_json::to_string(&list)?;
    // Written under the lock so concurrent marks land in order.
    self.store.set(SEEN_SLOT, &raw)
  }

  /// Forget everything, in memory and in the store.
  #[instrument(level = "info", skip(self))]
  pub fn reset(&self) -> Result<()> {
    let mut seen = self.lock();
    seen.clear();
    self.store.remove(SEEN_SLOT)
  }
}
