//! Sequential study deck over the catalog.

use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::domain::Radical;
use crate::progress::ProgressTracker;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StudyStep {
  Moved,
  /// The last card was just marked seen.
  Complete,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StudyNavigator {
  index: usize,
}

impl StudyNavigator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn index(&self) -> usize {
    self.index
  }

  pub fn current<'a>(&self, catalog: &'a Catalog) -> Option<&'a Radical> {
    catalog.at(self.index)
  }

  pub fn is_last(&self, catalog: &Catalog) -> bool {
    self.index + 1 >= catalog.len()
  }

  /// Mark the current card seen, then step forward.
  /// Only forward steps mark cards; `retreat` never does.
  pub fn advance(&mut self, catalog: &Catalog, tracker: &ProgressTracker) -> StudyStep {
    if let Some(r) = self.current(catalog) {
      if let Err(e) = tracker.mark_seen([r.character.as_str()]) {
        warn!(target: "study", error = %e, character = %r.character, "Failed to persist seen card");
      }
    }
    if self.is_last(catalog) {
      info!(target: "study", total = catalog.len(), "Study deck complete");
      StudyStep::Complete
    } else {
      self.index += 1;
      StudyStep::Moved
    }
  }

  pub fn retreat(&mut self) {
    self.index = self.index.saturating_sub(1);
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::catalog::tests::small_catalog;
  use crate::progress::MemoryStore;

  #[test]
  fn advance_marks_seen_and_completes_at_the_end() {
    let catalog = small_catalog();
    let tracker = ProgressTracker::load(Arc::new(MemoryStore::default()));
    let mut nav = StudyNavigator::new();

    for i in 0..catalog.len() - 1 {
      assert_eq!(nav.advance(&catalog, &tracker), StudyStep::Moved);
      assert_eq!(nav.index(), i + 1);
    }
    assert!(nav.is_last(&catalog));
    assert_eq!(nav.advance(&catalog, &tracker), StudyStep::Complete);
    assert_eq!(nav.index(), catalog.len() - 1);
    assert_eq!(tracker.seen_count(), catalog.len());
  }

  #[test]
  fn retreat_is_floored_and_never_marks_seen() {
    let catalog = small_catalog();
    let tracker = ProgressTracker::load(Arc::new(MemoryStore::default()));
    let mut nav = StudyNavigator::new();

    nav.retreat();
    assert_eq!(nav.index(), 0);

    nav.advance(&catalog, &tracker);
    nav.advance(&catalog, &tracker);
    assert_eq!(tracker.seen_count(), 2);
    nav.retreat();
    nav.retreat();
    assert_eq!(nav.index(), 0);
    assert_eq!(tracker.seen_count(), 2);
    assert_eq!(nav.current(&catalog).map(|r| r.character.as_str()), Some("人"));
  }
}
