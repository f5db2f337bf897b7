//! The radical catalog: an ordered, validated, read-only table.

use std::collections::{BTreeSet, HashMap, HashSet};

use thiserror::Error;

use crate::domain::Radical;
use crate::seeds::seed_radicals;

/// Multiple choice needs the correct meaning plus three distractors.
pub const MIN_DISTINCT_MEANINGS: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
  #[error("catalog is empty")]
  Empty,
  #[error("radical #{0} has an empty character")]
  EmptyCharacter(usize),
  #[error("duplicate radical character: {0}")]
  Duplicate(String),
  #[error("catalog needs at least {MIN_DISTINCT_MEANINGS} distinct meanings, found {0}")]
  TooFewMeanings(usize),
}

#[derive(Clone, Debug)]
pub struct Catalog {
  radicals: Vec<Radical>,
  by_char: HashMap<String, usize>,
}

impl Catalog {
  /// Validate and index a list of radicals, keeping their order.
  pub fn new(radicals: Vec<Radical>) -> Result<Self, CatalogError> {
    if radicals.is_empty() {
      return Err(CatalogError::Empty);
    }
    let mut by_char = HashMap::with_capacity(radicals.len());
    for (i, r) in radicals.iter().enumerate() {
      if r.character.trim().is_empty() {
        return Err(CatalogError::EmptyCharacter(i));
      }
      if by_char.insert(r.character.clone(), i).is_some() {
        return Err(CatalogError::Duplicate(r.character.clone()));
      }
    }
    let meanings: HashSet<&str> = radicals.iter().map(|r| r.meaning.as_str()).collect();
    if meanings.len() < MIN_DISTINCT_MEANINGS {
      return Err(CatalogError::TooFewMeanings(meanings.len()));
    }
    Ok(Self { radicals, by_char })
  }

  pub fn builtin() -> Result<Self, CatalogError> {
    Self::new(seed_radicals())
  }

  pub fn radicals(&self) -> &[Radical] {
    &self.radicals
  }

  // Never empty once constructed.
  #[allow(clippy::len_without_is_empty)]
  pub fn len(&self) -> usize {
    self.radicals.len()
  }

  pub fn get(&self, character: &str) -> Option<&Radical> {
    self.by_char.get(character).map(|&i| &self.radicals[i])
  }

  pub fn at(&self, index: usize) -> Option<&Radical> {
    self.radicals.get(index)
  }

  /// Distinct meanings in catalog order.
  pub fn distinct_meanings(&self) -> Vec<&str> {
    let mut seen = HashSet::new();
    self.radicals
      .iter()
      .map(|r| r.meaning.as_str())
      .filter(|m| seen.insert(*m))
      .collect()
  }

  /// Radicals whose character is not in `seen`, in catalog order.
  pub fn unseen(&self, seen: &BTreeSet<String>) -> Vec<Radical> {
    self.radicals
      .iter()
      .filter(|r| !seen.contains(&r.character))
      .cloned()
      .collect()
  }
}
