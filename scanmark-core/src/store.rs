//! Annotation store
//!
//! An explicitly owned, single-writer collection of annotations plus the
//! editor selection. Mutations apply in call order and are visible to the
//! next read.

use crate::annotation::{Annotation, AnnotationPatch};
use crate::Result;
use log::{debug, trace, warn};

/// Ordered annotations and at most one selected id
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
    selected_id: Option<u64>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already loaded records with nothing selected
    pub fn from_annotations(annotations: Vec<Annotation>) -> Self {
        Self {
            annotations,
            selected_id: None,
        }
    }

    /// Append a record. Id uniqueness is the caller's responsibility.
    pub fn add(&mut self, annotation: Annotation) {
        trace!("add annotation {} ({})", annotation.id, annotation.class);
        self.annotations.push(annotation);
    }

    /// Merge `patch` into the record with `id`.
    ///
    /// Returns `Ok(false)` when no record has that id. If the merged record
    /// would break an invariant the stored record is left as it was and the
    /// validation error is returned.
    pub fn update(&mut self, id: u64, patch: &AnnotationPatch) -> Result<bool> {
        let Some(slot) = self.annotations.iter_mut().find(|a| a.id == id) else {
            debug!("update ignored: no annotation with id {}", id);
            return Ok(false);
        };

        let mut merged = slot.clone();
        patch.apply(&mut merged);
        merged.validate()?;
        *slot = merged;
        trace!("updated annotation {}", id);
        Ok(true)
    }

    /// Delete the record with `id`, clearing the selection if it pointed at it
    pub fn remove(&mut self, id: u64) -> Option<Annotation> {
        let index = self.annotations.iter().position(|a| a.id == id);
        if self.selected_id == Some(id) {
            self.selected_id = None;
        }
        match index {
            Some(index) => {
                trace!("removed annotation {}", id);
                Some(self.annotations.remove(index))
            }
            None => {
                debug!("remove ignored: no annotation with id {}", id);
                None
            }
        }
    }

    /// Set the selection. A missing id is accepted and reads as no selection
    /// until a record with that id appears.
    pub fn select(&mut self, id: Option<u64>) {
        if let Some(id) = id.filter(|id| !self.contains(*id)) {
            warn!("selecting missing annotation {}", id);
        }
        self.selected_id = id;
    }

    /// Wholesale reset, e.g. when a new frame folder is loaded
    pub fn replace_all(&mut self, annotations: Vec<Annotation>) {
        debug!("replacing {} annotations with {}", self.annotations.len(), annotations.len());
        self.annotations = annotations;
        self.selected_id = None;
    }

    pub fn clear(&mut self) {
        self.replace_all(Vec::new());
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Annotation> {
        self.annotations.iter()
    }

    pub fn get(&self, id: u64) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// The selected id, or `None` when the selection does not name an existing record
    pub fn selected_id(&self) -> Option<u64> {
        self.selected().map(|a| a.id)
    }

    /// The selected record, if the selection is set and still resolves
    pub fn selected(&self) -> Option<&Annotation> {
        let id = self.selected_id?;
        let found = self.get(id);
        if found.is_none() {
            debug!("selection points at missing annotation {}", id);
        }
        found
    }

    /// Consume the store, returning its records
    pub fn into_annotations(self) -> Vec<Annotation> {
        self.annotations
    }
}

impl<'a> IntoIterator for &'a AnnotationStore {
    type Item = &'a Annotation;
    type IntoIter = std::slice::Iter<'a, Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.annotations.iter()
    }
}
