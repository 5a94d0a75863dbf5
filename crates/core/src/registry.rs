//! Annotation registry
//!
//! Owns the canonical set of annotations by id, hands out reference-counted
//! handles that observe changes to their annotation, and tracks pending
//! (uncommitted) annotations so serialization passes can exclude them.
//!
//! The registry is single-owner: all mutation goes through one control flow
//! at a time, and every mutator applies its state change first, then fires
//! the per-reference `changed` signal, the registry-wide `changed` signal,
//! and finally the variant-specific signal, in that order.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use anno_model::{
    Annotation, AnnotationGeometry, AnnotationId, PortableAnnotation, ValidationError,
};
use rand::RngCore;
use tracing::warn;

use crate::remote::{RemoteError, StrokeBackend, StrokePayload};
use crate::serialize::{AnnotationSerializer, SerializedAnnotations};
use crate::signal::{NullarySignal, Signal};

/// Number of random bits in a generated annotation id
const ANNOTATION_ID_BITS: usize = 160;

/// Generate a fresh collision-resistant annotation id
///
/// 160 bits of CSPRNG output, rendered as lowercase hex so ids sort
/// lexicographically.
pub fn make_annotation_id() -> AnnotationId {
    let mut bytes = [0u8; ANNOTATION_ID_BITS / 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Structural registry errors
#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    /// `add` was called with an id already present in the registry
    #[error("annotation id already exists: {0:?}")]
    DuplicateId(AnnotationId),

    /// `update` was called against a deleted reference
    #[error("annotation already deleted: {0:?}")]
    AlreadyDeleted(AnnotationId),
}

/// Resolution state of an [`AnnotationReference`]
#[derive(Debug, Clone)]
pub enum RefValue {
    /// Lookup has not completed yet (asynchronous sources)
    Unresolved,

    /// Resolved to a live annotation
    Resolved(Rc<Annotation>),

    /// The annotation was deleted; terminal for this reference generation
    Deleted,
}

impl RefValue {
    /// The resolved annotation, if live
    pub fn annotation(&self) -> Option<&Rc<Annotation>> {
        match self {
            RefValue::Resolved(annotation) => Some(annotation),
            _ => None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, RefValue::Deleted)
    }
}

/// Reference-counted handle bound to one annotation id
///
/// All handles for the same id share one underlying reference (cloning the
/// `Rc` is the acquire), observe the same value, and are notified through
/// `changed` whenever the registry mutates it. The registry keeps only a
/// weak entry per id, so the registration lapses exactly when the last
/// external handle is dropped.
pub struct AnnotationReference {
    id: AnnotationId,
    value: RefCell<RefValue>,

    /// Fires after the underlying value changes
    pub changed: NullarySignal,
}

impl AnnotationReference {
    fn new(id: AnnotationId, value: RefValue) -> Rc<Self> {
        Rc::new(Self { id, value: RefCell::new(value), changed: NullarySignal::new() })
    }

    /// The id this reference is bound to
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current resolution state
    pub fn value(&self) -> RefValue {
        self.value.borrow().clone()
    }

    /// The resolved annotation, if live
    pub fn annotation(&self) -> Option<Rc<Annotation>> {
        self.value.borrow().annotation().cloned()
    }

    pub fn is_deleted(&self) -> bool {
        self.value.borrow().is_deleted()
    }

    fn set_value(&self, value: RefValue) {
        *self.value.borrow_mut() = value;
    }
}

/// The canonical annotation store
pub struct AnnotationSource {
    annotations: HashMap<AnnotationId, Rc<Annotation>>,
    pending: HashSet<AnnotationId>,
    references: RefCell<HashMap<AnnotationId, Weak<AnnotationReference>>>,
    backend: Option<Rc<dyn StrokeBackend>>,

    /// Fires after any mutation
    pub changed: NullarySignal,

    /// Fires after an annotation is added
    pub child_added: Signal<Rc<Annotation>>,

    /// Fires after an annotation is replaced via `update`
    pub child_updated: Signal<Rc<Annotation>>,

    /// Fires after an annotation is deleted, with its id
    pub child_deleted: Signal<AnnotationId>,
}

impl AnnotationSource {
    /// Create an empty registry with no remote backend
    pub fn new() -> Self {
        Self {
            annotations: HashMap::new(),
            pending: HashSet::new(),
            references: RefCell::new(HashMap::new()),
            backend: None,
            changed: NullarySignal::new(),
            child_added: Signal::new(),
            child_updated: Signal::new(),
            child_deleted: Signal::new(),
        }
    }

    /// Create an empty registry that mirrors brush strokes to `backend`
    pub fn with_backend(backend: Rc<dyn StrokeBackend>) -> Self {
        let mut source = Self::new();
        source.backend = Some(backend);
        source
    }

    /// Add an annotation, returning a reference to it
    ///
    /// Assigns a fresh random id when the annotation has none; an explicit
    /// id that is already present is rejected. With `commit = false` the
    /// annotation is marked pending and excluded from serialization until
    /// [`commit`](Self::commit) is called.
    pub fn add(
        &mut self,
        mut annotation: Annotation,
        commit: bool,
    ) -> Result<Rc<AnnotationReference>, AnnotationError> {
        if annotation.id.is_empty() {
            annotation.id = make_annotation_id();
        } else if self.annotations.contains_key(&annotation.id) {
            return Err(AnnotationError::DuplicateId(annotation.id));
        }

        let id = annotation.id.clone();
        let annotation = Rc::new(annotation);
        self.annotations.insert(id.clone(), Rc::clone(&annotation));
        if !commit {
            self.pending.insert(id.clone());
        }

        // A tombstoned handle from an earlier generation of this id stays
        // tombstoned; the new generation gets a fresh reference.
        let reference = AnnotationReference::new(
            id.clone(),
            RefValue::Resolved(Rc::clone(&annotation)),
        );
        self.references.borrow_mut().insert(id, Rc::downgrade(&reference));

        reference.changed.dispatch();
        self.changed.dispatch();
        self.child_added.dispatch(&annotation);
        Ok(reference)
    }

    /// Clear the pending flag for this reference's annotation
    ///
    /// For brush annotations with a configured backend this also issues
    /// the upload. An upload failure is returned for the caller's retry
    /// decision; the local commit is never rolled back.
    pub fn commit(&mut self, reference: &AnnotationReference) -> Result<(), RemoteError> {
        self.pending.remove(reference.id());
        match reference.annotation() {
            Some(annotation) => self.upload_stroke(&annotation),
            None => Ok(()),
        }
    }

    /// Replace the stored annotation for this reference's id
    ///
    /// The incoming annotation takes over the reference's id. Fails with
    /// [`AnnotationError::AlreadyDeleted`] against a tombstoned reference.
    pub fn update(
        &mut self,
        reference: &AnnotationReference,
        annotation: Annotation,
    ) -> Result<(), AnnotationError> {
        if reference.is_deleted() {
            return Err(AnnotationError::AlreadyDeleted(reference.id().to_owned()));
        }

        let mut annotation = annotation;
        annotation.id = reference.id().to_owned();
        let annotation = Rc::new(annotation);
        self.annotations.insert(annotation.id.clone(), Rc::clone(&annotation));
        reference.set_value(RefValue::Resolved(Rc::clone(&annotation)));

        reference.changed.dispatch();
        self.changed.dispatch();
        self.child_updated.dispatch(&annotation);
        Ok(())
    }

    /// Delete this reference's annotation
    ///
    /// Idempotent: a second call against the same reference is a no-op and
    /// fires nothing. Brush annotations are torn down remotely first; a
    /// teardown failure is logged and local deletion proceeds.
    pub fn delete(&mut self, reference: &AnnotationReference) {
        if reference.is_deleted() {
            return;
        }
        if let Some(annotation) = reference.annotation() {
            self.destroy_stroke(&annotation);
        }

        reference.set_value(RefValue::Deleted);
        self.annotations.remove(reference.id());
        self.pending.remove(reference.id());

        reference.changed.dispatch();
        self.changed.dispatch();
        self.child_deleted.dispatch(&reference.id().to_owned());
    }

    /// Look up an annotation by id
    pub fn get(&self, id: &str) -> Option<&Rc<Annotation>> {
        self.annotations.get(id)
    }

    /// Iterate over all live annotations (committed and pending)
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Annotation>> {
        self.annotations.values()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Whether the annotation with `id` is awaiting commit
    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains(id)
    }

    /// Get the shared reference handle for `id`, creating one on first use
    ///
    /// An id that is not in the registry resolves to a tombstoned handle.
    pub fn get_reference(&self, id: &str) -> Rc<AnnotationReference> {
        if let Some(existing) = self.live_reference(id) {
            return existing;
        }

        let value = match self.annotations.get(id) {
            Some(annotation) => RefValue::Resolved(Rc::clone(annotation)),
            None => RefValue::Deleted,
        };
        let reference = AnnotationReference::new(id.to_owned(), value);
        self.references.borrow_mut().insert(id.to_owned(), Rc::downgrade(&reference));
        reference
    }

    fn live_reference(&self, id: &str) -> Option<Rc<AnnotationReference>> {
        self.references.borrow().get(id).and_then(Weak::upgrade)
    }

    /// Portable form of all committed annotations, sorted by id
    ///
    /// Pending annotations are excluded until they are committed.
    pub fn to_portable(&self) -> Vec<PortableAnnotation> {
        let mut committed: Vec<_> = self
            .annotations
            .values()
            .filter(|annotation| !self.pending.contains(&annotation.id))
            .collect();
        committed.sort_by(|a, b| a.id.cmp(&b.id));
        committed.into_iter().map(|annotation| annotation.to_portable()).collect()
    }

    /// Replace the registry contents from portable form
    ///
    /// The whole batch is validated before any state changes; on error the
    /// registry is left untouched. Outstanding references are re-resolved
    /// against the restored state and notified.
    pub fn restore_state(
        &mut self,
        portable: Vec<PortableAnnotation>,
    ) -> Result<(), ValidationError> {
        let mut restored = HashMap::with_capacity(portable.len());
        for entry in portable {
            let annotation = Annotation::from_portable(entry)?;
            restored.insert(annotation.id.clone(), Rc::new(annotation));
        }

        self.annotations = restored;
        self.pending.clear();
        self.resolve_references();
        self.changed.dispatch();
        Ok(())
    }

    /// Remove every annotation and pending flag, tombstoning outstanding
    /// references, and notify
    pub fn clear(&mut self) {
        self.annotations.clear();
        self.pending.clear();
        self.resolve_references();
        self.changed.dispatch();
    }

    /// Alias for [`clear`](Self::clear)
    pub fn reset(&mut self) {
        self.clear();
    }

    /// Run a packing pass over all committed annotations
    pub fn serialize(&self) -> SerializedAnnotations {
        let mut serializer = AnnotationSerializer::new();
        for annotation in self.annotations.values() {
            if self.pending.contains(&annotation.id) {
                continue;
            }
            serializer.add(Rc::clone(annotation));
        }
        serializer.serialize()
    }

    /// Re-resolve every outstanding reference against the current map
    fn resolve_references(&self) {
        // Collected first so reference callbacks can call back into the
        // reference table without tripping the borrow.
        let references: Vec<_> =
            self.references.borrow().values().filter_map(Weak::upgrade).collect();
        for reference in references {
            let value = match self.annotations.get(reference.id()) {
                Some(annotation) => RefValue::Resolved(Rc::clone(annotation)),
                None => RefValue::Deleted,
            };
            reference.set_value(value);
            reference.changed.dispatch();
        }
    }

    fn upload_stroke(&self, annotation: &Annotation) -> Result<(), RemoteError> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };
        let Some(payload) = StrokePayload::for_annotation(annotation) else {
            return Ok(());
        };
        let result = backend.upload_stroke(&payload);
        if let Err(error) = &result {
            warn!(%error, id = %annotation.id, "stroke upload failed; annotation stays committed locally");
        }
        result
    }

    fn destroy_stroke(&self, annotation: &Annotation) {
        let Some(backend) = &self.backend else {
            return;
        };
        if !matches!(annotation.geometry, AnnotationGeometry::Brush(_)) {
            return;
        }
        if let Err(error) = backend.destroy_stroke(&annotation.id) {
            warn!(%error, id = %annotation.id, "remote stroke teardown failed; deleting locally anyway");
        }
    }
}

impl Default for AnnotationSource {
    fn default() -> Self {
        Self::new()
    }
}
