use super::conformation::Conformation;
use super::error::EnsembleError;
use super::ids::ConformationId;
use super::input::{CoordinateInput, ResolvedCoordinates, Selection, WeightInput};
use nalgebra::{Isometry3, Point3};
use slotmap::SlotMap;
use std::collections::HashSet;
use std::fmt;
use std::ops::Range;
use tracing::debug;

/// Name and current position of a materialized conformation view.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ConformationLabel {
    pub name: String,
    pub index: usize,
}

/// A conformation view that was removed from its ensemble.
///
/// Its id no longer resolves through [`ConformationSet::view`], but the name it carried
/// is preserved here.
#[derive(Debug, Clone, PartialEq)]
pub struct DetachedConformation {
    pub id: ConformationId,
    pub name: String,
}

/// A collection of alternative coordinate sets for one set of atoms.
///
/// The ensemble owns a reference structure, a stack of conformations sharing its atom
/// count, optional per-atom weights for every conformation, and the rigid-body
/// transformation recorded for every conformation by the last superposition pass.
/// All conformation-indexed storage is kept in lockstep: coordinates, weights (when
/// present), view handles and transformations always have the same length, and indices are
/// dense from zero.
#[derive(Debug, Clone, Default)]
pub struct ConformationSet {
    name: String,
    /// Reference coordinates, `None` until set.
    reference: Option<Vec<Point3<f64>>>,
    /// Fixed by the first coordinate data supplied.
    atom_count: Option<usize>,
    conformations: Vec<Vec<Point3<f64>>>,
    /// One weight column per conformation; `None` means every weight is 1.
    weights: Option<Vec<Vec<f64>>>,
    /// Lazily materialized view handles, one slot per conformation.
    handles: Vec<Option<ConformationId>>,
    labels: SlotMap<ConformationId, ConformationLabel>,
    /// Transformations from the last superposition pass, one slot per conformation.
    transformations: Vec<Option<Isometry3<f64>>>,
}

impl ConformationSet {
    /// Creates an empty ensemble.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Number of atoms, or `None` before any coordinate data was supplied.
    pub fn atom_count(&self) -> Option<usize> {
        self.atom_count
    }

    /// Number of conformations.
    pub fn len(&self) -> usize {
        self.conformations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conformations.is_empty()
    }

    /// Returns a copy of the reference coordinates.
    pub fn reference(&self) -> Option<Vec<Point3<f64>>> {
        self.reference.clone()
    }

    /// Sets the reference coordinates from a single frame or a coordinate source.
    ///
    /// # Errors
    ///
    /// Returns [`EnsembleError::Shape`] for a batch of several frames or a matrix that is not
    /// `n_atoms x 3`, [`EnsembleError::AtomCountMismatch`] if the atom count is already fixed
    /// to a different value, and [`EnsembleError::NonFinite`] for NaN or infinite values.
    pub fn set_reference<'a>(
        &mut self,
        input: impl Into<CoordinateInput<'a>>,
    ) -> Result<(), EnsembleError> {
        let resolved = input.into().resolve()?;
        if resolved.frames.len() != 1 {
            return Err(EnsembleError::Shape {
                expected: "a single (n_atoms, 3) frame".to_string(),
                found: format!("a batch of {} frames", resolved.frames.len()),
            });
        }
        self.check_atom_count(resolved.atom_count())?;

        self.atom_count = Some(resolved.atom_count());
        self.reference = resolved.frames.into_iter().next();
        Ok(())
    }

    /// Appends one or more conformations, returning the range of their new indices.
    ///
    /// A single frame is treated as a batch of one. Weights, when given, apply to this batch
    /// only. Weights missing on either side are taken as all ones: a batch added without
    /// weights to a weighted ensemble is padded with ones, and weights added to an ensemble
    /// that had none back-fill the existing conformations with ones.
    ///
    /// A conformation added from a [`CoordinateSource`](super::input::CoordinateSource) has
    /// its view materialized immediately, named after the source.
    ///
    /// Nothing is modified unless the whole call validates.
    pub fn add_conformations<'a>(
        &mut self,
        input: impl Into<CoordinateInput<'a>>,
        weights: Option<WeightInput>,
    ) -> Result<Range<usize>, EnsembleError> {
        let ResolvedCoordinates {
            frames,
            source_label,
        } = input.into().resolve()?;
        let n_frames = frames.len();
        let n_atoms = frames[0].len();
        self.check_atom_count(n_atoms)?;
        let new_weights = weights
            .map(|w| w.resolve(n_frames, n_atoms))
            .transpose()?;

        let start = self.len();
        self.atom_count = Some(n_atoms);

        match (&mut self.weights, new_weights) {
            (Some(existing), Some(new)) => existing.extend(new),
            (Some(existing), None) => {
                debug!(n_frames, "Padding unweighted batch with unit weights.");
                existing.extend(std::iter::repeat_n(vec![1.0; n_atoms], n_frames));
            }
            (None, Some(new)) => {
                if start > 0 {
                    debug!(
                        existing = start,
                        "Back-filling unit weights for previously unweighted conformations."
                    );
                }
                let mut all = vec![vec![1.0; n_atoms]; start];
                all.extend(new);
                self.weights = Some(all);
            }
            (None, None) => {}
        }

        self.conformations.extend(frames);
        self.transformations.extend(std::iter::repeat_n(None, n_frames));
        match source_label {
            Some(name) => {
                let id = self.labels.insert(ConformationLabel { name, index: start });
                self.handles.push(Some(id));
            }
            None => self.handles.extend(std::iter::repeat_n(None, n_frames)),
        }

        Ok(start..self.len())
    }

    /// Returns copies of all conformations, or `None` if there are none.
    ///
    /// Atoms with zero weight in a conformation take the reference position instead of
    /// their stored one (an unresolved atom falls back to the reference).
    pub fn coordinate_sets(&self) -> Option<Vec<Vec<Point3<f64>>>> {
        if self.is_empty() {
            return None;
        }
        Some((0..self.len()).map(|i| self.effective_frame(i)).collect())
    }

    /// Returns copies of the selected conformations in the requested order, with the same
    /// zero-weight substitution as [`coordinate_sets`](Self::coordinate_sets).
    pub fn select_coordinate_sets(
        &self,
        selection: impl Into<Selection>,
    ) -> Result<Vec<Vec<Point3<f64>>>, EnsembleError> {
        let indices = selection.into().resolve(self.len())?;
        Ok(indices.into_iter().map(|i| self.effective_frame(i)).collect())
    }

    /// Iterates over copies of the stored conformations, without weight substitution.
    pub fn iter_coordinate_sets(&self) -> impl Iterator<Item = Vec<Point3<f64>>> + '_ {
        self.conformations.iter().cloned()
    }

    /// Returns a copy of the weights, one column per conformation.
    pub fn weights(&self) -> Option<Vec<Vec<f64>>> {
        self.weights.clone()
    }

    /// Returns a copy of the transformations from the last superposition pass.
    pub fn transformations(&self) -> Vec<Option<Isometry3<f64>>> {
        self.transformations.clone()
    }

    /// Records a transformation for one conformation.
    ///
    /// This lets a fit computed on a subset of atoms be carried over to an ensemble holding
    /// the full atom set before [`apply_stored_transformations`](crate::engine::tasks::transform::run).
    pub fn set_transformation(
        &mut self,
        index: usize,
        transformation: Isometry3<f64>,
    ) -> Result<(), EnsembleError> {
        let len = self.len();
        let slot = self
            .transformations
            .get_mut(index)
            .ok_or(EnsembleError::IndexOutOfRange { index, len })?;
        *slot = Some(transformation);
        Ok(())
    }

    /// Removes the selected conformations and renumbers the remaining ones.
    ///
    /// Returns the views that were materialized for the removed conformations, now
    /// detached. Removing every conformation resets coordinate and weight storage.
    pub fn delete_conformations(
        &mut self,
        selection: impl Into<Selection>,
    ) -> Result<Vec<DetachedConformation>, EnsembleError> {
        let indices = selection.into().resolve(self.len())?;
        let mut doomed = HashSet::with_capacity(indices.len());
        for &index in &indices {
            if !doomed.insert(index) {
                return Err(EnsembleError::DuplicateIndex(index));
            }
        }

        let mut detached = Vec::new();
        let mut kept = 0;
        let handles = std::mem::take(&mut self.handles);
        for (old_index, handle) in handles.into_iter().enumerate() {
            if doomed.contains(&old_index) {
                if let Some(id) = handle {
                    if let Some(label) = self.labels.remove(id) {
                        detached.push(DetachedConformation {
                            id,
                            name: label.name,
                        });
                    }
                }
                continue;
            }
            if let Some(id) = handle {
                if let Some(label) = self.labels.get_mut(id) {
                    label.index = kept;
                }
            }
            self.handles.push(handle);
            kept += 1;
        }

        let keep = |i: &usize| !doomed.contains(i);
        self.conformations = retain_indexed(std::mem::take(&mut self.conformations), keep);
        self.transformations = retain_indexed(std::mem::take(&mut self.transformations), keep);
        self.weights = self
            .weights
            .take()
            .map(|w| retain_indexed(w, keep))
            .filter(|w| !w.is_empty());

        debug!(
            removed = doomed.len(),
            remaining = self.len(),
            "Deleted conformations."
        );
        Ok(detached)
    }

    /// Returns the stable id of the conformation at `index`, materializing its view.
    ///
    /// A freshly materialized view is named after its current index.
    pub fn conformation_id(&mut self, index: usize) -> Result<ConformationId, EnsembleError> {
        let len = self.len();
        let slot = self
            .handles
            .get_mut(index)
            .ok_or(EnsembleError::IndexOutOfRange { index, len })?;
        if let Some(id) = *slot {
            return Ok(id);
        }
        let id = self.labels.insert(ConformationLabel {
            name: index.to_string(),
            index,
        });
        *slot = Some(id);
        Ok(id)
    }

    /// Returns a view of the conformation at `index`, materializing it if needed.
    pub fn conformation(&mut self, index: usize) -> Result<Conformation<'_>, EnsembleError> {
        let id = self.conformation_id(index)?;
        self.view(id)
    }

    /// Materializes every conformation and iterates over their views in index order.
    pub fn iter_conformations(&mut self) -> impl Iterator<Item = Conformation<'_>> + '_ {
        for index in 0..self.len() {
            if self.handles[index].is_none() {
                let id = self.labels.insert(ConformationLabel {
                    name: index.to_string(),
                    index,
                });
                self.handles[index] = Some(id);
            }
        }
        let ensemble: &Self = self;
        ensemble
            .handles
            .iter()
            .enumerate()
            .filter_map(move |(index, handle)| {
                handle.map(|id| Conformation::new(ensemble, id, index))
            })
    }

    /// Resolves a previously materialized conformation id to a view.
    ///
    /// # Errors
    ///
    /// Returns [`EnsembleError::Detached`] if the conformation has been deleted.
    pub fn view(&self, id: ConformationId) -> Result<Conformation<'_>, EnsembleError> {
        let label = self.labels.get(id).ok_or(EnsembleError::Detached(id))?;
        Ok(Conformation::new(self, id, label.index))
    }

    /// Current index of a materialized conformation, `None` once it has been deleted.
    pub fn index_of(&self, id: ConformationId) -> Option<usize> {
        self.labels.get(id).map(|label| label.index)
    }

    pub fn rename_conformation(
        &mut self,
        id: ConformationId,
        name: impl Into<String>,
    ) -> Result<(), EnsembleError> {
        let label = self.labels.get_mut(id).ok_or(EnsembleError::Detached(id))?;
        label.name = name.into();
        Ok(())
    }

    /// Returns a new ensemble holding copies of a contiguous range of conformations.
    ///
    /// The new ensemble carries a copy of this ensemble's reference and the weights of the
    /// copied conformations, and is named after the range bounds.
    pub fn slice(&self, range: Range<usize>) -> Result<ConformationSet, EnsembleError> {
        if range.start > range.end || range.end > self.len() {
            return Err(EnsembleError::InvalidRange {
                start: range.start,
                end: range.end,
                len: self.len(),
            });
        }

        let mut subset =
            ConformationSet::new(format!("{} ({}:{})", self.name, range.start, range.end));
        subset.atom_count = self.atom_count;
        subset.reference = self.reference.clone();
        subset.conformations = self.conformations[range.clone()].to_vec();
        subset.weights = self
            .weights
            .as_ref()
            .map(|w| w[range.clone()].to_vec())
            .filter(|w| !w.is_empty());
        subset.handles = vec![None; range.len()];
        subset.transformations = vec![None; range.len()];
        Ok(subset)
    }

    fn check_atom_count(&self, found: usize) -> Result<(), EnsembleError> {
        match self.atom_count {
            Some(expected) if expected != found => {
                Err(EnsembleError::AtomCountMismatch { expected, found })
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn reference_points(&self) -> Option<&[Point3<f64>]> {
        self.reference.as_deref()
    }

    pub(crate) fn raw_frames(&self) -> &[Vec<Point3<f64>>] {
        &self.conformations
    }

    pub(crate) fn raw_frames_mut(&mut self) -> &mut [Vec<Point3<f64>>] {
        &mut self.conformations
    }

    pub(crate) fn weight_columns(&self) -> Option<&[Vec<f64>]> {
        self.weights.as_deref()
    }

    pub(crate) fn weight_column(&self, index: usize) -> Option<&[f64]> {
        self.weights
            .as_ref()
            .and_then(|w| w.get(index))
            .map(Vec::as_slice)
    }

    pub(crate) fn stored_transformations(&self) -> &[Option<Isometry3<f64>>] {
        &self.transformations
    }

    pub(crate) fn label(&self, id: ConformationId) -> Option<&ConformationLabel> {
        self.labels.get(id)
    }

    /// Replaces the reference without re-validating; callers guarantee the atom count.
    pub(crate) fn replace_reference(&mut self, reference: Vec<Point3<f64>>) {
        debug_assert_eq!(Some(reference.len()), self.atom_count);
        self.reference = Some(reference);
    }

    /// Writes fitted coordinates and transformations back in one step.
    pub(crate) fn store_fits(&mut self, fits: Vec<(Vec<Point3<f64>>, Isometry3<f64>)>) {
        debug_assert_eq!(fits.len(), self.len());
        for (i, (coords, transformation)) in fits.into_iter().enumerate() {
            self.conformations[i] = coords;
            self.transformations[i] = Some(transformation);
        }
    }

    /// Conformation coordinates with zero-weight atoms taken from the reference.
    pub(crate) fn effective_frame(&self, index: usize) -> Vec<Point3<f64>> {
        let mut coords = self.conformations[index].clone();
        if let (Some(weights), Some(reference)) = (self.weight_column(index), &self.reference) {
            for ((point, &w), reference_point) in coords.iter_mut().zip(weights).zip(reference) {
                if w == 0.0 {
                    *point = *reference_point;
                }
            }
        }
        coords
    }
}

fn retain_indexed<T>(items: Vec<T>, keep: impl Fn(&usize) -> bool) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter(|(i, _)| keep(i))
        .map(|(_, item)| item)
        .collect()
}

/// `{}` prints `Ensemble <name>`; the alternate form `{:#}` appends the conformation and
/// atom counts.
impl fmt::Display for ConformationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ensemble {}", self.name)?;
        if f.alternate() {
            write!(
                f,
                " ({} conformations, {} atoms)",
                self.len(),
                self.atom_count.unwrap_or(0)
            )?;
        }
        Ok(())
    }
}
