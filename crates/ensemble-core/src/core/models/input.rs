use super::error::EnsembleError;
use nalgebra::{DMatrix, Point3};

/// A structure-like object that can hand out one set of coordinates.
///
/// Implement this for atom containers (whole structures, chains, selections) so they can be
/// added to an ensemble directly. A source that carries several coordinate states (models,
/// frames) reports which one is active, and that index becomes part of the conformation name.
pub trait CoordinateSource {
    /// Coordinates of the active state, one point per atom.
    fn coordinates(&self) -> Vec<Point3<f64>>;

    fn name(&self) -> &str;

    fn num_coordinate_states(&self) -> usize {
        1
    }

    fn active_state_index(&self) -> usize {
        0
    }
}

/// Every form of coordinate data the ensemble accepts.
pub enum CoordinateInput<'a> {
    /// A single frame of `n_atoms` points.
    Frame(Vec<Point3<f64>>),
    /// A batch of frames, each of `n_atoms` points.
    Batch(Vec<Vec<Point3<f64>>>),
    /// A single frame stored as an `n_atoms x 3` matrix.
    Matrix(DMatrix<f64>),
    /// An object exposing its own coordinates.
    Source(&'a dyn CoordinateSource),
}

impl From<Vec<Point3<f64>>> for CoordinateInput<'_> {
    fn from(frame: Vec<Point3<f64>>) -> Self {
        Self::Frame(frame)
    }
}

impl From<&[Point3<f64>]> for CoordinateInput<'_> {
    fn from(frame: &[Point3<f64>]) -> Self {
        Self::Frame(frame.to_vec())
    }
}

impl From<Vec<[f64; 3]>> for CoordinateInput<'_> {
    fn from(frame: Vec<[f64; 3]>) -> Self {
        Self::Frame(frame.into_iter().map(Point3::from).collect())
    }
}

impl From<Vec<Vec<Point3<f64>>>> for CoordinateInput<'_> {
    fn from(batch: Vec<Vec<Point3<f64>>>) -> Self {
        Self::Batch(batch)
    }
}

impl From<DMatrix<f64>> for CoordinateInput<'_> {
    fn from(matrix: DMatrix<f64>) -> Self {
        Self::Matrix(matrix)
    }
}

impl<'a> From<&'a dyn CoordinateSource> for CoordinateInput<'a> {
    fn from(source: &'a dyn CoordinateSource) -> Self {
        Self::Source(source)
    }
}

/// Coordinate input after shape checks, reduced to a batch of frames.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedCoordinates {
    pub frames: Vec<Vec<Point3<f64>>>,
    /// Conformation name derived from a [`CoordinateSource`], if the input was one.
    pub source_label: Option<String>,
}

impl ResolvedCoordinates {
    pub fn atom_count(&self) -> usize {
        self.frames.first().map_or(0, Vec::len)
    }
}

impl CoordinateInput<'_> {
    pub(crate) fn resolve(self) -> Result<ResolvedCoordinates, EnsembleError> {
        let (frames, source_label) = match self {
            Self::Frame(frame) => (vec![frame], None),
            Self::Batch(batch) => (batch, None),
            Self::Matrix(matrix) => (vec![matrix_to_points(&matrix)?], None),
            Self::Source(source) => {
                let label = if source.num_coordinate_states() > 1 {
                    format!("{} {}", source.name(), source.active_state_index())
                } else {
                    source.name().to_string()
                };
                (vec![source.coordinates()], Some(label))
            }
        };

        let Some(first) = frames.first() else {
            return Err(EnsembleError::EmptyBatch);
        };
        let n_atoms = first.len();
        if n_atoms == 0 {
            return Err(EnsembleError::Shape {
                expected: "(n_atoms, 3) with at least one atom".to_string(),
                found: "(0, 3)".to_string(),
            });
        }
        if let Some(ragged) = frames.iter().find(|f| f.len() != n_atoms) {
            return Err(EnsembleError::Shape {
                expected: format!("({}, {}, 3)", frames.len(), n_atoms),
                found: format!("a frame of {} atoms", ragged.len()),
            });
        }
        let all_finite = frames
            .iter()
            .flatten()
            .all(|p| p.coords.iter().all(|c| c.is_finite()));
        if !all_finite {
            return Err(EnsembleError::NonFinite {
                context: "coordinates",
            });
        }

        Ok(ResolvedCoordinates {
            frames,
            source_label,
        })
    }
}

fn matrix_to_points(matrix: &DMatrix<f64>) -> Result<Vec<Point3<f64>>, EnsembleError> {
    if matrix.ncols() != 3 {
        return Err(EnsembleError::Shape {
            expected: "(n_atoms, 3)".to_string(),
            found: format!("({}, {})", matrix.nrows(), matrix.ncols()),
        });
    }
    Ok(matrix
        .row_iter()
        .map(|row| Point3::new(row[0], row[1], row[2]))
        .collect())
}

/// Per-atom weights supplied alongside a coordinate batch (occupancy, mass, resolved flags).
#[derive(Debug, Clone, PartialEq)]
pub enum WeightInput {
    /// One weight per atom, shared by every frame of the batch.
    Shared(Vec<f64>),
    /// One weight column per frame of the batch.
    PerFrame(Vec<Vec<f64>>),
}

impl From<Vec<f64>> for WeightInput {
    fn from(weights: Vec<f64>) -> Self {
        Self::Shared(weights)
    }
}

impl From<Vec<Vec<f64>>> for WeightInput {
    fn from(weights: Vec<Vec<f64>>) -> Self {
        Self::PerFrame(weights)
    }
}

impl WeightInput {
    /// Expands the weights to one column per frame, checking every column against `n_atoms`.
    pub(crate) fn resolve(
        self,
        n_frames: usize,
        n_atoms: usize,
    ) -> Result<Vec<Vec<f64>>, EnsembleError> {
        let columns = match self {
            Self::Shared(column) => vec![column; n_frames],
            Self::PerFrame(columns) => {
                if columns.len() != n_frames {
                    return Err(EnsembleError::WeightCountMismatch {
                        expected: n_frames,
                        found: columns.len(),
                    });
                }
                columns
            }
        };

        for column in &columns {
            if column.len() != n_atoms {
                return Err(EnsembleError::InvalidWeights(format!(
                    "expected {} weights per frame, found {}",
                    n_atoms,
                    column.len()
                )));
            }
            if column.iter().any(|w| !w.is_finite()) {
                return Err(EnsembleError::NonFinite { context: "weights" });
            }
            if column.iter().any(|&w| w < 0.0) {
                return Err(EnsembleError::InvalidWeights(
                    "weights must be non-negative".to_string(),
                ));
            }
        }
        Ok(columns)
    }
}

/// Which conformations an indexed operation applies to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Index(usize),
    Indices(Vec<usize>),
}

impl From<usize> for Selection {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<Vec<usize>> for Selection {
    fn from(indices: Vec<usize>) -> Self {
        Self::Indices(indices)
    }
}

impl From<&[usize]> for Selection {
    fn from(indices: &[usize]) -> Self {
        Self::Indices(indices.to_vec())
    }
}

impl Selection {
    /// Resolves the selection to concrete indices in request order.
    pub(crate) fn resolve(&self, len: usize) -> Result<Vec<usize>, EnsembleError> {
        let indices = match self {
            Self::All => return Ok((0..len).collect()),
            Self::Index(index) => vec![*index],
            Self::Indices(indices) => indices.clone(),
        };
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(EnsembleError::IndexOutOfRange { index, len });
        }
        Ok(indices)
    }
}
