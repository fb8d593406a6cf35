//! Functions on a product of spaces, with a flat vector view aliasing their coefficients.
//!
//! A [`BlockFunction`] holds one [`Function`] per space. The coefficient vectors of the
//! functions are [`SharedVector`]s, and [`BlockFunction::vector`] returns a [`NestedVector`]
//! that indexes into these same vectors. Writes through the nested view are therefore visible
//! through the components, and vice versa.
use crate::block::BlockVector;
use crate::collapse::collapse_checked;
use crate::dims::{bvec_sizes, cumulative_offsets};
use crate::error::BlockError;
use crate::expr::{Expr, Value};
use crate::Real;
use nalgebra::DVector;
use parking_lot::{MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// A vector whose storage is shared between all of its clones.
#[derive(Debug)]
pub struct SharedVector<T: Real> {
    data: Arc<RwLock<DVector<T>>>,
}

impl<T: Real> Clone for SharedVector<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Real> SharedVector<T> {
    pub fn new(vector: DVector<T>) -> Self {
        Self {
            data: Arc::new(RwLock::new(vector)),
        }
    }

    pub fn zeros(len: usize) -> Self {
        Self::new(DVector::zeros(len))
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn read(&self) -> RwLockReadGuard<'_, DVector<T>> {
        self.data.read()
    }

    /// Mutable access to the values.
    ///
    /// The guard exposes a slice, so the length of the vector is fixed at construction.
    pub fn write(&self) -> MappedRwLockWriteGuard<'_, [T]> {
        RwLockWriteGuard::map(self.data.write(), |v| v.as_mut_slice())
    }

    /// Returns a copy of the current values.
    pub fn to_vector(&self) -> DVector<T> {
        self.read().clone()
    }

    /// Whether both handles refer to the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl<T: Real> From<DVector<T>> for SharedVector<T> {
    fn from(vector: DVector<T>) -> Self {
        Self::new(vector)
    }
}

/// A flat view of several shared vectors laid out one after another.
///
/// The view owns no storage of its own.
#[derive(Debug, Clone)]
pub struct NestedVector<T: Real> {
    components: Vec<SharedVector<T>>,
    offsets: Vec<usize>,
}

impl<T: Real> NestedVector<T> {
    pub fn from_components(components: Vec<SharedVector<T>>) -> Self {
        let sizes: Vec<_> = components.iter().map(SharedVector::len).collect();
        Self {
            components,
            offsets: cumulative_offsets(&sizes),
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    pub fn component(&self, i: usize) -> Option<&SharedVector<T>> {
        self.components.get(i)
    }

    /// Maps a global index to the index of its component and the local index in the component.
    pub fn locate(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.len() {
            return None;
        }
        // offsets is sorted, and the last component starting at or before the index owns it
        let component = self.offsets.partition_point(|&offset| offset <= index) - 1;
        Some((component, index - self.offsets[component]))
    }

    pub fn get(&self, index: usize) -> Option<T> {
        let (component, local) = self.locate(index)?;
        Some(self.components[component].read()[local])
    }

    pub fn set(&self, index: usize, value: T) -> Result<(), BlockError> {
        let (component, local) = self
            .locate(index)
            .ok_or(BlockError::IndexOutOfBounds { index, len: self.len() })?;
        self.components[component].write()[local] = value;
        Ok(())
    }

    /// Returns a copy of the concatenated values of all components.
    pub fn to_flat(&self) -> DVector<T> {
        let mut flat = DVector::zeros(self.len());
        for (component, &offset) in self.components.iter().zip(&self.offsets) {
            let values = component.read();
            flat.rows_mut(offset, values.len()).copy_from(&*values);
        }
        flat
    }

    /// Writes the given values into the components.
    pub fn copy_from_slice(&self, values: &[T]) -> Result<(), BlockError> {
        if values.len() != self.len() {
            return Err(BlockError::ComponentLengthMismatch {
                index: 0,
                expected: self.len(),
                actual: values.len(),
            });
        }
        for (component, window) in self.components.iter().zip(self.offsets.windows(2)) {
            component
                .write()
                .copy_from_slice(&values[window[0]..window[1]]);
        }
        Ok(())
    }
}

/// Collapses every component of a block vector into its own shared vector.
///
/// The returned view owns fresh storage for each component, so the block vector is not
/// affected by writes through the view.
pub fn block_vector_to_nested<T: Real>(bvec: &BlockVector<T>) -> Result<NestedVector<T>, BlockError> {
    bvec_sizes(bvec)?;
    let components = bvec
        .iter()
        .map(|block| match collapse_checked(block)? {
            Value::Vector(v) => Ok(SharedVector::new((*v).clone())),
            other => Err(BlockError::unsupported(format!("{} in block vector", other.kind_name()))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(NestedVector::from_components(components))
}

/// A vector space of finite dimension, e.g. a finite element space.
///
/// Equality is used to check that a function belongs to a space.
pub trait FunctionSpace: Clone + PartialEq {
    fn dim(&self) -> usize;
}

/// A function in a space, represented by its coefficient vector.
#[derive(Debug, Clone)]
pub struct Function<S, T: Real> {
    space: S,
    coefficients: SharedVector<T>,
}

impl<S: FunctionSpace, T: Real> Function<S, T> {
    /// The zero function in the given space.
    pub fn zeros(space: S) -> Self {
        let coefficients = SharedVector::zeros(space.dim());
        Self { space, coefficients }
    }

    /// Wraps existing coefficients, sharing their storage.
    pub fn from_coefficients(space: S, coefficients: SharedVector<T>) -> Result<Self, BlockError> {
        if coefficients.len() != space.dim() {
            return Err(BlockError::ComponentLengthMismatch {
                index: 0,
                expected: space.dim(),
                actual: coefficients.len(),
            });
        }
        Ok(Self { space, coefficients })
    }

    pub fn space(&self) -> &S {
        &self.space
    }

    pub fn coefficients(&self) -> &SharedVector<T> {
        &self.coefficients
    }
}

/// Data used to initialize a component of a [`BlockFunction`].
#[derive(Debug, Clone)]
pub enum Component<S, T: Real> {
    /// An existing function, which must belong to the corresponding space.
    Function(Function<S, T>),
    /// A shared vector, whose storage is shared with the component.
    Vector(SharedVector<T>),
    /// Raw values, moved into the component.
    Values(DVector<T>),
}

/// A collection of functions, one in each of a sequence of spaces.
#[derive(Debug, Clone)]
pub struct BlockFunction<S, T: Real> {
    functions: Vec<Function<S, T>>,
}

impl<S: FunctionSpace, T: Real> BlockFunction<S, T> {
    /// Creates zero functions in each of the given spaces.
    pub fn new(spaces: impl IntoIterator<Item = S>) -> Self {
        Self {
            functions: spaces.into_iter().map(Function::zeros).collect(),
        }
    }

    /// Creates functions from the given spaces and component data.
    pub fn from_components(spaces: Vec<S>, components: Vec<Component<S, T>>) -> Result<Self, BlockError> {
        if spaces.len() != components.len() {
            return Err(BlockError::ComponentCountMismatch {
                expected: spaces.len(),
                actual: components.len(),
            });
        }

        let functions = spaces
            .into_iter()
            .zip(components)
            .enumerate()
            .map(|(index, (space, component))| {
                let coefficients = match component {
                    Component::Function(function) if function.space == space => function.coefficients,
                    Component::Function(_) => return Err(BlockError::SpaceMismatch { index }),
                    Component::Vector(vector) => vector,
                    Component::Values(values) => SharedVector::new(values),
                };
                Function::from_coefficients(space, coefficients).map_err(|err| match err {
                    BlockError::ComponentLengthMismatch { expected, actual, .. } => {
                        BlockError::ComponentLengthMismatch { index, expected, actual }
                    }
                    err => err,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { functions })
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn get(&self, i: usize) -> Result<&Function<S, T>, BlockError> {
        self.functions
            .get(i)
            .ok_or(BlockError::IndexOutOfBounds { index: i, len: self.len() })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Function<S, T>> {
        self.functions.iter()
    }

    /// The coefficient vectors of the functions.
    pub fn vectors(&self) -> Vec<SharedVector<T>> {
        self.functions.iter().map(|f| f.coefficients.clone()).collect()
    }

    /// A flat vector view which shares storage with the coefficient vectors of the functions.
    pub fn vector(&self) -> NestedVector<T> {
        NestedVector::from_components(self.vectors())
    }

    /// A block vector holding a snapshot of the current coefficients.
    pub fn block_vector(&self) -> BlockVector<T> {
        BlockVector::new(
            self.functions
                .iter()
                .map(|f| Expr::vector(f.coefficients.to_vector())),
        )
    }
}

impl<'a, S: FunctionSpace, T: Real> IntoIterator for &'a BlockFunction<S, T> {
    type Item = &'a Function<S, T>;
    type IntoIter = std::slice::Iter<'a, Function<S, T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.functions.iter()
    }
}
