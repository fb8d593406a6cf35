use fenris_block::function::{BlockFunction, Component, Function, FunctionSpace, NestedVector, SharedVector};
use fenris_block::BlockError;
use nalgebra::DVector;

#[derive(Debug, Clone, PartialEq)]
struct Space {
    name: &'static str,
    dim: usize,
}

impl FunctionSpace for Space {
    fn dim(&self) -> usize {
        self.dim
    }
}

fn velocity() -> Space {
    Space { name: "velocity", dim: 3 }
}

fn pressure() -> Space {
    Space { name: "pressure", dim: 2 }
}

#[test]
fn shared_vector_clones_share_storage() {
    let u = SharedVector::new(DVector::from_vec(vec![1.0, 2.0]));
    let v = u.clone();
    v.write()[1] = 5.0;
    assert_eq!(u.to_vector(), DVector::from_vec(vec![1.0, 5.0]));
    assert!(u.ptr_eq(&v));
    assert!(!u.ptr_eq(&SharedVector::zeros(2)));
    assert_eq!(u.len(), 2);
    assert!(SharedVector::<f64>::zeros(0).is_empty());
}

#[test]
fn nested_vector_maps_global_indices() {
    let components = vec![
        SharedVector::new(DVector::from_vec(vec![1.0, 2.0])),
        SharedVector::zeros(0),
        SharedVector::new(DVector::from_vec(vec![3.0, 4.0, 5.0])),
    ];
    let nested = NestedVector::from_components(components);

    assert_eq!(nested.len(), 5);
    assert_eq!(nested.num_components(), 3);
    assert_eq!(nested.locate(0), Some((0, 0)));
    assert_eq!(nested.locate(1), Some((0, 1)));
    assert_eq!(nested.locate(2), Some((2, 0)));
    assert_eq!(nested.locate(4), Some((2, 2)));
    assert_eq!(nested.locate(5), None);
    assert_eq!(nested.get(3), Some(4.0));
    assert_eq!(nested.get(5), None);
    assert_eq!(nested.to_flat(), DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0]));
}

#[test]
fn nested_vector_writes_through_to_components() {
    let first = SharedVector::new(DVector::from_vec(vec![1.0, 2.0]));
    let second = SharedVector::new(DVector::from_vec(vec![3.0]));
    let nested = NestedVector::from_components(vec![first.clone(), second.clone()]);

    nested.set(2, -1.0).unwrap();
    assert_eq!(second.to_vector(), DVector::from_vec(vec![-1.0]));

    first.write()[0] = 10.0;
    assert_eq!(nested.get(0), Some(10.0));

    nested.copy_from_slice(&[7.0, 8.0, 9.0]).unwrap();
    assert_eq!(first.to_vector(), DVector::from_vec(vec![7.0, 8.0]));
    assert_eq!(second.to_vector(), DVector::from_vec(vec![9.0]));

    assert!(matches!(
        nested.set(3, 0.0),
        Err(BlockError::IndexOutOfBounds { index: 3, len: 3 })
    ));
    assert!(matches!(
        nested.copy_from_slice(&[1.0]),
        Err(BlockError::ComponentLengthMismatch { expected: 3, actual: 1, .. })
    ));
}

#[test]
fn block_function_of_zero_functions() {
    let u = BlockFunction::<_, f64>::new(vec![velocity(), pressure()]);
    assert_eq!(u.len(), 2);
    assert!(!u.is_empty());
    assert_eq!(u.get(0).unwrap().space().name, "velocity");
    assert_eq!(u.get(1).unwrap().coefficients().len(), 2);
    assert!(matches!(u.get(2), Err(BlockError::IndexOutOfBounds { index: 2, len: 2 })));
    assert_eq!(u.vector().to_flat(), DVector::zeros(5));
    assert_eq!((&u).into_iter().count(), 2);
    assert_eq!(u.iter().map(|f| f.space().dim()).sum::<usize>(), 5);
}

#[test]
fn block_function_vector_aliases_component_storage() {
    let u = BlockFunction::<_, f64>::new(vec![velocity(), pressure()]);
    let flat = u.vector();

    flat.set(4, 2.5).unwrap();
    assert_eq!(u.get(1).unwrap().coefficients().to_vector(), DVector::from_vec(vec![0.0, 2.5]));

    u.get(0).unwrap().coefficients().write()[1] = 1.5;
    assert_eq!(flat.get(1), Some(1.5));

    // The block vector is a snapshot and does not follow later writes
    let snapshot = u.block_vector();
    flat.set(0, 9.0).unwrap();
    let flat_snapshot = fenris_block::assembly::block_vector_to_flat(&snapshot).unwrap();
    assert_eq!(flat_snapshot, DVector::from_vec(vec![0.0, 1.5, 0.0, 0.0, 2.5]));
}

#[test]
fn block_function_from_components() {
    let existing = Function::zeros(velocity());
    let shared = SharedVector::new(DVector::from_vec(vec![1.0, 2.0]));

    let u = BlockFunction::from_components(
        vec![velocity(), pressure()],
        vec![Component::Function(existing.clone()), Component::Vector(shared.clone())],
    )
    .unwrap();

    assert!(u.get(0).unwrap().coefficients().ptr_eq(existing.coefficients()));
    assert!(u.vectors()[1].ptr_eq(&shared));

    shared.write()[0] = -3.0;
    assert_eq!(u.vector().get(3), Some(-3.0));

    let v = BlockFunction::<_, f64>::from_components(
        vec![pressure()],
        vec![Component::Values(DVector::from_vec(vec![4.0, 5.0]))],
    )
    .unwrap();
    assert_eq!(v.vector().to_flat(), DVector::from_vec(vec![4.0, 5.0]));
}

#[test]
fn block_function_from_invalid_components() {
    let result = BlockFunction::<_, f64>::from_components(vec![velocity(), pressure()], vec![Component::Values(DVector::zeros(3))]);
    assert!(matches!(
        result,
        Err(BlockError::ComponentCountMismatch { expected: 2, actual: 1 })
    ));

    let result = BlockFunction::<_, f64>::from_components(
        vec![velocity(), pressure()],
        vec![Component::Values(DVector::zeros(3)), Component::Function(Function::zeros(velocity()))],
    );
    assert!(matches!(result, Err(BlockError::SpaceMismatch { index: 1 })));

    let result = BlockFunction::<_, f64>::from_components(
        vec![velocity(), pressure()],
        vec![Component::Values(DVector::zeros(3)), Component::Vector(SharedVector::zeros(4))],
    );
    assert!(matches!(
        result,
        Err(BlockError::ComponentLengthMismatch { index: 1, expected: 2, actual: 4 })
    ));
}

#[test]
fn function_from_coefficients_checks_dimension() {
    assert!(Function::<_, f64>::from_coefficients(pressure(), SharedVector::zeros(2)).is_ok());
    assert!(Function::<_, f64>::from_coefficients(pressure(), SharedVector::zeros(3)).is_err());
}

#[test]
fn block_vector_to_nested_copies_components() {
    use fenris_block::function::block_vector_to_nested;
    use fenris_block::{BlockVector, Expr};

    let bvec = BlockVector::<f64>::new(vec![
        Expr::vector(DVector::from_vec(vec![1.0, 2.0, 3.0])),
        2.0 * Expr::vector(DVector::from_vec(vec![4.0, 5.0])),
    ]);
    let nested = block_vector_to_nested(&bvec).unwrap();
    assert_eq!(nested.num_components(), 2);
    assert_eq!(nested.component(1).unwrap().len(), 2);
    assert_eq!(nested.to_flat(), DVector::from_vec(vec![1.0, 2.0, 3.0, 8.0, 10.0]));

    nested.set(0, -1.0).unwrap();
    match bvec.get(0).unwrap() {
        Expr::Vector(v) => assert_eq!(v[0], 1.0),
        other => panic!("expected vector, got {}", other.kind_name()),
    }
}

#[test]
fn component_writes_preserve_length_and_view_mapping() {
    let u = BlockFunction::<_, f64>::new(vec![velocity(), pressure()]);
    let flat = u.vector();

    {
        let mut coefficients = u.get(0).unwrap().coefficients().write();
        assert_eq!(coefficients.len(), 3);
        coefficients.fill(2.0);
    }

    assert_eq!(u.get(0).unwrap().coefficients().len(), velocity().dim());
    assert_eq!(flat.len(), 5);
    assert_eq!(flat.get(2), Some(2.0));
    assert_eq!(flat.get(3), Some(0.0));
    flat.copy_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
    assert_eq!(u.get(1).unwrap().coefficients().to_vector(), DVector::from_vec(vec![4.0, 5.0]));
    assert_eq!(flat.to_flat(), DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0]));
}
