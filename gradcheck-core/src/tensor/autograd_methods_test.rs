use crate::autograd::GraphId;
use crate::error::TensorError;
use crate::tensor::Tensor;
use crate::types::DType;

fn create_test_tensor(data: Vec<f64>, shape: Vec<usize>) -> Tensor {
    Tensor::new_f64(data, shape).expect("Failed to create test tensor")
}

#[test]
fn test_require_grad_is_scoped_per_graph() {
    let g1 = GraphId::new("g1");
    let g2 = GraphId::new("g2");
    let t = create_test_tensor(vec![1.0, 2.0], vec![2]);

    t.require_grad(&g1);
    assert!(t.is_grad_required(&g1));
    assert!(!t.is_grad_required(&g2));
    assert_eq!(t.graph_ids(), vec![g1.clone()]);

    // Idempotent
    t.require_grad(&g1);
    assert_eq!(t.graph_ids(), vec![g1]);
}

#[test]
fn test_set_grad_requires_graph_membership() {
    let g = GraphId::default();
    let t = create_test_tensor(vec![1.0], vec![1]);
    let grad = create_test_tensor(vec![0.5], vec![1]);
    let err = t.set_grad(grad, &g).unwrap_err();
    assert_eq!(
        err,
        TensorError::GradNotRequired {
            graph_id: "default".to_string()
        }
    );
}

#[test]
fn test_set_grad_validates_shape_and_dtype() {
    let g = GraphId::default();
    let t = create_test_tensor(vec![1.0, 2.0], vec![2]);
    t.require_grad(&g);

    let wrong_shape = create_test_tensor(vec![1.0], vec![1]);
    assert!(matches!(
        t.set_grad(wrong_shape, &g),
        Err(TensorError::GradientShapeMismatch { .. })
    ));

    let wrong_dtype = Tensor::new(vec![1.0f32, 1.0], vec![2]).unwrap();
    assert!(matches!(
        t.set_grad(wrong_dtype, &g),
        Err(TensorError::DTypeMismatch { expected: DType::F64, actual: DType::F32, .. })
    ));
}

#[test]
fn test_grad_set_and_clear_do_not_leak_across_graphs() {
    let g1 = GraphId::new("g1");
    let g2 = GraphId::new("g2");
    let t = create_test_tensor(vec![1.0], vec![1]);
    t.require_grad(&g1);
    t.require_grad(&g2);

    t.set_grad(create_test_tensor(vec![3.0], vec![1]), &g1).unwrap();
    assert_eq!(t.grad(&g1).unwrap().item().unwrap(), 3.0);
    assert!(t.grad(&g2).is_none());

    t.clear_grad(&g2);
    assert!(t.grad(&g1).is_some());
    t.clear_grad(&g1);
    assert!(t.grad(&g1).is_none());
}

#[test]
fn test_as_grad_stopped_shares_values_not_graph() {
    let g = GraphId::default();
    let t = create_test_tensor(vec![1.0, 2.0, 3.0], vec![3]);
    t.require_grad(&g);

    let stopped = t.as_grad_stopped();
    assert!(!stopped.is_same(&t));
    assert!(!stopped.is_grad_required(&g));
    assert_eq!(stopped.to_f64_vec(), vec![1.0, 2.0, 3.0]);
    // The original is untouched.
    assert!(t.is_grad_required(&g));
}

#[test]
fn test_as_grad_stopped_on_keeps_other_graphs() {
    let g1 = GraphId::new("g1");
    let g2 = GraphId::new("g2");
    let t = create_test_tensor(vec![1.0], vec![1]);
    t.require_grad(&g1);
    t.require_grad(&g2);

    let stopped = t.as_grad_stopped_on(&[g1.clone()]);
    assert!(!stopped.is_grad_required(&g1));
    assert!(stopped.is_grad_required(&g2));
}

#[test]
fn test_fresh_tensor_is_leaf_on_every_graph() {
    let t = create_test_tensor(vec![1.0], vec![1]);
    assert!(t.is_leaf(&GraphId::default()));
    t.require_grad(&GraphId::default());
    assert!(t.is_leaf(&GraphId::default()));
}

#[test]
fn test_op_output_is_not_leaf() {
    let g = GraphId::default();
    let x = create_test_tensor(vec![2.0], vec![1]);
    x.require_grad(&g);
    let y = x.mul(&x).unwrap();
    assert!(!y.is_leaf(&g));
    assert!(y.is_grad_required(&g));
    assert!(y.is_leaf(&GraphId::new("other")));
}

#[test]
fn test_display_renders_values_shape_and_dtype() {
    let t = Tensor::new(vec![6.0f32], vec![1]).unwrap();
    assert_eq!(t.to_string(), "array([6.0], shape=(1,), dtype=float32)");
    let m = create_test_tensor(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
    assert_eq!(
        m.to_string(),
        "array([1.0, 2.0, 3.0, 4.0], shape=(2, 2), dtype=float64)"
    );
}

#[test]
fn test_view_shares_values_and_nodes() {
    let g = GraphId::default();
    let x = create_test_tensor(vec![2.0], vec![1]);
    x.require_grad(&g);
    let y = x.mul_scalar(3.0).unwrap();

    let v = y.view();
    assert!(!v.is_same(&y));
    assert!(!v.is_leaf(&g));
    let (v_node, y_node) = (v.array_node(&g).unwrap(), y.array_node(&g).unwrap());
    assert!(std::sync::Arc::ptr_eq(&v_node, &y_node));
}
