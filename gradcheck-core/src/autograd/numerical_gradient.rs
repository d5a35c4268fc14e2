//! Central finite-difference estimation of vector-Jacobian products.

use crate::error::TensorError;
use crate::tensor::Tensor;
use log::trace;

/// Estimates `Σ_j gy_j · ∂y_j/∂x_i` for every input `x_i` with central differences.
///
/// For element `k` of input `i` the estimate is
/// `Σ_j Σ((f(x + e)_j - f(x - e)_j) * grad_outputs[j]) / (2 * eps[i][k])`, where `e` perturbs
/// only that element by `eps[i][k]`. `func` is always evaluated on grad-stopped copies of
/// the inputs, so the caller's tensors gain no graph state. Arithmetic is carried out in f64
/// and every result has the shape and dtype of its input.
///
/// The error type is generic so that functions which can fail for reasons other than a
/// [`TensorError`] can be differentiated too.
///
/// # Errors
/// * `CountMismatch` if `eps` does not have one entry per input, or if `func` returns a
///   different number of outputs than there are `grad_outputs`.
/// * `ShapeMismatch` if an `eps` entry does not match its input, or an output does not match
///   its seed.
/// * `DTypeMismatch` if an `eps` entry has a different dtype than its input.
/// * `UnsupportedOperation` if an `eps` entry contains a zero.
/// * Any error returned by `func`.
pub fn numerical_gradient<F, E>(
    func: F,
    inputs: &[Tensor],
    grad_outputs: &[Tensor],
    eps: &[Tensor],
) -> Result<Vec<Tensor>, E>
where
    F: Fn(&[Tensor]) -> Result<Vec<Tensor>, E>,
    E: From<TensorError>,
{
    if eps.len() != inputs.len() {
        return Err(TensorError::CountMismatch {
            operation: "numerical_gradient".to_string(),
            what: "eps arrays".to_string(),
            expected: inputs.len(),
            actual: eps.len(),
        }
        .into());
    }
    for (input, input_eps) in inputs.iter().zip(eps) {
        let (expected, actual) = (input.shape(), input_eps.shape());
        if expected != actual {
            return Err(TensorError::ShapeMismatch {
                expected,
                actual,
                operation: "numerical_gradient (eps)".to_string(),
            }
            .into());
        }
        let (expected, actual) = (input.dtype(), input_eps.dtype());
        if expected != actual {
            return Err(TensorError::DTypeMismatch {
                expected,
                actual,
                operation: "numerical_gradient (eps)".to_string(),
            }
            .into());
        }
        if input_eps.to_f64_vec().contains(&0.0) {
            return Err(TensorError::UnsupportedOperation(
                "numerical_gradient: eps elements must be non-zero".to_string(),
            )
            .into());
        }
    }

    let base_values: Vec<Vec<f64>> = inputs.iter().map(Tensor::to_f64_vec).collect();
    let seeds: Vec<Vec<f64>> = grad_outputs.iter().map(Tensor::to_f64_vec).collect();

    let mut grads = Vec::with_capacity(inputs.len());
    for (i, input) in inputs.iter().enumerate() {
        let input_eps = eps[i].to_f64_vec();
        let mut grad_values = vec![0.0f64; input_eps.len()];

        for (k, &delta) in input_eps.iter().enumerate() {
            let plus = evaluate_perturbed(&func, inputs, &base_values, i, k, delta)?;
            let minus = evaluate_perturbed(&func, inputs, &base_values, i, k, -delta)?;
            check_outputs(&plus, grad_outputs)?;
            check_outputs(&minus, grad_outputs)?;

            let mut acc = 0.0;
            for ((y_plus, y_minus), gy) in plus.iter().zip(&minus).zip(&seeds) {
                acc += y_plus
                    .to_f64_vec()
                    .into_iter()
                    .zip(y_minus.to_f64_vec())
                    .zip(gy)
                    .map(|((p, m), g)| (p - m) * g)
                    .sum::<f64>();
            }
            grad_values[k] = acc / (2.0 * delta);
        }
        trace!("numerical gradient {} / {} done", i, inputs.len());
        grads.push(Tensor::from_f64_values(grad_values, input.shape(), input.dtype())?);
    }
    Ok(grads)
}

/// Calls `func` on grad-stopped copies of `inputs`, element `k` of input `i` shifted by `delta`.
fn evaluate_perturbed<F, E>(
    func: &F,
    inputs: &[Tensor],
    base_values: &[Vec<f64>],
    i: usize,
    k: usize,
    delta: f64,
) -> Result<Vec<Tensor>, E>
where
    F: Fn(&[Tensor]) -> Result<Vec<Tensor>, E>,
    E: From<TensorError>,
{
    let mut perturbed = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        if index == i {
            let mut values = base_values[i].clone();
            values[k] += delta;
            perturbed.push(Tensor::from_f64_values(values, input.shape(), input.dtype())?);
        } else {
            perturbed.push(input.as_grad_stopped());
        }
    }
    func(&perturbed)
}

fn check_outputs(outputs: &[Tensor], grad_outputs: &[Tensor]) -> Result<(), TensorError> {
    if outputs.len() != grad_outputs.len() {
        return Err(TensorError::CountMismatch {
            operation: "numerical_gradient".to_string(),
            what: "function outputs".to_string(),
            expected: grad_outputs.len(),
            actual: outputs.len(),
        });
    }
    for (output, seed) in outputs.iter().zip(grad_outputs) {
        let (expected, actual) = (seed.shape(), output.shape());
        if expected != actual {
            return Err(TensorError::ShapeMismatch {
                expected,
                actual,
                operation: "numerical_gradient (grad_outputs)".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "numerical_gradient_test.rs"]
mod tests;
