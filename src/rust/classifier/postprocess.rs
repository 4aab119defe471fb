use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use super::error::ClassifierError;

/// A single labeled prediction with its softmax confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class_name: String,
    pub confidence: f32,
}

/// Numerically stable softmax over a single axis.
///
/// The maximum logit is subtracted before exponentiating so large logits
/// cannot overflow.
pub fn softmax(logits: ArrayView1<f32>) -> Array1<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps = logits.mapv(|x| (x - max).exp());
    let sum = exps.sum();
    exps / sum
}

/// Returns the indices of the `k` largest values, highest first.
///
/// Equal values keep ascending index order.
pub fn top_k(values: ArrayView1<f32>, k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    // stable sort, so ties stay in index order
    indices.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    indices.truncate(k);
    indices
}

/// Converts raw logits into the top-`k` labeled predictions.
///
/// Returns `min(k, labels.len(), logits.len())` predictions sorted by
/// descending confidence.
///
/// # Errors
/// - `LabelIndexMismatch` if a selected index has no label, which means the
///   label file does not belong to the model
pub fn postprocess(
    logits: ArrayView1<f32>,
    labels: &[String],
    k: usize,
) -> Result<Vec<Prediction>, ClassifierError> {
    let probabilities = softmax(logits);
    let take = k.min(labels.len());

    top_k(probabilities.view(), take)
        .into_iter()
        .map(|index| {
            let class_name = labels.get(index).ok_or(ClassifierError::LabelIndexMismatch {
                index,
                labels: labels.len(),
            })?;
            Ok(Prediction {
                class_name: class_name.clone(),
                confidence: probabilities[index],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_softmax_two_classes() {
        let p = softmax(array![2.0f32, 1.0].view());
        assert!((p[0] - 0.731_058_6).abs() < 1e-5);
        assert!((p[1] - 0.268_941_4).abs() < 1e-5);
    }

    #[test]
    fn test_softmax_large_logits_do_not_overflow() {
        let p = softmax(array![1000.0f32, 999.0, -1000.0].view());
        assert!(p.iter().all(|v| v.is_finite()));
        assert!((p.sum() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_top_k_orders_descending() {
        let values = array![0.1f32, 0.5, 0.2, 0.9];
        assert_eq!(top_k(values.view(), 3), vec![3, 1, 2]);
    }

    #[test]
    fn test_top_k_tie_prefers_lower_index() {
        let mut logits = Array1::<f32>::zeros(10);
        logits[3] = 5.0;
        logits[7] = 5.0;
        assert_eq!(top_k(logits.view(), 2), vec![3, 7]);
    }

    #[test]
    fn test_capped_by_label_count() {
        let predictions = postprocess(array![2.0f32, 1.0].view(), &labels(&["cat", "dog"]), 10).unwrap();

        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].class_name, "cat");
        assert_eq!(predictions[1].class_name, "dog");
        assert!((predictions[0].confidence - 0.731).abs() < 1e-3);
        assert!((predictions[1].confidence - 0.269).abs() < 1e-3);
    }

    #[test]
    fn test_full_distribution_sums_to_one() {
        let logits = array![0.3f32, -1.2, 4.0, 2.2, 0.0];
        let names = labels(&["a", "b", "c", "d", "e"]);
        let predictions = postprocess(logits.view(), &names, names.len()).unwrap();

        let total: f32 = predictions.iter().map(|p| p.confidence).sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert!(predictions.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn test_index_beyond_labels_is_mismatch() {
        // the winning logit sits at an index the two labels cannot name
        let logits = array![0.0f32, 0.0, 9.0];
        let result = postprocess(logits.view(), &labels(&["cat", "dog"]), 2);
        assert!(matches!(
            result,
            Err(ClassifierError::LabelIndexMismatch { index: 2, labels: 2 })
        ));
    }
}
