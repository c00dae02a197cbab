//! Exact-match precision / recall / F1 between ground-truth and predicted annotations.
//!
//! Matching is greedy: each ground-truth annotation, in order, takes the first
//! unused predicted annotation equal to it on all four fields. Segment
//! boundaries and CoT text are ignored.

use serde::{Deserialize, Serialize};

use crate::models::{Annotation, Document, Segment};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualDataMetrics {
    pub data_index: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub total_true_positives: usize,
    pub total_false_positives: usize,
    pub total_false_negatives: usize,
    pub individual_scores: Vec<IndividualDataMetrics>,
}

/// Sense, stimulus, perception and sentiment all equal. CoT is not compared.
pub fn annotations_match(a: &Annotation, b: &Annotation) -> bool {
    a.sense == b.sense
        && a.stimulus == b.stimulus
        && a.perception == b.perception
        && a.sentiment == b.sentiment
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// `(precision, recall, f1)` from raw counts; any zero denominator yields 0.
fn prf(tp: usize, fp: usize, fn_: usize) -> (f64, f64, f64) {
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    (precision, recall, f1)
}

pub fn score_document(
    ground_truth: &Document,
    predicted: &[Segment],
    index: usize,
) -> IndividualDataMetrics {
    let expected: Vec<&Annotation> = ground_truth
        .segments
        .iter()
        .flat_map(|s| s.annotations.iter())
        .collect();
    let actual: Vec<&Annotation> = predicted.iter().flat_map(|s| s.annotations.iter()).collect();

    let mut used = vec![false; actual.len()];
    let mut true_positives = 0;
    let mut false_negatives = 0;

    for truth in &expected {
        let hit = actual
            .iter()
            .enumerate()
            .position(|(i, candidate)| !used[i] && annotations_match(truth, candidate));
        match hit {
            Some(i) => {
                used[i] = true;
                true_positives += 1;
            }
            None => false_negatives += 1,
        }
    }

    let false_positives = used.iter().filter(|u| !**u).count();
    let (precision, recall, f1) = prf(true_positives, false_positives, false_negatives);

    IndividualDataMetrics {
        data_index: index,
        precision,
        recall,
        f1,
        true_positives,
        false_positives,
        false_negatives,
    }
}

/// Pools the counts of every item and recomputes P/R/F1 from the sums
/// (micro-average), keeping the per-item scores.
pub fn aggregate(individual_scores: Vec<IndividualDataMetrics>) -> ValidationMetrics {
    let (tp, fp, fn_) = individual_scores.iter().fold((0, 0, 0), |(tp, fp, fn_), m| {
        (
            tp + m.true_positives,
            fp + m.false_positives,
            fn_ + m.false_negatives,
        )
    });
    let (precision, recall, f1) = prf(tp, fp, fn_);

    ValidationMetrics {
        precision,
        recall,
        f1,
        total_true_positives: tp,
        total_false_positives: fp,
        total_false_negatives: fn_,
        individual_scores,
    }
}

/// Scores `(ground truth, predicted)` pairs in order; `dataIndex` is the pair's position.
pub fn score_batch<'a, I>(pairs: I) -> ValidationMetrics
where
    I: IntoIterator<Item = (&'a Document, &'a [Segment])>,
{
    let scores = pairs
        .into_iter()
        .enumerate()
        .map(|(i, (truth, predicted))| score_document(truth, predicted, i))
        .collect();
    aggregate(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Sense, Sentiment};

    fn bread() -> Annotation {
        Annotation::new(Sense::Smell, "bread", "warm scent", Sentiment::Positive)
    }

    fn bell() -> Annotation {
        Annotation::new(Sense::Hearing, "bell", "ringing", Sentiment::Neutral)
    }

    fn document(annotations: Vec<Annotation>) -> Document {
        Document::new("text", vec![Segment::new(0, 4, annotations)])
    }

    fn segments(annotations: Vec<Annotation>) -> Vec<Segment> {
        vec![Segment::new(0, 4, annotations)]
    }

    #[test]
    fn test_match_ignores_cot() {
        assert!(annotations_match(&bread(), &bread().with_cot("because")));
        let mut other = bread();
        other.sentiment = Sentiment::Neutral;
        assert!(!annotations_match(&bread(), &other));
    }

    #[test]
    fn test_identical_sets_score_one() {
        let truth = document(vec![bread(), bell()]);
        let metrics = score_document(&truth, &truth.segments, 0);
        assert_eq!(metrics.true_positives, 2);
        assert_eq!(metrics.precision, 1.0);
        assert_eq!(metrics.recall, 1.0);
        assert_eq!(metrics.f1, 1.0);
    }

    #[test]
    fn test_disjoint_sets_score_zero() {
        let metrics = score_document(&document(vec![bread()]), &segments(vec![bell()]), 3);
        assert_eq!(metrics.data_index, 3);
        assert_eq!((metrics.true_positives, metrics.false_positives, metrics.false_negatives), (0, 1, 1));
        assert_eq!(metrics.f1, 0.0);
    }

    #[test]
    fn test_duplicates_match_at_most_once() {
        let metrics = score_document(&document(vec![bread(), bread()]), &segments(vec![bread()]), 0);
        assert_eq!(metrics.true_positives, 1);
        assert_eq!(metrics.false_negatives, 1);
        assert_eq!(metrics.false_positives, 0);
        assert_eq!(metrics.precision, 1.0);
        assert_eq!(metrics.recall, 0.5);
    }

    #[test]
    fn test_segment_boundaries_are_ignored() {
        let truth = Document::new(
            "ab",
            vec![
                Segment::new(0, 1, vec![bread()]),
                Segment::new(1, 2, vec![bell()]),
            ],
        );
        let metrics = score_document(&truth, &segments(vec![bell(), bread()]), 0);
        assert_eq!(metrics.true_positives, 2);
    }

    #[test]
    fn test_empty_everything_is_zero_not_nan() {
        let metrics = score_document(&document(vec![]), &[], 0);
        assert_eq!((metrics.precision, metrics.recall, metrics.f1), (0.0, 0.0, 0.0));
        assert_eq!(aggregate(Vec::new()), ValidationMetrics::default());
    }

    #[test]
    fn test_aggregate_pools_counts() {
        let perfect = score_document(&document(vec![bread()]), &segments(vec![bread()]), 0);
        let miss = score_document(
            &document(vec![bread(), bell(), bell()]),
            &segments(vec![]),
            1,
        );
        let metrics = aggregate(vec![perfect, miss]);
        assert_eq!(metrics.total_true_positives, 1);
        assert_eq!(metrics.total_false_negatives, 3);
        assert_eq!(metrics.precision, 1.0);
        assert_eq!(metrics.recall, 0.25);
        // Mean of per-item F1 would be 0.5.
        assert!((metrics.f1 - 0.4).abs() < 1e-12);
        assert_eq!(metrics.individual_scores.len(), 2);
    }

    #[test]
    fn test_score_batch_indexes_in_order() {
        let a = document(vec![bread()]);
        let b = document(vec![bell()]);
        let pa = segments(vec![bread()]);
        let pb = segments(vec![]);
        let metrics = score_batch(vec![(&a, pa.as_slice()), (&b, pb.as_slice())]);
        let indices: Vec<usize> = metrics.individual_scores.iter().map(|m| m.data_index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(metrics.total_true_positives, 1);
    }

    #[test]
    fn test_metrics_serialize_camel_case() {
        let metrics = aggregate(vec![score_document(&document(vec![bread()]), &[], 0)]);
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["totalFalseNegatives"], 1);
        assert_eq!(json["individualScores"][0]["dataIndex"], 0);
        assert_eq!(json["individualScores"][0]["truePositives"], 0);
    }
}
