//! Ranking and accuracy measures for ensemble scores.
//!
//! Scores measure support, so a lower score is more anomalous. Labels use
//! `1.0` for an anomaly and `0.0` for a normal record.

use std::time::Duration;

/// AUC recorded for a run that produced no usable scores.
pub const INVALID_AUC: f64 = -1.0;

fn is_anomaly(label: f64) -> bool {
    label > 0.0
}

/// Mann-Whitney AUC: the probability that a normal record scores higher than
/// an anomaly, ties counting one half. `None` when either class is absent.
pub fn auc(labels: &[f64], scores: &[f64]) -> Option<f64> {
    let ranks = average_ranks(scores);
    let mut n_anomalies = 0.0;
    let mut n_normals = 0.0;
    let mut normal_rank_sum = 0.0;
    for (&label, &rank) in labels.iter().zip(&ranks) {
        if label.is_nan() {
            continue;
        }
        if is_anomaly(label) {
            n_anomalies += 1.0;
        } else {
            n_normals += 1.0;
            normal_rank_sum += rank;
        }
    }
    if n_anomalies == 0.0 || n_normals == 0.0 {
        return None;
    }
    // normals ranked above anomalies, counted through the rank-sum
    let u = normal_rank_sum - n_normals * (n_normals + 1.0) / 2.0;
    Some(u / (n_normals * n_anomalies))
}

/// Ascending 1-based ranks with tied scores sharing their average rank.
fn average_ranks(scores: &[f64]) -> Vec<f64> {
    let order = ascending_order(scores);
    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1..=end
        let rank = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }
    ranks
}

/// Record indices sorted by ascending score; ties keep record order.
fn ascending_order(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
    order
}

/// 1-based rank of every record, rank 1 being the lowest (most anomalous) score.
pub fn outlier_ranking(scores: &[f64]) -> Vec<usize> {
    let mut ranking = vec![0; scores.len()];
    for (position, index) in ascending_order(scores).into_iter().enumerate() {
        ranking[index] = position + 1;
    }
    ranking
}

/// Whether each record lands on the right side of the anomaly cut-off, the
/// cut-off being the number of labelled anomalies.
pub fn detection_flags(ranking: &[usize], labels: &[f64]) -> Vec<bool> {
    let n_anomalies = labels.iter().filter(|&&l| is_anomaly(l)).count();
    ranking
        .iter()
        .zip(labels)
        .map(|(&rank, &label)| {
            if is_anomaly(label) {
                rank <= n_anomalies
            } else {
                rank > n_anomalies
            }
        })
        .collect()
}

/// Precision, recall and F1 of flagging the `top_n` best-ranked records.
pub fn threshold_metrics(labels: &[f64], ranking: &[usize], top_n: usize) -> (f64, f64, f64) {
    let mut tp = 0.0;
    let mut fp = 0.0;
    let mut fn_count = 0.0;

    for (&label, &rank) in labels.iter().zip(ranking) {
        let predicted = rank <= top_n;

        if is_anomaly(label) && predicted {
            tp += 1.0;
        } else if !is_anomaly(label) && predicted {
            fp += 1.0;
        } else if is_anomaly(label) && !predicted {
            fn_count += 1.0;
        }
    }

    let precision = if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 };
    let recall = if tp + fn_count > 0.0 { tp / (tp + fn_count) } else { 0.0 };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    (precision, recall, f1)
}

/// Outcome of one outer run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run: usize,
    pub seed: u64,
    /// [`INVALID_AUC`] when the run could not be evaluated
    pub auc: f64,
    pub build_time: Duration,
    pub score_time: Duration,
}

/// Mean AUC over runs with the half-width of its 2-sigma interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub mean_auc: f64,
    pub interval: f64,
    pub runs: usize,
}

impl RunSummary {
    pub fn from_aucs(aucs: &[f64]) -> Self {
        let runs = aucs.len();
        if runs == 0 {
            return Self {
                mean_auc: INVALID_AUC,
                interval: 0.0,
                runs,
            };
        }
        let n = runs as f64;
        let mean_auc = aucs.iter().sum::<f64>() / n;
        let variance = if runs > 1 {
            aucs.iter().map(|a| (a - mean_auc).powi(2)).sum::<f64>() / (n - 1.0)
        } else {
            0.0
        };
        Self {
            mean_auc,
            interval: 2.0 * variance.sqrt() / n.sqrt(),
            runs,
        }
    }

    /// Every run counts, a failed one with [`INVALID_AUC`].
    pub fn from_reports(reports: &[RunReport]) -> Self {
        let aucs: Vec<f64> = reports.iter().map(|r| r.auc).collect();
        Self::from_aucs(&aucs)
    }
}
