use super::group::{BenchmarkReport, GroupReport};
use crate::domain::ChallengeResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_challenges: usize,
    pub top1_hits: usize,
    pub top5_hits: usize,
    pub top10_hits: usize,
    pub top1_accuracy_pct: f64,
    pub top5_accuracy_pct: f64,
    pub top10_accuracy_pct: f64,
}

pub fn summarize(results: &[ChallengeResult]) -> Summary {
    let total_challenges = results.len();
    let top1_hits = results.iter().filter(|result| result.in_top1).count();
    let top5_hits = results.iter().filter(|result| result.in_top5).count();
    let top10_hits = results.iter().filter(|result| result.in_top10).count();

    Summary {
        total_challenges,
        top1_hits,
        top5_hits,
        top10_hits,
        top1_accuracy_pct: accuracy_pct(top1_hits, total_challenges),
        top5_accuracy_pct: accuracy_pct(top5_hits, total_challenges),
        top10_accuracy_pct: accuracy_pct(top10_hits, total_challenges),
    }
}

fn accuracy_pct(hits: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * hits as f64 / total as f64
    }
}

pub fn render_human_summary(report: &BenchmarkReport) -> String {
    let mut lines = Vec::new();
    for group in [&report.positive, &report.negative] {
        render_group(group, &mut lines);
    }
    lines.join("\n")
}

fn render_group(group: &GroupReport, lines: &mut Vec<String>) {
    let summary = &group.summary;
    lines.push(format!(
        "Mode {}: {} challenges",
        group.ion_mode, summary.total_challenges
    ));
    lines.push(format!(
        "  top1: {}/{} ({:.2}%)",
        summary.top1_hits, summary.total_challenges, summary.top1_accuracy_pct
    ));
    lines.push(format!(
        "  top5: {}/{} ({:.2}%)",
        summary.top5_hits, summary.total_challenges, summary.top5_accuracy_pct
    ));
    lines.push(format!(
        "  top10: {}/{} ({:.2}%)",
        summary.top10_hits, summary.total_challenges, summary.top10_accuracy_pct
    ));
    for failure in &group.failures {
        lines.push(format!(
            "  failed {}: [{}] {}",
            failure.challenge_name, failure.placeholder, failure.message
        ));
    }
}
