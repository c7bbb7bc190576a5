use std::collections::BTreeMap;
use std::fmt;

use super::features::{ChurnRisk, ChurnStatus};
use super::filter::Subset;
use super::model::CustomerRecord;

// ---------------------------------------------------------------------------
// KPIs
// ---------------------------------------------------------------------------

/// Headline numbers for the filtered subset.
#[derive(Debug, Clone, PartialEq)]
pub struct Kpis {
    pub total: usize,
    pub churned: usize,
    /// Percentage, 0 for an empty subset.
    pub churn_rate: f64,
    /// `None` for an empty subset.
    pub mean_balance: Option<f64>,
}

impl Kpis {
    pub fn compute(subset: &Subset<'_>) -> Self {
        let total = subset.len();
        let churned = subset.records().filter(|r| r.exited).count();
        Kpis {
            total,
            churned,
            churn_rate: churn_rate(churned, total),
            mean_balance: mean(subset.records().map(|r| r.balance)),
        }
    }
}

/// `churned / total * 100`, defined as 0 when `total` is 0.
pub fn churn_rate(churned: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        churned as f64 / total as f64 * 100.0
    }
}

/// Mean of the non-NaN values.
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

// ---------------------------------------------------------------------------
// Grouped churn rates
// ---------------------------------------------------------------------------

/// Membership state, labelled the way the dashboard shows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Activity {
    Active,
    Inactive,
}

impl Activity {
    pub fn from_flag(is_active_member: bool) -> Self {
        if is_active_member {
            Activity::Active
        } else {
            Activity::Inactive
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Activity::Active => "Active",
            Activity::Inactive => "Inactive",
        })
    }
}

/// Mean of `Exited` × 100 per group.  Only groups present in the subset
/// appear.
pub fn churn_rate_by<K, F>(subset: &Subset<'_>, key: F) -> BTreeMap<K, f64>
where
    K: Ord,
    F: Fn(&CustomerRecord) -> K,
{
    let mut tallies: BTreeMap<K, (usize, usize)> = BTreeMap::new();
    for r in subset.records() {
        let entry = tallies.entry(key(r)).or_default();
        entry.0 += usize::from(r.exited);
        entry.1 += 1;
    }
    tallies
        .into_iter()
        .map(|(k, (churned, total))| (k, churn_rate(churned, total)))
        .collect()
}

/// Rescale a mapping so its values sum to 100, for part-of-whole charts.
/// All-zero input stays all zero.
pub fn shares<K: Ord + Clone>(values: &BTreeMap<K, f64>) -> BTreeMap<K, f64> {
    let sum: f64 = values.values().sum();
    values
        .iter()
        .map(|(k, v)| {
            let share = if sum > 0.0 { v / sum * 100.0 } else { 0.0 };
            (k.clone(), share)
        })
        .collect()
}

fn status_of(r: &CustomerRecord) -> ChurnStatus {
    r.features
        .map(|f| f.churn_status)
        .unwrap_or_else(|| ChurnStatus::from_exited(r.exited))
}

// ---------------------------------------------------------------------------
// Age histogram
// ---------------------------------------------------------------------------

/// Equal-width age bins over the subset's age range, counted per churn status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgeHistogram {
    /// `bins + 1` edges; empty when the subset is empty.
    pub edges: Vec<f64>,
    pub counts: BTreeMap<ChurnStatus, Vec<usize>>,
}

impl AgeHistogram {
    /// Bins are left-closed except the last, which also takes the maximum.
    pub fn compute(subset: &Subset<'_>, bins: usize) -> Self {
        let bins = bins.max(1);
        let Some((lo, hi)) = subset.records().fold(None, |acc, r| {
            let age = r.age as f64;
            Some(match acc {
                Some((lo, hi)) => (f64::min(lo, age), f64::max(hi, age)),
                None => (age, age),
            })
        }) else {
            return AgeHistogram::default();
        };

        let width = if hi > lo { (hi - lo) / bins as f64 } else { 1.0 };
        let edges = (0..=bins).map(|i| lo + i as f64 * width).collect();

        let mut counts: BTreeMap<ChurnStatus, Vec<usize>> = BTreeMap::new();
        for r in subset.records() {
            let idx = (((r.age as f64 - lo) / width).floor() as usize).min(bins - 1);
            counts.entry(status_of(r)).or_insert_with(|| vec![0; bins])[idx] += 1;
        }

        AgeHistogram { edges, counts }
    }

    pub fn bin_width(&self) -> Option<f64> {
        match self.edges.as_slice() {
            [a, b, ..] => Some(b - a),
            _ => None,
        }
    }

    pub fn total(&self) -> usize {
        self.counts.values().flatten().sum()
    }
}

// ---------------------------------------------------------------------------
// Box-plot summaries
// ---------------------------------------------------------------------------

/// Five-number summary plus Tukey whiskers and outliers.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    /// Smallest value within `q1 - 1.5 * IQR`.
    pub lower_whisker: f64,
    /// Largest value within `q3 + 1.5 * IQR`.
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxSummary {
    /// `None` when no non-NaN values are given.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut sorted: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile(&sorted, 0.25);
        let q3 = quantile(&sorted, 0.75);
        let iqr = q3 - q1;
        let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        let inside = || {
            sorted
                .iter()
                .copied()
                .filter(move |v| (lo_fence..=hi_fence).contains(v))
        };
        let lower_whisker = inside().next().unwrap_or(q1);
        let upper_whisker = inside().last().unwrap_or(q3);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|v| !(lo_fence..=hi_fence).contains(v))
            .collect();

        Some(BoxSummary {
            count: sorted.len(),
            min: sorted[0],
            q1,
            median: quantile(&sorted, 0.5),
            q3,
            max: sorted[sorted.len() - 1],
            lower_whisker,
            upper_whisker,
            outliers,
        })
    }
}

/// Linear-interpolated quantile of sorted, non-empty data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

// ---------------------------------------------------------------------------
// Full report
// ---------------------------------------------------------------------------

/// Everything the dashboard draws for one filter state.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardReport {
    pub kpis: Kpis,
    pub churn_by_geography: BTreeMap<String, f64>,
    pub churn_by_gender: BTreeMap<String, f64>,
    pub age_histogram: AgeHistogram,
    pub balance_by_status: BTreeMap<ChurnStatus, BoxSummary>,
    pub churn_by_activity: BTreeMap<Activity, f64>,
    pub risk_counts: BTreeMap<ChurnRisk, usize>,
}

impl DashboardReport {
    pub fn compute(subset: &Subset<'_>, age_bins: usize) -> Self {
        let mut balances: BTreeMap<ChurnStatus, Vec<f64>> = BTreeMap::new();
        let mut risk_counts: BTreeMap<ChurnRisk, usize> = BTreeMap::new();
        for r in subset.records() {
            balances.entry(status_of(r)).or_default().push(r.balance);
            *risk_counts.entry(ChurnRisk::classify(r)).or_default() += 1;
        }

        DashboardReport {
            kpis: Kpis::compute(subset),
            churn_by_geography: churn_rate_by(subset, |r| r.geography.clone()),
            churn_by_gender: churn_rate_by(subset, |r| r.gender.clone()),
            age_histogram: AgeHistogram::compute(subset, age_bins),
            balance_by_status: balances
                .into_iter()
                .filter_map(|(status, values)| Some((status, BoxSummary::from_values(values)?)))
                .collect(),
            churn_by_activity: churn_rate_by(subset, |r| Activity::from_flag(r.is_active_member)),
            risk_counts,
        }
    }

    /// Gender churn rates as proportions of their sum.
    pub fn gender_shares(&self) -> BTreeMap<String, f64> {
        shares(&self.churn_by_gender)
    }
}

// ---------------------------------------------------------------------------
// Insights
// ---------------------------------------------------------------------------

/// Short business observations printed under the charts.
#[derive(Debug, Clone, PartialEq)]
pub struct Insights {
    pub lines: Vec<String>,
}

impl Insights {
    pub fn from_report(subset: &Subset<'_>, report: &DashboardReport) -> Self {
        let mut lines = vec![format!(
            "Overall churn rate is {:.2}%",
            report.kpis.churn_rate
        )];

        let activity = &report.churn_by_activity;
        if let (Some(inactive), Some(active)) =
            (activity.get(&Activity::Inactive), activity.get(&Activity::Active))
        {
            lines.push(format!(
                "Inactive customers churn at {inactive:.2}% versus {active:.2}% for active ones"
            ));
        }

        let over_40 = subset.records().filter(|r| r.age >= 40);
        let (older_churned, older_total) =
            over_40.fold((0, 0), |(c, t), r| (c + usize::from(r.exited), t + 1));
        if report.kpis.churned > 0 {
            lines.push(format!(
                "Customers aged 40+ account for {:.1}% of churn ({older_churned} of {} churned, {older_total} customers)",
                older_churned as f64 / report.kpis.churned as f64 * 100.0,
                report.kpis.churned
            ));
        }

        let high_risk = report.risk_counts.get(&ChurnRisk::High).copied().unwrap_or(0);
        lines.push(format!(
            "{high_risk} high-balance inactive customers over 40 are high risk"
        ));

        let by_products = churn_rate_by(subset, |r| r.num_of_products > 1);
        if let (Some(single), Some(multi)) = (by_products.get(&false), by_products.get(&true)) {
            lines.push(format!(
                "Customers with multiple products churn at {multi:.2}% versus {single:.2}% with one"
            ));
        }

        Insights { lines }
    }
}
