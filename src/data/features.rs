use std::fmt;

use super::model::{CustomerRecord, Table};

// ---------------------------------------------------------------------------
// Categorical buckets
// ---------------------------------------------------------------------------

/// Age band of a customer.  Bands are right-closed: 25 is "18-25", 26 is
/// "26-35".  The lower edge 18 belongs to the first band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgeGroup {
    From18To25,
    From26To35,
    From36To45,
    From46To55,
    Over55,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 5] = [
        AgeGroup::From18To25,
        AgeGroup::From26To35,
        AgeGroup::From36To45,
        AgeGroup::From46To55,
        AgeGroup::Over55,
    ];

    /// `None` for ages outside `[18, 100]`.
    pub fn from_age(age: u32) -> Option<AgeGroup> {
        match age {
            18..=25 => Some(AgeGroup::From18To25),
            26..=35 => Some(AgeGroup::From26To35),
            36..=45 => Some(AgeGroup::From36To45),
            46..=55 => Some(AgeGroup::From46To55),
            56..=100 => Some(AgeGroup::Over55),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeGroup::From18To25 => "18-25",
            AgeGroup::From26To35 => "26-35",
            AgeGroup::From36To45 => "36-45",
            AgeGroup::From46To55 => "46-55",
            AgeGroup::Over55 => "56+",
        }
    }

    pub fn from_label(label: &str) -> Option<AgeGroup> {
        AgeGroup::ALL.into_iter().find(|g| g.label() == label)
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BalanceBucket {
    Zero,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl BalanceBucket {
    pub const ALL: [BalanceBucket; 5] = [
        BalanceBucket::Zero,
        BalanceBucket::Low,
        BalanceBucket::Medium,
        BalanceBucket::High,
        BalanceBucket::VeryHigh,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BalanceBucket::Zero => "Zero",
            BalanceBucket::Low => "Low",
            BalanceBucket::Medium => "Medium",
            BalanceBucket::High => "High",
            BalanceBucket::VeryHigh => "Very High",
        }
    }

    pub fn from_label(label: &str) -> Option<BalanceBucket> {
        BalanceBucket::ALL.into_iter().find(|b| b.label() == label)
    }
}

impl fmt::Display for BalanceBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Interval edges for [`BalanceBucket`].  The top edge comes from the data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceBuckets {
    upper: f64,
}

impl BalanceBuckets {
    /// Fixed inner edges; intervals are `(-1,0]`, `(0,50k]`, … `(200k,upper]`.
    const EDGES: [f64; 5] = [-1.0, 0.0, 50_000.0, 100_000.0, 200_000.0];

    /// The top edge is the largest observed balance, never below the last
    /// fixed edge.
    pub fn with_upper(upper: f64) -> Self {
        let last = Self::EDGES[Self::EDGES.len() - 1];
        BalanceBuckets {
            upper: if upper.is_finite() { upper.max(last) } else { last },
        }
    }

    pub fn for_table(table: &Table) -> Self {
        Self::with_upper(table.max_balance().unwrap_or(0.0))
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// `None` for balances outside `(-1, upper]` (and for NaN).
    pub fn bucket(&self, balance: f64) -> Option<BalanceBucket> {
        let upper_edges = [
            Self::EDGES[1],
            Self::EDGES[2],
            Self::EDGES[3],
            Self::EDGES[4],
            self.upper,
        ];
        if balance.is_nan() || balance <= Self::EDGES[0] {
            return None;
        }
        upper_edges
            .iter()
            .zip(BalanceBucket::ALL)
            .find(|(edge, _)| balance <= **edge)
            .map(|(_, bucket)| bucket)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChurnStatus {
    Churned,
    Retained,
}

impl ChurnStatus {
    pub const ALL: [ChurnStatus; 2] = [ChurnStatus::Churned, ChurnStatus::Retained];

    pub fn from_exited(exited: bool) -> Self {
        if exited {
            ChurnStatus::Churned
        } else {
            ChurnStatus::Retained
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChurnStatus::Churned => "Churned",
            ChurnStatus::Retained => "Retained",
        }
    }

    pub fn from_label(label: &str) -> Option<ChurnStatus> {
        ChurnStatus::ALL.into_iter().find(|s| s.label() == label)
    }
}

impl fmt::Display for ChurnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rule-based churn likelihood of a single customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChurnRisk {
    High,
    Medium,
    Low,
}

impl ChurnRisk {
    pub const ALL: [ChurnRisk; 3] = [ChurnRisk::High, ChurnRisk::Medium, ChurnRisk::Low];

    /// Inactive customers over 40 holding more than 100k are high risk; any
    /// other inactive customer is medium risk.
    pub fn classify(record: &CustomerRecord) -> Self {
        if record.is_active_member {
            ChurnRisk::Low
        } else if record.age > 40 && record.balance > 100_000.0 {
            ChurnRisk::High
        } else {
            ChurnRisk::Medium
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChurnRisk::High => "High Risk",
            ChurnRisk::Medium => "Medium Risk",
            ChurnRisk::Low => "Low Risk",
        }
    }
}

impl fmt::Display for ChurnRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Feature pass
// ---------------------------------------------------------------------------

/// The derived columns of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    pub age_group: Option<AgeGroup>,
    pub balance_bucket: Option<BalanceBucket>,
    pub churn_status: ChurnStatus,
}

impl Features {
    pub fn compute(record: &CustomerRecord, buckets: &BalanceBuckets) -> Self {
        Features {
            age_group: AgeGroup::from_age(record.age),
            balance_bucket: buckets.bucket(record.balance),
            churn_status: ChurnStatus::from_exited(record.exited),
        }
    }
}

/// Attach [`Features`] to every record.  Re-running overwrites with the same
/// values; base columns are never touched.
pub fn derive_features(table: &mut Table) {
    let buckets = BalanceBuckets::for_table(table);
    let mut unbucketed = 0usize;

    for record in &mut table.records {
        let features = Features::compute(record, &buckets);
        if features.age_group.is_none() || features.balance_bucket.is_none() {
            unbucketed += 1;
        }
        record.features = Some(features);
    }

    if unbucketed > 0 {
        log::warn!("{unbucketed} customers fall outside the age or balance buckets");
    }
    log::debug!(
        "Derived features for {} customers (balance upper edge {:.2})",
        table.len(),
        buckets.upper()
    );
}
