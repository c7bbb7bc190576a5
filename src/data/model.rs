use std::fmt;

use super::features::Features;

// ---------------------------------------------------------------------------
// Column – a recognised column of the churn dataset
// ---------------------------------------------------------------------------

/// The columns of the standard bank churn table.
///
/// Files may carry them in any order; only the seven required ones must be
/// present. The order a file uses becomes the table's schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    RowNumber,
    CustomerId,
    Surname,
    CreditScore,
    Geography,
    Gender,
    Age,
    Tenure,
    Balance,
    NumOfProducts,
    HasCrCard,
    IsActiveMember,
    EstimatedSalary,
    Exited,
}

/// How the text of a cell is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    /// 0/1 membership flag.
    Flag,
    Text,
}

impl Column {
    pub const ALL: [Column; 14] = [
        Column::RowNumber,
        Column::CustomerId,
        Column::Surname,
        Column::CreditScore,
        Column::Geography,
        Column::Gender,
        Column::Age,
        Column::Tenure,
        Column::Balance,
        Column::NumOfProducts,
        Column::HasCrCard,
        Column::IsActiveMember,
        Column::EstimatedSalary,
        Column::Exited,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Column::RowNumber => "RowNumber",
            Column::CustomerId => "CustomerId",
            Column::Surname => "Surname",
            Column::CreditScore => "CreditScore",
            Column::Geography => "Geography",
            Column::Gender => "Gender",
            Column::Age => "Age",
            Column::Tenure => "Tenure",
            Column::Balance => "Balance",
            Column::NumOfProducts => "NumOfProducts",
            Column::HasCrCard => "HasCrCard",
            Column::IsActiveMember => "IsActiveMember",
            Column::EstimatedSalary => "EstimatedSalary",
            Column::Exited => "Exited",
        }
    }

    pub fn from_header(header: &str) -> Option<Column> {
        let header = header.trim();
        Column::ALL.into_iter().find(|c| c.header() == header)
    }

    /// Columns the dashboard cannot work without.
    pub fn is_required(self) -> bool {
        matches!(
            self,
            Column::Age
                | Column::Balance
                | Column::Exited
                | Column::Geography
                | Column::Gender
                | Column::IsActiveMember
                | Column::NumOfProducts
        )
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            Column::RowNumber
            | Column::CustomerId
            | Column::CreditScore
            | Column::Age
            | Column::Tenure
            | Column::NumOfProducts => ColumnKind::Integer,
            Column::Balance | Column::EstimatedSalary => ColumnKind::Float,
            Column::HasCrCard | Column::IsActiveMember | Column::Exited => ColumnKind::Flag,
            Column::Surname | Column::Geography | Column::Gender => ColumnKind::Text,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Headers of the derived columns, in the order they follow the schema.
pub const DERIVED_HEADERS: [&str; 3] = ["AgeGroup", "BalanceBucket", "ChurnStatus"];

// ---------------------------------------------------------------------------
// CustomerRecord – one row of the table
// ---------------------------------------------------------------------------

/// A single bank customer.  Optional fields are `None` when the source file
/// does not carry that column.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRecord {
    pub row_number: Option<i64>,
    pub customer_id: Option<i64>,
    pub surname: Option<String>,
    pub credit_score: Option<i64>,
    pub geography: String,
    pub gender: String,
    pub age: u32,
    pub tenure: Option<i64>,
    pub balance: f64,
    pub num_of_products: u32,
    pub has_cr_card: Option<bool>,
    pub is_active_member: bool,
    pub estimated_salary: Option<f64>,
    pub exited: bool,
    /// Derived columns; `None` until the feature pass has run.
    pub features: Option<Features>,
}

impl CustomerRecord {
    /// Render one base column the way it is written to CSV.
    /// Absent optional values render as an empty string.
    pub fn cell_text(&self, column: Column) -> String {
        fn opt<T: ToString>(v: &Option<T>) -> String {
            v.as_ref().map(ToString::to_string).unwrap_or_default()
        }
        match column {
            Column::RowNumber => opt(&self.row_number),
            Column::CustomerId => opt(&self.customer_id),
            Column::Surname => self.surname.clone().unwrap_or_default(),
            Column::CreditScore => opt(&self.credit_score),
            Column::Geography => self.geography.clone(),
            Column::Gender => self.gender.clone(),
            Column::Age => self.age.to_string(),
            Column::Tenure => opt(&self.tenure),
            Column::Balance => format_float(self.balance),
            Column::NumOfProducts => self.num_of_products.to_string(),
            Column::HasCrCard => self.has_cr_card.map(flag_text).unwrap_or_default(),
            Column::IsActiveMember => flag_text(self.is_active_member),
            Column::EstimatedSalary => self.estimated_salary.map(format_float).unwrap_or_default(),
            Column::Exited => flag_text(self.exited),
        }
    }

    /// Render the derived columns in [`DERIVED_HEADERS`] order.
    pub fn derived_text(&self) -> [String; 3] {
        match &self.features {
            Some(f) => [
                f.age_group.map(|g| g.to_string()).unwrap_or_default(),
                f.balance_bucket.map(|b| b.to_string()).unwrap_or_default(),
                f.churn_status.to_string(),
            ],
            None => Default::default(),
        }
    }
}

/// Integral floats keep one decimal so they parse back as floats.
pub fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

fn flag_text(b: bool) -> String {
    String::from(if b { "1" } else { "0" })
}

// ---------------------------------------------------------------------------
// Table – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full parsed dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Recognised columns in source order.
    pub schema: Vec<Column>,
    pub records: Vec<CustomerRecord>,
}

impl Table {
    pub fn new(schema: Vec<Column>, records: Vec<CustomerRecord>) -> Self {
        Table { schema, records }
    }

    /// Number of customers.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Largest balance in the table, `None` when empty.
    pub fn max_balance(&self) -> Option<f64> {
        self.records
            .iter()
            .map(|r| r.balance)
            .max_by(|a, b| a.total_cmp(b))
    }
}
