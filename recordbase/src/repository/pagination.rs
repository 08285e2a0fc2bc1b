//! Selections, filter conditions and page windows
//!
//! A [`Selection`] identifies the rows an operation reads or touches. It is
//! either built from typed [`FilterCondition`]s (always bound as statement
//! parameters) or supplied as a raw predicate string that is handed to the
//! storage engine untouched.
//!
//! # Example
//!
//! ```rust
//! use recordbase::repository::{FilterCondition, FilterValue, Pagination, Selection};
//!
//! // Equality map: status = 'active' AND team_id IN (1, 2)
//! let active = Selection::equals([
//!     ("status", FilterValue::from("active")),
//!     ("team_id", FilterValue::from(vec![1_i64, 2])),
//! ]);
//!
//! // Structured predicate with a disjunction
//! let recent_or_vip = Selection::any([
//!     Selection::from(FilterCondition::gte("created_at", "2024-01-01")),
//!     Selection::from(FilterCondition::eq("tier", "vip")),
//! ]);
//!
//! // Raw predicate escape hatch
//! let raw: Selection = "score > 10 AND deleted_at IS NULL".into();
//!
//! assert!(!active.is_empty() && !recent_or_vip.is_empty() && !raw.is_empty());
//! assert_eq!(Pagination::page(3, 10).offset, 20);
//! ```

use std::fmt;

use crate::value::Value;

/// Direction for ordering results
///
/// # Example
///
/// ```rust
/// use recordbase::repository::OrderDirection;
///
/// assert_eq!(format!("{}", OrderDirection::Ascending), "asc");
/// assert_eq!(format!("{}", OrderDirection::Descending), "desc");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    Descending,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// A page window translated to offset/limit
///
/// # Example
///
/// ```rust
/// use recordbase::repository::Pagination;
///
/// let page3 = Pagination::page(3, 10);
/// assert_eq!((page3.offset, page3.limit), (20, 10));
///
/// // Pages below 1 clamp to the first page
/// assert_eq!(Pagination::page(0, 30).offset, 0);
/// assert_eq!(Pagination::page(-4, 30).offset, 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Number of rows to skip
    pub offset: u64,
    /// Maximum number of rows to return
    pub limit: u64,
}

impl Pagination {
    /// Page size used when callers do not pick one
    pub const DEFAULT_PAGE_SIZE: u64 = 30;

    /// Largest offset or limit a SQL engine accepts (signed 64-bit)
    pub const MAX_ROWS: u64 = i64::MAX as u64;

    /// Create a window from a raw offset and limit
    ///
    /// Both bounds are clamped to [`MAX_ROWS`](Self::MAX_ROWS).
    #[must_use]
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset: clamp_rows(offset),
            limit: clamp_rows(limit),
        }
    }

    /// Create a window for the first page with the given size
    #[must_use]
    pub const fn first_page(limit: u64) -> Self {
        Self::new(0, limit)
    }

    /// Create a window for a 1-indexed page number
    ///
    /// Page numbers below 1 are treated as page 1.
    #[must_use]
    pub const fn page(page_number: i64, page_size: u64) -> Self {
        let skipped_pages = if page_number < 1 {
            0
        } else {
            (page_number - 1) as u64
        };
        Self::new(skipped_pages.saturating_mul(page_size), page_size)
    }

    /// Window that yields at most one row
    #[must_use]
    pub const fn single() -> Self {
        Self::first_page(1)
    }
}

const fn clamp_rows(rows: u64) -> u64 {
    if rows > Pagination::MAX_ROWS {
        Pagination::MAX_ROWS
    } else {
        rows
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::first_page(Self::DEFAULT_PAGE_SIZE)
    }
}

/// Comparison operators for filter conditions
///
/// # Example
///
/// ```rust
/// use recordbase::repository::FilterOperator;
///
/// assert_eq!(format!("{}", FilterOperator::Equal), "=");
/// assert_eq!(format!("{}", FilterOperator::Like), "LIKE");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to (=)
    Equal,
    /// Not equal to (!=)
    NotEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal to (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal to (<=)
    LessThanOrEqual,
    /// Pattern matching (LIKE)
    Like,
    /// Value is in a list (IN)
    In,
    /// Value is null (IS NULL)
    IsNull,
    /// Value is not null (IS NOT NULL)
    IsNotNull,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::Like => write!(f, "LIKE"),
            Self::In => write!(f, "IN"),
            Self::IsNull => write!(f, "IS NULL"),
            Self::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// The right-hand side of a filter condition
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// A single value
    Scalar(Value),
    /// A set of values (for IN)
    List(Vec<Value>),
}

impl FilterValue {
    /// Whether this is the SQL NULL scalar
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Value::Null))
    }
}

impl From<Value> for FilterValue {
    fn from(value: Value) -> Self {
        Self::Scalar(value)
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::Scalar(s.into())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::Scalar(s.into())
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Scalar(n.into())
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Scalar(n.into())
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Scalar(n.into())
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Scalar(b.into())
    }
}

impl From<Vec<Value>> for FilterValue {
    fn from(list: Vec<Value>) -> Self {
        Self::List(list)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(list: Vec<String>) -> Self {
        Self::List(list.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(list: Vec<&str>) -> Self {
        Self::List(list.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<i64>> for FilterValue {
    fn from(list: Vec<i64>) -> Self {
        Self::List(list.into_iter().map(Value::from).collect())
    }
}

/// A single column comparison
///
/// # Example
///
/// ```rust
/// use recordbase::repository::{FilterCondition, FilterOperator};
///
/// let adults = FilterCondition::gte("age", 18_i64);
/// assert_eq!(adults.operator, FilterOperator::GreaterThanOrEqual);
///
/// let unverified = FilterCondition::is_null("verified_at");
/// assert_eq!(unverified.operator, FilterOperator::IsNull);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// The column to filter on
    pub field: String,
    /// The comparison operator
    pub operator: FilterOperator,
    /// The value to compare against
    pub value: FilterValue,
}

impl FilterCondition {
    /// Create a new filter condition
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// field = value
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::Equal, value.into())
    }

    /// field != value
    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::NotEqual, value.into())
    }

    /// field > value
    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThan, value.into())
    }

    /// field >= value
    pub fn gte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value.into())
    }

    /// field < value
    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThan, value.into())
    }

    /// field <= value
    pub fn lte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value.into())
    }

    /// field LIKE pattern
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(
            field,
            FilterOperator::Like,
            FilterValue::Scalar(Value::Text(pattern.into())),
        )
    }

    /// field IN (values...)
    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(
            field,
            FilterOperator::In,
            FilterValue::List(values.into_iter().map(Into::into).collect()),
        )
    }

    /// field IS NULL
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNull, FilterValue::Scalar(Value::Null))
    }

    /// field IS NOT NULL
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(
            field,
            FilterOperator::IsNotNull,
            FilterValue::Scalar(Value::Null),
        )
    }
}

/// Criteria identifying the rows an operation reads or touches
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// One column comparison
    Condition(FilterCondition),
    /// Every child must match
    All(Vec<Selection>),
    /// At least one child must match
    Any(Vec<Selection>),
    /// A predicate in the storage engine's own syntax, passed through verbatim
    ///
    /// Nothing is escaped. Composing this string safely is the caller's job.
    Raw(String),
}

impl Selection {
    /// Build the equality-map form
    ///
    /// Scalars compile to `col = value`, lists to `col IN (...)` and nulls to
    /// `col IS NULL`. All pairs must hold.
    pub fn equals<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, FilterValue)>,
        K: Into<String>,
    {
        Self::All(
            pairs
                .into_iter()
                .map(|(field, value)| {
                    let operator = match value {
                        FilterValue::List(_) => FilterOperator::In,
                        FilterValue::Scalar(Value::Null) => FilterOperator::IsNull,
                        FilterValue::Scalar(_) => FilterOperator::Equal,
                    };
                    Self::Condition(FilterCondition::new(field, operator, value))
                })
                .collect(),
        )
    }

    /// Conjunction of selections
    pub fn all(selections: impl IntoIterator<Item = Selection>) -> Self {
        Self::All(selections.into_iter().collect())
    }

    /// Disjunction of selections
    pub fn any(selections: impl IntoIterator<Item = Selection>) -> Self {
        Self::Any(selections.into_iter().collect())
    }

    /// Raw predicate escape hatch
    pub fn raw(predicate: impl Into<String>) -> Self {
        Self::Raw(predicate.into())
    }

    /// Whether the selection carries no criteria at all
    ///
    /// An empty selection would match every row, so mutating operations
    /// refuse to run with one.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Condition(_) => false,
            Self::All(children) | Self::Any(children) => children.iter().all(Selection::is_empty),
            Self::Raw(predicate) => predicate.trim().is_empty(),
        }
    }
}

impl From<FilterCondition> for Selection {
    fn from(condition: FilterCondition) -> Self {
        Self::Condition(condition)
    }
}

impl From<Vec<FilterCondition>> for Selection {
    fn from(conditions: Vec<FilterCondition>) -> Self {
        Self::All(conditions.into_iter().map(Self::Condition).collect())
    }
}

impl From<&[FilterCondition]> for Selection {
    fn from(conditions: &[FilterCondition]) -> Self {
        Self::All(conditions.iter().cloned().map(Self::Condition).collect())
    }
}

impl From<&str> for Selection {
    fn from(predicate: &str) -> Self {
        Self::Raw(predicate.to_string())
    }
}

impl From<String> for Selection {
    fn from(predicate: String) -> Self {
        Self::Raw(predicate)
    }
}

impl From<&String> for Selection {
    fn from(predicate: &String) -> Self {
        Self::Raw(predicate.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_direction_display() {
        assert_eq!(format!("{}", OrderDirection::Ascending), "asc");
        assert_eq!(format!("{}", OrderDirection::Descending), "desc");
    }

    #[test]
    fn test_pagination_page() {
        let page1 = Pagination::page(1, 30);
        assert_eq!((page1.offset, page1.limit), (0, 30));

        let page3 = Pagination::page(3, 10);
        assert_eq!((page3.offset, page3.limit), (20, 10));
    }

    #[test]
    fn test_pagination_page_zero_and_negative() {
        assert_eq!(Pagination::page(0, 30), Pagination::page(1, 30));
        assert_eq!(Pagination::page(-2, 30).offset, 0);
    }

    #[test]
    fn test_pagination_clamps_to_signed_range() {
        let far = Pagination::page(i64::MAX, 30);
        assert_eq!(far.offset, Pagination::MAX_ROWS);
        assert_eq!(far.limit, 30);

        let huge = Pagination::page(1, u64::MAX);
        assert_eq!((huge.offset, huge.limit), (0, Pagination::MAX_ROWS));

        let raw = Pagination::new(u64::MAX, u64::MAX);
        assert_eq!((raw.offset, raw.limit), (Pagination::MAX_ROWS, Pagination::MAX_ROWS));
    }

    #[test]
    fn test_pagination_default() {
        let pagination = Pagination::default();
        assert_eq!(pagination.offset, 0);
        assert_eq!(pagination.limit, Pagination::DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_pagination_single() {
        assert_eq!(Pagination::single(), Pagination::new(0, 1));
    }

    #[test]
    fn test_filter_operator_display() {
        assert_eq!(format!("{}", FilterOperator::NotEqual), "!=");
        assert_eq!(format!("{}", FilterOperator::GreaterThanOrEqual), ">=");
        assert_eq!(format!("{}", FilterOperator::In), "IN");
        assert_eq!(format!("{}", FilterOperator::IsNotNull), "IS NOT NULL");
    }

    #[test]
    fn test_filter_value_conversions() {
        assert_eq!(
            FilterValue::from("a"),
            FilterValue::Scalar(Value::Text("a".into()))
        );
        assert_eq!(
            FilterValue::from(vec![1_i64, 2]),
            FilterValue::List(vec![Value::Integer(1), Value::Integer(2)])
        );
        assert!(FilterValue::from(Value::Null).is_null());
    }

    #[test]
    fn test_filter_condition_is_in() {
        let filter = FilterCondition::is_in("user_id", [1_i64, 2, 3]);
        assert_eq!(filter.operator, FilterOperator::In);
        assert_eq!(
            filter.value,
            FilterValue::List(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)])
        );
    }

    #[test]
    fn test_equals_picks_operator_from_value() {
        let selection = Selection::equals([
            ("status", FilterValue::from("active")),
            ("team_id", FilterValue::from(vec![1_i64, 2])),
            ("deleted_at", FilterValue::from(Value::Null)),
        ]);

        let Selection::All(children) = selection else {
            panic!("expected a conjunction");
        };
        let operators: Vec<FilterOperator> = children
            .iter()
            .map(|child| match child {
                Selection::Condition(c) => c.operator,
                other => panic!("unexpected child {:?}", other),
            })
            .collect();
        assert_eq!(
            operators,
            vec![
                FilterOperator::Equal,
                FilterOperator::In,
                FilterOperator::IsNull
            ]
        );
    }

    #[test]
    fn test_selection_emptiness() {
        assert!(Selection::raw("").is_empty());
        assert!(Selection::raw("   ").is_empty());
        assert!(Selection::equals(Vec::<(&str, FilterValue)>::new()).is_empty());
        assert!(Selection::any([Selection::All(vec![]), Selection::raw(" ")]).is_empty());

        assert!(!Selection::raw("1 = 1").is_empty());
        assert!(!Selection::from(FilterCondition::is_null("x")).is_empty());
        assert!(!Selection::all([Selection::raw(""), Selection::raw("a = 1")]).is_empty());
    }

    #[test]
    fn test_raw_selection_from_strings() {
        assert_eq!(Selection::from("a = 1"), Selection::Raw("a = 1".into()));
        let owned = String::from("b = 2");
        assert_eq!(Selection::from(&owned), Selection::Raw("b = 2".into()));
    }
}
