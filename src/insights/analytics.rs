use std::collections::BTreeMap;

use serde::Serialize;
use time::OffsetDateTime;

use crate::models::{Expense, Saving};

/// Totals bucketed by creation month (`YYYY-MM`) and by category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub monthly_expenses: BTreeMap<String, f64>,
    pub monthly_savings: BTreeMap<String, f64>,
    pub category_breakdown: BTreeMap<String, f64>,
}

pub fn compute_analytics(expenses: &[Expense], savings: &[Saving]) -> Analytics {
    let mut out = Analytics::default();

    for e in expenses {
        *out.monthly_expenses.entry(month_key(e.created_at)).or_default() += e.amount;
        *out.category_breakdown.entry(e.category.clone()).or_default() += e.amount;
    }
    for s in savings {
        *out.monthly_savings.entry(month_key(s.created_at)).or_default() += s.amount;
    }

    out
}

fn month_key(at: OffsetDateTime) -> String {
    format!("{:04}-{:02}", at.year(), u8::from(at.month()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use uuid::Uuid;

    fn expense(amount: f64, category: &str, at: OffsetDateTime) -> Expense {
        Expense::new(Uuid::nil(), "x".into(), amount, category.into(), None, at)
    }

    #[test]
    fn buckets_by_month_and_category() {
        let expenses = vec![
            expense(10.0, "Food", datetime!(2024-01-03 10:00 UTC)),
            expense(15.0, "Food", datetime!(2024-01-28 10:00 UTC)),
            expense(40.0, "Travel", datetime!(2024-02-01 0:00 UTC)),
        ];
        let savings = vec![Saving::new(
            Uuid::nil(),
            70.0,
            "manual".into(),
            None,
            datetime!(2023-12-31 23:59 UTC),
        )];

        let a = compute_analytics(&expenses, &savings);
        assert_eq!(a.monthly_expenses["2024-01"], 25.0);
        assert_eq!(a.monthly_expenses["2024-02"], 40.0);
        assert_eq!(a.monthly_savings["2023-12"], 70.0);
        assert_eq!(a.category_breakdown["Food"], 25.0);
        assert_eq!(a.category_breakdown["Travel"], 40.0);
    }

    #[test]
    fn empty_input_gives_empty_maps() {
        assert_eq!(compute_analytics(&[], &[]), Analytics::default());
    }
}
