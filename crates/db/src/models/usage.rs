use grid_core::job_kind::JobKind;
use serde::Serialize;
use sqlx::FromRow;

/// Public usage totals for one job kind. Fake jobs never reach these.
#[derive(Debug, Clone, Copy, FromRow, Serialize, PartialEq)]
pub struct UsageTotals {
    #[sqlx(try_from = "String")]
    pub kind: JobKind,
    pub things: f64,
    pub kudos: f64,
    pub fulfilments: i64,
}

impl UsageTotals {
    pub fn empty(kind: JobKind) -> Self {
        Self {
            kind,
            things: 0.0,
            kudos: 0.0,
            fulfilments: 0,
        }
    }
}
