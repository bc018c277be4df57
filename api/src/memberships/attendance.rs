use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attendance {
    pub id: i64,
    pub user_id: i64,
    pub attendance_date: NaiveDate,
}
