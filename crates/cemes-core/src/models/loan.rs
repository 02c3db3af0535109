use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Loan {
    #[serde(rename = "loanID", default, skip_serializing_if = "Option::is_none")]
    pub loan_id: Option<i64>,
    #[serde(rename = "customerID")]
    pub customer_id: i64,
    pub amount: f64,
    #[serde(rename = "interestRate", default)]
    pub interest_rate: Option<f64>,
    #[serde(rename = "durationMonths", default)]
    pub duration_months: Option<i32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

impl Loan {
    /// Case-insensitive status match, e.g. "active" matches "Active"
    pub fn has_status(&self, status: &str) -> bool {
        self.status
            .as_deref()
            .map(|s| s.to_lowercase().contains(&status.to_lowercase()))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "paymentID", default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<i64>,
    #[serde(rename = "loanID")]
    pub loan_id: i64,
    pub amount: f64,
    /// ISO timestamp as sent by the backend, e.g. `2024-03-01T00:00:00`
    #[serde(rename = "paymentDate", default)]
    pub payment_date: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

impl Payment {
    /// Calendar day of the payment, ignoring the time part
    pub fn payment_day(&self) -> Option<NaiveDate> {
        let raw = self.payment_date.as_deref()?;
        let day = raw.split('T').next().unwrap_or(raw);
        NaiveDate::parse_from_str(day.trim(), "%Y-%m-%d").ok()
    }
}
