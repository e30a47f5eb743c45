use crate::utils::{month_name, parse_period};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One customer's stored name, address and bill history, keyed externally by
/// phone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_name: String,
    pub bill_to: String,
    #[serde(default)]
    pub bills: Vec<BillEntry>,
}

impl CustomerRecord {
    pub fn new(customer_name: String, bill_to: String, first_bill: BillEntry) -> Self {
        Self {
            customer_name,
            bill_to,
            bills: vec![first_bill],
        }
    }

    /// Serializes the record the way it is persisted: JSON with 4-space
    /// indentation.
    pub fn to_pretty_json(&self) -> serde_json::Result<Vec<u8>> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)?;
        Ok(out)
    }

    /// Bills whose timestamp falls in the given period, in stored order.
    pub fn bills_in(&self, period: BillingPeriod) -> impl Iterator<Item = &BillEntry> {
        self.bills
            .iter()
            .filter(move |bill| bill.period() == Some(period))
    }
}

/// One billing event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillEntry {
    pub amount: f64,
    pub timestamp: String, // ISO 8601, month/year derive from it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<f64>,
}

impl BillEntry {
    pub fn new(amount: f64, timestamp: impl Into<String>) -> Self {
        Self {
            amount,
            timestamp: timestamp.into(),
            units: None,
        }
    }

    pub fn with_units(mut self, units: f64) -> Self {
        self.units = Some(units);
        self
    }

    /// The billing period this entry belongs to, or `None` when the
    /// timestamp cannot be parsed.
    pub fn period(&self) -> Option<BillingPeriod> {
        crate::utils::extract_period(&self.timestamp)
    }
}

/// A calendar month used to scope a scan across all customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BillingPeriod {
    year: i32,
    month: u32,
}

impl BillingPeriod {
    /// Returns `None` unless `month` is within 1..=12.
    pub fn new(month: u32, year: i32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = month_name(self.month).unwrap_or("?");
        write!(f, "{} {}", name, self.year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid billing period {0:?}; expected e.g. \"2024-03\" or \"March 2024\"")]
pub struct InvalidPeriod(pub String);

impl FromStr for BillingPeriod {
    type Err = InvalidPeriod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_period(s).ok_or_else(|| InvalidPeriod(s.to_string()))
    }
}

/// Opaque version token of a persisted record. Backends without versioning
/// never hand one out.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(pub String);

impl Revision {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A record as loaded from a backend, with the revision it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub record: CustomerRecord,
    pub revision: Option<Revision>,
}

/// One flattened row of a month scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedBill {
    pub key: String,
    pub customer_name: String,
    pub bill_to: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<f64>,
    pub timestamp: String,
}

/// A customer's record with bills ordered newest first, for lookup views.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerHistory {
    pub key: String,
    pub customer_name: String,
    pub bill_to: String,
    pub bills: Vec<BillEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bill_entry_json_omits_missing_units() {
        let json = serde_json::to_string(&BillEntry::new(500.0, "2024-03-15T10:00:00")).unwrap();
        assert_eq!(json, r#"{"amount":500.0,"timestamp":"2024-03-15T10:00:00"}"#);
    }

    #[test]
    fn test_customer_record_reads_dated_schema() {
        // Files written with explicit month/year fields still load; those
        // fields are ignored and the period comes from the timestamp.
        let json = r#"{
            "customer_name": "Asha",
            "bill_to": "12 Lake Road",
            "bills": [
                {"month": "January", "year": 2024, "units": 7.5, "amount": 210.0,
                 "timestamp": "2024-03-02T09:15:00.000001"}
            ]
        }"#;
        let record: CustomerRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.bills[0].units, Some(7.5));
        assert_eq!(record.bills[0].period(), BillingPeriod::new(3, 2024));
    }

    #[test]
    fn test_pretty_json_uses_four_space_indent() {
        let record = CustomerRecord::new("A".into(), "B".into(), BillEntry::new(1.5, "2024-01-01"));
        let text = String::from_utf8(record.to_pretty_json().unwrap()).unwrap();
        assert!(text.starts_with("{\n    \"customer_name\": \"A\",\n"));
        assert!(text.contains("\n        {\n            \"amount\": 1.5,"));
    }

    #[test]
    fn test_customer_record_without_bills_defaults_to_empty() {
        let record: CustomerRecord =
            serde_json::from_str(r#"{"customer_name": "A", "bill_to": "B"}"#).unwrap();
        assert!(record.bills.is_empty());
    }

    #[test]
    fn test_bills_in_period() {
        let mut record = CustomerRecord::new(
            "Asha".into(),
            "12 Lake Road".into(),
            BillEntry::new(100.0, "2024-03-01T08:00:00"),
        );
        record.bills.push(BillEntry::new(200.0, "2024-04-01T08:00:00"));
        record.bills.push(BillEntry::new(300.0, "2024-03-20T08:00:00"));
        record.bills.push(BillEntry::new(400.0, "bad"));

        let march: Vec<f64> = record
            .bills_in(BillingPeriod::new(3, 2024).unwrap())
            .map(|b| b.amount)
            .collect();
        assert_eq!(march, vec![100.0, 300.0]);
    }

    #[test]
    fn test_billing_period_rejects_bad_month() {
        assert!(BillingPeriod::new(0, 2024).is_none());
        assert!(BillingPeriod::new(13, 2024).is_none());
    }

    #[test]
    fn test_billing_period_display_and_parse() {
        let period: BillingPeriod = "2024-03".parse().unwrap();
        assert_eq!(period.to_string(), "March 2024");
        assert_eq!(period.month(), 3);
        assert_eq!(period.year(), 2024);
        let err = "Smarch 2024".parse::<BillingPeriod>().unwrap_err();
        assert_eq!(err, InvalidPeriod("Smarch 2024".to_string()));
        assert!(err.to_string().starts_with("invalid billing period \"Smarch 2024\""));
    }
}
