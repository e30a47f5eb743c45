//! Command handlers. Input checks happen here, before anything reaches the
//! record store.

use anyhow::{anyhow, bail, Result};
use bills_core::application::RecordStore;
use bills_core::domain::{BillEntry, BillingPeriod, MatchedBill};
use bills_core::utils::{format_timestamp_for_display, now_timestamp, parse_month, parse_timestamp};
use std::io::Write;

/// A bill as entered by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBill {
    pub phone: String,
    pub name: String,
    pub address: String,
    pub amount: f64,
    pub units: Option<f64>,
    pub timestamp: Option<String>,
}

/// Presence checks on the entered fields, plus sane numbers.
pub fn validate_new_bill(bill: &NewBill) -> Result<()> {
    for (field, value) in [
        ("phone", &bill.phone),
        ("name", &bill.name),
        ("address", &bill.address),
    ] {
        if value.trim().is_empty() {
            bail!("{field} is required");
        }
    }
    if !bill.amount.is_finite() || bill.amount < 0.0 {
        bail!("amount must be a non-negative number");
    }
    if let Some(units) = bill.units {
        if !units.is_finite() || units < 0.0 {
            bail!("units must be a non-negative number");
        }
    }
    if let Some(timestamp) = &bill.timestamp {
        if parse_timestamp(timestamp).is_none() {
            bail!("timestamp {timestamp:?} is not an ISO 8601 date-time");
        }
    }
    Ok(())
}

pub fn add_bill(store: &RecordStore, bill: NewBill, out: &mut impl Write) -> Result<()> {
    validate_new_bill(&bill)?;

    let phone = bill.phone.trim();
    let mut entry = BillEntry::new(bill.amount, bill.timestamp.unwrap_or_else(now_timestamp));
    entry.units = bill.units;
    let period = entry.period();

    let record = store.save_record(phone, bill.name.trim(), bill.address.trim(), entry)?;

    writeln!(
        out,
        "Saved bill for {} ({}). {} entries on file.",
        record.customer_name,
        phone,
        record.bills.len()
    )?;
    if let Some(period) = period {
        let in_period = record.bills_in(period).count();
        if in_period > 1 {
            writeln!(out, "Note: {period} now has {in_period} entries for this customer.")?;
        }
    }
    Ok(())
}

/// Prints a customer's details and history, newest first. Returns whether
/// the customer was found.
pub fn show_history(store: &RecordStore, phone: &str, out: &mut impl Write) -> Result<bool> {
    let Some(history) = store.history(phone.trim())? else {
        writeln!(out, "No data found for phone number {}.", phone.trim())?;
        return Ok(false);
    };

    writeln!(out, "Customer: {}", history.customer_name)?;
    writeln!(out, "Address:  {}", history.bill_to)?;
    writeln!(out, "Bill history:")?;
    for bill in &history.bills {
        let period = bill
            .period()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "unknown period".to_string());
        write!(out, "  - {period}: amount {:.2}", bill.amount)?;
        if let Some(units) = bill.units {
            write!(out, ", units {units}")?;
        }
        writeln!(out, " ({})", format_timestamp_for_display(&bill.timestamp))?;
    }
    Ok(true)
}

/// Resolves the period to scan from either `--period` or `--month`/`--year`.
pub fn resolve_period(
    period: Option<BillingPeriod>,
    month: Option<&str>,
    year: Option<i32>,
) -> Result<BillingPeriod> {
    match (period, month, year) {
        (Some(period), None, None) => Ok(period),
        (None, Some(month), Some(year)) => {
            let month = parse_month(month).ok_or_else(|| anyhow!("unknown month {month:?}"))?;
            BillingPeriod::new(month, year).ok_or_else(|| anyhow!("invalid month {month}"))
        }
        (None, None, None) => bail!("give either --period or both --month and --year"),
        _ => bail!("use either --period or --month with --year, not both"),
    }
}

pub fn list_month(
    store: &RecordStore,
    period: BillingPeriod,
    as_json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let rows = store.list_by_month(period)?;

    if as_json {
        serde_json::to_writer_pretty(&mut *out, &rows)?;
        writeln!(out)?;
        return Ok(());
    }

    if rows.is_empty() {
        writeln!(out, "No bills found for {period}.")?;
        return Ok(());
    }

    writeln!(out, "Bills for {period}")?;
    write_table(&rows, out)?;
    let total: f64 = rows.iter().map(|r| r.amount).sum();
    writeln!(out, "{} bills, total {:.2}", rows.len(), total)?;
    Ok(())
}

fn write_table(rows: &[MatchedBill], out: &mut impl Write) -> Result<()> {
    let header = ["Phone", "Name", "Bill To", "Units", "Amount", "Timestamp"];
    let cells: Vec<[String; 6]> = rows
        .iter()
        .map(|r| {
            [
                r.key.clone(),
                r.customer_name.clone(),
                r.bill_to.clone(),
                r.units.map(|u| u.to_string()).unwrap_or_else(|| "-".to_string()),
                format!("{:.2}", r.amount),
                format_timestamp_for_display(&r.timestamp),
            ]
        })
        .collect();

    let mut widths = header.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
    for row in std::iter::once(header.as_slice()).chain(cells.iter().map(|r| r.as_slice())) {
        let line: Vec<String> = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        writeln!(out, "{}", line.join("  ").trim_end())?;
    }
    Ok(())
}
