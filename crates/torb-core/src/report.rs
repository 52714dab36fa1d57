// Sales report rendering
//
// One CSV row per reservation, canceled ones included, in the order the
// store returned them (reservation time ascending).

use std::io;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, TorbError};
use crate::reservation::SalesRecord;

/// Timestamp layout used in report cells (microsecond precision, UTC)
pub const REPORT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=UTF-8";

#[derive(Serialize)]
struct ReportRow<'a> {
    reservation_id: i64,
    event_id: i64,
    rank: &'a str,
    num: i64,
    price: i64,
    user_id: i64,
    sold_at: String,
    canceled_at: String,
}

fn format_time(at: &DateTime<Utc>) -> String {
    at.format(REPORT_TIME_FORMAT).to_string()
}

/// Write the report, header first, to any writer
pub fn write_sales_report<W: io::Write>(records: &[SalesRecord], out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for record in records {
        writer
            .serialize(ReportRow {
                reservation_id: record.reservation_id,
                event_id: record.event_id,
                rank: record.rank.as_str(),
                num: record.num,
                price: record.price,
                user_id: record.user_id,
                sold_at: format_time(&record.sold_at),
                canceled_at: record.canceled_at.as_ref().map(format_time).unwrap_or_default(),
            })
            .map_err(|e| TorbError::Internal(e.into()))?;
    }
    if records.is_empty() {
        // serialize() emits the header lazily; an empty report still gets one
        writer
            .write_record([
                "reservation_id",
                "event_id",
                "rank",
                "num",
                "price",
                "user_id",
                "sold_at",
                "canceled_at",
            ])
            .map_err(|e| TorbError::Internal(e.into()))?;
    }
    writer.flush().map_err(|e| TorbError::Internal(e.into()))?;
    Ok(())
}

/// Render the report into memory
pub fn render_sales_report(records: &[SalesRecord]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_sales_report(records, &mut buf)?;
    Ok(buf)
}
