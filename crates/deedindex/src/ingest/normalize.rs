//! Conversion of extracted rows into storable documents.
//!
//! Nothing here fails: values that cannot be interpreted become `None`.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use super::extractor::RawRow;
use crate::db::document_repo::NewDocument;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%d-%b-%Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parses an amount such as `"1,50,000.50"`. Thousands separators and
/// whitespace are ignored; anything else unparseable yields `None`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Extracts the calendar year of a registration date.
pub fn parse_registration_year(raw: &str) -> Option<i32> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if value.len() == 4 && value.bytes().all(|b| b.is_ascii_digit()) {
        return value.parse().ok();
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
        .map(|date| date.year())
}

fn text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Maps an extracted row onto a document.
pub fn normalize(row: RawRow) -> NewDocument {
    let registrationdate = text(row.registrationdate);
    let registration_year = registrationdate
        .as_deref()
        .and_then(parse_registration_year);

    NewDocument {
        docno: text(row.docno),
        docname: text(row.docname),
        registration_year,
        registrationdate,
        dateofexecution: text(row.dateofexecution),
        purchasername: text(row.purchasername),
        sellername: text(row.sellername),
        propertydescription: text(row.propertydescription),
        areaname: text(row.areaname),
        sroname: text(row.sroname),
        consideration_amt: row.consideration_amt.as_deref().and_then(parse_amount),
        marketvalue: row.marketvalue.as_deref().and_then(parse_amount),
        raw_json: row.raw_payload,
    }
}
