use rusqlite::types::Value;
use rusqlite::{params_from_iter, Row};
use serde::Serialize;

use super::filter::{PredicateSet, SearchFilters};
use crate::db::document_repo::DocumentId;
use crate::db::{to_u64, Database, DatabaseError, UserId};
use crate::error::Result;

const HIT_COLUMNS: &str = "d.id, d.table_name, d.docno, d.docname, d.registrationdate, \
     d.dateofexecution, d.purchasername, d.sellername, d.propertydescription, d.areaname, \
     d.sroname, d.consideration_amt, d.marketvalue";

/// One document in a result page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: DocumentId,
    pub table_name: String,
    pub docno: Option<String>,
    pub docname: Option<String>,
    pub registrationdate: Option<String>,
    pub dateofexecution: Option<String>,
    #[serde(rename = "purchaserparty")]
    pub purchasername: Option<String>,
    #[serde(rename = "sellerparty")]
    pub sellername: Option<String>,
    pub propertydescription: Option<String>,
    pub areaname: Option<String>,
    pub sroname: Option<String>,
    pub consideration_amt: Option<f64>,
    pub marketvalue: Option<f64>,
}

impl SearchHit {
    fn from_row(row: &Row<'_>) -> std::result::Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            table_name: row.get("table_name")?,
            docno: row.get("docno")?,
            docname: row.get("docname")?,
            registrationdate: row.get("registrationdate")?,
            dateofexecution: row.get("dateofexecution")?,
            purchasername: row.get("purchasername")?,
            sellername: row.get("sellername")?,
            propertydescription: row.get("propertydescription")?,
            areaname: row.get("areaname")?,
            sroname: row.get("sroname")?,
            consideration_amt: row.get("consideration_amt")?,
            marketvalue: row.get("marketvalue")?,
        })
    }
}

/// Number of matching documents per document name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub docname: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    pub results: Vec<SearchHit>,
    pub total: u64,
    pub groups: Vec<CategoryCount>,
    pub page: u32,
    pub per_page: u32,
}

/// Caps a requested page size to `1..=max`.
pub fn clamp_per_page(requested: u32, max: u32) -> u32 {
    requested.clamp(1, max.max(1))
}

/// Runs a filtered search for `user_id`.
///
/// `page` is 1-based; 0 is read as 1. Results are ordered by descending id.
pub fn search(
    db: &Database,
    user_id: UserId,
    filters: &SearchFilters,
    page: u32,
    per_page: u32,
) -> Result<SearchResults> {
    let page = page.max(1);
    let predicates = PredicateSet::build(user_id, filters);
    let (where_sql, params) = predicates.where_clause();
    let offset = i64::from(page - 1) * i64::from(per_page);

    let _span = tracing::debug_span!("search", user_id, page, per_page).entered();

    let (total, results, groups) = db.with_conn(|conn| {
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM documents d {}", where_sql),
            params_from_iter(params.iter()),
            |r| r.get(0),
        )?;

        let mut page_params = params.clone();
        page_params.push(Value::Integer(i64::from(per_page)));
        page_params.push(Value::Integer(offset));
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM documents d {} ORDER BY d.id DESC LIMIT ? OFFSET ?",
            HIT_COLUMNS, where_sql
        ))?;
        let results = stmt
            .query_map(params_from_iter(page_params.iter()), SearchHit::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT d.docname, COUNT(*) AS cnt FROM documents d {}
             GROUP BY d.docname ORDER BY cnt DESC, d.docname ASC",
            where_sql
        ))?;
        let groups = stmt
            .query_map(params_from_iter(params.iter()), |r| {
                Ok((r.get::<_, Option<String>>(0)?, r.get::<_, i64>(1)?))
            })?
            .map(|g| {
                let (docname, count) = g?;
                Ok(CategoryCount {
                    docname,
                    count: to_u64("documents", count)?,
                })
            })
            .collect::<std::result::Result<Vec<_>, DatabaseError>>()?;

        Ok((to_u64("documents", count)?, results, groups))
    })?;

    log::debug!(
        "Search matched {} document(s), returning {}",
        total,
        results.len()
    );

    Ok(SearchResults {
        results,
        total,
        groups,
        page,
        per_page,
    })
}
