//! Search filters and the predicate set derived from them.
//!
//! A [`PredicateSet`] is built once per search and rendered into the WHERE
//! fragment shared by the count, page and group statements, so the three
//! always see the same rows.

use rusqlite::types::Value;
use serde::Deserialize;

use crate::db::UserId;

/// Columns matched by the free-text `q` filter.
const FREE_TEXT_COLUMNS: &[&str] = &[
    "d.docno",
    "d.docname",
    "d.purchasername",
    "d.sellername",
    "d.propertydescription",
    "d.areaname",
    "d.sroname",
];

/// Optional, AND-combined search filters. Blank strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    /// Substring matched against every text column.
    pub q: Option<String>,
    pub purchaser: Option<String>,
    pub seller: Option<String>,
    pub docname: Option<String>,
    pub docno: Option<String>,
    pub propertydescription: Option<String>,
    /// Switches the five field filters above from substring to exact match.
    pub exact: bool,
    /// Batch name the documents were uploaded under.
    pub table_name: Option<String>,
    /// Exact document name, applied before pagination and grouping.
    pub category: Option<String>,
    pub registration_year: Option<i32>,
}

/// One condition of a search.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Owner(UserId),
    /// Substring match on any of several columns.
    AnyContains {
        columns: &'static [&'static str],
        needle: String,
    },
    Contains {
        column: &'static str,
        needle: String,
    },
    Equals {
        column: &'static str,
        value: String,
    },
    Year(i32),
}

impl Clause {
    fn render(&self, sql: &mut Vec<String>, params: &mut Vec<Value>) {
        match self {
            Clause::Owner(user_id) => {
                sql.push("d.user_id = ?".to_string());
                params.push(Value::Integer(*user_id));
            }
            Clause::AnyContains { columns, needle } => {
                let pattern = like_pattern(needle);
                let ors: Vec<String> = columns
                    .iter()
                    .map(|c| format!("{} LIKE ? ESCAPE '\\'", c))
                    .collect();
                sql.push(format!("({})", ors.join(" OR ")));
                params.extend(columns.iter().map(|_| Value::Text(pattern.clone())));
            }
            Clause::Contains { column, needle } => {
                sql.push(format!("{} LIKE ? ESCAPE '\\'", column));
                params.push(Value::Text(like_pattern(needle)));
            }
            Clause::Equals { column, value } => {
                sql.push(format!("{} = ?", column));
                params.push(Value::Text(value.clone()));
            }
            Clause::Year(year) => {
                sql.push("d.registration_year = ?".to_string());
                params.push(Value::Integer(i64::from(*year)));
            }
        }
    }
}

/// Ordered clauses of one search.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateSet {
    clauses: Vec<Clause>,
}

impl PredicateSet {
    /// Builds the clauses for `filters`, always scoped to `user_id`.
    pub fn build(user_id: UserId, filters: &SearchFilters) -> Self {
        let mut clauses = vec![Clause::Owner(user_id)];

        if let Some(q) = non_blank(&filters.q) {
            clauses.push(Clause::AnyContains {
                columns: FREE_TEXT_COLUMNS,
                needle: q.to_string(),
            });
        }

        let fields: [(&'static str, &Option<String>); 5] = [
            ("d.purchasername", &filters.purchaser),
            ("d.sellername", &filters.seller),
            ("d.docname", &filters.docname),
            ("d.docno", &filters.docno),
            ("d.propertydescription", &filters.propertydescription),
        ];
        for (column, value) in fields {
            let Some(value) = non_blank(value) else {
                continue;
            };
            clauses.push(if filters.exact {
                Clause::Equals {
                    column,
                    value: value.to_string(),
                }
            } else {
                Clause::Contains {
                    column,
                    needle: value.to_string(),
                }
            });
        }

        if let Some(table_name) = non_blank(&filters.table_name) {
            clauses.push(Clause::Equals {
                column: "d.table_name",
                value: table_name.to_string(),
            });
        }
        if let Some(category) = non_blank(&filters.category) {
            clauses.push(Clause::Equals {
                column: "d.docname",
                value: category.to_string(),
            });
        }
        if let Some(year) = filters.registration_year {
            clauses.push(Clause::Year(year));
        }

        Self { clauses }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Renders `WHERE ...` and its positional parameters.
    pub fn where_clause(&self) -> (String, Vec<Value>) {
        let mut sql = Vec::with_capacity(self.clauses.len());
        let mut params = Vec::new();
        for clause in &self.clauses {
            clause.render(&mut sql, &mut params);
        }
        (format!("WHERE {}", sql.join(" AND ")), params)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Wraps `needle` in `%` after escaping LIKE wildcards with `\`.
pub fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
