use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;
use crate::normalize::match_key;
use crate::rules::{list_rules, record_hit};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub id: i64,
    pub keyword: String,
    pub category_id: i64,
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Partial,
}

/// Ordered keyword rules for one family.
///
/// A description equal to a keyword beats one that merely contains it. Among
/// partial matches the longest keyword wins, then the alphabetically first,
/// so the result never depends on the order rules were created in.
#[derive(Debug, Clone, Default)]
pub struct Categorizer {
    rules: Vec<Rule>,
}

impl Categorizer {
    pub fn new(mut rules: Vec<Rule>) -> Self {
        for rule in &mut rules {
            rule.keyword = match_key(&rule.keyword);
        }
        rules.retain(|r| !r.keyword.is_empty());
        rules.sort_by(|a, b| {
            b.keyword
                .chars()
                .count()
                .cmp(&a.keyword.chars().count())
                .then_with(|| a.keyword.cmp(&b.keyword))
        });
        Self { rules }
    }

    pub fn load(conn: &Connection, family_id: i64) -> Result<Self> {
        let rules = list_rules(conn, family_id)?
            .into_iter()
            .map(|r| Rule {
                id: r.id,
                keyword: r.keyword,
                category_id: r.category_id,
                category: r.category,
            })
            .collect();
        Ok(Self::new(rules))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn infer(&self, description: &str) -> Option<(&Rule, MatchKind)> {
        let key = match_key(description);
        if key.is_empty() {
            return None;
        }
        if let Some(rule) = self.rules.iter().find(|r| r.keyword == key) {
            return Some((rule, MatchKind::Exact));
        }
        self.rules
            .iter()
            .find(|r| key.contains(r.keyword.as_str()))
            .map(|rule| (rule, MatchKind::Partial))
    }
}

pub struct CategorizeResult {
    pub categorized: usize,
    pub uncategorized: usize,
}

/// Run the family's rules over its uncategorized transactions.
pub fn categorize_transactions(conn: &Connection, family_id: i64) -> Result<CategorizeResult> {
    let categorizer = Categorizer::load(conn, family_id)?;

    let mut txn_stmt = conn.prepare(
        "SELECT id, description FROM transactions WHERE family_id = ?1 AND category_id IS NULL",
    )?;
    let pending: Vec<(i64, String)> = txn_stmt
        .query_map([family_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut categorized = 0usize;
    let mut uncategorized = 0usize;

    for (txn_id, description) in &pending {
        match categorizer.infer(description) {
            Some((rule, kind)) => {
                conn.execute(
                    "UPDATE transactions SET category_id = ?1 WHERE id = ?2",
                    rusqlite::params![rule.category_id, txn_id],
                )?;
                record_hit(conn, rule.id)?;
                debug!(txn_id, keyword = %rule.keyword, ?kind, "categorized transaction");
                categorized += 1;
            }
            None => uncategorized += 1,
        }
    }

    Ok(CategorizeResult {
        categorized,
        uncategorized,
    })
}
