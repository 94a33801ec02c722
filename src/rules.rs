//! Family-scoped keyword → category rules, unique per (family, keyword).

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{CaixaError, Result};
use crate::models::CategoryRule;
use crate::normalize::match_key;

/// Create a rule, or repoint an existing keyword at a new category.
pub fn upsert_rule(conn: &Connection, family_id: i64, keyword: &str, category_id: i64) -> Result<i64> {
    let keyword = match_key(keyword);
    if keyword.is_empty() {
        return Err(CaixaError::Other("Rule keyword cannot be empty".to_string()));
    }
    conn.execute(
        "INSERT INTO category_rules (family_id, keyword, category_id) VALUES (?1, ?2, ?3) \
         ON CONFLICT (family_id, keyword) DO UPDATE SET category_id = excluded.category_id",
        rusqlite::params![family_id, keyword, category_id],
    )?;
    let id = conn.query_row(
        "SELECT id FROM category_rules WHERE family_id = ?1 AND keyword = ?2",
        rusqlite::params![family_id, keyword],
        |row| row.get(0),
    )?;
    info!(family_id, %keyword, category_id, "saved category rule");
    Ok(id)
}

/// `(rule id, category id)` of a family's rule for `keyword`, if one exists.
pub fn find_rule(conn: &Connection, family_id: i64, keyword: &str) -> Result<Option<(i64, i64)>> {
    Ok(conn
        .query_row(
            "SELECT id, category_id FROM category_rules WHERE family_id = ?1 AND keyword = ?2",
            rusqlite::params![family_id, match_key(keyword)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?)
}

pub fn list_rules(conn: &Connection, family_id: i64) -> Result<Vec<CategoryRule>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.family_id, r.keyword, r.category_id, c.name, r.hit_count \
         FROM category_rules r JOIN categories c ON r.category_id = c.id \
         WHERE r.family_id = ?1 ORDER BY r.keyword",
    )?;
    let rows = stmt.query_map([family_id], |row| {
        Ok(CategoryRule {
            id: row.get(0)?,
            family_id: row.get(1)?,
            keyword: row.get(2)?,
            category_id: row.get(3)?,
            category: row.get(4)?,
            hit_count: row.get(5)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn delete_rule(conn: &Connection, family_id: i64, keyword: &str) -> Result<()> {
    let keyword = match_key(keyword);
    let deleted = conn.execute(
        "DELETE FROM category_rules WHERE family_id = ?1 AND keyword = ?2",
        rusqlite::params![family_id, keyword],
    )?;
    if deleted == 0 {
        return Err(CaixaError::UnknownRule(keyword));
    }
    info!(family_id, %keyword, "deleted category rule");
    Ok(())
}

pub fn record_hit(conn: &Connection, rule_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE category_rules SET hit_count = hit_count + 1 WHERE id = ?1",
        [rule_id],
    )?;
    Ok(())
}

/// Keyword to learn from a description: normalized text without trailing
/// installment markers, card suffixes and other numeric tokens.
pub fn learn_keyword(description: &str) -> Option<String> {
    let key = match_key(description);
    let mut tokens: Vec<&str> = key.split(' ').collect();
    while let Some(last) = tokens.last() {
        let numeric = last.chars().any(|c| c.is_ascii_digit());
        if numeric || matches!(*last, "parc" | "parcela" | "-" | "*") {
            tokens.pop();
        } else {
            break;
        }
    }
    let keyword = tokens.join(" ");
    (!keyword.is_empty()).then_some(keyword)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::category_id;
    use crate::db::testing::{add_family, test_db};

    #[test]
    fn test_upsert_is_unique_per_family_keyword() {
        let (_dir, conn) = test_db();
        let fam = add_family(&conn, "Silva");
        let mercado = category_id(&conn, "Mercado").unwrap();
        let lazer = category_id(&conn, "Lazer").unwrap();
        let first = upsert_rule(&conn, fam, "  Pão de Açúcar ", mercado).unwrap();
        let second = upsert_rule(&conn, fam, "PÃO DE AÇÚCAR", lazer).unwrap();
        assert_eq!(first, second);
        let rules = list_rules(&conn, fam).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].keyword, "pão de açúcar");
        assert_eq!(rules[0].category, "Lazer");
    }

    #[test]
    fn test_find_rule() {
        let (_dir, conn) = test_db();
        let fam = add_family(&conn, "Silva");
        let mercado = category_id(&conn, "Mercado").unwrap();
        assert_eq!(find_rule(&conn, fam, "carrefour").unwrap(), None);
        let id = upsert_rule(&conn, fam, "carrefour", mercado).unwrap();
        assert_eq!(find_rule(&conn, fam, " CARREFOUR ").unwrap(), Some((id, mercado)));
    }

    #[test]
    fn test_rules_are_scoped_by_family() {
        let (_dir, conn) = test_db();
        let silva = add_family(&conn, "Silva");
        let souza = add_family(&conn, "Souza");
        let mercado = category_id(&conn, "Mercado").unwrap();
        upsert_rule(&conn, silva, "carrefour", mercado).unwrap();
        upsert_rule(&conn, souza, "carrefour", mercado).unwrap();
        assert_eq!(list_rules(&conn, silva).unwrap().len(), 1);
        assert_eq!(list_rules(&conn, souza).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_keyword_rejected() {
        let (_dir, conn) = test_db();
        let fam = add_family(&conn, "Silva");
        let mercado = category_id(&conn, "Mercado").unwrap();
        assert!(upsert_rule(&conn, fam, "   ", mercado).is_err());
    }

    #[test]
    fn test_delete_rule() {
        let (_dir, conn) = test_db();
        let fam = add_family(&conn, "Silva");
        let mercado = category_id(&conn, "Mercado").unwrap();
        upsert_rule(&conn, fam, "carrefour", mercado).unwrap();
        delete_rule(&conn, fam, "CARREFOUR").unwrap();
        assert!(list_rules(&conn, fam).unwrap().is_empty());
        assert!(matches!(
            delete_rule(&conn, fam, "carrefour"),
            Err(CaixaError::UnknownRule(_))
        ));
    }

    #[test]
    fn test_learn_keyword() {
        assert_eq!(learn_keyword("LOJA X PARC 02/10").as_deref(), Some("loja x"));
        assert_eq!(learn_keyword("NETFLIX.COM").as_deref(), Some("netflix.com"));
        assert_eq!(learn_keyword("UBER *TRIP 1234").as_deref(), Some("uber *trip"));
        assert_eq!(learn_keyword("123 456"), None);
    }
}
