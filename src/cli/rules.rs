use comfy_table::{Cell, Table};

use crate::db::category_id;
use crate::error::Result;
use crate::rules::{delete_rule, list_rules, upsert_rule};
use crate::settings::Settings;

use super::open_family;

pub fn add(settings: &Settings, keyword: &str, family: &str, category: &str) -> Result<()> {
    let (conn, family_id) = open_family(settings, family)?;
    let cat_id = category_id(&conn, category)?;
    upsert_rule(&conn, family_id, keyword, cat_id)?;
    println!("Added rule: '{}' \u{2192} {category}", keyword.trim());
    Ok(())
}

pub fn list(settings: &Settings, family: &str) -> Result<()> {
    let (conn, family_id) = open_family(settings, family)?;
    let rules = list_rules(&conn, family_id)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Keyword", "Category", "Hits"]);
    for rule in rules {
        table.add_row(vec![
            Cell::new(rule.id),
            Cell::new(rule.keyword),
            Cell::new(rule.category),
            Cell::new(rule.hit_count),
        ]);
    }
    println!("Rules\n{table}");
    Ok(())
}

pub fn delete(settings: &Settings, keyword: &str, family: &str) -> Result<()> {
    let (conn, family_id) = open_family(settings, family)?;
    delete_rule(&conn, family_id, keyword)?;
    println!("Deleted rule: '{}'", keyword.trim());
    Ok(())
}
