use comfy_table::{Cell, Table};
use tracing::info;

use crate::db::{add_family, list_families};
use crate::error::Result;
use crate::settings::Settings;

use super::open_db;

pub fn add(settings: &Settings, name: &str) -> Result<()> {
    let conn = open_db(settings)?;
    let family = add_family(&conn, name)?;
    info!(family_id = family.id, name = %family.name, "added family");
    println!("Added family: {}", family.name);
    Ok(())
}

pub fn list(settings: &Settings) -> Result<()> {
    let conn = open_db(settings)?;
    let mut count_stmt = conn.prepare(
        "SELECT (SELECT count(*) FROM transactions WHERE family_id = ?1), \
                (SELECT count(*) FROM transactions WHERE family_id = ?1 AND cash_date IS NULL), \
                (SELECT count(*) FROM category_rules WHERE family_id = ?1)",
    )?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Transactions", "Pending", "Rules"]);
    for family in list_families(&conn)? {
        let (txns, pending, rules): (i64, i64, i64) =
            count_stmt.query_row([family.id], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
        table.add_row(vec![
            Cell::new(family.id),
            Cell::new(family.name),
            Cell::new(txns),
            Cell::new(pending),
            Cell::new(rules),
        ]);
    }
    println!("Families\n{table}");
    Ok(())
}
