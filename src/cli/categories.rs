use comfy_table::{Cell, Table};

use crate::db::list_categories;
use crate::error::Result;
use crate::settings::Settings;

use super::open_db;

pub fn list(settings: &Settings) -> Result<()> {
    let conn = open_db(settings)?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type", "Description"]);
    for cat in list_categories(&conn)? {
        table.add_row(vec![
            Cell::new(cat.id),
            Cell::new(cat.name),
            Cell::new(cat.category_type),
            Cell::new(cat.description.unwrap_or_default()),
        ]);
    }
    println!("Categories\n{table}");
    Ok(())
}
