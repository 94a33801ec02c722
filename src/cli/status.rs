use crate::db::get_connection;
use crate::error::Result;
use crate::settings::{settings_file_exists, Settings};

pub fn run(settings: &Settings) -> Result<()> {
    let db_path = settings.db_path();

    println!(
        "Settings:   {}",
        if settings_file_exists() { "~/.config/caixa/settings.json" } else { "(defaults)" }
    );
    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {size} bytes");

        let conn = get_connection(&db_path)?;
        let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };

        println!();
        println!("Families:      {}", count("SELECT count(*) FROM families")?);
        println!("Transactions:  {}", count("SELECT count(*) FROM transactions")?);
        println!("Pending:       {}", count("SELECT count(*) FROM transactions WHERE cash_date IS NULL")?);
        println!("Rules:         {}", count("SELECT count(*) FROM category_rules")?);
        println!("Imports:       {}", count("SELECT count(*) FROM imports")?);
    } else {
        println!();
        println!("Database not found. Run `caixa init` to set up.");
    }

    Ok(())
}
