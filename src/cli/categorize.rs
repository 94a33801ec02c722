use crate::categorizer::categorize_transactions;
use crate::error::Result;
use crate::settings::Settings;

use super::open_family;

pub fn run(settings: &Settings, family: &str) -> Result<()> {
    let (conn, family_id) = open_family(settings, family)?;
    let result = categorize_transactions(&conn, family_id)?;
    println!(
        "{} categorized, {} still uncategorized",
        result.categorized, result.uncategorized
    );
    Ok(())
}
