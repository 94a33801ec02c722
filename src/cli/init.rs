use std::path::PathBuf;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{save_settings, shellexpand_path, Settings};

pub fn run(mut settings: Settings, data_dir: Option<String>) -> Result<()> {
    if let Some(dir) = data_dir {
        // Create first so a relative path canonicalizes to an absolute one.
        std::fs::create_dir_all(shellexpand_path(&dir))?;
        settings.data_dir = shellexpand_path(&dir);
    }

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    save_settings(&settings)?;

    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;

    println!("Initialized caixa at {}", resolved.display());
    Ok(())
}
