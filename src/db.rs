use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::error::{CaixaError, Result};
use crate::models::{Category, Family};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS families (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    category_type TEXT NOT NULL,
    description TEXT,
    is_active INTEGER DEFAULT 1
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    family_id INTEGER NOT NULL,
    filename TEXT NOT NULL,
    format TEXT NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    imported_count INTEGER NOT NULL,
    skipped_count INTEGER NOT NULL,
    date_range_start TEXT,
    date_range_end TEXT,
    checksum TEXT NOT NULL,
    FOREIGN KEY (family_id) REFERENCES families(id)
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    family_id INTEGER NOT NULL,
    event_date TEXT NOT NULL,
    cash_date TEXT,
    budget_month TEXT,
    payment_method TEXT NOT NULL,
    description TEXT NOT NULL,
    amount_cents INTEGER NOT NULL,
    category_id INTEGER,
    import_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    CHECK ((cash_date IS NULL) = (budget_month IS NULL)),
    FOREIGN KEY (family_id) REFERENCES families(id),
    FOREIGN KEY (category_id) REFERENCES categories(id),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_family_month
    ON transactions (family_id, budget_month);

CREATE INDEX IF NOT EXISTS idx_transactions_family_event
    ON transactions (family_id, event_date, amount_cents);

CREATE TABLE IF NOT EXISTS category_rules (
    id INTEGER PRIMARY KEY,
    family_id INTEGER NOT NULL,
    keyword TEXT NOT NULL,
    category_id INTEGER NOT NULL,
    hit_count INTEGER DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE (family_id, keyword),
    FOREIGN KEY (family_id) REFERENCES families(id),
    FOREIGN KEY (category_id) REFERENCES categories(id)
);
";

// (name, category_type, description)
const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
    // Receitas
    ("Salário", "income", "Salário, pró-labore"),
    ("Renda Extra", "income", "Freelas, vendas, bicos"),
    ("Rendimentos", "income", "Juros, dividendos, aplicações"),
    ("Reembolsos", "income", "Estornos e reembolsos"),
    ("Outras Receitas", "income", "Qualquer outra entrada"),
    // Despesas
    ("Moradia", "expense", "Aluguel, condomínio, IPTU"),
    ("Contas da Casa", "expense", "Luz, água, gás, internet, telefone"),
    ("Mercado", "expense", "Supermercado, feira, padaria"),
    ("Alimentação Fora", "expense", "Restaurantes, delivery, lanches"),
    ("Transporte", "expense", "Combustível, aplicativos, ônibus, estacionamento"),
    ("Saúde", "expense", "Plano de saúde, farmácia, consultas"),
    ("Educação", "expense", "Escola, cursos, livros"),
    ("Lazer", "expense", "Passeios, viagens, hobbies"),
    ("Assinaturas", "expense", "Streaming, aplicativos, clubes"),
    ("Vestuário", "expense", "Roupas, calçados"),
    ("Cuidados Pessoais", "expense", "Salão, academia, cosméticos"),
    ("Pets", "expense", "Ração, veterinário"),
    ("Impostos e Taxas", "expense", "Tarifas bancárias, IOF, impostos"),
    ("Presentes e Doações", "expense", "Presentes, doações"),
    ("Transferências", "expense", "Movimentação entre contas da família"),
    ("Outros", "expense", "A revisar"),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |row| row.get(0))?;
    if count == 0 {
        for cat in DEFAULT_CATEGORIES {
            conn.execute(
                "INSERT INTO categories (name, category_type, description) VALUES (?1, ?2, ?3)",
                rusqlite::params![cat.0, cat.1, cat.2],
            )?;
        }
    }
    Ok(())
}

pub fn family_id(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row("SELECT id FROM families WHERE name = ?1", [name], |row| row.get(0))
        .optional()?
        .ok_or_else(|| CaixaError::UnknownFamily(name.to_string()))
}

/// Category lookup is case-insensitive so rules and corrections can be typed
/// loosely.
pub fn category_id(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM categories WHERE lower(name) = lower(?1) AND is_active = 1",
        [name.trim()],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| CaixaError::UnknownCategory(name.to_string()))
}

pub fn add_family(conn: &Connection, name: &str) -> Result<Family> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CaixaError::Other("Family name cannot be empty".to_string()));
    }
    if family_id(conn, name).is_ok() {
        return Err(CaixaError::Other(format!("Family '{name}' already exists")));
    }
    conn.execute("INSERT INTO families (name) VALUES (?1)", [name])?;
    Ok(Family {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
    })
}

pub fn list_families(conn: &Connection) -> Result<Vec<Family>> {
    let mut stmt = conn.prepare("SELECT id, name FROM families ORDER BY name")?;
    let rows = stmt.query_map([], |row| {
        Ok(Family {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, category_type, description FROM categories \
         WHERE is_active = 1 ORDER BY category_type DESC, name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
            category_type: row.get(2)?,
            description: row.get(3)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}


#[cfg(test)]
mod tests {
    use super::testing::{add_family, test_db};
    use super::*;

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["families", "categories", "transactions", "category_rules", "imports"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
        let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |r| r.get(0)).unwrap();
        assert_eq!(count, DEFAULT_CATEGORIES.len() as i64);
    }

    #[test]
    fn test_cash_columns_must_agree() {
        let (_dir, conn) = test_db();
        let fam = add_family(&conn, "Silva");
        let result = conn.execute(
            "INSERT INTO transactions (family_id, event_date, cash_date, budget_month, payment_method, description, amount_cents) \
             VALUES (?1, '2025-03-15', '2025-03-15', NULL, 'pix', 'X', -100)",
            [fam],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_lookups() {
        let (_dir, conn) = test_db();
        let fam = add_family(&conn, "Silva");
        assert_eq!(family_id(&conn, "Silva").unwrap(), fam);
        assert!(matches!(family_id(&conn, "Souza"), Err(CaixaError::UnknownFamily(_))));
        assert!(category_id(&conn, "mercado").is_ok());
        assert!(matches!(category_id(&conn, "Cassino"), Err(CaixaError::UnknownCategory(_))));
    }

    #[test]
    fn test_family_names_are_unique() {
        let (_dir, conn) = test_db();
        add_family(&conn, "Silva");
        assert!(super::add_family(&conn, " Silva ").is_err());
        assert!(super::add_family(&conn, "  ").is_err());
        let names: Vec<String> = list_families(&conn).unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["Silva"]);
    }

    #[test]
    fn test_list_categories_income_first() {
        let (_dir, conn) = test_db();
        let cats = list_categories(&conn).unwrap();
        assert_eq!(cats.len(), DEFAULT_CATEGORIES.len());
        assert_eq!(cats[0].category_type, "income");
        assert_eq!(cats.last().unwrap().category_type, "expense");
    }
}
