use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Result;

/// Структура, представляющая жильца в базе данных.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resident {
    /// Telegram ID пользователя
    pub user_id: i64,
    /// Номер квартиры
    pub apartment_number: i64,
    /// Номер телефона; `None` для записей, созданных до добавления колонки
    pub phone_number: Option<String>,
}

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Initializes a connection pool with up to 10 connections and runs schema migrations.
///
/// # Arguments
///
/// * `database_path` - Path to SQLite database file
///
/// # Returns
///
/// Returns a `DbPool` on success or an `r2d2::Error` if pool creation fails.
///
/// # Example
///
/// ```no_run
/// use domofon::storage::db;
///
/// let pool = db::create_pool("apartment_database.db")?;
/// # Ok::<(), r2d2::Error>(())
/// ```
pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder()
        .max_size(10) // Maximum 10 connections in the pool
        .build(manager)?;

    // Ensure schema is up to date on first connection
    let conn = pool.get()?;
    if let Err(e) = migrate_schema(&conn) {
        log::warn!("Failed to migrate schema: {}", e);
        // Don't fail on migration errors, as they might be expected
    }

    Ok(pool)
}

/// Get a connection from the pool
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

/// Migrate database schema to ensure all required columns exist
///
/// Creates the apartments table if it is missing and safely adds missing
/// columns to an existing table. The migration is additive only: columns are
/// never dropped, renamed or reordered.
fn migrate_schema(conn: &rusqlite::Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS apartments (user_id INTEGER PRIMARY KEY, apartment_number INTEGER)",
        [],
    )?;

    let mut stmt = conn.prepare("PRAGMA table_info(apartments)")?;
    let rows = stmt.query_map([], |row| {
        row.get::<_, String>(1) // column name
    })?;

    let mut columns = Vec::new();
    for row in rows {
        columns.push(row?);
    }

    // Add phone_number if it doesn't exist (databases created before the
    // phone field was introduced only have the two original columns)
    if !columns.contains(&"phone_number".to_string()) {
        log::info!("Adding missing column: phone_number to apartments table");
        if let Err(e) = conn.execute("ALTER TABLE apartments ADD COLUMN phone_number TEXT", []) {
            log::warn!("Failed to add phone_number column: {}", e);
        }
    }

    Ok(())
}

/// Сохраняет запись о жильце в базе данных.
///
/// Вставляет новую запись или заменяет существующую по `user_id`: на одного
/// пользователя хранится не более одной записи, повторная регистрация
/// перезаписывает квартиру и телефон.
///
/// # Arguments
///
/// * `conn` - Соединение с базой данных
/// * `user_id` - Telegram ID пользователя
/// * `apartment_number` - Номер квартиры
/// * `phone_number` - Номер телефона
///
/// # Returns
///
/// Возвращает `Ok(())` при успехе или ошибку базы данных.
pub fn upsert_resident(
    conn: &DbConnection,
    user_id: i64,
    apartment_number: i64,
    phone_number: &str,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO apartments (user_id, apartment_number, phone_number) VALUES (?1, ?2, ?3)",
        &[
            &user_id as &dyn rusqlite::ToSql,
            &apartment_number as &dyn rusqlite::ToSql,
            &phone_number as &dyn rusqlite::ToSql,
        ],
    )?;
    Ok(())
}

/// Получает запись о жильце по Telegram ID.
///
/// # Returns
///
/// Возвращает `Ok(Some(Resident))` если запись найдена, `Ok(None)` если не
/// найдена, или ошибку базы данных.
pub fn get_resident(conn: &DbConnection, user_id: i64) -> Result<Option<Resident>> {
    let mut stmt =
        conn.prepare("SELECT user_id, apartment_number, phone_number FROM apartments WHERE user_id = ?")?;
    let mut rows = stmt.query(&[&user_id as &dyn rusqlite::ToSql])?;

    if let Some(row) = rows.next()? {
        Ok(Some(Resident {
            user_id: row.get(0)?,
            apartment_number: row.get(1)?,
            phone_number: row.get(2)?,
        }))
    } else {
        Ok(None)
    }
}

/// Получает всех зарегистрированных жильцов, отсортированных по номеру
/// квартиры по возрастанию.
///
/// Пустой список — корректный результат, отличный от ошибки базы данных.
pub fn get_all_residents(conn: &DbConnection) -> Result<Vec<Resident>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, apartment_number, phone_number FROM apartments ORDER BY apartment_number ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Resident {
            user_id: row.get(0)?,
            apartment_number: row.get(1)?,
            phone_number: row.get(2)?,
        })
    })?;

    let mut residents = Vec::new();
    for row in rows {
        residents.push(row?);
    }
    Ok(residents)
}

/// Получает жильцов указанной квартиры.
///
/// Точное совпадение по номеру квартиры; порядок внутри одной квартиры не
/// гарантируется. Пустой список означает "никто не зарегистрирован", а не
/// ошибку.
pub fn get_residents_by_apartment(conn: &DbConnection, apartment_number: i64) -> Result<Vec<Resident>> {
    let mut stmt = conn
        .prepare("SELECT user_id, apartment_number, phone_number FROM apartments WHERE apartment_number = ?")?;
    let rows = stmt.query_map(&[&apartment_number as &dyn rusqlite::ToSql], |row| {
        Ok(Resident {
            user_id: row.get(0)?,
            apartment_number: row.get(1)?,
            phone_number: row.get(2)?,
        })
    })?;

    let mut residents = Vec::new();
    for row in rows {
        residents.push(row?);
    }
    Ok(residents)
}
