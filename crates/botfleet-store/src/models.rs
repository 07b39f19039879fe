use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ServerRow {
    pub id: i64,
    pub host: String,
    pub port: u16,
    pub name: Option<String>,
    pub gamemode: Option<String>,
    pub rule: Option<String>,
    pub language: Option<String>,
    pub players: i64,
    pub max_players: i64,
    pub ping: i64,
    pub last_update: Option<String>,
    pub created_at: String,
}

fn row_to_server(row: &rusqlite::Row<'_>) -> rusqlite::Result<ServerRow> {
    Ok(ServerRow {
        id: row.get(0)?,
        host: row.get(1)?,
        port: row.get::<_, i64>(2)? as u16,
        name: row.get(3)?,
        gamemode: row.get(4)?,
        rule: row.get(5)?,
        language: row.get(6)?,
        players: row.get(7)?,
        max_players: row.get(8)?,
        ping: row.get(9)?,
        last_update: row.get(10)?,
        created_at: row.get(11)?,
    })
}

const SERVER_COLUMNS: &str =
    "id, host, port, name, gamemode, rule, language, players, max_players, ping, last_update, created_at";

pub fn list_servers(conn: &Connection) -> Result<Vec<ServerRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {SERVER_COLUMNS} FROM servers ORDER BY id"))?;
    let rows = stmt.query_map([], row_to_server)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn get_server(conn: &Connection, id: i64) -> Result<Option<ServerRow>> {
    conn.query_row(
        &format!("SELECT {SERVER_COLUMNS} FROM servers WHERE id = ?1"),
        params![id],
        row_to_server,
    )
    .optional()
    .map_err(Into::into)
}

pub fn add_server(conn: &Connection, host: &str, port: u16) -> Result<i64> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO servers (host, port, players, max_players, ping, created_at)
         VALUES (?1, ?2, 0, 0, 0, ?3)",
        params![host, port, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_server(conn: &Connection, id: i64) -> Result<bool> {
    let rows = conn.execute("DELETE FROM servers WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

/// Applies a C6 query result: refreshed metadata, player counters, and a
/// fresh `last_update` timestamp.
pub fn update_server_query_result(
    conn: &Connection,
    id: i64,
    name: &str,
    gamemode: &str,
    language: &str,
    players: u16,
    max_players: u16,
    ping: u32,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE servers
         SET name = ?1, gamemode = ?2, language = ?3, players = ?4,
             max_players = ?5, ping = ?6, last_update = ?7
         WHERE id = ?8",
        params![name, gamemode, language, players, max_players, ping, now, id],
    )?;
    Ok(())
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BotRow {
    pub uuid: String,
    pub name: String,
    pub server_id: i64,
    pub invulnerable: bool,
    #[serde(skip_serializing)]
    pub password: String,
    pub system_prompt: String,
    pub created_at: String,
}

fn row_to_bot(row: &rusqlite::Row<'_>) -> rusqlite::Result<BotRow> {
    Ok(BotRow {
        uuid: row.get(0)?,
        name: row.get(1)?,
        server_id: row.get(2)?,
        invulnerable: row.get::<_, i64>(3)? != 0,
        password: row.get(4)?,
        system_prompt: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const BOT_COLUMNS: &str = "uuid, name, server_id, invulnerable, password, system_prompt, created_at";

pub fn list_bots(conn: &Connection) -> Result<Vec<BotRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {BOT_COLUMNS} FROM bots ORDER BY created_at"))?;
    let rows = stmt.query_map([], row_to_bot)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn get_bot(conn: &Connection, uuid: &str) -> Result<Option<BotRow>> {
    conn.query_row(
        &format!("SELECT {BOT_COLUMNS} FROM bots WHERE uuid = ?1"),
        params![uuid],
        row_to_bot,
    )
    .optional()
    .map_err(Into::into)
}

pub fn insert_bot(
    conn: &Connection,
    uuid: &str,
    name: &str,
    server_id: i64,
    invulnerable: bool,
    password: &str,
    system_prompt: &str,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO bots (uuid, name, server_id, invulnerable, password, system_prompt, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![uuid, name, server_id, invulnerable as i64, password, system_prompt, now],
    )?;
    Ok(())
}

pub fn delete_bot(conn: &Connection, uuid: &str) -> Result<bool> {
    let rows = conn.execute("DELETE FROM bots WHERE uuid = ?1", params![uuid])?;
    Ok(rows > 0)
}

pub fn update_bot_prompt(conn: &Connection, uuid: &str, system_prompt: &str) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE bots SET system_prompt = ?1 WHERE uuid = ?2",
        params![system_prompt, uuid],
    )?;
    Ok(rows > 0)
}

pub fn set_bot_password(conn: &Connection, uuid: &str, password: &str) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE bots SET password = ?1 WHERE uuid = ?2",
        params![password, uuid],
    )?;
    Ok(rows > 0)
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct LlmProviderRow {
    pub id: i64,
    pub name: String,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub created_at: String,
}

fn row_to_provider(row: &rusqlite::Row<'_>) -> rusqlite::Result<LlmProviderRow> {
    Ok(LlmProviderRow {
        id: row.get(0)?,
        name: row.get(1)?,
        api_key: row.get(2)?,
        base_url: row.get(3)?,
        model: row.get(4)?,
        created_at: row.get(5)?,
    })
}

const PROVIDER_COLUMNS: &str = "id, name, api_key, base_url, model, created_at";

pub fn list_providers(conn: &Connection) -> Result<Vec<LlmProviderRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {PROVIDER_COLUMNS} FROM llm_providers ORDER BY id"))?;
    let rows = stmt.query_map([], row_to_provider)?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

pub fn get_provider(conn: &Connection, id: i64) -> Result<Option<LlmProviderRow>> {
    conn.query_row(
        &format!("SELECT {PROVIDER_COLUMNS} FROM llm_providers WHERE id = ?1"),
        params![id],
        row_to_provider,
    )
    .optional()
    .map_err(Into::into)
}

pub fn insert_provider(conn: &Connection, name: &str, api_key: &str, base_url: &str, model: &str) -> Result<i64> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO llm_providers (name, api_key, base_url, model, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![name, api_key, base_url, model, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_provider(conn: &Connection, id: i64) -> Result<bool> {
    let rows = conn.execute("DELETE FROM llm_providers WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

pub fn update_provider(
    conn: &Connection,
    id: i64,
    name: &str,
    api_key: &str,
    base_url: &str,
    model: &str,
) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE llm_providers SET name = ?1, api_key = ?2, base_url = ?3, model = ?4 WHERE id = ?5",
        params![name, api_key, base_url, model, id],
    )?;
    Ok(rows > 0)
}

/// True if any `llm_sessions` row still references this provider — callers
/// use this to implement the 403-on-delete-while-in-use rule.
pub fn provider_in_use(conn: &Connection, id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM llm_sessions WHERE provider_id = ?1 AND is_active = 1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn insert_llm_session(conn: &Connection, session_id: &str, bot_uuid: &str, provider_id: i64) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO llm_sessions (session_id, bot_uuid, provider_id, is_active, created_at, last_activity)
         VALUES (?1, ?2, ?3, 1, ?4, ?4)",
        params![session_id, bot_uuid, provider_id, now],
    )?;
    Ok(())
}

pub fn deactivate_llm_session(conn: &Connection, bot_uuid: &str) -> Result<()> {
    conn.execute(
        "UPDATE llm_sessions SET is_active = 0 WHERE bot_uuid = ?1 AND is_active = 1",
        params![bot_uuid],
    )?;
    Ok(())
}

/// `(bot_uuid, provider_id)` for every still-active session — read once at
/// startup so the gateway can rebuild in-memory `LlmSession`s for bots that
/// had LLM control enabled before the last restart.
pub fn active_llm_sessions(conn: &Connection) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare("SELECT bot_uuid, provider_id FROM llm_sessions WHERE is_active = 1")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::init_db;

    #[test]
    fn server_roundtrip() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_db(&mut conn).unwrap();

        let id = add_server(&conn, "gta.example", 7777).unwrap();
        let server = get_server(&conn, id).unwrap().unwrap();
        assert_eq!(server.host, "gta.example");
        assert_eq!(server.port, 7777);

        update_server_query_result(&conn, id, "Test Server", "Freeroam", "en", 7, 100, 42).unwrap();
        let server = get_server(&conn, id).unwrap().unwrap();
        assert_eq!(server.players, 7);
        assert_eq!(server.name.as_deref(), Some("Test Server"));

        assert!(delete_server(&conn, id).unwrap());
        assert!(get_server(&conn, id).unwrap().is_none());
    }

    #[test]
    fn deleting_server_cascades_to_bots() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_db(&mut conn).unwrap();
        let server_id = add_server(&conn, "gta.example", 7777).unwrap();
        insert_bot(&conn, "bot-uuid-1", "Bot1", server_id, false, "", "prompt").unwrap();

        delete_server(&conn, server_id).unwrap();
        assert_eq!(list_bots(&conn).unwrap().len(), 0);
    }

    #[test]
    fn provider_in_use_reflects_active_sessions() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_db(&mut conn).unwrap();
        let server_id = add_server(&conn, "gta.example", 7777).unwrap();
        insert_bot(&conn, "bot-uuid-1", "Bot1", server_id, false, "", "prompt").unwrap();
        let provider_id = insert_provider(&conn, "openai", "key", "https://api.openai.com/v1", "gpt-4o-mini").unwrap();

        assert!(!provider_in_use(&conn, provider_id).unwrap());
        insert_llm_session(&conn, "abc123", "bot-uuid-1", provider_id).unwrap();
        assert!(provider_in_use(&conn, provider_id).unwrap());

        deactivate_llm_session(&conn, "bot-uuid-1").unwrap();
        assert!(!provider_in_use(&conn, provider_id).unwrap());
    }
}
