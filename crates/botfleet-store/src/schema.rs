use rusqlite::Connection;

use crate::error::Result;

/// Creates every table the fleet needs, inside a single transaction, with
/// foreign keys enabled. Safe to call on every startup — `IF NOT EXISTS`
/// throughout.
pub fn init_db(conn: &mut Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    let tx = conn.transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS servers (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            host        TEXT NOT NULL,
            port        INTEGER NOT NULL,
            name        TEXT,
            gamemode    TEXT,
            rule        TEXT,
            language    TEXT,
            players     INTEGER NOT NULL DEFAULT 0,
            max_players INTEGER NOT NULL DEFAULT 0,
            ping        INTEGER NOT NULL DEFAULT 0,
            last_update TEXT,
            created_at  TEXT NOT NULL,
            UNIQUE(host, port)
        );

        CREATE TABLE IF NOT EXISTS bots (
            uuid          TEXT PRIMARY KEY,
            name          TEXT NOT NULL,
            server_id     INTEGER NOT NULL REFERENCES servers(id) ON DELETE CASCADE,
            invulnerable  INTEGER NOT NULL DEFAULT 0,
            password      TEXT NOT NULL DEFAULT '',
            system_prompt TEXT NOT NULL DEFAULT '',
            created_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS llm_providers (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            name       TEXT NOT NULL UNIQUE,
            api_key    TEXT NOT NULL,
            base_url   TEXT NOT NULL,
            model      TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS llm_sessions (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id    TEXT NOT NULL UNIQUE,
            bot_uuid      TEXT NOT NULL REFERENCES bots(uuid) ON DELETE CASCADE,
            provider_id   INTEGER NOT NULL REFERENCES llm_providers(id) ON DELETE RESTRICT,
            is_active     INTEGER NOT NULL DEFAULT 1,
            created_at    TEXT NOT NULL,
            last_activity TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_bots_server ON bots(server_id);
        CREATE INDEX IF NOT EXISTS idx_sessions_bot ON llm_sessions(bot_uuid);",
    )?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_db_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_db(&mut conn).unwrap();
        init_db(&mut conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='bots'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
