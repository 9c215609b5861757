use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use crate::params::{Parameters, TeamAllocation};
use crate::session::Session;

/// Keeps the dashboard session across server restarts. Playback always
/// resumes stopped.
pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    pub fn new(path: &str) -> Result<Self> {
        Ok(Self { conn: Connection::open(path)? })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    pub fn init(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS session (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                project_count INTEGER NOT NULL,
                dept_workload REAL NOT NULL,
                budget_func INTEGER NOT NULL,
                skill_decay REAL NOT NULL,
                train_load REAL NOT NULL,
                team_allocation TEXT NOT NULL,
                replicate INTEGER NOT NULL,
                preset TEXT,
                preset_active INTEGER NOT NULL,
                global_time INTEGER NOT NULL,
                speed INTEGER NOT NULL,
                show_network INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            );
            COMMIT;",
        )?;
        Ok(())
    }

    pub fn save(&mut self, session: &Session) -> Result<()> {
        let p = &session.params;
        self.conn.execute(
            "INSERT OR REPLACE INTO session (id, project_count, dept_workload, budget_func,
                skill_decay, train_load, team_allocation, replicate, preset, preset_active,
                global_time, speed, show_network, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                p.project_count as i64,
                p.dept_workload,
                p.budget_func,
                p.skill_decay,
                p.train_load,
                p.team_allocation.key(),
                p.replicate as i64,
                session.preset,
                session.preset_active,
                session.global_time as i64,
                session.speed as i64,
                session.show_network,
                crate::logging::ts_now(),
            ],
        )?;
        Ok(())
    }

    pub fn load(&self) -> Result<Option<Session>> {
        let row = self
            .conn
            .query_row(
                "SELECT project_count, dept_workload, budget_func, skill_decay, train_load,
                        team_allocation, replicate, preset, preset_active, global_time, speed,
                        show_network
                 FROM session WHERE id = 1",
                [],
                |r| {
                    Ok((
                        r.get::<_, i64>(0)?,
                        r.get::<_, f64>(1)?,
                        r.get::<_, bool>(2)?,
                        r.get::<_, f64>(3)?,
                        r.get::<_, f64>(4)?,
                        r.get::<_, String>(5)?,
                        r.get::<_, i64>(6)?,
                        r.get::<_, Option<String>>(7)?,
                        r.get::<_, bool>(8)?,
                        r.get::<_, i64>(9)?,
                        r.get::<_, i64>(10)?,
                        r.get::<_, bool>(11)?,
                    ))
                },
            )
            .optional()?;

        let Some((pc, dw, bf, sd, tl, alloc, rep, preset, preset_active, t, speed, show_network)) = row else {
            return Ok(None);
        };
        let team_allocation: TeamAllocation = alloc.parse().map_err(anyhow::Error::msg)?;
        Ok(Some(Session {
            params: Parameters {
                project_count: pc as u32,
                dept_workload: dw,
                budget_func: bf,
                skill_decay: sd,
                train_load: tl,
                team_allocation,
                replicate: rep as u32,
            },
            preset,
            preset_active,
            playing: false,
            global_time: t.max(0) as usize,
            speed: speed as u32,
            data_load_complete: false,
            show_network,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store_loads_none() {
        let mut store = SessionStore::in_memory().unwrap();
        store.init().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let mut store = SessionStore::in_memory().unwrap();
        store.init().unwrap();

        let mut session = Session { data_load_complete: true, ..Session::default() };
        session.set_preset("D").unwrap();
        session.global_time = 42;
        session.playing = true;
        store.save(&session).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.params, session.params);
        assert_eq!(loaded.preset.as_deref(), Some("D"));
        assert!(loaded.preset_active);
        assert_eq!(loaded.global_time, 42);
        assert!(!loaded.playing);
    }

    #[test]
    fn test_save_overwrites_single_row() {
        let mut store = SessionStore::in_memory().unwrap();
        store.init().unwrap();
        let mut session = Session::default();
        store.save(&session).unwrap();
        session.speed = 9;
        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap().unwrap().speed, 9);
    }
}
