use anyhow::Result;
use serde_json::json;
use superscript_explorer::app::App;
use superscript_explorer::config::Config;
use superscript_explorer::logging::{info, obj, run_id, v_str, Domain};
use superscript_explorer::server;
use superscript_explorer::storage::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let mut store = SessionStore::new(&cfg.session_db)?;
    store.init()?;

    info(
        Domain::System,
        "startup",
        obj(&[
            ("run_id", v_str(&run_id())),
            ("path", v_str(&cfg.data_dir.to_string_lossy())),
            ("session_db", v_str(&cfg.session_db)),
            ("duration", json!(cfg.duration)),
        ]),
    );

    let addr = format!("{}:{}", cfg.bind_addr, cfg.port);
    let app = App::new(cfg, Some(store)).shared();
    server::serve(app, &addr).await
}
