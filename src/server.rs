//! Minimal HTTP/1.1 front end: one request per connection, routed on the request line.

use anyhow::Result;
use serde_json::json;
use std::collections::HashMap;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::app::{apply_shared, comparison_shared, LoadRequest, SharedApp};
use crate::logging::{info, log_request, obj, v_str, warn, Domain};
use crate::pages;
use crate::params::Parameters;
use crate::player;

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub location: Option<String>,
    pub body: String,
}

impl Response {
    pub fn html(body: String) -> Self {
        Self { status: 200, content_type: "text/html; charset=utf-8", location: None, body }
    }

    pub fn json(value: serde_json::Value) -> Self {
        Self { status: 200, content_type: "application/json", location: None, body: value.to_string() }
    }

    pub fn redirect(to: &str) -> Self {
        Self {
            status: 303,
            content_type: "text/plain",
            location: Some(to.to_string()),
            body: String::new(),
        }
    }

    pub fn error(status: u16, msg: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            location: None,
            body: json!({ "error": msg }).to_string(),
        }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            303 => "See Other",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            409 => "Conflict",
            _ => "Internal Server Error",
        }
    }

    pub fn to_http(&self) -> String {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nAccess-Control-Allow-Origin: *\r\nContent-Length: {}\r\nConnection: close\r\n",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len()
        );
        if let Some(loc) = &self.location {
            head.push_str(&format!("Location: {}\r\n", loc));
        }
        head.push_str("\r\n");
        head + &self.body
    }
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decode `application/x-www-form-urlencoded` text.
pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                    (Some(h), Some(l)) => {
                        out.push(h * 16 + l);
                        i += 2;
                    }
                    _ => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Split a request target into path and decoded query parameters.
pub fn parse_target(target: &str) -> (String, HashMap<String, String>) {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let params = query
        .split('&')
        .filter(|kv| !kv.is_empty())
        .map(|kv| {
            let (k, v) = kv.split_once('=').unwrap_or((kv, ""));
            (percent_decode(k), percent_decode(v))
        })
        .collect();
    (path.to_string(), params)
}

fn parse_field<T: std::str::FromStr>(q: &HashMap<String, String>, key: &str, current: T) -> Result<T, String> {
    match q.get(key) {
        None => Ok(current),
        Some(raw) => raw.parse().map_err(|_| format!("invalid {}: {}", key, raw)),
    }
}

/// Parameters from a query, starting from `current` for any field left out.
pub fn parameters_from_query(q: &HashMap<String, String>, current: &Parameters) -> Result<Parameters, String> {
    let budget_func = match q.get("budget_func").map(String::as_str) {
        None => current.budget_func,
        Some("1") | Some("true") | Some("on") => true,
        Some("0") | Some("false") | Some("off") => false,
        Some(other) => return Err(format!("invalid budget_func: {}", other)),
    };
    Ok(Parameters {
        project_count: parse_field(q, "project_count", current.project_count)?,
        dept_workload: parse_field(q, "dept_workload", current.dept_workload)?,
        budget_func,
        skill_decay: parse_field(q, "skill_decay", current.skill_decay)?,
        train_load: parse_field(q, "train_load", current.train_load)?,
        team_allocation: parse_field(q, "team_allocation", current.team_allocation)?,
        replicate: current.replicate,
    })
}

async fn state_json(app: &SharedApp) -> serde_json::Value {
    let app = app.lock().await;
    json!({
        "session": app.session,
        "batch": app.session.params.batch_name(),
        "loaded": app.data.is_loaded(),
        "notice": app.data.notice,
        "rows": app.data.model_vars.as_ref().map(|t| t.len()),
        "networks": app.data.networks.as_ref().map(|n| n.len()),
        "replicates": app.replicates(),
        "last_timestep": app.last_timestep(),
    })
}

/// Outcome of a control action: JSON state, or back to the page when `back` is set.
async fn after_action(app: &SharedApp, q: &HashMap<String, String>, result: Result<(), String>) -> Response {
    match result {
        Err(msg) => {
            if q.contains_key("back") {
                Response::html(format!(
                    r#"<!DOCTYPE html><html><body><p>{}</p><p><a href="/simulation">Back</a></p></body></html>"#,
                    crate::chart::escape(&msg)
                ))
            } else {
                Response::error(409, &msg)
            }
        }
        Ok(()) if q.contains_key("back") => Response::redirect("/simulation"),
        Ok(()) => Response::json(state_json(app).await),
    }
}

async fn finish_load(
    app: &SharedApp,
    settled: Result<Option<LoadRequest>, String>,
) -> Result<(), String> {
    apply_shared(app, settled?).await;
    Ok(())
}

/// Route one request.
pub async fn handle(app: &SharedApp, method: &str, target: &str) -> Response {
    if method != "GET" && method != "POST" {
        return Response::error(405, "method not allowed");
    }
    let (path, q) = parse_target(target);

    match path.as_str() {
        "/" | "/about" => Response::html(pages::about_page()),
        "/simulation" => {
            let app = app.lock().await;
            Response::html(pages::simulation_page(&app))
        }
        "/comparison" => {
            let runs = comparison_shared(app).await;
            let duration = app.lock().await.config.duration;
            Response::html(pages::comparison_page(&runs, duration))
        }
        "/hypotheses" => {
            let h = q.get("h").and_then(|v| v.parse().ok()).unwrap_or(0);
            let value = q.get("value").and_then(|v| v.parse().ok()).unwrap_or(50);
            Response::html(pages::hypotheses_page(h, value))
        }
        "/api/health" => Response::json(json!({ "status": "ok" })),
        "/api/state" => Response::json(state_json(app).await),
        "/api/frame" => {
            let app = app.lock().await;
            let t = match q.get("t") {
                None => app.session.global_time,
                Some(raw) => match raw.parse() {
                    Ok(t) => t,
                    Err(_) => return Response::error(400, &format!("invalid t: {}", raw)),
                },
            };
            match serde_json::to_value(app.frame(t)) {
                Ok(v) => Response::json(v),
                Err(e) => Response::error(500, &e.to_string()),
            }
        }
        "/api/play" => {
            let result = player::toggle(app).await.map(|_| ());
            after_action(app, &q, result).await
        }
        "/api/network" => {
            {
                let mut app = app.lock().await;
                app.session.toggle_network();
                app.persist();
            }
            after_action(app, &q, Ok(())).await
        }
        "/api/params" => {
            let settled = {
                let mut app = app.lock().await;
                parameters_from_query(&q, &app.session.params)
                    .and_then(|p| app.session.set_parameters(p))
                    .map(|effect| app.settle(effect))
            };
            let result = finish_load(app, settled).await;
            after_action(app, &q, result).await
        }
        "/api/speed" => {
            let result = {
                let mut app = app.lock().await;
                let speed = parse_field(&q, "value", app.session.speed);
                speed.and_then(|s| app.session.handle_speed(s)).map(|_| app.persist())
            };
            after_action(app, &q, result).await
        }
        "/api/replicate" => {
            let settled = {
                let mut app = app.lock().await;
                match q.get("value").map(String::as_str) {
                    Some("random") => {
                        let effect = app.random_replicate();
                        Ok(app.settle(effect))
                    }
                    Some(raw) => match raw.parse::<u32>() {
                        Ok(r) => {
                            let effect = app.session.set_replicate(r);
                            Ok(app.settle(effect))
                        }
                        Err(_) => Err(format!("invalid replicate: {}", raw)),
                    },
                    None => Err("missing replicate value".to_string()),
                }
            };
            let result = finish_load(app, settled).await;
            after_action(app, &q, result).await
        }
        "/api/seek" => {
            let result = {
                let mut app = app.lock().await;
                match parse_field(&q, "t", app.session.global_time) {
                    Ok(t) => {
                        let last = app.last_timestep();
                        app.session.seek(t, last);
                        app.settle(crate::session::Effect::None);
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            };
            after_action(app, &q, result).await
        }
        p if p.starts_with("/api/preset/") => {
            let key = &p["/api/preset/".len()..];
            let settled = {
                let mut app = app.lock().await;
                app.session.set_preset(key).map(|effect| app.settle(effect))
            };
            let result = finish_load(app, settled).await;
            after_action(app, &q, result).await
        }
        p if p.starts_with("/api/") => Response::error(404, "not found"),
        _ => {
            let mut r = Response::html(pages::not_found_page(target));
            r.status = 404;
            r
        }
    }
}

async fn serve_connection(app: SharedApp, stream: TcpStream) -> Result<()> {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await? == 0 {
        return Ok(());
    }
    // drain headers; bodies are ignored
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 || line.trim().is_empty() {
            break;
        }
    }

    let mut parts = request_line.split_whitespace();
    let (method, target) = match (parts.next(), parts.next()) {
        (Some(m), Some(t)) => (m.to_string(), t.to_string()),
        _ => {
            let resp = Response::error(400, "malformed request line");
            write.write_all(resp.to_http().as_bytes()).await?;
            return Ok(());
        }
    };

    let resp = handle(&app, &method, &target).await;
    log_request(&method, &target, resp.status);
    write.write_all(resp.to_http().as_bytes()).await?;
    write.flush().await?;
    Ok(())
}

pub async fn serve(app: SharedApp, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info(
        Domain::Server,
        "listening",
        obj(&[("addr", v_str(&format!("http://{}", listener.local_addr()?)))]),
    );

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(s) => s,
            Err(err) => {
                warn(Domain::Server, "accept_failed", obj(&[("msg", v_str(&err.to_string()))]));
                continue;
            }
        };
        let app = app.clone();
        tokio::spawn(async move {
            if let Err(err) = serve_connection(app, stream).await {
                warn(
                    Domain::Server,
                    "connection_failed",
                    obj(&[("peer", v_str(&peer.to_string())), ("msg", v_str(&err.to_string()))]),
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use crate::config::Config;
    use crate::params::TeamAllocation;

    fn shared() -> SharedApp {
        let config = Config {
            data_dir: "/nonexistent/superscript-data".into(),
            ..Config::default()
        };
        App::new(config, None).shared()
    }

    #[test]
    fn test_parse_target_decodes_query() {
        let (path, q) = parse_target("/api/params?team_allocation=flexible_start_time&x=a%20b+c");
        assert_eq!(path, "/api/params");
        assert_eq!(q["team_allocation"], "flexible_start_time");
        assert_eq!(q["x"], "a b c");
    }

    #[test]
    fn test_percent_decode_keeps_bad_escapes() {
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
        assert_eq!(percent_decode("%41"), "A");
    }

    #[test]
    fn test_parameters_from_query_overrides_fields() {
        let (_, q) = parse_target("/api/params?project_count=5&budget_func=0&team_allocation=Basin");
        let p = parameters_from_query(&q, &Parameters::default()).unwrap();
        assert_eq!(p.project_count, 5);
        assert!(!p.budget_func);
        assert_eq!(p.team_allocation, TeamAllocation::Optimised);
        assert_eq!(p.skill_decay, Parameters::default().skill_decay);

        let (_, bad) = parse_target("/api/params?project_count=many");
        assert!(parameters_from_query(&bad, &Parameters::default()).is_err());
    }

    #[test]
    fn test_redirect_has_location() {
        let http = Response::redirect("/simulation").to_http();
        assert!(http.starts_with("HTTP/1.1 303 See Other\r\n"));
        assert!(http.contains("Location: /simulation\r\n"));
    }

    #[tokio::test]
    async fn test_routes() {
        let app = shared();
        assert_eq!(handle(&app, "GET", "/api/health").await.body, r#"{"status":"ok"}"#);
        assert_eq!(handle(&app, "GET", "/").await.status, 200);
        assert_eq!(handle(&app, "GET", "/hypotheses?h=2").await.status, 200);
        assert_eq!(handle(&app, "GET", "/nowhere").await.status, 404);
        assert_eq!(handle(&app, "GET", "/api/nowhere").await.status, 404);
        assert_eq!(handle(&app, "DELETE", "/").await.status, 405);
        assert_eq!(handle(&app, "GET", "/api/frame?t=x").await.status, 400);
    }

    #[tokio::test]
    async fn test_preset_action_redirects_and_updates_session() {
        let app = shared();
        let resp = handle(&app, "GET", "/api/preset/b?back=1").await;
        assert_eq!(resp.status, 303);
        let a = app.lock().await;
        assert_eq!(a.session.preset.as_deref(), Some("B"));
        assert!(a.session.preset_active);
    }

    #[tokio::test]
    async fn test_speed_action_validates() {
        let app = shared();
        assert_eq!(handle(&app, "GET", "/api/speed?value=11").await.status, 409);
        assert_eq!(handle(&app, "GET", "/api/speed?value=7").await.status, 200);
        assert_eq!(app.lock().await.session.speed, 7);
    }
}
