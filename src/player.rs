//! Timeline playback: one frame per tick, sleeping `frame_ms / speed` between frames.

use serde_json::json;
use tokio::time::sleep;

use crate::app::{SharedApp, Step};
use crate::logging::{debug, info, obj, Domain};

/// Drive playback until it is stopped, superseded, or reaches the final timestep.
///
/// `generation` is the value handed out by [`crate::app::App::toggle_play`]; any later
/// control input bumps it, so a loop left over from an earlier click exits on its next tick.
pub async fn run(app: SharedApp, generation: u64) {
    info(Domain::Playback, "started", obj(&[("generation", json!(generation))]));
    let mut frames = 0usize;
    loop {
        let step = {
            let mut app = app.lock().await;
            if !app.is_current(generation) || !app.session.playing {
                Step::Finished
            } else {
                app.step()
            }
        };
        match step {
            Step::Advanced(interval) => {
                frames += 1;
                sleep(interval).await;
            }
            Step::Finished => break,
        }
    }
    debug(
        Domain::Playback,
        "stopped",
        obj(&[("generation", json!(generation)), ("frames", json!(frames))]),
    );
}

/// Toggle playback and, if it started, spawn the loop that drives it.
pub async fn toggle(app: &SharedApp) -> Result<bool, String> {
    let generation = app.lock().await.toggle_play()?;
    match generation {
        Some(g) => {
            tokio::spawn(run(app.clone(), g));
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use crate::config::Config;

    fn shared(duration: usize) -> SharedApp {
        let config = Config {
            data_dir: "/nonexistent/superscript-data".into(),
            duration,
            frame_ms: 1,
            ..Config::default()
        };
        App::new(config, None).shared()
    }

    #[tokio::test]
    async fn test_run_plays_to_the_end() {
        let app = shared(6);
        {
            let mut a = app.lock().await;
            a.session.playing = true;
            a.session.speed = 10;
        }
        run(app.clone(), 0).await;
        let a = app.lock().await;
        assert_eq!(a.session.global_time, 5);
        assert!(!a.session.playing);
    }

    #[tokio::test]
    async fn test_stale_generation_exits_immediately() {
        let app = shared(6);
        {
            let mut a = app.lock().await;
            a.session.playing = true;
        }
        run(app.clone(), 99).await;
        let a = app.lock().await;
        assert_eq!(a.session.global_time, 0);
        assert!(a.session.playing);
    }
}
