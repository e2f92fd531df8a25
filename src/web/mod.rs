//! Live JSON feed of a running simulation.
//!
//! The engine runs on a blocking task and publishes one frame per turn.
//! Clients poll `/api/state` or `/api/frames`, or follow `/api/events` (SSE).

use std::{
    convert::Infallible,
    net::SocketAddr,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{error, info};

use crate::{
    engine::{EngineBuilder, EngineSettings},
    scenario::Scenario,
    world::WorldSnapshot,
};

#[derive(Clone, Serialize)]
pub struct UiFrame {
    pub snapshot: WorldSnapshot,
    pub completed: bool,
}

#[derive(Clone, Serialize)]
pub struct StateEnvelope {
    pub scenario: String,
    pub total_turns: u64,
    pub frame: Option<UiFrame>,
    pub completed: bool,
}

#[derive(Serialize)]
struct FramesResponse {
    scenario: String,
    total_turns: u64,
    completed: bool,
    frames: Vec<UiFrame>,
}

/// Frames shared between the simulation task and the HTTP handlers.
pub struct Feed {
    broadcaster: broadcast::Sender<String>,
    latest: Mutex<Option<UiFrame>>,
    frames: Mutex<Vec<UiFrame>>,
    done: AtomicBool,
    scenario: String,
    total_turns: u64,
}

impl Feed {
    pub fn new(scenario: impl Into<String>, total_turns: u64) -> Self {
        let (broadcaster, _) = broadcast::channel(512);
        Self {
            broadcaster,
            latest: Mutex::new(None),
            frames: Mutex::new(Vec::new()),
            done: AtomicBool::new(false),
            scenario: scenario.into(),
            total_turns,
        }
    }

    pub fn publish(&self, snapshot: WorldSnapshot) {
        self.push(UiFrame {
            snapshot,
            completed: false,
        });
    }

    /// Marks the run finished and re-sends the last frame flagged complete.
    pub fn complete(&self) {
        self.done.store(true, Ordering::SeqCst);
        let last = self
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(mut frame) = last {
            frame.completed = true;
            {
                let mut frames = self.frames.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(tail) = frames.last_mut() {
                    *tail = frame.clone();
                }
            }
            *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame.clone());
            self.broadcast(&frame);
        }
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> StateEnvelope {
        StateEnvelope {
            scenario: self.scenario.clone(),
            total_turns: self.total_turns,
            frame: self
                .latest
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            completed: self.is_done(),
        }
    }

    pub fn frames(&self) -> Vec<UiFrame> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, frame: UiFrame) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame.clone());
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame.clone());
        self.broadcast(&frame);
    }

    fn broadcast(&self, frame: &UiFrame) {
        if let Ok(payload) = serde_json::to_string(frame) {
            // No subscribers is fine.
            let _ = self.broadcaster.send(payload);
        }
    }
}

pub struct WebServerConfig {
    pub scenario: Scenario,
    pub turns: u64,
    pub snapshot_interval: u64,
    pub snapshot_dir: PathBuf,
    pub host: String,
    pub port: u16,
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        scenario,
        turns,
        snapshot_interval,
        snapshot_dir,
        host,
        port,
    } = config;

    let scenario_name = scenario.name.clone();
    let mut world = scenario.build_world()?;
    let settings = EngineSettings {
        scenario_name: scenario_name.clone(),
        seed: scenario.seed,
        snapshot_interval_ticks: snapshot_interval,
        snapshot_dir,
    };
    let mut engine = EngineBuilder::from_config(settings, &scenario.config).build();
    let sim_config = scenario.config.clone();

    let feed = Arc::new(Feed::new(scenario_name.clone(), turns));
    let feed_for_sim = feed.clone();
    let sim_handle = tokio::task::spawn_blocking(move || -> Result<()> {
        engine.run_with_hook(&mut world, &sim_config, turns, |snapshot| {
            feed_for_sim.publish(snapshot)
        })?;
        feed_for_sim.complete();
        Ok(())
    });

    let label = scenario_name.clone();
    tokio::spawn(async move {
        match sim_handle.await {
            Ok(Ok(())) => info!(scenario = %label, "simulation completed"),
            Ok(Err(err)) => error!(scenario = %label, "simulation error: {err:?}"),
            Err(err) => error!(scenario = %label, "simulation task failed: {err:?}"),
        }
    });

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;
    info!("live feed at http://{addr}/api/state (Ctrl+C to stop)");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router(feed))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn router(feed: Arc<Feed>) -> Router {
    Router::new()
        .route("/api/state", get(latest_state))
        .route("/api/frames", get(all_frames))
        .route("/api/events", get(stream_events))
        .with_state(feed)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down live feed");
}

async fn latest_state(State(feed): State<Arc<Feed>>) -> Json<StateEnvelope> {
    Json(feed.state())
}

async fn all_frames(State(feed): State<Arc<Feed>>) -> Json<FramesResponse> {
    Json(FramesResponse {
        scenario: feed.scenario.clone(),
        total_turns: feed.total_turns,
        completed: feed.is_done(),
        frames: feed.frames(),
    })
}

async fn stream_events(
    State(feed): State<Arc<Feed>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = feed.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;

    #[test]
    fn complete_flags_the_last_frame() {
        let feed = Feed::new("demo", 2);
        let mut rx = feed.broadcaster.subscribe();
        let mut world = World::new(1.0);
        world.advance_time();
        feed.publish(world.snapshot("demo"));
        world.advance_time();
        feed.publish(world.snapshot("demo"));
        assert!(!feed.state().completed);

        feed.complete();
        let frames = feed.frames();
        assert_eq!(frames.len(), 2);
        assert!(!frames[0].completed);
        assert!(frames[1].completed);
        assert!(feed.state().completed);
        assert_eq!(feed.state().frame.unwrap().snapshot.turn, 2);

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 3);
    }
}
