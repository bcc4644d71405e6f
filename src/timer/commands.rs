use std::io::Write;

use tokio::sync::broadcast::error::RecvError;

use crate::{
    timer::{
        facade::{SquareStatus, TimerSnapshot},
        TimerController, TimerEvent,
    },
    AppState,
};

fn controller_from_state(state: &AppState) -> TimerController {
    state.timer.clone()
}

pub async fn get_timer_state(state: &AppState) -> Result<TimerSnapshot, String> {
    let controller = controller_from_state(state);
    Ok(controller.initialize().await)
}

pub async fn reset_timer(state: &AppState) -> Result<TimerSnapshot, String> {
    let controller = controller_from_state(state);
    let loaded = controller.initialize().await;
    if loaded.is_loading {
        return Err("timer backend is unreachable".into());
    }
    let snapshot = controller.reset().await;
    controller.shutdown().await;
    Ok(snapshot)
}

/// Start the countdown and print it until the session completes or Ctrl-C,
/// which pauses and saves progress.
pub async fn run_timer(state: &AppState) -> Result<TimerSnapshot, String> {
    let controller = controller_from_state(state);
    let loaded = controller.initialize().await;
    if loaded.is_loading {
        return Err("timer backend is unreachable".into());
    }
    if loaded.is_session_complete {
        return Ok(loaded);
    }

    let mut events = controller.subscribe();
    let started = controller.start().await;
    if !started.is_running {
        return Err("timer could not be started".into());
    }
    print_progress(&started);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                let paused = controller.pause().await;
                controller.shutdown().await;
                println!();
                return Ok(paused);
            }
            event = events.recv() => match event {
                Ok(TimerEvent::StateChanged(snapshot)) => print_progress(&snapshot),
                Ok(TimerEvent::RoundCompleted { completed_rounds, .. }) => {
                    println!("\nRound {completed_rounds} done");
                }
                Ok(TimerEvent::SessionCompleted { .. }) => {
                    controller.shutdown().await;
                    println!("\nSession complete");
                    return Ok(controller.get_snapshot().await);
                }
                Ok(TimerEvent::Heartbeat(_)) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    }

    controller.shutdown().await;
    Ok(controller.get_snapshot().await)
}

fn print_progress(snapshot: &TimerSnapshot) {
    let mut stdout = std::io::stdout();
    let _ = write!(stdout, "\r{}   ", render_line(snapshot));
    let _ = stdout.flush();
}

pub fn render_squares(snapshot: &TimerSnapshot) -> String {
    snapshot
        .squares
        .iter()
        .map(|status| match status {
            SquareStatus::Completed => '■',
            SquareStatus::Active if snapshot.is_break => '◇',
            SquareStatus::Active => '◆',
            SquareStatus::Empty => '□',
        })
        .collect()
}

/// One-line summary, e.g. `WORK 24:13 [■◆□□] 1/4 running`.
pub fn render_line(snapshot: &TimerSnapshot) -> String {
    if snapshot.is_loading {
        return "loading...".into();
    }
    let phase = if snapshot.is_break { "BREAK" } else { "WORK" };
    let status = if snapshot.is_session_complete {
        "complete"
    } else if snapshot.is_running {
        "running"
    } else {
        "paused"
    };
    format!(
        "{phase} {} [{}] {}/{} {status}",
        snapshot.formatted_time,
        render_squares(snapshot),
        snapshot.completed_rounds,
        snapshot.total_intervals
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> TimerSnapshot {
        TimerSnapshot {
            time_left: 1453,
            formatted_time: "24:13".into(),
            is_running: true,
            is_break: false,
            is_loading: false,
            is_session_complete: false,
            completed_rounds: 1,
            progress: 0.03,
            total_intervals: 4,
            work_seconds: 1500,
            break_seconds: 300,
            session_id: Some("s1".into()),
            current_round_id: Some("r2".into()),
            squares: vec![
                SquareStatus::Completed,
                SquareStatus::Active,
                SquareStatus::Empty,
                SquareStatus::Empty,
            ],
        }
    }

    #[test]
    fn renders_running_work() {
        assert_eq!(render_line(&snapshot()), "WORK 24:13 [■◆□□] 1/4 running");
    }

    #[test]
    fn renders_break_and_loading() {
        let mut on_break = snapshot();
        on_break.is_break = true;
        on_break.is_running = false;
        on_break.squares[1] = SquareStatus::Empty;
        assert_eq!(render_line(&on_break), "BREAK 24:13 [■□□□] 1/4 paused");

        let mut loading = snapshot();
        loading.is_loading = true;
        assert_eq!(render_line(&loading), "loading...");
    }
}
