use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use console::{style, Term};
use tokio::task::JoinHandle;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const TICK: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
struct ToolLine {
    name: String,
    started: Instant,
    finished: Option<(Duration, bool)>,
}

/// Tools of the current turn as shown on the animated progress line
#[derive(Debug)]
pub struct ProgressBoard {
    started: Instant,
    tools: Vec<ToolLine>,
    frame: usize,
    stopped: bool,
}

impl ProgressBoard {
    pub fn new(started: Instant) -> Self {
        Self {
            started,
            tools: Vec::new(),
            frame: 0,
            stopped: false,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn start_tool(&mut self, name: &str, started: Instant) {
        self.tools.push(ToolLine {
            name: name.to_string(),
            started,
            finished: None,
        });
    }

    pub fn finish_tool(&mut self, elapsed: Duration, succeeded: bool) {
        if let Some(tool) = self.tools.iter_mut().rev().find(|t| t.finished.is_none()) {
            tool.finished = Some((elapsed, succeeded));
        }
    }

    pub fn total_elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Advance the spinner and render the line for `now`
    pub fn tick(&mut self, now: Instant) -> String {
        let line = self.render(now);
        self.frame = (self.frame + 1) % SPINNER_FRAMES.len();
        line
    }

    pub fn render(&self, now: Instant) -> String {
        let total = now.saturating_duration_since(self.started).as_secs();
        let steps: Vec<String> = self
            .tools
            .iter()
            .enumerate()
            .map(|(i, tool)| match tool.finished {
                Some((elapsed, true)) => style(format!(
                    "{}. {} ({:.1}s)",
                    i + 1,
                    tool.name,
                    elapsed.as_secs_f64()
                ))
                .green()
                .dim()
                .to_string(),
                Some((elapsed, false)) => style(format!(
                    "{}. {} ({:.1}s)",
                    i + 1,
                    tool.name,
                    elapsed.as_secs_f64()
                ))
                .red()
                .dim()
                .to_string(),
                None => style(format!(
                    "{}. {} ({}s)",
                    i + 1,
                    tool.name,
                    now.saturating_duration_since(tool.started).as_secs()
                ))
                .magenta()
                .to_string(),
            })
            .collect();

        format!(
            "{} {}",
            style(format!(
                "Calling tools (total: {}s): {}",
                total, SPINNER_FRAMES[self.frame]
            ))
            .dim(),
            steps.join(" → ")
        )
    }
}

/// Redraws a [`ProgressBoard`] four times per second on a background task,
/// independent of when the running tool finishes.
pub struct ProgressTicker {
    board: Arc<Mutex<ProgressBoard>>,
    handle: JoinHandle<()>,
    term: Term,
}

impl ProgressTicker {
    pub fn start(board: ProgressBoard) -> Self {
        let term = Term::stdout();
        let _ = term.write_line(
            &style("Press Ctrl+C to interrupt tool execution")
                .dim()
                .italic()
                .to_string(),
        );

        let board = Arc::new(Mutex::new(board));
        let handle = tokio::spawn({
            let board = Arc::clone(&board);
            let term = term.clone();
            async move {
                let mut interval = tokio::time::interval(TICK);
                loop {
                    interval.tick().await;
                    // Draw under the lock so a stop cannot slip in between
                    let Ok(mut guard) = board.lock() else { break };
                    if guard.is_stopped() {
                        break;
                    }
                    let line = guard.tick(Instant::now());
                    let _ = term.clear_line();
                    let _ = term.write_str(&line);
                }
            }
        });

        Self {
            board,
            handle,
            term,
        }
    }

    /// Apply a change to the board and redraw right away
    pub fn update<F: FnOnce(&mut ProgressBoard)>(&self, change: F) {
        if let Ok(mut board) = self.board.lock() {
            if board.stopped {
                return;
            }
            change(&mut board);
            let _ = self.term.clear_line();
            let _ = self.term.write_str(&board.render(Instant::now()));
        }
    }

    /// Stop redrawing and clear the line. Returns the total time spent on tools.
    pub fn stop(self) -> Duration {
        let total = match self.board.lock() {
            Ok(mut board) => {
                board.stopped = true;
                let _ = self.term.clear_line();
                board.total_elapsed()
            }
            Err(_) => {
                let _ = self.term.clear_line();
                Duration::default()
            }
        };
        self.handle.abort();
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(line: &str) -> String {
        console::strip_ansi_codes(line).to_string()
    }

    #[test]
    fn test_render_progress_line() {
        let start = Instant::now();
        let mut board = ProgressBoard::new(start);
        board.start_tool("a", start);
        board.finish_tool(Duration::from_millis(400), true);
        board.start_tool("b", start + Duration::from_millis(400));

        let line = plain(&board.render(start + Duration::from_millis(3500)));
        assert_eq!(line, "Calling tools (total: 3s): ⠋ 1. a (0.4s) → 2. b (3s)");
    }

    #[test]
    fn test_spinner_advances_per_tick() {
        let start = Instant::now();
        let mut board = ProgressBoard::new(start);
        board.start_tool("slow", start);

        let frames: Vec<String> = (0..3)
            .map(|_| plain(&board.tick(start)))
            .map(|line| line.chars().nth("Calling tools (total: 0s): ".chars().count()).unwrap().to_string())
            .collect();
        assert_eq!(frames, vec!["⠋", "⠙", "⠹"]);
    }

    #[test]
    fn test_finish_marks_latest_running_tool() {
        let start = Instant::now();
        let mut board = ProgressBoard::new(start);
        board.start_tool("a", start);
        board.finish_tool(Duration::from_secs(1), false);
        board.finish_tool(Duration::from_secs(2), true);

        let line = plain(&board.render(start));
        assert!(line.ends_with("1. a (1.0s)"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_ticker_does_not_draw_after_stop() {
        let ticker = ProgressTicker::start(ProgressBoard::new(Instant::now()));
        ticker.update(|board| board.start_tool("a", Instant::now()));
        let board = Arc::clone(&ticker.board);
        tokio::time::sleep(Duration::from_millis(300)).await;

        ticker.stop();
        let frame_at_stop = board.lock().unwrap().frame;
        tokio::time::sleep(Duration::from_millis(600)).await;

        let board = board.lock().unwrap();
        assert!(board.is_stopped());
        assert_eq!(board.frame, frame_at_stop);
    }

    #[tokio::test]
    async fn test_ticker_stop_reports_total() {
        let start = Instant::now() - Duration::from_secs(2);
        let ticker = ProgressTicker::start(ProgressBoard::new(start));
        ticker.update(|board| board.start_tool("a", Instant::now()));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(ticker.stop() >= Duration::from_secs(2));
    }
}
