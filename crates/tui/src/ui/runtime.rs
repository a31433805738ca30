//! Event loop for the Flowdesk TUI.
//!
//! Four sources feed the loop: terminal input, finished API tasks, the
//! assistant's reply stream, and a ticker that advances spinners. Every
//! source produces `Effect`s which are handed to [`cmd::run_from_effects`].

use std::io::Stdout;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use flowdesk_api::AppContext;
use flowdesk_util::LocalStore;
use futures_util::{StreamExt, stream::FuturesUnordered};
use ratatui::{Terminal, prelude::CrosstermBackend};
use tokio::{
    signal,
    sync::mpsc,
    task::JoinHandle,
    time::{self, Interval, MissedTickBehavior},
};

use crate::app::{App, ChatEvent, Effect, ExecOutcome, Msg};
use crate::cmd;
use crate::ui::main_component::MainView;

const INPUT_POLL: Duration = Duration::from_millis(16);
const BUSY_TICK: Duration = Duration::from_millis(100);
const IDLE_TICK: Duration = Duration::from_secs(5);

type InFlight = FuturesUnordered<JoinHandle<ExecOutcome>>;

/// Raw-mode terminal on the alternate screen. Restored by [`TerminalSession::restore`].
struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSession {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        Ok(Self {
            terminal: Terminal::new(CrosstermBackend::new(stdout))?,
        })
    }

    fn draw(&mut self, view: &mut MainView, app: &mut App) -> Result<()> {
        self.terminal.draw(|frame| view.render(frame, frame.area(), app))?;
        Ok(())
    }

    fn restore(mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

/// Tick source that speeds up while requests or a chat reply are in flight.
struct AdaptiveTicker {
    period: Duration,
    interval: Interval,
}

impl AdaptiveTicker {
    fn new(period: Duration) -> Self {
        Self { period, interval: Self::interval(period) }
    }

    fn interval(period: Duration) -> Interval {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    fn set_busy(&mut self, busy: bool) {
        let period = if busy { BUSY_TICK } else { IDLE_TICK };
        if period != self.period {
            self.period = period;
            self.interval = Self::interval(period);
        }
    }

    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Forward terminal events from a dedicated task. Polling and reading stay on
/// that task so crossterm never sees two readers.
fn forward_terminal_events() -> mpsc::Receiver<Event> {
    let (sender, receiver) = mpsc::channel(500);
    tokio::spawn(async move {
        loop {
            let ready = match event::poll(INPUT_POLL) {
                Ok(ready) => ready,
                Err(error) => {
                    tracing::warn!(%error, "terminal poll failed");
                    return;
                }
            };
            if !ready {
                tokio::task::yield_now().await;
                continue;
            }
            let event = match event::read() {
                Ok(event) => event,
                Err(error) => {
                    tracing::warn!(%error, "terminal read failed");
                    return;
                }
            };
            if sender.send(event).await.is_err() {
                tracing::debug!("event loop closed; input reader stopping");
                return;
            }
        }
    });
    receiver
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

async fn next_chat_event(stream: &mut Option<mpsc::UnboundedReceiver<ChatEvent>>) -> Option<ChatEvent> {
    match stream.as_mut() {
        Some(receiver) => receiver.recv().await,
        None => None,
    }
}

async fn dispatch(app: &mut App, effects: Vec<Effect>, in_flight: &mut InFlight) {
    if !effects.is_empty() {
        in_flight.extend(cmd::run_from_effects(app, effects).await);
    }
}

/// Run the TUI until the user quits, then restore the terminal.
pub async fn run_app(ctx: Arc<AppContext>, store: Arc<dyn LocalStore>) -> Result<()> {
    let mut input = forward_terminal_events();
    let mut view = MainView::default();
    let mut app = App::new(ctx, store);
    let mut session = TerminalSession::enter()?;

    let mut in_flight = InFlight::new();
    let mut chat_stream: Option<mpsc::UnboundedReceiver<ChatEvent>> = None;
    let mut ticker = AdaptiveTicker::new(IDLE_TICK);

    dispatch(&mut app, vec![Effect::LoadTemplates], &mut in_flight).await;
    session.draw(&mut view, &mut app)?;

    loop {
        let busy = !in_flight.is_empty() || chat_stream.is_some();
        ticker.set_busy(busy);

        let mut effects = Vec::new();
        let redraw = tokio::select! {
            received = input.recv() => match received {
                None => break,
                Some(Event::Key(key)) if is_interrupt(&key) => break,
                Some(Event::Key(key)) => {
                    effects.extend(view.handle_key_events(&mut app, key));
                    true
                }
                Some(Event::Resize(..)) => {
                    effects.extend(app.update(Msg::Resize));
                    true
                }
                Some(_) => false,
            },

            Some(joined) = in_flight.next(), if !in_flight.is_empty() => {
                let outcome = joined
                    .unwrap_or_else(|error| ExecOutcome::Log(format!("Background task failed: {error}")));
                effects.extend(app.update(Msg::ExecCompleted(Box::new(outcome))));
                true
            }

            chat = next_chat_event(&mut chat_stream), if chat_stream.is_some() => {
                match chat {
                    Some(event) => effects.extend(app.update(Msg::Chat(event))),
                    None => chat_stream = None,
                }
                true
            }

            _ = ticker.tick() => {
                effects.extend(app.update(Msg::Tick));
                busy
            }

            _ = signal::ctrl_c() => break,
        };

        dispatch(&mut app, effects, &mut in_flight).await;
        if let Some(receiver) = app.take_pending_chat() {
            chat_stream = Some(receiver);
        }
        if app.should_quit {
            break;
        }
        if redraw {
            session.draw(&mut view, &mut app)?;
        }
    }

    session.restore()
}
