use std::sync::mpsc::{self, SendError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CEvent, KeyEvent};
use log::{debug, warn};

#[derive(Debug)]
pub enum Event {
    Key(KeyEvent),
    Resize,
    /// Periodic wake-up used to pick up changes from other processes
    Tick,
}

pub struct EventHandler {
    rx: mpsc::Receiver<Event>,
}

/// Forward terminal input and ticks until the receiving side goes away.
fn pump(tx: &Sender<Event>, tick_rate: Duration) -> Result<(), SendError<Event>> {
    let mut last_tick = Instant::now();
    loop {
        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout).unwrap_or(false) {
            match event::read() {
                Ok(CEvent::Key(key)) => tx.send(Event::Key(key))?,
                Ok(CEvent::Resize(_, _)) => tx.send(Event::Resize)?,
                Ok(_) => {}
                Err(e) => {
                    warn!("terminal input stopped: {}", e);
                    return Ok(());
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            tx.send(Event::Tick)?;
            last_tick = Instant::now();
        }
    }
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            if pump(&tx, tick_rate).is_err() {
                debug!("event receiver dropped, input thread exiting");
            }
        });
        Self { rx }
    }

    pub fn next(&self) -> Result<Event, mpsc::RecvError> {
        self.rx.recv()
    }
}
