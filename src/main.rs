use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Sender};
use log::{info, warn};

use config::Config;
use dial::DialMap;
use gpio::InputPin;
use player::VlcPlayer;
use position::PositionStore;
use rotary::Rotary;
use station::StationTable;
use tuner::{Event, Tuner};

mod config;
mod dial;
mod gpio;
mod player;
mod position;
mod rotary;
mod station;
mod tuner;

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::load()?;

    // Station playlist and the dial map derived from it
    info!("loading playlist {}", config.playlist_path.display());
    let table = StationTable::load_from_path(&config.playlist_path, &config.noise_url)?;
    info!(
        "{} stations on the dial, positions {}..={}",
        table.real().len(),
        config.min_pos,
        config.max_pos
    );
    let dial = DialMap::build(&table, config.min_pos, config.max_pos);

    // Last dial position survives restarts
    let store = PositionStore::new(&config.position_path, config.default_pos);

    let mut tuner = Tuner::new(
        table,
        dial,
        store,
        VlcPlayer::new(),
        config.min_pos,
        config.max_pos,
    )?;

    // Hardware watchers feed one bounded channel
    let (events, incoming) = bounded(64);
    spawn_encoder_watcher(events.clone(), &config)?;
    spawn_button_watcher(events, &config)?;

    // Play whatever the dial pointed at when the process went down
    tuner.tune_current()?;

    // Single consumer: transitions never interleave
    for event in incoming {
        if let Err(err) = tuner.handle(event) {
            warn!("handling {:?} failed: {:#}", event, err);
        }
    }
    Ok(())
}

/// Polls the encoder pins through the quadrature decoder and emits one step
/// event per detent.
fn spawn_encoder_watcher(events: Sender<Event>, config: &Config) -> Result<()> {
    let clk = InputPin::open(config.clk_pin).context("could not open the encoder CLK pin")?;
    let dt = InputPin::open(config.dt_pin).context("could not open the encoder DT pin")?;
    let interval = Duration::from_millis(config.poll_interval_ms);
    thread::spawn(move || {
        let mut decoder = Rotary::new();
        loop {
            match (clk.read(), dt.read()) {
                (Ok(clk_level), Ok(dt_level)) => {
                    let step = decoder.sample(clk_level, dt_level);
                    if step != 0 && events.send(Event::Step(step)).is_err() {
                        break;
                    }
                }
                (Err(err), _) | (_, Err(err)) => warn!("encoder read failed: {:#}", err),
            }
            thread::sleep(interval);
        }
    });
    Ok(())
}

/// Polls the button pin and emits a toggle event per debounced press.
fn spawn_button_watcher(events: Sender<Event>, config: &Config) -> Result<()> {
    let button = InputPin::open(config.button_pin).context("could not open the button pin")?;
    let interval = Duration::from_millis(config.poll_interval_ms.max(5));
    let debounce = Duration::from_millis(config.button_debounce_ms);
    thread::spawn(move || {
        let mut last_level = 0;
        let mut last_press: Option<Instant> = None;
        loop {
            match button.read() {
                Ok(level) => {
                    let pressed = level == 1 && last_level == 0;
                    let settled = last_press.map_or(true, |at| at.elapsed() >= debounce);
                    if pressed && settled {
                        last_press = Some(Instant::now());
                        if events.send(Event::Toggle).is_err() {
                            break;
                        }
                    }
                    last_level = level;
                }
                Err(err) => warn!("button read failed: {:#}", err),
            }
            thread::sleep(interval);
        }
    });
    Ok(())
}
