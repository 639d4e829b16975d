//! The tuning state machine.
//!
//! All knob and button events funnel through one `Tuner`, which owns the
//! authoritative position. Each step is clamped to the dial range, resolved
//! against the dial map, committed, and persisted; playback only changes when
//! the resolved station changes.

use anyhow::Result;
use log::info;

use crate::dial::DialMap;
use crate::player::Playback;
use crate::position::PositionStore;
use crate::station::StationTable;

/// Input events delivered by the hardware watchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// One encoder detent, clockwise (+1) or counter-clockwise (-1).
    Step(i8),
    /// Button press, already debounced.
    Toggle,
}

pub struct Tuner<P: Playback> {
    table: StationTable,
    dial: DialMap,
    store: PositionStore,
    player: P,
    position: i32,
    min_pos: i32,
    max_pos: i32,
}

impl<P: Playback> Tuner<P> {
    pub fn new(
        table: StationTable,
        dial: DialMap,
        store: PositionStore,
        player: P,
        min_pos: i32,
        max_pos: i32,
    ) -> Result<Tuner<P>> {
        let position = store.load()?.max(min_pos).min(max_pos);
        Ok(Tuner {
            table,
            dial,
            store,
            player,
            position,
            min_pos,
            max_pos,
        })
    }

    /// One playback transition to the station at the current position. Run
    /// once at startup, before any events arrive.
    pub fn tune_current(&mut self) -> Result<()> {
        let index = self.dial.resolve(self.position);
        self.retune(index)
    }

    pub fn handle(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Step(delta) => self.step(delta),
            Event::Toggle => self.toggle(),
        }
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    fn step(&mut self, delta: i8) -> Result<()> {
        let delta = i32::from(delta);
        // Hard clamp at the end stops, no wrap-around.
        let effective = if (self.position >= self.max_pos && delta > 0)
            || (self.position <= self.min_pos && delta < 0)
        {
            0
        } else {
            delta
        };
        let candidate = self.position + effective;
        let current = self.dial.resolve(self.position);
        let target = self.dial.resolve(candidate);
        self.position = candidate;
        if target != current {
            self.retune(target)?;
        }
        // Rewritten after every event, clamped or not, so the slot always
        // holds the last committed position.
        self.store.save(self.position)?;
        Ok(())
    }

    fn toggle(&mut self) -> Result<()> {
        if self.player.is_playing() {
            info!("toggle: stopping playback");
            self.player.stop()
        } else {
            let station = self.table.get(self.dial.resolve(self.position));
            info!("toggle: resuming {}", station.url);
            self.player.start(&station.url)
        }
    }

    fn retune(&mut self, index: usize) -> Result<()> {
        let station = self.table.get(index);
        match &station.description {
            Some(name) => info!("tuning to {} ({})", name, station.url),
            None => info!("tuning to {}", station.url),
        }
        self.player.stop()?;
        self.player.start(&station.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const NOISE: &str = "file:///noise.mp3";
    const URL_A: &str = "http://a.example/stream";
    const URL_B: &str = "http://b.example/stream";

    #[derive(Default)]
    struct MockPlayer {
        calls: Vec<String>,
        playing: bool,
    }

    impl Playback for MockPlayer {
        fn start(&mut self, url: &str) -> Result<()> {
            self.calls.push(format!("start {}", url));
            self.playing = true;
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            self.calls.push("stop".to_string());
            self.playing = false;
            Ok(())
        }

        fn is_playing(&mut self) -> bool {
            self.playing
        }
    }

    /// Two stations with a gap between them, dial range 0..=199.
    fn tuner_at(rows: &str, position: i32) -> (Tuner<MockPlayer>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = PositionStore::new(dir.path().join("position.json"), 0);
        store.save(position).unwrap();
        let table = StationTable::load(rows.as_bytes(), NOISE).unwrap();
        let dial = DialMap::build(&table, 0, 199);
        let tuner = Tuner::new(table, dial, store, MockPlayer::default(), 0, 199).unwrap();
        (tuner, dir)
    }

    fn two_station_rows() -> String {
        format!("0,99,{}\n100,199,{}\n", URL_A, URL_B)
    }

    #[test]
    fn startup_tunes_the_stored_position() {
        let (mut tuner, _dir) = tuner_at(&two_station_rows(), 150);
        tuner.tune_current().unwrap();
        assert_eq!(
            tuner.player.calls,
            vec!["stop".to_string(), format!("start {}", URL_B)]
        );
    }

    #[test]
    fn crossing_a_boundary_switches_stations_once() {
        let (mut tuner, _dir) = tuner_at(&two_station_rows(), 99);
        tuner.handle(Event::Step(1)).unwrap();
        assert_eq!(tuner.position(), 100);
        assert_eq!(
            tuner.player.calls,
            vec!["stop".to_string(), format!("start {}", URL_B)]
        );

        tuner.handle(Event::Step(1)).unwrap();
        assert_eq!(tuner.position(), 101);
        assert_eq!(tuner.player.calls.len(), 2);
    }

    #[test]
    fn steps_inside_one_station_are_silent() {
        let (mut tuner, _dir) = tuner_at(&two_station_rows(), 50);
        for delta in &[1, 1, -1, 1, -1, -1] {
            tuner.handle(Event::Step(*delta)).unwrap();
        }
        assert_eq!(tuner.position(), 50);
        assert!(tuner.player.calls.is_empty());
    }

    #[test]
    fn clamps_at_the_upper_stop() {
        let (mut tuner, _dir) = tuner_at(&two_station_rows(), 199);
        for _ in 0..5 {
            tuner.handle(Event::Step(1)).unwrap();
        }
        assert_eq!(tuner.position(), 199);
        assert!(tuner.player.calls.is_empty());
        assert_eq!(tuner.store.load().unwrap(), 199);
    }

    #[test]
    fn clamps_at_the_lower_stop() {
        let (mut tuner, _dir) = tuner_at(&two_station_rows(), 0);
        for _ in 0..5 {
            tuner.handle(Event::Step(-1)).unwrap();
        }
        assert_eq!(tuner.position(), 0);
        assert!(tuner.player.calls.is_empty());
    }

    #[test]
    fn every_step_is_persisted() {
        let (mut tuner, _dir) = tuner_at(&two_station_rows(), 50);
        tuner.handle(Event::Step(1)).unwrap();
        assert_eq!(tuner.store.load().unwrap(), 51);
        tuner.handle(Event::Step(-1)).unwrap();
        assert_eq!(tuner.store.load().unwrap(), 50);
    }

    #[test]
    fn entering_a_gap_tunes_the_noise_station() {
        let rows = format!("0,49,{}\n100,199,{}\n", URL_A, URL_B);
        let (mut tuner, _dir) = tuner_at(&rows, 49);
        tuner.handle(Event::Step(1)).unwrap();
        assert_eq!(
            tuner.player.calls,
            vec!["stop".to_string(), format!("start {}", NOISE)]
        );

        // Moving inside the gap stays on noise, silently.
        tuner.handle(Event::Step(1)).unwrap();
        assert_eq!(tuner.player.calls.len(), 2);
    }

    #[test]
    fn leaving_a_gap_tunes_the_real_station() {
        let rows = format!("0,49,{}\n100,199,{}\n", URL_A, URL_B);
        let (mut tuner, _dir) = tuner_at(&rows, 99);
        tuner.handle(Event::Step(1)).unwrap();
        assert_eq!(
            tuner.player.calls,
            vec!["stop".to_string(), format!("start {}", URL_B)]
        );
    }

    #[test]
    fn toggle_stops_then_resumes_the_current_station() {
        let (mut tuner, _dir) = tuner_at(&two_station_rows(), 150);
        tuner.tune_current().unwrap();
        tuner.player.calls.clear();

        tuner.handle(Event::Toggle).unwrap();
        assert_eq!(tuner.player.calls, vec!["stop".to_string()]);

        tuner.handle(Event::Toggle).unwrap();
        assert_eq!(
            tuner.player.calls,
            vec!["stop".to_string(), format!("start {}", URL_B)]
        );
        assert_eq!(tuner.position(), 150);
    }

    #[test]
    fn stop_always_precedes_start() {
        let (mut tuner, _dir) = tuner_at(&two_station_rows(), 99);
        tuner.tune_current().unwrap();
        tuner.handle(Event::Step(1)).unwrap();
        let starts: Vec<usize> = tuner
            .player
            .calls
            .iter()
            .enumerate()
            .filter(|(_, call)| call.starts_with("start"))
            .map(|(index, _)| index)
            .collect();
        for index in starts {
            assert_eq!(tuner.player.calls[index - 1], "stop");
        }
    }

    #[test]
    fn stored_position_outside_the_dial_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let store = PositionStore::new(dir.path().join("position.json"), 0);
        store.save(5000).unwrap();
        let table = StationTable::load(two_station_rows().as_bytes(), NOISE).unwrap();
        let dial = DialMap::build(&table, 0, 199);
        let tuner = Tuner::new(table, dial, store, MockPlayer::default(), 0, 199).unwrap();
        assert_eq!(tuner.position(), 199);
    }
}
