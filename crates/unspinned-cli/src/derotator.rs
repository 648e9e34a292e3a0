//! The control loop: integrate field rotation, send it to the rotator in
//! whole steps.

use std::{
    io::{Read, Write},
    time::Duration,
};

use tracing::{debug, info};
use unspinned::{Client, Degrees, Error, Radians, State};

use crate::tracking::{TrackingRate, field_rotation_rate};

/// What TheSkyX says when a rotator move is requested during another.
pub(crate) const ROTATOR_BUSY: &str = "A Rotator command is already in progress.";

/// The two calls the loop needs from TheSkyX.
pub(crate) trait Telescope {
    fn state(&mut self) -> Result<State, Error>;
    fn rotate(&mut self, angle: Degrees) -> Result<State, Error>;
}

impl<S: Read + Write> Telescope for Client<S> {
    fn state(&mut self) -> Result<State, Error> {
        Client::state(self)
    }

    fn rotate(&mut self, angle: Degrees) -> Result<State, Error> {
        Client::rotate(self, angle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Step {
    /// Not enough rotation has built up to be worth a move.
    Holding,
    /// A move was sent and accepted.
    Rotated {
        delta: Degrees,
        communicated: Degrees,
        rate: Radians,
        angle: Degrees,
    },
    /// The rotator was still busy; the move will be retried.
    Busy,
}

#[derive(Debug)]
pub(crate) struct Derotator {
    tracking: TrackingRate,
    step_size: Degrees,
    state: State,
    total: Degrees,
    communicated: Degrees,
}

impl Derotator {
    pub(crate) fn new(tracking: TrackingRate, step_size: Degrees, initial: State) -> Self {
        Self {
            tracking,
            step_size,
            state: initial,
            total: Degrees(0.0),
            communicated: Degrees(0.0),
        }
    }

    pub(crate) fn rotation_rate(&self) -> Radians {
        field_rotation_rate(self.tracking, &self.state)
    }

    /// Accounts for `elapsed` of rotation and moves the rotator if a whole
    /// step is outstanding.
    ///
    /// A busy rotator is not an error. The rotation stays owed and the move is
    /// tried again on a later call. Any other failure is returned.
    pub(crate) fn advance<T: Telescope>(
        &mut self,
        elapsed: Duration,
        telescope: &mut T,
    ) -> Result<Step, Error> {
        let rate = self.rotation_rate();
        self.total += (rate * elapsed.as_secs_f64()).to_degrees();

        let outstanding = self.total - self.communicated;
        if outstanding.abs() <= self.step_size {
            return Ok(Step::Holding);
        }

        let delta = Degrees(outstanding.0 - outstanding.0 % self.step_size.0);
        match telescope.rotate(self.state.rotator_angle + delta) {
            Ok(state) => {
                self.state = state;
                self.communicated += delta;
                Ok(Step::Rotated {
                    delta,
                    communicated: self.communicated,
                    rate,
                    angle: state.rotator_angle,
                })
            }
            Err(err) if is_busy(&err) => Ok(Step::Busy),
            Err(err) => Err(err),
        }
    }
}

fn is_busy(err: &Error) -> bool {
    err.protocol()
        .is_some_and(|e| e.message.ends_with(ROTATOR_BUSY))
}

/// Runs until a non-recoverable error.
pub(crate) fn run<T: Telescope>(
    telescope: &mut T,
    tracking: TrackingRate,
    step_size: Degrees,
    poll_interval: Duration,
) -> Result<(), Error> {
    let initial = telescope.state()?;
    info!(
        latitude = %initial.latitude,
        rotator = %initial.rotator_angle,
        alt = %initial.pointing_at.alt,
        az = %initial.pointing_at.az,
        "starting derotation"
    );

    let mut derotator = Derotator::new(tracking, step_size, initial);
    let mut last = std::time::Instant::now();
    loop {
        if !poll_interval.is_zero() {
            std::thread::sleep(poll_interval);
        }
        let now = std::time::Instant::now();
        let elapsed = now - last;
        last = now;

        match derotator.advance(elapsed, telescope)? {
            Step::Holding => {}
            Step::Busy => debug!("rotator busy, retrying"),
            Step::Rotated {
                delta,
                communicated,
                rate,
                angle,
            } => info!(
                %delta,
                %communicated,
                deg_per_sec = %rate.to_degrees(),
                ?tracking,
                %angle,
                "rotated"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, time::Duration};

    use unspinned::{AltAz, Degrees, Error, ProtocolError, Radians, State};

    use super::{Derotator, ROTATOR_BUSY, Step, Telescope};
    use crate::tracking::TrackingRate;

    /// Replays canned rotate results and records requested angles.
    #[derive(Default)]
    struct Fake {
        results: VecDeque<Result<State, Error>>,
        requested: Vec<Degrees>,
    }

    impl Telescope for Fake {
        fn state(&mut self) -> Result<State, Error> {
            Ok(start())
        }

        fn rotate(&mut self, angle: Degrees) -> Result<State, Error> {
            self.requested.push(angle);
            self.results.pop_front().unwrap_or_else(|| {
                Ok(State {
                    rotator_angle: angle,
                    ..start()
                })
            })
        }
    }

    fn start() -> State {
        State {
            latitude: Degrees(0.0),
            rotator_angle: Degrees(100.0),
            pointing_at: AltAz {
                alt: Degrees(0.0),
                az: Degrees(0.0),
            },
            ..State::default()
        }
    }

    fn refusal(message: &str) -> Error {
        Error::Protocol(ProtocolError {
            message: message.into(),
            error_number: Some(214),
        })
    }

    /// One radian per second of field rotation, clockwise.
    fn unit_rate() -> TrackingRate {
        TrackingRate::Custom(Radians(-1.0))
    }

    #[test]
    fn holds_until_a_full_step_builds_up() {
        let mut fake = Fake::default();
        let mut d = Derotator::new(unit_rate(), Degrees(10.0), start());
        // 0.1 rad is about 5.7 degrees.
        let step = d.advance(Duration::from_millis(100), &mut fake).unwrap();
        assert_eq!(step, Step::Holding);
        assert!(fake.requested.is_empty());
    }

    #[test]
    fn sends_whole_steps_and_keeps_the_remainder() {
        let mut fake = Fake::default();
        let mut d = Derotator::new(unit_rate(), Degrees(10.0), start());
        // 0.5 rad is about 28.6 degrees: two whole steps.
        let step = d.advance(Duration::from_millis(500), &mut fake).unwrap();
        match step {
            Step::Rotated {
                delta,
                communicated,
                angle,
                ..
            } => {
                assert!((delta.0 - 20.0).abs() < 1e-9);
                assert_eq!(communicated, delta);
                assert!((angle.0 - 120.0).abs() < 1e-9);
            }
            other => panic!("expected a rotation, got {other:?}"),
        }
        assert_eq!(fake.requested.len(), 1);

        // About 8.6 degrees are still owed; another 0.1 rad pushes it past a step.
        let step = d.advance(Duration::from_millis(100), &mut fake).unwrap();
        assert!(matches!(step, Step::Rotated { delta, .. } if (delta.0 - 10.0).abs() < 1e-9));
        assert!((fake.requested[1].0 - 130.0).abs() < 1e-9);
    }

    #[test]
    fn busy_rotator_is_retried_with_the_same_debt() {
        let mut fake = Fake::default();
        fake.results.push_back(Err(refusal(&format!("TypeError: {ROTATOR_BUSY}"))));
        let mut d = Derotator::new(unit_rate(), Degrees(10.0), start());

        let step = d.advance(Duration::from_millis(500), &mut fake).unwrap();
        assert_eq!(step, Step::Busy);

        let step = d.advance(Duration::ZERO, &mut fake).unwrap();
        assert!(matches!(step, Step::Rotated { delta, .. } if (delta.0 - 20.0).abs() < 1e-9));
        assert_eq!(fake.requested[0], fake.requested[1]);
    }

    #[test]
    fn other_remote_errors_stop_the_loop() {
        let mut fake = Fake::default();
        fake.results.push_back(Err(refusal("No rotator connected.")));
        let mut d = Derotator::new(unit_rate(), Degrees(10.0), start());
        let err = d.advance(Duration::from_secs(1), &mut fake).unwrap_err();
        assert_eq!(err.protocol().unwrap().message, "No rotator connected.");
    }

    #[test]
    fn counter_rotation_sends_negative_steps() {
        let mut fake = Fake::default();
        let mut d = Derotator::new(TrackingRate::Custom(Radians(1.0)), Degrees(10.0), start());
        let step = d.advance(Duration::from_millis(500), &mut fake).unwrap();
        assert!(matches!(step, Step::Rotated { delta, .. } if (delta.0 + 20.0).abs() < 1e-9));
        assert!((fake.requested[0].0 - 80.0).abs() < 1e-9);
    }
}
