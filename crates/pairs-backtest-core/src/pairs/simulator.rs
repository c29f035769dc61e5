//! Threshold state machine for a single pair.
//!
//! Transition table, applied once per bar `i >= 1` with `z = z[i]`:
//!
//! | condition            | next position                 |
//! |----------------------|-------------------------------|
//! | `z > entry`          | `Short` (-1)                  |
//! | `z < -entry`         | `Long` (+1)                   |
//! | otherwise            | unchanged                     |
//! | then `\|z\| < exit`  | `Flat` (0), overriding entry  |
//!
//! The position chosen at bar `i` earns `spread[i] - spread[i-1]`, i.e. it
//! is applied on the same bar whose z-score triggered it.

use serde::{Deserialize, Serialize};

use crate::error::PairsError;
use crate::PairsResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Exposure to the spread. Serialises as -1, 0 or 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Position {
    /// Short A, long B
    Short,
    #[default]
    Flat,
    /// Long A, short B
    Long,
}

impl Position {
    pub fn as_i8(self) -> i8 {
        match self {
            Position::Short => -1,
            Position::Flat => 0,
            Position::Long => 1,
        }
    }

    pub fn is_flat(self) -> bool {
        self == Position::Flat
    }

    fn exposure(self) -> f64 {
        f64::from(self.as_i8())
    }
}

impl From<Position> for i8 {
    fn from(p: Position) -> i8 {
        p.as_i8()
    }
}

impl TryFrom<i8> for Position {
    type Error = PairsError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Position::Short),
            0 => Ok(Position::Flat),
            1 => Ok(Position::Long),
            other => Err(PairsError::InvalidInput {
                field: "position".into(),
                reason: format!("position must be -1, 0 or 1, got {other}"),
            }),
        }
    }
}

/// Entry and exit levels in z-score units. Both comparisons are strict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub entry: f64,
    pub exit: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            entry: 2.0,
            exit: 0.2,
        }
    }
}

impl Thresholds {
    pub fn new(entry: f64, exit: f64) -> PairsResult<Self> {
        let t = Self { entry, exit };
        t.validate()?;
        Ok(t)
    }

    /// Both levels must be finite and non-negative. Overlapping levels are
    /// permitted; exit then wins on the bars where both fire.
    pub fn validate(&self) -> PairsResult<()> {
        for (field, value) in [("entry_threshold", self.entry), ("exit_threshold", self.exit)] {
            if !value.is_finite() || value < 0.0 {
                return Err(PairsError::InvalidInput {
                    field: field.into(),
                    reason: format!("must be a finite non-negative number, got {value}"),
                });
            }
        }
        Ok(())
    }
}

/// What the thresholds say about a single z-score, independent of state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    ShortSpread,
    LongSpread,
    Exit,
    Hold,
}

impl Signal {
    pub fn classify(z: f64, thresholds: &Thresholds) -> Signal {
        if z.abs() < thresholds.exit {
            Signal::Exit
        } else if z > thresholds.entry {
            Signal::ShortSpread
        } else if z < -thresholds.entry {
            Signal::LongSpread
        } else {
            Signal::Hold
        }
    }
}

/// Apply the transition table to one z-score.
///
/// A NaN z-score fails every comparison and leaves `current` unchanged.
pub fn next_position(current: Position, z: f64, thresholds: &Thresholds) -> Position {
    match Signal::classify(z, thresholds) {
        Signal::Exit => Position::Flat,
        Signal::ShortSpread => Position::Short,
        Signal::LongSpread => Position::Long,
        Signal::Hold => current,
    }
}

/// Mutable state of one simulation run.
#[derive(Debug, Clone)]
pub struct SimulatorState {
    thresholds: Thresholds,
    position: Position,
}

impl SimulatorState {
    /// A flat state.
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            position: Position::Flat,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Advance by one bar and return the new position.
    pub fn step(&mut self, z: f64) -> Position {
        self.position = next_position(self.position, z, &self.thresholds);
        self.position
    }
}

/// Position and return per bar, starting at the second bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    /// `positions[k]` is the position held during bar `k + 1`
    pub positions: Vec<Position>,
    /// `returns[k]` is the spread PnL of bar `k + 1`
    pub returns: Vec<f64>,
    /// Bar indices whose return is NaN or infinite
    pub undefined_steps: Vec<usize>,
}

impl Simulation {
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// Fraction of bars with a non-flat position; 0 for an empty run.
    pub fn exposure(&self) -> f64 {
        if self.positions.is_empty() {
            return 0.0;
        }
        let active = self.positions.iter().filter(|p| !p.is_flat()).count();
        active as f64 / self.positions.len() as f64
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Run the threshold rule over a spread and its z-scores.
///
/// NaN inputs are propagated rather than rejected: the affected bar's return
/// is NaN and its index is listed in [`Simulation::undefined_steps`].
pub fn simulate(spread: &[f64], z_scores: &[f64], thresholds: Thresholds) -> PairsResult<Simulation> {
    thresholds.validate()?;
    if spread.is_empty() {
        return Err(PairsError::InsufficientData(
            "simulation needs at least one observation".into(),
        ));
    }
    if spread.len() != z_scores.len() {
        return Err(PairsError::InputMismatch(format!(
            "spread has {} values but z-score has {}",
            spread.len(),
            z_scores.len()
        )));
    }

    let steps = spread.len() - 1;
    let mut state = SimulatorState::new(thresholds);
    let mut positions = Vec::with_capacity(steps);
    let mut returns = Vec::with_capacity(steps);
    let mut undefined_steps = Vec::new();

    for i in 1..spread.len() {
        let position = state.step(z_scores[i]);
        let ret = position.exposure() * (spread[i] - spread[i - 1]);
        if !ret.is_finite() {
            undefined_steps.push(i);
        }
        positions.push(position);
        returns.push(ret);
    }

    Ok(Simulation {
        positions,
        returns,
        undefined_steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairs::spread::z_score;

    fn ints(positions: &[Position]) -> Vec<i8> {
        positions.iter().map(|p| p.as_i8()).collect()
    }

    #[test]
    fn test_lengths_are_one_shorter_than_spread() {
        let spread = [1.0, 2.0, 3.0, 4.0, 5.0];
        let z = [0.0; 5];
        let sim = simulate(&spread, &z, Thresholds::default()).unwrap();
        assert_eq!(sim.positions.len(), 4);
        assert_eq!(sim.returns.len(), 4);
    }

    #[test]
    fn test_single_observation_gives_empty_run() {
        let sim = simulate(&[1.0], &[0.0], Thresholds::default()).unwrap();
        assert!(sim.is_empty());
        assert_eq!(sim.exposure(), 0.0);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(
            simulate(&[], &[], Thresholds::default()),
            Err(PairsError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        assert!(matches!(
            simulate(&[1.0, 2.0], &[0.0], Thresholds::default()),
            Err(PairsError::InputMismatch(_))
        ));
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        assert!(Thresholds::new(-1.0, 0.2).is_err());
        assert!(Thresholds::new(2.0, f64::NAN).is_err());
        let bad = Thresholds {
            entry: f64::INFINITY,
            exit: 0.2,
        };
        assert!(simulate(&[1.0, 2.0], &[0.0, 0.0], bad).is_err());
    }

    #[test]
    fn test_scaled_scenario_trace() {
        let spread = [0.0, 1.0, 2.0, 3.0, 2.0, 1.0, 0.0];
        let z = z_score(&spread);
        let sim = simulate(&spread, &z.values, Thresholds::new(1.0, 0.3).unwrap()).unwrap();
        assert_eq!(ints(&sim.positions), vec![0, 0, -1, -1, 0, 1]);
        assert_eq!(sim.returns, vec![0.0, 0.0, -1.0, 1.0, 0.0, -1.0]);
        assert!(sim.undefined_steps.is_empty());
    }

    #[test]
    fn test_same_bar_application() {
        // Entry on bar 2 earns bar 2's spread change, not bar 3's.
        let spread = [0.0, 0.0, 5.0, 5.0];
        let z = [0.0, 0.5, 3.0, 1.0];
        let sim = simulate(&spread, &z, Thresholds::default()).unwrap();
        assert_eq!(ints(&sim.positions), vec![0, -1, -1]);
        assert_eq!(sim.returns, vec![0.0, -5.0, 0.0]);
    }

    #[test]
    fn test_entry_at_threshold_is_not_taken() {
        let spread = [0.0, 1.0, 2.0];
        let sim = simulate(&spread, &[0.0, 2.0, -2.0], Thresholds::default()).unwrap();
        assert_eq!(ints(&sim.positions), vec![0, 0]);
    }

    #[test]
    fn test_entry_just_above_threshold_is_taken() {
        let spread = [0.0, 1.0, 2.0];
        let sim = simulate(&spread, &[0.0, 2.0001, -2.0001], Thresholds::default()).unwrap();
        assert_eq!(ints(&sim.positions), vec![-1, 1]);
    }

    #[test]
    fn test_exit_at_threshold_is_not_taken() {
        let spread = [0.0, 1.0, 2.0, 3.0];
        let sim = simulate(&spread, &[0.0, 2.5, 0.2, 0.19], Thresholds::default()).unwrap();
        assert_eq!(ints(&sim.positions), vec![-1, -1, 0]);
    }

    #[test]
    fn test_exit_overrides_entry_when_thresholds_overlap() {
        let thresholds = Thresholds::new(0.5, 1.0).unwrap();
        assert_eq!(next_position(Position::Flat, 0.7, &thresholds), Position::Flat);
        assert_eq!(next_position(Position::Long, -0.7, &thresholds), Position::Flat);
        // beyond the exit band the entry rule applies
        assert_eq!(next_position(Position::Flat, 1.2, &thresholds), Position::Short);
    }

    #[test]
    fn test_direct_reversal() {
        let t = Thresholds::default();
        assert_eq!(next_position(Position::Long, 2.5, &t), Position::Short);
        assert_eq!(next_position(Position::Short, -2.5, &t), Position::Long);
    }

    #[test]
    fn test_position_held_between_thresholds() {
        let t = Thresholds::default();
        let mut state = SimulatorState::new(t);
        assert_eq!(state.step(-2.1), Position::Long);
        assert_eq!(state.step(-1.0), Position::Long);
        assert_eq!(state.step(1.5), Position::Long);
        assert_eq!(state.step(0.1), Position::Flat);
        assert_eq!(state.position(), Position::Flat);
    }

    #[test]
    fn test_independent_states() {
        let mut a = SimulatorState::new(Thresholds::default());
        let b = SimulatorState::new(Thresholds::default());
        a.step(3.0);
        assert_eq!(a.position(), Position::Short);
        assert_eq!(b.position(), Position::Flat);
    }

    #[test]
    fn test_nan_z_keeps_position() {
        let t = Thresholds::default();
        assert_eq!(next_position(Position::Short, f64::NAN, &t), Position::Short);
        assert_eq!(Signal::classify(f64::NAN, &t), Signal::Hold);
    }

    #[test]
    fn test_nan_spread_flags_single_step() {
        let spread = [0.0, 1.0, f64::NAN, 3.0, 4.0];
        let z = [0.0, 2.5, 2.5, 2.5, 2.5];
        let sim = simulate(&spread, &z, Thresholds::default()).unwrap();
        assert_eq!(sim.undefined_steps, vec![2, 3]);
        assert!(sim.returns[1].is_nan());
        assert!(sim.returns[2].is_nan());
        assert_eq!(sim.returns[3], -1.0);
    }

    #[test]
    fn test_exposure_fraction() {
        let spread = [0.0, 1.0, 2.0, 3.0, 4.0];
        let z = [0.0, 2.5, 1.0, 0.1, 0.5];
        let sim = simulate(&spread, &z, Thresholds::default()).unwrap();
        assert_eq!(ints(&sim.positions), vec![-1, -1, 0, 0]);
        assert_eq!(sim.exposure(), 0.5);
    }

    #[test]
    fn test_signal_classification() {
        let t = Thresholds::default();
        assert_eq!(Signal::classify(2.5, &t), Signal::ShortSpread);
        assert_eq!(Signal::classify(-2.5, &t), Signal::LongSpread);
        assert_eq!(Signal::classify(0.05, &t), Signal::Exit);
        assert_eq!(Signal::classify(1.0, &t), Signal::Hold);
    }

    #[test]
    fn test_position_serializes_as_integer() {
        let json = serde_json::to_string(&vec![Position::Short, Position::Flat, Position::Long])
            .unwrap();
        assert_eq!(json, "[-1,0,1]");
        let back: Vec<Position> = serde_json::from_str("[1,-1]").unwrap();
        assert_eq!(back, vec![Position::Long, Position::Short]);
        assert!(serde_json::from_str::<Position>("2").is_err());
    }
}
