use super::membership::{Shape, Universe};

/// Target audio-feature values handed to the recommendation search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureTarget {
    pub energy: f64,
    pub valence: f64,
    pub tempo: f64,
    pub loudness: f64,
    pub danceability: f64,
}

impl FeatureTarget {
    /// Build a target from explicit values, clamping each into its universe.
    /// Used when the caller supplies custom parameters instead of a mood.
    pub fn clamped(
        energy: f64,
        valence: f64,
        tempo: f64,
        loudness: f64,
        danceability: f64,
    ) -> Self {
        FeatureTarget {
            energy: UNIT.clamp(energy),
            valence: UNIT.clamp(valence),
            tempo: TEMPO.clamp(tempo),
            loudness: LOUDNESS.clamp(loudness),
            danceability: UNIT.clamp(danceability),
        }
    }
}

const UNIT: Universe = Universe::new(0.0, 1.0, 0.1);
const TEMPO: Universe = Universe::new(60.0, 200.0, 10.0);
const LOUDNESS: Universe = Universe::new(-60.0, 0.0, 5.0);

/// Five-step ordinal scale shared by every output variable.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Level {
    Low,
    LowMedium,
    Medium,
    MediumHigh,
    High,
}

fn unit_shape(level: Level) -> Shape {
    match level {
        Level::Low => Shape::Triangle(0.0, 0.0, 0.3),
        Level::LowMedium => Shape::Triangle(0.1, 0.3, 0.5),
        Level::Medium => Shape::Triangle(0.3, 0.5, 0.7),
        Level::MediumHigh => Shape::Triangle(0.5, 0.7, 0.9),
        Level::High => Shape::Triangle(0.7, 1.0, 1.0),
    }
}

fn tempo_shape(level: Level) -> Shape {
    match level {
        Level::Low => Shape::Triangle(60.0, 60.0, 100.0),
        Level::LowMedium => Shape::Triangle(80.0, 100.0, 120.0),
        Level::Medium => Shape::Triangle(100.0, 120.0, 140.0),
        Level::MediumHigh => Shape::Triangle(120.0, 140.0, 160.0),
        Level::High => Shape::Triangle(140.0, 200.0, 200.0),
    }
}

fn loudness_shape(level: Level) -> Shape {
    match level {
        Level::Low => Shape::Triangle(-60.0, -60.0, -30.0),
        Level::LowMedium => Shape::Triangle(-50.0, -40.0, -20.0),
        Level::Medium => Shape::Triangle(-40.0, -20.0, 0.0),
        Level::MediumHigh => Shape::Triangle(-20.0, -10.0, 0.0),
        Level::High => Shape::Triangle(-10.0, 0.0, 0.0),
    }
}

/// Output levels set by one rule, one per feature.
#[derive(Debug, Clone, Copy)]
struct Consequent {
    energy: Level,
    valence: Level,
    tempo: Level,
    loudness: Level,
    danceability: Level,
}

const fn consequent(
    energy: Level,
    valence: Level,
    tempo: Level,
    loudness: Level,
    danceability: Level,
) -> Consequent {
    Consequent {
        energy,
        valence,
        tempo,
        loudness,
        danceability,
    }
}

use Level::{High, Low, LowMedium, Medium, MediumHigh};

/// Rule rows for the mood-only model, indexed sad / calm / happy.
const MOOD_RULES: [Consequent; 3] = [
    consequent(Low, Low, Low, Low, Low),
    consequent(Medium, MediumHigh, LowMedium, Medium, Medium),
    consequent(High, High, MediumHigh, MediumHigh, High),
];

/// Rule table for the time-aware model: `TIME_RULES[mood][time]` with moods
/// sad / calm / happy and times morning / afternoon / evening. The rows are
/// anchored on the mood-only rules, shifted by one step where the time of day
/// pushes energy up (afternoons) or softens it (mornings, sad evenings).
const TIME_RULES: [[Consequent; 3]; 3] = [
    [
        consequent(Low, Low, Low, Low, Low),
        consequent(LowMedium, Low, LowMedium, LowMedium, Low),
        consequent(Low, LowMedium, Low, Low, LowMedium),
    ],
    [
        consequent(LowMedium, Medium, LowMedium, Medium, LowMedium),
        consequent(Medium, MediumHigh, LowMedium, Medium, Medium),
        consequent(Medium, Medium, Medium, Medium, Medium),
    ],
    [
        consequent(MediumHigh, MediumHigh, Medium, Medium, MediumHigh),
        consequent(High, High, MediumHigh, MediumHigh, High),
        consequent(High, High, MediumHigh, MediumHigh, High),
    ],
];

// Mood sets. The triangular shapes drive the mood-only model; the trapezoids
// widen each category's core for the time-aware cross product. Adjacent sets
// overlap so every mood value activates at least one rule.
const MOOD_TRI: [Shape; 3] = [
    Shape::Triangle(0.0, 0.0, 0.5),
    Shape::Triangle(0.25, 0.5, 0.75),
    Shape::Triangle(0.5, 1.0, 1.0),
];

const MOOD_TRAP: [Shape; 3] = [
    Shape::Trapezoid(0.0, 0.0, 0.2, 0.5),
    Shape::Trapezoid(0.25, 0.4, 0.6, 0.75),
    Shape::Trapezoid(0.5, 0.8, 1.0, 1.0),
];

// Time-of-day sets in fractional hours: morning / afternoon / evening.
const TIME_TRAP: [Shape; 3] = [
    Shape::Trapezoid(0.0, 0.0, 6.0, 12.0),
    Shape::Trapezoid(10.0, 12.0, 16.0, 18.0),
    Shape::Trapezoid(16.0, 18.0, 24.0, 24.0),
];

/// Fuzzy controller mapping a mood value (and optionally the time of day)
/// to target audio features.
pub struct MoodEngine;

impl MoodEngine {
    /// Infer feature targets for `mood` in [0, 1]. When `time_of_day` (in
    /// fractional hours) is given, the nine-rule mood x time model is used;
    /// otherwise the three-rule mood-only model. Inputs outside their domain
    /// are clamped, so inference never fails.
    pub fn infer(mood: f64, time_of_day: Option<f64>) -> FeatureTarget {
        let mood = UNIT.clamp(if mood.is_nan() { 0.5 } else { mood });
        match time_of_day {
            Some(hour) => {
                let hour = if hour.is_nan() { 12.0 } else { hour }.clamp(0.0, 24.0);
                Self::infer_with_time(mood, hour)
            }
            None => Self::infer_mood_only(mood),
        }
    }

    fn infer_mood_only(mood: f64) -> FeatureTarget {
        let firing: Vec<(f64, Consequent)> = MOOD_TRI
            .iter()
            .zip(MOOD_RULES.iter())
            .map(|(shape, rule)| (shape.membership(mood), *rule))
            .collect();
        Self::defuzzify(&firing)
    }

    fn infer_with_time(mood: f64, hour: f64) -> FeatureTarget {
        let mut firing = Vec::with_capacity(9);
        for (mood_index, mood_shape) in MOOD_TRAP.iter().enumerate() {
            let mood_degree = mood_shape.membership(mood);
            for (time_index, time_shape) in TIME_TRAP.iter().enumerate() {
                // Min-conjunction of the two antecedents.
                let weight = mood_degree.min(time_shape.membership(hour));
                firing.push((weight, TIME_RULES[mood_index][time_index]));
            }
        }
        Self::defuzzify(&firing)
    }

    /// Max-aggregation of clipped consequents per output, then centroid.
    fn defuzzify(firing: &[(f64, Consequent)]) -> FeatureTarget {
        let aggregate = |universe: &Universe, shape_of: fn(Level) -> Shape, pick: fn(&Consequent) -> Level| {
            universe.centroid(|x| {
                firing
                    .iter()
                    .map(|(weight, rule)| weight.min(shape_of(pick(rule)).membership(x)))
                    .fold(0.0, f64::max)
            })
        };
        FeatureTarget {
            energy: aggregate(&UNIT, unit_shape, |c| c.energy),
            valence: aggregate(&UNIT, unit_shape, |c| c.valence),
            tempo: aggregate(&TEMPO, tempo_shape, |c| c.tempo),
            loudness: aggregate(&LOUDNESS, loudness_shape, |c| c.loudness),
            danceability: aggregate(&UNIT, unit_shape, |c| c.danceability),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_in_bounds(target: &FeatureTarget) {
        assert!((0.0..=1.0).contains(&target.energy), "energy {}", target.energy);
        assert!((0.0..=1.0).contains(&target.valence), "valence {}", target.valence);
        assert!((0.0..=1.0).contains(&target.danceability), "danceability {}", target.danceability);
        assert!((60.0..=200.0).contains(&target.tempo), "tempo {}", target.tempo);
        assert!((-60.0..=0.0).contains(&target.loudness), "loudness {}", target.loudness);
    }

    #[test]
    fn all_outputs_stay_in_bounds_across_the_input_space() {
        let mut mood = 0.0;
        while mood <= 1.0 {
            assert_in_bounds(&MoodEngine::infer(mood, None));
            let mut hour = 0.0;
            while hour < 24.0 {
                assert_in_bounds(&MoodEngine::infer(mood, Some(hour)));
                hour += 0.75;
            }
            mood += 0.05;
        }
    }

    #[test]
    fn sad_mood_yields_low_energy_slow_tempo() {
        let target = MoodEngine::infer(0.0, None);
        assert!(target.energy < 0.35, "energy {}", target.energy);
        assert!(target.valence < 0.35, "valence {}", target.valence);
        assert!(target.danceability < 0.35, "danceability {}", target.danceability);
        assert!(target.tempo < 110.0, "tempo {}", target.tempo);

        // Only the "low" consequent fires, so the exact centroid is known.
        assert_relative_eq!(target.energy, 0.2 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(target.tempo, 70.0, epsilon = 1e-9);
    }

    #[test]
    fn happy_mood_yields_upper_range_targets() {
        let target = MoodEngine::infer(1.0, None);
        assert!(target.energy > 0.66, "energy {}", target.energy);
        assert!(target.valence > 0.66, "valence {}", target.valence);
        assert!(target.danceability > 0.66, "danceability {}", target.danceability);
    }

    #[test]
    fn sad_mood_dominates_at_any_hour() {
        for hour in [0.0, 5.5, 9.0, 13.0, 17.25, 21.0, 23.9] {
            let target = MoodEngine::infer(0.0, Some(hour));
            assert!(target.energy < 0.35, "hour {hour}: energy {}", target.energy);
            assert!(target.valence < 0.35, "hour {hour}: valence {}", target.valence);
        }
    }

    #[test]
    fn happy_mood_dominates_at_any_hour() {
        for hour in [0.0, 5.5, 9.0, 13.0, 17.25, 21.0, 23.9] {
            let target = MoodEngine::infer(1.0, Some(hour));
            assert!(target.energy > 0.66, "hour {hour}: energy {}", target.energy);
            assert!(target.valence > 0.66, "hour {hour}: valence {}", target.valence);
        }
    }

    #[test]
    fn calm_mood_sits_in_the_middle() {
        let target = MoodEngine::infer(0.5, None);
        assert_relative_eq!(target.energy, 0.5, epsilon = 1e-9);
        assert_relative_eq!(target.valence, 0.7, epsilon = 1e-9);
        assert_relative_eq!(target.tempo, 100.0, epsilon = 1e-9);
        assert_relative_eq!(target.loudness, -20.0, epsilon = 1e-9);
        assert_relative_eq!(target.danceability, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn afternoon_lifts_a_sad_morning() {
        let morning = MoodEngine::infer(0.1, Some(4.0));
        let afternoon = MoodEngine::infer(0.1, Some(14.0));
        assert!(afternoon.energy > morning.energy);
    }

    #[test]
    fn inference_is_pure() {
        let first = MoodEngine::infer(0.42, Some(15.25));
        let second = MoodEngine::infer(0.42, Some(15.25));
        assert_eq!(first, second);
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        assert_eq!(MoodEngine::infer(-3.0, None), MoodEngine::infer(0.0, None));
        assert_eq!(MoodEngine::infer(7.0, None), MoodEngine::infer(1.0, None));
        assert_eq!(
            MoodEngine::infer(0.5, Some(-2.0)),
            MoodEngine::infer(0.5, Some(0.0))
        );
        assert_eq!(
            MoodEngine::infer(0.5, Some(30.0)),
            MoodEngine::infer(0.5, Some(24.0))
        );
    }

    #[test]
    fn clamped_custom_target_respects_universes() {
        let target = FeatureTarget::clamped(1.4, -0.2, 250.0, -75.0, 0.5);
        assert_relative_eq!(target.energy, 1.0);
        assert_relative_eq!(target.valence, 0.0);
        assert_relative_eq!(target.tempo, 200.0);
        assert_relative_eq!(target.loudness, -60.0);
        assert_relative_eq!(target.danceability, 0.5);
    }
}
