//! Trait Sampling
//!
//! Turns a [`DistributionConfig`] and a randomness source into one agent's
//! traits. Sampling never mutates the config and keeps no hidden state, so
//! the same seed always yields the same population.

use opinion_model::AgentTraits;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

use crate::config::{AngerConfig, DistributionConfig, GullibilityConfig, LongTailConfig, ReligionShare};

/// Category returned when the cumulative probabilities never exceed the draw
pub const FALLBACK_RELIGION: &str = "Other";

/// Samples one full trait vector.
///
/// Draw order is fixed (religion, anger, persuasiveness, gullibility,
/// income) so results are reproducible for a given seed.
pub fn sample_traits<R: Rng + ?Sized>(config: &DistributionConfig, rng: &mut R) -> AgentTraits {
    AgentTraits {
        religion: sample_religion(&config.religion, rng),
        anger: sample_anger(&config.anger, rng),
        persuasiveness: sample_long_tail(&config.persuasiveness, rng),
        gullibility: sample_gullibility(&config.gullibility, rng),
        income: sample_long_tail(&config.income, rng),
    }
}

/// Cumulative-probability draw over the shares in list order.
pub fn sample_religion<R: Rng + ?Sized>(shares: &[ReligionShare], rng: &mut R) -> String {
    let r: f64 = rng.gen();
    let mut cumulative = 0.0;

    for share in shares {
        cumulative += share.probability;
        if r < cumulative {
            return capitalize(&share.name);
        }
    }

    FALLBACK_RELIGION.to_string()
}

/// Peaked normal sample, clamped to `[0, 1]`.
pub fn sample_anger<R: Rng + ?Sized>(config: &AngerConfig, rng: &mut R) -> f64 {
    let z = standard_normal(rng);
    unit_clamp(config.mean + config.std_dev * z * (1.0 / config.peak_factor))
}

/// Power-law sample normalized by `scale`, clamped to `[0, 1]`.
pub fn sample_long_tail<R: Rng + ?Sized>(config: &LongTailConfig, rng: &mut R) -> f64 {
    let u: f64 = rng.gen();
    let raw = (1.0 - u).powf(-1.0 / config.alpha) - 1.0;
    unit_clamp((raw / config.scale).min(1.0))
}

/// Bimodal sample: `[high_min, 1]` with probability `high_threshold`,
/// otherwise `[0, low_max]`.
pub fn sample_gullibility<R: Rng + ?Sized>(config: &GullibilityConfig, rng: &mut R) -> f64 {
    let r: f64 = rng.gen();
    let value = if r < config.high_threshold {
        config.high_min + rng.gen::<f64>() * (1.0 - config.high_min)
    } else {
        rng.gen::<f64>() * config.low_max
    };
    unit_clamp(value)
}

/// Box-Muller standard normal deviate from two uniforms in `(0, 1]`.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1 = nonzero_uniform(rng);
    let u2 = nonzero_uniform(rng);
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Uniform draw that is re-drawn while it lands exactly on 0.
fn nonzero_uniform<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    loop {
        let u: f64 = rng.gen();
        if u != 0.0 {
            return u;
        }
    }
}

/// Clamps to `[0, 1]`. NaN, which degenerate parameters can produce, maps to 0.
pub fn unit_clamp(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Uppercases the first character: "hindu" -> "Hindu".
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Seeded sampler owning its randomness source.
#[derive(Debug, Clone)]
pub struct TraitSampler {
    rng: SmallRng,
}

impl TraitSampler {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn from_rng(rng: SmallRng) -> Self {
        Self { rng }
    }

    pub fn sample(&mut self, config: &DistributionConfig) -> AgentTraits {
        sample_traits(config, &mut self.rng)
    }

    /// Samples `count` trait vectors in order.
    pub fn sample_many(&mut self, config: &DistributionConfig, count: usize) -> Vec<AgentTraits> {
        (0..count).map(|_| self.sample(config)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;
    use std::collections::VecDeque;

    /// Replays scripted uniforms through `Rng::gen::<f64>()`.
    ///
    /// Values must be multiples of 2^-53 (e.g. 0.25, 0.875) to round-trip exactly.
    struct ScriptedRng {
        values: VecDeque<f64>,
    }

    impl ScriptedRng {
        fn new(values: &[f64]) -> Self {
            Self {
                values: values.iter().copied().collect(),
            }
        }
    }

    impl RngCore for ScriptedRng {
        fn next_u32(&mut self) -> u32 {
            (self.next_u64() >> 32) as u32
        }

        fn next_u64(&mut self) -> u64 {
            let value = self.values.pop_front().expect("scripted rng exhausted");
            ((value * (1u64 << 53) as f64) as u64) << 11
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for chunk in dest.chunks_mut(8) {
                let bytes = self.next_u64().to_le_bytes();
                chunk.copy_from_slice(&bytes[..chunk.len()]);
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_scripted_rng_replays_values() {
        let mut rng = ScriptedRng::new(&[0.25, 0.875]);
        assert_eq!(rng.gen::<f64>(), 0.25);
        assert_eq!(rng.gen::<f64>(), 0.875);
    }

    #[test]
    fn test_box_muller_exact_value() {
        let mut rng = ScriptedRng::new(&[0.25, 0.5]);
        let anger = sample_anger(&AngerConfig::default(), &mut rng);

        // z = sqrt(-2 ln 0.25) * cos(pi)
        let z = -(-2.0 * 0.25f64.ln()).sqrt();
        assert_close(anger, 0.5 + 0.2 * z / 2.0);
        assert!((anger - 0.333489).abs() < 1e-6);
    }

    #[test]
    fn test_box_muller_redraws_zero() {
        let mut rng = ScriptedRng::new(&[0.0, 0.25, 0.0, 0.5]);
        let z = standard_normal(&mut rng);
        assert_close(z, -(-2.0 * 0.25f64.ln()).sqrt());
    }

    #[test]
    fn test_higher_peak_factor_narrows_spread() {
        let wide = AngerConfig { peak_factor: 1.0, ..AngerConfig::default() };
        let narrow = AngerConfig { peak_factor: 4.0, ..AngerConfig::default() };

        let a = sample_anger(&wide, &mut ScriptedRng::new(&[0.25, 0.5]));
        let b = sample_anger(&narrow, &mut ScriptedRng::new(&[0.25, 0.5]));
        assert!((a - 0.5).abs() > (b - 0.5).abs());
    }

    #[test]
    fn test_long_tail_exact_value() {
        let mut rng = ScriptedRng::new(&[0.75]);
        let value = sample_long_tail(&LongTailConfig::default(), &mut rng);

        // (0.25)^(-1/1.5) - 1 = 2^(4/3) - 1
        assert_close(value, (2f64.powf(4.0 / 3.0) - 1.0) / 10.0);
    }

    #[test]
    fn test_long_tail_caps_at_one() {
        // 1 - u = 1/512, raw = 512^(2/3) - 1 = 63
        let mut rng = ScriptedRng::new(&[1.0 - 1.0 / 512.0]);
        assert_eq!(sample_long_tail(&LongTailConfig::default(), &mut rng), 1.0);
    }

    #[test]
    fn test_long_tail_zero_draw_is_zero() {
        let mut rng = ScriptedRng::new(&[0.0]);
        assert_eq!(sample_long_tail(&LongTailConfig::default(), &mut rng), 0.0);
    }

    #[test]
    fn test_religion_cumulative_draw() {
        let shares = DistributionConfig::default().religion;

        assert_eq!(sample_religion(&shares, &mut ScriptedRng::new(&[0.5])), "Hindu");
        assert_eq!(sample_religion(&shares, &mut ScriptedRng::new(&[0.875])), "Muslim");
        assert_eq!(sample_religion(&shares, &mut ScriptedRng::new(&[0.0])), "Hindu");
    }

    #[test]
    fn test_religion_falls_back_when_sum_below_one() {
        let shares = vec![ReligionShare::new("hindu", 0.25), ReligionShare::new("sikh", 0.25)];
        assert_eq!(
            sample_religion(&shares, &mut ScriptedRng::new(&[0.75])),
            FALLBACK_RELIGION
        );
        assert_eq!(sample_religion(&[], &mut ScriptedRng::new(&[0.1])), FALLBACK_RELIGION);
    }

    #[test]
    fn test_gullibility_bands() {
        let config = GullibilityConfig::default();

        let high = sample_gullibility(&config, &mut ScriptedRng::new(&[0.5, 0.5]));
        assert_close(high, 0.6 + 0.5 * 0.4);

        let low = sample_gullibility(&config, &mut ScriptedRng::new(&[0.875, 0.5]));
        assert_close(low, 0.5 * 0.6);
    }

    #[test]
    fn test_degenerate_parameters_still_bounded() {
        let mut config = DistributionConfig::default();
        config.anger.peak_factor = 0.0;
        config.anger.mean = 3.0;
        config.persuasiveness.alpha = -2.0;
        config.income.scale = 0.0;
        config.gullibility.high_min = 1.5;
        config.gullibility.low_max = -1.0;

        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..500 {
            let traits = sample_traits(&config, &mut rng);
            assert!(traits.is_bounded(), "out of range: {:?}", traits);
        }
    }

    #[test]
    fn test_unit_clamp() {
        assert_eq!(unit_clamp(-0.5), 0.0);
        assert_eq!(unit_clamp(1.5), 1.0);
        assert_eq!(unit_clamp(0.3), 0.3);
        assert_eq!(unit_clamp(f64::NAN), 0.0);
        assert_eq!(unit_clamp(f64::INFINITY), 1.0);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("zoroastrian"), "Zoroastrian");
        assert_eq!(capitalize("Other"), "Other");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_sampler_is_deterministic() {
        let config = DistributionConfig::default();
        let a = TraitSampler::seeded(12345).sample_many(&config, 20);
        let b = TraitSampler::seeded(12345).sample_many(&config, 20);
        assert_eq!(a, b);
    }
}
