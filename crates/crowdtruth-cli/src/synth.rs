//! Seeded synthetic annotation panels with a known true location.

use crowdtruth::AnnotatorCategory;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::input::{AnnotationSet, AnnotatorInput};

/// Panel layout and noise levels.
#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub seed: u64,
    pub truth: [f64; 2],
    pub n_experts: usize,
    pub n_workers: usize,
    pub n_samples: usize,
    /// Per-axis standard deviation of expert samples.
    pub expert_sigma: [f64; 2],
    /// Per-axis standard deviation of worker samples.
    pub worker_sigma: [f64; 2],
    /// Workers aim at a point drawn uniformly within this distance of the truth.
    pub worker_bias: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            truth: [10.0, 12.0],
            n_experts: 1,
            n_workers: 2,
            n_samples: 4,
            expert_sigma: [2.0, 1.0],
            worker_sigma: [7.0, 5.0],
            worker_bias: 5.0,
        }
    }
}

impl SynthConfig {
    /// Rejects a worker bias that cannot span a finite sampling range.
    pub fn validate(&self) -> Result<(), String> {
        let bias = self.worker_bias;
        if !(bias >= 0.0 && (2.0 * bias).is_finite()) {
            return Err(format!(
                "worker_bias must be finite and non-negative, got {}",
                bias
            ));
        }
        Ok(())
    }
}

pub fn generate(config: &SynthConfig) -> Result<AnnotationSet, Box<dyn std::error::Error>> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut annotators = Vec::with_capacity(config.n_experts + config.n_workers);

    for i in 0..config.n_workers {
        let aim = if config.worker_bias > 0.0 {
            [
                config.truth[0] + rng.gen_range(-config.worker_bias..=config.worker_bias),
                config.truth[1] + rng.gen_range(-config.worker_bias..=config.worker_bias),
            ]
        } else {
            config.truth
        };
        annotators.push(AnnotatorInput {
            id: format!("worker-{:03}", i),
            category: AnnotatorCategory::Worker,
            samples: sample_cloud(&mut rng, aim, config.worker_sigma, config.n_samples)?,
        });
    }

    for i in 0..config.n_experts {
        annotators.push(AnnotatorInput {
            id: format!("expert-{:03}", i),
            category: AnnotatorCategory::Expert,
            samples: sample_cloud(
                &mut rng,
                config.truth,
                config.expert_sigma,
                config.n_samples,
            )?,
        });
    }

    Ok(AnnotationSet { annotators })
}

fn sample_cloud(
    rng: &mut StdRng,
    center: [f64; 2],
    sigma: [f64; 2],
    n: usize,
) -> Result<Vec<[f64; 2]>, rand_distr::NormalError> {
    let nx = Normal::new(center[0], sigma[0])?;
    let ny = Normal::new(center[1], sigma[1])?;
    Ok((0..n).map(|_| [nx.sample(rng), ny.sample(rng)]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_panel() {
        let cfg = SynthConfig {
            seed: 42,
            ..SynthConfig::default()
        };
        let a = serde_json::to_string(&generate(&cfg).expect("gen")).expect("json");
        let b = serde_json::to_string(&generate(&cfg).expect("gen")).expect("json");
        assert_eq!(a, b);
    }

    #[test]
    fn panel_has_requested_shape() {
        let cfg = SynthConfig {
            n_experts: 2,
            n_workers: 5,
            n_samples: 3,
            ..SynthConfig::default()
        };
        let (landmarks, meta) = generate(&cfg).expect("gen").into_parts().expect("parts");
        assert_eq!(landmarks.shape(), [7, 3, 2]);
        let experts = meta
            .iter()
            .filter(|r| r.category == AnnotatorCategory::Expert)
            .count();
        assert_eq!(experts, 2);
    }

    #[test]
    fn unusable_worker_bias_is_rejected() {
        for worker_bias in [f64::INFINITY, f64::NAN, 1e308, -1.0] {
            let cfg = SynthConfig {
                worker_bias,
                ..SynthConfig::default()
            };
            assert!(generate(&cfg).is_err(), "bias {}", worker_bias);
        }

        let cfg = SynthConfig {
            worker_bias: 0.0,
            ..SynthConfig::default()
        };
        let set = generate(&cfg).expect("gen");
        assert_eq!(set.annotators.len(), 3);
    }

    #[test]
    fn negative_sigma_is_reported() {
        let cfg = SynthConfig {
            expert_sigma: [-1.0, 1.0],
            ..SynthConfig::default()
        };
        assert!(generate(&cfg).is_err());
    }
}
