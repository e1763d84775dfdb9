use serde::{Deserialize, Serialize};

/// Performance statistics that fold together by event count.
pub trait Metrics: Sized {
    /// Number of events (episodes, batches) summarised.
    fn count(&self) -> u64;

    fn merge(&self, other: &Self) -> Self;
}

/// Count-weighted cumulative average.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunningAverage {
    pub avg: f64,
    pub count: u64,
}

impl RunningAverage {
    pub fn new(avg: f64, count: u64) -> Self {
        Self { avg, count }
    }

    pub fn of<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        let (sum, count) = values
            .into_iter()
            .fold((0.0, 0u64), |(sum, count), v| (sum + v, count + 1));
        (count > 0).then(|| Self::new(sum / count as f64, count))
    }
}

impl Metrics for RunningAverage {
    fn count(&self) -> u64 {
        self.count
    }

    fn merge(&self, other: &Self) -> Self {
        let count = self.count + other.count;
        if count == 0 {
            return *self;
        }
        let avg = (self.avg * self.count as f64 + other.avg * other.count as f64) / count as f64;
        Self { avg, count }
    }
}

/// Gameplay performance of a model version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OnlineMetrics {
    pub num_episodes: u64,
    pub avg_episode_length: f64,
    pub avg_episode_score: f64,
}

impl OnlineMetrics {
    pub fn from_episode(length: usize, score: f64) -> Self {
        Self {
            num_episodes: 1,
            avg_episode_length: length as f64,
            avg_episode_score: score,
        }
    }

    fn length(&self) -> RunningAverage {
        RunningAverage::new(self.avg_episode_length, self.num_episodes)
    }

    fn score(&self) -> RunningAverage {
        RunningAverage::new(self.avg_episode_score, self.num_episodes)
    }
}

impl Metrics for OnlineMetrics {
    fn count(&self) -> u64 {
        self.num_episodes
    }

    fn merge(&self, other: &Self) -> Self {
        let length = self.length().merge(&other.length());
        let score = self.score().merge(&other.score());
        Self {
            num_episodes: length.count,
            avg_episode_length: length.avg,
            avg_episode_score: score.avg,
        }
    }
}

/// Training performance of a model version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OfflineMetrics {
    pub num_batches: u64,
    pub avg_batch_loss: f64,
    /// Average over validation evaluations of the policy's mean max action value.
    pub validation_avg_max_q: Option<RunningAverage>,
}

impl OfflineMetrics {
    /// Summary of one training session; `None` when `losses` is empty.
    pub fn from_losses(losses: &[f32], validation_max_q: Option<f32>) -> Option<Self> {
        let loss = RunningAverage::of(losses.iter().map(|&l| f64::from(l)))?;
        Some(Self {
            num_batches: loss.count,
            avg_batch_loss: loss.avg,
            validation_avg_max_q: validation_max_q.map(|q| RunningAverage::new(f64::from(q), 1)),
        })
    }

    fn loss(&self) -> RunningAverage {
        RunningAverage::new(self.avg_batch_loss, self.num_batches)
    }
}

impl Metrics for OfflineMetrics {
    fn count(&self) -> u64 {
        self.num_batches
    }

    fn merge(&self, other: &Self) -> Self {
        let loss = self.loss().merge(&other.loss());
        Self {
            num_batches: loss.count,
            avg_batch_loss: loss.avg,
            validation_avg_max_q: match (&self.validation_avg_max_q, &other.validation_avg_max_q) {
                (Some(a), Some(b)) => Some(a.merge(b)),
                (a, b) => a.or(*b),
            },
        }
    }
}
