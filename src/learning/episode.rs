use serde::{Deserialize, Serialize};

/// Counts episodes and splits accumulated rewards between the training
/// phase and the testing phase that follows it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EpisodeTracker {
    pub num_training: usize,
    episodes_so_far: usize,
    episode_rewards: f64,
    accum_train_rewards: f64,
    accum_test_rewards: f64,
}

impl EpisodeTracker {
    pub fn new(num_training: usize) -> Self {
        EpisodeTracker {
            num_training,
            ..EpisodeTracker::default()
        }
    }

    pub fn start_episode(&mut self) {
        self.episode_rewards = 0.0;
    }

    pub fn record_reward(&mut self, reward: f64) {
        self.episode_rewards += reward;
    }

    /// Closes the current episode. Returns true if it was the last training
    /// episode.
    pub fn stop_episode(&mut self) -> bool {
        if self.is_in_training() {
            self.accum_train_rewards += self.episode_rewards;
        } else {
            self.accum_test_rewards += self.episode_rewards;
        }
        self.episodes_so_far += 1;
        self.episodes_so_far == self.num_training
    }

    pub fn is_in_training(&self) -> bool {
        self.episodes_so_far < self.num_training
    }

    pub fn is_in_testing(&self) -> bool {
        !self.is_in_training()
    }

    pub fn episodes_so_far(&self) -> usize {
        self.episodes_so_far
    }

    pub fn episode_rewards(&self) -> f64 {
        self.episode_rewards
    }

    pub fn accum_train_rewards(&self) -> f64 {
        self.accum_train_rewards
    }

    pub fn accum_test_rewards(&self) -> f64 {
        self.accum_test_rewards
    }
}
