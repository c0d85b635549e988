use std::collections::VecDeque;

use crate::game::AgentStatus;

/// Result of a single episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeResult {
    pub total_reward: f32,
    pub length: usize,
    pub lines_cleared: u32,
    pub final_status: AgentStatus,
}

/// Training metrics tracker with rolling window computations.
pub struct TrainingMetrics {
    episode_results: VecDeque<EpisodeResult>,
    update_losses: VecDeque<f32>,
    capacity: usize,
    total_episodes: usize, // lifetime count, never capped
    total_updates: usize,
}

impl TrainingMetrics {
    pub fn with_capacity(capacity: usize) -> Self {
        TrainingMetrics {
            episode_results: VecDeque::with_capacity(capacity),
            update_losses: VecDeque::with_capacity(capacity),
            capacity,
            total_episodes: 0,
            total_updates: 0,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn record_episode(&mut self, result: EpisodeResult) {
        self.total_episodes += 1;
        self.episode_results.push_back(result);
        if self.episode_results.len() > self.capacity {
            self.episode_results.pop_front();
        }
    }

    pub fn record_update(&mut self, loss: f32) {
        self.total_updates += 1;
        self.update_losses.push_back(loss);
        if self.update_losses.len() > self.capacity {
            self.update_losses.pop_front();
        }
    }

    fn recent(&self, last_n: usize) -> impl Iterator<Item = &EpisodeResult> {
        self.episode_results.iter().rev().take(last_n)
    }

    /// Average cumulative reward over the last N episodes.
    pub fn average_reward(&self, last_n: usize) -> f32 {
        let n = self.episode_results.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        self.recent(n).map(|r| r.total_reward).sum::<f32>() / n as f32
    }

    /// Average loss over the last N updates.
    pub fn average_loss(&self, last_n: usize) -> f32 {
        let n = self.update_losses.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let sum: f32 = self.update_losses.iter().rev().take(n).sum();
        sum / n as f32
    }

    /// Average episode length over the last N episodes.
    pub fn average_length(&self, last_n: usize) -> f32 {
        let n = self.episode_results.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let total: usize = self.recent(n).map(|r| r.length).sum();
        total as f32 / n as f32
    }

    /// Fraction of the last N episodes that ended in victory.
    pub fn victory_rate(&self, last_n: usize) -> f32 {
        let n = self.episode_results.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let wins = self
            .recent(n)
            .filter(|r| r.final_status == AgentStatus::Victorious)
            .count();
        wins as f32 / n as f32
    }

    /// Best cumulative reward still inside the window.
    pub fn best_reward(&self) -> Option<f32> {
        self.episode_results
            .iter()
            .map(|r| r.total_reward)
            .reduce(f32::max)
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }

    pub fn total_updates(&self) -> usize {
        self.total_updates
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new()
    }
}
