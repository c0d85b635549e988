use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::seq::index;

use crate::ai::Experience;

/// Fixed-capacity ring buffer for storing training experiences.
pub struct ReplayBuffer {
    buffer: Vec<Experience>,
    capacity: usize,
    position: usize,
    len: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Replay buffer capacity must be positive");
        ReplayBuffer {
            buffer: Vec::with_capacity(capacity),
            capacity,
            position: 0,
            len: 0,
        }
    }

    /// Add an experience to the buffer. Overwrites oldest when full.
    pub fn push(&mut self, experience: Experience) {
        if self.buffer.len() < self.capacity {
            self.buffer.push(experience);
        } else {
            self.buffer[self.position] = experience;
        }
        self.position = (self.position + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    /// Sample a random batch of distinct experiences.
    pub fn sample(&self, batch_size: usize, rng: &mut StdRng) -> Vec<Experience> {
        assert!(batch_size <= self.len, "Not enough experiences to sample");
        let indices = index::sample(rng, self.len, batch_size);
        indices.iter().map(|i| self.buffer[i].clone()).collect()
    }

    /// Experiences from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Experience> {
        let split = if self.len < self.capacity {
            0
        } else {
            self.position
        };
        self.buffer[split..].iter().chain(self.buffer[..split].iter())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.position = 0;
        self.len = 0;
    }
}

/// Replay buffer behind a lock, for self-play workers appending concurrently.
#[derive(Clone)]
pub struct SharedReplayBuffer {
    inner: Arc<Mutex<ReplayBuffer>>,
}

impl SharedReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        SharedReplayBuffer {
            inner: Arc::new(Mutex::new(ReplayBuffer::new(capacity))),
        }
    }

    pub fn push(&self, experience: Experience) {
        self.lock().push(experience);
    }

    /// `None` until at least `batch_size` experiences are stored.
    pub fn sample(&self, batch_size: usize, rng: &mut StdRng) -> Option<Vec<Experience>> {
        let buffer = self.lock();
        (buffer.len() >= batch_size).then(|| buffer.sample(batch_size, rng))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ReplayBuffer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Action, BoardDims, GameStateSnapshot, Shape};
    use rand::SeedableRng;

    fn experience(reward: f32) -> Experience {
        let state = GameStateSnapshot::new(BoardDims::new(4, 6), "bot", Shape::O);
        Experience {
            next_state: state.clone(),
            state,
            action: Action::SoftDrop,
            action_slot: 4,
            reward,
            done: false,
        }
    }

    #[test]
    fn test_push_and_len() {
        let mut buf = ReplayBuffer::new(10);
        assert_eq!(buf.len(), 0);
        assert!(buf.is_empty());

        buf.push(experience(0.0));
        assert_eq!(buf.len(), 1);

        for _ in 0..9 {
            buf.push(experience(0.0));
        }
        assert_eq!(buf.len(), 10);
    }

    #[test]
    fn test_ring_buffer_overwrites_oldest_first() {
        let mut buf = ReplayBuffer::new(5);
        for i in 0..8 {
            buf.push(experience(i as f32));
        }
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.capacity(), 5);
        let rewards: Vec<f32> = buf.iter().map(|e| e.reward).collect();
        assert_eq!(rewards, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_iter_before_wraparound() {
        let mut buf = ReplayBuffer::new(4);
        buf.push(experience(1.0));
        buf.push(experience(2.0));
        let rewards: Vec<f32> = buf.iter().map(|e| e.reward).collect();
        assert_eq!(rewards, vec![1.0, 2.0]);
    }

    #[test]
    fn test_sample_is_distinct_and_seeded() {
        let mut buf = ReplayBuffer::new(100);
        for i in 0..50 {
            buf.push(experience(i as f32));
        }
        let batch = buf.sample(10, &mut StdRng::seed_from_u64(1));
        assert_eq!(batch.len(), 10);
        let mut rewards: Vec<i32> = batch.iter().map(|e| e.reward as i32).collect();
        rewards.sort_unstable();
        rewards.dedup();
        assert_eq!(rewards.len(), 10);

        let again = buf.sample(10, &mut StdRng::seed_from_u64(1));
        let a: Vec<f32> = batch.iter().map(|e| e.reward).collect();
        let b: Vec<f32> = again.iter().map(|e| e.reward).collect();
        assert_eq!(a, b);
    }

    #[test]
    #[should_panic(expected = "Not enough experiences")]
    fn test_sample_too_many() {
        let mut buf = ReplayBuffer::new(10);
        buf.push(experience(0.0));
        buf.sample(5, &mut StdRng::seed_from_u64(0));
    }

    #[test]
    fn test_clear_resets() {
        let mut buf = ReplayBuffer::new(3);
        for i in 0..5 {
            buf.push(experience(i as f32));
        }
        buf.clear();
        assert!(buf.is_empty());
        buf.push(experience(9.0));
        assert_eq!(buf.iter().map(|e| e.reward).collect::<Vec<_>>(), vec![9.0]);
    }

    #[test]
    fn test_shared_buffer_concurrent_append() {
        let shared = SharedReplayBuffer::new(64);
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let buf = shared.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        buf.push(experience((t * 100 + i) as f32));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(shared.len(), 64);
        let mut rng = StdRng::seed_from_u64(2);
        assert!(shared.sample(65, &mut rng).is_none());
        assert_eq!(shared.sample(8, &mut rng).unwrap().len(), 8);
    }
}
