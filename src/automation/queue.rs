use std::collections::VecDeque;

use crate::models::Job;

/// Pending jobs, highest `match_score` first. Equal scores keep discovery order.
#[derive(Debug, Clone, Default)]
pub struct JobQueue {
    jobs: VecDeque<Job>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.jobs.iter().any(|job| job.id == job_id)
    }

    /// Inserts after every job scoring at least as high. Returns false for a
    /// job id that is already queued.
    pub fn push(&mut self, job: Job) -> bool {
        if self.contains(&job.id) {
            return false;
        }
        let index = self
            .jobs
            .partition_point(|queued| queued.match_score >= job.match_score);
        self.jobs.insert(index, job);
        true
    }

    pub fn pop_front(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }

    pub fn clear(&mut self) {
        self.jobs.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn job(id: &str, score: f64) -> Job {
        let mut job = Job::new(id, "Engineer", "Acme", Utc::now());
        job.match_score = score;
        job
    }

    fn ids(queue: &JobQueue) -> Vec<&str> {
        queue.iter().map(|job| job.id.as_str()).collect()
    }

    #[test]
    fn orders_by_score_then_discovery() {
        let mut queue = JobQueue::new();
        for (id, score) in [("a", 0.6), ("b", 0.9), ("c", 0.6), ("d", 1.0), ("e", 0.9)] {
            assert!(queue.push(job(id, score)));
        }
        assert_eq!(ids(&queue), vec!["d", "b", "e", "a", "c"]);

        assert_eq!(queue.pop_front().unwrap().id, "d");
        queue.push(job("f", 0.95));
        assert_eq!(ids(&queue), vec!["f", "b", "e", "a", "c"]);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut queue = JobQueue::new();
        assert!(queue.push(job("a", 0.6)));
        assert!(!queue.push(job("a", 0.99)));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.iter().next().unwrap().match_score, 0.6);
    }
}
