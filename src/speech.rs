//! Spoken-output scheduling so delayed prompts can be cancelled before they fire.
//!
//! Every scheduled utterance records the generation it was queued under. Bumping
//! the generation (new capture attempt, form reset) makes older entries stale,
//! and stale entries are dropped instead of spoken even if their deadline passes.

use std::time::{Duration, Instant};

/// Speech synthesis collaborator.
pub trait SpeechOutput {
    /// Speak `text` now; the scheduler has already applied any delay.
    fn speak(&mut self, text: &str);

    /// Silence anything currently being spoken or queued by the synthesizer.
    fn cancel_speech(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ScheduledUtterance {
    text: String,
    due: Instant,
    generation: u64,
    seq: u64,
}

/// Queue of delayed utterances keyed by generation.
#[derive(Debug, Default)]
pub struct SpeechScheduler {
    pending: Vec<ScheduledUtterance>,
    generation: u64,
    next_seq: u64,
}

impl SpeechScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a new generation; everything scheduled before is discarded.
    pub fn advance_generation(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.pending.clear();
        self.generation
    }

    /// Queue `text` to be spoken `delay` after `now` under the current generation.
    pub fn schedule(&mut self, text: impl Into<String>, delay: Duration, now: Instant) {
        let entry = ScheduledUtterance {
            text: text.into(),
            due: now + delay,
            generation: self.generation,
            seq: self.next_seq,
        };
        self.next_seq = self.next_seq.wrapping_add(1);
        self.pending.push(entry);
    }

    /// Drop every pending utterance. Returns how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Earliest deadline still pending.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|entry| entry.due).min()
    }

    /// Remove and return due utterances of the current generation, in due/queue order.
    pub fn take_due(&mut self, now: Instant) -> Vec<String> {
        let generation = self.generation;
        self.pending.retain(|entry| entry.generation == generation);
        let mut due = Vec::new();
        let mut index = 0;
        while index < self.pending.len() {
            if self.pending[index].due <= now {
                due.push(self.pending.swap_remove(index));
            } else {
                index += 1;
            }
        }
        due.sort_by_key(|entry| (entry.due, entry.seq));
        due.into_iter().map(|entry| entry.text).collect()
    }

    /// Remove and return everything still queued for the current generation, due or not.
    pub fn drain_pending(&mut self) -> Vec<String> {
        let generation = self.generation;
        let mut pending: Vec<ScheduledUtterance> = self
            .pending
            .drain(..)
            .filter(|entry| entry.generation == generation)
            .collect();
        pending.sort_by_key(|entry| (entry.due, entry.seq));
        pending.into_iter().map(|entry| entry.text).collect()
    }

    /// Speak every due utterance through `output`. Returns how many were spoken.
    pub fn release_due<O: SpeechOutput + ?Sized>(&mut self, now: Instant, output: &mut O) -> usize {
        let due = self.take_due(now);
        for text in &due {
            output.speak(text);
        }
        due.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        spoken: Vec<String>,
        cancels: usize,
    }

    impl SpeechOutput for Recorder {
        fn speak(&mut self, text: &str) {
            self.spoken.push(text.to_string());
        }

        fn cancel_speech(&mut self) {
            self.cancels += 1;
        }
    }

    #[test]
    fn releases_only_due_entries_in_deadline_order() {
        let now = Instant::now();
        let mut scheduler = SpeechScheduler::new();
        scheduler.schedule("later", Duration::from_millis(3000), now);
        scheduler.schedule("first", Duration::from_millis(1000), now);
        scheduler.schedule("second", Duration::from_millis(1000), now);

        let mut out = Recorder::default();
        assert_eq!(scheduler.release_due(now, &mut out), 0);
        assert_eq!(
            scheduler.next_deadline(),
            Some(now + Duration::from_millis(1000))
        );

        scheduler.release_due(now + Duration::from_millis(1500), &mut out);
        assert_eq!(out.spoken, vec!["first", "second"]);
        assert_eq!(scheduler.pending_len(), 1);

        scheduler.release_due(now + Duration::from_millis(3000), &mut out);
        assert_eq!(out.spoken, vec!["first", "second", "later"]);
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn new_generation_discards_stale_entries() {
        let now = Instant::now();
        let mut scheduler = SpeechScheduler::new();
        scheduler.schedule("stale prompt", Duration::from_millis(10), now);
        let before = scheduler.generation();
        let after = scheduler.advance_generation();
        assert_ne!(before, after);
        scheduler.schedule("fresh prompt", Duration::from_millis(10), now);

        let due = scheduler.take_due(now + Duration::from_secs(1));
        assert_eq!(due, vec!["fresh prompt"]);
    }

    #[test]
    fn drain_pending_returns_undue_entries_in_order() {
        let now = Instant::now();
        let mut scheduler = SpeechScheduler::new();
        scheduler.schedule("stale", Duration::from_millis(10), now);
        scheduler.advance_generation();
        scheduler.schedule("prompt", Duration::from_millis(3000), now);
        scheduler.schedule("confirmation", Duration::from_millis(1000), now);

        assert!(scheduler.take_due(now).is_empty());
        assert_eq!(scheduler.drain_pending(), vec!["confirmation", "prompt"]);
        assert_eq!(scheduler.pending_len(), 0);
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn cancel_all_is_idempotent() {
        let now = Instant::now();
        let mut scheduler = SpeechScheduler::new();
        scheduler.schedule("a", Duration::ZERO, now);
        scheduler.schedule("b", Duration::ZERO, now);
        assert_eq!(scheduler.cancel_all(), 2);
        assert_eq!(scheduler.cancel_all(), 0);
        assert!(scheduler.take_due(now).is_empty());
    }
}
