use crate::time::Time;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    time: Time,
    model: usize,
    generation: u64,
}

/// Pending internal events, one live entry per model.
///
/// Min-heap on `(time, model index)`; the model index is the static graph
/// order so simultaneous events always come out the same way. Rescheduling a
/// model bumps its generation and leaves the stale entry to be skipped.
#[derive(Debug, Clone, Default)]
pub struct Calendar {
    heap: BinaryHeap<Reverse<Entry>>,
    generations: Vec<u64>,
    scheduled: Vec<Time>,
}

impl Calendar {
    pub fn new(models: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(models),
            generations: vec![0; models],
            scheduled: vec![Time::INFINITY; models],
        }
    }

    /// Infinite times are recorded but never enter the heap.
    pub fn schedule(&mut self, model: usize, time: Time) {
        self.generations[model] += 1;
        self.scheduled[model] = time;
        if time.is_infinite() {
            return;
        }
        self.heap.push(Reverse(Entry {
            time,
            model,
            generation: self.generations[model],
        }));
    }

    pub fn scheduled(&self, model: usize) -> Time {
        self.scheduled[model]
    }

    fn is_live(&self, entry: &Entry) -> bool {
        self.generations[entry.model] == entry.generation
    }

    fn discard_stale(&mut self) {
        while let Some(Reverse(top)) = self.heap.peek() {
            if self.is_live(top) {
                break;
            }
            self.heap.pop();
        }
    }

    pub fn next_time(&mut self) -> Time {
        self.discard_stale();
        self.heap
            .peek()
            .map(|Reverse(entry)| entry.time)
            .unwrap_or(Time::INFINITY)
    }

    /// Removes and returns every model scheduled at the minimum time, in
    /// ascending model order.
    pub fn pop_imminent(&mut self) -> Option<(Time, Vec<usize>)> {
        let time = self.next_time();
        if time.is_infinite() {
            return None;
        }
        let mut models = Vec::new();
        while let Some(Reverse(top)) = self.heap.peek().copied() {
            if !self.is_live(&top) {
                self.heap.pop();
                continue;
            }
            if top.time != time {
                break;
            }
            self.heap.pop();
            self.generations[top.model] += 1;
            self.scheduled[top.model] = Time::INFINITY;
            models.push(top.model);
        }
        Some((time, models))
    }

    pub fn is_empty(&mut self) -> bool {
        self.next_time().is_infinite()
    }
}
