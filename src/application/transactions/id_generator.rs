//! Transaction id strategies

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use uuid::Uuid;

use crate::domain::transaction::TRANSACTION_ID_PREFIX;

pub trait TransactionIdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// `TXN-<epoch millis>`, bumped past the last issued value so two starts in
/// the same millisecond still get distinct ids.
#[derive(Debug, Default)]
pub struct TimestampIdGenerator {
    last: AtomicI64,
}

impl TimestampIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionIdGenerator for TimestampIdGenerator {
    fn next_id(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        let issued = loop {
            let candidate = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, candidate, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => break candidate,
                Err(actual) => prev = actual,
            }
        };
        format!("{TRANSACTION_ID_PREFIX}{issued}")
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl TransactionIdGenerator for UuidIdGenerator {
    fn next_id(&self) -> String {
        format!("{TRANSACTION_ID_PREFIX}{}", Uuid::new_v4())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn timestamp_ids_are_strictly_increasing() {
        let generator = TimestampIdGenerator::new();
        let ids: Vec<i64> = (0..100)
            .map(|_| {
                generator
                    .next_id()
                    .trim_start_matches(TRANSACTION_ID_PREFIX)
                    .parse()
                    .unwrap()
            })
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn timestamp_ids_are_unique_across_threads() {
        let generator = Arc::new(TimestampIdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = generator.clone();
                std::thread::spawn(move || (0..250).map(|_| generator.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn uuid_ids_carry_prefix() {
        let id = UuidIdGenerator.next_id();
        assert!(id.starts_with(TRANSACTION_ID_PREFIX));
        assert!(Uuid::parse_str(&id[TRANSACTION_ID_PREFIX.len()..]).is_ok());
    }
}
