use std::sync::Mutex;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::db::{GiftRepository, TurnSlot};
use crate::error::{AppError, AppResult};

/// Source of draws uniform on `[0, 1)`.
pub trait UniformSource {
    fn next_unit(&mut self) -> f64;
}

/// Adapts any `rand` generator.
pub struct RngSource<R>(pub R);

impl<R: Rng> UniformSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

/// Fisher–Yates over `1..=count`.
///
/// Walks `i` from `count - 1` down to `1`, drawing `j = floor(u * (i + 1))`
/// and swapping positions `i` and `j`. Draws are consumed in that order, so a
/// scripted source reproduces an exact swap trace.
pub fn shuffled_turn_numbers<S>(count: usize, source: &mut S) -> Vec<i64>
where
    S: UniformSource + ?Sized,
{
    let mut numbers: Vec<i64> = (1..=count as i64).collect();

    for i in (1..count).rev() {
        let j = draw_index(source.next_unit(), i);
        numbers.swap(i, j);
    }

    numbers
}

// floor(u * (i + 1)), clamped so a source that returns 1.0 cannot escape [0, i].
fn draw_index(unit: f64, i: usize) -> usize {
    let scaled = (unit * (i + 1) as f64).floor();
    if scaled <= 0.0 {
        0
    } else {
        (scaled as usize).min(i)
    }
}

/// Shared random source for turn-order draws.
pub struct TurnShuffler {
    source: Mutex<Box<dyn UniformSource + Send>>,
}

impl TurnShuffler {
    pub fn new(source: impl UniformSource + Send + 'static) -> Self {
        Self {
            source: Mutex::new(Box::new(source)),
        }
    }

    /// ChaCha8 stream seeded from `seed`, or from OS entropy when `None`.
    pub fn from_seed(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => {
                warn!("Turn order draws are seeded ({}); results are reproducible", seed);
                ChaCha8Rng::seed_from_u64(seed)
            }
            None => ChaCha8Rng::from_entropy(),
        };

        Self::new(RngSource(rng))
    }

    pub fn shuffle(&self, count: usize) -> AppResult<Vec<i64>> {
        let mut source = self
            .source
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("turn order source lock poisoned")))?;

        Ok(shuffled_turn_numbers(count, &mut **source))
    }
}

/// Outcome of one assignment run.
#[derive(Debug, Clone, Serialize)]
pub struct TurnAssignment {
    pub count: usize,
    pub assignments: Vec<TurnSlot>,
}

impl TurnAssignment {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Assigns a fresh random turn order to every gift in the exchange.
///
/// Runs inside a single transaction: every existing turn number is cleared,
/// the gift list is read, and the new permutation is written. Any error drops
/// the transaction, which rolls back to the previous assignment.
///
/// The clear must stay the first statement: it takes SQLite's write lock up
/// front, so a concurrent shuffle waits on the busy timeout. Under WAL a
/// read-first transaction fails its lock upgrade with `SQLITE_BUSY` at once.
pub struct TurnOrderAssignor;

impl TurnOrderAssignor {
    pub async fn assign(pool: &SqlitePool, shuffler: &TurnShuffler) -> AppResult<TurnAssignment> {
        let mut tx = pool.begin().await.map_err(AppError::Database)?;

        GiftRepository::clear_turn_orders(&mut *tx).await?;

        let gifts = GiftRepository::list_all(&mut *tx).await?;
        if gifts.is_empty() {
            info!("No gifts to shuffle");
            return Ok(TurnAssignment {
                count: 0,
                assignments: Vec::new(),
            });
        }

        let numbers = shuffler.shuffle(gifts.len())?;
        debug!("Drew turn order permutation for {} gifts", gifts.len());

        let mut assignments = Vec::with_capacity(gifts.len());
        for (gift, turn_order) in gifts.iter().zip(numbers) {
            let updated = GiftRepository::set_turn_order(&mut *tx, &gift.id, turn_order).await?;
            if updated != 1 {
                warn!(
                    "Gift {} disappeared while assigning turn order; rolling back",
                    gift.id
                );
                return Err(AppError::Conflict(
                    "Gift list changed during shuffle; try again".to_string(),
                ));
            }

            assignments.push(TurnSlot {
                gift_id: gift.id.clone(),
                user_id: gift.user_id.clone(),
                gift_name: gift.name.clone(),
                turn_order,
            });
        }

        tx.commit().await.map_err(AppError::Database)?;

        info!("Assigned turn order to {} gifts", assignments.len());
        Ok(TurnAssignment {
            count: assignments.len(),
            assignments,
        })
    }
}
