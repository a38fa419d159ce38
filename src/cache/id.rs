//! Identifier generation strategies.
//!
//! Every cache owns exactly one [`IdGenerator`]. The cache passes the last
//! identifier it issued (or `None`) and the generator returns the next one.
//! Two strategies ship with the crate:
//!
//! - [`SequentialIdGenerator`]: dense `u64` values starting at 1.
//! - [`TimeOrderedIdGenerator`]: UUIDs with the version 7 layout (48-bit
//!   Unix millisecond timestamp followed by a 74-bit counter), re-seeded from
//!   the previous identifier so the sequence keeps increasing across restarts
//!   and clock regressions.

use crate::utils::current_time_millis;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use uuid::{Builder, Uuid};

/// Bound satisfied by every identifier type a cache can be keyed by.
pub trait CacheId: Copy + Ord + Eq + Hash + Debug + Display + Send + Sync + 'static {}

impl<T> CacheId for T where T: Copy + Ord + Eq + Hash + Debug + Display + Send + Sync + 'static {}

/// A monotonic identifier issuing strategy.
///
/// For any chain of calls where each call receives the previous call's
/// result, the returned identifiers must be strictly increasing. Returning
/// `None` means the generator is unable to issue an identifier; the cache
/// treats it as a hard failure of `add`.
pub trait IdGenerator<Id>: Send + 'static {
    /// Produces the identifier following `previous`.
    fn next_id(&mut self, previous: Option<Id>) -> Option<Id>;
}

/// Dense sequential integer identifiers: `1, 2, 3, ...`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequentialIdGenerator;

impl SequentialIdGenerator {
    /// Create a new sequential generator.
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl IdGenerator<u64> for SequentialIdGenerator {
    #[inline]
    fn next_id(&mut self, previous: Option<u64>) -> Option<u64> {
        match previous {
            None => Some(1),
            Some(id) => id.checked_add(1),
        }
    }
}

/// Width of the counter that follows the timestamp.
const COUNTER_BITS: u32 = 74;

/// Largest counter value before the generator borrows from the next
/// millisecond.
const COUNTER_MAX: u128 = (1u128 << COUNTER_BITS) - 1;

/// The low counter segment lives below the variant bits.
const RAND_B_BITS: u32 = 62;

const RAND_B_MASK: u128 = (1u128 << RAND_B_BITS) - 1;

const RAND_A_MASK: u128 = 0xFFF;

/// Largest timestamp representable in the 48-bit field.
const MAX_UNIX_MILLIS: u64 = (1u64 << 48) - 1;

/// Time-ordered UUID identifiers in the version 7 layout.
///
/// Within one millisecond the counter is incremented; a new millisecond
/// starts from a random 62-bit seed, leaving the upper counter bits as
/// headroom. When the clock reads earlier than the last issued value the
/// generator keeps counting from the last value instead of going back.
#[derive(Debug, Default, Clone)]
pub struct TimeOrderedIdGenerator {
    /// `(unix_millis, counter)` of the last issued identifier.
    last: Option<(u64, u128)>,
}

impl TimeOrderedIdGenerator {
    /// Create a generator with no history.
    #[must_use]
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Create a generator that continues strictly above `last_issued`.
    #[must_use]
    pub fn resume_from(last_issued: Uuid) -> Self {
        let mut generator = Self::new();
        generator.observe(last_issued);
        generator
    }

    /// Raise the internal state to `id` if it is ahead of it.
    pub fn observe(&mut self, id: Uuid) {
        let seen = decompose(&id);
        match self.last {
            Some(current) if current >= seen => {}
            _ => self.last = Some(seen),
        }
    }

    fn seed_counter() -> u128 {
        Uuid::new_v4().as_u128() & RAND_B_MASK
    }
}

impl IdGenerator<Uuid> for TimeOrderedIdGenerator {
    fn next_id(&mut self, previous: Option<Uuid>) -> Option<Uuid> {
        if let Some(prev) = previous {
            self.observe(prev);
        }

        let now = current_time_millis()?;
        if now > MAX_UNIX_MILLIS {
            return None;
        }

        let (mut millis, mut counter) = match self.last {
            Some((last_millis, last_counter)) if now <= last_millis => {
                if last_counter < COUNTER_MAX {
                    (last_millis, last_counter + 1)
                } else if last_millis < MAX_UNIX_MILLIS {
                    (last_millis + 1, Self::seed_counter())
                } else {
                    return None;
                }
            }
            _ => (now, Self::seed_counter()),
        };

        let mut id = compose(millis, counter);

        // A foreign previous id (other version nibble) can still sort above
        // the candidate; move past its millisecond.
        if let Some(prev) = previous {
            if id <= prev {
                let (prev_millis, _) = decompose(&prev);
                if prev_millis >= MAX_UNIX_MILLIS {
                    return None;
                }
                millis = prev_millis + 1;
                counter = Self::seed_counter();
                id = compose(millis, counter);
            }
        }

        self.last = Some((millis, counter));
        Some(id)
    }
}

/// Builds the version 7 UUID for a timestamp and counter. The counter's
/// upper 12 bits land in `rand_a` and the lower 62 bits in `rand_b`.
fn compose(millis: u64, counter: u128) -> Uuid {
    let rand_a = (counter >> RAND_B_BITS) & RAND_A_MASK;
    let rand_b = counter & RAND_B_MASK;
    let packed = ((rand_a << 64) | rand_b).to_be_bytes();
    let mut counter_bytes = [0u8; 10];
    counter_bytes.copy_from_slice(&packed[6..]);
    Builder::from_unix_timestamp_millis(millis, &counter_bytes).into_uuid()
}

/// Splits an identifier back into `(unix_millis, counter)`. Works on any
/// UUID so foreign previous identifiers can still be ordered against.
fn decompose(id: &Uuid) -> (u64, u128) {
    let bytes = id.as_bytes();
    let mut millis = [0u8; 8];
    millis[2..].copy_from_slice(&bytes[..6]);
    let mut low = [0u8; 8];
    low.copy_from_slice(&bytes[8..]);
    let rand_a = u128::from(u16::from_be_bytes([bytes[6], bytes[7]])) & RAND_A_MASK;
    let rand_b = u128::from(u64::from_be_bytes(low)) & RAND_B_MASK;
    (u64::from_be_bytes(millis), (rand_a << RAND_B_BITS) | rand_b)
}
