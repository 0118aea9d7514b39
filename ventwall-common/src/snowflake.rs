//! Snowflake IDs in the Discord bit layout.
//!
//! See <https://discord.com/developers/docs/reference#snowflakes>

use derive_where::derive_where;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const TIMESTAMP_BITS: u32 = 42;
pub const WORKER_ID_BITS: u32 = 5;
pub const PROCESS_ID_BITS: u32 = 5;
pub const INCREMENT_BITS: u32 = 12;

const TIMESTAMP_SHIFT: u32 = WORKER_ID_BITS + PROCESS_ID_BITS + INCREMENT_BITS;
const WORKER_ID_SHIFT: u32 = PROCESS_ID_BITS + INCREMENT_BITS;
const PROCESS_ID_SHIFT: u32 = INCREMENT_BITS;

const MAX_TIMESTAMP: u64 = (1 << TIMESTAMP_BITS) - 1;
const MAX_INCREMENT: u16 = (1 << INCREMENT_BITS) - 1;

/// The instant that timestamp `0` refers to for a snowflake family.
pub trait Epoch {
    const EPOCH_TIME: UtcDateTime;
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum SnowflakeTimeError {
    #[error("Time lies before the snowflake epoch.")]
    BeforeEpoch,
    #[error("Time does not fit into {TIMESTAMP_BITS} timestamp bits.")]
    TooLarge,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Snowflake part out of range: {0}")]
pub struct PartOutOfRangeError(pub u16);

macro_rules! five_bit_part {
    ($name:ident) => {
        #[derive(
            Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize,
            Deserialize,
        )]
        #[serde(try_from = "u8", into = "u8")]
        pub struct $name(u8);

        impl $name {
            #[must_use]
            pub fn new(id: u8) -> Option<Self> {
                (id < 1 << 5).then_some(Self(id))
            }

            #[must_use]
            pub fn get(self) -> u8 {
                self.0
            }
        }

        impl TryFrom<u8> for $name {
            type Error = PartOutOfRangeError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                Self::new(value).ok_or(PartOutOfRangeError(value.into()))
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> Self {
                value.get()
            }
        }
    };
}

five_bit_part!(WorkerId);
five_bit_part!(ProcessId);

#[derive_where(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Debug,
    Default,
    Hash,
    Serialize,
    Deserialize
)]
#[serde(transparent)]
pub struct Snowflake<SnowflakeEpoch>(u64, #[serde(skip)] PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> Snowflake<SnowflakeEpoch> {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner, PhantomData)
    }

    pub fn from_parts(
        time: UtcDateTime,
        worker_id: WorkerId,
        process_id: ProcessId,
        increment: u16,
    ) -> Result<Self, SnowflakeTimeError>
    where
        SnowflakeEpoch: Epoch,
    {
        let millis = millis_since_epoch::<SnowflakeEpoch>(time)?;

        Ok(Self::new(
            millis << TIMESTAMP_SHIFT
                | u64::from(worker_id.get()) << WORKER_ID_SHIFT
                | u64::from(process_id.get()) << PROCESS_ID_SHIFT
                | u64::from(increment & MAX_INCREMENT),
        ))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn timestamp(self) -> UtcDateTime
    where
        SnowflakeEpoch: Epoch,
    {
        let millis = self.0 >> TIMESTAMP_SHIFT;
        #[allow(clippy::cast_possible_wrap)]
        let millis_signed = millis as i64;
        SnowflakeEpoch::EPOCH_TIME + Duration::milliseconds(millis_signed)
    }

    #[must_use]
    pub fn worker_id(self) -> WorkerId {
        #[allow(clippy::cast_possible_truncation)]
        let raw = (self.0 >> WORKER_ID_SHIFT) as u8;
        WorkerId(raw & 0b11111)
    }

    #[must_use]
    pub fn process_id(self) -> ProcessId {
        #[allow(clippy::cast_possible_truncation)]
        let raw = (self.0 >> PROCESS_ID_SHIFT) as u8;
        ProcessId(raw & 0b11111)
    }

    #[must_use]
    pub fn increment(self) -> u16 {
        #[allow(clippy::cast_possible_truncation)]
        let raw = self.0 as u16;
        raw & MAX_INCREMENT
    }
}

fn millis_since_epoch<SnowflakeEpoch: Epoch>(time: UtcDateTime) -> Result<u64, SnowflakeTimeError> {
    let millis = (time - SnowflakeEpoch::EPOCH_TIME).whole_milliseconds();
    if millis < 0 {
        return Err(SnowflakeTimeError::BeforeEpoch);
    }

    let millis = u64::try_from(millis).map_err(|_| SnowflakeTimeError::TooLarge)?;
    if millis > MAX_TIMESTAMP {
        return Err(SnowflakeTimeError::TooLarge);
    }

    Ok(millis)
}

impl<SnowflakeEpoch> Display for Snowflake<SnowflakeEpoch> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<SnowflakeEpoch> From<u64> for Snowflake<SnowflakeEpoch> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<SnowflakeEpoch> From<Snowflake<SnowflakeEpoch>> for u64 {
    fn from(value: Snowflake<SnowflakeEpoch>) -> Self {
        value.get()
    }
}

#[derive_where(Copy, Clone, Eq, PartialEq, Debug)]
pub struct SnowflakeGenerator<SnowflakeEpoch> {
    worker_id: WorkerId,
    process_id: ProcessId,
    next_increment: u16,
    phantom_data: PhantomData<SnowflakeEpoch>,
}

impl<SnowflakeEpoch> SnowflakeGenerator<SnowflakeEpoch> {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            worker_id,
            process_id,
            next_increment: 0,
            phantom_data: PhantomData,
        }
    }

    pub fn generate_at(
        &mut self,
        time: UtcDateTime,
    ) -> Result<Snowflake<SnowflakeEpoch>, SnowflakeTimeError>
    where
        SnowflakeEpoch: Epoch,
    {
        let increment = self.next_increment;
        self.next_increment = (increment + 1) & MAX_INCREMENT;

        Snowflake::from_parts(time, self.worker_id, self.process_id, increment)
    }

    /// Generates a snowflake for the current time.
    ///
    /// Panics if the current time does not fit the epoch, which cannot happen
    /// before the year 2164 for any epoch in the past.
    pub fn generate(&mut self) -> Snowflake<SnowflakeEpoch>
    where
        SnowflakeEpoch: Epoch,
    {
        self.generate_at(UtcDateTime::now())
            .expect("current time outside snowflake range")
    }
}
