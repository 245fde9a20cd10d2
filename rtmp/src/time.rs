//! Timestamps carried by RTMP messages.
//!
//! An RTMP timestamp is an unsigned 32 bit count of milliseconds from an arbitrary epoch.  It
//! wraps back to zero after roughly 49.7 days, which is a normal occurrence on long running
//! streams and must not be treated as an error.  `RtmpTimestamp` performs all arithmetic with
//! wrapping semantics, and compares values so that two timestamps within 2<sup>31</sup> - 1
//! milliseconds of each other are ordered as adjacent times even across a wrap.
//!
//! ```
//! use rcl_rtmp::time::RtmpTimestamp;
//!
//! let before_wrap = RtmpTimestamp::new(u32::max_value() - 10);
//! let after_wrap = before_wrap + 40;
//!
//! assert_eq!(after_wrap, 29);
//! assert!(before_wrap < after_wrap);
//! assert_eq!((after_wrap - before_wrap).value, 40);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::num::Wrapping;
use std::ops::{Add, Sub};

const MAX_ADJACENT_DIFFERENCE: u32 = 2_147_483_647;

/// The representation of a RTMP timestamp
#[derive(Eq, PartialEq, Debug, Copy, Clone, Default, Hash)]
pub struct RtmpTimestamp {
    /// Milliseconds from an unknown epoch
    pub value: u32,
}

impl RtmpTimestamp {
    pub fn new(initial_value: u32) -> Self {
        RtmpTimestamp {
            value: initial_value,
        }
    }

    pub fn set(&mut self, new_value: u32) {
        self.value = new_value;
    }
}

impl fmt::Display for RtmpTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}ms", self.value)
    }
}

impl From<u32> for RtmpTimestamp {
    fn from(value: u32) -> Self {
        RtmpTimestamp::new(value)
    }
}

impl Add for RtmpTimestamp {
    type Output = RtmpTimestamp;

    fn add(self, other: RtmpTimestamp) -> Self {
        self + other.value
    }
}

impl Add<u32> for RtmpTimestamp {
    type Output = RtmpTimestamp;

    fn add(self, other: u32) -> Self {
        RtmpTimestamp::new((Wrapping(self.value) + Wrapping(other)).0)
    }
}

impl Sub for RtmpTimestamp {
    type Output = RtmpTimestamp;

    fn sub(self, other: RtmpTimestamp) -> Self {
        self - other.value
    }
}

impl Sub<u32> for RtmpTimestamp {
    type Output = RtmpTimestamp;

    fn sub(self, other: u32) -> Self {
        RtmpTimestamp::new((Wrapping(self.value) - Wrapping(other)).0)
    }
}

impl Ord for RtmpTimestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self.value, other.value)
    }
}

impl PartialOrd for RtmpTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq<u32> for RtmpTimestamp {
    fn eq(&self, other: &u32) -> bool {
        self.value == *other
    }
}

impl PartialOrd<u32> for RtmpTimestamp {
    fn partial_cmp(&self, other: &u32) -> Option<Ordering> {
        Some(compare(self.value, *other))
    }
}

fn compare(value1: u32, value2: u32) -> Ordering {
    let difference = if value1 > value2 {
        value1 - value2
    } else {
        value2 - value1
    };

    if difference <= MAX_ADJACENT_DIFFERENCE {
        value1.cmp(&value2)
    } else {
        value2.cmp(&value1)
    }
}
