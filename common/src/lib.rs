//! Primitives shared between the scheduling engine and its host daemon:
//! resource vectors, stable identifiers, and creation timestamps.

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stable identifier for a cluster object (pod group, pod, node, queue).
/// Newtype over `String` rather than `uuid::Uuid` because most identifiers
/// the scheduler ingests are Kubernetes-style names/UIDs handed to us as
/// strings by the (out-of-scope) admission and pod-group-construction layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Uid(pub String);

impl Uid {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Uid {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Uid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Creation timestamp, used as the final ordering tiebreaker (spec §4.1).
pub type Timestamp = DateTime<Utc>;

/// A three-axis resource vector: CPU in millicores, memory in bytes, GPU as
/// an integer count. Fractional GPU sharing is tracked separately on the
/// node (spec §3, Node's GPU-sharing sub-state) since it isn't a simple
/// scalar quantity per GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceVector {
    pub cpu_millis: i64,
    pub memory_bytes: i64,
    pub gpu: i64,
}

impl ResourceVector {
    pub fn new(cpu_millis: i64, memory_bytes: i64, gpu: i64) -> Self {
        Self {
            cpu_millis,
            memory_bytes,
            gpu,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// True iff every axis of `self` is `<=` the corresponding axis of `other`.
    pub fn fits_within(&self, other: &ResourceVector) -> bool {
        self.cpu_millis <= other.cpu_millis
            && self.memory_bytes <= other.memory_bytes
            && self.gpu <= other.gpu
    }

    pub fn is_zero(&self) -> bool {
        self.cpu_millis == 0 && self.memory_bytes == 0 && self.gpu == 0
    }

    /// Dominant share of `self` against `capacity`, the core quantity DRF
    /// compares between jobs/queues (spec §4.1, glossary "DRF").
    pub fn dominant_share(&self, capacity: &ResourceVector) -> f64 {
        let cpu = ratio(self.cpu_millis, capacity.cpu_millis);
        let mem = ratio(self.memory_bytes, capacity.memory_bytes);
        let gpu = ratio(self.gpu, capacity.gpu);
        cpu.max(mem).max(gpu)
    }
}

fn ratio(value: i64, capacity: i64) -> f64 {
    if capacity <= 0 {
        0.0
    } else {
        value as f64 / capacity as f64
    }
}

impl Add for ResourceVector {
    type Output = ResourceVector;
    fn add(self, rhs: Self) -> Self::Output {
        ResourceVector {
            cpu_millis: self.cpu_millis + rhs.cpu_millis,
            memory_bytes: self.memory_bytes + rhs.memory_bytes,
            gpu: self.gpu + rhs.gpu,
        }
    }
}

impl AddAssign for ResourceVector {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for ResourceVector {
    type Output = ResourceVector;
    fn sub(self, rhs: Self) -> Self::Output {
        ResourceVector {
            cpu_millis: self.cpu_millis - rhs.cpu_millis,
            memory_bytes: self.memory_bytes - rhs.memory_bytes,
            gpu: self.gpu - rhs.gpu,
        }
    }
}

impl SubAssign for ResourceVector {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}
