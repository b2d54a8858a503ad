//! ASG min/desired/max size value module
//!
//! Ported from `AsgSize` in `scheduling/asg/asg_size.py` (original source):
//! a steady-state vector for an auto-scaling group, serialized as the
//! `IS-MinDesiredMax` tag value in the form `"<min>-<desired>-<max>"`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::value_objects::error_code::ErrorCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsgSize {
    pub min_size: i32,
    pub desired_size: i32,
    pub max_size: i32,
}

impl AsgSize {
    pub fn new(min_size: i32, desired_size: i32, max_size: i32) -> Self {
        Self {
            min_size,
            desired_size,
            max_size,
        }
    }

    /// The zeroed-out size a group is reset to at the end of a running period.
    pub fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    pub fn is_zero(&self) -> bool {
        self.min_size == 0 && self.desired_size == 0 && self.max_size == 0
    }

    pub fn to_mdm_str(&self) -> String {
        format!("{}-{}-{}", self.min_size, self.desired_size, self.max_size)
    }

    /// Parses the `IS-MinDesiredMax` tag value. Returns `ErrorCode::AsgZeroMdm`
    /// only for a well-formed `"0-0-0"`; malformed tags are a client-side
    /// configuration problem reported the same way (the source simply lets
    /// the int() conversion raise, which surfaces as a `ClientException`).
    pub fn from_mdm_str(s: &str) -> Result<Self, ErrorCode> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 3 {
            return Err(ErrorCode::ClientException);
        }
        let parsed: Result<Vec<i32>, _> = parts.iter().map(|p| p.parse::<i32>()).collect();
        let parsed = parsed.map_err(|_| ErrorCode::ClientException)?;
        Ok(Self::new(parsed[0], parsed[1], parsed[2]))
    }
}

impl fmt::Display for AsgSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_mdm_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_mdm_string() {
        let size = AsgSize::new(2, 4, 6);
        assert_eq!(size.to_mdm_str(), "2-4-6");
        assert_eq!(AsgSize::from_mdm_str("2-4-6").unwrap(), size);
    }

    #[test]
    fn rejects_malformed_mdm_string() {
        assert!(AsgSize::from_mdm_str("2-4").is_err());
        assert!(AsgSize::from_mdm_str("a-b-c").is_err());
    }

    #[test]
    fn zero_is_zero() {
        assert!(AsgSize::zero().is_zero());
        assert!(!AsgSize::new(1, 0, 0).is_zero());
    }
}
