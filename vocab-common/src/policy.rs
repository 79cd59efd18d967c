//! Correction policy
//!
//! Maps a confidence value to a disposition through a threshold table:
//!
//! | confidence          | disposition              |
//! |---------------------|--------------------------|
//! | `>= accept`         | AutoAccept               |
//! | `[audit, accept)`   | AutoAccept, audit-flagged |
//! | `[escalate, audit)` | Escalate                 |
//! | `< escalate`        | AutoReject               |

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default auto-accept threshold
pub const DEFAULT_ACCEPT_THRESHOLD: f64 = 0.8;

/// Default audit-flagged accept threshold
pub const DEFAULT_AUDIT_THRESHOLD: f64 = 0.6;

/// Default escalation threshold (below this, reject)
pub const DEFAULT_ESCALATE_THRESHOLD: f64 = 0.3;

/// Policy outcome for one suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "disposition")]
pub enum CorrectionDisposition {
    /// Write the correction; `audit` marks low-margin accepts
    AutoAccept { audit: bool },
    /// Defer to the decision escalator
    Escalate,
    /// Discard the suggestion
    AutoReject,
}

impl CorrectionDisposition {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrectionDisposition::AutoAccept { audit: false } => "auto_accept",
            CorrectionDisposition::AutoAccept { audit: true } => "auto_accept_audit",
            CorrectionDisposition::Escalate => "escalate",
            CorrectionDisposition::AutoReject => "auto_reject",
        }
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, CorrectionDisposition::AutoAccept { .. })
    }
}

/// Threshold table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyThresholds {
    pub accept_threshold: f64,
    pub audit_threshold: f64,
    pub escalate_threshold: f64,
}

impl Default for PolicyThresholds {
    fn default() -> Self {
        Self {
            accept_threshold: DEFAULT_ACCEPT_THRESHOLD,
            audit_threshold: DEFAULT_AUDIT_THRESHOLD,
            escalate_threshold: DEFAULT_ESCALATE_THRESHOLD,
        }
    }
}

impl PolicyThresholds {
    /// Check every threshold is in [0, 1] and `escalate <= audit <= accept`
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("accept_threshold", self.accept_threshold),
            ("audit_threshold", self.audit_threshold),
            ("escalate_threshold", self.escalate_threshold),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(Error::Policy(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.escalate_threshold > self.audit_threshold
            || self.audit_threshold > self.accept_threshold
        {
            return Err(Error::Policy(format!(
                "thresholds must satisfy escalate <= audit <= accept (got {} / {} / {})",
                self.escalate_threshold, self.audit_threshold, self.accept_threshold
            )));
        }

        Ok(())
    }
}

/// Confidence classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrectionPolicy {
    thresholds: PolicyThresholds,
}

impl CorrectionPolicy {
    /// Create a policy from a validated threshold table
    pub fn new(thresholds: PolicyThresholds) -> Result<Self> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &PolicyThresholds {
        &self.thresholds
    }

    /// Classify a confidence value
    ///
    /// Values outside [0, 1] (including NaN) are a caller bug and fail with
    /// [`Error::Policy`].
    pub fn classify(&self, confidence: f64) -> Result<CorrectionDisposition> {
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(Error::Policy(format!(
                "confidence must be within [0, 1], got {}",
                confidence
            )));
        }

        let t = &self.thresholds;
        let disposition = if confidence >= t.accept_threshold {
            CorrectionDisposition::AutoAccept { audit: false }
        } else if confidence >= t.audit_threshold {
            CorrectionDisposition::AutoAccept { audit: true }
        } else if confidence >= t.escalate_threshold {
            CorrectionDisposition::Escalate
        } else {
            CorrectionDisposition::AutoReject
        };

        Ok(disposition)
    }
}
