// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Classification and decoding of fulfillment outcomes.

use alloy::primitives::{Bytes, U256};
use chrono::{DateTime, Utc};

use crate::error::{CallbackFailure, WorkflowError, WorkflowResult};
use crate::types::{FulfillmentRecord, RequestId};

/// Decoded success outcome of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillmentReport {
    pub request_id: RequestId,
    pub response: Bytes,
    /// Set when the off-chain source threw; the response is then usually empty.
    pub error: Option<String>,
}

impl FulfillmentReport {
    /// Response as a big-endian unsigned integer, when it fits in 256 bits.
    pub fn response_as_uint(&self) -> Option<U256> {
        if self.response.is_empty() {
            return None;
        }
        U256::try_from_be_slice(&self.response)
    }

    pub fn response_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.response).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.response.is_empty()
    }

    /// Decode the tracking source's `<location>-<timestamp>` response.
    pub fn tracking_update(&self) -> Option<TrackingUpdate> {
        self.response_text().and_then(TrackingUpdate::parse)
    }
}

/// Last reported shipment position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingUpdate {
    pub location: String,
    /// Unix seconds.
    pub timestamp: i64,
}

impl TrackingUpdate {
    /// Parse `"<location>-<unix seconds>"`, splitting at the last `-` so
    /// hyphenated locations survive.
    pub fn parse(text: &str) -> Option<Self> {
        let (location, timestamp) = text.rsplit_once('-')?;
        let timestamp = timestamp.trim().parse().ok()?;
        if location.is_empty() {
            return None;
        }
        Some(Self {
            location: location.to_string(),
            timestamp,
        })
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// Map a fulfillment record to a report, or to a callback-execution failure.
pub fn classify(request_id: RequestId, record: FulfillmentRecord) -> WorkflowResult<FulfillmentReport> {
    match record {
        FulfillmentRecord::Success { response, error } => {
            let error = (!error.is_empty()).then(|| String::from_utf8_lossy(&error).into_owned());
            Ok(FulfillmentReport {
                request_id,
                response,
                error,
            })
        }
        FulfillmentRecord::UserCallbackError { message } => Err(WorkflowError::CallbackExecution {
            kind: CallbackFailure::UserCallback,
            message,
        }),
        FulfillmentRecord::UserCallbackRawError { raw } => Err(WorkflowError::CallbackExecution {
            kind: CallbackFailure::UserCallbackRaw,
            message: String::from_utf8_lossy(&raw).into_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::request_id;

    fn success(response: &'static [u8], error: &'static [u8]) -> FulfillmentRecord {
        FulfillmentRecord::Success {
            response: Bytes::from_static(response),
            error: Bytes::from_static(error),
        }
    }

    #[test]
    fn success_decodes_as_uint() {
        let report = classify(request_id(7), success(&[0xde, 0xad], &[])).unwrap();
        assert_eq!(report.error, None);
        assert_eq!(report.response_as_uint(), Some(U256::from(0xdeadu64)));
    }

    #[test]
    fn source_error_is_kept_apart_from_empty_response() {
        let report = classify(request_id(1), success(&[], b"Request failed")).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.error.as_deref(), Some("Request failed"));
        assert_eq!(report.response_as_uint(), None);
    }

    #[test]
    fn callback_errors_become_callback_execution_failures() {
        let err = classify(
            request_id(1),
            FulfillmentRecord::UserCallbackError {
                message: "out of gas".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::CallbackExecution { kind: CallbackFailure::UserCallback, ref message }
                if message == "out of gas"
        ));

        let err = classify(
            request_id(1),
            FulfillmentRecord::UserCallbackRawError {
                raw: Bytes::from_static(b"\xffboom"),
            },
        )
        .unwrap_err();
        assert!(err.is_callback_failure());
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn tracking_update_splits_at_last_hyphen() {
        let update = TrackingUpdate::parse("Kuala-Lumpur-1700000000").unwrap();
        assert_eq!(update.location, "Kuala-Lumpur");
        assert_eq!(update.timestamp, 1_700_000_000);
        assert_eq!(
            update.observed_at().unwrap().to_rfc3339(),
            "2023-11-14T22:13:20+00:00"
        );
    }

    #[test]
    fn tracking_update_rejects_malformed_text() {
        assert!(TrackingUpdate::parse("no timestamp").is_none());
        assert!(TrackingUpdate::parse("Leipzig-soon").is_none());
        assert!(TrackingUpdate::parse("-1700000000").is_none());
    }

    #[test]
    fn report_exposes_tracking_update() {
        let report = classify(request_id(3), success(b"Leipzig-1700000000", &[])).unwrap();
        assert_eq!(report.response_text(), Some("Leipzig-1700000000"));
        assert_eq!(report.tracking_update().unwrap().location, "Leipzig");
    }
}
