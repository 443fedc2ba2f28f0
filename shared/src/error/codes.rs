//! Unified error codes
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Product errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Caller is not an authenticated operator
    NotAuthenticated = 10,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order already reached a terminal status
    OrderAlreadyTerminal = 4002,
    /// Status transition is not a legal edge
    InvalidTransition = 4003,
    /// Submission lock for the table is held
    SubmissionInFlight = 4004,
    /// Cart has no lines
    CartEmpty = 4102,
    /// Required variant selection missing
    SelectionRequired = 4103,
    /// Automation found nothing to submit
    NothingToSubmit = 4105,
    /// Automation could not verify a forced mutation
    MutationUnverified = 4106,
    /// Best-effort status write paired with a suppression failed
    StaleWriteFailed = 4201,

    // ==================== 5xxx: Payment ====================
    /// Payment record required to complete
    PaymentRequired = 5001,
    /// Amount received does not cover the total
    PaymentInsufficient = 5002,
    /// Coupon rejected by the payment collaborator
    CouponRejected = 5003,

    // ==================== 6xxx: Product ====================
    /// Free-text query did not resolve to a menu item
    ItemNotResolved = 6001,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Transport (stream or persistence call) failed
    TransportError = 9002,
    /// Local storage error
    StorageError = 9003,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::NotAuthenticated => "Operator is not authenticated",

            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderAlreadyTerminal => "Order is already completed or cancelled",
            ErrorCode::InvalidTransition => "Status transition is not allowed",
            ErrorCode::SubmissionInFlight => "Already placing an order for this table",
            ErrorCode::CartEmpty => "Cart is empty",
            ErrorCode::SelectionRequired => "A required selection is missing",
            ErrorCode::NothingToSubmit => "Nothing to submit",
            ErrorCode::MutationUnverified => "Change could not be verified, please complete manually",
            ErrorCode::StaleWriteFailed => "Status update could not be saved",

            ErrorCode::PaymentRequired => "Payment is required to complete the order",
            ErrorCode::PaymentInsufficient => "Amount received does not cover the total",
            ErrorCode::CouponRejected => "Coupon was rejected",

            ErrorCode::ItemNotResolved => "Menu item not found",

            ErrorCode::InternalError => "Internal error",
            ErrorCode::TransportError => "Connection to the order service failed",
            ErrorCode::StorageError => "Local storage error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            10 => Ok(ErrorCode::NotAuthenticated),

            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderAlreadyTerminal),
            4003 => Ok(ErrorCode::InvalidTransition),
            4004 => Ok(ErrorCode::SubmissionInFlight),
            4102 => Ok(ErrorCode::CartEmpty),
            4103 => Ok(ErrorCode::SelectionRequired),
            4105 => Ok(ErrorCode::NothingToSubmit),
            4106 => Ok(ErrorCode::MutationUnverified),
            4201 => Ok(ErrorCode::StaleWriteFailed),

            5001 => Ok(ErrorCode::PaymentRequired),
            5002 => Ok(ErrorCode::PaymentInsufficient),
            5003 => Ok(ErrorCode::CouponRejected),

            6001 => Ok(ErrorCode::ItemNotResolved),

            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::TransportError),
            9003 => Ok(ErrorCode::StorageError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
