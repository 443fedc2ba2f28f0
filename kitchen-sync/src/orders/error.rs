use super::cart::storage::CartStorageError;
use shared::error::{AppError, ErrorCode};
use shared::order::OrderStatus;
use thiserror::Error;

/// Validation failures - returned synchronously, block the attempted mutation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Cart is empty")]
    CartEmpty,

    #[error("Item {item_id} requires a selection for: {}", groups.join(", "))]
    SelectionRequired { item_id: String, groups: Vec<String> },

    #[error("An authenticated operator is required")]
    NotAuthenticated,

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i32),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Completing an order requires a payment record")]
    PaymentRequired,

    #[error("Amount received {received} does not cover total {total}")]
    PaymentInsufficient { received: f64, total: f64 },

    #[error("{0}")]
    Other(String),
}

/// Order engine errors
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Already placing an order for table {table_id}")]
    ConcurrencyConflict { tenant_id: String, table_id: String },

    #[error("No menu item matches \"{query}\"")]
    NotFound {
        query: String,
        suggestions: Vec<String>,
    },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Nothing to submit")]
    NothingToSubmit,

    #[error("Forced mutation could not be verified: {0}")]
    MutationUnverified(String),

    #[error("Status write for order {order_id} failed: {reason}")]
    StaleWriteFailed { order_id: String, reason: String },

    #[error("Coupon rejected: {0}")]
    CouponRejected(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Storage error: {0}")]
    Storage(#[from] CartStorageError),
}

pub type OrderResult<T> = Result<T, OrderError>;

impl OrderError {
    /// Shorthand for free-form validation failures
    pub fn validation(msg: impl Into<String>) -> Self {
        OrderError::Validation(ValidationError::Other(msg.into()))
    }

    pub fn transport(msg: impl std::fmt::Display) -> Self {
        OrderError::Transport(msg.to_string())
    }

    /// Error code surfaced to UI / voice callers
    pub fn code(&self) -> ErrorCode {
        match self {
            OrderError::Validation(v) => match v {
                ValidationError::CartEmpty => ErrorCode::CartEmpty,
                ValidationError::SelectionRequired { .. } => ErrorCode::SelectionRequired,
                ValidationError::NotAuthenticated => ErrorCode::NotAuthenticated,
                ValidationError::PaymentRequired => ErrorCode::PaymentRequired,
                ValidationError::PaymentInsufficient { .. } => ErrorCode::PaymentInsufficient,
                ValidationError::InvalidQuantity(_)
                | ValidationError::InvalidAmount(_)
                | ValidationError::Other(_) => ErrorCode::ValidationFailed,
            },
            OrderError::InvalidTransition { from, .. } if from.is_terminal() => {
                ErrorCode::OrderAlreadyTerminal
            }
            OrderError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            OrderError::ConcurrencyConflict { .. } => ErrorCode::SubmissionInFlight,
            OrderError::NotFound { .. } => ErrorCode::ItemNotResolved,
            OrderError::OrderNotFound(_) => ErrorCode::OrderNotFound,
            OrderError::NothingToSubmit => ErrorCode::NothingToSubmit,
            OrderError::MutationUnverified(_) => ErrorCode::MutationUnverified,
            OrderError::StaleWriteFailed { .. } => ErrorCode::StaleWriteFailed,
            OrderError::CouponRejected(_) => ErrorCode::CouponRejected,
            OrderError::Transport(_) => ErrorCode::TransportError,
            OrderError::Storage(_) => ErrorCode::StorageError,
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let code = err.code();
        match err {
            OrderError::Storage(e) => {
                // 保留技术细节用于日志/调试
                tracing::error!(error = %e, error_code = %code, "Cart storage error occurred");
                AppError::with_message(code, e.to_string())
            }
            OrderError::NotFound { query, suggestions } => AppError::with_message(
                code,
                format!("No menu item matches \"{}\"", query),
            )
            .with_detail("query", query)
            .with_detail("suggestions", suggestions),
            OrderError::InvalidTransition { from, to } => {
                AppError::with_message(code, format!("Cannot move order from {} to {}", from, to))
                    .with_detail("from", from.as_str())
                    .with_detail("to", to.as_str())
            }
            OrderError::ConcurrencyConflict { tenant_id, table_id } => AppError::new(code)
                .with_detail("tenant_id", tenant_id)
                .with_detail("table_id", table_id),
            other => AppError::with_message(code, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_codes() {
        let err: OrderError = ValidationError::CartEmpty.into();
        assert_eq!(err.code(), ErrorCode::CartEmpty);

        let err = OrderError::validation("bad note");
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
    }

    #[test]
    fn test_invalid_transition_from_terminal() {
        let err = OrderError::InvalidTransition {
            from: OrderStatus::Completed,
            to: OrderStatus::Preparing,
        };
        assert_eq!(err.code(), ErrorCode::OrderAlreadyTerminal);

        let err = OrderError::InvalidTransition {
            from: OrderStatus::Placed,
            to: OrderStatus::Preparing,
        };
        assert_eq!(err.code(), ErrorCode::InvalidTransition);
        assert_eq!(err.to_string(), "Invalid transition: placed -> preparing");
    }

    #[test]
    fn test_not_found_carries_suggestions() {
        let app: AppError = OrderError::NotFound {
            query: "wingz".into(),
            suggestions: vec!["Chicken Wings".into()],
        }
        .into();
        assert_eq!(app.code, ErrorCode::ItemNotResolved);
        let details = app.details.unwrap();
        assert_eq!(details["suggestions"][0], "Chicken Wings");
    }

    #[test]
    fn test_concurrency_conflict_message() {
        let app: AppError = OrderError::ConcurrencyConflict {
            tenant_id: "t-1".into(),
            table_id: "T4".into(),
        }
        .into();
        assert_eq!(app.code, ErrorCode::SubmissionInFlight);
        assert_eq!(app.message, "Already placing an order for this table");
    }

    #[test]
    fn test_every_domain_code_is_produced() {
        let errors = vec![
            OrderError::Validation(ValidationError::CartEmpty),
            OrderError::Validation(ValidationError::SelectionRequired {
                item_id: "m2".into(),
                groups: vec![],
            }),
            OrderError::Validation(ValidationError::PaymentRequired),
            OrderError::Validation(ValidationError::PaymentInsufficient {
                received: 1.0,
                total: 2.0,
            }),
            OrderError::InvalidTransition {
                from: OrderStatus::Placed,
                to: OrderStatus::Ready,
            },
            OrderError::InvalidTransition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::Completed,
            },
            OrderError::ConcurrencyConflict {
                tenant_id: "t-1".into(),
                table_id: "T4".into(),
            },
            OrderError::NotFound {
                query: "x".into(),
                suggestions: vec![],
            },
            OrderError::OrderNotFound("o-1".into()),
            OrderError::NothingToSubmit,
            OrderError::MutationUnverified("add".into()),
            OrderError::StaleWriteFailed {
                order_id: "o-1".into(),
                reason: "offline".into(),
            },
            OrderError::CouponRejected("X".into()),
        ];
        let produced: std::collections::HashSet<ErrorCode> =
            errors.iter().map(|e| e.code()).collect();

        // order, payment and product ranges
        for value in 4000..7000u16 {
            if let Ok(code) = ErrorCode::try_from(value) {
                assert!(produced.contains(&code), "{:?} has no OrderError", code);
            }
        }
    }

    #[test]
    fn test_selection_required_message() {
        let err = ValidationError::SelectionRequired {
            item_id: "m2".into(),
            groups: vec!["Size".into(), "Spice".into()],
        };
        assert_eq!(err.to_string(), "Item m2 requires a selection for: Size, Spice");
    }
}
