//! Recommendation filter expressions.

use core::fmt;

/// Event type recorded when a customer completes a purchase.
pub const ORDER_COMPLETED_EVENT: &str = "OrderCompleted";

/// A filter expression in the service's filter language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpression {
    /// Excludes items the user already bought, recognizing a purchase by
    /// any of the given event types.
    ExcludePurchased { event_types: Vec<String> },
}

impl FilterExpression {
    /// Builds a purchase exclusion filter over the given event types.
    ///
    /// # Errors
    ///
    /// Returns an error if no event type is given, or if an event type is
    /// empty or contains a double quote.
    pub fn exclude_purchased<I, S>(event_types: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let event_types: Vec<String> = event_types.into_iter().map(Into::into).collect();

        if event_types.is_empty() {
            anyhow::bail!("Filter expression needs at least one event type");
        }

        for event_type in &event_types {
            if event_type.trim().is_empty() {
                anyhow::bail!("Filter event type must not be empty");
            }
            if event_type.contains('"') {
                anyhow::bail!("Filter event type must not contain quotes: {event_type}");
            }
        }

        Ok(Self::ExcludePurchased { event_types })
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExcludePurchased { event_types } => {
                let quoted: Vec<String> = event_types.iter().map(|e| format!("\"{e}\"")).collect();
                write!(
                    f,
                    "EXCLUDE itemId WHERE INTERACTIONS.event_type in ({})",
                    quoted.join(", ")
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclude_purchased_expression() {
        assert_eq!(
            FilterExpression::exclude_purchased([ORDER_COMPLETED_EVENT])
                .unwrap()
                .to_string(),
            r#"EXCLUDE itemId WHERE INTERACTIONS.event_type in ("OrderCompleted")"#
        );
    }

    #[test]
    fn test_multiple_event_types() {
        let filter = FilterExpression::exclude_purchased(["OrderCompleted", "CartViewed"]).unwrap();
        assert_eq!(
            filter.to_string(),
            r#"EXCLUDE itemId WHERE INTERACTIONS.event_type in ("OrderCompleted", "CartViewed")"#
        );
    }

    #[test]
    fn test_invalid_event_types() {
        assert!(FilterExpression::exclude_purchased(Vec::<String>::new()).is_err());
        assert!(FilterExpression::exclude_purchased([" "]).is_err());
        assert!(FilterExpression::exclude_purchased([r#"Order"Completed"#]).is_err());
    }
}
