// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

entity_id!(LoanId);
entity_id!(LoanApplicationId);
entity_id!(UserId);

#[cfg(test)]
mod tests {
    use super::{LoanApplicationId, LoanId};

    #[test]
    fn ids_compare_by_value_and_display_raw() {
        let left = LoanId::new("65a1f0");
        let right = LoanId::from("65a1f0");
        assert_eq!(left, right);
        assert_eq!(left.to_string(), "65a1f0");
    }

    #[test]
    fn blank_ids_are_detected() {
        assert!(LoanApplicationId::new("  ").is_blank());
        assert!(!LoanApplicationId::new("7").is_blank());
    }
}
