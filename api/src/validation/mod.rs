//! Input Validation Module
//!
//! Request bodies are checked against declarative rule sets before a handler
//! touches the database.
//!
//! # Overview
//!
//! 1. **Rules** - `ValidationRule`, `RuleSet` and the `validate` engine
//! 2. **Validators** - the predicates behind each rule type
//!
//! # Usage
//!
//! ```ignore
//! use crate::validation::{validate, RuleSet, ValidationRule};
//!
//! let rules = RuleSet::new()
//!     .field("email", ValidationRule::required().email())
//!     .field("password", ValidationRule::required().password())
//!     .field("age", ValidationRule::optional().number().min(18.0).max(100.0))
//!     .field("name", ValidationRule::required().string().min_length(2).max_length(50));
//!
//! let result = validate(ctx.body(), &rules);
//! if !result.is_valid() {
//!     return Err(response::validation_failed(result, error_code::DEFAULT));
//! }
//! ```
//!
//! ## Validation Error Response
//!
//! A failed rule set is answered with 400 and the ordered error list in
//! `error.info`:
//!
//! ```json
//! {
//!   "type": "bad_request",
//!   "error": {
//!     "message": "Validation failed",
//!     "code": 40000,
//!     "info": [
//!       {"field": "email", "message": "Invalid email format", "code": "INVALID_EMAIL"}
//!     ]
//!   }
//! }
//! ```

pub mod rules;
pub mod validators;

pub use rules::{
    validate, CustomValidator, FieldType, RuleSet, ValidationCode, ValidationError,
    ValidationResult, ValidationRule,
};
pub use validators::{coerce_number, parse_number};
