//! Error handling foundation for insight-relay.
//!
//! Only the `Result` alias lives here. Each crate defines its own error
//! enums and wraps them in rootcause reports as they cross crate
//! boundaries.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_type_works() {
        let ok: Result<&str> = Ok("relay");
        assert_eq!(ok.expect("should be ok"), "relay");
    }
}
