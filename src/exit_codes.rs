//! Exit code constants for the axon CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, bad config, unknown pattern)
//! - 2: Step failure (template, command, missing user message)
//! - 3: Model failure (provider, credential, stream, refusal)
//! - 130: Cancelled by the user (Ctrl-C)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid configuration, or unknown pattern/prompt.
pub const USER_ERROR: i32 = 1;

/// A pattern step failed: template error, command failure, or no user message.
pub const STEP_FAILURE: i32 = 2;

/// The model call failed: provider lookup, credentials, transport, or refusal.
pub const MODEL_FAILURE: i32 = 3;

/// The run was interrupted.
pub const CANCELLED: i32 = 130;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, STEP_FAILURE, MODEL_FAILURE, CANCELLED];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn exit_codes_fit_in_a_byte() {
        for code in [SUCCESS, USER_ERROR, STEP_FAILURE, MODEL_FAILURE, CANCELLED] {
            assert!((0..=255).contains(&code));
        }
    }
}
