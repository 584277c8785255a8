//! Several cart actions against one cart session.
//!
//! The HTTP client keeps the session cookie in memory, so a cart built up
//! here disappears when the process exits.

use clap::Parser;
use jewellery_storefront::controller::CartController;
use jewellery_storefront::service::CartService;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use super::cart::{self, CartAction};

/// One line of session input, e.g. `add 7 --variant 3`.
#[derive(Debug, Parser)]
#[command(no_binary_name = true)]
struct SessionLine {
    #[command(subcommand)]
    action: CartAction,
}

/// Read actions from stdin until EOF or `quit`.
///
/// A failed action is logged and the session continues; malformed lines
/// are skipped.
///
/// # Errors
///
/// Returns an error if stdin cannot be read.
pub async fn run<S: CartService>(controller: &CartController<S>) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut failures = 0_usize;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }

        let parsed = match SessionLine::try_parse_from(line.split_whitespace()) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(line, "Skipping unparseable line: {}", e.kind());
                continue;
            }
        };

        if let Err(e) = cart::execute(controller, parsed.action).await {
            failures += 1;
            warn!(line, error = %e, "Cart action failed");
        }
    }

    info!(failures, "Session finished");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_line_parses_actions() {
        let parsed = SessionLine::try_parse_from("add 7 -v 3 -q 2".split_whitespace()).unwrap();
        assert!(matches!(
            parsed.action,
            CartAction::Add { quantity: 2, variant: Some(_), .. }
        ));

        let parsed = SessionLine::try_parse_from("update 7:3 4".split_whitespace()).unwrap();
        assert!(matches!(parsed.action, CartAction::Update { quantity: 4, .. }));
    }

    #[test]
    fn test_session_line_rejects_bad_ids() {
        assert!(SessionLine::try_parse_from("add ring".split_whitespace()).is_err());
    }
}
