//! UCI binary entry point (§10.2): installs `env_logger` so `RUST_LOG` controls
//! diagnostic verbosity, then runs the protocol loop over stdin/stdout.

use std::io::{self, BufRead};

use chess_engine::UciEngine;

fn main() {
    #[cfg(feature = "env_logger")]
    env_logger::init();

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut engine = UciEngine::new();
    engine.run(stdin.lock(), stdout);
}

#[allow(dead_code)]
fn assert_bufread<T: BufRead>(_: &T) {}
