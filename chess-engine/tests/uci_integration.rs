//! Drives `UciEngine` end-to-end over an in-memory pipe for the concrete search/protocol
//! scenarios this workspace commits to.

use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chess_engine::UciEngine;

/// Owned, cloneable writer satisfying `UciEngine::run`'s `Write + Send + 'static` bound
/// while still letting the test read back what was written after `run` returns.
#[derive(Clone)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn new() -> Self {
        SharedBuf(Arc::new(Mutex::new(Vec::new())))
    }

    fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn run(commands: &str) -> String {
    let mut engine = UciEngine::new();
    let input = Cursor::new(commands.as_bytes().to_vec());
    let output = SharedBuf::new();
    engine.run(input, output.clone());
    String::from_utf8(output.take()).unwrap()
}

fn last_bestmove(output: &str) -> &str {
    output
        .lines()
        .rev()
        .find_map(|l| l.strip_prefix("bestmove "))
        .expect("no bestmove line")
        .split_whitespace()
        .next()
        .unwrap()
}

fn last_score_cp(output: &str) -> Option<i32> {
    output.lines().rev().find_map(|l| {
        let idx = l.find(" score cp ")?;
        l[idx + 10..].split_whitespace().next()?.parse().ok()
    })
}

#[test]
fn kp_vs_k_deep_search_finds_a_winning_line() {
    let out = run("position fen 4k3/8/8/8/8/8/4P3/4K3 w - - 0 1\ngo depth 10\nquit\n");
    let mv = last_bestmove(&out);
    assert_ne!(mv, "0000", "a legal king+pawn endgame must return a move");
}

#[test]
fn king_pawn_push_prefers_advancing_over_shuffling() {
    let out = run("position fen 7k/8/6K1/6P1/8/8/8/8 w - - 0 1\ngo depth 8\nquit\n");
    let mv = last_bestmove(&out);
    assert_eq!(mv, "g5g6", "pushing the passer should beat any king shuffle here");
}

#[test]
fn kp_vs_k_oracle_does_not_crash_and_reports_a_finite_score() {
    let out = run("position fen 3k4/3P4/3K4/8/8/8/8/8 w - - 0 1\ngo depth 6\nquit\n");
    let mv = last_bestmove(&out);
    assert_ne!(mv, "0000");
    if let Some(cp) = last_score_cp(&out) {
        assert!(cp.abs() < 32_000, "score must be finite, not a sentinel");
    }
}

#[test]
fn castling_rights_clear_and_both_castles_are_legal_from_the_root() {
    let mut engine = UciEngine::new();
    let input = Cursor::new(b"position fen r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1\nquit\n".to_vec());
    let output = SharedBuf::new();
    engine.run(input, output.clone());

    let before = engine.position().clone();
    let e1 = chess_core::Square::from_file_rank(4, 0);
    let g1 = chess_core::Square::from_file_rank(6, 0);
    let c1 = chess_core::Square::from_file_rank(2, 0);

    let legal = before.pseudo_legal_moves();
    let has_kingside = legal.as_slice().iter().any(|m| m.start() == e1 && m.end() == g1 && m.is_castle());
    let has_queenside = legal.as_slice().iter().any(|m| m.start() == e1 && m.end() == c1 && m.is_castle());
    assert!(has_kingside, "O-O must be legal from this position");
    assert!(has_queenside, "O-O-O must be legal from this position");

    let kingside = legal.as_slice().iter().copied().find(|m| m.start() == e1 && m.end() == g1).unwrap();
    let after = before.do_move(kingside);
    assert!(!after.castling_rights().contains(chess_core::CastleRights::WHITE_K));
    assert_ne!(after.zobrist(), before.zobrist());
}

#[test]
fn italian_game_opening_evaluates_near_equal_within_half_a_second() {
    let start = Instant::now();
    let out = run("position fen r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3\ngo movetime 500\nquit\n");
    let elapsed = start.elapsed();
    let mv = last_bestmove(&out);
    assert_ne!(mv, "0000");
    if let Some(cp) = last_score_cp(&out) {
        assert!(cp.abs() <= 50, "opening position should be close to equal, got {cp}");
    }
    assert!(elapsed < Duration::from_secs(3), "movetime search must not stall well past its budget");
}

#[test]
fn stop_during_infinite_search_returns_a_bestmove_promptly() {
    use std::io::BufReader;
    use std::os::unix::net::UnixStream;
    use std::sync::mpsc;

    let (reader_end, mut writer_end) = UnixStream::pair().unwrap();
    let (tx, rx) = mpsc::channel::<Vec<u8>>();

    std::thread::spawn(move || {
        let mut engine = UciEngine::new();
        let out = SharedBuf::new();
        engine.run(BufReader::new(reader_end), out.clone());
        tx.send(out.take()).unwrap();
    });

    writer_end.write_all(b"position startpos\ngo infinite\n").unwrap();
    std::thread::sleep(Duration::from_millis(100));
    writer_end.write_all(b"stop\nquit\n").unwrap();

    let out = rx.recv_timeout(Duration::from_millis(250)).expect("engine did not respond within 150ms of stop");
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("bestmove"));
}
