//! UCI protocol front-end (§6.1).
//!
//! Grounded on `pleco_engine/src/engine.rs`'s `PlecoSearcher::uci` main loop (the
//! `uci`/`setoption`/`position`/`go`/`stop`/`quit` command dispatch), rewired to read from
//! and write to generic `BufRead`/`Write` streams instead of locking stdin/stdout directly,
//! so the integration tests can drive the loop over an in-memory pipe (§10.5).
//!
//! `go` itself follows `PlecoSearcher::search`'s non-blocking shape: the search runs on its
//! own thread while this loop keeps reading commands, so a `stop` arriving mid-search is
//! seen immediately instead of queueing up behind a blocking `go`.

pub mod options;

use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use log::{info, warn};

use chess_core::Position;

use crate::eval_cache::EvalCache;
use crate::tb::{NoTablebase, Tablebase};
use crate::threadpool::{self, ThreadPoolConfig};
use crate::time::{Limits, LimitKindStorage, TimeManager, UciClock};
use crate::sync::StopFlag;
use crate::tt::TranspositionTable;

use options::{OptionWork, OptionsMap};

const ENGINE_NAME: &str = "chess-engine";
const ENGINE_AUTHOR: &str = "Contributors";

type SharedOut = Arc<Mutex<dyn Write + Send>>;

/// A `go` in flight: the thread running it and the flag that stops it.
struct ActiveSearch {
    stop: Arc<StopFlag>,
    handle: JoinHandle<()>,
}

pub struct UciEngine {
    pos: Position,
    tt: Arc<TranspositionTable>,
    eval_cache: Arc<EvalCache>,
    tb: Arc<dyn Tablebase>,
    options: OptionsMap,
    threads: usize,
    multi_pv: usize,
    tb_probe_limit: u32,
    active: Option<ActiveSearch>,
}

impl UciEngine {
    pub fn new() -> Self {
        let default_threads = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        UciEngine {
            pos: Position::new_standard(),
            tt: Arc::new(TranspositionTable::new(16)),
            eval_cache: Arc::new(EvalCache::new(8)),
            tb: Arc::new(NoTablebase),
            options: OptionsMap::new(default_threads),
            threads: default_threads,
            multi_pv: 1,
            tb_probe_limit: 6,
            active: None,
        }
    }

    /// The current root position, as set by the last `position` command.
    pub fn position(&self) -> &Position {
        &self.pos
    }

    /// Runs the UCI loop until `quit` or end-of-input, reading commands from `input` and
    /// writing protocol responses to `output` (§6.1). `output` must be `Send + 'static`
    /// because a `go` in flight writes its own `info`/`bestmove` lines from a worker thread.
    pub fn run(&mut self, input: impl BufRead, output: impl Write + Send + 'static) {
        let out: SharedOut = Arc::new(Mutex::new(output));
        for line in input.lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if self.dispatch(line, &out) {
                break;
            }
        }
        self.stop_active_search();
    }

    /// Handles one command line. Returns `true` if the loop should stop (i.e. `quit`).
    fn dispatch(&mut self, line: &str, out: &SharedOut) -> bool {
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else { return false };

        match cmd {
            "uci" => {
                let mut w = out.lock().unwrap();
                writeln!(w, "id name {ENGINE_NAME}").ok();
                writeln!(w, "id author {ENGINE_AUTHOR}").ok();
                for line in self.options.display_all() {
                    writeln!(w, "{line}").ok();
                }
                writeln!(w, "uciok").ok();
            }
            "isready" => {
                writeln!(out.lock().unwrap(), "readyok").ok();
            }
            "ucinewgame" => {
                self.stop_active_search();
                self.tt.clear();
                self.eval_cache.clear();
                self.pos = Position::new_standard();
                info!("ucinewgame: cleared transposition table and eval cache");
            }
            "setoption" => self.handle_setoption(line),
            "position" => {
                self.stop_active_search();
                self.handle_position(&mut parts);
            }
            "go" => self.handle_go(&mut parts, out),
            "stop" => self.stop_active_search(),
            "ponderhit" => {}
            "quit" => return true,
            other => {
                warn!("ignoring unrecognized UCI command: {other:?}");
            }
        }
        false
    }

    /// Signals the in-flight search (if any) to stop and waits for it to report `bestmove`,
    /// matching §7.7/§8.2's "`stop` must produce a `bestmove` promptly" contract.
    fn stop_active_search(&mut self) {
        if let Some(active) = self.active.take() {
            active.stop.set();
            let _ = active.handle.join();
        }
    }

    fn handle_setoption(&mut self, line: &str) {
        let Some(name_start) = line.find("name ") else {
            warn!("malformed setoption command: {line:?}");
            return;
        };
        let rest = &line[name_start + 5..];
        let (name, value) = match rest.find(" value ") {
            Some(idx) => (rest[..idx].trim(), rest[idx + 7..].trim()),
            None => (rest.trim(), ""),
        };
        let Some(work) = self.options.apply(name, value) else { return };
        match work {
            OptionWork::ClearHash => self.tt.clear(),
            OptionWork::ResizeHash(mb) => self.tt = Arc::new(TranspositionTable::new(mb)),
            OptionWork::ResizeEvalCache(mb) => self.eval_cache = Arc::new(EvalCache::new(mb)),
            OptionWork::Threads(n) => self.threads = n,
            OptionWork::MultiPv(n) => self.multi_pv = n,
            OptionWork::Ponder(_) => {}
            OptionWork::SyzygyPath(_) => {}
            OptionWork::SyzygyProbeLimit(n) => self.tb_probe_limit = n,
        }
    }

    fn handle_position(&mut self, parts: &mut std::str::SplitWhitespace) {
        let Some(kind) = parts.next() else { return };
        let mut pos = match kind {
            "startpos" => Position::new_standard(),
            "fen" => {
                let fen_tokens: Vec<&str> = parts.clone().take_while(|&t| t != "moves").collect();
                for _ in 0..fen_tokens.len() {
                    parts.next();
                }
                let fen = fen_tokens.join(" ");
                match Position::from_fen(&fen) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!("rejected fen {fen:?}: {e}");
                        return;
                    }
                }
            }
            other => {
                warn!("unrecognized position subcommand: {other:?}");
                return;
            }
        };

        if parts.clone().next() == Some("moves") {
            parts.next();
            for mv_str in parts.by_ref() {
                match chess_core::moves::parse_long_algebraic(mv_str) {
                    Ok((start, end, promo)) => {
                        let legal = pos.pseudo_legal_moves();
                        let found = legal.as_slice().iter().find(|m| {
                            m.start() == start
                                && m.end() == end
                                && (promo.is_none() || (m.is_promotion() && Some(m.promotion_piece()) == promo))
                        });
                        match found {
                            Some(&m) => pos = pos.do_move(m),
                            None => warn!("move {mv_str:?} is not legal in the current position"),
                        }
                    }
                    Err(e) => warn!("rejected move string {mv_str:?}: {e}"),
                }
            }
        }

        self.pos = pos;
    }

    /// Parses `go`'s arguments and hands the search off to a worker thread so this loop can
    /// keep reading `stop`/`quit` while it runs (§4.9, §8.2 scenario 6).
    fn handle_go(&mut self, parts: &mut std::str::SplitWhitespace, out: &SharedOut) {
        self.stop_active_search();

        let mut clock = UciClock::default();
        let mut move_time = None;
        let mut depth = None;
        let mut infinite = false;
        let mut ponder = false;
        let mut has_clock = false;

        while let Some(tok) = parts.next() {
            match tok {
                "wtime" => {
                    has_clock = true;
                    clock.white_time_msec = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0);
                }
                "btime" => {
                    has_clock = true;
                    clock.black_time_msec = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0);
                }
                "winc" => clock.white_inc_msec = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0),
                "binc" => clock.black_inc_msec = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0),
                "movestogo" => clock.moves_to_go = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0),
                "movetime" => move_time = parts.next().and_then(|v| v.parse().ok()),
                "depth" => depth = parts.next().and_then(|v| v.parse().ok()),
                "infinite" => infinite = true,
                "ponder" => ponder = true,
                _ => {}
            }
        }

        let limits_type = if infinite {
            Some(LimitKindStorage::Infinite)
        } else if let Some(ms) = move_time {
            Some(LimitKindStorage::MoveTime(ms))
        } else if let Some(d) = depth {
            Some(LimitKindStorage::Depth(d))
        } else if has_clock {
            Some(LimitKindStorage::Time(clock))
        } else {
            Some(LimitKindStorage::Infinite)
        };

        let limits = Limits { limits_type, ponder, ..Default::default() };
        let time = TimeManager::init(std::time::Instant::now(), &limits, self.pos.side_to_move(), self.pos.fullmove_number());
        let stop = Arc::new(StopFlag::new());

        let pos = self.pos.clone();
        let tt = Arc::clone(&self.tt);
        let eval_cache = Arc::clone(&self.eval_cache);
        let tb = Arc::clone(&self.tb);
        let config = ThreadPoolConfig { threads: self.threads, multi_pv: self.multi_pv };
        let out = Arc::clone(out);
        let thread_stop = Arc::clone(&stop);

        let handle = std::thread::spawn(move || {
            let outcome = threadpool::search(&pos, &tt, &eval_cache, &*tb, &*thread_stop, &time, &config, &[], |info| {
                let score_part = if info.mate_score {
                    let moves_to_mate = (crate::search::MATE - info.score.abs() + 1) / 2;
                    format!("mate {}", moves_to_mate * info.score.signum())
                } else {
                    format!("cp {}", info.score)
                };
                let mut w = out.lock().unwrap();
                writeln!(
                    w,
                    "info depth {} seldepth {} multipv {} score {} nodes {} time {} hashfull {} pv {}",
                    info.depth, info.seldepth, info.multi_pv_index, score_part, info.nodes, info.time_msec, info.hashfull, info.pv
                )
                .ok();
            });

            let mut w = out.lock().unwrap();
            if outcome.best_move.is_null() {
                writeln!(w, "bestmove 0000").ok();
            } else if let Some(ponder_mv) = outcome.ponder_move {
                writeln!(w, "bestmove {} ponder {}", outcome.best_move, ponder_mv).ok();
            } else {
                writeln!(w, "bestmove {}", outcome.best_move).ok();
            }
        });

        self.active = Some(ActiveSearch { stop, handle });
    }
}

impl Default for UciEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn uci_handshake_replies_with_id_and_uciok() {
        let mut engine = UciEngine::new();
        run_and_capture(&mut engine, b"uci\nquit\n", |text| {
            assert!(text.contains("id name chess-engine"));
            assert!(text.contains("uciok"));
        });
    }

    #[test]
    fn isready_replies_readyok() {
        let mut engine = UciEngine::new();
        run_and_capture(&mut engine, b"isready\nquit\n", |text| {
            assert!(text.contains("readyok"));
        });
    }

    #[test]
    fn position_startpos_with_moves_updates_root() {
        let mut engine = UciEngine::new();
        run_and_capture(&mut engine, b"position startpos moves e2e4 e7e5\nquit\n", |_| {});
        assert_ne!(engine.pos.zobrist(), Position::new_standard().zobrist());
    }

    #[test]
    fn go_depth_reports_bestmove() {
        let mut engine = UciEngine::new();
        run_and_capture(&mut engine, b"position startpos\ngo depth 2\nquit\n", |text| {
            assert!(text.contains("bestmove"));
        });
    }

    #[test]
    fn unknown_command_is_ignored_not_fatal() {
        let mut engine = UciEngine::new();
        run_and_capture(&mut engine, b"frobnicate\nisready\nquit\n", |text| {
            assert!(text.contains("readyok"));
        });
    }

    /// Runs `bytes` through the engine and hands the captured output to `check` once the
    /// loop returns. Output is collected through a shared buffer since `run` now requires a
    /// `Send + 'static` writer for the background search thread.
    fn run_and_capture(engine: &mut UciEngine, bytes: &[u8], check: impl FnOnce(&str)) {
        let buf: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = SinkWriter(Arc::clone(&buf));
        let input = Cursor::new(bytes.to_vec());
        engine.run(input, sink);
        let text = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        check(&text);
    }

    struct SinkWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for SinkWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
