//! The UCI option table: the engine's entire configuration surface (§10.3).
//!
//! Grounded on `pleco_engine/src/uci/options.rs`'s `UCIOption` trait and its
//! `UCIButton`/`UCICheck`/`UCISpin` implementations, extended with `UCICombo`-free variants
//! for `MultiPV`/`EvalCache`/`Ponder`/`SyzygyPath`/`SyzygyProbeLimit` — options the upstream
//! file never wired up (it only registers `Clear Hash`, `Hash`, and `Threads`). Out-of-range
//! spin values are clamped with a `warn!` rather than rejected outright (§10.3: "keeps the
//! GUI's handshake alive").

use log::warn;

/// Work items an applied option can hand back to the engine driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionWork {
    ClearHash,
    ResizeHash(usize),
    ResizeEvalCache(usize),
    Threads(usize),
    MultiPv(usize),
    Ponder(bool),
    SyzygyPath(String),
    SyzygyProbeLimit(u32),
}

struct SpinSpec {
    name: &'static str,
    default: i64,
    min: i64,
    max: i64,
    make: fn(i64) -> OptionWork,
}

struct CheckSpec {
    name: &'static str,
    default: bool,
    make: fn(bool) -> OptionWork,
}

struct TextSpec {
    name: &'static str,
    default: &'static str,
    make: fn(String) -> OptionWork,
}

enum Spec {
    Button(&'static str, OptionWork),
    Spin(SpinSpec),
    Check(CheckSpec),
    Text(TextSpec),
}

/// The declared option table, in registration order (`uci`'s `option name ...` lines print
/// in this order).
pub struct OptionsMap {
    specs: Vec<Spec>,
}

impl OptionsMap {
    pub fn new(default_threads: usize) -> Self {
        let specs = vec![
            Spec::Spin(SpinSpec { name: "Hash", default: 16, min: 1, max: 33_554_432, make: |v| OptionWork::ResizeHash(v as usize) }),
            Spec::Spin(SpinSpec { name: "EvalCache", default: 8, min: 1, max: 1_048_576, make: |v| OptionWork::ResizeEvalCache(v as usize) }),
            Spec::Spin(SpinSpec { name: "Threads", default: default_threads as i64, min: 1, max: 512, make: |v| OptionWork::Threads(v as usize) }),
            Spec::Spin(SpinSpec { name: "MultiPV", default: 1, min: 1, max: 500, make: |v| OptionWork::MultiPv(v as usize) }),
            Spec::Check(CheckSpec { name: "Ponder", default: false, make: OptionWork::Ponder }),
            Spec::Text(TextSpec { name: "SyzygyPath", default: "", make: OptionWork::SyzygyPath }),
            Spec::Spin(SpinSpec { name: "SyzygyProbeLimit", default: 6, min: 0, max: 32, make: |v| OptionWork::SyzygyProbeLimit(v as u32) }),
            Spec::Button("Clear Hash", OptionWork::ClearHash),
        ];
        OptionsMap { specs }
    }

    /// Renders every `option name ...` line for the `uci` handshake (§6.1).
    pub fn display_all(&self) -> Vec<String> {
        self.specs.iter().map(Self::display_one).collect()
    }

    fn display_one(spec: &Spec) -> String {
        match spec {
            Spec::Button(name, _) => format!("option name {name} type button"),
            Spec::Spin(s) => format!("option name {} type spin default {} min {} max {}", s.name, s.default, s.min, s.max),
            Spec::Check(s) => format!("option name {} type check default {}", s.name, s.default),
            Spec::Text(s) => format!("option name {} type string default {}", s.name, s.default),
        }
    }

    /// Applies `setoption name <name> value <value>`. Returns the work item on success, or
    /// `None` if the name is unknown or the value can't be parsed at all — matching §7.7's
    /// "malformed UCI input is logged and ignored", not propagated as an error.
    pub fn apply(&self, name: &str, value: &str) -> Option<OptionWork> {
        for spec in &self.specs {
            let spec_name = match spec {
                Spec::Button(n, _) => *n,
                Spec::Spin(s) => s.name,
                Spec::Check(s) => s.name,
                Spec::Text(s) => s.name,
            };
            if !spec_name.eq_ignore_ascii_case(name) {
                continue;
            }
            return match spec {
                Spec::Button(_, work) => Some(work.clone()),
                Spec::Spin(s) => match value.trim().parse::<i64>() {
                    Ok(v) => {
                        let clamped = v.clamp(s.min, s.max);
                        if clamped != v {
                            warn!("option {} value {} out of range [{}, {}], clamped to {}", s.name, v, s.min, s.max, clamped);
                        }
                        Some((s.make)(clamped))
                    }
                    Err(_) => {
                        warn!("option {} given non-integer value {:?}", s.name, value);
                        None
                    }
                },
                Spec::Check(s) => {
                    let v = value.trim();
                    if v.eq_ignore_ascii_case("true") {
                        Some((s.make)(true))
                    } else if v.eq_ignore_ascii_case("false") {
                        Some((s.make)(false))
                    } else {
                        warn!("option {} given non-boolean value {:?}", s.name, value);
                        None
                    }
                }
                Spec::Text(s) => Some((s.make)(value.to_owned())),
            };
        }
        warn!("setoption for unknown option {:?}", name);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_hash_spin_option() {
        let options = OptionsMap::new(1);
        assert_eq!(options.apply("Hash", "64"), Some(OptionWork::ResizeHash(64)));
    }

    #[test]
    fn out_of_range_spin_clamps_instead_of_rejecting() {
        let options = OptionsMap::new(1);
        assert_eq!(options.apply("Threads", "99999"), Some(OptionWork::Threads(512)));
    }

    #[test]
    fn unknown_option_returns_none() {
        let options = OptionsMap::new(1);
        assert_eq!(options.apply("NotAnOption", "1"), None);
    }

    #[test]
    fn clear_hash_button_ignores_value() {
        let options = OptionsMap::new(1);
        assert_eq!(options.apply("Clear Hash", ""), Some(OptionWork::ClearHash));
    }

    #[test]
    fn ponder_check_parses_case_insensitively() {
        let options = OptionsMap::new(1);
        assert_eq!(options.apply("Ponder", "True"), Some(OptionWork::Ponder(true)));
    }
}
