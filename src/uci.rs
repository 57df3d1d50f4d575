use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use shakmaty::{Chess, Color, File, Position, Rank, Square};
use tracing::{debug, error, info, warn};

use crate::difficulty::{Difficulty, MAX_LEVEL, MIN_LEVEL};
use crate::error::{EngineError, EngineResult};
use crate::rules;
use crate::search::{self, Engine};
use crate::types::{EngineConfig, SearchResult};

pub fn run() {
    let stdin = io::stdin();

    let mut position = Chess::default();
    let mut config = EngineConfig::default();
    let mut engine: Option<Engine> = Some(Engine::new());
    let mut stop_flag: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));
    let mut search_thread: Option<thread::JoinHandle<Engine>> = None;

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(err) => {
                error!(%err, "failed to read from stdin");
                break;
            }
        };
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        debug!(command = %line.trim(), "uci input");

        match tokens[0] {
            "uci" => {
                println!("id name sparring {}", env!("CARGO_PKG_VERSION"));
                println!("id author the sparring developers");
                println!(
                    "option name Difficulty type spin default {} min {} max {}",
                    Difficulty::default().level(),
                    MIN_LEVEL,
                    MAX_LEVEL
                );
                println!("uciok");
            }
            "isready" => {
                wait_for_search(&mut search_thread, &mut engine);
                println!("readyok");
            }
            "ucinewgame" => {
                wait_for_search(&mut search_thread, &mut engine);
                position = Chess::default();
                engine = Some(Engine::new());
            }
            "position" => {
                wait_for_search(&mut search_thread, &mut engine);
                match parse_position(&tokens) {
                    Ok(pos) => position = pos,
                    Err(err) => {
                        warn!(%err, "rejected position command");
                        println!("info string {err}");
                    }
                }
            }
            "go" => {
                wait_for_search(&mut search_thread, &mut engine);

                let params = parse_go(&tokens);
                let (depth, time_limit_ms) = params.budget(config.difficulty);

                let mut worker = engine.take().unwrap_or_default();
                // Fresh flag before spawning: a `stop` right after `go` must reach this search
                stop_flag = worker.new_stop_handle();
                let pos = position.clone();
                info!(depth, time_limit_ms, difficulty = config.difficulty.level(), "search started");

                search_thread = Some(thread::spawn(move || {
                    let started = Instant::now();
                    match worker.search_depth(&pos, depth, time_limit_ms) {
                        Ok(result) => {
                            if result.best_move.is_some() {
                                let elapsed_ms = started.elapsed().as_millis() as u64;
                                println!("{}", info_line(&pos, &result, elapsed_ms));
                            }
                            println!("{}", bestmove_line(&result));
                        }
                        Err(err) => {
                            error!(%err, "search failed");
                            println!("bestmove 0000");
                        }
                    }
                    worker
                }));
            }
            "stop" => {
                stop_flag.store(true, Ordering::SeqCst);
                wait_for_search(&mut search_thread, &mut engine);
            }
            "setoption" => {
                wait_for_search(&mut search_thread, &mut engine);
                parse_setoption(&tokens, &mut config);
            }
            "quit" => {
                stop_flag.store(true, Ordering::SeqCst);
                wait_for_search(&mut search_thread, &mut engine);
                break;
            }
            "d" | "print" => {
                println!("{}", render(&position));
            }
            other => debug!(command = other, "ignored unknown command"),
        }
    }
}

/// Wait for a running search thread to finish and recover its engine.
fn wait_for_search(handle: &mut Option<thread::JoinHandle<Engine>>, engine: &mut Option<Engine>) {
    if let Some(h) = handle.take() {
        match h.join() {
            Ok(e) => *engine = Some(e),
            Err(_) => {
                error!("search thread panicked, starting a fresh engine");
                *engine = Some(Engine::new());
            }
        }
    }
}

/// Parsed `go` command parameters.
#[derive(Debug, Default, PartialEq, Eq)]
struct GoParams {
    depth: Option<u8>,
    movetime: Option<u64>,
}

impl GoParams {
    /// Depth and deadline for this search. An explicit depth runs without the
    /// difficulty's deadline unless `movetime` is also given.
    fn budget(&self, difficulty: Difficulty) -> (u8, u64) {
        let profile = difficulty.profile();
        match self.depth {
            Some(depth) => (depth.max(1), self.movetime.unwrap_or(0)),
            None => (profile.depth, self.movetime.unwrap_or(profile.time_limit_ms)),
        }
    }
}

fn parse_go(tokens: &[&str]) -> GoParams {
    let mut params = GoParams::default();
    let mut i = 1;

    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                i += 1;
                if i < tokens.len() {
                    params.depth = tokens[i].parse().ok();
                }
            }
            "movetime" => {
                i += 1;
                if i < tokens.len() {
                    params.movetime = tokens[i].parse().ok();
                }
            }
            _ => {}
        }
        i += 1;
    }

    params
}

/// Build the position described by a `position` command. Nothing is applied unless the
/// whole command is valid.
fn parse_position(tokens: &[&str]) -> EngineResult<Chess> {
    let mut idx = 1;

    let mut pos = match tokens.get(idx) {
        Some(&"startpos") => {
            idx += 1;
            Chess::default()
        }
        Some(&"fen") => {
            idx += 1;
            let mut fen_parts: Vec<&str> = Vec::new();
            while idx < tokens.len() && tokens[idx] != "moves" && fen_parts.len() < 6 {
                fen_parts.push(tokens[idx]);
                idx += 1;
            }
            rules::from_fen(&fen_parts.join(" "))?
        }
        _ => {
            return Err(EngineError::InvalidPosition {
                fen: tokens[idx.min(tokens.len())..].join(" "),
                reason: "expected `startpos` or `fen`".to_string(),
            });
        }
    };

    if tokens.get(idx) == Some(&"moves") {
        for text in &tokens[idx + 1..] {
            let mv = rules::parse_uci(&pos, text)?;
            pos = rules::apply(&pos, &mv);
        }
    }

    Ok(pos)
}

fn parse_setoption(tokens: &[&str], config: &mut EngineConfig) {
    let name_idx = tokens.iter().position(|&t| t == "name");
    let value_idx = tokens.iter().position(|&t| t == "value");

    if let (Some(ni), Some(vi)) = (name_idx, value_idx)
        && ni < vi
    {
        let name = tokens[ni + 1..vi].join(" ");
        let value = tokens[vi + 1..].join(" ");

        match name.to_lowercase().as_str() {
            "difficulty" => match value.parse::<i64>() {
                Ok(level) => {
                    config.difficulty = Difficulty::clamped(level);
                    info!(level = config.difficulty.level(), "difficulty set");
                }
                Err(_) => warn!(%value, "difficulty must be a number"),
            },
            _ => debug!(%name, "unknown option"),
        }
    }
}

/// `info` line for a finished search. Scores are reported for the side to move.
fn info_line(pos: &Chess, result: &SearchResult, elapsed_ms: u64) -> String {
    let score = match pos.turn() {
        Color::White => result.score,
        Color::Black => -result.score,
    };
    let nps = result.nodes * 1000 / elapsed_ms.max(1);
    let mut line = format!(
        "info depth {} {} nodes {} time {} nps {}",
        result.depth,
        search::format_score(score),
        result.nodes,
        elapsed_ms,
        nps
    );
    if let Some(mv) = &result.best_move {
        line.push_str(" pv ");
        line.push_str(&rules::to_uci(mv));
    }
    line
}

fn bestmove_line(result: &SearchResult) -> String {
    match &result.best_move {
        Some(mv) => format!("bestmove {}", rules::to_uci(mv)),
        None => "bestmove 0000".to_string(),
    }
}

/// ASCII diagram with White at the bottom, followed by the FEN.
fn render(pos: &Chess) -> String {
    let board = pos.board();
    let mut out = String::new();
    for rank in Rank::ALL.iter().rev() {
        out.push(rank.char());
        out.push(' ');
        for file in File::ALL {
            let sq = Square::from_coords(file, *rank);
            out.push(' ');
            out.push(board.piece_at(sq).map_or('.', |p| p.char()));
        }
        out.push('\n');
    }
    out.push_str("   a b c d e f g h\n\n");
    out.push_str(&format!("Fen: {}", rules::to_fen(pos)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_position_startpos() {
        let pos = parse_position(&["position", "startpos"]).unwrap();
        assert_eq!(rules::to_fen(&pos), rules::to_fen(&Chess::default()));
    }

    #[test]
    fn test_parse_position_startpos_with_moves() {
        let pos = parse_position(&["position", "startpos", "moves", "e2e4", "e7e5"]).unwrap();
        assert_eq!(
            rules::to_fen(&pos),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2"
        );
    }

    #[test]
    fn test_parse_position_fen() {
        let tokens = [
            "position", "fen",
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR",
            "b", "KQkq", "-", "0", "1",
            "moves", "c7c5",
        ];
        let pos = parse_position(&tokens).unwrap();
        assert_eq!(pos.turn(), Color::White);
        assert_eq!(u32::from(pos.fullmoves()), 2);
    }

    #[test]
    fn test_parse_position_rejects_illegal_move() {
        let result = parse_position(&["position", "startpos", "moves", "e2e4", "e2e4"]);
        assert!(matches!(result, Err(EngineError::IllegalMoveAttempt { .. })));
    }

    #[test]
    fn test_parse_position_rejects_bad_fen() {
        assert!(parse_position(&["position", "fen", "not", "a", "fen"]).is_err());
        assert!(parse_position(&["position"]).is_err());
        assert!(parse_position(&["position", "somewhere"]).is_err());
    }

    #[test]
    fn test_parse_go_depth() {
        let params = parse_go(&["go", "depth", "6"]);
        assert_eq!(params.depth, Some(6));
        assert_eq!(params.budget(Difficulty::default()), (6, 0));
    }

    #[test]
    fn test_go_without_depth_uses_difficulty() {
        let params = parse_go(&["go"]);
        let level = Difficulty::new(8).unwrap();
        assert_eq!(params.budget(level), (4, 10_000));
        assert_eq!(parse_go(&["go", "movetime", "250"]).budget(level), (4, 250));
    }

    #[test]
    fn test_parse_setoption_difficulty() {
        let mut config = EngineConfig::default();
        parse_setoption(&["setoption", "name", "Difficulty", "value", "7"], &mut config);
        assert_eq!(config.difficulty.level(), 7);
        parse_setoption(&["setoption", "name", "Difficulty", "value", "42"], &mut config);
        assert_eq!(config.difficulty.level(), 10);
        parse_setoption(&["setoption", "name", "Difficulty", "value", "-3"], &mut config);
        assert_eq!(config.difficulty.level(), 1);
        parse_setoption(&["setoption", "name", "Difficulty", "value", "hard"], &mut config);
        assert_eq!(config.difficulty.level(), 1);
    }

    #[test]
    fn test_info_line_reports_mate_for_side_to_move() {
        let pos = rules::from_fen("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2").unwrap();
        let result = Engine::new().search_depth(&pos, 2, 0).unwrap();
        let line = info_line(&pos, &result, 5);
        assert!(line.contains("score mate 1"), "got {line}");
        assert!(line.ends_with("pv d8h4"), "got {line}");
        assert_eq!(bestmove_line(&result), "bestmove d8h4");
    }

    #[test]
    fn test_bestmove_without_moves() {
        let mated = rules::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3").unwrap();
        let result = Engine::new().search_depth(&mated, 3, 0).unwrap();
        assert_eq!(bestmove_line(&result), "bestmove 0000");
    }

    #[test]
    fn test_render_start_position() {
        let text = render(&Chess::default());
        assert!(text.starts_with("8  r n b q k b n r\n"), "got {text}");
        assert!(text.contains("1  R N B Q K B N R\n"));
        assert!(text.ends_with("Fen: rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"));
    }
}
