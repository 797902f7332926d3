use std::str::FromStr;

use super::UciError;

/// Incoming message from UCI engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciMessage {
    Id { name: String, value: String },
    UciOk,
    ReadyOk,
    /// `token` is passed through verbatim; `(none)` means no legal move.
    BestMove { token: String, ponder: Option<String> },
    Info(SearchInfo),
}

/// Search progress reported on `info` lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchInfo {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    pub time_ms: Option<u64>,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    pub score: Option<Score>,
    pub multipv: Option<u32>,
    pub pv: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    /// Negative when the side to move is being mated.
    Mate(i32),
}

/// Parse a UCI message line
pub fn parse_uci_message(line: &str) -> Result<UciMessage, UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        Some(&"uciok") => Ok(UciMessage::UciOk),
        Some(&"readyok") => Ok(UciMessage::ReadyOk),

        Some(&"id") => {
            if tokens.len() < 3 {
                return Err(UciError::MalformedMessage(line.to_string()));
            }
            let name = tokens[1].to_string();
            let value = tokens[2..].join(" ");
            Ok(UciMessage::Id { name, value })
        }

        Some(&"bestmove") => {
            let Some(token) = tokens.get(1) else {
                return Err(UciError::MalformedMessage(line.to_string()));
            };
            let ponder = match (tokens.get(2), tokens.get(3)) {
                (Some(&"ponder"), Some(mv)) => Some(mv.to_string()),
                _ => None,
            };
            Ok(UciMessage::BestMove {
                token: token.to_string(),
                ponder,
            })
        }

        Some(&"info") => Ok(UciMessage::Info(parse_info_line(&tokens[1..]))),

        _ => Err(UciError::UnknownMessage(line.to_string())),
    }
}

fn parse_info_line(tokens: &[&str]) -> SearchInfo {
    let mut info = SearchInfo::default();
    let mut rest = tokens.iter().copied().peekable();

    while let Some(key) = rest.next() {
        match key {
            "depth" => info.depth = next_number(&mut rest),
            "seldepth" => info.seldepth = next_number(&mut rest),
            "time" => info.time_ms = next_number(&mut rest),
            "nodes" => info.nodes = next_number(&mut rest),
            "nps" => info.nps = next_number(&mut rest),
            "multipv" => info.multipv = next_number(&mut rest),
            "score" => {
                let kind = rest.next();
                info.score = match (kind, next_number(&mut rest)) {
                    (Some("cp"), Some(v)) => Some(Score::Centipawns(v)),
                    (Some("mate"), Some(v)) => Some(Score::Mate(v)),
                    _ => None,
                };
            }
            "pv" => {
                while let Some(mv) = rest.next_if(|t| !is_keyword(t)) {
                    info.pv.push(mv.to_string());
                }
            }
            // The rest of the line is free text.
            "string" => break,
            _ => {}
        }
    }

    info
}

fn next_number<'a, T: FromStr>(rest: &mut impl Iterator<Item = &'a str>) -> Option<T> {
    rest.next().and_then(|s| s.parse().ok())
}

fn is_keyword(token: &str) -> bool {
    matches!(
        token,
        "depth"
            | "seldepth"
            | "time"
            | "nodes"
            | "score"
            | "pv"
            | "multipv"
            | "currmove"
            | "currmovenumber"
            | "hashfull"
            | "nps"
            | "tbhits"
            | "cpuload"
            | "string"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bestmove() {
        let msg = parse_uci_message("bestmove e2e4 ponder e7e5").unwrap();
        assert_eq!(
            msg,
            UciMessage::BestMove {
                token: "e2e4".to_string(),
                ponder: Some("e7e5".to_string()),
            }
        );

        let promo = parse_uci_message("bestmove e7e8q").unwrap();
        assert!(matches!(promo, UciMessage::BestMove { token, ponder: None } if token == "e7e8q"));
    }

    #[test]
    fn test_parse_bestmove_none() {
        let msg = parse_uci_message("bestmove (none)").unwrap();
        assert!(matches!(msg, UciMessage::BestMove { token, .. } if token == "(none)"));
        assert!(matches!(
            parse_uci_message("bestmove"),
            Err(UciError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_parse_handshake_lines() {
        assert_eq!(parse_uci_message("uciok").unwrap(), UciMessage::UciOk);
        assert_eq!(parse_uci_message("readyok\r").unwrap(), UciMessage::ReadyOk);
        assert_eq!(
            parse_uci_message("id name Stockfish 16.1").unwrap(),
            UciMessage::Id {
                name: "name".to_string(),
                value: "Stockfish 16.1".to_string(),
            }
        );
        assert!(matches!(
            parse_uci_message("option name Hash type spin default 16"),
            Err(UciError::UnknownMessage(_))
        ));
    }

    #[test]
    fn test_parse_info() {
        let msg = parse_uci_message(
            "info depth 12 seldepth 18 score cp 35 nodes 15234 nps 900000 pv e2e4 e7e5 time 17",
        )
        .unwrap();
        let UciMessage::Info(info) = msg else {
            panic!("Wrong message type");
        };
        assert_eq!(info.depth, Some(12));
        assert_eq!(info.seldepth, Some(18));
        assert_eq!(info.score, Some(Score::Centipawns(35)));
        assert_eq!(info.nodes, Some(15234));
        assert_eq!(info.pv, vec!["e2e4", "e7e5"]);
        assert_eq!(info.time_ms, Some(17));
    }

    #[test]
    fn test_parse_info_mate_and_string() {
        let UciMessage::Info(info) = parse_uci_message("info depth 3 score mate -2").unwrap() else {
            panic!("Wrong message type");
        };
        assert_eq!(info.score, Some(Score::Mate(-2)));

        let UciMessage::Info(info) =
            parse_uci_message("info string depth 99 is not a field here").unwrap()
        else {
            panic!("Wrong message type");
        };
        assert_eq!(info.depth, None);
    }
}
