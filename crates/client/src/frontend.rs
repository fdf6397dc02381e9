//! Line-oriented terminal frontend.
//!
//! Reads one command per line from stdin and prints runtime events as they
//! arrive. Stands in for the touch screen during rehearsals and operator
//! maintenance (duration changes, CSV export).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use memory_core::{CardState, CardView, Durations, Phase, RegistrationForm, SessionState};
use runtime::{
    BoardEvent, Event, FlipReport, RankingEntry, RuntimeError, RuntimeHandle, SessionEvent,
    TimerEvent, Topic,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{Receiver, error::RecvError};

use crate::config::KioskConfig;

const COLUMNS: usize = 5;
const BAR_WIDTH: usize = 20;

const HELP: &str = "\
Commands:
  register <identifier> <phone> <name...>   start a session
  flip <n>                                  turn card n
  board                                     show the board
  reset                                     back to registration (after a game)
  durations <memorize> <play>               set countdowns in seconds
  ranking                                   show the top times
  export                                    write players CSV and clear results
  help                                      show this text
  quit                                      exit";

/// One parsed line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Register {
        identifier: String,
        phone: String,
        name: String,
    },
    Flip(usize),
    Board,
    Reset,
    Durations {
        memorize: u32,
        play: u32,
    },
    Ranking,
    Export,
    Help,
    Quit,
    Empty,
}

pub async fn run(handle: RuntimeHandle, config: &KioskConfig) -> Result<()> {
    let printer = tokio::spawn(print_events(
        handle.subscribe(Topic::Session),
        handle.subscribe(Topic::Board),
        handle.subscribe(Topic::Timer),
    ));

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match parse_input(&line) {
            Ok(Input::Quit) => break,
            Ok(Input::Empty) => {}
            Ok(input) => {
                if let Err(err) = execute(&handle, config, input).await {
                    println!("error: {err:#}");
                }
            }
            Err(usage) => println!("{usage}"),
        }
    }

    printer.abort();
    Ok(())
}

fn parse_input(line: &str) -> std::result::Result<Input, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(Input::Empty);
    };

    match command.to_ascii_lowercase().as_str() {
        "register" => {
            let usage = || "usage: register <identifier> <phone> <name...>".to_string();
            let identifier = words.next().ok_or_else(usage)?.to_string();
            let phone = words.next().ok_or_else(usage)?.to_string();
            let name = words.collect::<Vec<_>>().join(" ");
            if name.is_empty() {
                return Err(usage());
            }
            Ok(Input::Register {
                identifier,
                phone,
                name,
            })
        }
        "flip" => words
            .next()
            .and_then(|n| n.parse().ok())
            .map(Input::Flip)
            .ok_or_else(|| "usage: flip <n>".to_string()),
        "durations" => {
            let memorize = words.next().and_then(|n| n.parse().ok());
            let play = words.next().and_then(|n| n.parse().ok());
            match (memorize, play) {
                (Some(memorize), Some(play)) => Ok(Input::Durations { memorize, play }),
                _ => Err("usage: durations <memorize> <play>".to_string()),
            }
        }
        "board" => Ok(Input::Board),
        "reset" => Ok(Input::Reset),
        "ranking" => Ok(Input::Ranking),
        "export" => Ok(Input::Export),
        "help" | "?" => Ok(Input::Help),
        "quit" | "exit" => Ok(Input::Quit),
        other => Err(format!("unknown command '{other}' (try 'help')")),
    }
}

async fn execute(handle: &RuntimeHandle, config: &KioskConfig, input: Input) -> Result<()> {
    match input {
        Input::Register {
            identifier,
            phone,
            name,
        } => {
            let form = RegistrationForm {
                name,
                phone,
                email: None,
                identifier,
            };
            match handle.register_form(&form).await {
                // Already announced through a RegistrationRejected event.
                Err(RuntimeError::Validation(_)) => {}
                Err(err) if err.is_duplicate_identifier() => {}
                other => other?,
            }
        }
        Input::Flip(position) => {
            if let FlipReport::Rejected(rejection) = handle.flip(position).await? {
                println!("ignored: {rejection}");
            }
        }
        Input::Board => {
            let snapshot = handle.snapshot().await?;
            let timer = match snapshot.state {
                SessionState::Memorize => format!(", {}s to memorize", snapshot.memorize_remaining),
                SessionState::Playing => format!(", {}s left", snapshot.play_remaining),
                _ => String::new(),
            };
            println!(
                "{} | {}/{} pairs, {} attempts{timer}",
                snapshot.state, snapshot.matched_pairs, snapshot.total_pairs, snapshot.attempts
            );
            if !snapshot.cards.is_empty() {
                println!("{}", render_cards(&snapshot.cards));
            }
        }
        Input::Reset => handle.reset().await?,
        Input::Durations { memorize, play } => {
            handle
                .configure_durations(Durations::new(memorize, play)?)
                .await?
        }
        Input::Ranking => println!("{}", render_ranking(&handle.ranking().await?)),
        Input::Export => {
            let csv = handle.export_and_clear().await?;
            if csv.lines().count() <= 1 {
                println!("nothing to export");
            } else {
                match deliver_export(&config.export_dir, &csv).await {
                    Ok(path) => println!(
                        "exported {} players to {}",
                        csv.lines().count() - 1,
                        path.display()
                    ),
                    Err(fallback) => println!("{fallback}"),
                }
            }
        }
        Input::Help => println!("{HELP}"),
        Input::Quit | Input::Empty => {}
    }
    Ok(())
}

/// Saves a dump that has already been cleared from the store.
///
/// On failure the dump is handed back inside the text for the operator, as
/// stdout is the only copy left.
async fn deliver_export(dir: &Path, csv: &str) -> std::result::Result<PathBuf, String> {
    write_export(dir, csv).await.map_err(|err| {
        tracing::error!("Export could not be saved, printing it instead: {err:#}");
        format!(
            "warning: export could not be saved ({err:#})\n\
             results were already cleared; copy the dump below\n{csv}"
        )
    })
}

async fn write_export(dir: &Path, csv: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating export directory {}", dir.display()))?;

    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let path = dir.join(format!("players-{stamp}.csv"));
    tokio::fs::write(&path, csv)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    tracing::info!("Exported player log to {}", path.display());
    Ok(path)
}

async fn print_events(
    mut session: Receiver<Event>,
    mut board: Receiver<Event>,
    mut timer: Receiver<Event>,
) {
    loop {
        let received = tokio::select! {
            event = session.recv() => event,
            event = board.recv() => event,
            event = timer.recv() => event,
        };
        match received {
            Ok(event) => {
                if let Some(line) = describe(&event) {
                    println!("{line}");
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("frontend lagged behind by {skipped} events")
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Text for an event, or `None` for events the terminal does not show.
fn describe(event: &Event) -> Option<String> {
    match event {
        Event::Session(event) => describe_session(event),
        Event::Board(event) => describe_board(event),
        Event::Timer(TimerEvent::Tick {
            phase,
            remaining,
            progress,
            critical,
            ..
        }) => {
            // One line per second is too chatty for a terminal, except
            // near the end of play.
            if *remaining % 5 != 0 && !*critical {
                return None;
            }
            let label = match phase {
                Phase::Memorize => "memorize",
                Phase::Play => "play",
            };
            let marker = if *critical { " !" } else { "" };
            Some(format!(
                "[{label:>8}] {} {remaining}s{marker}",
                progress_bar(*progress)
            ))
        }
    }
}

fn describe_session(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::Registered { name, .. } => {
            Some(format!("Welcome, {name}! Memorize the board."))
        }
        SessionEvent::RegistrationRejected { reason, .. } => {
            Some(format!("Registration refused: {reason}"))
        }
        SessionEvent::PhaseChanged { to, .. } => match to {
            SessionState::Playing => Some("Go! Find all the pairs.".to_string()),
            SessionState::Registration => Some("Ready for the next player.".to_string()),
            _ => None,
        },
        SessionEvent::Won {
            name,
            elapsed_secs,
            attempts,
            rank,
            ranking,
        } => {
            let mut text = format!(
                "Congratulations, {name}! All pairs in {elapsed_secs}s with {attempts} attempts."
            );
            if let Some(rank) = rank {
                text.push_str(&format!(" You placed #{} on the ranking.", rank + 1));
            }
            text.push('\n');
            text.push_str(&render_ranking(ranking));
            Some(text)
        }
        SessionEvent::Lost {
            pairs_found,
            total_pairs,
            ..
        } => Some(format!(
            "Time's up! {pairs_found} of {total_pairs} pairs found."
        )),
        SessionEvent::DurationsChanged { durations } => Some(format!(
            "Durations set: memorize {}s, play {}s",
            durations.memorize_secs(), durations.play_secs()
        )),
        SessionEvent::Reset | SessionEvent::StoreCleared { .. } => None,
    }
}

fn describe_board(event: &BoardEvent) -> Option<String> {
    match event {
        BoardEvent::Rendered { cards } if !cards.is_empty() => Some(render_cards(cards)),
        BoardEvent::CardFlipped { card } => Some(format!(
            "card {}: {}",
            card.position,
            card_label(card)
        )),
        BoardEvent::PairMatched { first, second } => {
            Some(format!("Match! cards {first} and {second}"))
        }
        BoardEvent::PairHidden { first, second } => {
            Some(format!("No match, cards {first} and {second} turned back"))
        }
        BoardEvent::Rendered { .. }
        | BoardEvent::FlipRejected { .. }
        | BoardEvent::AttemptsChanged { .. } => None,
    }
}

fn card_label(card: &CardView) -> String {
    match (&card.state, &card.icon) {
        (CardState::Matched, Some(icon)) => format!("*{icon}*"),
        (_, Some(icon)) => icon.to_string(),
        (_, None) => "??".to_string(),
    }
}

/// Renders the board as a grid, `COLUMNS` cards per row.
fn render_cards(cards: &[CardView]) -> String {
    cards
        .chunks(COLUMNS)
        .map(|row| {
            row.iter()
                .map(|card| format!("{:>2}:{:<8}", card.position, card_label(card)))
                .collect::<Vec<_>>()
                .join(" ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_ranking(ranking: &[RankingEntry]) -> String {
    if ranking.is_empty() {
        return "Ranking is empty.".to_string();
    }
    ranking
        .iter()
        .enumerate()
        .map(|(i, entry)| format!("{:>2}. {:<20} {:>3}s", i + 1, entry.name, entry.elapsed_secs))
        .collect::<Vec<_>>()
        .join("\n")
}

fn progress_bar(progress: f32) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * BAR_WIDTH as f32).round() as usize).min(BAR_WIDTH);
    format!("{}{}", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory_core::IconId;

    fn card(position: usize, state: CardState, icon: Option<&str>) -> CardView {
        CardView {
            position,
            state,
            icon: icon.map(IconId::from),
        }
    }

    #[test]
    fn register_takes_the_rest_of_the_line_as_name() {
        assert_eq!(
            parse_input("register 12345678901 51998765432 Ana Maria Souza"),
            Ok(Input::Register {
                identifier: "12345678901".into(),
                phone: "51998765432".into(),
                name: "Ana Maria Souza".into(),
            })
        );
        assert!(parse_input("register 12345678901 51998765432").is_err());
    }

    #[test]
    fn numeric_arguments_are_checked() {
        assert_eq!(parse_input("FLIP 7"), Ok(Input::Flip(7)));
        assert!(parse_input("flip seven").is_err());
        assert_eq!(
            parse_input("durations 5 45"),
            Ok(Input::Durations {
                memorize: 5,
                play: 45
            })
        );
        assert!(parse_input("durations 5").is_err());
        assert_eq!(parse_input("   "), Ok(Input::Empty));
        assert!(parse_input("dance").is_err());
    }

    #[test]
    fn board_renders_in_rows_and_hides_face_down_icons() {
        let cards: Vec<_> = (0..7)
            .map(|i| match i {
                0 => card(i, CardState::FaceUp, Some("icon3")),
                1 => card(i, CardState::Matched, Some("icon1")),
                _ => card(i, CardState::FaceDown, None),
            })
            .collect();

        let text = render_cards(&cards);
        let rows: Vec<_> = text.lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with(" 0:icon3"));
        assert!(rows[0].contains(" 1:*icon1*"));
        assert!(rows[1].starts_with(" 5:??"));
    }

    #[test]
    fn ticks_are_thinned_out() {
        let tick = |remaining, critical| {
            Event::Timer(TimerEvent::tick(Phase::Play, remaining, 60, critical))
        };
        assert!(describe(&tick(58, false)).is_none());
        assert!(describe(&tick(55, false)).is_some());
        assert!(describe(&tick(7, true)).unwrap().ends_with("7s !"));

        let line = describe(&tick(30, false)).unwrap();
        assert!(line.contains("##########----------"));
        assert!(line.ends_with("30s"));
    }

    #[tokio::test]
    async fn export_is_written_to_the_export_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("exports");
        let csv = "name,phone\n\"Ana\",\"51998765432\"\n";

        let path = deliver_export(&dir, csv).await.unwrap();
        assert!(path.starts_with(&dir));
        assert_eq!(std::fs::read_to_string(path).unwrap(), csv);
    }

    #[tokio::test]
    async fn unwritable_export_dir_hands_the_dump_back() {
        let temp = tempfile::TempDir::new().unwrap();
        // A regular file where the directory should be.
        let blocker = temp.path().join("exports");
        std::fs::write(&blocker, "").unwrap();
        let csv = "name,phone\n\"Ana\",\"51998765432\"\n";

        let fallback = deliver_export(&blocker.join("nested"), csv)
            .await
            .unwrap_err();
        assert!(fallback.starts_with("warning: export could not be saved"));
        assert!(fallback.ends_with(csv));
    }

    #[test]
    fn ranking_is_numbered_from_one() {
        let text = render_ranking(&[RankingEntry::new("Ana", 25), RankingEntry::new("Bia", 31)]);
        assert!(text.starts_with(" 1. Ana"));
        assert!(text.lines().nth(1).unwrap().starts_with(" 2. Bia"));
        assert_eq!(render_ranking(&[]), "Ranking is empty.");
    }
}
