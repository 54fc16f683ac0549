use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue};

use arena::InputFlags;

use crate::net::{GameClient, SessionState};

// World units per terminal cell; rows are half the resolution of columns
// because cells are roughly twice as tall as wide.
const CELLS_PER_UNIT_X: f32 = 0.2;
const CELLS_PER_UNIT_Y: f32 = 0.1;

const PLAYER_GLYPH: &str = "\u{25A0}";

/// Terminal stand-in for the external input source and renderer: polls
/// WASD/arrows, draws each present player as a glyph, paces the loop on
/// the client's clock. `q` or Esc leaves.
pub fn run(client: &mut GameClient) -> Result<()> {
    let mut stdout = io::stdout();

    terminal::enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let result = run_loop(client, &mut stdout);

    execute!(stdout, LeaveAlternateScreen, cursor::Show)?;
    terminal::disable_raw_mode()?;

    client.leave();
    result
}

fn run_loop(client: &mut GameClient, stdout: &mut io::Stdout) -> Result<()> {
    loop {
        // Terminals deliver no key-release events, so a direction counts
        // as held for the tick its key event arrived in.
        let mut up = false;
        let mut down = false;
        let mut left = false;
        let mut right = false;

        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press || key.kind == KeyEventKind::Repeat {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                        KeyCode::Char('w') | KeyCode::Up => up = true,
                        KeyCode::Char('s') | KeyCode::Down => down = true,
                        KeyCode::Char('a') | KeyCode::Left => left = true,
                        KeyCode::Char('d') | KeyCode::Right => right = true,
                        _ => {}
                    }
                }
            }
        }

        client.update(InputFlags::from_directions(up, down, left, right));
        draw(stdout, client)?;
        client.finish_tick();
    }
}

fn draw(stdout: &mut io::Stdout, client: &GameClient) -> Result<()> {
    let (cols, rows) = terminal::size()?;
    queue!(stdout, Clear(ClearType::All))?;

    if client.slot().is_some() {
        for (slot, visual) in client
            .view()
            .players
            .iter()
            .copied()
            .enumerate()
            .filter_map(|(slot, v)| v.map(|v| (slot, v)))
        {
            let col = (cols as f32 / 2.0 + visual.x * CELLS_PER_UNIT_X)
                .clamp(0.0, cols.saturating_sub(1) as f32) as u16;
            let row = (rows as f32 / 2.0 - visual.y * CELLS_PER_UNIT_Y)
                .clamp(1.0, rows.saturating_sub(1) as f32) as u16;

            queue!(
                stdout,
                cursor::MoveTo(col, row),
                SetForegroundColor(slot_color(slot)),
                Print(PLAYER_GLYPH),
                ResetColor,
            )?;
        }
    }

    queue!(stdout, cursor::MoveTo(0, 0), Print(status_line(client)))?;
    stdout.flush()?;
    Ok(())
}

fn slot_color(slot: usize) -> Color {
    // Skip the dim low ANSI values so every slot stays visible.
    Color::AnsiValue(9 + (slot % 6) as u8)
}

fn status_line(client: &GameClient) -> String {
    match client.state() {
        SessionState::Unjoined | SessionState::AwaitingJoinResult => {
            "joining... (q to quit)".to_string()
        }
        SessionState::Joined { slot } => {
            let view = client.view();
            let players = view.players.iter().filter(|p| p.is_some()).count();
            let rtt = client
                .rtt_ms()
                .map_or_else(|| "--".to_string(), |ms| format!("{ms}"));
            format!(
                "slot {slot} | tick {}/{} | players {players} | speed {:.1} | rtt {rtt} ms | rx {} | q to quit",
                client.tick(),
                view.server_tick,
                view.speed,
                client.stats().datagrams_received,
            )
        }
        SessionState::Left => "session ended (q to quit)".to_string(),
    }
}
