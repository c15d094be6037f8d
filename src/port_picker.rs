//! Interactive picker for the local serial port carrying the RF modem,
//! for operators who start a serial-mode check without naming one.

use std::io::{self, stdout};
use std::path::PathBuf;

use crossterm::{
    event::{self, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{
        block::{Position, Title},
        *,
    },
    Terminal,
};
use serial2::SerialPort;

/// Lists the serial ports on this machine and lets the operator choose
/// one. Returns `None` if there are no ports or the operator backs out.
pub fn pick_port() -> io::Result<Option<PathBuf>> {
    let mut available_ports = SerialPort::available_ports()?;
    if available_ports.is_empty() {
        return Ok(None);
    }

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let mut cursor = 0;
    let mut list_state = ListState::default().with_selected(Some(cursor));
    let n_ports = available_ports.len();
    let mut selected_port = None;
    loop {
        let title = Title::from(" Serial Ports ".cyan().bold());
        let instructions = Title::from(Line::from(vec![
            " Navigate ".into(),
            "<Up>/<Down>".cyan().bold(),
            " Select ".into(),
            "<Enter>".cyan().bold(),
            " Quit ".into(),
            "<Q> ".cyan().bold(),
        ]));
        let block = Block::default()
            .title(title.alignment(Alignment::Center))
            .title(
                instructions
                    .alignment(Alignment::Center)
                    .position(Position::Bottom),
            )
            .borders(Borders::ALL);
        let port_names = available_ports.iter().map(|p| p.to_string_lossy());
        let list = List::new(port_names)
            .style(Style::default().fg(Color::White))
            .highlight_symbol(">>")
            .highlight_style(Style::default().fg(Color::Cyan))
            .block(block);
        list_state.select(Some(cursor));
        terminal.draw(|frame| {
            let area = frame.size();
            frame.render_stateful_widget(list, area, &mut list_state);
        })?;
        if event::poll(std::time::Duration::from_millis(16))? {
            if let event::Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Down => {
                            cursor = (cursor + 1) % n_ports;
                        }
                        KeyCode::Up => {
                            cursor = (cursor + n_ports - 1) % n_ports;
                        }
                        KeyCode::Enter => {
                            selected_port = Some(cursor);
                            break;
                        }
                        KeyCode::Char('q') => break,
                        _ => {}
                    }
                }
            }
        }
    }

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(selected_port.map(|i| available_ports.swap_remove(i)))
}

/// Prints the available serial ports, one per line, for scripts and for
/// operators who just want the names.
pub fn print_ports() -> io::Result<()> {
    println!("\nHere is the list of available ports on this machine:");
    let mut ports = SerialPort::available_ports()?;
    ports.sort();
    for port in ports {
        println!("{}", port.display());
    }
    Ok(())
}
