use super::app::{App, View};
use crate::ledger::short_signature;
use crate::transfer::SubmissionStatus;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs, Wrap},
    Frame,
};

pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Min(0),    // Main content
            Constraint::Length(3), // Status bar
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0]);
    draw_main(f, app, chunks[1]);
    draw_status_bar(f, app, chunks[2]);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = View::all()
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let num = format!("[{}] ", i + 1);
            let style = if *v == app.current_view {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            Line::from(vec![
                Span::styled(num, Style::default().fg(Color::DarkGray)),
                Span::styled(v.title(), style),
            ])
        })
        .collect();

    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title(" Solana Wallet  [←/→ or 1-3 to switch tabs] "))
        .highlight_style(Style::default().fg(Color::Yellow))
        .select(View::all().iter().position(|v| *v == app.current_view).unwrap_or(0));

    f.render_widget(tabs, area);
}

fn draw_main(f: &mut Frame, app: &mut App, area: Rect) {
    match app.current_view {
        View::Wallet => draw_wallet(f, app, area),
        View::Send => draw_send(f, app, area),
        View::History => draw_history(f, app, area),
    }
}

fn draw_wallet(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Wallet ");

    let mut lines: Vec<Line> = Vec::new();

    match app.address() {
        Some(address) => {
            lines.push(Line::from(vec![
                Span::styled("Wallet Address: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(address.to_string(), Style::default().fg(Color::White)),
            ]));
            lines.push(Line::from(vec![
                Span::styled("SOL Balance:    ", Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("{:.2} SOL", app.sol_balance()),
                    Style::default().fg(Color::Green),
                ),
            ]));
            lines.push(Line::from(vec![
                Span::styled("USD Value:      ", Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("${:.2}", app.usd_balance()),
                    Style::default().fg(Color::Cyan),
                ),
            ]));
            lines.push(Line::from(vec![
                Span::styled("SOL Price:      ", Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("${:.2}", app.sol_price),
                    Style::default().fg(Color::DarkGray),
                ),
            ]));
            lines.push(Line::from(vec![
                Span::styled("Status:         ", Style::default().add_modifier(Modifier::BOLD)),
                Span::styled("Connected", Style::default().fg(Color::Green)),
            ]));
        }
        None => {
            lines.push(Line::from(Span::styled(
                "Please connect your wallet.",
                Style::default().fg(Color::DarkGray),
            )));
            lines.push(Line::from(""));
            if app.has_keypair() {
                lines.push(Line::from(Span::styled(
                    "Press c to connect.",
                    Style::default().fg(Color::Cyan),
                )));
            } else {
                lines.push(Line::from(Span::styled(
                    "No keypair was found; restart with --keypair PATH.",
                    Style::default().fg(Color::Red),
                )));
            }
        }
    }

    if let Some(ref message) = app.status_message {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            message.as_str(),
            Style::default().fg(Color::Red),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn draw_send(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Recipient
            Constraint::Length(3), // Amount
            Constraint::Length(2), // Submit hint
            Constraint::Min(0),    // Status message
        ])
        .margin(1)
        .split(area);

    let in_flight = app.submit_in_flight();
    let title = if in_flight {
        " Send SOL (submitting...) ".to_string()
    } else {
        format!(" Send SOL (Field {}/2) ", app.send_form.selected_field + 1)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(title);
    f.render_widget(block, area);

    let fields = [
        ("Recipient Address", &app.send_form.recipient, "base58 account address"),
        ("Amount (SOL)", &app.send_form.amount, "step 0.0001, min 0"),
    ];

    for (i, (label, value, hint)) in fields.iter().enumerate() {
        let is_selected = app.send_form.selected_field == i && !in_flight;

        let (label_style, input_style, border_color) = if is_selected {
            (
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                Color::Yellow,
            )
        } else {
            (
                Style::default().fg(Color::DarkGray),
                Style::default().fg(Color::Gray),
                Color::DarkGray,
            )
        };

        let cursor = if is_selected { "█" } else { "" };
        let display_value = if value.is_empty() && !is_selected {
            format!("({})", hint)
        } else {
            format!("{}{}", value, cursor)
        };

        let indicator = if is_selected { "▶ " } else { "  " };
        let text = Line::from(vec![
            Span::styled(indicator, label_style),
            Span::styled(format!("{}: ", label), label_style),
            Span::styled(display_value, input_style),
        ]);

        let paragraph = Paragraph::new(text)
            .block(Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(border_color)));
        f.render_widget(paragraph, chunks[i]);
    }

    let hint_text = if in_flight {
        Line::from(vec![
            Span::styled("Sending", Style::default().fg(Color::Yellow)),
            Span::styled("  submit disabled until this transfer settles", Style::default().fg(Color::DarkGray)),
        ])
    } else {
        Line::from(vec![
            Span::styled("↑/↓", Style::default().fg(Color::Cyan)),
            Span::styled(" Fields  ", Style::default().fg(Color::DarkGray)),
            Span::styled("Enter", Style::default().fg(Color::Green)),
            Span::styled(" Send  ", Style::default().fg(Color::DarkGray)),
            Span::styled("Esc", Style::default().fg(Color::Red)),
            Span::styled(" Clear", Style::default().fg(Color::DarkGray)),
        ])
    };
    f.render_widget(Paragraph::new(hint_text), chunks[2]);

    if let Some(message) = app.send_form.status.message() {
        let (symbol, color) = match app.send_form.status {
            SubmissionStatus::Sending => ("… ", Color::Yellow),
            SubmissionStatus::Sent(_) => ("→ ", Color::Cyan),
            SubmissionStatus::Confirmed(_) => ("✓ ", Color::Green),
            SubmissionStatus::Failed(_) => ("✗ ", Color::Red),
            SubmissionStatus::Idle => ("", Color::Reset),
        };
        let status = Paragraph::new(Line::from(vec![
            Span::styled(symbol, Style::default().fg(color)),
            Span::styled(message, Style::default().fg(color)),
        ]))
        .wrap(Wrap { trim: true });
        f.render_widget(status, chunks[3]);
    }
}

fn draw_history(f: &mut Frame, app: &mut App, area: Rect) {
    if app.address().is_none() {
        let notice = Paragraph::new(Line::from(Span::styled(
            "Please connect your wallet to view transactions.",
            Style::default().fg(Color::DarkGray),
        )))
        .block(Block::default().borders(Borders::ALL).title(" Recent Transactions "));
        f.render_widget(notice, area);
        return;
    }

    if let Some(ref error) = app.history_error {
        let notice = Paragraph::new(Line::from(vec![
            Span::styled("✗ ", Style::default().fg(Color::Red)),
            Span::styled(error.as_str(), Style::default().fg(Color::Red)),
        ]))
        .block(Block::default().borders(Borders::ALL).title(" Recent Transactions "));
        f.render_widget(notice, area);
        return;
    }

    if app.history.is_empty() {
        let notice = Paragraph::new(Line::from(Span::styled(
            "No transactions found.",
            Style::default().fg(Color::DarkGray),
        )))
        .block(Block::default().borders(Borders::ALL).title(" Recent Transactions "));
        f.render_widget(notice, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Table
            Constraint::Length(3), // Explorer link
        ])
        .split(area);

    let header = Row::new(vec![
        Cell::from("Signature").style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        Cell::from("Amount (SOL)").style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        Cell::from("Timestamp").style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        Cell::from("Status").style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
    ])
    .height(1)
    .bottom_margin(1);

    let rows: Vec<Row> = app
        .history
        .iter()
        .map(|record| {
            let status_color = match record.outcome {
                crate::ledger::history::Outcome::Success => Color::Green,
                crate::ledger::history::Outcome::Failed => Color::Red,
            };
            Row::new(vec![
                Cell::from(short_signature(&record.signature)),
                Cell::from(format!("{}", record.amount_sol)),
                Cell::from(record.timestamp.format("%b %e, %Y %H:%M:%S UTC").to_string()),
                Cell::from(record.outcome.label()).style(Style::default().fg(status_color)),
            ])
        })
        .collect();

    let total = app.history.len();
    let selected_idx = app.history_state.selected().map(|i| i + 1).unwrap_or(0);
    let widths = [
        Constraint::Percentage(25),
        Constraint::Percentage(15),
        Constraint::Percentage(40),
        Constraint::Percentage(20),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(format!(" Recent Transactions ({}/{}) ", selected_idx, total)))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    f.render_stateful_widget(table, chunks[0], &mut app.history_state);

    let link = app
        .selected_explorer_url()
        .unwrap_or_else(|| "-".to_string());
    let link_widget = Paragraph::new(Line::from(Span::styled(
        link,
        Style::default().fg(Color::Cyan),
    )))
    .block(Block::default().borders(Borders::ALL).title(" Explorer "));
    f.render_widget(link_widget, chunks[1]);
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let help_text = if app.loading {
        "Loading...".to_string()
    } else {
        match app.current_view {
            View::Wallet => {
                " c:Connect/Disconnect  r:Refresh  Tab:Next View  q:Quit ".to_string()
            }
            View::Send => {
                if app.submit_in_flight() {
                    " Submitting...  ←/→:Tabs ".to_string()
                } else {
                    " ↑/↓:Fields  Enter:Send  Esc:Clear  ←/→:Tabs ".to_string()
                }
            }
            View::History => {
                " ↑/↓:Select Row  r:Refresh  q:Quit ".to_string()
            }
        }
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    // Left: context-sensitive help
    let help_style = if app.loading {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let help = Paragraph::new(Line::from(Span::styled(help_text, help_style)))
        .block(Block::default().borders(Borders::ALL).title(" Keys "));

    // Right: global info
    let info = format!(" {} | {} transfers ", app.network, app.history.len());
    let info_widget = Paragraph::new(Line::from(Span::styled(info, Style::default().fg(Color::DarkGray))))
        .block(Block::default().borders(Borders::ALL).title(" Info "));

    f.render_widget(help, chunks[0]);
    f.render_widget(info_widget, chunks[1]);
}
