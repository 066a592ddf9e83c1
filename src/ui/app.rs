//! Application State and Logic
//!
//! This module defines the core application state for the terminal wallet.
//! It manages:
//!
//! - The wallet session and its connect/disconnect toggle
//! - Balance, price, and history data loaded from the ledger
//! - Send form state and the background submission task
//! - View management and user input handling
//!
//! The `App` struct is the central state container, and `run_app` is the
//! main event loop that processes user input, drains submission progress,
//! and updates the UI.

use std::io::Stdout;
use std::sync::Arc;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{backend::CrosstermBackend, widgets::TableState, Terminal};
use solana_sdk::pubkey::Pubkey;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::ledger::history::{self, TransferRecord, HISTORY_LIMIT};
use crate::ledger::{lamports_to_sol, Ledger, LedgerClient, Network};
use crate::price::PriceClient;
use crate::transfer::{self, SubmissionStatus};
use crate::wallet::KeypairWallet;

pub type AppResult<T> = Result<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Wallet,
    Send,
    History,
}

impl View {
    pub fn all() -> Vec<View> {
        vec![View::Wallet, View::Send, View::History]
    }

    pub fn title(&self) -> &'static str {
        match self {
            View::Wallet => "Wallet",
            View::Send => "Send",
            View::History => "History",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SendForm {
    pub recipient: String,
    pub amount: String,
    pub selected_field: usize,
    pub status: SubmissionStatus,
}

pub struct App {
    pub client: Arc<LedgerClient>,
    pub price: PriceClient,
    pub network: Network,
    pub current_view: View,
    pub running: bool,

    // Wallet session
    wallet: Option<Arc<KeypairWallet>>,
    pub connected: bool,

    // Wallet view
    pub balance_lamports: u64,
    pub sol_price: f64,

    // Send view
    pub send_form: SendForm,
    submit_updates: Option<UnboundedReceiver<SubmissionStatus>>,

    // History view
    pub history: Vec<TransferRecord>,
    pub history_state: TableState,
    pub history_error: Option<String>,

    // Status
    pub status_message: Option<String>,
    pub loading: bool,
}

impl App {
    pub fn new(
        client: LedgerClient,
        price: PriceClient,
        wallet: Option<KeypairWallet>,
        network: Network,
    ) -> Self {
        // auto-connect when a keypair is present
        let connected = wallet.is_some();
        Self {
            client: Arc::new(client),
            price,
            network,
            current_view: View::Wallet,
            running: true,
            wallet: wallet.map(Arc::new),
            connected,
            balance_lamports: 0,
            sol_price: 0.0,
            send_form: SendForm::default(),
            submit_updates: None,
            history: Vec::new(),
            history_state: TableState::default(),
            history_error: None,
            status_message: None,
            loading: false,
        }
    }

    pub fn has_keypair(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn address(&self) -> Option<Pubkey> {
        if self.connected {
            self.wallet.as_ref().map(|wallet| wallet.address())
        } else {
            None
        }
    }

    pub fn sol_balance(&self) -> f64 {
        lamports_to_sol(self.balance_lamports)
    }

    /// Fiat value is a plain product; a zero price degrades it to zero.
    pub fn usd_balance(&self) -> f64 {
        self.sol_balance() * self.sol_price
    }

    pub fn submit_in_flight(&self) -> bool {
        self.send_form.status.is_in_flight()
    }

    /// Reloads balance, price, and history. The three fetches are
    /// independent and run concurrently; each failure degrades on its own
    /// (stale balance plus a status line, zero price, an empty history with
    /// one error line) without aborting the others.
    pub async fn refresh(&mut self) {
        let Some(address) = self.address() else {
            return;
        };
        self.loading = true;
        self.status_message = None;
        self.history_error = None;

        let (balance, price, records) = tokio::join!(
            self.client.balance(&address),
            self.price.sol_usd(),
            history::load_recent_transfers(self.client.as_ref(), &address, HISTORY_LIMIT),
        );

        match balance {
            Ok(lamports) => self.balance_lamports = lamports,
            Err(err) => self.status_message = Some(format!("Error fetching balance: {}", err)),
        }

        self.sol_price = price;

        match records {
            Ok(records) => {
                let selected = if records.is_empty() { None } else { Some(0) };
                self.history = records;
                self.history_state.select(selected);
            }
            Err(_) => {
                self.history.clear();
                self.history_state.select(None);
                self.history_error = Some("Failed to fetch transactions".to_string());
            }
        }

        self.loading = false;
    }

    /// The TUI stand-in for the wallet-adapter connect button.
    pub fn toggle_connection(&mut self) {
        if self.connected {
            self.connected = false;
            self.balance_lamports = 0;
            self.sol_price = 0.0;
            self.history.clear();
            self.history_state.select(None);
            self.history_error = None;
            self.status_message = None;
        } else if self.wallet.is_some() {
            self.connected = true;
        } else {
            self.status_message =
                Some("No keypair available; restart with --keypair PATH".to_string());
        }
    }

    /// Spawns the submission flow on a background task. Progress arrives
    /// over a channel drained by the event loop, so `Sending` and `Sent`
    /// render while the flow is still running. Refused while a previous
    /// submission is in flight.
    pub fn execute_send(&mut self) {
        // a live update channel means a task was spawned and has not yet
        // reached a terminal state, even if `Sending` has not arrived
        if self.submit_in_flight() || self.submit_updates.is_some() {
            return;
        }

        let (updates, receiver) = mpsc::unbounded_channel();
        let ledger = Arc::clone(&self.client);
        let session = if self.connected { self.wallet.clone() } else { None };
        let recipient = self.send_form.recipient.clone();
        let amount = self.send_form.amount.clone();

        tokio::spawn(async move {
            let progress = updates.clone();
            let outcome = transfer::submit_transfer(
                ledger.as_ref(),
                session.as_deref(),
                &recipient,
                &amount,
                move |status| {
                    let _ = progress.send(status.clone());
                },
            )
            .await;
            let _ = updates.send(outcome);
        });

        self.submit_updates = Some(receiver);
    }

    /// Applies any progress the submission task has reported. Returns true
    /// when a submission just reached its terminal state, which re-enables
    /// the submit control.
    pub fn drain_submit_updates(&mut self) -> bool {
        let Some(receiver) = self.submit_updates.as_mut() else {
            return false;
        };
        let mut finished = false;
        while let Ok(status) = receiver.try_recv() {
            finished = status.is_terminal();
            self.send_form.status = status;
        }
        if finished {
            self.submit_updates = None;
        }
        finished
    }

    pub fn next_view(&mut self) {
        let views = View::all();
        let idx = views
            .iter()
            .position(|v| *v == self.current_view)
            .unwrap_or(0);
        self.current_view = views[(idx + 1) % views.len()];
    }

    pub fn prev_view(&mut self) {
        let views = View::all();
        let idx = views
            .iter()
            .position(|v| *v == self.current_view)
            .unwrap_or(0);
        self.current_view = views[(idx + views.len() - 1) % views.len()];
    }

    pub fn goto_view(&mut self, index: usize) {
        let views = View::all();
        if index < views.len() {
            self.current_view = views[index];
        }
    }

    pub fn select_next(&mut self) {
        match self.current_view {
            View::Send => {
                self.send_form.selected_field = (self.send_form.selected_field + 1) % 2;
            }
            View::History => {
                let i = self.history_state.selected().unwrap_or(0);
                if i + 1 < self.history.len() {
                    self.history_state.select(Some(i + 1));
                }
            }
            View::Wallet => {}
        }
    }

    pub fn select_prev(&mut self) {
        match self.current_view {
            View::Send => {
                self.send_form.selected_field = (self.send_form.selected_field + 1) % 2;
            }
            View::History => {
                let i = self.history_state.selected().unwrap_or(0);
                if i > 0 {
                    self.history_state.select(Some(i - 1));
                }
            }
            View::Wallet => {}
        }
    }

    pub fn handle_char(&mut self, c: char) {
        if self.current_view == View::Send && !self.submit_in_flight() {
            let field = match self.send_form.selected_field {
                0 => &mut self.send_form.recipient,
                1 => &mut self.send_form.amount,
                _ => return,
            };
            field.push(c);
        }
    }

    pub fn handle_backspace(&mut self) {
        if self.current_view == View::Send && !self.submit_in_flight() {
            let field = match self.send_form.selected_field {
                0 => &mut self.send_form.recipient,
                1 => &mut self.send_form.amount,
                _ => return,
            };
            field.pop();
        }
    }

    /// Block-explorer link for the selected history row.
    pub fn selected_explorer_url(&self) -> Option<String> {
        let index = self.history_state.selected()?;
        let record = self.history.get(index)?;
        Some(self.network.explorer_tx_url(&record.signature))
    }
}

pub async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut app: App,
) -> AppResult<()> {
    // Initial data load - errors surface as status strings, never abort the UI
    app.refresh().await;

    loop {
        if app.drain_submit_updates() {
            // a finished transfer changes the balance and the history
            app.refresh().await;
        }

        terminal.draw(|f| super::views::draw(f, &mut app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    // Handle Ctrl+C
                    if key.modifiers.contains(KeyModifiers::CONTROL)
                        && key.code == KeyCode::Char('c')
                    {
                        app.running = false;
                        continue;
                    }

                    match key.code {
                        KeyCode::Esc => {
                            // Esc clears the form in Send view, quits elsewhere
                            if app.current_view == View::Send {
                                if !app.submit_in_flight() {
                                    app.send_form = SendForm::default();
                                }
                            } else {
                                app.running = false;
                            }
                        }
                        KeyCode::Tab | KeyCode::Right => {
                            app.next_view();
                        }
                        KeyCode::BackTab | KeyCode::Left => {
                            app.prev_view();
                        }
                        // Number keys for direct tab access (not while typing)
                        KeyCode::Char('1') if app.current_view != View::Send => {
                            app.goto_view(0);
                        }
                        KeyCode::Char('2') if app.current_view != View::Send => {
                            app.goto_view(1);
                        }
                        KeyCode::Char('3') if app.current_view != View::Send => {
                            app.goto_view(2);
                        }
                        KeyCode::Down => app.select_next(),
                        KeyCode::Up => app.select_prev(),
                        KeyCode::Enter => {
                            if app.current_view == View::Send {
                                app.execute_send();
                            }
                        }
                        KeyCode::Char('q') if app.current_view != View::Send => {
                            app.running = false;
                        }
                        KeyCode::Char('r') if app.current_view != View::Send => {
                            app.refresh().await;
                        }
                        KeyCode::Char('c') if app.current_view != View::Send => {
                            app.toggle_connection();
                            if app.connected {
                                app.refresh().await;
                            }
                        }
                        // Text input for the Send form
                        KeyCode::Char(c) => app.handle_char(c),
                        KeyCode::Backspace => app.handle_backspace(),
                        _ => {}
                    }
                }
            }
        }

        if !app.running {
            return Ok(());
        }
    }
}
