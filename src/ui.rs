use anyhow::Result;
use applemar_planner::aggregation::{
    allocation_shares, department_rollup, monthly_burn_rate, portfolio_summary, summarize,
    total_asset_value, RiskBand,
};
use applemar_planner::currency::{format_decimal, format_kz, format_performance, format_ratio};
use applemar_planner::forms::{BudgetField, BudgetForm, InvestmentField, InvestmentForm};
use applemar_planner::models::{BudgetEntry, Investment};
use applemar_planner::risk::{RiskDesk, SessionStatus};
use applemar_planner::state::{AppState, StateChange, StateObserver, SubscriptionId};
use applemar_planner::store::Event as AuditEvent;
use applemar_planner::view::{View, ViewSelector};
use applemar_planner::export;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const TICK: Duration = Duration::from_millis(200);

/// Remembers the most recent committed change so the loop can react to it
#[derive(Default)]
struct ChangeTracker {
    last: Mutex<Option<StateChange>>,
}

impl ChangeTracker {
    fn take(&self) -> Option<StateChange> {
        self.last.lock().ok().and_then(|mut last| last.take())
    }
}

impl StateObserver for ChangeTracker {
    fn on_change(&self, change: &StateChange) {
        if let Ok(mut last) = self.last.lock() {
            *last = Some(change.clone());
        }
    }
}

enum Mode {
    Browse,
    Budget(BudgetForm),
    Investment(InvestmentForm),
}

pub struct App {
    pub state: AppState,
    pub views: ViewSelector,
    pub desk: RiskDesk,
    pub budgets_state: TableState,
    pub investments_state: TableState,
    pub show_detail: bool,
    pub status: Option<String>,
    export_dir: PathBuf,
    mode: Mode,
    tracker: Arc<ChangeTracker>,
    subscription: SubscriptionId,
}

impl App {
    pub fn new(mut state: AppState, desk: RiskDesk, export_dir: PathBuf) -> Self {
        let tracker = Arc::new(ChangeTracker::default());
        let subscription = state.subscribe(tracker.clone());

        let mut app = Self {
            state,
            views: ViewSelector::new(),
            desk,
            budgets_state: TableState::default(),
            investments_state: TableState::default(),
            show_detail: false,
            status: None,
            export_dir,
            mode: Mode::Browse,
            tracker,
            subscription,
        };
        app.sync_selection();
        app
    }

    /// Drain background results and state notifications. Called every tick.
    pub fn refresh(&mut self) {
        self.desk.poll();

        if let Some(change) = self.tracker.take() {
            if !change.persisted {
                self.status =
                    Some("Storage unavailable - change kept for this session only".into());
            }
            self.sync_selection();
        }
    }

    fn sync_selection(&mut self) {
        clamp_selection(&mut self.budgets_state, self.state.budgets().len());
        clamp_selection(&mut self.investments_state, self.state.investments().len());
    }

    pub fn selected_budget(&self) -> Option<&BudgetEntry> {
        self.budgets_state
            .selected()
            .and_then(|i| self.state.budgets().get(i))
    }

    pub fn selected_investment(&self) -> Option<&Investment> {
        self.investments_state
            .selected()
            .and_then(|i| self.state.investments().get(i))
    }

    pub fn is_editing(&self) -> bool {
        !matches!(self.mode, Mode::Browse)
    }

    /// Returns true when the app should exit
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        if matches!(self.mode, Mode::Budget(_)) {
            self.handle_budget_form_key(key);
        } else if matches!(self.mode, Mode::Investment(_)) {
            self.handle_investment_form_key(key);
        } else {
            return self.handle_browse_key(key);
        }
        false
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> bool {
        let view = self.views.current();

        match key.code {
            KeyCode::Esc if self.views.reset_pending() => {
                self.views.cancel_reset();
                self.status = Some("Reset cancelled".into());
            }
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.switch_view(view.previous());
                } else {
                    self.switch_view(view.next());
                }
            }
            KeyCode::BackTab => self.switch_view(view.previous()),
            KeyCode::Char(c @ '1'..='5') => {
                if let Some(v) = View::from_shortcut(c) {
                    self.switch_view(v);
                }
            }
            KeyCode::Enter if matches!(view, View::Planning | View::Investments) => {
                self.show_detail = !self.show_detail;
            }
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            _ => match view {
                View::Planning => self.handle_planning_key(key.code),
                View::Investments => self.handle_investments_key(key.code),
                View::Risk => self.handle_risk_key(key.code),
                View::Erp => self.handle_erp_key(key.code),
                View::Dashboard => {}
            },
        }
        false
    }

    /// Analysis belongs to the Risk view: it starts when the view is
    /// entered and is thrown away when the view is left.
    pub fn switch_view(&mut self, target: View) {
        let from = self.views.current();
        self.views.select(target);

        if from == target {
            return;
        }
        if from == View::Risk {
            self.desk.discard();
        }
        if target == View::Risk {
            self.desk.request_analysis(self.state.snapshot());
        }
    }

    fn move_selection(&mut self, delta: i64) {
        match self.views.current() {
            View::Planning => step(&mut self.budgets_state, self.state.budgets().len(), delta),
            View::Investments => {
                step(&mut self.investments_state, self.state.investments().len(), delta)
            }
            _ => {}
        }
    }

    fn handle_planning_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('a') => self.mode = Mode::Budget(BudgetForm::new()),
            KeyCode::Char('e') => {
                if let Some(entry) = self.selected_budget() {
                    self.mode = Mode::Budget(BudgetForm::edit(entry));
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.selected_budget().map(|b| b.id.clone()) {
                    self.state.remove_budget(&id);
                    self.status = Some("Budget entry removed".into());
                }
            }
            _ => {}
        }
    }

    fn handle_investments_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('a') => self.mode = Mode::Investment(InvestmentForm::new()),
            KeyCode::Char('e') => {
                if let Some(inv) = self.selected_investment() {
                    self.mode = Mode::Investment(InvestmentForm::edit(inv));
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.selected_investment().map(|i| i.id.clone()) {
                    self.state.remove_investment(&id);
                    self.status = Some("Investment removed".into());
                }
            }
            _ => {}
        }
    }

    fn handle_risk_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('r') => {
                self.desk.request_analysis(self.state.snapshot());
                self.status = Some("Risk analysis requested".into());
            }
            KeyCode::Char('p') => {
                self.desk.request_projection(self.state.budgets().to_vec());
                self.status = Some("Projection requested".into());
            }
            _ => {}
        }
    }

    fn handle_erp_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('R') => {
                self.views.request_reset();
            }
            KeyCode::Char('y') => {
                if self.views.confirm_reset() {
                    self.state.reset_all();
                    self.status = Some("All data restored to defaults".into());
                }
            }
            KeyCode::Char('n') => self.views.cancel_reset(),
            KeyCode::Char('x') => {
                match export::export_all(
                    &self.export_dir,
                    self.state.budgets(),
                    self.state.investments(),
                ) {
                    Ok((budgets, investments)) => {
                        self.status = Some(format!(
                            "Exported {} and {}",
                            budgets.display(),
                            investments.display()
                        ));
                    }
                    Err(e) => {
                        warn!(error = %e, "export failed");
                        self.status = Some(format!("Export failed: {e}"));
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_budget_form_key(&mut self, key: KeyEvent) {
        let Mode::Budget(form) = &mut self.mode else {
            return;
        };

        match key.code {
            KeyCode::Esc => self.mode = Mode::Browse,
            KeyCode::Tab => form.next_field(),
            KeyCode::Left | KeyCode::Right => form.cycle_choice(),
            KeyCode::Backspace => form.pop_char(),
            KeyCode::Char(' ')
                if matches!(form.focus, BudgetField::Department | BudgetField::Category) =>
            {
                form.cycle_choice()
            }
            KeyCode::Char(c) => form.push_char(c),
            KeyCode::Enter => match form.submit() {
                Ok(entry) if form.editing.is_some() => {
                    self.state.update_budget(entry);
                    self.mode = Mode::Browse;
                    self.status = Some("Budget entry updated".into());
                }
                Ok(entry) => {
                    form.clear_amount();
                    self.state.add_budget(entry);
                    self.budgets_state.select(Some(0));
                    self.status = Some("Budget entry added".into());
                }
                Err(e) => self.status = Some(e.to_string()),
            },
            _ => {}
        }
    }

    fn handle_investment_form_key(&mut self, key: KeyEvent) {
        let Mode::Investment(form) = &mut self.mode else {
            return;
        };

        match key.code {
            KeyCode::Esc => self.mode = Mode::Browse,
            KeyCode::Tab => form.next_field(),
            KeyCode::Left | KeyCode::Right => form.cycle_choice(),
            KeyCode::Backspace => form.pop_char(),
            KeyCode::Char(' ') if form.focus == InvestmentField::Kind => form.cycle_choice(),
            KeyCode::Char(c) => form.push_char(c),
            KeyCode::Enter => match form.submit() {
                Ok(inv) => {
                    let editing = form.editing.is_some();
                    if editing {
                        self.state.update_investment(inv);
                    } else {
                        self.state.add_investment(inv);
                        self.investments_state.select(Some(0));
                    }
                    self.mode = Mode::Browse;
                    self.status = Some(if editing {
                        "Investment updated".into()
                    } else {
                        "Investment added".into()
                    });
                }
                Err(e) => self.status = Some(e.to_string()),
            },
            _ => {}
        }
    }

    fn history(&self, entity_type: &str, entity_id: &str) -> Vec<AuditEvent> {
        match self.state.store().events_for_entity(entity_type, entity_id) {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, entity_id, "could not read history");
                Vec::new()
            }
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.state.unsubscribe(self.subscription);
    }
}

fn clamp_selection(state: &mut TableState, len: usize) {
    match state.selected() {
        _ if len == 0 => state.select(None),
        Some(i) if i >= len => state.select(Some(len - 1)),
        None => state.select(Some(0)),
        _ => {}
    }
}

/// Move by `delta` rows, wrapping at both ends
fn step(state: &mut TableState, len: usize, delta: i64) {
    if len == 0 {
        return;
    }
    let current = state.selected().unwrap_or(0) as i64;
    let next = (current + delta).rem_euclid(len as i64);
    state.select(Some(next as usize));
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.map_err(Into::into)
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        app.refresh();
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(TICK)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.views.current() {
        View::Dashboard => render_dashboard(f, chunks[1], app),
        View::Planning => render_planning(f, chunks[1], app),
        View::Risk => render_risk(f, chunks[1], app),
        View::Investments => render_investments(f, chunks[1], app),
        View::Erp => render_erp(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn bordered(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title)
}

fn header_style() -> Style {
    Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD)
}

fn highlight() -> Style {
    Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD)
}

fn amount_color(value: f64) -> Color {
    if value < 0.0 {
        Color::Red
    } else {
        Color::Green
    }
}

fn band_color(band: RiskBand) -> Color {
    match band {
        RiskBand::Low => Color::Green,
        RiskBand::Moderate => Color::Yellow,
        RiskBand::High => Color::Red,
    }
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    Row::new(
        titles
            .iter()
            .map(|h| Cell::from(*h).style(header_style())),
    )
    .style(Style::default().bg(Color::DarkGray))
    .height(1)
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let summary = summarize(app.state.budgets());

    let mut tab_spans = vec![];
    for (i, view) in View::ALL.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *view == app.views.current() {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(format!("{} {}", i + 1, view.title()), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Net: {}", format_kz(summary.net_income)),
        Style::default().fg(amount_color(summary.net_income)),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Applemar "),
    );

    f.render_widget(header, area);
}

// ============================================================================
// DASHBOARD
// ============================================================================

fn render_dashboard(f: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(0)])
        .split(area);

    let budgets = app.state.budgets();
    let investments = app.state.investments();
    let summary = summarize(budgets);

    let kpis = vec![
        Line::from(vec![
            Span::raw("Revenue       "),
            Span::styled(format_kz(summary.total_revenue), Style::default().fg(Color::Green)),
            Span::raw("     Expenses   "),
            Span::styled(format_kz(summary.total_expense), Style::default().fg(Color::Red)),
        ]),
        Line::from(vec![
            Span::raw("Net income    "),
            Span::styled(
                format_kz(summary.net_income),
                Style::default().fg(amount_color(summary.net_income)),
            ),
            Span::raw("     Margin     "),
            Span::raw(format_ratio(summary.margin)),
        ]),
        Line::from(vec![
            Span::raw("Burn / month  "),
            Span::raw(format_kz(monthly_burn_rate(budgets))),
            Span::raw("     Assets     "),
            Span::styled(
                format_kz(total_asset_value(investments)),
                Style::default().fg(Color::Cyan),
            ),
        ]),
    ];

    f.render_widget(Paragraph::new(kpis).block(bordered(" Overview ")), rows[0]);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[1]);

    let dept_rows = department_rollup(budgets).into_iter().map(|d| {
        let net = d.net();
        Row::new(vec![
            Cell::from(d.department.as_str()),
            Cell::from(format_kz(d.revenue)).style(Style::default().fg(Color::Green)),
            Cell::from(format_kz(d.expense)).style(Style::default().fg(Color::Red)),
            Cell::from(format_kz(net)).style(Style::default().fg(amount_color(net))),
        ])
    });

    let dept_table = Table::new(
        dept_rows,
        [
            Constraint::Length(16),
            Constraint::Length(20),
            Constraint::Length(20),
            Constraint::Length(20),
        ],
    )
    .header(header_row(&["Department", "Revenue", "Expense", "Net"]))
    .block(bordered(" By department "));

    f.render_widget(dept_table, cols[0]);

    let alloc_rows = allocation_shares(investments).into_iter().map(|s| {
        Row::new(vec![
            Cell::from(truncate(&s.name, 26)),
            Cell::from(format_kz(s.current_value)),
            Cell::from(format_ratio(Some(s.share))).style(Style::default().fg(Color::Cyan)),
        ])
    });

    let alloc_table = Table::new(
        alloc_rows,
        [
            Constraint::Length(28),
            Constraint::Length(20),
            Constraint::Length(8),
        ],
    )
    .header(header_row(&["Asset", "Value", "Share"]))
    .block(bordered(" Allocation "));

    f.render_widget(alloc_table, cols[1]);
}

// ============================================================================
// PLANNING
// ============================================================================

fn render_planning(f: &mut Frame, area: Rect, app: &mut App) {
    let (main, side) = split_side(area, app.is_editing() || app.show_detail);

    let rows: Vec<Row> = app
        .state
        .budgets()
        .iter()
        .map(|b| {
            let color = if b.is_revenue() { Color::Green } else { Color::Red };
            Row::new(vec![
                Cell::from(b.period.clone()),
                Cell::from(b.department.as_str()),
                Cell::from(b.category.as_str()).style(Style::default().fg(color)),
                Cell::from(format_kz(b.amount)).style(Style::default().fg(color)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(9),
            Constraint::Length(16),
            Constraint::Length(9),
            Constraint::Length(22),
        ],
    )
    .header(header_row(&["Period", "Department", "Category", "Amount"]))
    .block(bordered(" Budget entries "))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, main, &mut app.budgets_state);

    if let Some(side) = side {
        match &app.mode {
            Mode::Budget(form) => render_budget_form(f, side, form),
            _ => render_budget_detail(f, side, app),
        }
    }
}

fn render_budget_form(f: &mut Frame, area: Rect, form: &BudgetForm) {
    let title = if form.editing.is_some() {
        " Edit budget entry "
    } else {
        " New budget entry "
    };

    let lines = vec![
        form_line("Department", form.department.as_str(), form.focus == BudgetField::Department),
        form_line("Category", form.category.as_str(), form.focus == BudgetField::Category),
        form_line("Amount (Kz)", &form.amount, form.focus == BudgetField::Amount),
        form_line("Period", &form.period, form.focus == BudgetField::Period),
        Line::from(""),
        Line::from(Span::styled(
            "Tab field · ←/→ choose · Enter save · Esc close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    f.render_widget(Paragraph::new(lines).block(bordered(title)), area);
}

fn render_budget_detail(f: &mut Frame, area: Rect, app: &App) {
    let Some(entry) = app.selected_budget() else {
        f.render_widget(
            Paragraph::new("No entry selected").block(bordered(" Detail ")),
            area,
        );
        return;
    };

    let mut lines = vec![
        detail_line("ID", &entry.id),
        detail_line("Department", entry.department.as_str()),
        detail_line("Category", entry.category.as_str()),
        detail_line("Period", &entry.period),
        detail_line("Amount", &format_kz(entry.amount)),
    ];
    lines.extend(history_lines(&app.history("budget", &entry.id)));

    f.render_widget(
        Paragraph::new(lines)
            .block(bordered(" Detail "))
            .wrap(Wrap { trim: true }),
        area,
    );
}

// ============================================================================
// RISK
// ============================================================================

fn render_risk(f: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(9),
        ])
        .split(area);

    let session = app.desk.risk();

    match (session.status(), session.result()) {
        (SessionStatus::Loading, _) => {
            f.render_widget(
                Paragraph::new("Analysing the portfolio...")
                    .style(Style::default().fg(Color::Yellow))
                    .block(bordered(" Risk score ")),
                rows[0],
            );
        }
        (_, Some(analysis)) => {
            let score = analysis.display_score();
            let band = RiskBand::from_score(score);
            let gauge = Gauge::default()
                .block(bordered(" Risk score "))
                .gauge_style(Style::default().fg(band_color(band)))
                .ratio(score / 100.0)
                .label(format!("{} / 100 ({})", format_decimal(score, 0), band.as_str()));
            f.render_widget(gauge, rows[0]);
        }
        (_, None) => {
            f.render_widget(
                Paragraph::new("No analysis yet - press r to analyse")
                    .style(Style::default().fg(Color::DarkGray))
                    .block(bordered(" Risk score ")),
                rows[0],
            );
        }
    }

    let mut body: Vec<Line> = Vec::new();
    if let Some(err) = session.last_error() {
        body.push(Line::from(Span::styled(
            format!("Analysis failed: {err}"),
            Style::default().fg(Color::Red),
        )));
        body.push(Line::from(""));
    }

    if let Some(analysis) = session.result() {
        body.push(Line::from(Span::styled("Critical issues", header_style())));
        body.extend(
            analysis
                .critical_issues
                .iter()
                .map(|i| Line::from(format!("  • {i}"))),
        );
        body.push(Line::from(""));
        body.push(Line::from(Span::styled("Recommendations", header_style())));
        body.extend(
            analysis
                .recommendations
                .iter()
                .map(|r| Line::from(format!("  • {r}"))),
        );
        body.push(Line::from(""));
        body.push(Line::from(Span::styled("Market outlook", header_style())));
        body.push(Line::from(analysis.market_outlook.clone()));
    }

    f.render_widget(
        Paragraph::new(body)
            .block(bordered(" Assessment "))
            .wrap(Wrap { trim: true }),
        rows[1],
    );

    render_projections(f, rows[2], app);
}

fn render_projections(f: &mut Frame, area: Rect, app: &App) {
    let session = app.desk.projections();

    let title = match session.status() {
        SessionStatus::Loading => " Projections (loading) ",
        SessionStatus::Failed => " Projections (last request failed) ",
        _ => " Projections ",
    };

    let rows: Vec<Row> = session
        .result()
        .map(|points| {
            points
                .iter()
                .map(|p| {
                    Row::new(vec![
                        Cell::from(p.month.clone()),
                        Cell::from(format_kz(p.projected_revenue))
                            .style(Style::default().fg(Color::Green)),
                        Cell::from(format_kz(p.projected_expense))
                            .style(Style::default().fg(Color::Red)),
                        Cell::from(format_ratio(Some(p.confidence))),
                    ])
                })
                .collect()
        })
        .unwrap_or_default();

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(22),
            Constraint::Length(22),
            Constraint::Length(10),
        ],
    )
    .header(header_row(&["Month", "Revenue", "Expense", "Confidence"]))
    .block(bordered(title));

    f.render_widget(table, area);
}

// ============================================================================
// INVESTMENTS
// ============================================================================

fn render_investments(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let portfolio = portfolio_summary(app.state.investments());
    let summary = Line::from(vec![
        Span::raw("Invested "),
        Span::raw(format_kz(portfolio.invested)),
        Span::raw("   Value "),
        Span::styled(format_kz(portfolio.current_value), Style::default().fg(Color::Cyan)),
        Span::raw("   Gain "),
        Span::styled(
            format_kz(portfolio.gain),
            Style::default().fg(amount_color(portfolio.gain)),
        ),
        Span::raw("   Return "),
        Span::raw(format_ratio(portfolio.return_ratio)),
    ]);
    f.render_widget(Paragraph::new(summary).block(bordered(" Portfolio ")), rows[0]);

    let (main, side) = split_side(rows[1], app.is_editing() || app.show_detail);

    let table_rows: Vec<Row> = app
        .state
        .investments()
        .iter()
        .map(|i| {
            let gain = i.gain();
            Row::new(vec![
                Cell::from(truncate(&i.name, 28)),
                Cell::from(i.kind.as_str()),
                Cell::from(format_kz(i.amount)),
                Cell::from(format_kz(i.current_value)),
                Cell::from(format_kz(gain)).style(Style::default().fg(amount_color(gain))),
                Cell::from(format_performance(i.performance))
                    .style(Style::default().fg(amount_color(i.performance))),
            ])
        })
        .collect();

    let table = Table::new(
        table_rows,
        [
            Constraint::Length(30),
            Constraint::Length(12),
            Constraint::Length(20),
            Constraint::Length(20),
            Constraint::Length(20),
            Constraint::Length(8),
        ],
    )
    .header(header_row(&["Name", "Type", "Invested", "Value", "Gain", "Perf"]))
    .block(bordered(" Positions "))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, main, &mut app.investments_state);

    if let Some(side) = side {
        match &app.mode {
            Mode::Investment(form) => render_investment_form(f, side, form),
            _ => render_investment_detail(f, side, app),
        }
    }
}

fn render_investment_form(f: &mut Frame, area: Rect, form: &InvestmentForm) {
    let title = if form.editing.is_some() {
        " Edit investment "
    } else {
        " New investment "
    };

    let lines = vec![
        form_line("Name", &form.name, form.focus == InvestmentField::Name),
        form_line("Type", form.kind.as_str(), form.focus == InvestmentField::Kind),
        form_line("Invested (Kz)", &form.amount, form.focus == InvestmentField::Amount),
        form_line(
            "Current value (Kz)",
            &form.current_value,
            form.focus == InvestmentField::CurrentValue,
        ),
        form_line(
            "Performance (%)",
            &form.performance,
            form.focus == InvestmentField::Performance,
        ),
        Line::from(""),
        Line::from(Span::styled(
            "Blank performance is derived from the two values",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            "Tab field · ←/→ choose · Enter save · Esc close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    f.render_widget(Paragraph::new(lines).block(bordered(title)), area);
}

fn render_investment_detail(f: &mut Frame, area: Rect, app: &App) {
    let Some(inv) = app.selected_investment() else {
        f.render_widget(
            Paragraph::new("No position selected").block(bordered(" Detail ")),
            area,
        );
        return;
    };

    let mut lines = vec![
        detail_line("ID", &inv.id),
        detail_line("Name", &inv.name),
        detail_line("Type", inv.kind.as_str()),
        detail_line("Invested", &format_kz(inv.amount)),
        detail_line("Value", &format_kz(inv.current_value)),
        detail_line("Gain", &format_kz(inv.gain())),
        detail_line("Performance", &format_performance(inv.performance)),
    ];
    lines.extend(history_lines(&app.history("investment", &inv.id)));

    f.render_widget(
        Paragraph::new(lines)
            .block(bordered(" Detail "))
            .wrap(Wrap { trim: true }),
        area,
    );
}

// ============================================================================
// ERP
// ============================================================================

fn render_erp(f: &mut Frame, area: Rect, app: &App) {
    let mut lines = vec![
        Line::from(Span::styled("Records", header_style())),
        detail_line("Budget entries", &app.state.budgets().len().to_string()),
        detail_line("Investments", &app.state.investments().len().to_string()),
        detail_line("Export folder", &app.export_dir.display().to_string()),
        Line::from(""),
        Line::from(vec![
            Span::styled("x", Style::default().fg(Color::Yellow)),
            Span::raw(" export budgets.csv and investments.csv"),
        ]),
        Line::from(vec![
            Span::styled("R", Style::default().fg(Color::Red)),
            Span::raw(" restore the default dataset"),
        ]),
    ];

    if app.views.reset_pending() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Replace ALL budgets and investments with the defaults? (y/n)",
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
        )));
    }

    f.render_widget(Paragraph::new(lines).block(bordered(" ERP ")), area);
}

// ============================================================================
// SHARED
// ============================================================================

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![];

    if let Some(status) = &app.status {
        status_spans.push(Span::styled(
            format!(" {status} "),
            Style::default().fg(Color::Cyan),
        ));
        status_spans.push(Span::raw(" | "));
    }

    let keys: &[(&str, &str)] = match (app.is_editing(), app.views.current()) {
        (true, _) => &[("Tab", "Field"), ("Enter", "Save"), ("Esc", "Close")],
        (false, View::Planning) | (false, View::Investments) => &[
            ("a", "Add"),
            ("e", "Edit"),
            ("d", "Delete"),
            ("Enter", "Details"),
            ("↑/↓", "Nav"),
        ],
        (false, View::Risk) => &[("r", "Analyse"), ("p", "Project")],
        (false, View::Erp) => &[("x", "Export"), ("R", "Reset")],
        (false, View::Dashboard) => &[],
    };

    for (key, label) in keys {
        status_spans.push(Span::styled(*key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(format!(" {label} | ")));
    }
    if !app.is_editing() {
        status_spans.push(Span::styled("Tab/1-5", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" View | "));
        status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
        status_spans.push(Span::raw(" Quit"));
    }

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

/// Split off a right-hand panel (forms, details) when one is open
fn split_side(area: Rect, open: bool) -> (Rect, Option<Rect>) {
    if !open {
        return (area, None);
    }
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);
    (chunks[0], Some(chunks[1]))
}

fn form_line(label: &str, value: &str, focused: bool) -> Line<'static> {
    let (marker, style) = if focused {
        ("▸ ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    } else {
        ("  ", Style::default().fg(Color::White))
    };
    Line::from(vec![
        Span::styled(format!("{marker}{label:<20}"), style),
        Span::styled(value.to_string(), style),
    ])
}

fn detail_line(label: &str, value: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<16}"), Style::default().fg(Color::Gray)),
        Span::raw(value.to_string()),
    ])
}

fn history_lines(events: &[AuditEvent]) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("History", header_style())),
    ];
    if events.is_empty() {
        lines.push(Line::from(Span::styled(
            "  (seeded, unchanged)",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for e in events {
        lines.push(Line::from(format!(
            "  {}  {}",
            e.timestamp.format("%Y-%m-%d %H:%M"),
            e.event_type
        )));
    }
    lines
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use applemar_planner::store::MemoryStore;
    use ratatui::backend::TestBackend;
    use tokio::runtime::Runtime;

    fn app(rt: &Runtime) -> App {
        let state = AppState::load(Box::new(MemoryStore::new()));
        let desk = RiskDesk::new(None, rt.handle().clone());
        App::new(state, desk, std::env::temp_dir().join("applemar-ui-test"))
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(app: &mut App, keys: &str) {
        for c in keys.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn draw(app: &mut App) {
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        terminal.draw(|f| ui(f, app)).unwrap();
    }

    #[test]
    fn test_view_navigation() {
        let rt = Runtime::new().unwrap();
        let mut app = app(&rt);
        assert_eq!(app.views.current(), View::Dashboard);

        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.views.current(), View::Planning);

        app.handle_key(key(KeyCode::BackTab));
        assert_eq!(app.views.current(), View::Dashboard);

        press(&mut app, "4");
        assert_eq!(app.views.current(), View::Investments);
    }

    #[test]
    fn test_add_budget_through_form() {
        let rt = Runtime::new().unwrap();
        let mut app = app(&rt);
        press(&mut app, "2a1000");
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(app.state.budgets().len(), 6);
        assert_eq!(app.state.budgets()[0].amount, 1000.0);
        // form stays open for the next entry, amount cleared
        assert!(app.is_editing());
        match &app.mode {
            Mode::Budget(form) => assert!(form.amount.is_empty()),
            _ => panic!("budget form closed"),
        }
    }

    #[test]
    fn test_invalid_amount_adds_nothing() {
        let rt = Runtime::new().unwrap();
        let mut app = app(&rt);
        press(&mut app, "2aabc");
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(app.state.budgets().len(), 5);
        assert!(app.status.as_deref().unwrap_or("").contains("not a number"));
    }

    #[test]
    fn test_delete_selected_budget() {
        let rt = Runtime::new().unwrap();
        let mut app = app(&rt);
        press(&mut app, "2");
        let first = app.selected_budget().unwrap().id.clone();

        press(&mut app, "d");
        app.refresh();

        assert_eq!(app.state.budgets().len(), 4);
        assert!(app.state.budgets().iter().all(|b| b.id != first));
        assert_eq!(app.budgets_state.selected(), Some(0));
    }

    #[test]
    fn test_reset_requires_confirmation() {
        let rt = Runtime::new().unwrap();
        let mut app = app(&rt);
        press(&mut app, "2d");
        assert_eq!(app.state.budgets().len(), 4);

        press(&mut app, "5Rn");
        assert_eq!(app.state.budgets().len(), 4);

        press(&mut app, "Ry");
        assert_eq!(app.state.budgets().len(), 5);
    }

    #[test]
    fn test_escape_cancels_pending_reset_instead_of_quitting() {
        let rt = Runtime::new().unwrap();
        let mut app = app(&rt);
        press(&mut app, "5R");

        assert!(!app.handle_key(key(KeyCode::Esc)));
        assert!(!app.views.reset_pending());
        assert!(app.handle_key(key(KeyCode::Esc)));
    }

    #[test]
    fn test_analysis_without_credential_fails_visibly() {
        let rt = Runtime::new().unwrap();
        let mut app = app(&rt);
        press(&mut app, "3r");
        app.refresh();

        assert_eq!(app.desk.risk().status(), SessionStatus::Failed);
        assert!(app.desk.risk().result().is_none());
        draw(&mut app);
    }

    #[test]
    fn test_entering_risk_view_starts_analysis() {
        let rt = Runtime::new().unwrap();
        let mut app = app(&rt);

        press(&mut app, "3");
        assert_eq!(app.desk.risk().status(), SessionStatus::Loading);
    }

    #[test]
    fn test_leaving_risk_view_discards_analysis() {
        let rt = Runtime::new().unwrap();
        let mut app = app(&rt);

        press(&mut app, "3");
        app.refresh();
        assert_eq!(app.desk.risk().status(), SessionStatus::Failed);

        press(&mut app, "1");
        assert_eq!(app.desk.risk().status(), SessionStatus::Idle);
        assert!(app.desk.risk().last_error().is_none());

        // a request left behind on exit must not land after coming back
        press(&mut app, "3p1");
        app.refresh();
        assert_eq!(app.desk.risk().status(), SessionStatus::Idle);
        assert_eq!(app.desk.projections().status(), SessionStatus::Idle);

        press(&mut app, "3");
        assert_eq!(app.desk.risk().status(), SessionStatus::Loading);
    }

    #[test]
    fn test_every_view_renders() {
        let rt = Runtime::new().unwrap();
        let mut app = app(&rt);
        for c in ['1', '2', '3', '4', '5'] {
            press(&mut app, &c.to_string());
            draw(&mut app);
        }

        press(&mut app, "2");
        app.handle_key(key(KeyCode::Enter));
        draw(&mut app);
        press(&mut app, "4a");
        draw(&mut app);
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("Imobiliário Luanda Sul", 10), "Imobili...");
        assert_eq!(truncate("short", 10), "short");
    }
}
