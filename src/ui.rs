use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table},
    Frame,
};

use crate::app::App;
use crate::clock::Clock;
use crate::session::{format_countdown, RefreshState};

const BRAND: Color = Color::Rgb(0x44, 0x22, 0x6E);
const BRAND_LIGHT: Color = Color::Rgb(0x8B, 0x6C, 0xB1);
const HIGHLIGHT: Color = Color::Rgb(0xFF, 0xC6, 0x37);

pub fn render<C: Clock>(f: &mut Frame, app: &App<C>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(4),
                Constraint::Length(7),
                Constraint::Length(1),
                Constraint::Length(8),
                Constraint::Length(2),
                Constraint::Min(1),
            ]
            .as_ref(),
        )
        .split(f.size());

    render_header(f, app, chunks[0]);
    render_amount(f, app, chunks[1]);

    let info = Paragraph::new(format!(
        "● An annualised interest rate of {}% p.a. will be applicable.",
        app.session.terms().annual_rate_percent()
    ))
    .style(Style::default().add_modifier(Modifier::BOLD));
    f.render_widget(info, chunks[2]);

    render_tenures(f, app, chunks[3]);
    render_countdown(f, app, chunks[4]);

    let help = Paragraph::new(
        "←/→: amount | Shift: ±1,000 | PgUp/PgDn: ±5,000 | Tab/1-9: tenure | r: new offer | q: quit",
    )
    .style(Style::default().fg(Color::DarkGray))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::TOP));
    f.render_widget(help, chunks[5]);
}

fn render_header<C: Clock>(f: &mut Frame, app: &App<C>, area: Rect) {
    let text = vec![
        Line::from("Approved Loan"),
        Line::from(Span::styled(
            format_amount(app.session.terms().max_amount()),
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    let header = Paragraph::new(text)
        .style(Style::default().fg(Color::White).bg(BRAND))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(BRAND_LIGHT)));
    f.render_widget(header, area);
}

fn render_amount<C: Clock>(f: &mut Frame, app: &App<C>, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Select Loan amount - move the slider to select your loan amount");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(inner);

    let selected = Paragraph::new(format_amount(app.session.selected_amount()))
        .style(Style::default().fg(BRAND_LIGHT).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(selected, rows[0]);

    let slider = Gauge::default()
        .gauge_style(Style::default().fg(BRAND_LIGHT).bg(Color::DarkGray))
        .ratio(app.session.fill_ratio().clamp(0.0, 1.0))
        .label("");
    f.render_widget(slider, rows[1]);

    let terms = app.session.terms();
    let bounds = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(rows[2]);
    let low = Paragraph::new(format_amount(terms.min_amount()))
        .style(Style::default().fg(Color::DarkGray));
    let high = Paragraph::new(format_amount(terms.max_amount()))
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Right);
    f.render_widget(low, bounds[0]);
    f.render_widget(high, bounds[1]);
}

fn render_tenures<C: Clock>(f: &mut Frame, app: &App<C>, area: Rect) {
    let rows = app.session.derived_rows();
    let selected_tenure = app.session.selected_tenure();

    let cell_style = |months: u32| {
        if months == selected_tenure {
            Style::default().fg(BRAND).bg(HIGHLIGHT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        }
    };
    let label = |text: &'static str| Cell::from(text).style(Style::default().fg(Color::DarkGray));

    let mut months = vec![label("Months")];
    let mut emi = vec![label("EMI")];
    let mut total = vec![label("Total")];
    let mut check = vec![label("")];
    for row in &rows {
        let style = cell_style(row.months);
        months.push(Cell::from(row.months.to_string()).style(style));
        emi.push(Cell::from(format_amount(row.installment)).style(style));
        total.push(Cell::from(format_amount(row.total_repayment)).style(style));
        let mark = if row.months == selected_tenure { "✓" } else { " " };
        check.push(Cell::from(mark).style(style));
    }

    let header = Row::new(months)
        .style(Style::default().add_modifier(Modifier::BOLD))
        .height(1)
        .bottom_margin(1);
    let body = vec![Row::new(emi), Row::new(total), Row::new(check)];

    let mut widths = vec![Constraint::Length(8)];
    widths.extend(rows.iter().map(|_| Constraint::Min(10)));

    let table = Table::new(body, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Select Tenure - choose your preferred term in months"),
        );
    f.render_widget(table, area);
}

fn render_countdown<C: Clock>(f: &mut Frame, app: &App<C>, area: Rect) {
    let seconds = app.session.displayed_seconds();
    let (text, color) = match app.session.refresh_state() {
        RefreshState::Expired => ("Offer expired. Press r for a new offer".to_string(), Color::Red),
        RefreshState::Suspended => (
            format!("Offer expires in {} (paused)", format_countdown(seconds)),
            Color::DarkGray,
        ),
        RefreshState::Active => (
            format!("Offer expires in {}", format_countdown(seconds)),
            BRAND_LIGHT,
        ),
    };
    let countdown = Paragraph::new(text)
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(countdown, area);
}

/// Rupee amount with thousands separators, e.g. `₹20,000`.
pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("₹{}", grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::OfferTerms;
    use chrono::{DateTime, Duration};
    use ratatui::{backend::TestBackend, Terminal};

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|line| line.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "₹0");
        assert_eq!(format_amount(999), "₹999");
        assert_eq!(format_amount(7002), "₹7,002");
        assert_eq!(format_amount(50_000), "₹50,000");
        assert_eq!(format_amount(1_234_567), "₹1,234,567");
    }

    #[test]
    fn test_renders_offer_table_and_countdown() {
        let clock = ManualClock::new(DateTime::from_timestamp(1_760_000_000, 0).unwrap());
        let mut app = App::new(OfferTerms::default(), &clock);
        clock.advance(Duration::seconds(1));
        app.on_tick();

        let mut terminal = Terminal::new(TestBackend::new(100, 32)).unwrap();
        terminal.draw(|f| render(f, &app)).unwrap();
        let text = screen_text(&terminal);

        assert!(text.contains("Approved Loan"));
        assert!(text.contains("₹20,000"));
        assert!(text.contains("₹7,002"));
        assert!(text.contains("₹21,006"));
        assert!(text.contains("₹2,509"));
        assert!(text.contains("Offer expires in 0:59:59"));
    }

    #[test]
    fn test_renders_paused_and_expired_states() {
        let clock = ManualClock::new(DateTime::from_timestamp(1_760_000_000, 0).unwrap());
        let mut app = App::new(OfferTerms::default(), &clock);
        let mut terminal = Terminal::new(TestBackend::new(100, 32)).unwrap();

        app.on_focus(false);
        terminal.draw(|f| render(f, &app)).unwrap();
        assert!(screen_text(&terminal).contains("(paused)"));

        clock.advance(Duration::hours(1));
        app.on_focus(true);
        terminal.draw(|f| render(f, &app)).unwrap();
        assert!(screen_text(&terminal).contains("Offer expired"));
    }
}
