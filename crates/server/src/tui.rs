use std::collections::VecDeque;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use duel::DuelSummary;

use crate::events::OpsEvent;

const LOG_CAPACITY: usize = 200;

pub struct TuiState {
    log: VecDeque<(bool, String)>,
    events_seen: u64,
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            log: VecDeque::with_capacity(LOG_CAPACITY),
            events_seen: 0,
        }
    }

    pub fn push(&mut self, event: &OpsEvent) {
        self.events_seen += 1;
        if self.log.len() >= LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back((event.is_error(), event.describe()));
    }

    pub fn push_info(&mut self, message: String) {
        if self.log.len() >= LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back((false, message));
    }
}

pub fn render(frame: &mut Frame, state: &TuiState, uptime_secs: u64, duels: &[DuelSummary]) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(9),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_header(frame, chunks[0], state, uptime_secs, duels.len());
    render_duels(frame, chunks[1], duels);
    render_log(frame, chunks[2], state);
    render_help(frame, chunks[3]);
}

fn render_header(
    frame: &mut Frame,
    area: Rect,
    state: &TuiState,
    uptime_secs: u64,
    active: usize,
) {
    let title = format!(" Duel Server - Uptime: {} ", format_duration(uptime_secs));

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let text = format!("Active duels: {}  |  Events: {}", active, state.events_seen);

    let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(paragraph, area);
}

fn render_duels(frame: &mut Frame, area: Rect, duels: &[DuelSummary]) {
    let block = Block::default()
        .title(" Active Duels ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let lines: Vec<Line> = if duels.is_empty() {
        vec![Line::from(Span::styled(
            "no duels in progress",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        duels
            .iter()
            .map(|d| {
                let mut spans = vec![
                    Span::styled(format!("#{:<5}", d.id), Style::default().fg(Color::Cyan)),
                    Span::styled(
                        format!(" {} vs {} ", d.challenger, d.opponent),
                        Style::default().fg(Color::White),
                    ),
                    Span::styled(
                        format!(
                            " round {}  {}-{}",
                            d.active_round, d.challenger_score, d.opponent_score
                        ),
                        Style::default().fg(Color::Gray),
                    ),
                ];
                if d.sudden_death {
                    spans.push(Span::styled(
                        "  SUDDEN DEATH",
                        Style::default().fg(Color::Red),
                    ));
                }
                Line::from(spans)
            })
            .collect()
    };

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn render_log(frame: &mut Frame, area: Rect, state: &TuiState) {
    let block = Block::default()
        .title(" Events ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = state
        .log
        .iter()
        .rev()
        .take(visible)
        .rev()
        .map(|(is_error, message)| {
            let color = if *is_error { Color::Red } else { Color::White };
            Line::from(Span::styled(message.clone(), Style::default().fg(color)))
        })
        .collect();

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Controls ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text = Paragraph::new("Press 'q' or ESC to quit").block(block).style(
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    );

    frame.render_widget(text, area);
}

fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}
