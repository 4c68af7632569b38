//! 界面渲染
//!
//! 左侧为状态卡片（阶段、当前任务、迭代进度、洞见数）与集合列表；右上为日志（最新在前）；
//! 右下为检索命中与反思列表；底部为输入框，非 IDLE 时置灰。

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::core::{AgentState, AgentStatus, LogEntry, LogLevel, SessionSnapshot};

/// 单条日志/命中在 UI 中显示的最大字符数
const MAX_DISPLAY_CHARS: usize = 160;
/// 集合面板展示的集合名
const CLUSTERS: &[&str] = &["memory", "learning", "kb", "personality"];

/// 阶段显示文本
pub fn status_label(status: AgentStatus) -> &'static str {
    match status {
        AgentStatus::Idle => "空闲",
        AgentStatus::Thinking => "思考中…",
        AgentStatus::Searching => "检索中…",
        AgentStatus::Reflecting => "反思中…",
        AgentStatus::Success => "完成",
        AgentStatus::Error => "错误",
    }
}

fn status_color(status: AgentStatus) -> Color {
    match status {
        AgentStatus::Idle => Color::Gray,
        AgentStatus::Thinking => Color::Blue,
        AgentStatus::Searching => Color::Magenta,
        AgentStatus::Reflecting => Color::Yellow,
        AgentStatus::Success => Color::Green,
        AgentStatus::Error => Color::Red,
    }
}

fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::Spark => Color::Green,
        LogLevel::Maestro => Color::Blue,
        LogLevel::Error => Color::Red,
        LogLevel::Warn => Color::Yellow,
        LogLevel::Info => Color::Gray,
    }
}

/// 迭代进度（0.0 - 1.0）
pub fn progress_ratio(state: &AgentState) -> f64 {
    state.progress()
}

/// 对过长内容做折叠：保留前 N 字 + 省略号（按字符，避免截断 UTF-8）
pub fn truncate_for_display(content: &str) -> String {
    let count = content.chars().count();
    if count <= MAX_DISPLAY_CHARS {
        return content.to_string();
    }
    let head: String = content.chars().take(MAX_DISPLAY_CHARS).collect();
    format!("{}…", head)
}

/// 0.0 - 1.0 的分数显示为百分比
pub fn percent(score: f32) -> String {
    format!("{:.0}%", score * 100.0)
}

/// 绘制一帧
pub fn draw(f: &mut Frame, snapshot: &SessionSnapshot, input_buffer: &str, log_scroll: u16) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(3)])
        .split(f.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(36), Constraint::Min(40)])
        .split(rows[0]);

    draw_sidebar(f, &snapshot.agent, columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[1]);
    draw_logs(f, &snapshot.logs, right[0], log_scroll);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(right[1]);
    draw_hits(f, &snapshot.agent, bottom[0]);
    draw_reflections(f, &snapshot.agent, bottom[1]);

    draw_input(f, snapshot, input_buffer, rows[1]);
}

fn draw_sidebar(f: &mut Frame, state: &AgentState, area: Rect) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8),
            Constraint::Length(3),
            Constraint::Min(3),
        ])
        .split(area);

    let color = status_color(state.status);
    let task = state
        .current_task
        .as_deref()
        .map(truncate_for_display)
        .unwrap_or_else(|| "等待指令…".to_string());
    let lines = vec![
        Line::from(vec![
            Span::styled("状态 ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                state.status.as_str(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  {}", status_label(state.status))),
        ]),
        Line::from(vec![
            Span::styled("任务 ", Style::default().fg(Color::DarkGray)),
            Span::styled(task, Style::default().add_modifier(Modifier::ITALIC)),
        ]),
        Line::from(vec![
            Span::styled("循环 ", Style::default().fg(Color::DarkGray)),
            Span::raw(format!("{} / {}", state.iterations, state.max_iterations)),
        ]),
        Line::from(vec![
            Span::styled("洞见 ", Style::default().fg(Color::DarkGray)),
            Span::raw(state.reflections.len().to_string()),
        ]),
    ];
    let card = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .title(" Spark │ Agent ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(card, parts[0]);

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" 进度 "))
        .gauge_style(Style::default().fg(color))
        .ratio(progress_ratio(state));
    f.render_widget(gauge, parts[1]);

    let clusters: Vec<Line> = CLUSTERS
        .iter()
        .map(|c| {
            Line::from(vec![
                Span::raw(format!("{:<14}", c)),
                Span::styled("ONLINE", Style::default().fg(Color::Green)),
            ])
        })
        .collect();
    let panel = Paragraph::new(Text::from(clusters))
        .block(Block::default().title(" Qdrant ").borders(Borders::ALL));
    f.render_widget(panel, parts[2]);
}

fn draw_logs(f: &mut Frame, logs: &[LogEntry], area: Rect, scroll: u16) {
    let mut lines: Vec<Line> = Vec::new();
    if logs.is_empty() {
        lines.push(Line::from(Span::styled(
            "System idle. Awaiting command...",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for entry in logs {
        lines.push(Line::from(vec![
            Span::styled(
                format!("[{}] ", entry.timestamp),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
                format!("{:<8}", entry.level.as_str().to_uppercase()),
                Style::default()
                    .fg(level_color(entry.level))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(truncate_for_display(&entry.message)),
        ]));
        if let Some(details) = &entry.details {
            lines.push(Line::from(Span::styled(
                format!("           │ {}", truncate_for_display(details)),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
        }
    }
    let paragraph = Paragraph::new(Text::from(lines))
        .block(Block::default().title(" 日志 ").borders(Borders::ALL))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(paragraph, area);
}

fn draw_hits(f: &mut Frame, state: &AgentState, area: Rect) {
    let lines: Vec<Line> = if state.qdrant_hits.is_empty() {
        vec![Line::from(Span::styled(
            "暂无检索结果",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        state
            .qdrant_hits
            .iter()
            .map(|h| {
                Line::from(vec![
                    Span::styled(
                        format!("[{}] ", h.collection),
                        Style::default().fg(Color::Magenta),
                    ),
                    Span::styled(
                        format!("{:>4} ", percent(h.score)),
                        Style::default().fg(Color::Green),
                    ),
                    Span::raw(truncate_for_display(&h.content)),
                ])
            })
            .collect()
    };
    let paragraph = Paragraph::new(Text::from(lines))
        .block(Block::default().title(" 向量空间 ").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn draw_reflections(f: &mut Frame, state: &AgentState, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();
    if state.reflections.is_empty() {
        lines.push(Line::from(Span::styled(
            "等待反思迭代…",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for r in &state.reflections {
        lines.push(Line::from(vec![
            Span::styled(
                format!("迭代 {} ", r.iteration),
                Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("置信度 {}", percent(r.confidence)),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        lines.push(Line::from(Span::raw(truncate_for_display(&r.key_insight))));
        if !r.next_action.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("NEXT: {}", truncate_for_display(&r.next_action)),
                Style::default().fg(Color::Green).add_modifier(Modifier::ITALIC),
            )));
        }
    }
    let paragraph = Paragraph::new(Text::from(lines))
        .block(Block::default().title(" 反思 ").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn draw_input(f: &mut Frame, snapshot: &SessionSnapshot, input_buffer: &str, area: Rect) {
    let locked = snapshot.input_locked();
    let title = if locked { " 处理中… " } else { " 指令 " };
    let hint = " Enter 发送 │ ↑↓ 滚动日志 │ Esc/Ctrl+Q 退出 ";
    let block = Block::default()
        .title(title)
        .title_bottom(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if locked { Color::DarkGray } else { Color::Green }));
    let input = Paragraph::new(input_buffer).block(block).style(if locked {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    });
    f.render_widget(input, area);
}
