//! TUI 应用主循环
//!
//! 进入全屏/原始模式，轮询 state_rx 与键盘事件，将用户输入与快捷键转为 Command 发送给编排器，
//! 每帧用 draw 渲染 SessionSnapshot 与输入缓冲。非 IDLE 时不接受输入。

use std::io::{self, Stdout};

use crossterm::event::KeyCode;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, watch};

use crate::core::{Command, SessionSnapshot};
use crate::ui::event::{AppEvent, EventHandler};
use crate::ui::render::draw;

/// 运行 TUI：启用原始模式与全屏，循环 poll 事件 + 渲染，退出时恢复终端
pub async fn run_app(
    state_rx: watch::Receiver<SessionSnapshot>,
    cmd_tx: mpsc::UnboundedSender<Command>,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, state_rx, EventHandler::new(cmd_tx)).await;

    restore_terminal(&mut terminal)?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    state_rx: watch::Receiver<SessionSnapshot>,
    events: EventHandler,
) -> anyhow::Result<()> {
    let mut input_buffer = String::new();
    let mut log_scroll = 0u16;

    loop {
        let snapshot = state_rx.borrow().clone();

        if let Some(ev) = events.poll()? {
            match ev {
                AppEvent::Command(Command::Quit) => {
                    events.send_quit();
                    break;
                }
                AppEvent::Command(_) => {}
                AppEvent::Key(key) => match key.code {
                    KeyCode::Up => log_scroll = log_scroll.saturating_sub(1),
                    KeyCode::Down => log_scroll = log_scroll.saturating_add(1),
                    KeyCode::Home => log_scroll = 0,
                    _ if snapshot.input_locked() => {}
                    KeyCode::Enter => {
                        if events.send_submit(input_buffer.clone()) {
                            input_buffer.clear();
                            log_scroll = 0;
                        }
                    }
                    KeyCode::Backspace => {
                        input_buffer.pop();
                    }
                    KeyCode::Char(c) => input_buffer.push(c),
                    _ => {}
                },
            }
        }

        terminal.draw(|f| draw(f, &snapshot, &input_buffer, log_scroll))?;
        tokio::task::yield_now().await;
    }
    Ok(())
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
