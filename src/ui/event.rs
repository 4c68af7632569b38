//! 事件处理
//!
//! 轮询 crossterm 键盘事件，将 Esc/Ctrl+Q/Ctrl+C 转为 Command::Quit，
//! 其余按键交给 run_app 拼 input_buffer，Enter 时 send_submit。

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;

use crate::core::Command;

/// 应用事件：来自快捷键的 Command 或原始 KeyEvent
#[derive(Debug, Clone)]
pub enum AppEvent {
    Command(Command),
    Key(KeyEvent),
}

/// 事件处理器：持有 cmd_tx，poll 时读键盘并返回 AppEvent，send_submit 发送用户输入
pub struct EventHandler {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl EventHandler {
    pub fn new(cmd_tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { cmd_tx }
    }

    pub fn poll(&self) -> anyhow::Result<Option<AppEvent>> {
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(Some(map_key(key)));
                }
            }
        }
        Ok(None)
    }

    /// 提交输入；空白输入在本地丢弃（编排器同样会忽略）
    pub fn send_submit(&self, input: String) -> bool {
        if input.trim().is_empty() {
            return false;
        }
        self.cmd_tx.send(Command::Submit(input)).is_ok()
    }

    pub fn send_quit(&self) {
        let _ = self.cmd_tx.send(Command::Quit);
    }
}

/// 快捷键映射
pub fn map_key(key: KeyEvent) -> AppEvent {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => AppEvent::Command(Command::Quit),
        KeyCode::Char('q') | KeyCode::Char('c') if ctrl => AppEvent::Command(Command::Quit),
        _ => AppEvent::Key(key),
    }
}
