//! 终端输入命令
//!
//! 普通文本直接发送，以 `/` 开头的行作为控制命令

/// 一行输入解析出的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 发送一条消息
    Say(String),
    /// 显示连接状态
    Status,
    /// 退出
    Quit,
    /// 显示帮助（包括无法识别的命令）
    Help,
}

pub const HELP: &str = "Type a message and press Enter to send it.\n\
/status  show connection state\n\
/quit    exit (also /exit)\n\
/help    show this help";

impl Command {
    /// 解析一行输入，空行返回 `None`
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Some(name) = trimmed.strip_prefix('/') {
            let command = match name.split_whitespace().next().unwrap_or_default() {
                "status" => Command::Status,
                "quit" | "exit" => Command::Quit,
                _ => Command::Help,
            };
            return Some(command);
        }

        Some(Command::Say(trimmed.to_string()))
    }
}
