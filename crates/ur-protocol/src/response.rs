//! 命令应答行与结果码
//!
//! 解析成功的命令得到确认应答：
//!
//! ```text
//! <规范序列化的命令>,<结果码>;
//! ```
//!
//! 解析失败的命令得到错误应答，回显原始行并附带诊断：
//!
//! ```text
//! <原始行>,<结果码>,"<诊断信息>";
//! ```

use crate::command::{self, Command};

/// 命令处理结果码
///
/// 0 为成功；1/2 是解析层错误；其余由处理器产生。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseCode {
    /// 命令接受并生效
    Success = 0,
    /// 字段数或字段类型不匹配
    FormatError = 1,
    /// 未识别的命令名
    UnknownCommand = 2,
    /// 处理器拒绝（如自动初始化步骤未收敛）
    Rejected = 3,
    /// 自动初始化因受力超限中止
    ForceExceeded = 4,
    /// 自动初始化因停机信号取消
    Cancelled = 5,
}

impl ResponseCode {
    /// 线上数值
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// 成功路径的确认应答行
pub fn ack(command: &Command, code: ResponseCode) -> String {
    format!("{},{};", command.serialise(), code.code())
}

/// 解析失败路径的错误应答行（回显规范化后的原始行）
pub fn error_line(original: &str, code: ResponseCode, message: &str) -> String {
    format!(
        "{},{},\"{}\";",
        command::normalize_line(original),
        code.code(),
        message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_format() {
        let cmd = Command::parse_line("A,7,set_home;").unwrap();
        assert_eq!(ack(&cmd, ResponseCode::Success), "A,7,set_home,0;");
    }

    #[test]
    fn test_error_line_echoes_original() {
        let line = error_line(
            ">A,7,set_pos;",
            ResponseCode::FormatError,
            "command format error",
        );
        assert_eq!(line, "A,7,set_pos,1,\"command format error\";");
    }
}
