//! 命令输入队列
//!
//! 命令源按行送达文本命令。标准输入没有可移植的非阻塞读法，
//! 因此由一个读取线程把行灌进 SPSC 通道，控制循环一侧只做
//! 非阻塞的 `try_recv` 汇集。队列严格保序：入队顺序 = 到达顺序，
//! 控制循环每个 tick 只消费最旧的一条。
//!
//! 若构造时给定来源标识，来源字段不匹配的行直接丢弃（带告警）：
//! 同一命令总线上可能挂着多台执行器。

use crate::error::ControlError;
use crossbeam_channel::{Receiver, TryRecvError};
use std::collections::VecDeque;
use std::io::BufRead;
use std::thread;
use tracing::warn;
use ur_protocol::command::split_fields;

/// 读取线程发往控制循环的事件
enum InputEvent {
    Line(String),
    Eof,
    Failed(String),
}

/// 命令输入队列
pub struct Inputs {
    rx: Receiver<InputEvent>,
    queue: VecDeque<String>,
    origin: Option<String>,
    eof: bool,
}

impl Inputs {
    /// 从任意行源构造；`origin` 为期望的来源标识（None 不过滤）
    pub fn from_reader<R>(reader: R, origin: Option<String>) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::unbounded();
        thread::spawn(move || {
            for line in reader.lines() {
                let event = match line {
                    Ok(l) => InputEvent::Line(l),
                    Err(e) => {
                        let _ = tx.send(InputEvent::Failed(e.to_string()));
                        return;
                    },
                };
                if tx.send(event).is_err() {
                    return;
                }
            }
            let _ = tx.send(InputEvent::Eof);
        });

        Self {
            rx,
            queue: VecDeque::new(),
            origin,
            eof: false,
        }
    }

    /// 汇集读取线程已送达的行（非阻塞）
    ///
    /// EOF 只做标记，读错误直接上抛为致命错误。
    pub fn pump(&mut self) -> Result<(), ControlError> {
        loop {
            match self.rx.try_recv() {
                Ok(InputEvent::Line(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if let Some(expected) = &self.origin {
                        let fields = split_fields(&line);
                        if fields.first() != Some(&expected.as_str()) {
                            warn!("discarding command line for foreign origin: {}", line);
                            continue;
                        }
                    }
                    self.queue.push_back(line);
                },
                Ok(InputEvent::Eof) => self.eof = true,
                Ok(InputEvent::Failed(msg)) => return Err(ControlError::CommandInput(msg)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.eof = true;
                    break;
                },
            }
        }
        Ok(())
    }

    /// 取出最旧的一条待处理命令行
    pub fn pop(&mut self) -> Option<String> {
        self.queue.pop_front()
    }

    /// 队列是否为空
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// 命令源已结束且队列已排空
    pub fn finished(&self) -> bool {
        self.eof && self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    fn pump_until_finished(inputs: &mut Inputs) {
        // 读取线程异步灌入，轮询直到 EOF 标记到达
        for _ in 0..100 {
            inputs.pump().unwrap();
            if inputs.eof {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("input reader never reached EOF");
    }

    #[test]
    fn test_lines_arrive_in_order() {
        let source = Cursor::new("A,1,set_home;\nA,2,stop;\nA,3,power,on;\n");
        let mut inputs = Inputs::from_reader(source, None);
        pump_until_finished(&mut inputs);

        assert_eq!(inputs.pop().unwrap(), "A,1,set_home;");
        assert_eq!(inputs.pop().unwrap(), "A,2,stop;");
        assert_eq!(inputs.pop().unwrap(), "A,3,power,on;");
        assert!(inputs.finished());
    }

    #[test]
    fn test_foreign_origin_discarded() {
        let source = Cursor::new("B,1,set_home;\nA,2,set_home;\n");
        let mut inputs = Inputs::from_reader(source, Some("A".to_string()));
        pump_until_finished(&mut inputs);

        assert_eq!(inputs.pop().unwrap(), "A,2,set_home;");
        assert!(inputs.pop().is_none());
    }

    #[test]
    fn test_empty_lines_skipped() {
        let source = Cursor::new("\n\nA,1,set_home;\n\n");
        let mut inputs = Inputs::from_reader(source, None);
        pump_until_finished(&mut inputs);

        assert_eq!(inputs.pop().unwrap(), "A,1,set_home;");
        assert!(inputs.finished());
    }
}
