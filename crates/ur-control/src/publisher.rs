//! 状态广播通道
//!
//! 每个 tick 把固定长度的状态记录写给所有已连接的进程外消费者。
//! 广播是尽力而为：写失败的消费者直接摘除，绝不影响控制循环。

use std::io::{self, Write};
use std::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

/// 状态广播接口
pub trait StatusPublisher {
    /// 广播一条状态记录（尽力而为，不可失败）
    fn publish(&mut self, record: &[u8]);
}

/// 非阻塞 TCP 广播器
pub struct TcpStatusPublisher {
    listener: TcpListener,
    clients: Vec<TcpStream>,
}

impl TcpStatusPublisher {
    /// 在给定端口上监听消费者连接
    pub fn bind(port: u16) -> io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port))?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            clients: Vec::new(),
        })
    }

    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    debug!("status consumer connected: {}", addr);
                    if stream.set_nonblocking(true).is_ok() {
                        self.clients.push(stream);
                    }
                },
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("status listener accept failed: {}", e);
                    break;
                },
            }
        }
    }
}

impl StatusPublisher for TcpStatusPublisher {
    fn publish(&mut self, record: &[u8]) {
        self.accept_pending();
        self.clients.retain_mut(|client| {
            match client.write_all(record) {
                Ok(()) => true,
                // 消费者跟不上时直接丢帧，下个 tick 还有新记录
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => true,
                Err(e) => {
                    debug!("dropping status consumer: {}", e);
                    false
                },
            }
        });
    }
}
