//! 传输接缝：反馈通道与机械臂命令通道
//!
//! 控制核心只依赖这里的两个 trait，TCP 实现与测试用的模拟实现
//! （见 [`crate::mock`]）都在其后。反馈通道上唯一允许的阻塞点是
//! `wait_readable` 的有界等待，其余操作要么立即返回要么失败。

use std::io::{self, Read, Write};
use std::net::{TcpStream as StdTcpStream, ToSocketAddrs};
use std::time::Duration;

use mio::net::TcpStream;
use mio::{Events, Interest, Poll, Token};

const FEEDBACK: Token = Token(0);

/// 帧内补齐读取时的单次等待
const PARTIAL_FRAME_WAIT: Duration = Duration::from_millis(10);

/// 帧内补齐读取的最大等待次数
const PARTIAL_FRAME_RETRIES: usize = 10;

/// 状态反馈通道
pub trait FeedbackLink {
    /// 有界等待可读；返回超时前是否有数据到达
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool>;

    /// 读满一个完整状态帧
    fn read_frame(&mut self, frame: &mut [u8]) -> io::Result<()>;

    /// 是否还有已缓冲的帧未读（新鲜度排空用）
    fn has_buffered(&mut self) -> io::Result<bool>;

    /// 连接是否仍然健康
    fn is_healthy(&self) -> bool;
}

/// 机械臂命令通道（ASCII 指令，一行一条）
pub trait CommandSink {
    fn write_line(&mut self, line: &str) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// 基于 mio 就绪检查的 TCP 反馈通道
pub struct TcpFeedbackLink {
    stream: TcpStream,
    poll: Poll,
    events: Events,
    healthy: bool,
}

impl TcpFeedbackLink {
    /// 建立反馈连接并注册就绪检查
    pub fn connect<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        // 启动期用阻塞 connect，连接建立后切换为非阻塞
        let std_stream = StdTcpStream::connect(addr)?;
        std_stream.set_nonblocking(true)?;
        let mut stream = TcpStream::from_std(std_stream);

        let poll = Poll::new()?;
        poll.registry()
            .register(&mut stream, FEEDBACK, Interest::READABLE)?;

        Ok(Self {
            stream,
            poll,
            events: Events::with_capacity(4),
            healthy: true,
        })
    }
}

impl FeedbackLink for TcpFeedbackLink {
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        self.events.clear();
        self.poll.poll(&mut self.events, Some(timeout))?;
        Ok(self
            .events
            .iter()
            .any(|e| e.token() == FEEDBACK && e.is_readable()))
    }

    fn read_frame(&mut self, frame: &mut [u8]) -> io::Result<()> {
        let mut filled = 0;
        let mut retries = 0;
        while filled < frame.len() {
            match self.stream.read(&mut frame[filled..]) {
                Ok(0) => {
                    self.healthy = false;
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "feedback stream closed mid-frame",
                    ));
                },
                Ok(n) => {
                    filled += n;
                    retries = 0;
                },
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    // 帧可能跨越多个 TCP 段，等剩余字节到齐
                    if retries >= PARTIAL_FRAME_RETRIES {
                        self.healthy = false;
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "partial status frame never completed",
                        ));
                    }
                    retries += 1;
                    self.wait_readable(PARTIAL_FRAME_WAIT)?;
                },
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.healthy = false;
                    return Err(e);
                },
            }
        }
        Ok(())
    }

    fn has_buffered(&mut self) -> io::Result<bool> {
        let mut probe = [0u8; 1];
        match self.stream.peek(&mut probe) {
            Ok(0) => {
                self.healthy = false;
                Ok(false)
            },
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn is_healthy(&self) -> bool {
        self.healthy
    }
}

/// 阻塞式 TCP 命令通道
pub struct TcpCommandSink {
    stream: StdTcpStream,
}

impl TcpCommandSink {
    /// 建立机械臂命令连接
    pub fn connect<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let stream = StdTcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }
}

impl CommandSink for TcpCommandSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.stream.write_all(line.as_bytes())?;
        self.stream.write_all(b"\n")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}
