//! Listening socket setup.
//!
//! Options are set on the listener before `listen()`; Linux copies them to
//! every accepted socket.

use std::net::SocketAddr;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;

use portico_core::{GatewayError, Result};

use crate::config::SocketSection;

const BACKLOG: i32 = 1024;

fn io_err(what: &'static str) -> impl Fn(std::io::Error) -> GatewayError {
    move |e| GatewayError::Transport(format!("{what}: {e}"))
}

/// Bind a tuned TCP listener. Must be called inside the tokio runtime.
pub fn bind(addr: SocketAddr, opts: &SocketSection) -> Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(io_err("socket create failed"))?;

    socket.set_reuse_address(true).map_err(io_err("SO_REUSEADDR"))?;
    if opts.nodelay {
        socket.set_nodelay(true).map_err(io_err("TCP_NODELAY"))?;
    }
    socket
        .set_recv_buffer_size(opts.recv_buffer_bytes)
        .map_err(io_err("SO_RCVBUF"))?;
    socket
        .set_send_buffer_size(opts.send_buffer_bytes)
        .map_err(io_err("SO_SNDBUF"))?;
    if opts.linger_zero {
        socket.set_linger(Some(Duration::ZERO)).map_err(io_err("SO_LINGER"))?;
    }
    socket.set_nonblocking(true).map_err(io_err("O_NONBLOCK"))?;

    socket.bind(&addr.into()).map_err(io_err("bind failed"))?;
    socket.listen(BACKLOG).map_err(io_err("listen failed"))?;

    TcpListener::from_std(socket.into()).map_err(io_err("tokio listener"))
}
