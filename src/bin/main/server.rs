//! Board transport for HTTP serving: the TCP socket behind a read deadline.

use embassy_net::tcp::{self, TcpSocket};
use embassy_time::{Duration, WithTimeout};
use embedded_io_async::{Error, ErrorKind, ErrorType, Read, Write};

use eggtimer_core::{app::TimerApp, clock::Clock, outputs::OutputBank};

use super::{CLIENT_READ_TIMEOUT_MS, REQUEST_BUF_BYTES};

/// Serves one accepted connection and leaves the socket flushed. The
/// caller aborts the socket afterwards on every path.
pub(super) async fn serve<C, O>(socket: &mut TcpSocket<'_>, app: &mut TimerApp<C, O>)
where
    C: Clock,
    O: OutputBank,
{
    let mut buf = [0u8; REQUEST_BUF_BYTES];
    let mut stream = DeadlineStream { socket };
    eggtimer_core::server::serve(&mut stream, app, &mut buf).await;
}

/// TCP socket whose reads give up after the client deadline. The deadline
/// surfaces as `ErrorKind::TimedOut` so the connection service can tell
/// silence from transport failure.
struct DeadlineStream<'a, 'b> {
    socket: &'a mut TcpSocket<'b>,
}

#[derive(Debug)]
enum StreamError {
    Io(tcp::Error),
    DeadlinePassed,
}

impl Error for StreamError {
    fn kind(&self) -> ErrorKind {
        match self {
            StreamError::Io(_) => ErrorKind::Other,
            StreamError::DeadlinePassed => ErrorKind::TimedOut,
        }
    }
}

impl ErrorType for DeadlineStream<'_, '_> {
    type Error = StreamError;
}

impl Read for DeadlineStream<'_, '_> {
    async fn read(&mut self, dst: &mut [u8]) -> Result<usize, StreamError> {
        match self
            .socket
            .read(dst)
            .with_timeout(Duration::from_millis(CLIENT_READ_TIMEOUT_MS))
            .await
        {
            Ok(Ok(n)) => Ok(n),
            Ok(Err(err)) => Err(StreamError::Io(err)),
            Err(_) => Err(StreamError::DeadlinePassed),
        }
    }
}

impl Write for DeadlineStream<'_, '_> {
    async fn write(&mut self, src: &[u8]) -> Result<usize, StreamError> {
        self.socket.write(src).await.map_err(StreamError::Io)
    }

    async fn flush(&mut self) -> Result<(), StreamError> {
        self.socket.flush().await.map_err(StreamError::Io)
    }
}
