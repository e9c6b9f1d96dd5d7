//! One HTTP connection end-to-end over a byte stream.
//!
//! Generic over `embedded_io_async` so the firmware hands in its TCP
//! socket while host tests hand in a scripted stream. Read deadlines
//! arrive as `ErrorKind::TimedOut` from the stream itself.

use embedded_io_async::{Error as _, ErrorKind, Read, Write};
use log::{debug, warn};

use crate::{
    app::{Reply, TimerApp},
    clock::Clock,
    http::{self, Route},
    outputs::OutputBank,
};

const RESPONSE_HEAD_BYTES: usize = 256;

enum ServeFault<E> {
    Io(E),
    ResponseHead,
}

enum ReadOutcome<E> {
    Data(usize),
    Closed,
    TimedOut,
    Failed(E),
}

async fn read_some<S: Read>(stream: &mut S, dst: &mut [u8]) -> ReadOutcome<S::Error> {
    match stream.read(dst).await {
        Ok(0) => ReadOutcome::Closed,
        Ok(n) => ReadOutcome::Data(n),
        Err(err) if err.kind() == ErrorKind::TimedOut => ReadOutcome::TimedOut,
        Err(err) => ReadOutcome::Failed(err),
    }
}

/// Serves one accepted connection and leaves the stream flushed. The
/// caller closes the transport afterwards on every path.
pub async fn serve<C, O, S>(stream: &mut S, app: &mut TimerApp<C, O>, buf: &mut [u8])
where
    C: Clock,
    O: OutputBank,
    S: Read + Write,
{
    if let Err(fault) = service(stream, app, buf).await {
        match fault {
            ServeFault::Io(err) => warn!("connection io fault: {:?}", err),
            ServeFault::ResponseHead => warn!("response head overflowed its buffer"),
        }
        // Best-effort 500; the client may already be gone.
        let _ = send_reply(stream, &Reply::fault()).await;
    }
    let _ = stream.flush().await;
}

async fn service<C, O, S>(
    stream: &mut S,
    app: &mut TimerApp<C, O>,
    buf: &mut [u8],
) -> Result<(), ServeFault<S::Error>>
where
    C: Clock,
    O: OutputBank,
    S: Read + Write,
{
    let mut total = 0;

    // Pull bytes until the head terminator arrives or the buffer fills;
    // a silent client ends the read loop early.
    let head_end = loop {
        if let Some(end) = http::head_end(&buf[..total]) {
            break end;
        }
        if total == buf.len() {
            break total;
        }
        match read_some(stream, &mut buf[total..]).await {
            ReadOutcome::Data(n) => total += n,
            ReadOutcome::Closed | ReadOutcome::TimedOut if total == 0 => return Ok(()),
            ReadOutcome::Closed | ReadOutcome::TimedOut => break total,
            ReadOutcome::Failed(err) => return Err(ServeFault::Io(err)),
        }
    };

    let (route, declared_body) = match http::parse_request_head(&buf[..head_end]) {
        Ok(head) => {
            debug!("{:?} {}", head.method, head.path);
            (
                Route::resolve(head.method, head.path),
                head.content_length(buf.len() - head_end),
            )
        }
        Err(err) => {
            debug!("bad request: {:?}", err);
            return send_reply(stream, &Reply::bad_request()).await;
        }
    };

    // Drain what the client declared, but never stall on a short body.
    let mut body_len = total - head_end;
    if route.needs_body() {
        while body_len < declared_body {
            match read_some(stream, &mut buf[head_end + body_len..]).await {
                ReadOutcome::Data(n) => body_len += n,
                _ => break,
            }
        }
    }
    let body = &buf[head_end..head_end + body_len.min(declared_body)];

    let reply = app.respond(route, body);
    send_reply(stream, &reply).await
}

async fn send_reply<S: Write>(stream: &mut S, reply: &Reply) -> Result<(), ServeFault<S::Error>> {
    let mut head: heapless::String<RESPONSE_HEAD_BYTES> = heapless::String::new();
    http::write_response_head(&mut head, reply.status, reply.content_type, reply.body().len())
        .map_err(|_| ServeFault::ResponseHead)?;
    stream
        .write_all(head.as_bytes())
        .await
        .map_err(ServeFault::Io)?;
    stream
        .write_all(reply.body().as_bytes())
        .await
        .map_err(ServeFault::Io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;
    use embedded_io_async::ErrorType;

    use super::*;
    use crate::{clock::ManualClock, outputs::MockOutputs};

    const PAGE: &str = "<html>timer</html>";

    /// What the scripted client does on each successive read.
    #[derive(Clone, Copy)]
    enum Step {
        Send(&'static [u8]),
        Quiet,
        Hangup,
        Reset,
    }

    #[derive(Debug)]
    struct PeerError(ErrorKind);

    impl embedded_io_async::Error for PeerError {
        fn kind(&self) -> ErrorKind {
            self.0
        }
    }

    /// Replays read steps and records everything written back. Once the
    /// script runs out the peer stays quiet.
    struct ScriptedStream {
        steps: &'static [Step],
        next: usize,
        written: heapless::Vec<u8, 2048>,
    }

    impl ScriptedStream {
        fn new(steps: &'static [Step]) -> Self {
            Self {
                steps,
                next: 0,
                written: heapless::Vec::new(),
            }
        }

        fn written(&self) -> &str {
            core::str::from_utf8(&self.written).unwrap()
        }
    }

    impl ErrorType for ScriptedStream {
        type Error = PeerError;
    }

    impl Read for ScriptedStream {
        async fn read(&mut self, dst: &mut [u8]) -> Result<usize, PeerError> {
            let step = self.steps.get(self.next).copied().unwrap_or(Step::Quiet);
            self.next += 1;
            match step {
                Step::Send(bytes) => {
                    let n = bytes.len().min(dst.len());
                    dst[..n].copy_from_slice(&bytes[..n]);
                    Ok(n)
                }
                Step::Quiet => Err(PeerError(ErrorKind::TimedOut)),
                Step::Hangup => Ok(0),
                Step::Reset => Err(PeerError(ErrorKind::ConnectionReset)),
            }
        }
    }

    impl Write for ScriptedStream {
        async fn write(&mut self, src: &[u8]) -> Result<usize, PeerError> {
            self.written
                .extend_from_slice(src)
                .map_err(|_| PeerError(ErrorKind::OutOfMemory))?;
            Ok(src.len())
        }

        async fn flush(&mut self) -> Result<(), PeerError> {
            Ok(())
        }
    }

    fn app(clock: &ManualClock) -> TimerApp<&ManualClock, MockOutputs> {
        TimerApp::new(clock, MockOutputs::new(), PAGE)
    }

    fn serve_script(
        app: &mut TimerApp<&ManualClock, MockOutputs>,
        steps: &'static [Step],
    ) -> ScriptedStream {
        let mut stream = ScriptedStream::new(steps);
        let mut buf = [0u8; 512];
        block_on(serve(&mut stream, app, &mut buf));
        stream
    }

    #[test]
    fn silent_connection_gets_no_reply() {
        let clock = ManualClock::new();
        let mut app = app(&clock);

        let quiet = serve_script(&mut app, &[Step::Quiet]);
        assert_eq!(quiet.written(), "");

        let gone = serve_script(&mut app, &[Step::Hangup]);
        assert_eq!(gone.written(), "");

        // The next connection is served as if nothing happened.
        let stream = serve_script(&mut app, &[Step::Send(b"GET /status HTTP/1.1\r\n\r\n")]);
        assert!(stream.written().starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(
            stream
                .written()
                .ends_with("{\"running\":false,\"remaining\":0,\"led\":0}\n")
        );
    }

    #[test]
    fn short_body_set_answers_with_the_default() {
        let clock = ManualClock::new();
        let mut app = app(&clock);

        // Declares forty body bytes but goes quiet after four.
        let stream = serve_script(
            &mut app,
            &[
                Step::Send(b"POST /set HTTP/1.1\r\nContent-Length: 40\r\n\r\nsec="),
                Step::Quiet,
            ],
        );
        assert!(stream.written().starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(stream.written().ends_with("OK\n"));

        let status = serve_script(&mut app, &[Step::Send(b"GET /status HTTP/1.1\r\n\r\n")]);
        assert!(
            status
                .written()
                .ends_with("{\"running\":true,\"remaining\":1,\"led\":0}\n")
        );
    }

    #[test]
    fn head_split_across_reads_is_reassembled() {
        let clock = ManualClock::new();
        let mut app = app(&clock);

        let stream = serve_script(
            &mut app,
            &[Step::Send(b"GET /sta"), Step::Send(b"tus HTTP/1.1\r\n\r\n")],
        );
        assert!(stream.written().starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(
            stream
                .written()
                .contains("Content-Type: application/json\r\n")
        );
    }

    #[test]
    fn garbage_request_line_gets_400() {
        let clock = ManualClock::new();
        let mut app = app(&clock);

        let stream = serve_script(&mut app, &[Step::Send(b"NONSENSE\r\n\r\n")]);
        assert!(stream.written().starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(stream.written().ends_with("Bad Request\n"));
    }

    #[test]
    fn hangup_after_request_line_is_still_served() {
        let clock = ManualClock::new();
        let mut app = app(&clock);

        let stream = serve_script(
            &mut app,
            &[Step::Send(b"GET / HTTP/1.1\r\nHost: x"), Step::Hangup],
        );
        assert!(stream.written().starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(stream.written().ends_with(PAGE));
    }

    #[test]
    fn read_fault_answers_500() {
        let clock = ManualClock::new();
        let mut app = app(&clock);

        let stream = serve_script(&mut app, &[Step::Reset]);
        assert!(
            stream
                .written()
                .starts_with("HTTP/1.1 500 Internal Server Error\r\n")
        );
        assert!(stream.written().ends_with("Error\n"));
    }
}
