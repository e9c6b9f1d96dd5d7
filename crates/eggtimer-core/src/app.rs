//! Application context: the countdown, its pins and the route dispatch.

use core::fmt::{self, Write as _};

use log::{debug, info};

use crate::{
    clock::Clock,
    http::{Route, StatusCode, form_field},
    outputs::OutputBank,
    supervise::IntervalGate,
    timer::{CountdownTimer, MAX_TIMER_SECONDS},
};

const LIVENESS_PERIOD_MS: u32 = 1_000;

/// Largest rendered reply body that is not the static page.
const REPLY_BYTES: usize = 96;

pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html; charset=utf-8";
pub const APPLICATION_JSON: &str = "application/json";

const BODY_OK: &str = "OK\n";
const BODY_NOT_FOUND: &str = "Not Found\n";
const BODY_BAD_REQUEST: &str = "Bad Request\n";
const BODY_ERROR: &str = "Error\n";

/// A fully decided response: status, content type and body bytes.
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub content_type: &'static str,
    body: ReplyBody,
}

#[derive(Debug)]
enum ReplyBody {
    Fixed(&'static str),
    Rendered(heapless::String<REPLY_BYTES>),
}

impl Reply {
    fn fixed(status: StatusCode, content_type: &'static str, body: &'static str) -> Self {
        Self {
            status,
            content_type,
            body: ReplyBody::Fixed(body),
        }
    }

    pub fn ok() -> Self {
        Self::fixed(StatusCode::Ok, TEXT_PLAIN, BODY_OK)
    }

    pub fn not_found() -> Self {
        Self::fixed(StatusCode::NotFound, TEXT_PLAIN, BODY_NOT_FOUND)
    }

    pub fn bad_request() -> Self {
        Self::fixed(StatusCode::BadRequest, TEXT_PLAIN, BODY_BAD_REQUEST)
    }

    pub fn fault() -> Self {
        Self::fixed(StatusCode::Error, TEXT_PLAIN, BODY_ERROR)
    }

    fn page(html: &'static str) -> Self {
        Self::fixed(StatusCode::Ok, TEXT_HTML, html)
    }

    fn json(rendered: heapless::String<REPLY_BYTES>) -> Self {
        Self {
            status: StatusCode::Ok,
            content_type: APPLICATION_JSON,
            body: ReplyBody::Rendered(rendered),
        }
    }

    pub fn body(&self) -> &str {
        match &self.body {
            ReplyBody::Fixed(text) => text,
            ReplyBody::Rendered(text) => text.as_str(),
        }
    }
}

/// Everything the event loop owns about the timer appliance, behind the
/// clock and pin seams so the whole surface runs in host tests.
pub struct TimerApp<C, O>
where
    C: Clock,
    O: OutputBank,
{
    clock: C,
    outputs: O,
    timer: CountdownTimer,
    liveness: IntervalGate,
    index_page: &'static str,
}

impl<C, O> TimerApp<C, O>
where
    C: Clock,
    O: OutputBank,
{
    /// Both pins start driven off; the first heartbeat toggle comes one
    /// period after construction.
    pub fn new(clock: C, mut outputs: O, index_page: &'static str) -> Self {
        let start = clock.now();
        outputs.set_liveness(false);
        outputs.set_indicator(false);
        Self {
            clock,
            outputs,
            timer: CountdownTimer::new(),
            liveness: IntervalGate::new(start, LIVENESS_PERIOD_MS),
            index_page,
        }
    }

    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    /// One iteration of the loop's own duties: heartbeat toggle and
    /// countdown expiry.
    pub fn service(&mut self) {
        let now = self.clock.now();
        if self.liveness.due(now) {
            self.outputs.toggle_liveness();
        }
        if self.timer.tick(now) {
            self.outputs.set_indicator(true);
            info!("timer expired, indicator on");
        }
    }

    /// Arms the countdown and clears the indicator. Returns the clamped
    /// duration actually armed.
    pub fn set_timer(&mut self, seconds: u32) -> u32 {
        let now = self.clock.now();
        let armed = self.timer.start(now, seconds);
        self.outputs.set_indicator(false);
        info!("timer armed: {armed}s");
        armed
    }

    pub fn stop_timer(&mut self) {
        self.timer.stop();
        info!("timer stopped");
    }

    pub fn clear_indicator(&mut self) {
        self.outputs.set_indicator(false);
    }

    fn render_status<const N: usize>(&mut self, out: &mut heapless::String<N>) -> fmt::Result {
        let now = self.clock.now();
        write!(
            out,
            "{{\"running\":{},\"remaining\":{},\"led\":{}}}\n",
            self.timer.is_running(),
            self.timer.remaining_seconds(now),
            u8::from(self.outputs.indicator_on()),
        )
    }

    /// Serves one resolved route. `body` is whatever of the request body
    /// made it into the buffer; only the set route looks at it.
    pub fn respond(&mut self, route: Route, body: &[u8]) -> Reply {
        debug!("dispatch {:?}", route);
        match route {
            Route::Index => Reply::page(self.index_page),
            Route::Status => {
                let mut json = heapless::String::new();
                match self.render_status(&mut json) {
                    Ok(()) => Reply::json(json),
                    Err(_) => Reply::fault(),
                }
            }
            Route::Set => {
                let requested = form_field(body, "sec")
                    .and_then(|value| value.trim().parse::<u64>().ok())
                    .unwrap_or(1);
                // Pre-clamp so oversized numerals survive the u32 cast.
                self.set_timer(requested.min(u64::from(MAX_TIMER_SECONDS)) as u32);
                Reply::ok()
            }
            Route::Stop => {
                self.stop_timer();
                Reply::ok()
            }
            Route::LedOff => {
                self.clear_indicator();
                Reply::ok()
            }
            Route::NotFound => Reply::not_found(),
        }
    }
}
