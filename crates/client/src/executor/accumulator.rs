use std::ops::ControlFlow;

use tracing::trace;

use crate::request::Request;
use crate::response::Response;
use crate::transport::{TransferProgress, TransferSink};

const STATUS_LINE_PREFIX: &[u8] = b"HTTP/";
const CRLF: &[u8] = b"\r\n";

/// Collects the streamed header lines and body chunks of one transfer into a
/// [`Response`], and forwards progress ticks to the request's handler.
pub(crate) struct Accumulator<'a> {
    request: &'a Request,
    response: &'a mut Response,
}

impl<'a> Accumulator<'a> {
    pub(crate) fn new(request: &'a Request, response: &'a mut Response) -> Self {
        Self { request, response }
    }
}

impl TransferSink for Accumulator<'_> {
    fn on_header(&mut self, data: &[u8]) -> usize {
        if data.is_empty() || data == CRLF || data.starts_with(STATUS_LINE_PREFIX) {
            return data.len();
        }

        let line = data.strip_suffix(CRLF).unwrap_or(data);
        self.response.append_header(line);
        data.len()
    }

    fn on_body(&mut self, data: &[u8]) -> usize {
        trace!(len = data.len(), "received body chunk");
        self.response.append_body(data);
        data.len()
    }

    fn on_progress(&mut self, progress: TransferProgress) -> ControlFlow<()> {
        match self.request.progress_handler() {
            Some(handler) => {
                let flow = handler(self.request, progress);
                if flow.is_break() {
                    trace!(url = self.request.url(), "progress handler stopped transfer");
                }
                flow
            }
            None => ControlFlow::Continue(()),
        }
    }
}
