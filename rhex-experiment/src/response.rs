use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use rhex_core::ResponseForm;

/// Presents a questionnaire and answers it through the handle.
pub trait ResponseCollector {
    fn show(&mut self, handle: ResponseHandle);
}

impl<F: FnMut(ResponseHandle)> ResponseCollector for F {
    fn show(&mut self, handle: ResponseHandle) {
        self(handle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketStatus {
    Pending,
    Answered(String),
    /// The handle was dropped without an answer; nothing will ever arrive
    Abandoned,
}

/// Answering side of one questionnaire request
#[derive(Debug)]
pub struct ResponseHandle {
    form: ResponseForm,
    tx: Sender<String>,
}

/// Waiting side of one questionnaire request, polled by the runner
#[derive(Debug)]
pub struct ResponseTicket {
    form: ResponseForm,
    rx: Receiver<String>,
}

pub fn response_pair(form: ResponseForm) -> (ResponseHandle, ResponseTicket) {
    let (tx, rx) = bounded(1);
    (ResponseHandle { form, tx }, ResponseTicket { form, rx })
}

impl ResponseHandle {
    pub fn form(&self) -> ResponseForm {
        self.form
    }

    /// Completes the request. Consuming `self` makes a second answer impossible.
    /// Returns false when the requester is already gone.
    pub fn submit(self, answers: impl Into<String>) -> bool {
        self.tx.send(answers.into()).is_ok()
    }
}

impl ResponseTicket {
    pub fn form(&self) -> ResponseForm {
        self.form
    }

    pub fn poll(&self) -> TicketStatus {
        match self.rx.try_recv() {
            Ok(answers) => TicketStatus::Answered(answers),
            Err(TryRecvError::Empty) => TicketStatus::Pending,
            Err(TryRecvError::Disconnected) => TicketStatus::Abandoned,
        }
    }
}
