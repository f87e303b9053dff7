#![cfg(test)]
//! Test doubles for the stream transport.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::connection::{NotificationStream, StreamConnector, StreamEvent};
use crate::{Error, Result};
use url::Url;

/// Event script shared between a test and the streams its connector opens.
///
/// Events pushed here come back out of [`MockStream::try_recv`] in order,
/// so a test can stage a whole connection lifetime up front or feed events
/// between ticks.
#[derive(Clone, Default)]
pub struct SharedScript {
    events: Rc<RefCell<VecDeque<StreamEvent>>>,
    open_failure: Rc<RefCell<Option<Error>>>,
}

impl SharedScript {
    pub fn push(&self, event: StreamEvent) {
        self.events.borrow_mut().push_back(event);
    }

    pub fn pop(&self) -> Option<StreamEvent> {
        self.events.borrow_mut().pop_front()
    }

    /// Make the next `open` call fail with `err` instead of producing a
    /// stream.
    pub fn fail_next_open(&self, err: Error) {
        *self.open_failure.borrow_mut() = Some(err);
    }

    fn take_open_failure(&self) -> Option<Error> {
        self.open_failure.borrow_mut().take()
    }
}

pub struct MockConnector {
    script: SharedScript,
    opened: Rc<RefCell<Vec<String>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            script: SharedScript::default(),
            opened: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn script(&self) -> SharedScript {
        self.script.clone()
    }

    /// Urls of every successfully opened stream, in order.
    pub fn opened_urls(&self) -> Rc<RefCell<Vec<String>>> {
        self.opened.clone()
    }
}

impl StreamConnector for MockConnector {
    type Stream = MockStream;

    fn open(&mut self, url: &Url) -> Result<MockStream> {
        if let Some(err) = self.script.take_open_failure() {
            return Err(err);
        }
        self.opened.borrow_mut().push(url.to_string());
        Ok(MockStream {
            script: self.script.clone(),
        })
    }
}

pub struct MockStream {
    script: SharedScript,
}

impl NotificationStream for MockStream {
    fn try_recv(&mut self) -> Option<StreamEvent> {
        self.script.pop()
    }
}
