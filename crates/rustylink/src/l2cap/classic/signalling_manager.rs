//! Outbound signalling request bookkeeping for one link
//!
//! Only one request is on the air at a time. Later requests wait in a queue
//! and go out once the outstanding one is answered, rejected or times out.

use super::link::Link;
use crate::common::{Alarm, Handler};
use crate::l2cap::signaling::{SignalId, SignalingMessage};
use log::trace;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::{Mutex, Weak};
use std::time::Duration;

pub(crate) struct ClassicSignallingManager {
    next_identifier: SignalId,
    outstanding: Option<SignalingMessage>,
    queue: VecDeque<SignalingMessage>,
    rtx_alarm: Alarm,
    rtx_timeout: Duration,
    ertx_timeout: Duration,
}

impl ClassicSignallingManager {
    pub fn new(handler: Handler, rtx_timeout: Duration, ertx_timeout: Duration) -> Self {
        Self {
            next_identifier: rand::thread_rng().gen_range(1..=SignalId::MAX),
            outstanding: None,
            queue: VecDeque::new(),
            rtx_alarm: Alarm::new(handler),
            rtx_timeout,
            ertx_timeout,
        }
    }

    /// Next identifier for an outgoing request; zero is never used
    pub fn next_identifier(&mut self) -> SignalId {
        let identifier = self.next_identifier;
        self.next_identifier = match identifier {
            SignalId::MAX => 1,
            _ => identifier + 1,
        };
        identifier
    }

    /// Queue `request`, returning it if it may be sent right away
    pub fn submit(&mut self, request: SignalingMessage) -> Option<SignalingMessage> {
        if self.outstanding.is_none() {
            self.outstanding = Some(request.clone());
            Some(request)
        } else {
            trace!(
                "Queueing signalling request {} behind outstanding one",
                request.identifier()
            );
            self.queue.push_back(request);
            None
        }
    }

    pub fn outstanding(&self) -> Option<&SignalingMessage> {
        self.outstanding.as_ref()
    }

    /// Take the outstanding request if it carries `identifier`
    pub fn complete(&mut self, identifier: SignalId) -> Option<SignalingMessage> {
        match &self.outstanding {
            Some(request) if request.identifier() == identifier => {
                self.rtx_alarm.cancel();
                self.outstanding.take()
            }
            _ => None,
        }
    }

    /// Promote the next queued request once nothing is outstanding
    pub fn advance(&mut self) -> Option<SignalingMessage> {
        if self.outstanding.is_some() {
            return None;
        }
        let request = self.queue.pop_front()?;
        self.outstanding = Some(request.clone());
        Some(request)
    }

    /// (Re)start the response timer for request `identifier`
    pub fn arm_rtx(&self, link: Weak<Mutex<Link>>, identifier: SignalId) {
        self.arm_timer(self.rtx_timeout, link, identifier);
    }

    /// Restart the timer with the extended timeout after a pending response
    pub fn arm_ertx(&self, link: Weak<Mutex<Link>>, identifier: SignalId) {
        self.arm_timer(self.ertx_timeout, link, identifier);
    }

    fn arm_timer(&self, timeout: Duration, link: Weak<Mutex<Link>>, identifier: SignalId) {
        self.rtx_alarm.schedule(timeout, move || {
            if let Some(link) = link.upgrade() {
                link.lock().unwrap().on_signalling_timeout(identifier);
            }
        });
    }

    pub fn clear(&mut self) {
        self.rtx_alarm.cancel();
        self.outstanding = None;
        self.queue.clear();
    }
}
