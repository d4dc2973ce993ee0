//! Acquisition and close-notification state shared by every channel
//!
//! The close notification is a single-assignment slot: the callback may be
//! registered before or after the channel closes, and it fires exactly once
//! when both the callback and the close reason are present.

use crate::common::Handler;
use crate::hci::ErrorCode;

/// Invoked once with the reason a channel closed
pub type CloseCallback = Box<dyn FnOnce(ErrorCode) + Send + 'static>;

#[derive(Default)]
pub(crate) struct ChannelLifecycle {
    acquired: bool,
    callback_registered: bool,
    callback: Option<(Handler, CloseCallback)>,
    close_reason: Option<ErrorCode>,
}

impl ChannelLifecycle {
    pub fn register_on_close_callback(&mut self, handler: Handler, callback: CloseCallback) {
        assert!(
            !self.callback_registered,
            "On close callback can only be registered once"
        );
        self.callback_registered = true;

        match self.close_reason {
            Some(reason) => handler.post(move || callback(reason)),
            None => self.callback = Some((handler, callback)),
        }
    }

    pub fn on_closed(&mut self, reason: ErrorCode) {
        assert!(
            self.close_reason.is_none(),
            "Channel closed twice (first with {:?})",
            self.close_reason
        );
        self.close_reason = Some(reason);
        self.acquired = false;

        if let Some((handler, callback)) = self.callback.take() {
            handler.post(move || callback(reason));
        }
    }

    pub fn acquire(&mut self) {
        self.check_usable("acquire");
        self.acquired = true;
    }

    pub fn release(&mut self) {
        self.check_usable("release");
        self.acquired = false;
    }

    pub fn is_acquired(&self) -> bool {
        self.acquired
    }

    pub fn is_closed(&self) -> bool {
        self.close_reason.is_some()
    }

    pub fn check_usable(&self, operation: &str) {
        assert!(
            self.callback_registered,
            "Must register on close callback before calling {}",
            operation
        );
        assert!(
            self.close_reason.is_none(),
            "Cannot {} a closed channel",
            operation
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    fn recording_callback() -> (CloseCallback, mpsc::Receiver<ErrorCode>) {
        let (tx, rx) = mpsc::channel();
        (Box::new(move |reason| tx.send(reason).unwrap()), rx)
    }

    #[test]
    fn test_close_after_registration() {
        let handler = Handler::new("lifecycle_close").unwrap();
        let mut lifecycle = ChannelLifecycle::default();
        let (callback, rx) = recording_callback();

        lifecycle.register_on_close_callback(handler.clone(), callback);
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        lifecycle.on_closed(ErrorCode::CONNECTION_TIMEOUT);
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            ErrorCode::CONNECTION_TIMEOUT
        );
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        handler.stop();
    }

    #[test]
    fn test_late_registration_replays_reason() {
        let handler = Handler::new("lifecycle_late").unwrap();
        let mut lifecycle = ChannelLifecycle::default();
        let (callback, rx) = recording_callback();

        lifecycle.on_closed(ErrorCode::REMOTE_USER_TERMINATED_CONNECTION);
        lifecycle.register_on_close_callback(handler.clone(), callback);

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            ErrorCode::REMOTE_USER_TERMINATED_CONNECTION
        );
        handler.stop();
    }

    #[test]
    fn test_acquire_and_release() {
        let handler = Handler::new("lifecycle_acquire").unwrap();
        let mut lifecycle = ChannelLifecycle::default();
        let (callback, _rx) = recording_callback();

        lifecycle.register_on_close_callback(handler.clone(), callback);
        lifecycle.acquire();
        assert!(lifecycle.is_acquired());
        lifecycle.release();
        assert!(!lifecycle.is_acquired());
        handler.stop();
    }

    #[test]
    #[should_panic(expected = "only be registered once")]
    fn test_double_registration_panics() {
        let handler = Handler::new("lifecycle_double_register").unwrap();
        let mut lifecycle = ChannelLifecycle::default();
        let (first, _rx1) = recording_callback();
        let (second, _rx2) = recording_callback();

        lifecycle.register_on_close_callback(handler.clone(), first);
        lifecycle.register_on_close_callback(handler, second);
    }

    #[test]
    #[should_panic(expected = "closed twice")]
    fn test_double_close_panics() {
        let mut lifecycle = ChannelLifecycle::default();
        lifecycle.on_closed(ErrorCode::SUCCESS);
        lifecycle.on_closed(ErrorCode::SUCCESS);
    }

    #[test]
    #[should_panic(expected = "before calling acquire")]
    fn test_acquire_before_registration_panics() {
        let mut lifecycle = ChannelLifecycle::default();
        lifecycle.acquire();
    }

    #[test]
    #[should_panic(expected = "closed channel")]
    fn test_release_after_close_panics() {
        let handler = Handler::new("lifecycle_release_closed").unwrap();
        let mut lifecycle = ChannelLifecycle::default();
        let (callback, _rx) = recording_callback();

        lifecycle.register_on_close_callback(handler, callback);
        lifecycle.on_closed(ErrorCode::SUCCESS);
        lifecycle.release();
    }
}
