use thiserror::Error;

use crate::checker::CheckError;

/// A fault that escaped a check cycle. Caught at the cycle boundary in
/// [`Monitor::poll_once`](crate::Monitor::poll_once); never ends the process.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Check(#[from] CheckError),
    #[error("panic during check cycle: {0}")]
    Panic(String),
}

impl MonitorError {
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        Self::Panic(panic_message(payload))
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_readable() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(
            MonitorError::from_panic(boxed.as_ref()).to_string(),
            "panic during check cycle: owned boom"
        );

        let boxed: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic payload");
    }

    #[test]
    fn check_errors_pass_through() {
        let err: MonitorError = CheckError::Internal("resolver poisoned".into()).into();
        assert_eq!(
            err.to_string(),
            "health check failed unexpectedly: resolver poisoned"
        );
    }
}
