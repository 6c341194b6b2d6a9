use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{gadget} gadget not enabled")]
    GadgetMissing { gadget: &'static str },

    #[error("HID write blocked on {gadget} (EAGAIN)")]
    HidBusy { gadget: &'static str },

    #[error("USB link down on {gadget}: {reason}")]
    HidLinkDown {
        gadget: &'static str,
        reason: String,
    },

    #[error("HID write failed on {gadget}: {reason}")]
    HidWrite {
        gadget: &'static str,
        reason: String,
    },

    #[error("Input device lost: {0}")]
    DeviceLost(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Transient backpressure: the gadget's output buffer is momentarily full.
    pub fn is_busy(&self) -> bool {
        matches!(self, AppError::HidBusy { .. })
    }

    /// The USB transport itself is gone (cable pulled, host suspended the bus).
    pub fn is_link_down(&self) -> bool {
        matches!(self, AppError::HidLinkDown { .. })
    }

    /// Classify a failed gadget device write by errno.
    ///
    /// EAGAIN means the endpoint buffer is full and the write may be retried;
    /// EPIPE/ESHUTDOWN/ENODEV/ENXIO all indicate the transport is down.
    pub fn from_hid_write(gadget: &'static str, err: std::io::Error) -> Self {
        match err.raw_os_error() {
            Some(libc::EAGAIN) => AppError::HidBusy { gadget },
            Some(libc::EPIPE) | Some(libc::ESHUTDOWN) | Some(libc::ENODEV)
            | Some(libc::ENXIO) => AppError::HidLinkDown {
                gadget,
                reason: err.to_string(),
            },
            _ => AppError::HidWrite {
                gadget,
                reason: err.to_string(),
            },
        }
    }
}

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_eagain_as_busy() {
        let err =
            AppError::from_hid_write("keyboard", std::io::Error::from_raw_os_error(libc::EAGAIN));
        assert!(err.is_busy());
        assert!(!err.is_link_down());
    }

    #[test]
    fn classifies_transport_errnos_as_link_down() {
        for errno in [libc::EPIPE, libc::ESHUTDOWN, libc::ENODEV, libc::ENXIO] {
            let err = AppError::from_hid_write("mouse", std::io::Error::from_raw_os_error(errno));
            assert!(err.is_link_down(), "errno {} should be link-down", errno);
        }
    }

    #[test]
    fn other_errnos_are_plain_write_errors() {
        let err =
            AppError::from_hid_write("consumer", std::io::Error::from_raw_os_error(libc::EINVAL));
        assert!(!err.is_busy());
        assert!(!err.is_link_down());
    }
}
