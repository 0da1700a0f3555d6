// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains exception and Result definitions
use thiserror::Error;

/// Represents all kind of errors which can be raised by the simulated gripper.
///
/// Note that a command which was preempted or which missed its object is not an error. Such
/// results are reported as [`CommandOutcome`](`crate::CommandOutcome`) values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GripperException {
    /// InvalidParameter is returned if a command argument is outside of its physical bounds.
    /// The command is rejected before the controller state is touched.
    #[error("{message:?}")]
    InvalidParameter { message: String },

    /// ConfigException is returned if the configuration cannot be read or is inconsistent.
    #[error("{message:?}")]
    ConfigException { message: String },

    /// RealTimeException is returned if the real-time priority cannot be set
    #[error("{message:?}")]
    RealTimeException { message: String },
}

/// creates an InvalidParameter exception from a message
pub(crate) fn create_invalid_parameter(message: impl Into<String>) -> GripperException {
    GripperException::InvalidParameter {
        message: message.into(),
    }
}

/// creates a ConfigException from a message
pub(crate) fn create_config_exception(message: impl Into<String>) -> GripperException {
    GripperException::ConfigException {
        message: message.into(),
    }
}

/// Result type which can have GripperException as Error
pub type GripperResult<T> = Result<T, GripperException>;
