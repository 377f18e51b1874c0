// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Process Exit Codes
//!
//! BSD `sysexits.h`-style codes so callers scripting this binary (CI,
//! other tools) can branch on failure class without parsing messages.

use cas_sync_domain::CacheError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    Usage = 64,
    DataErr = 65,
    NoInput = 66,
    Unavailable = 69,
    Software = 70,
    IoErr = 74,
    TempFail = 75,
    NoPerm = 77,
    ConfigErr = 78,
    SignalInterrupt = 130,
    SignalTerminate = 143,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::GeneralError => "general error",
            Self::Usage => "command line usage error",
            Self::DataErr => "data format error",
            Self::NoInput => "input object not found",
            Self::Unavailable => "service unavailable",
            Self::Software => "internal software error",
            Self::IoErr => "input/output error",
            Self::TempFail => "temporary failure, retry may succeed",
            Self::NoPerm => "permission denied",
            Self::ConfigErr => "configuration error",
            Self::SignalInterrupt => "interrupted (SIGINT)",
            Self::SignalTerminate => "terminated (SIGTERM)",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_signal(self) -> bool {
        matches!(self, Self::SignalInterrupt | Self::SignalTerminate)
    }

    /// Map an engine error to its exit code by [`CacheError::category`].
    pub fn from_error(err: &CacheError) -> Self {
        match err.category() {
            "configuration" => Self::ConfigErr,
            "object_missing" => Self::NoInput,
            "permission" => Self::NoPerm,
            "corruption" | "invariant" => Self::DataErr,
            "upload" | "download" => Self::TempFail,
            "link_strategy" => Self::Unavailable,
            "io" => Self::IoErr,
            "database" | "serialization" => Self::Software,
            "cyclic_graph" => Self::DataErr,
            _ => Self::Software,
        }
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code(), self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_map_to_config_err() {
        let err = CacheError::configuration("bad remote spec");
        assert_eq!(ExitCode::from_error(&err), ExitCode::ConfigErr);
        assert_eq!(ExitCode::ConfigErr.code(), 78);
    }

    #[test]
    fn object_missing_maps_to_no_input() {
        let err = CacheError::ObjectMissing("abc123".to_string());
        assert_eq!(ExitCode::from_error(&err), ExitCode::NoInput);
    }

    #[test]
    fn upload_failures_are_temp_fail() {
        let err = CacheError::UploadError(3);
        assert_eq!(ExitCode::from_error(&err), ExitCode::TempFail);
    }

    #[test]
    fn signal_codes_are_recognized() {
        assert!(ExitCode::SignalInterrupt.is_signal());
        assert!(ExitCode::SignalTerminate.is_signal());
        assert!(!ExitCode::Success.is_signal());
        assert!(ExitCode::Success.is_success());
    }
}
