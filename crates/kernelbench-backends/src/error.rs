//! Error types for backend setup and execution

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Errors that abort a single benchmark configuration (one backend at one size).
///
/// None of these are retried. Binding-order or workgroup-divisibility mistakes
/// inside a kernel are not detected here; they produce wrong output instead.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// The external kernel compiler could not be run or exited unsuccessfully
    #[error("kernel compilation with `{tool}` failed ({}): {stderr}", describe_status(.status))]
    Compilation {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },

    /// A host or device memory request failed
    #[error("{what} allocation of {requested} bytes failed")]
    Allocation { what: &'static str, requested: usize },

    /// Device, BLAS or RNG initialisation or call failed
    #[error("device error: {0}")]
    Device(String),

    /// Problem size sweep bounds are inconsistent
    #[error("invalid sweep: {0}")]
    InvalidSweep(String),

    /// Workload buffers do not share one length
    #[error("buffer length mismatch: a={a}, b={b}, c={c}")]
    LengthMismatch { a: usize, b: usize, c: usize },

    /// Problem size is not a whole number of workgroups
    #[error("problem size {size} is not a multiple of the local workgroup size {local_size}")]
    MisalignedDispatch { size: usize, local_size: u32 },

    /// Filesystem error while staging kernel sources
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Create a compilation error for a tool that produced no exit status
    pub fn compilation(tool: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Compilation {
            tool: tool.into(),
            status: None,
            stderr: detail.into(),
        }
    }

    /// Create a device error
    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "no exit status".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compilation_message_includes_status_and_stderr() {
        let err = BenchError::Compilation {
            tool: "nvcc".to_string(),
            status: Some(2),
            stderr: "kernel.cu(3): error: expected a \";\"".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("`nvcc`"));
        assert!(msg.contains("exit status 2"));
        assert!(msg.contains("expected a"));
    }

    #[test]
    fn missing_tool_has_no_status() {
        let err = BenchError::compilation("nvcc", "No such file or directory");
        assert!(err.to_string().contains("no exit status"));
    }
}
