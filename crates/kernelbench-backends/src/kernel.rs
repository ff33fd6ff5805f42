//! GPU kernel sources and the compilation seam
//!
//! Kernels are described by a [`KernelSource`] and turned into a
//! [`CompiledProgram`] by a [`KernelCompiler`]. The production compiler is
//! [`ExternalCompiler`], which shells out to `nvcc`; tests substitute their
//! own implementations.
//!
//! # Bindings
//!
//! The vector-add kernel takes its three buffers as positional parameters.
//! [`VECTOR_ADD_BINDINGS`] is the only place their order is written down:
//! the generated parameter list and the order in which pipelines bind device
//! buffers both come from it.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::process::Command;
use std::sync::Arc;

use kernelbench_tracing::perf_span;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{BenchError, Result};
use crate::workload::Element;

/// Threads per workgroup for the vector-add kernel
pub const LOCAL_SIZE: u32 = 1024;

/// Entry point of the generated vector-add kernel
pub const VECTOR_ADD_ENTRY: &str = "vector_add";

/// File name the source is written to before compilation
pub const SOURCE_FILE: &str = "kernel.cu";

/// File name the compiler is expected to produce
pub const ARTIFACT_FILE: &str = "kernel.ptx";

/// Environment variable overriding the compiler program
pub const COMPILER_ENV: &str = "KERNELBENCH_NVCC";

/// How a kernel parameter is accessed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// One positional kernel parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Binding {
    /// Parameter position, also the workload buffer slot
    pub index: usize,
    pub name: &'static str,
    pub access: Access,
}

/// Ordered kernel parameters.
pub type BindingTable = [Binding];

/// `a` and `b` are read, `c` is written.
pub const VECTOR_ADD_BINDINGS: [Binding; 3] = [
    Binding {
        index: 0,
        name: "a",
        access: Access::Read,
    },
    Binding {
        index: 1,
        name: "b",
        access: Access::Read,
    },
    Binding {
        index: 2,
        name: "c",
        access: Access::Write,
    },
];

/// Number of workgroups needed to cover `size` invocations.
pub fn workgroup_count(size: usize, local_size: u32) -> u32 {
    size.div_ceil(local_size as usize) as u32
}

/// Kernel text plus the metadata needed to compile and dispatch it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelSource {
    pub entry: &'static str,
    pub text: String,
    pub local_size: u32,
}

impl KernelSource {
    pub fn new(entry: &'static str, text: impl Into<String>, local_size: u32) -> Self {
        Self {
            entry,
            text: text.into(),
            local_size,
        }
    }

    /// CUDA C source computing `c[i] = a[i] + b[i]` for element type `T`.
    ///
    /// Every invocation writes; the dispatch must cover exactly the buffer
    /// length. Integer sums wrap on overflow.
    pub fn vector_add<T: Element>() -> Self {
        let bindings = &VECTOR_ADD_BINDINGS;
        let [lhs, rhs] = [bindings[0].name, bindings[1].name];
        let out = bindings[2].name;
        let sum = if T::C_SUM_TYPE == T::C_TYPE {
            format!("{lhs}[index] + {rhs}[index]")
        } else {
            format!(
                "({ty})(({acc}){lhs}[index] + ({acc}){rhs}[index])",
                ty = T::C_TYPE,
                acc = T::C_SUM_TYPE,
            )
        };
        let text = format!(
            "extern \"C\" __global__ void __launch_bounds__({local}) {entry}({params})\n\
             {{\n    \
                 unsigned int index = blockIdx.x * blockDim.x + threadIdx.x;\n    \
                 {out}[index] = {sum};\n\
             }}\n",
            local = LOCAL_SIZE,
            entry = VECTOR_ADD_ENTRY,
            params = parameter_list(bindings, T::C_TYPE),
        );
        Self::new(VECTOR_ADD_ENTRY, text, LOCAL_SIZE)
    }
}

fn parameter_list(bindings: &BindingTable, c_type: &str) -> String {
    bindings
        .iter()
        .map(|binding| match binding.access {
            Access::Read => format!("const {c_type}* __restrict__ {}", binding.name),
            Access::Write => format!("{c_type}* __restrict__ {}", binding.name),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Output of a successful compilation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledProgram {
    pub entry: &'static str,
    pub ptx: String,
}

/// Turns kernel source into a loadable program.
pub trait KernelCompiler {
    fn compile(&self, source: &KernelSource) -> Result<CompiledProgram>;
}

impl<C: KernelCompiler + ?Sized> KernelCompiler for &C {
    fn compile(&self, source: &KernelSource) -> Result<CompiledProgram> {
        (**self).compile(source)
    }
}

/// Compiles by running an external tool in a scratch directory.
///
/// Arguments may contain `{input}` and `{output}`, which are replaced by the
/// paths of [`SOURCE_FILE`] and [`ARTIFACT_FILE`].
#[derive(Clone, Debug)]
pub struct ExternalCompiler {
    program: String,
    args: Vec<String>,
}

impl ExternalCompiler {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `nvcc --ptx {input} -o {output}`, with the program taken from
    /// `KERNELBENCH_NVCC` when set.
    pub fn nvcc() -> Self {
        let program = env::var(COMPILER_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "nvcc".to_string());
        Self::new(program, ["--ptx", "{input}", "-o", "{output}"])
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for ExternalCompiler {
    fn default() -> Self {
        Self::nvcc()
    }
}

impl KernelCompiler for ExternalCompiler {
    fn compile(&self, source: &KernelSource) -> Result<CompiledProgram> {
        let _span = perf_span!("compile_kernel", entry = source.entry, tool = self.program.as_str());

        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join(SOURCE_FILE);
        let output = scratch.path().join(ARTIFACT_FILE);
        fs::write(&input, &source.text)?;

        let input_arg = input.to_string_lossy();
        let output_arg = output.to_string_lossy();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace("{input}", &input_arg).replace("{output}", &output_arg))
            .collect();

        debug!(tool = %self.program, ?args, "invoking kernel compiler");
        let result = Command::new(&self.program)
            .args(&args)
            .current_dir(scratch.path())
            .output()
            .map_err(|err| BenchError::compilation(&self.program, err.to_string()))?;

        if !result.status.success() {
            return Err(BenchError::Compilation {
                tool: self.program.clone(),
                status: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        let ptx = fs::read_to_string(&output).map_err(|err| {
            BenchError::compilation(&self.program, format!("reading {ARTIFACT_FILE}: {err}"))
        })?;

        Ok(CompiledProgram {
            entry: source.entry,
            ptx,
        })
    }
}

/// Memoises another compiler by entry point and source text.
pub struct CachingCompiler<C> {
    inner: C,
    cache: RwLock<HashMap<(&'static str, String), Arc<CompiledProgram>>>,
}

impl<C: KernelCompiler> CachingCompiler<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: KernelCompiler> KernelCompiler for CachingCompiler<C> {
    fn compile(&self, source: &KernelSource) -> Result<CompiledProgram> {
        let key = (source.entry, source.text.clone());
        if let Some(program) = self.cache.read().get(&key) {
            return Ok(CompiledProgram::clone(program));
        }

        // Failures are not cached.
        let program = Arc::new(self.inner.compile(source)?);
        self.cache.write().insert(key, Arc::clone(&program));
        Ok(CompiledProgram::clone(&program))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn workgroups_cover_size() {
        assert_eq!(workgroup_count(4096, 1024), 4);
        assert_eq!(workgroup_count(4097, 1024), 5);
        assert_eq!(workgroup_count(16, 1024), 1);
        assert_eq!(workgroup_count(0, 1024), 0);
    }

    #[test]
    fn vector_add_parameters_follow_binding_order() {
        let source = KernelSource::vector_add::<f32>();
        assert_eq!(source.entry, VECTOR_ADD_ENTRY);
        assert_eq!(source.local_size, LOCAL_SIZE);
        assert!(source.text.contains(
            "vector_add(const float* __restrict__ a, const float* __restrict__ b, float* __restrict__ c)"
        ));
        assert!(source.text.contains("c[index] = a[index] + b[index];"));
    }

    #[test]
    fn vector_add_uses_element_c_type() {
        let source = KernelSource::vector_add::<u64>();
        assert!(source.text.contains("const unsigned long long* __restrict__ a"));
        assert!(source.text.contains("c[index] = a[index] + b[index];"));
    }

    #[test]
    fn signed_vector_add_sums_in_unsigned_type() {
        let source = KernelSource::vector_add::<i32>();
        assert!(source.text.contains("const int* __restrict__ a"));
        assert!(source
            .text
            .contains("c[index] = (int)((unsigned int)a[index] + (unsigned int)b[index]);"));

        let source = KernelSource::vector_add::<i8>();
        assert!(source
            .text
            .contains("c[index] = (signed char)((unsigned char)a[index] + (unsigned char)b[index]);"));
    }

    struct Counting {
        calls: Cell<usize>,
    }

    impl KernelCompiler for Counting {
        fn compile(&self, source: &KernelSource) -> Result<CompiledProgram> {
            self.calls.set(self.calls.get() + 1);
            Ok(CompiledProgram {
                entry: source.entry,
                ptx: format!("// {} bytes", source.text.len()),
            })
        }
    }

    #[test]
    fn caching_compiler_compiles_each_source_once() {
        let compiler = CachingCompiler::new(Counting { calls: Cell::new(0) });
        let f32_add = KernelSource::vector_add::<f32>();
        let i32_add = KernelSource::vector_add::<i32>();

        let first = compiler.compile(&f32_add).unwrap();
        let second = compiler.compile(&f32_add).unwrap();
        assert_eq!(first, second);
        assert_eq!(compiler.inner().calls.get(), 1);

        compiler.compile(&i32_add).unwrap();
        assert_eq!(compiler.inner().calls.get(), 2);
        assert_eq!(compiler.len(), 2);
    }
}
