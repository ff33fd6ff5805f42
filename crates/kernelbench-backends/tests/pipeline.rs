//! Kernel pipeline behaviour against a host-emulated device

use std::cell::{Cell, RefCell};

use kernelbench_backends::kernel::{Access, Binding, VECTOR_ADD_BINDINGS, VECTOR_ADD_ENTRY};
use kernelbench_backends::{
    BenchError, CompiledProgram, ComputeDevice, Element, KernelCompiler, KernelPipeline, KernelSource, Result,
    Workload, LOCAL_SIZE,
};

/// Runs the vector-add kernel on the host, one loop iteration per invocation.
#[derive(Default)]
struct HostDevice {
    opened: Cell<bool>,
    dispatches: Cell<usize>,
    last_grid: Cell<Option<(u32, u32)>>,
    uploads: RefCell<Vec<usize>>,
    downloads: Cell<usize>,
}

impl HostDevice {
    fn open(log: &HostDevice) -> Result<Self> {
        log.opened.set(true);
        Ok(Self::default())
    }
}

impl<T: Element> ComputeDevice<T> for HostDevice {
    type Buffer = Vec<T>;
    type Program = &'static str;

    fn name(&self) -> &'static str {
        "host"
    }

    fn allocate_buffer(&self, len: usize) -> Result<Vec<T>> {
        Ok(vec![T::default(); len])
    }

    fn copy_to_buffer(&self, src: &[T], dst: &mut Vec<T>) -> Result<()> {
        dst.copy_from_slice(src);
        self.uploads.borrow_mut().push(src.len());
        Ok(())
    }

    fn copy_from_buffer(&self, src: &Vec<T>, dst: &mut [T]) -> Result<()> {
        dst.copy_from_slice(src);
        self.downloads.set(self.downloads.get() + 1);
        Ok(())
    }

    fn load_program(&self, program: &CompiledProgram) -> Result<&'static str> {
        Ok(program.entry)
    }

    fn dispatch(&self, program: &&'static str, buffers: &mut [Vec<T>], workgroups: u32, local_size: u32) -> Result<()> {
        assert_eq!(*program, VECTOR_ADD_ENTRY);
        self.dispatches.set(self.dispatches.get() + 1);
        self.last_grid.set(Some((workgroups, local_size)));

        let [a, b, c] = buffers else {
            return Err(BenchError::device("expected three buffers"));
        };
        for index in 0..(workgroups * local_size) as usize {
            c[index] = a[index].add(b[index]);
        }
        Ok(())
    }
}

struct PassThrough;

impl KernelCompiler for PassThrough {
    fn compile(&self, source: &KernelSource) -> Result<CompiledProgram> {
        Ok(CompiledProgram {
            entry: source.entry,
            ptx: source.text.clone(),
        })
    }
}

struct Broken;

impl KernelCompiler for Broken {
    fn compile(&self, _source: &KernelSource) -> Result<CompiledProgram> {
        Err(BenchError::Compilation {
            tool: "nvcc".to_string(),
            status: Some(1),
            stderr: "kernel.cu(2): error: expected a \";\"".to_string(),
        })
    }
}

fn build<T: Element>(
    log: &HostDevice,
    compiler: &dyn KernelCompiler,
    len: usize,
) -> Result<KernelPipeline<T, HostDevice>> {
    KernelPipeline::build(
        || HostDevice::open(log),
        compiler,
        &KernelSource::vector_add::<T>(),
        &VECTOR_ADD_BINDINGS,
        Workload::random(len)?,
    )
}

#[test]
fn dispatches_four_workgroups_for_4096_elements() {
    let log = HostDevice::default();
    let mut pipeline = build::<f32>(&log, &PassThrough, 4096).unwrap();
    assert_eq!(pipeline.workgroups(), 4);

    pipeline.run().unwrap();
    assert_eq!(pipeline.device().last_grid.get(), Some((4, pipeline.local_size())));
    assert_eq!(pipeline.local_size(), LOCAL_SIZE);
    pipeline.download_outputs().unwrap();

    let workload = pipeline.workload();
    for i in 0..workload.len() {
        assert_eq!(workload.c()[i], workload.a()[i] + workload.b()[i]);
    }
}

#[test]
fn compilation_failure_never_opens_the_device() {
    let log = HostDevice::default();
    let err = build::<f32>(&log, &Broken, 4096).err().unwrap();
    assert!(matches!(err, BenchError::Compilation { status: Some(1), .. }));
    assert!(!log.opened.get());
}

#[test]
fn misaligned_size_is_rejected() {
    let log = HostDevice::default();
    let err = build::<i32>(&log, &PassThrough, 1000).err().unwrap();
    assert!(matches!(err, BenchError::MisalignedDispatch { size: 1000, local_size: 1024 }));
    assert!(!log.opened.get());
}

#[test]
fn each_run_uploads_inputs_and_dispatches_once() {
    let log = HostDevice::default();
    let mut pipeline = build::<u32>(&log, &PassThrough, 2048).unwrap();
    // Setup stages all three bindings.
    assert_eq!(pipeline.device().uploads.borrow().len(), 3);

    for _ in 0..3 {
        pipeline.run().unwrap();
    }
    let device = pipeline.device();
    assert_eq!(device.dispatches.get(), 3);
    assert_eq!(device.uploads.borrow().len(), 3 + 3 * 2);
}

#[test]
fn downloading_outputs_leaves_inputs_alone() {
    let log = HostDevice::default();
    let mut pipeline = build::<i64>(&log, &PassThrough, 1024).unwrap();
    let (a, b) = (pipeline.workload().a().to_vec(), pipeline.workload().b().to_vec());

    pipeline.run().unwrap();
    assert_eq!(pipeline.device().downloads.get(), 1);
    pipeline.download_outputs().unwrap();
    assert_eq!(pipeline.device().downloads.get(), 2);

    let workload = pipeline.workload();
    assert_eq!(workload.a(), &a[..]);
    assert_eq!(workload.b(), &b[..]);
    for i in 0..workload.len() {
        assert_eq!(workload.c()[i], a[i].wrapping_add(b[i]));
    }
}

#[test]
fn integer_results_wrap() {
    let log = HostDevice::default();
    let mut pipeline = build::<i8>(&log, &PassThrough, 1024).unwrap();
    pipeline.run().unwrap();
    let workload = pipeline.workload();
    for i in 0..workload.len() {
        assert_eq!(workload.c()[i], workload.a()[i].wrapping_add(workload.b()[i]));
    }
}

#[test]
fn binding_table_orders_inputs_before_output() {
    let order: Vec<(usize, &str, Access)> = VECTOR_ADD_BINDINGS
        .iter()
        .map(|Binding { index, name, access }| (*index, *name, *access))
        .collect();
    assert_eq!(
        order,
        vec![(0, "a", Access::Read), (1, "b", Access::Read), (2, "c", Access::Write)]
    );
}
