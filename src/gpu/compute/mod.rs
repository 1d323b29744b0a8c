// ============================================
// Compute Module - GPU dispatch для террейна
// ============================================

mod backend;
mod cpu;
pub mod kernels;
mod registry;
mod wgpu_backend;

pub use backend::{
    workgroup_count, ComputeBackend, DispatchJob, FilterMode, GpuError, Kernel, KernelParams, TextureDesc,
    TextureFormat, TextureHandle, WORKGROUP_SIZE,
};
pub use cpu::CpuBackend;
pub use registry::{GpuContext, TextureRegistry};
pub use wgpu_backend::{GpuTexture, WgpuBackend};
